use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// The nine manufacturing stages a work order passes through, in order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ProductionStage {
    Design,
    Proofing,
    PlateMaking,
    Printing,
    Lamination,
    Slitting,
    BagMaking,
    Qc,
    Packaging,
}

pub const PRODUCTION_STAGES: [ProductionStage; 9] = [
    ProductionStage::Design,
    ProductionStage::Proofing,
    ProductionStage::PlateMaking,
    ProductionStage::Printing,
    ProductionStage::Lamination,
    ProductionStage::Slitting,
    ProductionStage::BagMaking,
    ProductionStage::Qc,
    ProductionStage::Packaging,
];

/// Historical duration of a stage in working hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct StageDuration {
    pub average_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

impl ProductionStage {
    pub fn parse(value: &str) -> Option<Self> {
        ProductionStage::from_str(value.trim()).ok()
    }

    /// Zero-based position of the stage.
    pub fn index(&self) -> usize {
        PRODUCTION_STAGES
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    pub fn next(&self) -> Option<ProductionStage> {
        PRODUCTION_STAGES.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<ProductionStage> {
        self.index()
            .checked_sub(1)
            .and_then(|i| PRODUCTION_STAGES.get(i).copied())
    }

    pub fn is_first(&self) -> bool {
        *self == ProductionStage::Design
    }

    pub fn is_last(&self) -> bool {
        *self == ProductionStage::Packaging
    }

    pub fn name_ja(&self) -> &'static str {
        match self {
            ProductionStage::Design => "デザイン",
            ProductionStage::Proofing => "色校正",
            ProductionStage::PlateMaking => "版作成",
            ProductionStage::Printing => "印刷",
            ProductionStage::Lamination => "ラミネート",
            ProductionStage::Slitting => "スリット",
            ProductionStage::BagMaking => "製袋",
            ProductionStage::Qc => "品質検査",
            ProductionStage::Packaging => "梱包",
        }
    }

    pub fn duration(&self) -> StageDuration {
        let (average_hours, min_hours, max_hours) = match self {
            ProductionStage::Design => (8.0, 4.0, 16.0),
            ProductionStage::Proofing => (2.0, 1.0, 4.0),
            ProductionStage::PlateMaking => (4.0, 2.0, 8.0),
            ProductionStage::Printing => (16.0, 8.0, 32.0),
            ProductionStage::Lamination => (3.0, 2.0, 6.0),
            ProductionStage::Slitting => (4.0, 2.0, 8.0),
            ProductionStage::BagMaking => (6.0, 3.0, 12.0),
            ProductionStage::Qc => (2.0, 1.0, 4.0),
            ProductionStage::Packaging => (1.0, 0.5, 2.0),
        };
        StageDuration {
            average_hours,
            min_hours,
            max_hours,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkOrderStatus {
    InProgress,
    Completed,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Scales the historical stage durations.
    pub fn duration_multiplier(&self) -> f64 {
        match self {
            Priority::Urgent => 0.7,
            Priority::High => 0.85,
            Priority::Normal => 1.0,
            Priority::Low => 1.2,
        }
    }
}

/// Entry kinds in a work order's action history.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageAction {
    Advanced,
    RolledBack,
    NoteAdded,
    Assigned,
}
