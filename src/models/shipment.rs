use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

static TRACKING_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]").unwrap());

/// Domestic carriers supported for outbound shipments.
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
pub enum Carrier {
    Yamato,
    Sagawa,
    JpPost,
    Seino,
}

impl Carrier {
    pub fn parse(value: &str) -> Option<Self> {
        Carrier::from_str(value.trim()).ok()
    }

    /// Number of digits in a valid tracking number.
    pub fn tracking_digits(&self) -> usize {
        match self {
            Carrier::Yamato => 12,
            Carrier::Sagawa => 10,
            Carrier::JpPost => 11,
            Carrier::Seino => 9,
        }
    }

    pub fn name_ja(&self) -> &'static str {
        match self {
            Carrier::Yamato => "ヤマト運輸",
            Carrier::Sagawa => "佐川急便",
            Carrier::JpPost => "日本郵便",
            Carrier::Seino => "西濃運輸",
        }
    }

    pub fn name_en(&self) -> &'static str {
        match self {
            Carrier::Yamato => "Yamato Transport",
            Carrier::Sagawa => "Sagawa Express",
            Carrier::JpPost => "Japan Post",
            Carrier::Seino => "Seino Transport",
        }
    }

    /// Checks the digit count after stripping spaces and dashes.
    pub fn validate_tracking_number(&self, tracking_number: &str) -> bool {
        let cleaned = clean_tracking_number(tracking_number);
        cleaned.len() == self.tracking_digits() && cleaned.chars().all(|c| c.is_ascii_digit())
    }

    pub fn tracking_url(&self, tracking_number: &str) -> String {
        let number = clean_tracking_number(tracking_number);
        match self {
            Carrier::Yamato => {
                format!("https://toi.kuronekoyamato.co.jp/cgi-bin/tneko?number={number}")
            }
            Carrier::Sagawa => format!(
                "https://k2k.sagawa-exp.co.jp/p/web/okurijosearch.do?okurijoNo={number}"
            ),
            Carrier::JpPost => format!(
                "https://tracking.post.japanpost.jp/services/english/trace.html?searchStr={number}"
            ),
            Carrier::Seino => format!("https://track.seino.co.jp/kamotsu/TrackNoTop?nos={number}"),
        }
    }

    /// Produces a placeholder tracking number until the carrier assigns one.
    ///
    /// Yamato numbers are grouped `####-####-####`; other carriers get a bare digit string.
    pub fn generate_tracking_number(&self) -> String {
        let mut seed = Uuid::new_v4().as_u128();
        let digits: String = (0..self.tracking_digits())
            .map(|_| {
                let digit = (seed % 10) as u8;
                seed /= 10;
                char::from(b'0' + digit)
            })
            .collect();
        match self {
            Carrier::Yamato => format!("{}-{}-{}", &digits[0..4], &digits[4..8], &digits[8..12]),
            _ => digits,
        }
    }
}

pub fn clean_tracking_number(tracking_number: &str) -> String {
    TRACKING_SEPARATORS
        .replace_all(tracking_number, "")
        .into_owned()
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ServiceType {
    #[default]
    Standard,
    Cool,
    Mail,
}

/// Estimated delivery: two days, three for mail, plus one day for Japan Post.
pub fn estimate_delivery(
    carrier: Carrier,
    service_type: ServiceType,
    pickup: DateTime<Utc>,
) -> DateTime<Utc> {
    let mut days = match service_type {
        ServiceType::Mail => 3,
        _ => 2,
    };
    if carrier == Carrier::JpPost {
        days += 1;
    }
    pickup + Duration::days(days)
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
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
}

impl ShipmentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        ShipmentStatus::from_str(value.trim()).ok()
    }

    /// Maps a carrier-reported status; anything unrecognised is `PENDING`.
    pub fn from_carrier_status(value: &str) -> Self {
        Self::parse(value).unwrap_or(ShipmentStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Returned)
    }

    pub fn allowed_transitions(&self) -> &'static [ShipmentStatus] {
        use ShipmentStatus::*;
        match self {
            Pending => &[PickedUp, InTransit, Failed],
            PickedUp => &[InTransit, OutForDelivery, Delivered, Failed],
            InTransit => &[OutForDelivery, Delivered, Failed, Returned],
            OutForDelivery => &[Delivered, Failed, Returned],
            Failed => &[InTransit, OutForDelivery, Returned],
            Delivered | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, target: ShipmentStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn name_ja(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "出荷準備中",
            ShipmentStatus::PickedUp => "集荷済み",
            ShipmentStatus::InTransit => "輸送中",
            ShipmentStatus::OutForDelivery => "配達中",
            ShipmentStatus::Delivered => "配達完了",
            ShipmentStatus::Failed => "配達失敗",
            ShipmentStatus::Returned => "返送",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case(Carrier::Yamato, "1234-5678-9012", true)]
    #[case(Carrier::Yamato, "12345678901", false)]
    #[case(Carrier::Sagawa, "12345 67890", true)]
    #[case(Carrier::JpPost, "12345678901", true)]
    #[case(Carrier::Seino, "12345678a", false)]
    #[case(Carrier::Seino, "123456789", true)]
    fn validates_tracking_numbers(
        #[case] carrier: Carrier,
        #[case] number: &str,
        #[case] valid: bool,
    ) {
        assert_eq!(carrier.validate_tracking_number(number), valid);
    }

    #[test]
    fn generated_tracking_numbers_validate() {
        for carrier in Carrier::iter() {
            let number = carrier.generate_tracking_number();
            assert!(carrier.validate_tracking_number(&number), "{carrier}: {number}");
        }
        let yamato = Carrier::Yamato.generate_tracking_number();
        assert_eq!(yamato.len(), 14);
        assert_eq!(yamato.matches('-').count(), 2);
    }

    #[test]
    fn tracking_url_uses_cleaned_number() {
        assert_eq!(
            Carrier::Yamato.tracking_url("1234-5678-9012"),
            "https://toi.kuronekoyamato.co.jp/cgi-bin/tneko?number=123456789012"
        );
    }

    #[test]
    fn delivery_estimates() {
        let pickup = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        assert_eq!(
            estimate_delivery(Carrier::Yamato, ServiceType::Standard, pickup),
            pickup + Duration::days(2)
        );
        assert_eq!(
            estimate_delivery(Carrier::JpPost, ServiceType::Mail, pickup),
            pickup + Duration::days(4)
        );
    }

    #[test]
    fn status_transitions() {
        assert!(ShipmentStatus::Pending.can_transition_to(ShipmentStatus::InTransit));
        assert!(!ShipmentStatus::Pending.can_transition_to(ShipmentStatus::Delivered));
        assert!(ShipmentStatus::Failed.can_transition_to(ShipmentStatus::Returned));
        for status in ShipmentStatus::iter().filter(|s| s.is_terminal()) {
            assert!(status.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn unknown_carrier_status_is_pending() {
        assert_eq!(
            ShipmentStatus::from_carrier_status("in_transit"),
            ShipmentStatus::InTransit
        );
        assert_eq!(
            ShipmentStatus::from_carrier_status("warehouse-scan"),
            ShipmentStatus::Pending
        );
    }
}
