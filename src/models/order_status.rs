//! Order and quotation status vocabulary.
//!
//! The canonical order lifecycle has ten forward steps plus `CANCELLED`. Portal screens still send
//! the newer workflow names and the old lowercase names, so [`OrderStatus::parse`] accepts all
//! three spellings and folds them onto the canonical set.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Canonical order status stored on every order row.
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
pub enum OrderStatus {
    Pending,
    Quotation,
    DataReceived,
    WorkOrder,
    ContractSent,
    ContractSigned,
    Production,
    StockIn,
    Shipped,
    Delivered,
    Cancelled,
}

const PRODUCTION_STEP: usize = 6;

/// Forward order of the lifecycle, `CANCELLED` excluded.
pub const ORDER_SEQUENCE: [OrderStatus; 10] = [
    OrderStatus::Pending,
    OrderStatus::Quotation,
    OrderStatus::DataReceived,
    OrderStatus::WorkOrder,
    OrderStatus::ContractSent,
    OrderStatus::ContractSigned,
    OrderStatus::Production,
    OrderStatus::StockIn,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Initial,
    Active,
    Production,
    Final,
    Terminated,
}

/// Display labels for an order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusLabel {
    pub ja: &'static str,
    pub ko: &'static str,
    pub en: &'static str,
    pub description: &'static str,
    pub category: StatusCategory,
}

/// Coarse grouping used by the customer dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderPhase {
    Quotation,
    Preparation,
    Production,
    Shipping,
}

impl OrderStatus {
    /// Parses canonical, workflow and lowercase legacy spellings.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(status) = OrderStatus::from_str(value) {
            return Some(status);
        }
        if let Ok(workflow) = WorkflowStatus::from_str(value) {
            return Some(workflow.to_order_status());
        }
        match value.to_ascii_lowercase().as_str() {
            "processing" | "manufacturing" => Some(OrderStatus::Production),
            "ready" => Some(OrderStatus::WorkOrder),
            _ => None,
        }
    }

    /// Position in the forward lifecycle; `None` for `CANCELLED`.
    pub fn step(&self) -> Option<usize> {
        ORDER_SEQUENCE.iter().position(|s| s == self)
    }

    pub fn next(&self) -> Option<OrderStatus> {
        self.step().and_then(|i| ORDER_SEQUENCE.get(i + 1).copied())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Cancellation is only possible up to and including production.
    pub fn is_cancellable(&self) -> bool {
        matches!(self.step(), Some(i) if i <= PRODUCTION_STEP)
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        if target == OrderStatus::Cancelled {
            return self.is_cancellable();
        }
        self.next() == Some(target)
    }

    pub fn allowed_transitions(&self) -> Vec<OrderStatus> {
        let mut allowed: Vec<OrderStatus> = self.next().into_iter().collect();
        if self.is_cancellable() {
            allowed.push(OrderStatus::Cancelled);
        }
        allowed
    }

    pub fn progress_percent(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Quotation => 10,
            OrderStatus::DataReceived => 20,
            OrderStatus::WorkOrder => 30,
            OrderStatus::ContractSent => 40,
            OrderStatus::ContractSigned => 50,
            OrderStatus::Production => 70,
            OrderStatus::StockIn => 85,
            OrderStatus::Shipped => 95,
            OrderStatus::Delivered => 100,
            OrderStatus::Cancelled => 0,
        }
    }

    pub fn phase(&self) -> Option<OrderPhase> {
        match self {
            OrderStatus::Pending | OrderStatus::Quotation => Some(OrderPhase::Quotation),
            OrderStatus::DataReceived
            | OrderStatus::WorkOrder
            | OrderStatus::ContractSent
            | OrderStatus::ContractSigned => Some(OrderPhase::Preparation),
            OrderStatus::Production | OrderStatus::StockIn => Some(OrderPhase::Production),
            OrderStatus::Shipped | OrderStatus::Delivered => Some(OrderPhase::Shipping),
            OrderStatus::Cancelled => None,
        }
    }

    /// Lowercase status used by the older dashboard screens.
    pub fn legacy_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Quotation
            | OrderStatus::DataReceived
            | OrderStatus::ContractSent
            | OrderStatus::ContractSigned => "processing",
            OrderStatus::WorkOrder | OrderStatus::StockIn => "ready",
            OrderStatus::Production => "manufacturing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn workflow_status(&self) -> Option<WorkflowStatus> {
        match self {
            OrderStatus::Pending => Some(WorkflowStatus::QuotationPending),
            OrderStatus::Quotation => Some(WorkflowStatus::QuotationApproved),
            OrderStatus::DataReceived => Some(WorkflowStatus::DataUploaded),
            OrderStatus::WorkOrder => Some(WorkflowStatus::CorrectionCompleted),
            OrderStatus::ContractSent | OrderStatus::ContractSigned => {
                Some(WorkflowStatus::CustomerApprovalPending)
            }
            OrderStatus::Production => Some(WorkflowStatus::Production),
            OrderStatus::StockIn => Some(WorkflowStatus::ReadyToShip),
            OrderStatus::Shipped | OrderStatus::Delivered => Some(WorkflowStatus::Shipped),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn label(&self) -> StatusLabel {
        use StatusCategory::*;
        let (ja, ko, en, description, category) = match self {
            OrderStatus::Pending => ("登録待", "등록 대기", "Registration Pending", "企業会員登録・認証待ち", Initial),
            OrderStatus::Quotation => ("見積作成", "견적 작성", "Quotation", "見積依頼・作成中", Active),
            OrderStatus::DataReceived => ("データ入稿", "데이터 입고", "Data Received", "デザインデータ入荷・AI抽出", Active),
            OrderStatus::WorkOrder => ("作業標準書", "작업표준서", "Work Order", "作業標準書・仕様書作成", Active),
            OrderStatus::ContractSent => ("契約書送付", "계약서 송부", "Contract Sent", "契約書送付中", Active),
            OrderStatus::ContractSigned => ("契約署名完了", "계약서 서명 완료", "Contract Signed", "電子署名完了", Active),
            OrderStatus::Production => ("製造中", "생산 중", "Production", "製造工程中（9段階）", Production),
            OrderStatus::StockIn => ("入庫完了", "입고 완료", "Stock In", "製品入庫完了", Production),
            OrderStatus::Shipped => ("出荷完了", "출하 완료", "Shipped", "出荷完了・配送中", Final),
            OrderStatus::Delivered => ("配送完了", "배송 완료", "Delivered", "お客様への配送完了", Final),
            OrderStatus::Cancelled => ("キャンセル", "취소됨", "Cancelled", "注文キャンセル", Terminated),
        };
        StatusLabel {
            ja,
            ko,
            en,
            description,
            category,
        }
    }
}

/// Ten-stage workflow vocabulary used by the newer portal screens.
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
pub enum WorkflowStatus {
    QuotationPending,
    QuotationApproved,
    DataUploadPending,
    DataUploaded,
    CorrectionInProgress,
    CorrectionCompleted,
    CustomerApprovalPending,
    Production,
    ReadyToShip,
    Shipped,
}

impl WorkflowStatus {
    pub fn to_order_status(self) -> OrderStatus {
        match self {
            WorkflowStatus::QuotationPending => OrderStatus::Pending,
            WorkflowStatus::QuotationApproved | WorkflowStatus::DataUploadPending => {
                OrderStatus::Quotation
            }
            WorkflowStatus::DataUploaded | WorkflowStatus::CorrectionInProgress => {
                OrderStatus::DataReceived
            }
            WorkflowStatus::CorrectionCompleted => OrderStatus::WorkOrder,
            WorkflowStatus::CustomerApprovalPending => OrderStatus::ContractSent,
            WorkflowStatus::Production => OrderStatus::Production,
            WorkflowStatus::ReadyToShip => OrderStatus::StockIn,
            WorkflowStatus::Shipped => OrderStatus::Shipped,
        }
    }
}

/// Quotation lifecycle. `CONVERTED` is only reachable through conversion to an order.
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
pub enum QuotationStatus {
    QuotationPending,
    Draft,
    Sent,
    #[strum(to_string = "APPROVED", serialize = "QUOTATION_APPROVED")]
    Approved,
    Rejected,
    Expired,
    Converted,
}

impl QuotationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        QuotationStatus::from_str(value.trim()).ok()
    }

    pub fn can_convert(&self) -> bool {
        matches!(self, QuotationStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QuotationStatus::Converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case("PENDING", OrderStatus::Pending)]
    #[case("contract_signed", OrderStatus::ContractSigned)]
    #[case("QUOTATION_PENDING", OrderStatus::Pending)]
    #[case("DATA_UPLOAD_PENDING", OrderStatus::Quotation)]
    #[case("CORRECTION_IN_PROGRESS", OrderStatus::DataReceived)]
    #[case("CUSTOMER_APPROVAL_PENDING", OrderStatus::ContractSent)]
    #[case("READY_TO_SHIP", OrderStatus::StockIn)]
    #[case("manufacturing", OrderStatus::Production)]
    #[case("ready", OrderStatus::WorkOrder)]
    #[case(" shipped ", OrderStatus::Shipped)]
    fn parse_accepts_every_spelling(#[case] input: &str, #[case] expected: OrderStatus) {
        assert_eq!(OrderStatus::parse(input), Some(expected));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(OrderStatus::parse("LOST"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }

    #[test]
    fn forward_transitions_move_one_step() {
        for pair in ORDER_SEQUENCE.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
        }
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::DataReceived));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::StockIn));
        assert!(!OrderStatus::Quotation.can_transition_to(OrderStatus::Quotation));
    }

    #[test]
    fn cancellation_only_before_stock_in() {
        for status in OrderStatus::iter() {
            let expected = matches!(
                status,
                OrderStatus::Pending
                    | OrderStatus::Quotation
                    | OrderStatus::DataReceived
                    | OrderStatus::WorkOrder
                    | OrderStatus::ContractSent
                    | OrderStatus::ContractSigned
                    | OrderStatus::Production
            );
            assert_eq!(
                status.can_transition_to(OrderStatus::Cancelled),
                expected,
                "{status}"
            );
        }
    }

    #[test]
    fn terminal_statuses_have_no_transitions() {
        assert!(OrderStatus::Delivered.allowed_transitions().is_empty());
        assert!(OrderStatus::Cancelled.allowed_transitions().is_empty());
        assert_eq!(
            OrderStatus::StockIn.allowed_transitions(),
            vec![OrderStatus::Shipped]
        );
    }

    #[test]
    fn progress_is_monotonic_along_the_lifecycle() {
        let progress: Vec<u8> = ORDER_SEQUENCE.iter().map(|s| s.progress_percent()).collect();
        assert_eq!(progress, vec![0, 10, 20, 30, 40, 50, 70, 85, 95, 100]);
        assert_eq!(OrderStatus::Cancelled.progress_percent(), 0);
    }

    #[test]
    fn labels_and_phases() {
        let label = OrderStatus::Production.label();
        assert_eq!(label.ja, "製造中");
        assert_eq!(label.category, StatusCategory::Production);
        assert_eq!(OrderStatus::ContractSent.phase(), Some(OrderPhase::Preparation));
        assert_eq!(OrderStatus::Cancelled.phase(), None);
        assert_eq!(OrderStatus::StockIn.legacy_name(), "ready");
    }

    #[test]
    fn workflow_round_trip_lands_on_the_same_phase() {
        for workflow in WorkflowStatus::iter() {
            let order = workflow.to_order_status();
            assert!(order.workflow_status().is_some(), "{workflow}");
        }
        assert_eq!(OrderStatus::DataReceived.to_string(), "DATA_RECEIVED");
    }

    #[test]
    fn quotation_status_aliases() {
        assert_eq!(QuotationStatus::parse("approved"), Some(QuotationStatus::Approved));
        assert_eq!(
            QuotationStatus::parse("QUOTATION_APPROVED"),
            Some(QuotationStatus::Approved)
        );
        assert_eq!(QuotationStatus::parse("draft"), Some(QuotationStatus::Draft));
        assert_eq!(QuotationStatus::Approved.to_string(), "APPROVED");
        assert!(QuotationStatus::Approved.can_convert());
        assert!(!QuotationStatus::Sent.can_convert());
    }
}
