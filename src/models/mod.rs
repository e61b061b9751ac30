//! Domain vocabulary shared by services, handlers and entities.
//!
//! Entities persist these values as strings; the enums here own parsing, labels and the
//! allowed transitions.

pub mod order_status;
pub mod production;
pub mod shipment;

pub use order_status::{
    OrderPhase, OrderStatus, QuotationStatus, StatusCategory, StatusLabel, WorkflowStatus,
};
pub use production::{Priority, ProductionStage, StageAction, StageStatus, WorkOrderStatus};
pub use shipment::{Carrier, ServiceType, ShipmentStatus};
