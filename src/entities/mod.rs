//! sea-orm entities. Status columns hold the string form of the enums in [`crate::models`].

pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod quotation;
pub mod quotation_item;
pub mod shipment;
pub mod shipment_tracking_event;
pub mod work_order;
pub mod work_order_action;
pub mod work_order_stage;
