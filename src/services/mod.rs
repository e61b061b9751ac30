// Quote engine
pub mod pricing;

// Sales documents
pub mod orders;
pub mod quotations;

// Production
pub mod production_estimator;
pub mod work_orders;

// Logistics
pub mod shipments;
