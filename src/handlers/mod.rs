pub mod common;
pub mod health;
pub mod orders;
pub mod pricing;
pub mod quotations;
pub mod shipments;
pub mod work_orders;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    orders::OrderService, pricing::PricingService, quotations::QuotationService,
    shipments::ShipmentService, work_orders::WorkOrderService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub pricing: Arc<PricingService>,
    pub quotations: Arc<QuotationService>,
    pub orders: Arc<OrderService>,
    pub work_orders: Arc<WorkOrderService>,
    pub shipments: Arc<ShipmentService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Option<EventSender>,
        config: &AppConfig,
    ) -> Self {
        let pricing = PricingService::new(config.pricing.clone());
        let quotations = Arc::new(QuotationService::new(
            db.clone(),
            pricing.clone(),
            event_sender.clone(),
            config.default_currency.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            event_sender.clone(),
            config.pricing.consumption_tax_rate,
            config.default_currency.clone(),
        ));
        let work_orders = Arc::new(WorkOrderService::new(db.clone(), event_sender.clone()));
        let shipments = Arc::new(ShipmentService::new(db, event_sender));

        Self {
            pricing: Arc::new(pricing),
            quotations,
            orders,
            work_orders,
            shipments,
        }
    }
}
