use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(error = %e, event = name, "Failed to publish event");
        }
    }
}

/// Domain events emitted by the quoting, order, production and shipping services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    QuotationCreated {
        quotation_id: Uuid,
        quotation_number: String,
        total_amount: Decimal,
    },
    QuotationStatusChanged {
        quotation_id: Uuid,
        old_status: String,
        new_status: String,
    },
    QuotationConverted {
        quotation_id: Uuid,
        order_id: Uuid,
    },

    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),

    WorkOrderCreated {
        work_order_id: Uuid,
        order_id: Uuid,
    },
    ProductionStageAdvanced {
        work_order_id: Uuid,
        from_stage: String,
        to_stage: Option<String>,
    },
    ProductionStageRolledBack {
        work_order_id: Uuid,
        from_stage: String,
        to_stage: String,
    },
    ProductionCompleted {
        work_order_id: Uuid,
        order_id: Uuid,
    },

    ShipmentCreated {
        shipment_id: Uuid,
        order_id: Uuid,
        carrier: String,
        tracking_number: String,
    },
    ShipmentStatusChanged {
        shipment_id: Uuid,
        old_status: String,
        new_status: String,
    },
    ShipmentDelivered {
        shipment_id: Uuid,
        order_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::QuotationCreated { .. } => "quotation.created",
            Event::QuotationStatusChanged { .. } => "quotation.status_changed",
            Event::QuotationConverted { .. } => "quotation.converted",
            Event::OrderCreated(_) => "order.created",
            Event::OrderStatusChanged { .. } => "order.status_changed",
            Event::OrderCancelled(_) => "order.cancelled",
            Event::WorkOrderCreated { .. } => "work_order.created",
            Event::ProductionStageAdvanced { .. } => "production.stage_advanced",
            Event::ProductionStageRolledBack { .. } => "production.stage_rolled_back",
            Event::ProductionCompleted { .. } => "production.completed",
            Event::ShipmentCreated { .. } => "shipment.created",
            Event::ShipmentStatusChanged { .. } => "shipment.status_changed",
            Event::ShipmentDelivered { .. } => "shipment.delivered",
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let name = event.name();
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(event = name, order_id = %order_id, old_status = %old_status, new_status = %new_status, "Order status changed");
            }
            Event::ProductionCompleted {
                work_order_id,
                order_id,
            } => {
                info!(event = name, work_order_id = %work_order_id, order_id = %order_id, "Production completed");
            }
            Event::ShipmentDelivered {
                shipment_id,
                order_id,
            } => {
                info!(event = name, shipment_id = %shipment_id, order_id = %order_id, "Shipment delivered");
            }
            other => match serde_json::to_string(other) {
                Ok(payload) => info!(event = name, payload = %payload, "Received event"),
                Err(e) => warn!(event = name, error = %e, "Failed to serialize event"),
            },
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();

        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::OrderCancelled(Uuid::new_v4())).await.is_err());
        // never panics
        sender.send_or_log(Event::OrderCancelled(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn processor_drains_until_channel_closes() {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(process_events(rx));
        let sender = EventSender::new(tx);
        sender
            .send(Event::QuotationConverted {
                quotation_id: Uuid::new_v4(),
                order_id: Uuid::new_v4(),
            })
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();
    }
}
