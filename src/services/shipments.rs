use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        shipment::{self, Entity as ShipmentEntity},
        shipment_tracking_event::{self, Entity as TrackingEventEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        shipment::{clean_tracking_number, estimate_delivery},
        Carrier, OrderStatus, ServiceType, ShipmentStatus,
    },
    services::orders::{find_order, stored_status, transition_order},
};

/// Shipments refreshed concurrently per batch chunk.
const BATCH_CHUNK_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateShipmentRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "Carrier is required"))]
    pub carrier: String,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    /// Generated when absent.
    pub tracking_number: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

/// A status report for one shipment, from staff or a carrier feed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TrackingUpdateRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchStatusItem {
    pub shipment_id: Uuid,
    #[serde(flatten)]
    pub update: TrackingUpdateRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchStatusRequest {
    pub updates: Vec<BatchStatusItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchStatusOutcome {
    pub shipment_id: Uuid,
    pub success: bool,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchStatusResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchStatusOutcome>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ShipmentFilter {
    pub order_id: Option<Uuid>,
    pub status: Option<String>,
    pub carrier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub carrier: String,
    pub carrier_name: String,
    pub service_type: String,
    pub tracking_number: String,
    pub tracking_url: String,
    pub status: String,
    pub status_name: String,
    pub notes: Option<String>,
    pub shipped_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<shipment::Model> for ShipmentResponse {
    fn from(model: shipment::Model) -> Self {
        let carrier_name = Carrier::parse(&model.carrier)
            .map(|c| c.name_ja().to_string())
            .unwrap_or_else(|| model.carrier.clone());
        let status_name = ShipmentStatus::parse(&model.status)
            .map(|s| s.name_ja().to_string())
            .unwrap_or_else(|| model.status.clone());
        Self {
            id: model.id,
            order_id: model.order_id,
            carrier: model.carrier,
            carrier_name,
            service_type: model.service_type,
            tracking_number: model.tracking_number,
            tracking_url: model.tracking_url,
            status: model.status,
            status_name,
            notes: model.notes,
            shipped_at: model.shipped_at,
            estimated_delivery: model.estimated_delivery,
            delivered_at: model.delivered_at,
            last_checked_at: model.last_checked_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingEventResponse {
    pub id: Uuid,
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub event_time: DateTime<Utc>,
}

impl From<shipment_tracking_event::Model> for TrackingEventResponse {
    fn from(model: shipment_tracking_event::Model) -> Self {
        Self {
            id: model.id,
            status: model.status,
            location: model.location,
            description: model.description,
            event_time: model.event_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShipmentDetailResponse {
    #[serde(flatten)]
    pub shipment: ShipmentResponse,
    pub events: Vec<TrackingEventResponse>,
}

async fn insert_tracking_event<C: ConnectionTrait>(
    conn: &C,
    shipment_id: Uuid,
    status: ShipmentStatus,
    location: Option<String>,
    description: Option<String>,
    event_time: DateTime<Utc>,
) -> Result<(), ServiceError> {
    shipment_tracking_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        shipment_id: Set(shipment_id),
        status: Set(status.to_string()),
        location: Set(location),
        description: Set(description),
        event_time: Set(event_time),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;
    Ok(())
}

/// Resolves the tracking number to store: validated when supplied, generated otherwise.
fn resolve_tracking_number(
    carrier: Carrier,
    supplied: Option<&str>,
) -> Result<String, ServiceError> {
    match supplied.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => {
            let cleaned = clean_tracking_number(raw);
            if !carrier.validate_tracking_number(&cleaned) {
                return Err(ServiceError::ValidationError(format!(
                    "Tracking number {} is not valid for {} ({} digits expected)",
                    raw,
                    carrier,
                    carrier.tracking_digits()
                )));
            }
            Ok(cleaned)
        }
        None => Ok(clean_tracking_number(&carrier.generate_tracking_number())),
    }
}

/// Outbound shipments and their tracking history.
#[derive(Clone)]
pub struct ShipmentService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl ShipmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    async fn find_shipment<C: ConnectionTrait>(
        conn: &C,
        shipment_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        ShipmentEntity::find_by_id(shipment_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))
    }

    async fn detail<C: ConnectionTrait>(
        conn: &C,
        shipment: shipment::Model,
    ) -> Result<ShipmentDetailResponse, ServiceError> {
        let events = TrackingEventEntity::find()
            .filter(shipment_tracking_event::Column::ShipmentId.eq(shipment.id))
            .order_by_asc(shipment_tracking_event::Column::EventTime)
            .order_by_asc(shipment_tracking_event::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(ShipmentDetailResponse {
            shipment: shipment.into(),
            events: events.into_iter().map(Into::into).collect(),
        })
    }

    /// Registers a shipment for an order that has come out of stock.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, carrier = %request.carrier))]
    pub async fn create_shipment(
        &self,
        request: CreateShipmentRequest,
    ) -> Result<ShipmentDetailResponse, ServiceError> {
        request.validate()?;
        let carrier = Carrier::parse(&request.carrier).ok_or_else(|| {
            ServiceError::InvalidInput(format!("Unknown carrier: {}", request.carrier))
        })?;
        let service_type = request.service_type.unwrap_or_default();
        let tracking_number = resolve_tracking_number(carrier, request.tracking_number.as_deref())?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, request.order_id).await?;
        let order_status = stored_status(&order)?;
        let order_id = order.id;
        let mut order_event = None;
        match order_status {
            OrderStatus::StockIn => {
                transition_order(
                    &txn,
                    order,
                    OrderStatus::Shipped,
                    Some("Shipment registered".to_string()),
                    request.created_by.clone(),
                )
                .await?;
                order_event = Some(Event::OrderStatusChanged {
                    order_id,
                    old_status: OrderStatus::StockIn.to_string(),
                    new_status: OrderStatus::Shipped.to_string(),
                });
            }
            OrderStatus::Shipped => {}
            other => {
                return Err(ServiceError::InvalidOperation(format!(
                    "Order {} cannot be shipped in status {}",
                    order.order_number, other
                )));
            }
        }

        let duplicate = ShipmentEntity::find()
            .filter(shipment::Column::TrackingNumber.eq(tracking_number.clone()))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Tracking number {} is already registered",
                tracking_number
            )));
        }

        let now = Utc::now();
        let shipped_at = request.shipped_at.unwrap_or(now);
        let shipment_id = Uuid::new_v4();
        let shipment = shipment::ActiveModel {
            id: Set(shipment_id),
            order_id: Set(order_id),
            carrier: Set(carrier.to_string()),
            service_type: Set(service_type.to_string()),
            tracking_url: Set(carrier.tracking_url(&tracking_number)),
            tracking_number: Set(tracking_number.clone()),
            status: Set(ShipmentStatus::Pending.to_string()),
            notes: Set(request.notes),
            shipped_at: Set(shipped_at),
            estimated_delivery: Set(estimate_delivery(carrier, service_type, shipped_at)),
            delivered_at: Set(None),
            last_checked_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        insert_tracking_event(
            &txn,
            shipment_id,
            ShipmentStatus::Pending,
            None,
            Some("Shipment registered".to_string()),
            shipped_at,
        )
        .await?;

        let response = Self::detail(&txn, shipment).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(shipment_id = %shipment_id, tracking_number = %tracking_number, "Shipment created");
        counter!("shipments.created", 1, "carrier" => carrier.to_string());
        if let Some(event) = order_event {
            self.publish(event).await;
        }
        self.publish(Event::ShipmentCreated {
            shipment_id,
            order_id,
            carrier: carrier.to_string(),
            tracking_number,
        })
        .await;
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<ShipmentDetailResponse, ServiceError> {
        let shipment = Self::find_shipment(&*self.db, shipment_id).await?;
        Self::detail(&*self.db, shipment).await
    }

    /// Looks a shipment up by tracking number, with or without separators.
    #[instrument(skip(self))]
    pub async fn track(&self, tracking_number: &str) -> Result<ShipmentDetailResponse, ServiceError> {
        let cleaned = clean_tracking_number(tracking_number.trim());
        let shipment = ShipmentEntity::find()
            .filter(shipment::Column::TrackingNumber.eq(cleaned))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No shipment with tracking number {}", tracking_number))
            })?;
        Self::detail(&*self.db, shipment).await
    }

    /// Newest first. `page` is 1-based.
    #[instrument(skip(self, filter))]
    pub async fn list_shipments(
        &self,
        filter: ShipmentFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ShipmentResponse>, u64), ServiceError> {
        let mut query = ShipmentEntity::find();
        if let Some(order_id) = filter.order_id {
            query = query.filter(shipment::Column::OrderId.eq(order_id));
        }
        if let Some(status) = filter.status.as_deref() {
            let status = ShipmentStatus::parse(status)
                .ok_or_else(|| ServiceError::InvalidInput(format!("Unknown status: {}", status)))?;
            query = query.filter(shipment::Column::Status.eq(status.to_string()));
        }
        if let Some(carrier) = filter.carrier.as_deref() {
            let carrier = Carrier::parse(carrier)
                .ok_or_else(|| ServiceError::InvalidInput(format!("Unknown carrier: {}", carrier)))?;
            query = query.filter(shipment::Column::Carrier.eq(carrier.to_string()));
        }

        let paginator = query
            .order_by_desc(shipment::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let shipments = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((shipments.into_iter().map(Into::into).collect(), total))
    }

    /// Applies a tracking update. Reporting the current status again only appends an event.
    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn record_tracking(
        &self,
        shipment_id: Uuid,
        request: TrackingUpdateRequest,
    ) -> Result<ShipmentDetailResponse, ServiceError> {
        request.validate()?;
        let target = ShipmentStatus::from_carrier_status(&request.status);
        let now = Utc::now();
        let event_time = request.event_time.unwrap_or(now);

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let shipment = Self::find_shipment(&txn, shipment_id).await?;
        let current = ShipmentStatus::parse(&shipment.status).ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Shipment {} has unrecognised status {}",
                shipment_id, shipment.status
            ))
        })?;

        if current != target && !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot move shipment {} from {} to {}",
                shipment.tracking_number, current, target
            )));
        }

        insert_tracking_event(
            &txn,
            shipment_id,
            target,
            request.location,
            request.description,
            event_time,
        )
        .await?;

        let order_id = shipment.order_id;
        let mut active: shipment::ActiveModel = shipment.into();
        active.last_checked_at = Set(Some(now));
        if current != target {
            active.status = Set(target.to_string());
            if target == ShipmentStatus::Delivered {
                active.delivered_at = Set(Some(event_time));
            }
        }
        let shipment = active.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut events = Vec::new();
        if current != target {
            events.push(Event::ShipmentStatusChanged {
                shipment_id,
                old_status: current.to_string(),
                new_status: target.to_string(),
            });
            if target == ShipmentStatus::Delivered {
                events.push(Event::ShipmentDelivered {
                    shipment_id,
                    order_id,
                });
                let order = find_order(&txn, order_id).await?;
                if stored_status(&order)? == OrderStatus::Shipped {
                    transition_order(
                        &txn,
                        order,
                        OrderStatus::Delivered,
                        Some("Shipment delivered".to_string()),
                        request.changed_by,
                    )
                    .await?;
                    events.push(Event::OrderStatusChanged {
                        order_id,
                        old_status: OrderStatus::Shipped.to_string(),
                        new_status: OrderStatus::Delivered.to_string(),
                    });
                }
            }
        }

        let response = Self::detail(&txn, shipment).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        if current != target {
            info!(shipment_id = %shipment_id, from = %current, to = %target, "Shipment status updated");
            counter!("shipments.status_transitions", 1, "to" => target.to_string());
        }
        for event in events {
            self.publish(event).await;
        }
        Ok(response)
    }

    /// Applies many tracking updates, five at a time, reporting each outcome.
    #[instrument(skip(self, request), fields(count = request.updates.len()))]
    pub async fn batch_update_status(&self, request: BatchStatusRequest) -> BatchStatusResponse {
        let mut results = Vec::with_capacity(request.updates.len());
        for chunk in request.updates.chunks(BATCH_CHUNK_SIZE) {
            let outcomes = join_all(chunk.iter().cloned().map(|item| async move {
                let shipment_id = item.shipment_id;
                match self.record_tracking(shipment_id, item.update).await {
                    Ok(detail) => BatchStatusOutcome {
                        shipment_id,
                        success: true,
                        status: Some(detail.shipment.status),
                        error: None,
                    },
                    Err(e) => {
                        warn!(shipment_id = %shipment_id, error = %e, "Batch tracking update failed");
                        BatchStatusOutcome {
                            shipment_id,
                            success: false,
                            status: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }))
            .await;
            results.extend(outcomes);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        BatchStatusResponse {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}
