use chrono::{DateTime, Datelike, NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    sea_query::Expr, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
        order_status_history::{self, Entity as OrderStatusHistoryEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderPhase, OrderStatus, StatusLabel, WorkflowStatus},
    services::quotations::{calculate_totals, line_total},
};

/// Last millisecond stamp handed out for an order number.
static LAST_ORDER_STAMP: AtomicU64 = AtomicU64::new(0);

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// `ORD-YYYY-<base36 millis>`; stamps are strictly increasing within the process.
pub(crate) fn next_order_number(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let previous = LAST_ORDER_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(millis.max(last + 1))
        })
        .unwrap_or(millis);
    let stamp = millis.max(previous + 1);
    format!("ORD-{}-{}", now.year(), to_base36(stamp))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub product_name: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Defaults to `quantity * unit_price`.
    #[serde(default)]
    pub line_total: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub specification: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: String,
    pub company_name: Option<String>,
    pub notes: Option<String>,
    pub shipping_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub items: Vec<OrderItemInput>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// Canonical, workflow or legacy status name.
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
    pub reason: Option<String>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderDetailsRequest {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 1000))]
    pub shipping_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub customer_email: Option<String>,
}

/// Where an order stands in its lifecycle.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderProgress {
    pub status: OrderStatus,
    pub progress_percent: u8,
    pub label: StatusLabel,
    pub phase: Option<OrderPhase>,
    pub legacy_status: String,
    pub workflow_status: Option<WorkflowStatus>,
    pub allowed_transitions: Vec<OrderStatus>,
}

impl From<OrderStatus> for OrderProgress {
    fn from(status: OrderStatus) -> Self {
        Self {
            status,
            progress_percent: status.progress_percent(),
            label: status.label(),
            phase: status.phase(),
            legacy_status: status.legacy_name().to_string(),
            workflow_status: status.workflow_status(),
            allowed_transitions: status.allowed_transitions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub quotation_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub company_name: Option<String>,
    pub status: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub shipping_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub progress: Option<OrderProgress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        let progress = OrderStatus::parse(&model.status).map(OrderProgress::from);
        Self {
            id: model.id,
            order_number: model.order_number,
            quotation_id: model.quotation_id,
            customer_name: model.customer_name,
            customer_email: model.customer_email,
            company_name: model.company_name,
            status: model.status,
            subtotal: model.subtotal,
            tax_amount: model.tax_amount,
            total_amount: model.total_amount,
            currency: model.currency,
            notes: model.notes,
            shipping_address: model.shipping_address,
            requested_delivery_date: model.requested_delivery_date,
            progress,
            created_at: model.created_at,
            updated_at: model.updated_at,
            version: model.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_name: String,
    #[schema(value_type = Option<Object>)]
    pub specification: Option<serde_json::Value>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            product_name: model.product_name,
            specification: model.specification,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_total: model.line_total,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusHistoryResponse {
    pub id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub reason: Option<String>,
    pub changed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<order_status_history::Model> for OrderStatusHistoryResponse {
    fn from(model: order_status_history::Model) -> Self {
        Self {
            id: model.id,
            from_status: model.from_status,
            to_status: model.to_status,
            reason: model.reason,
            changed_by: model.changed_by,
            created_at: model.created_at,
        }
    }
}

/// Header fields of an order about to be inserted.
pub(crate) struct NewOrder {
    pub quotation_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub company_name: Option<String>,
    pub status: OrderStatus,
    pub currency: String,
    pub notes: Option<String>,
    pub shipping_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub reason: String,
    pub changed_by: Option<String>,
}

pub(crate) struct NewOrderItem {
    pub product_name: String,
    pub specification: Option<serde_json::Value>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<&order_item::Model> for NewOrderItem {
    fn from(item: &order_item::Model) -> Self {
        Self {
            product_name: item.product_name.clone(),
            specification: item.specification.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
        }
    }
}

pub(crate) async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    OrderEntity::find_by_id(order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

pub(crate) fn stored_status(order: &order::Model) -> Result<OrderStatus, ServiceError> {
    OrderStatus::parse(&order.status).ok_or_else(|| {
        ServiceError::InternalError(format!(
            "Order {} has unrecognised status {}",
            order.id, order.status
        ))
    })
}

async fn record_history<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    from: Option<OrderStatus>,
    to: OrderStatus,
    reason: Option<String>,
    changed_by: Option<String>,
) -> Result<(), ServiceError> {
    order_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        from_status: Set(from.map(|s| s.to_string())),
        to_status: Set(to.to_string()),
        reason: Set(reason),
        changed_by: Set(changed_by),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;
    Ok(())
}

/// Inserts an order with its items and the initial history row.
pub(crate) async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    new_order: NewOrder,
    items: Vec<NewOrderItem>,
    tax_rate: Decimal,
) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let totals = calculate_totals(items.iter().map(|i| i.line_total), tax_rate)?;

    let order = order::ActiveModel {
        id: Set(order_id),
        order_number: Set(next_order_number(now)),
        quotation_id: Set(new_order.quotation_id),
        customer_name: Set(new_order.customer_name),
        customer_email: Set(new_order.customer_email),
        company_name: Set(new_order.company_name),
        status: Set(new_order.status.to_string()),
        subtotal: Set(totals.subtotal),
        tax_amount: Set(totals.tax_amount),
        total_amount: Set(totals.total_amount),
        currency: Set(new_order.currency),
        notes: Set(new_order.notes),
        shipping_address: Set(new_order.shipping_address),
        requested_delivery_date: Set(new_order.requested_delivery_date),
        created_at: Set(now),
        updated_at: Set(now),
        version: Set(1),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!(error = %e, order_id = %order_id, "Failed to insert order");
        ServiceError::db_error(e)
    })?;

    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        let model = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_name: Set(item.product_name),
            specification: Set(item.specification),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            line_total: Set(item.line_total),
            created_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        inserted.push(model);
    }

    record_history(
        conn,
        order_id,
        None,
        new_order.status,
        Some(new_order.reason),
        new_order.changed_by,
    )
    .await?;

    Ok((order, inserted))
}

/// Moves an order to `target`, enforcing the lifecycle and writing a history row.
///
/// The update only applies while the stored status and version still match `order`; a
/// concurrent change makes it fail with [`ServiceError::Conflict`].
pub(crate) async fn transition_order<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    target: OrderStatus,
    reason: Option<String>,
    changed_by: Option<String>,
) -> Result<order::Model, ServiceError> {
    let current = stored_status(&order)?;
    if current == target {
        return Err(ServiceError::InvalidStatus(format!(
            "Order {} is already {}",
            order.order_number, current
        )));
    }
    if !current.can_transition_to(target) {
        let allowed: Vec<String> = current
            .allowed_transitions()
            .iter()
            .map(|s| s.to_string())
            .collect();
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot move order {} from {} to {} (allowed: {})",
            order.order_number,
            current,
            target,
            if allowed.is_empty() {
                "none".to_string()
            } else {
                allowed.join(", ")
            }
        )));
    }

    let order_id = order.id;
    let now = Utc::now();
    let result = OrderEntity::update_many()
        .col_expr(order::Column::Status, Expr::value(target.to_string()))
        .col_expr(order::Column::Version, Expr::value(order.version + 1))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(current.to_string()))
        .filter(order::Column::Version.eq(order.version))
        .exec(conn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::db_error(e)
        })?;
    if result.rows_affected == 0 {
        warn!(order_id = %order_id, from = %current, to = %target, "Order changed concurrently");
        return Err(ServiceError::Conflict(format!(
            "Order {} changed while moving from {} to {}; reload and retry",
            order.order_number, current, target
        )));
    }

    let updated = order::Model {
        status: target.to_string(),
        version: order.version + 1,
        updated_at: now,
        ..order
    };
    record_history(conn, order_id, Some(current), target, reason, changed_by).await?;
    counter!("orders.status_transitions", 1, "to" => target.to_string());
    Ok(updated)
}

/// Order lifecycle operations.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
    tax_rate: Decimal,
    currency: String,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Option<EventSender>,
        tax_rate: Decimal,
        currency: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            tax_rate,
            currency,
        }
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    async fn load_items(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Creates an order directly, without a quotation.
    #[instrument(skip(self, request), fields(customer_email = %request.customer_email))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderDetailResponse, ServiceError> {
        request.validate()?;
        if request.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "An order needs at least one item".to_string(),
            ));
        }
        let mut items = Vec::with_capacity(request.items.len());
        for item in request.items {
            item.validate()?;
            if item.unit_price < Decimal::ZERO {
                return Err(ServiceError::InvalidInput(format!(
                    "Unit price must not be negative, got: {}",
                    item.unit_price
                )));
            }
            let total = match item.line_total {
                Some(total) => total,
                None => line_total(item.quantity, item.unit_price)?,
            };
            items.push(NewOrderItem {
                line_total: total,
                product_name: item.product_name,
                specification: item.specification,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let (order, items) = insert_order(
            &txn,
            NewOrder {
                quotation_id: None,
                customer_name: request.customer_name,
                customer_email: request.customer_email,
                company_name: request.company_name,
                status: OrderStatus::Pending,
                currency: self.currency.clone(),
                notes: request.notes,
                shipping_address: request.shipping_address,
                requested_delivery_date: request.requested_delivery_date,
                reason: "Order created".to_string(),
                changed_by: request.created_by,
            },
            items,
            self.tax_rate,
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_id = %order.id, order_number = %order.order_number, "Order created");
        counter!("orders.created", 1);
        self.publish(Event::OrderCreated(order.id)).await;

        Ok(OrderDetailResponse {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetailResponse, ServiceError> {
        let order = find_order(&*self.db, order_id).await?;
        let items = self.load_items(order_id).await?;
        Ok(OrderDetailResponse {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    /// Newest first. `page` is 1-based.
    #[instrument(skip(self, filter))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<OrderResponse>, u64), ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = filter.status.as_deref() {
            let status = OrderStatus::parse(status)
                .ok_or_else(|| ServiceError::InvalidInput(format!("Unknown status: {}", status)))?;
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }
        if let Some(email) = filter.customer_email {
            query = query.filter(order::Column::CustomerEmail.eq(email));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((orders.into_iter().map(Into::into).collect(), total))
    }

    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        let target = OrderStatus::parse(&request.status).ok_or_else(|| {
            ServiceError::InvalidInput(format!("Unknown status: {}", request.status))
        })?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, order_id).await?;
        let old_status = order.status.clone();
        let updated =
            transition_order(&txn, order, target, request.reason, request.changed_by).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_id = %order_id, old_status = %old_status, new_status = %updated.status, "Order status updated");
        self.publish(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: updated.status.clone(),
        })
        .await;
        if target == OrderStatus::Cancelled {
            self.publish(Event::OrderCancelled(order_id)).await;
        }

        Ok(updated.into())
    }

    #[instrument(skip(self, request))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        request: CancelOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let order = find_order(&*self.db, order_id).await?;
        let status = stored_status(&order)?;
        if !status.is_cancellable() {
            warn!(order_id = %order_id, status = %status, "Cancellation refused");
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} cannot be cancelled in status {}",
                order.order_number, status
            )));
        }

        self.update_status(
            order_id,
            UpdateOrderStatusRequest {
                status: OrderStatus::Cancelled.to_string(),
                reason: request.reason,
                changed_by: request.changed_by,
            },
        )
        .await
    }

    /// Copies the items of an existing order into a new `PENDING` order.
    #[instrument(skip(self, request))]
    pub async fn reorder(
        &self,
        order_id: Uuid,
        request: ReorderRequest,
    ) -> Result<OrderDetailResponse, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let source = find_order(&txn, order_id).await?;
        let source_items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if source_items.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} has no items to reorder",
                source.order_number
            )));
        }

        let (order, items) = insert_order(
            &txn,
            NewOrder {
                quotation_id: None,
                customer_name: source.customer_name.clone(),
                customer_email: source.customer_email.clone(),
                company_name: source.company_name.clone(),
                status: OrderStatus::Pending,
                currency: source.currency.clone(),
                notes: None,
                shipping_address: source.shipping_address.clone(),
                requested_delivery_date: None,
                reason: format!("Reorder of {}", source.order_number),
                changed_by: request.changed_by,
            },
            source_items.iter().map(NewOrderItem::from).collect(),
            self.tax_rate,
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(source_order = %source.order_number, order_number = %order.order_number, "Order reordered");
        counter!("orders.reordered", 1);
        self.publish(Event::OrderCreated(order.id)).await;

        Ok(OrderDetailResponse {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    /// Notes, address and delivery date may change until the work order is issued.
    #[instrument(skip(self, request))]
    pub async fn update_details(
        &self,
        order_id: Uuid,
        request: UpdateOrderDetailsRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        let order = find_order(&*self.db, order_id).await?;
        let status = stored_status(&order)?;
        let editable = matches!(
            status,
            OrderStatus::Pending | OrderStatus::Quotation | OrderStatus::DataReceived
        );
        if !editable {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} can no longer be edited in status {}",
                order.order_number, status
            )));
        }

        let mut active: order::ActiveModel = order.into();
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(address) = request.shipping_address {
            active.shipping_address = Set(Some(address));
        }
        if let Some(date) = request.requested_delivery_date {
            active.requested_delivery_date = Set(Some(date));
        }
        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(updated.into())
    }

    /// Oldest first.
    #[instrument(skip(self))]
    pub async fn status_history(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderStatusHistoryResponse>, ServiceError> {
        find_order(&*self.db, order_id).await?;
        let rows = OrderStatusHistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    async fn seeded_order(db: &DatabaseConnection) -> order::Model {
        let (order, _) = insert_order(
            db,
            NewOrder {
                quotation_id: None,
                customer_name: "Sato Hanako".to_string(),
                customer_email: "sato@example.com".to_string(),
                company_name: None,
                status: OrderStatus::Pending,
                currency: "JPY".to_string(),
                notes: None,
                shipping_address: None,
                requested_delivery_date: None,
                reason: "Order created".to_string(),
                changed_by: None,
            },
            vec![NewOrderItem {
                product_name: "Stand-up pouch".to_string(),
                specification: None,
                quantity: 1000,
                unit_price: dec!(45),
                line_total: dec!(45000),
            }],
            dec!(0.10),
        )
        .await
        .unwrap();
        order
    }

    #[tokio::test]
    async fn stale_order_cannot_transition_twice() {
        let db = crate::db::establish_connection("sqlite::memory:").await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        let order = seeded_order(&db).await;

        let moved = transition_order(&db, order.clone(), OrderStatus::Quotation, None, None)
            .await
            .unwrap();
        assert_eq!(moved.status, "QUOTATION");
        assert_eq!(moved.version, order.version + 1);

        // the same snapshot again, as a second concurrent caller would hold it
        assert_matches!(
            transition_order(&db, order.clone(), OrderStatus::Cancelled, None, None).await,
            Err(ServiceError::Conflict(_))
        );

        let stored = find_order(&db, order.id).await.unwrap();
        assert_eq!(stored.status, "QUOTATION");
        assert_eq!(stored.version, moved.version);
        let history = OrderStatusHistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(history, 2);
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "LOYW3V28");
    }

    #[test]
    fn order_numbers_are_unique_within_a_millisecond() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let first = next_order_number(now);
        let second = next_order_number(now);
        assert!(first.starts_with("ORD-2025-"));
        assert_ne!(first, second);
    }

    #[test]
    fn progress_reflects_status() {
        let progress = OrderProgress::from(OrderStatus::ContractSigned);
        assert_eq!(progress.progress_percent, 50);
        assert_eq!(progress.phase, Some(OrderPhase::Preparation));
        assert_eq!(
            progress.allowed_transitions,
            vec![OrderStatus::Production, OrderStatus::Cancelled]
        );
        assert_eq!(progress.legacy_status, "processing");
    }
}
