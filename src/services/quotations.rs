use chrono::{DateTime, Datelike, Duration, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
        quotation::{self, Entity as QuotationEntity},
        quotation_item::{self, Entity as QuotationItemEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderStatus, QuotationStatus},
    services::{
        orders::{insert_order, NewOrder, NewOrderItem, OrderDetailResponse},
        pricing::{unified::QuoteRequest, PricingService},
    },
};

const HUNDRED: Decimal = dec!(100);

fn out_of_range(what: &str) -> ServiceError {
    ServiceError::InvalidInput(format!("{what} is too large to calculate"))
}

fn ceil_to_hundred(value: Decimal) -> Result<Decimal, ServiceError> {
    (value / HUNDRED)
        .ceil()
        .checked_mul(HUNDRED)
        .ok_or_else(|| out_of_range("Amount"))
}

pub fn line_total(quantity: i32, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .ok_or_else(|| out_of_range("Line total"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Subtotal and total are rounded up to the next 100 yen, tax up to the next yen.
pub fn calculate_totals(
    line_totals: impl IntoIterator<Item = Decimal>,
    tax_rate: Decimal,
) -> Result<DocumentTotals, ServiceError> {
    let sum = line_totals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line))
        .ok_or_else(|| out_of_range("Subtotal"))?;
    let subtotal = ceil_to_hundred(sum)?;
    let tax_amount = subtotal
        .checked_mul(tax_rate)
        .ok_or_else(|| out_of_range("Tax"))?
        .ceil();
    let total = subtotal
        .checked_add(tax_amount)
        .ok_or_else(|| out_of_range("Total"))?;
    Ok(DocumentTotals {
        subtotal,
        tax_amount,
        total_amount: ceil_to_hundred(total)?,
    })
}

pub fn format_quotation_number(year: i32, sequence: u32) -> String {
    format!("QT-{}-{:04}", year, sequence)
}

/// Sequence following the highest numeric suffix under `prefix`.
///
/// Suffixes are compared as numbers, so `QT-2025-10000` follows `QT-2025-9999`.
fn next_sequence<'a>(prefix: &str, numbers: impl IntoIterator<Item = &'a str>) -> u32 {
    numbers
        .into_iter()
        .filter_map(|number| number.strip_prefix(prefix)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}

async fn next_quotation_number<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let prefix = format!("QT-{}-", now.year());
    let numbers: Vec<String> = QuotationEntity::find()
        .select_only()
        .column(quotation::Column::QuotationNumber)
        .filter(quotation::Column::QuotationNumber.starts_with(&prefix))
        .into_tuple()
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let sequence = next_sequence(&prefix, numbers.iter().map(String::as_str));
    Ok(format_quotation_number(now.year(), sequence))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuotationItemInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub product_name: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    /// When absent the item is priced from `specification`.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub line_total: Option<Decimal>,
    #[serde(default)]
    pub specification: Option<QuoteRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateQuotationRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: String,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<QuotationItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateQuotationStatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConvertQuotationRequest {
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuotationFilter {
    pub status: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotationResponse {
    pub id: Uuid,
    pub quotation_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub valid_until: DateTime<Utc>,
    pub is_expired: bool,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<quotation::Model> for QuotationResponse {
    fn from(model: quotation::Model) -> Self {
        let is_expired = model.order_id.is_none() && model.valid_until < Utc::now();
        Self {
            id: model.id,
            quotation_number: model.quotation_number,
            customer_name: model.customer_name,
            customer_email: model.customer_email,
            company_name: model.company_name,
            phone: model.phone,
            status: model.status,
            subtotal: model.subtotal,
            tax_amount: model.tax_amount,
            total_amount: model.total_amount,
            currency: model.currency,
            notes: model.notes,
            valid_until: model.valid_until,
            is_expired,
            order_id: model.order_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotationItemResponse {
    pub id: Uuid,
    pub product_name: String,
    #[schema(value_type = Option<Object>)]
    pub specification: Option<serde_json::Value>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<quotation_item::Model> for QuotationItemResponse {
    fn from(model: quotation_item::Model) -> Self {
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

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotationDetailResponse {
    #[serde(flatten)]
    pub quotation: QuotationResponse,
    pub items: Vec<QuotationItemResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversionResponse {
    pub quotation_id: Uuid,
    pub order: OrderDetailResponse,
    /// True when the quotation had already been converted and the existing order is returned.
    pub already_converted: bool,
}

/// A line ready to be stored.
struct PricedItem {
    product_name: String,
    specification: Option<serde_json::Value>,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

/// Quotations and their conversion into orders.
#[derive(Clone)]
pub struct QuotationService {
    db: Arc<DatabaseConnection>,
    pricing: PricingService,
    event_sender: Option<EventSender>,
    currency: String,
}

impl QuotationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        pricing: PricingService,
        event_sender: Option<EventSender>,
        currency: String,
    ) -> Self {
        Self {
            db,
            pricing,
            event_sender,
            currency,
        }
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    fn price_item(&self, item: QuotationItemInput) -> Result<PricedItem, ServiceError> {
        item.validate()?;
        let specification = item
            .specification
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let (unit_price, priced_total) = match (item.unit_price, item.specification) {
            (Some(price), _) => {
                if price < Decimal::ZERO {
                    return Err(ServiceError::InvalidInput(format!(
                        "Unit price must not be negative, got: {}",
                        price
                    )));
                }
                (price, None)
            }
            (None, Some(mut spec)) => {
                if spec.quantity == 0 && spec.sku_quantities.is_none() {
                    spec.quantity = u32::try_from(item.quantity).unwrap_or_default();
                }
                let quote = self.pricing.calculate_quote(&spec)?;
                debug!(product = %item.product_name, unit_price = %quote.unit_price, "Item priced by quote engine");
                (quote.unit_price, Some(quote.total_price))
            }
            (None, None) => {
                return Err(ServiceError::InvalidInput(format!(
                    "Item {} needs a unit price or a specification",
                    item.product_name
                )))
            }
        };

        let line_total = match item.line_total.or(priced_total) {
            Some(total) => total,
            None => line_total(item.quantity, unit_price)?,
        };

        Ok(PricedItem {
            product_name: item.product_name,
            specification,
            quantity: item.quantity,
            unit_price,
            line_total,
        })
    }

    async fn load_items(&self, quotation_id: Uuid) -> Result<Vec<quotation_item::Model>, ServiceError> {
        QuotationItemEntity::find()
            .filter(quotation_item::Column::QuotationId.eq(quotation_id))
            .order_by_asc(quotation_item::Column::Position)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, request), fields(customer_email = %request.customer_email, items = request.items.len()))]
    pub async fn create_quotation(
        &self,
        request: CreateQuotationRequest,
    ) -> Result<QuotationDetailResponse, ServiceError> {
        request.validate()?;
        if request.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "A quotation needs at least one item".to_string(),
            ));
        }

        let config = self.pricing.config();
        let priced = request
            .items
            .into_iter()
            .map(|item| self.price_item(item))
            .collect::<Result<Vec<_>, _>>()?;
        let totals = calculate_totals(priced.iter().map(|i| i.line_total), config.consumption_tax_rate)?;

        let now = Utc::now();
        let quotation_id = Uuid::new_v4();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let quotation_number = next_quotation_number(&txn, now).await?;

        let quotation = quotation::ActiveModel {
            id: Set(quotation_id),
            quotation_number: Set(quotation_number),
            customer_name: Set(request.customer_name),
            customer_email: Set(request.customer_email),
            company_name: Set(request.company_name),
            phone: Set(request.phone),
            status: Set(QuotationStatus::QuotationPending.to_string()),
            subtotal: Set(totals.subtotal),
            tax_amount: Set(totals.tax_amount),
            total_amount: Set(totals.total_amount),
            currency: Set(self.currency.clone()),
            notes: Set(request.notes),
            valid_until: Set(now + Duration::days(config.quote_validity_days)),
            order_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(priced.len());
        for (position, item) in priced.into_iter().enumerate() {
            let model = quotation_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                quotation_id: Set(quotation_id),
                product_name: Set(item.product_name),
                specification: Set(item.specification),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                line_total: Set(item.line_total),
                position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(model);
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(quotation_number = %quotation.quotation_number, total = %quotation.total_amount, "Quotation created");
        counter!("quotations.created", 1);
        self.publish(Event::QuotationCreated {
            quotation_id,
            quotation_number: quotation.quotation_number.clone(),
            total_amount: quotation.total_amount,
        })
        .await;

        Ok(QuotationDetailResponse {
            quotation: quotation.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    async fn find_quotation<C: ConnectionTrait>(
        conn: &C,
        quotation_id: Uuid,
    ) -> Result<quotation::Model, ServiceError> {
        QuotationEntity::find_by_id(quotation_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quotation {} not found", quotation_id)))
    }

    #[instrument(skip(self))]
    pub async fn get_quotation(
        &self,
        quotation_id: Uuid,
    ) -> Result<QuotationDetailResponse, ServiceError> {
        let quotation = Self::find_quotation(&*self.db, quotation_id).await?;
        let items = self.load_items(quotation_id).await?;
        Ok(QuotationDetailResponse {
            quotation: quotation.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    /// Newest first. `page` is 1-based.
    #[instrument(skip(self, filter))]
    pub async fn list_quotations(
        &self,
        filter: QuotationFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<QuotationResponse>, u64), ServiceError> {
        let mut query = QuotationEntity::find();
        if let Some(status) = filter.status.as_deref() {
            let status = QuotationStatus::parse(status)
                .ok_or_else(|| ServiceError::InvalidInput(format!("Unknown status: {}", status)))?;
            query = query.filter(quotation::Column::Status.eq(status.to_string()));
        }
        if let Some(email) = filter.customer_email {
            query = query.filter(quotation::Column::CustomerEmail.eq(email));
        }

        let paginator = query
            .order_by_desc(quotation::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn update_status(
        &self,
        quotation_id: Uuid,
        request: UpdateQuotationStatusRequest,
    ) -> Result<QuotationResponse, ServiceError> {
        request.validate()?;
        let target = QuotationStatus::parse(&request.status).ok_or_else(|| {
            ServiceError::InvalidInput(format!("Unknown quotation status: {}", request.status))
        })?;
        if target == QuotationStatus::Converted {
            return Err(ServiceError::InvalidOperation(
                "Quotations become CONVERTED only through conversion to an order".to_string(),
            ));
        }

        let quotation = Self::find_quotation(&*self.db, quotation_id).await?;
        let current = QuotationStatus::parse(&quotation.status);
        if current.map_or(false, |s| s.is_terminal()) {
            return Err(ServiceError::InvalidOperation(format!(
                "Quotation {} has already been converted",
                quotation.quotation_number
            )));
        }
        if current == Some(target) {
            return Ok(quotation.into());
        }

        let old_status = quotation.status.clone();
        let mut active: quotation::ActiveModel = quotation.into();
        active.status = Set(target.to_string());
        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(quotation_id = %quotation_id, old_status = %old_status, new_status = %updated.status, "Quotation status updated");
        self.publish(Event::QuotationStatusChanged {
            quotation_id,
            old_status,
            new_status: updated.status.clone(),
        })
        .await;
        Ok(updated.into())
    }

    async fn existing_order(
        &self,
        quotation: &quotation::Model,
    ) -> Result<Option<order::Model>, ServiceError> {
        let query = match quotation.order_id {
            Some(order_id) => OrderEntity::find_by_id(order_id),
            None => OrderEntity::find().filter(order::Column::QuotationId.eq(quotation.id)),
        };
        query.one(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Creates an order from an approved quotation. Converting twice returns the first order.
    #[instrument(skip(self, request))]
    pub async fn convert_to_order(
        &self,
        quotation_id: Uuid,
        request: ConvertQuotationRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        let quotation = Self::find_quotation(&*self.db, quotation_id).await?;

        if let Some(order) = self.existing_order(&quotation).await? {
            debug!(order_number = %order.order_number, "Quotation already converted");
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.eq(order.id))
                .order_by_asc(order_item::Column::CreatedAt)
                .all(&*self.db)
                .await
                .map_err(ServiceError::db_error)?;
            return Ok(ConversionResponse {
                quotation_id,
                order: OrderDetailResponse {
                    order: order.into(),
                    items: items.into_iter().map(Into::into).collect(),
                },
                already_converted: true,
            });
        }

        let status = QuotationStatus::parse(&quotation.status);
        if !status.map_or(false, |s| s.can_convert()) {
            return Err(ServiceError::InvalidStatus(format!(
                "Quotation {} must be approved before conversion (current: {})",
                quotation.quotation_number, quotation.status
            )));
        }
        if quotation.valid_until < Utc::now() {
            return Err(ServiceError::InvalidOperation(format!(
                "Quotation {} expired on {}",
                quotation.quotation_number,
                quotation.valid_until.format("%Y-%m-%d")
            )));
        }

        let items = self.load_items(quotation_id).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Quotation {} has no items",
                quotation.quotation_number
            )));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let (order, order_items) = insert_order(
            &txn,
            NewOrder {
                quotation_id: Some(quotation_id),
                customer_name: quotation.customer_name.clone(),
                customer_email: quotation.customer_email.clone(),
                company_name: quotation.company_name.clone(),
                status: OrderStatus::Quotation,
                currency: quotation.currency.clone(),
                notes: request.notes.or_else(|| quotation.notes.clone()),
                shipping_address: request.shipping_address,
                requested_delivery_date: None,
                reason: format!("Converted from quotation {}", quotation.quotation_number),
                changed_by: request.changed_by,
            },
            items
                .iter()
                .map(|item| NewOrderItem {
                    product_name: item.product_name.clone(),
                    specification: item.specification.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total,
                })
                .collect(),
            self.pricing.config().consumption_tax_rate,
        )
        .await?;

        let old_status = quotation.status.clone();
        let mut active: quotation::ActiveModel = quotation.into();
        active.status = Set(QuotationStatus::Converted.to_string());
        active.order_id = Set(Some(order.id));
        active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(quotation_id = %quotation_id, order_number = %order.order_number, "Quotation converted to order");
        counter!("quotations.converted", 1);
        self.publish(Event::QuotationStatusChanged {
            quotation_id,
            old_status,
            new_status: QuotationStatus::Converted.to_string(),
        })
        .await;
        self.publish(Event::QuotationConverted {
            quotation_id,
            order_id: order.id,
        })
        .await;
        self.publish(Event::OrderCreated(order.id)).await;

        Ok(ConversionResponse {
            quotation_id,
            order: OrderDetailResponse {
                order: order.into(),
                items: order_items.into_iter().map(Into::into).collect(),
            },
            already_converted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case(vec![dec!(100000)], dec!(100000), dec!(10000), dec!(110000))]
    #[case(vec![dec!(12345)], dec!(12400), dec!(1240), dec!(13700))]
    #[case(vec![dec!(50000), dec!(33333.5)], dec!(83400), dec!(8340), dec!(91800))]
    #[case(vec![dec!(0)], dec!(0), dec!(0), dec!(0))]
    fn totals_round_up(
        #[case] lines: Vec<Decimal>,
        #[case] subtotal: Decimal,
        #[case] tax: Decimal,
        #[case] total: Decimal,
    ) {
        let totals = calculate_totals(lines, dec!(0.10)).unwrap();
        assert_eq!(totals.subtotal, subtotal);
        assert_eq!(totals.tax_amount, tax);
        assert_eq!(totals.total_amount, total);
    }

    #[test]
    fn tax_rounds_up_to_whole_yen() {
        let totals = calculate_totals([dec!(1100)], dec!(0.08)).unwrap();
        assert_eq!(totals.tax_amount, dec!(88));
        let totals = calculate_totals([dec!(1300)], dec!(0.075)).unwrap();
        // 97.5 -> 98
        assert_eq!(totals.tax_amount, dec!(98));
        assert_eq!(totals.total_amount, dec!(1400));
    }

    #[test]
    fn quotation_numbers_are_zero_padded() {
        assert_eq!(format_quotation_number(2025, 7), "QT-2025-0007");
        assert_eq!(format_quotation_number(2025, 1234), "QT-2025-1234");
    }

    #[test]
    fn sequence_continues_past_four_digits() {
        let prefix = "QT-2025-";
        assert_eq!(next_sequence(prefix, Vec::<&str>::new()), 1);
        assert_eq!(next_sequence(prefix, ["QT-2025-0001", "QT-2025-0002"]), 3);
        assert_eq!(next_sequence(prefix, ["QT-2025-9999", "QT-2025-10000"]), 10001);
        assert_eq!(next_sequence(prefix, ["QT-2025-10000", "QT-2025-9999"]), 10001);
        // unparseable suffixes are ignored
        assert_eq!(next_sequence(prefix, ["QT-2025-0042", "QT-2025-draft"]), 43);
    }

    #[test]
    fn line_total_multiplies() {
        assert_eq!(line_total(3, dec!(12.5)).unwrap(), dec!(37.5));
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        assert_matches!(
            line_total(i32::MAX, Decimal::MAX),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            calculate_totals([Decimal::MAX, Decimal::MAX], dec!(0.10)),
            Err(ServiceError::InvalidInput(_))
        );
        // the sum fits but rounding up to the next hundred does not
        assert_matches!(
            calculate_totals([Decimal::MAX], dec!(0.10)),
            Err(ServiceError::InvalidInput(_))
        );
    }
}
