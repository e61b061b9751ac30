use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        order,
        work_order::{self, Entity as WorkOrderEntity},
        work_order_action::{self, Entity as WorkOrderActionEntity},
        work_order_stage::{self, Entity as WorkOrderStageEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        production::PRODUCTION_STAGES, OrderStatus, Priority, ProductionStage, StageAction,
        StageStatus, WorkOrderStatus,
    },
    services::{
        orders::{find_order, stored_status, transition_order},
        production_estimator::{self, ProductionEstimate, StageProgress, WorkingCalendar},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkOrderRequest {
    pub order_id: Uuid,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdvanceStageRequest {
    pub performed_by: Option<String>,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct RollbackStageRequest {
    pub performed_by: Option<String>,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddStageNoteRequest {
    #[validate(length(min = 1, max = 2000, message = "Note must not be empty"))]
    pub note: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignStageRequest {
    #[validate(length(min = 1, max = 100, message = "Assignee is required"))]
    pub assignee: String,
    pub assigned_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderStageResponse {
    pub stage: String,
    pub name_ja: String,
    pub sequence: i32,
    pub status: String,
    pub assigned_to: Option<String>,
    pub notes: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
}

impl From<work_order_stage::Model> for WorkOrderStageResponse {
    fn from(model: work_order_stage::Model) -> Self {
        let name_ja = ProductionStage::parse(&model.stage)
            .map(|s| s.name_ja().to_string())
            .unwrap_or_default();
        Self {
            name_ja,
            notes: model
                .notes
                .as_deref()
                .map(|n| n.lines().map(str::to_string).collect())
                .unwrap_or_default(),
            stage: model.stage,
            sequence: model.sequence,
            status: model.status,
            assigned_to: model.assigned_to,
            started_at: model.started_at,
            completed_at: model.completed_at,
            completed_by: model.completed_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderResponse {
    pub id: Uuid,
    pub work_order_number: String,
    pub order_id: Uuid,
    pub current_stage: String,
    pub status: String,
    pub priority: String,
    pub notes: Option<String>,
    pub progress_percent: u8,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub stages: Vec<WorkOrderStageResponse>,
}

impl WorkOrderResponse {
    fn new(work_order: work_order::Model, stages: Vec<work_order_stage::Model>) -> Self {
        let completed = stages
            .iter()
            .filter(|s| s.status == StageStatus::Completed.as_ref())
            .count();
        let progress_percent = if stages.is_empty() {
            0
        } else {
            ((completed as f64 / stages.len() as f64) * 100.0).round() as u8
        };
        Self {
            id: work_order.id,
            work_order_number: work_order.work_order_number,
            order_id: work_order.order_id,
            current_stage: work_order.current_stage,
            status: work_order.status,
            priority: work_order.priority,
            notes: work_order.notes,
            progress_percent,
            started_at: work_order.started_at,
            completed_at: work_order.completed_at,
            created_at: work_order.created_at,
            updated_at: work_order.updated_at,
            stages: stages.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderActionResponse {
    pub id: Uuid,
    pub stage: String,
    pub action: String,
    pub performed_by: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<work_order_action::Model> for WorkOrderActionResponse {
    fn from(model: work_order_action::Model) -> Self {
        Self {
            id: model.id,
            stage: model.stage,
            action: model.action,
            performed_by: model.performed_by,
            detail: model.detail,
            created_at: model.created_at,
        }
    }
}

fn parse_stage(value: &str) -> Result<ProductionStage, ServiceError> {
    ProductionStage::parse(value)
        .ok_or_else(|| ServiceError::InvalidInput(format!("Unknown production stage: {}", value)))
}

fn append_note(existing: Option<String>, author: Option<&str>, note: &str, at: DateTime<Utc>) -> String {
    let line = format!(
        "[{}] {}: {}",
        at.format("%Y-%m-%d %H:%M"),
        author.unwrap_or("system"),
        note.replace('\n', " ")
    );
    match existing {
        Some(notes) if !notes.is_empty() => format!("{}\n{}", notes, line),
        _ => line,
    }
}

async fn record_action<C: ConnectionTrait>(
    conn: &C,
    work_order_id: Uuid,
    stage: ProductionStage,
    action: StageAction,
    performed_by: Option<String>,
    detail: Option<String>,
) -> Result<(), ServiceError> {
    work_order_action::ActiveModel {
        id: Set(Uuid::new_v4()),
        work_order_id: Set(work_order_id),
        stage: Set(stage.to_string()),
        action: Set(action.to_string()),
        performed_by: Set(performed_by),
        detail: Set(detail),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;
    Ok(())
}

/// Moves the order to `target` when it currently sits at `expected`; otherwise leaves it alone.
async fn move_order_if<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    expected: OrderStatus,
    target: OrderStatus,
    reason: &str,
    changed_by: Option<String>,
) -> Result<Option<Event>, ServiceError> {
    if stored_status(&order)? != expected {
        return Ok(None);
    }
    let order_id = order.id;
    let updated = transition_order(conn, order, target, Some(reason.to_string()), changed_by).await?;
    Ok(Some(Event::OrderStatusChanged {
        order_id,
        old_status: expected.to_string(),
        new_status: updated.status,
    }))
}

/// Production tracking through the nine manufacturing stages.
#[derive(Clone)]
pub struct WorkOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
    calendar: WorkingCalendar,
}

impl WorkOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self {
            db,
            event_sender,
            calendar: WorkingCalendar::default(),
        }
    }

    async fn publish_all(&self, events: Vec<Event>) {
        if let Some(sender) = &self.event_sender {
            for event in events {
                sender.send_or_log(event).await;
            }
        }
    }

    async fn find_work_order<C: ConnectionTrait>(
        conn: &C,
        work_order_id: Uuid,
    ) -> Result<work_order::Model, ServiceError> {
        WorkOrderEntity::find_by_id(work_order_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {} not found", work_order_id)))
    }

    async fn load_stages<C: ConnectionTrait>(
        conn: &C,
        work_order_id: Uuid,
    ) -> Result<Vec<work_order_stage::Model>, ServiceError> {
        WorkOrderStageEntity::find()
            .filter(work_order_stage::Column::WorkOrderId.eq(work_order_id))
            .order_by_asc(work_order_stage::Column::Sequence)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    fn stage_row(
        stages: &[work_order_stage::Model],
        stage: ProductionStage,
    ) -> Result<work_order_stage::Model, ServiceError> {
        stages
            .iter()
            .find(|row| row.stage == stage.as_ref())
            .cloned()
            .ok_or_else(|| ServiceError::InternalError(format!("Stage row {} missing", stage)))
    }

    fn current_stage(work_order: &work_order::Model) -> Result<ProductionStage, ServiceError> {
        ProductionStage::parse(&work_order.current_stage).ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Work order {} has unrecognised stage {}",
                work_order.id, work_order.current_stage
            ))
        })
    }

    async fn detail<C: ConnectionTrait>(
        conn: &C,
        work_order: work_order::Model,
    ) -> Result<WorkOrderResponse, ServiceError> {
        let stages = Self::load_stages(conn, work_order.id).await?;
        Ok(WorkOrderResponse::new(work_order, stages))
    }

    /// Issues the work order for an order; issuing twice returns the existing one.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_work_order(
        &self,
        request: CreateWorkOrderRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, request.order_id).await?;

        if let Some(existing) = WorkOrderEntity::find()
            .filter(work_order::Column::OrderId.eq(order.id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
        {
            return Self::detail(&txn, existing).await;
        }

        let status = stored_status(&order)?;
        if matches!(
            status,
            OrderStatus::Cancelled | OrderStatus::StockIn | OrderStatus::Shipped | OrderStatus::Delivered
        ) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot start production for order {} in status {}",
                order.order_number, status
            )));
        }

        let now = Utc::now();
        let work_order_id = Uuid::new_v4();
        let priority = request.priority.unwrap_or_default();
        let work_order = work_order::ActiveModel {
            id: Set(work_order_id),
            work_order_number: Set(format!(
                "WO-{}",
                order.order_number.trim_start_matches("ORD-")
            )),
            order_id: Set(order.id),
            current_stage: Set(ProductionStage::Design.to_string()),
            status: Set(WorkOrderStatus::InProgress.to_string()),
            priority: Set(priority.to_string()),
            notes: Set(request.notes),
            started_at: Set(now),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        for (sequence, stage) in PRODUCTION_STAGES.iter().enumerate() {
            let first = sequence == 0;
            work_order_stage::ActiveModel {
                id: Set(Uuid::new_v4()),
                work_order_id: Set(work_order_id),
                stage: Set(stage.to_string()),
                sequence: Set(sequence as i32),
                status: Set(if first {
                    StageStatus::InProgress.to_string()
                } else {
                    StageStatus::Pending.to_string()
                }),
                assigned_to: Set(None),
                notes: Set(None),
                started_at: Set(first.then_some(now)),
                completed_at: Set(None),
                completed_by: Set(None),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        }

        let mut events = vec![Event::WorkOrderCreated {
            work_order_id,
            order_id: order.id,
        }];
        let order_id = order.id;
        if let Some(event) = move_order_if(
            &txn,
            order,
            OrderStatus::DataReceived,
            OrderStatus::WorkOrder,
            "Work order issued",
            request.created_by,
        )
        .await?
        {
            events.push(event);
        }

        let response = Self::detail(&txn, work_order).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(work_order_id = %work_order_id, order_id = %order_id, priority = %priority, "Work order created");
        counter!("work_orders.created", 1);
        self.publish_all(events).await;
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn get_work_order(&self, work_order_id: Uuid) -> Result<WorkOrderResponse, ServiceError> {
        let work_order = Self::find_work_order(&*self.db, work_order_id).await?;
        Self::detail(&*self.db, work_order).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_order(&self, order_id: Uuid) -> Result<WorkOrderResponse, ServiceError> {
        let work_order = WorkOrderEntity::find()
            .filter(work_order::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No work order for order {}", order_id))
            })?;
        Self::detail(&*self.db, work_order).await
    }

    /// Completes the current stage and starts the next one, or completes the work order.
    #[instrument(skip(self, request))]
    pub async fn advance_stage(
        &self,
        work_order_id: Uuid,
        request: AdvanceStageRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let work_order = Self::find_work_order(&txn, work_order_id).await?;
        if work_order.status == WorkOrderStatus::Completed.as_ref() {
            return Err(ServiceError::InvalidOperation(format!(
                "Work order {} is already completed",
                work_order.work_order_number
            )));
        }

        let now = Utc::now();
        let current = Self::current_stage(&work_order)?;
        let next = current.next();
        let stages = Self::load_stages(&txn, work_order_id).await?;

        let current_row = Self::stage_row(&stages, current)?;
        let existing_notes = current_row.notes.clone();
        let mut active: work_order_stage::ActiveModel = current_row.into();
        active.status = Set(StageStatus::Completed.to_string());
        active.completed_at = Set(Some(now));
        active.completed_by = Set(request.performed_by.clone());
        if let Some(note) = request.note.as_deref().filter(|n| !n.trim().is_empty()) {
            active.notes = Set(Some(append_note(
                existing_notes,
                request.performed_by.as_deref(),
                note,
                now,
            )));
        }
        active.update(&txn).await.map_err(ServiceError::db_error)?;

        let order_id = work_order.order_id;
        let mut work_order_active: work_order::ActiveModel = work_order.into();
        match next {
            Some(next_stage) => {
                let mut next_row: work_order_stage::ActiveModel =
                    Self::stage_row(&stages, next_stage)?.into();
                next_row.status = Set(StageStatus::InProgress.to_string());
                next_row.started_at = Set(Some(now));
                next_row.completed_at = Set(None);
                next_row.completed_by = Set(None);
                next_row.update(&txn).await.map_err(ServiceError::db_error)?;
                work_order_active.current_stage = Set(next_stage.to_string());
            }
            None => {
                work_order_active.status = Set(WorkOrderStatus::Completed.to_string());
                work_order_active.completed_at = Set(Some(now));
            }
        }
        let work_order = work_order_active
            .update(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        record_action(
            &txn,
            work_order_id,
            current,
            StageAction::Advanced,
            request.performed_by.clone(),
            Some(match next {
                Some(next_stage) => format!("{} -> {}", current, next_stage),
                None => format!("{} -> completed", current),
            }),
        )
        .await?;

        let mut events = vec![Event::ProductionStageAdvanced {
            work_order_id,
            from_stage: current.to_string(),
            to_stage: next.map(|s| s.to_string()),
        }];

        let order = find_order(&txn, order_id).await?;
        if current.is_first() {
            if let Some(event) = move_order_if(
                &txn,
                order,
                OrderStatus::ContractSigned,
                OrderStatus::Production,
                "Production started",
                request.performed_by.clone(),
            )
            .await?
            {
                events.push(event);
            }
        } else if next.is_none() {
            events.push(Event::ProductionCompleted {
                work_order_id,
                order_id,
            });
            if let Some(event) = move_order_if(
                &txn,
                order,
                OrderStatus::Production,
                OrderStatus::StockIn,
                "Production completed",
                request.performed_by.clone(),
            )
            .await?
            {
                events.push(event);
            }
        }

        let response = Self::detail(&txn, work_order).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(work_order_id = %work_order_id, from = %current, to = ?next, "Production stage advanced");
        counter!("work_orders.stage_advanced", 1, "stage" => current.to_string());
        self.publish_all(events).await;
        Ok(response)
    }

    /// Reopens the previous stage and resets the current one to pending.
    #[instrument(skip(self, request))]
    pub async fn rollback_stage(
        &self,
        work_order_id: Uuid,
        request: RollbackStageRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let work_order = Self::find_work_order(&txn, work_order_id).await?;
        if work_order.status == WorkOrderStatus::Completed.as_ref() {
            return Err(ServiceError::InvalidOperation(format!(
                "Work order {} is completed and cannot be rolled back",
                work_order.work_order_number
            )));
        }

        let current = Self::current_stage(&work_order)?;
        let previous = current.previous().ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Work order {} is at the first stage",
                work_order.work_order_number
            ))
        })?;
        let stages = Self::load_stages(&txn, work_order_id).await?;
        let now = Utc::now();

        let mut current_row: work_order_stage::ActiveModel =
            Self::stage_row(&stages, current)?.into();
        current_row.status = Set(StageStatus::Pending.to_string());
        current_row.started_at = Set(None);
        current_row.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut previous_row: work_order_stage::ActiveModel =
            Self::stage_row(&stages, previous)?.into();
        previous_row.status = Set(StageStatus::InProgress.to_string());
        previous_row.started_at = Set(Some(now));
        previous_row.completed_at = Set(None);
        previous_row.completed_by = Set(None);
        previous_row.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut work_order_active: work_order::ActiveModel = work_order.into();
        work_order_active.current_stage = Set(previous.to_string());
        let work_order = work_order_active
            .update(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        record_action(
            &txn,
            work_order_id,
            current,
            StageAction::RolledBack,
            request.performed_by,
            Some(match request.reason {
                Some(reason) => format!("{} -> {}: {}", current, previous, reason),
                None => format!("{} -> {}", current, previous),
            }),
        )
        .await?;

        let response = Self::detail(&txn, work_order).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(work_order_id = %work_order_id, from = %current, to = %previous, "Production stage rolled back");
        counter!("work_orders.stage_rolled_back", 1);
        self.publish_all(vec![Event::ProductionStageRolledBack {
            work_order_id,
            from_stage: current.to_string(),
            to_stage: previous.to_string(),
        }])
        .await;
        Ok(response)
    }

    #[instrument(skip(self, request))]
    pub async fn add_note(
        &self,
        work_order_id: Uuid,
        stage: &str,
        request: AddStageNoteRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        request.validate()?;
        let stage = parse_stage(stage)?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let work_order = Self::find_work_order(&txn, work_order_id).await?;
        let stages = Self::load_stages(&txn, work_order_id).await?;

        let row = Self::stage_row(&stages, stage)?;
        let existing = row.notes.clone();
        let mut active: work_order_stage::ActiveModel = row.into();
        active.notes = Set(Some(append_note(
            existing,
            request.author.as_deref(),
            &request.note,
            Utc::now(),
        )));
        active.update(&txn).await.map_err(ServiceError::db_error)?;

        record_action(
            &txn,
            work_order_id,
            stage,
            StageAction::NoteAdded,
            request.author,
            Some(request.note),
        )
        .await?;

        let response = Self::detail(&txn, work_order).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(response)
    }

    #[instrument(skip(self, request), fields(assignee = %request.assignee))]
    pub async fn assign_stage(
        &self,
        work_order_id: Uuid,
        stage: &str,
        request: AssignStageRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        request.validate()?;
        let stage = parse_stage(stage)?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let work_order = Self::find_work_order(&txn, work_order_id).await?;
        let stages = Self::load_stages(&txn, work_order_id).await?;

        let mut active: work_order_stage::ActiveModel = Self::stage_row(&stages, stage)?.into();
        active.assigned_to = Set(Some(request.assignee.clone()));
        active.update(&txn).await.map_err(ServiceError::db_error)?;

        record_action(
            &txn,
            work_order_id,
            stage,
            StageAction::Assigned,
            request.assigned_by,
            Some(request.assignee),
        )
        .await?;

        let response = Self::detail(&txn, work_order).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(response)
    }

    /// Oldest first.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        work_order_id: Uuid,
    ) -> Result<Vec<WorkOrderActionResponse>, ServiceError> {
        Self::find_work_order(&*self.db, work_order_id).await?;
        let rows = WorkOrderActionEntity::find()
            .filter(work_order_action::Column::WorkOrderId.eq(work_order_id))
            .order_by_asc(work_order_action::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn estimate(&self, work_order_id: Uuid) -> Result<ProductionEstimate, ServiceError> {
        self.estimate_at(work_order_id, Utc::now()).await
    }

    pub async fn estimate_at(
        &self,
        work_order_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ProductionEstimate, ServiceError> {
        let work_order = Self::find_work_order(&*self.db, work_order_id).await?;
        let current = Self::current_stage(&work_order)?;
        let priority = work_order
            .priority
            .parse::<Priority>()
            .unwrap_or_default();
        let stages = Self::load_stages(&*self.db, work_order_id).await?;

        let progress = stages
            .iter()
            .filter_map(|row| {
                let stage = ProductionStage::parse(&row.stage)?;
                let status = row.status.parse::<StageStatus>().ok()?;
                Some(StageProgress {
                    stage,
                    status,
                    started_at: row.started_at,
                    completed_at: row.completed_at,
                })
            })
            .collect::<Vec<_>>();

        Ok(production_estimator::estimate(
            &progress,
            current,
            priority,
            now,
            &self.calendar,
        ))
    }
}
