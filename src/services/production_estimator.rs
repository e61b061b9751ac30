//! Completion estimates for work orders over the factory working calendar.
//!
//! Stage durations come from [`ProductionStage::duration`] scaled by the work order priority.
//! Time only accrues between 08:00 and 17:00 on weekdays, factory local time (UTC+9).

use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc, Weekday};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Priority, ProductionStage, StageStatus};

static FACTORY_OFFSET: Lazy<FixedOffset> = Lazy::new(|| FixedOffset::east_opt(9 * 3600).unwrap());

/// Hours counted as one working day when reporting remaining days.
const HOURS_PER_WORKING_DAY: f64 = 8.0;

/// Weekday working window in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct WorkingCalendar {
    offset: FixedOffset,
    start_hour: u32,
    end_hour: u32,
}

impl Default for WorkingCalendar {
    fn default() -> Self {
        Self {
            offset: *FACTORY_OFFSET,
            start_hour: 8,
            end_hour: 17,
        }
    }
}

impl WorkingCalendar {
    fn at_hour(&self, local: DateTime<FixedOffset>, hour: u32) -> DateTime<FixedOffset> {
        let midnight = local
            - Duration::seconds(i64::from(local.num_seconds_from_midnight()))
            - Duration::nanoseconds(i64::from(local.nanosecond()));
        midnight + Duration::hours(i64::from(hour))
    }

    fn is_working_day(local: &DateTime<FixedOffset>) -> bool {
        !matches!(local.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Moves `at` forward to the nearest instant inside working hours.
    pub fn next_working_instant(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let mut local = at.with_timezone(&self.offset);
        loop {
            if !Self::is_working_day(&local) {
                local = self.at_hour(local + Duration::days(1), self.start_hour);
                continue;
            }
            if local.hour() < self.start_hour {
                local = self.at_hour(local, self.start_hour);
                continue;
            }
            if local.hour() >= self.end_hour {
                local = self.at_hour(local + Duration::days(1), self.start_hour);
                continue;
            }
            return local.with_timezone(&Utc);
        }
    }

    fn end_of_working_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        self.at_hour(at.with_timezone(&self.offset), self.end_hour)
            .with_timezone(&Utc)
    }

    /// Adds `hours` of working time to `from`. Zero or negative hours return `from` as is.
    pub fn add_working_hours(&self, from: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
        let mut remaining = (hours * 3600.0).round() as i64;
        if remaining <= 0 {
            return from;
        }
        let mut cursor = from;
        loop {
            cursor = self.next_working_instant(cursor);
            let day_end = self.end_of_working_day(cursor);
            let available = (day_end - cursor).num_seconds();
            if remaining <= available {
                return cursor + Duration::seconds(remaining);
            }
            remaining -= available;
            cursor = day_end;
        }
    }

    /// Working hours elapsed between two instants.
    pub fn working_hours_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
        let mut seconds = 0i64;
        let mut cursor = start;
        loop {
            cursor = self.next_working_instant(cursor);
            if cursor >= end {
                break;
            }
            let day_end = self.end_of_working_day(cursor);
            let segment_end = day_end.min(end);
            seconds += (segment_end - cursor).num_seconds();
            cursor = day_end;
        }
        seconds as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Snapshot of one stage row fed to the estimator.
#[derive(Debug, Clone)]
pub struct StageProgress {
    pub stage: ProductionStage,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StageEstimate {
    pub stage: ProductionStage,
    pub name_ja: String,
    pub status: StageStatus,
    /// Average duration scaled by priority.
    pub expected_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
    pub estimated_start: Option<DateTime<Utc>>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MilestoneSummary {
    pub current_stage: ProductionStage,
    pub completed_stages: usize,
    pub total_stages: usize,
    pub progress_percent: u8,
    pub remaining_hours: f64,
    pub remaining_working_days: u32,
    pub estimated_completion: DateTime<Utc>,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductionEstimate {
    pub priority: Priority,
    pub stages: Vec<StageEstimate>,
    pub summary: MilestoneSummary,
}

fn confidence_for(index: usize, current_index: usize) -> Confidence {
    if index <= current_index + 1 {
        Confidence::High
    } else if index <= current_index + 3 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Walks the stages in production order, accumulating remaining working time from `now`.
pub fn estimate(
    stages: &[StageProgress],
    current_stage: ProductionStage,
    priority: Priority,
    now: DateTime<Utc>,
    calendar: &WorkingCalendar,
) -> ProductionEstimate {
    let multiplier = priority.duration_multiplier();
    let current_index = current_stage.index();

    let mut ordered: Vec<&StageProgress> = stages.iter().collect();
    ordered.sort_by_key(|s| s.stage.index());

    let mut cursor = now;
    let mut remaining_hours = 0.0;
    let mut completed_stages = 0;
    let mut last_completion: Option<DateTime<Utc>> = None;
    let mut estimates = Vec::with_capacity(ordered.len());

    for progress in ordered {
        let duration = progress.stage.duration();
        let expected_hours = duration.average_hours * multiplier;
        let index = progress.stage.index();

        let (estimated_start, estimated_completion, confidence) = match progress.status {
            StageStatus::Completed => {
                completed_stages += 1;
                last_completion = last_completion.max(progress.completed_at);
                (progress.started_at, progress.completed_at, Confidence::High)
            }
            StageStatus::InProgress => {
                let started = progress.started_at.unwrap_or(now);
                let elapsed = calendar.working_hours_between(started, now);
                let left = (expected_hours - elapsed).max(0.0);
                remaining_hours += left;
                cursor = calendar.add_working_hours(cursor, left);
                (Some(started), Some(cursor), Confidence::High)
            }
            StageStatus::Pending => {
                let start = calendar.next_working_instant(cursor);
                remaining_hours += expected_hours;
                cursor = calendar.add_working_hours(cursor, expected_hours);
                (
                    Some(start),
                    Some(cursor),
                    confidence_for(index, current_index),
                )
            }
        };

        estimates.push(StageEstimate {
            stage: progress.stage,
            name_ja: progress.stage.name_ja().to_string(),
            status: progress.status,
            expected_hours,
            min_hours: duration.min_hours * multiplier,
            max_hours: duration.max_hours * multiplier,
            estimated_start,
            estimated_completion,
            confidence,
        });
    }

    let total_stages = estimates.len();
    let is_complete = total_stages > 0 && completed_stages == total_stages;
    let progress_percent = if total_stages == 0 {
        0
    } else {
        ((completed_stages as f64 / total_stages as f64) * 100.0).round() as u8
    };
    let estimated_completion = if is_complete {
        last_completion.unwrap_or(now)
    } else {
        cursor
    };
    let remaining_hours = (remaining_hours * 100.0).round() / 100.0;

    ProductionEstimate {
        priority,
        stages: estimates,
        summary: MilestoneSummary {
            current_stage,
            completed_stages,
            total_stages,
            progress_percent,
            remaining_hours,
            remaining_working_days: (remaining_hours / HOURS_PER_WORKING_DAY).ceil() as u32,
            estimated_completion,
            is_complete,
        },
    }
}
