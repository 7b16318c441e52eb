use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{Schedule, ScheduleDraft, ScheduleId};
use super::planner::{next_occurrence, CadenceError};
use crate::matching::dispatch::{DispatchError, DispatchPolicy};
use crate::matching::domain::{Listing, RequirementProfile};
use crate::matching::outreach::MessageDrafter;
use crate::matching::pipeline::{MatchPipeline, ProfileRunReport, RunContext};
use crate::matching::repository::{
    AlertRepository, BatchId, NotificationGateway, RepositoryError,
};

/// Storage seam for recurring schedules.
pub trait ScheduleRepository: Send + Sync {
    fn insert(&self, schedule: Schedule) -> Result<Schedule, RepositoryError>;
    fn update(&self, schedule: Schedule) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError>;
    fn list(&self) -> Result<Vec<Schedule>, RepositoryError>;
    fn delete(&self, id: &ScheduleId) -> Result<(), RepositoryError>;
}

static SCHEDULE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_schedule_id() -> ScheduleId {
    let id = SCHEDULE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ScheduleId(format!("sched-{id:06}"))
}

/// Drives recurring match reports: lifecycle of the schedules themselves and
/// the pipeline runs they trigger.
pub struct RecurrenceScheduler<S, R, N, D> {
    schedules: Arc<S>,
    pipeline: Arc<MatchPipeline<R, N, D>>,
}

impl<S, R, N, D> RecurrenceScheduler<S, R, N, D>
where
    S: ScheduleRepository + 'static,
    R: AlertRepository + 'static,
    N: NotificationGateway + 'static,
    D: MessageDrafter + 'static,
{
    pub fn new(schedules: Arc<S>, pipeline: Arc<MatchPipeline<R, N, D>>) -> Self {
        Self {
            schedules,
            pipeline,
        }
    }

    /// Register a schedule; its first trigger is computed from `now`.
    pub fn create(
        &self,
        draft: ScheduleDraft,
        now: DateTime<Utc>,
    ) -> Result<Schedule, SchedulerError> {
        validate_draft(&draft)?;
        let mut schedule = Schedule {
            id: next_schedule_id(),
            profile_id: draft.profile_id,
            frequency: draft.frequency,
            day_of_week: draft.day_of_week,
            day_of_month: draft.day_of_month,
            time_of_day: draft.time_of_day,
            min_score: draft.min_score,
            active: true,
            last_run: None,
            next_run: now,
        };
        schedule.next_run = next_occurrence(&schedule, now)?;
        Ok(self.schedules.insert(schedule)?)
    }

    /// Replace the timing and floor of an existing schedule, keeping its
    /// activation state and run history.
    pub fn edit(
        &self,
        id: &ScheduleId,
        draft: ScheduleDraft,
        now: DateTime<Utc>,
    ) -> Result<Schedule, SchedulerError> {
        validate_draft(&draft)?;
        let mut schedule = self.fetch(id)?;
        schedule.profile_id = draft.profile_id;
        schedule.frequency = draft.frequency;
        schedule.day_of_week = draft.day_of_week;
        schedule.day_of_month = draft.day_of_month;
        schedule.time_of_day = draft.time_of_day;
        schedule.min_score = draft.min_score;
        schedule.next_run = next_occurrence(&schedule, now)?;
        self.schedules.update(schedule.clone())?;
        Ok(schedule)
    }

    pub fn pause(&self, id: &ScheduleId) -> Result<Schedule, SchedulerError> {
        let mut schedule = self.fetch(id)?;
        schedule.active = false;
        self.schedules.update(schedule.clone())?;
        Ok(schedule)
    }

    /// Reactivate a schedule. A trigger that drifted into the past while
    /// paused is recomputed so the schedule does not fire immediately.
    pub fn resume(&self, id: &ScheduleId, now: DateTime<Utc>) -> Result<Schedule, SchedulerError> {
        let mut schedule = self.fetch(id)?;
        schedule.active = true;
        if schedule.next_run <= now {
            schedule.next_run = next_occurrence(&schedule, now)?;
        }
        self.schedules.update(schedule.clone())?;
        Ok(schedule)
    }

    pub fn delete(&self, id: &ScheduleId) -> Result<(), SchedulerError> {
        self.schedules.delete(id)?;
        Ok(())
    }

    /// Active schedules whose trigger has arrived, oldest trigger first.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>, SchedulerError> {
        let mut due: Vec<Schedule> = self
            .schedules
            .list()?
            .into_iter()
            .filter(|schedule| schedule.active && schedule.next_run <= now)
            .collect();
        due.sort_by(|a, b| a.next_run.cmp(&b.next_run).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(due)
    }

    /// Execute one schedule immediately, paused or not, without touching its
    /// activation state.
    pub fn run_now(
        &self,
        id: &ScheduleId,
        profiles: &[RequirementProfile],
        listings: &[Listing],
        now: DateTime<Utc>,
    ) -> Result<ScheduleRunReport, SchedulerError> {
        let schedule = self.fetch(id)?;
        self.execute(schedule, profiles, listings, now)
    }

    /// Execute every due schedule; one schedule's failure never stops the rest.
    pub fn run_due(
        &self,
        profiles: &[RequirementProfile],
        listings: &[Listing],
        now: DateTime<Utc>,
    ) -> Result<ScheduleTickReport, SchedulerError> {
        let mut executed = Vec::new();
        let mut failures = Vec::new();

        for schedule in self.due(now)? {
            let id = schedule.id.clone();
            match self.execute(schedule, profiles, listings, now) {
                Ok(report) => executed.push(report),
                Err(error) => {
                    warn!(schedule = %id.0, %error, "scheduled match run failed");
                    failures.push(ScheduleRunFailure {
                        schedule_id: id,
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            executed = executed.len(),
            failed = failures.len(),
            "schedule tick completed"
        );

        Ok(ScheduleTickReport { executed, failures })
    }

    fn execute(
        &self,
        mut schedule: Schedule,
        profiles: &[RequirementProfile],
        listings: &[Listing],
        now: DateTime<Utc>,
    ) -> Result<ScheduleRunReport, SchedulerError> {
        let profile = profiles
            .iter()
            .find(|profile| profile.id == schedule.profile_id)
            .ok_or_else(|| SchedulerError::UnknownProfile(schedule.profile_id.0.clone()))?;
        if profile.archived {
            return Err(SchedulerError::ArchivedProfile(profile.id.0.clone()));
        }

        let policy = DispatchPolicy::scheduled_report(schedule.min_score);
        let ctx = RunContext::new(format!("{}-{}", schedule.id.0, now.timestamp()), now);
        let report = self.pipeline.run_for_profile(profile, listings, &policy, &ctx)?;

        schedule.last_run = Some(now);
        schedule.next_run = next_occurrence(&schedule, now)?;
        self.schedules.update(schedule.clone())?;

        info!(
            schedule = %schedule.id.0,
            profile = %profile.id.0,
            alerts = report.alerts_raised(),
            next_run = %schedule.next_run,
            "scheduled match run completed"
        );

        Ok(ScheduleRunReport {
            schedule_id: schedule.id,
            batch_id: ctx.batch_id,
            next_run: schedule.next_run,
            report,
        })
    }

    fn fetch(&self, id: &ScheduleId) -> Result<Schedule, SchedulerError> {
        self.schedules
            .fetch(id)?
            .ok_or_else(|| SchedulerError::NotFound(id.0.clone()))
    }
}

fn validate_draft(draft: &ScheduleDraft) -> Result<(), SchedulerError> {
    if let Some(day) = draft.day_of_month {
        if !(1..=31).contains(&day) {
            return Err(SchedulerError::InvalidDayOfMonth(day));
        }
    }
    Ok(())
}

/// Outcome of one schedule execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRunReport {
    pub schedule_id: ScheduleId,
    pub batch_id: BatchId,
    pub next_run: DateTime<Utc>,
    pub report: ProfileRunReport,
}

/// One schedule that failed during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRunFailure {
    pub schedule_id: ScheduleId,
    pub error: String,
}

/// Accounting for one pass over the due schedules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScheduleTickReport {
    pub executed: Vec<ScheduleRunReport>,
    pub failures: Vec<ScheduleRunFailure>,
}

/// Error raised by the recurrence scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("schedule {0} was not found")]
    NotFound(String),
    #[error("day of month {0} is outside 1..=31")]
    InvalidDayOfMonth(u8),
    #[error("profile {0} is not part of this run")]
    UnknownProfile(String),
    #[error("profile {0} is archived")]
    ArchivedProfile(String),
    #[error(transparent)]
    Cadence(#[from] CadenceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
