//! Recurring match reports: daily, weekly, and monthly schedules that feed
//! profiles through the match pipeline on their own cadence.

pub mod domain;
pub mod planner;
pub mod service;


pub use domain::{DayOfWeek, Frequency, Schedule, ScheduleDraft, ScheduleId};
pub use planner::{next_occurrence, CadenceError};
pub use service::{
    RecurrenceScheduler, ScheduleRepository, ScheduleRunFailure, ScheduleRunReport,
    ScheduleTickReport, SchedulerError,
};
