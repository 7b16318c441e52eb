//! Occurrence math for recurring schedules.
//!
//! All computation is calendar arithmetic on UTC timestamps; the result is
//! always strictly after the reference instant, so a run that lands exactly
//! on its own trigger time rolls forward a full period.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::domain::{Frequency, Schedule};

/// Error raised while computing the next occurrence of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CadenceError {
    #[error("weekly schedules need a day of week")]
    MissingDayOfWeek,
    #[error("monthly schedules need a day of month")]
    MissingDayOfMonth,
    #[error("computed occurrence falls outside the supported date range")]
    OutOfRange,
}

/// Next trigger strictly after `after`.
pub fn next_occurrence(
    schedule: &Schedule,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, CadenceError> {
    match schedule.frequency {
        Frequency::Daily => next_daily(schedule, after),
        Frequency::Weekly => next_weekly(schedule, after),
        Frequency::Monthly => next_monthly(schedule, after),
    }
}

fn next_daily(schedule: &Schedule, after: DateTime<Utc>) -> Result<DateTime<Utc>, CadenceError> {
    let today = after.date_naive().and_time(schedule.time_of_day).and_utc();
    if today > after {
        return Ok(today);
    }
    today
        .checked_add_signed(Duration::days(1))
        .ok_or(CadenceError::OutOfRange)
}

fn next_weekly(schedule: &Schedule, after: DateTime<Utc>) -> Result<DateTime<Utc>, CadenceError> {
    let target = schedule
        .day_of_week
        .ok_or(CadenceError::MissingDayOfWeek)?
        .to_weekday();
    let offset = (target.num_days_from_monday() + 7 - after.weekday().num_days_from_monday()) % 7;

    let date = after
        .date_naive()
        .checked_add_signed(Duration::days(i64::from(offset)))
        .ok_or(CadenceError::OutOfRange)?;
    let candidate = date.and_time(schedule.time_of_day).and_utc();
    if candidate > after {
        return Ok(candidate);
    }
    candidate
        .checked_add_signed(Duration::days(7))
        .ok_or(CadenceError::OutOfRange)
}

fn next_monthly(schedule: &Schedule, after: DateTime<Utc>) -> Result<DateTime<Utc>, CadenceError> {
    let anchor = schedule
        .day_of_month
        .ok_or(CadenceError::MissingDayOfMonth)?;

    let candidate = monthly_candidate(after.year(), after.month(), anchor, schedule)?;
    if candidate > after {
        return Ok(candidate);
    }
    let (year, month) = if after.month() == 12 {
        (after.year() + 1, 1)
    } else {
        (after.year(), after.month() + 1)
    };
    monthly_candidate(year, month, anchor, schedule)
}

fn monthly_candidate(
    year: i32,
    month: u32,
    anchor: u8,
    schedule: &Schedule,
) -> Result<DateTime<Utc>, CadenceError> {
    let day = u32::from(anchor).min(days_in_month(year, month));
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(CadenceError::OutOfRange)?;
    Ok(date.and_time(schedule.time_of_day).and_utc())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
