//! Reduce the provider's 3-hour forecast feed to the two dashboard views.
//!
//! The daily view prefers the entry stamped at noon for each calendar day and
//! falls back to the middle entry of that day. This is a display heuristic;
//! nothing guarantees a noon entry exists.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::model::ForecastEntry;

/// Entries shown in the short-term strip (8 x 3h).
pub const NEXT_HOURS_ENTRIES: usize = 8;

/// Days shown in the daily list, not counting the current day.
pub const DIGEST_DAYS: usize = 5;

const NOON_MARKER: &str = "12:00:00";

/// First [`NEXT_HOURS_ENTRIES`] entries, unmodified.
pub fn next_hours(entries: &[ForecastEntry]) -> &[ForecastEntry] {
    &entries[..entries.len().min(NEXT_HOURS_ENTRIES)]
}

/// One representative entry per upcoming day in the local calendar.
pub fn daily_digest(entries: &[ForecastEntry]) -> Vec<ForecastEntry> {
    daily_digest_in(entries, &Local)
}

/// [`daily_digest`] with an explicit calendar.
///
/// The first day present is treated as the current, partial day and dropped.
pub fn daily_digest_in<Tz: TimeZone>(entries: &[ForecastEntry], tz: &Tz) -> Vec<ForecastEntry> {
    group_by_day(entries, tz)
        .into_iter()
        .map(|(_, day)| representative(&day).clone())
        .skip(1)
        .take(DIGEST_DAYS)
        .collect()
}

/// Partition by calendar date, keeping first-seen day order and entry order.
fn group_by_day<'a, Tz: TimeZone>(
    entries: &'a [ForecastEntry],
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<&'a ForecastEntry>)> {
    let mut days: Vec<(NaiveDate, Vec<&ForecastEntry>)> = Vec::new();

    for entry in entries {
        let date = local_date(entry.dt, tz);
        match days.iter_mut().find(|(d, _)| *d == date) {
            Some((_, group)) => group.push(entry),
            None => days.push((date, vec![entry])),
        }
    }

    days
}

fn representative<'a>(day: &[&'a ForecastEntry]) -> &'a ForecastEntry {
    day.iter()
        .copied()
        .find(|e| e.dt_txt.contains(NOON_MARKER))
        .unwrap_or(day[day.len() / 2])
}

fn local_date<Tz: TimeZone>(dt: i64, tz: &Tz) -> NaiveDate {
    DateTime::from_timestamp(dt, 0)
        .unwrap_or_default()
        .with_timezone(tz)
        .date_naive()
}
