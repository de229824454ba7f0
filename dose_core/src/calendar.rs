//! Week and month views over the dose calendar.

use crate::status::day_bounds;
use crate::store::{DoseStore, JsonStore};
use crate::tracker::with_details;
use crate::{DoseEvent, DoseWithDetails, Error, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// First day of a displayed week
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// The seven dates of the week containing `today + offset weeks`.
///
/// Fails with `Validation` when the offset leaves the representable calendar.
pub fn week_dates(today: NaiveDate, offset: i64, week_start: WeekStart) -> Result<Vec<NaiveDate>> {
    let out_of_range = || Error::Validation(format!("week offset {} is out of range", offset));

    let anchor = Duration::try_weeks(offset)
        .and_then(|shift| today.checked_add_signed(shift))
        .ok_or_else(out_of_range)?;
    let back = match week_start {
        WeekStart::Sunday => anchor.weekday().num_days_from_sunday(),
        WeekStart::Monday => anchor.weekday().num_days_from_monday(),
    };
    let first = anchor
        .checked_sub_signed(Duration::days(i64::from(back)))
        .ok_or_else(out_of_range)?;

    (0..7)
        .map(|i| {
            first
                .checked_add_signed(Duration::days(i))
                .ok_or_else(out_of_range)
        })
        .collect()
}

/// Each date of the week with its doses
pub fn week_view(
    store: &JsonStore,
    offset: i64,
    week_start: WeekStart,
    now: NaiveDateTime,
) -> Result<Vec<(NaiveDate, Vec<DoseWithDetails>)>> {
    let dates = week_dates(now.date(), offset, week_start)?;
    let data = store.load()?;

    let (start, _) = day_bounds(dates[0]);
    let (_, end) = day_bounds(dates[6]);
    let doses = with_details(&data, data.doses_between(start, end)?, now);

    Ok(dates
        .into_iter()
        .map(|date| {
            let on_date = doses
                .iter()
                .filter(|d| d.dose.scheduled_date.date() == date)
                .cloned()
                .collect();
            (date, on_date)
        })
        .collect())
}

/// How much of a day's doses were taken
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceLevel {
    /// Every dose taken
    Complete,
    Partial,
    Missed,
}

/// Taken and total doses on one date
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayCount {
    pub taken: usize,
    pub total: usize,
}

impl DayCount {
    pub fn level(&self) -> AdherenceLevel {
        if self.total > 0 && self.taken == self.total {
            AdherenceLevel::Complete
        } else if self.taken > 0 {
            AdherenceLevel::Partial
        } else {
            AdherenceLevel::Missed
        }
    }
}

/// Per-date taken/total counts. Dates without doses are absent.
pub fn day_counts<'a, I>(doses: I) -> BTreeMap<NaiveDate, DayCount>
where
    I: IntoIterator<Item = &'a DoseEvent>,
{
    let mut counts: BTreeMap<NaiveDate, DayCount> = BTreeMap::new();
    for dose in doses {
        let entry = counts.entry(dose.scheduled_date.date()).or_default();
        entry.total += 1;
        if dose.is_taken() {
            entry.taken += 1;
        }
    }
    counts
}

/// Counts for every date in `[from, to]` that has doses
pub fn calendar_counts(
    store: &JsonStore,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<BTreeMap<NaiveDate, DayCount>> {
    if to < from {
        return Err(Error::Validation(format!(
            "calendar range ends ({}) before it starts ({})",
            to, from
        )));
    }

    let (start, _) = day_bounds(from);
    let (_, end) = day_bounds(to);
    let doses = store.doses_between(start, end)?;
    Ok(day_counts(&doses))
}
