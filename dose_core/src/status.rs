//! Dose status classification and day summaries.
//!
//! A dose's status is a pure function of its scheduled time, whether it has
//! been taken, and the evaluation instant. Nothing here reads the clock;
//! callers pass `now` explicitly so every evaluation sees one instant.

use crate::{DaySummary, DoseEvent, DoseStatus, DoseWithDetails, TimeOfDay};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Half-width of the due-now window around the evaluation instant
pub const DUE_WINDOW_MINUTES: i64 = 30;

/// Last representable millisecond of a calendar day
const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_milli_opt(23, 59, 59, 999) {
    Some(time) => time,
    None => NaiveTime::MIN,
};

/// The inclusive `[now - 30min, now + 30min]` window.
///
/// Clamped to the representable range, so classification stays total at the
/// calendar extremes.
pub fn due_window(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let half = Duration::minutes(DUE_WINDOW_MINUTES);
    (
        now.checked_sub_signed(half).unwrap_or(NaiveDateTime::MIN),
        now.checked_add_signed(half).unwrap_or(NaiveDateTime::MAX),
    )
}

/// Classify one dose.
///
/// Precedence: taken, then overdue (before the window), due-now (inside it,
/// both ends inclusive), upcoming (after it).
pub fn classify(
    scheduled_date: NaiveDateTime,
    taken_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> DoseStatus {
    if taken_at.is_some() {
        return DoseStatus::Taken;
    }

    let (start, end) = due_window(now);
    if scheduled_date < start {
        DoseStatus::Overdue
    } else if scheduled_date <= end {
        DoseStatus::DueNow
    } else {
        DoseStatus::Upcoming
    }
}

/// Classify a persisted dose
pub fn dose_status(dose: &DoseEvent, now: NaiveDateTime) -> DoseStatus {
    classify(dose.scheduled_date, dose.taken_at, now)
}

/// `[local midnight, local midnight + 24h - 1ms]` of the given date
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    (
        NaiveDateTime::new(date, NaiveTime::MIN),
        NaiveDateTime::new(date, END_OF_DAY),
    )
}

/// Whether `instant` falls on the same calendar day as `now`
pub fn is_same_day(instant: NaiveDateTime, now: NaiveDateTime) -> bool {
    let (start, end) = day_bounds(now.date());
    instant >= start && instant <= end
}

/// Count today's doses by urgency.
///
/// Only doses scheduled on `now`'s calendar day are considered. `total_today`
/// counts all of them; the status counts only those still pending.
pub fn summarize_day<'a, I>(doses: I, now: NaiveDateTime) -> DaySummary
where
    I: IntoIterator<Item = &'a DoseEvent>,
{
    let mut summary = DaySummary::default();

    for dose in doses {
        if !is_same_day(dose.scheduled_date, now) {
            continue;
        }
        summary.total_today += 1;

        match dose_status(dose, now) {
            DoseStatus::Overdue => summary.overdue += 1,
            DoseStatus::DueNow => summary.due_now += 1,
            DoseStatus::Upcoming => summary.upcoming += 1,
            DoseStatus::Taken => {}
        }
    }

    summary
}

impl TimeOfDay {
    /// Morning before noon, afternoon before 18:00, evening after
    pub fn of(instant: NaiveDateTime) -> Self {
        match instant.hour() {
            h if h < 12 => TimeOfDay::Morning,
            h if h < 18 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
        }
    }
}

/// Today's doses split by status, each list in scheduled order
#[derive(Clone, Debug, Default)]
pub struct StatusGroups {
    pub overdue: Vec<DoseWithDetails>,
    pub due_now: Vec<DoseWithDetails>,
    pub upcoming: Vec<DoseWithDetails>,
    pub taken: Vec<DoseWithDetails>,
}

impl StatusGroups {
    pub fn from_doses(doses: Vec<DoseWithDetails>) -> Self {
        let mut groups = Self::default();
        for dose in doses {
            match dose.status {
                DoseStatus::Overdue => groups.overdue.push(dose),
                DoseStatus::DueNow => groups.due_now.push(dose),
                DoseStatus::Upcoming => groups.upcoming.push(dose),
                DoseStatus::Taken => groups.taken.push(dose),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn create_test_dose(scheduled_date: NaiveDateTime, taken_at: Option<NaiveDateTime>) -> DoseEvent {
        DoseEvent {
            id: Uuid::new_v4(),
            medication_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            scheduled_date,
            taken_at,
        }
    }

    #[test]
    fn test_window_boundaries() {
        let now = at(12, 0);
        let half = Duration::minutes(30);
        let ms = Duration::milliseconds(1);

        assert_eq!(classify(now - half, None, now), DoseStatus::DueNow);
        assert_eq!(classify(now - half - ms, None, now), DoseStatus::Overdue);
        assert_eq!(classify(now + half, None, now), DoseStatus::DueNow);
        assert_eq!(classify(now + half + ms, None, now), DoseStatus::Upcoming);
        assert_eq!(classify(now, None, now), DoseStatus::DueNow);
    }

    #[test]
    fn test_taken_wins_regardless_of_schedule() {
        let now = at(12, 0);
        for scheduled in [at(0, 0), at(12, 0), at(23, 59)] {
            assert_eq!(classify(scheduled, Some(at(8, 0)), now), DoseStatus::Taken);
            assert_ne!(classify(scheduled, None, now), DoseStatus::Taken);
        }
    }

    #[test]
    fn test_status_advances_with_time_alone() {
        let scheduled = at(9, 0);
        assert_eq!(classify(scheduled, None, at(7, 0)), DoseStatus::Upcoming);
        assert_eq!(classify(scheduled, None, at(9, 15)), DoseStatus::DueNow);
        assert_eq!(classify(scheduled, None, at(11, 0)), DoseStatus::Overdue);
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(start, at(0, 0));
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap()
        );
    }

    #[test]
    fn test_extreme_dates_do_not_overflow() {
        let (start, end) = day_bounds(NaiveDate::MAX);
        assert_eq!(start.date(), NaiveDate::MAX);
        assert_eq!(end.date(), NaiveDate::MAX);

        let last = NaiveDateTime::MAX;
        let (_, window_end) = due_window(last);
        assert_eq!(window_end, NaiveDateTime::MAX);
        assert_eq!(classify(last, None, last), DoseStatus::DueNow);

        let first = NaiveDateTime::MIN;
        let (window_start, _) = due_window(first);
        assert_eq!(window_start, NaiveDateTime::MIN);
        assert_eq!(classify(first, None, first), DoseStatus::DueNow);
        assert_eq!(classify(last, None, first), DoseStatus::Upcoming);

        let doses = vec![create_test_dose(last, None)];
        assert_eq!(summarize_day(&doses, last).due_now, 1);
    }

    #[test]
    fn test_summarize_day_mixed_statuses() {
        let now = at(12, 0);
        let doses = vec![
            create_test_dose(at(8, 0), None),
            create_test_dose(at(12, 10), None),
            create_test_dose(at(16, 0), None),
            create_test_dose(at(20, 0), None),
            create_test_dose(at(8, 0), Some(at(8, 5))),
        ];

        let summary = summarize_day(&doses, now);
        assert_eq!(
            summary,
            DaySummary {
                overdue: 1,
                due_now: 1,
                upcoming: 2,
                total_today: 5,
            }
        );
    }

    #[test]
    fn test_summarize_day_ignores_other_days() {
        let now = at(12, 0);
        let yesterday = at(12, 0) - Duration::days(1);
        let tomorrow = at(0, 0) + Duration::days(1);
        let doses = vec![
            create_test_dose(yesterday, None),
            create_test_dose(tomorrow, None),
            create_test_dose(at(0, 0), None),
        ];

        let summary = summarize_day(&doses, now);
        assert_eq!(summary.total_today, 1);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.upcoming, 0);
    }

    #[test]
    fn test_time_of_day() {
        assert_eq!(TimeOfDay::of(at(0, 0)), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::of(at(11, 59)), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::of(at(12, 0)), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::of(at(18, 0)), TimeOfDay::Evening);
    }

    #[test]
    fn test_status_groups() {
        let now = at(12, 0);
        let details = |dose: DoseEvent| DoseWithDetails {
            status: dose_status(&dose, now),
            dose,
            medication_name: "Aspirin".into(),
            dosage: None,
            patient_name: "Ada Lovelace".into(),
        };
        let groups = StatusGroups::from_doses(vec![
            details(create_test_dose(at(6, 0), None)),
            details(create_test_dose(at(12, 0), None)),
            details(create_test_dose(at(6, 0), Some(at(6, 30)))),
        ]);

        assert_eq!(groups.overdue.len(), 1);
        assert_eq!(groups.due_now.len(), 1);
        assert_eq!(groups.upcoming.len(), 0);
        assert_eq!(groups.taken.len(), 1);
    }
}
