//! Dose schedule generation.
//!
//! Expands a medication's `{quantity, frequency, type, start_date}` into the
//! concrete list of dose events the caller persists. Doses are grouped into
//! cadence buckets (one day for daily, seven days for weekly) of `frequency`
//! doses each; the last bucket holds whatever remains of `quantity`.

use crate::{Error, Medication, NewDoseEvent, Result};
use chrono::{NaiveDateTime, NaiveTime};

/// Generate every dose event for a medication, in chronological order.
///
/// Returns exactly `medication.quantity` events or an
/// `InvalidScheduleConfig` error; never a partial list. Pure: no clock reads,
/// no I/O, same output for the same input.
pub fn generate_dose_events(medication: &Medication) -> Result<Vec<NewDoseEvent>> {
    let quantity = medication.quantity;
    let frequency = medication.schedule.frequency;

    if quantity == 0 {
        return Err(Error::InvalidScheduleConfig(
            "quantity must be a positive number".into(),
        ));
    }
    if frequency == 0 {
        return Err(Error::InvalidScheduleConfig(
            "frequency must be a positive number".into(),
        ));
    }

    let step = medication.schedule.kind.step();
    let start = medication.schedule.start_date;

    let mut events = Vec::with_capacity(quantity as usize);
    let mut scheduled: u32 = 0;
    let mut bucket_index: i32 = 0;

    while scheduled < quantity {
        let bucket_date = start
            .checked_add_signed(step * bucket_index)
            .ok_or_else(|| {
                Error::InvalidScheduleConfig(format!(
                    "schedule runs past the supported calendar range (bucket {})",
                    bucket_index
                ))
            })?;
        let scheduled_date = NaiveDateTime::new(bucket_date, NaiveTime::MIN);

        let in_bucket = frequency.min(quantity - scheduled);
        for _ in 0..in_bucket {
            events.push(NewDoseEvent {
                medication_id: medication.id,
                patient_id: medication.patient_id,
                scheduled_date,
                taken_at: None,
            });
        }

        scheduled += in_bucket;
        bucket_index += 1;
    }

    tracing::debug!(
        "Generated {} doses over {} {} buckets for medication {}",
        events.len(),
        bucket_index,
        medication.schedule.kind,
        medication.id
    );

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScheduleConfig, ScheduleType};
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn create_test_medication(quantity: u32, frequency: u32, kind: &str) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            name: "Metformin".into(),
            description: None,
            dosage: Some("500mg".into()),
            quantity,
            is_active: true,
            rx_number: None,
            schedule: ScheduleConfig::parse(frequency, kind, "2024-01-01").unwrap(),
            created_at: NaiveDate::from_ymd_opt(2023, 12, 31)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Sizes of consecutive runs of equal `scheduled_date`
    fn bucket_sizes(events: &[NewDoseEvent]) -> Vec<(NaiveDateTime, usize)> {
        let mut buckets: Vec<(NaiveDateTime, usize)> = Vec::new();
        for event in events {
            match buckets.last_mut() {
                Some((date, count)) if *date == event.scheduled_date => *count += 1,
                _ => buckets.push((event.scheduled_date, 1)),
            }
        }
        buckets
    }

    #[test]
    fn test_daily_two_per_day() {
        let med = create_test_medication(4, 2, "daily");
        let events = generate_dose_events(&med).unwrap();

        assert_eq!(
            bucket_sizes(&events),
            vec![(midnight(2024, 1, 1), 2), (midnight(2024, 1, 2), 2)]
        );
    }

    #[test]
    fn test_weekly_steps_seven_days() {
        let med = create_test_medication(3, 1, "weekly");
        let events = generate_dose_events(&med).unwrap();

        let dates: Vec<_> = events.iter().map(|e| e.scheduled_date).collect();
        assert_eq!(
            dates,
            vec![
                midnight(2024, 1, 1),
                midnight(2024, 1, 8),
                midnight(2024, 1, 15)
            ]
        );
    }

    #[test]
    fn test_remainder_goes_to_last_bucket() {
        let med = create_test_medication(5, 2, "daily");
        let events = generate_dose_events(&med).unwrap();

        assert_eq!(
            bucket_sizes(&events),
            vec![
                (midnight(2024, 1, 1), 2),
                (midnight(2024, 1, 2), 2),
                (midnight(2024, 1, 3), 1)
            ]
        );
    }

    #[test]
    fn test_frequency_larger_than_quantity() {
        let med = create_test_medication(3, 10, "weekly");
        let events = generate_dose_events(&med).unwrap();

        assert_eq!(bucket_sizes(&events), vec![(midnight(2024, 1, 1), 3)]);
    }

    #[test]
    fn test_events_copy_ids_and_start_pending() {
        let med = create_test_medication(6, 3, "daily");
        let events = generate_dose_events(&med).unwrap();

        assert!(events.iter().all(|e| e.medication_id == med.id));
        assert!(events.iter().all(|e| e.patient_id == med.patient_id));
        assert!(events.iter().all(|e| e.taken_at.is_none()));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let med = create_test_medication(9, 4, "weekly");
        assert_eq!(
            generate_dose_events(&med).unwrap(),
            generate_dose_events(&med).unwrap()
        );
    }

    #[test]
    fn test_rejects_zero_quantity_and_frequency() {
        let mut med = create_test_medication(1, 1, "daily");
        med.quantity = 0;
        assert!(matches!(
            generate_dose_events(&med),
            Err(Error::InvalidScheduleConfig(_))
        ));

        let mut med = create_test_medication(1, 1, "daily");
        med.schedule.frequency = 0;
        assert!(matches!(
            generate_dose_events(&med),
            Err(Error::InvalidScheduleConfig(_))
        ));
    }

    #[test]
    fn test_shape_holds_across_inputs() {
        for kind in ["daily", "weekly"] {
            for quantity in 1..=25u32 {
                for frequency in 1..=6u32 {
                    let med = create_test_medication(quantity, frequency, kind);
                    let events = generate_dose_events(&med).unwrap();
                    assert_eq!(events.len(), quantity as usize);

                    let buckets = bucket_sizes(&events);
                    let (last, full) = buckets.split_last().unwrap();
                    assert!(full.iter().all(|(_, n)| *n == frequency as usize));
                    let remainder = (quantity % frequency) as usize;
                    let expected_last = if remainder == 0 {
                        frequency as usize
                    } else {
                        remainder
                    };
                    assert_eq!(last.1, expected_last);

                    let step = med.schedule.kind.step();
                    assert_eq!(buckets[0].0, midnight(2024, 1, 1));
                    for pair in buckets.windows(2) {
                        assert_eq!(pair[1].0 - pair[0].0, step);
                    }
                }
            }
        }
        assert_eq!(ScheduleType::Weekly.step(), Duration::days(7));
    }
}
