//! CSV export of the dose calendar.
//!
//! Writes one row per dose with the medication and patient names and the
//! status at export time. The file is replaced on every export.

use crate::store::{DoseStore, JsonStore};
use crate::tracker::with_details;
use crate::{DoseWithDetails, Result};
use chrono::NaiveDateTime;
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    medication_id: String,
    medication: String,
    dosage: Option<String>,
    patient: String,
    scheduled_date: String,
    taken_at: Option<String>,
    status: &'static str,
}

impl From<&DoseWithDetails> for CsvRow {
    fn from(details: &DoseWithDetails) -> Self {
        CsvRow {
            id: details.dose.id.to_string(),
            medication_id: details.dose.medication_id.to_string(),
            medication: details.medication_name.clone(),
            dosage: details.dosage.clone(),
            patient: details.patient_name.clone(),
            scheduled_date: details.dose.scheduled_date.format(TIMESTAMP_FORMAT).to_string(),
            taken_at: details
                .dose
                .taken_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            status: details.status.label(),
        }
    }
}

/// Export doses (all, or one medication's) to `csv_path`.
///
/// Returns the number of rows written. The CSV is fsynced before returning.
pub fn export_doses(
    store: &JsonStore,
    medication_id: Option<Uuid>,
    csv_path: &Path,
    now: NaiveDateTime,
) -> Result<usize> {
    let data = store.load()?;

    let doses = match medication_id {
        Some(id) => {
            data.medication(id)?;
            data.doses_for_medication(id)?
        }
        None => {
            let mut all = data.doses.clone();
            all.sort_by_key(|d| (d.scheduled_date, d.medication_id));
            all
        }
    };
    let rows = with_details(&data, doses, now);

    // Ensure parent directory exists
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(csv_path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    for details in &rows {
        writer.serialize(CsvRow::from(details))?;
    }

    // Flush and sync to disk
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} doses to {:?}", rows.len(), csv_path);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{create_medication, mark_taken, register_patient};
    use crate::{NewMedication, NewPatient, ScheduleConfig};
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn create_test_input(patient_id: Uuid, name: &str, quantity: u32) -> NewMedication {
        NewMedication {
            patient_id,
            name: name.into(),
            description: None,
            dosage: Some("5mg".into()),
            quantity,
            rx_number: None,
            schedule: ScheduleConfig::parse(1, "daily", "2024-01-01").unwrap(),
        }
    }

    fn seed(store: &mut JsonStore) -> (Uuid, Uuid) {
        let patient = register_patient(
            store,
            NewPatient {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1815, 12, 10),
                notes: None,
            },
            at(1, 0),
        )
        .unwrap();

        let (first, doses) =
            create_medication(store, create_test_input(patient.id, "Warfarin", 3), at(1, 0))
                .unwrap();
        let (second, _) =
            create_medication(store, create_test_input(patient.id, "Digoxin", 2), at(1, 0))
                .unwrap();
        mark_taken(store, doses[0].id, at(1, 9)).unwrap();
        (first.id, second.id)
    }

    #[test]
    fn test_export_all_doses() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(temp_dir.path().join("store.json"));
        seed(&mut store);
        let csv_path = temp_dir.path().join("out/doses.csv");

        let count = export_doses(&store, None, &csv_path, at(2, 12)).unwrap();
        assert_eq!(count, 5);

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "id");
        assert_eq!(&headers[7], "status");
        assert_eq!(reader.records().count(), 5);

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.contains("Ada Lovelace"));
        assert!(content.contains("2024-01-01T09:00:00"));
        assert!(content.contains(",taken"));
        assert!(content.contains(",overdue"));
    }

    #[test]
    fn test_export_single_medication_replaces_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(temp_dir.path().join("store.json"));
        let (_, second) = seed(&mut store);
        let csv_path = temp_dir.path().join("doses.csv");

        export_doses(&store, None, &csv_path, at(2, 12)).unwrap();
        let count = export_doses(&store, Some(second), &csv_path, at(2, 12)).unwrap();
        assert_eq!(count, 2);

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_export_unknown_medication() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(temp_dir.path().join("store.json"));
        let csv_path = temp_dir.path().join("doses.csv");

        assert!(export_doses(&store, Some(Uuid::new_v4()), &csv_path, at(1, 0)).is_err());
        assert!(!csv_path.exists());
    }
}
