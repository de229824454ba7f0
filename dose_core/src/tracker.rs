//! Caregiver workflows over the store.
//!
//! These tie the pure pieces together: creating a medication generates its
//! full dose calendar and persists both in one transaction; the dashboard
//! fetches today's doses and classifies them against an explicit `now`.

use crate::status::{day_bounds, dose_status, summarize_day, StatusGroups};
use crate::store::{DoseStore, JsonStore, StoreData};
use crate::{
    generate_dose_events, DaySummary, DoseEvent, DoseStatus, DoseWithDetails, Error, Medication,
    MedicationUpdate, NewMedication, NewPatient, Patient, PatientUpdate, Result,
};
use chrono::{NaiveDateTime, NaiveDate};
use uuid::Uuid;

// ============================================================================
// Patients
// ============================================================================

/// Register a patient
pub fn register_patient(store: &JsonStore, input: NewPatient, now: NaiveDateTime) -> Result<Patient> {
    let first_name = input.first_name.trim().to_string();
    let last_name = input.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(Error::Validation("patient first and last name are required".into()));
    }

    let patient = Patient {
        id: Uuid::new_v4(),
        first_name,
        last_name,
        date_of_birth: input.date_of_birth,
        notes: input.notes,
        created_at: now,
    };

    store.transaction(|data| {
        data.patients.push(patient.clone());
        Ok(())
    })?;

    tracing::info!("Registered patient {} ({})", patient.display_name(), patient.id);
    Ok(patient)
}

/// All patients, ordered by last then first name
pub fn list_patients(store: &JsonStore) -> Result<Vec<Patient>> {
    let mut patients = store.load()?.patients;
    patients.sort_by(|a, b| {
        a.last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name))
    });
    Ok(patients)
}

pub fn get_patient(store: &JsonStore, id: Uuid) -> Result<Patient> {
    store.load()?.patient(id).cloned()
}

/// Change a patient's details. Names, when given, must not be blank.
pub fn update_patient(store: &JsonStore, id: Uuid, update: PatientUpdate) -> Result<Patient> {
    for name in [&update.first_name, &update.last_name].into_iter().flatten() {
        if name.trim().is_empty() {
            return Err(Error::Validation("patient names cannot be empty".into()));
        }
    }

    let patient = store.transaction(|data| {
        let patient = data.patient_mut(id)?;
        if let Some(first_name) = update.first_name {
            patient.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            patient.last_name = last_name.trim().to_string();
        }
        if let Some(date_of_birth) = update.date_of_birth {
            patient.date_of_birth = Some(date_of_birth);
        }
        if let Some(notes) = update.notes {
            patient.notes = Some(notes);
        }
        Ok(patient.clone())
    })?;

    tracing::info!("Updated patient {}", id);
    Ok(patient)
}

// ============================================================================
// Medications
// ============================================================================

/// Prescribe a medication and materialize its dose calendar.
///
/// The medication row and every generated dose are written in a single
/// transaction: if generation or persistence fails, neither is stored.
pub fn create_medication(
    store: &JsonStore,
    input: NewMedication,
    now: NaiveDateTime,
) -> Result<(Medication, Vec<DoseEvent>)> {
    input.validate()?;

    let medication = Medication {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        name: input.name.trim().to_string(),
        description: input.description,
        dosage: input.dosage,
        quantity: input.quantity,
        is_active: true,
        rx_number: input.rx_number,
        schedule: input.schedule,
        created_at: now,
    };

    // Generated before taking the lock; a bad config never touches the store
    let new_doses = generate_dose_events(&medication)?;

    let doses = store.transaction(|data| {
        data.patient(medication.patient_id)?;
        data.medications.push(medication.clone());
        data.insert_doses(&new_doses)
    })?;

    tracing::info!(
        "Created medication {} ({}) with {} doses starting {}",
        medication.name,
        medication.id,
        doses.len(),
        medication.schedule.start_date
    );
    Ok((medication, doses))
}

/// Medications, optionally restricted to one patient, ordered by name
pub fn list_medications(store: &JsonStore, patient_id: Option<Uuid>) -> Result<Vec<Medication>> {
    let mut medications: Vec<Medication> = store
        .load()?
        .medications
        .into_iter()
        .filter(|m| patient_id.map_or(true, |p| m.patient_id == p))
        .collect();
    medications.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(medications)
}

pub fn get_medication(store: &JsonStore, id: Uuid) -> Result<Medication> {
    store.load()?.medication(id).cloned()
}

/// Change display fields of a medication. Its doses are left untouched.
pub fn update_medication(store: &JsonStore, id: Uuid, update: MedicationUpdate) -> Result<Medication> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("medication name cannot be empty".into()));
        }
    }

    let medication = store.transaction(|data| {
        let medication = data.medication_mut(id)?;
        if let Some(name) = update.name {
            medication.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            medication.description = Some(description);
        }
        if let Some(dosage) = update.dosage {
            medication.dosage = Some(dosage);
        }
        if let Some(rx_number) = update.rx_number {
            medication.rx_number = Some(rx_number);
        }
        if let Some(is_active) = update.is_active {
            medication.is_active = is_active;
        }
        Ok(medication.clone())
    })?;

    tracing::info!("Updated medication {}", id);
    Ok(medication)
}

/// Delete a medication and, with it, all of its doses
pub fn delete_medication(store: &JsonStore, id: Uuid) -> Result<(Medication, usize)> {
    let (medication, removed) = store.transaction(|data| data.remove_medication(id))?;
    tracing::info!(
        "Deleted medication {} and {} of its doses",
        medication.id,
        removed
    );
    Ok((medication, removed))
}

/// A medication's full dose calendar with the current status of each dose
pub fn medication_schedule(
    store: &JsonStore,
    medication_id: Uuid,
    now: NaiveDateTime,
) -> Result<Vec<(DoseEvent, DoseStatus)>> {
    let data = store.load()?;
    data.medication(medication_id)?;

    let doses = data.doses_for_medication(medication_id)?;
    Ok(doses
        .into_iter()
        .map(|dose| {
            let status = dose_status(&dose, now);
            (dose, status)
        })
        .collect())
}

// ============================================================================
// Taking doses
// ============================================================================

/// Record a dose as taken at `at`. Re-marking just moves the timestamp.
pub fn mark_taken<S: DoseStore>(store: &mut S, dose_id: Uuid, at: NaiveDateTime) -> Result<DoseEvent> {
    let dose = store.set_taken_at(dose_id, Some(at))?;
    tracing::info!("Marked dose {} taken at {}", dose_id, at);
    Ok(dose)
}

/// Return a dose to pending. Succeeds (unchanged) if it already was.
pub fn unmark_taken<S: DoseStore>(store: &mut S, dose_id: Uuid) -> Result<DoseEvent> {
    let dose = store.set_taken_at(dose_id, None)?;
    tracing::info!("Marked dose {} as not taken", dose_id);
    Ok(dose)
}

// ============================================================================
// Dashboard
// ============================================================================

/// Join doses with medication and patient display fields and classify them
pub(crate) fn with_details(
    data: &StoreData,
    doses: Vec<DoseEvent>,
    now: NaiveDateTime,
) -> Vec<DoseWithDetails> {
    doses
        .into_iter()
        .map(|dose| {
            let (medication_name, dosage) = match data.medication(dose.medication_id) {
                Ok(m) => (m.name.clone(), m.dosage.clone()),
                Err(_) => {
                    tracing::warn!(
                        "Dose {} references missing medication {}",
                        dose.id,
                        dose.medication_id
                    );
                    ("Unknown medication".to_string(), None)
                }
            };
            let patient_name = data
                .patient(dose.patient_id)
                .map(|p| p.display_name())
                .unwrap_or_else(|_| "Unknown patient".to_string());

            DoseWithDetails {
                status: dose_status(&dose, now),
                dose,
                medication_name,
                dosage,
                patient_name,
            }
        })
        .collect()
}

/// Doses scheduled on one calendar date, with details, in scheduled order
pub fn doses_on(store: &JsonStore, date: NaiveDate, now: NaiveDateTime) -> Result<Vec<DoseWithDetails>> {
    let data = store.load()?;
    let (start, end) = day_bounds(date);
    let doses = data.doses_between(start, end)?;
    Ok(with_details(&data, doses, now))
}

/// Today's doses, with details, in scheduled order
pub fn todays_doses(store: &JsonStore, now: NaiveDateTime) -> Result<Vec<DoseWithDetails>> {
    doses_on(store, now.date(), now)
}

/// Today's counts plus the decorated doses grouped by status
#[derive(Clone, Debug)]
pub struct Dashboard {
    pub summary: DaySummary,
    pub groups: StatusGroups,
}

pub fn dashboard(store: &JsonStore, now: NaiveDateTime) -> Result<Dashboard> {
    let doses = todays_doses(store, now)?;
    let summary = summarize_day(doses.iter().map(|d| &d.dose), now);
    tracing::debug!("Dashboard at {}: {:?}", now, summary);

    Ok(Dashboard {
        summary,
        groups: StatusGroups::from_doses(doses),
    })
}
