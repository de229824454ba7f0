//! Core domain types for the medication-adherence tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Patients and the medications prescribed to them
//! - Schedule configuration (cadence, frequency, start date)
//! - Dose events, both freshly generated and persisted
//! - Derived status labels and dashboard aggregates
//!
//! All timestamps are local wall-clock values (`NaiveDateTime`).

use crate::{Error, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Patient Types
// ============================================================================

/// A patient under the caregiver's care
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Patient {
    /// "First Last", as shown next to a dose on the dashboard
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for registering a patient
#[derive(Clone, Debug)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Fields of a patient to change; `None` leaves a field as it is
#[derive(Clone, Debug, Default)]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.date_of_birth.is_none()
            && self.notes.is_none()
    }
}

// ============================================================================
// Schedule Configuration
// ============================================================================

/// Cadence unit of a medication schedule
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Daily,
    Weekly,
}

impl ScheduleType {
    /// Distance between two consecutive cadence buckets
    pub fn step(&self) -> Duration {
        match self {
            ScheduleType::Daily => Duration::days(1),
            ScheduleType::Weekly => Duration::days(7),
        }
    }
}

impl FromStr for ScheduleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(ScheduleType::Daily),
            "weekly" => Ok(ScheduleType::Weekly),
            other => Err(Error::InvalidScheduleConfig(format!(
                "unknown schedule type '{}' (expected daily or weekly)",
                other
            ))),
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleType::Daily => write!(f, "daily"),
            ScheduleType::Weekly => write!(f, "weekly"),
        }
    }
}

/// How a medication is taken: `frequency` doses per `kind` unit, from `start_date`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub frequency: u32,
    #[serde(rename = "type")]
    pub kind: ScheduleType,
    pub start_date: NaiveDate,
}

impl ScheduleConfig {
    /// Build a schedule from loosely-typed input (CLI flags, form fields).
    ///
    /// Fails with `InvalidScheduleConfig` on a zero frequency, an unknown
    /// cadence, or a start date that is not `YYYY-MM-DD`.
    pub fn parse(frequency: u32, kind: &str, start_date: &str) -> Result<Self> {
        if frequency == 0 {
            return Err(Error::InvalidScheduleConfig(
                "frequency must be a positive number".into(),
            ));
        }
        let kind = kind.parse::<ScheduleType>()?;
        let start_date = NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d").map_err(|e| {
            Error::InvalidScheduleConfig(format!("invalid start date '{}': {}", start_date, e))
        })?;

        Ok(Self {
            frequency,
            kind,
            start_date,
        })
    }
}

// ============================================================================
// Medication Types
// ============================================================================

/// A prescription owning a dosing cadence and a total quantity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub dosage: Option<String>,
    /// Total number of doses (pills) to schedule
    pub quantity: u32,
    pub is_active: bool,
    pub rx_number: Option<String>,
    pub schedule: ScheduleConfig,
    pub created_at: NaiveDateTime,
}

/// Input for prescribing a medication
#[derive(Clone, Debug)]
pub struct NewMedication {
    pub patient_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub dosage: Option<String>,
    pub quantity: u32,
    pub rx_number: Option<String>,
    pub schedule: ScheduleConfig,
}

impl NewMedication {
    /// Check field-level constraints before anything touches the store
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("medication name is required".into()));
        }
        if self.quantity == 0 {
            return Err(Error::InvalidScheduleConfig(
                "quantity must be a positive number".into(),
            ));
        }
        if self.schedule.frequency == 0 {
            return Err(Error::InvalidScheduleConfig(
                "frequency must be a positive number".into(),
            ));
        }
        Ok(())
    }
}

/// Editable display fields of a medication.
///
/// Quantity and schedule are deliberately absent: doses are generated once.
#[derive(Clone, Debug, Default)]
pub struct MedicationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub dosage: Option<String>,
    pub rx_number: Option<String>,
    pub is_active: Option<bool>,
}

impl MedicationUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.dosage.is_none()
            && self.rx_number.is_none()
            && self.is_active.is_none()
    }
}

// ============================================================================
// Dose Event Types
// ============================================================================

/// A dose produced by the schedule generator, not yet persisted
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDoseEvent {
    pub medication_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_date: NaiveDateTime,
    pub taken_at: Option<NaiveDateTime>,
}

/// A persisted dose ("schedule" row)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoseEvent {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_date: NaiveDateTime,
    /// `None` while pending
    pub taken_at: Option<NaiveDateTime>,
}

impl DoseEvent {
    pub(crate) fn from_new(id: Uuid, dose: &NewDoseEvent) -> Self {
        Self {
            id,
            medication_id: dose.medication_id,
            patient_id: dose.patient_id,
            scheduled_date: dose.scheduled_date,
            taken_at: dose.taken_at,
        }
    }

    pub fn is_taken(&self) -> bool {
        self.taken_at.is_some()
    }
}

// ============================================================================
// Derived Status Types
// ============================================================================

/// Real-time urgency of a dose. Computed on read, never stored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DoseStatus {
    Overdue,
    DueNow,
    Upcoming,
    Taken,
}

impl DoseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DoseStatus::Overdue => "overdue",
            DoseStatus::DueNow => "due-now",
            DoseStatus::Upcoming => "upcoming",
            DoseStatus::Taken => "taken",
        }
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Counts over one calendar day
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySummary {
    pub overdue: usize,
    pub due_now: usize,
    pub upcoming: usize,
    pub total_today: usize,
}

/// Coarse part of the day a dose falls in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

/// A dose joined with the display fields of its medication and patient
#[derive(Clone, Debug, Serialize)]
pub struct DoseWithDetails {
    pub dose: DoseEvent,
    pub medication_name: String,
    pub dosage: Option<String>,
    pub patient_name: String,
    pub status: DoseStatus,
}
