//! File-backed record store with locking and atomic replacement.
//!
//! Patients, medications and doses live in one JSON document. Every write
//! goes through [`JsonStore::transaction`], which holds an exclusive lock on a
//! sidecar `.lock` file across load, modify and save, and replaces the data
//! file by renaming a fully written temp file over it. A transaction that
//! fails before saving leaves the previous file untouched.

use crate::{DoseEvent, Error, Medication, NewDoseEvent, Patient, Result};
use chrono::NaiveDateTime;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Persistence operations the dose workflows rely on
pub trait DoseStore {
    /// Insert a batch of doses, all or none, returning them with ids assigned
    fn insert_doses(&mut self, doses: &[NewDoseEvent]) -> Result<Vec<DoseEvent>>;

    /// All doses of one medication, ordered by scheduled date then taken-at
    fn doses_for_medication(&self, medication_id: Uuid) -> Result<Vec<DoseEvent>>;

    /// Doses scheduled within `[start, end]`, ordered by scheduled date
    fn doses_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<DoseEvent>>;

    /// Overwrite one dose's `taken_at`, or fail with `NotFound`
    fn set_taken_at(&mut self, dose_id: Uuid, taken_at: Option<NaiveDateTime>)
        -> Result<DoseEvent>;
}

/// Snapshot of every stored record
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StoreData {
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub doses: Vec<DoseEvent>,
}

impl StoreData {
    pub fn patient(&self, id: Uuid) -> Result<&Patient> {
        self.patients
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::patient_not_found(id))
    }

    pub fn patient_mut(&mut self, id: Uuid) -> Result<&mut Patient> {
        self.patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::patient_not_found(id))
    }

    pub fn medication(&self, id: Uuid) -> Result<&Medication> {
        self.medications
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::medication_not_found(id))
    }

    pub fn medication_mut(&mut self, id: Uuid) -> Result<&mut Medication> {
        self.medications
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::medication_not_found(id))
    }

    pub fn dose(&self, id: Uuid) -> Result<&DoseEvent> {
        self.doses
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::dose_not_found(id))
    }

    /// Remove a medication together with all of its doses
    pub fn remove_medication(&mut self, id: Uuid) -> Result<(Medication, usize)> {
        let index = self
            .medications
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::medication_not_found(id))?;
        let medication = self.medications.remove(index);

        let before = self.doses.len();
        self.doses.retain(|d| d.medication_id != id);
        Ok((medication, before - self.doses.len()))
    }
}

impl DoseStore for StoreData {
    fn insert_doses(&mut self, doses: &[NewDoseEvent]) -> Result<Vec<DoseEvent>> {
        let inserted: Vec<DoseEvent> = doses
            .iter()
            .map(|dose| DoseEvent::from_new(Uuid::new_v4(), dose))
            .collect();
        self.doses.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    fn doses_for_medication(&self, medication_id: Uuid) -> Result<Vec<DoseEvent>> {
        let mut doses: Vec<DoseEvent> = self
            .doses
            .iter()
            .filter(|d| d.medication_id == medication_id)
            .cloned()
            .collect();
        // Within a date, taken doses first (by time), pending last
        doses.sort_by(|a, b| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then_with(|| match (a.taken_at, b.taken_at) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
        Ok(doses)
    }

    fn doses_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<DoseEvent>> {
        let mut doses: Vec<DoseEvent> = self
            .doses
            .iter()
            .filter(|d| d.scheduled_date >= start && d.scheduled_date <= end)
            .cloned()
            .collect();
        doses.sort_by_key(|d| d.scheduled_date);
        Ok(doses)
    }

    fn set_taken_at(
        &mut self,
        dose_id: Uuid,
        taken_at: Option<NaiveDateTime>,
    ) -> Result<DoseEvent> {
        let dose = self
            .doses
            .iter_mut()
            .find(|d| d.id == dose_id)
            .ok_or_else(|| Error::dose_not_found(dose_id))?;
        dose.taken_at = taken_at;
        Ok(dose.clone())
    }
}

/// JSON document store at a fixed path
#[derive(Clone, Debug)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Create a store backed by the given file (created on first save)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn open_lock_file(&self) -> Result<File> {
        self.ensure_parent_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Load a snapshot under a shared lock.
    ///
    /// A missing file is an empty store. A corrupt file is an error: records
    /// are never silently discarded.
    pub fn load(&self) -> Result<StoreData> {
        if !self.path.exists() {
            tracing::info!("No store file at {:?}, starting empty", self.path);
            return Ok(StoreData::default());
        }

        let lock = self.open_lock_file()?;
        lock.lock_shared()?;
        let result = self.read_unlocked();
        lock.unlock()?;
        result
    }

    fn read_unlocked(&self) -> Result<StoreData> {
        if !self.path.exists() {
            return Ok(StoreData::default());
        }

        let file = File::open(&self.path)?;
        let mut contents = String::new();
        std::io::BufReader::new(&file).read_to_string(&mut contents)?;

        let data: StoreData = serde_json::from_str(&contents).map_err(|e| {
            tracing::error!("Store file {:?} is not valid: {}", self.path, e);
            Error::Json(e)
        })?;

        tracing::debug!(
            "Loaded store from {:?} ({} patients, {} medications, {} doses)",
            self.path,
            data.patients.len(),
            data.medications.len(),
            data.doses.len()
        );
        Ok(data)
    }

    /// Atomically writes the snapshot by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn write_unlocked(&self, data: &StoreData) -> Result<()> {
        self.ensure_parent_dir()?;

        let temp = NamedTempFile::new_in(self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, data)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", self.path);
        Ok(())
    }

    /// Save a snapshot under an exclusive lock
    pub fn save(&self, data: &StoreData) -> Result<()> {
        let lock = self.open_lock_file()?;
        lock.lock_exclusive()?;
        let result = self.write_unlocked(data);
        lock.unlock()?;
        result
    }

    /// Load, modify and save as one unit.
    ///
    /// The exclusive lock is held throughout, so concurrent transactions
    /// serialize instead of losing each other's writes. If `f` fails nothing
    /// is written.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreData) -> Result<T>,
    {
        let lock = self.open_lock_file()?;
        lock.lock_exclusive()?;

        let result = self.read_unlocked().and_then(|mut data| {
            let value = f(&mut data)?;
            self.write_unlocked(&data)?;
            Ok(value)
        });

        lock.unlock()?;
        result
    }
}

impl DoseStore for JsonStore {
    fn insert_doses(&mut self, doses: &[NewDoseEvent]) -> Result<Vec<DoseEvent>> {
        self.transaction(|data| data.insert_doses(doses))
    }

    fn doses_for_medication(&self, medication_id: Uuid) -> Result<Vec<DoseEvent>> {
        self.load()?.doses_for_medication(medication_id)
    }

    fn doses_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<DoseEvent>> {
        self.load()?.doses_between(start, end)
    }

    fn set_taken_at(
        &mut self,
        dose_id: Uuid,
        taken_at: Option<NaiveDateTime>,
    ) -> Result<DoseEvent> {
        self.transaction(|data| data.set_taken_at(dose_id, taken_at))
    }
}
