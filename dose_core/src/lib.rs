#![forbid(unsafe_code)]

//! Core domain model and business logic for the medtrack adherence tracker.
//!
//! This crate provides:
//! - Domain types (patients, medications, dose events, statuses)
//! - Dose schedule generation
//! - Dose status classification and day summaries
//! - Persistence (locked JSON store)
//! - Caregiver workflows, calendar views and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod schedule;
pub mod status;
pub mod store;
pub mod tracker;
pub mod calendar;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use schedule::generate_dose_events;
pub use status::{classify, dose_status, summarize_day, StatusGroups};
pub use store::{DoseStore, JsonStore, StoreData};
pub use tracker::{mark_taken, unmark_taken, Dashboard};
pub use calendar::{AdherenceLevel, DayCount, WeekStart};
pub use export::export_doses;
