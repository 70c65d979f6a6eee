//! # Storage Traits
//!
//! Contracts the domain layer consumes, kept free of any storage
//! implementation detail so backends can be swapped without touching the
//! services.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::watch;

use crate::domain::models::alarm::MedAlarm;
use crate::domain::models::pet::Pet;
use crate::domain::models::symptom::{SymptomDefinition, SymptomEntry};

/// Remote pet collection: documents keyed by pet id, scoped per owner.
#[async_trait]
pub trait PetStore: Send + Sync {
    /// All pets belonging to a user, in store order (no client-side sort)
    async fn pets_for_user(&self, user_id: &str) -> Result<Vec<Pet>>;

    /// Retrieve a single pet by ID
    async fn get_pet(&self, pet_id: &str) -> Result<Option<Pet>>;

    /// Insert or fully replace a pet document
    async fn upsert_pet(&self, pet: &Pet) -> Result<()>;

    /// Delete a pet by ID
    async fn delete_pet(&self, pet_id: &str) -> Result<()>;

    /// Set-union append of a disease name (duplicates collapse).
    /// Returns the refreshed pet, or None when the record vanished.
    async fn add_disease(&self, disease: &str, pet_id: &str) -> Result<Option<Pet>>;
}

/// Persistent alarm table with a live per-pet view.
#[async_trait]
pub trait AlarmStore: Send + Sync {
    async fn insert_alarm(&self, alarm: &MedAlarm) -> Result<()>;

    /// Delete by identity fields; a missing row is a no-op.
    /// Returns whether a row was actually removed.
    async fn delete_alarm(&self, name: &str, time: i64, pet_id: &str) -> Result<bool>;

    /// Cascade helper: remove every alarm owned by a pet
    async fn delete_all_for_pet(&self, pet_id: &str) -> Result<u32>;

    /// Alarms for a pet ordered by trigger time ascending
    async fn alarms_for_pet(&self, pet_id: &str) -> Result<Vec<MedAlarm>>;

    /// Live ordered view for a pet, re-published after every mutation that
    /// touches the pet's rows. An unknown pet yields an empty view.
    async fn watch_alarms_for_pet(&self, pet_id: &str) -> Result<watch::Receiver<Vec<MedAlarm>>>;

    /// Re-persist the next fire instant after an alarm fires, matching on
    /// the alarm's (name, pet_id) identity
    async fn advance_trigger(&self, name: &str, pet_id: &str, next_time: i64) -> Result<()>;
}

/// Symptom reference data plus the composite-keyed diary entries.
#[async_trait]
pub trait SymptomStore: Send + Sync {
    /// Reference data; a failed fetch degrades to an empty list so the
    /// diary stays usable without connectivity
    async fn definitions(&self) -> Result<Vec<SymptomDefinition>>;

    /// Entry for the composite (pet, date) key; missing is empty-state
    async fn entry_for_pet_and_date(
        &self,
        pet_id: &str,
        date: NaiveDate,
    ) -> Result<Option<SymptomEntry>>;

    /// All-time entries for a pet (report input)
    async fn entries_for_pet(&self, pet_id: &str) -> Result<Vec<SymptomEntry>>;

    /// Full overwrite keyed on (pet_id, date)
    async fn save_entry(&self, entry: &SymptomEntry) -> Result<()>;
}
