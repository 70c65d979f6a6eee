use chrono::{Duration, Local, NaiveDate};
use shared::{DiaryView, ViewState};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::symptom::{SymptomDefinition, SymptomEntry};
use crate::domain::pet_service::PetSelectionService;
use crate::mappers;
use crate::storage::sqlite::SymptomRepository;
use crate::storage::traits::SymptomStore;

/// Edit buffer plus whatever was last loaded for the active (pet, date).
struct DiaryEdit {
    date: NaiveDate,
    /// Uncommitted selections; symptom id -> option id, last write wins
    selected_options: BTreeMap<String, String>,
    loaded_entry: Option<SymptomEntry>,
    definitions: Vec<SymptomDefinition>,
}

/// Loads and persists exactly one symptom entry per (pet, date) and holds
/// the in-session selections until `save` commits them wholesale.
///
/// The latest state is published as `Loading | Success | Error`; callers
/// render it as-is and re-invoke on failure (no automatic retry).
pub struct SymptomDiaryService {
    symptom_repository: SymptomRepository,
    selection: Arc<PetSelectionService>,
    state_tx: watch::Sender<ViewState<DiaryView>>,
    edit: Mutex<DiaryEdit>,
}

impl SymptomDiaryService {
    pub fn new(symptom_repository: SymptomRepository, selection: Arc<PetSelectionService>) -> Self {
        let (state_tx, _) = watch::channel(ViewState::Loading);
        Self {
            symptom_repository,
            selection,
            state_tx,
            edit: Mutex::new(DiaryEdit {
                date: Local::now().date_naive(),
                selected_options: BTreeMap::new(),
                loaded_entry: None,
                definitions: Vec::new(),
            }),
        }
    }

    pub fn state(&self) -> watch::Receiver<ViewState<DiaryView>> {
        self.state_tx.subscribe()
    }

    pub fn state_snapshot(&self) -> ViewState<DiaryView> {
        self.state_tx.borrow().clone()
    }

    pub async fn active_date(&self) -> NaiveDate {
        self.edit.lock().await.date
    }

    /// Fetch definitions and the entry for the active (pet, date). A missing
    /// entry is an empty selection map, not an error; a missing or blank pet
    /// id is.
    pub async fn load_entry(&self) -> DomainResult<()> {
        self.state_tx.send_replace(ViewState::Loading);
        match self.load_entry_inner().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state_tx.send_replace(ViewState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn load_entry_inner(&self) -> DomainResult<()> {
        // Reference data first, unconditionally; the repository degrades a
        // failed fetch to an empty list.
        let definitions = self.symptom_repository.definitions().await?;

        let pet_id = self
            .selection
            .selected_pet_snapshot()
            .map(|p| p.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| DomainError::InvalidInput("no pet selected".to_string()))?;

        let mut edit = self.edit.lock().await;
        let entry = self
            .symptom_repository
            .entry_for_pet_and_date(&pet_id, edit.date)
            .await?;

        edit.selected_options = entry
            .as_ref()
            .map(|e| e.symptoms.clone())
            .unwrap_or_default();
        edit.loaded_entry = entry;
        edit.definitions = definitions;

        self.publish_success(&edit, &pet_id);
        Ok(())
    }

    /// Buffer a selection for one symptom; replaces any prior choice for it.
    /// Nothing is persisted until `save`.
    pub async fn select_option(&self, symptom_id: &str, option_id: &str) {
        let mut edit = self.edit.lock().await;
        edit.selected_options
            .insert(symptom_id.to_string(), option_id.to_string());

        if let Some(pet) = self.selection.selected_pet_snapshot() {
            self.publish_success(&edit, &pet.id);
        }
    }

    /// Commit the buffer as a full overwrite of the (pet, date) record, then
    /// reload to confirm. An empty buffer falls back to the previously
    /// loaded selections so an edit-free save cannot blank the entry.
    pub async fn save(&self) -> DomainResult<()> {
        match self.save_inner().await {
            Ok(()) => self.load_entry().await,
            Err(e) => {
                self.state_tx.send_replace(ViewState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn save_inner(&self) -> DomainResult<()> {
        let pet_id = self
            .selection
            .selected_pet_snapshot()
            .map(|p| p.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| DomainError::InvalidInput("no pet selected".to_string()))?;

        let mut edit = self.edit.lock().await;
        let symptoms = if edit.selected_options.is_empty() {
            edit.loaded_entry
                .as_ref()
                .map(|e| e.symptoms.clone())
                .unwrap_or_default()
        } else {
            edit.selected_options.clone()
        };

        let entry = SymptomEntry {
            pet_id: Some(pet_id.clone()),
            date: edit.date,
            symptoms,
        };
        self.symptom_repository.save_entry(&entry).await?;
        info!("Saved diary entry for {} on {}", pet_id, entry.date);

        edit.loaded_entry = Some(entry);
        edit.selected_options.clear();
        Ok(())
    }

    /// Move the active date by a number of days and reload
    pub async fn change_date(&self, delta_days: i64) -> DomainResult<()> {
        {
            let mut edit = self.edit.lock().await;
            edit.date += Duration::days(delta_days);
        }
        self.load_entry().await
    }

    /// Jump to an absolute date and reload
    pub async fn change_to_date(&self, date: NaiveDate) -> DomainResult<()> {
        {
            let mut edit = self.edit.lock().await;
            edit.date = date;
        }
        self.load_entry().await
    }

    fn publish_success(&self, edit: &DiaryEdit, pet_id: &str) {
        self.state_tx.send_replace(ViewState::Success(DiaryView {
            pet_id: pet_id.to_string(),
            date: edit.date,
            definitions: edit
                .definitions
                .iter()
                .map(mappers::definition_to_dto)
                .collect(),
            selections: edit.selected_options.clone(),
        }));
    }
}
