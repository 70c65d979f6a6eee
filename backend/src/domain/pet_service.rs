use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::commands::pets::{CreatePetCommand, CreatePetResult, DeletePetResult};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::pet::Pet;
use crate::platform::auth::AuthProvider;
use crate::storage::sqlite::{AlarmRepository, PetRepository};
use crate::storage::traits::{AlarmStore, PetStore};

/// Single source of truth for "which pets exist" and "which pet is active",
/// shared by every other service.
///
/// Both values are published as whole snapshots over watch channels and only
/// this service writes them: readers always observe a complete, consistent
/// snapshot without locks.
pub struct PetSelectionService {
    pet_repository: PetRepository,
    alarm_repository: AlarmRepository,
    auth: Arc<dyn AuthProvider>,
    pets_tx: watch::Sender<Vec<Pet>>,
    selected_tx: watch::Sender<Option<Pet>>,
}

impl PetSelectionService {
    pub fn new(
        pet_repository: PetRepository,
        alarm_repository: AlarmRepository,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let (pets_tx, _) = watch::channel(Vec::new());
        let (selected_tx, _) = watch::channel(None);
        Self {
            pet_repository,
            alarm_repository,
            auth,
            pets_tx,
            selected_tx,
        }
    }

    /// Subscribe to the pet list
    pub fn pets(&self) -> watch::Receiver<Vec<Pet>> {
        self.pets_tx.subscribe()
    }

    /// Subscribe to the selected pet
    pub fn selected_pet(&self) -> watch::Receiver<Option<Pet>> {
        self.selected_tx.subscribe()
    }

    pub fn pets_snapshot(&self) -> Vec<Pet> {
        self.pets_tx.borrow().clone()
    }

    pub fn selected_pet_snapshot(&self) -> Option<Pet> {
        self.selected_tx.borrow().clone()
    }

    /// Fetch all pets for the authenticated user and replace the list
    /// snapshot. A still-present selection is refreshed to its new document;
    /// otherwise the first result (or none) becomes selected.
    pub async fn load_pets(&self) -> DomainResult<Vec<Pet>> {
        let pets = match self.auth.current_user_id() {
            Some(user_id) => self.pet_repository.pets_for_user(&user_id).await?,
            None => {
                info!("No authenticated user; pet scope is empty");
                Vec::new()
            }
        };

        let selected = {
            let previous = self.selected_tx.borrow().clone();
            match previous {
                Some(prev) => pets
                    .iter()
                    .find(|p| p.id == prev.id)
                    .cloned()
                    .or_else(|| pets.first().cloned()),
                None => pets.first().cloned(),
            }
        };

        self.pets_tx.send_replace(pets.clone());
        self.selected_tx.send_replace(selected);

        info!("Loaded {} pets", pets.len());
        Ok(pets)
    }

    /// Select the matching pet from the cached list; no match leaves the
    /// previous selection untouched. Never re-fetches.
    pub fn select_pet_by_id(&self, pet_id: &str) {
        let found = self
            .pets_tx
            .borrow()
            .iter()
            .find(|p| p.id == pet_id)
            .cloned();
        match found {
            Some(pet) => {
                info!("Selected pet: {} ({})", pet.name, pet.id);
                self.selected_tx.send_replace(Some(pet));
            }
            None => warn!("Ignoring selection of unknown pet: {}", pet_id),
        }
    }

    /// Persist a new pet for the authenticated user, then refresh.
    /// On a failed write the in-memory snapshots are left unchanged.
    pub async fn add_pet(&self, command: CreatePetCommand) -> DomainResult<CreatePetResult> {
        let name = command.name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidInput(
                "pet name cannot be empty".to_string(),
            ));
        }
        if name.len() > 100 {
            return Err(DomainError::InvalidInput(
                "pet name cannot exceed 100 characters".to_string(),
            ));
        }
        let user_id = self.auth.current_user_id().ok_or_else(|| {
            DomainError::InvalidInput("no authenticated user to own the pet".to_string())
        })?;

        let pet = Pet {
            id: Pet::generate_id(),
            user_id,
            name: name.to_string(),
            birthday: command.birthday,
            diseases: Vec::new(),
        };

        self.pet_repository.upsert_pet(&pet).await?;
        info!("Created pet: {} with ID: {}", pet.name, pet.id);

        self.load_pets().await?;
        Ok(CreatePetResult { pet })
    }

    /// Delete a pet and everything hanging off it. Alarms go first; a failed
    /// cascade aborts the pet delete so no alarm can outlive its pet.
    pub async fn delete_pet(&self, pet: &Pet) -> DomainResult<DeletePetResult> {
        info!("Deleting pet: {} ({})", pet.name, pet.id);

        self.alarm_repository.delete_all_for_pet(&pet.id).await?;
        self.pet_repository.delete_pet(&pet.id).await?;

        self.load_pets().await?;
        Ok(DeletePetResult {
            success_message: format!("Pet '{}' deleted", pet.name),
        })
    }

    /// Append a disease name to the pet's condition set (duplicates
    /// collapse) and return the refreshed pet, or None when the remote
    /// record vanished. A refreshed pet replaces its entry in the cached
    /// snapshots.
    pub async fn add_disease_to_pet(
        &self,
        disease: &str,
        pet: &Pet,
    ) -> DomainResult<Option<Pet>> {
        let disease = disease.trim();
        if disease.is_empty() {
            return Err(DomainError::InvalidInput(
                "disease name cannot be empty".to_string(),
            ));
        }

        let updated = self.pet_repository.add_disease(disease, &pet.id).await?;

        if let Some(updated) = &updated {
            let mut pets = self.pets_tx.borrow().clone();
            if let Some(slot) = pets.iter_mut().find(|p| p.id == updated.id) {
                *slot = updated.clone();
            }
            self.pets_tx.send_replace(pets);

            let selected_matches = self
                .selected_tx
                .borrow()
                .as_ref()
                .is_some_and(|s| s.id == updated.id);
            if selected_matches {
                self.selected_tx.send_replace(Some(updated.clone()));
            }
        }

        Ok(updated)
    }
}
