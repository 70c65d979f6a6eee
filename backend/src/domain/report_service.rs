use std::sync::Arc;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::pet_service::PetSelectionService;
use crate::storage::sqlite::SymptomRepository;
use crate::storage::traits::SymptomStore;
use crate::worker::{RenderQueue, ReportJob};

#[derive(Debug, Clone)]
pub struct ReportQueued {
    pub entry_count: usize,
    pub pet_name: String,
}

/// Hands the selected pet's history to the background renderer without
/// waiting for it. Completion is signaled out-of-band by the render task;
/// duplicate submissions are allowed and produce duplicate artifacts.
pub struct ReportService {
    symptom_repository: SymptomRepository,
    selection: Arc<PetSelectionService>,
    render_queue: Arc<dyn RenderQueue>,
}

impl ReportService {
    pub fn new(
        symptom_repository: SymptomRepository,
        selection: Arc<PetSelectionService>,
        render_queue: Arc<dyn RenderQueue>,
    ) -> Self {
        Self {
            symptom_repository,
            selection,
            render_queue,
        }
    }

    pub async fn generate_in_background(&self) -> DomainResult<ReportQueued> {
        let pet = self
            .selection
            .selected_pet_snapshot()
            .ok_or_else(|| DomainError::NotFound("selected pet".to_string()))?;

        let mut entries = self.symptom_repository.entries_for_pet(&pet.id).await?;
        entries.sort_by_key(|e| e.date);
        let entry_count = entries.len();

        let job = ReportJob::for_pet(&pet, &entries)?;
        self.render_queue.enqueue(job).await?;

        info!("Queued report for {} ({} entries)", pet.name, entry_count);
        Ok(ReportQueued {
            entry_count,
            pet_name: pet.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::pets::CreatePetCommand;
    use crate::domain::models::symptom::SymptomEntry;
    use crate::platform::auth::StaticAuthProvider;
    use crate::storage::sqlite::{AlarmRepository, PetRepository};
    use crate::storage::DbConnection;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct CapturingQueue {
        jobs: StdMutex<Vec<ReportJob>>,
    }

    #[async_trait]
    impl RenderQueue for CapturingQueue {
        async fn enqueue(&self, job: ReportJob) -> Result<()> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    struct TestHarness {
        service: ReportService,
        selection: Arc<PetSelectionService>,
        queue: Arc<CapturingQueue>,
        repository: SymptomRepository,
    }

    async fn setup_test(with_pet: bool) -> TestHarness {
        let db = DbConnection::init_test().await.unwrap();
        let selection = Arc::new(PetSelectionService::new(
            PetRepository::new(db.clone()),
            AlarmRepository::new(db.clone()),
            Arc::new(StaticAuthProvider::new(Some("user-1".to_string()))),
        ));
        if with_pet {
            selection
                .add_pet(CreatePetCommand {
                    name: "Luna".to_string(),
                    birthday: NaiveDate::from_ymd_opt(2019, 6, 1),
                })
                .await
                .unwrap();
        }

        let repository = SymptomRepository::new(db);
        let queue = Arc::new(CapturingQueue::default());
        let service = ReportService::new(repository.clone(), selection.clone(), queue.clone());
        TestHarness {
            service,
            selection,
            queue,
            repository,
        }
    }

    fn entry(pet_id: &str, date: NaiveDate) -> SymptomEntry {
        let mut symptoms = BTreeMap::new();
        symptoms.insert("appetite".to_string(), "low".to_string());
        SymptomEntry {
            pet_id: Some(pet_id.to_string()),
            date,
            symptoms,
        }
    }

    #[tokio::test]
    async fn test_report_job_carries_sorted_entries() {
        let t = setup_test(true).await;
        let pet_id = t.selection.selected_pet_snapshot().unwrap().id;

        t.repository
            .save_entry(&entry(&pet_id, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()))
            .await
            .unwrap();
        t.repository
            .save_entry(&entry(&pet_id, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()))
            .await
            .unwrap();

        let queued = t.service.generate_in_background().await.unwrap();
        assert_eq!(queued.entry_count, 2);
        assert_eq!(queued.pet_name, "Luna");

        let jobs = t.queue.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        let entries: Vec<SymptomEntry> = serde_json::from_str(&jobs[0].entries_json).unwrap();
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(entries[1].date, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
        assert_ne!(jobs[0].pet_age, "N/A");
    }

    #[tokio::test]
    async fn test_duplicate_submissions_queue_duplicate_jobs() {
        let t = setup_test(true).await;
        t.service.generate_in_background().await.unwrap();
        t.service.generate_in_background().await.unwrap();
        assert_eq!(t.queue.jobs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_report_without_selected_pet_fails() {
        let t = setup_test(false).await;
        let result = t.service.generate_in_background().await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
        assert!(t.queue.jobs.lock().unwrap().is_empty());
    }
}
