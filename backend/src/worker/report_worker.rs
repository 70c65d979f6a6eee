//! Background report rendering.
//!
//! The report service hands a serialized job to the render queue and
//! returns immediately; the queue runs the renderer on a detached task and
//! signals completion through the notifier. A failed render is logged and
//! never reaches the submitting caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::domain::models::pet::Pet;
use crate::domain::models::symptom::SymptomEntry;
use crate::platform::notifier::ReminderNotifier;

/// Self-contained payload for one render: the entry list rides along as
/// JSON so the task needs no store access of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportJob {
    pub entries_json: String,
    pub pet_name: String,
    pub pet_age: String,
    pub pet_birthday: Option<String>,
    pub pet_diseases: String,
}

impl ReportJob {
    pub fn for_pet(pet: &Pet, entries: &[SymptomEntry]) -> Result<Self> {
        Ok(Self {
            entries_json: serde_json::to_string(entries)
                .context("Failed to serialize report entries")?,
            pet_name: pet.name.clone(),
            pet_age: pet
                .age_years()
                .map(|age| age.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            pet_birthday: pet.birthday.map(|d| d.to_string()),
            pet_diseases: pet.diseases.join(", "),
        })
    }
}

/// Accepts a job and executes it independently of the caller's lifetime.
/// Duplicate submissions produce duplicate artifacts.
#[async_trait]
pub trait RenderQueue: Send + Sync {
    async fn enqueue(&self, job: ReportJob) -> Result<()>;
}

/// Formats a report document and writes it to the output directory.
#[derive(Clone)]
pub struct ReportRenderer {
    output_dir: PathBuf,
}

impl ReportRenderer {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn render(&self, job: &ReportJob) -> Result<PathBuf> {
        let mut entries: Vec<SymptomEntry> = serde_json::from_str(&job.entries_json)
            .context("Failed to parse report entries")?;
        entries.sort_by_key(|e| e.date);

        let mut content = String::new();
        content.push_str("Pet Health Report\n");
        content.push_str("=================\n");
        content.push_str(&format!("Name: {}\n", job.pet_name));
        content.push_str(&format!("Age: {} years\n", job.pet_age));
        if let Some(birthday) = &job.pet_birthday {
            content.push_str(&format!("Birthday: {}\n", birthday));
        }
        content.push_str(&format!("Conditions: {}\n\n", job.pet_diseases));

        for entry in &entries {
            content.push_str(&format!("Date: {}\n", entry.date.format("%d %b %Y")));
            for (symptom, option) in &entry.symptoms {
                content.push_str(&format!("  - {}: {}\n", symptom, option));
            }
            content.push('\n');
        }

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create report directory {:?}", self.output_dir)
        })?;

        let file_name = format!(
            "PetReport_{}_{}.txt",
            safe_file_name(&job.pet_name),
            Utc::now().timestamp_millis()
        );
        let path = self.output_dir.join(&file_name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write report file {:?}", path))?;

        info!(
            "Rendered report for {} ({} entries) to {:?}",
            job.pet_name,
            entries.len(),
            path
        );
        Ok(path)
    }
}

/// Detached-task queue: each job gets its own tokio task which renders and
/// then raises the report-ready notification.
pub struct TokioRenderQueue {
    renderer: Arc<ReportRenderer>,
    notifier: Arc<dyn ReminderNotifier>,
}

impl TokioRenderQueue {
    pub fn new(renderer: ReportRenderer, notifier: Arc<dyn ReminderNotifier>) -> Self {
        Self {
            renderer: Arc::new(renderer),
            notifier,
        }
    }
}

#[async_trait]
impl RenderQueue for TokioRenderQueue {
    async fn enqueue(&self, job: ReportJob) -> Result<()> {
        let renderer = self.renderer.clone();
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match renderer.render(&job) {
                Ok(path) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    notifier.report_ready(&file_name, &path).await;
                }
                Err(e) => error!("Report render failed for {}: {:#}", job.pet_name, e),
            }
        });
        Ok(())
    }
}

/// Filesystem-safe rendition of a pet name for the report file
fn safe_file_name(name: &str) -> String {
    let mut result = String::new();
    let mut last_was_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_underscore = false;
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }
    result.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    fn sample_pet() -> Pet {
        Pet {
            id: "pet::1".to_string(),
            user_id: "user-1".to_string(),
            name: "Luna Belle".to_string(),
            birthday: NaiveDate::from_ymd_opt(2019, 6, 1),
            diseases: vec!["Allergy".to_string(), "Arthritis".to_string()],
        }
    }

    fn sample_entries() -> Vec<SymptomEntry> {
        let mut symptoms = BTreeMap::new();
        symptoms.insert("appetite".to_string(), "low".to_string());
        vec![SymptomEntry {
            pet_id: Some("pet::1".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
            symptoms,
        }]
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("Luna Belle"), "luna_belle");
        assert_eq!(safe_file_name("Mr. Whiskers #2"), "mr_whiskers_2");
        assert_eq!(safe_file_name("  "), "");
    }

    #[test]
    fn test_job_carries_pet_metadata() {
        let job = ReportJob::for_pet(&sample_pet(), &sample_entries()).unwrap();
        assert_eq!(job.pet_name, "Luna Belle");
        assert_eq!(job.pet_diseases, "Allergy, Arthritis");
        assert_eq!(job.pet_birthday.as_deref(), Some("2019-06-01"));
        assert_ne!(job.pet_age, "N/A");
    }

    #[test]
    fn test_job_without_birthday_has_unknown_age() {
        let mut pet = sample_pet();
        pet.birthday = None;
        let job = ReportJob::for_pet(&pet, &[]).unwrap();
        assert_eq!(job.pet_age, "N/A");
        assert!(job.pet_birthday.is_none());
    }

    #[test]
    fn test_render_writes_report_file() {
        let dir = tempdir().unwrap();
        let renderer = ReportRenderer::new(dir.path().to_path_buf());
        let job = ReportJob::for_pet(&sample_pet(), &sample_entries()).unwrap();

        let path = renderer.render(&job).unwrap();
        assert!(path.exists());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Name: Luna Belle"));
        assert!(content.contains("Conditions: Allergy, Arthritis"));
        assert!(content.contains("Date: 12 Mar 2024"));
        assert!(content.contains("  - appetite: low"));
    }

    #[test]
    fn test_render_rejects_malformed_entries() {
        let dir = tempdir().unwrap();
        let renderer = ReportRenderer::new(dir.path().to_path_buf());
        let job = ReportJob {
            entries_json: "not json".to_string(),
            pet_name: "Luna".to_string(),
            pet_age: "4".to_string(),
            pet_birthday: None,
            pet_diseases: String::new(),
        };
        assert!(renderer.render(&job).is_err());
    }

    struct RecordingNotifier {
        ready: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl ReminderNotifier for RecordingNotifier {
        async fn medication_due(&self, _pet_id: &str, _alarm_name: &str) {}

        async fn report_ready(&self, file_name: &str, _path: &Path) {
            self.ready.lock().unwrap().push(file_name.to_string());
        }
    }

    #[tokio::test]
    async fn test_queue_renders_and_notifies() {
        let dir = tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier {
            ready: StdMutex::new(Vec::new()),
        });
        let queue = TokioRenderQueue::new(
            ReportRenderer::new(dir.path().to_path_buf()),
            notifier.clone(),
        );

        let job = ReportJob::for_pet(&sample_pet(), &sample_entries()).unwrap();
        queue.enqueue(job).await.unwrap();

        // The render runs detached; wait for the completion signal
        for _ in 0..100 {
            if !notifier.ready.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let ready = notifier.ready.lock().unwrap();
        assert_eq!(ready.len(), 1);
        assert!(ready[0].starts_with("PetReport_luna_belle_"));
    }
}
