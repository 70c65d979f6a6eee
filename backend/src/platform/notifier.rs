use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// User-facing notifications. The delivery channel (system tray, push, ...)
/// is a platform concern; the core only states what happened.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    /// A medication alarm fired
    async fn medication_due(&self, pet_id: &str, alarm_name: &str);

    /// A background report render finished
    async fn report_ready(&self, file_name: &str, path: &Path);
}

/// Default notifier: structured log lines stand in for the platform's
/// notification channel.
pub struct LogNotifier;

#[async_trait]
impl ReminderNotifier for LogNotifier {
    async fn medication_due(&self, pet_id: &str, alarm_name: &str) {
        info!("Medication due for pet {}: {}", pet_id, alarm_name);
    }

    async fn report_ready(&self, file_name: &str, path: &Path) {
        info!("Report generated: {} ({})", file_name, path.display());
    }
}
