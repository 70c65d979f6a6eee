use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};

use crate::domain::commands::alarms::{CreateAlarmCommand, CreateAlarmResult, ScheduleOutcome};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::alarm::MedAlarm;
use crate::platform::notifier::ReminderNotifier;
use crate::platform::wake_timer::{FiredWakeUp, WakeUpPayload, WakeUpTimer};
use crate::storage::sqlite::AlarmRepository;
use crate::storage::traits::AlarmStore;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Scheduling lifecycle of one alarm key. `Removed` is the terminal state
/// and is represented by absence from the state map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Unscheduled,
    Scheduled,
    Fired,
}

/// Keeps the persisted alarm table and the platform's wake-up timers
/// consistent, and re-arms each alarm one day ahead after it fires.
pub struct AlarmScheduleService {
    alarm_repository: AlarmRepository,
    timer: Arc<dyn WakeUpTimer>,
    notifier: Arc<dyn ReminderNotifier>,
    /// Live view per pet, created once and shared by every caller
    views: Mutex<HashMap<String, watch::Receiver<Vec<MedAlarm>>>>,
    states: Mutex<HashMap<i64, ScheduleState>>,
}

impl AlarmScheduleService {
    pub fn new(
        alarm_repository: AlarmRepository,
        timer: Arc<dyn WakeUpTimer>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> Self {
        Self {
            alarm_repository,
            timer,
            notifier,
            views: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Continuously-updated, time-ordered view of a pet's alarms. Repeated
    /// calls for the same pet share one underlying store subscription; the
    /// map fill happens under the lock so concurrent first calls cannot
    /// race two subscriptions into existence.
    pub async fn alarms_for_pet(
        &self,
        pet_id: &str,
    ) -> DomainResult<watch::Receiver<Vec<MedAlarm>>> {
        let mut views = self.views.lock().await;
        if let Some(view) = views.get(pet_id) {
            return Ok(view.clone());
        }

        let view = self.alarm_repository.watch_alarms_for_pet(pet_id).await?;
        views.insert(pet_id.to_string(), view.clone());
        Ok(view)
    }

    /// Persist a new alarm and register its wake-up. When exact scheduling
    /// is not permitted the alarm is still persisted and the caller is told
    /// to request the capability; that is a degraded outcome, not an error.
    pub async fn add_alarm(&self, command: CreateAlarmCommand) -> DomainResult<CreateAlarmResult> {
        let name = command.name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidInput(
                "alarm name cannot be empty".to_string(),
            ));
        }
        if command.time <= Utc::now().timestamp_millis() {
            return Err(DomainError::InvalidInput(
                "alarm trigger must be in the future".to_string(),
            ));
        }

        let alarm = MedAlarm {
            id: MedAlarm::generate_id(),
            name: name.to_string(),
            time: command.time,
            pet_id: command.pet_id,
        };
        self.alarm_repository.insert_alarm(&alarm).await?;
        info!("Created alarm: {} with ID: {}", alarm.name, alarm.id);

        let key = alarm.schedule_key();
        if !self.timer.can_schedule_exact() {
            warn!(
                "Exact alarm permission not granted; alarm {} persisted unscheduled",
                alarm.id
            );
            self.states.lock().await.insert(key, ScheduleState::Unscheduled);
            return Ok(CreateAlarmResult {
                alarm,
                outcome: ScheduleOutcome::PersistedUnscheduled,
            });
        }

        self.timer
            .register_exact(
                key,
                alarm.time,
                WakeUpPayload {
                    alarm_name: alarm.name.clone(),
                    pet_id: alarm.pet_id.clone(),
                },
            )
            .await?;
        self.states.lock().await.insert(key, ScheduleState::Scheduled);

        Ok(CreateAlarmResult {
            alarm,
            outcome: ScheduleOutcome::Scheduled,
        })
    }

    /// Delete the persisted alarm and cancel its wake-up. Both halves are
    /// no-ops when already gone, so a second call does nothing.
    pub async fn remove_alarm(&self, alarm: &MedAlarm) -> DomainResult<()> {
        let removed = self
            .alarm_repository
            .delete_alarm(&alarm.name, alarm.time, &alarm.pet_id)
            .await?;
        if removed {
            info!("Removed alarm: {} ({})", alarm.name, alarm.id);
        }

        let key = alarm.schedule_key();
        self.timer.cancel(key).await;
        self.states.lock().await.remove(&key);
        Ok(())
    }

    /// `Fired -> Scheduled` transition, driven by the timer's fire events:
    /// notify the user, re-persist the trigger one day ahead under the same
    /// identity, and re-register under the same key.
    pub async fn handle_fired(&self, fired: FiredWakeUp) {
        let FiredWakeUp { key, payload } = fired;
        self.states.lock().await.insert(key, ScheduleState::Fired);

        self.notifier
            .medication_due(&payload.pet_id, &payload.alarm_name)
            .await;

        let next_time = Utc::now().timestamp_millis() + DAY_MILLIS;
        if let Err(e) = self
            .alarm_repository
            .advance_trigger(&payload.alarm_name, &payload.pet_id, next_time)
            .await
        {
            error!(
                "Failed to advance trigger for '{}': {:#}",
                payload.alarm_name, e
            );
            return;
        }

        if !self.timer.can_schedule_exact() {
            warn!(
                "Exact alarm permission revoked; '{}' stays unscheduled until re-granted",
                payload.alarm_name
            );
            self.states.lock().await.insert(key, ScheduleState::Unscheduled);
            return;
        }

        match self.timer.register_exact(key, next_time, payload.clone()).await {
            Ok(()) => {
                self.states.lock().await.insert(key, ScheduleState::Scheduled);
            }
            Err(e) => error!(
                "Failed to re-register wake-up for '{}': {:#}",
                payload.alarm_name, e
            ),
        }
    }

    /// Drain fire events until the timer side closes. Spawned once at
    /// startup.
    pub async fn run(self: Arc<Self>, mut fired_rx: mpsc::Receiver<FiredWakeUp>) {
        while let Some(fired) = fired_rx.recv().await {
            self.handle_fired(fired).await;
        }
    }

    /// Current lifecycle state of an alarm's wake-up registration
    pub async fn schedule_state(&self, alarm: &MedAlarm) -> Option<ScheduleState> {
        self.states.lock().await.get(&alarm.schedule_key()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DbConnection;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Timer fake that records registrations instead of sleeping
    #[derive(Default)]
    struct RecordingTimer {
        permission_denied: AtomicBool,
        registered: StdMutex<Vec<(i64, i64, WakeUpPayload)>>,
        cancelled: StdMutex<Vec<i64>>,
    }

    #[async_trait]
    impl WakeUpTimer for RecordingTimer {
        fn can_schedule_exact(&self) -> bool {
            !self.permission_denied.load(Ordering::Relaxed)
        }

        async fn register_exact(
            &self,
            key: i64,
            trigger_at_millis: i64,
            payload: WakeUpPayload,
        ) -> Result<()> {
            self.registered
                .lock()
                .unwrap()
                .push((key, trigger_at_millis, payload));
            Ok(())
        }

        async fn cancel(&self, key: i64) {
            self.cancelled.lock().unwrap().push(key);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        medication_calls: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ReminderNotifier for RecordingNotifier {
        async fn medication_due(&self, pet_id: &str, alarm_name: &str) {
            self.medication_calls
                .lock()
                .unwrap()
                .push((pet_id.to_string(), alarm_name.to_string()));
        }

        async fn report_ready(&self, _file_name: &str, _path: &Path) {}
    }

    struct TestHarness {
        service: AlarmScheduleService,
        repository: AlarmRepository,
        timer: Arc<RecordingTimer>,
        notifier: Arc<RecordingNotifier>,
    }

    async fn setup_test() -> TestHarness {
        let db = DbConnection::init_test().await.unwrap();
        let repository = AlarmRepository::new(db);
        let timer = Arc::new(RecordingTimer::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = AlarmScheduleService::new(
            repository.clone(),
            timer.clone(),
            notifier.clone(),
        );
        TestHarness {
            service,
            repository,
            timer,
            notifier,
        }
    }

    fn future_millis() -> i64 {
        Utc::now().timestamp_millis() + 60_000
    }

    #[tokio::test]
    async fn test_add_alarm_persists_and_schedules() {
        let t = setup_test().await;
        let result = t
            .service
            .add_alarm(CreateAlarmCommand {
                name: "Insulin".to_string(),
                pet_id: "pet::1".to_string(),
                time: future_millis(),
            })
            .await
            .unwrap();

        assert_eq!(result.outcome, ScheduleOutcome::Scheduled);
        assert_eq!(t.repository.alarms_for_pet("pet::1").await.unwrap().len(), 1);
        assert_eq!(t.timer.registered.lock().unwrap().len(), 1);
        assert_eq!(
            t.service.schedule_state(&result.alarm).await,
            Some(ScheduleState::Scheduled)
        );
    }

    #[tokio::test]
    async fn test_add_alarm_degrades_without_permission() {
        let t = setup_test().await;
        t.timer.permission_denied.store(true, Ordering::Relaxed);

        let result = t
            .service
            .add_alarm(CreateAlarmCommand {
                name: "Insulin".to_string(),
                pet_id: "pet::1".to_string(),
                time: future_millis(),
            })
            .await
            .unwrap();

        // Persisted but not scheduled: the caller should prompt for the
        // capability
        assert_eq!(result.outcome, ScheduleOutcome::PersistedUnscheduled);
        assert_eq!(t.repository.alarms_for_pet("pet::1").await.unwrap().len(), 1);
        assert!(t.timer.registered.lock().unwrap().is_empty());
        assert_eq!(
            t.service.schedule_state(&result.alarm).await,
            Some(ScheduleState::Unscheduled)
        );
    }

    #[tokio::test]
    async fn test_add_alarm_rejects_past_trigger() {
        let t = setup_test().await;
        let result = t
            .service
            .add_alarm(CreateAlarmCommand {
                name: "Insulin".to_string(),
                pet_id: "pet::1".to_string(),
                time: Utc::now().timestamp_millis() - 1,
            })
            .await;
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert!(t.repository.alarms_for_pet("pet::1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_alarm_twice_is_noop() {
        let t = setup_test().await;
        let result = t
            .service
            .add_alarm(CreateAlarmCommand {
                name: "Insulin".to_string(),
                pet_id: "pet::1".to_string(),
                time: future_millis(),
            })
            .await
            .unwrap();

        t.service.remove_alarm(&result.alarm).await.unwrap();
        // Second removal: nothing left to delete or cancel, still Ok
        t.service.remove_alarm(&result.alarm).await.unwrap();

        assert!(t.repository.alarms_for_pet("pet::1").await.unwrap().is_empty());
        assert_eq!(t.service.schedule_state(&result.alarm).await, None);
    }

    #[tokio::test]
    async fn test_fired_alarm_notifies_and_reschedules_a_day_ahead() {
        let t = setup_test().await;
        let result = t
            .service
            .add_alarm(CreateAlarmCommand {
                name: "Insulin".to_string(),
                pet_id: "pet::1".to_string(),
                time: future_millis(),
            })
            .await
            .unwrap();
        let original_time = result.alarm.time;
        let key = result.alarm.schedule_key();

        t.service
            .handle_fired(FiredWakeUp {
                key,
                payload: WakeUpPayload {
                    alarm_name: "Insulin".to_string(),
                    pet_id: "pet::1".to_string(),
                },
            })
            .await;

        // User notified
        let calls = t.notifier.medication_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("pet::1".to_string(), "Insulin".to_string())]);

        // Trigger re-persisted about a day ahead, same row identity
        let alarms = t.repository.alarms_for_pet("pet::1").await.unwrap();
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].id, result.alarm.id);
        assert!(alarms[0].time > original_time);
        assert!(alarms[0].time - Utc::now().timestamp_millis() > DAY_MILLIS - 5_000);

        // Re-registered under the same key
        let registered = t.timer.registered.lock().unwrap();
        assert_eq!(registered.len(), 2);
        assert_eq!(registered[1].0, key);
        assert_eq!(
            t.service.schedule_state(&result.alarm).await,
            Some(ScheduleState::Scheduled)
        );
    }

    #[tokio::test]
    async fn test_fired_alarm_stays_unscheduled_when_permission_revoked() {
        let t = setup_test().await;
        let result = t
            .service
            .add_alarm(CreateAlarmCommand {
                name: "Insulin".to_string(),
                pet_id: "pet::1".to_string(),
                time: future_millis(),
            })
            .await
            .unwrap();

        t.timer.permission_denied.store(true, Ordering::Relaxed);
        t.service
            .handle_fired(FiredWakeUp {
                key: result.alarm.schedule_key(),
                payload: WakeUpPayload {
                    alarm_name: "Insulin".to_string(),
                    pet_id: "pet::1".to_string(),
                },
            })
            .await;

        assert_eq!(
            t.service.schedule_state(&result.alarm).await,
            Some(ScheduleState::Unscheduled)
        );
        // Only the initial registration happened
        assert_eq!(t.timer.registered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_live_view_is_memoized_per_pet() {
        let t = setup_test().await;
        let first = t.service.alarms_for_pet("pet::1").await.unwrap();
        let second = t.service.alarms_for_pet("pet::1").await.unwrap();

        // Both handles observe the same underlying subscription
        t.service
            .add_alarm(CreateAlarmCommand {
                name: "Insulin".to_string(),
                pet_id: "pet::1".to_string(),
                time: future_millis(),
            })
            .await
            .unwrap();

        assert_eq!(first.borrow().len(), 1);
        assert_eq!(second.borrow().len(), 1);
        assert_eq!(t.service.views.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_view_for_unknown_pet() {
        let t = setup_test().await;
        let view = t.service.alarms_for_pet("pet::x").await.unwrap();
        assert!(view.borrow().is_empty());
    }
}
