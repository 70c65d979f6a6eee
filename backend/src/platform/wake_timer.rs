use anyhow::{ensure, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Identity carried through a wake-up registration and delivered back when
/// it fires; enough to notify and to reschedule without a store lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct WakeUpPayload {
    pub alarm_name: String,
    pub pet_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiredWakeUp {
    pub key: i64,
    pub payload: WakeUpPayload,
}

/// One-shot exact wake-up facility, keyed by a caller-supplied integer.
/// Registering under an existing key replaces the pending wake-up; the
/// exact-alarm capability may be revoked at any time.
#[async_trait]
pub trait WakeUpTimer: Send + Sync {
    /// Whether exact scheduling is currently permitted
    fn can_schedule_exact(&self) -> bool;

    /// Register (or replace) the wake-up under `key` at an epoch-millis
    /// instant that must be strictly in the future
    async fn register_exact(
        &self,
        key: i64,
        trigger_at_millis: i64,
        payload: WakeUpPayload,
    ) -> Result<()>;

    /// Cancel the wake-up under `key`; an unknown key is a no-op
    async fn cancel(&self, key: i64);
}

/// In-process timer: one sleeping task per pending key, fire events drained
/// through an mpsc channel by the alarm service loop.
pub struct TokioWakeUpTimer {
    permission: AtomicBool,
    pending: Mutex<HashMap<i64, JoinHandle<()>>>,
    fired_tx: mpsc::Sender<FiredWakeUp>,
}

impl TokioWakeUpTimer {
    pub fn new(exact_allowed: bool) -> (Arc<Self>, mpsc::Receiver<FiredWakeUp>) {
        let (fired_tx, fired_rx) = mpsc::channel(32);
        let timer = Arc::new(Self {
            permission: AtomicBool::new(exact_allowed),
            pending: Mutex::new(HashMap::new()),
            fired_tx,
        });
        (timer, fired_rx)
    }

    /// Grant or revoke the exact-alarm capability at runtime
    pub fn set_exact_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::Relaxed);
        info!("Exact alarm permission set to {}", granted);
    }
}

#[async_trait]
impl WakeUpTimer for TokioWakeUpTimer {
    fn can_schedule_exact(&self) -> bool {
        self.permission.load(Ordering::Relaxed)
    }

    async fn register_exact(
        &self,
        key: i64,
        trigger_at_millis: i64,
        payload: WakeUpPayload,
    ) -> Result<()> {
        let delay = trigger_at_millis - Utc::now().timestamp_millis();
        ensure!(delay > 0, "wake-up trigger instant is in the past");

        let fired_tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            let _ = fired_tx.send(FiredWakeUp { key, payload }).await;
        });

        let mut pending = self.pending.lock().await;
        if let Some(old) = pending.insert(key, handle) {
            // Same key replaces the pending registration
            old.abort();
        }
        debug!("Registered wake-up {} in {}ms", key, delay);
        Ok(())
    }

    async fn cancel(&self, key: i64) {
        if let Some(handle) = self.pending.lock().await.remove(&key) {
            handle.abort();
            debug!("Cancelled wake-up {}", key);
        }
    }
}
