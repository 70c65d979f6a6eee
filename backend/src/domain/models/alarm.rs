use chrono::{Duration, Local, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Domain model for a daily medication alarm.
/// `time` always holds the next fire instant (epoch millis); after a fire
/// the scheduler re-persists a trigger one day ahead under the same identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedAlarm {
    pub id: String,
    pub name: String,
    pub time: i64,
    pub pet_id: String,
}

impl MedAlarm {
    /// Generate a unique ID for an alarm
    pub fn generate_id() -> String {
        format!("alarm::{}", Uuid::new_v4())
    }

    /// Integer key identifying this alarm's wake-up registration.
    /// Derived from (name, pet_id) only, so the daily reschedule and a later
    /// cancel resolve to the same registration.
    pub fn schedule_key(&self) -> i64 {
        schedule_key(&self.name, &self.pet_id)
    }
}

/// Wake-up registration key for an alarm identity
pub fn schedule_key(name: &str, pet_id: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    pet_id.hash(&mut hasher);
    hasher.finish() as i64
}

/// Epoch millis of the next wall-clock `hour:minute`, advancing by one day
/// when that time has already passed today. Callers construct alarm triggers
/// with this; the scheduler itself rejects instants in the past.
pub fn next_trigger_instant(hour: u32, minute: u32) -> i64 {
    let now = Local::now();
    let target = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let mut candidate = now.date_naive().and_time(target);
    if candidate <= now.naive_local() {
        candidate += Duration::days(1);
    }
    match candidate.and_local_timezone(Local).earliest() {
        Some(instant) => instant.timestamp_millis(),
        // The candidate fell into a DST gap; a full day later is always valid
        // enough for a daily reminder.
        None => (now + Duration::days(1)).timestamp_millis(),
    }
}
