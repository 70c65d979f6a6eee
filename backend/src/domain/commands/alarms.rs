use crate::domain::models::alarm::MedAlarm;

/// Command to create a daily medication alarm. `time` is the next fire
/// instant in epoch millis and must be strictly in the future.
#[derive(Debug, Clone)]
pub struct CreateAlarmCommand {
    pub name: String,
    pub pet_id: String,
    pub time: i64,
}

#[derive(Debug, Clone)]
pub struct CreateAlarmResult {
    pub alarm: MedAlarm,
    pub outcome: ScheduleOutcome,
}

/// How far `add_alarm` got. A missing exact-alarm permission is not a
/// failure; the alarm is persisted and the caller should prompt for the
/// capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled,
    PersistedUnscheduled,
}
