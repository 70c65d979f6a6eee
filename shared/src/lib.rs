use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pet ID in format: "pet::<uuid>"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: String,
    /// ID of the user this pet belongs to
    pub user_id: String,
    pub name: String,
    /// Birthday, if known (used for age calculation in reports)
    pub birthday: Option<NaiveDate>,
    /// Diagnosed conditions; duplicates collapse on append
    pub diseases: Vec<String>,
}

/// Medication alarm ID in format: "alarm::<uuid>"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedAlarm {
    pub id: String,
    /// Medication name shown in the reminder notification
    pub name: String,
    /// Next fire instant as epoch milliseconds (UTC)
    pub time: i64,
    /// ID of the pet this alarm belongs to
    pub pet_id: String,
}

/// Read-only reference data describing one observable symptom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomDefinition {
    pub id: String,
    pub label: String,
    pub options: Vec<SymptomOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomOption {
    pub id: String,
    pub label: String,
}

/// One diary entry per (pet, date); `symptoms` maps symptom id -> option id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub pet_id: Option<String>,
    pub date: NaiveDate,
    pub symptoms: BTreeMap<String, String>,
}

/// Latest observable state of a coordinator, rendered as-is by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data")]
pub enum ViewState<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePetRequest {
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDiseaseRequest {
    pub disease: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetListResponse {
    pub pets: Vec<Pet>,
    /// ID of the currently selected pet, if any
    pub selected_pet_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePetResponse {
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAlarmRequest {
    /// Medication name
    pub name: String,
    pub pet_id: String,
    /// Wall-clock hour of day (0-23) for the daily reminder
    pub hour: u32,
    /// Wall-clock minute (0-59)
    pub minute: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAlarmResponse {
    pub alarm: MedAlarm,
    /// False when the alarm was persisted but the exact-alarm capability
    /// was not granted; the client should prompt for the permission
    pub scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOptionRequest {
    pub symptom_id: String,
    pub option_id: String,
}

/// Date navigation: either a relative jump or an absolute date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDateRequest {
    pub delta_days: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryView {
    pub pet_id: String,
    pub date: NaiveDate,
    pub definitions: Vec<SymptomDefinition>,
    /// Current (uncommitted) selections, symptom id -> option id
    pub selections: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReportResponse {
    /// Number of diary entries handed to the renderer
    pub entry_count: usize,
    pub pet_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetExactAlarmPermissionRequest {
    pub granted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_state_serializes_with_tag() {
        let state: ViewState<DiaryView> = ViewState::Error("boom".to_string());
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"state\":\"Error\""));
        assert!(json.contains("boom"));
    }

    #[test]
    fn test_symptom_entry_round_trip() {
        let mut symptoms = BTreeMap::new();
        symptoms.insert("appetite".to_string(), "low".to_string());
        let entry = SymptomEntry {
            pet_id: Some("pet::1".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
            symptoms,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: SymptomEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
