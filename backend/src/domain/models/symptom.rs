use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only reference data describing one observable symptom and the
/// options a diary entry can select for it.
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

/// One diary entry per (pet, date). `symptoms` maps symptom id to the
/// selected option id. Saved wholesale; never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub pet_id: Option<String>,
    pub date: NaiveDate,
    pub symptoms: BTreeMap<String, String>,
}

impl SymptomEntry {
    /// Composite store key; enforces at most one entry per pet per date
    pub fn storage_key(pet_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", pet_id, date)
    }

    pub fn key(&self) -> Option<String> {
        self.pet_id
            .as_deref()
            .map(|pet_id| Self::storage_key(pet_id, self.date))
    }
}
