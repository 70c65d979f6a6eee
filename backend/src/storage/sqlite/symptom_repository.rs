use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::{info, warn};

use super::connection::DbConnection;
use crate::domain::models::symptom::{SymptomDefinition, SymptomEntry};
use crate::storage::traits::SymptomStore;

/// SQLite-backed symptom collections: read-only definitions plus the diary
/// entries keyed by the composite "<pet_id>_<date>" string.
#[derive(Clone)]
pub struct SymptomRepository {
    connection: DbConnection,
}

impl SymptomRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn row_to_entry(row: &SqliteRow) -> Result<SymptomEntry> {
        let date: String = row.get("date");
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| anyhow!("Failed to parse entry date: {}", e))?;

        let symptoms: String = row.get("symptoms");
        let symptoms = serde_json::from_str(&symptoms)
            .map_err(|e| anyhow!("Failed to parse symptoms column: {}", e))?;

        Ok(SymptomEntry {
            pet_id: Some(row.get("pet_id")),
            date,
            symptoms,
        })
    }

    /// Seed the reference data on first run; existing definitions win.
    pub async fn seed_definitions_if_empty(&self, defs: &[SymptomDefinition]) -> Result<()> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM symptom_definitions")
            .fetch_one(self.connection.pool())
            .await?;
        let count: i64 = row.get("n");
        if count > 0 {
            return Ok(());
        }

        for def in defs {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO symptom_definitions (id, label, options)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&def.id)
            .bind(&def.label)
            .bind(serde_json::to_string(&def.options)?)
            .execute(self.connection.pool())
            .await?;
        }

        info!("Seeded {} symptom definitions", defs.len());
        Ok(())
    }
}

#[async_trait]
impl SymptomStore for SymptomRepository {
    async fn definitions(&self) -> Result<Vec<SymptomDefinition>> {
        // Reference data is non-critical: a failed fetch degrades to an
        // empty list so the diary stays usable offline.
        let rows = match sqlx::query("SELECT id, label, options FROM symptom_definitions")
            .fetch_all(self.connection.pool())
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Symptom definitions fetch failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut defs = Vec::with_capacity(rows.len());
        for row in &rows {
            let options: String = row.get("options");
            let options = match serde_json::from_str(&options) {
                Ok(options) => options,
                Err(e) => {
                    warn!("Skipping malformed symptom definition: {}", e);
                    continue;
                }
            };
            defs.push(SymptomDefinition {
                id: row.get("id"),
                label: row.get("label"),
                options,
            });
        }
        Ok(defs)
    }

    async fn entry_for_pet_and_date(
        &self,
        pet_id: &str,
        date: NaiveDate,
    ) -> Result<Option<SymptomEntry>> {
        let key = SymptomEntry::storage_key(pet_id, date);
        let row = sqlx::query(
            r#"
            SELECT pet_id, date, symptoms
            FROM symptom_entries
            WHERE entry_key = ?
            "#,
        )
        .bind(&key)
        .fetch_optional(self.connection.pool())
        .await?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn entries_for_pet(&self, pet_id: &str) -> Result<Vec<SymptomEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT pet_id, date, symptoms
            FROM symptom_entries
            WHERE pet_id = ?
            ORDER BY date
            "#,
        )
        .bind(pet_id)
        .fetch_all(self.connection.pool())
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn save_entry(&self, entry: &SymptomEntry) -> Result<()> {
        let key = entry
            .key()
            .ok_or_else(|| anyhow!("Cannot save a symptom entry without a pet id"))?;
        let pet_id = entry.pet_id.as_deref().unwrap_or_default();

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO symptom_entries (entry_key, pet_id, date, symptoms)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&key)
        .bind(pet_id)
        .bind(entry.date.format("%Y-%m-%d").to_string())
        .bind(serde_json::to_string(&entry.symptoms)?)
        .execute(self.connection.pool())
        .await?;
        Ok(())
    }
}
