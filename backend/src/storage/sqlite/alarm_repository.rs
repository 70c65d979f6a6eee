use anyhow::Result;
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use super::connection::DbConnection;
use crate::domain::models::alarm::MedAlarm;
use crate::storage::traits::AlarmStore;

/// SQLite-backed alarm table with a live ordered view per pet.
///
/// Every mutation re-queries the affected pet's rows and publishes the
/// fresh list on that pet's watch channel; a channel is created lazily on
/// the first `watch_alarms_for_pet` call and lives for the repository's
/// lifetime.
#[derive(Clone)]
pub struct AlarmRepository {
    connection: DbConnection,
    watchers: Arc<Mutex<HashMap<String, watch::Sender<Vec<MedAlarm>>>>>,
}

impl AlarmRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self {
            connection,
            watchers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn row_to_alarm(row: &SqliteRow) -> MedAlarm {
        MedAlarm {
            id: row.get("id"),
            name: row.get("name"),
            time: row.get("time_millis"),
            pet_id: row.get("pet_id"),
        }
    }

    async fn query_for_pet(&self, pet_id: &str) -> Result<Vec<MedAlarm>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, time_millis, pet_id
            FROM med_alarms
            WHERE pet_id = ?
            ORDER BY time_millis
            "#,
        )
        .bind(pet_id)
        .fetch_all(self.connection.pool())
        .await?;

        Ok(rows.iter().map(Self::row_to_alarm).collect())
    }

    /// Push the current row set to the pet's live view, if anyone ever
    /// subscribed to it
    async fn publish_for_pet(&self, pet_id: &str) -> Result<()> {
        let watchers = self.watchers.lock().await;
        if let Some(tx) = watchers.get(pet_id) {
            let alarms = self.query_for_pet(pet_id).await?;
            let _ = tx.send(alarms);
        }
        Ok(())
    }
}

#[async_trait]
impl AlarmStore for AlarmRepository {
    async fn insert_alarm(&self, alarm: &MedAlarm) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO med_alarms (id, name, time_millis, pet_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&alarm.id)
        .bind(&alarm.name)
        .bind(alarm.time)
        .bind(&alarm.pet_id)
        .execute(self.connection.pool())
        .await?;

        self.publish_for_pet(&alarm.pet_id).await
    }

    async fn delete_alarm(&self, name: &str, time: i64, pet_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM med_alarms
            WHERE name = ? AND time_millis = ? AND pet_id = ?
            "#,
        )
        .bind(name)
        .bind(time)
        .bind(pet_id)
        .execute(self.connection.pool())
        .await?;

        self.publish_for_pet(pet_id).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_for_pet(&self, pet_id: &str) -> Result<u32> {
        let result = sqlx::query("DELETE FROM med_alarms WHERE pet_id = ?")
            .bind(pet_id)
            .execute(self.connection.pool())
            .await?;

        debug!(
            "Removed {} alarms for pet {}",
            result.rows_affected(),
            pet_id
        );
        self.publish_for_pet(pet_id).await?;
        Ok(result.rows_affected() as u32)
    }

    async fn alarms_for_pet(&self, pet_id: &str) -> Result<Vec<MedAlarm>> {
        self.query_for_pet(pet_id).await
    }

    async fn watch_alarms_for_pet(&self, pet_id: &str) -> Result<watch::Receiver<Vec<MedAlarm>>> {
        let mut watchers = self.watchers.lock().await;
        if let Some(tx) = watchers.get(pet_id) {
            return Ok(tx.subscribe());
        }

        let current = self.query_for_pet(pet_id).await?;
        let (tx, rx) = watch::channel(current);
        watchers.insert(pet_id.to_string(), tx);
        Ok(rx)
    }

    async fn advance_trigger(&self, name: &str, pet_id: &str, next_time: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE med_alarms
            SET time_millis = ?
            WHERE name = ? AND pet_id = ?
            "#,
        )
        .bind(next_time)
        .bind(name)
        .bind(pet_id)
        .execute(self.connection.pool())
        .await?;

        self.publish_for_pet(pet_id).await
    }
}
