use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::{debug, warn};

use super::connection::DbConnection;
use crate::domain::models::pet::Pet;
use crate::storage::traits::PetStore;

/// SQLite-backed pet collection. Each row is one pet document; the
/// `diseases` column holds the JSON-encoded condition list.
#[derive(Clone)]
pub struct PetRepository {
    connection: DbConnection,
}

impl PetRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn row_to_pet(row: &SqliteRow) -> Result<Pet> {
        let birthday: Option<String> = row.get("birthday");
        let birthday = birthday
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|e| anyhow!("Failed to parse pet birthday: {}", e))
            })
            .transpose()?;

        let diseases: String = row.get("diseases");
        let diseases: Vec<String> = serde_json::from_str(&diseases)
            .map_err(|e| anyhow!("Failed to parse diseases column: {}", e))?;

        Ok(Pet {
            id: row.get("id"),
            user_id: row.get("user_id"),
            name: row.get("name"),
            birthday,
            diseases,
        })
    }
}

#[async_trait]
impl PetStore for PetRepository {
    async fn pets_for_user(&self, user_id: &str) -> Result<Vec<Pet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, birthday, diseases
            FROM pets
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_all(self.connection.pool())
        .await?;

        let pets = rows
            .iter()
            .map(Self::row_to_pet)
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} pets for user {}", pets.len(), user_id);
        Ok(pets)
    }

    async fn get_pet(&self, pet_id: &str) -> Result<Option<Pet>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, birthday, diseases
            FROM pets
            WHERE id = ?
            "#,
        )
        .bind(pet_id)
        .fetch_optional(self.connection.pool())
        .await?;

        row.as_ref().map(Self::row_to_pet).transpose()
    }

    async fn upsert_pet(&self, pet: &Pet) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO pets (id, user_id, name, birthday, diseases)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pet.id)
        .bind(&pet.user_id)
        .bind(&pet.name)
        .bind(pet.birthday.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(serde_json::to_string(&pet.diseases)?)
        .execute(self.connection.pool())
        .await?;
        Ok(())
    }

    async fn delete_pet(&self, pet_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM pets WHERE id = ?")
            .bind(pet_id)
            .execute(self.connection.pool())
            .await?;
        Ok(())
    }

    async fn add_disease(&self, disease: &str, pet_id: &str) -> Result<Option<Pet>> {
        // The store has no native set-union, so union inside a single write
        // transaction: concurrent appends serialize here and duplicates
        // collapse either way.
        let mut tx = self.connection.pool().begin().await?;

        let row = sqlx::query("SELECT diseases FROM pets WHERE id = ?")
            .bind(pet_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            warn!("Pet vanished before disease append: {}", pet_id);
            return Ok(None);
        };

        let diseases: String = row.get("diseases");
        let mut diseases: Vec<String> = serde_json::from_str(&diseases)
            .map_err(|e| anyhow!("Failed to parse diseases column: {}", e))?;

        if !diseases.iter().any(|d| d == disease) {
            diseases.push(disease.to_string());
            sqlx::query("UPDATE pets SET diseases = ? WHERE id = ?")
                .bind(serde_json::to_string(&diseases)?)
                .bind(pet_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_pet(pet_id).await
    }
}
