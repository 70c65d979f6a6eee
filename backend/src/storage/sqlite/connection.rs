use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;

/// DbConnection manages database operations
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        // Connect to the database
        let pool = SqlitePool::connect(url).await?;

        // Setup database schema
        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name for tests
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pets (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                birthday TEXT,
                diseases TEXT NOT NULL DEFAULT '[]'
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS med_alarms (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                time_millis INTEGER NOT NULL,
                pet_id TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Serves the ordered per-pet live query
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_med_alarms_pet_time
            ON med_alarms(pet_id, time_millis);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS symptom_definitions (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                options TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // entry_key is the composite "<pet_id>_<date>" string, which is what
        // enforces at-most-one entry per pet per date.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS symptom_entries (
                entry_key TEXT PRIMARY KEY,
                pet_id TEXT NOT NULL,
                date TEXT NOT NULL,
                symptoms TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_setup_is_idempotent() {
        let db = DbConnection::init_test().await.unwrap();
        // Running setup twice must not fail
        DbConnection::setup_schema(db.pool()).await.unwrap();
    }
}
