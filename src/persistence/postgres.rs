//! PostgreSQL implementation of the room journal.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::JournalStore;
use super::models::NewJournalEntry;
use crate::config::ServerConfig;
use crate::domain::RoomId;
use crate::error::EngineError;

/// PostgreSQL-backed journal using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresJournal {
    pool: PgPool,
}

impl PostgresJournal {
    /// Creates a journal over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the configured database settings and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] if the database cannot be reached
    /// or a migration fails.
    pub async fn connect(config: &ServerConfig) -> Result<Self, EngineError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| EngineError::Unavailable(format!("journal migration failed: {e}")))?;

        Ok(Self::new(pool))
    }
}

impl JournalStore for PostgresJournal {
    async fn append(&self, entry: &NewJournalEntry) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO room_journal (room_id, event_type, payload, recorded_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.room_id.as_str())
        .bind(entry.event_type)
        .bind(&entry.payload)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn erase_room(&self, room_id: &RoomId) -> Result<u64, EngineError> {
        let result = sqlx::query("DELETE FROM room_journal WHERE room_id = $1")
            .bind(room_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
