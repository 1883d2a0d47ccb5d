//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{RedemptionRow, StoredRedemption};
use crate::config::GatewayConfig;
use crate::domain::rewards_ledger::RedemptionRecord;
use crate::error::GatewayError;

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool sized from the configuration and runs the embedded
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(Self::new(pool))
    }

    /// Appends an event to the event log.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn save_event(
        &self,
        event_type: &str,
        user_id: Option<i64>,
        restaurant_id: Option<i64>,
        payload: &serde_json::Value,
    ) -> Result<i64, GatewayError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (event_type, user_id, restaurant_id, payload) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(event_type)
        .bind(user_id)
        .bind(restaurant_id)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Records a committed redemption.
    ///
    /// Returns the number of rows written. Zero means the token was
    /// already on record.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn save_redemption(&self, record: &RedemptionRecord) -> Result<u64, GatewayError> {
        let row = StoredRedemption::try_from(record)?;
        let result = sqlx::query(
            "INSERT INTO redemptions \
             (id, token, user_id, staff_user_id, redemption_type, details, redeemed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (token) DO NOTHING",
        )
        .bind(row.id)
        .bind(row.token)
        .bind(row.user_id)
        .bind(row.staff_user_id)
        .bind(row.redemption_type)
        .bind(row.details)
        .bind(row.redeemed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Loads every recorded redemption, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn load_redemptions(&self) -> Result<Vec<StoredRedemption>, GatewayError> {
        let rows = sqlx::query_as::<_, RedemptionRow>(
            "SELECT id, token, user_id, staff_user_id, redemption_type, details, redeemed_at \
             FROM redemptions ORDER BY redeemed_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredRedemption::from).collect())
    }

    /// Returns every consumed redemption token.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn load_consumed_tokens(&self) -> Result<Vec<Uuid>, GatewayError> {
        Ok(self
            .load_redemptions()
            .await?
            .into_iter()
            .map(|row| row.token)
            .collect())
    }
}
