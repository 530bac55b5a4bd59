//! Idempotent persistence of canonical records into PostgreSQL.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::{EtlError, WeatherRecord};

// ---

/// Whether an upsert created a new row or merged into an existing one.
/// Reported for observability only; callers must not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Write seam between the orchestrator and the store.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn upsert(&self, record: &WeatherRecord) -> Result<UpsertOutcome, EtlError>;
}

/// PostgreSQL-backed sink over the `weather_records` table.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSink for PgStore {
    /// Insert-or-merge keyed by (`date`, `location`, `type`).
    ///
    /// Mutable fields are overwritten on conflict; `country` is first-write-
    /// wins and never updated. `xmax = 0` holds only for freshly inserted row
    /// versions, which is how inserted is told apart from updated.
    async fn upsert(&self, record: &WeatherRecord) -> Result<UpsertOutcome, EtlError> {
        // ---
        let row = sqlx::query(
            r#"
            INSERT INTO weather_records
                (date, location, country, min_temp, max_temp, humidity, air_quality, type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (date, location, type) DO UPDATE SET
                min_temp    = EXCLUDED.min_temp,
                max_temp    = EXCLUDED.max_temp,
                humidity    = EXCLUDED.humidity,
                air_quality = EXCLUDED.air_quality
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(record.date)
        .bind(&record.location)
        .bind(&record.country)
        .bind(record.min_temp)
        .bind(record.max_temp)
        .bind(record.humidity)
        .bind(&record.air_quality)
        .bind(record.kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }
}
