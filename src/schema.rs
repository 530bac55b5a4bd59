//! Database schema management for `weather-etl`.
//!
//! Ensures the records table and its uniqueness constraint exist before the
//! run starts. Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `weather_records` table the upsert path writes to. The
/// `UNIQUE (date, location, type)` constraint is the conflict target for the
/// insert-or-merge write and the only cross-writer coordination primitive.
/// Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_records (
            id          SERIAL PRIMARY KEY,
            date        DATE             NOT NULL,
            location    TEXT             NOT NULL,
            country     TEXT             NOT NULL,
            min_temp    DOUBLE PRECISION,
            max_temp    DOUBLE PRECISION,
            humidity    DOUBLE PRECISION NOT NULL,
            air_quality TEXT             NOT NULL,
            type        TEXT             NOT NULL
                        CHECK (type IN ('FORECAST', 'HISTORY')),
            UNIQUE (date, location, type)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Basic index for downstream per-location reads
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_records_location
            ON weather_records (location, type);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
