//! Database schema management for `sensorhub-ingest`.
//!
//! Ensures the `device` and `sensor_data` tables exist before serving requests.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};

// ---

const DEVICE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS device (
        dev_id                SERIAL PRIMARY KEY,
        unique_id             TEXT        NOT NULL UNIQUE,
        cur_battery           DOUBLE PRECISION,
        cur_temp              DOUBLE PRECISION,
        cur_attd              DOUBLE PRECISION,
        cur_pres              DOUBLE PRECISION,
        cur_methane           DOUBLE PRECISION,
        cur_lpg               DOUBLE PRECISION,
        cur_smoke             DOUBLE PRECISION,
        cur_poisonous_gas_ppm DOUBLE PRECISION,
        registered_time       TIMESTAMPTZ NOT NULL DEFAULT now(),
        last_seen             TIMESTAMPTZ NOT NULL DEFAULT now(),
        ip                    TEXT        NOT NULL
    );
"#;

const SENSOR_DATA_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sensor_data (
        id                SERIAL PRIMARY KEY,
        dev_id            INTEGER     NOT NULL REFERENCES device (dev_id),
        battery           DOUBLE PRECISION,
        temp              DOUBLE PRECISION,
        attd              DOUBLE PRECISION,
        pres              DOUBLE PRECISION,
        methane           DOUBLE PRECISION,
        lpg               DOUBLE PRECISION,
        smoke             DOUBLE PRECISION,
        poisonous_gas_ppm DOUBLE PRECISION,
        recorded_time     TIMESTAMPTZ NOT NULL DEFAULT now()
    );
"#;

const BOOTSTRAP_LOCK_KEY: i64 = 0x5e_45_0b_00_75;

/// Tables in creation order; `sensor_data` references `device`.
const TABLES: [(&str, &str); 2] = [("device", DEVICE_TABLE), ("sensor_data", SENSOR_DATA_TABLE)];

/// Create the schema if it is missing (idempotent).
///
/// Each table is probed under its own name and only created when absent. The
/// history index is created alongside. Errors are propagated; the caller
/// treats them as fatal.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Serialize bootstrap across instances starting at the same time
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(BOOTSTRAP_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for (name, ddl) in TABLES {
        if table_exists(&mut tx, name).await? {
            tracing::debug!("Table {} already present", name);
            continue;
        }
        sqlx::query(ddl).execute(&mut *tx).await?;
        tracing::info!("Table {} created", name);
    }

    // Serves `WHERE dev_id = ? ORDER BY id DESC LIMIT n`
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_data_dev_id
            ON sensor_data (dev_id, id DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

async fn table_exists(tx: &mut Transaction<'_, Postgres>, name: &str) -> Result<bool> {
    // ---
    let found: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = $1
        )
        "#,
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(found)
}
