//! Shared query helpers: the existence probe and the partial-write builders
//! used by the ingest path.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::SensorField;

// ---

/// A (table, column) pair the existence probe may look at.
///
/// Only the constants below can be constructed, so nothing caller-supplied
/// ever reaches the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    table: &'static str,
    column: &'static str,
}

impl Probe {
    pub const DEVICE_UNIQUE_ID: Probe = Probe {
        table: "device",
        column: "unique_id",
    };

    fn sql(self) -> String {
        format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = $1)",
            self.table, self.column
        )
    }
}

/// Return whether any row in the probe's table has `column = value`.
pub async fn exists(pool: &PgPool, probe: Probe, value: &str) -> Result<bool, sqlx::Error> {
    // ---
    let found: bool = sqlx::query_scalar(&probe.sql())
        .bind(value)
        .fetch_one(pool)
        .await?;

    tracing::debug!("exists {}.{} = {:?}: {}", probe.table, probe.column, value, found);
    Ok(found)
}

/// Build the `sensor_data` insert for one reading.
///
/// The device's integer key is resolved from `unique_id` inside the statement, so
/// the insert affects zero rows for an unknown device.
pub fn insert_reading<'a>(
    unique_id: &'a str,
    fields: &[(SensorField, f64)],
) -> QueryBuilder<'a, Postgres> {
    // ---
    let mut qb = QueryBuilder::new("INSERT INTO sensor_data (dev_id");
    for (field, _) in fields {
        qb.push(", ").push(field.reading_column());
    }

    qb.push(") SELECT dev_id");
    for &(_, value) in fields {
        qb.push(", ").push_bind(value);
    }

    qb.push(" FROM device WHERE unique_id = ").push_bind(unique_id);
    qb
}

/// Build the `device` current-value update; `None` when nothing would be set.
pub fn update_device<'a>(
    unique_id: &'a str,
    fields: &[(SensorField, f64)],
) -> Option<QueryBuilder<'a, Postgres>> {
    // ---
    if fields.is_empty() {
        return None;
    }

    let mut qb = QueryBuilder::new("UPDATE device SET ");
    for &(field, value) in fields {
        qb.push(field.device_column()).push(" = ").push_bind(value).push(", ");
    }

    qb.push("last_seen = now() WHERE unique_id = ").push_bind(unique_id);
    Some(qb)
}
