use axum::{extract::State, routing::any, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use super::{required, AppState, Params};
use crate::models::{SensorField, SensorValues};
use crate::store::{self, Probe};
use crate::ApiError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/update_data", any(handler))
}

#[derive(Debug, Deserialize)]
struct UpdateDataParams {
    dev_id: Option<String>,
    #[serde(rename = "SensorsJson")]
    sensors_json: Option<String>,
}

/// Success body. `status` is a string here, unlike the other endpoints;
/// existing firmware compares against `"200"`.
#[derive(Debug, Serialize)]
struct UpdateDataResponse {
    status: &'static str,
    msg: &'static str,
}

async fn handler(
    State((pool, config)): State<AppState>,
    Params(params): Params<UpdateDataParams>,
) -> Result<Json<UpdateDataResponse>, ApiError> {
    // ---
    let (Some(dev_id), Some(raw)) = (required(params.dev_id), required(params.sensors_json))
    else {
        return Err(ApiError::BadRequest("please post some data".to_string()));
    };

    info!("/update_data - reading from {}", dev_id);
    debug!("/update_data - SensorsJson: {}", raw);

    // Step 1: Parse payload
    let values: SensorValues = serde_json::from_str(&raw)?;

    // Step 2: Device must be registered
    let known = store::exists(&pool, Probe::DEVICE_UNIQUE_ID, &dev_id)
        .await
        .map_err(|e| ApiError::storage("Failed to look up device", e))?;
    if !known {
        return Err(ApiError::NotFound);
    }

    // Step 3: Decide which channels were sent
    let fields = values.provided(config.zero_means_absent);
    if fields.is_empty() {
        return Err(ApiError::NoFieldsToUpdate);
    }

    // Step 4: Append reading and refresh current values together
    record_reading(&pool, &dev_id, &fields).await?;

    debug!("/update_data - {} channel(s) stored for {}", fields.len(), dev_id);
    Ok(Json(UpdateDataResponse {
        status: "200",
        msg: "ok",
    }))
}

/// Insert one `sensor_data` row and update the device's current values in a
/// single transaction.
async fn record_reading(
    pool: &PgPool,
    dev_id: &str,
    fields: &[(SensorField, f64)],
) -> Result<(), ApiError> {
    // ---
    let mut update = store::update_device(dev_id, fields).ok_or(ApiError::NoFieldsToUpdate)?;
    let mut insert = store::insert_reading(dev_id, fields);

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ApiError::storage("Failed to start transaction", e))?;

    let inserted = insert
        .build()
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::storage("Failed to update sensor data", e))?
        .rows_affected();

    if inserted == 0 {
        // Device vanished between the probe and the write
        warn!("/update_data - no device row for {}", dev_id);
        return Err(ApiError::NotFound);
    }

    update
        .build()
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::storage("Failed to update device data", e))?;

    tx.commit()
        .await
        .map_err(|e| ApiError::storage("Failed to commit sensor data", e))?;

    Ok(())
}
