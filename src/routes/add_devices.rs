use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use super::{required, AppState, Params};
use crate::store::{self, Probe};
use crate::ApiError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/add_devices", any(handler))
}

#[derive(Debug, Deserialize)]
struct AddDeviceParams {
    unique_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddDeviceResponse {
    status: u16,
    unique_id: String,
    dev_id: i32,
}

async fn handler(
    State((pool, _config)): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Params(params): Params<AddDeviceParams>,
) -> Result<Json<AddDeviceResponse>, ApiError> {
    // ---
    let unique_id = required(params.unique_id)
        .ok_or_else(|| ApiError::BadRequest("please post a unique_id!".to_string()))?;

    let ip = super::health::canonical_ip(addr.ip()).to_string();
    info!("/add_devices - registering {} from {}", unique_id, ip);

    let dev_id = register(&pool, &unique_id, &ip).await?;
    info!("/add_devices - {} registered as dev_id {}", unique_id, dev_id);

    Ok(Json(AddDeviceResponse {
        status: 200,
        unique_id,
        dev_id,
    }))
}

/// Insert a new device row and return its generated id.
///
/// Fails with [`ApiError::Conflict`] when `unique_id` is already registered.
async fn register(pool: &PgPool, unique_id: &str, ip: &str) -> Result<i32, ApiError> {
    // ---
    let taken = store::exists(pool, Probe::DEVICE_UNIQUE_ID, unique_id)
        .await
        .map_err(|e| ApiError::storage("Failed to look up device", e))?;
    if taken {
        debug!("/add_devices - {} already registered", unique_id);
        return Err(ApiError::Conflict);
    }

    // The unique constraint still catches a concurrent registration that
    // passed the probe above.
    sqlx::query_scalar("INSERT INTO device (unique_id, ip) VALUES ($1, $2) RETURNING dev_id")
        .bind(unique_id)
        .bind(ip)
        .fetch_one(pool)
        .await
        .map_err(ApiError::register)
}
