use axum::{extract::State, routing::any, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use super::{required, AppState, Params};
use crate::models::Reading;
use crate::ApiError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/GetDeviceHistoryStatus", any(handler))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    dev_id: Option<String>,
    #[serde(rename = "exceptRows")]
    except_rows: Option<String>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    status: u16,
    data: Vec<Reading>,
}

async fn handler(
    State((pool, config)): State<AppState>,
    Params(params): Params<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    // ---
    let dev_id = required(params.dev_id)
        .ok_or_else(|| ApiError::BadRequest("Please provide dev_id!".to_string()))?;
    let limit = parse_limit(params.except_rows.as_deref(), config.history_default_rows)?;

    info!("/GetDeviceHistoryStatus - {} (limit {})", dev_id, limit);

    let data = recent_readings(&pool, &dev_id, limit)
        .await
        .map_err(ApiError::query)?;

    debug!("/GetDeviceHistoryStatus - returning {} readings", data.len());
    Ok(Json(HistoryResponse { status: 200, data }))
}

/// Parse `exceptRows`; absent or empty falls back to `default`.
fn parse_limit(raw: Option<&str>, default: i64) -> Result<i64, ApiError> {
    // ---
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    match raw.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(ApiError::InvalidParameter(format!(
            "exceptRows must be a non-negative integer, got {:?}",
            raw
        ))),
    }
}

/// Most recent readings for a device, newest first.
async fn recent_readings(
    pool: &PgPool,
    unique_id: &str,
    limit: i64,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT
            s.id, d.unique_id AS dev_id,
            s.battery, s.temp, s.attd, s.pres,
            s.recorded_time,
            s.methane, s.lpg, s.smoke, s.poisonous_gas_ppm
        FROM sensor_data s
        JOIN device d ON d.dev_id = s.dev_id
        WHERE d.unique_id = $1
        ORDER BY s.id DESC
        LIMIT $2
        "#,
    )
    .bind(unique_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_limit_defaults() {
        // ---
        assert_eq!(parse_limit(None, 30).unwrap(), 30);
        assert_eq!(parse_limit(Some(""), 30).unwrap(), 30);
        assert_eq!(parse_limit(Some("  "), 30).unwrap(), 30);
    }

    #[test]
    fn test_limit_parsed() {
        // ---
        assert_eq!(parse_limit(Some("5"), 30).unwrap(), 5);
        assert_eq!(parse_limit(Some(" 100 "), 30).unwrap(), 100);
        assert_eq!(parse_limit(Some("0"), 30).unwrap(), 0);
    }

    #[test]
    fn test_limit_rejected() {
        // ---
        for raw in ["abc", "-1", "2.5", "1e3"] {
            assert!(
                matches!(parse_limit(Some(raw), 30), Err(ApiError::InvalidParameter(_))),
                "{raw} should be rejected"
            );
        }
    }
}
