//! Request-path error taxonomy.
//!
//! Every handler returns `Result<_, ApiError>`; the [`IntoResponse`] impl below is
//! the single place where failures become a JSON body plus an HTTP status.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

// ---

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum ApiError {
    // ---
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("Failed to parse SensorsJson: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Device not found")]
    NotFound,

    #[error("Device Exists.")]
    Conflict,

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("Failed to get sensor data: {0}")]
    Query(#[source] sqlx::Error),

    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),
}

impl ApiError {
    // ---
    /// Classify a driver error raised while writing or probing.
    pub fn storage(context: &'static str, err: sqlx::Error) -> Self {
        // ---
        if is_connection_error(&err) {
            ApiError::Connection(err)
        } else {
            ApiError::Storage {
                context,
                source: err,
            }
        }
    }

    /// Classify a driver error raised by the history read path.
    pub fn query(err: sqlx::Error) -> Self {
        // ---
        if is_connection_error(&err) {
            ApiError::Connection(err)
        } else {
            ApiError::Query(err)
        }
    }

    /// Registration insert failure; a unique violation means another
    /// request registered the same id first.
    pub fn register(err: sqlx::Error) -> Self {
        // ---
        let duplicate = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION);

        if duplicate {
            ApiError::Conflict
        } else {
            ApiError::storage("Failed to insert device into database", err)
        }
    }

    /// HTTP status and the number echoed in the body's `status` field.
    pub fn status(&self) -> (StatusCode, u16) {
        // ---
        match self {
            ApiError::BadRequest(_)
            | ApiError::InvalidParameter(_)
            | ApiError::NoFieldsToUpdate => (StatusCode::BAD_REQUEST, 400),
            ApiError::Parse(_) => (StatusCode::BAD_REQUEST, 402),
            ApiError::Query(_) => (StatusCode::BAD_REQUEST, 405),
            ApiError::NotFound => (StatusCode::NOT_FOUND, 404),
            ApiError::Conflict => (StatusCode::CONFLICT, 409),
            ApiError::Storage { .. } | ApiError::Connection(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, 500)
            }
        }
    }
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let (code, status) = self.status();

        let body = match &self {
            ApiError::Connection(e) => {
                tracing::error!("database unreachable: {}", e);
                json!({ "status": status, "error": "Failed to connect to database" })
            }
            ApiError::Storage { .. } | ApiError::Query(_) => {
                tracing::error!("{}", self);
                json!({ "status": status, "msg": self.to_string() })
            }
            _ => {
                tracing::warn!("rejecting request: {}", self);
                json!({ "status": status, "msg": self.to_string() })
            }
        };

        (code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn parse_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{'CurBattery': 100}").unwrap_err()
    }

    #[test]
    fn test_status_mapping() {
        // ---
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            (StatusCode::BAD_REQUEST, 400)
        );
        assert_eq!(
            ApiError::Parse(parse_error()).status(),
            (StatusCode::BAD_REQUEST, 402)
        );
        assert_eq!(ApiError::NotFound.status(), (StatusCode::NOT_FOUND, 404));
        assert_eq!(ApiError::Conflict.status(), (StatusCode::CONFLICT, 409));
        assert_eq!(
            ApiError::NoFieldsToUpdate.status(),
            (StatusCode::BAD_REQUEST, 400)
        );
        assert_eq!(
            ApiError::Query(sqlx::Error::RowNotFound).status(),
            (StatusCode::BAD_REQUEST, 405)
        );
    }

    #[test]
    fn test_connection_errors_classified() {
        // ---
        assert!(matches!(
            ApiError::storage("probe", sqlx::Error::PoolTimedOut),
            ApiError::Connection(_)
        ));
        assert!(matches!(
            ApiError::query(sqlx::Error::PoolClosed),
            ApiError::Connection(_)
        ));
        assert!(matches!(
            ApiError::storage("probe", sqlx::Error::RowNotFound),
            ApiError::Storage { .. }
        ));
        assert!(matches!(
            ApiError::register(sqlx::Error::RowNotFound),
            ApiError::Storage { .. }
        ));
    }

    #[test]
    fn test_messages() {
        // ---
        assert_eq!(ApiError::NotFound.to_string(), "Device not found");
        assert_eq!(ApiError::Conflict.to_string(), "Device Exists.");
        assert!(ApiError::Parse(parse_error())
            .to_string()
            .starts_with("Failed to parse SensorsJson: "));
        assert_eq!(
            ApiError::storage("Failed to update device data", sqlx::Error::RowNotFound)
                .to_string(),
            format!(
                "Failed to update device data: {}",
                sqlx::Error::RowNotFound
            )
        );
    }
}
