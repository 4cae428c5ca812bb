use std::collections::HashMap;

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header::CONTENT_TYPE, Method},
    Form, Router,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::{ApiError, Config};

mod add_devices;
mod device_history;
mod health;
mod update_data;

// ---

/// Shared handler state: the process-wide pool plus the config snapshot.
pub type AppState = (PgPool, Config);

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(add_devices::router())
        .merge(update_data::router())
        .merge(device_history::router())
        .merge(health::router())
        .with_state((pool, config))
}

/// Request parameters taken from the query string and, for non-GET requests
/// with a urlencoded body, from the body as well.
///
/// When a key appears in both, the body value wins. Within one source the
/// first occurrence wins. Bodies of any other content type are ignored.
pub struct Params<T>(pub T);

impl<S, T> FromRequest<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // ---
        let (mut parts, body) = req.into_parts();

        let Query(query): Query<Vec<(String, String)>> =
            Query::from_request_parts(&mut parts, state)
                .await
                .map_err(|e| unreadable(e.body_text()))?;

        let has_form_body = parts.method != Method::GET
            && parts.method != Method::HEAD
            && parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|ct| ct.to_str().ok())
                .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let form = if has_form_body {
            let req = Request::from_parts(parts, body);
            let Form(pairs): Form<Vec<(String, String)>> = Form::from_request(req, state)
                .await
                .map_err(|e| unreadable(e.body_text()))?;
            pairs
        } else {
            Vec::new()
        };

        merge_params(form, query).map(Params)
    }
}

fn unreadable(reason: String) -> ApiError {
    ApiError::BadRequest(format!("Failed to parse form data: {}", reason))
}

/// Fold body pairs then query pairs into `T`, keeping the first value per key.
fn merge_params<T: DeserializeOwned>(
    form: Vec<(String, String)>,
    query: Vec<(String, String)>,
) -> Result<T, ApiError> {
    // ---
    let mut merged: HashMap<String, String> = HashMap::new();
    for (key, value) in form.into_iter().chain(query) {
        merged.entry(key).or_insert(value);
    }

    let object: Map<String, Value> = merged
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    serde_json::from_value(Value::Object(object)).map_err(|e| unreadable(e.to_string()))
}

/// Empty parameters count as missing.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
