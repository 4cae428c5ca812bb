// src/routes/health.rs
//! Liveness endpoint.
//!
//! `/` answers any method with the caller's address and IP family. It does not
//! touch the database, so it stays green while PostgreSQL is down.

use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, routing::any, Json, Router};
use serde::Serialize;

/// JSON response body for `/`.
#[derive(Serialize)]
struct EchoResponse {
    ip: String,
    #[serde(rename = "ipType")]
    ip_type: &'static str,
    status: u16,
}

async fn echo(ConnectInfo(addr): ConnectInfo<SocketAddr>) -> Json<EchoResponse> {
    // ---
    let ip = canonical_ip(addr.ip());
    let ip_type = match ip {
        IpAddr::V4(_) => "IPv4",
        IpAddr::V6(_) => "IPv6",
    };

    Json(EchoResponse {
        ip: ip.to_string(),
        ip_type,
        status: 200,
    })
}

/// Unwrap IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) seen on dual-stack listeners.
pub(crate) fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

/// Create a subrouter containing the `/` route.
///
/// Generic over the application state so it merges cleanly with the gateway router.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/", any(echo))
}
