use axum::Json;
use axum::response::IntoResponse;
use http::StatusCode;
use serde::Serialize;

#[derive(Serialize)]
struct Healthz {
    state: &'static str,
    version: &'static str,
}

/// Liveness only: answers without touching the daemon or the database.
pub(crate) async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(Healthz {
        state: "UP",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
