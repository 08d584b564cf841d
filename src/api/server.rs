use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::action::container as containers;
use crate::api::action::healthz::healthz;
use crate::api::action::image as images;
use crate::api::action::instance as instances;
use crate::api::action::rollout::rollout;
use crate::api::error::AuthError;
use crate::config::config::Config;
use crate::orchestration::Orchestrator;

pub(crate) type SharedOrchestrator = Arc<Orchestrator>;

async fn require_token(State(token): State<Option<String>>, request: Request, next: Next) -> Response {
    let expected = match token {
        Some(expected) => expected,
        None => return next.run(request).await,
    };

    let provided = request.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == expected => next.run(request).await,
        Some(_) => AuthError::InvalidToken.into_response(),
        None => AuthError::MissingCredentials.into_response(),
    }
}

pub(crate) fn router(orchestrator: SharedOrchestrator, token: Option<String>) -> Router {
    let protected = Router::new()
        .route("/containers", get(containers::list))
        .route("/containers/:id", axum::routing::delete(containers::delete))
        .route("/containers/:id/status", get(containers::status))
        .route("/containers/:id/status/detailed", get(containers::detailed_status))
        .route("/containers/:id/logs", get(containers::logs))
        .route("/containers/:id/logs/stream", get(containers::stream_logs))
        .route("/containers/:id/stats", get(containers::stats))
        .route("/containers/:id/start", post(containers::start))
        .route("/containers/:id/stop", post(containers::stop))
        .route("/containers/:id/restart", post(containers::restart))
        .route("/instances", get(instances::list))
        .route("/instances/:id", get(instances::get))
        .route("/instances/:id/deploy", post(instances::deploy))
        .route("/images/ensure", post(images::ensure))
        .route("/images/rebuild", post(images::rebuild))
        .route("/rollout", post(rollout))
        .route_layer(middleware::from_fn_with_state(token, require_token));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

pub(crate) async fn start(orchestrator: SharedOrchestrator, configuration: Config) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], configuration.api.port));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(orchestrator, configuration.api.token)).await
}
