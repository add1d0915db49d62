use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::session::Snapshot;

#[derive(Serialize)]
struct ApiRoster<'a> {
    players: Vec<ApiPlayer<'a>>,
}

#[derive(Serialize)]
struct ApiPlayer<'a> {
    name: &'a str,
    location: &'a str,
}

impl<'a> From<&'a Snapshot> for ApiRoster<'a> {
    fn from(snap: &'a Snapshot) -> Self {
        Self {
            players: snap
                .players
                .iter()
                .map(|p| ApiPlayer {
                    name: &p.name,
                    location: snap.location_of(p),
                })
                .collect(),
        }
    }
}

/// `GET /api` serves the latest roster. Unknown paths get 404 and other
/// methods on `/api` get 405.
pub fn router(snapshots: watch::Receiver<Arc<Snapshot>>) -> Router {
    Router::new()
        // `get` also answers HEAD unless HEAD is routed on its own.
        .route(
            "/api",
            get(api_roster)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(snapshots)
        .layer(TraceLayer::new_for_http())
}

async fn api_roster(State(snapshots): State<watch::Receiver<Arc<Snapshot>>>) -> Response {
    // Clone the Arc and let go of the watch lock before serializing.
    let snap = snapshots.borrow().clone();
    render(&snap)
}

fn render(snap: &Snapshot) -> Response {
    match serde_json::to_vec(&ApiRoster::from(snap)) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            warn!(err = %e, "roster serialization failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n").into_response()
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found\n")
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed\n")
}
