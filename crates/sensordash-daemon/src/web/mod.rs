//! HTMX web UI and JSON API.

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use sensordash_core::presentation::{Card, LOADING_MESSAGE};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::state::AppState;

/// Main index page template.
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    page_refresh_ms: u64,
}

/// Dashboard partial template.
#[derive(Template)]
#[template(path = "partials/dashboard.html")]
struct DashboardTemplate {
    status_label: &'static str,
    status_color: &'static str,
    last_updated: String,
    loading: bool,
    loading_message: &'static str,
    error_message: String,
    cards: Vec<Card>,
}

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/state", get(api_state))
        .route("/reading", get(api_reading))
        .layer(CorsLayer::permissive());

    Router::new()
        // Main page
        .route("/", get(index))
        // Partials for HTMX
        .route("/dashboard", get(dashboard))
        // Live updates
        .route("/events", get(events))
        .route("/healthz", get(healthz))
        .nest("/api", api)
        // State
        .with_state(state)
}

/// Renders a template, mapping failures to a 500.
fn render<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("Template error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render page: {}", e),
            )
                .into_response()
        }
    }
}

/// GET / - Main page
async fn index(State(state): State<Arc<AppState>>) -> Response {
    render(IndexTemplate {
        page_refresh_ms: state.config().web.page_refresh,
    })
}

/// GET /dashboard - Status indicator and sensor cards partial
async fn dashboard(State(state): State<Arc<AppState>>) -> Response {
    let view = state.dashboard();
    render(DashboardTemplate {
        status_label: view.status_label,
        status_color: view.status_color,
        last_updated: view.last_updated.unwrap_or_default(),
        loading: view.loading,
        loading_message: LOADING_MESSAGE,
        error_message: view.error_message.unwrap_or_default(),
        cards: view.cards,
    })
}

/// GET /api/state - View state snapshot as JSON
async fn api_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot())
}

/// GET /api/reading - Latest reading as JSON, 204 before the first one
async fn api_reading(State(state): State<Arc<AppState>>) -> Response {
    match state.view().reading {
        Some(reading) => Json(reading).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /events - Server-sent snapshot per state change
async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.subscribe()).map(|snapshot| {
        let event = match serde_json::to_string(&snapshot) {
            Ok(json) => Event::default().event("state").data(json),
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Ok::<_, Infallible>(event)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /healthz - Liveness probe
async fn healthz() -> &'static str {
    "ok"
}
