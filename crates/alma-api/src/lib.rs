pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::handlers::ws;
use crate::routes::{chat, health, messages, permissions, providers, settings, threads, workspaces};
use crate::state::AppState;

/// Full application router.
///
/// The request timeout covers REST routes only; the WebSocket and the
/// permission event stream stay open.
pub fn build_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let rest_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Providers
        .route("/providers", get(providers::list_providers))
        .route("/providers", post(providers::upsert_provider))
        .route("/providers/:provider_id", delete(providers::delete_provider))
        // Threads
        .route("/threads", post(threads::create_thread))
        .route("/threads", get(threads::list_threads))
        .route("/threads/:thread_id", get(threads::get_thread))
        .route("/threads/:thread_id", put(threads::update_thread))
        .route("/threads/:thread_id", delete(threads::delete_thread))
        // Messages
        .route("/threads/:thread_id/messages", get(messages::list_messages))
        // Settings
        .route("/settings", get(settings::get_settings))
        .route("/settings", put(settings::update_settings))
        // Chat
        .route("/chat/completions", post(chat::start_turn))
        // Permissions
        .route("/permissions/pending", get(permissions::pending_request))
        .route("/permissions/:request_id/decision", post(permissions::decide))
        // Workspaces
        .route("/workspaces", get(workspaces::list_workspaces))
        .route("/workspaces", post(workspaces::register_workspace))
        .route("/workspaces/:workspace_id/activate", put(workspaces::activate_workspace))
        .layer(TimeoutLayer::new(timeout));

    let stream_routes = Router::new()
        .route("/permissions/events", get(permissions::permission_events));

    Router::new()
        .nest("/api", rest_routes.merge(stream_routes))
        .route("/ws", get(ws::ws_handler))
        .layer(axum::middleware::from_fn(middleware::logging::log_request))
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}
