pub mod auth;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Booth routes (attendee + recruiter views)
    let booth_routes = Router::new()
        .route("/{booth_id}", get(routes::booth::get))
        .route("/{booth_id}/queue", get(routes::queue::booth_queue))
        .route("/{booth_id}/queue/join", post(routes::queue::join))
        .route("/{booth_id}/queue/leave", post(routes::queue::leave))
        .route(
            "/{booth_id}/queue/leave-message",
            post(routes::queue::leave_with_message),
        )
        .route("/{booth_id}/queue/status", get(routes::queue::status))
        .route("/{booth_id}/queue/serving", put(routes::queue::update_serving));

    // Queue entry routes (threads and recruiter actions)
    let entry_routes = Router::new()
        .route("/{entry_id}/remove", post(routes::queue::remove))
        .route(
            "/{entry_id}/message",
            post(routes::queue::send_message).get(routes::queue::list_messages),
        )
        .route("/{entry_id}/call", post(routes::call::create));

    // Call lifecycle routes
    let call_routes = Router::new()
        .route("/{call_id}", get(routes::call::get))
        .route("/{call_id}/respond", post(routes::call::respond))
        .route(
            "/{call_id}/interpreter",
            post(routes::call::invite_interpreter),
        )
        .route(
            "/{call_id}/interpreter/respond",
            post(routes::call::interpreter_respond),
        )
        .route("/{call_id}/leave", post(routes::call::leave))
        .route("/{call_id}/end", post(routes::call::end))
        .route("/{call_id}/roster", get(routes::call::roster));

    // Media provider webhook (API-key auth, no user JWT)
    let media_routes = Router::new().route("/events", post(routes::media::events));

    let api = Router::new()
        .nest("/booth", booth_routes)
        .nest("/queue", entry_routes)
        .nest("/call", call_routes)
        .nest("/media", media_routes);

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
