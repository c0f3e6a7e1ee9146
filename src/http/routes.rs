use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Profiles
        .route("/profiles/me", get(handlers::get_me))
        .route("/profiles/me/bio-suggestions", post(handlers::suggest_bios))
        .route("/interests", get(handlers::list_interests))
        // Discovery
        .route("/discovery", get(handlers::get_discovery))
        .route("/discovery/swipe", post(handlers::swipe))
        .route("/discovery/reset", post(handlers::reset_discovery))
        // Preferences
        .route(
            "/preferences",
            get(handlers::get_preferences).put(handlers::update_preferences),
        )
        .route(
            "/preferences/interests/:interest",
            post(handlers::toggle_interest),
        )
        // Matches and chat
        .route("/matches", get(handlers::list_matches))
        .route("/matches/:match_id", get(handlers::get_match))
        .route("/matches/:match_id/messages", post(handlers::send_message))
        .route(
            "/matches/:match_id/suggestions/ice-breaker",
            post(handlers::suggest_ice_breaker),
        )
        .route(
            "/matches/:match_id/suggestions/date-idea",
            post(handlers::suggest_date_idea),
        )
        // Live call
        .route("/matches/:match_id/call", post(handlers::start_call))
        .route("/call", get(handlers::get_call).delete(handlers::end_call))
        .route("/call/mute", put(handlers::set_muted))
        .route("/call/transcript", get(handlers::get_call_transcript))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
