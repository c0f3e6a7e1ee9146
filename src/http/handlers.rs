use super::state::AppState;
use crate::dating::{all_interests, DatingError, SwipeDirection, UserPreferences};
use crate::session::{CallStatus, LiveError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub direction: SwipeDirection,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BioSuggestionsRequest {
    /// Defaults to the current user's interests
    pub interests: Option<Vec<String>>,

    /// Defaults to the current user's bio
    pub current_bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse<T> {
    pub new_matches: Vec<T>,
    pub conversations: Vec<T>,
    pub has_unopened: bool,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestion: String,
}

#[derive(Debug, Serialize)]
pub struct BioSuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub session_id: String,
    pub status: CallStatus,
}

#[derive(Debug, Serialize)]
pub struct MuteResponse {
    pub muted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for DatingError {
    fn into_response(self) -> Response {
        let status = match &self {
            DatingError::ProfileNotFound(_) | DatingError::MatchNotFound(_) => StatusCode::NOT_FOUND,
            DatingError::EmptyMessage | DatingError::InvalidPreferences(_) => StatusCode::BAD_REQUEST,
            DatingError::NothingToSwipe => StatusCode::CONFLICT,
        };
        error_response(status, self)
    }
}

impl IntoResponse for LiveError {
    fn into_response(self) -> Response {
        let status = match &self {
            LiveError::AlreadyActive => StatusCode::CONFLICT,
            LiveError::NotActive | LiveError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            LiveError::Microphone(_) | LiveError::OutputDevice(_) => StatusCode::SERVICE_UNAVAILABLE,
            LiveError::Handshake(_) => StatusCode::BAD_GATEWAY,
            LiveError::HandshakeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        };
        error_response(status, self)
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// GET /profiles/me
pub async fn get_me(State(state): State<AppState>) -> impl IntoResponse {
    let dating = state.dating.read().await;
    Json(dating.me().clone())
}

/// GET /interests
/// Every interest that appears on a profile
pub async fn list_interests() -> impl IntoResponse {
    Json(all_interests())
}

/// POST /profiles/me/bio-suggestions
pub async fn suggest_bios(
    State(state): State<AppState>,
    body: Option<Json<BioSuggestionsRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let (interests, bio) = {
        let dating = state.dating.read().await;
        let me = dating.me();
        (
            req.interests.unwrap_or_else(|| me.interests.clone()),
            req.current_bio.unwrap_or_else(|| me.bio.clone()),
        )
    };

    let suggestions = state.suggestions.bio_suggestions(&interests, &bio).await;
    Json(BioSuggestionsResponse { suggestions })
}

// ============================================================================
// Discovery
// ============================================================================

/// GET /discovery
/// Card on top of the deck
pub async fn get_discovery(State(state): State<AppState>) -> impl IntoResponse {
    let mut dating = state.dating.write().await;
    Json(dating.discovery())
}

/// POST /discovery/swipe
pub async fn swipe(State(state): State<AppState>, Json(req): Json<SwipeRequest>) -> Response {
    let mut dating = state.dating.write().await;
    match dating.swipe(req.direction) {
        Ok(outcome) => {
            info!("Swiped {:?} on {}", outcome.direction, outcome.profile.name);
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /discovery/reset
/// Start over from the first card
pub async fn reset_discovery(State(state): State<AppState>) -> impl IntoResponse {
    let mut dating = state.dating.write().await;
    dating.reset_discovery();
    Json(dating.discovery())
}

// ============================================================================
// Preferences
// ============================================================================

/// GET /preferences
pub async fn get_preferences(State(state): State<AppState>) -> impl IntoResponse {
    let dating = state.dating.read().await;
    Json(dating.preferences().clone())
}

/// PUT /preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(prefs): Json<UserPreferences>,
) -> Response {
    let mut dating = state.dating.write().await;
    match dating.update_preferences(prefs) {
        Ok(()) => (StatusCode::OK, Json(dating.preferences().clone())).into_response(),
        Err(e) => {
            warn!("Rejected preferences: {}", e);
            e.into_response()
        }
    }
}

/// POST /preferences/interests/:interest
/// Toggle one interest filter
pub async fn toggle_interest(
    State(state): State<AppState>,
    Path(interest): Path<String>,
) -> impl IntoResponse {
    let mut dating = state.dating.write().await;
    Json(dating.toggle_interest(&interest).clone())
}

// ============================================================================
// Matches
// ============================================================================

/// GET /matches
/// New matches and conversations, newest first
pub async fn list_matches(State(state): State<AppState>) -> impl IntoResponse {
    let dating = state.dating.read().await;
    let matches = dating.matches();
    Json(MatchesResponse {
        new_matches: matches.new_matches().into_iter().cloned().collect(),
        conversations: matches.conversations().into_iter().cloned().collect(),
        has_unopened: matches.has_unopened(),
    })
}

/// GET /matches/:match_id
pub async fn get_match(State(state): State<AppState>, Path(match_id): Path<String>) -> Response {
    let dating = state.dating.read().await;
    match dating.get_match(&match_id) {
        Ok(m) => (StatusCode::OK, Json(m.clone())).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /matches/:match_id/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let mut dating = state.dating.write().await;
    match dating.send_message(&match_id, &req.text) {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /matches/:match_id/suggestions/ice-breaker
pub async fn suggest_ice_breaker(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Response {
    let (me, them) = {
        let dating = state.dating.read().await;
        match dating.get_match(&match_id) {
            Ok(m) => (dating.me().clone(), m.user.clone()),
            Err(e) => return e.into_response(),
        }
    };

    let suggestion = state.suggestions.ice_breaker(&me, &them).await;
    (StatusCode::OK, Json(SuggestionResponse { suggestion })).into_response()
}

/// POST /matches/:match_id/suggestions/date-idea
pub async fn suggest_date_idea(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Response {
    let them = {
        let dating = state.dating.read().await;
        match dating.get_match(&match_id) {
            Ok(m) => m.user.clone(),
            Err(e) => return e.into_response(),
        }
    };

    let suggestion = state.suggestions.date_idea(&them.name, &them.interests).await;
    (StatusCode::OK, Json(SuggestionResponse { suggestion })).into_response()
}

// ============================================================================
// Live call
// ============================================================================

/// POST /matches/:match_id/call
/// Start a voice call with the matched persona
pub async fn start_call(State(state): State<AppState>, Path(match_id): Path<String>) -> Response {
    let profile = {
        let dating = state.dating.read().await;
        match dating.get_match(&match_id) {
            Ok(m) => m.user.clone(),
            Err(e) => return e.into_response(),
        }
    };

    match state.calls.start_call(&profile).await {
        Ok(session_id) => {
            let status = state.calls.status().await;
            (StatusCode::OK, Json(StartCallResponse { session_id, status })).into_response()
        }
        Err(e) => {
            error!("Failed to start call with {}: {}", profile.name, e);
            e.into_response()
        }
    }
}

/// DELETE /call
/// Hang up; returns the call statistics
pub async fn end_call(State(state): State<AppState>) -> Response {
    match state.calls.end_call().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// PUT /call/mute
pub async fn set_muted(State(state): State<AppState>, Json(req): Json<MuteRequest>) -> Response {
    match state.calls.set_muted(req.muted).await {
        Ok(muted) => (StatusCode::OK, Json(MuteResponse { muted })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /call
pub async fn get_call(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.calls.status().await)
}

/// GET /call/transcript
/// Transcript of the current call so far
pub async fn get_call_transcript(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.calls.transcript().await)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
