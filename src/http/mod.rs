//! HTTP API for the dating app front end
//!
//! This module provides a REST API over the app state and the live call:
//! - /profiles, /interests - Profile data
//! - /discovery - Card deck and swipes
//! - /preferences - Discovery filters
//! - /matches - Matches, chat threads and AI suggestions
//! - /call - The live voice call (start, hang up, mute, transcript)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
