//! AI-assisted text suggestions: ice-breakers, date ideas and bios.
//!
//! Every operation degrades to a fixed fallback when the text model fails,
//! so callers always get something to show.

pub mod client;
mod prompts;

pub use client::{GeminiTextClient, TextModel};

use std::sync::Arc;
use tracing::{info, warn};

use crate::dating::UserProfile;

pub struct SuggestionService {
    model: Arc<dyn TextModel>,
}

impl SuggestionService {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Opening message from `me` to `them`
    pub async fn ice_breaker(&self, me: &UserProfile, them: &UserProfile) -> String {
        match self.model.generate_text(&prompts::ice_breaker(me, them)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Ice-breaker generation failed, using fallback: {:#}", e);
                prompts::fallback_ice_breaker(them)
            }
        }
    }

    /// First date idea around `interests`, ready for display
    pub async fn date_idea(&self, match_name: &str, interests: &[String]) -> String {
        info!("Planning a date with {}", match_name);
        let idea = match self.model.generate_text(&prompts::date_idea(interests)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Date idea generation failed, using fallback: {:#}", e);
                prompts::FALLBACK_DATE_IDEA.to_string()
            }
        };
        format!("Date Idea: {}", idea)
    }

    /// Three alternative bios
    pub async fn bio_suggestions(&self, interests: &[String], current_bio: &str) -> Vec<String> {
        match self
            .model
            .generate_list(&prompts::bio_suggestions(interests, current_bio))
            .await
        {
            Ok(bios) if !bios.is_empty() => bios,
            Ok(_) => {
                warn!("Bio generation returned nothing, using fallback");
                prompts::fallback_bios()
            }
            Err(e) => {
                warn!("Bio generation failed, using fallback: {:#}", e);
                prompts::fallback_bios()
            }
        }
    }
}
