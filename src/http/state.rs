use crate::dating::DatingState;
use crate::session::LiveSessionController;
use crate::suggest::SuggestionService;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Profiles, preferences, deck position and matches
    pub dating: Arc<RwLock<DatingState>>,

    /// The one live voice call
    pub calls: Arc<LiveSessionController>,

    pub suggestions: Arc<SuggestionService>,
}

impl AppState {
    pub fn new(
        dating: DatingState,
        calls: LiveSessionController,
        suggestions: SuggestionService,
    ) -> Self {
        Self {
            dating: Arc::new(RwLock::new(dating)),
            calls: Arc::new(calls),
            suggestions: Arc::new(suggestions),
        }
    }
}
