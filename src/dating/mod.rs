//! Discovery, matches and chat threads over the mock profile set.

mod discovery;
mod error;
mod matches;
mod preferences;
mod profile;

pub use discovery::{DeckView, DiscoveryDeck, SwipeDirection};
pub use error::DatingError;
pub use matches::{Match, MatchBook, Message, SELF_SENDER_ID};
pub use preferences::UserPreferences;
pub use profile::{all_interests, current_user, find_profile, mock_profiles, UserProfile, Voice};

use serde::Serialize;
use tracing::info;

/// Payload of the "It's a match!" celebration
#[derive(Debug, Clone, Serialize)]
pub struct MatchCelebration {
    pub me: UserProfile,
    pub matched: UserProfile,
    /// Chat thread to open from the celebration
    pub match_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwipeOutcome {
    pub direction: SwipeDirection,
    pub profile: UserProfile,
    pub celebration: Option<MatchCelebration>,
}

/// In-memory application state: the signed-in user, filters, deck position
/// and matches. Nothing is persisted.
pub struct DatingState {
    me: UserProfile,
    profiles: Vec<UserProfile>,
    preferences: UserPreferences,
    deck: DiscoveryDeck,
    matches: MatchBook,
}

impl Default for DatingState {
    fn default() -> Self {
        Self::new()
    }
}

impl DatingState {
    pub fn new() -> Self {
        Self::with_profiles(current_user(), mock_profiles())
    }

    pub fn with_profiles(me: UserProfile, profiles: Vec<UserProfile>) -> Self {
        Self {
            me,
            profiles,
            preferences: UserPreferences::default(),
            deck: DiscoveryDeck::new(),
            matches: MatchBook::new(),
        }
    }

    pub fn me(&self) -> &UserProfile {
        &self.me
    }

    pub fn profile(&self, id: &str) -> Result<&UserProfile, DatingError> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| DatingError::ProfileNotFound(id.to_string()))
    }

    /// Profiles passing the current filters, excluding matches
    pub fn discoverable(&self) -> Vec<&UserProfile> {
        let matched = self.matches.matched_profile_ids();
        self.preferences.filter(&self.profiles, &matched)
    }

    pub fn discovery(&mut self) -> DeckView {
        let matched = self.matches.matched_profile_ids();
        let list = self.preferences.filter(&self.profiles, &matched);
        self.deck.view(&list)
    }

    /// Swipe the top card. A like creates the match and returns the
    /// celebration payload.
    pub fn swipe(&mut self, direction: SwipeDirection) -> Result<SwipeOutcome, DatingError> {
        let profile = {
            let matched = self.matches.matched_profile_ids();
            let list = self.preferences.filter(&self.profiles, &matched);
            self.deck
                .swipe(&list)
                .cloned()
                .ok_or(DatingError::NothingToSwipe)?
        };

        let celebration = match direction {
            SwipeDirection::Dislike => None,
            SwipeDirection::Like => self.matches.add(profile.clone()).map(|m| {
                info!("New match with {} ({})", profile.name, m.id);
                MatchCelebration {
                    me: self.me.clone(),
                    matched: profile.clone(),
                    match_id: m.id.clone(),
                }
            }),
        };

        Ok(SwipeOutcome {
            direction,
            profile,
            celebration,
        })
    }

    pub fn reset_discovery(&mut self) {
        self.deck.reset();
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn update_preferences(&mut self, prefs: UserPreferences) -> Result<(), DatingError> {
        self.preferences.update(prefs)
    }

    pub fn toggle_interest(&mut self, interest: &str) -> &UserPreferences {
        self.preferences.toggle_interest(interest);
        &self.preferences
    }

    pub fn matches(&self) -> &MatchBook {
        &self.matches
    }

    pub fn get_match(&self, match_id: &str) -> Result<&Match, DatingError> {
        self.matches
            .get(match_id)
            .ok_or_else(|| DatingError::MatchNotFound(match_id.to_string()))
    }

    pub fn send_message(&mut self, match_id: &str, text: &str) -> Result<Message, DatingError> {
        self.matches.send_message(match_id, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_creates_match_and_celebration() {
        let mut state = DatingState::new();

        let outcome = state.swipe(SwipeDirection::Like).unwrap();
        let celebration = outcome.celebration.unwrap();

        assert_eq!(celebration.matched.name, "Elena");
        assert_eq!(celebration.me.name, "Alex");
        assert!(state.get_match(&celebration.match_id).is_ok());
    }

    #[test]
    fn test_matched_profile_leaves_discovery() {
        let mut state = DatingState::new();
        state.swipe(SwipeDirection::Like).unwrap();

        assert_eq!(state.discoverable().len(), 4);
        match state.discovery() {
            DeckView::Card { profile, remaining } => {
                assert_eq!(profile.name, "Marcus");
                assert_eq!(remaining, 3);
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_dislike_only_advances() {
        let mut state = DatingState::new();
        let outcome = state.swipe(SwipeDirection::Dislike).unwrap();

        assert!(outcome.celebration.is_none());
        assert!(state.matches().is_empty());
        match state.discovery() {
            DeckView::Card { profile, .. } => assert_eq!(profile.name, "Marcus"),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_swipe_on_empty_deck_fails() {
        let mut state = DatingState::new();
        let mut prefs = UserPreferences::default();
        prefs.interests = vec!["Knitting".to_string()];
        state.update_preferences(prefs).unwrap();

        assert_eq!(state.discovery(), DeckView::NoProfiles);
        assert_eq!(
            state.swipe(SwipeDirection::Like).unwrap_err(),
            DatingError::NothingToSwipe
        );
    }
}
