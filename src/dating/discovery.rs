use serde::{Deserialize, Serialize};

use super::profile::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Like,
    Dislike,
}

/// What the discovery screen shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeckView {
    /// A card is on top of the deck
    Card {
        profile: UserProfile,
        /// Cards after this one
        remaining: usize,
    },
    /// Filters exclude everyone
    NoProfiles,
    /// Every card has been swiped
    Exhausted,
}

/// Position in the filtered discovery list.
///
/// The list itself is recomputed from preferences and matches on every
/// read; the deck only remembers where the user is, and rewinds whenever
/// the list length changes.
#[derive(Debug, Default, Clone)]
pub struct DiscoveryDeck {
    index: usize,
    seen_len: Option<usize>,
}

impl DiscoveryDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind when the filtered list changed size
    fn sync(&mut self, len: usize) {
        if self.seen_len != Some(len) {
            self.index = 0;
            self.seen_len = Some(len);
        }
    }

    pub fn view(&mut self, profiles: &[&UserProfile]) -> DeckView {
        self.sync(profiles.len());

        if profiles.is_empty() {
            return DeckView::NoProfiles;
        }
        match profiles.get(self.index) {
            Some(profile) => DeckView::Card {
                profile: (*profile).clone(),
                remaining: profiles.len() - self.index - 1,
            },
            None => DeckView::Exhausted,
        }
    }

    /// The profile on top of the deck, then advance past it
    pub fn swipe<'a>(&mut self, profiles: &[&'a UserProfile]) -> Option<&'a UserProfile> {
        self.sync(profiles.len());

        let profile = profiles.get(self.index).copied()?;
        self.index += 1;
        Some(profile)
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
