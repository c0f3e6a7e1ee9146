use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DatingError;
use super::profile::UserProfile;

/// Sender id used for messages written by the local user
pub const SELF_SENDER_ID: &str = "me";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub user: UserProfile,
    pub messages: Vec<Message>,
    pub last_message: Option<String>,
}

/// All matches, newest first
#[derive(Debug, Default, Clone)]
pub struct MatchBook {
    matches: Vec<Match>,
}

impl MatchBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a match with `profile`. Returns `None` when already matched.
    pub fn add(&mut self, profile: UserProfile) -> Option<&Match> {
        if self.matches.iter().any(|m| m.user.id == profile.id) {
            return None;
        }

        self.matches.insert(
            0,
            Match {
                id: uuid::Uuid::new_v4().to_string(),
                user: profile,
                messages: Vec::new(),
                last_message: None,
            },
        );
        self.matches.first()
    }

    pub fn get(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    pub fn matched_profile_ids(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.user.id.as_str()).collect()
    }

    /// Append a message from the local user
    pub fn send_message(&mut self, match_id: &str, text: &str) -> Result<Message, DatingError> {
        if text.trim().is_empty() {
            return Err(DatingError::EmptyMessage);
        }

        let m = self
            .matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or_else(|| DatingError::MatchNotFound(match_id.to_string()))?;

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: SELF_SENDER_ID.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        m.messages.push(message.clone());
        m.last_message = Some(text.to_string());

        Ok(message)
    }

    /// Matches nobody has written to yet
    pub fn new_matches(&self) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.messages.is_empty()).collect()
    }

    /// Matches with at least one message
    pub fn conversations(&self) -> Vec<&Match> {
        self.matches.iter().filter(|m| !m.messages.is_empty()).collect()
    }

    /// Drives the unread badge on the chats tab
    pub fn has_unopened(&self) -> bool {
        self.matches.iter().any(|m| m.messages.is_empty())
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dating::profile::find_profile;

    #[test]
    fn test_matching_twice_is_a_no_op() {
        let mut book = MatchBook::new();
        assert!(book.add(find_profile("1").unwrap()).is_some());
        assert!(book.add(find_profile("1").unwrap()).is_none());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_newest_match_first() {
        let mut book = MatchBook::new();
        book.add(find_profile("1").unwrap());
        book.add(find_profile("2").unwrap());

        assert_eq!(book.matched_profile_ids(), vec!["2", "1"]);
    }

    #[test]
    fn test_send_message_moves_match_to_conversations() {
        let mut book = MatchBook::new();
        let id = book.add(find_profile("3").unwrap()).unwrap().id.clone();
        assert!(book.has_unopened());

        let msg = book.send_message(&id, "Hi Sofia!").unwrap();
        assert_eq!(msg.sender_id, SELF_SENDER_ID);

        assert!(book.new_matches().is_empty());
        assert_eq!(book.conversations().len(), 1);
        assert_eq!(book.get(&id).unwrap().last_message.as_deref(), Some("Hi Sofia!"));
        assert!(!book.has_unopened());
    }

    #[test]
    fn test_blank_message_rejected() {
        let mut book = MatchBook::new();
        let id = book.add(find_profile("3").unwrap()).unwrap().id.clone();

        assert_eq!(book.send_message(&id, "   "), Err(DatingError::EmptyMessage));
        assert!(book.get(&id).unwrap().messages.is_empty());
    }

    #[test]
    fn test_unknown_match_rejected() {
        let mut book = MatchBook::new();
        assert_eq!(
            book.send_message("nope", "hello"),
            Err(DatingError::MatchNotFound("nope".to_string()))
        );
    }
}
