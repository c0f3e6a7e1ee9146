use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatingError {
    #[error("Profile {0} not found")]
    ProfileNotFound(String),

    #[error("Match {0} not found")]
    MatchNotFound(String),

    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),

    #[error("No profile to swipe on")]
    NothingToSwipe,
}
