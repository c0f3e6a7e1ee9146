use serde::{Deserialize, Serialize};

/// Prebuilt voice persona used when calling a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    Kore,
    Zephyr,
}

impl Voice {
    /// Name understood by the Live API
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Kore => "Kore",
            Voice::Zephyr => "Zephyr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub bio: String,
    pub images: Vec<String>,
    pub interests: Vec<String>,
    pub job_title: String,
    /// Display distance, e.g. "3 miles away"
    pub distance: String,
    pub voice: Voice,
}

impl UserProfile {
    /// Leading number of the display distance, in miles
    pub fn distance_miles(&self) -> Option<u32> {
        self.distance.split_whitespace().next()?.parse().ok()
    }
}

#[allow(clippy::too_many_arguments)]
fn profile(
    id: &str,
    name: &str,
    age: u32,
    bio: &str,
    interests: &[&str],
    job_title: &str,
    distance: &str,
    voice: Voice,
) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        age,
        bio: bio.to_string(),
        images: vec![format!(
            "https://picsum.photos/seed/{}/800/1200",
            name.to_lowercase()
        )],
        interests: interests.iter().map(|s| s.to_string()).collect(),
        job_title: job_title.to_string(),
        distance: distance.to_string(),
        voice,
    }
}

/// Profiles shown in discovery
pub fn mock_profiles() -> Vec<UserProfile> {
    vec![
        profile(
            "1",
            "Elena",
            26,
            "Digital nomad & amateur chef. I believe the best way to explore a city is through its street food. Looking for someone to join my next adventure!",
            &["Travel", "Cooking", "Photography", "Art"],
            "UX Designer",
            "3 miles away",
            Voice::Kore,
        ),
        profile(
            "2",
            "Marcus",
            29,
            "Software engineer by day, musician by night. If you like jazz and late-night coding sessions, we might just get along.",
            &["Music", "Coding", "Jazz", "Coffee"],
            "Fullstack Developer",
            "5 miles away",
            Voice::Zephyr,
        ),
        profile(
            "3",
            "Sofia",
            24,
            "Yoga instructor and nature lover. My favorite place is anywhere I can see the sunset. Plant mom of 23.",
            &["Yoga", "Hiking", "Plants", "Wellness"],
            "Wellness Coach",
            "8 miles away",
            Voice::Kore,
        ),
        profile(
            "4",
            "Julian",
            31,
            "History buff and bookworm. Always ready for a museum trip or a deep conversation about philosophy. Coffee is non-negotiable.",
            &["Books", "Museums", "History", "Philosophy"],
            "Archivist",
            "2 miles away",
            Voice::Zephyr,
        ),
        profile(
            "5",
            "Claire",
            27,
            "Adrenaline junkie! Skydiving, rock climbing, you name it. Looking for a partner in crime.",
            &["Climbing", "Skydiving", "Adventure", "Fitness"],
            "Event Producer",
            "12 miles away",
            Voice::Kore,
        ),
    ]
}

/// The signed-in user
pub fn current_user() -> UserProfile {
    let mut me = profile(
        "me",
        "Alex",
        28,
        "Tech enthusiast and dog lover. Exploring the world of AI and building cool things.",
        &["Technology", "AI", "Dogs", "Surfing"],
        "Product Manager",
        "0 miles away",
        Voice::Zephyr,
    );
    me.images = vec!["https://picsum.photos/seed/me/800/1200".to_string()];
    me
}

pub fn find_profile(id: &str) -> Option<UserProfile> {
    mock_profiles().into_iter().find(|p| p.id == id)
}

/// Every interest across the mock profiles, first occurrence order
pub fn all_interests() -> Vec<String> {
    let mut seen = Vec::new();
    for interest in mock_profiles().into_iter().flat_map(|p| p.interests) {
        if !seen.contains(&interest) {
            seen.push(interest);
        }
    }
    seen
}
