use crate::dating::UserProfile;

pub fn ice_breaker(me: &UserProfile, them: &UserProfile) -> String {
    format!(
        "Create a unique and personalized ice-breaker for a dating app.\n\
        User 1 (Me): Interests - {}, Job - {}.\n\
        User 2 (Match): Name - {}, Interests - {}, Bio - \"{}\".\n\n\
        Write a short, fun message that highlights a shared interest or asks a clever question about their bio.",
        me.interests.join(", "),
        me.job_title,
        them.name,
        them.interests.join(", "),
        them.bio
    )
}

pub fn date_idea(interests: &[String]) -> String {
    format!(
        "Suggest a creative first date idea for two people who share these interests: {}. \
        Include a suggested location type and a conversational topic. Keep it short.",
        interests.join(", ")
    )
}

pub fn bio_suggestions(interests: &[String], current_bio: &str) -> String {
    format!(
        "Act as a dating profile expert. Given these interests: {} and this current bio: \"{}\", \
        suggest 3 catchy, engaging, and slightly humorous dating profile bios. \
        Format the output as a JSON list of strings.",
        interests.join(", "),
        current_bio
    )
}

pub fn fallback_ice_breaker(them: &UserProfile) -> String {
    match them.interests.first() {
        Some(interest) => format!(
            "Hey {}! I noticed we both like {}. How's that going?",
            them.name, interest
        ),
        None => format!("Hey {}! How's your week going?", them.name),
    }
}

pub const FALLBACK_DATE_IDEA: &str = "How about a coffee and a walk in the park?";

pub fn fallback_bios() -> Vec<String> {
    vec![
        "I'm working on my bio...".to_string(),
        "Looking for someone special.".to_string(),
        "Hi there!".to_string(),
    ]
}
