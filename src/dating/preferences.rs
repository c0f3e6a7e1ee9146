use serde::{Deserialize, Serialize};

use super::error::DatingError;
use super::profile::UserProfile;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 60;
pub const MIN_DISTANCE: u32 = 1;
pub const MAX_DISTANCE: u32 = 100;

/// Discovery filters chosen in the settings panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Inclusive (min, max) age
    pub age_range: (u32, u32),
    /// Miles
    pub max_distance: u32,
    /// When non-empty, a profile must share at least one of these
    pub interests: Vec<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            age_range: (18, 50),
            max_distance: 50,
            interests: Vec::new(),
        }
    }
}

impl UserPreferences {
    pub fn set_age_range(&mut self, min: u32, max: u32) -> Result<(), DatingError> {
        if min < MIN_AGE || max > MAX_AGE || min > max {
            return Err(DatingError::InvalidPreferences(format!(
                "age range must satisfy {} <= min <= max <= {}, got {}-{}",
                MIN_AGE, MAX_AGE, min, max
            )));
        }
        self.age_range = (min, max);
        Ok(())
    }

    pub fn set_max_distance(&mut self, miles: u32) -> Result<(), DatingError> {
        if !(MIN_DISTANCE..=MAX_DISTANCE).contains(&miles) {
            return Err(DatingError::InvalidPreferences(format!(
                "max distance must be within {}-{} miles, got {}",
                MIN_DISTANCE, MAX_DISTANCE, miles
            )));
        }
        self.max_distance = miles;
        Ok(())
    }

    /// Add the interest if absent, remove it if present
    pub fn toggle_interest(&mut self, interest: &str) {
        if let Some(pos) = self.interests.iter().position(|i| i == interest) {
            self.interests.remove(pos);
        } else {
            self.interests.push(interest.to_string());
        }
    }

    /// Replace every field, validating ranges first
    pub fn update(&mut self, other: UserPreferences) -> Result<(), DatingError> {
        let mut next = self.clone();
        next.set_age_range(other.age_range.0, other.age_range.1)?;
        next.set_max_distance(other.max_distance)?;
        next.interests = other.interests;
        *self = next;
        Ok(())
    }

    /// Whether a profile passes the age, distance and interest filters.
    ///
    /// A distance that does not start with a number never excludes a profile.
    pub fn accepts(&self, profile: &UserProfile) -> bool {
        let (min_age, max_age) = self.age_range;
        if profile.age < min_age || profile.age > max_age {
            return false;
        }

        if let Some(miles) = profile.distance_miles() {
            if miles > self.max_distance {
                return false;
            }
        }

        if !self.interests.is_empty()
            && !profile.interests.iter().any(|i| self.interests.contains(i))
        {
            return false;
        }

        true
    }

    /// Profiles to show in discovery: accepted by the filters and not matched yet
    pub fn filter<'a>(
        &self,
        profiles: &'a [UserProfile],
        matched_ids: &[&str],
    ) -> Vec<&'a UserProfile> {
        profiles
            .iter()
            .filter(|p| self.accepts(p))
            .filter(|p| !matched_ids.contains(&p.id.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dating::profile::mock_profiles;

    fn names(profiles: &[&UserProfile]) -> Vec<String> {
        profiles.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_defaults_show_everyone() {
        let profiles = mock_profiles();
        let prefs = UserPreferences::default();
        assert_eq!(prefs.filter(&profiles, &[]).len(), 5);
    }

    #[test]
    fn test_age_bounds_are_inclusive() {
        let profiles = mock_profiles();
        let mut prefs = UserPreferences::default();
        prefs.set_age_range(24, 27).unwrap();

        assert_eq!(
            names(&prefs.filter(&profiles, &[])),
            vec!["Elena", "Sofia", "Claire"]
        );
    }

    #[test]
    fn test_distance_filter() {
        let profiles = mock_profiles();
        let mut prefs = UserPreferences::default();
        prefs.set_max_distance(5).unwrap();

        assert_eq!(
            names(&prefs.filter(&profiles, &[])),
            vec!["Elena", "Marcus", "Julian"]
        );
    }

    #[test]
    fn test_unparseable_distance_is_kept() {
        let mut profiles = mock_profiles();
        profiles[4].distance = "far far away".to_string();
        let mut prefs = UserPreferences::default();
        prefs.set_max_distance(1).unwrap();

        assert_eq!(names(&prefs.filter(&profiles, &[])), vec!["Claire"]);
    }

    #[test]
    fn test_interest_filter_needs_one_overlap() {
        let profiles = mock_profiles();
        let mut prefs = UserPreferences::default();
        prefs.toggle_interest("Jazz");
        prefs.toggle_interest("Hiking");

        assert_eq!(names(&prefs.filter(&profiles, &[])), vec!["Marcus", "Sofia"]);

        prefs.toggle_interest("Jazz");
        assert_eq!(prefs.interests, vec!["Hiking".to_string()]);
    }

    #[test]
    fn test_matched_profiles_are_hidden() {
        let profiles = mock_profiles();
        let prefs = UserPreferences::default();

        assert_eq!(
            names(&prefs.filter(&profiles, &["1", "4"])),
            vec!["Marcus", "Sofia", "Claire"]
        );
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let mut prefs = UserPreferences::default();
        assert!(prefs.set_age_range(30, 25).is_err());
        assert!(prefs.set_age_range(16, 30).is_err());
        assert!(prefs.set_max_distance(0).is_err());
        assert!(prefs.set_max_distance(101).is_err());
        assert_eq!(prefs, UserPreferences::default());
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut prefs = UserPreferences::default();
        let bad = UserPreferences {
            age_range: (20, 30),
            max_distance: 500,
            interests: vec!["Art".to_string()],
        };

        assert!(prefs.update(bad).is_err());
        assert_eq!(prefs, UserPreferences::default());
    }
}
