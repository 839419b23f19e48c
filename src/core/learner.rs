use crate::models::{MenuItem, WeightProfile, NEUTRAL_WEIGHT};
use std::collections::HashMap;

/// Smallest weight a facet may reach
pub const MIN_WEIGHT: f64 = 0.1;
/// Largest weight a facet may reach
pub const MAX_WEIGHT: f64 = 2.0;
/// Step size applied per rating
pub const LEARNING_RATE: f64 = 0.05;

/// Rating value that leaves weights untouched
const RATING_MIDPOINT: f64 = 5.5;
/// Half the usable rating range; maps 1-10 onto roughly [-1, +1]
const RATING_HALF_RANGE: f64 = 4.5;

/// Online learner that nudges a user's facet weights from 1-10 ratings
/// of delivered recommendations
///
/// Weights move toward the clamp bounds only through repeated consistent
/// ratings; there is no decay or recency mechanism.
#[derive(Debug, Clone, Copy)]
pub struct WeightLearner {
    learning_rate: f64,
}

impl WeightLearner {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    /// Map a 1-10 rating onto an adjustment factor in roughly [-1, +1]
    ///
    /// Out-of-range ratings behave as the nearest bound.
    pub fn adjustment(rating: u8) -> f64 {
        let clamped = f64::from(rating.clamp(1, 10));
        (clamped - RATING_MIDPOINT) / RATING_HALF_RANGE
    }

    /// Apply one rating of a delivered item, returning a new profile
    ///
    /// Only the three facet keys present on the item are touched; each
    /// moves by `learning_rate * adjustment`, clamped to
    /// `[MIN_WEIGHT, MAX_WEIGHT]`. The caller persists the result.
    pub fn update(&self, profile: &WeightProfile, item: &MenuItem, rating: u8) -> WeightProfile {
        let adjustment = Self::adjustment(rating);
        let mut updated = profile.clone();

        nudge(&mut updated.cuisine, &item.cuisine, self.learning_rate, adjustment);
        nudge(&mut updated.food_group, &item.group, self.learning_rate, adjustment);
        nudge(&mut updated.food_category, &item.category, self.learning_rate, adjustment);

        updated
    }
}

impl Default for WeightLearner {
    fn default() -> Self {
        Self::new(LEARNING_RATE)
    }
}

fn nudge(weights: &mut HashMap<String, f64>, key: &str, learning_rate: f64, adjustment: f64) {
    if key.is_empty() {
        return;
    }
    let current = weights.get(key).copied().unwrap_or(NEUTRAL_WEIGHT);
    // Bad upstream values are pulled back into range rather than propagated
    let current = current.clamp(MIN_WEIGHT, MAX_WEIGHT);
    let updated = (current + learning_rate * adjustment).clamp(MIN_WEIGHT, MAX_WEIGHT);
    weights.insert(key.to_string(), updated);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> MenuItem {
        MenuItem {
            name: "김치찌개".to_string(),
            cuisine: "한식".to_string(),
            group: "식사".to_string(),
            category: "찌개".to_string(),
        }
    }

    #[test]
    fn test_adjustment_endpoints() {
        assert!((WeightLearner::adjustment(10) - 1.0).abs() < 1e-9);
        assert!((WeightLearner::adjustment(1) + 1.0).abs() < 1e-9);
        // Rating 5 sits just below the midpoint
        assert!(WeightLearner::adjustment(5) < 0.0);
        assert!(WeightLearner::adjustment(6) > 0.0);
    }

    #[test]
    fn test_rating_ten_increases_touched_facets() {
        let learner = WeightLearner::default();
        let profile = WeightProfile::default();

        let updated = learner.update(&profile, &item(), 10);

        assert!((updated.cuisine_weight("한식") - 1.05).abs() < 1e-9);
        assert!((updated.group_weight("식사") - 1.05).abs() < 1e-9);
        assert!((updated.category_weight("찌개") - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_rating_one_decreases_touched_facets() {
        let learner = WeightLearner::default();
        let profile = WeightProfile::default();

        let updated = learner.update(&profile, &item(), 1);

        assert!((updated.cuisine_weight("한식") - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_untouched_facets_unchanged() {
        let learner = WeightLearner::default();
        let mut profile = WeightProfile::default();
        profile.cuisine.insert("중식".to_string(), 1.3);

        let updated = learner.update(&profile, &item(), 10);

        assert_eq!(updated.cuisine_weight("중식"), 1.3);
        assert!(!updated.food_group.contains_key("간식"));
    }

    #[test]
    fn test_repeated_max_ratings_converge_to_cap() {
        let learner = WeightLearner::default();
        let mut profile = WeightProfile::default();

        for _ in 0..50 {
            profile = learner.update(&profile, &item(), 10);
            assert!(profile.cuisine_weight("한식") <= MAX_WEIGHT);
        }

        assert_eq!(profile.cuisine_weight("한식"), MAX_WEIGHT);

        // Once at the cap, further maximal ratings are a fixed point
        let again = learner.update(&profile, &item(), 10);
        assert_eq!(again.cuisine_weight("한식"), MAX_WEIGHT);
    }

    #[test]
    fn test_repeated_min_ratings_converge_to_floor() {
        let learner = WeightLearner::default();
        let mut profile = WeightProfile::default();

        for _ in 0..50 {
            profile = learner.update(&profile, &item(), 1);
        }

        assert!((profile.cuisine_weight("한식") - MIN_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_rating_clamped() {
        let learner = WeightLearner::default();
        let profile = WeightProfile::default();

        let from_zero = learner.update(&profile, &item(), 0);
        let from_one = learner.update(&profile, &item(), 1);
        assert_eq!(
            from_zero.cuisine_weight("한식"),
            from_one.cuisine_weight("한식")
        );
    }

    #[test]
    fn test_returns_new_profile_value() {
        let learner = WeightLearner::default();
        let profile = WeightProfile::default();

        let updated = learner.update(&profile, &item(), 10);

        // Original profile is untouched; the caller swaps in the new value
        assert!(profile.cuisine.is_empty());
        assert!(!updated.cuisine.is_empty());
    }
}
