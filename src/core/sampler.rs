use crate::models::{FoodCatalog, MenuItem, WeightProfile};
use rand::seq::SliceRandom;
use rand::Rng;

/// Optional exact-match filters over the three menu facets
///
/// Filters that are set are ANDed together; an empty filter admits the
/// whole catalog.
#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    pub cuisine: Option<String>,
    pub group: Option<String>,
    pub category: Option<String>,
}

impl MenuFilter {
    pub fn matches(&self, item: &MenuItem) -> bool {
        if let Some(cuisine) = &self.cuisine {
            if &item.cuisine != cuisine {
                return false;
            }
        }
        if let Some(group) = &self.group {
            if &item.group != group {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }
        true
    }
}

/// Outcome of one recommendation call
///
/// `NoMatch` means the filters admitted no candidates; callers must
/// distinguish it from a successful pick.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    Pick(MenuItem),
    NoMatch,
}

/// Weighted-random menu sampler
///
/// With a profile, each candidate's relative weight is the product of
/// its three facet weights; anonymous sessions pick uniformly.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationSampler;

impl RecommendationSampler {
    pub fn new() -> Self {
        Self
    }

    /// Pick one menu item from the catalog under the given filters
    pub fn recommend<R: Rng + ?Sized>(
        &self,
        catalog: &FoodCatalog,
        filter: &MenuFilter,
        profile: Option<&WeightProfile>,
        rng: &mut R,
    ) -> Recommendation {
        let candidates: Vec<&MenuItem> = catalog
            .menus
            .iter()
            .filter(|item| filter.matches(item))
            .collect();

        if candidates.is_empty() {
            return Recommendation::NoMatch;
        }

        let Some(profile) = profile else {
            return uniform_pick(&candidates, rng);
        };

        let scores: Vec<f64> = candidates
            .iter()
            .map(|item| profile.composite_score(item).max(0.0))
            .collect();
        let total: f64 = scores.iter().sum();

        // Unreachable while the minimum weight is positive, but guarded
        // so a zero total never divides the draw
        if total <= 0.0 || !total.is_finite() {
            tracing::warn!("Degenerate weight total {}, falling back to uniform", total);
            return uniform_pick(&candidates, rng);
        }

        let mut draw = rng.gen_range(0.0..total);
        for (item, score) in candidates.iter().zip(&scores) {
            if draw < *score {
                return Recommendation::Pick((*item).clone());
            }
            draw -= score;
        }

        // Floating-point accumulation can walk past the last candidate
        uniform_pick(&candidates, rng)
    }
}

fn uniform_pick<R: Rng + ?Sized>(candidates: &[&MenuItem], rng: &mut R) -> Recommendation {
    match candidates.choose(rng) {
        Some(item) => Recommendation::Pick((*item).clone()),
        None => Recommendation::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn menu(name: &str, cuisine: &str) -> MenuItem {
        MenuItem {
            name: name.to_string(),
            cuisine: cuisine.to_string(),
            group: "식사".to_string(),
            category: "찌개".to_string(),
        }
    }

    fn catalog() -> FoodCatalog {
        FoodCatalog::from_menus(vec![
            menu("김치찌개", "한식"),
            menu("마파두부", "중식"),
            menu("스시", "일식"),
            menu("파스타", "양식"),
        ])
    }

    #[test]
    fn test_filter_exact_match_and() {
        let filter = MenuFilter {
            cuisine: Some("한식".to_string()),
            group: Some("식사".to_string()),
            category: None,
        };
        assert!(filter.matches(&menu("김치찌개", "한식")));
        assert!(!filter.matches(&menu("마파두부", "중식")));
    }

    #[test]
    fn test_empty_candidate_set_is_no_match() {
        let sampler = RecommendationSampler::new();
        let mut rng = StdRng::seed_from_u64(7);
        let filter = MenuFilter {
            cuisine: Some("존재하지않는".to_string()),
            ..Default::default()
        };

        let result = sampler.recommend(&catalog(), &filter, None, &mut rng);
        assert_eq!(result, Recommendation::NoMatch);
    }

    #[test]
    fn test_empty_catalog_is_no_match() {
        let sampler = RecommendationSampler::new();
        let mut rng = StdRng::seed_from_u64(7);

        let result = sampler.recommend(
            &FoodCatalog::default(),
            &MenuFilter::default(),
            None,
            &mut rng,
        );
        assert_eq!(result, Recommendation::NoMatch);
    }

    #[test]
    fn test_anonymous_pick_comes_from_candidates() {
        let sampler = RecommendationSampler::new();
        let mut rng = StdRng::seed_from_u64(42);
        let filter = MenuFilter {
            cuisine: Some("한식".to_string()),
            ..Default::default()
        };

        for _ in 0..20 {
            match sampler.recommend(&catalog(), &filter, None, &mut rng) {
                Recommendation::Pick(item) => assert_eq!(item.cuisine, "한식"),
                Recommendation::NoMatch => panic!("Filtered set is non-empty"),
            }
        }
    }

    #[test]
    fn test_skewed_profile_dominates_sampling() {
        let sampler = RecommendationSampler::new();
        let mut rng = StdRng::seed_from_u64(2024);

        // One cuisine weighted 2.0, the other three at the floor 0.1:
        // expected pick rate 2.0 / 2.3 ~ 0.87
        let mut profile = WeightProfile::default();
        profile.cuisine.insert("한식".to_string(), 2.0);
        profile.cuisine.insert("중식".to_string(), 0.1);
        profile.cuisine.insert("일식".to_string(), 0.1);
        profile.cuisine.insert("양식".to_string(), 0.1);

        let trials = 5_000;
        let mut hits = 0;
        for _ in 0..trials {
            if let Recommendation::Pick(item) =
                sampler.recommend(&catalog(), &MenuFilter::default(), Some(&profile), &mut rng)
            {
                if item.cuisine == "한식" {
                    hits += 1;
                }
            }
        }

        let observed = hits as f64 / trials as f64;
        let expected = 2.0 / 2.3;
        assert!(
            (observed - expected).abs() < 0.03,
            "Expected ~{:.3}, observed {:.3}",
            expected,
            observed
        );
    }

    #[test]
    fn test_zero_total_falls_back_to_uniform() {
        let sampler = RecommendationSampler::new();
        let mut rng = StdRng::seed_from_u64(9);

        // Not reachable through the learner (weights never go below 0.1),
        // handled all the same
        let mut profile = WeightProfile::default();
        for cuisine in ["한식", "중식", "일식", "양식"] {
            profile.cuisine.insert(cuisine.to_string(), 0.0);
        }

        match sampler.recommend(&catalog(), &MenuFilter::default(), Some(&profile), &mut rng) {
            Recommendation::Pick(_) => {}
            Recommendation::NoMatch => panic!("Zero total must fall back, not fail"),
        }
    }
}
