use crate::core::distance::{format_distance, haversine_distance};
use crate::models::{Coordinates, FavoriteMap, Marker, Restaurant};
use std::time::Duration;

/// Contract for resolving a free-text address to coordinates
///
/// `Ok(None)` is the ordinary "address not found" outcome; `Err` is a
/// transport or service failure. The ranking pass treats both as "skip
/// this record" and never aborts the batch.
pub trait GeocodeResolver {
    type Error: std::fmt::Display;

    fn resolve(
        &self,
        address: &str,
    ) -> impl std::future::Future<Output = Result<Option<Coordinates>, Self::Error>>;
}

/// Result of one completed ranking pass
#[derive(Debug, Clone)]
pub struct RankResult {
    /// Distance-sorted, truncated, favorite-reconciled records
    pub restaurants: Vec<Restaurant>,
    /// Parallel marker list for records with known coordinates
    pub markers: Vec<Marker>,
    /// Records kept without a distance because resolution failed
    pub unresolved: usize,
}

/// Outcome of a rank call
#[derive(Debug, Clone)]
pub enum RankOutcome {
    Ranked(RankResult),
    /// The batch already carried computed distances; re-ranking it would
    /// feed ranking output back in as input, so the pass is a no-op
    AlreadyRanked(Vec<Restaurant>),
}

/// Lifecycle of a ranking pass over one input batch
///
/// Starting a pass is legal from `Idle`, or from `Ranked` with a
/// genuinely new location; a fresh location arriving mid-pass supersedes
/// the in-flight one, whose completion is then stale and discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankState {
    Idle,
    Fetching { location: Coordinates },
    Ranked { location: Coordinates },
}

impl RankState {
    /// Attempt to start a pass for `location`; false means nothing new
    /// to do (same location already ranked or already being fetched)
    pub fn try_begin(&mut self, location: Coordinates) -> bool {
        match *self {
            RankState::Idle => {
                *self = RankState::Fetching { location };
                true
            }
            RankState::Fetching { location: current } => {
                if current == location {
                    return false;
                }
                // New input supersedes the in-flight pass
                *self = RankState::Fetching { location };
                true
            }
            RankState::Ranked { location: previous } => {
                if previous == location {
                    return false;
                }
                *self = RankState::Fetching { location };
                true
            }
        }
    }

    /// Record a pass completion; false means the completion is stale
    /// (superseded by newer input) and its result must not be applied
    pub fn complete(&mut self, location: Coordinates) -> bool {
        match *self {
            RankState::Fetching { location: current } if current == location => {
                *self = RankState::Ranked { location };
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        *self = RankState::Idle;
    }
}

impl Default for RankState {
    fn default() -> Self {
        RankState::Idle
    }
}

/// Merge favorite updates over a stored favorite map, updates winning
///
/// Favorite state and ranking output arrive from independent sources at
/// independent times; reconciliation is a pure map merge so neither
/// arrival order loses user-set flags.
pub fn merge_favorites(stored: &FavoriteMap, updates: &FavoriteMap) -> FavoriteMap {
    let mut merged = stored.clone();
    for (id, flag) in updates {
        merged.insert(id.clone(), *flag);
    }
    merged
}

/// Build the marker list for the records with known coordinates and a
/// computed distance
pub fn collect_markers(restaurants: &[Restaurant]) -> Vec<Marker> {
    restaurants
        .iter()
        .filter_map(|r| {
            let coords = r.coordinates()?;
            let distance = r.distance_m?;
            Some(Marker {
                lat: coords.lat,
                lng: coords.lng,
                name: r.name.clone(),
                address: r.address.clone(),
                distance,
                distance_label: format_distance(distance),
                restaurant_id: r.id.clone(),
            })
        })
        .collect()
}

/// Distance-ranking pipeline over raw restaurant records
///
/// Resolves missing coordinates one address at a time with a fixed
/// inter-call delay (the upstream geocoder is rate-limited), computes
/// distances, sorts ascending, truncates, and re-applies favorites.
#[derive(Debug, Clone)]
pub struct ProximityRanker {
    limit: usize,
    geocode_delay: Duration,
}

/// Bounded candidate set size
pub const DEFAULT_LIMIT: usize = 50;
/// Pause between consecutive geocoder calls
pub const DEFAULT_GEOCODE_DELAY: Duration = Duration::from_millis(300);

impl ProximityRanker {
    pub fn new(limit: usize, geocode_delay: Duration) -> Self {
        Self {
            limit,
            geocode_delay,
        }
    }

    /// Same pipeline with a different candidate cap
    pub fn with_limit(&self, limit: usize) -> Self {
        Self {
            limit,
            geocode_delay: self.geocode_delay,
        }
    }

    /// Run one ranking pass
    ///
    /// Takes ownership of the record snapshot and the location so a
    /// concurrent update to the live list cannot alter this pass.
    /// Individual geocode failures are logged and skipped; the affected
    /// record is kept without a distance and sorts last.
    pub async fn rank<G: GeocodeResolver>(
        &self,
        snapshot: Vec<Restaurant>,
        location: Coordinates,
        favorites: &FavoriteMap,
        resolver: &G,
    ) -> RankOutcome {
        // Ranking output fed back as input must not start another pass
        if snapshot.iter().any(|r| r.distance_m.is_some()) {
            tracing::debug!("Batch already carries distances, skipping re-rank");
            return RankOutcome::AlreadyRanked(snapshot);
        }

        let total = snapshot.len();
        let mut ranked: Vec<Restaurant> = Vec::with_capacity(total);
        let mut unresolved = 0usize;
        let mut resolver_called = false;

        for mut restaurant in snapshot {
            let coords = match restaurant.coordinates() {
                Some(coords) => Some(coords),
                None => {
                    // Serialized on purpose: one request at a time with a
                    // pause between calls keeps us under the rate limit
                    if resolver_called && !self.geocode_delay.is_zero() {
                        tokio::time::sleep(self.geocode_delay).await;
                    }
                    resolver_called = true;

                    match resolver.resolve(&restaurant.address).await {
                        Ok(Some(coords)) => {
                            tracing::debug!(
                                "Geocoded {} to ({}, {})",
                                restaurant.name,
                                coords.lat,
                                coords.lng
                            );
                            Some(coords)
                        }
                        Ok(None) => {
                            tracing::warn!(
                                "Address not found for {}: {}",
                                restaurant.name,
                                restaurant.address
                            );
                            None
                        }
                        Err(e) => {
                            tracing::warn!("Geocoding failed for {}: {}", restaurant.name, e);
                            None
                        }
                    }
                }
            };

            match coords {
                Some(coords) => {
                    restaurant.lat = Some(coords.lat);
                    restaurant.lng = Some(coords.lng);
                    restaurant.distance_m = Some(haversine_distance(
                        location.lat,
                        location.lng,
                        coords.lat,
                        coords.lng,
                    ));
                }
                None => unresolved += 1,
            }
            ranked.push(restaurant);
        }

        // Ascending by distance, distance-less records last
        ranked.sort_by(|a, b| {
            let da = a.distance_m.unwrap_or(f64::INFINITY);
            let db = b.distance_m.unwrap_or(f64::INFINITY);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });

        ranked.truncate(self.limit);

        // Re-apply favorites so a ranking pass never clears user state
        for restaurant in &mut ranked {
            if let Some(flag) = favorites.get(&restaurant.id) {
                restaurant.is_favorite = *flag;
            }
        }

        let markers = collect_markers(&ranked);

        tracing::info!(
            "Ranked {} of {} records ({} unresolved, {} markers)",
            ranked.len(),
            total,
            unresolved,
            markers.len()
        );

        RankOutcome::Ranked(RankResult {
            restaurants: ranked,
            markers,
            unresolved,
        })
    }
}

impl Default for ProximityRanker {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_GEOCODE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapResolver {
        coords: HashMap<String, Coordinates>,
        calls: AtomicUsize,
    }

    impl MapResolver {
        fn new(entries: &[(&str, f64, f64)]) -> Self {
            Self {
                coords: entries
                    .iter()
                    .map(|(addr, lat, lng)| (addr.to_string(), Coordinates::new(*lat, *lng)))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GeocodeResolver for MapResolver {
        type Error = String;

        async fn resolve(&self, address: &str) -> Result<Option<Coordinates>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if address == "boom" {
                return Err("service unavailable".to_string());
            }
            Ok(self.coords.get(address).copied())
        }
    }

    fn restaurant(id: &str, address: &str, coords: Option<(f64, f64)>) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: format!("식당 {}", id),
            address: address.to_string(),
            category: "한식".to_string(),
            lat: coords.map(|c| c.0),
            lng: coords.map(|c| c.1),
            distance_m: None,
            is_favorite: false,
            phone: None,
            open_hours: None,
            representative_menu: None,
            menu_names: vec![],
            menu_prices: vec![],
            map_url: None,
        }
    }

    fn test_ranker(limit: usize) -> ProximityRanker {
        ProximityRanker::new(limit, Duration::ZERO)
    }

    const HERE: Coordinates = Coordinates {
        lat: 36.3504,
        lng: 127.3845,
    };

    #[tokio::test]
    async fn test_rank_sorts_ascending_by_distance() {
        let ranker = test_ranker(50);
        let resolver = MapResolver::new(&[]);
        let records = vec![
            restaurant("far", "a", Some((36.40, 127.40))),
            restaurant("near", "b", Some((36.3505, 127.3846))),
            restaurant("mid", "c", Some((36.36, 127.39))),
        ];

        let outcome = ranker
            .rank(records, HERE, &FavoriteMap::new(), &resolver)
            .await;
        let RankOutcome::Ranked(result) = outcome else {
            panic!("Fresh batch must be ranked");
        };

        let ids: Vec<&str> = result.restaurants.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        for pair in result.restaurants.windows(2) {
            assert!(pair[0].distance_m.unwrap() <= pair[1].distance_m.unwrap());
        }
        // Pre-resolved coordinates never hit the resolver
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rank_resolves_missing_coordinates() {
        let ranker = test_ranker(50);
        let resolver = MapResolver::new(&[("둔산로 133", 36.3505, 127.3846)]);
        let records = vec![restaurant("1", "둔산로 133", None)];

        let RankOutcome::Ranked(result) = ranker
            .rank(records, HERE, &FavoriteMap::new(), &resolver)
            .await
        else {
            panic!("Fresh batch must be ranked");
        };

        assert_eq!(resolver.call_count(), 1);
        assert!(result.restaurants[0].distance_m.is_some());
        assert_eq!(result.markers.len(), 1);
        assert_eq!(result.markers[0].restaurant_id, "1");
    }

    #[tokio::test]
    async fn test_failed_records_kept_without_distance_and_sort_last() {
        let ranker = test_ranker(50);
        let resolver = MapResolver::new(&[]);
        let records = vec![
            restaurant("lost", "unknown address", None),
            restaurant("err", "boom", None),
            restaurant("ok", "a", Some((36.3505, 127.3846))),
        ];

        let RankOutcome::Ranked(result) = ranker
            .rank(records, HERE, &FavoriteMap::new(), &resolver)
            .await
        else {
            panic!("Fresh batch must be ranked");
        };

        assert_eq!(result.restaurants.len(), 3);
        assert_eq!(result.unresolved, 2);
        assert_eq!(result.restaurants[0].id, "ok");
        assert!(result.restaurants[1].distance_m.is_none());
        assert!(result.restaurants[2].distance_m.is_none());
        // Markers only for resolved records
        assert_eq!(result.markers.len(), 1);
    }

    #[tokio::test]
    async fn test_rank_truncates_to_limit() {
        let ranker = test_ranker(5);
        let resolver = MapResolver::new(&[]);
        let records: Vec<Restaurant> = (0..20)
            .map(|i| {
                restaurant(
                    &i.to_string(),
                    "a",
                    Some((36.3504 + i as f64 * 0.001, 127.3845)),
                )
            })
            .collect();

        let RankOutcome::Ranked(result) = ranker
            .rank(records, HERE, &FavoriteMap::new(), &resolver)
            .await
        else {
            panic!("Fresh batch must be ranked");
        };

        assert_eq!(result.restaurants.len(), 5);
        assert_eq!(result.markers.len(), 5);
    }

    #[tokio::test]
    async fn test_favorites_survive_ranking() {
        let ranker = test_ranker(50);
        let resolver = MapResolver::new(&[]);
        let records = vec![
            restaurant("1", "a", Some((36.3505, 127.3846))),
            restaurant("2", "b", Some((36.3506, 127.3847))),
        ];
        let favorites = FavoriteMap::from([("2".to_string(), true)]);

        let RankOutcome::Ranked(result) = ranker.rank(records, HERE, &favorites, &resolver).await
        else {
            panic!("Fresh batch must be ranked");
        };

        let by_id = |id: &str| {
            result
                .restaurants
                .iter()
                .find(|r| r.id == id)
                .unwrap()
                .is_favorite
        };
        assert!(!by_id("1"));
        assert!(by_id("2"));
    }

    #[tokio::test]
    async fn test_ranked_output_is_a_no_op_input() {
        let ranker = test_ranker(50);
        let resolver = MapResolver::new(&[("둔산로 133", 36.3505, 127.3846)]);
        let records = vec![
            restaurant("1", "둔산로 133", None),
            restaurant("2", "a", Some((36.3506, 127.3847))),
        ];

        let RankOutcome::Ranked(first) = ranker
            .rank(records, HERE, &FavoriteMap::new(), &resolver)
            .await
        else {
            panic!("Fresh batch must be ranked");
        };
        assert_eq!(resolver.call_count(), 1);

        let outcome = ranker
            .rank(
                first.restaurants.clone(),
                HERE,
                &FavoriteMap::new(),
                &resolver,
            )
            .await;
        match outcome {
            RankOutcome::AlreadyRanked(records) => {
                assert_eq!(records.len(), first.restaurants.len());
            }
            RankOutcome::Ranked(_) => panic!("Re-ranking a ranked batch must be a no-op"),
        }
        // And the resolver was not consulted again
        assert_eq!(resolver.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let ranker = test_ranker(50);
        let resolver = MapResolver::new(&[]);

        let RankOutcome::Ranked(result) = ranker
            .rank(vec![], HERE, &FavoriteMap::new(), &resolver)
            .await
        else {
            panic!("Empty batch still completes");
        };

        assert!(result.restaurants.is_empty());
        assert!(result.markers.is_empty());
    }

    #[test]
    fn test_collect_markers_skips_distance_less_records() {
        let mut with_distance = restaurant("1", "a", Some((36.3505, 127.3846)));
        with_distance.distance_m = Some(15.0);
        let without_distance = restaurant("2", "unknown address", None);

        let markers = collect_markers(&[with_distance, without_distance]);

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].restaurant_id, "1");
        assert_eq!(markers[0].distance_label, "15m");
    }

    #[test]
    fn test_merge_favorites_updates_win() {
        let stored = FavoriteMap::from([("1".to_string(), true), ("2".to_string(), true)]);
        let updates = FavoriteMap::from([("2".to_string(), false), ("3".to_string(), true)]);

        let merged = merge_favorites(&stored, &updates);

        assert_eq!(merged.get("1"), Some(&true));
        assert_eq!(merged.get("2"), Some(&false));
        assert_eq!(merged.get("3"), Some(&true));
    }

    #[test]
    fn test_rank_state_transitions() {
        let here = Coordinates::new(36.3504, 127.3845);
        let there = Coordinates::new(37.5665, 126.9780);

        let mut state = RankState::default();
        assert!(state.try_begin(here));
        // Duplicate start for the in-flight location is rejected
        assert!(!state.try_begin(here));
        assert!(state.complete(here));
        assert_eq!(state, RankState::Ranked { location: here });

        // Same location again: nothing new to do
        assert!(!state.try_begin(here));
        // Genuinely new location re-opens the pass
        assert!(state.try_begin(there));
        assert!(state.complete(there));
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let here = Coordinates::new(36.3504, 127.3845);
        let there = Coordinates::new(37.5665, 126.9780);

        let mut state = RankState::default();
        assert!(state.try_begin(here));
        // Fresh input supersedes the in-flight pass
        assert!(state.try_begin(there));
        // The superseded pass finishes later; its result must not apply
        assert!(!state.complete(here));
        assert!(state.complete(there));
    }
}
