//! Matzip Algo - Restaurant ranking and adaptive menu recommendation service
//!
//! This library ranks restaurant candidates by distance from a reference
//! location (resolving missing coordinates through a rate-limited geocoder)
//! and draws weighted-random menu recommendations from per-user taste
//! profiles that learn from 1-10 ratings.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    collect_markers, haversine_distance, merge_favorites, MenuFilter, ProximityRanker,
    RankOutcome, RankState, Recommendation, RecommendationSampler, WeightLearner,
};
pub use crate::models::{
    Coordinates, FoodCatalog, MenuItem, RankNearbyRequest, RankNearbyResponse, RecommendRequest,
    RecommendResponse, Restaurant, WeightProfile,
};
