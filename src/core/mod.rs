// Core algorithm exports
pub mod distance;
pub mod learner;
pub mod ranker;
pub mod sampler;

pub use distance::{format_distance, haversine_distance};
pub use learner::{WeightLearner, LEARNING_RATE, MAX_WEIGHT, MIN_WEIGHT};
pub use ranker::{
    collect_markers, merge_favorites, GeocodeResolver, ProximityRanker, RankOutcome, RankResult,
    RankState,
};
pub use sampler::{MenuFilter, Recommendation, RecommendationSampler};
