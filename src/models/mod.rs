// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Coordinates, FavoriteMap, FoodCatalog, Marker, MenuItem, Restaurant, WeightProfile,
    NEUTRAL_WEIGHT,
};
pub use requests::{
    FavoritesQuery, RankNearbyRequest, RateRequest, RecommendRequest, SortOrder,
    ToggleFavoriteRequest,
};
pub use responses::{
    ErrorResponse, FavoritesResponse, HealthResponse, RankNearbyResponse, RateResponse,
    RecommendResponse,
};
