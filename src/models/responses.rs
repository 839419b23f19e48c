use crate::models::domain::{FavoriteMap, Marker, MenuItem, Restaurant, WeightProfile};
use serde::{Deserialize, Serialize};

/// Response for the rank-nearby endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankNearbyResponse {
    pub restaurants: Vec<Restaurant>,
    pub markers: Vec<Marker>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
    /// Records skipped because their address could not be resolved
    #[serde(rename = "unresolvedCount")]
    pub unresolved_count: usize,
}

/// Response for the recommend endpoint
///
/// `found: false` means nothing matched the filters; it is a normal
/// outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub found: bool,
    pub item: Option<MenuItem>,
}

/// Response for the rate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateResponse {
    pub profile: WeightProfile,
    /// False when the profile store write failed; the updated profile is
    /// still returned so the caller can retry persistence
    pub persisted: bool,
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Response for the favorites endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub favorites: FavoriteMap,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
