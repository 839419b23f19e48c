use crate::models::domain::{Coordinates, MenuItem};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Presentation order for the ranked list
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Distance,
    Name,
}

/// Request to rank nearby restaurants
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RankNearbyRequest {
    /// Optional authenticated user; favorites are merged in when present
    #[serde(alias = "user_id", rename = "userId", default)]
    pub user_id: Option<String>,
    /// Device-reported location; the configured fallback is used when absent
    #[serde(default)]
    pub location: Option<Coordinates>,
    #[serde(default = "default_limit")]
    pub limit: u16,
    /// Distance order by default; name order re-sorts the final list only
    #[serde(default)]
    pub sort: SortOrder,
}

fn default_limit() -> u16 {
    50
}

/// Request for a menu recommendation
///
/// Each facet filter is optional and independent; the ones that are set
/// are ANDed together.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendRequest {
    #[serde(alias = "user_id", rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Request to rate a delivered recommendation (1-10)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    pub item: MenuItem,
    #[validate(range(min = 1, max = 10))]
    pub rating: u8,
}

/// Query parameters for listing a user's favorites
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FavoritesQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Request to set or clear a favorite flag
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ToggleFavoriteRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "restaurant_id", rename = "restaurantId")]
    pub restaurant_id: String,
    pub favorite: bool,
}
