use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Default (neutral) weight for a facet key that has never been rated
pub const NEUTRAL_WEIGHT: f64 = 1.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Restaurant record as surfaced to the ranking pipeline
///
/// Created from the external store API; coordinates and distance are
/// filled in by the ranking pass, the favorite flag is merged in from
/// the per-user favorite map and survives re-fetches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: String,
    pub category: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    /// Distance from the user's location in meters, once computed
    #[serde(rename = "distanceM", default)]
    pub distance_m: Option<f64>,
    #[serde(rename = "isFavorite", default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "openHours", default)]
    pub open_hours: Option<String>,
    #[serde(rename = "representativeMenu", default)]
    pub representative_menu: Option<String>,
    #[serde(rename = "menuNames", default)]
    pub menu_names: Vec<String>,
    #[serde(rename = "menuPrices", default)]
    pub menu_prices: Vec<String>,
    #[serde(rename = "mapUrl", default)]
    pub map_url: Option<String>,
}

impl Restaurant {
    /// Coordinates, if both components are known
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }
}

/// Map marker emitted alongside the ranked list, one per record with
/// known coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub address: String,
    /// Distance from the user's location in meters
    pub distance: f64,
    /// Human-readable distance ("740m", "1.2km")
    #[serde(rename = "distanceLabel")]
    pub distance_label: String,
    #[serde(rename = "restaurantId")]
    pub restaurant_id: String,
}

/// A menu item classified along the three independent facets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub cuisine: String,
    pub group: String,
    pub category: String,
}

/// Reference menu catalog, loaded once per session
///
/// Matches the shape of the generated `food_data.json`: a flat menu list
/// plus the distinct cuisine types and a food-group → food-categories map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodCatalog {
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(rename = "cuisineTypes", alias = "cuisine_types", default)]
    pub cuisine_types: Vec<String>,
    #[serde(default)]
    pub menus: Vec<MenuItem>,
}

impl FoodCatalog {
    /// Rebuild the group/category/cuisine aggregates from a flat menu list
    pub fn from_menus(menus: Vec<MenuItem>) -> Self {
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut cuisine_types: Vec<String> = Vec::new();

        for menu in &menus {
            let entries = categories.entry(menu.group.clone()).or_default();
            if !entries.contains(&menu.category) {
                entries.push(menu.category.clone());
            }
            if !menu.cuisine.is_empty() && !cuisine_types.contains(&menu.cuisine) {
                cuisine_types.push(menu.cuisine.clone());
            }
        }

        Self {
            categories,
            cuisine_types,
            menus,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}

/// Per-user multiplicative scoring weights over the three menu facets
///
/// Every weight lies in `[MIN_WEIGHT, MAX_WEIGHT]`; keys that were never
/// rated are absent and read as 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    #[serde(default)]
    pub cuisine: HashMap<String, f64>,
    #[serde(rename = "foodGroup", alias = "food_group", default)]
    pub food_group: HashMap<String, f64>,
    #[serde(rename = "foodCategory", alias = "food_category", default)]
    pub food_category: HashMap<String, f64>,
}

impl WeightProfile {
    /// Fresh profile with every facet key the catalog knows set to 1.0
    pub fn initialize(catalog: &FoodCatalog) -> Self {
        let mut profile = Self::default();
        for menu in &catalog.menus {
            profile
                .cuisine
                .entry(menu.cuisine.clone())
                .or_insert(NEUTRAL_WEIGHT);
            profile
                .food_group
                .entry(menu.group.clone())
                .or_insert(NEUTRAL_WEIGHT);
            profile
                .food_category
                .entry(menu.category.clone())
                .or_insert(NEUTRAL_WEIGHT);
        }
        profile
    }

    pub fn cuisine_weight(&self, key: &str) -> f64 {
        self.cuisine.get(key).copied().unwrap_or(NEUTRAL_WEIGHT)
    }

    pub fn group_weight(&self, key: &str) -> f64 {
        self.food_group.get(key).copied().unwrap_or(NEUTRAL_WEIGHT)
    }

    pub fn category_weight(&self, key: &str) -> f64 {
        self.food_category.get(key).copied().unwrap_or(NEUTRAL_WEIGHT)
    }

    /// Composite sampling score for a menu item: the product of its
    /// three facet weights
    pub fn composite_score(&self, item: &MenuItem) -> f64 {
        self.cuisine_weight(&item.cuisine)
            * self.group_weight(&item.group)
            * self.category_weight(&item.category)
    }
}

/// Per-user favorite flags, keyed by restaurant id
pub type FavoriteMap = HashMap<String, bool>;
