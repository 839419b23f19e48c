use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{
    collect_markers, MenuFilter, ProximityRanker, RankOutcome, RankState, Recommendation,
    RecommendationSampler, WeightLearner,
};
use crate::models::{
    Coordinates, ErrorResponse, FavoriteMap, FavoritesQuery, FavoritesResponse, FoodCatalog,
    HealthResponse, RankNearbyRequest, RankNearbyResponse, RateRequest, RateResponse,
    RecommendRequest, RecommendResponse, Restaurant, SortOrder, ToggleFavoriteRequest,
    WeightProfile,
};
use crate::services::{CachedResolver, GeocodeClient, ProfileStoreClient, StoreClient};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Ranking pass lifecycle together with the last completed result.
///
/// Keeping the two under one lock lets a suppressed re-rank answer from
/// the cached pass instead of running the geocode loop again.
#[derive(Debug, Default)]
pub struct RankSession {
    pub state: RankState,
    pub last: Option<(Coordinates, RankNearbyResponse)>,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<StoreClient>,
    pub geocode: Arc<CachedResolver<GeocodeClient>>,
    pub profiles: Arc<ProfileStoreClient>,
    pub ranker: ProximityRanker,
    pub sampler: RecommendationSampler,
    pub learner: WeightLearner,
    pub catalog: Arc<FoodCatalog>,
    pub rank_session: Arc<Mutex<RankSession>>,
    pub fallback_location: Coordinates,
}

/// Configure all recommendation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/nearby/rank", web::post().to(rank_nearby))
        .route("/recommend", web::post().to(recommend))
        .route("/recommend/rate", web::post().to(rate))
        .route("/favorites", web::get().to(get_favorites))
        .route("/favorites/toggle", web::post().to(toggle_favorite));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.catalog.is_empty() {
        "degraded"
    } else {
        "healthy"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Re-stamp favorite flags from the requesting user's stored map
fn apply_favorites(restaurants: &mut [Restaurant], favorites: &FavoriteMap) {
    for restaurant in restaurants.iter_mut() {
        restaurant.is_favorite = favorites.get(&restaurant.id).copied().unwrap_or(false);
    }
}

/// Rank nearby restaurants endpoint
///
/// POST /api/v1/nearby/rank
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "location": { "lat": 36.35, "lng": 127.38 },
///   "limit": 50
/// }
/// ```
///
/// A repeat request for an already-ranked location is served from the
/// cached pass; a request racing a pass for the same location gets 409.
async fn rank_nearby(
    state: web::Data<AppState>,
    req: web::Json<RankNearbyRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let location = req.location.unwrap_or(state.fallback_location);

    // Favorites are cosmetic for ranking; a profile store outage must not
    // block the list
    let favorites: FavoriteMap = match &req.user_id {
        Some(user_id) => match state.profiles.get_favorites(user_id).await {
            Ok(favorites) => favorites,
            Err(e) => {
                tracing::warn!("Failed to fetch favorites for {}: {}", user_id, e);
                FavoriteMap::new()
            }
        },
        None => FavoriteMap::new(),
    };

    {
        let mut session = state.rank_session.lock().await;
        if !session.state.try_begin(location) {
            if let Some((ranked_at, cached)) = &session.last {
                if *ranked_at == location {
                    tracing::info!(
                        "Serving cached ranking for ({}, {})",
                        location.lat,
                        location.lng
                    );
                    let mut response = cached.clone();
                    apply_favorites(&mut response.restaurants, &favorites);
                    if req.sort == SortOrder::Name {
                        response.restaurants.sort_by(|a, b| a.name.cmp(&b.name));
                    }
                    return HttpResponse::Ok().json(response);
                }
            }
            return HttpResponse::Conflict().json(ErrorResponse {
                error: "Ranking in progress".to_string(),
                message: "A ranking pass for this location is already running".to_string(),
                status_code: 409,
            });
        }
    }

    tracing::info!(
        "Ranking restaurants around ({}, {}) for user {:?}",
        location.lat,
        location.lng,
        req.user_id
    );

    let snapshot = match state.stores.fetch_restaurants().await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Failed to fetch store records: {}", e);
            let mut session = state.rank_session.lock().await;
            session.state.reset();
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch restaurants".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let total_candidates = snapshot.len();

    // Cap limit at 100 to bound the geocode loop
    let limit = req.limit.clamp(1, 100) as usize;

    let outcome = state
        .ranker
        .with_limit(limit)
        .rank(snapshot, location, &favorites, state.geocode.as_ref())
        .await;

    let response = match outcome {
        RankOutcome::Ranked(result) => RankNearbyResponse {
            restaurants: result.restaurants,
            markers: result.markers,
            total_candidates,
            unresolved_count: result.unresolved,
        },
        RankOutcome::AlreadyRanked(restaurants) => {
            let unresolved_count = restaurants
                .iter()
                .filter(|r| r.distance_m.is_none())
                .count();
            RankNearbyResponse {
                markers: collect_markers(&restaurants),
                restaurants,
                total_candidates,
                unresolved_count,
            }
        }
    };

    {
        let mut session = state.rank_session.lock().await;
        if !session.state.complete(location) {
            tracing::info!(
                "Discarding superseded ranking pass for ({}, {})",
                location.lat,
                location.lng
            );
            return HttpResponse::Conflict().json(ErrorResponse {
                error: "Ranking superseded".to_string(),
                message: "A newer ranking pass replaced this one".to_string(),
                status_code: 409,
            });
        }
        session.last = Some((location, response.clone()));
    }

    let mut response = response;

    // Name order is presentation-only, applied after the distance pass
    if req.sort == SortOrder::Name {
        response.restaurants.sort_by(|a, b| a.name.cmp(&b.name));
    }

    tracing::info!(
        "Returning {} ranked restaurants (from {} candidates, {} unresolved)",
        response.restaurants.len(),
        total_candidates,
        response.unresolved_count
    );

    HttpResponse::Ok().json(response)
}

/// Menu recommendation endpoint
///
/// POST /api/v1/recommend
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "cuisine": "한식",
///   "group": "면류",
///   "category": "국물"
/// }
/// ```
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    // Anonymous callers get an unweighted draw
    let profile = match &req.user_id {
        Some(user_id) => match state.profiles.get_weights(user_id).await {
            Ok(weights) => weights,
            Err(e) => {
                tracing::warn!("Failed to fetch weights for {}, drawing unweighted: {}", user_id, e);
                None
            }
        },
        None => None,
    };

    let filter = MenuFilter {
        cuisine: req.cuisine.clone(),
        group: req.group.clone(),
        category: req.category.clone(),
    };

    let pick = state.sampler.recommend(
        &state.catalog,
        &filter,
        profile.as_ref(),
        &mut rand::thread_rng(),
    );

    let response = match pick {
        Recommendation::Pick(item) => {
            tracing::debug!("Recommending {} for user {:?}", item.name, req.user_id);
            RecommendResponse {
                found: true,
                item: Some(item),
            }
        }
        Recommendation::NoMatch => RecommendResponse {
            found: false,
            item: None,
        },
    };

    HttpResponse::Ok().json(response)
}

/// Rate a recommendation endpoint
///
/// POST /api/v1/recommend/rate
///
/// Applies the rating to the user's weight profile and persists it.
/// A failed persist still returns the updated profile with
/// `persisted: false` so the client can retry.
async fn rate(state: web::Data<AppState>, req: web::Json<RateRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let stored = match state.profiles.get_weights(&req.user_id).await {
        Ok(weights) => weights,
        Err(e) => {
            tracing::warn!("Failed to fetch weights for {}, starting fresh: {}", req.user_id, e);
            None
        }
    };
    let profile = stored.unwrap_or_else(|| WeightProfile::initialize(&state.catalog));

    let updated = state.learner.update(&profile, &req.item, req.rating);

    let (persisted, notice) = match state.profiles.put_weights(&req.user_id, &updated).await {
        Ok(()) => (true, None),
        Err(e) => {
            tracing::warn!("Failed to persist weights for {}: {}", req.user_id, e);
            (false, Some("Profile update was not saved".to_string()))
        }
    };

    tracing::info!(
        "Applied rating {} on {} for user {} (persisted: {})",
        req.rating,
        req.item.name,
        req.user_id,
        persisted
    );

    HttpResponse::Ok().json(RateResponse {
        profile: updated,
        persisted,
        event_id: uuid::Uuid::new_v4().to_string(),
        notice,
    })
}

/// Get favorites for a user
///
/// GET /api/v1/favorites?userId={userId}
async fn get_favorites(
    state: web::Data<AppState>,
    query: web::Query<FavoritesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match state.profiles.get_favorites(&query.user_id).await {
        Ok(favorites) => HttpResponse::Ok().json(FavoritesResponse {
            user_id: query.user_id.clone(),
            count: favorites.len(),
            favorites,
        }),
        Err(e) => {
            tracing::error!("Failed to fetch favorites for {}: {}", query.user_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch favorites".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Toggle a favorite flag
///
/// POST /api/v1/favorites/toggle
async fn toggle_favorite(
    state: web::Data<AppState>,
    req: web::Json<ToggleFavoriteRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match state
        .profiles
        .set_favorite(&req.user_id, &req.restaurant_id, req.favorite)
        .await
    {
        Ok(favorites) => {
            tracing::debug!(
                "Set favorite {}={} for user {}",
                req.restaurant_id,
                req.favorite,
                req.user_id
            );
            HttpResponse::Ok().json(FavoritesResponse {
                user_id: req.user_id.clone(),
                count: favorites.len(),
                favorites,
            })
        }
        Err(e) => {
            tracing::error!("Failed to toggle favorite for {}: {}", req.user_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to update favorite".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
