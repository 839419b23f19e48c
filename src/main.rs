use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use matzip_algo::config::Settings;
use matzip_algo::core::{ProximityRanker, RecommendationSampler, WeightLearner};
use matzip_algo::models::{Coordinates, FoodCatalog};
use matzip_algo::routes::{self, AppState, RankSession};
use matzip_algo::services::{
    CachedResolver, GeocodeCache, GeocodeClient, ProfileStoreClient, StoreClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Load the menu catalog from disk; a missing file leaves the
/// recommendation endpoints answering `found: false` rather than
/// failing startup
fn load_catalog(path: &str) -> FoodCatalog {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<FoodCatalog>(&raw) {
            Ok(catalog) => {
                info!("Loaded {} menu items from {}", catalog.menus.len(), path);
                catalog
            }
            Err(e) => {
                warn!("Failed to parse menu catalog {}: {}", path, e);
                FoodCatalog::default()
            }
        },
        Err(e) => {
            warn!("Failed to read menu catalog {}: {}", path, e);
            FoodCatalog::default()
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Matzip Algo recommendation service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize upstream clients
    let stores = Arc::new(StoreClient::new(
        settings.stores.endpoint,
        settings.stores.region_filter,
    ));

    let geocode_client = GeocodeClient::new(
        settings.geocoding.endpoint,
        settings.geocoding.client_id,
        settings.geocoding.client_secret,
    );
    let geocode_cache = GeocodeCache::new(
        settings.geocoding.cache_size,
        settings.geocoding.cache_ttl_secs,
    );
    let geocode = Arc::new(CachedResolver::new(geocode_client, geocode_cache));

    info!(
        "Geocode client initialized (cache: {} entries, TTL: {}s)",
        settings.geocoding.cache_size, settings.geocoding.cache_ttl_secs
    );

    let profiles = Arc::new(ProfileStoreClient::new(
        settings.profile_store.endpoint,
        settings.profile_store.api_key,
    ));

    // Initialize the ranking and recommendation pipeline
    let ranker = ProximityRanker::new(
        settings.ranking.limit as usize,
        Duration::from_millis(settings.geocoding.delay_ms),
    );
    let catalog = Arc::new(load_catalog(&settings.catalog.path));
    let fallback_location = Coordinates {
        lat: settings.ranking.fallback_lat,
        lng: settings.ranking.fallback_lng,
    };

    info!(
        "Ranker initialized (limit: {}, geocode delay: {}ms)",
        settings.ranking.limit, settings.geocoding.delay_ms
    );

    // Build application state
    let app_state = AppState {
        stores,
        geocode,
        profiles,
        ranker,
        sampler: RecommendationSampler::new(),
        learner: WeightLearner::default(),
        catalog,
        rank_session: Arc::new(Mutex::new(RankSession::default())),
        fallback_location,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
