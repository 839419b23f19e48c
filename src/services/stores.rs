use crate::models::Restaurant;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from the restaurant store API
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Client for the public store API that supplies raw restaurant records
pub struct StoreClient {
    endpoint: String,
    region_filter: Option<String>,
    client: Client,
}

impl StoreClient {
    pub fn new(endpoint: String, region_filter: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint,
            region_filter,
            client,
        }
    }

    /// Fetch the raw restaurant list
    ///
    /// The upstream has been observed to return either a bare array or
    /// an array wrapped under `results`/`data`/`stores`/`list`; all are
    /// accepted. Records that fail to map are skipped, not fatal.
    pub async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::ApiError(format!(
                "Failed to fetch stores: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let records = extract_record_list(&json)
            .ok_or_else(|| StoreError::InvalidResponse("No record array in response".into()))?;

        let total = records.len();
        let mapped: Vec<Restaurant> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.in_region(record))
            .map(|(index, record)| map_store_record(record, index))
            .collect();

        tracing::debug!("Fetched {} of {} store records", mapped.len(), total);

        Ok(mapped)
    }

    fn in_region(&self, record: &Value) -> bool {
        match &self.region_filter {
            Some(region) => string_field(record, "ADDR")
                .map(|addr| addr.contains(region.as_str()))
                .unwrap_or(false),
            None => true,
        }
    }
}

/// Accept the envelope shapes the upstream is known to use
fn extract_record_list(json: &Value) -> Option<&Vec<Value>> {
    if let Some(list) = json.as_array() {
        return Some(list);
    }
    for key in ["results", "data", "stores", "list"] {
        if let Some(list) = json.get(key).and_then(|v| v.as_array()) {
            return Some(list);
        }
    }
    None
}

/// Map one upstream store record to a [`Restaurant`]
///
/// Upstream field names: `REST_ID`, `REST_NM`, `ADDR`, `TOB_INFO`,
/// `LAT`/`LOT`, `TELNO`, `OPEN_HR_INFO`, `RPRS_MENU_NM`,
/// `MENU_KORN_NM`/`MENU_AMT`, `SD_URL`. A record with no id falls back
/// to its batch index.
pub fn map_store_record(record: &Value, index: usize) -> Restaurant {
    Restaurant {
        id: string_field(record, "REST_ID")
            .map(str::to_string)
            .or_else(|| record.get("REST_ID").and_then(|v| v.as_i64()).map(|v| v.to_string()))
            .unwrap_or_else(|| index.to_string()),
        name: string_field(record, "REST_NM")
            .unwrap_or("상호명 없음")
            .to_string(),
        address: string_field(record, "ADDR")
            .unwrap_or("주소 정보 없음")
            .to_string(),
        category: string_field(record, "TOB_INFO").unwrap_or("기타").to_string(),
        lat: numeric_field(record, "LAT"),
        lng: numeric_field(record, "LOT"),
        distance_m: None,
        is_favorite: false,
        phone: string_field(record, "TELNO").map(str::to_string),
        open_hours: string_field(record, "OPEN_HR_INFO").map(str::to_string),
        representative_menu: string_field(record, "RPRS_MENU_NM").map(str::to_string),
        menu_names: string_list_field(record, "MENU_KORN_NM"),
        menu_prices: string_list_field(record, "MENU_AMT"),
        map_url: string_field(record, "SD_URL").map(str::to_string),
    }
}

fn string_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// Coordinates arrive as either JSON numbers or numeric strings
fn numeric_field(record: &Value, key: &str) -> Option<f64> {
    match record.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list_field(record: &Value, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => vec![],
    }
}
