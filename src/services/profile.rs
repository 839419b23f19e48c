use crate::core::merge_favorites;
use crate::models::{FavoriteMap, WeightProfile};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from the user profile store
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Per-user document held by the profile store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(default)]
    pub weights: Option<WeightProfile>,
    #[serde(default)]
    pub favorites: FavoriteMap,
}

/// Client for the per-user profile store (`GET`/`PUT /users/{uid}`)
///
/// A missing user (404) is an ordinary state: reads return defaults and
/// the first write creates the document.
pub struct ProfileStoreClient {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl ProfileStoreClient {
    pub fn new(endpoint: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint,
            api_key,
            client,
        }
    }

    fn user_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}",
            self.endpoint,
            urlencoding::encode(user_id)
        )
    }

    pub async fn get_document(&self, user_id: &str) -> Result<UserDocument, ProfileError> {
        let response = self
            .client
            .get(self.user_url(user_id))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(UserDocument::default());
        }

        if !response.status().is_success() {
            return Err(ProfileError::ApiError(format!(
                "Failed to fetch user document: {}",
                response.status()
            )));
        }

        response
            .json::<UserDocument>()
            .await
            .map_err(|e| ProfileError::InvalidResponse(e.to_string()))
    }

    async fn put_document(&self, user_id: &str, document: &UserDocument) -> Result<(), ProfileError> {
        let response = self
            .client
            .put(self.user_url(user_id))
            .header("X-Api-Key", &self.api_key)
            .json(document)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProfileError::ApiError(format!(
                "Failed to store user document: {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Load the user's weight profile; a new user gets `None`
    pub async fn get_weights(&self, user_id: &str) -> Result<Option<WeightProfile>, ProfileError> {
        Ok(self.get_document(user_id).await?.weights)
    }

    /// Persist updated weights without disturbing stored favorites
    pub async fn put_weights(
        &self,
        user_id: &str,
        weights: &WeightProfile,
    ) -> Result<(), ProfileError> {
        let mut document = self.get_document(user_id).await?;
        document.weights = Some(weights.clone());
        self.put_document(user_id, &document).await
    }

    pub async fn get_favorites(&self, user_id: &str) -> Result<FavoriteMap, ProfileError> {
        Ok(self.get_document(user_id).await?.favorites)
    }

    /// Flip one favorite flag via read-merge-write
    pub async fn set_favorite(
        &self,
        user_id: &str,
        restaurant_id: &str,
        favorite: bool,
    ) -> Result<FavoriteMap, ProfileError> {
        let mut document = self.get_document(user_id).await?;

        let mut update = FavoriteMap::new();
        update.insert(restaurant_id.to_string(), favorite);
        document.favorites = merge_favorites(&document.favorites, &update);

        self.put_document(user_id, &document).await?;
        Ok(document.favorites)
    }
}
