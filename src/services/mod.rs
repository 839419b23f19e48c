pub mod cache;
pub mod geocode;
pub mod profile;
pub mod stores;

pub use cache::{CachedResolver, GeocodeCache};
pub use geocode::{GeocodeClient, GeocodeError};
pub use profile::{ProfileError, ProfileStoreClient, UserDocument};
pub use stores::{StoreClient, StoreError};
