//! Catalog collaborator seams
//!
//! The curation core never talks to the catalog service directly. Candidate
//! tracks, artist catalogues and audio features come through these traits,
//! and persisted defaults plus the artist-id cache through [`ConfigStore`].

use crate::error::ProviderError;
use crate::models::{AudioFeatures, Track};
use async_trait::async_trait;
use std::collections::HashMap;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Free-text / field-filtered track search.
#[async_trait]
pub trait TrackSearchProvider: Send + Sync {
    /// Search the catalog. Queries may carry `genre:` and `year:` filters.
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<Track>>;
}

#[async_trait]
pub trait ArtistCatalogProvider: Send + Sync {
    /// Catalog id for an artist name; `ProviderError::NotFound` when unknown.
    async fn resolve_artist_id(&self, name: &str) -> ProviderResult<String>;

    async fn top_tracks(&self, artist_id: &str) -> ProviderResult<Vec<Track>>;
}

#[async_trait]
pub trait AudioFeatureProvider: Send + Sync {
    /// Features for up to [`AudioFeatureProvider::max_batch`] ids. Ids the
    /// catalog has no analysis for are simply absent from the map.
    async fn features(&self, track_ids: &[String]) -> ProviderResult<HashMap<String, AudioFeatures>>;

    fn max_batch(&self) -> usize {
        100
    }
}

/// Read-only view of persisted configuration.
pub trait ConfigStore: Send + Sync {
    fn get_default(&self, key: &str) -> Option<String>;

    /// Previously resolved catalog id for an artist name (case-insensitive).
    fn cached_artist_id(&self, name: &str) -> Option<String>;
}

/// Fixed key/value store, handy for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigStore {
    pub defaults: HashMap<String, String>,
    pub artist_ids: HashMap<String, String>,
}

impl StaticConfigStore {
    pub fn with_default(mut self, key: &str, value: &str) -> Self {
        self.defaults.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_artist_id(mut self, name: &str, id: &str) -> Self {
        self.artist_ids.insert(name.trim().to_lowercase(), id.to_string());
        self
    }
}

impl ConfigStore for StaticConfigStore {
    fn get_default(&self, key: &str) -> Option<String> {
        self.defaults.get(key).cloned()
    }

    fn cached_artist_id(&self, name: &str) -> Option<String> {
        self.artist_ids.get(&name.trim().to_lowercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_store_lookups() {
        let store = StaticConfigStore::default()
            .with_default("default_arc", "build")
            .with_artist_id("Massive Attack", "6FXMGgJwohJLUSr5nVlf9X");

        assert_eq!(store.get_default("default_arc").as_deref(), Some("build"));
        assert_eq!(store.get_default("missing"), None);
        assert_eq!(
            store.cached_artist_id("  massive ATTACK ").as_deref(),
            Some("6FXMGgJwohJLUSr5nVlf9X")
        );
    }
}
