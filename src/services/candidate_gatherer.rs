//! Candidate gathering
//!
//! Collects the raw candidate pool for a prompt from the catalog collaborators:
//! 1. Build search queries from the intent (genre with decade filter, moods,
//!    listening contexts, or the prompt itself)
//! 2. Run the searches concurrently
//! 3. Resolve comparison artists (config cache first) and add their top tracks
//! 4. Drop repeated ids and attach audio features in batches
//!
//! Collaborator failures degrade the pool rather than failing the run, unless
//! nothing at all could be fetched.

use crate::error::{CurationError, CurationNotice, ProviderError, Result};
use crate::models::{Intent, Track};
use crate::services::providers::{
    ArtistCatalogProvider, AudioFeatureProvider, ConfigStore, TrackSearchProvider,
};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_GENRE_QUERIES: usize = 3;
const MAX_MOOD_QUERIES: usize = 2;

/// Search phrases for listening contexts that make poor raw queries.
const CONTEXT_QUERIES: &[(&str, &str)] = &[
    ("workout", "workout energy"),
    ("focus", "focus instrumental"),
    ("sleep", "sleep ambient"),
    ("party", "party dance hits"),
    ("road trip", "road trip classics"),
    ("dinner", "dinner jazz"),
    ("coffee shop", "acoustic chill"),
    ("morning", "morning feel good"),
];

#[derive(Debug, Clone, Default)]
pub struct GatheredCandidates {
    pub tracks: Vec<Track>,
    pub notices: Vec<CurationNotice>,
}

pub struct CandidateGatherer {
    search: Arc<dyn TrackSearchProvider>,
    artists: Arc<dyn ArtistCatalogProvider>,
    features: Arc<dyn AudioFeatureProvider>,
    config: Arc<dyn ConfigStore>,
    search_limit: usize,
}

impl CandidateGatherer {
    pub fn new(
        search: Arc<dyn TrackSearchProvider>,
        artists: Arc<dyn ArtistCatalogProvider>,
        features: Arc<dyn AudioFeatureProvider>,
        config: Arc<dyn ConfigStore>,
        search_limit: usize,
    ) -> Self {
        Self {
            search,
            artists,
            features,
            config,
            search_limit,
        }
    }

    /// Catalog queries for an intent. Never empty: falls back to the prompt.
    pub fn build_queries(intent: &Intent, prompt: &str) -> Vec<String> {
        let mut queries = Vec::new();

        let year_filter = intent.decades.iter().next().and_then(|decade| {
            let start: u32 = decade.get(..4)?.parse().ok()?;
            Some(format!(" year:{}-{}", start, start + 9))
        });

        for genre in intent.genres.iter().take(MAX_GENRE_QUERIES) {
            queries.push(format!(
                "genre:{}{}",
                genre,
                year_filter.as_deref().unwrap_or_default()
            ));
        }

        for mood in intent.moods.iter().take(MAX_MOOD_QUERIES) {
            let query = CONTEXT_QUERIES
                .iter()
                .find(|(context, _)| *context == mood.name)
                .map(|(_, query)| query.to_string())
                .unwrap_or_else(|| mood.name.clone());
            if !queries.contains(&query) {
                queries.push(query);
            }
        }

        if queries.is_empty() {
            let trimmed = prompt.trim();
            if !trimmed.is_empty() {
                queries.push(trimmed.to_string());
            }
        }

        queries
    }

    pub async fn gather(&self, intent: &Intent, prompt: &str) -> Result<GatheredCandidates> {
        let mut gathered = GatheredCandidates::default();
        let queries = Self::build_queries(intent, prompt);
        info!("Gathering candidates with {} queries", queries.len());

        // Step 1: searches, concurrently
        let results = join_all(
            queries
                .iter()
                .map(|query| self.search.search(query, self.search_limit)),
        )
        .await;

        let mut pool: Vec<Track> = Vec::new();
        let mut first_error: Option<ProviderError> = None;
        let mut failed = 0;
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(tracks) => {
                    debug!("Query '{}' returned {} tracks", query, tracks.len());
                    pool.extend(tracks);
                }
                Err(e) => {
                    warn!("Search '{}' failed: {}", query, e);
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        // Step 2: comparison artists
        for name in &intent.comparisons {
            match self.artist_top_tracks(name).await {
                Ok(tracks) => {
                    debug!("Added {} top tracks for '{}'", tracks.len(), name);
                    pool.extend(tracks);
                }
                Err(e) => {
                    warn!("Could not resolve artist '{}': {}", name, e);
                    gathered.notices.push(CurationNotice::ArtistUnresolved { name: name.clone() });
                }
            }
        }

        if pool.is_empty() && failed > 0 && failed == queries.len() {
            if let Some(e) = first_error {
                return Err(CurationError::Provider(e));
            }
        }

        // Step 3: unique ids, first occurrence wins
        let mut seen = HashSet::new();
        pool.retain(|track| seen.insert(track.id.clone()));

        // Step 4: audio features
        self.attach_features(&mut pool).await;

        info!("Gathered {} unique candidates", pool.len());
        gathered.tracks = pool;
        Ok(gathered)
    }

    async fn artist_top_tracks(&self, name: &str) -> std::result::Result<Vec<Track>, ProviderError> {
        let artist_id = match self.config.cached_artist_id(name) {
            Some(id) => id,
            None => self.artists.resolve_artist_id(name).await?,
        };
        self.artists.top_tracks(&artist_id).await
    }

    async fn attach_features(&self, pool: &mut [Track]) {
        let wanted: Vec<String> = pool
            .iter()
            .filter(|t| t.features.is_none())
            .map(|t| t.id.clone())
            .collect();
        if wanted.is_empty() {
            return;
        }

        let batch_size = self.features.max_batch().max(1);
        let mut found = std::collections::HashMap::new();
        for batch in wanted.chunks(batch_size) {
            match self.features.features(batch).await {
                Ok(features) => found.extend(features),
                Err(ProviderError::PermissionDenied) => {
                    warn!("Audio features access denied, continuing without them");
                    break;
                }
                Err(e) => warn!("Audio feature batch of {} failed: {}", batch.len(), e),
            }
        }

        for track in pool.iter_mut() {
            if track.features.is_none() {
                track.features = found.get(&track.id).copied();
            }
        }
        debug!("Attached audio features to {} of {} tracks", found.len(), wanted.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioFeatures, EmotionClass, MoodEntry};
    use crate::services::providers::{ProviderResult, StaticConfigStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeSearch {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl TrackSearchProvider for FakeSearch {
        async fn search(&self, query: &str, _limit: usize) -> ProviderResult<Vec<Track>> {
            self.calls.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(ProviderError::Unavailable("offline".to_string()));
            }
            Ok(vec![
                Track::new("shared", "Shared Hit", vec!["X".into()], 200_000, 80),
                Track::new(format!("{}-1", query), "Song", vec!["Y".into()], 200_000, 40),
            ])
        }
    }

    struct FakeArtists;

    #[async_trait]
    impl ArtistCatalogProvider for FakeArtists {
        async fn resolve_artist_id(&self, name: &str) -> ProviderResult<String> {
            match name {
                "Leftfield" => Ok("leftfield-id".to_string()),
                _ => Err(ProviderError::NotFound(name.to_string())),
            }
        }

        async fn top_tracks(&self, artist_id: &str) -> ProviderResult<Vec<Track>> {
            Ok(vec![Track::new(
                format!("{}-top", artist_id),
                "Top",
                vec![artist_id.to_string()],
                300_000,
                70,
            )])
        }
    }

    struct FakeFeatures {
        deny: bool,
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl AudioFeatureProvider for FakeFeatures {
        async fn features(&self, track_ids: &[String]) -> ProviderResult<HashMap<String, AudioFeatures>> {
            self.batches.lock().unwrap().push(track_ids.len());
            if self.deny {
                return Err(ProviderError::PermissionDenied);
            }
            Ok(track_ids
                .iter()
                .map(|id| {
                    (
                        id.clone(),
                        AudioFeatures {
                            energy: 0.5,
                            valence: 0.5,
                            tempo: 120.0,
                            danceability: 0.5,
                        },
                    )
                })
                .collect())
        }

        fn max_batch(&self) -> usize {
            2
        }
    }

    fn gatherer(fail_search: bool, deny_features: bool) -> (CandidateGatherer, Arc<FakeFeatures>) {
        let features = Arc::new(FakeFeatures {
            deny: deny_features,
            batches: Mutex::new(Vec::new()),
        });
        let config = StaticConfigStore::default().with_artist_id("Massive Attack", "ma-id");
        let gatherer = CandidateGatherer::new(
            Arc::new(FakeSearch {
                calls: Mutex::new(Vec::new()),
                fail: fail_search,
            }),
            Arc::new(FakeArtists),
            features.clone(),
            Arc::new(config),
            50,
        );
        (gatherer, features)
    }

    fn mood(name: &str) -> MoodEntry {
        MoodEntry {
            name: name.to_string(),
            class: EmotionClass::Positive,
            intensity: None,
            target_valence: 0.5,
            target_energy: 0.5,
            tempo: None,
            danceability: None,
        }
    }

    #[test]
    fn test_build_queries() {
        let mut intent = Intent::default();
        intent.genres.insert("funk".to_string());
        intent.genres.insert("electronic".to_string());
        intent.decades.insert("1990s".to_string());
        intent.moods.push(mood("workout"));
        intent.moods.push(mood("happy"));

        let queries = CandidateGatherer::build_queries(&intent, "ignored");
        assert_eq!(
            queries,
            vec![
                "genre:electronic year:1990-1999",
                "genre:funk year:1990-1999",
                "workout energy",
                "happy",
            ]
        );
    }

    #[test]
    fn test_build_queries_falls_back_to_prompt() {
        let queries = CandidateGatherer::build_queries(&Intent::default(), "  asdf qwerty ");
        assert_eq!(queries, vec!["asdf qwerty"]);
    }

    #[tokio::test]
    async fn test_gather_dedupes_and_attaches_features() {
        let (gatherer, features) = gatherer(false, false);
        let mut intent = Intent::default();
        intent.genres.insert("funk".to_string());
        intent.moods.push(mood("happy"));
        intent.comparisons.insert("Massive Attack".to_string());
        intent.comparisons.insert("Leftfield".to_string());
        intent.comparisons.insert("Nobody Special".to_string());

        let gathered = gatherer.gather(&intent, "prompt").await.unwrap();

        let ids: Vec<&str> = gathered.tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["shared", "genre:funk-1", "happy-1", "leftfield-id-top", "ma-id-top"]
        );
        assert!(gathered.tracks.iter().all(|t| t.features.is_some()));
        assert_eq!(*features.batches.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(
            gathered.notices,
            vec![CurationNotice::ArtistUnresolved {
                name: "Nobody Special".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_permission_denied_leaves_features_absent() {
        let (gatherer, features) = gatherer(false, true);
        let mut intent = Intent::default();
        intent.genres.insert("jazz".to_string());

        let gathered = gatherer.gather(&intent, "jazz").await.unwrap();

        assert_eq!(gathered.tracks.len(), 2);
        assert!(gathered.tracks.iter().all(|t| t.features.is_none()));
        assert_eq!(features.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_total_search_failure_is_an_error() {
        let (gatherer, _) = gatherer(true, false);
        let result = gatherer.gather(&Intent::default(), "anything").await;
        assert!(matches!(
            result,
            Err(CurationError::Provider(ProviderError::Unavailable(_)))
        ));
    }
}
