use crate::error::{CurationError, Result};
use crate::models::ArcType;
use crate::services::curator::{ScoringWeights, TierSplit};
use crate::services::deduplicator::VersionPenalties;
use crate::services::normalizer::NormalizerRules;
use crate::services::providers::ConfigStore;
use crate::services::sequencer::ArcTrajectories;
use crate::services::vocabulary::AnalyzerVocabulary;
use std::collections::HashMap;
use std::env;

pub const DEFAULT_ARC_KEY: &str = "default_arc";
pub const TARGET_COUNT_KEY: &str = "target_count";
pub const CREATIVITY_KEY: &str = "creativity";
pub const MAX_TRACKS_PER_ARTIST_KEY: &str = "max_tracks_per_artist";
pub const SEARCH_LIMIT_KEY: &str = "search_limit";

#[derive(Debug, Clone)]
pub struct Config {
    /// Arc used when neither the caller nor the prompt picks one
    pub default_arc: ArcType,
    pub target_count: usize,
    pub creativity: f64,
    pub max_tracks_per_artist: usize,
    /// Results requested per catalog search
    pub search_limit: usize,
    /// Resolved artist ids keyed by lowercased artist name
    pub artist_ids: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_arc: ArcType::Journey,
            target_count: 25,
            creativity: 0.4,
            max_tracks_per_artist: 3,
            search_limit: 50,
            artist_ids: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> std::result::Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any variable source; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let default_arc = match lookup("CURATOR_DEFAULT_ARC") {
            Some(value) => value
                .parse::<ArcType>()
                .map_err(|e| anyhow::anyhow!("CURATOR_DEFAULT_ARC: {}", e))?,
            None => defaults.default_arc,
        };

        let creativity = parse_or(&lookup, "CURATOR_CREATIVITY", defaults.creativity)?;
        if !(0.0..=1.0).contains(&creativity) {
            return Err(anyhow::anyhow!(
                "CURATOR_CREATIVITY must be within [0, 1], got {}",
                creativity
            ));
        }

        let target_count = parse_or(&lookup, "CURATOR_TARGET_COUNT", defaults.target_count)?;
        if target_count == 0 {
            return Err(anyhow::anyhow!("CURATOR_TARGET_COUNT must be positive"));
        }

        // Artist id cache, as a JSON object of name -> catalog id
        let artist_ids = match lookup("CURATOR_ARTIST_IDS") {
            Some(raw) if !raw.trim().is_empty() => {
                let parsed: HashMap<String, String> = serde_json::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("CURATOR_ARTIST_IDS is not a JSON object: {}", e))?;
                parsed
                    .into_iter()
                    .map(|(name, id)| (name.trim().to_lowercase(), id))
                    .collect()
            }
            _ => HashMap::new(),
        };

        Ok(Config {
            default_arc,
            target_count,
            creativity,
            max_tracks_per_artist: parse_or(
                &lookup,
                "CURATOR_MAX_TRACKS_PER_ARTIST",
                defaults.max_tracks_per_artist,
            )?,
            search_limit: parse_or(&lookup, "CURATOR_SEARCH_LIMIT", defaults.search_limit)?,
            artist_ids,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> std::result::Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, value, e)),
        None => Ok(default),
    }
}

impl ConfigStore for Config {
    fn get_default(&self, key: &str) -> Option<String> {
        match key {
            DEFAULT_ARC_KEY => Some(self.default_arc.to_string()),
            TARGET_COUNT_KEY => Some(self.target_count.to_string()),
            CREATIVITY_KEY => Some(self.creativity.to_string()),
            MAX_TRACKS_PER_ARTIST_KEY => Some(self.max_tracks_per_artist.to_string()),
            SEARCH_LIMIT_KEY => Some(self.search_limit.to_string()),
            _ => None,
        }
    }

    fn cached_artist_id(&self, name: &str) -> Option<String> {
        self.artist_ids.get(&name.trim().to_lowercase()).cloned()
    }
}

/// Rule tables and knobs handed to each pipeline component at construction.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub normalizer: NormalizerRules,
    pub penalties: VersionPenalties,
    pub vocabulary: AnalyzerVocabulary,
    pub weights: ScoringWeights,
    pub tiers: TierSplit,
    pub trajectories: ArcTrajectories,
    pub default_arc: ArcType,
    pub max_tracks_per_artist: usize,
    /// Title similarity at or above which two candidates are one song
    pub dedupe_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            normalizer: NormalizerRules::default(),
            penalties: VersionPenalties::default(),
            vocabulary: AnalyzerVocabulary::default(),
            weights: ScoringWeights::default(),
            tiers: TierSplit::default(),
            trajectories: ArcTrajectories::default(),
            default_arc: config.default_arc,
            max_tracks_per_artist: config.max_tracks_per_artist,
            dedupe_threshold: 0.85,
        }
    }
}

impl PipelineSettings {
    /// Default tables, with the arc and artist cap taken from `store`.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(value) = store.get_default(DEFAULT_ARC_KEY) {
            settings.default_arc = value.parse().map_err(CurationError::Config)?;
        }
        if let Some(value) = store.get_default(MAX_TRACKS_PER_ARTIST_KEY) {
            settings.max_tracks_per_artist = value.trim().parse().map_err(|_| {
                CurationError::Config(format!("invalid {} '{}'", MAX_TRACKS_PER_ARTIST_KEY, value))
            })?;
        }

        Ok(settings)
    }
}
