use crate::error::CurationNotice;
use crate::models::{ArcType, Intent, Track};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Relevance band a candidate falls into for the current pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Core,
    Adjacent,
    Discovery,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub track: Track,
    pub relevance: f64,
    pub tier: Tier,
    /// Matched at least one exclusion term
    pub excluded: bool,
}

/// Parameters of one `curate_playlist` call.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CurationRequest {
    pub prompt: String,
    #[validate(range(min = 1))]
    pub target_count: usize,
    #[validate(range(min = 0.0, max = 1.0))]
    pub creativity: f64,
    pub arc_override: Option<ArcType>,
    /// Seed for the creativity jitter; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl CurationRequest {
    pub fn new(prompt: impl Into<String>, target_count: usize, creativity: f64) -> Self {
        Self {
            prompt: prompt.into(),
            target_count,
            creativity,
            arc_override: None,
            seed: None,
        }
    }

    pub fn with_arc(mut self, arc: ArcType) -> Self {
        self.arc_override = Some(arc);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Output of the sequencer.
#[derive(Debug, Clone)]
pub struct SequencedTracks {
    pub tracks: Vec<Track>,
    /// Energy data was missing and round-robin artist spreading was used
    pub fallback_used: bool,
}

/// Final result handed to the playlist-write collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct CuratedPlaylist {
    pub tracks: Vec<Track>,
    pub intent: Intent,
    pub arc: ArcType,
    pub fallback_used: bool,
    pub duplicates_removed: usize,
    pub notices: Vec<CurationNotice>,
}

impl CuratedPlaylist {
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }
}
