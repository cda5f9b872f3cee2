use serde::{Deserialize, Serialize};

/// Audio analysis values supplied by the catalog.
///
/// `energy`, `valence` and `danceability` are normalized to `[0, 1]`;
/// `tempo` is in beats per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
    pub danceability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub popularity: u8,
    /// Genre tags attached by the catalog (usually the artist's genres)
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub features: Option<AudioFeatures>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artists: Vec<String>,
        duration_ms: u64,
        popularity: u8,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists,
            duration_ms,
            popularity: popularity.min(100),
            genres: Vec::new(),
            features: None,
        }
    }

    pub fn with_features(mut self, features: AudioFeatures) -> Self {
        self.features = Some(features);
        self
    }

    pub fn with_genres(mut self, genres: Vec<String>) -> Self {
        self.genres = genres;
        self
    }

    /// First credited artist, lowercased. Used for spacing and per-artist caps.
    pub fn primary_artist(&self) -> Option<String> {
        self.artists.first().map(|a| a.trim().to_lowercase())
    }

    pub fn shares_artist_with(&self, other: &Track) -> bool {
        self.artists.iter().any(|a| {
            other
                .artists
                .iter()
                .any(|b| a.trim().eq_ignore_ascii_case(b.trim()))
        })
    }

    pub fn energy(&self) -> Option<f64> {
        self.features.map(|f| f.energy)
    }
}

/// Tracks judged to be versions of the same song.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalGroup {
    pub key: String,
    pub representative: Track,
    /// All versions in input order, representative included
    pub members: Vec<Track>,
}

impl CanonicalGroup {
    pub fn is_duplicate_set(&self) -> bool {
        self.members.len() > 1
    }
}
