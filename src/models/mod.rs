pub mod curation;
pub mod intent;
pub mod track;

pub use curation::{CuratedPlaylist, CurationRequest, ScoredCandidate, SequencedTracks, Tier};
pub use intent::{ArcType, EmotionClass, FeatureRange, Intent, MoodEntry};
pub use track::{AudioFeatures, CanonicalGroup, Track};
