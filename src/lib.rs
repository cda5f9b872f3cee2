//! Playlist curation from free-text prompts.
//!
//! Raw catalog candidates go through version de-duplication, intent-driven
//! scoring with a creativity knob, and energy-arc sequencing. Catalog access
//! stays behind the collaborator traits in [`services::providers`].

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::{Config, PipelineSettings};
pub use error::{CurationError, CurationNotice, ProviderError, Result};
pub use models::{
    ArcType, AudioFeatures, CanonicalGroup, CuratedPlaylist, CurationRequest, Intent, MoodEntry, Track,
};
pub use services::{curate_playlist, CurationPipeline};
