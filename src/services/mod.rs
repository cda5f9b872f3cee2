pub mod candidate_gatherer;
pub mod curator;
pub mod deduplicator;
pub mod normalizer;
pub mod pipeline;
pub mod prompt_analyzer;
pub mod providers;
pub mod sequencer;
pub mod similarity;
pub mod vocabulary;

pub use candidate_gatherer::{CandidateGatherer, GatheredCandidates};
pub use curator::{Curator, ScoringWeights, TierSplit};
pub use deduplicator::{Deduplicator, VersionPenalties};
pub use normalizer::{NormalizerRules, TrackNormalizer};
pub use pipeline::{curate_playlist, CurationPipeline};
pub use prompt_analyzer::PromptAnalyzer;
pub use providers::{
    ArtistCatalogProvider, AudioFeatureProvider, ConfigStore, StaticConfigStore, TrackSearchProvider,
};
pub use sequencer::{ArcTrajectories, Sequencer};
pub use vocabulary::AnalyzerVocabulary;
