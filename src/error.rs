use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CurationError {
    #[error("Target track count must be positive, got {0}")]
    InvalidTargetCount(usize),

    #[error("Creativity must be within [0, 1], got {0}")]
    InvalidCreativity(f64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid rule table: {0}")]
    InvalidVocabulary(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for CurationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CurationError::Validation(errors.to_string())
    }
}

/// Failures reported by the catalog collaborators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Degraded-but-successful conditions observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurationNotice {
    /// The prompt carried no genre, mood, exclusion or comparison signal;
    /// ranking fell back to popularity.
    AmbiguousPrompt,
    InsufficientCandidates { requested: usize, available: usize },
    /// Energy data was missing for `missing` tracks; sequencing used
    /// round-robin artist spreading.
    FeatureDataUnavailable { missing: usize },
    ArtistUnresolved { name: String },
}

pub type Result<T> = std::result::Result<T, CurationError>;
