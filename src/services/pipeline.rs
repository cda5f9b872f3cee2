//! Curation pipeline
//!
//! Prompt + raw candidates -> ordered playlist:
//! 1. Validate the request
//! 2. Analyze the prompt into an intent
//! 3. Collapse duplicate versions
//! 4. Score, tier and select
//! 5. Sequence along the chosen arc
//!
//! Degraded runs are reported as notices on the result, never as errors.

use crate::config::PipelineSettings;
use crate::error::{CurationError, CurationNotice, Result};
use crate::models::{ArcType, CuratedPlaylist, CurationRequest, Intent, Track};
use crate::services::candidate_gatherer::CandidateGatherer;
use crate::services::curator::Curator;
use crate::services::deduplicator::Deduplicator;
use crate::services::normalizer::TrackNormalizer;
use crate::services::prompt_analyzer::PromptAnalyzer;
use crate::services::providers::ConfigStore;
use crate::services::sequencer::Sequencer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

pub struct CurationPipeline {
    analyzer: PromptAnalyzer,
    deduplicator: Deduplicator,
    curator: Curator,
    sequencer: Sequencer,
    default_arc: ArcType,
}

impl CurationPipeline {
    pub fn new(settings: PipelineSettings) -> Result<Self> {
        let vocabulary = Arc::new(settings.vocabulary);
        let normalizer = TrackNormalizer::new(&settings.normalizer)?;

        Ok(Self {
            analyzer: PromptAnalyzer::new(vocabulary.clone())?,
            deduplicator: Deduplicator::new(normalizer, settings.penalties, settings.dedupe_threshold),
            curator: Curator::new(
                settings.weights,
                settings.tiers,
                vocabulary,
                settings.max_tracks_per_artist,
            ),
            sequencer: Sequencer::new(settings.trajectories),
            default_arc: settings.default_arc,
        })
    }

    pub fn analyze(&self, prompt: &str) -> Intent {
        self.analyzer.analyze(prompt)
    }

    /// Runs the pipeline over an already-fetched candidate pool. The jitter
    /// source is seeded from `request.seed`, or from entropy when absent.
    pub fn curate_playlist(&self, candidates: &[Track], request: &CurationRequest) -> Result<CuratedPlaylist> {
        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.curate_playlist_with_rng(candidates, request, &mut rng)
    }

    pub fn curate_playlist_with_rng<R: Rng + ?Sized>(
        &self,
        candidates: &[Track],
        request: &CurationRequest,
        rng: &mut R,
    ) -> Result<CuratedPlaylist> {
        validate_request(request)?;
        let intent = self.analyzer.analyze(&request.prompt);
        Ok(self.run(candidates, request, intent, Vec::new(), rng))
    }

    /// Gathers candidates through the catalog collaborators, then curates.
    pub async fn curate_from_catalog(
        &self,
        gatherer: &CandidateGatherer,
        request: &CurationRequest,
    ) -> Result<CuratedPlaylist> {
        validate_request(request)?;
        let intent = self.analyzer.analyze(&request.prompt);
        let gathered = gatherer.gather(&intent, &request.prompt).await?;

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(self.run(&gathered.tracks, request, intent, gathered.notices, &mut rng))
    }

    fn run<R: Rng + ?Sized>(
        &self,
        candidates: &[Track],
        request: &CurationRequest,
        mut intent: Intent,
        mut notices: Vec<CurationNotice>,
        rng: &mut R,
    ) -> CuratedPlaylist {
        info!(
            "Curating playlist: prompt='{}', target={}, creativity={:.2}, candidates={}",
            request.prompt,
            request.target_count,
            request.creativity,
            candidates.len()
        );

        // Step 1: intent
        intent.target_count = request.target_count;
        intent.creativity = request.creativity;
        if let Some(requested) = intent.requested_count {
            if requested != request.target_count {
                debug!(
                    "Prompt asks for {} tracks, using explicit target {}",
                    requested, request.target_count
                );
            }
        }
        if intent.is_ambiguous() {
            warn!("Prompt '{}' carries no usable signal, ranking by popularity", request.prompt);
            notices.push(CurationNotice::AmbiguousPrompt);
        }

        // Step 2: duplicates
        let groups = self.deduplicator.dedupe(candidates);
        let duplicates_removed = candidates.len() - groups.len();
        if duplicates_removed > 0 {
            info!("Collapsed {} duplicate versions", duplicates_removed);
        }

        // Step 3: selection
        let selected = self
            .curator
            .curate(&groups, &intent, request.target_count, request.creativity, rng);
        if selected.len() < request.target_count {
            warn!(
                "Only {} candidates available for a target of {}",
                selected.len(),
                request.target_count
            );
            notices.push(CurationNotice::InsufficientCandidates {
                requested: request.target_count,
                available: selected.len(),
            });
        }

        // Step 4: ordering
        let arc = request
            .arc_override
            .or(intent.arc)
            .unwrap_or(self.default_arc);
        let sequenced = self.sequencer.sequence(&selected, arc);
        if sequenced.fallback_used {
            let missing = selected.iter().filter(|t| t.features.is_none()).count();
            notices.push(CurationNotice::FeatureDataUnavailable { missing });
        }

        info!(
            "Curated {} tracks on '{}' arc (fallback: {}, notices: {})",
            sequenced.tracks.len(),
            arc,
            sequenced.fallback_used,
            notices.len()
        );

        CuratedPlaylist {
            tracks: sequenced.tracks,
            intent,
            arc,
            fallback_used: sequenced.fallback_used,
            duplicates_removed,
            notices,
        }
    }
}

/// Contract checks; a failing request never reaches the pipeline.
fn validate_request(request: &CurationRequest) -> Result<()> {
    if request.target_count == 0 {
        return Err(CurationError::InvalidTargetCount(request.target_count));
    }
    if !request.creativity.is_finite() || !(0.0..=1.0).contains(&request.creativity) {
        return Err(CurationError::InvalidCreativity(request.creativity));
    }
    request.validate()?;
    Ok(())
}

/// One-shot curation with the default rule tables. The default arc and
/// per-artist cap come from `config`.
pub fn curate_playlist(
    candidates: &[Track],
    prompt: &str,
    target_count: usize,
    creativity: f64,
    arc_override: Option<ArcType>,
    config: &dyn ConfigStore,
) -> Result<CuratedPlaylist> {
    let pipeline = CurationPipeline::new(PipelineSettings::from_store(config)?)?;
    let mut request = CurationRequest::new(prompt, target_count, creativity);
    request.arc_override = arc_override;
    pipeline.curate_playlist(candidates, &request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioFeatures;

    fn pipeline() -> CurationPipeline {
        CurationPipeline::new(PipelineSettings::default()).unwrap()
    }

    fn track(id: &str, title: &str, artist: &str, energy: f64, popularity: u8) -> Track {
        Track::new(id, title, vec![artist.to_string()], 240_000, popularity).with_features(AudioFeatures {
            energy,
            valence: 0.6,
            tempo: 120.0,
            danceability: 0.6,
        })
    }

    fn pool() -> Vec<Track> {
        vec![
            track("1", "Insomnia - Radio Edit", "Faithless", 0.8, 64),
            track("2", "Insomnia - Monster Mix", "Faithless", 0.85, 50),
            track("3", "Praise You", "Fatboy Slim", 0.7, 75),
            track("4", "Porcelain", "Moby", 0.3, 60),
            track("5", "Teardrop", "Massive Attack", 0.4, 70),
        ]
    }

    #[test]
    fn test_contract_violations_fail_fast() {
        let p = pipeline();
        let err = p
            .curate_playlist(&pool(), &CurationRequest::new("funk", 0, 0.5))
            .unwrap_err();
        assert!(matches!(err, CurationError::InvalidTargetCount(0)));

        let err = p
            .curate_playlist(&pool(), &CurationRequest::new("funk", 5, 1.5))
            .unwrap_err();
        assert!(matches!(err, CurationError::InvalidCreativity(_)));

        let err = p
            .curate_playlist(&pool(), &CurationRequest::new("funk", 5, f64::NAN))
            .unwrap_err();
        assert!(matches!(err, CurationError::InvalidCreativity(_)));
    }

    #[test]
    fn test_duplicates_and_insufficient_candidates() {
        let request = CurationRequest::new("electronic", 10, 0.0);
        let playlist = pipeline().curate_playlist(&pool(), &request).unwrap();

        assert_eq!(playlist.duplicates_removed, 1);
        assert_eq!(playlist.tracks.len(), 4);
        // Same length, so the radio edit outscores the mix
        assert!(playlist.track_ids().contains(&"1".to_string()));
        assert!(!playlist.track_ids().contains(&"2".to_string()));
        assert!(playlist.notices.contains(&CurationNotice::InsufficientCandidates {
            requested: 10,
            available: 4
        }));
    }

    #[test]
    fn test_ambiguous_prompt_is_a_notice() {
        let request = CurationRequest::new("qwerty", 2, 0.0);
        let playlist = pipeline().curate_playlist(&pool(), &request).unwrap();

        assert_eq!(playlist.tracks.len(), 2);
        assert!(playlist.notices.contains(&CurationNotice::AmbiguousPrompt));
        // Popularity only: Praise You (75) and Teardrop (70)
        let mut ids = playlist.track_ids();
        ids.sort();
        assert_eq!(ids, vec!["3", "5"]);
    }

    #[test]
    fn test_arc_precedence() {
        let p = pipeline();

        let playlist = p.curate_playlist(&pool(), &CurationRequest::new("funk", 3, 0.0)).unwrap();
        assert_eq!(playlist.arc, ArcType::Journey);

        let playlist = p
            .curate_playlist(&pool(), &CurationRequest::new("wind down with funk", 3, 0.0))
            .unwrap();
        assert_eq!(playlist.arc, ArcType::WindDown);

        let request = CurationRequest::new("wind down with funk", 3, 0.0).with_arc(ArcType::Build);
        let playlist = p.curate_playlist(&pool(), &request).unwrap();
        assert_eq!(playlist.arc, ArcType::Build);
    }

    #[test]
    fn test_one_shot_takes_default_arc_from_store() {
        use crate::config::DEFAULT_ARC_KEY;
        use crate::services::providers::StaticConfigStore;

        let store = StaticConfigStore::default().with_default(DEFAULT_ARC_KEY, "wind_down");
        let playlist = curate_playlist(&pool(), "funk", 3, 0.0, None, &store).unwrap();
        assert_eq!(playlist.arc, ArcType::WindDown);

        // A prompt cue still beats the configured default
        let playlist = curate_playlist(&pool(), "funk that builds", 3, 0.0, None, &store).unwrap();
        assert_eq!(playlist.arc, ArcType::Build);

        let broken = StaticConfigStore::default().with_default(DEFAULT_ARC_KEY, "sideways");
        let err = curate_playlist(&pool(), "funk", 3, 0.0, None, &broken).unwrap_err();
        assert!(matches!(err, CurationError::Config(_)));
    }

    #[test]
    fn test_intent_carries_request_settings() {
        let request = CurationRequest::new("funk", 3, 0.25).with_seed(4);
        let playlist = pipeline().curate_playlist(&pool(), &request).unwrap();
        assert_eq!(playlist.intent.target_count, 3);
        assert_eq!(playlist.intent.creativity, 0.25);
    }

    #[test]
    fn test_missing_features_reported() {
        let candidates: Vec<Track> = pool()
            .into_iter()
            .map(|mut t| {
                t.features = None;
                t
            })
            .collect();
        let playlist = pipeline()
            .curate_playlist(&candidates, &CurationRequest::new("funk", 3, 0.0))
            .unwrap();

        assert!(playlist.fallback_used);
        assert!(playlist
            .notices
            .contains(&CurationNotice::FeatureDataUnavailable { missing: 3 }));
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let p = pipeline();
        let request = CurationRequest::new("electronic", 3, 0.9).with_seed(11);
        let a = p.curate_playlist(&pool(), &request).unwrap();
        let b = p.curate_playlist(&pool(), &request).unwrap();
        assert_eq!(a.track_ids(), b.track_ids());
    }
}
