//! Curator
//!
//! Scores canonical candidates against an [`Intent`], splits them into
//! relevance tiers and picks a target-sized subset.
//!
//! Selection:
//! 1. `(1 - creativity)` of the slots come from the core tier, best first
//! 2. Remaining slots are drawn from the adjacent and discovery tiers,
//!    re-ranked with a random jitter proportional to creativity
//! 3. Unused core tracks fill any slots the lower tiers leave open
//! 4. A per-artist cap is applied throughout, then relaxed to backfill
//!
//! At creativity 0 no randomness is drawn and excluded tracks are dropped.

use crate::models::{CanonicalGroup, Intent, ScoredCandidate, Tier, Track};
use crate::services::vocabulary::AnalyzerVocabulary;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Relevance weights. Relevance is
/// `genre*genre_match + mood*mood_match + popularity*pop/100 - exclusion*exclusion_match`.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub genre: f64,
    pub mood: f64,
    pub popularity: f64,
    pub exclusion: f64,
    /// Credit for a mood word in the title when audio features are missing
    pub title_mood_credit: f64,
    /// Feature proximity at or above which a track counts as an excluded mood
    pub exclusion_proximity: f64,
    /// BPM outside a mood's tempo band at which the tempo fit reaches 0
    pub tempo_falloff: f64,
    /// Danceability outside a mood's band at which the fit reaches 0
    pub danceability_falloff: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            genre: 0.35,
            mood: 0.35,
            popularity: 0.3,
            exclusion: 0.5,
            title_mood_credit: 0.6,
            exclusion_proximity: 0.85,
            tempo_falloff: 40.0,
            danceability_falloff: 0.4,
        }
    }
}

/// Rank-quantile tier boundaries and jitter strength.
#[derive(Debug, Clone)]
pub struct TierSplit {
    /// Fraction of the ranked pool labelled core
    pub core: f64,
    /// Fraction labelled adjacent; the rest is discovery
    pub adjacent: f64,
    /// Jitter amplitude at creativity 1, as a fraction of the pool's score range
    pub jitter_scale: f64,
    /// Floor for the score range so a flat pool still gets shuffled
    pub min_spread: f64,
}

impl Default for TierSplit {
    fn default() -> Self {
        Self {
            core: 1.0 / 3.0,
            adjacent: 1.0 / 3.0,
            jitter_scale: 1.0,
            min_spread: 0.05,
        }
    }
}

pub struct Curator {
    weights: ScoringWeights,
    tiers: TierSplit,
    vocabulary: Arc<AnalyzerVocabulary>,
    max_tracks_per_artist: usize,
}

impl Curator {
    pub fn new(
        weights: ScoringWeights,
        tiers: TierSplit,
        vocabulary: Arc<AnalyzerVocabulary>,
        max_tracks_per_artist: usize,
    ) -> Self {
        Self {
            weights,
            tiers,
            vocabulary,
            max_tracks_per_artist,
        }
    }

    /// Select up to `target_count` representatives. Returns every candidate
    /// when the pool is not larger than the target.
    pub fn curate<R: Rng + ?Sized>(
        &self,
        groups: &[CanonicalGroup],
        intent: &Intent,
        target_count: usize,
        creativity: f64,
        rng: &mut R,
    ) -> Vec<Track> {
        let mut ranked = self.rank(groups, intent);

        if creativity <= 0.0 {
            let before = ranked.len();
            ranked.retain(|c| !c.excluded);
            if ranked.len() < before {
                debug!("Dropped {} excluded candidates", before - ranked.len());
            }
        }

        if ranked.len() <= target_count {
            return ranked.into_iter().map(|c| c.track).collect();
        }

        let core_slots = (((1.0 - creativity) * target_count as f64).round() as usize).min(target_count);
        let mut picker = Picker::new(self.max_tracks_per_artist, target_count);

        // Step 1: deterministic core picks
        for (idx, candidate) in ranked.iter().enumerate() {
            if picker.picked.len() >= core_slots || candidate.tier != Tier::Core {
                continue;
            }
            picker.offer(idx, &candidate.track);
        }

        // Step 2: jittered draw from the adjacent and discovery tiers
        let rest: Vec<usize> = (0..ranked.len())
            .filter(|&idx| ranked[idx].tier != Tier::Core && !picker.taken.contains(&idx))
            .collect();
        for idx in self.jittered_order(&ranked, rest, creativity, rng) {
            if picker.is_full() {
                break;
            }
            picker.offer(idx, &ranked[idx].track);
        }

        // Step 3: leftover core tracks fill what the lower tiers could not
        for (idx, candidate) in ranked.iter().enumerate() {
            if picker.is_full() {
                break;
            }
            if candidate.tier == Tier::Core && !picker.skipped.contains(&idx) {
                picker.offer(idx, &candidate.track);
            }
        }

        // Step 4: backfill with tracks the artist cap held back
        if !picker.is_full() {
            let mut skipped: Vec<usize> = picker.skipped.iter().copied().collect();
            skipped.sort_unstable();
            for idx in skipped {
                if picker.is_full() {
                    break;
                }
                picker.force(idx);
            }
        }

        let tier_counts = picker.picked.iter().fold([0usize; 3], |mut acc, &idx| {
            match ranked[idx].tier {
                Tier::Core => acc[0] += 1,
                Tier::Adjacent => acc[1] += 1,
                Tier::Discovery => acc[2] += 1,
            }
            acc
        });
        debug!(
            "Selected {} of {} candidates (core {}, adjacent {}, discovery {})",
            picker.picked.len(),
            ranked.len(),
            tier_counts[0],
            tier_counts[1],
            tier_counts[2]
        );

        picker
            .picked
            .into_iter()
            .map(|idx| ranked[idx].track.clone())
            .collect()
    }

    /// Scores every representative and labels tiers, best first. Equal scores
    /// keep input order.
    pub fn rank(&self, groups: &[CanonicalGroup], intent: &Intent) -> Vec<ScoredCandidate> {
        let mut scored: Vec<(f64, bool, &Track)> = groups
            .iter()
            .map(|group| {
                let track = &group.representative;
                let (relevance, excluded) = self.score(track, intent);
                (relevance, excluded, track)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let total = scored.len();
        let core_len = (total as f64 * self.tiers.core).ceil() as usize;
        let adjacent_len = (total as f64 * self.tiers.adjacent).ceil() as usize;

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (relevance, excluded, track))| {
                let tier = if rank < core_len {
                    Tier::Core
                } else if rank < core_len + adjacent_len {
                    Tier::Adjacent
                } else {
                    Tier::Discovery
                };
                ScoredCandidate {
                    track: track.clone(),
                    relevance,
                    tier,
                    excluded,
                }
            })
            .collect()
    }

    /// Relevance and whether any exclusion term matched.
    pub fn score(&self, track: &Track, intent: &Intent) -> (f64, bool) {
        let w = &self.weights;
        let exclusion = self.exclusion_match(track, intent);
        let relevance = w.genre * self.genre_match(track, intent)
            + w.mood * self.mood_match(track, intent)
            + w.popularity * track.popularity as f64 / 100.0
            - w.exclusion * exclusion;
        (relevance, exclusion > 0.0)
    }

    /// Fraction of requested genres found in the track's tags.
    fn genre_match(&self, track: &Track, intent: &Intent) -> f64 {
        if intent.genres.is_empty() {
            return 0.0;
        }
        let tags = self.canonical_tags(track);
        let matched = intent
            .genres
            .iter()
            .filter(|genre| tags.iter().any(|tag| tag == *genre || tag.contains(genre.as_str())))
            .count();
        matched as f64 / intent.genres.len() as f64
    }

    /// Intensity-weighted fit to each mood: valence/energy closeness averaged
    /// with the mood's tempo and danceability bands where it has them.
    fn mood_match(&self, track: &Track, intent: &Intent) -> f64 {
        if intent.moods.is_empty() {
            return 0.0;
        }

        let title = track.title.to_lowercase();
        let base = self.vocabulary.base_intensity;
        let mut total = 0.0;
        let mut weight_sum = 0.0;
        for mood in &intent.moods {
            let weight = mood.effective_intensity(base).max(f64::EPSILON);
            let matched = match track.features {
                Some(features) => {
                    let mut fits = vec![proximity(
                        features.valence,
                        features.energy,
                        mood.target_valence,
                        mood.target_energy,
                    )];
                    if let Some(band) = mood.tempo {
                        fits.push(band.fit(features.tempo, self.weights.tempo_falloff));
                    }
                    if let Some(band) = mood.danceability {
                        fits.push(band.fit(features.danceability, self.weights.danceability_falloff));
                    }
                    fits.iter().sum::<f64>() / fits.len() as f64
                }
                None if self.title_mentions(&title, &mood.name) => self.weights.title_mood_credit,
                None => 0.0,
            };
            total += weight * matched;
            weight_sum += weight;
        }
        total / weight_sum
    }

    /// 1.0 when any exclusion term hits the track's metadata or mood profile.
    fn exclusion_match(&self, track: &Track, intent: &Intent) -> f64 {
        if intent.exclusions.is_empty() {
            return 0.0;
        }

        let title = track.title.to_lowercase();
        let tags = self.canonical_tags(track);
        let artists: Vec<String> = track.artists.iter().map(|a| a.to_lowercase()).collect();

        let hit = intent.exclusions.iter().any(|term| {
            if tags.iter().any(|tag| tag == term || tag.contains(term.as_str())) {
                return true;
            }
            if title.contains(term.as_str()) || artists.iter().any(|a| a == term) {
                return true;
            }
            match (self.vocabulary.emotion(term), track.features) {
                (Some(spec), Some(features)) => {
                    proximity(features.valence, features.energy, spec.valence, spec.energy)
                        >= self.weights.exclusion_proximity
                }
                (Some(_), None) => self.title_mentions(&title, term),
                _ => false,
            }
        });

        if hit {
            1.0
        } else {
            0.0
        }
    }

    /// Track genre tags mapped to canonical names where the vocabulary knows them.
    fn canonical_tags(&self, track: &Track) -> Vec<String> {
        track
            .genres
            .iter()
            .map(|tag| {
                self.vocabulary
                    .canonical_genre(tag)
                    .map(str::to_string)
                    .unwrap_or_else(|| tag.trim().to_lowercase())
            })
            .collect()
    }

    fn title_mentions(&self, title: &str, emotion: &str) -> bool {
        self.vocabulary.emotion(emotion).map_or(false, |spec| {
            title
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| spec.aliases.iter().any(|alias| alias == word))
        })
    }

    /// Indices in `pool` re-ranked by jittered relevance. Leaves `rng`
    /// untouched at creativity 0.
    fn jittered_order<R: Rng + ?Sized>(
        &self,
        ranked: &[ScoredCandidate],
        pool: Vec<usize>,
        creativity: f64,
        rng: &mut R,
    ) -> Vec<usize> {
        if creativity <= 0.0 || pool.len() < 2 {
            return pool;
        }

        let (lo, hi) = pool.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &idx| {
            let r = ranked[idx].relevance;
            (lo.min(r), hi.max(r))
        });
        let amplitude = creativity * self.tiers.jitter_scale * (hi - lo).max(self.tiers.min_spread);

        let mut keyed: Vec<(f64, usize)> = pool
            .into_iter()
            .map(|idx| (ranked[idx].relevance + rng.gen_range(-1.0f64..=1.0) * amplitude, idx))
            .collect();
        keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        keyed.into_iter().map(|(_, idx)| idx).collect()
    }
}

/// 1 at the target, falling linearly to 0 at the far corner of the unit square.
fn proximity(valence: f64, energy: f64, target_valence: f64, target_energy: f64) -> f64 {
    let distance = ((valence - target_valence).powi(2) + (energy - target_energy).powi(2)).sqrt();
    (1.0 - distance / std::f64::consts::SQRT_2).clamp(0.0, 1.0)
}

/// Tracks picked so far plus per-artist counts.
struct Picker {
    cap: usize,
    target: usize,
    picked: Vec<usize>,
    taken: HashSet<usize>,
    skipped: HashSet<usize>,
    per_artist: HashMap<String, usize>,
}

impl Picker {
    fn new(cap: usize, target: usize) -> Self {
        Self {
            cap: cap.max(1),
            target,
            picked: Vec::with_capacity(target),
            taken: HashSet::new(),
            skipped: HashSet::new(),
            per_artist: HashMap::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.picked.len() >= self.target
    }

    fn offer(&mut self, idx: usize, track: &Track) {
        if self.taken.contains(&idx) {
            return;
        }
        if let Some(artist) = track.primary_artist() {
            let count = self.per_artist.entry(artist).or_insert(0);
            if *count >= self.cap {
                self.skipped.insert(idx);
                return;
            }
            *count += 1;
        }
        self.force(idx);
    }

    fn force(&mut self, idx: usize) {
        if self.taken.insert(idx) {
            self.skipped.remove(&idx);
            self.picked.push(idx);
        }
    }
}
