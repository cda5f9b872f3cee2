//! Duplicate version collapsing
//!
//! Groups candidate tracks that are versions of the same song (radio edits,
//! remixes, remasters) and keeps one representative per group.
//!
//! Grouping:
//! 1. Tracks whose normalized titles are equal share a group
//! 2. Tracks whose normalized titles are similar enough (LCS ratio) are
//!    merged too, to catch near misses the normalizer leaves behind
//!
//! Representative choice prefers long, popular, unqualified versions.

use crate::models::{CanonicalGroup, Track};
use crate::services::normalizer::TrackNormalizer;
use crate::services::similarity::similarity_ratio;
use tracing::debug;

/// Title penalties applied when scoring versions. First matching needle wins,
/// so "remix" must come before "mix".
#[derive(Debug, Clone)]
pub struct VersionPenalties {
    pub rules: Vec<(String, f64)>,
    pub duration_divisor: f64,
    pub popularity_weight: f64,
}

impl Default for VersionPenalties {
    fn default() -> Self {
        Self {
            rules: vec![
                ("remix".to_string(), 20.0),
                ("mix".to_string(), 15.0),
                ("edit".to_string(), 10.0),
                ("remaster".to_string(), 5.0),
            ],
            duration_divisor: 10_000.0,
            popularity_weight: 0.5,
        }
    }
}

impl VersionPenalties {
    pub fn penalty(&self, title: &str) -> f64 {
        let title = title.to_lowercase();
        self.rules
            .iter()
            .find(|(needle, _)| title.contains(needle.as_str()))
            .map(|(_, penalty)| *penalty)
            .unwrap_or(0.0)
    }

    pub fn version_score(&self, track: &Track) -> f64 {
        track.duration_ms as f64 / self.duration_divisor
            + self.popularity_weight * track.popularity as f64
            - self.penalty(&track.title)
    }
}

pub struct Deduplicator {
    normalizer: TrackNormalizer,
    penalties: VersionPenalties,
    similarity_threshold: f64,
}

impl Deduplicator {
    pub fn new(
        normalizer: TrackNormalizer,
        penalties: VersionPenalties,
        similarity_threshold: f64,
    ) -> Self {
        Self {
            normalizer,
            penalties,
            similarity_threshold,
        }
    }

    /// Partition `tracks` into canonical groups, in first-seen order.
    pub fn dedupe(&self, tracks: &[Track]) -> Vec<CanonicalGroup> {
        if tracks.is_empty() {
            return Vec::new();
        }

        let keys: Vec<String> = tracks
            .iter()
            .map(|t| self.normalizer.normalize(&t.title))
            .collect();

        let mut sets = DisjointSets::new(tracks.len());
        for i in 0..tracks.len() {
            for j in (i + 1)..tracks.len() {
                if keys[i] == keys[j]
                    || similarity_ratio(&keys[i], &keys[j]) >= self.similarity_threshold
                {
                    sets.union(i, j);
                }
            }
        }

        // Bucket members by root; roots are visited in order of their first member
        let mut order: Vec<usize> = Vec::new();
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); tracks.len()];
        for i in 0..tracks.len() {
            let root = sets.find(i);
            if buckets[root].is_empty() {
                order.push(root);
            }
            buckets[root].push(i);
        }

        let groups: Vec<CanonicalGroup> = order
            .into_iter()
            .map(|root| {
                let members = &buckets[root];
                let best = self.pick_representative(tracks, members);
                if members.len() > 1 {
                    debug!(
                        "Collapsed {} versions of '{}', keeping '{}'",
                        members.len(),
                        keys[members[0]],
                        tracks[best].title
                    );
                }
                CanonicalGroup {
                    key: keys[members[0]].clone(),
                    representative: tracks[best].clone(),
                    members: members.iter().map(|&i| tracks[i].clone()).collect(),
                }
            })
            .collect();

        debug!(
            "Deduplicated {} candidates into {} groups",
            tracks.len(),
            groups.len()
        );

        groups
    }

    /// Highest version score; ties go to popularity, then input order.
    fn pick_representative(&self, tracks: &[Track], members: &[usize]) -> usize {
        if members.len() == 1 {
            return members[0];
        }

        let mut best = members[0];
        let mut best_score = self.penalties.version_score(&tracks[best]);
        for &i in &members[1..] {
            let score = self.penalties.version_score(&tracks[i]);
            let better = score > best_score
                || (score == best_score && tracks[i].popularity > tracks[best].popularity);
            if better {
                best = i;
                best_score = score;
            }
        }
        best
    }
}

/// Union-find over candidate indices.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// The smaller index becomes the root, keeping roots at first-seen members.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}
