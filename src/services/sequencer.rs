//! Sequencer
//!
//! Orders curated tracks along an energy arc:
//! 1. Each output position gets a target energy from the arc's trajectory
//! 2. The unplaced track closest to that target is assigned greedily,
//!    passing over the previous track's artist while others remain
//! 3. A repair pass swaps tracks two positions apart where neighbours still
//!    share an artist, so each moved track jumps a single neighbour
//!
//! Without energy data for every track, tracks are spread round-robin by
//! artist instead and the result is flagged.

use crate::models::{ArcType, SequencedTracks, Track};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Piecewise-linear energy curves over normalized position `t` in `[0, 1]`.
///
/// `Balanced` has no curve: each position targets the energy of the track
/// placed before it, starting from the pool mean.
#[derive(Debug, Clone)]
pub struct ArcTrajectories {
    pub curves: Vec<(ArcType, Vec<(f64, f64)>)>,
    /// Upper bound on artist-spacing repair sweeps
    pub repair_passes: usize,
}

impl Default for ArcTrajectories {
    fn default() -> Self {
        Self {
            curves: vec![
                (ArcType::Build, vec![(0.0, 0.2), (1.0, 0.9)]),
                (ArcType::EarlyBuild, vec![(0.0, 0.3), (0.5, 0.8), (1.0, 0.9)]),
                (ArcType::Journey, vec![(0.0, 0.4), (2.0 / 3.0, 1.0), (1.0, 0.5)]),
                (ArcType::Energize, vec![(0.0, 0.7), (0.2, 0.95), (1.0, 0.95)]),
                (ArcType::WindDown, vec![(0.0, 0.9), (1.0, 0.2)]),
            ],
            repair_passes: 3,
        }
    }
}

impl ArcTrajectories {
    /// Target energy at position `t`, or `None` for arcs without a curve.
    pub fn target(&self, arc: ArcType, t: f64) -> Option<f64> {
        let points = self
            .curves
            .iter()
            .find(|(kind, _)| *kind == arc)
            .map(|(_, points)| points)?;
        interpolate(points, t)
    }
}

fn interpolate(points: &[(f64, f64)], t: f64) -> Option<f64> {
    let first = points.first()?;
    if t <= first.0 {
        return Some(first.1);
    }
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if t <= x1 {
            if x1 <= x0 {
                return Some(y1);
            }
            return Some(y0 + (y1 - y0) * (t - x0) / (x1 - x0));
        }
    }
    points.last().map(|p| p.1)
}

pub struct Sequencer {
    trajectories: ArcTrajectories,
}

impl Sequencer {
    pub fn new(trajectories: ArcTrajectories) -> Self {
        Self { trajectories }
    }

    pub fn sequence(&self, tracks: &[Track], arc: ArcType) -> SequencedTracks {
        if tracks.len() < 2 {
            return SequencedTracks {
                tracks: tracks.to_vec(),
                fallback_used: false,
            };
        }

        let missing = tracks.iter().filter(|t| t.energy().is_none()).count();
        if missing > 0 {
            warn!(
                "Energy data missing for {} of {} tracks, spreading by artist instead of '{}' arc",
                missing,
                tracks.len(),
                arc
            );
            let mut order = round_robin_by_artist(tracks);
            self.repair_artist_adjacency(&mut order);
            return SequencedTracks {
                tracks: order,
                fallback_used: true,
            };
        }

        let mut order = self.place_by_energy(tracks, arc);
        self.repair_artist_adjacency(&mut order);

        debug!("Sequenced {} tracks along '{}' arc", order.len(), arc);
        SequencedTracks {
            tracks: order,
            fallback_used: false,
        }
    }

    /// Greedy closest-energy assignment. Ties go to popularity, then input
    /// order. A track sharing an artist with the one just placed is only
    /// taken when nothing else is left.
    fn place_by_energy(&self, tracks: &[Track], arc: ArcType) -> Vec<Track> {
        let n = tracks.len();
        let energies: Vec<f64> = tracks.iter().map(|t| t.energy().unwrap_or(0.5)).collect();
        let mean = energies.iter().sum::<f64>() / n as f64;

        let mut placed = vec![false; n];
        let mut order: Vec<Track> = Vec::with_capacity(n);
        let mut previous = mean;

        for position in 0..n {
            let t = position as f64 / (n - 1) as f64;
            let target = self.trajectories.target(arc, t).unwrap_or(previous);

            let last = order.last();
            let fresh_artist = |i: usize| last.map_or(true, |prev: &Track| !prev.shares_artist_with(&tracks[i]));
            let any_fresh = (0..n).any(|i| !placed[i] && fresh_artist(i));

            let mut best: Option<usize> = None;
            for idx in (0..n).filter(|&i| !placed[i] && (!any_fresh || fresh_artist(i))) {
                best = match best {
                    None => Some(idx),
                    Some(current) => {
                        let d_new = (energies[idx] - target).abs();
                        let d_cur = (energies[current] - target).abs();
                        let closer = d_new < d_cur
                            || (d_new == d_cur && tracks[idx].popularity > tracks[current].popularity);
                        Some(if closer { idx } else { current })
                    }
                };
            }

            if let Some(idx) = best {
                placed[idx] = true;
                previous = energies[idx];
                order.push(tracks[idx].clone());
            }
        }

        order
    }

    /// Breaks up a same-artist pair by swapping one of its tracks with the
    /// track two positions away, when that leaves both swapped positions
    /// clash-free. Pairs with no such swap are left alone.
    fn repair_artist_adjacency(&self, order: &mut [Track]) {
        let n = order.len();
        for _ in 0..self.trajectories.repair_passes {
            let mut swapped = false;

            for i in 1..n {
                if !order[i - 1].shares_artist_with(&order[i]) {
                    continue;
                }

                let candidates = [i, i - 1].into_iter().flat_map(|m| {
                    let ahead = (m + 2 < n).then_some((m, m + 2));
                    let behind = m.checked_sub(2).map(|j| (m, j));
                    ahead.into_iter().chain(behind)
                });

                for (m, j) in candidates {
                    order.swap(m, j);
                    if clash_free(order, m) && clash_free(order, j) {
                        swapped = true;
                        break;
                    }
                    order.swap(m, j);
                }
            }

            if !swapped {
                break;
            }
        }

        let remaining = (1..n)
            .filter(|&i| order[i - 1].shares_artist_with(&order[i]))
            .count();
        if remaining > 0 {
            debug!("{} same-artist adjacencies left after repair", remaining);
        }
    }
}

/// Neither neighbour of `pos` shares an artist with it.
fn clash_free(order: &[Track], pos: usize) -> bool {
    let left = pos > 0 && order[pos - 1].shares_artist_with(&order[pos]);
    let right = pos + 1 < order.len() && order[pos].shares_artist_with(&order[pos + 1]);
    !left && !right
}

/// Interleaves artists, largest catalogue first, keeping each artist's
/// tracks in input order.
fn round_robin_by_artist(tracks: &[Track]) -> Vec<Track> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<&Track>> = Vec::new();

    for track in tracks {
        let key = track.primary_artist().unwrap_or_else(|| format!("#{}", track.id));
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(track);
    }

    // Stable: equal sizes keep first-seen order
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    let rounds = groups.first().map_or(0, |g| g.len());
    let mut mixed = Vec::with_capacity(tracks.len());
    for round in 0..rounds {
        for group in &groups {
            if let Some(track) = group.get(round) {
                mixed.push((*track).clone());
            }
        }
    }
    mixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioFeatures;

    fn track(id: &str, artist: &str, energy: Option<f64>, popularity: u8) -> Track {
        let track = Track::new(id, id, vec![artist.to_string()], 200_000, popularity);
        match energy {
            Some(energy) => track.with_features(AudioFeatures {
                energy,
                valence: 0.5,
                tempo: 120.0,
                danceability: 0.5,
            }),
            None => track,
        }
    }

    fn sequencer() -> Sequencer {
        Sequencer::new(ArcTrajectories::default())
    }

    fn mean_energy(tracks: &[Track]) -> f64 {
        tracks.iter().filter_map(|t| t.energy()).sum::<f64>() / tracks.len() as f64
    }

    #[test]
    fn test_trajectory_shapes() {
        let arcs = ArcTrajectories::default();
        assert_eq!(arcs.target(ArcType::Build, 0.0), Some(0.2));
        assert!((arcs.target(ArcType::Build, 1.0).unwrap() - 0.9).abs() < 1e-9);
        assert!((arcs.target(ArcType::EarlyBuild, 0.5).unwrap() - 0.8).abs() < 1e-9);
        assert!((arcs.target(ArcType::Journey, 2.0 / 3.0).unwrap() - 1.0).abs() < 1e-9);
        assert!(arcs.target(ArcType::Journey, 1.0).unwrap() < 1.0);
        assert_eq!(arcs.target(ArcType::WindDown, 0.0), Some(0.9));
        assert_eq!(arcs.target(ArcType::Balanced, 0.3), None);

        for step in 0..10 {
            let t = step as f64 / 10.0;
            let next = (step + 1) as f64 / 10.0;
            assert!(arcs.target(ArcType::Build, t) <= arcs.target(ArcType::Build, next));
            assert!(arcs.target(ArcType::WindDown, t) >= arcs.target(ArcType::WindDown, next));
        }
    }

    #[test]
    fn test_build_rises() {
        let tracks: Vec<Track> = (1..=9)
            .rev()
            .map(|i| track(&format!("t{}", i), &format!("Artist {}", i), Some(i as f64 / 10.0), 50))
            .collect();

        let result = sequencer().sequence(&tracks, ArcType::Build);
        assert!(!result.fallback_used);
        assert_eq!(result.tracks.len(), 9);
        assert!(mean_energy(&result.tracks[..3]) < mean_energy(&result.tracks[6..]));
    }

    #[test]
    fn test_wind_down_falls() {
        let tracks: Vec<Track> = (1..=9)
            .map(|i| track(&format!("t{}", i), &format!("Artist {}", i), Some(i as f64 / 10.0), 50))
            .collect();

        let result = sequencer().sequence(&tracks, ArcType::WindDown);
        assert!(mean_energy(&result.tracks[..3]) > mean_energy(&result.tracks[6..]));
    }

    #[test]
    fn test_ties_prefer_popularity() {
        let tracks = vec![
            track("quiet", "A", Some(0.2), 10),
            track("loud", "B", Some(0.2), 90),
            track("other", "C", Some(0.9), 50),
        ];
        let result = sequencer().sequence(&tracks, ArcType::Build);
        assert_eq!(result.tracks[0].id, "loud");
    }

    #[test]
    fn test_repair_separates_artists() {
        // Energy order would put both Faithless tracks next to each other
        let tracks = vec![
            track("f1", "Faithless", Some(0.50), 50),
            track("f2", "Faithless", Some(0.52), 50),
            track("a", "Moby", Some(0.2), 50),
            track("b", "Leftfield", Some(0.3), 50),
            track("c", "Underworld", Some(0.8), 50),
            track("d", "Orbital", Some(0.9), 50),
        ];

        let result = sequencer().sequence(&tracks, ArcType::Build);
        for pair in result.tracks.windows(2) {
            assert!(!pair[0].shares_artist_with(&pair[1]), "{} next to {}", pair[0].id, pair[1].id);
        }
    }

    fn ids(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_repair_swaps_two_positions_away() {
        let mut order = vec![
            track("x1", "X", Some(0.1), 50),
            track("x2", "X", Some(0.2), 50),
            track("y", "Y", Some(0.3), 50),
            track("z", "Z", Some(0.4), 50),
            track("w", "W", Some(0.5), 50),
        ];
        sequencer().repair_artist_adjacency(&mut order);
        assert_eq!(ids(&order), vec!["x1", "z", "y", "x2", "w"]);
    }

    #[test]
    fn test_repair_leaves_pairs_only_a_near_swap_could_fix() {
        let mut order = vec![
            track("a1", "A", Some(0.1), 50),
            track("a2", "A", Some(0.2), 50),
            track("b1", "B", Some(0.3), 50),
            track("b2", "B", Some(0.4), 50),
            track("c", "C", Some(0.5), 50),
        ];
        sequencer().repair_artist_adjacency(&mut order);
        assert_eq!(ids(&order), vec!["a1", "a2", "b1", "b2", "c"]);
    }

    #[test]
    fn test_dominant_artist_keeps_arc_positions() {
        let tracks = vec![
            track("a1", "A", Some(0.1), 50),
            track("a2", "A", Some(0.2), 50),
            track("a3", "A", Some(0.3), 50),
            track("a4", "A", Some(0.4), 50),
            track("b", "B", Some(0.5), 50),
            track("c", "C", Some(0.9), 50),
        ];
        let s = sequencer();
        let placed = s.place_by_energy(&tracks, ArcType::Build);
        let result = s.sequence(&tracks, ArcType::Build);

        assert_eq!(result.tracks.len(), 6);
        for (pos, t) in result.tracks.iter().enumerate() {
            let before = placed.iter().position(|p| p.id == t.id).unwrap();
            assert!(pos.abs_diff(before) <= 2, "{} moved from {} to {}", t.id, before, pos);
        }
        // Only one B and one C to go between four A tracks
        let clashes = result
            .tracks
            .windows(2)
            .filter(|pair| pair[0].shares_artist_with(&pair[1]))
            .count();
        assert_eq!(clashes, 1);
    }

    #[test]
    fn test_placement_passes_over_previous_artist() {
        // Pure closest-energy would put f1 and f2 side by side
        let tracks = vec![
            track("f1", "Faithless", Some(0.2), 50),
            track("f2", "Faithless", Some(0.3), 50),
            track("m", "Moby", Some(0.8), 50),
            track("u", "Underworld", Some(0.9), 50),
        ];
        let result = sequencer().sequence(&tracks, ArcType::Build);
        assert_eq!(ids(&result.tracks), vec!["f1", "m", "u", "f2"]);
    }

    #[test]
    fn test_missing_features_fall_back_to_round_robin() {
        let tracks = vec![
            track("a1", "A", None, 50),
            track("a2", "A", Some(0.5), 50),
            track("a3", "A", None, 50),
            track("b1", "B", None, 50),
            track("b2", "B", None, 50),
            track("c1", "C", None, 50),
        ];

        let result = sequencer().sequence(&tracks, ArcType::Journey);
        assert!(result.fallback_used);
        let ids: Vec<&str> = result.tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b1", "c1", "a2", "b2", "a3"]);
    }

    #[test]
    fn test_balanced_keeps_steps_small() {
        let tracks = vec![
            track("a", "A", Some(0.9), 50),
            track("b", "B", Some(0.1), 50),
            track("c", "C", Some(0.5), 50),
            track("d", "D", Some(0.6), 50),
            track("e", "E", Some(0.4), 50),
        ];
        let result = sequencer().sequence(&tracks, ArcType::Balanced);
        assert_eq!(result.tracks[0].id, "c");
        assert_eq!(result.tracks.len(), 5);
    }

    #[test]
    fn test_tiny_inputs() {
        let s = sequencer();
        assert!(s.sequence(&[], ArcType::Build).tracks.is_empty());
        let one = vec![track("solo", "A", None, 10)];
        let result = s.sequence(&one, ArcType::Build);
        assert_eq!(result.tracks.len(), 1);
        assert!(!result.fallback_used);
    }
}
