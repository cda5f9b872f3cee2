use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Target energy trajectory used to order the final list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcType {
    Balanced,
    Build,
    EarlyBuild,
    Journey,
    Energize,
    WindDown,
}

impl ArcType {
    pub const ALL: [ArcType; 6] = [
        ArcType::Balanced,
        ArcType::Build,
        ArcType::EarlyBuild,
        ArcType::Journey,
        ArcType::Energize,
        ArcType::WindDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArcType::Balanced => "balanced",
            ArcType::Build => "build",
            ArcType::EarlyBuild => "early_build",
            ArcType::Journey => "journey",
            ArcType::Energize => "energize",
            ArcType::WindDown => "wind_down",
        }
    }
}

impl fmt::Display for ArcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArcType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        ArcType::ALL
            .iter()
            .copied()
            .find(|arc| arc.as_str() == wanted)
            .ok_or_else(|| format!("unknown arc type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionClass {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

/// Acceptable band for one audio feature. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FeatureRange {
    pub fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// 1 inside the band, falling linearly to 0 at `falloff` outside it.
    pub fn fit(&self, value: f64, falloff: f64) -> f64 {
        let below = self.min.map_or(0.0, |min| (min - value).max(0.0));
        let above = self.max.map_or(0.0, |max| (value - max).max(0.0));
        let distance = below + above;
        if distance <= 0.0 {
            return 1.0;
        }
        if falloff <= 0.0 {
            return 0.0;
        }
        (1.0 - distance / falloff).clamp(0.0, 1.0)
    }
}

/// A mood requested by the prompt, with the audio profile it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub name: String,
    pub class: EmotionClass,
    /// Set when an intensity modifier ("deeply", "slightly") qualified the
    /// mood; `None` means the vocabulary's base intensity.
    pub intensity: Option<f64>,
    pub target_valence: f64,
    pub target_energy: f64,
    /// Tempo band in BPM, for moods and contexts that imply one
    #[serde(default)]
    pub tempo: Option<FeatureRange>,
    #[serde(default)]
    pub danceability: Option<FeatureRange>,
}

impl MoodEntry {
    pub fn effective_intensity(&self, base: f64) -> f64 {
        self.intensity.unwrap_or(base)
    }
}

/// Structured selection criteria extracted from a free-text prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub genres: BTreeSet<String>,
    pub moods: Vec<MoodEntry>,
    pub exclusions: BTreeSet<String>,
    /// Artist names the prompt compares against ("like X", "similar to X")
    pub comparisons: BTreeSet<String>,
    pub decades: BTreeSet<String>,
    pub arc: Option<ArcType>,
    /// Count mentioned in the prompt itself ("20 songs")
    pub requested_count: Option<usize>,
    /// Resolved target size for the run. Zero until the pipeline copies the
    /// request's count in; the analyzer alone never sets it.
    pub target_count: usize,
    /// Copied from the request by the pipeline, like `target_count`
    pub creativity: f64,
}

impl Intent {
    /// True when nothing in the prompt can steer scoring.
    pub fn is_ambiguous(&self) -> bool {
        self.genres.is_empty()
            && self.moods.is_empty()
            && self.exclusions.is_empty()
            && self.comparisons.is_empty()
    }

    pub fn has_mood(&self, name: &str) -> bool {
        self.moods.iter().any(|m| m.name == name)
    }

    /// Inserts or replaces a mood, keeping the stronger intensity on conflict.
    /// `base` is the intensity of an unqualified mood.
    pub fn add_mood(&mut self, entry: MoodEntry, base: f64) {
        match self.moods.iter_mut().find(|m| m.name == entry.name) {
            Some(existing) => {
                if entry.effective_intensity(base) > existing.effective_intensity(base) {
                    existing.intensity = entry.intensity;
                }
            }
            None => self.moods.push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_type_parsing() {
        assert_eq!("wind_down".parse::<ArcType>().unwrap(), ArcType::WindDown);
        assert_eq!("Early-Build".parse::<ArcType>().unwrap(), ArcType::EarlyBuild);
        assert_eq!("wind down".parse::<ArcType>().unwrap(), ArcType::WindDown);
        assert!("sideways".parse::<ArcType>().is_err());
    }

    #[test]
    fn test_arc_type_serializes_snake_case() {
        let json = serde_json::to_string(&ArcType::EarlyBuild).unwrap();
        assert_eq!(json, "\"early_build\"");
    }

    #[test]
    fn test_empty_intent_is_ambiguous() {
        let mut intent = Intent::default();
        assert!(intent.is_ambiguous());

        intent.genres.insert("funk".to_string());
        assert!(!intent.is_ambiguous());
    }

    #[test]
    fn test_add_mood_keeps_stronger_intensity() {
        let mut intent = Intent::default();
        let mood = |intensity| MoodEntry {
            name: "melancholy".to_string(),
            class: EmotionClass::Negative,
            intensity,
            target_valence: 0.3,
            target_energy: 0.3,
            tempo: None,
            danceability: None,
        };

        intent.add_mood(mood(Some(0.3)), 0.5);
        intent.add_mood(mood(Some(0.9)), 0.5);
        intent.add_mood(mood(Some(0.5)), 0.5);

        assert_eq!(intent.moods.len(), 1);
        assert_eq!(intent.moods[0].intensity, Some(0.9));
    }

    #[test]
    fn test_unqualified_mood_uses_supplied_base() {
        let mood = |intensity| MoodEntry {
            name: "calm".to_string(),
            class: EmotionClass::Positive,
            intensity,
            target_valence: 0.6,
            target_energy: 0.2,
            tempo: None,
            danceability: None,
        };

        assert_eq!(mood(None).effective_intensity(0.8), 0.8);

        // A slight qualifier loses to a strong base
        let mut intent = Intent::default();
        intent.add_mood(mood(None), 0.8);
        intent.add_mood(mood(Some(0.6)), 0.8);
        assert_eq!(intent.moods[0].intensity, None);
    }

    #[test]
    fn test_feature_range_fit() {
        let fast = FeatureRange::at_least(120.0);
        assert_eq!(fast.fit(128.0, 40.0), 1.0);
        assert!((fast.fit(100.0, 40.0) - 0.5).abs() < 1e-9);
        assert_eq!(fast.fit(60.0, 40.0), 0.0);

        let study = FeatureRange::between(60.0, 120.0);
        assert_eq!(study.fit(90.0, 40.0), 1.0);
        assert!(study.fit(130.0, 40.0) < 1.0);
        assert_eq!(FeatureRange::at_most(0.5).fit(0.9, 0.0), 0.0);
    }
}
