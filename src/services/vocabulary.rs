//! Rule tables for prompt analysis
//!
//! Every table is plain data with a `Default` built from the standard word
//! lists, so callers and tests can swap in their own.

use crate::models::{ArcType, EmotionClass, FeatureRange};

/// An emotion (or mood/context word family) and the audio profile it implies.
#[derive(Debug, Clone)]
pub struct EmotionSpec {
    pub name: String,
    pub class: EmotionClass,
    pub valence: f64,
    pub energy: f64,
    /// Surface forms that map onto this emotion, including `name` itself
    pub aliases: Vec<String>,
    /// Tempo band (BPM) the emotion implies, if any
    pub tempo: Option<FeatureRange>,
    pub danceability: Option<FeatureRange>,
}

impl EmotionSpec {
    pub fn with_tempo(mut self, range: FeatureRange) -> Self {
        self.tempo = Some(range);
        self
    }

    pub fn with_danceability(mut self, range: FeatureRange) -> Self {
        self.danceability = Some(range);
        self
    }
}

#[derive(Debug, Clone)]
pub struct GenreSpec {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyzerVocabulary {
    pub emotions: Vec<EmotionSpec>,
    pub genres: Vec<GenreSpec>,
    /// Phrase -> multiplier applied to `base_intensity`
    pub intensity_modifiers: Vec<(String, f64)>,
    pub base_intensity: f64,
    pub negations: Vec<String>,
    pub arc_cues: Vec<(String, ArcType)>,
    /// Phrase -> decade label ("1990s")
    pub decades: Vec<(String, String)>,
    /// Words that do not make a comparison target an artist ("music", "songs")
    pub filler_words: Vec<String>,
}

impl AnalyzerVocabulary {
    pub fn emotion(&self, name: &str) -> Option<&EmotionSpec> {
        self.emotions.iter().find(|e| e.name == name)
    }

    /// Canonical genre for a free-form tag ("Big Beat" -> "electronic").
    pub fn canonical_genre(&self, tag: &str) -> Option<&str> {
        let tag = tag.trim().to_lowercase();
        self.genres
            .iter()
            .find(|g| g.name == tag || g.keywords.iter().any(|k| *k == tag))
            .map(|g| g.name.as_str())
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn emotion(name: &str, class: EmotionClass, valence: f64, energy: f64, aliases: &[&str]) -> EmotionSpec {
    let mut all = vec![name.to_string()];
    all.extend(aliases.iter().map(|a| a.to_string()));
    EmotionSpec {
        name: name.to_string(),
        class,
        valence,
        energy,
        aliases: all,
        tempo: None,
        danceability: None,
    }
}

fn genre(name: &str, keywords: &[&str]) -> GenreSpec {
    GenreSpec {
        name: name.to_string(),
        keywords: words(keywords),
    }
}

impl Default for AnalyzerVocabulary {
    fn default() -> Self {
        use EmotionClass::*;

        let emotions = vec![
            // Positive
            emotion("joy", Positive, 0.9, 0.7, &["joyful", "joyous"]),
            emotion("happy", Positive, 0.8, 0.6, &["happiness", "cheerful", "upbeat", "fun", "feel good", "feel-good"]),
            emotion("ecstatic", Positive, 1.0, 0.9, &["euphoric", "euphoria"]),
            emotion("content", Positive, 0.7, 0.4, &["satisfied"]),
            emotion("peaceful", Positive, 0.6, 0.2, &["peace", "tranquil"]),
            emotion("hopeful", Positive, 0.7, 0.5, &["hope", "optimistic", "uplifting"]),
            emotion("triumphant", Positive, 0.9, 0.9, &["victorious", "epic"]),
            emotion("calm", Positive, 0.6, 0.2, &["relaxed", "relaxing", "soothing"]),
            emotion("serene", Positive, 0.7, 0.1, &["serenity"]),
            emotion("dreamy", Positive, 0.6, 0.3, &["ethereal", "hazy"]),
            emotion("romantic", Positive, 0.7, 0.4, &["love", "intimate", "tender"]),
            emotion("sensual", Positive, 0.6, 0.5, &["sexy", "sultry"]),
            emotion("passionate", Positive, 0.7, 0.7, &["passion"]),
            emotion("empowered", Positive, 0.8, 0.8, &["empowering"]),
            emotion("confident", Positive, 0.8, 0.7, &["swagger"]),
            emotion("chill", Positive, 0.6, 0.3, &["chilled", "chillout", "mellow", "laid back", "laid-back", "easygoing"])
                .with_tempo(FeatureRange::at_most(110.0)),
            emotion("energetic", Positive, 0.6, 0.85, &["energy", "powerful", "pumped", "hype", "high energy", "high-energy"])
                .with_tempo(FeatureRange::at_least(120.0)),
            emotion("party", Positive, 0.8, 0.85, &["dance", "dancing", "club", "celebration"])
                .with_danceability(FeatureRange::at_least(0.6)),
            // Negative
            emotion("sad", Negative, 0.2, 0.3, &["sadness", "depressing", "sorrow"]),
            emotion("melancholy", Negative, 0.3, 0.3, &["melancholic", "melancholia"]),
            emotion("heartbroken", Negative, 0.1, 0.4, &["heartbreak", "heartache"]),
            emotion("devastated", Negative, 0.0, 0.5, &["devastating", "grief", "grieving"]),
            emotion("lonely", Negative, 0.2, 0.2, &["loneliness", "alone", "isolated"]),
            emotion("angry", Negative, 0.2, 0.9, &["anger", "aggressive", "aggression"]),
            emotion("furious", Negative, 0.1, 1.0, &["fury", "rage", "raging"]),
            emotion("frustrated", Negative, 0.3, 0.7, &["frustration"]),
            emotion("anxious", Negative, 0.3, 0.6, &["anxiety", "nervous", "uneasy"]),
            emotion("tense", Negative, 0.3, 0.7, &["tension", "suspense"]),
            emotion("dark", Negative, 0.2, 0.5, &["darker", "brooding", "gloomy", "moody"]),
            // Mixed
            emotion("nostalgic", Mixed, 0.4, 0.3, &["nostalgia", "reminiscent"]),
            emotion("bittersweet", Mixed, 0.4, 0.4, &[]),
            emotion("wistful", Mixed, 0.4, 0.3, &["yearning"]),
            emotion("longing", Mixed, 0.4, 0.4, &["missing"]),
            emotion("restless", Mixed, 0.4, 0.7, &[]),
            emotion("rebellious", Mixed, 0.5, 0.8, &["rebel", "rebellion"]),
            emotion("defiant", Mixed, 0.5, 0.8, &["defiance"]),
            // Neutral
            emotion("reflective", Neutral, 0.5, 0.3, &["reflection"]),
            emotion("introspective", Neutral, 0.5, 0.2, &["introspection"]),
            emotion("contemplative", Neutral, 0.5, 0.2, &["pensive", "meditative"]),
            emotion("thoughtful", Neutral, 0.5, 0.3, &[]),
            emotion("focus", Neutral, 0.5, 0.35, &["focused", "concentration", "study", "studying", "productive", "work"])
                .with_tempo(FeatureRange::between(60.0, 120.0)),
            // Listening contexts
            emotion("workout", Positive, 0.6, 0.85, &["exercise", "gym", "running", "training"])
                .with_tempo(FeatureRange::at_least(120.0)),
            emotion("sleep", Neutral, 0.4, 0.15, &["sleeping", "bedtime", "lullaby"])
                .with_tempo(FeatureRange::at_most(80.0)),
            emotion("road trip", Positive, 0.7, 0.65, &["driving", "drive"]),
            emotion("dinner", Positive, 0.6, 0.35, &["dining", "cooking"]),
            emotion("coffee shop", Positive, 0.6, 0.4, &["coffee", "cafe", "coffeehouse"]),
            emotion("morning", Positive, 0.7, 0.5, &["sunrise", "wake up"]),
            // Comparative modifiers ("like X but brighter")
            emotion("bright", Positive, 0.8, 0.6, &["brighter", "sunnier", "happier"]),
            emotion("fast", Positive, 0.6, 0.8, &["faster", "harder", "heavier"]),
            emotion("slow", Neutral, 0.5, 0.25, &["slower", "softer", "gentler", "quieter"]),
        ];

        let genres = vec![
            genre("rock", &["rock", "alternative", "grunge", "punk"]),
            genre("pop", &["pop", "top 40", "mainstream"]),
            genre("jazz", &["jazz", "bebop", "swing"]),
            genre("classical", &["classical", "orchestra", "orchestral", "symphony", "piano"]),
            genre("electronic", &["electronic", "electronica", "edm", "techno", "house", "deep house", "trance", "dubstep", "big beat", "breakbeat"]),
            genre("trip-hop", &["trip-hop", "trip hop", "downtempo"]),
            genre("hip-hop", &["hip hop", "hip-hop", "rap", "trap"]),
            genre("r-n-b", &["r&b", "rnb", "soul", "neo-soul"]),
            genre("country", &["country", "bluegrass", "folk"]),
            genre("indie", &["indie", "independent"]),
            genre("metal", &["metal", "heavy metal", "death metal", "black metal"]),
            genre("blues", &["blues", "delta blues"]),
            genre("reggae", &["reggae", "ska", "dub"]),
            genre("latin", &["latin", "salsa", "bachata", "reggaeton"]),
            genre("ambient", &["ambient", "atmospheric", "drone"]),
            genre("funk", &["funk", "funky", "groove", "disco"]),
        ];

        let intensity_modifiers = vec![
            ("extremely", 2.0),
            ("overwhelmingly", 2.0),
            ("deeply", 1.8),
            ("deep", 1.8),
            ("intensely", 1.8),
            ("incredibly", 1.8),
            ("very", 1.6),
            ("super", 1.6),
            ("really", 1.4),
            ("too", 1.2),
            ("overly", 1.2),
            ("somewhat", 0.7),
            ("a bit", 0.7),
            ("a little", 0.6),
            ("slightly", 0.6),
            ("slight", 0.6),
            ("mildly", 0.6),
            ("gently", 0.6),
            ("softly", 0.6),
            ("quietly", 0.6),
            ("subtly", 0.5),
            ("hint of", 0.5),
        ]
        .into_iter()
        .map(|(w, m)| (w.to_string(), m))
        .collect();

        let arc_cues = [
            ("build", ArcType::Build),
            ("builds", ArcType::Build),
            ("building", ArcType::Build),
            ("build up", ArcType::Build),
            ("crescendo", ArcType::Build),
            ("rise", ArcType::Build),
            ("rising", ArcType::Build),
            ("escalate", ArcType::Build),
            ("escalating", ArcType::Build),
            ("ramp up", ArcType::Build),
            ("start slow", ArcType::Build),
            ("chill to energetic", ArcType::Build),
            ("slow to fast", ArcType::Build),
            ("low to high", ArcType::Build),
            ("early build", ArcType::EarlyBuild),
            ("quick build", ArcType::EarlyBuild),
            ("warm up", ArcType::EarlyBuild),
            ("warm-up", ArcType::EarlyBuild),
            ("peak", ArcType::Journey),
            ("peaks", ArcType::Journey),
            ("climax", ArcType::Journey),
            ("journey", ArcType::Journey),
            ("arc", ArcType::Journey),
            ("progression", ArcType::Journey),
            ("rise and fall", ArcType::Journey),
            ("energize", ArcType::Energize),
            ("energise", ArcType::Energize),
            ("energizing", ArcType::Energize),
            ("nonstop", ArcType::Energize),
            ("non-stop", ArcType::Energize),
            ("pump up", ArcType::Energize),
            ("pumped up", ArcType::Energize),
            ("wind down", ArcType::WindDown),
            ("winding down", ArcType::WindDown),
            ("cool down", ArcType::WindDown),
            ("slow down", ArcType::WindDown),
            ("come down", ArcType::WindDown),
            ("fade", ArcType::WindDown),
            ("fade out", ArcType::WindDown),
            ("energetic to chill", ArcType::WindDown),
            ("fast to slow", ArcType::WindDown),
            ("steady", ArcType::Balanced),
            ("consistent", ArcType::Balanced),
            ("balanced", ArcType::Balanced),
            ("even flow", ArcType::Balanced),
        ]
        .into_iter()
        .map(|(w, a)| (w.to_string(), a))
        .collect();

        let decades = [
            ("60s", "1960s"), ("1960s", "1960s"), ("sixties", "1960s"),
            ("70s", "1970s"), ("1970s", "1970s"), ("seventies", "1970s"),
            ("80s", "1980s"), ("1980s", "1980s"), ("eighties", "1980s"),
            ("90s", "1990s"), ("1990s", "1990s"), ("nineties", "1990s"),
            ("2000s", "2000s"), ("y2k", "2000s"), ("noughties", "2000s"),
            ("2010s", "2010s"),
            ("2020s", "2020s"),
        ]
        .into_iter()
        .map(|(w, d)| (w.to_string(), d.to_string()))
        .collect();

        Self {
            emotions,
            genres,
            intensity_modifiers,
            base_intensity: 0.5,
            negations: words(&["not", "without", "no", "never", "avoid", "except"]),
            arc_cues,
            decades,
            filler_words: words(&[
                "a", "an", "the", "some", "music", "songs", "song", "tracks", "tunes",
                "stuff", "something", "vibes", "vibe", "sound", "sounds", "playlist",
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_genre_lookup() {
        let vocab = AnalyzerVocabulary::default();
        assert_eq!(vocab.canonical_genre("Big Beat"), Some("electronic"));
        assert_eq!(vocab.canonical_genre("rap"), Some("hip-hop"));
        assert_eq!(vocab.canonical_genre("funk"), Some("funk"));
        assert_eq!(vocab.canonical_genre("polka"), None);
    }

    #[test]
    fn test_emotion_profiles_are_normalized() {
        let vocab = AnalyzerVocabulary::default();
        for spec in &vocab.emotions {
            assert!((0.0..=1.0).contains(&spec.valence), "{}", spec.name);
            assert!((0.0..=1.0).contains(&spec.energy), "{}", spec.name);
            assert!(spec.aliases.contains(&spec.name));
        }
    }

    #[test]
    fn test_context_feature_bands() {
        let vocab = AnalyzerVocabulary::default();
        let tempo = |name: &str| vocab.emotion(name).and_then(|e| e.tempo);
        assert_eq!(tempo("workout"), Some(FeatureRange::at_least(120.0)));
        assert_eq!(tempo("sleep"), Some(FeatureRange::at_most(80.0)));
        assert_eq!(tempo("focus"), Some(FeatureRange::between(60.0, 120.0)));
        assert_eq!(tempo("sad"), None);
        assert_eq!(
            vocab.emotion("party").and_then(|e| e.danceability),
            Some(FeatureRange::at_least(0.6))
        );
    }

    #[test]
    fn test_emotion_classes_cover_all_groups() {
        let vocab = AnalyzerVocabulary::default();
        for class in [
            EmotionClass::Positive,
            EmotionClass::Negative,
            EmotionClass::Mixed,
            EmotionClass::Neutral,
        ] {
            assert!(vocab.emotions.iter().any(|e| e.class == class));
        }
    }
}
