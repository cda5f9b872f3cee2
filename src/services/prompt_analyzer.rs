//! Prompt Analyzer
//!
//! Turns a free-text playlist prompt into an [`Intent`]:
//! 1. Pull out comparison references ("like X but Y", "similar to X") and
//!    mask the artist names so their words are not read as moods
//! 2. Tokenize and match phrases against the vocabulary, longest first
//! 3. Resolve negations, intensity modifiers and compound emotions
//!
//! Unknown words are ignored. An empty intent is a valid result.

use crate::error::Result;
use crate::models::{ArcType, Intent, MoodEntry};
use crate::services::vocabulary::AnalyzerVocabulary;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Punctuation is kept as a token so negation never reaches across clauses
const CLAUSE_BREAK: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq)]
enum TermKind {
    Emotion(usize),
    Genre(usize),
    Modifier(f64),
    Negation,
    Arc(ArcType),
    Decade(usize),
    Other,
}

impl TermKind {
    fn is_negatable(&self) -> bool {
        matches!(self, TermKind::Emotion(_) | TermKind::Genre(_))
    }
}

/// Phrase lookup keyed by first token; candidates sorted longest first.
struct Lexicon {
    by_first: HashMap<String, Vec<(Vec<String>, TermKind)>>,
}

impl Lexicon {
    fn build(vocab: &AnalyzerVocabulary) -> Self {
        let mut lexicon = Self {
            by_first: HashMap::new(),
        };
        let mut seen: HashSet<Vec<String>> = HashSet::new();

        // Earlier tables win when the same phrase appears twice
        for word in &vocab.negations {
            lexicon.insert(&mut seen, word, TermKind::Negation);
        }
        for (phrase, multiplier) in &vocab.intensity_modifiers {
            lexicon.insert(&mut seen, phrase, TermKind::Modifier(*multiplier));
        }
        for (phrase, arc) in &vocab.arc_cues {
            lexicon.insert(&mut seen, phrase, TermKind::Arc(*arc));
        }
        for (idx, genre) in vocab.genres.iter().enumerate() {
            lexicon.insert(&mut seen, &genre.name, TermKind::Genre(idx));
            for keyword in &genre.keywords {
                lexicon.insert(&mut seen, keyword, TermKind::Genre(idx));
            }
        }
        for (idx, emotion) in vocab.emotions.iter().enumerate() {
            for alias in &emotion.aliases {
                lexicon.insert(&mut seen, alias, TermKind::Emotion(idx));
            }
        }
        for (idx, (phrase, _)) in vocab.decades.iter().enumerate() {
            lexicon.insert(&mut seen, phrase, TermKind::Decade(idx));
        }

        for candidates in lexicon.by_first.values_mut() {
            candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        }
        lexicon
    }

    fn insert(&mut self, seen: &mut HashSet<Vec<String>>, phrase: &str, kind: TermKind) {
        let tokens = tokenize(phrase);
        if tokens.is_empty() || !seen.insert(tokens.clone()) {
            return;
        }
        self.by_first
            .entry(tokens[0].clone())
            .or_default()
            .push((tokens, kind));
    }

    /// Longest phrase starting at `pos`, with the number of tokens it spans.
    fn longest_match(&self, tokens: &[String], pos: usize) -> Option<(TermKind, usize)> {
        self.by_first.get(&tokens[pos])?.iter().find_map(|(phrase, kind)| {
            let end = pos + phrase.len();
            (end <= tokens.len() && tokens[pos..end] == phrase[..]).then_some((*kind, phrase.len()))
        })
    }

    fn contains_word(&self, word: &str) -> bool {
        self.by_first.contains_key(word)
    }
}

/// Lowercase word tokens; clause punctuation becomes [`CLAUSE_BREAK`].
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        let word = current.trim_matches(|c: char| c == '-' || c == '\'');
        if !word.is_empty() {
            tokens.push(word.to_string());
        }
        current.clear();
    };

    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() || ch == '&' || ch == '-' || ch == '\'' {
            current.push(ch);
        } else {
            flush(&mut current, &mut tokens);
            if matches!(ch, ',' | '.' | ';' | ':' | '!' | '?') {
                tokens.push(CLAUSE_BREAK.to_string());
            }
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

pub struct PromptAnalyzer {
    vocabulary: Arc<AnalyzerVocabulary>,
    lexicon: Lexicon,
    like_but: Regex,
    similar_to: Regex,
    reference_cut: Regex,
    requested_count: Regex,
}

impl PromptAnalyzer {
    pub fn new(vocabulary: Arc<AnalyzerVocabulary>) -> Result<Self> {
        let lexicon = Lexicon::build(&vocabulary);
        Ok(Self {
            vocabulary,
            lexicon,
            like_but: Regex::new(r"(?i)\blike\s+([^,.;!?]+?)\s+but\s+[^,.;!?]+")?,
            similar_to: Regex::new(r"(?i)\bsimilar\s+to\s+([^,.;!?]+)")?,
            reference_cut: Regex::new(r"(?i)\s+(?:but|with|for|and then)\s+")?,
            requested_count: Regex::new(r"(?i)\b(\d{1,3})\s+(?:tracks|songs|tunes)\b")?,
        })
    }

    /// Reads the prompt into an [`Intent`]. `target_count` and `creativity`
    /// stay at zero here; the pipeline fills them from the request.
    pub fn analyze(&self, prompt: &str) -> Intent {
        let mut intent = Intent::default();

        // Step 1: comparisons, masked out of the text scanned for terms
        let mut masked = prompt.to_string();
        for (start, end, reference) in self.extract_comparisons(prompt) {
            masked.replace_range(start..end, &" ".repeat(end - start));
            intent.comparisons.insert(reference);
        }

        intent.requested_count = self
            .requested_count
            .captures(prompt)
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .filter(|n| *n > 0);

        // Step 2: phrase matching
        let tokens = tokenize(&masked);
        let terms = self.scan(&tokens);

        // Step 3: interpret
        let negated = Self::resolve_negations(&terms);
        self.apply_terms(&terms, &negated, &mut intent);

        debug!(
            "Analyzed prompt: genres={:?} moods={:?} exclusions={:?} comparisons={:?} arc={:?}",
            intent.genres,
            intent.moods.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            intent.exclusions,
            intent.comparisons,
            intent.arc
        );

        intent
    }

    /// Byte span and text of each comparison reference found in `prompt`.
    fn extract_comparisons(&self, prompt: &str) -> Vec<(usize, usize, String)> {
        let mut found: Vec<(usize, usize, String)> = Vec::new();

        let captures = self
            .like_but
            .captures_iter(prompt)
            .chain(self.similar_to.captures_iter(prompt));

        for caps in captures {
            let Some(group) = caps.get(1) else { continue };
            let mut text = group.as_str();
            if let Some(cut) = self.reference_cut.find(text) {
                text = &text[..cut.start()];
            }
            let reference = text.trim();
            if reference.is_empty() || !self.looks_like_artist(reference) {
                continue;
            }
            let start = group.start();
            let end = start + text.len();
            if found.iter().any(|(s, e, _)| start < *e && *s < end) {
                continue;
            }
            found.push((start, end, reference.to_string()));
        }

        found
    }

    /// A reference made only of vocabulary and filler words ("chill music")
    /// is a description, not an artist.
    fn looks_like_artist(&self, reference: &str) -> bool {
        tokenize(reference).iter().any(|token| {
            token != CLAUSE_BREAK
                && !self.lexicon.contains_word(token)
                && !self.vocabulary.filler_words.iter().any(|f| f == token)
        })
    }

    fn scan(&self, tokens: &[String]) -> Vec<TermKind> {
        let mut terms = Vec::with_capacity(tokens.len());
        let mut pos = 0;
        while pos < tokens.len() {
            match self.lexicon.longest_match(tokens, pos) {
                Some((kind, len)) => {
                    terms.push(kind);
                    pos += len;
                }
                None => {
                    terms.push(TermKind::Other);
                    pos += 1;
                }
            }
        }
        terms
    }

    /// Marks terms a negation applies to. A negation binds forward first
    /// (skipping intensity modifiers, covering a compound emotion run), and
    /// otherwise to the term right before it.
    fn resolve_negations(terms: &[TermKind]) -> Vec<bool> {
        let mut negated = vec![false; terms.len()];

        for (pos, kind) in terms.iter().enumerate() {
            if *kind != TermKind::Negation {
                continue;
            }

            let mut next = pos + 1;
            while next < terms.len() && matches!(terms[next], TermKind::Modifier(_)) {
                next += 1;
            }

            if next < terms.len() && terms[next].is_negatable() {
                negated[next] = true;
                let mut run = next + 1;
                while run < terms.len() && matches!(terms[run], TermKind::Emotion(_)) {
                    negated[run] = true;
                    run += 1;
                }
            } else if pos > 0 && terms[pos - 1].is_negatable() {
                negated[pos - 1] = true;
            }
        }

        negated
    }

    fn apply_terms(&self, terms: &[TermKind], negated: &[bool], intent: &mut Intent) {
        let vocab = &self.vocabulary;
        // Product of modifiers waiting for the next emotion
        let mut pending_multiplier: Option<f64> = None;
        // Intensity shared by a run of adjacent emotions ("bittersweet nostalgia")
        let mut run_intensity: Option<Option<f64>> = None;

        for (pos, kind) in terms.iter().enumerate() {
            match *kind {
                TermKind::Modifier(multiplier) => {
                    pending_multiplier = Some(pending_multiplier.unwrap_or(1.0) * multiplier);
                    run_intensity = None;
                }
                TermKind::Emotion(idx) => {
                    let intensity = match run_intensity {
                        Some(shared) => shared,
                        None => pending_multiplier
                            .take()
                            .map(|m| (vocab.base_intensity * m).clamp(0.0, 1.0)),
                    };
                    run_intensity = Some(intensity);

                    let spec = &vocab.emotions[idx];
                    if negated[pos] {
                        intent.exclusions.insert(spec.name.clone());
                    } else {
                        intent.add_mood(
                            MoodEntry {
                                name: spec.name.clone(),
                                class: spec.class,
                                intensity,
                                target_valence: spec.valence,
                                target_energy: spec.energy,
                                tempo: spec.tempo,
                                danceability: spec.danceability,
                            },
                            vocab.base_intensity,
                        );
                    }
                }
                TermKind::Genre(idx) => {
                    let name = vocab.genres[idx].name.clone();
                    if negated[pos] {
                        intent.exclusions.insert(name);
                    } else {
                        intent.genres.insert(name);
                    }
                    pending_multiplier = None;
                    run_intensity = None;
                }
                TermKind::Arc(arc) => {
                    // First cue wins: "build to a peak" is a build
                    if intent.arc.is_none() {
                        intent.arc = Some(arc);
                    }
                    pending_multiplier = None;
                    run_intensity = None;
                }
                TermKind::Decade(idx) => {
                    intent.decades.insert(vocab.decades[idx].1.clone());
                    pending_multiplier = None;
                    run_intensity = None;
                }
                TermKind::Negation => {
                    run_intensity = None;
                }
                TermKind::Other => {
                    pending_multiplier = None;
                    run_intensity = None;
                }
            }
        }

        // A genre both requested and excluded stays excluded
        let excluded: Vec<String> = intent.exclusions.iter().cloned().collect();
        intent.genres.retain(|g| !excluded.contains(g));
        intent.moods.retain(|m| !excluded.contains(&m.name));
    }
}
