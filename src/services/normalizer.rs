//! Title normalization
//!
//! Reduces a track title to a canonical key by stripping version qualifiers
//! ("Radio Edit", "2011 Remaster", "(Monster Mix)") so different releases of
//! one song compare equal.

use crate::error::Result;
use regex::Regex;

/// Vocabulary of version qualifiers stripped from titles.
#[derive(Debug, Clone)]
pub struct NormalizerRules {
    /// Words/phrases that mark a parenthetical or dash suffix as a version tag
    pub qualifiers: Vec<String>,
    /// Treat a segment holding only a four-digit year as a version tag
    pub strip_years: bool,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        Self {
            qualifiers: [
                "radio edit",
                "album version",
                "single version",
                "edit",
                "mix",
                "remix",
                "remaster",
                "feat",
                "featuring",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            strip_years: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackNormalizer {
    qualifier: Regex,
    bare_year: Option<Regex>,
    bracketed: Regex,
    dash_suffix: Regex,
    whitespace: Regex,
}

impl TrackNormalizer {
    pub fn new(rules: &NormalizerRules) -> Result<Self> {
        let mut alternatives: Vec<String> = rules
            .qualifiers
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(|q| regex::escape(q).replace(' ', r"\s+"))
            .collect();
        // An empty alternation would match everything
        if alternatives.is_empty() {
            alternatives.push(r"\b\B".to_string());
        }

        // "remastered", "mixes", "edited" count as their stem
        let qualifier = Regex::new(&format!(
            r"(?i)\b(?:{})(?:ed|es|s)?\b",
            alternatives.join("|")
        ))?;

        let bare_year = if rules.strip_years {
            Some(Regex::new(r"^\s*\d{4}\s*$")?)
        } else {
            None
        };

        Ok(Self {
            qualifier,
            bare_year,
            bracketed: Regex::new(r"[\(\[]([^\(\)\[\]]*)[\)\]]")?,
            dash_suffix: Regex::new(r"^(.*)\s+[-–—]\s*(.*)$")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Canonical key for a title. Idempotent.
    pub fn normalize(&self, title: &str) -> String {
        let mut current = title.to_string();

        // Strip until nothing changes; removing one tag can expose another
        loop {
            let stripped = self.strip_dash_suffixes(&self.strip_bracketed(&current));
            if stripped == current {
                break;
            }
            current = stripped;
        }

        self.whitespace
            .replace_all(current.trim(), " ")
            .to_lowercase()
    }

    fn is_version_tag(&self, segment: &str) -> bool {
        self.qualifier.is_match(segment)
            || self.bare_year.as_ref().map_or(false, |year| year.is_match(segment))
    }

    fn strip_bracketed(&self, title: &str) -> String {
        self.bracketed
            .replace_all(title, |caps: &regex::Captures| {
                if self.is_version_tag(&caps[1]) {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    fn strip_dash_suffixes(&self, title: &str) -> String {
        let mut current = title.trim_end().to_string();
        while let Some(caps) = self.dash_suffix.captures(&current) {
            if !self.is_version_tag(&caps[2]) {
                break;
            }
            current = caps[1].trim_end().to_string();
        }
        current
    }
}
