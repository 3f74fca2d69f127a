use crate::error::UnresolvedLocationCode;
use crate::geo_data::{self, COUNTRIES};
use lazy_static::lazy_static;
use regex::Regex;
use strsim::jaro_winkler;
use tracing::{debug, warn};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Approximate country-name lookup used once aliases and the exact catalog
/// match have failed.
pub trait CountryLookup {
    /// Lowercase alpha-2 code of the best candidate, if any.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Fuzzy matcher over every name variant in the ISO catalog.
pub struct FuzzyCountryLookup {
    /// Jaro-Winkler score (0.0-1.0) a misspelt word must reach
    pub similarity_threshold: f64,
    /// Queries and misspelt words shorter than this are never matched loosely
    pub min_substring_len: usize,
}

impl Default for FuzzyCountryLookup {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.95,
            min_substring_len: 4,
        }
    }
}

impl FuzzyCountryLookup {
    pub fn new(threshold: f64) -> Self {
        Self {
            similarity_threshold: threshold,
            ..Self::default()
        }
    }

    /// Normalize a name for comparison
    /// - Lowercases and folds the accented letters found in country names
    /// - Replaces punctuation with spaces
    /// - Collapses whitespace
    pub fn normalize_name(&self, s: &str) -> String {
        let folded: String = s
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'á' | 'à' | 'â' | 'ã' | 'å' | 'ä' => 'a',
                'é' | 'è' | 'ê' | 'ë' => 'e',
                'í' | 'ì' | 'î' | 'ï' => 'i',
                'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
                'ú' | 'ù' | 'û' | 'ü' => 'u',
                'ç' => 'c',
                'ñ' => 'n',
                c if c.is_alphanumeric() || c.is_whitespace() => c,
                _ => ' ',
            })
            .collect();

        WHITESPACE.replace_all(&folded, " ").trim().to_string()
    }

    fn candidates(&self) -> impl Iterator<Item = (String, &'static str)> + '_ {
        COUNTRIES.iter().flat_map(move |entry| {
            entry
                .name_variants()
                .map(move |variant| (self.normalize_name(variant), entry.alpha_2))
        })
    }
}

impl CountryLookup for FuzzyCountryLookup {
    fn lookup(&self, name: &str) -> Option<String> {
        let query = self.normalize_name(name);
        if query.is_empty() {
            return None;
        }

        // Exact match on any spelling
        if let Some((_, code)) = self.candidates().find(|(candidate, _)| *candidate == query) {
            return Some(code.to_lowercase());
        }

        // Containment; the shortest containing name is the most specific
        if query.chars().count() >= self.min_substring_len {
            let contained = self
                .candidates()
                .filter(|(candidate, _)| candidate.contains(&query))
                .min_by_key(|(candidate, _)| candidate.len());
            if let Some((candidate, code)) = contained {
                debug!("'{}' matched '{}' by containment", name, candidate);
                return Some(code.to_lowercase());
            }
        }

        let mut best: Option<(&'static str, f64)> = None;
        for (candidate, code) in self.candidates() {
            let score = match self.token_similarity(&query, &candidate) {
                Some(score) => score,
                None => continue,
            };
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((code, score));
            }
        }

        best.map(|(code, score)| {
            debug!("'{}' fuzzy-matched {} with score {:.3}", name, code, score);
            code.to_lowercase()
        })
    }
}

impl FuzzyCountryLookup {
    /// Similarity of two normalized names, or `None` when they cannot be the
    /// same country. Both must have the same words in the same order with at
    /// most one misspelt word, and that word must reach the threshold. Short
    /// words must match exactly.
    fn token_similarity(&self, query: &str, candidate: &str) -> Option<f64> {
        let query_tokens: Vec<&str> = query.split(' ').collect();
        let candidate_tokens: Vec<&str> = candidate.split(' ').collect();
        if query_tokens.len() != candidate_tokens.len() {
            return None;
        }

        let mut differing = query_tokens
            .iter()
            .zip(&candidate_tokens)
            .filter(|(q, c)| q != c);
        let score = match (differing.next(), differing.next()) {
            (None, _) => 1.0,
            (Some((q, c)), None) => {
                if q.chars().count() < self.min_substring_len {
                    return None;
                }
                jaro_winkler(q, c)
            }
            (Some(_), Some(_)) => return None,
        };
        (score >= self.similarity_threshold).then_some(score)
    }
}

/// Result of resolving one country/region name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved(UnresolvedLocationCode),
}

/// Maps free-text country names to ISO alpha-2 codes.
///
/// Precedence: alias table, exact catalog name, injected fuzzy lookup.
pub struct CountryResolver<L: CountryLookup = FuzzyCountryLookup> {
    lookup: L,
}

impl Default for CountryResolver<FuzzyCountryLookup> {
    fn default() -> Self {
        Self::new(FuzzyCountryLookup::default())
    }
}

impl<L: CountryLookup> CountryResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, name: &str) -> Resolution {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Resolution::Unresolved(UnresolvedLocationCode {
                name: name.to_string(),
                reason: "empty country/region name".to_string(),
            });
        }

        if let Some(code) = geo_data::alias_code(&key) {
            return Resolution::Resolved(code.to_string());
        }
        if let Some(code) = geo_data::catalog_code(&key) {
            return Resolution::Resolved(code.to_string());
        }

        match self.lookup.lookup(&key) {
            Some(code) => Resolution::Resolved(code.to_lowercase()),
            None => {
                warn!("{} was not found to a matched area", key);
                Resolution::Unresolved(UnresolvedLocationCode {
                    name: key,
                    reason: "no alias, catalog or fuzzy candidate".to_string(),
                })
            }
        }
    }
}
