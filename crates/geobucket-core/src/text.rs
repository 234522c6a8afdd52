// crates/geobucket-core/src/text.rs

//! # Location Name Normalization
//!
//! Turns free-form location names into a canonical token string so that
//! `"Sangotedo, Ajah"`, `"AJAH  sangotedo"` and `"Sangotedo Ajah Lagos"` all
//! compare equal.

use crate::config::GeoBucketConfig;
use crate::error::ValidationError;
use std::collections::BTreeSet;

/// Fold letters to ASCII and lowercase the result.
///
/// Only alphabetic characters are transliterated with `deunicode`
/// (`Ìkòyí` -> `ikoyi`, `Straße` -> `strasse`). Symbols such as `©` are left
/// alone so they still act as separators, numeric characters such as `½`
/// stay single tokens, and stray combining marks are dropped.
pub fn fold_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() || (c.is_numeric() && !c.is_alphabetic()) {
            out.push(c);
            continue;
        }
        match deunicode::deunicode_char(c) {
            Some(folded) if c.is_alphabetic() => out.push_str(folded),
            Some("") => {}
            _ => out.push(c),
        }
    }
    out.to_lowercase()
}

/// Canonicalizes location names.
///
/// The pipeline, in order:
/// 1. fold to ASCII (when enabled) and lowercase, then trim
/// 2. replace every character that is not a letter, digit or whitespace with a space
/// 3. split on whitespace
/// 4. drop configured stop words
/// 5. dedupe and sort the tokens, join with single spaces
///
/// The output is idempotent under the same normalizer and never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    stop_words: BTreeSet<String>,
    fold_diacritics: bool,
}

impl Normalizer {
    pub fn new<I, S>(stop_words: I, fold_diacritics: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Stop words go through the same casing as tokens or they would never match.
        let stop_words = stop_words
            .into_iter()
            .map(|w| lower(w.as_ref().trim(), fold_diacritics))
            .filter(|w| !w.is_empty())
            .collect();
        Normalizer {
            stop_words,
            fold_diacritics,
        }
    }

    pub fn from_config(config: &GeoBucketConfig) -> Self {
        Self::new(&config.stop_words, config.fold_diacritics)
    }

    pub fn stop_words(&self) -> &BTreeSet<String> {
        &self.stop_words
    }

    /// Canonical token string for `raw`. Empty when every token is a stop word.
    pub fn normalize(&self, raw: &str) -> String {
        self.canonical_tokens(raw, true)
    }

    /// Like [`Normalizer::normalize`] but keeps stop words.
    ///
    /// Used when the filtered form comes out empty, so a place literally
    /// named "Lagos" still gets a usable name.
    pub fn fallback(&self, raw: &str) -> String {
        self.canonical_tokens(raw, false)
    }

    /// Name to store for a listing: the normalized form, else the fallback.
    pub fn listing_name(&self, raw: &str) -> Result<String, ValidationError> {
        let name = self.query_form(raw);
        if name.is_empty() {
            Err(ValidationError::EmptyName)
        } else {
            Ok(name)
        }
    }

    /// Form a search query is matched with. Mirrors [`Normalizer::listing_name`]
    /// so fallback-named buckets stay reachable; may be empty.
    pub fn query_form(&self, raw: &str) -> String {
        let normalized = self.normalize(raw);
        if normalized.is_empty() {
            self.fallback(raw)
        } else {
            normalized
        }
    }

    fn canonical_tokens(&self, raw: &str, drop_stop_words: bool) -> String {
        let lowered = lower(raw, self.fold_diacritics);
        let cleaned: String = lowered
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        let tokens: BTreeSet<&str> = cleaned
            .split_whitespace()
            .filter(|t| !drop_stop_words || !self.stop_words.contains(*t))
            .collect();

        tokens.into_iter().collect::<Vec<_>>().join(" ")
    }
}

fn lower(s: &str, fold_diacritics: bool) -> String {
    if fold_diacritics {
        fold_key(s)
    } else {
        s.to_lowercase()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&GeoBucketConfig::default())
    }
}
