// Synonym expansion capability
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;

use crate::error::DocsiftError;

/// Lexical-resource lookup behind a capability interface: terms in, synonym
/// set out. Implementations must be deterministic; scoring iterates returned
/// sets in sorted order.
pub trait SynonymLookup {
    fn lookup(&self, term: &str) -> BTreeSet<String>;
}

/// The documented fallback when no lexical resource is available: every
/// lookup is empty, so the synonym bonus contributes zero.
pub struct NoSynonyms;

impl SynonymLookup for NoSynonyms {
    fn lookup(&self, _term: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// File-backed lexicon: a JSON object mapping a term to its synonym list.
#[derive(Debug)]
pub struct LexiconSynonyms {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl LexiconSynonyms {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DocsiftError::ScoringDegraded(format!(
                "synonym lexicon {} unavailable: {e}",
                path.display()
            ))
        })?;
        let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw).map_err(|e| {
            DocsiftError::ScoringDegraded(format!(
                "synonym lexicon {} unreadable: {e}",
                path.display()
            ))
        })?;
        Ok(Self::from_entries(parsed))
    }

    pub fn from_entries(entries: BTreeMap<String, Vec<String>>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(term, synonyms)| {
                (
                    term.to_lowercase(),
                    synonyms.into_iter().map(|s| s.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { entries }
    }
}

impl SynonymLookup for LexiconSynonyms {
    fn lookup(&self, term: &str) -> BTreeSet<String> {
        self.entries
            .get(&term.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_always_empty() {
        assert!(NoSynonyms.lookup("vegetarian").is_empty());
    }

    #[test]
    fn lexicon_is_case_insensitive() {
        let mut entries = BTreeMap::new();
        entries.insert("Vegetarian".to_string(), vec!["Meatless".to_string()]);
        let lexicon = LexiconSynonyms::from_entries(entries);

        let found = lexicon.lookup("VEGETARIAN");
        assert!(found.contains("meatless"));
        assert!(lexicon.lookup("unknown").is_empty());
    }

    #[test]
    fn unreadable_file_degrades_not_fatal() {
        let err = LexiconSynonyms::from_file(Path::new("no/such/lexicon.json")).unwrap_err();
        let kind = err.downcast_ref::<DocsiftError>().unwrap();
        assert!(!kind.is_fatal());
    }
}
