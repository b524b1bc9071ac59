// Configuration for docsift runs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::DocsiftError;

// Span enrichment
pub const MIN_BODY_FONT_PT: f32 = 6.0;
pub const DEFAULT_BODY_FONT_PT: f32 = 12.0;
/// Sentinel vertical gap used at page boundaries.
pub const PAGE_EDGE_GAP: f32 = 100.0;

// Rule-based post-filter defaults
pub const FOOTER_BAND_RATIO: f32 = 0.08;
pub const MIN_STYLE_RATIO: f32 = 1.05;

// Scoring defaults; every one of these can be overridden in the TOML config
pub const DEFAULT_BM25_K1: f64 = 1.5;
pub const DEFAULT_BM25_B: f64 = 0.75;
pub const DEFAULT_W_BM25: f64 = 1.0;
pub const DEFAULT_W_TFIDF: f64 = 1.0;
pub const DEFAULT_SYNONYM_WEIGHT: f64 = 0.3;
pub const DEFAULT_PERSONA_WEIGHT: f64 = 0.5;
pub const DEFAULT_RELEVANT_WEIGHT: f64 = 0.25;
pub const DEFAULT_PENALTY_WEIGHT: f64 = 0.5;
pub const DEFAULT_TOP_K: usize = 5;

/// Fixed constants combining the individual scoring signals. Not learned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub w_bm25: f64,
    pub w_tfidf: f64,
    /// Contribution of an expanded-synonym match; less than an exact match.
    pub synonym_weight: f64,
    pub persona_weight: f64,
    pub relevant_weight: f64,
    pub penalty_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            bm25_k1: DEFAULT_BM25_K1,
            bm25_b: DEFAULT_BM25_B,
            w_bm25: DEFAULT_W_BM25,
            w_tfidf: DEFAULT_W_TFIDF,
            synonym_weight: DEFAULT_SYNONYM_WEIGHT,
            persona_weight: DEFAULT_PERSONA_WEIGHT,
            relevant_weight: DEFAULT_RELEVANT_WEIGHT,
            penalty_weight: DEFAULT_PENALTY_WEIGHT,
        }
    }
}

/// Paths to the opaque summarization artifact (seq2seq encoder/decoder pair
/// plus its tokenizer vocabulary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerPaths {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
    pub tokenizer: PathBuf,
}

/// Immutable run configuration for the relevance ranker, constructed once at
/// startup and passed by reference to each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Persona name to activity-keyword list.
    #[serde(default)]
    pub personas: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub relevant_terms: Vec<String>,
    #[serde(default)]
    pub irrelevant_terms: Vec<String>,
    /// JSON lexicon (term -> synonyms). Unreadable lexicon degrades the run
    /// instead of aborting it.
    #[serde(default)]
    pub synonym_lexicon: Option<PathBuf>,
    /// Required by the chunk-rank binary; tests inject stub summarizers.
    #[serde(default)]
    pub summarizer: Option<SummarizerPaths>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            top_k: DEFAULT_TOP_K,
            personas: BTreeMap::new(),
            relevant_terms: Vec::new(),
            irrelevant_terms: Vec::new(),
            synonym_lexicon: None,
            summarizer: None,
        }
    }
}

impl RankerConfig {
    /// Load the TOML config. A missing or malformed file is a fatal
    /// configuration error: no useful output can be produced without it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DocsiftError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: RankerConfig = toml::from_str(&raw).map_err(|e| {
            DocsiftError::Configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    pub fn activity_keywords(&self, persona: &str) -> &[String] {
        self.personas.get(persona).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn summarizer_paths(&self) -> Result<&SummarizerPaths> {
        self.summarizer
            .as_ref()
            .ok_or_else(|| {
                DocsiftError::Configuration("no summarizer artifact configured".into())
            })
            .context("summarizer is required")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config: RankerConfig = toml::from_str("").unwrap();
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.weights.bm25_k1, DEFAULT_BM25_K1);
        assert!(config.personas.is_empty());
    }

    #[test]
    fn parses_personas_and_weights() {
        let raw = r#"
            top_k = 3
            relevant_terms = ["menu"]
            irrelevant_terms = ["meat"]

            [weights]
            penalty_weight = 0.9

            [personas]
            "Food Contractor" = ["buffet", "vegetarian"]
        "#;
        let config: RankerConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.weights.penalty_weight, 0.9);
        assert_eq!(config.weights.bm25_b, DEFAULT_BM25_B);
        assert_eq!(config.activity_keywords("Food Contractor").len(), 2);
        assert!(config.activity_keywords("Unknown").is_empty());
    }

    #[test]
    fn missing_config_is_fatal() {
        let err = RankerConfig::load(Path::new("does/not/exist.toml")).unwrap_err();
        let kind = err.downcast_ref::<DocsiftError>().unwrap();
        assert!(kind.is_fatal());
    }
}
