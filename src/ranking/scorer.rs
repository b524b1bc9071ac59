// Chunk relevance scoring - BM25, TF-IDF overlap, synonym/persona signals
//
// Corpus statistics come from the chunk set of the current run only; the
// whole set is tokenized before any score is computed. All collection
// iteration is over sorted maps so float accumulation order, and therefore
// every score, is bit-identical across runs.
use std::collections::{BTreeMap, BTreeSet};

use crate::config::RankerConfig;
use crate::ranking::synonyms::SynonymLookup;
use crate::ranking::tokenize::{phrase_tokens, tokenize};
use crate::types::{DocumentChunk, ScoreBreakdown};

/// Corpus-wide term statistics over this run's chunk collection. Building
/// this is the synchronization barrier: every chunk is tokenized here before
/// per-chunk scoring starts.
pub struct CorpusStats {
    tokens: Vec<Vec<String>>,
    /// Unfiltered token sequences, for phrase matching; keyword phrases may
    /// contain stopwords that [`tokenize`] strips.
    raw_tokens: Vec<Vec<String>>,
    term_freq: Vec<BTreeMap<String, usize>>,
    doc_freq: BTreeMap<String, usize>,
    avg_len: f64,
}

impl CorpusStats {
    pub fn build(chunks: &[DocumentChunk]) -> Self {
        let tokens: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();
        let raw_tokens: Vec<Vec<String>> = chunks.iter().map(|c| phrase_tokens(&c.text)).collect();
        let term_freq: Vec<BTreeMap<String, usize>> = tokens
            .iter()
            .map(|toks| {
                let mut tf = BTreeMap::new();
                for t in toks {
                    *tf.entry(t.clone()).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        let mut doc_freq = BTreeMap::new();
        for tf in &term_freq {
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0usize) += 1;
            }
        }

        let total: usize = tokens.iter().map(Vec::len).sum();
        let avg_len = if tokens.is_empty() {
            0.0
        } else {
            total as f64 / tokens.len() as f64
        };

        Self {
            tokens,
            raw_tokens,
            term_freq,
            doc_freq,
            avg_len,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.tokens.len()
    }

    fn bm25_idf(&self, term: &str) -> f64 {
        let n = self.chunk_count() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn tfidf_idf(&self, term: &str) -> f64 {
        let n = self.chunk_count() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        (n / (1.0 + df)).ln() + 1.0
    }
}

/// Score every chunk against the query and persona. Output order matches
/// input order; every chunk gets a breakdown even when all signals are zero.
pub fn score_chunks(
    query: &str,
    persona: &str,
    config: &RankerConfig,
    synonyms: &dyn SynonymLookup,
    chunks: &[DocumentChunk],
) -> Vec<ScoreBreakdown> {
    let corpus = CorpusStats::build(chunks);
    let weights = &config.weights;

    let mut query_tf: BTreeMap<String, usize> = BTreeMap::new();
    for token in tokenize(query) {
        *query_tf.entry(token).or_insert(0) += 1;
    }

    // Expand query terms once; an expansion that is itself a query term would
    // double-count an exact match, so those are dropped.
    let mut expansions: BTreeSet<String> = BTreeSet::new();
    for term in query_tf.keys() {
        for synonym in synonyms.lookup(term) {
            if !query_tf.contains_key(&synonym) {
                expansions.insert(synonym);
            }
        }
    }

    let activities: Vec<Vec<String>> = config
        .activity_keywords(persona)
        .iter()
        .map(|k| phrase_tokens(k))
        .collect();
    let relevant: Vec<Vec<String>> = config.relevant_terms.iter().map(|t| phrase_tokens(t)).collect();
    let irrelevant: Vec<Vec<String>> = config
        .irrelevant_terms
        .iter()
        .map(|t| phrase_tokens(t))
        .collect();

    (0..chunks.len())
        .map(|i| {
            let tf = &corpus.term_freq[i];
            let chunk_tokens = &corpus.raw_tokens[i];
            let chunk_len = corpus.tokens[i].len() as f64;

            let bm25_score = bm25(&query_tf, tf, chunk_len, &corpus, weights.bm25_k1, weights.bm25_b);
            let tfidf_score = tfidf_cosine(&query_tf, tf, &corpus);

            let synonym_bonus = weights.synonym_weight
                * expansions
                    .iter()
                    .filter(|syn| contains_phrase(chunk_tokens, &phrase_tokens(syn)))
                    .count() as f64;

            let persona_bonus = weights.persona_weight
                * count_matches(chunk_tokens, &activities) as f64
                + weights.relevant_weight * count_matches(chunk_tokens, &relevant) as f64;

            let penalty_total =
                weights.penalty_weight * count_matches(chunk_tokens, &irrelevant) as f64;

            let combined_score = weights.w_bm25 * bm25_score
                + weights.w_tfidf * tfidf_score
                + synonym_bonus
                + persona_bonus
                - penalty_total;

            ScoreBreakdown {
                bm25_score,
                tfidf_score,
                synonym_bonus,
                persona_bonus,
                penalty_total,
                combined_score,
            }
        })
        .collect()
}

/// Ranking order: indices sorted by descending combined score. The sort is
/// stable, so equal scores keep their original chunk order.
pub fn rank_indices(breakdowns: &[ScoreBreakdown]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..breakdowns.len()).collect();
    order.sort_by(|&a, &b| {
        breakdowns[b]
            .combined_score
            .partial_cmp(&breakdowns[a].combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

fn bm25(
    query_tf: &BTreeMap<String, usize>,
    chunk_tf: &BTreeMap<String, usize>,
    chunk_len: f64,
    corpus: &CorpusStats,
    k1: f64,
    b: f64,
) -> f64 {
    if corpus.avg_len == 0.0 {
        return 0.0;
    }
    let mut score = 0.0;
    for term in query_tf.keys() {
        let tf = chunk_tf.get(term).copied().unwrap_or(0) as f64;
        if tf == 0.0 {
            continue;
        }
        let norm = tf + k1 * (1.0 - b + b * chunk_len / corpus.avg_len);
        score += corpus.bm25_idf(term) * tf * (k1 + 1.0) / norm;
    }
    score
}

/// Cosine similarity between the query and chunk TF-IDF vectors, with this
/// run's corpus as the IDF basis.
fn tfidf_cosine(
    query_tf: &BTreeMap<String, usize>,
    chunk_tf: &BTreeMap<String, usize>,
    corpus: &CorpusStats,
) -> f64 {
    let mut dot = 0.0;
    let mut query_norm = 0.0;
    for (term, &qtf) in query_tf {
        let idf = corpus.tfidf_idf(term);
        let qw = qtf as f64 * idf;
        query_norm += qw * qw;
        if let Some(&ctf) = chunk_tf.get(term) {
            dot += qw * ctf as f64 * idf;
        }
    }
    let mut chunk_norm = 0.0;
    for (term, &ctf) in chunk_tf {
        let cw = ctf as f64 * corpus.tfidf_idf(term);
        chunk_norm += cw * cw;
    }
    if dot == 0.0 || query_norm == 0.0 || chunk_norm == 0.0 {
        return 0.0;
    }
    dot / (query_norm.sqrt() * chunk_norm.sqrt())
}

fn count_matches(chunk_tokens: &[String], phrases: &[Vec<String>]) -> usize {
    phrases
        .iter()
        .filter(|p| !p.is_empty() && contains_phrase(chunk_tokens, p))
        .count()
}

fn contains_phrase(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringWeights;
    use crate::ranking::synonyms::{LexiconSynonyms, NoSynonyms};

    fn chunk(document: &str, text: &str) -> DocumentChunk {
        DocumentChunk {
            document: document.into(),
            section_title: format!("{document} section"),
            text: text.into(),
            page_start: 1,
            page_end: 1,
        }
    }

    fn plain_config() -> RankerConfig {
        RankerConfig::default()
    }

    #[test]
    fn bm25_rewards_term_frequency() {
        let chunks = vec![
            chunk("a", "vegetarian dishes and vegetarian platters"),
            chunk("b", "vegetarian option listed once here today"),
            chunk("c", "nothing relevant whatsoever inside here"),
        ];
        let scores = score_chunks("vegetarian", "", &plain_config(), &NoSynonyms, &chunks);
        assert!(scores[0].bm25_score > scores[1].bm25_score);
        assert!(scores[1].bm25_score > 0.0);
        assert_eq!(scores[2].bm25_score, 0.0);
    }

    #[test]
    fn tfidf_cosine_is_bounded() {
        let chunks = vec![
            chunk("a", "gluten free menu"),
            chunk("b", "completely unrelated content"),
        ];
        let scores = score_chunks("gluten free menu", "", &plain_config(), &NoSynonyms, &chunks);
        assert!(scores[0].tfidf_score > 0.0 && scores[0].tfidf_score <= 1.0 + 1e-9);
        assert_eq!(scores[1].tfidf_score, 0.0);
    }

    #[test]
    fn scores_are_reproducible() {
        let chunks = vec![
            chunk("a", "vegetarian buffet planning for corporate events"),
            chunk("b", "hotels near the conference venue downtown"),
        ];
        let config = plain_config();
        let first = score_chunks("vegetarian buffet", "", &config, &NoSynonyms, &chunks);
        let second = score_chunks("vegetarian buffet", "", &config, &NoSynonyms, &chunks);
        assert_eq!(first, second);
    }

    #[test]
    fn synonym_match_is_fractional() {
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("vegetarian".to_string(), vec!["meatless".to_string()]);
        let lexicon = LexiconSynonyms::from_entries(entries);

        let chunks = vec![
            chunk("exact", "vegetarian menu planning"),
            chunk("synonym", "meatless menu planning"),
        ];
        let config = plain_config();
        let scores = score_chunks("vegetarian", "", &config, &lexicon, &chunks);

        assert_eq!(scores[0].synonym_bonus, 0.0);
        assert_eq!(scores[1].synonym_bonus, config.weights.synonym_weight);
        // Exact match outranks the synonym-only chunk.
        assert!(scores[0].combined_score > scores[1].combined_score);
    }

    #[test]
    fn persona_and_penalty_terms_apply() {
        let mut config = plain_config();
        config
            .personas
            .insert("Food Contractor".into(), vec!["buffet".into()]);
        config.irrelevant_terms = vec!["meat".into()];
        config.relevant_terms = vec!["menu".into()];

        let chunks = vec![chunk("a", "buffet menu with meat options")];
        let scores = score_chunks("catering", "Food Contractor", &config, &NoSynonyms, &chunks);

        let w = &config.weights;
        assert_eq!(scores[0].persona_bonus, w.persona_weight + w.relevant_weight);
        assert_eq!(scores[0].penalty_total, w.penalty_weight);
    }

    #[test]
    fn weights_flow_from_configuration() {
        let mut config = plain_config();
        config.weights = ScoringWeights {
            penalty_weight: 2.5,
            ..ScoringWeights::default()
        };
        config.irrelevant_terms = vec!["meat".into()];

        let chunks = vec![chunk("a", "meat heavy dish")];
        let scores = score_chunks("anything", "", &config, &NoSynonyms, &chunks);
        assert_eq!(scores[0].penalty_total, 2.5);
    }

    #[test]
    fn stable_rank_on_ties() {
        let breakdowns = vec![
            ScoreBreakdown { combined_score: 1.0, ..Default::default() },
            ScoreBreakdown { combined_score: 2.0, ..Default::default() },
            ScoreBreakdown { combined_score: 1.0, ..Default::default() },
        ];
        assert_eq!(rank_indices(&breakdowns), vec![1, 0, 2]);
    }

    #[test]
    fn empty_corpus_scores_nothing() {
        let scores = score_chunks("query", "", &plain_config(), &NoSynonyms, &[]);
        assert!(scores.is_empty());
    }
}
