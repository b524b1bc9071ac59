//! Chunk relevance ranking: BM25 + TF-IDF scoring with synonym expansion,
//! persona bonuses, and top-K summarization.
pub mod scorer;
pub mod summarizer;
pub mod synonyms;
pub mod tokenize;
pub mod writer;

use std::time::Instant;

use anyhow::Result;

use crate::config::RankerConfig;
use crate::types::{DocumentChunk, RankedResult};

pub use scorer::{rank_indices, score_chunks, CorpusStats};
pub use summarizer::{LeadSummarizer, OnnxSummarizer, Summarize};
pub use synonyms::{LexiconSynonyms, NoSynonyms, SynonymLookup};
pub use writer::{write_report, write_score_log, RankReport};

/// Output of one ranking run. `breakdowns` keeps the chunks' input order for
/// the diagnostic log; `results` is sorted by descending combined score.
pub struct RankingOutcome {
    pub results: Vec<RankedResult>,
    pub breakdowns: Vec<crate::types::ScoreBreakdown>,
    pub degraded: bool,
    pub elapsed_ms: u64,
}

/// Run the full ranking pipeline over one chunk collection. Summaries are
/// generated for the top-K results only; every chunk still gets a score
/// breakdown. Per-chunk summarization failures downgrade that chunk's
/// summary to empty rather than aborting the run.
pub fn run_ranking(
    query: &str,
    persona: &str,
    chunks: &[DocumentChunk],
    config: &RankerConfig,
    synonyms: &dyn SynonymLookup,
    summarizer: &mut dyn Summarize,
    degraded: bool,
) -> Result<RankingOutcome> {
    let start = Instant::now();

    let breakdowns = score_chunks(query, persona, config, synonyms, chunks);
    let order = rank_indices(&breakdowns);

    let mut results = Vec::with_capacity(order.len());
    for (rank, &idx) in order.iter().enumerate() {
        let summary = if rank < config.top_k {
            match summarizer.summarize(&chunks[idx].text) {
                Ok(s) => Some(s),
                Err(e) => {
                    eprintln!("⚠️ summarization failed for {}: {e}", chunks[idx].document);
                    Some(String::new())
                }
            }
        } else {
            None
        };
        results.push(RankedResult {
            chunk: chunks[idx].clone(),
            scores: breakdowns[idx],
            summary,
        });
    }

    Ok(RankingOutcome {
        results,
        breakdowns,
        degraded,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}
