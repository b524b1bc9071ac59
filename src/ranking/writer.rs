// Final ranking artifacts: result.json and the per-chunk score log
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{DocumentChunk, RankedResult, ScoreBreakdown};

pub const RESULT_FILE: &str = "result.json";
pub const SCORE_LOG_FILE: &str = "chunk_scores_output.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankMetadata {
    pub query: String,
    pub persona: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSectionOut {
    pub document: String,
    pub section_title: String,
    pub combined_score: f64,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub chunk_count: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankReport {
    pub metadata: RankMetadata,
    pub ranked_sections: Vec<RankedSectionOut>,
    pub stats: RunStats,
}

impl RankReport {
    pub fn new(
        query: &str,
        persona: &str,
        results: &[RankedResult],
        chunk_count: usize,
        processing_time_ms: u64,
    ) -> Self {
        let ranked_sections = results
            .iter()
            .map(|r| RankedSectionOut {
                document: r.chunk.document.clone(),
                section_title: r.chunk.section_title.clone(),
                combined_score: r.scores.combined_score,
                summary: r.summary.clone().unwrap_or_default(),
            })
            .collect();
        Self {
            metadata: RankMetadata {
                query: query.to_string(),
                persona: persona.to_string(),
            },
            ranked_sections,
            stats: RunStats {
                chunk_count,
                processing_time_ms,
            },
        }
    }
}

pub fn write_report(output_dir: &Path, report: &RankReport) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create {}", output_dir.display()))?;
    let path = output_dir.join(RESULT_FILE);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// Write the diagnostic score log: one tab-separated line per chunk, in the
/// chunks' original input order, every chunk included even at zero score.
pub fn write_score_log(
    output_dir: &Path,
    chunks: &[DocumentChunk],
    breakdowns: &[ScoreBreakdown],
    degraded: bool,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create {}", output_dir.display()))?;

    let mut log = String::new();
    log.push_str(&format!(
        "# chunk scores generated {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if degraded {
        log.push_str("# degraded run: synonym lookup unavailable, synonym_bonus forced to 0\n");
    }
    log.push_str(
        "# document\tsection_title\tbm25_score\ttfidf_score\tsynonym_bonus\tpersona_bonus\tpenalty_total\tcombined_score\n",
    );
    for (chunk, scores) in chunks.iter().zip(breakdowns) {
        log.push_str(&format!(
            "{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\n",
            chunk.document,
            chunk.section_title,
            scores.bm25_score,
            scores.tfidf_score,
            scores.synonym_bonus,
            scores.persona_bonus,
            scores.penalty_total,
            scores.combined_score,
        ));
    }

    let path = output_dir.join(SCORE_LOG_FILE);
    fs::write(&path, log).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
