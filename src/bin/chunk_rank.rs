// Relevance ranking over a chunk collection for one query/persona pair
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use docsift::config::RankerConfig;
use docsift::ranking::{
    run_ranking, write_report, write_score_log, LexiconSynonyms, NoSynonyms, OnnxSummarizer,
    RankReport, SynonymLookup,
};
use docsift::DocumentChunk;

#[derive(Parser)]
#[command(name = "chunk-rank")]
#[command(about = "Rank document chunks by relevance to a query and persona")]
struct Args {
    /// JSON file with the chunk collection
    #[arg(long)]
    chunks: PathBuf,

    /// Ranker configuration (TOML)
    #[arg(long, default_value = "ranker.toml")]
    config: PathBuf,

    /// Query text
    #[arg(long)]
    query: String,

    /// Persona name, resolved against the configured persona map
    #[arg(long, default_value = "")]
    persona: String,

    /// Directory for result.json and the score log
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration problems abort before any chunk is touched.
    let config = RankerConfig::load(&args.config)?;
    let paths = config.summarizer_paths()?;
    let mut summarizer = OnnxSummarizer::load(paths)?;

    // An unreadable lexicon degrades the run instead of aborting it.
    let (synonyms, degraded): (Box<dyn SynonymLookup>, bool) = match &config.synonym_lexicon {
        Some(path) => match LexiconSynonyms::from_file(path) {
            Ok(lexicon) => (Box::new(lexicon), false),
            Err(e) => {
                eprintln!("⚠️ synonym lookup unavailable, continuing degraded: {e:#}");
                (Box::new(NoSynonyms), true)
            }
        },
        None => (Box::new(NoSynonyms), false),
    };

    let raw = std::fs::read_to_string(&args.chunks)
        .with_context(|| format!("cannot read {}", args.chunks.display()))?;
    let chunks: Vec<DocumentChunk> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid chunk collection {}", args.chunks.display()))?;

    println!("🔍 Ranking {} chunks for query \"{}\"", chunks.len(), args.query);

    let outcome = run_ranking(
        &args.query,
        &args.persona,
        &chunks,
        &config,
        synonyms.as_ref(),
        &mut summarizer,
        degraded,
    )?;

    let report = RankReport::new(
        &args.query,
        &args.persona,
        &outcome.results,
        chunks.len(),
        outcome.elapsed_ms,
    );
    write_report(&args.output_dir, &report)?;
    write_score_log(&args.output_dir, &chunks, &outcome.breakdowns, outcome.degraded)?;

    println!(
        "✅ Wrote {} ranked sections to {} ({}ms)",
        report.ranked_sections.len(),
        args.output_dir.display(),
        outcome.elapsed_ms
    );
    Ok(())
}
