// Batch outline extraction: one JSON outline per input PDF
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use docsift::outline::classifier::OnnxClassifier;
use docsift::outline::features::FeatureVariant;
use docsift::outline::OutlinePipeline;
use docsift::DocsiftError;

#[derive(Parser)]
#[command(name = "outline-extract")]
#[command(about = "Extract hierarchical heading outlines from a directory of PDFs")]
struct Args {
    /// Directory containing input PDFs
    #[arg(long, default_value = "input")]
    pdf_dir: PathBuf,

    /// Classifier artifact (ONNX)
    #[arg(long, default_value = "models/heading_classifier.onnx")]
    model: PathBuf,

    /// Directory for output JSON files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Feature variant: lite or full
    #[arg(long, default_value = "lite")]
    variant: String,

    /// Parallel worker count
    #[arg(long, default_value_t = 4)]
    jobs: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let variant = match args.variant.as_str() {
        "lite" => FeatureVariant::Lite,
        "full" => FeatureVariant::Full,
        other => {
            return Err(DocsiftError::Configuration(format!(
                "unknown feature variant '{other}', expected lite or full"
            ))
            .into())
        }
    };

    // Fail fast before touching any document.
    if !args.model.exists() {
        return Err(DocsiftError::Configuration(format!(
            "classifier artifact not found: {}",
            args.model.display()
        ))
        .into());
    }
    if !args.pdf_dir.is_dir() {
        return Err(DocsiftError::Configuration(format!(
            "input directory not found: {}",
            args.pdf_dir.display()
        ))
        .into());
    }
    std::fs::create_dir_all(&args.output_dir)?;

    let mut pdfs: Vec<PathBuf> = std::fs::read_dir(&args.pdf_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    pdfs.sort();

    if pdfs.is_empty() {
        bail!("no PDF files in {}", args.pdf_dir.display());
    }

    println!("📚 Processing {} PDFs ({} variant, {} workers)", pdfs.len(), args.variant, args.jobs.max(1));

    // Documents are independent: shard the sorted list across blocking
    // workers, each with its own classifier session. Output paths are unique
    // per document so there is no write contention.
    let jobs = args.jobs.max(1).min(pdfs.len());
    let mut handles = Vec::with_capacity(jobs);
    for shard in 0..jobs {
        let batch: Vec<PathBuf> = pdfs
            .iter()
            .skip(shard)
            .step_by(jobs)
            .cloned()
            .collect();
        let model = args.model.clone();
        let output_dir = args.output_dir.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            process_batch(&batch, &model, variant, &output_dir)
        }));
    }

    let mut done = 0usize;
    let mut failed = 0usize;
    for handle in handles {
        let (ok, bad) = handle.await??;
        done += ok;
        failed += bad;
    }

    println!("✅ Done: {done} extracted, {failed} failed");
    if done == 0 {
        bail!("all documents failed");
    }
    Ok(())
}

fn process_batch(
    pdfs: &[PathBuf],
    model: &Path,
    variant: FeatureVariant,
    output_dir: &Path,
) -> Result<(usize, usize)> {
    let classifier = OnnxClassifier::load(model, variant)?;
    let mut pipeline = OutlinePipeline::new(classifier, variant);

    let mut done = 0usize;
    let mut failed = 0usize;
    for pdf in pdfs {
        // Per-document failures never abort sibling documents.
        match pipeline.process(pdf) {
            Ok(report) => {
                let stem = pdf
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "document".into());
                let out_path = output_dir.join(format!("{stem}.json"));
                let json = serde_json::to_string_pretty(&report.document)?;
                std::fs::write(&out_path, json)?;
                if report.skipped_spans > 0 {
                    eprintln!(
                        "⚠️ {}: {} spans skipped (empty or zero-area)",
                        pdf.display(),
                        report.skipped_spans
                    );
                }
                println!(
                    "📄 {} -> {} ({} spans, {}ms)",
                    pdf.display(),
                    out_path.display(),
                    report.span_count,
                    report.elapsed_ms
                );
                done += 1;
            }
            Err(e) => {
                eprintln!("❌ {}: {e:#}", pdf.display());
                failed += 1;
            }
        }
    }
    Ok((done, failed))
}
