// Outline extraction pipeline
pub mod assembler;
pub mod classifier;
pub mod features;
pub mod layout;
pub mod rules;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use ndarray::Array2;

use crate::types::{Label, OutlineDocument, Prediction, Span};
use classifier::Classify;
use features::{DocumentStats, FeatureBuilder, FeatureVariant, HeadingContext};
use rules::RuleThresholds;

/// Outcome of one document's pass, with extraction diagnostics.
#[derive(Debug, Clone)]
pub struct OutlineReport {
    pub document: OutlineDocument,
    pub span_count: usize,
    /// Spans excluded from classification (empty text or zero-area box).
    pub skipped_spans: usize,
    pub elapsed_ms: u64,
}

/// extract -> features -> classify -> rule filter -> assemble, for one
/// document at a time. Holds no cross-document state, so instances can run
/// concurrently on distinct documents.
pub struct OutlinePipeline<C: Classify> {
    classifier: C,
    builder: FeatureBuilder,
    thresholds: RuleThresholds,
}

impl<C: Classify> OutlinePipeline<C> {
    pub fn new(classifier: C, variant: FeatureVariant) -> Self {
        Self {
            classifier,
            builder: FeatureBuilder::new(variant),
            thresholds: RuleThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: RuleThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn process(&mut self, pdf_path: &Path) -> Result<OutlineReport> {
        let spans = layout::extract_spans(pdf_path)
            .with_context(|| format!("extracting {}", pdf_path.display()))?;
        self.process_spans(&spans)
    }

    /// Run the pipeline over pre-extracted spans (document order).
    pub fn process_spans(&mut self, spans: &[Span]) -> Result<OutlineReport> {
        let start = Instant::now();
        let stats = DocumentStats::compute(spans);

        let (proposals, skipped_spans) = if self.builder.variant().uses_heading_context() {
            self.classify_sequential(spans, &stats)?
        } else {
            self.classify_batch(spans, &stats)?
        };

        let filtered = rules::apply(spans, &proposals, &stats, &self.thresholds);
        let document = assembler::assemble(spans, &filtered);

        Ok(OutlineReport {
            document,
            span_count: spans.len(),
            skipped_spans,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Lite path: one batched model call for the whole document.
    fn classify_batch(
        &mut self,
        spans: &[Span],
        stats: &DocumentStats,
    ) -> Result<(Vec<Prediction>, usize)> {
        let context = HeadingContext::start(stats);
        let cols = self.builder.variant().len();
        let mut flat = Vec::new();
        let mut row_for_span = Vec::with_capacity(spans.len());
        let mut skipped = 0;

        for (i, span) in spans.iter().enumerate() {
            match self.builder.features(span, i, stats, &context) {
                Some(features) => {
                    row_for_span.push(Some(flat.len() / cols));
                    flat.extend(features);
                }
                None => {
                    row_for_span.push(None);
                    skipped += 1;
                }
            }
        }

        let rows = flat.len() / cols;
        let matrix = Array2::from_shape_vec((rows, cols), flat)?;
        let batch = self.classifier.classify_batch(matrix.view())?;

        let proposals = row_for_span
            .into_iter()
            .map(|row| match row {
                Some(r) => batch[r],
                None => Prediction::new(Label::Other, 0.0),
            })
            .collect();
        Ok((proposals, skipped))
    }

    /// Full path: spans classify one at a time so each feature vector sees
    /// the running last-heading context from earlier predictions.
    fn classify_sequential(
        &mut self,
        spans: &[Span],
        stats: &DocumentStats,
    ) -> Result<(Vec<Prediction>, usize)> {
        let mut context = HeadingContext::start(stats);
        let cols = self.builder.variant().len();
        let mut proposals = Vec::with_capacity(spans.len());
        let mut skipped = 0;

        for (i, span) in spans.iter().enumerate() {
            let Some(features) = self.builder.features(span, i, stats, &context) else {
                proposals.push(Prediction::new(Label::Other, 0.0));
                skipped += 1;
                continue;
            };
            let matrix = Array2::from_shape_vec((1, cols), features)?;
            let prediction = self
                .classifier
                .classify_batch(matrix.view())?
                .first()
                .copied()
                .unwrap_or(Prediction::new(Label::Other, 0.0));
            context.observe(i, prediction.label, span.font_size);
            proposals.push(prediction);
        }
        Ok((proposals, skipped))
    }
}
