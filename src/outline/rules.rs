// Rule-based post-filter for classifier output
//
// Every rule either downgrades a label or leaves it alone; the shared
// `narrow` helper makes an upgrade impossible, so the filter can never
// introduce a heading the classifier did not already propose.
use crate::config::{FOOTER_BAND_RATIO, MIN_STYLE_RATIO};
use crate::outline::features::DocumentStats;
use crate::types::{Label, Prediction, Span};

#[derive(Debug, Clone, Copy)]
pub struct RuleThresholds {
    /// Fraction of the page height treated as header/footer band.
    pub footer_band_ratio: f32,
    /// Minimum font-size ratio over the body median for a span to keep a
    /// heading label without bold styling.
    pub min_style_ratio: f32,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            footer_band_ratio: FOOTER_BAND_RATIO,
            min_style_ratio: MIN_STYLE_RATIO,
        }
    }
}

/// Apply the override rules to one document's classifier proposals, in span
/// order. Pure function of (spans, proposals): the same input always yields
/// the same filtered labels, and rules run in a fixed order per span.
pub fn apply(
    spans: &[Span],
    proposals: &[Prediction],
    stats: &DocumentStats,
    thresholds: &RuleThresholds,
) -> Vec<Prediction> {
    let mut predictions = proposals.to_vec();
    for (span, prediction) in spans.iter().zip(predictions.iter_mut()) {
        // 1. Page-number suppression: digits-only text, or digits and
        //    punctuation inside the header/footer band.
        if is_page_number(span, thresholds.footer_band_ratio) {
            narrow(prediction, Label::Other);
        }

        // 2. Table-content suppression: whatever the classifier said, text
        //    inside a detected table region is not a heading.
        if span.in_table {
            narrow(prediction, Label::Other);
        }

        // 3. Weak-style downgrade: a heading-labeled span whose styling does
        //    not stand out from the body majority drops one level.
        if prediction.label.rank() > Label::Body.rank()
            && !span.bold
            && span.font_size < stats.median_font * thresholds.min_style_ratio
        {
            narrow(prediction, demote_one(prediction.label));
        }
    }
    predictions
}

/// Monotonic narrowing: only ever move a label down the hierarchy.
fn narrow(prediction: &mut Prediction, to: Label) {
    if to.rank() < prediction.label.rank() {
        prediction.label = to;
    }
}

fn demote_one(label: Label) -> Label {
    match label {
        Label::Title => Label::H1,
        Label::H1 => Label::H2,
        Label::H2 => Label::H3,
        Label::H3 => Label::H4,
        Label::H4 => Label::Body,
        other => other,
    }
}

fn is_page_number(span: &Span, band_ratio: f32) -> bool {
    let text = span.text.trim();
    if text.is_empty() {
        return false;
    }

    // Bare page numbers are suppressed wherever they appear.
    if text.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    let digits_and_punct = text
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_punctuation() || c.is_whitespace())
        && text.chars().any(|c| c.is_ascii_digit());
    digits_and_punct && in_edge_band(span, band_ratio)
}

fn in_edge_band(span: &Span, band_ratio: f32) -> bool {
    let band = span.page_height * band_ratio;
    span.bbox.y1 <= band || span.bbox.y0 >= span.page_height - band
}
