// Feature vectors for heading classification
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{DEFAULT_BODY_FONT_PT, MIN_BODY_FONT_PT};
use crate::types::{Label, Span};

/// Leading numbering/keyword patterns that mark enumerated headings
/// ("1.2", "A.", "(b)", "IV.", "Appendix C", "Section 3").
static NUMBERED_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^((\d+(\.\d+)*\.?|[A-Z][\.)]|\(?[a-z\d]\)|[IVXLC]+\.)\s+|(Appendix|Phase|Chapter|Section|Article)\s+[A-Z\d])",
    )
    .unwrap()
});

/// Features shared by both variants.
pub const LITE_FEATURES: [&str; 16] = [
    "font_size",
    "is_bold",
    "is_italic",
    "relative_font_size",
    "font_name_id",
    "bold_x_rel_size",
    "line_width_ratio",
    "y_position_normalized",
    "x_position_normalized",
    "is_centered",
    "is_in_table",
    "column",
    "space_before_ratio",
    "space_after_ratio",
    "line_count",
    "char_count",
];

/// Full set: the lite prefix plus content and hierarchy features. Strict
/// superset, so one extraction pass serves either classifier artifact.
pub const FULL_FEATURES: [&str; 23] = [
    "font_size",
    "is_bold",
    "is_italic",
    "relative_font_size",
    "font_name_id",
    "bold_x_rel_size",
    "line_width_ratio",
    "y_position_normalized",
    "x_position_normalized",
    "is_centered",
    "is_in_table",
    "column",
    "space_before_ratio",
    "space_after_ratio",
    "line_count",
    "char_count",
    "word_count",
    "is_all_caps",
    "ends_with_punct",
    "starts_with_numbering",
    "last_heading_level",
    "distance_from_last_heading",
    "font_size_vs_last_heading",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FeatureVariant {
    /// Reduced feature set for speed.
    Lite,
    /// Richer set with content and hierarchy features.
    Full,
}

impl FeatureVariant {
    pub fn names(self) -> &'static [&'static str] {
        match self {
            FeatureVariant::Lite => &LITE_FEATURES,
            FeatureVariant::Full => &FULL_FEATURES,
        }
    }

    pub fn len(self) -> usize {
        self.names().len()
    }

    /// Hierarchy features make classification order-dependent: each span's
    /// vector needs the previous spans' predicted labels.
    pub fn uses_heading_context(self) -> bool {
        matches!(self, FeatureVariant::Full)
    }
}

/// Document-level aggregates computed once per document. Feature vectors are
/// purely a function of a span plus these aggregates, so results reproduce.
#[derive(Debug, Clone)]
pub struct DocumentStats {
    pub median_font: f32,
    font_ids: BTreeMap<String, usize>,
}

impl DocumentStats {
    pub fn compute(spans: &[Span]) -> Self {
        let mut sizes: Vec<f32> = spans
            .iter()
            .map(|s| s.font_size)
            .filter(|&s| s > MIN_BODY_FONT_PT)
            .collect();
        sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_font = if sizes.is_empty() {
            DEFAULT_BODY_FONT_PT
        } else {
            sizes[sizes.len() / 2]
        };

        // Deterministic per-document font ids: sorted unique names.
        let mut font_ids = BTreeMap::new();
        for span in spans {
            let next = font_ids.len();
            font_ids.entry(span.font_name.clone()).or_insert(next);
        }
        let names: Vec<String> = font_ids.keys().cloned().collect();
        let font_ids = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        Self { median_font, font_ids }
    }

    pub fn font_id(&self, name: &str) -> f32 {
        self.font_ids.get(name).map(|&i| i as f32).unwrap_or(-1.0)
    }
}

/// Running last-heading context threaded through a document in order.
#[derive(Debug, Clone)]
pub struct HeadingContext {
    pub index: isize,
    pub level: u8,
    pub font_size: f32,
}

impl HeadingContext {
    pub fn start(stats: &DocumentStats) -> Self {
        Self {
            index: -1,
            level: 0,
            font_size: stats.median_font,
        }
    }

    /// Record a classified span; only heading labels advance the context.
    pub fn observe(&mut self, index: usize, label: Label, font_size: f32) {
        if let Some(depth) = label.heading_depth() {
            self.index = index as isize;
            self.level = depth;
            self.font_size = font_size;
        }
    }
}

pub struct FeatureBuilder {
    variant: FeatureVariant,
}

impl FeatureBuilder {
    pub fn new(variant: FeatureVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> FeatureVariant {
        self.variant
    }

    /// Feature vector for one span, or None for the skip sentinel
    /// (empty text or zero-area box; excluded from classification).
    pub fn features(
        &self,
        span: &Span,
        index: usize,
        stats: &DocumentStats,
        context: &HeadingContext,
    ) -> Option<Vec<f32>> {
        if span.text.trim().is_empty() || span.bbox.area() <= 0.0 {
            return None;
        }

        let text = span.text.trim();
        let relative_size = if stats.median_font > 0.0 {
            span.font_size / stats.median_font
        } else {
            1.0
        };
        let page_width = span.page_width.max(1.0);
        let page_height = span.page_height.max(1.0);
        let center_x = (span.bbox.x0 + span.bbox.x1) / 2.0;

        let mut features = vec![
            span.font_size,
            span.bold as u8 as f32,
            span.italic as u8 as f32,
            relative_size,
            stats.font_id(&span.font_name),
            span.bold as u8 as f32 * relative_size,
            span.bbox.width() / page_width,
            span.bbox.y0 / page_height,
            span.bbox.x0 / page_width,
            ((center_x / page_width - 0.5).abs() < 0.15) as u8 as f32,
            span.in_table as u8 as f32,
            span.column as f32,
            space_ratio(span.space_before, span.font_size),
            space_ratio(span.space_after, span.font_size),
            span.line_count as f32,
            text.chars().count() as f32,
        ];

        if self.variant == FeatureVariant::Full {
            let last_font = if context.font_size > 0.0 {
                context.font_size
            } else {
                stats.median_font
            };
            features.extend([
                span.word_count as f32,
                (text.len() > 3 && text == text.to_uppercase() && text.chars().any(char::is_alphabetic))
                    as u8 as f32,
                (text.ends_with(':') || text.ends_with('.')) as u8 as f32,
                NUMBERED_HEADING.is_match(text) as u8 as f32,
                context.level as f32,
                if context.index >= 0 {
                    (index as isize - context.index) as f32
                } else {
                    100.0
                },
                if last_font > 0.0 {
                    span.font_size / last_font
                } else {
                    1.0
                },
            ]);
        }

        debug_assert_eq!(features.len(), self.variant.len());
        Some(features)
    }
}

fn space_ratio(gap: f32, font_size: f32) -> f32 {
    if font_size > 0.0 {
        gap / font_size
    } else {
        5.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_EDGE_GAP;
    use crate::types::BBox;

    fn span(text: &str, size: f32, bold: bool) -> Span {
        Span {
            text: text.into(),
            page: 1,
            bbox: BBox::new(72.0, 100.0, 300.0, 100.0 + size),
            font_name: "Helvetica-Bold".into(),
            font_size: size,
            bold,
            italic: false,
            in_table: false,
            column: 1,
            line_count: 1,
            word_count: text.split_whitespace().count(),
            space_before: PAGE_EDGE_GAP,
            space_after: PAGE_EDGE_GAP,
            page_width: 612.0,
            page_height: 792.0,
        }
    }

    #[test]
    fn full_is_strict_superset_of_lite() {
        assert!(FULL_FEATURES.len() > LITE_FEATURES.len());
        assert_eq!(&FULL_FEATURES[..LITE_FEATURES.len()], &LITE_FEATURES);
    }

    #[test]
    fn vector_lengths_match_variant() {
        let spans = vec![span("Introduction", 18.0, true)];
        let stats = DocumentStats::compute(&spans);
        let context = HeadingContext::start(&stats);

        let lite = FeatureBuilder::new(FeatureVariant::Lite)
            .features(&spans[0], 0, &stats, &context)
            .unwrap();
        assert_eq!(lite.len(), LITE_FEATURES.len());

        let full = FeatureBuilder::new(FeatureVariant::Full)
            .features(&spans[0], 0, &stats, &context)
            .unwrap();
        assert_eq!(full.len(), FULL_FEATURES.len());
        // Shared prefix is identical between variants.
        assert_eq!(&full[..lite.len()], &lite[..]);
    }

    #[test]
    fn skip_sentinel_for_empty_or_zero_area() {
        let stats = DocumentStats::compute(&[span("body", 12.0, false)]);
        let context = HeadingContext::start(&stats);
        let builder = FeatureBuilder::new(FeatureVariant::Full);

        let empty = span("   ", 12.0, false);
        assert!(builder.features(&empty, 0, &stats, &context).is_none());

        let mut flat = span("text", 12.0, false);
        flat.bbox = BBox::new(72.0, 100.0, 72.0, 100.0);
        assert!(builder.features(&flat, 0, &stats, &context).is_none());
    }

    #[test]
    fn median_font_ignores_tiny_sizes_and_defaults() {
        let spans = vec![span("a", 4.0, false), span("b", 5.0, false)];
        assert_eq!(DocumentStats::compute(&spans).median_font, DEFAULT_BODY_FONT_PT);

        let spans = vec![
            span("a", 10.0, false),
            span("b", 12.0, false),
            span("c", 24.0, false),
        ];
        assert_eq!(DocumentStats::compute(&spans).median_font, 12.0);
    }

    #[test]
    fn heading_context_advances_only_on_headings() {
        let stats = DocumentStats::compute(&[span("x", 12.0, false)]);
        let mut context = HeadingContext::start(&stats);
        context.observe(0, Label::Body, 12.0);
        assert_eq!(context.index, -1);
        context.observe(3, Label::H2, 16.0);
        assert_eq!(context.index, 3);
        assert_eq!(context.level, 2);
        assert_eq!(context.font_size, 16.0);
    }

    #[test]
    fn numbered_heading_pattern() {
        for text in ["1. Introduction", "2.3 Methods", "A. Background", "IV. Scope", "Appendix B"] {
            assert!(NUMBERED_HEADING.is_match(text), "{text}");
        }
        assert!(!NUMBERED_HEADING.is_match("plain body text"));
    }
}
