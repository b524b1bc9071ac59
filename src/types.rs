// Core data model for docsift
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in page points, top-down coordinates
/// (y0 is the top edge, y grows toward the page bottom).
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// One contiguous run of text with uniform styling extracted from a PDF page.
/// Immutable once extracted; enrichment fields (spacing, table membership,
/// column) are filled by the layout extractor before spans leave it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    /// 1-based page index.
    pub page: usize,
    pub bbox: BBox,
    pub font_name: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub in_table: bool,
    /// 1 for the left half of the page, 2 for the right.
    pub column: u8,
    pub line_count: usize,
    pub word_count: usize,
    /// Vertical gap to the previous span on the same page, else the
    /// page-boundary sentinel (see config::PAGE_EDGE_GAP).
    pub space_before: f32,
    pub space_after: f32,
    pub page_width: f32,
    pub page_height: f32,
}

/// Structural role assigned to a span. Ordering for rule narrowing:
/// Title > H1 > H2 > H3 > H4 > Body > Other.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Title,
    H1,
    H2,
    H3,
    H4,
    Body,
    Other,
}

impl Label {
    pub const COUNT: usize = 7;

    /// Position in the hierarchy; higher means closer to Title.
    pub fn rank(self) -> u8 {
        match self {
            Label::Title => 6,
            Label::H1 => 5,
            Label::H2 => 4,
            Label::H3 => 3,
            Label::H4 => 2,
            Label::Body => 1,
            Label::Other => 0,
        }
    }

    /// Heading depth (H1 = 1 .. H4 = 4); None for Title/Body/Other.
    pub fn heading_depth(self) -> Option<u8> {
        match self {
            Label::H1 => Some(1),
            Label::H2 => Some(2),
            Label::H3 => Some(3),
            Label::H4 => Some(4),
            _ => None,
        }
    }

    /// Class index in the classifier's output layer.
    pub fn from_class_index(index: usize) -> Option<Label> {
        match index {
            0 => Some(Label::Other),
            1 => Some(Label::Title),
            2 => Some(Label::H1),
            3 => Some(Label::H2),
            4 => Some(Label::H3),
            5 => Some(Label::H4),
            6 => Some(Label::Body),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Title => "Title",
            Label::H1 => "H1",
            Label::H2 => "H2",
            Label::H3 => "H3",
            Label::H4 => "H4",
            Label::Body => "Body",
            Label::Other => "Other",
        }
    }
}

/// Classifier output for one span.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Prediction {
    pub label: Label,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: Label, confidence: f32) -> Self {
        Self { label, confidence }
    }
}

/// A span promoted to a structural role in the outline tree.
/// Invariant: every child's level is strictly deeper than its parent's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineNode {
    pub level: Label,
    pub text: String,
    pub page: usize,
    pub children: Vec<OutlineNode>,
}

/// The per-document outline artifact written as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineDocument {
    pub title: String,
    pub outline: Vec<OutlineNode>,
}

/// One unit of input text for the relevance ranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub document: String,
    pub section_title: String,
    pub text: String,
    #[serde(default)]
    pub page_start: u32,
    #[serde(default)]
    pub page_end: u32,
}

/// Per-chunk score diagnostics. `combined_score` is a deterministic weighted
/// function of the other fields; identical inputs yield identical values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub bm25_score: f64,
    pub tfidf_score: f64,
    pub synonym_bonus: f64,
    pub persona_bonus: f64,
    pub penalty_total: f64,
    pub combined_score: f64,
}

/// A chunk paired with its scores and, for top-K chunks, a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk: DocumentChunk,
    pub scores: ScoreBreakdown,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_ordering_matches_hierarchy() {
        let order = [
            Label::Title,
            Label::H1,
            Label::H2,
            Label::H3,
            Label::H4,
            Label::Body,
            Label::Other,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].rank() > pair[1].rank());
        }
    }

    #[test]
    fn class_index_round_trip() {
        for i in 0..Label::COUNT {
            let label = Label::from_class_index(i).unwrap();
            assert!(Label::from_class_index(i) == Some(label));
        }
        assert!(Label::from_class_index(Label::COUNT).is_none());
    }

    #[test]
    fn bbox_helpers() {
        let b = BBox::new(10.0, 20.0, 110.0, 32.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 12.0);
        assert!(b.contains(50.0, 25.0));
        assert!(!b.contains(5.0, 25.0));
        assert_eq!(BBox::default().area(), 0.0);
    }
}
