// Outline assembly - filtered span labels to a nested heading tree
use crate::types::{Label, OutlineDocument, OutlineNode, Prediction, Span};

/// Fallback title when no span was labeled Title.
pub const MISSING_TITLE: &str = "Document Title Not Found";

/// Build the outline tree from the final (span, label) sequence in document
/// order. A stack of open ancestors is popped until the top is strictly
/// shallower than the incoming heading; the node then attaches there (or as
/// a root). The first Title span becomes the document title; any later Title
/// is demoted to H1 so at most one title exists.
pub fn assemble(spans: &[Span], predictions: &[Prediction]) -> OutlineDocument {
    let mut title: Option<String> = None;
    let mut roots: Vec<OutlineNode> = Vec::new();
    // Depths of the currently open ancestor chain, shallowest first.
    let mut open_depths: Vec<u8> = Vec::new();

    for (span, prediction) in spans.iter().zip(predictions.iter()) {
        let label = match prediction.label {
            Label::Title if title.is_none() => {
                title = Some(span.text.clone());
                continue;
            }
            Label::Title => Label::H1,
            other => other,
        };
        let Some(depth) = label.heading_depth() else {
            continue;
        };

        while matches!(open_depths.last(), Some(&d) if d >= depth) {
            open_depths.pop();
        }

        let node = OutlineNode {
            level: label,
            text: span.text.clone(),
            page: span.page,
            children: Vec::new(),
        };

        // Each open ancestor is the last node at its level by construction,
        // so walking `last_mut` children reaches the attachment point.
        let mut slot: &mut Vec<OutlineNode> = &mut roots;
        for _ in 0..open_depths.len() {
            if slot.is_empty() {
                break;
            }
            let current = slot;
            match current.last_mut() {
                Some(parent) => slot = &mut parent.children,
                None => unreachable!("checked non-empty above"),
            }
        }
        slot.push(node);
        open_depths.push(depth);
    }

    OutlineDocument {
        title: title.unwrap_or_else(|| MISSING_TITLE.to_string()),
        outline: roots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_EDGE_GAP;
    use crate::types::BBox;

    fn span(text: &str, page: usize) -> Span {
        Span {
            text: text.into(),
            page,
            bbox: BBox::new(72.0, 100.0, 300.0, 118.0),
            font_name: "Helvetica".into(),
            font_size: 18.0,
            bold: true,
            italic: false,
            in_table: false,
            column: 1,
            line_count: 1,
            word_count: 1,
            space_before: PAGE_EDGE_GAP,
            space_after: PAGE_EDGE_GAP,
            page_width: 612.0,
            page_height: 792.0,
        }
    }

    fn labeled(items: &[(&str, Label)]) -> (Vec<Span>, Vec<Prediction>) {
        let spans = items.iter().map(|(t, _)| span(t, 1)).collect();
        let predictions = items
            .iter()
            .map(|(_, l)| Prediction::new(*l, 0.9))
            .collect();
        (spans, predictions)
    }

    fn check_depths(node: &OutlineNode) {
        let depth = node.level.heading_depth().unwrap();
        for child in &node.children {
            assert!(child.level.heading_depth().unwrap() > depth);
            check_depths(child);
        }
    }

    #[test]
    fn nests_strictly_deeper_levels() {
        let (spans, predictions) = labeled(&[
            ("Report", Label::Title),
            ("Intro", Label::H1),
            ("Scope", Label::H2),
            ("Details", Label::H3),
            ("Methods", Label::H1),
            ("Sampling", Label::H2),
        ]);
        let doc = assemble(&spans, &predictions);
        assert_eq!(doc.title, "Report");
        assert_eq!(doc.outline.len(), 2);
        assert_eq!(doc.outline[0].children.len(), 1);
        assert_eq!(doc.outline[0].children[0].children.len(), 1);
        assert_eq!(doc.outline[1].text, "Methods");
        for root in &doc.outline {
            check_depths(root);
        }
    }

    #[test]
    fn sibling_same_level_does_not_nest() {
        let (spans, predictions) = labeled(&[
            ("A", Label::H2),
            ("B", Label::H2),
        ]);
        let doc = assemble(&spans, &predictions);
        assert_eq!(doc.outline.len(), 2);
        assert!(doc.outline[0].children.is_empty());
    }

    #[test]
    fn skipping_levels_attaches_to_nearest_shallower() {
        let (spans, predictions) = labeled(&[
            ("Top", Label::H1),
            ("Deep", Label::H4),
            ("Back", Label::H2),
        ]);
        let doc = assemble(&spans, &predictions);
        assert_eq!(doc.outline.len(), 1);
        assert_eq!(doc.outline[0].children.len(), 2);
        assert_eq!(doc.outline[0].children[0].text, "Deep");
        assert_eq!(doc.outline[0].children[1].text, "Back");
    }

    #[test]
    fn second_title_is_demoted_to_h1() {
        let (spans, predictions) = labeled(&[
            ("Real Title", Label::Title),
            ("Imposter", Label::Title),
        ]);
        let doc = assemble(&spans, &predictions);
        assert_eq!(doc.title, "Real Title");
        assert_eq!(doc.outline.len(), 1);
        assert_eq!(doc.outline[0].level, Label::H1);
        assert_eq!(doc.outline[0].text, "Imposter");
    }

    #[test]
    fn body_and_other_are_excluded() {
        let (spans, predictions) = labeled(&[
            ("Heading", Label::H1),
            ("paragraph text", Label::Body),
            ("3", Label::Other),
        ]);
        let doc = assemble(&spans, &predictions);
        assert_eq!(doc.title, MISSING_TITLE);
        assert_eq!(doc.outline.len(), 1);
        assert!(doc.outline[0].children.is_empty());
    }
}
