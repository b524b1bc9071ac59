// PDF layout extraction - spans with styling, geometry and table regions
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PAGE_EDGE_GAP;
use crate::error::DocsiftError;
use crate::types::{BBox, Span};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const BOLD_KEYWORDS: [&str; 4] = ["bold", "black", "heavy", "semibold"];
const ITALIC_KEYWORDS: [&str; 2] = ["italic", "oblique"];

/// Ruling-line thresholds for table detection, in page points.
const H_RULE_MIN_WIDTH: f32 = 30.0;
const H_RULE_MAX_HEIGHT: f32 = 3.0;
const V_RULE_MIN_HEIGHT: f32 = 20.0;
const V_RULE_MAX_WIDTH: f32 = 3.0;

/// Glyph advance estimate as a fraction of the font size. The content stream
/// walk does not consult font width tables, so span widths are approximate.
const ADVANCE_RATIO: f32 = 0.5;
/// TJ kerning adjustment (thousandths of an em) treated as a word gap.
const WORD_GAP_ADJUSTMENT: f32 = -100.0;

/// Extract enriched spans from every page of a PDF, in reading order.
///
/// Spans carry top-down coordinates (y0 = distance from the page top) so the
/// footer/header band checks and vertical-gap features read naturally.
pub fn extract_spans(pdf_path: &Path) -> Result<Vec<Span>> {
    let doc = Document::load(pdf_path).map_err(|e| {
        DocsiftError::Input(format!("malformed PDF {}: {e}", pdf_path.display()))
    })?;

    let mut spans = Vec::new();
    for (page_num, page_id) in doc.get_pages() {
        let page_dict = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .with_context(|| format!("page {page_num} has no dictionary"))?;
        let (page_width, page_height) = page_geometry(&doc, page_dict);
        let fonts = page_font_names(&doc, page_dict);

        let content = match doc.get_page_content(page_id) {
            Ok(data) => data,
            // A page with no readable content stream yields no spans; the
            // rest of the document still processes.
            Err(_) => continue,
        };
        let operations = match Content::decode(&content) {
            Ok(content) => content.operations,
            Err(_) => continue,
        };

        let (runs, rects) = walk_operations(&operations, &fonts);
        let tables = table_regions(&rects, page_height);
        let page_spans = build_spans(
            runs,
            &tables,
            page_num as usize,
            page_width,
            page_height,
        );
        spans.extend(page_spans);
    }

    post_process_spacing(&mut spans);
    Ok(spans)
}

/// One positioned show-text run, still in bottom-up PDF user space.
#[derive(Debug, Clone)]
struct RawRun {
    text: String,
    x: f32,
    y: f32,
    width: f32,
    font_name: String,
    font_size: f32,
}

#[derive(Debug, Default)]
struct TextState {
    font_key: String,
    size: f32,
    scale: f32,
    leading: f32,
    line_x: f32,
    line_y: f32,
    x: f32,
    y: f32,
}

impl TextState {
    fn begin_text(&mut self) {
        self.line_x = 0.0;
        self.line_y = 0.0;
        self.x = 0.0;
        self.y = 0.0;
        if self.scale == 0.0 {
            self.scale = 1.0;
        }
    }

    fn effective_size(&self) -> f32 {
        let scale = if self.scale == 0.0 { 1.0 } else { self.scale.abs() };
        self.size * scale
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx;
        self.line_y += ty;
        self.x = self.line_x;
        self.y = self.line_y;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.effective_size() * 1.2
        };
        self.line_y -= leading;
        self.x = self.line_x;
        self.y = self.line_y;
    }
}

/// Interpret the text and path operators of one page's content stream.
/// Returns positioned text runs plus the raw `re` rectangles for table
/// detection. Graphics-state transforms outside the text matrix are ignored,
/// which is adequate for the spacing and band checks downstream.
fn walk_operations(
    operations: &[lopdf::content::Operation],
    fonts: &HashMap<String, String>,
) -> (Vec<RawRun>, Vec<BBox>) {
    let mut runs = Vec::new();
    let mut rects = Vec::new();
    let mut state = TextState::default();
    state.scale = 1.0;

    for op in operations {
        match op.operator.as_str() {
            "BT" => state.begin_text(),
            "ET" => {}
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (op.operands.first(), op.operands.get(1).and_then(as_f32))
                {
                    state.font_key = String::from_utf8_lossy(name).into_owned();
                    state.size = size;
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first().and_then(as_f32) {
                    state.leading = leading;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(as_f32),
                    op.operands.get(1).and_then(as_f32),
                ) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(as_f32),
                    op.operands.get(1).and_then(as_f32),
                ) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "Tm" => {
                let m: Vec<f32> = op.operands.iter().filter_map(as_f32).collect();
                if m.len() == 6 {
                    state.scale = if m[3] != 0.0 { m[3].abs() } else { 1.0 };
                    state.line_x = m[4];
                    state.line_y = m[5];
                    state.x = m[4];
                    state.y = m[5];
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    show_text(&decode_pdf_string(bytes), &mut state, fonts, &mut runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    show_text(&decode_pdf_string(bytes), &mut state, fonts, &mut runs);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    show_text(&decode_pdf_string(bytes), &mut state, fonts, &mut runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => {
                                text.push_str(&decode_pdf_string(bytes))
                            }
                            _ => {
                                if let Some(adjustment) = as_f32(item) {
                                    if adjustment < WORD_GAP_ADJUSTMENT
                                        && !text.ends_with(' ')
                                    {
                                        text.push(' ');
                                    }
                                }
                            }
                        }
                    }
                    show_text(&text, &mut state, fonts, &mut runs);
                }
            }
            "re" => {
                let v: Vec<f32> = op.operands.iter().filter_map(as_f32).collect();
                if v.len() == 4 {
                    rects.push(BBox::new(v[0], v[1], v[0] + v[2], v[1] + v[3]));
                }
            }
            _ => {}
        }
    }

    (runs, rects)
}

fn show_text(
    text: &str,
    state: &mut TextState,
    fonts: &HashMap<String, String>,
    runs: &mut Vec<RawRun>,
) {
    if text.is_empty() {
        return;
    }
    let size = state.effective_size();
    let width = ADVANCE_RATIO * size * text.chars().count() as f32;
    let font_name = fonts
        .get(&state.font_key)
        .cloned()
        .unwrap_or_else(|| state.font_key.clone());
    runs.push(RawRun {
        text: text.to_string(),
        x: state.x,
        y: state.y,
        width,
        font_name,
        font_size: size,
    });
    state.x += width;
}

/// Ruling-line table detection: when a page has both long horizontal and long
/// vertical rules, their bounding union is treated as one table region.
fn table_regions(rects: &[BBox], page_height: f32) -> Vec<BBox> {
    let h_rules: Vec<&BBox> = rects
        .iter()
        .filter(|r| r.width() > H_RULE_MIN_WIDTH && r.height().abs() < H_RULE_MAX_HEIGHT)
        .collect();
    let v_rules: Vec<&BBox> = rects
        .iter()
        .filter(|r| r.height().abs() > V_RULE_MIN_HEIGHT && r.width() < V_RULE_MAX_WIDTH)
        .collect();
    if h_rules.is_empty() || v_rules.is_empty() {
        return Vec::new();
    }

    let min_x = v_rules.iter().map(|r| r.x0).fold(f32::INFINITY, f32::min);
    let max_x = v_rules.iter().map(|r| r.x1).fold(f32::NEG_INFINITY, f32::max);
    let min_y = h_rules
        .iter()
        .map(|r| r.y0.min(r.y1))
        .fold(f32::INFINITY, f32::min);
    let max_y = h_rules
        .iter()
        .map(|r| r.y0.max(r.y1))
        .fold(f32::NEG_INFINITY, f32::max);

    // Flip to top-down coordinates to match the spans.
    vec![BBox::new(
        min_x,
        page_height - max_y,
        max_x,
        page_height - min_y,
    )]
}

/// Merge positioned runs into line spans, then adjacent same-styled lines into
/// block spans, and enrich with table membership and column.
fn build_spans(
    mut runs: Vec<RawRun>,
    tables: &[BBox],
    page: usize,
    page_width: f32,
    page_height: f32,
) -> Vec<Span> {
    // Reading order: top of the page first (bottom-up y descending).
    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    // Group runs into lines by baseline proximity.
    let mut lines: Vec<Vec<RawRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() < 2.0 => line.push(run),
            _ => lines.push(vec![run]),
        }
    }

    let mut spans: Vec<Span> = Vec::new();
    for line in lines {
        let Some(line_span) = line_to_span(&line, page, page_width, page_height) else {
            continue;
        };
        // Merge into the previous span when it reads as the same block:
        // same styling and a vertical gap under half the font size.
        if let Some(prev) = spans.last_mut() {
            let gap = line_span.bbox.y0 - prev.bbox.y1;
            let same_style = prev.font_name == line_span.font_name
                && (prev.font_size - line_span.font_size).abs() < 0.1;
            if same_style && gap >= 0.0 && gap < prev.font_size * 0.5 {
                prev.text.push(' ');
                prev.text.push_str(&line_span.text);
                prev.bbox.x0 = prev.bbox.x0.min(line_span.bbox.x0);
                prev.bbox.x1 = prev.bbox.x1.max(line_span.bbox.x1);
                prev.bbox.y1 = line_span.bbox.y1;
                prev.line_count += 1;
                prev.word_count = prev.text.split_whitespace().count();
                continue;
            }
        }
        spans.push(line_span);
    }

    for span in &mut spans {
        let (cx, cy) = span.bbox.center();
        span.in_table = tables.iter().any(|t| t.contains(cx, cy));
        span.column = if cx < page_width / 2.0 { 1 } else { 2 };
    }
    spans
}

fn line_to_span(line: &[RawRun], page: usize, page_width: f32, page_height: f32) -> Option<Span> {
    let mut text = String::new();
    for run in line {
        if !text.is_empty() && !text.ends_with(' ') {
            text.push(' ');
        }
        text.push_str(&run.text);
    }
    let text = WHITESPACE
        .replace_all(text.replace('\u{2019}', "'").trim(), " ")
        .into_owned();
    if text.is_empty() {
        return None;
    }

    // Dominant styling: the most common (font, size) pair on the line.
    let mut counts: HashMap<(&str, i32), usize> = HashMap::new();
    for run in line {
        *counts
            .entry((run.font_name.as_str(), (run.font_size * 10.0) as i32))
            .or_insert(0) += 1;
    }
    let (&(font_name, size_tenths), _) = counts
        .iter()
        .max_by_key(|(key, count)| (**count, std::cmp::Reverse(*key)))?;
    let font_size = size_tenths as f32 / 10.0;

    let x0 = line.iter().map(|r| r.x).fold(f32::INFINITY, f32::min);
    let x1 = line
        .iter()
        .map(|r| r.x + r.width)
        .fold(f32::NEG_INFINITY, f32::max);
    let baseline = line[0].y;
    let lower = font_name.to_lowercase();

    Some(Span {
        word_count: text.split_whitespace().count(),
        text,
        page,
        // Top-down box: the glyph box sits on the baseline, size points tall.
        bbox: BBox::new(
            x0,
            page_height - baseline - font_size,
            x1,
            page_height - baseline,
        ),
        font_name: font_name.to_string(),
        font_size,
        bold: BOLD_KEYWORDS.iter().any(|k| lower.contains(k)),
        italic: ITALIC_KEYWORDS.iter().any(|k| lower.contains(k)),
        in_table: false,
        column: 1,
        line_count: 1,
        space_before: PAGE_EDGE_GAP,
        space_after: PAGE_EDGE_GAP,
        page_width,
        page_height,
    })
}

/// Fill vertical-gap fields from same-page neighbors; page boundaries keep
/// the sentinel gap.
pub fn post_process_spacing(spans: &mut [Span]) {
    for i in 0..spans.len() {
        if i + 1 < spans.len() && spans[i + 1].page == spans[i].page {
            spans[i].space_after = spans[i + 1].bbox.y0 - spans[i].bbox.y1;
        } else {
            spans[i].space_after = PAGE_EDGE_GAP;
        }
        if i > 0 && spans[i - 1].page == spans[i].page {
            spans[i].space_before = spans[i].bbox.y0 - spans[i - 1].bbox.y1;
        } else {
            spans[i].space_before = PAGE_EDGE_GAP;
        }
    }
}

/// Page dimensions from the MediaBox, defaulting to US Letter.
fn page_geometry(doc: &Document, page: &Dictionary) -> (f32, f32) {
    if let Ok(media_box) = page.get(b"MediaBox") {
        if let Object::Array(arr) = resolve(doc, media_box) {
            let bounds: Vec<f32> = arr.iter().filter_map(as_f32).collect();
            if bounds.len() == 4 {
                return (bounds[2] - bounds[0], bounds[3] - bounds[1]);
            }
        }
    }
    (612.0, 792.0)
}

/// Resource-key -> BaseFont map for one page. Fonts that cannot be resolved
/// fall back to the resource key itself.
fn page_font_names(doc: &Document, page: &Dictionary) -> HashMap<String, String> {
    let mut fonts = HashMap::new();
    let Ok(resources) = page.get(b"Resources") else {
        return fonts;
    };
    let Object::Dictionary(resources) = resolve(doc, resources) else {
        return fonts;
    };
    let Ok(font_dict) = resources.get(b"Font") else {
        return fonts;
    };
    let Object::Dictionary(font_dict) = resolve(doc, font_dict) else {
        return fonts;
    };
    for (key, value) in font_dict.iter() {
        if let Object::Dictionary(font) = resolve(doc, value) {
            if let Ok(base) = font.get(b"BaseFont") {
                if let Object::Name(name) = resolve(doc, base) {
                    fonts.insert(
                        String::from_utf8_lossy(key).into_owned(),
                        String::from_utf8_lossy(name).into_owned(),
                    );
                }
            }
        }
    }
    fonts
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn as_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// PDF string to text: UTF-16BE when BOM-prefixed, Latin-1 otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_latin1_and_utf16() {
        assert_eq!(decode_pdf_string(b"Hello"), "Hello");
        let utf16 = [0xFEu8, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_string(&utf16), "Hi");
    }

    #[test]
    fn table_region_needs_both_rule_directions() {
        let h = BBox::new(50.0, 500.0, 400.0, 501.0);
        let v = BBox::new(50.0, 400.0, 51.0, 500.0);
        assert!(table_regions(&[h], 792.0).is_empty());
        assert!(table_regions(&[v], 792.0).is_empty());

        let regions = table_regions(&[h, v, BBox::new(50.0, 400.0, 400.0, 401.0)], 792.0);
        assert_eq!(regions.len(), 1);
        // Span centers inside the flipped region are flagged.
        let region = regions[0];
        assert!(region.contains(200.0, 792.0 - 450.0));
    }

    #[test]
    fn spacing_uses_sentinel_at_page_boundaries() {
        let mut spans = vec![
            span_at(1, 100.0, 112.0),
            span_at(1, 130.0, 142.0),
            span_at(2, 80.0, 92.0),
        ];
        post_process_spacing(&mut spans);
        assert_eq!(spans[0].space_before, PAGE_EDGE_GAP);
        assert_eq!(spans[0].space_after, 130.0 - 112.0);
        assert_eq!(spans[1].space_before, 130.0 - 112.0);
        assert_eq!(spans[1].space_after, PAGE_EDGE_GAP);
        assert_eq!(spans[2].space_before, PAGE_EDGE_GAP);
    }

    fn span_at(page: usize, y0: f32, y1: f32) -> Span {
        Span {
            text: "x".into(),
            page,
            bbox: BBox::new(72.0, y0, 200.0, y1),
            font_name: "Helvetica".into(),
            font_size: 12.0,
            bold: false,
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
}
