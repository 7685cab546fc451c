//! Layout analysis for PDF pages.
//!
//! Interprets a page's content stream into positioned text spans, groups
//! them into lines and blocks, and labels each block (title, section header,
//! running header/footer, list item, body text) with a bounding box in
//! top-left-origin page points so it can be overlaid on a rendered image.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::backend::{ContentOp, PageId, PdfBackend, PdfValue};
use crate::error::Result;

/// Kerning adjustments in TJ arrays beyond this many thousandths of an em
/// are read as word spaces.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Fraction of the page height treated as running header/footer bands.
const MARGIN_BAND: f32 = 0.07;

/// Layout label of a block, named after the document-layout categories the
/// annotation UI expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutLabel {
    Title,
    SectionHeader,
    PageHeader,
    PageFooter,
    ListItem,
    Text,
}

impl LayoutLabel {
    /// Label string as it appears in task records.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutLabel::Title => "title",
            LayoutLabel::SectionHeader => "section_header",
            LayoutLabel::PageHeader => "page_header",
            LayoutLabel::PageFooter => "page_footer",
            LayoutLabel::ListItem => "list_item",
            LayoutLabel::Text => "text",
        }
    }

    /// Whether tokens of this block are displayed as a heading.
    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            LayoutLabel::Title | LayoutLabel::SectionHeader | LayoutLabel::PageHeader
        )
    }
}

impl fmt::Display for LayoutLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in page points, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Multiply every coordinate by `factor` (points → pixels).
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// A run of text drawn by one text-showing operator.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    /// Left edge in PDF user space
    pub x: f32,
    /// Baseline in PDF user space (origin bottom-left)
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
    pub is_bold: bool,
}

impl TextSpan {
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let lower = font_name.to_lowercase();
        let is_bold = ["bold", "black", "heavy", "semibold"]
            .iter()
            .any(|w| lower.contains(w));
        // No glyph metrics are read; half an em per character is close
        // enough for box drawing.
        let width = text.chars().count() as f32 * font_size * 0.5;
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
            is_bold,
        }
    }

    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Spans sharing a baseline, ordered left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
    pub x: f32,
    pub font_size: f32,
    pub heading_level: u8,
}

impl TextLine {
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        let chars: usize = spans.iter().map(|s| s.text.chars().count()).sum();
        let font_size = if chars > 0 {
            spans
                .iter()
                .map(|s| s.font_size * s.text.chars().count() as f32)
                .sum::<f32>()
                / chars as f32
        } else {
            spans.first().map(|s| s.font_size).unwrap_or(0.0)
        };

        Self {
            y: spans.first().map(|s| s.y).unwrap_or(0.0),
            x: spans.first().map(|s| s.x).unwrap_or(0.0),
            spans,
            font_size,
            heading_level: 0,
        }
    }

    /// Text of the line, inserting a space where spans are visibly apart.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - prev.right();
                let needs_space = gap > span.font_size * 0.1
                    && !out.ends_with(char::is_whitespace)
                    && !span.text.starts_with(char::is_whitespace)
                    && !(out.chars().last().is_some_and(is_spaceless_script_char)
                        && span.text.chars().next().is_some_and(is_spaceless_script_char));
                if needs_space {
                    out.push(' ');
                }
            }
            out.push_str(&span.text);
        }
        out
    }

    pub fn is_bold(&self) -> bool {
        let total: usize = self.spans.iter().map(|s| s.text.len()).sum();
        let bold: usize = self
            .spans
            .iter()
            .filter(|s| s.is_bold)
            .map(|s| s.text.len())
            .sum();
        total > 0 && bold * 2 > total
    }

    fn top(&self) -> f32 {
        self.spans.iter().map(TextSpan::top).fold(f32::MIN, f32::max)
    }

    fn bottom(&self) -> f32 {
        self.spans.iter().map(TextSpan::bottom).fold(f32::MAX, f32::min)
    }

    fn right(&self) -> f32 {
        self.spans.iter().map(TextSpan::right).fold(f32::MIN, f32::max)
    }
}

/// A labelled region of text ready for annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    pub text: String,
    pub label: LayoutLabel,
    pub bbox: BoundingBox,
    /// 1-6 for headings, 0 otherwise
    pub heading_level: u8,
}

/// Layout of a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Blocks in reading order
    pub blocks: Vec<LayoutBlock>,
}

impl PageLayout {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Font size histogram for one page, used to tell headings from body text.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Most common size, weighted by characters
    pub body_size: f32,
    /// Sizes noticeably above body size, largest first
    pub heading_sizes: Vec<f32>,
    // Keys are sizes in tenths of a point; BTreeMap keeps ties deterministic.
    histogram: BTreeMap<i32, usize>,
}

impl FontStatistics {
    pub fn add(&mut self, size: f32, chars: usize) {
        *self.histogram.entry((size * 10.0).round() as i32).or_insert(0) += chars;
    }

    pub fn analyze(&mut self) {
        let Some((&body, _)) = self.histogram.iter().max_by_key(|(_, count)| **count) else {
            self.body_size = 12.0;
            return;
        };
        self.body_size = body as f32 / 10.0;
        self.heading_sizes = self
            .histogram
            .keys()
            .rev()
            .map(|k| *k as f32 / 10.0)
            .filter(|s| *s >= self.body_size + 1.5)
            .collect();
    }

    /// Heading level for a size (1-6), or 0 for body text.
    pub fn heading_level(&self, font_size: f32) -> u8 {
        if font_size < self.body_size + 1.5 {
            return 0;
        }
        self.heading_sizes
            .iter()
            .position(|h| font_size >= h - 0.5)
            .map(|i| (i + 1).min(6) as u8)
            .unwrap_or(5)
    }
}

/// Extracts [`PageLayout`]s through a [`PdfBackend`].
pub struct LayoutAnalyzer<'a, B: PdfBackend> {
    backend: &'a B,
}

impl<'a, B: PdfBackend> LayoutAnalyzer<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Analyze one page. `page_index` is 0-based and only used to decide
    /// whether a top-level heading is the document title.
    pub fn analyze_page(&self, page_id: PageId, page_index: u32) -> Result<PageLayout> {
        let (width, height) = self.backend.page_size(page_id);
        let fonts: BTreeMap<Vec<u8>, String> = self
            .backend
            .page_fonts(page_id)
            .map(|fonts| fonts.into_iter().map(|f| (f.name, f.base_font)).collect())
            .unwrap_or_default();

        let content = self.backend.page_content(page_id)?;
        let ops = self.backend.decode_content(&content)?;
        let decode = |font: &[u8], bytes: &[u8]| self.backend.decode_text(page_id, font, bytes);
        let spans = collect_spans(&ops, decode, &fonts);

        Ok(build_layout(spans, width, height, page_index))
    }
}

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    // Text matrix [a b c d e f] and the start of the current line.
    matrix: [f32; 6],
    line: [f32; 6],
    leading: f32,
    font_resource: Vec<u8>,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            line: IDENTITY,
            leading: 0.0,
            font_resource: Vec::new(),
            font_size: 12.0,
        }
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl TextState {
    fn begin_text(&mut self) {
        self.matrix = IDENTITY;
        self.line = IDENTITY;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.line;
        self.line = [a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d];
        self.matrix = self.line;
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.matrix = m;
        self.line = m;
    }

    fn next_line(&mut self) {
        let leading = if self.leading == 0.0 {
            self.font_size * 1.2
        } else {
            self.leading
        };
        self.move_line(0.0, -leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.matrix[4], self.matrix[5])
    }

    fn effective_size(&self) -> f32 {
        let [a, b, ..] = self.matrix;
        self.font_size * (a * a + b * b).sqrt()
    }

    /// Advance the pen past a shown string so consecutive Tj calls on one
    /// line do not stack at the same x.
    fn advance(&mut self, width: f32) {
        let [a, b, ..] = self.matrix;
        let scale = (a * a + b * b).sqrt().max(f32::EPSILON);
        self.matrix[4] += width * a / scale;
        self.matrix[5] += width * b / scale;
    }
}

/// Walk content stream operations and collect positioned text spans.
///
/// `decode` turns raw string bytes into text for a font resource name;
/// `fonts` maps resource names to base font names.
pub fn collect_spans<F>(
    ops: &[ContentOp],
    decode: F,
    fonts: &BTreeMap<Vec<u8>, String>,
) -> Vec<TextSpan>
where
    F: Fn(&[u8], &[u8]) -> String,
{
    let mut spans = Vec::new();
    let mut state = TextState::default();
    let mut in_text = false;

    for op in ops {
        let shown = match op.operator.as_str() {
            "BT" => {
                in_text = true;
                state.begin_text();
                None
            }
            "ET" => {
                in_text = false;
                None
            }
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    state.font_resource = name.clone();
                }
                state.font_size = op.number_or(1, 12.0);
                None
            }
            "TL" => {
                state.leading = op.number_or(0, 0.0);
                None
            }
            "Td" => {
                state.move_line(op.number_or(0, 0.0), op.number_or(1, 0.0));
                None
            }
            "TD" => {
                let ty = op.number_or(1, 0.0);
                state.leading = -ty;
                state.move_line(op.number_or(0, 0.0), ty);
                None
            }
            "Tm" if op.operands.len() >= 6 => {
                state.set_matrix([
                    op.number_or(0, 1.0),
                    op.number_or(1, 0.0),
                    op.number_or(2, 0.0),
                    op.number_or(3, 1.0),
                    op.number_or(4, 0.0),
                    op.number_or(5, 0.0),
                ]);
                None
            }
            "T*" => {
                state.next_line();
                None
            }
            "Tj" => match op.operands.first() {
                Some(PdfValue::Str(bytes)) => Some(decode(&state.font_resource, bytes)),
                _ => None,
            },
            "TJ" => match op.operands.first() {
                Some(PdfValue::Array(items)) => {
                    Some(decode_tj_array(items, |b| decode(&state.font_resource, b)))
                }
                _ => None,
            },
            "'" => {
                state.next_line();
                match op.operands.first() {
                    Some(PdfValue::Str(bytes)) => Some(decode(&state.font_resource, bytes)),
                    _ => None,
                }
            }
            "\"" => {
                state.next_line();
                match op.operands.get(2) {
                    Some(PdfValue::Str(bytes)) => Some(decode(&state.font_resource, bytes)),
                    _ => None,
                }
            }
            _ => None,
        };

        let Some(text) = shown else { continue };
        if !in_text || text.trim().is_empty() {
            continue;
        }

        let text: String = text.nfc().collect();
        let (x, y) = state.position();
        let font_name = fonts
            .get(&state.font_resource)
            .cloned()
            .unwrap_or_else(|| String::from_utf8_lossy(&state.font_resource).to_string());
        let span = TextSpan::new(text, x, y, state.effective_size(), font_name);
        state.advance(span.width);
        spans.push(span);
    }

    spans
}

fn decode_tj_array<F>(items: &[PdfValue], decode: F) -> String
where
    F: Fn(&[u8]) -> String,
{
    let mut combined = String::new();
    for item in items {
        match item {
            PdfValue::Str(bytes) => combined.push_str(&decode(bytes)),
            other => {
                let Some(adjust) = other.as_number() else { continue };
                // Negative adjustments move the pen right.
                if -adjust > TJ_SPACE_THRESHOLD
                    && !combined.is_empty()
                    && !combined.ends_with(char::is_whitespace)
                    && !combined.chars().last().is_some_and(is_spaceless_script_char)
                {
                    combined.push(' ');
                }
            }
        }
    }
    combined
}

/// Turn raw spans into labelled blocks in reading order.
pub fn build_layout(spans: Vec<TextSpan>, width: f32, height: f32, page_index: u32) -> PageLayout {
    let mut stats = FontStatistics::default();
    for span in &spans {
        stats.add(span.font_size, span.text.chars().count());
    }
    stats.analyze();

    let mut lines = Vec::new();
    for column in split_columns(spans, width) {
        lines.extend(group_lines(column));
    }
    for line in &mut lines {
        line.heading_level = stats.heading_level(line.font_size);
    }

    let groups = group_blocks(lines);
    let block_count = groups.len();
    let mut seen_title = false;

    let blocks = groups
        .into_iter()
        .map(|lines| {
            let bbox = lines_bbox(&lines, height);
            let text = lines
                .iter()
                .map(TextLine::text)
                .map(|t| t.trim().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            let heading_level = lines
                .iter()
                .map(|l| l.heading_level)
                .filter(|l| *l > 0)
                .min()
                .unwrap_or(0);

            let in_top_band = bbox.bottom() < height * MARGIN_BAND;
            let in_bottom_band = bbox.y > height * (1.0 - MARGIN_BAND);
            let label = if block_count > 1 && lines.len() == 1 && in_top_band {
                LayoutLabel::PageHeader
            } else if block_count > 1 && lines.len() == 1 && in_bottom_band {
                LayoutLabel::PageFooter
            } else if heading_level == 1 && page_index == 0 && !seen_title {
                seen_title = true;
                LayoutLabel::Title
            } else if heading_level > 0 {
                LayoutLabel::SectionHeader
            } else if list_marker().is_match(&text) {
                LayoutLabel::ListItem
            } else {
                LayoutLabel::Text
            };

            LayoutBlock {
                text,
                label,
                bbox,
                heading_level,
            }
        })
        .filter(|b| !b.text.is_empty())
        .collect();

    PageLayout {
        width,
        height,
        blocks,
    }
}

fn list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[\u{2022}\u{00B7}\u{25AA}\u{2013}*-]|\(?\d{1,3}[.)]|\(?[a-z][.)])\s+\S")
            .expect("static regex")
    })
}

/// Split spans at a vertical gutter when the page has two text columns.
/// Returns columns left to right; a single-column page yields one group.
///
/// Only the part of each span that lies on the page takes part in gutter
/// detection.
fn split_columns(spans: Vec<TextSpan>, page_width: f32) -> Vec<Vec<TextSpan>> {
    const SLICE: f32 = 3.0;
    const MAX_SLICES: f32 = 2048.0;
    const MIN_GUTTER: f32 = 12.0;
    const MIN_COLUMN: f32 = 80.0;

    if spans.len() < 4 || !(page_width.is_finite() && page_width > 0.0) {
        return vec![spans];
    }
    let left_edge = |s: &TextSpan| s.x.clamp(0.0, page_width);
    let right_edge = |s: &TextSpan| s.right().clamp(0.0, page_width);
    let min_x = spans.iter().map(left_edge).fold(f32::MAX, f32::min);
    let max_x = spans.iter().map(right_edge).fold(f32::MIN, f32::max);
    let extent = max_x - min_x;
    if extent < 2.0 * MIN_COLUMN + MIN_GUTTER {
        return vec![spans];
    }

    let slice = SLICE.max(extent / MAX_SLICES);
    let slices = (extent / slice) as usize + 1;
    let mut occupied = vec![false; slices];
    for span in &spans {
        let start = (((left_edge(span) - min_x) / slice) as usize).min(slices - 1);
        let end = (((right_edge(span) - min_x) / slice) as usize).min(slices - 1);
        if start <= end {
            occupied[start..=end].fill(true);
        }
    }

    // Widest empty run within the middle of the text extent.
    let (lo, hi) = (slices * 15 / 100, slices * 85 / 100);
    let mut best: Option<(usize, usize)> = None;
    let mut run_start = None;
    for (i, &filled) in occupied.iter().enumerate().take(hi + 1).skip(lo) {
        match (filled || i == hi, run_start) {
            (false, None) => run_start = Some(i),
            (true, Some(start)) => {
                let len = i - start;
                if best.map_or(true, |(_, l)| len > l) {
                    best = Some((start, len));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    let Some((start, len)) = best else {
        return vec![spans];
    };
    if len as f32 * slice < MIN_GUTTER {
        return vec![spans];
    }
    let gutter = min_x + (start as f32 + len as f32 / 2.0) * slice;
    if gutter - min_x < MIN_COLUMN || max_x - gutter < MIN_COLUMN {
        return vec![spans];
    }

    let (left, right): (Vec<_>, Vec<_>) = spans.into_iter().partition(|s| s.center_x() < gutter);
    if left.len() < 2 || right.len() < 2 {
        let mut all = left;
        all.extend(right);
        return vec![all];
    }
    log::debug!("Two-column layout, gutter at x={:.1}", gutter);
    vec![left, right]
}

/// Group spans into lines by baseline proximity, top to bottom.
fn group_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    for span in spans {
        let same_line = current
            .first()
            .is_some_and(|first| (span.y - first.y).abs() <= span.font_size.max(1.0) * 0.3);
        if !same_line && !current.is_empty() {
            lines.push(TextLine::from_spans(std::mem::take(&mut current)));
        }
        current.push(span);
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }
    lines
}

/// Group consecutive lines into blocks at headings, wide gaps, size changes
/// and indentation changes.
fn group_blocks(lines: Vec<TextLine>) -> Vec<Vec<TextLine>> {
    let gaps: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|g| *g > 0.1)
        .collect();
    let avg_gap = if gaps.is_empty() {
        12.0
    } else {
        gaps.iter().sum::<f32>() / gaps.len() as f32
    };

    let mut blocks: Vec<Vec<TextLine>> = Vec::new();
    for line in lines {
        let starts_block = match blocks.last().and_then(|b| b.last()) {
            None => true,
            Some(prev) => {
                let gap = prev.y - line.y;
                line.heading_level > 0
                    || prev.heading_level > 0
                    || gap < 0.0
                    || gap > avg_gap * 1.5
                    || (prev.font_size - line.font_size).abs() > 1.0
                    || (prev.x - line.x).abs() > 20.0
                    || list_marker().is_match(&line.text())
            }
        };
        if starts_block {
            blocks.push(vec![line]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }
    blocks
}

fn lines_bbox(lines: &[TextLine], page_height: f32) -> BoundingBox {
    let left = lines.iter().map(|l| l.x).fold(f32::MAX, f32::min);
    let right = lines.iter().map(TextLine::right).fold(f32::MIN, f32::max);
    let top = lines.iter().map(TextLine::top).fold(f32::MIN, f32::max);
    let bottom = lines.iter().map(TextLine::bottom).fold(f32::MAX, f32::min);
    BoundingBox {
        x: left.max(0.0),
        y: (page_height - top).max(0.0),
        width: (right - left).max(0.0),
        height: (top - bottom).max(0.0),
    }
}

/// Scripts written without spaces between words.
fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF       // CJK Unified Ideographs
        | 0x3400..=0x4DBF     // Extension A
        | 0x20000..=0x2EBEF   // Extensions B-F
        | 0x3040..=0x30FF     // Hiragana, Katakana
        | 0x3000..=0x303F)    // CJK punctuation
}
