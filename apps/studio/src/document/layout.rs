//! Document tree → positioned draw items, one list per physical page.
//!
//! Coordinates are in points with the origin at the top-left corner of the
//! page; text `baseline` is the y of the glyph baseline. Columns stack,
//! rows place children side by side, and content that runs past the bottom
//! padding continues on a fresh page with the same size and padding.

use serde::Serialize;

use crate::document::font_metrics::FontFace;
use crate::document::style::{
    Color, FlexDirection, Justify, Length, Style, TextAlign, TextStyle,
};
use crate::document::tree::{DocumentTree, Inline, Node, PageNode, A4};

const EPSILON: f32 = 0.01;
/// Baseline position within the font size box.
const ASCENT: f32 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutDocument {
    pub pages: Vec<LaidOutPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutPage {
    pub width: f32,
    pub height: f32,
    pub items: Vec<DrawItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawItem {
    Text {
        x: f32,
        baseline: f32,
        text: String,
        face: FontFace,
        size: f32,
        color: Color,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        color: Color,
    },
}

impl DrawItem {
    fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            DrawItem::Text { x, baseline, .. } => {
                *x += dx;
                *baseline += dy;
            }
            DrawItem::Rect { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            DrawItem::Rule { x1, x2, y, .. } => {
                *x1 += dx;
                *x2 += dx;
                *y += dy;
            }
        }
    }
}

impl LaidOutDocument {
    /// All text on all pages, in paint order. Handy for assertions.
    pub fn text(&self) -> String {
        let mut out = Vec::new();
        for page in &self.pages {
            for item in &page.items {
                if let DrawItem::Text { text, .. } = item {
                    out.push(text.as_str());
                }
            }
        }
        out.join(" ")
    }
}

pub fn layout(tree: &DocumentTree) -> LaidOutDocument {
    let mut pages = Vec::new();
    for page in &tree.pages {
        pages.extend(layout_page(page));
    }
    if pages.is_empty() {
        pages.push(LaidOutPage {
            width: A4.0,
            height: A4.1,
            items: Vec::new(),
        });
    }
    LaidOutDocument { pages }
}

fn layout_page(page: &PageNode) -> Vec<LaidOutPage> {
    let [pt, pr, pb, pl] = page.style.padding.resolve(page.width);
    let mut flow = Flow::paged(pt, page.height - pb);
    let text_style = TextStyle::default().inherit(&page.style);
    let inner_width = (page.width - pl - pr).max(0.0);

    match page.style.flex_direction {
        Some(FlexDirection::Row) => layout_row(
            &mut flow,
            &page.children,
            pl,
            inner_width,
            &text_style,
            page.style.justify_content.unwrap_or_default(),
        ),
        _ => {
            for child in &page.children {
                layout_node(&mut flow, child, pl, inner_width, &text_style);
            }
        }
    }

    flow.pages
        .into_iter()
        .map(|mut items| {
            if let Some(color) = page.style.background_color {
                items.insert(
                    0,
                    DrawItem::Rect {
                        x: 0.0,
                        y: 0.0,
                        width: page.width,
                        height: page.height,
                        color,
                    },
                );
            }
            LaidOutPage {
                width: page.width,
                height: page.height,
                items,
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Flow
// ────────────────────────────────────────────────────────────────────────────

/// Vertical cursor over one or more pages.
struct Flow {
    top: f32,
    bottom: f32,
    paginate: bool,
    pages: Vec<Vec<DrawItem>>,
    y: f32,
}

impl Flow {
    fn paged(top: f32, bottom: f32) -> Self {
        Self {
            top,
            bottom,
            paginate: true,
            pages: vec![Vec::new()],
            y: top,
        }
    }

    /// A single endless page, for measuring row children.
    fn unbounded() -> Self {
        Self {
            top: 0.0,
            bottom: f32::INFINITY,
            paginate: false,
            pages: vec![Vec::new()],
            y: 0.0,
        }
    }

    fn page_index(&self) -> usize {
        self.pages.len() - 1
    }

    fn item_count(&self) -> usize {
        self.pages.last().map_or(0, Vec::len)
    }

    fn push(&mut self, item: DrawItem) {
        if let Some(page) = self.pages.last_mut() {
            page.push(item);
        }
    }

    fn insert(&mut self, index: usize, item: DrawItem) {
        if let Some(page) = self.pages.last_mut() {
            page.insert(index.min(page.len()), item);
        }
    }

    /// Starts a new page unless `height` still fits. A block taller than
    /// a whole page is placed at the top and allowed to overflow.
    fn ensure_room(&mut self, height: f32) {
        if self.paginate && self.y + height > self.bottom + EPSILON && self.y > self.top + EPSILON
        {
            self.pages.push(Vec::new());
            self.y = self.top;
        }
    }

    fn into_items(self) -> Vec<DrawItem> {
        self.pages.into_iter().flatten().collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Blocks
// ────────────────────────────────────────────────────────────────────────────

fn layout_node(flow: &mut Flow, node: &Node, x: f32, outer_width: f32, inherited: &TextStyle) {
    let style = node.style();
    let [mt, mr, mb, ml] = style.margin.resolve(outer_width);
    let [pt, pr, pb, pl] = style.padding.resolve(outer_width);
    let width = box_width(style, outer_width, ml + mr);
    let text_style = inherited.inherit(style);
    let left = x + ml;

    flow.y += mt;
    let start_page = flow.page_index();
    let start_index = flow.item_count();
    let start_y = flow.y;

    if let Some((thickness, color)) = style.border_top.stroke() {
        flow.ensure_room(thickness);
        flow.push(DrawItem::Rule {
            x1: left,
            x2: left + width,
            y: flow.y + thickness / 2.0,
            thickness,
            color,
        });
        flow.y += thickness;
    }
    flow.y += pt;

    let content_x = left + pl;
    let content_width = (width - pl - pr).max(0.0);
    match node {
        Node::View { style, children } => match style.flex_direction {
            Some(FlexDirection::Row) => layout_row(
                flow,
                children,
                content_x,
                content_width,
                &text_style,
                style.justify_content.unwrap_or_default(),
            ),
            _ => {
                for child in children {
                    layout_node(flow, child, content_x, content_width, &text_style);
                }
            }
        },
        Node::Text { spans, .. } => {
            let lines = wrap(tokenize(spans, &text_style), content_width);
            emit_lines(flow, &lines, content_x, content_width, &text_style);
        }
    }

    flow.y += pb;
    if let Some((thickness, color)) = style.border_bottom.stroke() {
        flow.push(DrawItem::Rule {
            x1: left,
            x2: left + width,
            y: flow.y + thickness / 2.0,
            thickness,
            color,
        });
        flow.y += thickness;
    }

    if let Some(color) = style.background_color {
        // Backgrounds are only painted for blocks that did not break across pages.
        if flow.page_index() == start_page {
            flow.insert(
                start_index,
                DrawItem::Rect {
                    x: left,
                    y: start_y,
                    width,
                    height: flow.y - start_y,
                    color,
                },
            );
        }
    }
    flow.y += mb;
}

fn box_width(style: &Style, outer_width: f32, horizontal_margin: f32) -> f32 {
    let mut width = (outer_width - horizontal_margin).max(0.0);
    if let Some(explicit) = style.width {
        width = width.min(explicit.resolve(outer_width));
    }
    if let Some(max) = style.max_width {
        width = width.min(max.resolve(outer_width));
    }
    width.max(0.0)
}

fn layout_row(
    flow: &mut Flow,
    children: &[Node],
    x: f32,
    width: f32,
    inherited: &TextStyle,
    justify: Justify,
) {
    if children.is_empty() {
        return;
    }
    let widths = row_widths(children, width, inherited);

    let mut blocks = Vec::with_capacity(children.len());
    for (child, child_width) in children.iter().zip(&widths) {
        let mut sub = Flow::unbounded();
        layout_node(&mut sub, child, 0.0, *child_width, inherited);
        let height = sub.y;
        blocks.push((sub.into_items(), height));
    }
    let row_height = blocks.iter().map(|(_, h)| *h).fold(0.0_f32, f32::max);
    flow.ensure_room(row_height);

    let used: f32 = widths.iter().sum();
    let free = (width - used).max(0.0);
    let n = children.len() as f32;
    let (mut cursor, gap) = match justify {
        Justify::FlexStart => (x, 0.0),
        Justify::FlexEnd => (x + free, 0.0),
        Justify::Center => (x + free / 2.0, 0.0),
        Justify::SpaceBetween if children.len() > 1 => (x, free / (n - 1.0)),
        Justify::SpaceBetween => (x, 0.0),
        Justify::SpaceAround => (x + free / n / 2.0, free / n),
    };

    let top = flow.y;
    for ((items, _), child_width) in blocks.into_iter().zip(&widths) {
        for mut item in items {
            item.translate(cursor, top);
            flow.push(item);
        }
        cursor += child_width + gap;
    }
    flow.y = top + row_height;
}

/// Outer widths of row children: explicit widths first, then `flex`
/// shares of what remains, then intrinsic widths (shrunk to fit).
fn row_widths(children: &[Node], width: f32, inherited: &TextStyle) -> Vec<f32> {
    let mut widths = vec![0.0_f32; children.len()];
    let mut flex_total = 0.0_f32;
    let mut fixed = 0.0_f32;
    let mut intrinsic = Vec::new();

    for (i, child) in children.iter().enumerate() {
        let style = child.style();
        let [_, mr, _, ml] = style.margin.resolve(width);
        if let Some(explicit) = style.width {
            widths[i] = explicit.resolve(width) + ml + mr;
            fixed += widths[i];
        } else if let Some(flex) = style.flex.filter(|f| *f > 0.0) {
            flex_total += flex;
        } else {
            widths[i] = intrinsic_width(child, inherited);
            intrinsic.push(i);
        }
    }

    let intrinsic_sum: f32 = intrinsic.iter().map(|&i| widths[i]).sum();
    let remaining = width - fixed - intrinsic_sum;
    if flex_total > 0.0 {
        let share = remaining.max(0.0) / flex_total;
        for (i, child) in children.iter().enumerate() {
            if let Some(flex) = child.style().flex.filter(|f| *f > 0.0) {
                if child.style().width.is_none() {
                    widths[i] = share * flex;
                }
            }
        }
    }
    if remaining < 0.0 && intrinsic_sum > 0.0 {
        let available = (width - fixed).max(0.0);
        let scale = available / intrinsic_sum;
        for &i in &intrinsic {
            widths[i] *= scale;
        }
    }
    widths
}

/// Max-content width: the width a node takes when nothing wraps.
fn intrinsic_width(node: &Node, inherited: &TextStyle) -> f32 {
    let style = node.style();
    let [_, mr, _, ml] = style.margin.resolve(0.0);
    let [_, pr, _, pl] = style.padding.resolve(0.0);
    if let Some(Length::Pt(w)) = style.width {
        return w + ml + mr;
    }
    let text_style = inherited.inherit(style);
    let content = match node {
        Node::Text { spans, .. } => wrap(tokenize(spans, &text_style), f32::INFINITY)
            .iter()
            .map(Line::width)
            .fold(0.0_f32, f32::max),
        Node::View { style, children } => {
            let widths = children.iter().map(|c| intrinsic_width(c, &text_style));
            match style.flex_direction {
                Some(FlexDirection::Row) => widths.sum(),
                _ => widths.fold(0.0_f32, f32::max),
            }
        }
    };
    let mut total = content + pl + pr;
    if let Some(Length::Pt(max)) = style.max_width {
        total = total.min(max);
    }
    total + ml + mr
}

// ────────────────────────────────────────────────────────────────────────────
// Text
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    style: TextStyle,
    width: f32,
    space: bool,
}

impl Piece {
    fn new(text: String, style: TextStyle, space: bool) -> Self {
        let width = style.face.measure(&text, style.size);
        Self {
            text,
            style,
            width,
            space,
        }
    }
}

#[derive(Debug, Clone)]
enum Token {
    Word(Piece),
    Space(Piece),
    Break,
}

#[derive(Debug, Default)]
struct Line {
    pieces: Vec<Piece>,
}

impl Line {
    fn width(&self) -> f32 {
        self.pieces.iter().map(|p| p.width).sum()
    }
}

/// Splits styled runs into words, collapsed spaces and hard breaks.
fn tokenize(spans: &[Inline], style: &TextStyle) -> Vec<Token> {
    let mut runs = Vec::new();
    collect_runs(spans, style, &mut runs);

    let mut tokens: Vec<Token> = Vec::new();
    for (text, style) in runs {
        let mut word = String::new();
        for c in text.chars() {
            if c == '\n' || c.is_whitespace() {
                if !word.is_empty() {
                    tokens.push(Token::Word(Piece::new(std::mem::take(&mut word), style, false)));
                }
                if c == '\n' {
                    tokens.push(Token::Break);
                } else if !matches!(tokens.last(), Some(Token::Space(_))) {
                    tokens.push(Token::Space(Piece::new(" ".to_string(), style, true)));
                }
            } else {
                word.push(c);
            }
        }
        if !word.is_empty() {
            tokens.push(Token::Word(Piece::new(word, style, false)));
        }
    }
    tokens
}

fn collect_runs(spans: &[Inline], style: &TextStyle, out: &mut Vec<(String, TextStyle)>) {
    for span in spans {
        match span {
            Inline::Run(text) => out.push((style.transform.apply(text), *style)),
            Inline::Span {
                style: span_style,
                children,
            } => collect_runs(children, &style.inherit(span_style), out),
        }
    }
}

/// Greedy line breaking. Words wider than the line are broken between
/// characters.
fn wrap(tokens: Vec<Token>, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut line_width = 0.0_f32;
    let mut pending_space: Option<Piece> = None;

    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        match token {
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
                pending_space = None;
            }
            Token::Space(piece) => {
                if !line.pieces.is_empty() {
                    pending_space = Some(piece);
                }
            }
            Token::Word(first) => {
                // Adjacent words from differently styled runs wrap as one.
                let mut word = vec![first];
                while let Some(Token::Word(_)) = tokens.peek() {
                    if let Some(Token::Word(piece)) = tokens.next() {
                        word.push(piece);
                    }
                }
                let word_width: f32 = word.iter().map(|p| p.width).sum();
                let space_width = pending_space.as_ref().map_or(0.0, |s| s.width);

                if !line.pieces.is_empty()
                    && line_width + space_width + word_width > max_width + EPSILON
                {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                    pending_space = None;
                }

                if line.pieces.is_empty() && word_width > max_width + EPSILON {
                    let mut chunks = split_word(word, max_width);
                    let last = chunks.pop().unwrap_or_default();
                    for chunk in chunks {
                        lines.push(Line { pieces: chunk });
                    }
                    line_width = last.iter().map(|p| p.width).sum();
                    line.pieces = last;
                    continue;
                }

                if let Some(space) = pending_space.take() {
                    line_width += space.width;
                    line.pieces.push(space);
                }
                line_width += word_width;
                line.pieces.extend(word);
            }
        }
    }
    if !line.pieces.is_empty() {
        lines.push(line);
    }
    lines
}

fn split_word(word: Vec<Piece>, max_width: f32) -> Vec<Vec<Piece>> {
    let mut chunks = Vec::new();
    let mut chunk: Vec<Piece> = Vec::new();
    let mut chunk_width = 0.0_f32;

    for piece in word {
        let mut buf = String::new();
        let mut buf_width = 0.0_f32;
        for c in piece.text.chars() {
            let mut tmp = [0u8; 4];
            let cw = piece.style.face.measure(c.encode_utf8(&mut tmp), piece.style.size);
            if chunk_width + buf_width + cw > max_width && chunk_width + buf_width > 0.0 {
                if !buf.is_empty() {
                    chunk.push(Piece::new(std::mem::take(&mut buf), piece.style, false));
                }
                chunks.push(std::mem::take(&mut chunk));
                chunk_width = 0.0;
                buf_width = 0.0;
            }
            buf.push(c);
            buf_width += cw;
        }
        if !buf.is_empty() {
            chunk_width += buf_width;
            chunk.push(Piece::new(buf, piece.style, false));
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

fn emit_lines(flow: &mut Flow, lines: &[Line], x: f32, width: f32, base: &TextStyle) {
    let count = lines.len();
    for (index, line) in lines.iter().enumerate() {
        let height = line
            .pieces
            .iter()
            .map(|p| p.style.line_height())
            .fold(base.line_height(), f32::max);
        let size = line
            .pieces
            .iter()
            .map(|p| p.style.size)
            .fold(0.0_f32, f32::max);
        let size = if size > 0.0 { size } else { base.size };
        flow.ensure_room(height);
        let baseline = flow.y + (height - size) / 2.0 + size * ASCENT;

        let line_width = line.width();
        let free = (width - line_width).max(0.0);
        let spaces = line.pieces.iter().filter(|p| p.space).count();
        let (mut cursor, extra) = match base.align {
            TextAlign::Left => (x, 0.0),
            TextAlign::Center => (x + free / 2.0, 0.0),
            TextAlign::Right => (x + free, 0.0),
            TextAlign::Justify if index + 1 < count && spaces > 0 => (x, free / spaces as f32),
            TextAlign::Justify => (x, 0.0),
        };

        let mut run: Option<(f32, String, TextStyle)> = None;
        for piece in &line.pieces {
            if piece.space && extra > 0.0 {
                flush_run(flow, &mut run, baseline);
                cursor += piece.width + extra;
                continue;
            }
            let same_style = matches!(&run, Some((_, _, style)) if *style == piece.style);
            match run.as_mut() {
                Some((_, text, _)) if same_style => text.push_str(&piece.text),
                _ => {
                    flush_run(flow, &mut run, baseline);
                    run = Some((cursor, piece.text.clone(), piece.style));
                }
            }
            cursor += piece.width;
        }
        flush_run(flow, &mut run, baseline);
        flow.y += height;
    }
}

fn flush_run(flow: &mut Flow, run: &mut Option<(f32, String, TextStyle)>, baseline: f32) {
    if let Some((x, text, style)) = run.take() {
        flow.push(DrawItem::Text {
            x,
            baseline,
            text,
            face: style.face,
            size: style.size,
            color: style.color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::compiler::compile;
    use crate::document::templates::{DEFAULT_TEMPLATE, RESUME_TEMPLATE};
    use crate::document::tree;

    fn layout_source(source: &str) -> LaidOutDocument {
        let doc = compile(source).unwrap();
        layout(&tree::build(&doc.invoke().unwrap()).unwrap())
    }

    fn texts(page: &LaidOutPage) -> Vec<(f32, f32, String)> {
        page.items
            .iter()
            .filter_map(|item| match item {
                DrawItem::Text {
                    x, baseline, text, ..
                } => Some((*x, *baseline, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_default_template_fits_one_page() {
        let laid = layout_source(DEFAULT_TEMPLATE);
        assert_eq!(laid.pages.len(), 1);
        let text = laid.text();
        assert!(text.contains("JOHN DOE"));
        assert!(text.contains("EDUCATION"));
        assert!(text.contains("09/2015 - 05/2019"));
    }

    #[test]
    fn test_resume_template_draws_rules_and_bullets() {
        let laid = layout_source(RESUME_TEMPLATE);
        let page = &laid.pages[0];
        let rules = page
            .items
            .iter()
            .filter(|i| matches!(i, DrawItem::Rule { .. }))
            .count();
        // One under each of the four section titles.
        assert_eq!(rules, 4);
        assert!(laid.text().contains('•'));
    }

    #[test]
    fn test_text_is_inside_page_padding() {
        let laid = layout_source(DEFAULT_TEMPLATE);
        let page = &laid.pages[0];
        for (x, baseline, _) in texts(page) {
            assert!(x >= 30.0 - EPSILON, "x {x} left of padding");
            assert!(baseline <= page.height - 30.0);
        }
    }

    #[test]
    fn test_centered_header() {
        let laid = layout_source(DEFAULT_TEMPLATE);
        let (x, _, text) = texts(&laid.pages[0]).into_iter().next().unwrap();
        assert_eq!(text, "JOHN DOE");
        let face = FontFace::default();
        let w = face.measure("JOHN DOE", 14.0);
        let expected = 30.0 + (595.28 - 60.0 - w) / 2.0;
        assert!((x - expected).abs() < 0.5, "x {x} vs {expected}");
    }

    #[test]
    fn test_space_between_pushes_date_to_right_edge() {
        let laid = layout_source(DEFAULT_TEMPLATE);
        let page = &laid.pages[0];
        let (x, _, _) = texts(page)
            .into_iter()
            .find(|(_, _, t)| t == "01/2020 - Present")
            .unwrap();
        let face = FontFace {
            bold: true,
            italic: true,
            ..FontFace::default()
        };
        let w = face.measure("01/2020 - Present", 11.0);
        // Row inset by 10pt of margin on each side of the title block.
        let right_edge = 595.28 - 30.0 - 10.0;
        assert!((x + w - right_edge).abs() < 1.0, "ends at {}", x + w);
    }

    #[test]
    fn test_long_text_wraps_within_width() {
        let source = "const ResumeDocument = () => (<Document><Page style={{ padding: 50 }}>\
                      <Text>Spearheaded development of payment gateway integration for e-commerce platform, leading team of 5 developers and reducing transaction processing time by 35% across every region we served</Text>\
                      </Page></Document>);";
        let laid = layout_source(source);
        let page = &laid.pages[0];
        let lines = texts(page);
        assert!(lines.len() > 2, "expected wrapping, got {lines:?}");
        for (x, _, text) in &lines {
            let w = FontFace::default().measure(text, 12.0);
            assert!(x + w <= page.width - 50.0 + 0.5, "line overflows: {text}");
        }
    }

    #[test]
    fn test_overflow_continues_on_new_page() {
        let source = "const items = ['a','b','c','d','e','f','g','h','i','j'];\n\
                      const many = items.concat(items, items, items, items, items, items, items, items, items);\n\
                      const ResumeDocument = () => (<Document><Page size=\"A5\" style={{ padding: 20 }}>\
                      {many.map((m, i) => <Text key={i} style={{ fontSize: 12 }}>{m}</Text>)}\
                      </Page></Document>);";
        let laid = layout_source(source);
        assert!(laid.pages.len() >= 2);
        for page in &laid.pages {
            assert_eq!(page.width, 419.53);
            for (_, baseline, _) in texts(page) {
                assert!(baseline >= 20.0 && baseline <= page.height - 20.0);
            }
        }
    }

    #[test]
    fn test_flex_share_in_row() {
        let source = "const ResumeDocument = () => (<Document><Page style={{ padding: 0 }}>\
                      <View style={{ flexDirection: 'row' }}>\
                        <Text style={{ width: 10 }}>•</Text>\
                        <Text style={{ flex: 1 }}>Item</Text>\
                      </View></Page></Document>);";
        let laid = layout_source(source);
        let lines = texts(&laid.pages[0]);
        assert_eq!(lines[0].0, 0.0);
        assert!((lines[1].0 - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_background_is_painted_behind_content() {
        let source = "const ResumeDocument = () => (<Document><Page style={{ backgroundColor: '#ffffff' }}>\
                      <View style={{ backgroundColor: '#eeeeee', padding: 4 }}><Text>Hi</Text></View>\
                      </Page></Document>);";
        let laid = layout_source(source);
        let items = &laid.pages[0].items;
        assert!(matches!(items[0], DrawItem::Rect { width, .. } if width == 595.28));
        assert!(matches!(items[1], DrawItem::Rect { .. }));
        assert!(matches!(items[2], DrawItem::Text { .. }));
    }

    #[test]
    fn test_hard_break_in_string_literal() {
        let source = "const ResumeDocument = () => (<Document><Page><Text>{'one\\ntwo'}</Text></Page></Document>);";
        let laid = layout_source(source);
        let lines = texts(&laid.pages[0]);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].1 > lines[0].1);
    }
}
