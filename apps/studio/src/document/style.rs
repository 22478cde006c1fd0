//! Style objects → typed layout properties.
//!
//! A `style` prop is an object or an array of objects (later entries win).
//! Unknown properties and unparseable values are ignored, the way a browser
//! drops CSS it does not understand.

use serde::Serialize;

use crate::document::eval::Value;
use crate::document::font_metrics::{FontFace, FontFamily};

pub const DEFAULT_FONT_SIZE: f32 = 12.0;
pub const DEFAULT_LINE_HEIGHT: f32 = 1.2;

// ────────────────────────────────────────────────────────────────────────────
// Value types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(inner) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<u8> = inner
                .split(',')
                .take(3)
                .map(|p| p.trim().parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0) as u8))
                .collect::<Option<_>>()?;
            if parts.len() == 3 {
                return Some(Self::from_bytes(parts[0], parts[1], parts[2]));
            }
            return None;
        }
        let (r, g, b) = match s.as_str() {
            "black" => (0, 0, 0),
            "white" => (255, 255, 255),
            "red" => (255, 0, 0),
            "green" => (0, 128, 0),
            "blue" => (0, 0, 255),
            "navy" => (0, 0, 128),
            "gray" | "grey" => (128, 128, 128),
            "darkgray" | "darkgrey" => (169, 169, 169),
            "lightgray" | "lightgrey" => (211, 211, 211),
            "silver" => (192, 192, 192),
            "maroon" => (128, 0, 0),
            "teal" => (0, 128, 128),
            "purple" => (128, 0, 128),
            "orange" => (255, 165, 0),
            _ => return None,
        };
        Some(Self::from_bytes(r, g, b))
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    match digits.len() {
        3 | 4 => Some(Color::from_bytes(
            digits[0] * 17,
            digits[1] * 17,
            digits[2] * 17,
        )),
        6 | 8 => Some(Color::from_bytes(
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Pt(f32),
    Percent(f32),
}

impl Length {
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_finite() => Some(Length::Pt(*n as f32)),
            Value::Str(s) => Self::parse_str(s),
            _ => None,
        }
    }

    fn parse_str(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let (number, factor) = if let Some(n) = s.strip_suffix('%') {
            return n.trim().parse::<f32>().ok().map(Length::Percent);
        } else if let Some(n) = s.strip_suffix("pt").or_else(|| s.strip_suffix("px")) {
            (n, 1.0)
        } else if let Some(n) = s.strip_suffix("in") {
            (n, 72.0)
        } else if let Some(n) = s.strip_suffix("mm") {
            (n, 72.0 / 25.4)
        } else if let Some(n) = s.strip_suffix("cm") {
            (n, 72.0 / 2.54)
        } else {
            (s, 1.0)
        };
        number
            .trim()
            .parse::<f32>()
            .ok()
            .map(|n| Length::Pt(n * factor))
    }

    pub fn resolve(self, reference: f32) -> f32 {
        match self {
            Length::Pt(v) => v,
            Length::Percent(p) => reference * p / 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

impl TextTransform {
    pub fn apply(self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Capitalize => {
                let mut out = String::with_capacity(text.len());
                let mut at_word_start = true;
                for c in text.chars() {
                    if at_word_start && c.is_alphabetic() {
                        out.extend(c.to_uppercase());
                    } else {
                        out.push(c);
                    }
                    at_word_start = c.is_whitespace();
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Column,
    Row,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    FlexStart,
    FlexEnd,
    Center,
    SpaceBetween,
    SpaceAround,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    Factor(f32),
    Points(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: Option<Length>,
    pub right: Option<Length>,
    pub bottom: Option<Length>,
    pub left: Option<Length>,
}

impl Edges {
    /// `[top, right, bottom, left]` in points.
    pub fn resolve(&self, reference: f32) -> [f32; 4] {
        let r = |l: Option<Length>| l.map(|l| l.resolve(reference)).unwrap_or(0.0);
        [r(self.top), r(self.right), r(self.bottom), r(self.left)]
    }

    fn set_all(&mut self, value: &Value) {
        let parts: Vec<Length> = match value {
            Value::Str(s) => s.split_whitespace().filter_map(Length::parse_str).collect(),
            other => Length::parse(other).into_iter().collect(),
        };
        let (t, r, b, l) = match parts.as_slice() {
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l, ..] => (*t, *r, *b, *l),
            [] => return,
        };
        *self = Edges {
            top: Some(t),
            right: Some(r),
            bottom: Some(b),
            left: Some(l),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Border {
    pub width: Option<f32>,
    pub color: Option<Color>,
}

impl Border {
    /// `1`, `'1pt'` or `'1px solid #000'`.
    fn set_shorthand(&mut self, value: &Value) {
        match value {
            Value::Str(s) => {
                for part in s.split_whitespace() {
                    if let Some(Length::Pt(w)) = Length::parse_str(part) {
                        self.width = Some(w);
                    } else if let Some(c) = Color::parse(part) {
                        self.color = Some(c);
                    }
                }
            }
            other => {
                if let Some(Length::Pt(w)) = Length::parse(other) {
                    self.width = Some(w);
                }
            }
        }
    }

    /// Stroke width and color when the border is visible.
    pub fn stroke(&self) -> Option<(f32, Color)> {
        match self.width {
            Some(w) if w > 0.0 => Some((w, self.color.unwrap_or(Color::BLACK))),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Style
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub font_size: Option<f32>,
    pub font_family: Option<FontFamily>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub color: Option<Color>,
    pub background_color: Option<Color>,
    pub text_align: Option<TextAlign>,
    pub text_transform: Option<TextTransform>,
    pub line_height: Option<LineHeight>,
    pub margin: Edges,
    pub padding: Edges,
    pub flex_direction: Option<FlexDirection>,
    pub justify_content: Option<Justify>,
    pub flex: Option<f32>,
    pub width: Option<Length>,
    pub max_width: Option<Length>,
    pub border_top: Border,
    pub border_bottom: Border,
}

impl Style {
    /// Resolves a `style` prop value.
    pub fn from_value(value: &Value) -> Self {
        let mut style = Style::default();
        style.apply_value(value);
        style
    }

    fn apply_value(&mut self, value: &Value) {
        match value {
            Value::Object(obj) => {
                for (key, v) in obj.iter() {
                    self.apply_property(key, v);
                }
            }
            Value::Array(items) => {
                for item in items.iter() {
                    self.apply_value(item);
                }
            }
            _ => {}
        }
    }

    fn apply_property(&mut self, key: &str, value: &Value) {
        let len = || Length::parse(value);
        match key {
            "fontSize" => {
                if let Some(Length::Pt(size)) = len() {
                    self.font_size = Some(size);
                }
            }
            "fontFamily" => {
                if let Value::Str(s) = value {
                    self.font_family = Some(FontFamily::from_css(s));
                    let lower = s.to_ascii_lowercase();
                    if lower.contains("bold") {
                        self.bold = Some(true);
                    }
                    if lower.contains("italic") || lower.contains("oblique") {
                        self.italic = Some(true);
                    }
                }
            }
            "fontWeight" => {
                self.bold = match value {
                    Value::Number(n) => Some(*n >= 600.0),
                    Value::Str(s) => match s.as_ref() {
                        "bold" | "bolder" | "semibold" | "ultrabold" | "heavy" => Some(true),
                        "normal" | "light" | "lighter" | "thin" | "ultralight" | "medium" => {
                            Some(false)
                        }
                        other => other.parse::<f32>().ok().map(|n| n >= 600.0),
                    },
                    _ => self.bold,
                };
            }
            "fontStyle" => {
                if let Value::Str(s) = value {
                    self.italic = Some(s.as_ref() == "italic" || s.as_ref() == "oblique");
                }
            }
            "color" => self.color = color_of(value).or(self.color),
            "backgroundColor" => self.background_color = color_of(value).or(self.background_color),
            "textAlign" => {
                if let Value::Str(s) = value {
                    self.text_align = match s.as_ref() {
                        "center" => Some(TextAlign::Center),
                        "right" => Some(TextAlign::Right),
                        "justify" => Some(TextAlign::Justify),
                        "left" => Some(TextAlign::Left),
                        _ => self.text_align,
                    };
                }
            }
            "textTransform" => {
                if let Value::Str(s) = value {
                    self.text_transform = match s.as_ref() {
                        "uppercase" => Some(TextTransform::Uppercase),
                        "lowercase" => Some(TextTransform::Lowercase),
                        "capitalize" => Some(TextTransform::Capitalize),
                        "none" => Some(TextTransform::None),
                        _ => self.text_transform,
                    };
                }
            }
            "lineHeight" => {
                if let Some(Length::Pt(v)) = len() {
                    // Unitless values up to 3 are multipliers, larger ones absolute.
                    let unitless = matches!(value, Value::Number(_));
                    self.line_height = Some(if unitless && v <= 3.0 {
                        LineHeight::Factor(v)
                    } else {
                        LineHeight::Points(v)
                    });
                }
            }
            "margin" => self.margin.set_all(value),
            "marginTop" => self.margin.top = len().or(self.margin.top),
            "marginRight" => self.margin.right = len().or(self.margin.right),
            "marginBottom" => self.margin.bottom = len().or(self.margin.bottom),
            "marginLeft" => self.margin.left = len().or(self.margin.left),
            "marginHorizontal" => {
                if let Some(l) = len() {
                    self.margin.left = Some(l);
                    self.margin.right = Some(l);
                }
            }
            "marginVertical" => {
                if let Some(l) = len() {
                    self.margin.top = Some(l);
                    self.margin.bottom = Some(l);
                }
            }
            "padding" => self.padding.set_all(value),
            "paddingTop" => self.padding.top = len().or(self.padding.top),
            "paddingRight" => self.padding.right = len().or(self.padding.right),
            "paddingBottom" => self.padding.bottom = len().or(self.padding.bottom),
            "paddingLeft" => self.padding.left = len().or(self.padding.left),
            "paddingHorizontal" => {
                if let Some(l) = len() {
                    self.padding.left = Some(l);
                    self.padding.right = Some(l);
                }
            }
            "paddingVertical" => {
                if let Some(l) = len() {
                    self.padding.top = Some(l);
                    self.padding.bottom = Some(l);
                }
            }
            "flexDirection" => {
                if let Value::Str(s) = value {
                    self.flex_direction = match s.as_ref() {
                        "row" | "row-reverse" => Some(FlexDirection::Row),
                        "column" | "column-reverse" => Some(FlexDirection::Column),
                        _ => self.flex_direction,
                    };
                }
            }
            "justifyContent" => {
                if let Value::Str(s) = value {
                    self.justify_content = match s.as_ref() {
                        "flex-start" | "start" => Some(Justify::FlexStart),
                        "flex-end" | "end" => Some(Justify::FlexEnd),
                        "center" => Some(Justify::Center),
                        "space-between" => Some(Justify::SpaceBetween),
                        "space-around" | "space-evenly" => Some(Justify::SpaceAround),
                        _ => self.justify_content,
                    };
                }
            }
            "flex" | "flexGrow" => {
                let n = value.to_number();
                if n.is_finite() {
                    self.flex = Some(n as f32);
                }
            }
            "width" => self.width = len().or(self.width),
            "maxWidth" => self.max_width = len().or(self.max_width),
            "borderBottom" => self.border_bottom.set_shorthand(value),
            "borderBottomWidth" => {
                if let Some(Length::Pt(w)) = len() {
                    self.border_bottom.width = Some(w);
                }
            }
            "borderBottomColor" => {
                self.border_bottom.color = color_of(value).or(self.border_bottom.color)
            }
            "borderTop" => self.border_top.set_shorthand(value),
            "borderTopWidth" => {
                if let Some(Length::Pt(w)) = len() {
                    self.border_top.width = Some(w);
                }
            }
            "borderTopColor" => self.border_top.color = color_of(value).or(self.border_top.color),
            _ => {}
        }
    }
}

fn color_of(value: &Value) -> Option<Color> {
    match value {
        Value::Str(s) => Color::parse(s),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inherited text properties
// ────────────────────────────────────────────────────────────────────────────

/// Text properties after inheritance, ready for measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: FontFace,
    pub size: f32,
    pub color: Color,
    pub align: TextAlign,
    pub transform: TextTransform,
    line_height: LineHeight,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            face: FontFace::default(),
            size: DEFAULT_FONT_SIZE,
            color: Color::BLACK,
            align: TextAlign::Left,
            transform: TextTransform::None,
            line_height: LineHeight::Factor(DEFAULT_LINE_HEIGHT),
        }
    }
}

impl TextStyle {
    /// Child text style: inherited values overridden by `style`.
    pub fn inherit(&self, style: &Style) -> TextStyle {
        TextStyle {
            face: FontFace {
                family: style.font_family.unwrap_or(self.face.family),
                bold: style.bold.unwrap_or(self.face.bold),
                italic: style.italic.unwrap_or(self.face.italic),
            },
            size: style.font_size.unwrap_or(self.size),
            color: style.color.unwrap_or(self.color),
            align: style.text_align.unwrap_or(self.align),
            transform: style.text_transform.unwrap_or(self.transform),
            line_height: style.line_height.unwrap_or(self.line_height),
        }
    }

    /// Line advance in points.
    pub fn line_height(&self) -> f32 {
        match self.line_height {
            LineHeight::Factor(f) => self.size * f,
            LineHeight::Points(p) => p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::eval::Object;
    use std::rc::Rc;

    fn obj(entries: &[(&str, Value)]) -> Value {
        let mut o = Object::new();
        for (k, v) in entries {
            o.set(*k, v.clone());
        }
        Value::Object(Rc::new(o))
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::parse("#000"), Some(Color::BLACK));
        let grey = Color::parse("#666666").unwrap();
        assert!((grey.r - 0.4).abs() < 1e-3);
        assert_eq!(Color::parse("#666"), Color::parse("#666666"));
        assert_eq!(Color::parse("rgb(0, 0, 0)"), Some(Color::BLACK));
        assert_eq!(Color::parse("white"), Color::parse("#fff"));
        assert_eq!(Color::parse("nonsense"), None);
    }

    #[test]
    fn test_length_units() {
        assert_eq!(Length::parse(&Value::Number(10.0)), Some(Length::Pt(10.0)));
        assert_eq!(Length::parse(&Value::str("1in")), Some(Length::Pt(72.0)));
        assert_eq!(Length::parse(&Value::str("50%")), Some(Length::Percent(50.0)));
        match Length::parse(&Value::str("25.4mm")) {
            Some(Length::Pt(v)) => assert!((v - 72.0).abs() < 1e-3),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(Length::Percent(50.0).resolve(200.0), 100.0);
    }

    #[test]
    fn test_array_styles_merge_in_order() {
        let a = obj(&[("fontSize", Value::Number(10.0)), ("color", Value::str("#f00"))]);
        let b = obj(&[("fontSize", Value::Number(14.0))]);
        let style = Style::from_value(&Value::Array(Rc::new(vec![a, b, Value::Null])));
        assert_eq!(style.font_size, Some(14.0));
        assert_eq!(style.color, Color::parse("red"));
    }

    #[test]
    fn test_shorthands() {
        let style = Style::from_value(&obj(&[
            ("padding", Value::Number(30.0)),
            ("paddingHorizontal", Value::Number(5.0)),
            ("margin", Value::str("1 2")),
        ]));
        assert_eq!(style.padding.resolve(0.0), [30.0, 5.0, 30.0, 5.0]);
        assert_eq!(style.margin.resolve(0.0), [1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_border_forms() {
        let style = Style::from_value(&obj(&[("borderBottom", Value::Number(1.0))]));
        assert_eq!(style.border_bottom.stroke(), Some((1.0, Color::BLACK)));
        let style = Style::from_value(&obj(&[("borderBottom", Value::str("2px solid #888"))]));
        let (w, c) = style.border_bottom.stroke().unwrap();
        assert_eq!(w, 2.0);
        assert_eq!(Some(c), Color::parse("#888"));
        let style = Style::from_value(&obj(&[("borderBottomWidth", Value::Number(0.0))]));
        assert_eq!(style.border_bottom.stroke(), None);
    }

    #[test]
    fn test_font_weight_and_family() {
        let style = Style::from_value(&obj(&[
            ("fontFamily", Value::str("Arial")),
            ("fontWeight", Value::str("bold")),
            ("fontStyle", Value::str("italic")),
        ]));
        let text = TextStyle::default().inherit(&style);
        assert_eq!(text.face.postscript_name(), "Helvetica-BoldOblique");
        let style = Style::from_value(&obj(&[("fontWeight", Value::Number(400.0))]));
        assert_eq!(style.bold, Some(false));
    }

    #[test]
    fn test_text_style_inheritance_and_line_height() {
        let parent = TextStyle::default().inherit(&Style::from_value(&obj(&[
            ("fontSize", Value::Number(10.0)),
            ("lineHeight", Value::Number(1.3)),
        ])));
        assert!((parent.line_height() - 13.0).abs() < 1e-4);
        let child = parent.inherit(&Style::from_value(&obj(&[("fontSize", Value::Number(20.0))])));
        assert!((child.line_height() - 26.0).abs() < 1e-4);
        let absolute = parent.inherit(&Style::from_value(&obj(&[("lineHeight", Value::Number(18.0))])));
        assert_eq!(absolute.line_height(), 18.0);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(TextTransform::Capitalize.apply("hello big world"), "Hello Big World");
    }
}
