//! Element values → document tree (`Document` → `Page`s → `View`/`Text`).
//!
//! Arrays and fragments are flattened, `null`/`undefined`/booleans vanish,
//! and raw strings outside a `Text` are wrapped in one.

use crate::document::capabilities::Primitive;
use crate::document::eval::{number_to_string, Element, ElementKind, Value};
use crate::document::render::RenderError;
use crate::document::style::Style;

/// Named page sizes in points (portrait).
pub const A4: (f32, f32) = (595.28, 841.89);
pub const LETTER: (f32, f32) = (612.0, 792.0);
pub const LEGAL: (f32, f32) = (612.0, 1008.0);
const A3: (f32, f32) = (841.89, 1190.55);
const A5: (f32, f32) = (419.53, 595.28);

/// Elements, arrays and fragments open at once while building.
const MAX_TREE_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree {
    pub pages: Vec<PageNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageNode {
    pub width: f32,
    pub height: f32,
    pub style: Style,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    View { style: Style, children: Vec<Node> },
    Text { style: Style, spans: Vec<Inline> },
}

impl Node {
    pub fn style(&self) -> &Style {
        match self {
            Node::View { style, .. } | Node::Text { style, .. } => style,
        }
    }
}

/// Content of a `Text`: plain runs and nested, separately styled spans.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Run(String),
    Span { style: Style, children: Vec<Inline> },
}

/// Converts the value returned by the root component.
pub fn build(root: &Value) -> Result<DocumentTree, RenderError> {
    let mut top = Vec::new();
    flatten(root, &mut top, 0)?;
    let document = match top.as_slice() {
        [Value::Element(el)] if el.kind == ElementKind::Primitive(Primitive::Document) => el,
        [] => {
            return Err(RenderError::Structure(
                "ResumeDocument rendered nothing".to_string(),
            ))
        }
        _ => {
            return Err(RenderError::Structure(
                "ResumeDocument must render a single <Document>".to_string(),
            ))
        }
    };

    let mut pages = Vec::new();
    for child in flattened(&document.children, 1)? {
        match &child {
            Value::Element(el) if el.kind == ElementKind::Primitive(Primitive::Page) => {
                pages.push(build_page(el, 2)?);
            }
            Value::Str(s) if s.trim().is_empty() => {}
            _ => {
                return Err(RenderError::Structure(
                    "<Document> children must be <Page> elements".to_string(),
                ))
            }
        }
    }
    Ok(DocumentTree { pages })
}

fn flatten(value: &Value, out: &mut Vec<Value>, depth: usize) -> Result<(), RenderError> {
    match value {
        Value::Array(items) => flatten_all(items, out, depth + 1)?,
        Value::Element(el) if el.kind == ElementKind::Fragment => {
            flatten_all(&el.children, out, depth + 1)?
        }
        Value::Undefined | Value::Null | Value::Bool(_) => {}
        other => out.push(other.clone()),
    }
    Ok(())
}

fn flatten_all(values: &[Value], out: &mut Vec<Value>, depth: usize) -> Result<(), RenderError> {
    if depth > MAX_TREE_DEPTH {
        return Err(RenderError::Structure(format!(
            "document nests deeper than {MAX_TREE_DEPTH} levels"
        )));
    }
    values.iter().try_for_each(|v| flatten(v, out, depth))
}

fn flattened(values: &[Value], depth: usize) -> Result<Vec<Value>, RenderError> {
    let mut out = Vec::new();
    flatten_all(values, &mut out, depth)?;
    Ok(out)
}

fn style_prop(el: &Element) -> Style {
    el.props
        .get("style")
        .map(Style::from_value)
        .unwrap_or_default()
}

fn build_page(el: &Element, depth: usize) -> Result<PageNode, RenderError> {
    let (mut width, mut height) = match el.props.get("size") {
        Some(size) => page_size(size)?,
        None => A4,
    };
    let landscape = matches!(
        el.props.get("orientation"),
        Some(Value::Str(o)) if o.as_ref() == "landscape"
    );
    if landscape && height > width {
        std::mem::swap(&mut width, &mut height);
    }
    Ok(PageNode {
        width,
        height,
        style: style_prop(el),
        children: build_nodes(&el.children, depth + 1)?,
    })
}

fn page_size(value: &Value) -> Result<(f32, f32), RenderError> {
    let unknown = || RenderError::Structure("unsupported page size".to_string());
    match value {
        Value::Str(name) => match name.to_ascii_uppercase().as_str() {
            "A4" => Ok(A4),
            "LETTER" => Ok(LETTER),
            "LEGAL" => Ok(LEGAL),
            "A3" => Ok(A3),
            "A5" => Ok(A5),
            _ => Err(unknown()),
        },
        Value::Array(dims) => match dims.as_slice() {
            [w, h] => Ok((w.to_number() as f32, h.to_number() as f32)),
            _ => Err(unknown()),
        },
        Value::Object(obj) => {
            let dim = |k: &str| obj.get(k).map(|v| v.to_number() as f32);
            match (dim("width"), dim("height")) {
                (Some(w), Some(h)) => Ok((w, h)),
                _ => Err(unknown()),
            }
        }
        _ => Err(unknown()),
    }
    .and_then(|(w, h)| {
        if w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 {
            Ok((w, h))
        } else {
            Err(unknown())
        }
    })
}

fn build_nodes(children: &[Value], depth: usize) -> Result<Vec<Node>, RenderError> {
    let mut nodes = Vec::new();
    for child in flattened(children, depth)? {
        match &child {
            Value::Element(el) => match el.kind {
                ElementKind::Primitive(Primitive::View) => nodes.push(Node::View {
                    style: style_prop(el),
                    children: build_nodes(&el.children, depth + 1)?,
                }),
                ElementKind::Primitive(Primitive::Text) => nodes.push(Node::Text {
                    style: style_prop(el),
                    spans: build_spans(&el.children, depth + 1)?,
                }),
                ElementKind::Primitive(p) => {
                    return Err(RenderError::Structure(format!(
                        "<{}> cannot be nested inside a page",
                        p.name()
                    )))
                }
                ElementKind::Fragment => {}
            },
            Value::Str(s) if s.trim().is_empty() => {}
            Value::Str(s) => nodes.push(Node::Text {
                style: Style::default(),
                spans: vec![Inline::Run(s.to_string())],
            }),
            Value::Number(n) => nodes.push(Node::Text {
                style: Style::default(),
                spans: vec![Inline::Run(number_to_string(*n))],
            }),
            other => return Err(invalid_child(other)),
        }
    }
    Ok(nodes)
}

fn build_spans(children: &[Value], depth: usize) -> Result<Vec<Inline>, RenderError> {
    let mut spans = Vec::new();
    for child in flattened(children, depth)? {
        match &child {
            Value::Str(s) => spans.push(Inline::Run(s.to_string())),
            Value::Number(n) => spans.push(Inline::Run(number_to_string(*n))),
            Value::Element(el) => match el.kind {
                ElementKind::Primitive(Primitive::Text | Primitive::View) => {
                    spans.push(Inline::Span {
                        style: style_prop(el),
                        children: build_spans(&el.children, depth + 1)?,
                    })
                }
                ElementKind::Primitive(p) => {
                    return Err(RenderError::Structure(format!(
                        "<{}> cannot be nested inside <Text>",
                        p.name()
                    )))
                }
                ElementKind::Fragment => {}
            },
            other => return Err(invalid_child(other)),
        }
    }
    Ok(spans)
}

fn invalid_child(value: &Value) -> RenderError {
    RenderError::Structure(format!(
        "objects are not valid as a child (found {})",
        value.type_of()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::compiler::compile;
    use crate::document::templates::DEFAULT_TEMPLATE;

    fn tree_of(source: &str) -> Result<DocumentTree, RenderError> {
        let doc = compile(source).unwrap();
        build(&doc.invoke().unwrap())
    }

    #[test]
    fn test_default_template_structure() {
        let tree = tree_of(DEFAULT_TEMPLATE).unwrap();
        assert_eq!(tree.pages.len(), 1);
        let page = &tree.pages[0];
        assert_eq!((page.width, page.height), A4);
        // Header, summary, experience, skills, education.
        assert_eq!(page.children.len(), 5);
    }

    #[test]
    fn test_mapped_children_are_flattened() {
        let source = "const items = ['a', 'b', 'c'];\n\
                      const ResumeDocument = () => (\n\
                        <Document><Page size=\"LETTER\">\n\
                          {items.map(i => <Text key={i}>{i}</Text>)}\n\
                          {false && <Text>hidden</Text>}\n\
                        </Page></Document>\n\
                      );";
        let tree = tree_of(source).unwrap();
        assert_eq!(tree.pages[0].children.len(), 3);
        assert_eq!((tree.pages[0].width, tree.pages[0].height), LETTER);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let tree = tree_of(
            "const ResumeDocument = () => <Document><Page size=\"A4\" orientation=\"landscape\"></Page></Document>;",
        )
        .unwrap();
        assert_eq!((tree.pages[0].width, tree.pages[0].height), (A4.1, A4.0));
    }

    #[test]
    fn test_nested_text_becomes_span() {
        let tree = tree_of(
            "const ResumeDocument = () => <Document><Page><Text>Hi <Text style={{ fontWeight: 'bold' }}>there</Text></Text></Page></Document>;",
        )
        .unwrap();
        match &tree.pages[0].children[0] {
            Node::Text { spans, .. } => {
                assert_eq!(spans[0], Inline::Run("Hi ".to_string()));
                assert!(matches!(&spans[1], Inline::Span { style, .. } if style.bold == Some(true)));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_root_must_be_document() {
        let err = tree_of("const ResumeDocument = () => <View></View>;").unwrap_err();
        assert!(matches!(err, RenderError::Structure(_)));
    }

    #[test]
    fn test_non_page_child_of_document_is_rejected() {
        let err =
            tree_of("const ResumeDocument = () => <Document><Text>x</Text></Document>;").unwrap_err();
        assert!(err.to_string().contains("<Page>"));
    }

    #[test]
    fn test_excessive_element_nesting_is_rejected() {
        let mut source = String::from("const v0 = <Text>leaf</Text>;\n");
        for i in 1..=200 {
            source.push_str(&format!("const v{i} = <View>{{v{}}}</View>;\n", i - 1));
        }
        source.push_str("const ResumeDocument = () => <Document><Page>{v200}</Page></Document>;");
        let err = tree_of(&source).unwrap_err();
        assert!(err.to_string().contains("nests deeper than"));
    }

    #[test]
    fn test_unknown_page_size_is_rejected() {
        let err = tree_of(
            "const ResumeDocument = () => <Document><Page size=\"B7\"></Page></Document>;",
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Structure(_)));
    }
}
