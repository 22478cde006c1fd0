//! Compiled document → preview surface and PDF bytes.
//!
//! Everything here is CPU-bound and runs on a blocking thread. Failures are
//! caught at this boundary: the preview degrades to an error panel rather
//! than failing the request.

use std::collections::HashMap;

use bytes::Bytes;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color as PdfColor, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon, Rgb,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::compiler::{self, CompileError, CompiledDocument};
use crate::document::eval::EvalError;
use crate::document::font_metrics::{FontFace, FontFamily};
use crate::document::layout::{self, DrawItem, LaidOutDocument, LaidOutPage};
use crate::document::style::Color;
use crate::document::tree;

/// Headline of the preview error panel.
pub const PREVIEW_ERROR: &str = "Error rendering PDF. Please check the content format.";

const PDF_TITLE: &str = "Resume";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error("{0}")]
    Structure(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Preview surface
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    /// Identity of the compiled document shown; `None` when compilation failed.
    pub document_id: Option<u64>,
    pub generation: u64,
    #[serde(flatten)]
    pub state: PreviewState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewState {
    Ready {
        layout: LaidOutDocument,
        #[serde(skip)]
        pdf: Bytes,
    },
    Failed {
        message: String,
        detail: String,
    },
}

/// The live preview. Holds the last rendered state until a newer one
/// replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct PreviewSurface {
    current: Option<Preview>,
}

impl PreviewSurface {
    pub fn current(&self) -> Option<&Preview> {
        self.current.as_ref()
    }

    /// True when the surface already shows `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|p| p.generation == generation)
    }

    pub fn pdf(&self) -> Option<Bytes> {
        match self.current.as_ref().map(|p| &p.state) {
            Some(PreviewState::Ready { pdf, .. }) => Some(pdf.clone()),
            _ => None,
        }
    }

    fn show_error(&mut self, document_id: Option<u64>, generation: u64, err: &RenderError) {
        warn!(generation, error = %err, "Preview render failed");
        self.current = Some(Preview {
            document_id,
            generation,
            state: PreviewState::Failed {
                message: PREVIEW_ERROR.to_string(),
                detail: err.to_string(),
            },
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer;

impl DocumentRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Invokes the component and lays out the resulting tree.
    pub fn render_layout(&self, doc: &CompiledDocument) -> Result<LaidOutDocument, RenderError> {
        let root = doc.invoke()?;
        let tree = tree::build(&root)?;
        Ok(layout::layout(&tree))
    }

    pub fn render_to_artifact(&self, doc: &CompiledDocument) -> Result<Vec<u8>, RenderError> {
        let laid_out = self.render_layout(doc)?;
        paint_pdf(&laid_out)
    }

    /// Shows `doc` on `surface`. Calling again with the same document
    /// returns the existing state untouched.
    pub fn render_preview<'s>(
        &self,
        surface: &'s mut PreviewSurface,
        doc: &CompiledDocument,
        generation: u64,
    ) -> &'s Preview {
        let already_shown = surface
            .current
            .as_ref()
            .is_some_and(|p| p.document_id == Some(doc.id()));
        if !already_shown {
            let rendered = self.render_layout(doc).and_then(|laid_out| {
                let pdf = paint_pdf(&laid_out)?;
                Ok((laid_out, pdf))
            });
            match rendered {
                Ok((laid_out, pdf)) => {
                    debug!(
                        document_id = doc.id(),
                        generation,
                        pages = laid_out.pages.len(),
                        "Preview rendered"
                    );
                    surface.current = Some(Preview {
                        document_id: Some(doc.id()),
                        generation,
                        state: PreviewState::Ready {
                            layout: laid_out,
                            pdf: Bytes::from(pdf),
                        },
                    });
                }
                Err(err) => surface.show_error(Some(doc.id()), generation, &err),
            }
        }
        match surface.current.as_ref() {
            Some(preview) => preview,
            None => unreachable!("preview surface was just populated"),
        }
    }

    /// Compiles `source` into a fresh document and shows it, unless the
    /// surface already displays `generation`.
    pub fn refresh_preview(&self, surface: &mut PreviewSurface, source: &str, generation: u64) {
        if surface.is_current(generation) {
            return;
        }
        match compiler::compile(source) {
            Ok(doc) => {
                self.render_preview(surface, &doc, generation);
            }
            Err(err) => surface.show_error(None, generation, &RenderError::from(err)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PDF painting
// ────────────────────────────────────────────────────────────────────────────

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn pdf_color(color: Color) -> PdfColor {
    PdfColor::Rgb(Rgb::new(color.r, color.g, color.b, None))
}

fn builtin_font(face: FontFace) -> BuiltinFont {
    match (face.family, face.bold, face.italic) {
        (FontFamily::Helvetica, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Helvetica, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Times, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Times, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Times, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Times, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Courier, false, false) => BuiltinFont::Courier,
        (FontFamily::Courier, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Courier, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Courier, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

/// Paints laid-out pages into a PDF using the standard fonts.
pub fn paint_pdf(laid_out: &LaidOutDocument) -> Result<Vec<u8>, RenderError> {
    let first = laid_out
        .pages
        .first()
        .ok_or_else(|| RenderError::Structure("document has no pages".to_string()))?;
    let (doc, page, layer) =
        PdfDocument::new(PDF_TITLE, mm(first.width), mm(first.height), "Layer 1");
    let mut fonts: HashMap<FontFace, IndirectFontRef> = HashMap::new();

    let first_layer = doc.get_page(page).get_layer(layer);
    paint_page(&doc, &first_layer, first, &mut fonts)?;

    for extra in laid_out.pages.iter().skip(1) {
        let (page, layer) = doc.add_page(mm(extra.width), mm(extra.height), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        paint_page(&doc, &layer, extra, &mut fonts)?;
    }

    doc.save_to_bytes()
        .map_err(|e| RenderError::Pdf(format!("{e:?}")))
}

fn paint_page(
    doc: &PdfDocumentReference,
    layer: &PdfLayerReference,
    page: &LaidOutPage,
    fonts: &mut HashMap<FontFace, IndirectFontRef>,
) -> Result<(), RenderError> {
    // PDF user space grows upwards from the bottom-left corner.
    let flip = |y: f32| page.height - y;

    for item in &page.items {
        match item {
            DrawItem::Rect {
                x,
                y,
                width,
                height,
                color,
            } => fill_rect(layer, *x, flip(*y + *height), *width, *height, *color),
            DrawItem::Rule {
                x1,
                x2,
                y,
                thickness,
                color,
            } => fill_rect(
                layer,
                *x1,
                flip(*y + *thickness / 2.0),
                *x2 - *x1,
                *thickness,
                *color,
            ),
            DrawItem::Text {
                x,
                baseline,
                text,
                face,
                size,
                color,
            } => {
                let font = match fonts.get(face) {
                    Some(font) => font.clone(),
                    None => {
                        let font = doc
                            .add_builtin_font(builtin_font(*face))
                            .map_err(|e| RenderError::Pdf(format!("{e:?}")))?;
                        fonts.insert(*face, font.clone());
                        font
                    }
                };
                layer.set_fill_color(pdf_color(*color));
                layer.use_text(text.as_str(), *size, mm(*x), mm(flip(*baseline)), &font);
            }
        }
    }
    Ok(())
}

/// Fills an axis-aligned rectangle whose bottom-left corner is `(x, y)` in
/// PDF space.
fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, width: f32, height: f32, color: Color) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    let ring = vec![
        (Point::new(mm(x), mm(y)), false),
        (Point::new(mm(x + width), mm(y)), false),
        (Point::new(mm(x + width), mm(y + height)), false),
        (Point::new(mm(x), mm(y + height)), false),
    ];
    layer.set_fill_color(pdf_color(color));
    layer.add_polygon(Polygon {
        rings: vec![ring],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}
