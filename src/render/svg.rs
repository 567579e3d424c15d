//! Visual tree to SVG.
//!
//! [`SvgRenderer`] solves the card's flex layout (see [`crate::render::flex`]) and writes each
//! box as SVG: backgrounds as `<rect>`s, text blocks as one `<text>` per broken line. Text is
//! drawn with the family the layout measured it with, so the raster matches the layout.

use std::{borrow::Cow, fmt::Write as _};

use crate::{
    foundation::{
        core::{Canvas, Point, Rect, Vec2},
        error::{OgError, OgResult},
    },
    layout::tree::{Background, FontWeight, VisualNode},
    render::{
        flex::{BoxContent, LayoutBox, compute_layout},
        fonts::{FontAssets, build_fontdb},
        text::{TextBlock, TextEngine, TextStyle, strip_invalid_xml},
    },
};

/// Inter's cap height in ems; centers glyphs in their line box when no face metrics exist.
const CAP_HEIGHT_EM: f64 = 0.727;
const FALLBACK_FAMILY: &str = "sans-serif";

/// Lays out visual trees on a fixed canvas and emits SVG for them.
pub struct SvgRenderer {
    canvas: Canvas,
    engine: TextEngine,
    options: usvg::Options<'static>,
}

impl SvgRenderer {
    /// A renderer using exactly `fonts`. Without fonts, text keeps its place in the document but
    /// measures zero wide and has no face to draw with.
    pub fn new(canvas: Canvas, fonts: Option<&FontAssets>) -> Self {
        let engine = TextEngine::new(fonts);
        let options = usvg::Options {
            fontdb: build_fontdb(fonts),
            font_family: engine.family().unwrap_or(FALLBACK_FAMILY).to_string(),
            ..Default::default()
        };
        Self {
            canvas,
            engine,
            options,
        }
    }

    /// Like [`SvgRenderer::new`], with a system sans-serif pair standing in for missing fonts.
    pub fn with_system_fallback(canvas: Canvas, fonts: Option<&FontAssets>) -> Self {
        match fonts {
            Some(fonts) => Self::new(canvas, Some(fonts)),
            None => Self::new(canvas, FontAssets::from_system().as_ref()),
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Family name written into the SVG, when a face is loaded.
    pub fn family(&self) -> Option<&str> {
        self.engine.family()
    }

    /// Resolve positions for `root`, which fills the canvas.
    pub fn layout(&mut self, root: &VisualNode) -> OgResult<LayoutBox> {
        compute_layout(root, self.canvas, &mut self.engine)
    }

    /// Lay out `root` and serialize it as a standalone SVG document.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn render_document(&mut self, root: &VisualNode) -> OgResult<String> {
        let layout = self.layout(root)?;
        let mut writer = SvgWriter::new(self.engine.family());
        writer.emit_box(&layout, Point::ORIGIN).map_err(fmt_err)?;
        writer.finish(self.canvas).map_err(fmt_err)
    }

    /// Parse SVG text into a render tree with this renderer's fonts.
    pub fn parse(&self, svg: &str) -> OgResult<usvg::Tree> {
        usvg::Tree::from_str(svg, &self.options)
            .map_err(|e| OgError::render(format!("parse svg: {e}")))
    }

    /// Lay out, serialize, and parse `root` in one step.
    pub fn render(&mut self, root: &VisualNode) -> OgResult<usvg::Tree> {
        let svg = self.render_document(root)?;
        self.parse(&svg)
    }
}

/// Render `root` to SVG text with `fonts`, or a system pair when `fonts` is `None`.
pub fn render_svg(root: &VisualNode, canvas: Canvas, fonts: Option<&FontAssets>) -> OgResult<String> {
    SvgRenderer::with_system_fallback(canvas, fonts).render_document(root)
}

/// Parse SVG text with `fonts`, or a system pair when `fonts` is `None`.
pub fn parse_svg(svg: &str, fonts: Option<&FontAssets>) -> OgResult<usvg::Tree> {
    SvgRenderer::with_system_fallback(Canvas::default(), fonts).parse(svg)
}

fn fmt_err(_: std::fmt::Error) -> OgError {
    OgError::render("failed to format svg")
}

struct SvgWriter<'a> {
    /// Overrides every text block's family stack.
    family: Option<&'a str>,
    defs: String,
    body: String,
    gradients: usize,
}

impl<'a> SvgWriter<'a> {
    fn new(family: Option<&'a str>) -> Self {
        Self {
            family,
            defs: String::new(),
            body: String::new(),
            gradients: 0,
        }
    }

    fn emit_box(&mut self, b: &LayoutBox, origin: Point) -> std::fmt::Result {
        if let Some(bg) = &b.background {
            self.emit_background(bg, Rect::from_origin_size(origin, b.size))?;
        }
        match &b.content {
            BoxContent::Text {
                block,
                style,
                inset,
            } => self.emit_text(block, style, origin + *inset),
            BoxContent::Children(children) => {
                for (offset, child) in children {
                    self.emit_box(child, origin + *offset)?;
                }
                Ok(())
            }
        }
    }

    fn emit_background(&mut self, bg: &Background, rect: Rect) -> std::fmt::Result {
        let fill = match bg {
            Background::Solid { color } => color.to_hex(),
            Background::LinearGradient {
                angle_deg,
                from,
                to,
            } => {
                self.gradients += 1;
                let id = format!("bg{}", self.gradients);
                let (p0, p1) = css_gradient_line(rect, *angle_deg);
                write!(
                    self.defs,
                    r#"<linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient>"#,
                    fmt_num(p0.x),
                    fmt_num(p0.y),
                    fmt_num(p1.x),
                    fmt_num(p1.y),
                    from.to_hex(),
                    to.to_hex(),
                )?;
                format!("url(#{id})")
            }
        };
        write!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{fill}"/>"#,
            fmt_num(rect.x0),
            fmt_num(rect.y0),
            fmt_num(rect.width()),
            fmt_num(rect.height()),
        )
    }

    fn emit_text(&mut self, block: &TextBlock, style: &TextStyle, origin: Point) -> std::fmt::Result {
        let family = self.family.unwrap_or(style.family.as_str());
        let attrs = font_attrs(family, style.size, style.weight);
        let line_px = style.line_px();
        let baseline = baseline_offset(block, style);
        for (i, line) in block.lines.iter().enumerate() {
            write!(
                self.body,
                r#"<text x="{}" y="{}" {attrs} fill="{}">{}</text>"#,
                fmt_num(origin.x),
                fmt_num(origin.y + i as f64 * line_px + baseline),
                style.color.to_hex(),
                xml_text(line),
            )?;
        }
        Ok(())
    }

    fn finish(self, canvas: Canvas) -> Result<String, std::fmt::Error> {
        let mut svg = String::with_capacity(self.defs.len() + self.body.len() + 160);
        write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = canvas.width,
            h = canvas.height,
        )?;
        if !self.defs.is_empty() {
            write!(svg, "<defs>{}</defs>", self.defs)?;
        }
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        Ok(svg)
    }
}

/// Distance from the top of a line box to the baseline: half the leading above the ascent.
fn baseline_offset(block: &TextBlock, style: &TextStyle) -> f64 {
    let line_px = style.line_px();
    let content = block.ascent + block.descent;
    if content > 0.0 {
        (line_px - content) * 0.5 + block.ascent
    } else {
        (line_px + CAP_HEIGHT_EM * style.size) * 0.5
    }
}

/// Endpoints of a CSS `linear-gradient(<angle>deg, ...)` over `rect`.
///
/// CSS measures the angle clockwise from "to top" and sizes the gradient line so the corners
/// receive the first and last stops.
pub fn css_gradient_line(rect: Rect, angle_deg: f64) -> (Point, Point) {
    let theta = angle_deg.to_radians();
    let dir = Vec2::new(theta.sin(), -theta.cos());
    let len = (rect.width() * theta.sin()).abs() + (rect.height() * theta.cos()).abs();
    let half = dir * (len * 0.5);
    let c = rect.center();
    (c - half, c + half)
}

/// Escaped character data with XML-invalid characters removed.
fn xml_text(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(strip_invalid_xml(s))
}

fn font_attrs(family: &str, size: f64, weight: FontWeight) -> String {
    format!(
        r#"font-family="{}" font-size="{}" font-weight="{}""#,
        xml_text(&css_font_family(family)),
        fmt_num(size),
        weight.css_value(),
    )
}

/// Quote multi-word family names in a comma-separated stack.
fn css_font_family(stack: &str) -> Cow<'_, str> {
    if !stack.split(',').any(|f| f.trim().contains(' ')) {
        return Cow::Borrowed(stack);
    }
    let parts: Vec<String> = stack
        .split(',')
        .map(|f| {
            let f = f.trim();
            if f.contains(' ') && !f.starts_with(['\'', '"']) {
                format!("'{f}'")
            } else {
                f.to_string()
            }
        })
        .collect();
    Cow::Owned(parts.join(", "))
}

/// Round to hundredths and drop trailing zeros.
fn fmt_num(v: f64) -> String {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 { "0".to_string() } else { r.to_string() }
}
