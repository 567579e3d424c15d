//! Text shaping and line breaking.
//!
//! [`TextEngine`] is built from the same font bytes that go into the rasterizer's font
//! database, so the lines it picks are the lines that get drawn.

use std::borrow::Cow;

use parley::style::{FontFamily, FontStack, StyleProperty};

use crate::{
    foundation::{
        core::Rgb,
        error::{OgError, OgResult},
    },
    layout::tree::{FontWeight, Style},
    render::fonts::FontAssets,
};

const DEFAULT_FONT_SIZE: f64 = 16.0;
const DEFAULT_LINE_HEIGHT: f64 = 1.2;
const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Fully resolved text properties after inheritance.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// CSS family stack from the tree. Only emitted when no face was loaded.
    pub family: String,
    pub size: f64,
    pub weight: FontWeight,
    pub line_height: f64,
    pub color: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size: DEFAULT_FONT_SIZE,
            weight: FontWeight::Regular,
            line_height: DEFAULT_LINE_HEIGHT,
            color: Rgb::new(0, 0, 0),
        }
    }
}

impl TextStyle {
    pub fn inherit(&self, style: &Style) -> Self {
        Self {
            family: style
                .font_family
                .clone()
                .unwrap_or_else(|| self.family.clone()),
            size: style.font_size.unwrap_or(self.size),
            weight: style.font_weight.unwrap_or(self.weight),
            line_height: style.line_height.unwrap_or(self.line_height),
            color: style.color.unwrap_or(self.color),
        }
    }

    pub fn line_px(&self) -> f64 {
        self.size * self.line_height
    }
}

/// Lines of one text block after breaking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    /// Advance of the widest line, trailing whitespace excluded.
    pub width: f64,
    /// Font ascent and descent in pixels; zero when no face is loaded.
    pub ascent: f64,
    pub descent: f64,
}

impl TextBlock {
    pub fn height(&self, style: &TextStyle) -> f64 {
        self.lines.len() as f64 * style.line_px()
    }
}

/// Whether XML 1.0 allows `c` in character data.
fn is_xml_char(c: char) -> bool {
    !matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

/// Drop characters that cannot appear in an XML document.
pub fn strip_invalid_xml(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| is_xml_char(c)).collect())
}

/// Text as it is measured and drawn: XML-invalid characters removed, runs of spaces, tabs
/// and line breaks collapsed to one space, ends trimmed.
pub fn display_text(s: &str) -> String {
    strip_invalid_xml(s)
        .split([' ', '\t', '\n', '\r'])
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parley contexts holding the card's regular and bold faces.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    family: Option<String>,
}

impl TextEngine {
    /// Register `fonts` with a fresh font context. Without fonts nothing can be shaped and
    /// every block measures zero wide.
    pub fn new(fonts: Option<&FontAssets>) -> Self {
        let mut font_ctx = parley::FontContext::default();
        let mut family = fonts.and_then(|f| f.family.clone());
        for bytes in fonts.into_iter().flat_map(|f| [&f.regular, &f.bold]) {
            let families = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
            if family.is_none() {
                family = families
                    .first()
                    .and_then(|(id, _)| font_ctx.collection.family_name(*id))
                    .map(str::to_string);
            }
        }
        if fonts.is_some() && family.is_none() {
            tracing::warn!("font bytes registered no family; text will not be shaped");
        }
        Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family,
        }
    }

    /// Family name every text run is shaped and drawn with.
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    fn shape(&mut self, text: &str, style: &TextStyle) -> OgResult<Option<parley::Layout<()>>> {
        let size = style.size as f32;
        if !size.is_finite() || size <= 0.0 {
            return Err(OgError::render("font size must be finite and > 0"));
        }
        let Some(family) = self.family.as_deref() else {
            return Ok(None);
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(StyleProperty::FontStack(FontStack::Single(
            FontFamily::Named(Cow::Owned(family.to_string())),
        )));
        builder.push_default(StyleProperty::FontSize(size));
        builder.push_default(StyleProperty::FontWeight(parley::style::FontWeight::new(
            f32::from(style.weight.css_value()),
        )));
        Ok(Some(builder.build(text)))
    }

    /// Break `text` at opportunities the Unicode line breaking rules allow, keeping each line
    /// within `max_width` where possible. `None` keeps everything on one line.
    ///
    /// A segment wider than `max_width` with no break opportunity overflows on its own line.
    pub fn break_lines(
        &mut self,
        text: &str,
        style: &TextStyle,
        max_width: Option<f64>,
    ) -> OgResult<TextBlock> {
        let text = display_text(text);
        if text.is_empty() {
            return Ok(TextBlock::default());
        }
        let Some(mut layout) = self.shape(&text, style)? else {
            return Ok(TextBlock {
                lines: vec![text],
                ..TextBlock::default()
            });
        };

        layout.break_all_lines(max_width.map(|w| w.max(0.0) as f32));
        let mut block = TextBlock {
            width: f64::from(layout.width()),
            ..TextBlock::default()
        };
        for line in layout.lines() {
            if block.lines.is_empty() {
                let metrics = line.metrics();
                block.ascent = f64::from(metrics.ascent);
                block.descent = f64::from(metrics.descent.abs());
            }
            let Some(s) = text.get(line.text_range()) else {
                continue;
            };
            let s = s.trim_end();
            if !s.is_empty() {
                block.lines.push(s.to_string());
            }
        }
        Ok(block)
    }

    /// Advance of `text` set on a single line.
    pub fn measure(&mut self, text: &str, style: &TextStyle) -> OgResult<f64> {
        Ok(self.break_lines(text, style, None)?.width)
    }
}
