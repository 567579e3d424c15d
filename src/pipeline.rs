//! Slug-to-image driver.
//!
//! `run_generate` walks `Start -> Validated -> ImageGenerated -> MetadataUpdated -> Done`.
//! Every failure is terminal. The image and the document are written separately, so a failed
//! metadata update can leave a fresh image behind. Two runs for the same slug at the same time
//! are not coordinated.

use std::path::{Path, PathBuf};

use crate::{
    document::{MetadataUpdate, extract_og_metadata, update_front_matter},
    foundation::{
        core::Canvas,
        error::{OgError, OgResult},
    },
    layout::build_card,
    render::{
        FontAssets, SvgRenderer,
        fonts::FONTS_DIR,
        raster::{encode_png, rasterize_fit_width, write_png_atomic},
    },
};

/// Where documents, images, and fonts live relative to a project root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Empty means the working directory.
    pub root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn document_path(&self, slug: &str) -> PathBuf {
        self.root.join("content").join(format!("{slug}.mdx"))
    }

    pub fn image_path(&self, slug: &str) -> PathBuf {
        self.root.join("public").join("og").join(format!("{slug}.png"))
    }

    /// Site-relative URL recorded in the document's `ogImage` field.
    pub fn web_path(slug: &str) -> String {
        format!("/og/{slug}.png")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.root.join(FONTS_DIR)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    pub canvas: Canvas,
    /// Output width in pixels; height follows the canvas aspect ratio.
    pub fit_width: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            canvas: Canvas::OPEN_GRAPH,
            fit_width: Canvas::OPEN_GRAPH.width,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Start,
    Validated,
    ImageGenerated,
    MetadataUpdated,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateReport {
    pub image_path: PathBuf,
    pub document_path: PathBuf,
    pub web_path: String,
    pub metadata: MetadataUpdate,
}

/// Render the preview image for the document at `doc` into `out`.
///
/// Fonts are looked up under `src/assets/fonts` in the working directory, with a system pair
/// standing in when they are missing.
pub fn generate_og_image(doc: impl AsRef<Path>, out: impl AsRef<Path>) -> OgResult<()> {
    let fonts = FontAssets::load_optional(FONTS_DIR);
    generate_og_image_with(doc, out, &RenderSettings::default(), fonts.as_ref())
}

/// Like [`generate_og_image`] with explicit settings. `fonts: None` renders with a system
/// sans-serif pair.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(doc = %doc.as_ref().display(), out = %out.as_ref().display())
)]
pub fn generate_og_image_with(
    doc: impl AsRef<Path>,
    out: impl AsRef<Path>,
    settings: &RenderSettings,
    fonts: Option<&FontAssets>,
) -> OgResult<()> {
    let meta = extract_og_metadata(doc.as_ref())?;
    tracing::debug!(?meta, "extracted card fields");

    let card = build_card(&meta);
    let mut renderer = SvgRenderer::with_system_fallback(settings.canvas, fonts);
    let tree = renderer.render(&card)?;
    let image = rasterize_fit_width(&tree, settings.fit_width)?;
    let png = encode_png(&image)?;
    write_png_atomic(out.as_ref(), &png)?;

    tracing::debug!(
        width = image.width,
        height = image.height,
        bytes = png.len(),
        "rendered preview image"
    );
    Ok(())
}

/// Generate the image for `slug` and record it in the document's front matter.
#[tracing::instrument(level = "info", skip(layout), fields(root = %layout.root.display()))]
pub fn run_generate(layout: &ProjectLayout, slug: &str) -> OgResult<GenerateReport> {
    enter(Stage::Start);
    if slug.is_empty() {
        return Err(OgError::missing_argument("--slug is required"));
    }

    let document_path = layout.document_path(slug);
    if !document_path.is_file() {
        return Err(OgError::not_found(&document_path));
    }
    enter(Stage::Validated);

    let image_path = layout.image_path(slug);
    let fonts = FontAssets::load_optional(layout.fonts_dir());
    generate_og_image_with(
        &document_path,
        &image_path,
        &RenderSettings::default(),
        fonts.as_ref(),
    )?;
    enter(Stage::ImageGenerated);

    let web_path = ProjectLayout::web_path(slug);
    let metadata = update_front_matter(&document_path, &web_path)?;
    enter(Stage::MetadataUpdated);

    enter(Stage::Done);
    Ok(GenerateReport {
        image_path,
        document_path,
        web_path,
        metadata,
    })
}

fn enter(stage: Stage) {
    tracing::debug!(?stage, "pipeline stage");
}
