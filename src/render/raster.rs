use std::path::Path;

use image::{
    ExtendedColorType, ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::foundation::{
    error::{OgError, OgResult},
    fs::{ensure_parent_dir, write_atomic},
};

/// Upper bound on either output dimension.
const MAX_DIM: u32 = 16_384;

/// Straight-alpha RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl RasterImage {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba8.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Output dimensions for scaling `tree` to `width` pixels while keeping its aspect ratio.
pub fn fit_width_size(tree: &usvg::Tree, width: u32) -> OgResult<(u32, u32)> {
    let size = tree.size();
    let (w, h) = (size.width(), size.height());
    if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
        return Err(OgError::render("svg has invalid width/height"));
    }
    if width == 0 {
        return Err(OgError::render("fit width must be > 0"));
    }
    let height = ((width as f32) * h / w).ceil().max(1.0) as u32;
    if width > MAX_DIM || height > MAX_DIM {
        return Err(OgError::render(format!(
            "raster size too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }
    Ok((width, height))
}

/// Rasterize `tree` scaled uniformly to `width` pixels wide.
#[tracing::instrument(level = "debug", skip(tree))]
pub fn rasterize_fit_width(tree: &usvg::Tree, width: u32) -> OgResult<RasterImage> {
    let (width, height) = fit_width_size(tree, width)?;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| OgError::render("failed to allocate pixmap"))?;

    let scale = (width as f32) / tree.size().width();
    let xform = resvg::tiny_skia::Transform::from_scale(scale, scale);
    resvg::render(tree, xform, &mut pixmap.as_mut());

    let mut rgba8 = pixmap.take();
    demultiply_rgba8_in_place(&mut rgba8);
    Ok(RasterImage {
        width,
        height,
        rgba8,
    })
}

fn demultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

/// Encode as PNG at the strongest compression level.
pub fn encode_png(img: &RasterImage) -> OgResult<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(&img.rgba8, img.width, img.height, ExtendedColorType::Rgba8)
        .map_err(|e| OgError::render(format!("encode png: {e}")))?;
    Ok(buf)
}

/// Write encoded PNG bytes to `path`, creating parent directories and replacing any old file.
pub fn write_png_atomic(path: &Path, bytes: &[u8]) -> OgResult<()> {
    ensure_parent_dir(path)?;
    write_atomic(path, bytes)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote png");
    Ok(())
}

pub fn write_png(img: &RasterImage, path: &Path) -> OgResult<()> {
    write_png_atomic(path, &encode_png(img)?)
}
