//! Visual tree to PNG: flex layout, text shaping, SVG serialization, font loading, and
//! rasterization.

pub mod flex;
pub mod fonts;
pub mod raster;
pub mod svg;
pub mod text;

pub use flex::{LayoutBox, compute_layout};
pub use fonts::{FontAssets, build_fontdb, family_names};
pub use raster::{RasterImage, encode_png, rasterize_fit_width, write_png, write_png_atomic};
pub use svg::{SvgRenderer, parse_svg, render_svg};
pub use text::{TextEngine, TextStyle};
