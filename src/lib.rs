#![forbid(unsafe_code)]

pub mod document;
pub mod foundation;
pub mod layout;
pub mod pipeline;
pub mod render;

pub use document::{
    DateLocale, FALLBACK_TITLE, FrontMatter, MetadataUpdate, OG_IMAGE_KEY, OgMetadata,
    ParsedDocument, extract_og_metadata, parse_front_matter, update_front_matter,
};
pub use foundation::core::{Canvas, Insets, Rgb};
pub use foundation::error::{OgError, OgResult};
pub use layout::{VisualNode, build_card};
pub use pipeline::{
    GenerateReport, ProjectLayout, RenderSettings, Stage, generate_og_image,
    generate_og_image_with, run_generate,
};
pub use render::{FontAssets, SvgRenderer, build_fontdb, family_names};
