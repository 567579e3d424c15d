//! Reading display fields from, and recording the preview image in, MDX documents.

pub mod frontmatter;
pub mod metadata;

pub use frontmatter::{
    FrontMatter, MetadataUpdate, OG_IMAGE_KEY, ParsedDocument, parse_document, parse_front_matter,
    stringify_document, update_front_matter,
};
pub use metadata::{DateLocale, FALLBACK_TITLE, OgMetadata, extract_og_metadata};
