//! Front matter reading and writing for MDX documents.
//!
//! A document optionally starts with a `---` delimited YAML block; everything after the closing
//! delimiter is the body. Parsing separates the two losslessly so that [`stringify_document`] can
//! put them back together with the body untouched.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::foundation::{
    error::{OgError, OgResult},
    fs::write_atomic,
};

/// Open key/value mapping from the front matter block, in document order.
pub type FrontMatter = Mapping;

/// Key holding the web path of the generated preview image.
pub const OG_IMAGE_KEY: &str = "ogImage";

const DELIMITER: &str = "---";
const BOM: char = '\u{FEFF}';

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedDocument {
    pub data: FrontMatter,
    /// Text after the front matter block, byte-for-byte.
    pub body: String,
    pub has_front_matter: bool,
    /// The source started with a UTF-8 byte order mark; it is written back on update.
    pub has_bom: bool,
}

impl ParsedDocument {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Outcome of [`update_front_matter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataUpdate {
    Written,
    /// The key was already set; the file was not touched.
    Unchanged,
}

/// Split `src` into the raw front matter block (if any) and the body.
///
/// A leading byte order mark is skipped and never part of the body.
pub fn split_front_matter(src: &str) -> OgResult<(Option<&str>, &str)> {
    let src = src.strip_prefix(BOM).unwrap_or(src);
    let Some(rest) = src.strip_prefix(DELIMITER) else {
        return Ok((None, src));
    };
    // `----` is a thematic break, not an opener.
    if rest.starts_with('-') {
        return Ok((None, src));
    }

    let (lang, block_start) = match rest.find('\n') {
        Some(nl) => (rest[..nl].trim(), nl),
        None => (rest.trim(), rest.len()),
    };
    if !matches!(lang, "" | "yaml" | "yml") {
        return Err(OgError::metadata(format!(
            "unsupported front matter language '{lang}'"
        )));
    }

    let close = format!("\n{DELIMITER}");
    let Some(end) = rest[block_start..].find(&close).map(|i| block_start + i) else {
        return Ok((Some(&rest[block_start..]), ""));
    };

    let block = &rest[block_start..end];
    let mut body = &rest[end + close.len()..];
    body = body.strip_prefix('\r').unwrap_or(body);
    body = body.strip_prefix('\n').unwrap_or(body);
    Ok((Some(block), body))
}

fn is_blank_block(block: &str) -> bool {
    block.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Parse a document held in memory.
pub fn parse_document(src: &str) -> OgResult<ParsedDocument> {
    let has_bom = src.starts_with(BOM);
    let (block, body) = split_front_matter(src)?;
    let Some(block) = block else {
        return Ok(ParsedDocument {
            data: FrontMatter::new(),
            body: body.to_string(),
            has_front_matter: false,
            has_bom,
        });
    };

    let data = if is_blank_block(block) {
        FrontMatter::new()
    } else {
        match serde_yaml::from_str::<Value>(block)
            .map_err(|e| OgError::metadata(format!("invalid front matter: {e}")))?
        {
            Value::Mapping(m) => m,
            Value::Null => FrontMatter::new(),
            other => {
                return Err(OgError::metadata(format!(
                    "front matter must be a mapping, found {}",
                    value_kind(&other)
                )));
            }
        }
    };

    Ok(ParsedDocument {
        data,
        body: body.to_string(),
        has_front_matter: true,
        has_bom,
    })
}

/// Read and parse the document at `path`.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn parse_front_matter(path: impl AsRef<Path>) -> OgResult<ParsedDocument> {
    let path = path.as_ref();
    let src = std::fs::read_to_string(path).map_err(|e| OgError::from_read(path, e))?;
    let doc = parse_document(&src)?;
    tracing::debug!(keys = doc.data.len(), body_len = doc.body.len(), "parsed front matter");
    Ok(doc)
}

/// Serialize `data` and `body` back into document text.
///
/// An empty mapping produces the body alone.
pub fn stringify_document(data: &FrontMatter, body: &str) -> OgResult<String> {
    if data.is_empty() {
        return Ok(body.to_string());
    }
    let yaml = serde_yaml::to_string(data)
        .map_err(|e| OgError::metadata(format!("serialize front matter: {e}")))?;
    Ok(format!(
        "{DELIMITER}\n{}\n{DELIMITER}\n{body}",
        yaml.trim_end()
    ))
}

/// JavaScript-style truthiness for front matter values.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Sequence(_) | Value::Mapping(_)) => true,
        Some(Value::Tagged(t)) => is_truthy(Some(&t.value)),
    }
}

/// Record `og_image` under [`OG_IMAGE_KEY`] unless the document already has one.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn update_front_matter(path: impl AsRef<Path>, og_image: &str) -> OgResult<MetadataUpdate> {
    let path = path.as_ref();
    let mut doc = parse_front_matter(path)?;

    if is_truthy(doc.get(OG_IMAGE_KEY)) {
        tracing::debug!("ogImage already present; leaving document untouched");
        return Ok(MetadataUpdate::Unchanged);
    }

    doc.data.insert(
        Value::String(OG_IMAGE_KEY.to_string()),
        Value::String(og_image.to_string()),
    );
    let mut out = stringify_document(&doc.data, &doc.body)?;
    if doc.has_bom {
        out.insert(0, BOM);
    }
    write_atomic(path, out.as_bytes())?;
    tracing::info!(og_image, "recorded ogImage in front matter");
    Ok(MetadataUpdate::Written)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
