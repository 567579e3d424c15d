//! Bundled font loading and the font database used for rendering.
//!
//! The card is rendered with Inter when `src/assets/fonts/Inter-{Regular,Bold}.woff` are
//! present. Without them one regular/bold pair is taken from the system fonts, which is less
//! deterministic across machines but never fatal. Layout and rasterization always see the same
//! pair.

use std::{
    io::Read as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::foundation::error::{OgError, OgResult};

pub const FONTS_DIR: &str = "src/assets/fonts";
pub const REGULAR_FILE: &str = "Inter-Regular.woff";
pub const BOLD_FILE: &str = "Inter-Bold.woff";

/// Families tried, in order, when picking a system pair.
const SYSTEM_FAMILIES: &[&str] = &[
    "Inter",
    "Segoe UI",
    "Roboto",
    "Helvetica Neue",
    "Arial",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
];

/// Regular and bold faces, unpacked to plain sfnt (TrueType/OpenType) bytes.
#[derive(Clone)]
pub struct FontAssets {
    pub regular: Arc<Vec<u8>>,
    pub bold: Arc<Vec<u8>>,
    /// Directory the pair was loaded from; `None` for system fonts.
    pub dir: Option<PathBuf>,
    /// Family to shape with. `None` takes the first family found in `regular`.
    pub family: Option<String>,
}

impl std::fmt::Debug for FontAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAssets")
            .field("regular_len", &self.regular.len())
            .field("bold_len", &self.bold.len())
            .field("dir", &self.dir)
            .field("family", &self.family)
            .finish()
    }
}

impl FontAssets {
    /// Load both faces from `dir`. Either one failing fails the pair.
    pub fn load_dir(dir: impl AsRef<Path>) -> OgResult<Self> {
        let dir = dir.as_ref();
        let regular = load_font_file(&dir.join(REGULAR_FILE))?;
        let bold = load_font_file(&dir.join(BOLD_FILE))?;
        Ok(Self {
            regular: Arc::new(regular),
            bold: Arc::new(bold),
            dir: Some(dir.to_path_buf()),
            family: None,
        })
    }

    /// Like [`FontAssets::load_dir`], but a failure is logged and yields `None`.
    pub fn load_optional(dir: impl AsRef<Path>) -> Option<Self> {
        match Self::load_dir(dir.as_ref()) {
            Ok(fonts) => {
                tracing::debug!(dir = %dir.as_ref().display(), "loaded bundled fonts");
                Some(fonts)
            }
            Err(err) => {
                tracing::warn!(
                    dir = %dir.as_ref().display(),
                    "could not load Inter fonts, falling back to system fonts: {err:#}"
                );
                None
            }
        }
    }

    /// A regular/bold pair from the installed fonts, preferring common sans-serif families.
    /// `None` when the system has no fonts at all.
    pub fn from_system() -> Option<Self> {
        use usvg::fontdb::{Family, Query, Weight};

        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        let mut families: Vec<Family<'_>> =
            SYSTEM_FAMILIES.iter().map(|&name| Family::Name(name)).collect();
        families.push(Family::SansSerif);

        let regular_id = db
            .query(&Query {
                families: &families,
                ..Query::default()
            })
            .or_else(|| db.faces().next().map(|face| face.id))?;
        let family = db.face(regular_id)?.families.first()?.0.clone();
        let bold_id = db
            .query(&Query {
                families: &[Family::Name(&family)],
                weight: Weight::BOLD,
                ..Query::default()
            })
            .unwrap_or(regular_id);

        let regular = db.with_face_data(regular_id, |data, _| data.to_vec())?;
        let bold = db.with_face_data(bold_id, |data, _| data.to_vec())?;
        tracing::debug!(%family, system_faces = db.len(), "picked system font pair");
        Some(Self {
            regular: Arc::new(regular),
            bold: Arc::new(bold),
            dir: None,
            family: Some(family),
        })
    }
}

fn load_font_file(path: &Path) -> OgResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| OgError::from_read(path, e))?;
    decode_font(&bytes)
        .with_context(|| format!("decode font '{}'", path.display()))
        .map_err(OgError::from)
}

/// Accept raw sfnt data as-is and unpack WOFF 1.0 containers.
pub fn decode_font(bytes: &[u8]) -> OgResult<Vec<u8>> {
    match bytes.get(..4) {
        Some(b"wOFF") => woff_to_sfnt(bytes),
        Some(b"wOF2") => Err(OgError::render("WOFF2 fonts are not supported")),
        Some([0, 1, 0, 0] | b"OTTO" | b"true" | b"ttcf") => Ok(bytes.to_vec()),
        _ => Err(OgError::render("unrecognized font format")),
    }
}

fn be_u16(b: &[u8], at: usize) -> OgResult<u16> {
    b.get(at..at + 2)
        .map(|s| u16::from_be_bytes([s[0], s[1]]))
        .ok_or_else(|| OgError::render("truncated WOFF data"))
}

fn be_u32(b: &[u8], at: usize) -> OgResult<u32> {
    b.get(at..at + 4)
        .map(|s| u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
        .ok_or_else(|| OgError::render("truncated WOFF data"))
}

const WOFF_HEADER_LEN: usize = 44;
const WOFF_DIR_ENTRY_LEN: usize = 20;
const SFNT_HEADER_LEN: usize = 12;
const SFNT_RECORD_LEN: usize = 16;
/// Largest table accepted from a WOFF file once inflated.
const MAX_TABLE_LEN: usize = 64 << 20;
/// Upper bound on what is reserved before a table is inflated.
const MAX_TABLE_PREALLOC: usize = 1 << 20;

/// Rebuild the sfnt a WOFF 1.0 file wraps. Tables keep their directory order.
pub fn woff_to_sfnt(woff: &[u8]) -> OgResult<Vec<u8>> {
    if woff.len() < WOFF_HEADER_LEN {
        return Err(OgError::render("truncated WOFF header"));
    }
    let flavor = be_u32(woff, 4)?;
    let num_tables = be_u16(woff, 12)?;
    if num_tables == 0 {
        return Err(OgError::render("WOFF font has no tables"));
    }

    let mut tables = Vec::with_capacity(usize::from(num_tables));
    for i in 0..usize::from(num_tables) {
        let at = WOFF_HEADER_LEN + i * WOFF_DIR_ENTRY_LEN;
        let tag = be_u32(woff, at)?;
        let offset = be_u32(woff, at + 4)? as usize;
        let comp_len = be_u32(woff, at + 8)? as usize;
        let orig_len = be_u32(woff, at + 12)? as usize;
        let checksum = be_u32(woff, at + 16)?;

        let raw = offset
            .checked_add(comp_len)
            .and_then(|end| woff.get(offset..end))
            .ok_or_else(|| OgError::render("WOFF table lies outside the file"))?;
        if orig_len > MAX_TABLE_LEN {
            return Err(OgError::render(format!(
                "WOFF table {tag:08x} claims {orig_len} bytes (max {MAX_TABLE_LEN})"
            )));
        }
        let data = if comp_len < orig_len {
            let mut out = Vec::with_capacity(orig_len.min(MAX_TABLE_PREALLOC));
            flate2::read::ZlibDecoder::new(raw)
                .take(orig_len as u64 + 1)
                .read_to_end(&mut out)
                .context("inflate WOFF table")?;
            out
        } else {
            raw.to_vec()
        };
        if data.len() != orig_len {
            return Err(OgError::render(format!(
                "WOFF table {:08x} inflated to {} bytes, expected {orig_len}",
                tag,
                data.len()
            )));
        }
        tables.push((tag, checksum, data));
    }

    let n = usize::from(num_tables);
    let (search_range, entry_selector, range_shift) = sfnt_search_params(n)?;

    let data_len: usize = tables.iter().map(|(_, _, d)| pad4(d.len())).sum();
    let mut out = Vec::with_capacity(SFNT_HEADER_LEN + n * SFNT_RECORD_LEN + data_len);
    out.extend_from_slice(&flavor.to_be_bytes());
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());

    let mut offset = SFNT_HEADER_LEN + n * SFNT_RECORD_LEN;
    for (tag, checksum, data) in &tables {
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&checksum.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += pad4(data.len());
    }
    for (_, _, data) in &tables {
        out.extend_from_slice(data);
        out.resize(pad4(out.len()), 0);
    }
    Ok(out)
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

/// `searchRange`, `entrySelector` and `rangeShift` for a table directory of `n` (> 0) records.
fn sfnt_search_params(n: usize) -> OgResult<(u16, u16, u16)> {
    let entry_selector = n.checked_ilog2().unwrap_or(0) as usize;
    let search_range = (1usize << entry_selector) * SFNT_RECORD_LEN;
    let range_shift = (n * SFNT_RECORD_LEN).saturating_sub(search_range);
    let field = |v: usize| {
        u16::try_from(v)
            .map_err(|_| OgError::render(format!("too many font tables for an sfnt header ({n})")))
    };
    Ok((field(search_range)?, field(entry_selector)?, field(range_shift)?))
}

/// Font database holding exactly the faces of `fonts`; empty for `None`.
pub fn build_fontdb(fonts: Option<&FontAssets>) -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    if let Some(fonts) = fonts {
        db.load_font_data(fonts.regular.as_ref().clone());
        db.load_font_data(fonts.bold.as_ref().clone());
        let family = fonts.family.clone().or_else(|| first_family_name(&db));
        if let Some(family) = family {
            db.set_sans_serif_family(family);
        }
    }
    tracing::debug!(faces = db.len(), "built font database");
    Arc::new(db)
}

fn first_family_name(db: &usvg::fontdb::Database) -> Option<String> {
    db.faces()
        .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
}

/// Distinct family names in `db`, sorted.
pub fn family_names(db: &usvg::fontdb::Database) -> Vec<String> {
    let mut names: Vec<String> = db
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
        .collect();
    names.sort();
    names.dedup();
    names
}


#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    /// Minimal sfnt-shaped payload: header plus two fake tables.
    fn fake_tables() -> Vec<(u32, Vec<u8>)> {
        vec![
            (u32::from_be_bytes(*b"head"), vec![7u8; 54]),
            (u32::from_be_bytes(*b"name"), b"compressible ".repeat(20)),
        ]
    }

    fn build_woff(tables: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let n = tables.len();
        let mut header = Vec::new();
        header.extend_from_slice(b"wOFF");
        header.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        header.extend_from_slice(&0u32.to_be_bytes()); // length, unused by the decoder
        header.extend_from_slice(&(n as u16).to_be_bytes());
        header.extend_from_slice(&[0u8; 30]);
        assert_eq!(header.len(), WOFF_HEADER_LEN);

        let mut dir = Vec::new();
        let mut blobs = Vec::new();
        let mut offset = WOFF_HEADER_LEN + n * WOFF_DIR_ENTRY_LEN;
        for (tag, data) in tables {
            let mut enc =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
            enc.write_all(data).unwrap();
            let z = enc.finish().unwrap();
            let stored = if z.len() < data.len() { z } else { data.clone() };

            dir.extend_from_slice(&tag.to_be_bytes());
            dir.extend_from_slice(&(offset as u32).to_be_bytes());
            dir.extend_from_slice(&(stored.len() as u32).to_be_bytes());
            dir.extend_from_slice(&(data.len() as u32).to_be_bytes());
            dir.extend_from_slice(&0xdead_beefu32.to_be_bytes());
            offset += stored.len();
            blobs.extend_from_slice(&stored);
        }
        [header, dir, blobs].concat()
    }

    #[test]
    fn woff_unpacks_to_sfnt_layout() {
        let tables = fake_tables();
        let sfnt = woff_to_sfnt(&build_woff(&tables)).unwrap();

        assert_eq!(&sfnt[..4], &[0, 1, 0, 0]);
        assert_eq!(be_u16(&sfnt, 4).unwrap(), 2);
        assert_eq!(be_u16(&sfnt, 6).unwrap(), 32); // searchRange
        assert_eq!(be_u16(&sfnt, 8).unwrap(), 1); // entrySelector
        assert_eq!(be_u16(&sfnt, 10).unwrap(), 0); // rangeShift

        for (i, (tag, data)) in tables.iter().enumerate() {
            let rec = SFNT_HEADER_LEN + i * SFNT_RECORD_LEN;
            assert_eq!(be_u32(&sfnt, rec).unwrap(), *tag);
            assert_eq!(be_u32(&sfnt, rec + 4).unwrap(), 0xdead_beef);
            let off = be_u32(&sfnt, rec + 8).unwrap() as usize;
            let len = be_u32(&sfnt, rec + 12).unwrap() as usize;
            assert_eq!(off % 4, 0);
            assert_eq!(&sfnt[off..off + len], data.as_slice());
        }
    }

    #[test]
    fn decode_font_sniffs_formats() {
        let ttf = [0u8, 1, 0, 0, 9, 9];
        assert_eq!(decode_font(&ttf).unwrap(), ttf);
        assert!(decode_font(b"wOF2....").is_err());
        assert!(decode_font(b"GIF89a").is_err());
        assert!(decode_font(b"wOFF").is_err());
    }

    #[test]
    fn corrupt_table_offsets_are_rejected() {
        let mut woff = build_woff(&fake_tables());
        // Point the first table past the end of the file.
        woff[WOFF_HEADER_LEN + 4..WOFF_HEADER_LEN + 8].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(woff_to_sfnt(&woff).is_err());
    }

    #[test]
    fn missing_font_dir_degrades_to_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(FontAssets::load_optional(dir.path()).is_none());
        assert!(matches!(
            FontAssets::load_dir(dir.path()),
            Err(OgError::NotFound { .. })
        ));
    }

    #[test]
    fn one_missing_face_fails_the_pair() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(REGULAR_FILE), build_woff(&fake_tables())).unwrap();
        assert!(FontAssets::load_optional(dir.path()).is_none());
    }

    #[test]
    fn search_params_fit_the_header_fields() {
        assert_eq!(sfnt_search_params(1).unwrap(), (16, 0, 0));
        assert_eq!(sfnt_search_params(2).unwrap(), (32, 1, 0));
        assert_eq!(sfnt_search_params(7).unwrap(), (64, 2, 48));
        assert!(sfnt_search_params(4095).is_ok());
        assert!(sfnt_search_params(4096).is_err());
    }

    #[test]
    fn oversized_table_length_is_rejected_before_inflating() {
        let mut woff = build_woff(&fake_tables());
        let orig_len = WOFF_HEADER_LEN + 12;
        woff[orig_len..orig_len + 4].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = woff_to_sfnt(&woff).unwrap_err();
        assert!(err.to_string().contains("claims"), "{err}");
    }

    #[test]
    fn short_inflate_is_rejected() {
        let mut woff = build_woff(&fake_tables());
        // The second table is compressed; claim one byte more than it inflates to.
        let orig_len = WOFF_HEADER_LEN + WOFF_DIR_ENTRY_LEN + 12;
        let claimed = be_u32(&woff, orig_len).unwrap() + 1;
        woff[orig_len..orig_len + 4].copy_from_slice(&claimed.to_be_bytes());
        assert!(woff_to_sfnt(&woff).is_err());
    }

    #[test]
    fn woff_pair_from_dir_reaches_fontdb_and_shaping() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(REGULAR_FILE),
            build_woff(&testing::tables(false)),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(BOLD_FILE),
            build_woff(&testing::tables(true)),
        )
        .unwrap();

        let fonts = FontAssets::load_dir(dir.path()).unwrap();
        assert_eq!(fonts.dir.as_deref(), Some(dir.path()));
        let db = build_fontdb(Some(&fonts));
        assert_eq!(db.len(), 2);
        assert_eq!(family_names(&db), [testing::FAMILY]);

        let mut engine = crate::render::TextEngine::new(Some(&fonts));
        assert_eq!(engine.family(), Some(testing::FAMILY));
        let width = engine
            .measure("abc", &crate::render::TextStyle::default())
            .unwrap();
        assert!(width > 0.0, "width {width}");
    }

    #[test]
    fn no_fonts_means_an_empty_database() {
        assert_eq!(build_fontdb(None).len(), 0);
    }

    #[test]
    fn bundled_pair_loads_from_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let woff = build_woff(&fake_tables());
        std::fs::write(dir.path().join(REGULAR_FILE), &woff).unwrap();
        std::fs::write(dir.path().join(BOLD_FILE), &woff).unwrap();

        let fonts = FontAssets::load_dir(dir.path()).unwrap();
        assert_eq!(&fonts.regular[..4], &[0, 1, 0, 0]);
        assert_eq!(fonts.regular, fonts.bold);
    }
}
