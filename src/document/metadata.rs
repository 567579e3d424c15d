//! Display fields for the preview card.

use std::path::Path;

use chrono::{DateTime, Local, Locale, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_yaml::Value;

use crate::{
    document::frontmatter::{FrontMatter, is_truthy, parse_front_matter},
    foundation::error::OgResult,
};

/// Title used when a document has none.
pub const FALLBACK_TITLE: &str = "Untitled";

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OgMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Already formatted for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl OgMetadata {
    pub fn from_front_matter(data: &FrontMatter, locale: DateLocale) -> Self {
        let title = text_field(data, "title").unwrap_or_else(|| FALLBACK_TITLE.to_string());
        let description = text_field(data, "description").or_else(|| text_field(data, "excerpt"));
        let author = text_field(data, "author");
        let date = data
            .get("date")
            .filter(|v| is_truthy(Some(*v)))
            .and_then(|v| format_date_value(v, locale));

        Self {
            title,
            description,
            author,
            date,
        }
    }

    pub fn has_byline(&self) -> bool {
        self.author.is_some() || self.date.is_some()
    }
}

/// Read the document at `path` and extract its display fields using the environment locale.
pub fn extract_og_metadata(path: impl AsRef<Path>) -> OgResult<OgMetadata> {
    let doc = parse_front_matter(path)?;
    Ok(OgMetadata::from_front_matter(
        &doc.data,
        DateLocale::from_env(),
    ))
}

fn text_field(data: &FrontMatter, key: &str) -> Option<String> {
    let value = data.get(key)?;
    if !is_truthy(Some(value)) {
        return None;
    }
    value_text(value)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(t) => value_text(&t.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Locale used to format the `date` field.
///
/// Dates are the one place where output depends on the invoking environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateLocale(pub Locale);

impl Default for DateLocale {
    fn default() -> Self {
        Self(Locale::en_US)
    }
}

impl DateLocale {
    /// Resolve from `LC_ALL`, `LC_TIME`, then `LANG`.
    pub fn from_env() -> Self {
        let name = ["LC_ALL", "LC_TIME", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty());
        let locale = name.as_deref().and_then(Self::parse).unwrap_or_default();
        tracing::debug!(locale = ?locale.0, env = ?name, "resolved date locale");
        locale
    }

    /// Parse a POSIX-style locale name such as `de_DE.UTF-8@euro` or `fr-CA`.
    ///
    /// `C` and `POSIX` yield `None` so callers fall back to the default locale.
    pub fn parse(name: &str) -> Option<Self> {
        let base = name
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim()
            .replace('-', "_");
        if base.is_empty() || base == "C" || base == "POSIX" {
            return None;
        }
        Locale::try_from(base.as_str()).ok().map(Self)
    }

    /// The locale's short date form with zero padding removed from day and month,
    /// so `en_US` reads `1/5/2024`.
    pub fn format(self, date: NaiveDate) -> String {
        let padded = date
            .and_time(NaiveTime::MIN)
            .and_utc()
            .format_localized("%x", self.0)
            .to_string();
        unpad_numbers(&padded)
    }
}

/// Drop a `0` that starts a multi-digit number.
fn unpad_numbers(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        let starts_number = i == 0 || !chars[i - 1].is_ascii_digit();
        let more_digits = chars.get(i + 1).is_some_and(char::is_ascii_digit);
        if c == '0' && starts_number && more_digits {
            continue;
        }
        out.push(c);
    }
    out
}

fn format_date_value(value: &Value, locale: DateLocale) -> Option<String> {
    match value {
        Value::String(s) => Some(format_date_str(s, locale)),
        Value::Number(n) => match n.as_i64() {
            Some(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
                .map(|utc| locale.format(utc.with_timezone(&Local).date_naive()))
                .or_else(|| Some(n.to_string())),
            None => Some(n.to_string()),
        },
        Value::Tagged(t) => format_date_value(&t.value, locale),
        Value::Bool(_) | Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Format a date string, keeping unrecognized text as written.
pub fn format_date_str(raw: &str, locale: DateLocale) -> String {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return locale.format(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return locale.format(d);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return locale.format(dt.date());
        }
    }
    tracing::warn!(date = s, "unrecognized date format; using it verbatim");
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::frontmatter::parse_document;

    fn meta(src: &str) -> OgMetadata {
        let doc = parse_document(src).unwrap();
        OgMetadata::from_front_matter(&doc.data, DateLocale::default())
    }

    #[test]
    fn title_falls_back_to_placeholder() {
        assert_eq!(meta("---\nauthor: Ada\n---\n").title, FALLBACK_TITLE);
        assert_eq!(meta("---\ntitle: ''\n---\n").title, FALLBACK_TITLE);
        assert_eq!(meta("no front matter").title, FALLBACK_TITLE);
        assert_eq!(meta("---\ntitle: Real\n---\n").title, "Real");
    }

    #[test]
    fn description_prefers_description_then_excerpt() {
        let m = meta("---\ndescription: Primary\nexcerpt: Secondary\n---\n");
        assert_eq!(m.description.as_deref(), Some("Primary"));

        let m = meta("---\nexcerpt: Secondary\n---\n");
        assert_eq!(m.description.as_deref(), Some("Secondary"));

        let m = meta("---\ndescription: ''\nexcerpt: Secondary\n---\n");
        assert_eq!(m.description.as_deref(), Some("Secondary"));

        assert_eq!(meta("---\ntitle: T\n---\n").description, None);
    }

    #[test]
    fn scalar_values_render_as_text() {
        let m = meta("---\ntitle: 2024\nauthor: true\n---\n");
        assert_eq!(m.title, "2024");
        assert_eq!(m.author.as_deref(), Some("true"));

        let m = meta("---\nauthor: [a, b]\ndescription: {k: v}\n---\n");
        assert_eq!(m.author, None);
        assert_eq!(m.description, None);
        assert!(!m.has_byline());
    }

    #[test]
    fn dates_use_locale_date_representation() {
        let en = DateLocale::default();
        let de = DateLocale::parse("de_DE.UTF-8").unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        assert_eq!(en.format(d), "1/15/2024");
        assert_eq!(de.format(d), "15.1.2024");
        assert_eq!(format_date_str("2024-01-15", en), "1/15/2024");
        assert_eq!(format_date_str(" 2024-01-15 10:30 ", de), "15.1.2024");

        let early = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(en.format(early), "3/5/2024");
        let late = NaiveDate::from_ymd_opt(2030, 10, 20).unwrap();
        assert_eq!(en.format(late), "10/20/2030");
    }

    #[test]
    fn unpadding_only_touches_leading_zeros() {
        assert_eq!(unpad_numbers("01/05/2024"), "1/5/2024");
        assert_eq!(unpad_numbers("10.20.2000"), "10.20.2000");
        assert_eq!(unpad_numbers("0"), "0");
        assert_eq!(unpad_numbers("05 Jan"), "5 Jan");
    }

    #[test]
    fn unknown_date_text_is_kept() {
        assert_eq!(
            format_date_str("sometime in spring", DateLocale::default()),
            "sometime in spring"
        );
        let m = meta("---\ndate: soon\n---\n");
        assert_eq!(m.date.as_deref(), Some("soon"));
        assert!(m.has_byline());
    }

    #[test]
    fn locale_names_are_normalized() {
        assert_eq!(DateLocale::parse("fr-CA").map(|l| l.0), Some(Locale::fr_CA));
        assert_eq!(
            DateLocale::parse("de_DE@euro").map(|l| l.0),
            Some(Locale::de_DE)
        );
        assert_eq!(DateLocale::parse("C"), None);
        assert_eq!(DateLocale::parse("POSIX.UTF-8"), None);
        assert_eq!(DateLocale::parse("xx_NOPE"), None);
    }

    #[test]
    fn absent_fields_stay_absent() {
        let m = meta("---\ntitle: T\ndate: ''\nauthor: ''\n---\n");
        assert_eq!(
            m,
            OgMetadata {
                title: "T".to_string(),
                ..OgMetadata::default()
            }
        );
    }
}
