use crate::{
    document::metadata::OgMetadata,
    foundation::core::{Insets, Rgb},
    layout::tree::{Align, Background, FlexDirection, FontWeight, Style, VisualNode},
};

pub const FONT_STACK: &str = "Inter, -apple-system, BlinkMacSystemFont, Segoe UI, Roboto, sans-serif";

const BACKGROUND_FROM: Rgb = Rgb::new(0x1a, 0x1a, 0x1a);
const BACKGROUND_TO: Rgb = Rgb::new(0x2d, 0x2d, 0x2d);
const DESCRIPTION_COLOR: Rgb = Rgb::new(0xa3, 0xa3, 0xa3);
const BYLINE_COLOR: Rgb = Rgb::new(0x66, 0x66, 0x66);

const PADDING: f64 = 80.0;
const TEXT_MAX_WIDTH: f64 = 1040.0;

pub const KEY_ROOT: &str = "card";
pub const KEY_TITLE: &str = "title";
pub const KEY_DESCRIPTION: &str = "description";
pub const KEY_BYLINE: &str = "byline";
pub const KEY_AUTHOR: &str = "author";
pub const KEY_DATE: &str = "date";

/// Build the preview card for `meta`.
///
/// Optional blocks are left out entirely when their fields are absent or empty.
pub fn build_card(meta: &OgMetadata) -> VisualNode {
    let mut children = Vec::with_capacity(3);

    children.push(VisualNode::text(
        Some(KEY_TITLE),
        Style::new()
            .font_size(72.0)
            .font_weight(FontWeight::Bold)
            .color(Rgb::WHITE)
            .line_height(1.1)
            .margin_bottom(32.0)
            .max_width(TEXT_MAX_WIDTH),
        meta.title.clone(),
    ));

    if let Some(description) = non_empty(meta.description.as_deref()) {
        children.push(VisualNode::text(
            Some(KEY_DESCRIPTION),
            Style::new()
                .font_size(36.0)
                .color(DESCRIPTION_COLOR)
                .line_height(1.4)
                .margin_bottom(40.0)
                .max_width(TEXT_MAX_WIDTH),
            description,
        ));
    }

    let author = non_empty(meta.author.as_deref());
    let date = non_empty(meta.date.as_deref());
    if author.is_some() || date.is_some() {
        let mut items = Vec::with_capacity(2);
        if let Some(author) = author {
            items.push(VisualNode::text(
                Some(KEY_AUTHOR),
                Style::new(),
                format!("by {author}"),
            ));
        }
        if let Some(date) = date {
            items.push(VisualNode::text(Some(KEY_DATE), Style::new(), date));
        }
        children.push(VisualNode::container(
            Some(KEY_BYLINE),
            Style::new()
                .direction(FlexDirection::Row)
                .align_items(Align::Center)
                .gap(24.0)
                .font_size(28.0)
                .color(BYLINE_COLOR),
            items,
        ));
    }

    VisualNode::container(
        Some(KEY_ROOT),
        Style::new()
            .direction(FlexDirection::Column)
            .align_items(Align::Start)
            .justify_content(Align::Center)
            .background(Background::LinearGradient {
                angle_deg: 135.0,
                from: BACKGROUND_FROM,
                to: BACKGROUND_TO,
            })
            .padding(Insets::uniform(PADDING))
            .font_family(FONT_STACK),
        children,
    )
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::metadata::FALLBACK_TITLE;

    fn full() -> OgMetadata {
        OgMetadata {
            title: "Shipping Rust".to_string(),
            description: Some("Notes from the field".to_string()),
            author: Some("Ada".to_string()),
            date: Some("1/15/2024".to_string()),
        }
    }

    #[test]
    fn full_metadata_builds_all_blocks_in_order() {
        let tree = build_card(&full());
        let keys: Vec<_> = tree.children().iter().filter_map(VisualNode::key).collect();
        assert_eq!(keys, [KEY_TITLE, KEY_DESCRIPTION, KEY_BYLINE]);
        assert_eq!(
            tree.texts(),
            ["Shipping Rust", "Notes from the field", "by Ada", "1/15/2024"]
        );
    }

    #[test]
    fn description_block_is_omitted_when_absent() {
        let meta = OgMetadata {
            description: None,
            ..full()
        };
        let tree = build_card(&meta);
        assert!(tree.find(KEY_DESCRIPTION).is_none());

        let meta = OgMetadata {
            description: Some(String::new()),
            ..full()
        };
        assert!(build_card(&meta).find(KEY_DESCRIPTION).is_none());
    }

    #[test]
    fn byline_requires_author_or_date() {
        let none = OgMetadata {
            author: None,
            date: None,
            ..full()
        };
        assert!(build_card(&none).find(KEY_BYLINE).is_none());

        let date_only = OgMetadata {
            author: None,
            ..full()
        };
        let tree = build_card(&date_only);
        let byline = tree.find(KEY_BYLINE).unwrap();
        assert_eq!(byline.texts(), ["1/15/2024"]);
        assert!(tree.find(KEY_AUTHOR).is_none());

        let author_only = OgMetadata {
            date: None,
            ..full()
        };
        let tree = build_card(&author_only);
        assert_eq!(tree.find(KEY_BYLINE).unwrap().texts(), ["by Ada"]);
    }

    #[test]
    fn fallback_title_is_rendered_text() {
        let meta = OgMetadata {
            title: FALLBACK_TITLE.to_string(),
            ..OgMetadata::default()
        };
        let tree = build_card(&meta);
        assert_eq!(tree.texts(), [FALLBACK_TITLE]);
        assert_eq!(tree.children().len(), 1);
    }

    #[test]
    fn building_is_deterministic() {
        assert_eq!(build_card(&full()), build_card(&full()));
    }

    #[test]
    fn styling_does_not_depend_on_content() {
        let a = build_card(&full());
        let b = build_card(&OgMetadata {
            title: "x".repeat(300),
            ..full()
        });
        assert_eq!(a.style(), b.style());
        assert_eq!(
            a.find(KEY_TITLE).map(VisualNode::style),
            b.find(KEY_TITLE).map(VisualNode::style)
        );
    }
}
