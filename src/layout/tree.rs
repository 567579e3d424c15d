//! Visual tree: typed container/text nodes with inline styles.
//!
//! The tree is a plain value. It carries no layout results; [`crate::render::flex`] resolves
//! positions before the tree is written as SVG.

use crate::foundation::core::{Insets, Rgb};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlexDirection {
    Row,
    #[default]
    Column,
}

/// Main-axis (`justify_content`) or cross-axis (`align_items`) placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

impl FontWeight {
    pub fn css_value(self) -> u16 {
        match self {
            Self::Regular => 400,
            Self::Bold => 700,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Background {
    Solid {
        color: Rgb,
    },
    /// CSS `linear-gradient(<angle_deg>deg, from 0%, to 100%)`.
    LinearGradient {
        angle_deg: f64,
        from: Rgb,
        to: Rgb,
    },
}

/// Inline style. Text properties left as `None` inherit from the parent.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Style {
    pub direction: FlexDirection,
    pub align_items: Align,
    pub justify_content: Align,
    pub padding: Insets,
    pub gap: f64,
    pub margin_bottom: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    /// Multiple of the font size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(mut self, direction: FlexDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn align_items(mut self, align: Align) -> Self {
        self.align_items = align;
        self
    }

    pub fn justify_content(mut self, align: Align) -> Self {
        self.justify_content = align;
        self
    }

    pub fn padding(mut self, padding: Insets) -> Self {
        self.padding = padding;
        self
    }

    pub fn gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    pub fn margin_bottom(mut self, margin: f64) -> Self {
        self.margin_bottom = margin;
        self
    }

    pub fn max_width(mut self, width: f64) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn font_weight(mut self, weight: FontWeight) -> Self {
        self.font_weight = Some(weight);
        self
    }

    pub fn line_height(mut self, multiple: f64) -> Self {
        self.line_height = Some(multiple);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub style: Style,
    pub children: Vec<VisualNode>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub style: Style,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum VisualNode {
    Container(Container),
    Text(TextNode),
}

impl VisualNode {
    pub fn container(key: Option<&str>, style: Style, children: Vec<VisualNode>) -> Self {
        Self::Container(Container {
            key: key.map(str::to_string),
            style,
            children,
        })
    }

    pub fn text(key: Option<&str>, style: Style, content: impl Into<String>) -> Self {
        Self::Text(TextNode {
            key: key.map(str::to_string),
            style,
            content: content.into(),
        })
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Container(c) => c.key.as_deref(),
            Self::Text(t) => t.key.as_deref(),
        }
    }

    pub fn style(&self) -> &Style {
        match self {
            Self::Container(c) => &c.style,
            Self::Text(t) => &t.style,
        }
    }

    pub fn children(&self) -> &[VisualNode] {
        match self {
            Self::Container(c) => &c.children,
            Self::Text(_) => &[],
        }
    }

    /// Depth-first search for the node with the given key.
    pub fn find(&self, key: &str) -> Option<&VisualNode> {
        if self.key() == Some(key) {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(key))
    }

    /// Text content of every text node, in document order.
    pub fn texts(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_texts(&mut out);
        out
    }

    fn collect_texts<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Text(t) => out.push(&t.content),
            Self::Container(c) => {
                for child in &c.children {
                    child.collect_texts(out);
                }
            }
        }
    }
}
