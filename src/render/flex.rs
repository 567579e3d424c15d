//! Flexbox layout of the visual tree.
//!
//! The visual tree is mirrored into a `taffy` tree. Text leaves are measured by [`TextEngine`]
//! from taffy's measure callback, then broken again at the width taffy settles on. Rounding is
//! disabled so boxes keep the fractional positions the SVG is written with.

use taffy::prelude::{AvailableSpace, NodeId, Rect, Size};
use taffy::style::{
    AlignItems, Dimension, Display, JustifyContent, LengthPercentage, LengthPercentageAuto,
    Style as FlexStyle,
};

use crate::{
    foundation::{
        core::{self as geom, Canvas, Point, Vec2},
        error::{OgError, OgResult},
    },
    layout::tree::{Align, Background, FlexDirection, Style, VisualNode},
    render::text::{TextBlock, TextEngine, TextStyle},
};

/// Added to a solved content width before its text is broken for drawing.
const LINE_FIT_SLACK: f64 = 0.5;

/// A laid-out node. Child offsets are relative to the parent's origin.
#[derive(Clone, Debug)]
pub struct LayoutBox {
    pub size: geom::Size,
    pub background: Option<Background>,
    pub content: BoxContent,
}

#[derive(Clone, Debug)]
pub enum BoxContent {
    Text {
        block: TextBlock,
        style: TextStyle,
        /// Content box origin inside the node (its padding).
        inset: Vec2,
    },
    Children(Vec<(Vec2, LayoutBox)>),
}

impl LayoutBox {
    /// Absolute rectangles of every text block, in document order.
    pub fn text_rects(&self, origin: Point) -> Vec<(geom::Rect, Vec<String>)> {
        let mut out = Vec::new();
        self.collect_text_rects(origin, &mut out);
        out
    }

    fn collect_text_rects(&self, origin: Point, out: &mut Vec<(geom::Rect, Vec<String>)>) {
        match &self.content {
            BoxContent::Text { block, .. } => {
                out.push((
                    geom::Rect::from_origin_size(origin, self.size),
                    block.lines.clone(),
                ));
            }
            BoxContent::Children(children) => {
                for (offset, child) in children {
                    child.collect_text_rects(origin + *offset, out);
                }
            }
        }
    }
}

struct TextLeaf {
    content: String,
    style: TextStyle,
    /// Content-box cap from the node's `max_width`.
    max_width: Option<f64>,
}

enum Mirror {
    Text {
        id: NodeId,
        background: Option<Background>,
    },
    Container {
        id: NodeId,
        background: Option<Background>,
        children: Vec<Mirror>,
    },
}

impl Mirror {
    fn id(&self) -> NodeId {
        match self {
            Self::Text { id, .. } | Self::Container { id, .. } => *id,
        }
    }
}

/// Solve `root` as a flex container filling `canvas`.
#[tracing::instrument(level = "debug", skip_all, fields(canvas = ?canvas))]
pub fn compute_layout(
    root: &VisualNode,
    canvas: Canvas,
    engine: &mut TextEngine,
) -> OgResult<LayoutBox> {
    let mut taffy = taffy::TaffyTree::<TextLeaf>::new();
    taffy.disable_rounding();
    let mirror = build(&mut taffy, root, &TextStyle::default(), Some(canvas)).map_err(layout_err)?;

    let available = Size {
        width: AvailableSpace::Definite(canvas.width as f32),
        height: AvailableSpace::Definite(canvas.height as f32),
    };
    let mut failure: Option<OgError> = None;
    taffy
        .compute_layout_with_measure(
            mirror.id(),
            available,
            |known_dimensions, available_space, _node_id, node_context, _style| {
                let Some(leaf) = node_context else {
                    return known_dimensions.unwrap_or(Size::ZERO);
                };
                match measure_leaf(engine, leaf, known_dimensions, available_space) {
                    Ok(size) => size,
                    Err(err) => {
                        failure.get_or_insert(err);
                        Size::ZERO
                    }
                }
            },
        )
        .map_err(layout_err)?;
    if let Some(err) = failure {
        return Err(err);
    }

    resolve(&taffy, engine, &mirror)
}

fn layout_err(e: taffy::TaffyError) -> OgError {
    OgError::render(format!("layout: {e}"))
}

fn build(
    taffy: &mut taffy::TaffyTree<TextLeaf>,
    node: &VisualNode,
    inherited: &TextStyle,
    fixed: Option<Canvas>,
) -> Result<Mirror, taffy::TaffyError> {
    let style = node.style();
    let text_style = inherited.inherit(style);
    let flex = flex_style(style, fixed);
    let background = style.background.clone();

    match node {
        VisualNode::Text(t) => {
            let max_width = style
                .max_width
                .map(|m| (m - style.padding.left - style.padding.right).max(0.0));
            let id = taffy.new_leaf_with_context(
                flex,
                TextLeaf {
                    content: t.content.clone(),
                    style: text_style,
                    max_width,
                },
            )?;
            Ok(Mirror::Text { id, background })
        }
        VisualNode::Container(c) => {
            let children = c
                .children
                .iter()
                .map(|child| build(taffy, child, &text_style, None))
                .collect::<Result<Vec<_>, _>>()?;
            let ids: Vec<NodeId> = children.iter().map(Mirror::id).collect();
            let id = taffy.new_with_children(flex, &ids)?;
            Ok(Mirror::Container {
                id,
                background,
                children,
            })
        }
    }
}

fn flex_style(style: &Style, fixed: Option<Canvas>) -> FlexStyle {
    let px = |v: f64| LengthPercentage::length(v as f32);
    let size = match fixed {
        Some(canvas) => Size {
            width: Dimension::length(canvas.width as f32),
            height: Dimension::length(canvas.height as f32),
        },
        None => Size {
            width: Dimension::auto(),
            height: Dimension::auto(),
        },
    };
    let justify_content = match style.justify_content {
        Align::Start => JustifyContent::FlexStart,
        Align::Center => JustifyContent::Center,
        Align::End => JustifyContent::FlexEnd,
    };
    let align_items = match style.align_items {
        Align::Start => AlignItems::FlexStart,
        Align::Center => AlignItems::Center,
        Align::End => AlignItems::FlexEnd,
    };

    FlexStyle {
        display: Display::Flex,
        flex_direction: match style.direction {
            FlexDirection::Row => taffy::style::FlexDirection::Row,
            FlexDirection::Column => taffy::style::FlexDirection::Column,
        },
        justify_content: Some(justify_content),
        align_items: Some(align_items),
        padding: Rect {
            left: px(style.padding.left),
            right: px(style.padding.right),
            top: px(style.padding.top),
            bottom: px(style.padding.bottom),
        },
        margin: Rect {
            left: LengthPercentageAuto::length(0.0),
            right: LengthPercentageAuto::length(0.0),
            top: LengthPercentageAuto::length(0.0),
            bottom: LengthPercentageAuto::length(style.margin_bottom as f32),
        },
        gap: Size {
            width: px(style.gap),
            height: px(style.gap),
        },
        size,
        max_size: Size {
            width: style
                .max_width
                .map_or(Dimension::auto(), |w| Dimension::length(w as f32)),
            height: Dimension::auto(),
        },
        ..FlexStyle::default()
    }
}

fn measure_leaf(
    engine: &mut TextEngine,
    leaf: &TextLeaf,
    known: Size<Option<f32>>,
    available: Size<AvailableSpace>,
) -> OgResult<Size<f32>> {
    if let Size {
        width: Some(width),
        height: Some(height),
    } = known
    {
        return Ok(Size { width, height });
    }
    let limit = match (known.width, available.width) {
        (Some(w), _) | (None, AvailableSpace::Definite(w)) => Some(f64::from(w)),
        (None, AvailableSpace::MinContent) => Some(0.0),
        (None, AvailableSpace::MaxContent) => None,
    };
    let limit = match (limit, leaf.max_width) {
        (Some(l), Some(m)) => Some(l.min(m)),
        (l, m) => l.or(m),
    };

    let block = engine.break_lines(&leaf.content, &leaf.style, limit)?;
    Ok(Size {
        width: known.width.unwrap_or(block.width as f32),
        height: known.height.unwrap_or(block.height(&leaf.style) as f32),
    })
}

fn resolve(
    taffy: &taffy::TaffyTree<TextLeaf>,
    engine: &mut TextEngine,
    node: &Mirror,
) -> OgResult<LayoutBox> {
    let layout = taffy.layout(node.id()).map_err(layout_err)?;
    let size = geom::Size::new(f64::from(layout.size.width), f64::from(layout.size.height));

    match node {
        Mirror::Text { id, background } => {
            let leaf = taffy
                .get_node_context(*id)
                .ok_or_else(|| OgError::render("layout: text node lost its content"))?;
            let inset = Vec2::new(f64::from(layout.padding.left), f64::from(layout.padding.top));
            let inner_width = size.width - inset.x - f64::from(layout.padding.right);
            let block =
                engine.break_lines(&leaf.content, &leaf.style, Some(inner_width + LINE_FIT_SLACK))?;
            Ok(LayoutBox {
                size,
                background: background.clone(),
                content: BoxContent::Text {
                    block,
                    style: leaf.style.clone(),
                    inset,
                },
            })
        }
        Mirror::Container {
            background,
            children,
            ..
        } => {
            let mut placed = Vec::with_capacity(children.len());
            for child in children {
                let at = taffy.layout(child.id()).map_err(layout_err)?.location;
                let offset = Vec2::new(f64::from(at.x), f64::from(at.y));
                placed.push((offset, resolve(taffy, engine, child)?));
            }
            Ok(LayoutBox {
                size,
                background: background.clone(),
                content: BoxContent::Children(placed),
            })
        }
    }
}
