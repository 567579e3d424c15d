//! Preview card layout.

pub mod card;
pub mod tree;

pub use card::build_card;
pub use tree::{Align, Background, Container, FlexDirection, FontWeight, Style, TextNode, VisualNode};
