//! Structural elements module

mod line;
mod support;

pub use line::Line;
pub use support::{SupportClassification, SupportKind};
