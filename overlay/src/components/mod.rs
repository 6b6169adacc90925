//! Reusable frame builders for scenes
//!
//! Each component produces a small [`Frame`](crate::frame::Frame) subtree with
//! named nodes, so a scene can build its layout once and update the values on
//! every reading.
//!
//! # Available Components
//!
//! - [`LabeledValue`] - Key-value row with right-aligned value
//! - [`Header`] - Section title with separator line

pub mod colors;
mod header;
mod labeled_value;

pub use header::Header;
pub use labeled_value::LabeledValue;
