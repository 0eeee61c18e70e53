//! Portable content tree model.
//!
//! A [`ContentNode`] is a named, typed node carrying ordered properties and
//! ordered child nodes; a [`ContentProperty`] carries string-encoded values
//! tagged with a [`PropertyKind`]. Trees of these are typically deserialized
//! (or hand-built), handed to the binder once, and discarded — the binder
//! never retains references to them.

mod binary;
mod node;
mod property;

pub use binary::BinaryValue;
pub use node::ContentNode;
pub use property::{ContentProperty, PropertyKind};
