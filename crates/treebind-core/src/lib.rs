//! TreeBind Core - Portable content tree binding engine
//!
//! This crate provides the data structures and reconciliation engine for
//! pushing a portable content tree onto a mutable target node store:
//! - Content tree model (nodes, typed string-encoded properties, binary payloads)
//! - Item filters deciding which source items take part in a bind
//! - Value conversion between string-encoded and store-native values
//! - Child indexing for linear-time (name, type) matching
//! - The binder itself, with overwrite, selective and merge strategies
//!
//! The target store is abstract: anything implementing [`store::NodeStore`]
//! can be bound to. An in-memory implementation lives in the companion
//! `treebind-memory` crate.

pub mod binder;
pub mod errors;
pub mod filter;
pub mod index;
pub mod logging;
pub mod model;
pub mod store;
pub mod value;

// Re-export commonly used types
pub use binder::{BindStrategy, Binder, CompoundPolicy, CompoundTypeSet};
pub use errors::{BindError, BindResult, ConversionError, StoreError};
pub use filter::{DefaultItemFilter, ItemFilter, ItemRef};
pub use index::ChildIndex;
pub use model::{BinaryValue, ContentNode, ContentProperty, PropertyKind};
pub use store::NodeStore;
pub use value::{DefaultValueConverter, NativeValue, ValueConverter};
