//! Capability contract for the mutable target tree store.

use std::fmt::Debug;
use std::hash::Hash;

use crate::errors::StoreError;
use crate::model::PropertyKind;

/// The node/property capability set the binder consumes.
///
/// The store owns its nodes and addresses them by handle; the binder treats
/// the handle as opaque and never assumes a concrete representation. All
/// child sequences are ordered, and that order is the tie-break for every
/// matching decision the binder makes.
pub trait NodeStore {
    /// Opaque node handle.
    type NodeId: Clone + Eq + Hash + Debug;
    /// The store's native property value representation.
    type Value: Clone;

    /// Name of the node.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn node_name(&self, node: &Self::NodeId) -> Result<String, StoreError>;

    /// Best-effort absolute path of the node, used for error context and
    /// reference values. Must not fail; a stale handle may render a
    /// placeholder.
    fn node_path(&self, node: &Self::NodeId) -> String;

    /// Current primary type name.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn primary_type(&self, node: &Self::NodeId) -> Result<String, StoreError>;

    /// Change the primary type.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidType` when the store rejects the type name.
    fn set_primary_type(&mut self, node: &Self::NodeId, type_name: &str) -> Result<(), StoreError>;

    /// Whether the node already carries the mixin.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn has_mixin(&self, node: &Self::NodeId, mixin: &str) -> Result<bool, StoreError>;

    /// Add a mixin. Implementations may assume the binder only calls this
    /// for mixins not already present.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidType` when the store rejects the mixin name.
    fn add_mixin(&mut self, node: &Self::NodeId, mixin: &str) -> Result<(), StoreError>;

    /// Whether a property of that name exists on the node.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn has_property(&self, node: &Self::NodeId, name: &str) -> Result<bool, StoreError>;

    /// Whether the store marks the existing property read-only. Fails open:
    /// a store that cannot answer reports `false`.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn is_property_protected(&self, node: &Self::NodeId, name: &str) -> Result<bool, StoreError>;

    /// Set a single-valued property.
    ///
    /// # Errors
    ///
    /// `StoreError::CardinalityMismatch` when the existing definition
    /// requires multiple values (the binder retries as an array), or
    /// `StoreError::PropertyRejected` for any other refusal.
    fn set_property_single(
        &mut self,
        node: &Self::NodeId,
        name: &str,
        value: Self::Value,
    ) -> Result<(), StoreError>;

    /// Set a multi-valued property of the declared kind. An empty value list
    /// must still create (or retype) the property as an empty multi-valued
    /// property of that kind — the declared type survives having no values.
    ///
    /// # Errors
    ///
    /// `StoreError::PropertyRejected` when the store refuses the assignment.
    fn set_property_multi(
        &mut self,
        node: &Self::NodeId,
        name: &str,
        kind: PropertyKind,
        values: Vec<Self::Value>,
    ) -> Result<(), StoreError>;

    /// All children, in store iteration order.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn children(&self, node: &Self::NodeId) -> Result<Vec<Self::NodeId>, StoreError>;

    /// Children with the given name, in store iteration order.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn children_named(
        &self,
        node: &Self::NodeId,
        name: &str,
    ) -> Result<Vec<Self::NodeId>, StoreError>;

    /// Append a new child of the given name and primary type.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidType` when the store rejects the type name.
    fn add_child(
        &mut self,
        node: &Self::NodeId,
        name: &str,
        primary_type: &str,
    ) -> Result<Self::NodeId, StoreError>;

    /// Remove the node and its subtree.
    ///
    /// # Errors
    ///
    /// `StoreError::RemoveRefused` when the store refuses the removal.
    fn remove_node(&mut self, node: &Self::NodeId) -> Result<(), StoreError>;

    /// Type-membership test: true when the node's primary type or any of its
    /// mixins equals (or, for hierarchical type systems, is a subtype of)
    /// the given type name. Used by compound-type predicates.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn is_node_type(&self, node: &Self::NodeId, type_name: &str) -> Result<bool, StoreError>;

    /// Resolve a store-internal path to a node, if it currently exists.
    fn resolve_path(&self, path: &str) -> Option<Self::NodeId>;

    /// Native value referencing the given node, used to bind PATH properties.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    fn reference_value(&self, node: &Self::NodeId) -> Result<Self::Value, StoreError>;
}
