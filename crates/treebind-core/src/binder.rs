//! The binder: pushes a portable content tree onto a target store node.

use std::collections::{HashMap, HashSet};

use tracing::{debug_span, trace};

use crate::errors::{BindError, BindResult, StoreError};
use crate::filter::{DefaultItemFilter, ItemFilter, ItemRef};
use crate::index::ChildIndex;
use crate::model::{BinaryValue, ContentNode, ContentProperty, PropertyKind};
use crate::store::NodeStore;
use crate::value::ValueConverter;

/// How existing children of a target node are reconciled against the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindStrategy {
    /// Remove every existing child, then add all filtered source children.
    Overwrite,
    /// Remove compound-flagged children and exact (name, primary type)
    /// matches of filtered source children; preserve everything else. Then
    /// add all filtered source children.
    #[default]
    Selective,
    /// Never remove. Pair source children positionally with existing
    /// children of the same name and primary type; bind matched pairs in
    /// place and append the unmatched remainder.
    Merge,
}

impl BindStrategy {
    /// Strategy from the two legacy flags. Full overwrite wins over
    /// merge-only; with neither set the selective strategy applies.
    pub fn from_flags(full_overwrite: bool, merge_only: bool) -> Self {
        if full_overwrite {
            BindStrategy::Overwrite
        } else if merge_only {
            BindStrategy::Merge
        } else {
            BindStrategy::Selective
        }
    }
}

/// Decides whether an existing child is a compound of its parent: a node the
/// parent owns outright, to be rebuilt from source rather than preserved.
/// Consulted only by the selective strategy.
pub trait CompoundPolicy<S: NodeStore + ?Sized> {
    /// # Errors
    ///
    /// Forwards store errors from type inspection.
    fn is_compound(&self, store: &S, node: &S::NodeId) -> Result<bool, StoreError>;
}

/// Compound policy driven by a set of type names: a child is compound when it
/// is of any of the configured types. The empty set (the default) flags
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct CompoundTypeSet {
    type_names: Vec<String>,
}

impl CompoundTypeSet {
    pub fn new<I, T>(type_names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            type_names: type_names.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: NodeStore + ?Sized> CompoundPolicy<S> for CompoundTypeSet {
    fn is_compound(&self, store: &S, node: &S::NodeId) -> Result<bool, StoreError> {
        for type_name in &self.type_names {
            if store.is_node_type(node, type_name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Reconciles a [`ContentNode`] tree onto a target store node.
///
/// The binder mutates the target in document order and performs no rollback;
/// on error the target below the failure point may be partially updated.
/// Matching decisions tie-break strictly by the store's child iteration
/// order.
pub struct Binder<S: NodeStore, C> {
    converter: C,
    strategy: BindStrategy,
    filter: Box<dyn ItemFilter>,
    compound_policy: Box<dyn CompoundPolicy<S>>,
}

impl<S, C> Binder<S, C>
where
    S: NodeStore,
    C: ValueConverter<Value = S::Value>,
{
    /// Binder with the selective strategy, the default filter and an empty
    /// compound policy.
    pub fn new(converter: C) -> Self {
        Self {
            converter,
            strategy: BindStrategy::default(),
            filter: Box::new(DefaultItemFilter::new()),
            compound_policy: Box::new(CompoundTypeSet::default()),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: BindStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl ItemFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    #[must_use]
    pub fn with_compound_policy(mut self, policy: impl CompoundPolicy<S> + 'static) -> Self {
        self.compound_policy = Box::new(policy);
        self
    }

    pub fn strategy(&self) -> BindStrategy {
        self.strategy
    }

    /// Push `source` onto the target node: sync types, bind filtered
    /// properties, then reconcile children per the active strategy, recursing
    /// into every bound child.
    ///
    /// # Errors
    ///
    /// [`BindError`] carrying the path of the node under reconciliation when
    /// the store or a value conversion fails. No rollback is attempted.
    pub fn bind(&self, store: &mut S, target: &S::NodeId, source: &ContentNode) -> BindResult<()> {
        let path = store.node_path(target);
        let _span = debug_span!("bind", path = %path, strategy = ?self.strategy).entered();

        self.sync_types(store, target, source, &path)?;
        self.bind_properties(store, target, source, &path)?;

        match self.strategy {
            BindStrategy::Overwrite => self.reconcile_overwrite(store, target, source, &path),
            BindStrategy::Selective => self.reconcile_selective(store, target, source, &path),
            BindStrategy::Merge => self.reconcile_merge(store, target, source, &path),
        }
    }

    fn sync_types(
        &self,
        store: &mut S,
        target: &S::NodeId,
        source: &ContentNode,
        path: &str,
    ) -> BindResult<()> {
        let wrap = |e| BindError::store(path, e);

        let source_type = source.primary_type();
        if !source_type.trim().is_empty() && store.primary_type(target).map_err(wrap)? != source_type
        {
            trace!(path = %path, primary_type = %source_type, "updating primary type");
            store.set_primary_type(target, source_type).map_err(wrap)?;
        }

        for mixin in source.mixin_types() {
            if !store.has_mixin(target, mixin).map_err(wrap)? {
                trace!(path = %path, mixin = %mixin, "adding mixin");
                store.add_mixin(target, mixin).map_err(wrap)?;
            }
        }
        Ok(())
    }

    fn bind_properties(
        &self,
        store: &mut S,
        target: &S::NodeId,
        source: &ContentNode,
        path: &str,
    ) -> BindResult<()> {
        for property in source.properties() {
            if !self.filter.accept(ItemRef::Property(property)) {
                continue;
            }
            if store
                .has_property(target, property.name())
                .map_err(|e| BindError::store(path, e))?
                && store
                    .is_property_protected(target, property.name())
                    .map_err(|e| BindError::store(path, e))?
            {
                trace!(path = %path, property = %property.name(), "skipping protected property");
                continue;
            }

            match property.kind() {
                PropertyKind::Path => self.bind_path_property(store, target, property, path)?,
                PropertyKind::Binary => self.bind_binary_property(store, target, property, path)?,
                _ => self.bind_scalar_property(store, target, property, path)?,
            }
        }
        Ok(())
    }

    /// PATH properties bind the first value only, and only when it resolves
    /// to an existing node; blank or unresolvable paths are skipped without
    /// error.
    fn bind_path_property(
        &self,
        store: &mut S,
        target: &S::NodeId,
        property: &ContentProperty,
        path: &str,
    ) -> BindResult<()> {
        let Some(value) = property.value() else {
            return Ok(());
        };
        if value.trim().is_empty() {
            return Ok(());
        }
        let Some(referenced) = store.resolve_path(value) else {
            trace!(path = %path, property = %property.name(), target_path = %value,
                   "path does not resolve, skipping");
            return Ok(());
        };

        let reference = store
            .reference_value(&referenced)
            .map_err(|e| BindError::store(path, e))?;
        self.set_single(store, target, property, reference, path)
    }

    fn bind_binary_property(
        &self,
        store: &mut S,
        target: &S::NodeId,
        property: &ContentProperty,
        path: &str,
    ) -> BindResult<()> {
        let wrap = |e| BindError::conversion(path, property.name(), e);

        if property.is_multiple() {
            let mut natives = Vec::with_capacity(property.value_count());
            for value in property.values() {
                let payload = BinaryValue::from_locator(value).map_err(wrap)?;
                natives.push(self.converter.binary_to_native(&payload).map_err(wrap)?);
            }
            store
                .set_property_multi(target, property.name(), PropertyKind::Binary, natives)
                .map_err(|e| BindError::store(path, e))
        } else {
            let Some(value) = property.value() else {
                return Ok(());
            };
            let payload = BinaryValue::from_locator(value).map_err(wrap)?;
            let native = self.converter.binary_to_native(&payload).map_err(wrap)?;
            self.set_single(store, target, property, native, path)
        }
    }

    fn bind_scalar_property(
        &self,
        store: &mut S,
        target: &S::NodeId,
        property: &ContentProperty,
        path: &str,
    ) -> BindResult<()> {
        let wrap = |e| BindError::conversion(path, property.name(), e);

        if property.is_multiple() {
            // An empty value list still (re)creates the property as an empty
            // multi-valued property of the declared kind.
            let mut natives = Vec::with_capacity(property.value_count());
            for value in property.values() {
                natives.push(self.converter.to_native(property.kind(), value).map_err(wrap)?);
            }
            store
                .set_property_multi(target, property.name(), property.kind(), natives)
                .map_err(|e| BindError::store(path, e))
        } else {
            let Some(value) = property.value() else {
                return Ok(());
            };
            let native = self.converter.to_native(property.kind(), value).map_err(wrap)?;
            self.set_single(store, target, property, native, path)
        }
    }

    /// Single-value assignment with the one documented retry: when the
    /// existing definition requires multiple values, the value is re-set as a
    /// one-element array of the property's declared kind.
    fn set_single(
        &self,
        store: &mut S,
        target: &S::NodeId,
        property: &ContentProperty,
        value: S::Value,
        path: &str,
    ) -> BindResult<()> {
        match store.set_property_single(target, property.name(), value.clone()) {
            Ok(()) => Ok(()),
            Err(StoreError::CardinalityMismatch { .. }) => {
                trace!(path = %path, property = %property.name(),
                       "retrying single value as one-element array");
                store
                    .set_property_multi(target, property.name(), property.kind(), vec![value])
                    .map_err(|e| BindError::store(path, e))
            }
            Err(e) => Err(BindError::store(path, e)),
        }
    }

    fn filtered_children<'a>(&self, source: &'a ContentNode) -> Vec<&'a ContentNode> {
        source
            .children()
            .iter()
            .filter(|child| self.filter.accept(ItemRef::Node(child)))
            .collect()
    }

    fn add_and_bind(
        &self,
        store: &mut S,
        target: &S::NodeId,
        child: &ContentNode,
        path: &str,
    ) -> BindResult<()> {
        trace!(path = %path, child = %child.name(), "adding child");
        let added = store
            .add_child(target, child.name(), child.primary_type())
            .map_err(|e| BindError::store(path, e))?;
        self.bind(store, &added, child)
    }

    fn reconcile_overwrite(
        &self,
        store: &mut S,
        target: &S::NodeId,
        source: &ContentNode,
        path: &str,
    ) -> BindResult<()> {
        for existing in store.children(target).map_err(|e| BindError::store(path, e))? {
            trace!(path = %path, child = %store.node_path(&existing), "removing child");
            store
                .remove_node(&existing)
                .map_err(|e| BindError::store(path, e))?;
        }
        for child in self.filtered_children(source) {
            self.add_and_bind(store, target, child, path)?;
        }
        Ok(())
    }

    fn reconcile_selective(
        &self,
        store: &mut S,
        target: &S::NodeId,
        source: &ContentNode,
        path: &str,
    ) -> BindResult<()> {
        let wrap = |e| BindError::store(path, e);

        // Index the children as they exist before any mutation; the index
        // preserves store iteration order within every group.
        let mut index = ChildIndex::new();
        for existing in store.children(target).map_err(wrap)? {
            let name = store.node_name(&existing).map_err(wrap)?;
            let primary_type = store.primary_type(&existing).map_err(wrap)?;
            if self
                .compound_policy
                .is_compound(store, &existing)
                .map_err(wrap)?
            {
                index.add_compound(existing.clone());
            }
            index.add(&name, &primary_type, existing);
        }

        let children = self.filtered_children(source);

        let mut removed: HashSet<S::NodeId> = HashSet::new();
        for compound in index.compounds() {
            removed.insert(compound.clone());
        }
        for child in &children {
            for matched in index.get(child.name(), child.primary_type()) {
                removed.insert(matched.clone());
            }
        }
        for existing in store.children(target).map_err(wrap)? {
            if removed.contains(&existing) {
                trace!(path = %path, child = %store.node_path(&existing), "removing child");
                store.remove_node(&existing).map_err(wrap)?;
            }
        }

        for child in children {
            self.add_and_bind(store, target, child, path)?;
        }
        Ok(())
    }

    fn reconcile_merge(
        &self,
        store: &mut S,
        target: &S::NodeId,
        source: &ContentNode,
        path: &str,
    ) -> BindResult<()> {
        let wrap = |e| BindError::store(path, e);

        let mut existing_index = ChildIndex::new();
        for existing in store.children(target).map_err(wrap)? {
            let name = store.node_name(&existing).map_err(wrap)?;
            let primary_type = store.primary_type(&existing).map_err(wrap)?;
            existing_index.add(&name, &primary_type, existing);
        }

        // Pair positionally within each (name, type) group: the k-th filtered
        // source child of a group binds into the k-th existing child of the
        // same group, both in their respective iteration orders.
        let mut ordinals: HashMap<(String, String), usize> = HashMap::new();
        for child in self.filtered_children(source) {
            let key = (child.name().to_string(), child.primary_type().to_string());
            let ordinal = ordinals.entry(key).or_insert(0);
            let matches = existing_index.get(child.name(), child.primary_type());
            if let Some(existing) = matches.get(*ordinal) {
                *ordinal += 1;
                let existing = existing.clone();
                self.bind(store, &existing, child)?;
            } else {
                *ordinal += 1;
                self.add_and_bind(store, target, child, path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_flags_precedence() {
        assert_eq!(BindStrategy::from_flags(false, false), BindStrategy::Selective);
        assert_eq!(BindStrategy::from_flags(false, true), BindStrategy::Merge);
        assert_eq!(BindStrategy::from_flags(true, false), BindStrategy::Overwrite);
        assert_eq!(BindStrategy::from_flags(true, true), BindStrategy::Overwrite);
    }

    #[test]
    fn test_default_strategy_is_selective() {
        assert_eq!(BindStrategy::default(), BindStrategy::Selective);
    }
}
