//! TreeBind Memory - HashMap-backed in-memory node store
//!
//! A single-threaded [`NodeStore`] implementation used as the reference
//! binding target and as the test harness for the engine. Nodes live in a
//! flat map keyed by numeric handle; child order is the insertion order of
//! the parent's child list.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use treebind_core::errors::StoreError;
use treebind_core::model::PropertyKind;
use treebind_core::store::NodeStore;
use treebind_core::value::NativeValue;

/// Opaque handle to a node in a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone)]
struct PropertyRecord {
    name: String,
    kind: PropertyKind,
    multiple: bool,
    values: Vec<NativeValue>,
}

#[derive(Debug, Clone)]
struct NodeRecord {
    name: String,
    primary_type: String,
    mixins: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Ordered; unique by name.
    properties: Vec<PropertyRecord>,
    /// Property names the store refuses to let the binder touch.
    protected: HashSet<String>,
    /// Property names whose definition requires a multi-valued assignment.
    multiple_required: HashSet<String>,
}

impl NodeRecord {
    fn new(name: impl Into<String>, primary_type: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            primary_type: primary_type.into(),
            mixins: Vec::new(),
            parent,
            children: Vec::new(),
            properties: Vec::new(),
            protected: HashSet::new(),
            multiple_required: HashSet::new(),
        }
    }

    fn property(&self, name: &str) -> Option<&PropertyRecord> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// In-memory node store.
///
/// Not thread-safe; designed for single-threaded use. Every store owns one
/// root node that cannot be removed.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    nodes: HashMap<NodeId, NodeRecord>,
    root: NodeId,
    next_id: u64,
}

impl MemoryStore {
    /// Create a store holding a single root node of the given primary type.
    pub fn new(root_type: impl Into<String>) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeRecord::new("", root_type, None));
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn record(&self, id: NodeId) -> Result<&NodeRecord, StoreError> {
        self.nodes.get(&id).ok_or_else(|| StoreError::NodeNotFound {
            path: format!("#{}", id.0),
        })
    }

    fn record_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, StoreError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| StoreError::NodeNotFound {
                path: format!("#{}", id.0),
            })
    }

    /// 1-based position of the node among its same-name siblings.
    fn sibling_ordinal(&self, record: &NodeRecord, id: NodeId) -> u32 {
        let Some(parent) = record.parent.and_then(|p| self.nodes.get(&p)) else {
            return 1;
        };
        let mut ordinal = 0;
        for child_id in &parent.children {
            if let Some(child) = self.nodes.get(child_id) {
                if child.name == record.name {
                    ordinal += 1;
                }
            }
            if *child_id == id {
                break;
            }
        }
        ordinal.max(1)
    }

    /// Mark an existing or future property read-only for the binder.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    pub fn mark_protected(&mut self, node: NodeId, name: impl Into<String>) -> Result<(), StoreError> {
        self.record_mut(node)?.protected.insert(name.into());
        Ok(())
    }

    /// Declare that a property only accepts multi-valued assignments, making
    /// single-value sets fail with a cardinality mismatch.
    ///
    /// # Errors
    ///
    /// `StoreError::NodeNotFound` when the handle is stale.
    pub fn require_multiple(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.record_mut(node)?.multiple_required.insert(name.into());
        Ok(())
    }

    /// Stored values of a property, if present.
    pub fn property_values(&self, node: NodeId, name: &str) -> Option<Vec<NativeValue>> {
        self.nodes
            .get(&node)?
            .property(name)
            .map(|p| p.values.clone())
    }

    /// First stored value of a property, if present.
    pub fn property_value(&self, node: NodeId, name: &str) -> Option<NativeValue> {
        self.property_values(node, name)?.into_iter().next()
    }

    /// Declared kind of a property, if present.
    pub fn property_kind(&self, node: NodeId, name: &str) -> Option<PropertyKind> {
        self.nodes.get(&node)?.property(name).map(|p| p.kind)
    }

    /// Whether a property is stored as multi-valued.
    pub fn property_is_multiple(&self, node: NodeId, name: &str) -> Option<bool> {
        self.nodes.get(&node)?.property(name).map(|p| p.multiple)
    }

    /// Names of the node's children in order. Empty for a stale handle.
    pub fn child_names(&self, node: NodeId) -> Vec<String> {
        let Some(record) = self.nodes.get(&node) else {
            return Vec::new();
        };
        record
            .children
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|c| c.name.clone()))
            .collect()
    }

    /// Mixin types currently on the node. Empty for a stale handle.
    pub fn mixins(&self, node: NodeId) -> Vec<String> {
        self.nodes
            .get(&node)
            .map(|r| r.mixins.clone())
            .unwrap_or_default()
    }

    fn drop_subtree(&mut self, id: NodeId) {
        if let Some(record) = self.nodes.remove(&id) {
            for child in record.children {
                self.drop_subtree(child);
            }
        }
    }
}

impl NodeStore for MemoryStore {
    type NodeId = NodeId;
    type Value = NativeValue;

    fn node_name(&self, node: &NodeId) -> Result<String, StoreError> {
        Ok(self.record(*node)?.name.clone())
    }

    fn node_path(&self, node: &NodeId) -> String {
        let Some(record) = self.nodes.get(node) else {
            return format!("#{}", node.0);
        };
        if record.parent.is_none() {
            return "/".to_string();
        }

        let mut segments = Vec::new();
        let mut current = Some(*node);
        while let Some(id) = current {
            let Some(record) = self.nodes.get(&id) else {
                break;
            };
            if record.parent.is_none() {
                break;
            }
            let ordinal = self.sibling_ordinal(record, id);
            if ordinal > 1 {
                segments.push(format!("{}[{}]", record.name, ordinal));
            } else {
                segments.push(record.name.clone());
            }
            current = record.parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn primary_type(&self, node: &NodeId) -> Result<String, StoreError> {
        Ok(self.record(*node)?.primary_type.clone())
    }

    fn set_primary_type(&mut self, node: &NodeId, type_name: &str) -> Result<(), StoreError> {
        if type_name.trim().is_empty() {
            return Err(StoreError::InvalidType {
                type_name: type_name.to_string(),
                reason: "type name must not be blank".to_string(),
            });
        }
        self.record_mut(*node)?.primary_type = type_name.to_string();
        Ok(())
    }

    fn has_mixin(&self, node: &NodeId, mixin: &str) -> Result<bool, StoreError> {
        Ok(self.record(*node)?.mixins.iter().any(|m| m == mixin))
    }

    fn add_mixin(&mut self, node: &NodeId, mixin: &str) -> Result<(), StoreError> {
        if mixin.trim().is_empty() {
            return Err(StoreError::InvalidType {
                type_name: mixin.to_string(),
                reason: "mixin name must not be blank".to_string(),
            });
        }
        let record = self.record_mut(*node)?;
        if !record.mixins.iter().any(|m| m == mixin) {
            record.mixins.push(mixin.to_string());
        }
        Ok(())
    }

    fn has_property(&self, node: &NodeId, name: &str) -> Result<bool, StoreError> {
        Ok(self.record(*node)?.property(name).is_some())
    }

    fn is_property_protected(&self, node: &NodeId, name: &str) -> Result<bool, StoreError> {
        Ok(self.record(*node)?.protected.contains(name))
    }

    fn set_property_single(
        &mut self,
        node: &NodeId,
        name: &str,
        value: NativeValue,
    ) -> Result<(), StoreError> {
        let record = self.record_mut(*node)?;
        if record.multiple_required.contains(name) {
            return Err(StoreError::CardinalityMismatch {
                name: name.to_string(),
            });
        }
        let kind = value.kind();
        if let Some(existing) = record.properties.iter_mut().find(|p| p.name == name) {
            existing.kind = kind;
            existing.multiple = false;
            existing.values = vec![value];
        } else {
            record.properties.push(PropertyRecord {
                name: name.to_string(),
                kind,
                multiple: false,
                values: vec![value],
            });
        }
        Ok(())
    }

    fn set_property_multi(
        &mut self,
        node: &NodeId,
        name: &str,
        kind: PropertyKind,
        values: Vec<NativeValue>,
    ) -> Result<(), StoreError> {
        let record = self.record_mut(*node)?;
        if let Some(existing) = record.properties.iter_mut().find(|p| p.name == name) {
            existing.kind = kind;
            existing.multiple = true;
            existing.values = values;
        } else {
            record.properties.push(PropertyRecord {
                name: name.to_string(),
                kind,
                multiple: true,
                values,
            });
        }
        Ok(())
    }

    fn children(&self, node: &NodeId) -> Result<Vec<NodeId>, StoreError> {
        Ok(self.record(*node)?.children.clone())
    }

    fn children_named(&self, node: &NodeId, name: &str) -> Result<Vec<NodeId>, StoreError> {
        Ok(self
            .record(*node)?
            .children
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(|c| c.name == name))
            .collect())
    }

    fn add_child(
        &mut self,
        node: &NodeId,
        name: &str,
        primary_type: &str,
    ) -> Result<NodeId, StoreError> {
        if primary_type.trim().is_empty() {
            return Err(StoreError::InvalidType {
                type_name: primary_type.to_string(),
                reason: "type name must not be blank".to_string(),
            });
        }
        self.record(*node)?;

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes
            .insert(id, NodeRecord::new(name, primary_type, Some(*node)));
        self.record_mut(*node)?.children.push(id);
        trace!(parent = %self.node_path(node), child = %name, "added child");
        Ok(id)
    }

    fn remove_node(&mut self, node: &NodeId) -> Result<(), StoreError> {
        let record = self.record(*node)?;
        let Some(parent) = record.parent else {
            return Err(StoreError::RemoveRefused {
                path: "/".to_string(),
            });
        };
        trace!(path = %self.node_path(node), "removing node");
        if let Some(parent_record) = self.nodes.get_mut(&parent) {
            parent_record.children.retain(|c| c != node);
        }
        self.drop_subtree(*node);
        Ok(())
    }

    fn is_node_type(&self, node: &NodeId, type_name: &str) -> Result<bool, StoreError> {
        let record = self.record(*node)?;
        Ok(record.primary_type == type_name || record.mixins.iter().any(|m| m == type_name))
    }

    fn resolve_path(&self, path: &str) -> Option<NodeId> {
        let rest = path.strip_prefix('/')?;
        let mut current = self.root;
        if rest.is_empty() {
            return Some(current);
        }
        for segment in rest.split('/') {
            let (name, ordinal) = parse_segment(segment)?;
            let record = self.nodes.get(&current)?;
            let mut seen = 0;
            let mut next = None;
            for child_id in &record.children {
                let child = self.nodes.get(child_id)?;
                if child.name == name {
                    seen += 1;
                    if seen == ordinal {
                        next = Some(*child_id);
                        break;
                    }
                }
            }
            current = next?;
        }
        Some(current)
    }

    fn reference_value(&self, node: &NodeId) -> Result<NativeValue, StoreError> {
        self.record(*node)?;
        Ok(NativeValue::Reference(self.node_path(node)))
    }
}

/// Split a path segment into its name and 1-based same-name ordinal, parsing
/// a trailing `[n]` when present.
fn parse_segment(segment: &str) -> Option<(&str, u32)> {
    match segment.strip_suffix(']') {
        Some(rest) => {
            let (name, index) = rest.rsplit_once('[')?;
            let ordinal: u32 = index.parse().ok()?;
            if ordinal == 0 {
                return None;
            }
            Some((name, ordinal))
        }
        None => Some((segment, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new("app:root")
    }

    #[test]
    fn test_root_path_and_resolution() {
        let s = store();
        assert_eq!(s.node_path(&s.root()), "/");
        assert_eq!(s.resolve_path("/"), Some(s.root()));
        assert_eq!(s.resolve_path("relative"), None);
    }

    #[test]
    fn test_add_child_and_paths_with_same_name_siblings() {
        let mut s = store();
        let root = s.root();
        let a1 = s.add_child(&root, "a", "t").unwrap();
        let b = s.add_child(&root, "b", "t").unwrap();
        let a2 = s.add_child(&root, "a", "t").unwrap();

        assert_eq!(s.node_path(&a1), "/a");
        assert_eq!(s.node_path(&b), "/b");
        assert_eq!(s.node_path(&a2), "/a[2]");

        assert_eq!(s.resolve_path("/a"), Some(a1));
        assert_eq!(s.resolve_path("/a[2]"), Some(a2));
        assert_eq!(s.resolve_path("/a[3]"), None);
        assert_eq!(s.children_named(&root, "a").unwrap(), vec![a1, a2]);
    }

    #[test]
    fn test_remove_node_drops_subtree_and_refuses_root() {
        let mut s = store();
        let root = s.root();
        let a = s.add_child(&root, "a", "t").unwrap();
        let b = s.add_child(&a, "b", "t").unwrap();
        assert_eq!(s.node_count(), 3);

        s.remove_node(&a).unwrap();
        assert_eq!(s.node_count(), 1);
        assert!(s.children(&root).unwrap().is_empty());
        assert!(matches!(
            s.node_name(&b),
            Err(StoreError::NodeNotFound { .. })
        ));

        assert!(matches!(
            s.remove_node(&root),
            Err(StoreError::RemoveRefused { .. })
        ));
    }

    #[test]
    fn test_single_set_respects_multiple_required() {
        let mut s = store();
        let root = s.root();
        s.require_multiple(root, "tags").unwrap();

        let err = s
            .set_property_single(&root, "tags", NativeValue::String("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, StoreError::CardinalityMismatch { .. }));

        s.set_property_multi(
            &root,
            "tags",
            PropertyKind::String,
            vec![NativeValue::String("x".to_string())],
        )
        .unwrap();
        assert_eq!(s.property_is_multiple(root, "tags"), Some(true));
    }

    #[test]
    fn test_empty_multi_value_keeps_declared_kind() {
        let mut s = store();
        let root = s.root();
        s.set_property_multi(&root, "nums", PropertyKind::Long, Vec::new())
            .unwrap();

        assert_eq!(s.property_kind(root, "nums"), Some(PropertyKind::Long));
        assert_eq!(s.property_values(root, "nums"), Some(Vec::new()));
    }

    #[test]
    fn test_set_single_replaces_in_place() {
        let mut s = store();
        let root = s.root();
        s.set_property_single(&root, "a", NativeValue::Long(1)).unwrap();
        s.set_property_single(&root, "b", NativeValue::Long(2)).unwrap();
        s.set_property_single(&root, "a", NativeValue::String("one".to_string()))
            .unwrap();

        assert_eq!(s.property_kind(root, "a"), Some(PropertyKind::String));
        assert_eq!(
            s.property_value(root, "a"),
            Some(NativeValue::String("one".to_string()))
        );
        // Order preserved: "a" is still first.
        let record = s.record(root).unwrap();
        assert_eq!(record.properties[0].name, "a");
    }

    #[test]
    fn test_is_node_type_covers_mixins() {
        let mut s = store();
        let root = s.root();
        s.add_mixin(&root, "mix:tagged").unwrap();

        assert!(s.is_node_type(&root, "app:root").unwrap());
        assert!(s.is_node_type(&root, "mix:tagged").unwrap());
        assert!(!s.is_node_type(&root, "other").unwrap());
    }

    #[test]
    fn test_reference_value_carries_path() {
        let mut s = store();
        let root = s.root();
        let a = s.add_child(&root, "a", "t").unwrap();
        assert_eq!(
            s.reference_value(&a).unwrap(),
            NativeValue::Reference("/a".to_string())
        );
    }
}
