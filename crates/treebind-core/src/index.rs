//! Index over a node's current children for O(1) (name, type) matching.

use std::collections::HashMap;

/// Groups items by name and primary type while preserving insertion order,
/// and separately tracks items flagged as compound (owned/embedded, eligible
/// for wholesale removal under the selective strategy).
///
/// Built once per reconciliation step over the target node's children as they
/// exist before any mutation; this keeps matching O(existing + source)
/// instead of O(existing × source).
#[derive(Debug)]
pub struct ChildIndex<T> {
    names: Vec<String>,
    by_name: HashMap<String, TypeGroups<T>>,
    compounds: Vec<T>,
}

#[derive(Debug)]
struct TypeGroups<T> {
    types: Vec<String>,
    by_type: HashMap<String, Vec<T>>,
}

impl<T> TypeGroups<T> {
    fn new() -> Self {
        Self {
            types: Vec::new(),
            by_type: HashMap::new(),
        }
    }
}

impl<T> Default for ChildIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChildIndex<T> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            by_name: HashMap::new(),
            compounds: Vec::new(),
        }
    }

    /// Record an item under (name, type), preserving insertion order within
    /// the group and across group keys.
    pub fn add(&mut self, name: &str, type_name: &str, item: T) {
        let groups = self.by_name.entry(name.to_string()).or_insert_with(|| {
            self.names.push(name.to_string());
            TypeGroups::new()
        });
        let group = groups
            .by_type
            .entry(type_name.to_string())
            .or_insert_with(|| {
                groups.types.push(type_name.to_string());
                Vec::new()
            });
        group.push(item);
    }

    /// Flag an item as compound.
    pub fn add_compound(&mut self, item: T) {
        self.compounds.push(item);
    }

    /// Items recorded under exactly (name, type), in insertion order.
    pub fn get(&self, name: &str, type_name: &str) -> &[T] {
        self.by_name
            .get(name)
            .and_then(|groups| groups.by_type.get(type_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Type groups recorded under a name, in first-appearance order.
    pub fn by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = (&'a str, &'a [T])> {
        self.by_name
            .get(name)
            .into_iter()
            .flat_map(|groups| {
                groups
                    .types
                    .iter()
                    .map(|ty| (ty.as_str(), groups.by_type[ty].as_slice()))
            })
    }

    /// Distinct names, in first-appearance order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Items flagged as compound, in insertion order.
    pub fn compounds(&self) -> &[T] {
        &self.compounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_preserves_insertion_order() {
        let mut index = ChildIndex::new();
        index.add("x", "t1", 1);
        index.add("x", "t2", 2);
        index.add("x", "t1", 3);

        assert_eq!(index.get("x", "t1"), &[1, 3]);
        assert_eq!(index.get("x", "t2"), &[2]);
        assert_eq!(index.get("x", "t3"), &[] as &[i32]);
        assert_eq!(index.get("y", "t1"), &[] as &[i32]);
    }

    #[test]
    fn test_by_name_iterates_types_in_first_appearance_order() {
        let mut index = ChildIndex::new();
        index.add("x", "t2", 1);
        index.add("x", "t1", 2);
        index.add("x", "t2", 3);

        let groups: Vec<(&str, &[i32])> = index.by_name("x").collect();
        assert_eq!(groups, vec![("t2", &[1, 3][..]), ("t1", &[2][..])]);
        assert!(index.by_name("missing").next().is_none());
    }

    #[test]
    fn test_names_in_first_appearance_order() {
        let mut index = ChildIndex::new();
        index.add("b", "t", 1);
        index.add("a", "t", 2);
        index.add("b", "t", 3);

        assert_eq!(index.names(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_compounds_tracked_separately() {
        let mut index = ChildIndex::new();
        index.add("x", "t", 1);
        index.add_compound(1);
        index.add_compound(2);

        assert_eq!(index.compounds(), &[1, 2]);
    }
}
