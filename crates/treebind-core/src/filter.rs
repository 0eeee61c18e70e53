//! Item filters deciding which source items take part in a bind.

use crate::model::{ContentNode, ContentProperty};

/// A tree item offered to a filter: either a node or a property.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Node(&'a ContentNode),
    Property(&'a ContentProperty),
}

impl<'a> ItemRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            ItemRef::Node(node) => node.name(),
            ItemRef::Property(property) => property.name(),
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, ItemRef::Node(_))
    }
}

/// Predicate over source tree items.
///
/// Must be side-effect free and idempotent: the binder may consult it more
/// than once per item (merge-mode grouping re-filters). An item rejected by
/// the active filter is never created, updated, or considered a match for
/// source-driven removal decisions.
pub trait ItemFilter {
    fn accept(&self, item: ItemRef<'_>) -> bool;
}

impl<F> ItemFilter for F
where
    F: Fn(ItemRef<'_>) -> bool,
{
    fn accept(&self, item: ItemRef<'_>) -> bool {
        self(item)
    }
}

/// Default binding filter.
///
/// Accepts every node, and every property whose name does not carry one of
/// the configured store-internal prefixes. With no prefixes configured (the
/// default) it accepts everything; properties the target store marks
/// protected are skipped by the binder itself regardless of the filter.
#[derive(Debug, Clone, Default)]
pub struct DefaultItemFilter {
    internal_prefixes: Vec<String>,
}

impl DefaultItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject properties whose name starts with any of the given prefixes.
    pub fn with_internal_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            internal_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl ItemFilter for DefaultItemFilter {
    fn accept(&self, item: ItemRef<'_>) -> bool {
        match item {
            ItemRef::Node(_) => true,
            ItemRef::Property(property) => !self
                .internal_prefixes
                .iter()
                .any(|prefix| property.name().starts_with(prefix.as_str())),
        }
    }
}

/// Conjunction of filters: an item passes only if every layered filter
/// accepts it.
#[derive(Default)]
pub struct AllOf {
    filters: Vec<Box<dyn ItemFilter>>,
}

impl AllOf {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(mut self, filter: impl ItemFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl ItemFilter for AllOf {
    fn accept(&self, item: ItemRef<'_>) -> bool {
        self.filters.iter().all(|f| f.accept(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyKind;

    #[test]
    fn test_default_filter_accepts_everything() {
        let filter = DefaultItemFilter::new();
        let node = ContentNode::new("n", "t");
        let prop = ContentProperty::new("p", PropertyKind::String);

        assert!(filter.accept(ItemRef::Node(&node)));
        assert!(filter.accept(ItemRef::Property(&prop)));
    }

    #[test]
    fn test_internal_prefix_rejects_properties_only() {
        let filter = DefaultItemFilter::with_internal_prefixes(["sys:"]);
        let node = ContentNode::new("sys:config", "t");
        let internal = ContentProperty::new("sys:created", PropertyKind::Date);
        let plain = ContentProperty::new("title", PropertyKind::String);

        assert!(filter.accept(ItemRef::Node(&node)));
        assert!(!filter.accept(ItemRef::Property(&internal)));
        assert!(filter.accept(ItemRef::Property(&plain)));
    }

    #[test]
    fn test_all_of_composes_by_conjunction() {
        let filter = AllOf::new()
            .and(DefaultItemFilter::new())
            .and(|item: ItemRef<'_>| item.name() != "skipme");

        let keep = ContentNode::new("keep", "t");
        let skip = ContentNode::new("skipme", "t");
        assert!(filter.accept(ItemRef::Node(&keep)));
        assert!(!filter.accept(ItemRef::Node(&skip)));
    }
}
