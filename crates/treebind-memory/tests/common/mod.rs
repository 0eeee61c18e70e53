use treebind_core::logging::{self, Profile};
use treebind_core::{
    BindStrategy, Binder, ContentNode, ContentProperty, DefaultValueConverter, PropertyKind,
};
use treebind_memory::MemoryStore;

/// Create a new store with a plain root for testing
#[allow(dead_code)]
pub fn new_store() -> MemoryStore {
    logging::init(Profile::Test);
    MemoryStore::new("app:root")
}

/// Binder over the default converter with the default (selective) strategy
#[allow(dead_code)]
pub fn new_binder() -> Binder<MemoryStore, DefaultValueConverter> {
    Binder::new(DefaultValueConverter::new())
}

/// Binder over the default converter with an explicit strategy
#[allow(dead_code)]
pub fn binder_with(strategy: BindStrategy) -> Binder<MemoryStore, DefaultValueConverter> {
    Binder::new(DefaultValueConverter::new()).with_strategy(strategy)
}

/// A source node with the given name and primary type
#[allow(dead_code)]
pub fn node(name: &str, primary_type: &str) -> ContentNode {
    ContentNode::new(name, primary_type)
}

/// A single-valued STRING property
#[allow(dead_code)]
pub fn string_prop(name: &str, value: &str) -> ContentProperty {
    typed_prop(name, PropertyKind::String, value)
}

/// A single-valued property of the given kind
#[allow(dead_code)]
pub fn typed_prop(name: &str, kind: PropertyKind, value: &str) -> ContentProperty {
    let mut prop = ContentProperty::new(name, kind);
    prop.set_value(value);
    prop
}

/// A multi-valued property of the given kind
#[allow(dead_code)]
pub fn multi_prop(name: &str, kind: PropertyKind, values: &[&str]) -> ContentProperty {
    let mut prop = ContentProperty::new_multiple(name, kind);
    for value in values {
        prop.add_value(*value);
    }
    prop
}
