use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::property::ContentProperty;

fn default_index() -> u32 {
    1
}

/// Re-derive same-name-sibling indexes after deserialization; they are not
/// part of the wire form.
fn deserialize_children<'de, D>(deserializer: D) -> Result<Vec<ContentNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut children: Vec<ContentNode> = Vec::deserialize(deserializer)?;
    let mut counts: HashMap<String, u32> = HashMap::new();
    for child in &mut children {
        let count = counts.entry(child.name.clone()).or_insert(0);
        *count += 1;
        child.sibling_index = *count;
    }
    Ok(children)
}

/// A node in the portable content tree.
///
/// Nodes carry a name, a primary type tag, an ordered set of mixin type tags,
/// ordered properties (unique by name) and ordered children (same-name
/// siblings allowed). Each node also knows its 1-based index among same-name
/// siblings, assigned when it is added to a parent and stable for its
/// lifetime in that parent's child list; a node whose name is unique among
/// its siblings always has index 1. The index never participates in equality
/// or serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
    name: String,
    primary_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mixin_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    properties: Vec<ContentProperty>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_children"
    )]
    children: Vec<ContentNode>,
    #[serde(skip, default = "default_index")]
    sibling_index: u32,
}

impl ContentNode {
    pub fn new(name: impl Into<String>, primary_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_type: primary_type.into(),
            mixin_types: Vec::new(),
            properties: Vec::new(),
            children: Vec::new(),
            sibling_index: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn set_primary_type(&mut self, primary_type: impl Into<String>) {
        self.primary_type = primary_type.into();
    }

    pub fn mixin_types(&self) -> &[String] {
        &self.mixin_types
    }

    /// Add a mixin type tag. Already-present tags are ignored, preserving
    /// ordered-set semantics.
    pub fn add_mixin_type(&mut self, mixin_type: impl Into<String>) {
        let mixin_type = mixin_type.into();
        if !self.mixin_types.contains(&mixin_type) {
            self.mixin_types.push(mixin_type);
        }
    }

    pub fn remove_mixin_type(&mut self, mixin_type: &str) {
        self.mixin_types.retain(|m| m != mixin_type);
    }

    pub fn properties(&self) -> &[ContentProperty] {
        &self.properties
    }

    /// The property with the given name, if present.
    pub fn property(&self, name: &str) -> Option<&ContentProperty> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// First string-encoded value of the named property, if present.
    pub fn property_value(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(|p| p.value())
    }

    /// Set a property, replacing any existing property of the same name in
    /// place (its position in the ordered list is preserved).
    pub fn set_property(&mut self, property: ContentProperty) {
        if let Some(existing) = self
            .properties
            .iter_mut()
            .find(|p| p.name() == property.name())
        {
            *existing = property;
        } else {
            self.properties.push(property);
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<ContentProperty> {
        let pos = self.properties.iter().position(|p| p.name() == name)?;
        Some(self.properties.remove(pos))
    }

    pub fn children(&self) -> &[ContentNode] {
        &self.children
    }

    /// First child with the given name, if any.
    pub fn node(&self, name: &str) -> Option<&ContentNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name, in order.
    pub fn nodes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ContentNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Append a child node. The child's same-name-sibling index is assigned
    /// here and stays fixed for its lifetime in this child list.
    pub fn add_child(&mut self, mut child: ContentNode) {
        let same_name = self.children.iter().filter(|c| c.name == child.name).count();
        child.sibling_index = same_name as u32 + 1;
        self.children.push(child);
    }

    /// 1-based index among same-name siblings in the parent this node was
    /// added to. Always 1 for a detached node.
    pub fn index(&self) -> u32 {
        self.sibling_index
    }

    /// Fully independent deep copy, detached from any sibling context (the
    /// copy's own index resets to 1; descendant indexes are preserved since
    /// their parents come along).
    pub fn deep_clone(&self) -> Self {
        let mut clone = self.clone();
        clone.sibling_index = 1;
        clone
    }
}

/// Structural equality: name, types, properties and children compared
/// recursively; mixin sets compared without regard to order; the sibling
/// index is excluded.
impl PartialEq for ContentNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.primary_type == other.primary_type
            && self.mixin_types.len() == other.mixin_types.len()
            && self
                .mixin_types
                .iter()
                .all(|m| other.mixin_types.contains(m))
            && self.properties == other.properties
            && self.children == other.children
    }
}
