//! Query model: the flat description of the element an XPath should select
//!
//! The model is filled in by the conjunction walker and read by the renderer.
//! It is built once per translation and never shared.

use serde::Serialize;
use std::num::NonZeroU32;

/// How a text value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Contains,
}

/// A text value together with the way it is matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextConstraint {
    pub value: String,
    pub kind: MatchKind,
}

impl TextConstraint {
    pub fn exact(value: impl Into<String>) -> Self {
        TextConstraint { value: value.into(), kind: MatchKind::Exact }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        TextConstraint { value: value.into(), kind: MatchKind::Contains }
    }
}

/// An attribute test on the attribute's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub text: TextConstraint,
}

impl Attribute {
    pub fn new(name: impl Into<String>, text: TextConstraint) -> Self {
        Attribute { name: name.into(), text }
    }
}

/// Attributes keyed by name.
///
/// Inserting a name that is already present replaces its constraint but keeps
/// the slot it was first inserted at, so rendering order stays the order in
/// which names were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeSet(Vec<Attribute>);

impl AttributeSet {
    pub fn insert(&mut self, attribute: Attribute) {
        match self.0.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.0.push(attribute),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A sibling that must exist next to the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sibling {
    pub name: String,
    /// `true` for the preceding-sibling axis, `false` for following-sibling
    pub preceding: bool,
}

/// An ancestor or descendant that must exist around the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relative {
    pub name: String,
    /// `true` for the descendant axis, `false` for ancestor
    pub descendant: bool,
}

/// The direct parent of the target element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parent {
    pub name: Option<String>,
    pub attributes: AttributeSet,
    pub position: Option<NonZeroU32>,
    pub text: Option<TextConstraint>,
}

impl Parent {
    /// Whether the parent step needs a `[...]` predicate
    pub fn has_conditions(&self) -> bool {
        !self.attributes.is_empty() || self.position.is_some() || self.text.is_some()
    }
}

/// The element the generated XPath selects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetElement {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    pub attributes: AttributeSet,
    pub siblings: Vec<Sibling>,
    pub relatives: Vec<Relative>,
    /// 1-based, XPath convention
    pub position: Option<NonZeroU32>,
    pub text: Option<TextConstraint>,
}

impl TargetElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parent, creating it on first use
    pub fn parent_mut(&mut self) -> &mut Parent {
        self.parent.get_or_insert_with(Parent::default)
    }

    /// Whether the target step needs a `[...]` predicate
    pub fn has_conditions(&self) -> bool {
        !self.attributes.is_empty()
            || self.position.is_some()
            || self.text.is_some()
            || !self.siblings.is_empty()
            || !self.relatives.is_empty()
    }
}
