//! XPath rendering of the query model
//!
//! Output shape: `//parent[preds]/target[preds]`. Within a step the
//! predicates are attribute tests, then the text test, then sibling and
//! ancestor/descendant tests (target only, in accumulation order), then
//! the position, all joined with ` and `. Values are written as-is, with no
//! XML escaping.

use crate::model::{Attribute, MatchKind, Parent, Relative, Sibling, TargetElement, TextConstraint};
use std::fmt;

/// Render the model to an XPath location path
pub fn render(target: &TargetElement) -> String {
    let mut xpath = String::from("//");
    if let Some(parent) = &target.parent {
        write_step(&mut xpath, parent.name.as_deref(), &parent_predicates(parent));
        xpath.push('/');
    }
    write_step(&mut xpath, target.name.as_deref(), &target_predicates(target));
    xpath
}

impl fmt::Display for TargetElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

fn write_step(out: &mut String, name: Option<&str>, predicates: &[String]) {
    out.push_str(name.unwrap_or("*"));
    if !predicates.is_empty() {
        out.push_str(&format!("[{}]", predicates.join(" and ")));
    }
}

fn parent_predicates(parent: &Parent) -> Vec<String> {
    let mut predicates: Vec<String> = parent.attributes.iter().map(attribute_predicate).collect();
    predicates.extend(parent.text.as_ref().map(text_predicate));
    predicates.extend(parent.position.map(|p| format!("position()={}", p)));
    predicates
}

fn target_predicates(target: &TargetElement) -> Vec<String> {
    let mut predicates: Vec<String> = target.attributes.iter().map(attribute_predicate).collect();
    predicates.extend(target.text.as_ref().map(text_predicate));
    predicates.extend(target.siblings.iter().map(sibling_predicate));
    predicates.extend(target.relatives.iter().map(relative_predicate));
    predicates.extend(target.position.map(|p| format!("position()={}", p)));
    predicates
}

fn attribute_predicate(attribute: &Attribute) -> String {
    let TextConstraint { value, kind } = &attribute.text;
    match kind {
        MatchKind::Exact => format!("@{}='{}'", attribute.name, value),
        MatchKind::Contains => format!("contains(@{},'{}')", attribute.name, value),
    }
}

fn text_predicate(text: &TextConstraint) -> String {
    match text.kind {
        MatchKind::Exact => format!("text()='{}'", text.value),
        MatchKind::Contains => format!("contains(text(),'{}')", text.value),
    }
}

fn sibling_predicate(sibling: &Sibling) -> String {
    let axis = if sibling.preceding { "preceding-sibling" } else { "following-sibling" };
    format!("{}::{}", axis, sibling.name)
}

fn relative_predicate(relative: &Relative) -> String {
    let axis = if relative.descendant { "descendant" } else { "ancestor" };
    format!("{}::{}", axis, relative.name)
}
