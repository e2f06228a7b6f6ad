//! Predicate classification
//!
//! A resolved conjunct is reduced to a [`Leaf`] and matched against an
//! ordered table of rules; the first rule that recognises it decides which
//! slot of the query model it fills. Unrecognised leaves produce no
//! condition.

use crate::error::WherepathError;
use crate::model::{Attribute, Relative, Sibling, TargetElement, TextConstraint};
use crate::predicate::{AttributeRef, Literal, Member, Owner, Path};
use crate::resolve::Operand;
use std::num::NonZeroU32;

/// One flattened condition, ready for classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    /// `path == value`
    Equals { path: Path, value: Literal },
    /// `subject.Contains(substring)`
    Contains { subject: Path, substring: Literal },
}

impl Leaf {
    /// Flatten a resolved conjunct. A comparison written value-first
    /// (`"td" == TargetElementName`) is turned around.
    pub fn from_operand(operand: Operand) -> Option<Leaf> {
        match operand {
            Operand::Comparison(left, right) => match (*left, *right) {
                (Operand::Path(path), Operand::Value(value))
                | (Operand::Value(value), Operand::Path(path)) => Some(Leaf::Equals { path, value }),
                _ => None,
            },
            Operand::Containment { subject, substring } => Some(Leaf::Contains { subject, substring }),
            Operand::Value(_) | Operand::Path(_) => None,
        }
    }
}

/// The slot a conjunct writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    TargetName(String),
    TargetPosition(NonZeroU32),
    TargetText(TextConstraint),
    ParentName(String),
    ParentPosition(NonZeroU32),
    ParentText(TextConstraint),
    ParentAttributeExact { name: String, value: String },
    ParentAttributeContains { name: String, substring: String },
    AttributeExact { name: String, value: String },
    AttributeContains { name: String, substring: String },
    SiblingFollowing(String),
    SiblingPreceding(String),
    Descendant(String),
    Ancestor(String),
}

impl Condition {
    /// Write this condition into the model, creating the parent on demand.
    /// A slot that is already set is overwritten.
    pub fn apply(self, target: &mut TargetElement) {
        match self {
            Condition::TargetName(name) => target.name = Some(name),
            Condition::TargetPosition(position) => target.position = Some(position),
            Condition::TargetText(text) => target.text = Some(text),
            Condition::ParentName(name) => target.parent_mut().name = Some(name),
            Condition::ParentPosition(position) => target.parent_mut().position = Some(position),
            Condition::ParentText(text) => target.parent_mut().text = Some(text),
            Condition::ParentAttributeExact { name, value } => target
                .parent_mut()
                .attributes
                .insert(Attribute::new(name, TextConstraint::exact(value))),
            Condition::ParentAttributeContains { name, substring } => target
                .parent_mut()
                .attributes
                .insert(Attribute::new(name, TextConstraint::contains(substring))),
            Condition::AttributeExact { name, value } => target
                .attributes
                .insert(Attribute::new(name, TextConstraint::exact(value))),
            Condition::AttributeContains { name, substring } => target
                .attributes
                .insert(Attribute::new(name, TextConstraint::contains(substring))),
            Condition::SiblingFollowing(name) => {
                target.siblings.push(Sibling { name, preceding: false })
            }
            Condition::SiblingPreceding(name) => {
                target.siblings.push(Sibling { name, preceding: true })
            }
            Condition::Descendant(name) => {
                target.relatives.push(Relative { name, descendant: true })
            }
            Condition::Ancestor(name) => {
                target.relatives.push(Relative { name, descendant: false })
            }
        }
    }
}

type Rule = fn(&Leaf) -> Option<Result<Condition, WherepathError>>;

/// Classification rules in priority order
const RULES: &[(&str, Rule)] = &[
    ("parent", parent_rule as Rule),
    ("target name", target_name_rule as Rule),
    ("attribute", attribute_rule as Rule),
    ("sibling", sibling_rule as Rule),
    ("position", position_rule as Rule),
    ("relative", relative_rule as Rule),
];

/// Find the condition a leaf expresses.
///
/// Returns `Ok(None)` when no rule matches; a matching rule whose operand
/// cannot be read (a non-numeric position, an empty name) is an error.
pub fn classify(leaf: &Leaf) -> Result<Option<Condition>, WherepathError> {
    for (rule_name, rule) in RULES {
        if let Some(result) = rule(leaf) {
            let condition = result?;
            log::debug!("{} rule: {:?}", rule_name, condition);
            return Ok(Some(condition));
        }
    }
    Ok(None)
}

/// Strip surrounding whitespace, parentheses, escapes and double quotes
/// from a literal. Clean input comes back unchanged.
pub fn clean_literal(raw: &str) -> String {
    raw.trim()
        .trim_matches(')')
        .trim_matches('\\')
        .trim_matches('"')
        .to_string()
}

fn name_of(value: &Literal) -> Result<String, WherepathError> {
    let name = clean_literal(&value.to_text());
    if name.is_empty() {
        return Err(WherepathError::malformed("element name", value.to_text()));
    }
    Ok(name)
}

fn attribute_name(attr: &AttributeRef) -> Result<String, WherepathError> {
    let name = clean_literal(&attr.name);
    if name.is_empty() {
        return Err(WherepathError::malformed("attribute name", attr.name.clone()));
    }
    Ok(name)
}

fn position_of(value: &Literal) -> Result<NonZeroU32, WherepathError> {
    let parsed = match value {
        Literal::Int(i) => u32::try_from(*i).ok(),
        Literal::Str(s) => clean_literal(s).parse::<u32>().ok(),
        Literal::Bool(_) => None,
    };
    parsed
        .and_then(NonZeroU32::new)
        .ok_or_else(|| WherepathError::malformed("position", value.to_text()))
}

fn text_of(value: &Literal, kind_contains: bool) -> TextConstraint {
    let value = clean_literal(&value.to_text());
    if kind_contains {
        TextConstraint::contains(value)
    } else {
        TextConstraint::exact(value)
    }
}

fn parent_rule(leaf: &Leaf) -> Option<Result<Condition, WherepathError>> {
    match leaf {
        Leaf::Equals { path: Path::Member(Member::ParentName), value } => {
            Some(name_of(value).map(Condition::ParentName))
        }
        Leaf::Equals { path: Path::AttributeText(attr), value } if attr.owner == Owner::Parent => {
            Some(attribute_name(attr).map(|name| Condition::ParentAttributeExact {
                name,
                value: clean_literal(&value.to_text()),
            }))
        }
        Leaf::Contains { subject: Path::AttributeText(attr), substring }
            if attr.owner == Owner::Parent =>
        {
            Some(attribute_name(attr).map(|name| Condition::ParentAttributeContains {
                name,
                substring: clean_literal(&substring.to_text()),
            }))
        }
        Leaf::Equals { path: Path::Member(Member::ParentPosition), value } => {
            Some(position_of(value).map(Condition::ParentPosition))
        }
        Leaf::Equals { path: Path::Member(Member::ParentText), value } => {
            Some(Ok(Condition::ParentText(text_of(value, false))))
        }
        Leaf::Contains { subject: Path::Member(Member::ParentText), substring } => {
            Some(Ok(Condition::ParentText(text_of(substring, true))))
        }
        _ => None,
    }
}

fn target_name_rule(leaf: &Leaf) -> Option<Result<Condition, WherepathError>> {
    match leaf {
        Leaf::Equals { path: Path::Member(Member::TargetElementName), value } => {
            Some(name_of(value).map(Condition::TargetName))
        }
        _ => None,
    }
}

fn attribute_rule(leaf: &Leaf) -> Option<Result<Condition, WherepathError>> {
    match leaf {
        Leaf::Equals { path: Path::AttributeText(attr), value } => {
            Some(attribute_name(attr).map(|name| Condition::AttributeExact {
                name,
                value: clean_literal(&value.to_text()),
            }))
        }
        Leaf::Contains { subject: Path::AttributeText(attr), substring } => {
            Some(attribute_name(attr).map(|name| Condition::AttributeContains {
                name,
                substring: clean_literal(&substring.to_text()),
            }))
        }
        Leaf::Equals { path: Path::Member(Member::Text), value } => {
            Some(Ok(Condition::TargetText(text_of(value, false))))
        }
        Leaf::Contains { subject: Path::Member(Member::Text), substring } => {
            Some(Ok(Condition::TargetText(text_of(substring, true))))
        }
        _ => None,
    }
}

fn sibling_rule(leaf: &Leaf) -> Option<Result<Condition, WherepathError>> {
    match leaf {
        Leaf::Equals { path: Path::Member(Member::FollowingSiblingName), value } => {
            Some(name_of(value).map(Condition::SiblingFollowing))
        }
        Leaf::Equals { path: Path::Member(Member::PrecedingSiblingName), value } => {
            Some(name_of(value).map(Condition::SiblingPreceding))
        }
        _ => None,
    }
}

fn position_rule(leaf: &Leaf) -> Option<Result<Condition, WherepathError>> {
    match leaf {
        Leaf::Equals { path: Path::Member(Member::Position), value } => {
            Some(position_of(value).map(Condition::TargetPosition))
        }
        _ => None,
    }
}

fn relative_rule(leaf: &Leaf) -> Option<Result<Condition, WherepathError>> {
    match leaf {
        Leaf::Equals { path: Path::Member(Member::DescendantName), value } => {
            Some(name_of(value).map(Condition::Descendant))
        }
        Leaf::Equals { path: Path::Member(Member::AncestorName), value } => {
            Some(name_of(value).map(Condition::Ancestor))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equals(member: Member, value: impl Into<Literal>) -> Leaf {
        Leaf::Equals { path: member.into(), value: value.into() }
    }

    #[test]
    fn test_clean_literal() {
        assert_eq!(clean_literal("  \"td\" "), "td");
        assert_eq!(clean_literal("5)"), "5");
        assert_eq!(clean_literal("\"myClass\""), "myClass");
        assert_eq!(clean_literal("\\tr\\"), "tr");
    }

    #[test]
    fn test_clean_literal_idempotent_on_clean_input() {
        for clean in ["td", "my class", "42", "a-b_c"] {
            assert_eq!(clean_literal(clean), clean);
            assert_eq!(clean_literal(&clean_literal(clean)), clean);
        }
    }

    #[test]
    fn test_names_and_positions() {
        assert_eq!(
            classify(&equals(Member::TargetElementName, "td")).unwrap(),
            Some(Condition::TargetName("td".into()))
        );
        assert_eq!(
            classify(&equals(Member::ParentPosition, 5)).unwrap(),
            Some(Condition::ParentPosition(NonZeroU32::new(5).unwrap()))
        );
        assert_eq!(
            classify(&equals(Member::Position, "4")).unwrap(),
            Some(Condition::TargetPosition(NonZeroU32::new(4).unwrap()))
        );
    }

    #[test]
    fn test_malformed_position_is_an_error() {
        for bad in [Literal::from("first"), Literal::Int(0), Literal::Int(-2), Literal::Bool(true)] {
            let leaf = Leaf::Equals { path: Member::Position.into(), value: bad };
            assert!(matches!(classify(&leaf), Err(WherepathError::MalformedOperand { what: "position", .. })));
        }
    }

    #[test]
    fn test_empty_name_is_an_error() {
        assert!(classify(&equals(Member::ParentName, "\"\"")).is_err());
        let leaf = Leaf::Equals {
            path: Path::AttributeText(AttributeRef::target(" ")),
            value: "x".into(),
        };
        assert!(classify(&leaf).is_err());
    }

    #[test]
    fn test_parent_attribute_goes_to_parent_rule() {
        let leaf = Leaf::Contains {
            subject: Path::AttributeText(AttributeRef::parent("class")),
            substring: "row".into(),
        };
        assert_eq!(
            classify(&leaf).unwrap(),
            Some(Condition::ParentAttributeContains { name: "class".into(), substring: "row".into() })
        );
    }

    #[test]
    fn test_unmatched_leaf_is_dropped() {
        let leaf = Leaf::Contains { subject: Member::TargetElementName.into(), substring: "t".into() };
        assert_eq!(classify(&leaf).unwrap(), None);
    }

    #[test]
    fn test_value_first_comparison_is_turned_around() {
        let operand = Operand::Comparison(
            Box::new(Operand::Value("tr".into())),
            Box::new(Operand::Path(Member::ParentName.into())),
        );
        assert_eq!(Leaf::from_operand(operand), Some(equals(Member::ParentName, "tr")));
    }

    #[test]
    fn test_apply_accumulates_axes_in_order() {
        let mut target = TargetElement::new();
        Condition::SiblingFollowing("b".into()).apply(&mut target);
        Condition::SiblingPreceding("a".into()).apply(&mut target);
        Condition::Ancestor("table".into()).apply(&mut target);

        assert_eq!(
            target.siblings,
            vec![
                Sibling { name: "b".into(), preceding: false },
                Sibling { name: "a".into(), preceding: true },
            ]
        );
        assert_eq!(target.relatives, vec![Relative { name: "table".into(), descendant: false }]);
    }
}
