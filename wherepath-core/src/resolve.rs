//! Operand resolution
//!
//! Turns one side of a leaf comparison into something the classifier can
//! match on: a concrete literal, an unresolved vocabulary path, an attribute
//! or text containment test, or a nested comparison.
//!
//! Nothing here executes caller code. Captured variables and call results
//! arrive already evaluated; resolving them only reads the stored value.

use crate::error::WherepathError;
use crate::predicate::{Expr, Literal, LiteralKind, Path};
use log::trace;
use serde_json::Value;
use std::fmt;

/// A resolved operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A concrete value ready to be embedded in XPath
    Value(Literal),
    /// A reference into the vocabulary, left for the classifier
    Path(Path),
    /// `subject.Contains(substring)`
    Containment { subject: Path, substring: Literal },
    /// A nested `left == right`
    Comparison(Box<Operand>, Box<Operand>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(literal) => write!(f, "{}", literal),
            Operand::Path(path) => write!(f, "{}", path),
            Operand::Containment { subject, substring } => {
                write!(f, "{}.Contains({})", subject, substring)
            }
            Operand::Comparison(left, right) => write!(f, "{} == {}", left, right),
        }
    }
}

/// Resolve one node of the predicate tree.
///
/// Returns `Ok(None)` for nodes no rule applies to (boolean connectives,
/// missing fields, non-scalar values); callers treat that as "no condition".
pub fn resolve(expr: &Expr) -> Result<Option<Operand>, WherepathError> {
    let operand = match expr {
        Expr::Literal(literal) => Some(Operand::Value(literal.clone())),
        Expr::Path(path) => Some(Operand::Path(path.clone())),
        Expr::Contains { subject, substring } => match resolve(substring)? {
            Some(Operand::Value(substring)) => Some(Operand::Containment {
                subject: subject.clone(),
                substring,
            }),
            _ => None,
        },
        Expr::Captured { .. } | Expr::Call { .. } | Expr::Member { .. } => {
            evaluate(expr)?.as_ref().and_then(Literal::from_json).map(Operand::Value)
        }
        Expr::Convert { to, operand } => match resolve(operand)? {
            Some(Operand::Value(literal)) => Some(Operand::Value(convert(literal, *to)?)),
            _ => None,
        },
        Expr::Eq(left, right) => match (resolve(left)?, resolve(right)?) {
            (Some(left), Some(right)) => {
                Some(Operand::Comparison(Box::new(left), Box::new(right)))
            }
            _ => None,
        },
        Expr::And(..) | Expr::Or(..) | Expr::Not(..) => None,
    };

    trace!("resolved `{}` to {:?}", expr, operand);
    Ok(operand)
}

/// Read a caller-side value. Member access resolves its object first and
/// then reads the field from it.
fn evaluate(expr: &Expr) -> Result<Option<Value>, WherepathError> {
    Ok(match expr {
        Expr::Literal(literal) => Some(literal.clone().into()),
        Expr::Captured { value, .. } => Some(value.clone()),
        Expr::Call { result, .. } => Some(result.clone()),
        Expr::Member { object, field } => {
            evaluate(object)?.and_then(|value| value.get(field.as_str()).cloned())
        }
        Expr::Convert { to, operand } => match evaluate(operand)?.as_ref().and_then(Literal::from_json) {
            Some(literal) => Some(convert(literal, *to)?.into()),
            None => None,
        },
        _ => None,
    })
}

/// Re-tag a literal with the kind a conversion node asks for
fn convert(literal: Literal, to: LiteralKind) -> Result<Literal, WherepathError> {
    if literal.kind() == to {
        return Ok(literal);
    }
    match (to, literal) {
        (LiteralKind::Str, other) => Ok(Literal::Str(other.to_text())),
        (LiteralKind::Int, Literal::Str(s)) => s
            .trim()
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| WherepathError::malformed("integer conversion", s)),
        (LiteralKind::Bool, Literal::Str(s)) => s
            .trim()
            .parse::<bool>()
            .map(Literal::Bool)
            .map_err(|_| WherepathError::malformed("boolean conversion", s)),
        (LiteralKind::Int, other) => Err(WherepathError::malformed("integer conversion", other.to_text())),
        (LiteralKind::Bool, other) => Err(WherepathError::malformed("boolean conversion", other.to_text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{AttributeRef, Member};
    use serde_json::json;

    #[test]
    fn test_literal_and_path_pass_through() {
        assert_eq!(resolve(&Expr::from("td")).unwrap(), Some(Operand::Value("td".into())));
        assert_eq!(
            resolve(&Expr::from(Member::ParentPosition)).unwrap(),
            Some(Operand::Path(Member::ParentPosition.into()))
        );
    }

    #[test]
    fn test_captured_and_call_resolve_to_value() {
        assert_eq!(
            resolve(&Expr::captured("position", 5)).unwrap(),
            Some(Operand::Value(Literal::Int(5)))
        );
        assert_eq!(
            resolve(&Expr::call("GetPosition", 5)).unwrap(),
            Some(Operand::Value(Literal::Int(5)))
        );
    }

    #[test]
    fn test_member_reads_field_of_captured_object() {
        let row = Expr::captured("row", json!({"cell": {"index": 3}, "tag": "tr"}));
        let index = Expr::Member {
            object: Box::new(Expr::Member { object: Box::new(row.clone()), field: "cell".into() }),
            field: "index".into(),
        };
        assert_eq!(resolve(&index).unwrap(), Some(Operand::Value(Literal::Int(3))));

        let missing = Expr::Member { object: Box::new(row), field: "nope".into() };
        assert_eq!(resolve(&missing).unwrap(), None);
    }

    #[test]
    fn test_convert_retags_value() {
        let expr = Expr::Convert { to: LiteralKind::Int, operand: Box::new(Expr::captured("p", "7")) };
        assert_eq!(resolve(&expr).unwrap(), Some(Operand::Value(Literal::Int(7))));

        let expr = Expr::Convert { to: LiteralKind::Str, operand: Box::new(Expr::from(7)) };
        assert_eq!(resolve(&expr).unwrap(), Some(Operand::Value(Literal::Str("7".into()))));
    }

    #[test]
    fn test_convert_failure_is_malformed() {
        let expr = Expr::Convert { to: LiteralKind::Int, operand: Box::new(Expr::from("five")) };
        assert!(matches!(resolve(&expr), Err(WherepathError::MalformedOperand { .. })));
    }

    #[test]
    fn test_contains_and_nested_comparison() {
        let contains = Expr::contains(Path::AttributeText(AttributeRef::target("class")), Expr::captured("c", "row"));
        assert_eq!(
            resolve(&contains).unwrap(),
            Some(Operand::Containment {
                subject: Path::AttributeText(AttributeRef::target("class")),
                substring: "row".into(),
            })
        );

        let nested = resolve(&Expr::equals(Member::ParentName, "tr")).unwrap().unwrap();
        assert_eq!(nested.to_string(), "Parent.Name == \"tr\"");
    }

    #[test]
    fn test_connectives_are_unresolved() {
        let or = Expr::Or(Box::new(Expr::from("a")), Box::new(Expr::from("b")));
        assert_eq!(resolve(&or).unwrap(), None);
        assert_eq!(resolve(&Expr::captured("xs", json!([1, 2]))).unwrap(), None);
    }
}
