//! Typed predicate trees
//!
//! A predicate is an AND-chain of conditions over a fixed vocabulary
//! (`TargetElementName`, `Parent.Position`, `Attribute("class").Text`, ...).
//! Values that come from the caller's environment (captured variables,
//! zero-argument calls) are evaluated before the tree is built, so the
//! tree only ever carries concrete values.

pub mod parser;

pub use parser::{parse, Bindings};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use strum_macros::{Display, EnumString};

/// A scalar value that can be embedded in XPath text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Literal {
    /// Textual form used when the value is written into the query model
    pub fn to_text(&self) -> String {
        match self {
            Literal::Bool(b) => b.to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Str(s) => s.clone(),
        }
    }

    /// Convert a caller-side JSON value; only scalars qualify
    pub fn from_json(value: &serde_json::Value) -> Option<Literal> {
        match value {
            serde_json::Value::Bool(b) => Some(Literal::Bool(*b)),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Str(n.to_string()),
            }),
            serde_json::Value::String(s) => Some(Literal::Str(s.clone())),
            _ => None,
        }
    }

    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Bool(_) => LiteralKind::Bool,
            Literal::Int(_) => LiteralKind::Int,
            Literal::Str(_) => LiteralKind::Str,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "\"{}\"", s),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<Literal> for serde_json::Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Bool(b) => b.into(),
            Literal::Int(i) => i.into(),
            Literal::Str(s) => s.into(),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Int(i64::from(i))
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

/// Target type of a conversion node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "string")]
    #[serde(rename = "string")]
    Str,
}

/// Which element an attribute or text test applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Target,
    Parent,
}

/// `Attribute(name)` on the target or on its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRef {
    pub owner: Owner,
    pub name: String,
}

impl AttributeRef {
    pub fn target(name: impl Into<String>) -> Self {
        AttributeRef { owner: Owner::Target, name: name.into() }
    }

    pub fn parent(name: impl Into<String>) -> Self {
        AttributeRef { owner: Owner::Parent, name: name.into() }
    }
}

/// Fixed vocabulary members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Member {
    #[strum(serialize = "TargetElementName")]
    TargetElementName,
    #[strum(serialize = "Position")]
    Position,
    #[strum(serialize = "Text")]
    Text,
    #[strum(serialize = "Parent.Name")]
    ParentName,
    #[strum(serialize = "Parent.Position")]
    ParentPosition,
    #[strum(serialize = "Parent.Text")]
    ParentText,
    #[strum(serialize = "FollowingSibling.Name")]
    FollowingSiblingName,
    #[strum(serialize = "PrecedingSibling.Name")]
    PrecedingSiblingName,
    #[strum(serialize = "Descendant.Name")]
    DescendantName,
    #[strum(serialize = "Ancestor.Name")]
    AncestorName,
}

/// A reference into the query vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Path {
    Member(Member),
    AttributeText(AttributeRef),
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Member(member) => write!(f, "{}", member),
            Path::AttributeText(attr) => {
                if attr.owner == Owner::Parent {
                    f.write_str("Parent.")?;
                }
                write!(f, "Attribute(\"{}\").Text", attr.name)
            }
        }
    }
}

impl From<Member> for Path {
    fn from(member: Member) -> Self {
        Path::Member(member)
    }
}

/// A node of the predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    /// `<subject>.Contains(<substring>)` where the subject is an attribute
    /// text or an element text
    Contains { subject: Path, substring: Box<Expr> },
    Literal(Literal),
    Path(Path),
    /// A variable captured from the caller, already evaluated
    Captured { name: String, value: serde_json::Value },
    /// A zero-argument call, already evaluated by the caller
    Call { function: String, result: serde_json::Value },
    /// Field access on a caller-owned value
    Member { object: Box<Expr>, field: String },
    Convert { to: LiteralKind, operand: Box<Expr> },
}

impl Expr {
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn equals(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
        Expr::Eq(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn contains(subject: Path, substring: impl Into<Expr>) -> Expr {
        Expr::Contains { subject, substring: Box::new(substring.into()) }
    }

    pub fn captured(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Expr {
        Expr::Captured { name: name.into(), value: value.into() }
    }

    pub fn call(function: impl Into<String>, result: impl Into<serde_json::Value>) -> Expr {
        Expr::Call { function: function.into(), result: result.into() }
    }

    /// Fold conditions into the left-nested AND-chain `((a && b) && c)`
    pub fn all(conditions: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        conditions.into_iter().reduce(Expr::and)
    }

    /// Move the boxed children out, leaving cheap leaves in their place
    fn detach_children(&mut self, out: &mut Vec<Expr>) {
        let mut take = |child: &mut Box<Expr>| {
            if child.has_children() {
                out.push(mem::replace(&mut **child, Expr::Literal(Literal::Bool(false))));
            }
        };
        match self {
            Expr::And(left, right) | Expr::Or(left, right) | Expr::Eq(left, right) => {
                take(left);
                take(right);
            }
            Expr::Not(inner)
            | Expr::Contains { substring: inner, .. }
            | Expr::Member { object: inner, .. }
            | Expr::Convert { operand: inner, .. } => take(inner),
            _ => {}
        }
    }

    fn has_children(&self) -> bool {
        matches!(
            self,
            Expr::And(..)
                | Expr::Or(..)
                | Expr::Eq(..)
                | Expr::Not(_)
                | Expr::Contains { .. }
                | Expr::Member { .. }
                | Expr::Convert { .. }
        )
    }
}

// Long AND-chains are as deep as they are long, so they are torn down with
// an explicit stack instead of recursive drops.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

impl From<Literal> for Expr {
    fn from(literal: Literal) -> Self {
        Expr::Literal(literal)
    }
}

impl From<Path> for Expr {
    fn from(path: Path) -> Self {
        Expr::Path(path)
    }
}

impl From<Member> for Expr {
    fn from(member: Member) -> Self {
        Expr::Path(Path::Member(member))
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(s.into())
    }
}

impl From<i64> for Expr {
    fn from(i: i64) -> Self {
        Expr::Literal(i.into())
    }
}

impl From<i32> for Expr {
    fn from(i: i32) -> Self {
        Expr::Literal(i.into())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(..) | Expr::Or(..) => write_chain(self, f),
            Expr::Not(e) => write!(f, "!{}", e),
            Expr::Eq(l, r) => write!(f, "{} == {}", l, r),
            Expr::Contains { subject: Path::AttributeText(attr), substring } => {
                if attr.owner == Owner::Parent {
                    f.write_str("Parent.")?;
                }
                write!(f, "Attribute(\"{}\").Contains({})", attr.name, substring)
            }
            Expr::Contains { subject, substring } => {
                write!(f, "{}.Contains({})", subject, substring)
            }
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::Path(p) => write!(f, "{}", p),
            Expr::Captured { name, .. } => f.write_str(name),
            Expr::Call { function, .. } => write!(f, "{}()", function),
            Expr::Member { object, field } => write!(f, "{}.{}", object, field),
            Expr::Convert { to, operand } => write!(f, "{}({})", to, operand),
        }
    }
}

/// Write `((a && b) && c)` walking the left spine without recursing on it
fn write_chain(expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut rights = Vec::new();
    let mut node = expr;
    loop {
        let (op, left, right) = match node {
            Expr::And(left, right) => ("&&", left, right),
            Expr::Or(left, right) => ("||", left, right),
            _ => break,
        };
        rights.push((op, &**right));
        node = &**left;
    }
    for _ in 0..rights.len() {
        f.write_str("(")?;
    }
    write!(f, "{}", node)?;
    for (op, right) in rights.iter().rev() {
        write!(f, " {} {})", op, right)?;
    }
    Ok(())
}
