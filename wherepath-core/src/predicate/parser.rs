//! Textual predicate parser
//!
//! Reads predicates written the way a lambda body would be:
//!
//! ```text
//! e => e.TargetElementName == "td" && e.Parent.Attribute("class").Contains(cls) && e.Position == 5
//! ```
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! predicate  := (IDENT "=>")? or
//! or         := and ("||" and)*
//! and        := unary ("&&" unary)*
//! unary      := "!" unary | comparison
//! comparison := operand ("==" operand)?
//! operand    := "(" or ")" | STRING | INT | "true" | "false"
//!             | ("int" | "string" | "bool") "(" or ")"
//!             | vocabulary
//!             | IDENT "(" ")"                  bound function, called here
//!             | IDENT ("." IDENT)*             bound variable and field access
//! ```
//!
//! Identifiers are looked up in [`Bindings`] while parsing, so the tree that
//! comes out only holds concrete values. `&&` is left-associative, giving
//! the `((a && b) && c)` shape the walker expects.

use super::{AttributeRef, Expr, LiteralKind, Member, Owner, Path};
use crate::error::WherepathError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?P<string>"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')|(?P<int>-?[0-9]+)|(?P<punct>&&|\|\||==|=>|[!().,])|(?P<ident>[A-Za-z_][A-Za-z0-9_]*))"#,
    )
    .unwrap()
});

/// Deepest nesting of parentheses, negations and call arguments accepted
const MAX_DEPTH: usize = 256;

/// Words that start a vocabulary path
const VOCABULARY_HEADS: &[&str] = &[
    "TargetElementName",
    "Position",
    "Text",
    "Attribute",
    "Parent",
    "FollowingSibling",
    "PrecedingSibling",
    "Descendant",
    "Ancestor",
];

/// Values and zero-argument functions visible to a predicate
#[derive(Default)]
pub struct Bindings {
    values: HashMap<String, Value>,
    functions: HashMap<String, Box<dyn Fn() -> Value>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Bind a zero-argument function.
    ///
    /// The function is called once per occurrence, in source order, while
    /// the predicate is parsed. Functions with side effects see no other
    /// ordering guarantee.
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("values", &self.values)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Int(i64),
    Ident(String),
    AndAnd,
    OrOr,
    EqEq,
    Arrow,
    Bang,
    LeftParen,
    RightParen,
    Dot,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Int(i) => write!(f, "{}", i),
            Token::Ident(name) => f.write_str(name),
            Token::AndAnd => f.write_str("&&"),
            Token::OrOr => f.write_str("||"),
            Token::EqEq => f.write_str("=="),
            Token::Arrow => f.write_str("=>"),
            Token::Bang => f.write_str("!"),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
        }
    }
}

fn parse_error(message: impl Into<String>, position: usize) -> WherepathError {
    WherepathError::Parse { message: message.into(), position }
}

/// Split predicate text into tokens with their byte offsets
fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, WherepathError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    loop {
        let rest = &source[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            break;
        }

        let caps = TOKEN_RE.captures(trimmed).ok_or_else(|| {
            let c = trimmed.chars().next().unwrap_or_default();
            parse_error(format!("unexpected character '{}'", c), pos)
        })?;

        let token = if let Some(m) = caps.name("string") {
            Token::Str(unescape(m.as_str()))
        } else if let Some(m) = caps.name("int") {
            let value = m
                .as_str()
                .parse::<i64>()
                .map_err(|_| parse_error(format!("integer out of range: {}", m.as_str()), pos))?;
            Token::Int(value)
        } else if let Some(m) = caps.name("ident") {
            Token::Ident(m.as_str().to_string())
        } else {
            match &caps["punct"] {
                "&&" => Token::AndAnd,
                "||" => Token::OrOr,
                "==" => Token::EqEq,
                "=>" => Token::Arrow,
                "!" => Token::Bang,
                "(" => Token::LeftParen,
                ")" => Token::RightParen,
                "." => Token::Dot,
                _ => Token::Comma,
            }
        };

        tokens.push((token, pos));
        pos += caps[0].len();
    }

    Ok(tokens)
}

/// Drop the surrounding quotes; a backslash keeps the next character as-is
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse predicate text into a tree, resolving identifiers through `bindings`
pub fn parse(source: &str, bindings: &Bindings) -> Result<Expr, WherepathError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(parse_error("empty predicate", 0));
    }

    let mut parser = Parser { tokens, pos: 0, end: source.len(), depth: 0, bindings, parameter: None };

    let parameter = match (parser.peek(), parser.peek_at(1)) {
        (Some(Token::Ident(name)), Some(Token::Arrow)) => Some(name.clone()),
        _ => None,
    };
    if parameter.is_some() {
        parser.parameter = parameter;
        parser.pos = 2;
    }

    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(format!("unexpected token '{}' after predicate", token)));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
    depth: usize,
    bindings: &'a Bindings,
    /// Lambda parameter name, accepted as a receiver prefix
    parameter: Option<String>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, offset)| *offset)
    }

    fn error(&self, message: impl Into<String>) -> WherepathError {
        parse_error(message, self.offset())
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), WherepathError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            let found = self.peek().map_or("end of input".to_string(), |t| format!("'{}'", t));
            Err(self.error(format!("expected '{}', found {}", expected, found)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, WherepathError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, WherepathError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, WherepathError> {
        let mut left = self.parse_unary()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    /// Every nesting level passes through here
    fn parse_unary(&mut self) -> Result<Expr, WherepathError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error("predicate nested too deeply"));
        }
        self.depth += 1;
        let expr = self.parse_negation();
        self.depth -= 1;
        expr
    }

    fn parse_negation(&mut self) -> Result<Expr, WherepathError> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        let left = self.parse_operand()?;
        if self.eat(&Token::EqEq) {
            let right = self.parse_operand()?;
            return Ok(Expr::Eq(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<Expr, WherepathError> {
        let start = self.offset();
        match self.advance() {
            Some(Token::LeftParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Some(Token::Str(s)) => Ok(Expr::from(s.as_str())),
            Some(Token::Int(i)) => Ok(Expr::from(i)),
            Some(Token::Ident(name)) => self.parse_identifier(name, start),
            Some(token) => Err(parse_error(format!("unexpected token '{}'", token), start)),
            None => Err(parse_error("unexpected end of input", start)),
        }
    }

    fn parse_identifier(&mut self, name: String, start: usize) -> Result<Expr, WherepathError> {
        if self.parameter.as_deref() == Some(name.as_str()) {
            self.expect(Token::Dot)?;
            let head = self.expect_ident()?;
            if !VOCABULARY_HEADS.contains(&head.as_str()) {
                return Err(parse_error(format!("unknown vocabulary member '{}'", head), start));
            }
            return self.parse_vocabulary(&head);
        }

        match name.as_str() {
            "true" => return Ok(Expr::Literal(true.into())),
            "false" => return Ok(Expr::Literal(false.into())),
            _ => {}
        }

        if VOCABULARY_HEADS.contains(&name.as_str()) {
            return self.parse_vocabulary(&name);
        }

        if self.eat(&Token::LeftParen) {
            if let Ok(to) = name.parse::<LiteralKind>() {
                let operand = self.parse_or()?;
                self.expect(Token::RightParen)?;
                return Ok(Expr::Convert { to, operand: Box::new(operand) });
            }
            self.expect(Token::RightParen)?;
            let function = self
                .bindings
                .functions
                .get(&name)
                .ok_or_else(|| WherepathError::UnboundVariable(format!("{}()", name)))?;
            let result = function();
            return self.parse_fields(Expr::Call { function: name, result });
        }

        let value = self.bindings.value(&name).cloned().ok_or_else(|| {
            log::debug!("unbound identifier '{}' at {}", name, start);
            WherepathError::UnboundVariable(name.clone())
        })?;
        self.parse_fields(Expr::Captured { name, value })
    }

    /// Field accesses on a caller value: `row.cell.index`
    fn parse_fields(&mut self, mut object: Expr) -> Result<Expr, WherepathError> {
        while self.eat(&Token::Dot) {
            let field = self.expect_ident()?;
            object = Expr::Member { object: Box::new(object), field };
        }
        Ok(object)
    }

    fn parse_vocabulary(&mut self, head: &str) -> Result<Expr, WherepathError> {
        match head {
            "Attribute" => return self.parse_attribute(Owner::Target),
            "Text" => return self.parse_text(Owner::Target),
            "TargetElementName" | "Position" => {
                return head
                    .parse::<Member>()
                    .map(Expr::from)
                    .map_err(|_| self.error(format!("unknown vocabulary member '{}'", head)));
            }
            _ => {}
        }

        self.expect(Token::Dot)?;
        let field = self.expect_ident()?;
        match (head, field.as_str()) {
            ("Parent", "Attribute") => self.parse_attribute(Owner::Parent),
            ("Parent", "Text") => self.parse_text(Owner::Parent),
            _ => format!("{}.{}", head, field)
                .parse::<Member>()
                .map(Expr::from)
                .map_err(|_| self.error(format!("unknown vocabulary member '{}.{}'", head, field))),
        }
    }

    /// `Attribute("name")` followed by `.Text` or `.Contains(x)`
    fn parse_attribute(&mut self, owner: Owner) -> Result<Expr, WherepathError> {
        self.expect(Token::LeftParen)?;
        let name = match self.advance() {
            Some(Token::Str(name)) => name,
            Some(Token::Ident(var)) => match self.bindings.value(&var) {
                Some(Value::String(name)) => name.clone(),
                Some(_) => return Err(self.error(format!("attribute name '{}' is not a string", var))),
                None => return Err(WherepathError::UnboundVariable(var)),
            },
            _ => return Err(self.error("expected attribute name")),
        };
        self.expect(Token::RightParen)?;

        let attribute = AttributeRef { owner, name };
        self.expect(Token::Dot)?;
        let member = self.expect_ident()?;
        match member.as_str() {
            "Text" => Ok(Expr::Path(Path::AttributeText(attribute))),
            "Contains" => {
                let substring = self.parse_call_argument()?;
                Ok(Expr::contains(Path::AttributeText(attribute), substring))
            }
            _ => Err(self.error(format!("unknown attribute member '{}'", member))),
        }
    }

    /// `Text` optionally followed by `.Contains(x)`
    fn parse_text(&mut self, owner: Owner) -> Result<Expr, WherepathError> {
        let member = match owner {
            Owner::Target => Member::Text,
            Owner::Parent => Member::ParentText,
        };
        if self.peek() == Some(&Token::Dot)
            && self.peek_at(1) == Some(&Token::Ident("Contains".to_string()))
        {
            self.pos += 2;
            let substring = self.parse_call_argument()?;
            return Ok(Expr::contains(Path::Member(member), substring));
        }
        Ok(Expr::from(member))
    }

    fn parse_call_argument(&mut self) -> Result<Expr, WherepathError> {
        self.expect(Token::LeftParen)?;
        let argument = self.parse_or()?;
        if self.peek() == Some(&Token::Comma) {
            return Err(self.error("Contains takes a single argument"));
        }
        self.expect(Token::RightParen)?;
        Ok(argument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_plain(source: &str) -> Expr {
        parse(source, &Bindings::new()).unwrap()
    }

    #[test]
    fn test_tokenize() {
        let tokens: Vec<Token> = tokenize(r#"Attribute("a\"b").Text == 'x' && !y"#)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("Attribute".into()),
                Token::LeftParen,
                Token::Str("a\"b".into()),
                Token::RightParen,
                Token::Dot,
                Token::Ident("Text".into()),
                Token::EqEq,
                Token::Str("x".into()),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn test_and_is_left_nested() {
        let expr = parse_plain(r#"TargetElementName == "td" && Position == 5 && Parent.Name == "tr""#);
        let expected = Expr::all([
            Expr::equals(Member::TargetElementName, "td"),
            Expr::equals(Member::Position, 5),
            Expr::equals(Member::ParentName, "tr"),
        ])
        .unwrap();
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_lambda_header_and_receiver() {
        let expr = parse_plain(r#"e => e.Parent.Attribute("class").Contains("row") && e.Descendant.Name == "b""#);
        assert_eq!(
            expr,
            Expr::contains(Path::AttributeText(AttributeRef::parent("class")), "row")
                .and(Expr::equals(Member::DescendantName, "b"))
        );
    }

    #[test]
    fn test_text_members() {
        assert_eq!(parse_plain(r#"Text == "x""#), Expr::equals(Member::Text, "x"));
        assert_eq!(
            parse_plain(r#"Parent.Text.Contains("x")"#),
            Expr::contains(Path::Member(Member::ParentText), "x")
        );
    }

    #[test]
    fn test_variables_functions_and_fields() {
        let bindings = Bindings::new()
            .with_value("position", 5)
            .with_value("row", json!({"index": 2}))
            .with_value("attr", "class")
            .with_function("GetPosition", || json!(4));

        let expr = parse("Position == position", &bindings).unwrap();
        assert_eq!(expr, Expr::equals(Member::Position, Expr::captured("position", 5)));

        let expr = parse("Position == GetPosition()", &bindings).unwrap();
        assert_eq!(expr, Expr::equals(Member::Position, Expr::call("GetPosition", 4)));

        let expr = parse("Parent.Position == row.index", &bindings).unwrap();
        assert_eq!(
            expr,
            Expr::equals(
                Member::ParentPosition,
                Expr::Member { object: Box::new(Expr::captured("row", json!({"index": 2}))), field: "index".into() }
            )
        );

        let expr = parse(r#"Attribute(attr).Text == "c""#, &bindings).unwrap();
        assert_eq!(expr, Expr::equals(Path::AttributeText(AttributeRef::target("class")), "c"));
    }

    #[test]
    fn test_conversion() {
        let bindings = Bindings::new().with_value("p", "3");
        let expr = parse("Position == int(p)", &bindings).unwrap();
        assert_eq!(
            expr,
            Expr::equals(
                Member::Position,
                Expr::Convert { to: LiteralKind::Int, operand: Box::new(Expr::captured("p", "3")) }
            )
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("Position == missing", &Bindings::new()),
            Err(WherepathError::UnboundVariable(name)) if name == "missing"
        ));
        assert!(matches!(
            parse("Position == 5 $", &Bindings::new()),
            Err(WherepathError::Parse { position: 14, .. })
        ));
        assert!(matches!(
            parse("Parent.Color == 1", &Bindings::new()),
            Err(WherepathError::Parse { .. })
        ));
        assert!(matches!(parse("   ", &Bindings::new()), Err(WherepathError::Parse { position: 0, .. })));
        assert!(matches!(
            parse("(Position == 5", &Bindings::new()),
            Err(WherepathError::Parse { position: 14, .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!("{}TargetElementName == \"td\"{}", "(".repeat(depth), ")".repeat(depth))
        };
        assert_eq!(parse_plain(&nested(200)), Expr::equals(Member::TargetElementName, "td"));

        let err = parse(&nested(20_000), &Bindings::new()).unwrap_err();
        assert!(matches!(
            err,
            WherepathError::Parse { ref message, position: 256 } if message == "predicate nested too deeply"
        ));

        let negations = format!("{}Position == 1", "!".repeat(20_000));
        assert!(matches!(parse(&negations, &Bindings::new()), Err(WherepathError::Parse { .. })));
    }

    #[test]
    fn test_long_conjunction_chain() {
        let source = vec!["Position == 1"; 100_000].join(" && ");
        let expr = parse_plain(&source);
        assert!(matches!(expr, Expr::And(..)));
        drop(expr);
    }
}
