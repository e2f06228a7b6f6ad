//! Predicate to XPath translation

use crate::error::WherepathError;
use crate::model::TargetElement;
use crate::predicate::{parse, Bindings, Expr};
use crate::render::render;
use crate::walker::walk;
use log::debug;

/// Translates predicates to XPath.
///
/// By default conditions that match no rule are skipped silently. Strict
/// mode reports them as [`WherepathError::UnsupportedPredicate`] instead.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    strict: bool,
}

impl Translator {
    /// Create a translator with the permissive default
    pub fn new() -> Self {
        Translator { strict: false }
    }

    /// Reject conditions no rule recognises
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Build the query model for a predicate without rendering it
    pub fn build_model(&self, predicate: &Expr) -> Result<TargetElement, WherepathError> {
        let mut target = TargetElement::new();
        walk(predicate, &mut target, self.strict)?;
        Ok(target)
    }

    /// Translate a predicate tree to XPath
    pub fn translate(&self, predicate: &Expr) -> Result<String, WherepathError> {
        let xpath = render(&self.build_model(predicate)?);
        debug!("`{}` => {}", predicate, xpath);
        Ok(xpath)
    }

    /// Parse predicate text, binding identifiers from `bindings`, and translate it
    pub fn translate_str(&self, source: &str, bindings: &Bindings) -> Result<String, WherepathError> {
        self.translate(&parse(source, bindings)?)
    }

    /// Translate a predicate tree given as JSON
    pub fn translate_json(&self, json: &str) -> Result<String, WherepathError> {
        let predicate: Expr = serde_json::from_str(json)?;
        self.translate(&predicate)
    }
}

/// Translate a predicate tree with the default options
pub fn translate(predicate: &Expr) -> Result<String, WherepathError> {
    Translator::new().translate(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Member;

    #[test]
    fn test_translate_default_is_permissive() {
        let expr = Expr::equals(Member::TargetElementName, "td")
            .and(Expr::Or(Box::new(Expr::from("a")), Box::new(Expr::from("b"))));
        assert_eq!(translate(&expr).unwrap(), "//td");
        assert!(Translator::new().with_strict(true).translate(&expr).is_err());
    }

    #[test]
    fn test_build_model_exposes_slots() {
        let expr = Expr::equals(Member::TargetElementName, "td").and(Expr::equals(Member::ParentName, "tr"));
        let model = Translator::new().build_model(&expr).unwrap();
        assert_eq!(model.name.as_deref(), Some("td"));
        assert_eq!(model.parent.and_then(|p| p.name).as_deref(), Some("tr"));
    }

    #[test]
    fn test_translate_json() {
        let json = r#"{"and": [
            {"eq": [{"path": {"member": "TargetElementName"}}, {"literal": "li"}]},
            {"eq": [{"path": {"member": "Position"}}, {"call": {"function": "GetPosition", "result": 3}}]}
        ]}"#;
        assert_eq!(Translator::new().translate_json(json).unwrap(), "//li[position()=3]");
        assert!(matches!(
            Translator::new().translate_json("{"),
            Err(WherepathError::Json(_))
        ));
    }
}
