//! Conjunction walking
//!
//! Predicates are left-nested AND-chains: `((a && b) && c)`. The walker
//! handles the right-hand conjunct of each `And` node before descending
//! into its left side, so the leftmost condition is processed last.
//! Siblings and relatives keep that visitation order in the model.

use crate::classify::{classify, Leaf};
use crate::error::WherepathError;
use crate::model::TargetElement;
use crate::predicate::Expr;
use crate::resolve::resolve;
use log::{debug, trace};

/// Walk an AND-chain, writing every recognised conjunct into `target`.
///
/// Conjuncts that cannot be classified are skipped, or reported as
/// [`WherepathError::UnsupportedPredicate`] when `strict` is set.
pub fn walk(expr: &Expr, target: &mut TargetElement, strict: bool) -> Result<(), WherepathError> {
    // Right sides are pushed last so they pop first; a right-hand group
    // such as `a && (b && c)` is unfolded the same way.
    let mut pending = vec![expr];
    while let Some(node) = pending.pop() {
        match node {
            Expr::And(left, right) => {
                pending.push(&**left);
                pending.push(&**right);
            }
            conjunct => {
                trace!("visiting `{}` ({} pending)", conjunct, pending.len());
                visit(conjunct, target, strict)?;
            }
        }
    }
    Ok(())
}

/// Resolve and classify one conjunct
fn visit(conjunct: &Expr, target: &mut TargetElement, strict: bool) -> Result<(), WherepathError> {
    let condition = match resolve(conjunct)?.and_then(Leaf::from_operand) {
        Some(leaf) => classify(&leaf)?,
        None => None,
    };

    match condition {
        Some(condition) => condition.apply(target),
        None if strict => return Err(WherepathError::UnsupportedPredicate(conjunct.to_string())),
        None => debug!("skipping unrecognised condition `{}`", conjunct),
    }
    Ok(())
}
