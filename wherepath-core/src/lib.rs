//! wherepath-core: compile element predicates to XPath
//!
//! This library provides:
//! - A typed predicate tree over a small element vocabulary
//! - A textual predicate parser with caller-supplied bindings
//! - Classification of AND-chained conditions into a flat query model
//! - XPath location-path rendering of that model
//!
//! ```
//! use wherepath_core::{translate, Expr, Member};
//!
//! let predicate = Expr::equals(Member::TargetElementName, "td")
//!     .and(Expr::equals(Member::Position, 5));
//! assert_eq!(translate(&predicate).unwrap(), "//td[position()=5]");
//! ```

pub mod classify;
pub mod error;
pub mod model;
pub mod predicate;
pub mod render;
pub mod resolve;
pub mod translate;
pub mod walker;

pub use classify::{classify, clean_literal, Condition, Leaf};
pub use error::WherepathError;
pub use model::{Attribute, AttributeSet, MatchKind, Parent, Relative, Sibling, TargetElement, TextConstraint};
pub use predicate::{parse, AttributeRef, Bindings, Expr, Literal, LiteralKind, Member, Owner, Path};
pub use render::render;
pub use resolve::{resolve, Operand};
pub use translate::{translate, Translator};
pub use walker::walk;
