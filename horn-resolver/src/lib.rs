//! Type-directed rule resolution.
//!
//! Rules are generic constructor functions read as Horn clauses: a
//! rule with head `Pair<a, b>` and body `a, b` says that a `Pair<a, b>`
//! can be built from an `a` and a `b`.  Given a goal type, a
//! `Resolver` searches for the (unique) composition of rules that
//! produces it, and compiles that proof into a `Factory`.
//!
//! ```
//! use horn_resolver::{value, CatalogBuilder, Resolver, RuleSpec, TypeTerm, TypeVar};
//! use std::sync::Arc;
//!
//! let a = TypeVar::new("a");
//! let catalog = CatalogBuilder::new()
//!     .rule("core", RuleSpec::new("int", TypeTerm::con("Int"), |_| Ok(value(1i64))))
//!     .rule(
//!         "core",
//!         RuleSpec::new("list", TypeTerm::app("List", vec![a.term()]), |inputs| {
//!             let item = inputs.get::<i64>(0)?;
//!             Ok(value(vec![*item; 3]))
//!         })
//!         .requires(a.term()),
//!     )
//!     .build()
//!     .expect("catalog");
//!
//! let resolver = Resolver::new(Arc::new(catalog));
//! let goal = TypeTerm::app("List", vec![TypeTerm::con("Int")]);
//! let list = resolver.resolve_as::<Vec<i64>>(&goal).expect("resolves");
//! assert_eq!(*list, vec![1, 1, 1]);
//! ```
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod resolution;
pub mod term;
pub mod unification;
pub mod value;

pub use catalog::{CatalogBuilder, Requirement, RuleCatalog, RuleProvider, RuleSet, RuleSpec};
pub use config::{ResolverConfig, TieBreak};
pub use diagnostics::{CatalogError, Diagnostic, ResolveError};
pub use resolution::{CacheStats, DerivationStatus, Factory, Resolver};
pub use term::{Constructor, TypeTerm, TypeVar};
pub use value::{value, Deferred, Input, Inputs, InvocationError, Value};
