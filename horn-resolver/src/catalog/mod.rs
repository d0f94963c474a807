//! The rule catalog is the clause database: every rule a session may
//! use, with its head pattern, ordered body requirements, and
//! invocation handle.
//!
//! Rules come from providers (named groups of rules, e.g., a pickler
//! or a pretty-printer), and are registered explicitly through a
//! `CatalogBuilder`.  The catalog is validated once when built and is
//! immutable afterwards, so sessions on different threads may share
//! it freely.
//!
//! Candidate lookup is indexed on the head constructor: resolving
//! `Pair<Int, Int>` only looks at rules whose head is some `Pair<..>`.
mod builder;
mod provider;
mod rule;

pub use builder::CatalogBuilder;
pub use builder::RuleCatalog;
pub use provider::RuleProvider;
pub use provider::RuleSet;
pub use rule::Invoke;
pub use rule::Requirement;
pub use rule::Rule;
pub use rule::RuleId;
pub use rule::RuleSpec;
