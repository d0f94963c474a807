//! Goals and rule heads are types, and types are terms: a named
//! constructor applied to an ordered list of argument terms.  Rule
//! patterns may also mention type variables, which act as the logic
//! variables of a Horn clause; goals never do.
//!
//! Terms are immutable and share their argument slices, so that
//! instantiating a pattern against a deep goal (e.g., the nested pair
//! encoding of a wide record) only allocates the spine that changes.
mod path;
mod type_term;
mod type_var;

pub use path::TermPath;
pub use type_term::Constructor;
pub use type_term::TypeTerm;
pub use type_var::TypeVar;
