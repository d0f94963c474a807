//! Resolution never needs full unification: goals are always ground,
//! and a rule head's variables are scoped to one instantiation of
//! that rule.  Unifying a goal against a head is thus one-way
//! matching, which yields a substitution for the rule's parameters;
//! applying that substitution to the rule's body patterns yields the
//! (again ground) sub-goals.
//!
//! Matching is also how the optional specificity tie-break compares
//! two rule heads: one head is at least as specific as another when
//! it is an instance of it.
mod substitution;
mod unify;

pub use substitution::Substitution;
pub use substitution::UnboundVariable;
pub use unify::is_instance_of;
pub use unify::unify;
pub use unify::Mismatch;
pub use unify::MismatchKind;
