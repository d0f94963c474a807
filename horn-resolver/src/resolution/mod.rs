//! Goal-directed proof search.
//!
//! Given a ground goal, the engine looks up the rules whose head
//! constructor matches, unifies the goal with each head, and resolves
//! the instantiated body requirements as sub-goals, depth first.  A
//! goal commits to a rule only if exactly one candidate produces a
//! full proof; zero or several proofs are errors.  Every outcome is
//! cached for the rest of the session.
//!
//! A successful proof compiles to a `Factory`.  Invoking the factory
//! runs the rules of the proof bottom-up, with no further search.
//!
//! Cycles are legal only through deferrable requirements: a rule that
//! accepts a `Deferred` handle for a goal that is still being resolved
//! gets a back reference, which the factory ties to the goal's own
//! value when it runs.  A strict requirement on a goal in progress is
//! a `CyclicRule` error.
mod cache;
mod engine;
mod factory;
mod session;

pub use cache::CacheStats;
pub use cache::DerivationStatus;
pub use factory::Factory;
pub use session::Resolver;
