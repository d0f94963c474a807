use super::TypeTerm;
use std::sync::Arc;

/// A type variable is a rule's type parameter, e.g., the `a` in
/// `Pair<a, b>`.
///
/// Type variables are uniquely identified by their sequence id; the
/// name itself is only useful for pretty-printing.
///
/// The implicit order on type variables sorts by sequence id
/// (ascending), so variables created while writing down a rule sort
/// in the order they were introduced.
#[derive(Clone, Debug, Eq)]
pub struct TypeVar {
    sequence: usize,
    name: Arc<str>,
}

impl TypeVar {
    /// Returns a new `TypeVar` with `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        fn id() -> usize {
            use std::sync::atomic::{AtomicUsize, Ordering};
            static TYPE_VAR_COUNTER: AtomicUsize = AtomicUsize::new(0);

            TYPE_VAR_COUNTER.fetch_add(1, Ordering::Relaxed)
        }

        Self {
            sequence: id(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pattern term that stands for this variable.
    #[must_use]
    pub fn term(&self) -> TypeTerm {
        TypeTerm::Var(self.clone())
    }
}

impl std::hash::Hash for TypeVar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sequence.hash(state);
    }
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl PartialOrd for TypeVar {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeVar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

impl std::fmt::Display for TypeVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[test]
fn test_order() {
    let first = TypeVar::new("zxc");
    let second = TypeVar::new("asd");

    assert!(first < second);
    assert_ne!(first, second);
}

#[test]
fn test_same_name_distinct() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    let a0 = TypeVar::new("a");
    let a0_clone = a0.clone();
    // a0 and a1 should be distinct, despite their name.
    let a1 = TypeVar::new("a");

    assert_eq!(a0, a0_clone);
    assert_ne!(a0, a1);
    assert_eq!(a1.to_string(), "a");

    let mut h0 = DefaultHasher::new();
    let mut h0_clone = DefaultHasher::new();
    a0.hash(&mut h0);
    a0_clone.hash(&mut h0_clone);
    assert_eq!(h0.finish(), h0_clone.finish());
}
