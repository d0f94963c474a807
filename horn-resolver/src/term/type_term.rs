use super::TypeVar;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A type constructor is identified by its name alone: `Int`, `Pair`,
/// `List`.  Its arity is tracked by the catalog, which rejects rules
/// that use the same constructor with different arities.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Constructor(Arc<str>);

impl Constructor {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Constructor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `TypeTerm` is either a type variable (only in rule patterns), or
/// a constructor applied to zero or more argument terms.
///
/// Equality, ordering and hashing are structural, which makes ground
/// terms usable as cache keys directly.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TypeTerm {
    Var(TypeVar),
    App(Constructor, Arc<[TypeTerm]>),
}

impl TypeTerm {
    /// Returns the nullary application of `name`, e.g., `Int`.
    #[must_use]
    pub fn con(name: &str) -> Self {
        Self::App(Constructor::new(name), Vec::<TypeTerm>::new().into())
    }

    /// Returns `name<args...>`.
    #[must_use]
    pub fn app<I: IntoIterator<Item = TypeTerm>>(name: &str, args: I) -> Self {
        Self::App(Constructor::new(name), args.into_iter().collect())
    }

    /// Returns the pattern term for `var`.
    #[must_use]
    pub fn var(var: &TypeVar) -> Self {
        Self::Var(var.clone())
    }

    /// Returns the head constructor, or `None` for a variable.
    #[must_use]
    pub fn constructor(&self) -> Option<&Constructor> {
        match self {
            TypeTerm::App(ctor, _) => Some(ctor),
            TypeTerm::Var(_) => None,
        }
    }

    /// Returns the argument terms; variables have none.
    #[must_use]
    pub fn args(&self) -> &[TypeTerm] {
        match self {
            TypeTerm::App(_, args) => args,
            TypeTerm::Var(_) => &[],
        }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.args().len()
    }

    #[must_use]
    pub fn is_var(&self) -> bool {
        matches!(self, TypeTerm::Var(_))
    }

    /// A term is ground when no type variable occurs anywhere in it.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            TypeTerm::Var(_) => false,
            TypeTerm::App(_, args) => args.iter().all(TypeTerm::is_ground),
        }
    }

    /// Inserts all `TypeVar`s in the term into `dst`.
    #[must_use]
    pub fn insert_vars(&self, mut dst: BTreeSet<TypeVar>) -> BTreeSet<TypeVar> {
        match self {
            TypeTerm::Var(var) => {
                dst.insert(var.clone());
                dst
            }
            TypeTerm::App(_, args) => args.iter().fold(dst, |acc, arg| arg.insert_vars(acc)),
        }
    }

    #[must_use]
    pub fn vars(&self) -> BTreeSet<TypeVar> {
        self.insert_vars(BTreeSet::new())
    }

    /// Nesting depth: constructors without arguments and variables
    /// have depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.args().iter().map(TypeTerm::depth).max().unwrap_or(0)
    }

    /// Returns true iff this (ground) term unifies with `pattern`.
    #[must_use]
    pub fn matches(&self, pattern: &TypeTerm) -> bool {
        crate::unification::unify(self, pattern).is_ok()
    }

    /// Calls `visit` on every constructor application in the term,
    /// outermost first.
    pub(crate) fn for_each_app<F: FnMut(&Constructor, usize)>(&self, visit: &mut F) {
        if let TypeTerm::App(ctor, args) = self {
            visit(ctor, args.len());
            for arg in args.iter() {
                arg.for_each_app(visit);
            }
        }
    }
}

impl From<TypeVar> for TypeTerm {
    fn from(var: TypeVar) -> Self {
        TypeTerm::Var(var)
    }
}

impl std::fmt::Display for TypeTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeTerm::Var(var) => write!(f, "{}", var),
            TypeTerm::App(ctor, args) => {
                write!(f, "{}", ctor)?;
                if args.is_empty() {
                    return Ok(());
                }

                f.write_str("<")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
        }
    }
}

#[test]
fn test_display() {
    let a = TypeVar::new("a");
    let term = TypeTerm::app(
        "Pair",
        vec![TypeTerm::con("Int"), TypeTerm::app("List", vec![a.term()])],
    );

    assert_eq!(term.to_string(), "Pair<Int, List<a>>");
    assert_eq!(TypeTerm::con("Unit").to_string(), "Unit");
}

#[test]
fn test_ground_and_vars() {
    let a = TypeVar::new("a");
    let b = TypeVar::new("b");
    let ground = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Int")]);
    let open = TypeTerm::app("Pair", vec![a.term(), TypeTerm::app("List", vec![b.term()])]);

    assert!(ground.is_ground());
    assert!(!open.is_ground());
    assert!(ground.vars().is_empty());
    assert_eq!(open.vars().into_iter().collect::<Vec<_>>(), vec![a, b]);
}

#[test]
fn test_structural_equality() {
    let x = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Int")]);
    let y = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Int")]);
    let z = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Bool")]);

    assert_eq!(x, y);
    assert_ne!(x, z);
    assert_ne!(TypeTerm::con("Pair"), x);
}

#[test]
fn test_depth() {
    // A five field record nests four pairs deep.
    let int = TypeTerm::con("Int");
    let mut record = int.clone();
    for _ in 0..4 {
        record = TypeTerm::app("Pair", vec![int.clone(), record]);
    }

    assert_eq!(int.depth(), 1);
    assert_eq!(record.depth(), 5);
    assert_eq!(record.arity(), 2);
}
