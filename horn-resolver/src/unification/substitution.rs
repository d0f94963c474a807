//! A substitution maps a rule's type parameters to the ground terms
//! they were bound to when the rule head matched a goal.
use crate::term::{TypeTerm, TypeVar};
use std::collections::BTreeMap;

/// Bindings from `TypeVar` to `TypeTerm`.  We use an ordered map
/// because substitutions show up in diagnostics, and we want those to
/// be reproducible.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Substitution {
    bindings: BTreeMap<TypeVar, TypeTerm>,
}

/// `apply` found a variable without binding.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("type variable `{0}` is not bound")]
pub struct UnboundVariable(pub TypeVar);

impl Substitution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, var: &TypeVar) -> Option<&TypeTerm> {
        self.bindings.get(var)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeVar, &TypeTerm)> {
        self.bindings.iter()
    }

    /// Returns true iff every variable in `vars` has a binding.
    #[must_use]
    pub fn is_total_over<'a, I>(&self, vars: I) -> bool
    where
        I: IntoIterator<Item = &'a TypeVar>,
    {
        vars.into_iter().all(|var| self.bindings.contains_key(var))
    }

    /// Binds `var` to `term`, unless `var` is already bound.  Returns
    /// the previous binding when it differs from `term`.
    pub(crate) fn bind(&mut self, var: &TypeVar, term: &TypeTerm) -> Result<(), TypeTerm> {
        match self.bindings.get(var) {
            Some(prev) if prev == term => Ok(()),
            Some(prev) => Err(prev.clone()),
            None => {
                self.bindings.insert(var.clone(), term.clone());
                Ok(())
            }
        }
    }

    /// Instantiates `pattern` with this substitution.  Sub-terms
    /// without variables are shared with `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when `pattern` mentions a variable without
    /// binding.
    pub fn apply(&self, pattern: &TypeTerm) -> Result<TypeTerm, UnboundVariable> {
        match pattern {
            TypeTerm::Var(var) => self
                .bindings
                .get(var)
                .cloned()
                .ok_or_else(|| UnboundVariable(var.clone())),
            TypeTerm::App(_, args) if args.iter().all(TypeTerm::is_ground) => Ok(pattern.clone()),
            TypeTerm::App(ctor, args) => {
                let instantiated = args
                    .iter()
                    .map(|arg| self.apply(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeTerm::App(ctor.clone(), instantiated.into()))
            }
        }
    }
}

impl std::fmt::Display for Substitution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (index, (var, term)) in self.bindings.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} := {}", var, term)?;
        }
        f.write_str("}")
    }
}

#[test]
fn test_apply() {
    let a = TypeVar::new("a");
    let mut subst = Substitution::new();
    subst.bind(&a, &TypeTerm::con("Int")).expect("ok");

    let pattern = TypeTerm::app("List", vec![TypeTerm::app("Pair", vec![a.term(), a.term()])]);
    let applied = subst.apply(&pattern).expect("ok");

    assert_eq!(applied.to_string(), "List<Pair<Int, Int>>");
    assert!(applied.is_ground());
}

#[test]
fn test_apply_unbound() {
    let a = TypeVar::new("a");
    let b = TypeVar::new("b");
    let mut subst = Substitution::new();
    subst.bind(&a, &TypeTerm::con("Int")).expect("ok");

    let pattern = TypeTerm::app("Pair", vec![a.term(), b.term()]);
    assert_eq!(subst.apply(&pattern), Err(UnboundVariable(b.clone())));
    assert!(subst.is_total_over(&[a.clone()]));
    assert!(!subst.is_total_over(&[a, b]));
}

#[test]
fn test_bind_conflict() {
    let a = TypeVar::new("a");
    let mut subst = Substitution::new();

    subst.bind(&a, &TypeTerm::con("Int")).expect("ok");
    subst.bind(&a, &TypeTerm::con("Int")).expect("same binding");
    assert_eq!(
        subst.bind(&a, &TypeTerm::con("Bool")),
        Err(TypeTerm::con("Int"))
    );
    assert_eq!(subst.len(), 1);
}
