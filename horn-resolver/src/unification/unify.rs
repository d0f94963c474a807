use super::Substitution;
use crate::term::{Constructor, TermPath, TypeTerm, TypeVar};

/// Why a goal failed to match a rule head, and where.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind} at {path}")]
pub struct Mismatch {
    pub path: TermPath,
    pub kind: MismatchKind,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MismatchKind {
    #[error("expected constructor `{expected}`, found `{found}`")]
    Constructor {
        expected: Constructor,
        found: Constructor,
    },
    #[error("`{constructor}` expects {expected} argument(s), found {found}")]
    Arity {
        constructor: Constructor,
        expected: usize,
        found: usize,
    },
    #[error("`{var}` is already bound to `{bound}`, cannot also bind `{found}`")]
    Conflict {
        var: TypeVar,
        bound: TypeTerm,
        found: TypeTerm,
    },
    #[error("pattern expects `{expected}`, found a type variable")]
    Rigid { expected: Constructor },
    #[error("goal is not ground")]
    NonGroundGoal,
}

/// Matches the ground `goal` against `pattern`, and returns the
/// bindings for `pattern`'s variables.
///
/// # Errors
///
/// Returns the first `Mismatch` found in a top-down, left-to-right
/// walk, or `MismatchKind::NonGroundGoal` if `goal` has variables.
pub fn unify(goal: &TypeTerm, pattern: &TypeTerm) -> Result<Substitution, Mismatch> {
    if !goal.is_ground() {
        return Err(Mismatch {
            path: TermPath::root(),
            kind: MismatchKind::NonGroundGoal,
        });
    }

    let mut subst = Substitution::new();
    let mut path = TermPath::root();
    match_into(goal, pattern, &mut path, &mut subst)?;
    Ok(subst)
}

/// Returns true iff `specific` is an instance of `general`: some
/// substitution of `general`'s variables yields `specific`, where
/// `specific`'s own variables are treated as opaque constants.
#[must_use]
pub fn is_instance_of(specific: &TypeTerm, general: &TypeTerm) -> bool {
    let mut subst = Substitution::new();
    let mut path = TermPath::root();
    match_into(specific, general, &mut path, &mut subst).is_ok()
}

/// One-way matching: variables in `pattern` bind to sub-terms of
/// `subject`; variables in `subject` only match pattern variables.
fn match_into(
    subject: &TypeTerm,
    pattern: &TypeTerm,
    path: &mut TermPath,
    subst: &mut Substitution,
) -> Result<(), Mismatch> {
    match (subject, pattern) {
        (_, TypeTerm::Var(var)) => subst.bind(var, subject).map_err(|bound| Mismatch {
            path: path.clone(),
            kind: MismatchKind::Conflict {
                var: var.clone(),
                bound,
                found: subject.clone(),
            },
        }),
        (TypeTerm::Var(_), TypeTerm::App(expected, _)) => Err(Mismatch {
            path: path.clone(),
            kind: MismatchKind::Rigid {
                expected: expected.clone(),
            },
        }),
        (TypeTerm::App(found, actuals), TypeTerm::App(expected, patterns)) => {
            if found != expected {
                return Err(Mismatch {
                    path: path.clone(),
                    kind: MismatchKind::Constructor {
                        expected: expected.clone(),
                        found: found.clone(),
                    },
                });
            }

            if actuals.len() != patterns.len() {
                return Err(Mismatch {
                    path: path.clone(),
                    kind: MismatchKind::Arity {
                        constructor: expected.clone(),
                        expected: patterns.len(),
                        found: actuals.len(),
                    },
                });
            }

            for (index, (actual, pattern)) in actuals.iter().zip(patterns.iter()).enumerate() {
                path.push(index);
                match_into(actual, pattern, path, subst)?;
                path.pop();
            }

            Ok(())
        }
    }
}

#[test]
fn test_unify_happy_path() {
    let a = TypeVar::new("a");
    let b = TypeVar::new("b");

    let pattern = TypeTerm::app("Pair", vec![a.term(), b.term()]);
    let goal = TypeTerm::app(
        "Pair",
        vec![
            TypeTerm::con("Int"),
            TypeTerm::app("List", vec![TypeTerm::con("Int")]),
        ],
    );

    let subst = unify(&goal, &pattern).expect("unifies");
    assert_eq!(subst.get(&a), Some(&TypeTerm::con("Int")));
    assert_eq!(subst.get(&b).map(ToString::to_string).as_deref(), Some("List<Int>"));
}

#[test]
fn test_unify_repeated_variable() {
    let a = TypeVar::new("a");
    let pattern = TypeTerm::app("Pair", vec![a.term(), a.term()]);

    let same = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Int")]);
    let different = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Bool")]);

    assert!(unify(&same, &pattern).is_ok());

    let mismatch = unify(&different, &pattern).expect_err("conflict");
    assert_eq!(mismatch.path, TermPath::from(vec![1]));
    assert!(matches!(mismatch.kind, MismatchKind::Conflict { .. }));
}

#[test]
fn test_unify_constructor_mismatch() {
    let a = TypeVar::new("a");
    let pattern = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), a.term()]);
    let goal = TypeTerm::app("Pair", vec![TypeTerm::con("Bool"), TypeTerm::con("Int")]);

    let mismatch = unify(&goal, &pattern).expect_err("mismatch");
    assert_eq!(mismatch.path, TermPath::from(vec![0]));
    assert_eq!(
        mismatch.to_string(),
        "expected constructor `Int`, found `Bool` at argument 0"
    );
}

#[test]
fn test_unify_arity_mismatch() {
    let goal = TypeTerm::app("Tuple", vec![TypeTerm::con("Int")]);
    let pattern = TypeTerm::app("Tuple", vec![TypeTerm::con("Int"), TypeTerm::con("Int")]);

    let mismatch = unify(&goal, &pattern).expect_err("mismatch");
    assert!(matches!(mismatch.kind, MismatchKind::Arity { expected: 2, found: 1, .. }));
}

#[test]
fn test_unify_non_ground_goal() {
    let a = TypeVar::new("a");
    let mismatch = unify(&a.term(), &a.term()).expect_err("not ground");

    assert_eq!(mismatch.kind, MismatchKind::NonGroundGoal);
}

#[test]
fn test_unify_leaves_pattern_alone() {
    let a = TypeVar::new("a");
    let pattern = TypeTerm::app("List", vec![a.term()]);
    let before = pattern.clone();

    unify(&TypeTerm::app("List", vec![TypeTerm::con("Int")]), &pattern).expect("ok");
    assert_eq!(pattern, before);
    assert!(!pattern.is_ground());
}

#[test]
fn test_is_instance_of() {
    let a = TypeVar::new("a");
    let b = TypeVar::new("b");
    let c = TypeVar::new("c");

    let general = TypeTerm::app("Pair", vec![a.term(), b.term()]);
    let diagonal = TypeTerm::app("Pair", vec![c.term(), c.term()]);
    let ints = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Int")]);

    assert!(is_instance_of(&diagonal, &general));
    assert!(!is_instance_of(&general, &diagonal));
    assert!(is_instance_of(&ints, &diagonal));
    assert!(!is_instance_of(&diagonal, &ints));
}
