use super::{Rule, RuleId, RuleProvider, RuleSpec};
use crate::diagnostics::{CatalogError, MalformedReason};
use crate::term::{Constructor, TypeTerm};
use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Collects rules from providers.  Nothing is checked until `build`.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    pending: Vec<(String, RuleSpec)>,
}

impl CatalogBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerates `provider`'s rules once, and queues them.
    #[must_use]
    pub fn provider<P: RuleProvider + ?Sized>(mut self, provider: &P) -> Self {
        self.add_provider(provider);
        self
    }

    pub fn add_provider<P: RuleProvider + ?Sized>(&mut self, provider: &P) {
        let name = provider.provider_name().to_string();
        for spec in provider.rules() {
            self.pending.push((name.clone(), spec));
        }
    }

    /// Queues a single rule under `provider`.
    #[must_use]
    pub fn rule(mut self, provider: &str, spec: RuleSpec) -> Self {
        self.pending.push((provider.into(), spec));
        self
    }

    /// Validates every queued rule and returns the immutable catalog.
    ///
    /// # Errors
    ///
    /// Returns the first `MalformedRule`: a rule with an empty name, a
    /// bare variable or an empty constructor in its head, a body
    /// variable that does not occur in the head, a constructor used
    /// with different arities across the catalog, or a duplicate
    /// qualified name.  No partial catalog is ever returned.
    pub fn build(self) -> Result<RuleCatalog, CatalogError> {
        let mut rules = Vec::with_capacity(self.pending.len());
        let mut by_constructor: FxHashMap<Constructor, SmallVec<[RuleId; 4]>> =
            FxHashMap::default();
        let mut shapes: FxHashMap<Constructor, usize> = FxHashMap::default();
        let mut names = FxHashSet::default();

        for (provider, spec) in self.pending {
            let qualified = format!("{}::{}", provider, spec.name);
            let malformed = |reason| CatalogError::MalformedRule {
                rule: qualified.clone(),
                reason,
            };

            let head_ctor = check_rule(&spec, &mut shapes).map_err(malformed)?;
            if !names.insert(qualified.clone()) {
                return Err(malformed(MalformedReason::Duplicate));
            }

            let id = RuleId::new(rules.len());
            by_constructor.entry(head_ctor).or_default().push(id);
            rules.push(Rule::new(id, &provider, spec));
        }

        tracing::debug!(
            rules = rules.len(),
            constructors = by_constructor.len(),
            "catalog: built"
        );

        Ok(RuleCatalog {
            rules,
            by_constructor,
            shapes,
        })
    }
}

/// Checks `spec` in isolation and against the constructor arities
/// seen so far (which it updates).  Returns the head constructor.
fn check_rule(
    spec: &RuleSpec,
    shapes: &mut FxHashMap<Constructor, usize>,
) -> Result<Constructor, MalformedReason> {
    if spec.name.is_empty() {
        return Err(MalformedReason::EmptyName);
    }

    let head_ctor = match &spec.head {
        TypeTerm::Var(var) => return Err(MalformedReason::VariableHead(var.clone())),
        TypeTerm::App(ctor, _) => ctor.clone(),
    };

    let head_vars = spec.head.vars();
    let mut body_vars = BTreeSet::new();
    for requirement in &spec.body {
        body_vars = requirement.pattern().insert_vars(body_vars);
    }

    if let Some(var) = body_vars.difference(&head_vars).next() {
        return Err(MalformedReason::UnboundBodyVariable(var.clone()));
    }

    let mut observe = |term: &TypeTerm| {
        let mut result = Ok(());
        term.for_each_app(&mut |ctor: &Constructor, arity: usize| {
            if result.is_err() {
                return;
            }

            if ctor.name().is_empty() {
                result = Err(MalformedReason::EmptyConstructor);
                return;
            }

            let expected = *shapes.entry(ctor.clone()).or_insert(arity);
            if expected != arity {
                result = Err(MalformedReason::ArityConflict {
                    constructor: ctor.clone(),
                    expected,
                    found: arity,
                });
            }
        });
        result
    };

    observe(&spec.head)?;
    for requirement in &spec.body {
        observe(requirement.pattern())?;
    }

    Ok(head_ctor)
}

/// The immutable, validated set of rules for resolution sessions.
#[derive(Debug)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    by_constructor: FxHashMap<Constructor, SmallVec<[RuleId; 4]>>,
    shapes: FxHashMap<Constructor, usize>,
}

impl RuleCatalog {
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `id` does not come from this catalog.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Returns the rules whose head is an application of `ctor`, in
    /// registration order.
    #[must_use]
    pub fn candidate_ids(&self, ctor: &Constructor) -> &[RuleId] {
        self.by_constructor
            .get(ctor)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the rules that could possibly match `goal`: those whose
    /// head constructor is `goal`'s.
    pub fn candidates<'a>(&'a self, goal: &TypeTerm) -> impl Iterator<Item = &'a Rule> + 'a {
        let ids: &[RuleId] = match goal.constructor() {
            Some(ctor) => self.candidate_ids(ctor),
            None => &[],
        };
        ids.iter().map(move |id| self.rule(*id))
    }

    /// Returns the arity `ctor` is used with, if it appears anywhere
    /// in the catalog.
    #[must_use]
    pub fn arity(&self, ctor: &Constructor) -> Option<usize> {
        self.shapes.get(ctor).copied()
    }
}

#[cfg(test)]
fn unit_rule(name: &str, head: TypeTerm) -> RuleSpec {
    RuleSpec::new(name, head, |_| Ok(crate::value::value(())))
}

#[test]
fn test_build_and_index() {
    use crate::term::TypeVar;

    let a = TypeVar::new("a");
    let catalog = CatalogBuilder::new()
        .rule("core", unit_rule("int", TypeTerm::con("Int")))
        .rule(
            "core",
            unit_rule("list", TypeTerm::app("List", vec![a.term()])).requires(a.term()),
        )
        .rule("extra", unit_rule("int", TypeTerm::con("Int")))
        .build()
        .expect("ok");

    assert_eq!(catalog.len(), 3);
    let names: Vec<_> = catalog
        .candidates(&TypeTerm::con("Int"))
        .map(Rule::name)
        .collect();
    assert_eq!(names, ["core::int", "extra::int"]);
    assert_eq!(catalog.arity(&Constructor::new("List")), Some(1));
    assert_eq!(catalog.candidates(&TypeTerm::con("Float")).count(), 0);
}

#[test]
fn test_variable_head() {
    use crate::term::TypeVar;

    let a = TypeVar::new("a");
    let err = CatalogBuilder::new()
        .rule("core", unit_rule("any", a.term()))
        .build()
        .expect_err("malformed");

    assert_eq!(
        err,
        CatalogError::MalformedRule {
            rule: "core::any".into(),
            reason: MalformedReason::VariableHead(a),
        }
    );
}

#[test]
fn test_unbound_body_variable() {
    use crate::term::TypeVar;

    let a = TypeVar::new("a");
    let b = TypeVar::new("b");
    let err = CatalogBuilder::new()
        .rule(
            "core",
            unit_rule("list", TypeTerm::app("List", vec![a.term()])).requires(b.term()),
        )
        .build()
        .expect_err("malformed");

    assert!(matches!(
        err,
        CatalogError::MalformedRule {
            reason: MalformedReason::UnboundBodyVariable(_),
            ..
        }
    ));
}

#[test]
fn test_arity_conflict() {
    let err = CatalogBuilder::new()
        .rule(
            "core",
            unit_rule(
                "pair",
                TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Int")]),
            ),
        )
        .rule(
            "core",
            unit_rule("odd", TypeTerm::con("Odd"))
                .requires(TypeTerm::app("Pair", vec![TypeTerm::con("Int")])),
        )
        .build()
        .expect_err("malformed");

    assert_eq!(
        err.to_string(),
        "malformed rule `core::odd`: `Pair` is used with 1 argument(s), but elsewhere with 2"
    );
}

#[test]
fn test_duplicate_and_empty_names() {
    let duplicate = CatalogBuilder::new()
        .rule("core", unit_rule("int", TypeTerm::con("Int")))
        .rule("core", unit_rule("int", TypeTerm::con("Int")))
        .build()
        .expect_err("malformed");
    assert!(matches!(
        duplicate,
        CatalogError::MalformedRule {
            reason: MalformedReason::Duplicate,
            ..
        }
    ));

    let empty = CatalogBuilder::new()
        .rule("core", unit_rule("", TypeTerm::con("Int")))
        .build()
        .expect_err("malformed");
    assert!(matches!(
        empty,
        CatalogError::MalformedRule {
            reason: MalformedReason::EmptyName,
            ..
        }
    ));

    let nameless_ctor = CatalogBuilder::new()
        .rule("core", unit_rule("blank", TypeTerm::con("")))
        .build()
        .expect_err("malformed");
    assert!(matches!(
        nameless_ctor,
        CatalogError::MalformedRule {
            reason: MalformedReason::EmptyConstructor,
            ..
        }
    ));
}

#[test]
fn test_providers_enumerated_once() {
    use super::RuleSet;

    let core = RuleSet::new("core")
        .rule(unit_rule("int", TypeTerm::con("Int")))
        .rule(unit_rule("unit", TypeTerm::con("Unit")));
    let catalog = RuleCatalog::builder().provider(&core).build().expect("ok");

    assert_eq!(core.len(), 2);
    assert_eq!(
        catalog.rules().map(Rule::name).collect::<Vec<_>>(),
        ["core::int", "core::unit"]
    );
}
