use super::cache::Promise;
use crate::catalog::{Invoke, Rule};
use crate::diagnostics::ResolveError;
use crate::term::TypeTerm;
use crate::value::{Deferred, Input, Inputs, InvocationError, Value};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::any::Any;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct DerivationId(usize);

impl DerivationId {
    fn fresh() -> Self {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static DERIVATION_COUNTER: AtomicUsize = AtomicUsize::new(0);

        Self(DERIVATION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a derivation reaches the derivation of one of its sub-goals.
#[derive(Clone, Debug)]
pub(crate) enum Link {
    Built(Arc<Derivation>),
    /// Back reference to a goal that was still being searched.
    Back(Arc<Promise>),
}

#[derive(Clone, Debug)]
pub(crate) struct Edge {
    pub(crate) goal: TypeTerm,
    pub(crate) link: Link,
    pub(crate) deferrable: bool,
}

impl Edge {
    fn target_goal(&self) -> &TypeTerm {
        match &self.link {
            Link::Built(derivation) => &derivation.goal,
            Link::Back(promise) => promise.goal(),
        }
    }
}

/// One node of a proof: the rule picked for a goal, and how each of
/// the rule's requirements was met.
pub(crate) struct Derivation {
    id: DerivationId,
    goal: TypeTerm,
    rule: Arc<str>,
    invoke: Invoke,
    edges: SmallVec<[Edge; 4]>,
    /// Some back reference targets this derivation, so building it
    /// must expose its value as a `Deferred` while the rule runs.
    recursive: bool,
    /// The first value built through `Resolver::resolve`.
    memo: Mutex<Option<Value>>,
}

/// Deferred handles for the recursive derivations currently being
/// built, in one factory invocation.
#[derive(Default)]
struct Construction {
    open: FxHashMap<DerivationId, Deferred>,
}

impl Derivation {
    pub(crate) fn new(goal: &TypeTerm, rule: &Rule, edges: SmallVec<[Edge; 4]>, recursive: bool) -> Self {
        Self {
            id: DerivationId::fresh(),
            goal: goal.clone(),
            rule: rule.shared_name().clone(),
            invoke: rule.invoke().clone(),
            edges,
            recursive,
            memo: Mutex::new(None),
        }
    }

    pub(crate) fn goal(&self) -> &TypeTerm {
        &self.goal
    }

    pub(crate) fn rule(&self) -> &str {
        &self.rule
    }

    /// Returns the index and target of the first requirement that
    /// leads into one of `goals`.
    pub(crate) fn first_edge_into(&self, goals: &FxHashSet<TypeTerm>) -> Option<(usize, &TypeTerm)> {
        self.edges
            .iter()
            .enumerate()
            .find(|(_, edge)| goals.contains(edge.target_goal()))
            .map(|(index, edge)| (index, &edge.goal))
    }

    pub(crate) fn memoized(&self) -> Option<Value> {
        self.memo.lock().clone()
    }

    /// Stores `value` unless another one got there first, and returns
    /// the stored value.
    pub(crate) fn memoize(&self, value: Value) -> Value {
        self.memo.lock().get_or_insert(value).clone()
    }

    fn build(&self, cx: &mut Construction) -> Result<Value, ResolveError> {
        let own = if self.recursive {
            let handle = Deferred::pending(&self.goal);
            let previous = cx.open.insert(self.id, handle.clone());
            Some((handle, previous))
        } else {
            None
        };

        let built = self.inputs(cx).and_then(|inputs| {
            (self.invoke)(&inputs).map_err(|source| ResolveError::Invocation {
                goal: self.goal.clone(),
                rule: self.rule.to_string(),
                source,
            })
        });

        if let Some((handle, previous)) = own {
            match previous {
                Some(outer) => cx.open.insert(self.id, outer),
                None => cx.open.remove(&self.id),
            };

            if let Ok(value) = &built {
                handle.fulfill(value.clone());
            }
        }

        built
    }

    fn inputs(&self, cx: &mut Construction) -> Result<Inputs, ResolveError> {
        let mut items = SmallVec::new();

        for (index, edge) in self.edges.iter().enumerate() {
            let input = match &edge.link {
                Link::Built(sub) => {
                    let value = sub.build(cx)?;
                    if edge.deferrable {
                        Input::Deferred(Deferred::fulfilled(&edge.goal, value))
                    } else {
                        Input::Ready(value)
                    }
                }
                Link::Back(promise) => {
                    let target = promise.derivation().ok_or_else(|| ResolveError::Invocation {
                        goal: self.goal.clone(),
                        rule: self.rule.to_string(),
                        source: InvocationError::NotReady {
                            rule: self.rule.to_string(),
                            index,
                        },
                    })?;

                    let open = cx.open.get(&target.id).cloned();
                    match open {
                        Some(handle) => Input::Deferred(handle),
                        None => {
                            let value = target.build(cx)?;
                            Input::Deferred(Deferred::fulfilled(&edge.goal, value))
                        }
                    }
                }
            };

            items.push((edge.goal.clone(), input));
        }

        Ok(Inputs::new(&self.goal, &self.rule, items))
    }

    fn explain_into(&self, out: &mut String, indent: usize, deferrable: bool) {
        use std::fmt::Write;

        let _ = writeln!(
            out,
            "{}{}{} <= {}",
            "  ".repeat(indent),
            if deferrable { "~" } else { "" },
            self.goal,
            self.rule
        );

        for edge in &self.edges {
            match &edge.link {
                Link::Built(sub) => sub.explain_into(out, indent + 1, edge.deferrable),
                Link::Back(promise) => {
                    let _ = writeln!(
                        out,
                        "{}~{} <= (back reference)",
                        "  ".repeat(indent + 1),
                        promise.goal()
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for Derivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derivation")
            .field("id", &self.id)
            .field("goal", &self.goal.to_string())
            .field("rule", &self.rule)
            .field("recursive", &self.recursive)
            .field(
                "requirements",
                &self.edges.iter().map(|edge| edge.goal.to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub(crate) fn downcast<T: Any + Send + Sync>(goal: &TypeTerm, value: Value) -> Result<Arc<T>, ResolveError> {
    value.downcast::<T>().map_err(|_| ResolveError::ValueType {
        goal: goal.clone(),
        expected: std::any::type_name::<T>(),
    })
}

/// A compiled proof for a goal.  Invoking a factory runs the rules of
/// the proof, bottom-up, without any further search.
///
/// Factories are cheap to clone, and may be invoked from any thread.
#[derive(Clone)]
pub struct Factory {
    derivation: Arc<Derivation>,
}

impl Factory {
    pub(crate) fn new(derivation: Arc<Derivation>) -> Self {
        Self { derivation }
    }

    pub(crate) fn derivation(&self) -> &Arc<Derivation> {
        &self.derivation
    }

    /// The goal this factory builds values of.
    #[must_use]
    pub fn goal(&self) -> &TypeTerm {
        self.derivation.goal()
    }

    /// The qualified name of the rule that produces the goal.
    #[must_use]
    pub fn rule(&self) -> &str {
        self.derivation.rule()
    }

    /// Returns true if the goal's value may refer to itself.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        self.derivation.recursive
    }

    /// Builds a fresh value of the goal.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Invocation` when a rule handle fails.
    pub fn invoke(&self) -> Result<Value, ResolveError> {
        self.derivation.build(&mut Construction::default())
    }

    /// Builds a fresh value, and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Invocation` when a rule handle fails,
    /// and `ResolveError::ValueType` when the value is not a `T`.
    pub fn invoke_as<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        downcast(self.goal(), self.invoke()?)
    }

    /// Renders the proof tree, one goal per line; deferrable inputs are
    /// marked with `~`.
    #[must_use]
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.derivation.explain_into(&mut out, 0, false);
        out
    }

    /// Returns true if both factories come from the same derivation.
    #[must_use]
    pub fn ptr_eq(this: &Factory, other: &Factory) -> bool {
        Arc::ptr_eq(&this.derivation, &other.derivation)
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("goal", &self.goal().to_string())
            .field("rule", &self.rule())
            .finish()
    }
}

#[cfg(test)]
fn test_rule(provider: &str, spec: crate::catalog::RuleSpec) -> Rule {
    Rule::new(crate::catalog::RuleId::new(0), provider, spec)
}

#[test]
fn test_build_tree() {
    use crate::catalog::RuleSpec;
    use crate::value::value;

    let int = TypeTerm::con("Int");
    let pair = TypeTerm::app("Pair", vec![int.clone(), int.clone()]);

    let int_rule = test_rule(
        "core",
        RuleSpec::new("int", int.clone(), |_| Ok(value(1i64))),
    );
    let pair_rule = test_rule(
        "core",
        RuleSpec::new("pair", pair.clone(), |inputs| {
            let left = inputs.get::<i64>(0)?;
            let right = inputs.deferred(1)?.get_as::<i64>().ok_or_else(|| {
                InvocationError::custom("right is not ready")
            })?;
            Ok(value((*left, *right)))
        }),
    );

    let leaf = Arc::new(Derivation::new(&int, &int_rule, SmallVec::new(), false));
    let mut edges = SmallVec::new();
    edges.push(Edge {
        goal: int.clone(),
        link: Link::Built(leaf.clone()),
        deferrable: false,
    });
    edges.push(Edge {
        goal: int.clone(),
        link: Link::Built(leaf),
        deferrable: true,
    });
    let factory = Factory::new(Arc::new(Derivation::new(&pair, &pair_rule, edges, false)));

    assert_eq!(*factory.invoke_as::<(i64, i64)>().expect("ok"), (1, 1));
    assert!(matches!(
        factory.invoke_as::<String>(),
        Err(ResolveError::ValueType { .. })
    ));
    assert_eq!(
        factory.explain(),
        "Pair<Int, Int> <= core::pair\n  Int <= core::int\n  ~Int <= core::int\n"
    );
}

#[test]
fn test_self_reference_identity() {
    use crate::catalog::RuleSpec;
    use crate::value::value;

    struct Node {
        next: Deferred,
    }

    let node = TypeTerm::con("Node");
    let rule = test_rule(
        "graph",
        RuleSpec::new("node", node.clone(), |inputs| {
            Ok(value(Node {
                next: inputs.deferred(0)?,
            }))
        }),
    );

    let promise = Arc::new(Promise::new(&node));
    let mut edges = SmallVec::new();
    edges.push(Edge {
        goal: node.clone(),
        link: Link::Back(promise.clone()),
        deferrable: true,
    });
    let derivation = Arc::new(Derivation::new(&node, &rule, edges, true));
    promise.fulfill(&derivation);

    let factory = Factory::new(derivation);
    let first = factory.invoke_as::<Node>().expect("ok");
    let next = first.next.get_as::<Node>().expect("fulfilled");
    assert!(Arc::ptr_eq(&first, &next));

    // Each invocation builds a new graph.
    let second = factory.invoke_as::<Node>().expect("ok");
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(factory.explain().contains("~Node <= (back reference)"));
}

#[test]
fn test_invocation_error() {
    use crate::catalog::RuleSpec;

    let int = TypeTerm::con("Int");
    let rule = test_rule(
        "core",
        RuleSpec::new("int", int.clone(), |_| Err(InvocationError::custom("boom"))),
    );
    let factory = Factory::new(Arc::new(Derivation::new(&int, &rule, SmallVec::new(), false)));

    match factory.invoke() {
        Err(ResolveError::Invocation { rule, source, .. }) => {
            assert_eq!(rule, "core::int");
            assert_eq!(source, InvocationError::custom("boom"));
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}
