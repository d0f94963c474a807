use horn_resolver::diagnostics::{AttemptFailure, MalformedReason};
use horn_resolver::{
    value, CatalogBuilder, CatalogError, Deferred, Factory, InvocationError, ResolveError,
    Resolver, ResolverConfig, RuleSet, RuleSpec, TieBreak, TypeTerm, TypeVar,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn int() -> TypeTerm {
    TypeTerm::con("Int")
}

fn pair(left: TypeTerm, right: TypeTerm) -> TypeTerm {
    TypeTerm::app("Pair", vec![left, right])
}

fn list(item: TypeTerm) -> TypeTerm {
    TypeTerm::app("List", vec![item])
}

fn resolver_with(rules: &RuleSet, config: ResolverConfig) -> Resolver {
    let catalog = CatalogBuilder::new().provider(rules).build().expect("ok");
    Resolver::with_config(Arc::new(catalog), config)
}

fn resolver(rules: &RuleSet) -> Resolver {
    resolver_with(rules, ResolverConfig::default())
}

/// `Int`, counting invocations, and `List<a>` given an `a`.
fn counted_core(calls: &Arc<AtomicUsize>) -> RuleSet {
    let a = TypeVar::new("a");
    let counter = calls.clone();

    RuleSet::new("core")
        .rule(RuleSpec::new("int", int(), move |_| {
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            Ok(value(seen as i64))
        }))
        .rule(
            RuleSpec::new("list", list(a.term()), |inputs| {
                let item = inputs.get::<i64>(0)?;
                Ok(value(vec![*item]))
            })
            .requires(a.term()),
        )
}

#[test]
fn test_unique_proof_is_deterministic() {
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = resolver(&counted_core(&calls));
    let goal = list(int());

    let first = resolver.compile(&goal).expect("ok");
    let second = resolver.compile(&goal).expect("ok");
    assert!(Factory::ptr_eq(&first, &second));
    assert_eq!(first.rule(), "core::list");

    let one = resolver.resolve_as::<Vec<i64>>(&goal).expect("ok");
    let two = resolver.resolve_as::<Vec<i64>>(&goal).expect("ok");
    assert!(Arc::ptr_eq(&one, &two));
}

#[test]
fn test_resolve_searches_and_invokes_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = resolver(&counted_core(&calls));
    let goal = list(int());

    resolver.resolve(&goal).expect("ok");
    resolver.resolve(&goal).expect("ok");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Searched `List<Int>` then `Int`, once each.
    let stats = resolver.stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.resolved, 2);

    // Factories build a fresh value per call.
    let factory = resolver.compile(&goal).expect("ok");
    factory.invoke().expect("ok");
    factory.invoke().expect("ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(resolver.stats().misses, 2);
}

#[test]
fn test_ambiguous_lists_succeeding_rules() {
    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("one", int(), |_| Ok(value(1i64))))
        .rule(RuleSpec::new("missing", int(), |_| Ok(value(0i64))).requires(TypeTerm::con("Missing")))
        .rule(RuleSpec::new("two", int(), |_| Ok(value(2i64))));
    let resolver = resolver(&rules);

    match resolver.resolve(&int()) {
        Err(ResolveError::Ambiguous { candidates, .. }) => {
            assert_eq!(candidates, vec!["core::one".to_string(), "core::two".to_string()]);
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }

    // The failure is cached, not searched again.
    let misses = resolver.stats().misses;
    assert!(resolver.compile(&int()).is_err());
    assert_eq!(resolver.stats().misses, misses);
}

#[test]
fn test_no_rule_reports_every_candidate() {
    let a = TypeVar::new("a");
    let b = TypeVar::new("b");
    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("int", int(), |_| Ok(value(0i64))))
        .rule(
            RuleSpec::new("pair", pair(a.term(), b.term()), |_| Ok(value(())))
                .requires(a.term())
                .requires(b.term()),
        )
        .rule(RuleSpec::new("int_pair", pair(int(), int()), |_| Ok(value(()))));
    let resolver = resolver(&rules);

    assert!(matches!(
        resolver.compile(&TypeTerm::con("Float")),
        Err(ResolveError::NoRule { ref attempted, .. }) if attempted.is_empty()
    ));

    let goal = pair(int(), TypeTerm::con("Float"));
    let error = resolver.compile(&goal).expect_err("no rule");
    match &error {
        ResolveError::NoRule { attempted, .. } => {
            assert_eq!(attempted.len(), 2);
            assert_eq!(attempted[0].rule, "core::pair");
            assert!(matches!(
                attempted[0].failure,
                AttemptFailure::Subgoal { requirement: 1, .. }
            ));
            assert_eq!(attempted[1].rule, "core::int_pair");
            assert!(!attempted[1].failure.unified());
        }
        other => panic!("unexpected {:?}", other),
    }

    let rendered = error.report().render();
    assert!(rendered.contains("error[no-rule]: no rule resolves `Pair<Int, Float>`"));
    assert!(rendered.contains("tried core::pair: requirement 1 (`Float`) failed"));
    assert!(rendered.contains("while resolving: Pair<Int, Float>"));

    let json = serde_json::to_value(error.report()).expect("ok");
    assert_eq!(json["kind"], "no-rule");
    assert_eq!(json["attempts"][0]["cause"]["goal"], "Float");
}

#[derive(Debug)]
struct Node {
    label: &'static str,
    next: Deferred,
}

#[test]
fn test_self_reference_is_same_value() {
    let node = TypeTerm::con("Node");
    let rules = RuleSet::new("graph").rule(
        RuleSpec::new("node", node.clone(), |inputs| {
            Ok(value(Node {
                label: "self",
                next: inputs.deferred(0)?,
            }))
        })
        .requires_deferred(node.clone()),
    );
    let resolver = resolver(&rules);

    let outer = resolver.resolve_as::<Node>(&node).expect("ok");
    let inner = outer.next.get_as::<Node>().expect("fulfilled");
    assert!(Arc::ptr_eq(&outer, &inner));
    assert_eq!(inner.label, "self");
    assert!(resolver.compile(&node).expect("ok").is_recursive());
}

#[derive(Debug)]
struct Tree {
    forest: Deferred,
}

#[derive(Debug)]
struct Forest {
    tree: Deferred,
}

#[test]
fn test_mutual_recursion() {
    let tree = TypeTerm::con("Tree");
    let forest = TypeTerm::con("Forest");
    let rules = RuleSet::new("graph")
        .rule(
            RuleSpec::new("tree", tree.clone(), |inputs| {
                Ok(value(Tree {
                    forest: inputs.deferred(0)?,
                }))
            })
            .requires_deferred(forest.clone()),
        )
        .rule(
            RuleSpec::new("forest", forest.clone(), |inputs| {
                Ok(value(Forest {
                    tree: inputs.deferred(0)?,
                }))
            })
            .requires_deferred(tree.clone()),
        );
    let resolver = resolver(&rules);

    let root = resolver.resolve_as::<Tree>(&tree).expect("ok");
    let middle = root.forest.get_as::<Forest>().expect("fulfilled");
    let back = middle.tree.get_as::<Tree>().expect("fulfilled");
    assert!(Arc::ptr_eq(&root, &back));

    // `Forest` was settled along with `Tree`.
    assert!(resolver.status(&forest).is_resolved());
    let misses = resolver.stats().misses;
    assert_eq!(resolver.compile(&forest).expect("ok").rule(), "graph::forest");
    assert_eq!(resolver.stats().misses, misses);
}

#[test]
fn test_strict_self_cycle() {
    let node = TypeTerm::con("Loop");
    let rules = RuleSet::new("graph")
        .rule(RuleSpec::new("loop", node.clone(), |_| Ok(value(()))).requires(node.clone()));
    let resolver = resolver(&rules);

    match resolver.compile(&node) {
        Err(ResolveError::CyclicRule { goal, rules, .. }) => {
            assert_eq!(goal, node);
            assert_eq!(rules, vec!["graph::loop".to_string()]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_depth_limit() {
    let a = TypeVar::new("a");
    let wrap = |term: TypeTerm| TypeTerm::app("Wrap", vec![term]);
    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("int", int(), |_| Ok(value(()))))
        .rule(RuleSpec::new("wrap", wrap(a.term()), |_| Ok(value(()))).requires(wrap(wrap(a.term()))));
    let resolver = resolver_with(&rules, ResolverConfig::default().with_max_depth(Some(32)));

    let goal = wrap(int());
    match resolver.compile(&goal) {
        Err(ResolveError::DepthExceeded { goal: deepest, chain, limit }) => {
            assert_eq!(limit, 32);
            assert_eq!(chain.len(), 32);
            assert_eq!(chain.goals()[0], goal);
            assert_eq!(deepest.depth(), 34);
        }
        other => panic!("unexpected {:?}", other),
    }

    // Depth-limited failures are not cached.
    assert!(matches!(
        resolver.status(&goal),
        horn_resolver::DerivationStatus::Unstarted
    ));
    assert_eq!(resolver.stats().entries, 0);
}

#[test]
fn test_depth_limit_default_config() {
    let a = TypeVar::new("a");
    let wrap = |term: TypeTerm| TypeTerm::app("Wrap", vec![term]);
    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("int", int(), |_| Ok(value(()))))
        .rule(RuleSpec::new("wrap", wrap(a.term()), |_| Ok(value(()))).requires(wrap(wrap(a.term()))));
    let resolver = Arc::new(resolver(&rules));
    let goal = wrap(int());

    // The whole bounded search fits on a small thread stack.
    let search = {
        let goal = goal.clone();
        let resolver = resolver.clone();
        std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(move || resolver.compile(&goal))
            .expect("ok")
    };

    match search.join().expect("ok") {
        Err(ResolveError::DepthExceeded { goal: deepest, chain, limit }) => {
            assert_eq!(limit, horn_resolver::config::DEFAULT_MAX_DEPTH);
            assert_eq!(chain.len(), horn_resolver::config::DEFAULT_MAX_DEPTH);
            assert_eq!(chain.goals()[0], goal);
            assert_eq!(deepest.depth(), horn_resolver::config::DEFAULT_MAX_DEPTH + 2);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(resolver.stats().entries, 0);
}

#[test]
fn test_depth_limited_candidate_is_not_skipped() {
    let goal = TypeTerm::con("G");
    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("deep", goal.clone(), |_| Ok(value(()))).requires(TypeTerm::con("D1")))
        .rule(RuleSpec::new("d1", TypeTerm::con("D1"), |_| Ok(value(()))).requires(TypeTerm::con("D2")))
        .rule(RuleSpec::new("d2", TypeTerm::con("D2"), |_| Ok(value(()))).requires(TypeTerm::con("D3")))
        .rule(RuleSpec::new("d3", TypeTerm::con("D3"), |_| Ok(value(()))))
        .rule(RuleSpec::new("leaf", goal.clone(), |_| Ok(value(()))));

    // `leaf` succeeds, but `deep` was cut short: committing to `leaf`
    // could hide an ambiguity.
    let shallow = resolver_with(&rules, ResolverConfig::default().with_max_depth(Some(3)));
    match shallow.compile(&goal) {
        Err(ResolveError::DepthExceeded { goal: deepest, chain, limit }) => {
            assert_eq!(deepest, TypeTerm::con("D3"));
            assert_eq!(limit, 3);
            assert_eq!(chain.goals()[0], goal);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        shallow.status(&goal),
        horn_resolver::DerivationStatus::Unstarted
    ));

    let deep = resolver_with(&rules, ResolverConfig::default().with_max_depth(Some(10)));
    match deep.compile(&goal) {
        Err(ResolveError::Ambiguous { candidates, .. }) => {
            assert_eq!(candidates, vec!["core::deep".to_string(), "core::leaf".to_string()]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_cached_failure_reports_current_chain() {
    let a = TypeVar::new("a");
    let boxed = |term: TypeTerm| TypeTerm::app("Box", vec![term]);
    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("boxed", boxed(a.term()), |_| Ok(value(()))).requires(a.term()));
    let resolver = resolver(&rules);
    let float = TypeTerm::con("Float");

    let root = resolver.compile(&float).expect_err("no rule");
    assert!(root.chain().expect("has chain").is_empty());

    // `Float` now fails from the cache, below `Box<Float>`.
    let error = resolver.compile(&boxed(float.clone())).expect_err("no rule");
    let report = error.report();
    let cause = report.attempts[0].cause.as_ref().expect("has cause");
    assert_eq!(cause.goal, "Float");
    assert_eq!(cause.chain, vec!["Box<Float>".to_string()]);

    let again = resolver.compile(&float).expect_err("no rule");
    assert!(again.chain().expect("has chain").is_empty());
}

#[test]
fn test_nested_pair_invokes_int_per_use() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let inner = pair(int(), int());
    let outer = pair(int(), inner.clone());

    let show = |inputs: &horn_resolver::Inputs| -> Result<horn_resolver::Value, InvocationError> {
        let left = inputs.get::<String>(0)?;
        let right = inputs.get::<String>(1)?;
        Ok(value(format!("({}, {})", left, right)))
    };

    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("int", int(), move |_| {
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            Ok(value(seen.to_string()))
        }))
        .rule(RuleSpec::new("pair", inner.clone(), show).requires(int()).requires(int()))
        .rule(
            RuleSpec::new("nested", outer.clone(), show)
                .requires(int())
                .requires(inner.clone()),
        );
    let resolver = resolver(&rules);

    let built = resolver.resolve_as::<String>(&outer).expect("ok");
    assert_eq!(*built, "(0, (1, 2))");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert_eq!(
        resolver.compile(&outer).expect("ok").explain(),
        "Pair<Int, Pair<Int, Int>> <= core::nested\n\
         \x20 Int <= core::int\n\
         \x20 Pair<Int, Int> <= core::pair\n\
         \x20   Int <= core::int\n\
         \x20   Int <= core::int\n"
    );
}

#[test]
fn test_most_specific_tie_break() {
    let a = TypeVar::new("a");
    let rules = RuleSet::new("core")
        .rule(RuleSpec::new("int", int(), |_| Ok(value(()))))
        .rule(RuleSpec::new("list", list(a.term()), |_| Ok(value("generic"))).requires(a.term()))
        .rule(RuleSpec::new("int_list", list(int()), |_| Ok(value("specific"))));

    let strict = resolver(&rules);
    assert!(matches!(
        strict.compile(&list(int())),
        Err(ResolveError::Ambiguous { .. })
    ));

    let config: ResolverConfig =
        serde_json::from_str(r#"{"tie_break": "most_specific"}"#).expect("ok");
    assert_eq!(config.tie_break, TieBreak::MostSpecific);
    let relaxed = resolver_with(&rules, config);
    assert_eq!(*relaxed.resolve_as::<&str>(&list(int())).expect("ok"), "specific");

    // Two equally specific heads stay ambiguous.
    let twins = rules.clone().rule(RuleSpec::new("int_list_again", list(int()), |_| Ok(value(()))));
    let relaxed = resolver_with(&twins, ResolverConfig::default().with_tie_break(TieBreak::MostSpecific));
    match relaxed.compile(&list(int())) {
        Err(ResolveError::Ambiguous { candidates, .. }) => assert_eq!(candidates.len(), 3),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_invocation_failure_is_not_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let rules = RuleSet::new("core").rule(RuleSpec::new("int", int(), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(InvocationError::custom("no ints today"))
    }));
    let resolver = resolver(&rules);

    for _ in 0..2 {
        match resolver.resolve(&int()) {
            Err(ResolveError::Invocation { rule, source, .. }) => {
                assert_eq!(rule, "core::int");
                assert_eq!(source.to_string(), "no ints today");
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(resolver.status(&int()).is_resolved());
}

#[test]
fn test_concurrent_resolution() {
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = Arc::new(resolver(&counted_core(&calls)));

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let resolver = resolver.clone();
            std::thread::spawn(move || {
                let goal = if index % 2 == 0 { list(int()) } else { int() };
                resolver.compile(&goal).map(|factory| factory.rule().to_string())
            })
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let rule = handle.join().expect("ok").expect("ok");
        let expected = if index % 2 == 0 { "core::list" } else { "core::int" };
        assert_eq!(rule, expected);
    }

    // Each goal was searched once, whatever the interleaving.
    assert_eq!(resolver.stats().misses, 2);
}

#[test]
fn test_malformed_rules() {
    let a = TypeVar::new("a");
    let variable_head = RuleSet::new("core").rule(RuleSpec::new("any", a.term(), |_| Ok(value(()))));

    match CatalogBuilder::new().provider(&variable_head).build() {
        Err(CatalogError::MalformedRule { rule, reason }) => {
            assert_eq!(rule, "core::any");
            assert_eq!(reason, MalformedReason::VariableHead(a.clone()));
        }
        Ok(_) => panic!("built a catalog with a variable head"),
    }

    let b = TypeVar::new("b");
    let unbound = RuleSet::new("core")
        .rule(RuleSpec::new("list", list(a.term()), |_| Ok(value(()))).requires(b.term()));
    assert!(matches!(
        CatalogBuilder::new().provider(&unbound).build(),
        Err(CatalogError::MalformedRule {
            reason: MalformedReason::UnboundBodyVariable(_),
            ..
        })
    ));
}
