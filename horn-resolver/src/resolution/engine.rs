use super::cache::{DerivationCache, DerivationState, Outcome, Promise};
use super::factory::{Derivation, Edge, Link};
use crate::catalog::{Requirement, Rule, RuleCatalog, RuleId};
use crate::config::{ResolverConfig, TieBreak};
use crate::diagnostics::{rebased, Attempt, AttemptFailure, GoalChain, ResolveError};
use crate::term::TypeTerm;
use crate::unification::{is_instance_of, unify, Substitution, UnboundVariable};
use fxhash::FxHashSet;
use smallvec::SmallVec;
use std::sync::Arc;

/// A goal on the search stack, with the state of its loop over
/// candidate rules.
struct Frame<'a> {
    goal: TypeTerm,
    promise: Arc<Promise>,
    /// Some deferrable requirement linked back to `promise`.
    referenced: bool,
    /// Goals whose provisional outcome depends on this frame.
    pending: Vec<TypeTerm>,
    candidates: &'a [RuleId],
    /// Index of the next candidate to unify.
    next: usize,
    /// Lowest frame any finished attempt depends on.
    low: usize,
    current: Option<Attempting<'a>>,
    successes: SmallVec<[Candidate<'a>; 2]>,
    attempted: Vec<Attempt>,
}

/// The candidate whose requirements a frame is linking, left to
/// right.  The next requirement is `edges.len()`.
struct Attempting<'a> {
    rule: &'a Rule,
    subst: Substitution,
    edges: SmallVec<[Edge; 4]>,
    low: usize,
}

/// Why a requirement could not be linked.
enum Blocked {
    /// The requirement is strict, and its goal is still in progress.
    Cycle,
    Failed(Arc<ResolveError>),
}

/// A rule whose requirements all resolved.
struct Candidate<'a> {
    rule: &'a Rule,
    edges: SmallVec<[Edge; 4]>,
}

/// What the top frame does next.
enum Advance {
    Continue,
    /// Search the unstarted goal on a new frame.
    Descend(TypeTerm),
    /// Every candidate has been tried.
    Finished,
}

enum Next<'a> {
    Start,
    Complete,
    Link {
        requirement: &'a Requirement,
        subgoal: Result<TypeTerm, UnboundVariable>,
    },
}

fn linked(outcome: Outcome) -> Result<Link, Blocked> {
    outcome.map(Link::Built).map_err(Blocked::Failed)
}

/// One depth-first search for a goal, against a session's cache.
///
/// The goal stack lives on the heap, so the depth bound rather than
/// the thread's stack limits how deep a search may go.  It doubles as
/// the cycle detector.  Every search result comes with a "low" frame
/// index, the lowest stack frame it depends on: a result that depends
/// on a goal still in progress (through a back reference, or a strict
/// cycle) is provisional, and only becomes final once that goal is
/// done.  This is the lowlink of Tarjan's SCC algorithm, and it
/// guarantees that `Resolved` entries never change afterwards.
pub(crate) struct Search<'a> {
    catalog: &'a RuleCatalog,
    config: &'a ResolverConfig,
    cache: &'a mut DerivationCache,
    stack: Vec<Frame<'a>>,
}

impl<'a> Search<'a> {
    pub(crate) fn new(
        catalog: &'a RuleCatalog,
        config: &'a ResolverConfig,
        cache: &'a mut DerivationCache,
    ) -> Self {
        Self {
            catalog,
            config,
            cache,
            stack: Vec::new(),
        }
    }

    /// Returns the derivation for `goal`, searching for it if needed.
    pub(crate) fn run(mut self, goal: &TypeTerm) -> Outcome {
        if !goal.is_ground() {
            return Err(Arc::new(ResolveError::NonGroundGoal { goal: goal.clone() }));
        }

        let known = match self.cache.get(goal) {
            Some(DerivationState::Resolved(derivation)) => Some(Ok(derivation.clone())),
            Some(DerivationState::Failed(error)) => Some(Err(rebased(error, &GoalChain::default()))),
            _ => None,
        };

        if let Some(outcome) = known {
            self.cache.record_hit();
            return outcome;
        }

        match self.enter(goal) {
            Some((outcome, _)) => outcome,
            None => self.drive(goal),
        }
    }

    /// Runs the frame loop until the root frame concludes.
    fn drive(&mut self, goal: &TypeTerm) -> Outcome {
        while let Some(top) = self.stack.len().checked_sub(1) {
            match self.advance(top) {
                Advance::Continue => {}
                Advance::Descend(subgoal) => {
                    if let Some((outcome, low)) = self.enter(&subgoal) {
                        self.resume(top, subgoal, linked(outcome), low);
                    }
                }
                Advance::Finished => {
                    let (subgoal, outcome, low) = self.conclude(top);
                    if top == 0 {
                        return outcome;
                    }
                    self.resume(top - 1, subgoal, linked(outcome), low);
                }
            }
        }

        Err(Arc::new(ResolveError::NoRule {
            goal: goal.clone(),
            chain: GoalChain::default(),
            attempted: Vec::new(),
        }))
    }

    /// Looks up a requirement's goal.  Returns `None` when the goal is
    /// unstarted and must be searched.
    fn lookup(&mut self, goal: &TypeTerm, deferrable: bool) -> Option<(Result<Link, Blocked>, usize)> {
        let depth = self.stack.len();
        let (outcome, low) = match self.cache.get(goal) {
            None => return None,
            Some(DerivationState::InProgress { frame, promise }) => {
                let (frame, promise) = (*frame, promise.clone());
                if !deferrable {
                    tracing::trace!(goal = %goal, frame, "resolution: strict cycle");
                    return Some((Err(Blocked::Cycle), frame));
                }

                tracing::trace!(goal = %goal, frame, "resolution: back reference");
                self.stack[frame].referenced = true;
                return Some((Ok(Link::Back(promise)), frame));
            }
            Some(DerivationState::Provisional { low, outcome, .. }) => (outcome.clone(), *low),
            Some(DerivationState::Resolved(derivation)) => (Ok(derivation.clone()), depth),
            Some(DerivationState::Failed(error)) => (Err(error.clone()), depth),
        };

        self.cache.record_hit();
        let outcome = outcome.map_err(|error| rebased(&error, &self.chain(depth)));
        Some((linked(outcome), low))
    }

    /// Starts the search for the unstarted `goal` on a new stack
    /// frame.  Returns the outcome right away if the frame would be
    /// too deep.
    fn enter(&mut self, goal: &TypeTerm) -> Option<(Outcome, usize)> {
        let depth = self.stack.len();
        self.cache.record_miss();

        if let Some(limit) = self.config.max_depth {
            if depth >= limit {
                tracing::warn!(goal = %goal, limit, "resolution: depth limit exceeded");
                let error = ResolveError::DepthExceeded {
                    goal: goal.clone(),
                    chain: self.chain(depth),
                    limit,
                };
                return Some((Err(Arc::new(error)), depth));
            }
        }

        let promise = Arc::new(Promise::new(goal));
        self.cache.set(
            goal,
            DerivationState::InProgress {
                frame: depth,
                promise: promise.clone(),
            },
        );

        let catalog = self.catalog;
        let candidates = match goal.constructor() {
            Some(ctor) => catalog.candidate_ids(ctor),
            None => &[],
        };
        self.stack.push(Frame {
            goal: goal.clone(),
            promise,
            referenced: false,
            pending: Vec::new(),
            candidates,
            next: 0,
            low: depth,
            current: None,
            successes: SmallVec::new(),
            attempted: Vec::new(),
        });

        tracing::debug!(goal = %goal, depth, "resolution: started");
        None
    }

    /// Takes one step for the frame at `top`: unify the next candidate,
    /// link the next requirement of the current one, or report that
    /// the frame is done.  Sibling candidates are always all attempted.
    fn advance(&mut self, top: usize) -> Advance {
        let next = match &self.stack[top].current {
            None => Next::Start,
            Some(attempting) => {
                let rule: &'a Rule = attempting.rule;
                match rule.body().get(attempting.edges.len()) {
                    None => Next::Complete,
                    Some(requirement) => Next::Link {
                        requirement,
                        subgoal: attempting.subst.apply(requirement.pattern()),
                    },
                }
            }
        };

        match next {
            Next::Start => self.start_candidate(top),
            Next::Complete => {
                let frame = &mut self.stack[top];
                if let Some(Attempting { rule, edges, low, .. }) = frame.current.take() {
                    frame.low = frame.low.min(low);
                    frame.successes.push(Candidate { rule, edges });
                }
                Advance::Continue
            }
            Next::Link {
                requirement,
                subgoal,
            } => {
                let subgoal = match subgoal {
                    Ok(subgoal) => subgoal,
                    Err(unbound) => {
                        self.fail_candidate(top, AttemptFailure::Unbound(unbound));
                        return Advance::Continue;
                    }
                };

                match self.lookup(&subgoal, requirement.is_deferrable()) {
                    Some((link, low)) => {
                        self.resume(top, subgoal, link, low);
                        Advance::Continue
                    }
                    None => Advance::Descend(subgoal),
                }
            }
        }
    }

    /// Matches the frame's next candidate rule against its goal.
    fn start_candidate(&mut self, top: usize) -> Advance {
        let catalog = self.catalog;
        let frame = &mut self.stack[top];
        let rule = match frame.candidates.get(frame.next) {
            Some(id) => catalog.rule(*id),
            None => return Advance::Finished,
        };
        frame.next += 1;

        match unify(&frame.goal, rule.head()) {
            Ok(subst) => {
                frame.current = Some(Attempting {
                    rule,
                    subst,
                    edges: SmallVec::new(),
                    low: top,
                });
            }
            Err(mismatch) => {
                tracing::trace!(goal = %frame.goal, rule = rule.name(), %mismatch, "resolution: head does not match");
                frame.attempted.push(Attempt {
                    rule: rule.name().to_string(),
                    failure: AttemptFailure::Unification(mismatch),
                });
            }
        }

        Advance::Continue
    }

    /// Hands the result for the current requirement of frame `top`
    /// back to its candidate.  A requirement that fails stops the
    /// candidate.
    fn resume(&mut self, top: usize, subgoal: TypeTerm, link: Result<Link, Blocked>, low: usize) {
        let attempting = match self.stack[top].current.as_mut() {
            Some(attempting) => attempting,
            None => return,
        };

        attempting.low = attempting.low.min(low);
        let requirement = attempting.edges.len();
        let rule: &'a Rule = attempting.rule;
        let deferrable = rule
            .body()
            .get(requirement)
            .map_or(false, Requirement::is_deferrable);

        let failure = match link {
            Ok(link) => {
                attempting.edges.push(Edge {
                    goal: subgoal,
                    link,
                    deferrable,
                });
                return;
            }
            Err(Blocked::Cycle) => AttemptFailure::Cycle {
                requirement,
                goal: subgoal,
            },
            Err(Blocked::Failed(error)) => AttemptFailure::Subgoal {
                requirement,
                goal: subgoal,
                error,
            },
        };

        self.fail_candidate(top, failure);
    }

    fn fail_candidate(&mut self, top: usize, failure: AttemptFailure) {
        let frame = &mut self.stack[top];
        if let Some(attempting) = frame.current.take() {
            frame.low = frame.low.min(attempting.low);
            frame.attempted.push(Attempt {
                rule: attempting.rule.name().to_string(),
                failure,
            });
        }
    }

    /// Selects the proof for the finished frame at `top`, and pops it.
    /// Returns the frame's goal, outcome and low frame.
    fn conclude(&mut self, top: usize) -> (TypeTerm, Outcome, usize) {
        let (goal, successes, attempted, low) = {
            let frame = &mut self.stack[top];
            (
                frame.goal.clone(),
                std::mem::take(&mut frame.successes),
                std::mem::take(&mut frame.attempted),
                frame.low,
            )
        };

        let outcome = self.select(&goal, top, successes, attempted);
        self.finish(&outcome, low);
        (goal, outcome, low)
    }

    fn select(
        &self,
        goal: &TypeTerm,
        frame: usize,
        successes: SmallVec<[Candidate<'a>; 2]>,
        attempted: Vec<Attempt>,
    ) -> Outcome {
        // The search below some candidate was cut short, so neither "no
        // rule" nor a unique proof can be claimed.
        for attempt in &attempted {
            if let AttemptFailure::Subgoal { error, .. } = &attempt.failure {
                if error.is_depth_exceeded() {
                    return Err(error.clone());
                }
            }
        }

        let chosen = match successes.len() {
            0 => return Err(self.no_proof(goal, frame, attempted)),
            1 => 0,
            _ => match self.most_specific(&successes) {
                Some(index) => index,
                None => {
                    return Err(Arc::new(ResolveError::Ambiguous {
                        goal: goal.clone(),
                        chain: self.chain(frame),
                        candidates: successes
                            .iter()
                            .map(|candidate| candidate.rule.name().to_string())
                            .collect(),
                    }));
                }
            },
        };

        let recursive = self.stack[frame].referenced;
        match successes.into_iter().nth(chosen) {
            Some(Candidate { rule, edges }) => {
                tracing::trace!(goal = %goal, rule = rule.name(), "resolution: selected");
                Ok(Arc::new(Derivation::new(goal, rule, edges, recursive)))
            }
            None => Err(self.no_proof(goal, frame, Vec::new())),
        }
    }

    /// Under `TieBreak::MostSpecific`, returns the index of the one
    /// candidate whose head is strictly more specific than all others.
    fn most_specific(&self, successes: &[Candidate<'a>]) -> Option<usize> {
        if self.config.tie_break != TieBreak::MostSpecific {
            return None;
        }

        let dominates = |this: &Candidate<'a>, other: &Candidate<'a>| {
            is_instance_of(this.rule.head(), other.rule.head())
                && !is_instance_of(other.rule.head(), this.rule.head())
        };

        let mut winner = None;
        for (index, candidate) in successes.iter().enumerate() {
            let wins = successes
                .iter()
                .enumerate()
                .all(|(other, rival)| other == index || dominates(candidate, rival));
            if wins {
                if winner.is_some() {
                    return None;
                }
                winner = Some(index);
            }
        }

        winner
    }

    /// Builds the error for a goal without any successful candidate.
    fn no_proof(&self, goal: &TypeTerm, frame: usize, attempted: Vec<Attempt>) -> Arc<ResolveError> {
        // Every rule that applies needs some goal in progress strictly.
        let cyclic = {
            let unified: Vec<&Attempt> = attempted
                .iter()
                .filter(|attempt| attempt.failure.unified())
                .collect();
            let all_cycle = unified
                .iter()
                .all(|attempt| attempt.failure.cycle_goal().is_some());
            match unified.first().and_then(|attempt| attempt.failure.cycle_goal()) {
                Some(cycle_goal) if all_cycle => Some((
                    cycle_goal.clone(),
                    unified.iter().map(|attempt| attempt.rule.clone()).collect(),
                )),
                _ => None,
            }
        };

        match cyclic {
            Some((cycle_goal, rules)) => Arc::new(ResolveError::CyclicRule {
                goal: cycle_goal,
                chain: self.chain(frame),
                rules,
            }),
            None => Arc::new(ResolveError::NoRule {
                goal: goal.clone(),
                chain: self.chain(frame),
                attempted,
            }),
        }
    }

    /// Pops the top frame, and records its outcome.
    fn finish(&mut self, outcome: &Outcome, low: usize) {
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return,
        };
        let index = self.stack.len();

        match outcome {
            Ok(derivation) => frame.promise.fulfill(derivation),
            Err(error) => {
                self.fail_dependents(&frame, error);
                if error.is_depth_exceeded() {
                    return;
                }
            }
        }

        if low < index {
            tracing::trace!(goal = %frame.goal, low, "resolution: provisional");
            for goal in &frame.pending {
                self.cache.relink(goal, low);
            }

            let chain = self.chain(index);
            self.cache.set(
                &frame.goal,
                DerivationState::Provisional {
                    low,
                    outcome: outcome.clone(),
                    chain,
                },
            );

            let parent = &mut self.stack[low];
            parent.pending.push(frame.goal);
            parent.pending.extend(frame.pending);
            return;
        }

        match outcome {
            Ok(derivation) => {
                tracing::debug!(goal = %frame.goal, rule = derivation.rule(), "resolution: committed");
                self.cache
                    .set(&frame.goal, DerivationState::Resolved(derivation.clone()));
            }
            Err(error) => {
                tracing::debug!(goal = %frame.goal, kind = error.kind(), "resolution: failed");
                self.cache
                    .set(&frame.goal, DerivationState::Failed(error.clone()));
            }
        }

        for goal in &frame.pending {
            self.cache.settle(goal, outcome.is_ok());
        }
    }

    /// The goal of `frame` failed: every provisional success that links
    /// into a failed goal, directly or through other such successes,
    /// fails too.  Those successes may be parked on any frame still on
    /// the stack, not only on `frame`.
    ///
    /// A depth-limited failure says nothing about the goals involved,
    /// so their entries are dropped instead, together with everything
    /// parked on `frame`.
    fn fail_dependents(&mut self, frame: &Frame<'a>, error: &Arc<ResolveError>) {
        let depth_limited = error.is_depth_exceeded();
        let parked: Vec<TypeTerm> = frame
            .pending
            .iter()
            .chain(self.stack.iter().flat_map(|below| below.pending.iter()))
            .cloned()
            .collect();

        let mut failing = FxHashSet::default();
        failing.insert(frame.goal.clone());
        if depth_limited {
            failing.extend(frame.pending.iter().cloned());
        }
        for goal in &parked {
            if let Some(DerivationState::Provisional { outcome: Err(_), .. }) = self.cache.get(goal) {
                failing.insert(goal.clone());
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for goal in &parked {
                if failing.contains(goal) {
                    continue;
                }

                let converted = match self.cache.get(goal) {
                    Some(DerivationState::Provisional {
                        low,
                        outcome: Ok(derivation),
                        chain,
                    }) => derivation.first_edge_into(&failing).map(|(requirement, subgoal)| {
                        let failure = ResolveError::NoRule {
                            goal: goal.clone(),
                            chain: chain.clone(),
                            attempted: vec![Attempt {
                                rule: derivation.rule().to_string(),
                                failure: AttemptFailure::Subgoal {
                                    requirement,
                                    goal: subgoal.clone(),
                                    error: error.clone(),
                                },
                            }],
                        };
                        DerivationState::Provisional {
                            low: *low,
                            outcome: Err(Arc::new(failure)),
                            chain: chain.clone(),
                        }
                    }),
                    _ => None,
                };

                if let Some(state) = converted {
                    self.cache.set(goal, state);
                    failing.insert(goal.clone());
                    changed = true;
                }
            }
        }

        if depth_limited {
            // A deeper bound could change any of these.
            for goal in &failing {
                self.cache.remove(goal);
            }
        }
    }

    /// The goals of the bottom `depth` stack frames, outermost first.
    fn chain(&self, depth: usize) -> GoalChain {
        GoalChain::new(
            self.stack[..depth.min(self.stack.len())]
                .iter()
                .map(|frame| frame.goal.clone())
                .collect(),
        )
    }
}

#[cfg(test)]
fn search(catalog: &RuleCatalog, goal: &TypeTerm) -> (Outcome, DerivationCache) {
    let config = ResolverConfig::default();
    let mut cache = DerivationCache::default();
    let outcome = Search::new(catalog, &config, &mut cache).run(goal);
    (outcome, cache)
}

#[test]
fn test_provisional_success_fails_with_root() {
    use crate::catalog::{CatalogBuilder, RuleSpec};
    use crate::term::TypeVar;
    use crate::value::value;

    // Node needs ~List<Node> and Missing; List<Node> only needs ~Node.
    let a = TypeVar::new("a");
    let node = TypeTerm::con("Node");
    let list = TypeTerm::app("List", vec![node.clone()]);
    let catalog = CatalogBuilder::new()
        .rule(
            "graph",
            RuleSpec::new("node", node.clone(), |_| Ok(value(())))
                .requires_deferred(list.clone())
                .requires(TypeTerm::con("Missing")),
        )
        .rule(
            "graph",
            RuleSpec::new("list", TypeTerm::app("List", vec![a.term()]), |_| Ok(value(())))
                .requires_deferred(a.term()),
        )
        .build()
        .expect("ok");

    let (outcome, cache) = search(&catalog, &node);
    let error = outcome.expect_err("Missing has no rule");
    assert_eq!(error.kind(), "no-rule");

    match cache.status(&list) {
        super::DerivationStatus::Failed(ResolveError::NoRule { attempted, .. }) => {
            assert_eq!(attempted.len(), 1);
            assert_eq!(attempted[0].rule, "graph::list");
            assert!(matches!(
                &attempted[0].failure,
                AttemptFailure::Subgoal { requirement: 0, .. }
            ));
        }
        other => panic!("unexpected status {:?}", other),
    }
}

#[test]
fn test_provisional_failure_is_forgotten() {
    use crate::catalog::{CatalogBuilder, RuleSpec};
    use crate::value::value;

    // Strict(Node) needs Node strictly, so it fails while Node is in
    // progress; Node itself has a second, independent rule.
    let node = TypeTerm::con("Node");
    let strict = TypeTerm::app("Strict", vec![node.clone()]);
    let catalog = CatalogBuilder::new()
        .rule(
            "graph",
            RuleSpec::new("via_strict", node.clone(), |_| Ok(value(()))).requires(strict.clone()),
        )
        .rule(
            "graph",
            RuleSpec::new("leaf", node.clone(), |_| Ok(value(()))),
        )
        .rule(
            "graph",
            RuleSpec::new("strict", strict.clone(), |_| Ok(value(()))).requires(node.clone()),
        )
        .build()
        .expect("ok");

    let (outcome, cache) = search(&catalog, &node);
    assert_eq!(outcome.expect("ok").rule(), "graph::leaf");
    assert!(matches!(
        cache.status(&strict),
        super::DerivationStatus::Unstarted
    ));

    // With Node resolved, Strict(Node) is searched afresh and succeeds.
    let config = ResolverConfig::default();
    let mut cache = cache;
    let strict_outcome = Search::new(&catalog, &config, &mut cache).run(&strict);
    assert_eq!(strict_outcome.expect("ok").rule(), "graph::strict");
}

#[test]
fn test_dependent_parked_below_failing_frame() {
    use crate::catalog::{CatalogBuilder, RuleSpec};
    use crate::value::{value, Inputs, InvocationError, Value};

    // A(0) -> B(1) -> G(2) -> P(3).  P links back to B and parks on B;
    // G links back to A and parks on A, but also needs P.  B then fails
    // on Missing, which must take G down with it even though A commits
    // through its second rule.
    let goal = |name: &str| TypeTerm::con(name);
    let unit = |_: &Inputs| -> Result<Value, InvocationError> { Ok(value(())) };
    let catalog = CatalogBuilder::new()
        .rule("graph", RuleSpec::new("a_via_b", goal("A"), unit).requires_deferred(goal("B")))
        .rule("graph", RuleSpec::new("a_leaf", goal("A"), unit))
        .rule(
            "graph",
            RuleSpec::new("b", goal("B"), unit)
                .requires(goal("G"))
                .requires(goal("Missing")),
        )
        .rule(
            "graph",
            RuleSpec::new("g", goal("G"), unit)
                .requires_deferred(goal("A"))
                .requires(goal("P")),
        )
        .rule("graph", RuleSpec::new("p", goal("P"), unit).requires_deferred(goal("B")))
        .build()
        .expect("ok");

    let (outcome, mut cache) = search(&catalog, &goal("A"));
    assert_eq!(outcome.expect("ok").rule(), "graph::a_leaf");
    for name in &["B", "G", "P"] {
        assert!(matches!(
            cache.status(&goal(*name)),
            super::DerivationStatus::Unstarted
        ));
    }

    // Searched on its own, G needs itself strictly through P and B.
    let config = ResolverConfig::default();
    let error = Search::new(&catalog, &config, &mut cache)
        .run(&goal("G"))
        .expect_err("cyclic");
    assert_eq!(error.kind(), "cyclic-rule");
    assert_eq!(error.goal(), &goal("G"));
}

#[test]
fn test_most_specific() {
    use crate::catalog::{CatalogBuilder, RuleSpec};
    use crate::term::TypeVar;
    use crate::value::value;

    let a = TypeVar::new("a");
    let int_list = TypeTerm::app("List", vec![TypeTerm::con("Int")]);
    let catalog = CatalogBuilder::new()
        .rule("core", RuleSpec::new("int", TypeTerm::con("Int"), |_| Ok(value(()))))
        .rule(
            "core",
            RuleSpec::new("list", TypeTerm::app("List", vec![a.term()]), |_| Ok(value(())))
                .requires(a.term()),
        )
        .rule("core", RuleSpec::new("int_list", int_list.clone(), |_| Ok(value(()))))
        .build()
        .expect("ok");

    let (strict, _) = search(&catalog, &int_list);
    assert_eq!(strict.expect_err("ambiguous").kind(), "ambiguous");

    let config = ResolverConfig::default().with_tie_break(TieBreak::MostSpecific);
    let mut cache = DerivationCache::default();
    let outcome = Search::new(&catalog, &config, &mut cache).run(&int_list);
    assert_eq!(outcome.expect("ok").rule(), "core::int_list");
}
