//! Errors for catalog construction and resolution, and their
//! rendering as readable "derivation stack traces".
//!
//! Every resolution-time error carries the chain of parent goals that
//! led to the failing goal.  `NoRule` also lists, for each candidate
//! rule, how far it got: the unification mismatch, or the body
//! requirement that failed and why, recursively.
use crate::term::{Constructor, TypeTerm, TypeVar};
use crate::unification::{Mismatch, UnboundVariable};
use crate::value::InvocationError;
use serde::Serialize;
use std::sync::Arc;

/// Nested causes deeper than this are elided from reports.
const REPORT_DEPTH: usize = 16;

/// Build-time errors.  Any of these is fatal to catalog construction.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("malformed rule `{rule}`: {reason}")]
    MalformedRule {
        rule: String,
        reason: MalformedReason,
    },
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MalformedReason {
    #[error("rule name is empty")]
    EmptyName,
    #[error("head is the bare type variable `{0}`")]
    VariableHead(TypeVar),
    #[error("a constructor name is empty")]
    EmptyConstructor,
    #[error("body variable `{0}` does not occur in the head")]
    UnboundBodyVariable(TypeVar),
    #[error("`{constructor}` is used with {found} argument(s), but elsewhere with {expected}")]
    ArityConflict {
        constructor: Constructor,
        expected: usize,
        found: usize,
    },
    #[error("a rule with the same qualified name is already registered")]
    Duplicate,
}

/// The goals being resolved when an error occurred, outermost first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GoalChain(Vec<TypeTerm>);

impl GoalChain {
    pub(crate) fn new(goals: Vec<TypeTerm>) -> Self {
        Self(goals)
    }

    #[must_use]
    pub fn goals(&self) -> &[TypeTerm] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replaces the leading `old` goals with `new`.  Returns `None` if
    /// the chain does not start with `old`.
    fn rebase(&self, old: &GoalChain, new: &GoalChain) -> Option<GoalChain> {
        let rest = self.0.strip_prefix(old.goals())?;
        Some(Self(new.0.iter().chain(rest).cloned().collect()))
    }
}

impl std::fmt::Display for GoalChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, goal) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", goal)?;
        }
        Ok(())
    }
}

/// One candidate rule that unified with (or was indexed for) a goal,
/// and did not produce a proof.
#[derive(Clone, Debug)]
pub struct Attempt {
    /// Qualified rule name.
    pub rule: String,
    pub failure: AttemptFailure,
}

#[derive(Clone, Debug)]
pub enum AttemptFailure {
    /// The head did not match the goal.
    Unification(Mismatch),
    /// A body pattern mentioned a variable the head did not bind.
    Unbound(UnboundVariable),
    /// A strict body requirement needs a goal that is still being
    /// resolved.
    Cycle { requirement: usize, goal: TypeTerm },
    /// A body requirement failed to resolve.
    Subgoal {
        requirement: usize,
        goal: TypeTerm,
        error: Arc<ResolveError>,
    },
}

impl AttemptFailure {
    /// Returns true when the head unified, i.e., the rule really was
    /// a candidate for the goal.
    #[must_use]
    pub fn unified(&self) -> bool {
        !matches!(self, AttemptFailure::Unification(_))
    }

    /// Returns the goal cycled on, if this failure is due to a strict
    /// cycle (directly, or in a sub-goal).
    #[must_use]
    pub fn cycle_goal(&self) -> Option<&TypeTerm> {
        match self {
            AttemptFailure::Cycle { goal, .. } => Some(goal),
            AttemptFailure::Subgoal { error, .. } => match &**error {
                ResolveError::CyclicRule { goal, .. } => Some(goal),
                _ => None,
            },
            _ => None,
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Unification(mismatch) => write!(f, "head does not match: {}", mismatch),
            AttemptFailure::Unbound(unbound) => write!(f, "{}", unbound),
            AttemptFailure::Cycle { requirement, goal } => write!(
                f,
                "requirement {} needs `{}` strictly, which is still being resolved",
                requirement, goal
            ),
            AttemptFailure::Subgoal {
                requirement,
                goal,
                error,
            } => write!(f, "requirement {} (`{}`): {}", requirement, goal, error),
        }
    }
}

/// Resolution-time errors.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no rule resolves `{goal}`")]
    NoRule {
        goal: TypeTerm,
        chain: GoalChain,
        attempted: Vec<Attempt>,
    },
    #[error("`{goal}` is ambiguous: {} rules each produce a proof", .candidates.len())]
    Ambiguous {
        goal: TypeTerm,
        chain: GoalChain,
        candidates: Vec<String>,
    },
    #[error("`{goal}` requires its own completed value (via {})", .rules.join(", "))]
    CyclicRule {
        goal: TypeTerm,
        chain: GoalChain,
        rules: Vec<String>,
    },
    #[error("resolving `{goal}` exceeded the depth limit of {limit}")]
    DepthExceeded {
        goal: TypeTerm,
        chain: GoalChain,
        limit: usize,
    },
    #[error("goal `{goal}` is not a ground type")]
    NonGroundGoal { goal: TypeTerm },
    #[error("rule `{rule}` failed to build `{goal}`: {source}")]
    Invocation {
        goal: TypeTerm,
        rule: String,
        #[source]
        source: InvocationError,
    },
    #[error("`{goal}` resolved to a value that is not a `{expected}`")]
    ValueType {
        goal: TypeTerm,
        expected: &'static str,
    },
}

impl ResolveError {
    /// The goal the error is about.
    #[must_use]
    pub fn goal(&self) -> &TypeTerm {
        match self {
            ResolveError::NoRule { goal, .. }
            | ResolveError::Ambiguous { goal, .. }
            | ResolveError::CyclicRule { goal, .. }
            | ResolveError::DepthExceeded { goal, .. }
            | ResolveError::NonGroundGoal { goal }
            | ResolveError::Invocation { goal, .. }
            | ResolveError::ValueType { goal, .. } => goal,
        }
    }

    /// The parent goals, for errors raised during search.
    #[must_use]
    pub fn chain(&self) -> Option<&GoalChain> {
        match self {
            ResolveError::NoRule { chain, .. }
            | ResolveError::Ambiguous { chain, .. }
            | ResolveError::CyclicRule { chain, .. }
            | ResolveError::DepthExceeded { chain, .. } => Some(chain),
            _ => None,
        }
    }

    /// Short stable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::NoRule { .. } => "no-rule",
            ResolveError::Ambiguous { .. } => "ambiguous",
            ResolveError::CyclicRule { .. } => "cyclic-rule",
            ResolveError::DepthExceeded { .. } => "depth-exceeded",
            ResolveError::NonGroundGoal { .. } => "non-ground-goal",
            ResolveError::Invocation { .. } => "invocation",
            ResolveError::ValueType { .. } => "value-type",
        }
    }

    #[must_use]
    pub fn is_depth_exceeded(&self) -> bool {
        matches!(self, ResolveError::DepthExceeded { .. })
    }

    /// Copies the error with every chain that starts with `old`
    /// starting with `new` instead, down to `depth` nested causes.
    fn rebase(&self, old: &GoalChain, new: &GoalChain, depth: usize) -> ResolveError {
        let mut error = self.clone();
        match &mut error {
            ResolveError::NoRule {
                chain, attempted, ..
            } => {
                if let Some(rebased) = chain.rebase(old, new) {
                    *chain = rebased;
                }
                if depth > 0 {
                    for attempt in attempted.iter_mut() {
                        if let AttemptFailure::Subgoal { error, .. } = &mut attempt.failure {
                            *error = Arc::new(error.rebase(old, new, depth - 1));
                        }
                    }
                }
            }
            ResolveError::Ambiguous { chain, .. }
            | ResolveError::CyclicRule { chain, .. }
            | ResolveError::DepthExceeded { chain, .. } => {
                if let Some(rebased) = chain.rebase(old, new) {
                    *chain = rebased;
                }
            }
            _ => {}
        }
        error
    }

    /// Builds the structured diagnostic for this error.
    #[must_use]
    pub fn report(&self) -> Diagnostic {
        self.report_to_depth(REPORT_DEPTH)
    }

    fn report_to_depth(&self, depth: usize) -> Diagnostic {
        let (candidates, attempts) = match self {
            ResolveError::Ambiguous { candidates, .. } => (candidates.clone(), Vec::new()),
            ResolveError::CyclicRule { rules, .. } => (rules.clone(), Vec::new()),
            ResolveError::NoRule { attempted, .. } => (
                Vec::new(),
                attempted
                    .iter()
                    .map(|attempt| AttemptReport::new(attempt, depth))
                    .collect(),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        Diagnostic {
            kind: self.kind(),
            goal: self.goal().to_string(),
            message: self.to_string(),
            chain: self
                .chain()
                .map(|chain| chain.goals().iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
            candidates,
            attempts,
        }
    }
}

/// Returns `error` as seen from a goal reached through `chain`: a
/// failure is cached once, but may be hit again from other parents.
pub(crate) fn rebased(error: &Arc<ResolveError>, chain: &GoalChain) -> Arc<ResolveError> {
    match error.chain() {
        Some(old) if old != chain => Arc::new(error.rebase(old, chain, REPORT_DEPTH)),
        _ => error.clone(),
    }
}

/// A serializable view of a `ResolveError`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: &'static str,
    pub goal: String,
    pub message: String,
    /// Parent goals, outermost first.
    pub chain: Vec<String>,
    /// Rules that each produced a proof (ambiguity), or that needed
    /// their own result (cycles).
    pub candidates: Vec<String>,
    pub attempts: Vec<AttemptReport>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AttemptReport {
    pub rule: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<Diagnostic>>,
}

impl AttemptReport {
    fn new(attempt: &Attempt, depth: usize) -> Self {
        let (reason, cause) = match &attempt.failure {
            AttemptFailure::Subgoal {
                requirement,
                goal,
                error,
            } => (
                format!("requirement {} (`{}`) failed", requirement, goal),
                if depth > 0 {
                    Some(Box::new(error.report_to_depth(depth - 1)))
                } else {
                    None
                },
            ),
            failure => (failure.to_string(), None),
        };

        Self {
            rule: attempt.rule.clone(),
            reason,
            cause,
        }
    }
}

impl Diagnostic {
    /// Renders the diagnostic as an indented, multi-line trace.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        use std::fmt::Write;

        let pad = "  ".repeat(indent);
        // Writing to a String never fails.
        let _ = writeln!(out, "{}error[{}]: {}", pad, self.kind, self.message);
        if !self.chain.is_empty() {
            let _ = writeln!(out, "{}  while resolving: {}", pad, self.chain.join(" -> "));
        }
        for candidate in &self.candidates {
            let _ = writeln!(out, "{}  candidate: {}", pad, candidate);
        }
        for attempt in &self.attempts {
            let _ = writeln!(out, "{}  tried {}: {}", pad, attempt.rule, attempt.reason);
            if let Some(cause) = &attempt.cause {
                cause.render_into(out, indent + 2);
            }
        }
    }
}

#[test]
fn test_chain_display() {
    let chain = GoalChain::new(vec![
        TypeTerm::app("List", vec![TypeTerm::con("Int")]),
        TypeTerm::con("Int"),
    ]);

    assert_eq!(chain.to_string(), "List<Int> -> Int");
    assert_eq!(chain.len(), 2);
}

#[test]
fn test_report_nesting() {
    let inner = ResolveError::NoRule {
        goal: TypeTerm::con("Float"),
        chain: GoalChain::new(vec![TypeTerm::app("Box", vec![TypeTerm::con("Float")])]),
        attempted: Vec::new(),
    };
    let outer = ResolveError::NoRule {
        goal: TypeTerm::app("Box", vec![TypeTerm::con("Float")]),
        chain: GoalChain::default(),
        attempted: vec![Attempt {
            rule: "core::boxed".into(),
            failure: AttemptFailure::Subgoal {
                requirement: 0,
                goal: TypeTerm::con("Float"),
                error: Arc::new(inner),
            },
        }],
    };

    let report = outer.report();
    assert_eq!(report.kind, "no-rule");
    assert_eq!(report.attempts.len(), 1);
    let cause = report.attempts[0].cause.as_ref().expect("has cause");
    assert_eq!(cause.goal, "Float");
    assert_eq!(cause.chain, vec!["Box<Float>".to_string()]);

    let rendered = report.render();
    assert!(rendered.contains("error[no-rule]: no rule resolves `Box<Float>`"));
    assert!(rendered.contains("tried core::boxed: requirement 0 (`Float`) failed"));
    assert!(rendered.contains("    error[no-rule]: no rule resolves `Float`"));
}

#[test]
fn test_error_messages() {
    let ambiguous = ResolveError::Ambiguous {
        goal: TypeTerm::con("Int"),
        chain: GoalChain::default(),
        candidates: vec!["a::int".into(), "b::int".into()],
    };
    assert_eq!(
        ambiguous.to_string(),
        "`Int` is ambiguous: 2 rules each produce a proof"
    );

    let cyclic = ResolveError::CyclicRule {
        goal: TypeTerm::con("Node"),
        chain: GoalChain::default(),
        rules: vec!["graph::node".into()],
    };
    assert_eq!(
        cyclic.to_string(),
        "`Node` requires its own completed value (via graph::node)"
    );
    assert_eq!(cyclic.report().candidates, vec!["graph::node".to_string()]);
}

#[test]
fn test_rebased_replaces_stale_chain() {
    let float = TypeTerm::con("Float");
    let boxed = TypeTerm::app("Box", vec![float.clone()]);
    let stale = GoalChain::new(vec![TypeTerm::con("Cell")]);
    let inner = ResolveError::NoRule {
        goal: TypeTerm::con("Bits"),
        chain: GoalChain::new(vec![TypeTerm::con("Cell"), float.clone()]),
        attempted: Vec::new(),
    };
    let cached = Arc::new(ResolveError::NoRule {
        goal: float.clone(),
        chain: stale,
        attempted: vec![Attempt {
            rule: "core::float".into(),
            failure: AttemptFailure::Subgoal {
                requirement: 0,
                goal: TypeTerm::con("Bits"),
                error: Arc::new(inner),
            },
        }],
    });

    let here = GoalChain::new(vec![boxed.clone()]);
    let report = rebased(&cached, &here).report();
    assert_eq!(report.chain, vec!["Box<Float>".to_string()]);
    let cause = report.attempts[0].cause.as_ref().expect("has cause");
    assert_eq!(cause.chain, vec!["Box<Float>".to_string(), "Float".to_string()]);

    let root = rebased(&cached, &GoalChain::default());
    assert!(root.chain().expect("has chain").is_empty());
    assert!(Arc::ptr_eq(&rebased(&root, &GoalChain::default()), &root));
}
