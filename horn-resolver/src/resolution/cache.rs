use super::factory::Derivation;
use crate::diagnostics::{GoalChain, ResolveError};
use crate::term::TypeTerm;
use fxhash::FxHashMap;
use serde::Serialize;
use std::sync::{Arc, OnceLock};

/// What a goal's derivation turned out to be, once its search is over.
pub(crate) type Outcome = Result<Arc<Derivation>, Arc<ResolveError>>;

/// A forward reference to the derivation of a goal that is still being
/// searched.  Deferrable requirements that cycle back to the goal
/// link to the promise; it is kept exactly once, when the goal's own
/// search picks a rule.
pub(crate) struct Promise {
    goal: TypeTerm,
    derivation: OnceLock<Arc<Derivation>>,
}

impl Promise {
    pub(crate) fn new(goal: &TypeTerm) -> Self {
        Self {
            goal: goal.clone(),
            derivation: OnceLock::new(),
        }
    }

    pub(crate) fn goal(&self) -> &TypeTerm {
        &self.goal
    }

    pub(crate) fn fulfill(&self, derivation: &Arc<Derivation>) {
        let _ = self.derivation.set(derivation.clone());
    }

    pub(crate) fn derivation(&self) -> Option<&Arc<Derivation>> {
        self.derivation.get()
    }
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("goal", &self.goal.to_string())
            .field("fulfilled", &self.derivation.get().is_some())
            .finish()
    }
}

/// Per-goal search state.  A goal without an entry is unstarted.
#[derive(Clone, Debug)]
pub(crate) enum DerivationState {
    /// The goal owns stack frame `frame` of the running search.
    InProgress { frame: usize, promise: Arc<Promise> },
    /// The search for the goal is over, but its outcome depends on the
    /// goal at stack frame `low`, which is still in progress.
    Provisional {
        low: usize,
        outcome: Outcome,
        chain: GoalChain,
    },
    Resolved(Arc<Derivation>),
    Failed(Arc<ResolveError>),
}

/// Public view of a goal's state.
#[derive(Clone, Debug)]
pub enum DerivationStatus {
    Unstarted,
    /// Only observable while a search is running.
    InProgress,
    Resolved,
    Failed(ResolveError),
}

impl DerivationStatus {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, DerivationStatus::Resolved)
    }
}

/// Session counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CacheStats {
    /// Goals with a state entry.
    pub entries: usize,
    pub resolved: usize,
    pub failed: usize,
    /// Lookups answered from an existing entry.
    pub hits: u64,
    /// Lookups that started a search.
    pub misses: u64,
}

/// Maps ground goals to their derivation state, for one session.
#[derive(Debug, Default)]
pub(crate) struct DerivationCache {
    states: FxHashMap<TypeTerm, DerivationState>,
    hits: u64,
    misses: u64,
}

impl DerivationCache {
    pub(crate) fn get(&self, goal: &TypeTerm) -> Option<&DerivationState> {
        self.states.get(goal)
    }

    pub(crate) fn set(&mut self, goal: &TypeTerm, state: DerivationState) {
        self.states.insert(goal.clone(), state);
    }

    pub(crate) fn remove(&mut self, goal: &TypeTerm) {
        self.states.remove(goal);
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Moves the provisional entry for `goal` to depend on frame `low`.
    pub(crate) fn relink(&mut self, goal: &TypeTerm, low: usize) {
        if let Some(DerivationState::Provisional { low: current, .. }) = self.states.get_mut(goal) {
            *current = low;
        }
    }

    /// Makes the provisional entry for `goal` final, now that the
    /// frame it depended on is done.  A provisional failure only
    /// stands if that frame failed too; otherwise it is forgotten and
    /// the goal will be searched afresh.
    pub(crate) fn settle(&mut self, goal: &TypeTerm, root_resolved: bool) {
        let state = match self.states.remove(goal) {
            Some(DerivationState::Provisional { outcome, .. }) => match outcome {
                Ok(derivation) => DerivationState::Resolved(derivation),
                Err(_) if root_resolved => return,
                Err(error) => DerivationState::Failed(error),
            },
            Some(other) => other,
            None => return,
        };

        self.states.insert(goal.clone(), state);
    }

    pub(crate) fn status(&self, goal: &TypeTerm) -> DerivationStatus {
        match self.states.get(goal) {
            None => DerivationStatus::Unstarted,
            Some(DerivationState::InProgress { .. }) | Some(DerivationState::Provisional { .. }) => {
                DerivationStatus::InProgress
            }
            Some(DerivationState::Resolved(_)) => DerivationStatus::Resolved,
            Some(DerivationState::Failed(error)) => DerivationStatus::Failed((**error).clone()),
        }
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            entries: self.states.len(),
            hits: self.hits,
            misses: self.misses,
            ..CacheStats::default()
        };

        for state in self.states.values() {
            match state {
                DerivationState::Resolved(_) => stats.resolved += 1,
                DerivationState::Failed(_) => stats.failed += 1,
                _ => {}
            }
        }

        stats
    }
}

#[test]
fn test_settle_provisional() {
    let mut cache = DerivationCache::default();
    let goal = TypeTerm::con("Node");
    let error = Arc::new(ResolveError::NonGroundGoal { goal: goal.clone() });

    cache.set(
        &goal,
        DerivationState::Provisional {
            low: 2,
            outcome: Err(error.clone()),
            chain: GoalChain::default(),
        },
    );
    cache.relink(&goal, 0);
    assert!(matches!(
        cache.get(&goal),
        Some(DerivationState::Provisional { low: 0, .. })
    ));
    assert!(matches!(cache.status(&goal), DerivationStatus::InProgress));

    // The frame it depended on resolved: the failure is dropped.
    cache.settle(&goal, true);
    assert!(matches!(cache.status(&goal), DerivationStatus::Unstarted));

    cache.set(
        &goal,
        DerivationState::Provisional {
            low: 0,
            outcome: Err(error),
            chain: GoalChain::default(),
        },
    );
    cache.settle(&goal, false);
    assert!(matches!(cache.status(&goal), DerivationStatus::Failed(_)));
    assert_eq!(
        cache.stats(),
        CacheStats {
            entries: 1,
            resolved: 0,
            failed: 1,
            hits: 0,
            misses: 0,
        }
    );
}
