//! Rules are data-driven, so the values they produce and consume are
//! type-erased: a `Value` is a shared `Any`.  Rule handles downcast
//! their inputs back to the concrete Rust types they expect.
//!
//! A body requirement declared as deferrable is always handed to its
//! rule as a `Deferred` handle.  The handle is already fulfilled,
//! unless the requirement closes a cycle back to a goal whose value is
//! still being built; in that case it is fulfilled with that value as
//! soon as the goal's rule returns.  Rules must thus not read deferred
//! inputs while they construct their result, only later (e.g., when a
//! pickler actually runs).
use crate::term::TypeTerm;
use smallvec::SmallVec;
use std::any::Any;
use std::sync::{Arc, OnceLock};

/// A value of some resolved goal type.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wraps `value` as a `Value`.
pub fn value<T: Any + Send + Sync>(value: T) -> Value {
    Arc::new(value)
}

/// Failure reported by a rule's invocation handle.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvocationError {
    #[error("rule `{rule}` has no input at position {index}")]
    MissingInput { rule: String, index: usize },
    #[error("input {index} of rule `{rule}` is deferred, not ready")]
    NotReady { rule: String, index: usize },
    #[error("input {index} of rule `{rule}` is not a `{expected}`")]
    TypeMismatch {
        rule: String,
        index: usize,
        expected: &'static str,
    },
    #[error("{0}")]
    Custom(String),
}

impl InvocationError {
    pub fn custom<S: Into<String>>(message: S) -> Self {
        InvocationError::Custom(message.into())
    }
}

/// A forward reference to the value of `goal`.
#[derive(Clone)]
pub struct Deferred {
    goal: TypeTerm,
    cell: Arc<OnceLock<Value>>,
}

impl Deferred {
    pub(crate) fn pending(goal: &TypeTerm) -> Self {
        Self {
            goal: goal.clone(),
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn fulfilled(goal: &TypeTerm, value: Value) -> Self {
        let ret = Self::pending(goal);
        ret.fulfill(value);
        ret
    }

    /// Sets the value once.  Returns false if it was already set.
    pub(crate) fn fulfill(&self, value: Value) -> bool {
        self.cell.set(value).is_ok()
    }

    #[must_use]
    pub fn goal(&self) -> &TypeTerm {
        &self.goal
    }

    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns the value, once the construction that owns it has
    /// completed.
    #[must_use]
    pub fn get(&self) -> Option<&Value> {
        self.cell.get()
    }

    /// Returns the value downcast to `T`, if fulfilled and of type `T`.
    #[must_use]
    pub fn get_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()?.downcast::<T>().ok()
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("goal", &self.goal.to_string())
            .field("fulfilled", &self.is_fulfilled())
            .finish()
    }
}

/// One resolved body requirement, as passed to a rule.
#[derive(Clone, Debug)]
pub enum Input {
    /// Strict requirement: the value is built.
    Ready(Value),
    /// Deferrable requirement.
    Deferred(Deferred),
}

/// The inputs of one rule invocation, in body order.
pub struct Inputs {
    goal: TypeTerm,
    rule: Arc<str>,
    items: SmallVec<[(TypeTerm, Input); 4]>,
}

impl Inputs {
    pub(crate) fn new(
        goal: &TypeTerm,
        rule: &Arc<str>,
        items: SmallVec<[(TypeTerm, Input); 4]>,
    ) -> Self {
        Self {
            goal: goal.clone(),
            rule: rule.clone(),
            items,
        }
    }

    /// The ground goal this invocation produces a value for.
    #[must_use]
    pub fn goal(&self) -> &TypeTerm {
        &self.goal
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// # Errors
    ///
    /// Returns `Err` when there is no input at `index`.
    pub fn input(&self, index: usize) -> Result<&Input, InvocationError> {
        self.items
            .get(index)
            .map(|(_, input)| input)
            .ok_or_else(|| InvocationError::MissingInput {
                rule: self.rule.to_string(),
                index,
            })
    }

    /// Returns the ground sub-goal resolved for the requirement at
    /// `index`.
    #[must_use]
    pub fn subgoal(&self, index: usize) -> Option<&TypeTerm> {
        self.items.get(index).map(|(goal, _)| goal)
    }

    /// Returns the built value of the strict requirement at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the input is missing or deferred.
    pub fn value(&self, index: usize) -> Result<&Value, InvocationError> {
        match self.input(index)? {
            Input::Ready(value) => Ok(value),
            Input::Deferred(_) => Err(InvocationError::NotReady {
                rule: self.rule.to_string(),
                index,
            }),
        }
    }

    /// Returns the strict input at `index`, downcast to `T`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the input is missing, deferred, or not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, InvocationError> {
        self.value(index)?
            .clone()
            .downcast::<T>()
            .map_err(|_| InvocationError::TypeMismatch {
                rule: self.rule.to_string(),
                index,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Returns the deferred handle at `index`.  Strict inputs are
    /// wrapped in an already fulfilled handle.
    ///
    /// # Errors
    ///
    /// Returns `Err` when there is no input at `index`.
    pub fn deferred(&self, index: usize) -> Result<Deferred, InvocationError> {
        match self.items.get(index) {
            Some((_, Input::Deferred(handle))) => Ok(handle.clone()),
            Some((goal, Input::Ready(value))) => Ok(Deferred::fulfilled(goal, value.clone())),
            None => Err(InvocationError::MissingInput {
                rule: self.rule.to_string(),
                index,
            }),
        }
    }
}

#[test]
fn test_deferred_fulfill_once() {
    let goal = TypeTerm::con("Int");
    let handle = Deferred::pending(&goal);

    assert!(!handle.is_fulfilled());
    assert!(handle.get_as::<i64>().is_none());
    assert!(handle.fulfill(value(1i64)));
    assert!(!handle.fulfill(value(2i64)));
    assert_eq!(handle.get_as::<i64>().as_deref(), Some(&1));
    assert!(handle.get_as::<String>().is_none());
}

#[test]
fn test_inputs_accessors() {
    let goal = TypeTerm::con("Pair");
    let rule: Arc<str> = "test::pair".into();
    let node = TypeTerm::con("Node");
    let pending = Deferred::pending(&node);
    let mut items = SmallVec::new();
    items.push((TypeTerm::con("Int"), Input::Ready(value(7i64))));
    items.push((node.clone(), Input::Deferred(pending)));
    let inputs = Inputs::new(&goal, &rule, items);

    assert_eq!(inputs.len(), 2);
    assert_eq!(*inputs.get::<i64>(0).expect("ok"), 7);
    assert!(matches!(
        inputs.get::<String>(0),
        Err(InvocationError::TypeMismatch { index: 0, .. })
    ));
    assert!(matches!(
        inputs.value(1),
        Err(InvocationError::NotReady { index: 1, .. })
    ));
    assert!(!inputs.deferred(1).expect("ok").is_fulfilled());
    assert!(inputs.deferred(0).expect("ok").is_fulfilled());
    assert_eq!(inputs.deferred(0).expect("ok").goal(), &TypeTerm::con("Int"));
    assert_eq!(inputs.subgoal(1), Some(&node));
    assert!(matches!(
        inputs.input(2),
        Err(InvocationError::MissingInput { index: 2, .. })
    ));
}
