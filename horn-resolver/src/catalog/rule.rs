//! A rule is a Horn clause over types:
//!
//! ```text
//! body_1 body_2 ... body_n
//! ------------------------
//!           head
//! ```
//!
//! read as "given values of the body types, the rule produces a value
//! of the head type".  Head and body share one variable scope; the
//! head's variables are the rule's type parameters.
use crate::term::{TypeTerm, TypeVar};
use crate::value::{Inputs, InvocationError, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The invocation handle of a rule: given the values of its body
/// requirements (in order), builds a value of its head.
pub type Invoke = Arc<dyn Fn(&Inputs) -> Result<Value, InvocationError> + Send + Sync>;

/// Dense rule identifier, in registration order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn new(index: usize) -> Self {
        assert!(index <= u32::MAX as usize);
        Self(index as u32)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A body requirement: a pattern for a sub-goal, and whether the rule
/// can accept that sub-goal's value as a `Deferred` handle.  Only
/// deferrable requirements may close a cycle back to a goal that is
/// still being resolved.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Requirement {
    pattern: TypeTerm,
    deferrable: bool,
}

impl Requirement {
    #[must_use]
    pub fn strict(pattern: TypeTerm) -> Self {
        Self {
            pattern,
            deferrable: false,
        }
    }

    #[must_use]
    pub fn deferrable(pattern: TypeTerm) -> Self {
        Self {
            pattern,
            deferrable: true,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &TypeTerm {
        &self.pattern
    }

    #[must_use]
    pub fn is_deferrable(&self) -> bool {
        self.deferrable
    }
}

/// What a provider hands to the `CatalogBuilder`: a rule before
/// validation.
#[derive(Clone)]
pub struct RuleSpec {
    pub(crate) name: String,
    pub(crate) head: TypeTerm,
    pub(crate) body: Vec<Requirement>,
    pub(crate) invoke: Invoke,
}

impl RuleSpec {
    /// Starts a rule `name` that produces `head` by calling `invoke`.
    pub fn new<F>(name: &str, head: TypeTerm, invoke: F) -> Self
    where
        F: Fn(&Inputs) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            head,
            body: Vec::new(),
            invoke: Arc::new(invoke),
        }
    }

    /// Appends a strict body requirement.
    #[must_use]
    pub fn requires(mut self, pattern: TypeTerm) -> Self {
        self.body.push(Requirement::strict(pattern));
        self
    }

    /// Appends a body requirement that the rule accepts as a
    /// `Deferred` handle.
    #[must_use]
    pub fn requires_deferred(mut self, pattern: TypeTerm) -> Self {
        self.body.push(Requirement::deferrable(pattern));
        self
    }

    /// Appends `requirements` in order.
    #[must_use]
    pub fn with_body<I: IntoIterator<Item = Requirement>>(mut self, requirements: I) -> Self {
        self.body.extend(requirements);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn head(&self) -> &TypeTerm {
        &self.head
    }

    #[must_use]
    pub fn body(&self) -> &[Requirement] {
        &self.body
    }
}

impl std::fmt::Debug for RuleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSpec")
            .field("name", &self.name)
            .field("head", &self.head)
            .field("body", &self.body)
            .finish()
    }
}

/// A validated catalog entry.
#[derive(Clone)]
pub struct Rule {
    id: RuleId,
    name: Arc<str>,
    params: BTreeSet<TypeVar>,
    head: TypeTerm,
    body: Vec<Requirement>,
    invoke: Invoke,
}

impl Rule {
    /// Builds the entry for a spec that has already passed validation.
    pub(crate) fn new(id: RuleId, provider: &str, spec: RuleSpec) -> Self {
        let params = spec.head.vars();
        Self {
            id,
            name: format!("{}::{}", provider, spec.name).into(),
            params,
            head: spec.head,
            body: spec.body,
            invoke: spec.invoke,
        }
    }

    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// The qualified name, `provider::rule`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    /// The rule's type parameters: the variables of its head.
    #[must_use]
    pub fn params(&self) -> &BTreeSet<TypeVar> {
        &self.params
    }

    #[must_use]
    pub fn head(&self) -> &TypeTerm {
        &self.head
    }

    #[must_use]
    pub fn body(&self) -> &[Requirement] {
        &self.body
    }

    pub(crate) fn invoke(&self) -> &Invoke {
        &self.invoke
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("head", &self.head)
            .field("body", &self.body)
            .finish()
    }
}

/// Renders the rule as `name : body, ~deferred => head`.
impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : ", self.name)?;
        for (index, requirement) in self.body.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            if requirement.is_deferrable() {
                f.write_str("~")?;
            }
            write!(f, "{}", requirement.pattern())?;
        }
        write!(f, " => {}", self.head)
    }
}

#[test]
fn test_rule_params_and_display() {
    use crate::value::value;

    let a = TypeVar::new("a");
    let b = TypeVar::new("b");
    let spec = RuleSpec::new(
        "pair",
        TypeTerm::app("Pair", vec![a.term(), b.term()]),
        |_| Ok(value(())),
    )
    .requires(a.term())
    .requires_deferred(b.term());

    let rule = Rule::new(RuleId::new(3), "core", spec);

    assert_eq!(rule.id().index(), 3);
    assert_eq!(rule.name(), "core::pair");
    assert_eq!(rule.params().len(), 2);
    assert!(!rule.body()[0].is_deferrable());
    assert!(rule.body()[1].is_deferrable());
    assert_eq!(rule.to_string(), "core::pair : a, ~b => Pair<a, b>");
}
