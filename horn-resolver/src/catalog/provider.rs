use super::RuleSpec;

/// A rule provider is any named group of rules a host wants to expose
/// to resolution, e.g., all the rules of a pickler.
pub trait RuleProvider {
    /// The provider name qualifies its rules' names in diagnostics.
    fn provider_name(&self) -> &str;

    /// Enumerates the provider's rules.  The builder calls this
    /// exactly once per registered provider.
    fn rules(&self) -> Vec<RuleSpec>;
}

/// A `RuleSet` is the simplest `RuleProvider`: a name and a list of
/// rules.
#[derive(Clone, Debug)]
pub struct RuleSet {
    name: String,
    rules: Vec<RuleSpec>,
}

impl RuleSet {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule(mut self, spec: RuleSpec) -> Self {
        self.rules.push(spec);
        self
    }

    pub fn push(&mut self, spec: RuleSpec) {
        self.rules.push(spec);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleProvider for RuleSet {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn rules(&self) -> Vec<RuleSpec> {
        self.rules.clone()
    }
}
