//! Session configuration.
//!
//! ```
//! use horn_resolver::config::{ResolverConfig, TieBreak};
//!
//! let config = ResolverConfig::default()
//!     .with_max_depth(Some(32))
//!     .with_tie_break(TieBreak::MostSpecific);
//! assert_eq!(config.max_depth, Some(32));
//! ```
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default bound on the goal stack.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Overrides `max_depth`; `none` or `0` removes the bound.
pub const MAX_DEPTH_ENV: &str = "HORN_RESOLVER_MAX_DEPTH";
/// Overrides `tie_break`: `strict` or `most_specific`.
pub const TIE_BREAK_ENV: &str = "HORN_RESOLVER_TIE_BREAK";

/// What to do when more than one candidate rule produces a full proof
/// for the same goal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Always report `Ambiguous`.
    Strict,
    /// Commit to the candidate whose head is strictly more specific
    /// than every other succeeding candidate's head; report
    /// `Ambiguous` when there is no such candidate.
    MostSpecific,
}

impl Default for TieBreak {
    fn default() -> Self {
        TieBreak::Strict
    }
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(TieBreak::Strict),
            "most_specific" | "most-specific" => Ok(TieBreak::MostSpecific),
            other => Err(format!("unknown tie-break policy `{}`", other)),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of nested goals; `None` disables the bound, in
    /// which case rule sets without base case never terminate.
    pub max_depth: Option<usize>,
    pub tie_break: TieBreak,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            tie_break: TieBreak::Strict,
        }
    }
}

impl ResolverConfig {
    /// Returns the default configuration, overridden by the
    /// `HORN_RESOLVER_*` environment variables that are set and parse.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().overlay_env()
    }

    /// Overrides fields from the environment.
    #[must_use]
    pub fn overlay_env(mut self) -> Self {
        if let Some(MaxDepth(max_depth)) = env_var(MAX_DEPTH_ENV) {
            self.max_depth = max_depth;
        }

        if let Some(tie_break) = env_var::<TieBreak>(TIE_BREAK_ENV) {
            self.tie_break = tie_break;
        }

        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}

/// Parses an environment variable into a type that implements
/// `FromStr`.  Returns `None` if the variable is not set or cannot be
/// parsed; the latter is logged.
fn env_var<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, value = %raw, %error, "config: ignoring unparsable environment variable");
            None
        }
    }
}

/// The `max_depth` override; `MaxDepth(None)` means "no bound".
#[derive(Debug, Eq, PartialEq)]
struct MaxDepth(Option<usize>);

impl FromStr for MaxDepth {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(MaxDepth(None));
        }

        match s.parse::<usize>()? {
            0 => Ok(MaxDepth(None)),
            depth => Ok(MaxDepth(Some(depth))),
        }
    }
}

#[test]
fn test_defaults() {
    let config = ResolverConfig::default();

    assert_eq!(config.max_depth, Some(DEFAULT_MAX_DEPTH));
    assert_eq!(config.tie_break, TieBreak::Strict);
}

#[test]
fn test_parse_max_depth() {
    assert_eq!("17".parse::<MaxDepth>(), Ok(MaxDepth(Some(17))));
    assert_eq!(" none ".parse::<MaxDepth>(), Ok(MaxDepth(None)));
    assert_eq!("0".parse::<MaxDepth>(), Ok(MaxDepth(None)));
    assert!("deep".parse::<MaxDepth>().is_err());
}

#[test]
fn test_env_var_rejects_unparsable() {
    // Keys private to this test, so parallel tests never see them.
    std::env::set_var("HORN_RESOLVER_TEST_TIE_BREAK", "loose");
    std::env::set_var("HORN_RESOLVER_TEST_MAX_DEPTH", "deep");
    std::env::set_var("HORN_RESOLVER_TEST_TIE_BREAK_OK", "most_specific");

    assert_eq!(env_var::<TieBreak>("HORN_RESOLVER_TEST_TIE_BREAK"), None);
    assert_eq!(env_var::<MaxDepth>("HORN_RESOLVER_TEST_MAX_DEPTH"), None);
    assert_eq!(
        env_var::<TieBreak>("HORN_RESOLVER_TEST_TIE_BREAK_OK"),
        Some(TieBreak::MostSpecific)
    );
    assert_eq!(env_var::<TieBreak>("HORN_RESOLVER_TEST_UNSET"), None);
}

#[test]
fn test_tie_break_from_str() {
    assert_eq!("strict".parse::<TieBreak>(), Ok(TieBreak::Strict));
    assert_eq!("Most-Specific".parse::<TieBreak>(), Ok(TieBreak::MostSpecific));
    assert!("loose".parse::<TieBreak>().is_err());
}

#[test]
fn test_deserialize_partial() {
    let config: ResolverConfig =
        serde_json::from_str(r#"{"tie_break": "most_specific"}"#).expect("ok");
    assert_eq!(config.max_depth, Some(DEFAULT_MAX_DEPTH));
    assert_eq!(config.tie_break, TieBreak::MostSpecific);

    let unbounded: ResolverConfig = serde_json::from_str(r#"{"max_depth": null}"#).expect("ok");
    assert_eq!(unbounded.max_depth, None);
}
