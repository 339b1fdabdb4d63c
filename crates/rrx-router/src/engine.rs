#![forbid(unsafe_code)]

//! The match engine contract.

/// A rule table that can classify targets.
///
/// The reactive layer never looks inside rules or results. It only relies
/// on the engine being deterministic for a fixed (engine state, target) pair
/// and on `PartialEq` for `Match` expressing "same result". An engine whose
/// results are shared objects can expose identity semantics by returning a
/// wrapper whose `PartialEq` is pointer equality.
///
/// # Implementing `MatchEngine`
///
/// ```
/// use rrx_router::MatchEngine;
///
/// struct Prefixes(Vec<&'static str>);
///
/// impl MatchEngine for Prefixes {
///     type Target = String;
///     type Rule = &'static str;
///     type Match = &'static str;
///     type Error = std::convert::Infallible;
///
///     fn does_match(&self, target: &String) -> Result<bool, Self::Error> {
///         Ok(self.0.iter().any(|p| target.starts_with(p)))
///     }
///
///     fn match_target(&self, target: &String) -> Result<&'static str, Self::Error> {
///         Ok(self.0.iter().copied().find(|p| target.starts_with(p)).unwrap_or_default())
///     }
///
///     fn add_route(&mut self, rule: &'static str) {
///         self.0.push(rule);
///     }
/// }
/// ```
pub trait MatchEngine {
    /// The value being matched, e.g. a path.
    type Target;
    /// A matching criterion.
    type Rule;
    /// The classification of a matching target.
    type Match: Clone + PartialEq;
    type Error: std::error::Error + 'static;

    /// Whether any rule matches `target`.
    fn does_match(&self, target: &Self::Target) -> Result<bool, Self::Error>;

    /// The match for `target`. Only called after `does_match` returned `true`
    /// for the same target and engine state.
    fn match_target(&self, target: &Self::Target) -> Result<Self::Match, Self::Error>;

    /// Register a rule.
    fn add_route(&mut self, rule: Self::Rule);
}
