#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rrx_router::MatchEngine;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("engine failure injected for target {target:?}")]
    Injected { target: String },
}

/// Shared call counters for an engine.
///
/// Cloning yields another view on the same counters, so a test can keep a
/// probe after moving the engine into a matcher.
#[derive(Debug, Clone, Default)]
pub struct EngineProbe {
    does_match: Rc<Cell<u32>>,
    matches: Rc<Cell<u32>>,
    rules: Rc<RefCell<Vec<String>>>,
}

impl EngineProbe {
    /// Calls to `does_match`.
    #[must_use]
    pub fn does_match_calls(&self) -> u32 {
        self.does_match.get()
    }

    /// Calls to `match_target`.
    #[must_use]
    pub fn match_calls(&self) -> u32 {
        self.matches.get()
    }

    /// Total engine consultations.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.does_match_calls() + self.match_calls()
    }

    /// Rules passed to `add_route`, in order.
    #[must_use]
    pub fn added_rules(&self) -> Vec<String> {
        self.rules.borrow().clone()
    }

    fn hit_does_match(&self) {
        self.does_match.set(self.does_match.get() + 1);
    }

    fn hit_match(&self) {
        self.matches.set(self.matches.get() + 1);
    }
}

/// Result of a [`RecordingEngine`] match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHit {
    pub route: String,
}

/// Exact-match rule table with call recording and failure injection.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    routes: Vec<String>,
    probe: EngineProbe,
    failing: bool,
}

impl RecordingEngine {
    #[must_use]
    pub fn new<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            routes: routes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    /// Make every following `does_match` fail until reset.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    #[must_use]
    pub fn routes(&self) -> &[String] {
        &self.routes
    }
}

impl MatchEngine for RecordingEngine {
    type Target = String;
    type Rule = String;
    type Match = RouteHit;
    type Error = HarnessError;

    fn does_match(&self, target: &String) -> Result<bool, HarnessError> {
        self.probe.hit_does_match();
        if self.failing {
            return Err(HarnessError::Injected {
                target: target.clone(),
            });
        }
        Ok(self.routes.iter().any(|route| route == target))
    }

    fn match_target(&self, target: &String) -> Result<RouteHit, HarnessError> {
        self.probe.hit_match();
        Ok(RouteHit {
            route: target.clone(),
        })
    }

    fn add_route(&mut self, rule: String) {
        self.probe.rules.borrow_mut().push(rule.clone());
        self.routes.push(rule);
    }
}

type Predicate<T> = Box<dyn Fn(&T) -> bool>;
type Classifier<T, M> = Box<dyn Fn(&T) -> M>;

/// An engine assembled from two closures.
///
/// Rules are stored but never consulted; tests that care about `add_route`
/// inspect [`FnEngine::rules`].
pub struct FnEngine<T, M, R = String> {
    does_match: Predicate<T>,
    classify: Classifier<T, M>,
    rules: Vec<R>,
    probe: EngineProbe,
}

impl<T, M, R> FnEngine<T, M, R> {
    pub fn new(
        does_match: impl Fn(&T) -> bool + 'static,
        classify: impl Fn(&T) -> M + 'static,
    ) -> Self {
        Self {
            does_match: Box::new(does_match),
            classify: Box::new(classify),
            rules: Vec::new(),
            probe: EngineProbe::default(),
        }
    }

    #[must_use]
    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    #[must_use]
    pub fn rules(&self) -> &[R] {
        &self.rules
    }
}

impl<T, M, R> MatchEngine for FnEngine<T, M, R>
where
    M: Clone + PartialEq,
{
    type Target = T;
    type Rule = R;
    type Match = M;
    type Error = std::convert::Infallible;

    fn does_match(&self, target: &T) -> Result<bool, Self::Error> {
        self.probe.hit_does_match();
        Ok((self.does_match)(target))
    }

    fn match_target(&self, target: &T) -> Result<M, Self::Error> {
        self.probe.hit_match();
        Ok((self.classify)(target))
    }

    fn add_route(&mut self, rule: R) {
        self.rules.push(rule);
    }
}
