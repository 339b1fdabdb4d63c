#![forbid(unsafe_code)]

//! rrx public facade crate.
//!
//! This crate provides the stable surface area for users: the dependency
//! tracker and, with the default `router` feature, the reactive matcher.

pub use rrx_tracker::{
    BoxError, Computation, ComputationId, Dependency, ErrorPolicy, FlushStats, Tracker,
    TrackerConfig, TrackerError, Var,
};

#[cfg(feature = "router")]
pub use rrx_router::{CachedMatch, MatchEngine, MatcherError, ReactiveMatcher};

pub mod prelude {
    #[cfg(feature = "router")]
    pub use rrx_router as router;
    pub use rrx_tracker as tracker;

    #[cfg(feature = "router")]
    pub use rrx_router::{MatchEngine, ReactiveMatcher};
    pub use rrx_tracker::{Tracker, Var};
}
