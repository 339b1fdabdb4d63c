#![forbid(unsafe_code)]

//! Test harness for rrx.
//!
//! Provides match engines with observable side effects so integration tests
//! can assert exactly when, how often and with what the reactive layer
//! consults its engine:
//!
//! - [`FnEngine`]: an engine assembled from closures.
//! - [`RecordingEngine`]: exact-match rule table that records every call and
//!   can be switched into a failing state.
//! - [`Observer`]: a computation that reads a matcher and counts its re-runs.

pub mod engine;
pub mod observer;

pub use engine::{EngineProbe, FnEngine, HarnessError, RecordingEngine, RouteHit};
pub use observer::Observer;
