#![forbid(unsafe_code)]

//! Single-threaded dependency tracking for rrx.
//!
//! This crate provides the push-pull substrate the reactive router is built on:
//!
//! - [`Tracker`]: an explicit scheduling context. It owns the queue of
//!   invalidated computations and resolves them at [`Tracker::flush`].
//! - [`Dependency`]: an observer registry. Readers call
//!   [`depend()`](Dependency::depend), writers call
//!   [`changed()`](Dependency::changed).
//! - [`Computation`]: a subscribed unit of work that re-runs after it has been
//!   invalidated, until it is stopped.
//! - [`Var`]: a reactive cell built from a value and a `Dependency`.
//!
//! # Architecture
//!
//! Everything is `Rc<..>` based and intentionally `!Send`. A `Tracker` is
//! injected into every dependency and computation that belongs to it; there
//! is no process-wide current computation.
//!
//! Invalidation is synchronous and cheap (a flag plus a queue push). The
//! work happens at the next flush, so any number of invalidations of the same
//! computation between two flushes collapse into one re-run.
//!
//! # Invariants
//!
//! 1. A computation is queued at most once per invalidation cycle.
//! 2. Within one flush round, computations run in the order they were
//!    invalidated.
//! 3. A stopped computation never runs again.
//! 4. When a computation is invalidated it is unregistered from every
//!    dependency it read, so dependencies dropped by the next run never
//!    re-trigger it.
//! 5. `Dependency::changed()` clears the dependent set.

pub mod computation;
pub mod config;
pub mod dependency;
pub mod error;
pub mod tracker;
pub mod var;

pub use computation::{Computation, ComputationId};
pub use config::{ErrorPolicy, TrackerConfig};
pub use dependency::Dependency;
pub use error::{BoxError, TrackerError};
pub use tracker::{FlushStats, Tracker};
pub use var::Var;
