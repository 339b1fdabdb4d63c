#![forbid(unsafe_code)]

//! Reactive route matching.
//!
//! [`ReactiveMatcher`] turns a [`MatchEngine`] and a reactive input (for
//! example the current location held in a [`Var`](rrx_tracker::Var)) into a
//! single memoized value: the match for the current input.
//!
//! # Architecture
//!
//! ```text
//! input changes ─▶ matcher computation invalidated ─▶ flush
//!   ─▶ read input, ask engine ─▶ result differs? ─▶ readers invalidated
//! ```
//!
//! The matcher owns one [`Computation`](rrx_tracker::Computation), started
//! lazily on the first read or explicit invalidation. Readers of
//! [`ReactiveMatcher::current_match`] are only re-run when the cached match
//! actually changes, as decided by the engine's `PartialEq` on its results.
//!
//! # Invariants
//!
//! 1. The engine is never consulted before the first `current_match()` or
//!    `invalidate()`.
//! 2. The cached match is replaced only after a full, successful
//!    does-match/match cycle.
//! 3. After `stop()` the engine is never consulted again and no reader is
//!    ever notified again.

pub mod engine;
pub mod error;
pub mod matcher;

pub use engine::MatchEngine;
pub use error::MatcherError;
pub use matcher::{CachedMatch, ReactiveMatcher};
