#![forbid(unsafe_code)]

use thiserror::Error;

use crate::computation::ComputationId;

/// Boxed error returned by a fallible computation body.
///
/// No `Send` bound: computations never leave the thread that owns their
/// tracker.
pub type BoxError = Box<dyn std::error::Error + 'static>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("computation {id} failed: {source}")]
    Computation {
        id: ComputationId,
        #[source]
        source: BoxError,
    },

    #[error("flush did not settle after {rounds} rounds")]
    FlushLimit { rounds: usize },

    #[error("flush called while a computation is running or a flush is in progress")]
    ReentrantFlush,
}

impl TrackerError {
    /// The failing computation, if this error came from one.
    #[must_use]
    pub fn computation_id(&self) -> Option<ComputationId> {
        match self {
            Self::Computation { id, .. } => Some(*id),
            _ => None,
        }
    }
}
