#![forbid(unsafe_code)]

use rrx_tracker::{BoxError, TrackerError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatcherError>;

#[derive(Debug, Error)]
pub enum MatcherError {
    /// The engine failed while the matcher was being activated.
    #[error("match engine failed: {0}")]
    Engine(#[source] BoxError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl MatcherError {
    /// The engine's own error, if it has type `E`.
    #[must_use]
    pub fn engine_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Engine(source) => source.downcast_ref::<E>(),
            Self::Tracker(TrackerError::Computation { source, .. }) => source.downcast_ref::<E>(),
            Self::Tracker(_) => None,
        }
    }
}
