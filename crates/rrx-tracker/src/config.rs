#![forbid(unsafe_code)]

//! Tracker configuration.

/// Default upper bound on flush rounds before the tracker gives up.
pub const DEFAULT_MAX_FLUSH_ROUNDS: usize = 100;

/// What a flush does when a computation returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the flush at the first failure. Computations that had not run
    /// yet stay queued for the next flush.
    #[default]
    FailFast,
    /// Run every queued computation, then report the first failure.
    /// Later failures are logged and dropped.
    Isolate,
}

/// Configuration for a [`Tracker`](crate::Tracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Maximum number of rounds a single flush may take.
    ///
    /// A round runs everything that was queued when it started; work
    /// invalidated while it runs lands in the next round. Hitting this limit
    /// almost always means two computations invalidate each other.
    pub max_flush_rounds: usize,
    /// Failure handling inside a flush.
    pub error_policy: ErrorPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_flush_rounds: DEFAULT_MAX_FLUSH_ROUNDS,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Set the flush round limit. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds.max(1);
        self
    }

    /// Set the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}
