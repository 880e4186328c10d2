//! Request context carrying an optional deadline.

use std::time::Duration;

use tokio::time::Instant;

/// Caller-supplied context for a request.
///
/// The only thing a context bounds is time: the effective deadline of a
/// request is the earlier of its own timeout and the context deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    /// A context without a deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Combine the context deadline with a request timeout measured from `now`.
    ///
    /// A zero timeout means "no timeout of its own".
    pub(crate) fn effective_deadline(&self, now: Instant, timeout: Duration) -> Option<Instant> {
        let own = (!timeout.is_zero()).then(|| now + timeout);
        match (own, self.deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
