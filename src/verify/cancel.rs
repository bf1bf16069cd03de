//! Cooperative cancellation for verification jobs.
//!
//! The loop calls [`CancellationToken::checkpoint`] before every provider
//! call.  A token trips when [`cancel`](CancellationToken::cancel) is called
//! on any clone, or when its deadline passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable cancellation handle.  All clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// A token with no deadline that only trips on [`cancel`](Self::cancel).
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also trips once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// A token that trips `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Trip the token for every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.checkpoint().is_err()
    }

    /// `Err(reason)` once the token has tripped.
    pub fn checkpoint(&self) -> Result<(), String> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err("job cancelled".to_owned());
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err("job deadline exceeded".to_owned());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_checkpoint() {
        let token = CancellationToken::new();
        assert!(token.checkpoint().is_ok());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert_eq!(token.checkpoint(), Err("job cancelled".to_owned()));
    }

    #[test]
    fn past_deadline_trips() {
        let token = CancellationToken::with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(token.checkpoint(), Err("job deadline exceeded".to_owned()));
    }

    #[test]
    fn future_deadline_does_not_trip() {
        let token = CancellationToken::with_timeout(Duration::from_secs(3600));
        assert!(!token.is_cancelled());
        assert!(token.deadline().is_some());
    }
}
