//! # Fibonacci Backoff
//!
//! Requeue delays for Scalers whose reconcile failed critically.
//!
//! Critical failures (missing credentials, malformed periods) rarely fix
//! themselves quickly, so each Scaler backs off along a Fibonacci sequence:
//! 30s, 30s, 60s, 90s, 150s, 240s, ... capped at the maximum. A successful
//! reconcile resets the Scaler's sequence.

use scaler_engine::ScalerKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    /// Sequence starting at `min` (twice), capped at `max`
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Current delay; advances the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = next.min(self.max);
        delay
    }

    /// Back to the first delay
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

/// Per-Scaler backoff state shared by the reconcile and error-policy closures
#[derive(Debug)]
pub struct BackoffTracker {
    min: Duration,
    max: Duration,
    entries: Mutex<HashMap<ScalerKey, FibonacciBackoff>>,
}

impl BackoffTracker {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before retrying `key` after another critical failure
    pub fn on_failure(&self, key: &ScalerKey) -> Duration {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .entry(key.clone())
            .or_insert_with(|| FibonacciBackoff::new(self.min, self.max))
            .next_delay()
    }

    /// Forget the failure history of `key`
    pub fn on_success(&self, key: &ScalerKey) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
    }
}
