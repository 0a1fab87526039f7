//! Span helpers for proxy operations.

use std::future::Future;
use tracing::{field, info_span, Instrument, Span};

/// Span covering one proxied invocation.
///
/// `decision`, `sequence` and `error` start empty and are recorded as the
/// call progresses.
pub fn invoke_span(proxy: &str, role: &str, operation: &str, key: &str) -> Span {
    info_span!(
        "invoke",
        proxy = %proxy,
        role = %role,
        op = %operation,
        key = %key,
        decision = field::Empty,
        sequence = field::Empty,
        error = field::Empty,
    )
}

/// Span covering construction of a lazily initialized resource.
pub fn init_span(resource: &str) -> Span {
    info_span!("init", resource = %resource, attempt = field::Empty, error = field::Empty)
}

/// Instrument a future with a span.
pub fn instrument_future<F: Future>(future: F, span: Span) -> impl Future<Output = F::Output> {
    future.instrument(span)
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", field::display(error));
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Time elapsed so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Complete the timer and record duration.
    pub fn finish(self) -> std::time::Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_us = duration.as_micros() as u64,
            "operation completed"
        );
        duration
    }
}

/// Time a block of code, logging its duration at debug level.
#[macro_export]
macro_rules! timed {
    ($name:expr, $body:expr) => {{
        let _timer = $crate::spans::Timer::start($name);
        let result = $body;
        _timer.finish();
        result
    }};
}

pub use tracing::instrument;
