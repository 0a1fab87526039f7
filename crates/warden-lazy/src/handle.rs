//! The lazy handle state machine.

use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing::{info, warn};
use warden_common_log::spans::init_span;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// Lifecycle of a [`LazyHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// No resource yet; the next `get_or_init` runs the factory.
    Uninitialized,
    /// A factory is running.
    Initializing,
    /// The resource exists and never changes again.
    Ready,
}

impl InitState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            READY => Self::Ready,
            INITIALIZING => Self::Initializing,
            _ => Self::Uninitialized,
        }
    }
}

/// Returns the handle to `Uninitialized` unless disarmed, covering both a
/// factory error and a factory panic.
struct ResetOnDrop<'a> {
    state: &'a AtomicU8,
    armed: bool,
}

impl ResetOnDrop<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.store(UNINITIALIZED, Ordering::Release);
        }
    }
}

/// A resource built on first use, exactly once, from any number of threads.
///
/// Readers of a ready handle take no lock. Until then, callers serialize on
/// an internal mutex: the first one in runs its factory while the rest wait,
/// then find the resource ready and return it without running their own.
/// A failing (or panicking) factory leaves the handle uninitialized so a
/// later call can try again.
///
/// ```
/// use warden_lazy::LazyHandle;
///
/// let handle: LazyHandle<Vec<u8>> = LazyHandle::new();
/// let bytes = handle.get_or_init(|| Ok::<_, std::io::Error>(vec![1, 2, 3])).unwrap();
/// assert_eq!(bytes.len(), 3);
/// assert!(handle.is_ready());
/// ```
pub struct LazyHandle<R> {
    label: Cow<'static, str>,
    state: AtomicU8,
    init_lock: Mutex<()>,
    resource: OnceLock<R>,
    attempts: AtomicU64,
}

impl<R> LazyHandle<R> {
    /// An uninitialized handle.
    pub fn new() -> Self {
        Self::labeled("resource")
    }

    /// An uninitialized handle named `label` in logs.
    pub fn labeled(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            state: AtomicU8::new(UNINITIALIZED),
            init_lock: Mutex::new(()),
            resource: OnceLock::new(),
            attempts: AtomicU64::new(0),
        }
    }

    /// A handle that is already ready with `resource`.
    pub fn ready(resource: R) -> Self {
        Self {
            label: Cow::Borrowed("resource"),
            state: AtomicU8::new(READY),
            init_lock: Mutex::new(()),
            resource: OnceLock::from(resource),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return the resource, building it with `factory` if nobody has yet.
    ///
    /// At most one factory runs at a time and at most one ever succeeds. If
    /// the factory fails its error is returned to this caller only and the
    /// handle goes back to `Uninitialized`.
    pub fn get_or_init<F, E>(&self, factory: F) -> Result<&R, E>
    where
        F: FnOnce() -> Result<R, E>,
        E: fmt::Display,
    {
        if self.state.load(Ordering::Acquire) == READY {
            if let Some(resource) = self.resource.get() {
                return Ok(resource);
            }
        }

        let _exclusive = self.init_lock.lock();

        // Another caller may have finished while we waited for the lock.
        if let Some(resource) = self.resource.get() {
            return Ok(resource);
        }

        self.state.store(INITIALIZING, Ordering::Release);
        let reset = ResetOnDrop {
            state: &self.state,
            armed: true,
        };

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let span = init_span(&self.label);
        let _entered = span.enter();
        span.record("attempt", attempt);
        info!(resource = %self.label, attempt, "Initializing resource");

        let built = match factory() {
            Ok(built) => built,
            Err(e) => {
                span.record("error", tracing::field::display(&e));
                warn!(resource = %self.label, attempt, error = %e, "Resource initialization failed");
                return Err(e);
            }
        };

        let resource = self.resource.get_or_init(|| built);
        self.state.store(READY, Ordering::Release);
        reset.disarm();

        info!(resource = %self.label, attempt, "Resource ready");
        Ok(resource)
    }

    /// The resource, if already built. Never runs a factory.
    pub fn get(&self) -> Option<&R> {
        self.resource.get()
    }

    pub fn state(&self) -> InitState {
        InitState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == InitState::Ready
    }

    /// Number of factory invocations so far, successful or not.
    pub fn init_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consume the handle, returning the resource if it was built.
    pub fn into_inner(self) -> Option<R> {
        self.resource.into_inner()
    }
}

impl<R> Default for LazyHandle<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for LazyHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyHandle")
            .field("label", &self.label)
            .field("state", &self.state())
            .field("init_attempts", &self.init_attempts())
            .finish()
    }
}
