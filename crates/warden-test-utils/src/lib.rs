//! Test utilities for Warden crates.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use warden_audit_types::{Operation, ResourceKey};
use warden_common_config::{ConfigLoader, CONFIG_DIR, CONFIG_FILE};
use warden_proxy::ProtectedResource;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a temporary file with given content.
pub fn temp_file(content: &str) -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let path = dir.path().join("test_file");
    std::fs::write(&path, content).expect("Failed to write temp file");
    (dir, path)
}

/// Writes `yaml` as `.warden/config.yaml` in a fresh project directory.
///
/// Keep the returned directory alive while the loader is in use.
pub fn temp_config(yaml: &str) -> (TempDir, ConfigLoader) {
    let dir = temp_dir();
    let config_dir = dir.path().join(CONFIG_DIR);
    std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    std::fs::write(config_dir.join(CONFIG_FILE), yaml).expect("Failed to write config");
    let loader = ConfigLoader::new(dir.path());
    (dir, loader)
}

type Make<R> = Arc<dyn Fn(usize) -> R + Send + Sync>;

/// A resource factory that counts how often it runs.
///
/// `make` receives the 1-based call number. Clones share the counter.
pub struct CountingFactory<R> {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
    make: Make<R>,
}

impl<R> Clone for CountingFactory<R> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            delay: self.delay,
            make: Arc::clone(&self.make),
        }
    }
}

impl<R: 'static> CountingFactory<R> {
    pub fn new(make: impl Fn(usize) -> R + Send + Sync + 'static) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
            make: Arc::new(make),
        }
    }

    /// Sleep for `delay` on every call, widening race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Run the factory once.
    pub fn build(&self) -> Result<R, String> {
        let call = self.next_call();
        Ok(self.make_nth(call))
    }

    fn next_call(&self) -> usize {
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn make_nth(&self, call: usize) -> R {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        (self.make)(call)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A closure suitable for `ProxyBuilder::factory`.
    pub fn as_factory(&self) -> impl Fn() -> Result<R, String> + Send + Sync + 'static {
        let this = self.clone();
        move || this.build()
    }
}

/// A factory that fails its first `failures` calls, then succeeds.
pub struct FailingThenSucceeding<R> {
    failures: usize,
    inner: CountingFactory<R>,
}

impl<R> Clone for FailingThenSucceeding<R> {
    fn clone(&self) -> Self {
        Self {
            failures: self.failures,
            inner: self.inner.clone(),
        }
    }
}

impl<R: 'static> FailingThenSucceeding<R> {
    pub fn new(failures: usize, make: impl Fn() -> R + Send + Sync + 'static) -> Self {
        Self {
            failures,
            inner: CountingFactory::new(move |_| make()),
        }
    }

    pub fn build(&self) -> Result<R, String> {
        let call = self.inner.next_call();
        if call <= self.failures {
            return Err(format!("simulated failure #{call}"));
        }
        Ok(self.inner.make_nth(call))
    }

    /// Total calls, failed and successful.
    pub fn calls(&self) -> usize {
        self.inner.calls()
    }

    pub fn as_factory(&self) -> impl Fn() -> Result<R, String> + Send + Sync + 'static {
        let this = self.clone();
        move || this.build()
    }
}

/// Failure raised by [`CountingResource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("refused by test double: {0}")]
pub struct CountingError(pub String);

/// A resource that counts operations and echoes them back.
///
/// Returns `"<op>:<key>:<n>"` where `n` is the 1-based call number. Keys in
/// the fail list produce a [`CountingError`].
#[derive(Debug, Default)]
pub struct CountingResource {
    calls: AtomicUsize,
    fail_keys: Vec<ResourceKey>,
}

impl CountingResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation on `key`.
    pub fn failing_on(mut self, key: impl Into<ResourceKey>) -> Self {
        self.fail_keys.push(key.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProtectedResource for CountingResource {
    type Args = ();
    type Output = String;
    type Error = CountingError;

    fn perform(&self, operation: &Operation, key: &ResourceKey, _args: ()) -> Result<String, CountingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_keys.contains(key) {
            return Err(CountingError(key.to_string()));
        }
        Ok(format!("{operation}:{key}:{call}"))
    }
}

/// Macro for async tests with tokio runtime.
///
/// The calling crate needs `tokio` with the `macros` and `rt` features.
#[macro_export]
macro_rules! async_test {
    ($name:ident, $body:expr) => {
        #[tokio::test]
        async fn $name() {
            $body
        }
    };
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
