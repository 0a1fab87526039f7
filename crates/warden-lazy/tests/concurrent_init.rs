//! Concurrent initialization of lazy handles.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use warden_lazy::{HandleRegistry, InitState, LazyHandle};
use warden_test_utils::{CountingFactory, FailingThenSucceeding};

/// A resource with identity, so pointer equality is meaningful.
#[derive(Debug)]
struct Connection {
    serial: usize,
}

#[test]
fn factory_runs_once_under_contention() {
    const THREADS: usize = 32;

    let handle = Arc::new(LazyHandle::<Connection>::labeled("connection"));
    let factory = CountingFactory::new(|serial| Connection { serial }).with_delay(Duration::from_millis(20));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let factory = factory.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let conn = handle.get_or_init(|| factory.build()).unwrap();
                conn as *const Connection as usize
            })
        })
        .collect();

    let addresses: Vec<usize> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(factory.calls(), 1);
    assert_eq!(handle.init_attempts(), 1);
    assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(handle.get().map(|c| c.serial), Some(1));
    assert_eq!(handle.state(), InitState::Ready);
}

#[test]
fn failure_then_success_under_contention() {
    const THREADS: usize = 16;

    let handle = Arc::new(LazyHandle::<Connection>::new());
    let factory = FailingThenSucceeding::new(1, || Connection { serial: 0 });
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let factory = factory.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                handle.get_or_init(|| factory.build()).is_ok()
            })
        })
        .collect();

    let successes = workers.into_iter().filter_map(|w| w.join().ok()).filter(|ok| *ok).count();

    // Exactly the caller whose factory failed sees the error; the next one
    // in builds the resource for everyone else.
    assert_eq!(successes, THREADS - 1);
    assert_eq!(factory.calls(), 2);
    assert_eq!(handle.init_attempts(), 2);
    assert!(handle.is_ready());
}

#[test]
fn ready_handle_never_locks_out_readers() {
    let handle = Arc::new(LazyHandle::ready(Connection { serial: 7 }));

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || {
                (0..1_000)
                    .map(|_| handle.get_or_init(|| Err::<Connection, _>("unused")).unwrap().serial)
                    .sum::<usize>()
            })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.join().unwrap(), 7_000);
    }
    assert_eq!(handle.init_attempts(), 0);
}

#[test]
fn registry_builds_each_key_once() {
    let registry: Arc<HandleRegistry<String, Connection>> = Arc::new(HandleRegistry::new());
    let factory = CountingFactory::new(|serial| Connection { serial });
    let barrier = Arc::new(Barrier::new(12));

    let workers: Vec<_> = (0..12)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let factory = factory.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let key = format!("db-{}", i % 3);
                registry.get_or_init(&key, || factory.build()).unwrap();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.ready_count(), 3);
    assert_eq!(factory.calls(), 3);
}
