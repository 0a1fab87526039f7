//! End-to-end behavior of the gated proxy.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use warden_policy::{presets, PolicyEngine, PolicyRule};
use warden_proxy::{
    AuditLog, AuditOutcome, Decision, DocumentStore, GatedResourceProxy, Operation, ProxyBuilder,
    ProxyError, ResourceKey, Role,
};
use warden_test_utils::{assert_err, assert_ok, temp_config, CountingFactory, CountingResource, FailingThenSucceeding};

fn counting_proxy(
    engine: PolicyEngine,
    audit: Arc<AuditLog>,
) -> (Arc<GatedResourceProxy<CountingResource>>, CountingFactory<CountingResource>) {
    warden_common_log::init_for_tests();
    let factory = CountingFactory::new(|_| CountingResource::new().failing_on("broken"));
    let proxy = GatedResourceProxy::builder()
        .engine(engine)
        .audit_log(audit)
        .factory(factory.as_factory())
        .label("counting")
        .build()
        .unwrap();
    (Arc::new(proxy), factory)
}

fn call(
    proxy: &GatedResourceProxy<CountingResource>,
    role: &str,
    op: Operation,
    key: &str,
) -> Result<String, ProxyError> {
    proxy.invoke(&Role::new(role), &op, &ResourceKey::new(key), ())
}

#[test]
fn user_read_of_confidential_key_is_denied_without_building() {
    let (proxy, factory) = counting_proxy(presets::file_access().unwrap(), Arc::new(AuditLog::unbounded()));

    let err = assert_err!(call(&proxy, "user", Operation::Read, "confidential_report"));

    assert_eq!(err, ProxyError::PolicyDenied { reason: presets::CONFIDENTIAL_RESOURCE });
    assert_eq!(factory.calls(), 0);
    assert!(proxy.handle().get().is_none());

    let entries = proxy.audit_log().snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record.role, Role::new("user"));
    assert_eq!(entries[0].record.resource_key, ResourceKey::new("confidential_report"));
    assert_eq!(entries[0].decision(), &Decision::denied(presets::CONFIDENTIAL_RESOURCE));
    assert_eq!(entries[0].outcome(), &AuditOutcome::Denied);
}

#[test]
fn unmatched_request_is_denied_with_no_matching_rule() {
    let (proxy, factory) = counting_proxy(presets::file_access().unwrap(), Arc::new(AuditLog::unbounded()));

    let err = assert_err!(call(&proxy, "guest", Operation::List, "anything"));

    assert_eq!(err, ProxyError::PolicyDenied { reason: warden_proxy::ReasonCode::NO_MATCHING_RULE });
    assert_eq!(factory.calls(), 0);
    assert_eq!(proxy.audit_log().len(), 1);
}

#[test]
fn admin_write_then_user_read_reuse_one_resource() {
    let (proxy, factory) = counting_proxy(presets::file_access().unwrap(), Arc::new(AuditLog::unbounded()));

    assert_eq!(assert_ok!(call(&proxy, "admin", Operation::Write, "config")), "write:config:1");
    let first = proxy.handle().get().map(|r| r as *const CountingResource);

    assert_eq!(assert_ok!(call(&proxy, "user", Operation::Read, "config")), "read:config:2");
    let second = proxy.handle().get().map(|r| r as *const CountingResource);

    assert_eq!(factory.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(proxy.handle().get().map(CountingResource::calls), Some(2));

    let entries = proxy.audit_log().snapshot();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.outcome().is_success()));
    assert_eq!(entries[0].sequence + 1, entries[1].sequence);
}

#[test]
fn failing_factory_then_success_is_audited_twice() {
    let factory = FailingThenSucceeding::new(1, CountingResource::new);
    let proxy = GatedResourceProxy::builder()
        .engine(presets::file_access().unwrap())
        .factory(factory.as_factory())
        .build()
        .unwrap();

    let err = assert_err!(call(&proxy, "admin", Operation::Read, "config"));
    assert_eq!(err, ProxyError::InitializationFailed { reason: "simulated failure #1".into() });
    assert!(!proxy.is_initialized());

    assert_ok!(call(&proxy, "admin", Operation::Read, "config"));
    assert_eq!(factory.calls(), 2);

    let outcomes: Vec<AuditOutcome> = proxy
        .audit_log()
        .snapshot()
        .into_iter()
        .map(|e| e.record.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            AuditOutcome::InitializationFailed { reason: "simulated failure #1".into() },
            AuditOutcome::Succeeded,
        ]
    );
}

#[test]
fn operation_failure_is_audited_and_returned() {
    let (proxy, _factory) = counting_proxy(presets::file_access().unwrap(), Arc::new(AuditLog::unbounded()));

    let err = assert_err!(call(&proxy, "admin", Operation::Delete, "broken"));
    assert_eq!(
        err,
        ProxyError::OperationFailed { reason: "refused by test double: broken".into() }
    );
    let entry = &proxy.audit_log().snapshot()[0];
    assert!(entry.decision().is_allowed());
    assert!(entry.outcome().was_attempted());
}

#[test]
fn exhausted_log_surfaces_error_and_stays_unchanged() {
    let audit = Arc::new(AuditLog::with_capacity(1));
    let (proxy, _factory) = counting_proxy(presets::file_access().unwrap(), Arc::clone(&audit));

    assert_ok!(call(&proxy, "admin", Operation::Read, "a"));

    for (role, op) in [("admin", Operation::Read), ("user", Operation::Write)] {
        let err = assert_err!(call(&proxy, role, op, "b"));
        assert!(matches!(err, ProxyError::AuditLogExhausted(_)));
        assert!(!err.is_audited());
    }

    assert_eq!(audit.len(), 1);
    assert!(audit.verify().is_ok());
    // The refused calls never reached the resource.
    assert_eq!(proxy.handle().get().map(CountingResource::calls), Some(1));
}

#[test]
fn full_log_blocks_writes_to_the_store() {
    let proxy = GatedResourceProxy::builder()
        .engine(presets::file_access().unwrap())
        .audit_log(Arc::new(AuditLog::with_capacity(0)))
        .factory(|| Ok::<_, std::io::Error>(DocumentStore::new()))
        .build()
        .map(Arc::new)
        .unwrap();

    let err = assert_err!(proxy.as_role("admin").write("config", "replaced"));

    assert!(matches!(err, ProxyError::AuditLogExhausted(_)));
    assert!(!proxy.is_initialized());
    assert_eq!(proxy.handle().get().map(DocumentStore::len), None);
    assert!(proxy.audit_log().is_empty());
}

#[test]
fn concurrent_invocations_build_once_and_audit_every_call() {
    const THREADS: usize = 24;
    const CALLS: usize = 20;

    let audit = Arc::new(AuditLog::unbounded());
    let (proxy, factory) = counting_proxy(presets::file_access().unwrap(), Arc::clone(&audit));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let proxy = Arc::clone(&proxy);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let role = ["admin", "user", "editor"][t % 3];
                barrier.wait();
                (0..CALLS)
                    .filter(|n| call(&proxy, role, Operation::Read, &format!("doc-{n}")).is_ok())
                    .count()
            })
        })
        .collect();

    let allowed: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

    // admin and user may read; editor may not.
    assert_eq!(allowed, (THREADS / 3) * 2 * CALLS);
    assert_eq!(factory.calls(), 1);

    let entries = audit.snapshot();
    assert_eq!(entries.len(), THREADS * CALLS);
    assert!(entries.iter().zip(0u64..).all(|(e, seq)| e.sequence == seq));
    assert_eq!(entries.iter().filter(|e| e.decision().is_denied()).count(), (THREADS / 3) * CALLS);
    assert!(audit.verify().is_ok());
}

#[test]
fn proxies_sharing_a_log_are_distinguished_by_origin() {
    let audit = Arc::new(AuditLog::unbounded());
    let engine = Arc::new(PolicyEngine::new(vec![PolicyRule::allow("all")]).unwrap());

    let build = || {
        GatedResourceProxy::builder()
            .shared_engine(Arc::clone(&engine))
            .audit_log(Arc::clone(&audit))
            .eager(CountingResource::new())
            .build()
            .unwrap()
    };
    let (a, b) = (build(), build());

    assert_ok!(call(&a, "x", Operation::Read, "k"));
    assert_ok!(call(&b, "x", Operation::Read, "k"));

    let origins: Vec<_> = audit.snapshot().into_iter().map(|e| e.record.origin).collect();
    assert_eq!(origins, vec![Some(a.id()), Some(b.id())]);
}

#[test]
fn proxy_from_yaml_config() {
    let (_dir, loader) = temp_config(
        r#"
audit:
  initial_sequence: 100
policy:
  rules:
    - name: readers
      effect: allow
      roles: [reader]
      operations: [read]
proxy:
  deadline_ms: 1500
"#,
    );
    let config = loader.load().unwrap();

    let proxy = ProxyBuilder::from_config(&config)
        .unwrap()
        .factory(|| Ok::<_, std::io::Error>(DocumentStore::with_documents([("doc", "hello")])))
        .build()
        .unwrap();
    let proxy = Arc::new(proxy);

    assert_eq!(proxy.as_role("reader").read("doc").unwrap(), "hello");
    assert!(proxy.as_role("reader").write("doc", "x").is_err());
    assert_eq!(proxy.deadline(), Duration::from_millis(1500));
    assert_eq!(proxy.audit_log().last_sequence(), Some(101));
}

#[test]
fn audit_lines_render_like_an_access_log() {
    let proxy = Arc::new(
        GatedResourceProxy::builder()
            .engine(presets::file_access().unwrap())
            .factory(|| Ok::<_, std::io::Error>(DocumentStore::new()))
            .build()
            .unwrap(),
    );

    let _ = proxy.as_role("user").read("confidential_data.txt");
    let _ = proxy.as_role("editor").write("article.txt", "draft");

    let lines: Vec<String> = proxy.audit_log().snapshot().iter().map(ToString::to_string).collect();
    assert!(lines[0].starts_with("#0 "));
    assert!(lines[0].ends_with(
        "role: user, op: read, key: confidential_data.txt, result: denied (denied): confidential_resource"
    ));
    assert!(lines[1].ends_with(
        "role: editor, op: write, key: article.txt, result: granted (succeeded)"
    ));
}
