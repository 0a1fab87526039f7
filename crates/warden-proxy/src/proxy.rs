//! The gated proxy and its builder.

use crate::error::{ProxyError, Result};
use crate::resource::ProtectedResource;
use crate::role::RoleBoundProxy;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, field};
use warden_audit_log::{AuditLog, AuditLogConfig, AuditSlot};
use warden_audit_types::{AuditOutcome, AuditRecord, AuditRecordBuilder, Decision, Operation, ResourceKey, Role};
use warden_common_config::{ConfigLoader, Environment, WardenConfig};
use warden_common_core::{ProxyId, Timestamp};
use warden_common_log::spans::invoke_span;
use warden_lazy::LazyHandle;
use warden_policy::PolicyEngine;

/// Boxed error returned by resource factories.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

type Factory<R> = Arc<dyn Fn() -> std::result::Result<R, FactoryError> + Send + Sync>;

/// Deadline used by [`GatedResourceProxy::invoke_async`] when none is configured.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Policy-checked, audited access to a lazily built resource.
///
/// Every [`invoke`](Self::invoke) evaluates the policy, reserves room in the
/// audit log, builds the resource on the first allowed call, performs the
/// operation and commits exactly one record into the reserved room. A call
/// that cannot reserve room does no work. No proxy-wide lock is held across
/// those steps.
pub struct GatedResourceProxy<R> {
    pub(crate) id: ProxyId,
    engine: Arc<PolicyEngine>,
    audit: Arc<AuditLog>,
    handle: LazyHandle<R>,
    factory: Factory<R>,
    pub(crate) deadline: Duration,
}

impl<R: ProtectedResource> GatedResourceProxy<R> {
    pub fn builder() -> ProxyBuilder<R> {
        ProxyBuilder::new()
    }

    /// Perform `operation` on `key` as `role`.
    pub fn invoke(
        &self,
        role: &Role,
        operation: &Operation,
        key: &ResourceKey,
        args: R::Args,
    ) -> Result<R::Output> {
        let started = Timestamp::now();
        let span = invoke_span(&self.id.to_string(), role.as_str(), operation.as_str(), key.as_str());
        let _entered = span.enter();

        let decision = self.engine.evaluate(role, operation, key);
        span.record("decision", if decision.is_allowed() { "allowed" } else { "denied" });

        let record = AuditRecord::builder(role.clone(), operation.clone(), key.clone(), decision.clone())
            .timestamp(started)
            .origin(self.id);

        let slot = self.audit.reserve().map_err(|e| {
            error!(proxy = %self.id, error = %e, "No audit room; refusing call");
            ProxyError::AuditLogExhausted(e)
        })?;

        if let Decision::Denied { reason } = decision {
            debug!(reason = %reason, "Access denied");
            self.audit(slot, record.outcome(AuditOutcome::Denied), &span)?;
            return Err(ProxyError::PolicyDenied { reason });
        }

        let resource = match self.handle.get_or_init(|| (self.factory)()) {
            Ok(resource) => resource,
            Err(e) => {
                let reason = e.to_string();
                span.record("error", field::display(&reason));
                self.audit(
                    slot,
                    record.outcome(AuditOutcome::InitializationFailed { reason: reason.clone() }),
                    &span,
                )?;
                return Err(ProxyError::InitializationFailed { reason });
            }
        };

        match resource.perform(operation, key, args) {
            Ok(output) => {
                self.audit(slot, record.outcome(AuditOutcome::Succeeded), &span)?;
                Ok(output)
            }
            Err(e) => {
                let reason = e.to_string();
                span.record("error", field::display(&reason));
                debug!(error = %reason, "Operation failed");
                self.audit(
                    slot,
                    record.outcome(AuditOutcome::OperationFailed { reason: reason.clone() }),
                    &span,
                )?;
                Err(ProxyError::OperationFailed { reason })
            }
        }
    }

    /// A view of this proxy that always calls as `role`.
    pub fn as_role(self: &Arc<Self>, role: impl Into<Role>) -> RoleBoundProxy<R> {
        RoleBoundProxy::new(Arc::clone(self), role.into())
    }

    fn audit(&self, slot: AuditSlot<'_>, record: AuditRecordBuilder, span: &tracing::Span) -> Result<u64> {
        match slot.commit(record.build()) {
            Ok(sequence) => {
                span.record("sequence", sequence);
                Ok(sequence)
            }
            Err(e) => {
                error!(proxy = %self.id, error = %e, "Audit commit failed; withholding result");
                Err(ProxyError::AuditLogExhausted(e))
            }
        }
    }
}

impl<R> GatedResourceProxy<R> {
    pub fn id(&self) -> ProxyId {
        self.id
    }

    /// The shared audit log this proxy writes to.
    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn engine(&self) -> &Arc<PolicyEngine> {
        &self.engine
    }

    pub fn handle(&self) -> &LazyHandle<R> {
        &self.handle
    }

    /// Whether the resource has been built.
    pub fn is_initialized(&self) -> bool {
        self.handle.is_ready()
    }

    /// Deadline applied by [`invoke_async`](Self::invoke_async).
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl<R> fmt::Debug for GatedResourceProxy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedResourceProxy")
            .field("id", &self.id)
            .field("rules", &self.engine.len())
            .field("handle", &self.handle)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Builder for [`GatedResourceProxy`].
///
/// ```
/// use std::sync::Arc;
/// use warden_policy::presets;
/// use warden_proxy::{DocumentStore, GatedResourceProxy};
///
/// let proxy = GatedResourceProxy::builder()
///     .engine(presets::file_access().unwrap())
///     .factory(|| Ok::<_, std::io::Error>(DocumentStore::new()))
///     .build()
///     .unwrap();
/// let proxy = Arc::new(proxy);
///
/// proxy.as_role("editor").write("notes", "hello").unwrap();
/// assert!(proxy.as_role("user").read("notes").is_ok());
/// assert_eq!(proxy.audit_log().len(), 2);
/// ```
pub struct ProxyBuilder<R> {
    id: Option<ProxyId>,
    engine: Option<Arc<PolicyEngine>>,
    audit: Option<Arc<AuditLog>>,
    factory: Option<Factory<R>>,
    eager: Option<R>,
    label: Cow<'static, str>,
    deadline: Duration,
}

impl<R: ProtectedResource> ProxyBuilder<R> {
    pub fn new() -> Self {
        Self {
            id: None,
            engine: None,
            audit: None,
            factory: None,
            eager: None,
            label: Cow::Borrowed(std::any::type_name::<R>()),
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Policy, audit log and deadline from a loaded configuration.
    pub fn from_config(config: &WardenConfig) -> Result<Self> {
        let engine = PolicyEngine::try_from(&config.policy)?;
        let audit = AuditLog::new(AuditLogConfig::from(&config.audit));
        Ok(Self::new()
            .engine(engine)
            .audit_log(Arc::new(audit))
            .deadline(config.proxy.deadline()))
    }

    /// Like [`from_config`](Self::from_config), with the configuration read
    /// through [`Environment::load_config`] so `.env` files and `WARDEN_*`
    /// overrides apply.
    pub fn from_environment(loader: &ConfigLoader) -> Result<Self> {
        let config = Environment::load_config(loader)?;
        debug!(
            capacity = ?config.audit.capacity,
            deadline_ms = config.proxy.deadline_ms,
            "Proxy configuration loaded"
        );
        Self::from_config(&config)
    }

    pub fn id(mut self, id: ProxyId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn engine(self, engine: PolicyEngine) -> Self {
        self.shared_engine(Arc::new(engine))
    }

    /// Use an engine shared with other proxies.
    pub fn shared_engine(mut self, engine: Arc<PolicyEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Write to `audit` instead of a private unbounded log.
    pub fn audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// How to build the resource on first allowed use. May run again after
    /// a failure.
    pub fn factory<F, E>(mut self, factory: F) -> Self
    where
        F: Fn() -> std::result::Result<R, E> + Send + Sync + 'static,
        E: Into<FactoryError>,
    {
        self.factory = Some(Arc::new(move || factory().map_err(Into::into)));
        self
    }

    /// Start with an already built resource.
    pub fn eager(mut self, resource: R) -> Self {
        self.eager = Some(resource);
        self
    }

    /// Name of the resource in logs.
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn build(self) -> Result<GatedResourceProxy<R>> {
        let engine = self
            .engine
            .ok_or_else(|| ProxyError::Config("a policy engine is required".into()))?;

        if self.deadline.is_zero() {
            return Err(ProxyError::Config("deadline must be greater than zero".into()));
        }

        let (handle, factory): (LazyHandle<R>, Factory<R>) = match (self.eager, self.factory) {
            (Some(resource), Some(factory)) => (LazyHandle::ready(resource), factory),
            (Some(resource), None) => {
                // Never called: the handle starts ready.
                let unused: Factory<R> =
                    Arc::new(|| Err("resource was supplied eagerly and has no factory".into()));
                (LazyHandle::ready(resource), unused)
            }
            (None, Some(factory)) => (LazyHandle::labeled(self.label), factory),
            (None, None) => {
                return Err(ProxyError::Config(
                    "either a factory or an eager resource is required".into(),
                ))
            }
        };

        let proxy = GatedResourceProxy {
            id: self.id.unwrap_or_default(),
            engine,
            audit: self.audit.unwrap_or_default(),
            handle,
            factory,
            deadline: self.deadline,
        };
        debug!(proxy = %proxy.id, rules = proxy.engine.len(), "Proxy built");
        Ok(proxy)
    }
}

impl<R: ProtectedResource> Default for ProxyBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentOutput, DocumentStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_policy::{presets, PolicyRule};

    fn document_proxy(calls: Arc<AtomicUsize>) -> GatedResourceProxy<DocumentStore> {
        GatedResourceProxy::builder()
            .engine(presets::file_access().unwrap())
            .factory(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(DocumentStore::with_documents([("config", "v1")]))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_denied_call_skips_factory_and_is_audited() {
        let calls = Arc::new(AtomicUsize::new(0));
        let proxy = document_proxy(calls.clone());

        let err = proxy
            .invoke(&Role::new("user"), &Operation::Write, &ResourceKey::new("config"), Some("x".into()))
            .unwrap_err();

        assert_eq!(err.denial_reason(), Some(&warden_audit_types::ReasonCode::NO_MATCHING_RULE));
        assert!(err.is_audited());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!proxy.is_initialized());

        let entries = proxy.audit_log().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome(), &AuditOutcome::Denied);
        assert_eq!(entries[0].record.origin, Some(proxy.id()));
    }

    #[test]
    fn test_allowed_call_builds_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let proxy = document_proxy(calls.clone());
        let admin = Role::new("admin");

        for _ in 0..3 {
            let out = proxy
                .invoke(&admin, &Operation::Read, &ResourceKey::new("config"), None)
                .unwrap();
            assert_eq!(out, DocumentOutput::Content("v1".into()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(proxy.handle().init_attempts(), 1);
        assert_eq!(proxy.audit_log().len(), 3);
    }

    #[test]
    fn test_operation_failure_is_audited() {
        let proxy = document_proxy(Arc::new(AtomicUsize::new(0)));

        let err = proxy
            .invoke(&Role::new("user"), &Operation::Read, &ResourceKey::new("missing"), None)
            .unwrap_err();

        assert_eq!(
            err,
            ProxyError::OperationFailed { reason: "document not found: missing".into() }
        );
        let entry = &proxy.audit_log().snapshot()[0];
        assert!(entry.decision().is_allowed());
        assert_eq!(entry.outcome().reason(), Some("document not found: missing"));
    }

    #[test]
    fn test_builder_requires_engine_and_factory() {
        let missing_engine = GatedResourceProxy::<DocumentStore>::builder()
            .factory(|| Ok::<_, std::io::Error>(DocumentStore::new()))
            .build();
        assert!(matches!(missing_engine, Err(ProxyError::Config(_))));

        let missing_factory = GatedResourceProxy::<DocumentStore>::builder()
            .engine(PolicyEngine::default())
            .build();
        assert!(matches!(missing_factory, Err(ProxyError::Config(_))));

        let zero_deadline = GatedResourceProxy::<DocumentStore>::builder()
            .engine(PolicyEngine::default())
            .eager(DocumentStore::new())
            .deadline(Duration::ZERO)
            .build();
        assert!(matches!(zero_deadline, Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_eager_resource_is_ready() {
        let proxy = GatedResourceProxy::builder()
            .engine(PolicyEngine::new(vec![PolicyRule::allow("all")]).unwrap())
            .eager(DocumentStore::with_documents([("k", "v")]))
            .build()
            .unwrap();

        assert!(proxy.is_initialized());
        let out = proxy
            .invoke(&Role::new("anyone"), &Operation::Read, &ResourceKey::new("k"), None)
            .unwrap();
        assert_eq!(out.into_content().as_deref(), Some("v"));
        assert_eq!(proxy.handle().init_attempts(), 0);
    }

    #[test]
    fn test_from_config_applies_all_sections() {
        let mut config = WardenConfig::default();
        config.audit.capacity = Some(1);
        config.audit.initial_sequence = 50;
        config.proxy.deadline_ms = 250;
        config.policy.rules.push(warden_common_config::RuleConfig::new(
            "all",
            warden_common_config::RuleEffect::Allow,
        ));

        let proxy = ProxyBuilder::from_config(&config)
            .unwrap()
            .eager(DocumentStore::new())
            .build()
            .unwrap();

        assert_eq!(proxy.deadline(), Duration::from_millis(250));
        assert_eq!(proxy.audit_log().capacity(), Some(1));
        assert_eq!(proxy.engine().len(), 1);

        let role = Role::new("x");
        let key = ResourceKey::new("k");
        assert!(proxy.invoke(&role, &Operation::Write, &key, Some("v".into())).is_ok());
        assert_eq!(proxy.audit_log().last_sequence(), Some(50));
    }

    #[test]
    fn test_full_log_refuses_before_any_work() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let proxy = GatedResourceProxy::builder()
            .engine(presets::file_access().unwrap())
            .audit_log(Arc::new(AuditLog::with_capacity(0)))
            .factory(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(DocumentStore::new())
            })
            .build()
            .unwrap();

        let err = proxy
            .invoke(&Role::new("admin"), &Operation::Write, &ResourceKey::new("config"), Some("changed".into()))
            .unwrap_err();

        assert!(matches!(err, ProxyError::AuditLogExhausted(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!proxy.is_initialized());
        assert!(proxy.audit_log().is_empty());
        assert_eq!(proxy.audit_log().reserved(), 0);
    }

    #[test]
    fn test_full_log_leaves_eager_store_untouched() {
        let proxy = GatedResourceProxy::builder()
            .engine(presets::file_access().unwrap())
            .audit_log(Arc::new(AuditLog::with_capacity(1)))
            .eager(DocumentStore::new())
            .build()
            .unwrap();
        let admin = Role::new("admin");

        proxy
            .invoke(&admin, &Operation::Write, &ResourceKey::new("a"), Some("1".into()))
            .unwrap();
        let err = proxy
            .invoke(&admin, &Operation::Write, &ResourceKey::new("b"), Some("2".into()))
            .unwrap_err();

        assert!(matches!(err, ProxyError::AuditLogExhausted(_)));
        assert_eq!(proxy.handle().get().map(DocumentStore::len), Some(1));
        assert_eq!(proxy.audit_log().len(), 1);
    }
}
