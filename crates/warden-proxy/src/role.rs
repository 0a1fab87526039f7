//! Proxies bound to a single caller role.

use crate::error::{ProxyError, Result};
use crate::proxy::GatedResourceProxy;
use crate::resource::ProtectedResource;
use crate::store::{DocumentOutput, DocumentStore};
use std::sync::Arc;
use warden_audit_types::{Operation, ResourceKey, Role};

/// A proxy handle whose role is fixed when it is created.
///
/// Cheap to clone; all clones share the underlying proxy, its resource and
/// its audit log.
#[derive(Debug)]
pub struct RoleBoundProxy<R> {
    proxy: Arc<GatedResourceProxy<R>>,
    role: Role,
}

impl<R> Clone for RoleBoundProxy<R> {
    fn clone(&self) -> Self {
        Self {
            proxy: Arc::clone(&self.proxy),
            role: self.role.clone(),
        }
    }
}

impl<R: ProtectedResource> RoleBoundProxy<R> {
    pub(crate) fn new(proxy: Arc<GatedResourceProxy<R>>, role: Role) -> Self {
        Self { proxy, role }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn proxy(&self) -> &Arc<GatedResourceProxy<R>> {
        &self.proxy
    }

    pub fn invoke(
        &self,
        operation: &Operation,
        key: impl Into<ResourceKey>,
        args: R::Args,
    ) -> Result<R::Output> {
        self.proxy.invoke(&self.role, operation, &key.into(), args)
    }
}

impl RoleBoundProxy<DocumentStore> {
    /// Read a document's contents.
    pub fn read(&self, key: impl Into<ResourceKey>) -> Result<String> {
        content(self.invoke(&Operation::Read, key, None)?)
    }

    /// Create or replace a document.
    pub fn write(&self, key: impl Into<ResourceKey>, content: impl Into<String>) -> Result<()> {
        match self.invoke(&Operation::Write, key, Some(content.into()))? {
            DocumentOutput::Written { .. } => Ok(()),
            other => Err(unexpected(&Operation::Write, &other)),
        }
    }

    pub fn delete(&self, key: impl Into<ResourceKey>) -> Result<()> {
        match self.invoke(&Operation::Delete, key, None)? {
            DocumentOutput::Deleted => Ok(()),
            other => Err(unexpected(&Operation::Delete, &other)),
        }
    }

    /// Keys starting with `prefix`.
    pub fn list(&self, prefix: impl Into<ResourceKey>) -> Result<Vec<ResourceKey>> {
        keys(self.invoke(&Operation::List, prefix, None)?)
    }
}

fn content(output: DocumentOutput) -> Result<String> {
    match output {
        DocumentOutput::Content(content) => Ok(content),
        other => Err(unexpected(&Operation::Read, &other)),
    }
}

fn keys(output: DocumentOutput) -> Result<Vec<ResourceKey>> {
    match output {
        DocumentOutput::Keys(keys) => Ok(keys),
        other => Err(unexpected(&Operation::List, &other)),
    }
}

fn unexpected(operation: &Operation, output: &DocumentOutput) -> ProxyError {
    ProxyError::OperationFailed {
        reason: format!("unexpected {operation} output: {output:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{content, keys};
    use crate::{DocumentOutput, DocumentStore, GatedResourceProxy, ProxyError};
    use std::sync::Arc;
    use warden_policy::presets;

    fn proxy() -> Arc<GatedResourceProxy<DocumentStore>> {
        Arc::new(
            GatedResourceProxy::builder()
                .engine(presets::file_access().unwrap())
                .factory(|| Ok::<_, std::io::Error>(DocumentStore::new()))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_roles_share_one_store() {
        let proxy = proxy();
        let admin = proxy.as_role("admin");
        let user = proxy.as_role("user");

        admin.write("regular_file.txt", "public").unwrap();
        admin.write("confidential_data.txt", "secret").unwrap();

        assert_eq!(user.read("regular_file.txt").unwrap(), "public");
        assert_eq!(
            user.read("confidential_data.txt").unwrap_err(),
            ProxyError::PolicyDenied { reason: presets::CONFIDENTIAL_RESOURCE }
        );
        assert_eq!(admin.read("confidential_data.txt").unwrap(), "secret");
        assert_eq!(proxy.audit_log().len(), 5);
    }

    #[test]
    fn test_editor_writes_but_cannot_read() {
        let proxy = proxy();
        let editor = proxy.as_role("editor");

        editor.write("article.txt", "draft").unwrap();
        assert!(matches!(
            editor.read("article.txt"),
            Err(ProxyError::PolicyDenied { .. })
        ));
        assert!(matches!(editor.list(""), Err(ProxyError::PolicyDenied { .. })));
        assert_eq!(editor.role().as_str(), "editor");
    }

    #[test]
    fn test_admin_lists_and_deletes() {
        let proxy = proxy();
        let admin = proxy.as_role("admin");
        admin.write("a/1", "x").unwrap();
        admin.write("a/2", "y").unwrap();

        assert_eq!(admin.list("a/").unwrap().len(), 2);
        admin.delete("a/1").unwrap();
        assert_eq!(admin.clone().list("a/").unwrap().len(), 1);
    }

    #[test]
    fn test_mismatched_output_is_an_error() {
        assert_eq!(
            content(DocumentOutput::Deleted).unwrap_err(),
            ProxyError::OperationFailed { reason: "unexpected read output: Deleted".into() }
        );
        assert!(matches!(
            keys(DocumentOutput::Content("x".into())),
            Err(ProxyError::OperationFailed { .. })
        ));
        assert_eq!(content(DocumentOutput::Content(String::new())).unwrap(), "");
        assert!(keys(DocumentOutput::Keys(Vec::new())).unwrap().is_empty());
    }
}
