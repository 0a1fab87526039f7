//! In-memory document store.

use crate::resource::ProtectedResource;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;
use warden_audit_types::{Operation, ResourceKey};

/// Document store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document not found: {0}")]
    NotFound(ResourceKey),

    #[error("write to {0} requires content")]
    MissingContent(ResourceKey),

    #[error("unsupported operation: {0}")]
    Unsupported(Operation),
}

/// Result of a document store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutput {
    /// Contents of a read document.
    Content(String),
    /// A write succeeded; `created` is false when it replaced a document.
    Written { created: bool },
    /// A delete succeeded.
    Deleted,
    /// Keys starting with the listed key, in order.
    Keys(Vec<ResourceKey>),
}

impl DocumentOutput {
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::Content(content) => Some(content),
            _ => None,
        }
    }

    pub fn into_keys(self) -> Option<Vec<ResourceKey>> {
        match self {
            Self::Keys(keys) => Some(keys),
            _ => None,
        }
    }
}

/// Named text documents behind a reader-writer lock.
///
/// - `read`: contents of `key` (`NotFound` if absent)
/// - `write`: store `args` under `key` (`MissingContent` without args)
/// - `delete`: remove `key` (`NotFound` if absent)
/// - `list`: keys starting with `key`; an empty key lists everything
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<BTreeMap<ResourceKey, String>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `documents`.
    pub fn with_documents<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ResourceKey>,
        V: Into<String>,
    {
        let documents = documents
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            documents: RwLock::new(documents),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl ProtectedResource for DocumentStore {
    type Args = Option<String>;
    type Output = DocumentOutput;
    type Error = DocumentError;

    fn perform(
        &self,
        operation: &Operation,
        key: &ResourceKey,
        args: Self::Args,
    ) -> Result<Self::Output, Self::Error> {
        trace!(op = %operation, key = %key, "Document store operation");
        match operation {
            Operation::Read => self
                .documents
                .read()
                .get(key)
                .cloned()
                .map(DocumentOutput::Content)
                .ok_or_else(|| DocumentError::NotFound(key.clone())),
            Operation::Write => {
                let content = args.ok_or_else(|| DocumentError::MissingContent(key.clone()))?;
                let previous = self.documents.write().insert(key.clone(), content);
                Ok(DocumentOutput::Written {
                    created: previous.is_none(),
                })
            }
            Operation::Delete => self
                .documents
                .write()
                .remove(key)
                .map(|_| DocumentOutput::Deleted)
                .ok_or_else(|| DocumentError::NotFound(key.clone())),
            Operation::List => Ok(DocumentOutput::Keys(
                self.documents
                    .read()
                    .keys()
                    .filter(|k| k.has_prefix(key.as_str()))
                    .cloned()
                    .collect(),
            )),
            Operation::Custom(_) => Err(DocumentError::Unsupported(operation.clone())),
        }
    }
}
