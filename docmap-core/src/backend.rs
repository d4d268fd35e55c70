//! Storage backend abstraction for hierarchical document stores.
//!
//! A backend addresses documents and collections by path, persists [`ValueMap`] bodies,
//! executes [`NativeQuery`] values and delivers realtime snapshots to listeners. The mapping
//! layer never talks to a store any other way.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docmap::backend::StoreBackend;
//! use docmap::path::DocumentPath;
//!
//! let path = DocumentPath::parse("posts/hello-world")?;
//! let raw = backend.get_document(&path).await?;
//! assert!(raw.exists());
//! ```

use async_trait::async_trait;
use std::fmt::{self, Debug};

use crate::{
    error::{DocMapError, DocMapResult},
    path::{CollectionPath, DocumentPath},
    query::NativeQuery,
    value::ValueMap,
};

/// One document as returned by a backend. `data` is `None` when the document does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub path: DocumentPath,
    pub data: Option<ValueMap>,
}

impl RawDocument {
    pub fn new(path: DocumentPath, data: Option<ValueMap>) -> Self {
        Self { path, data }
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotMetadata {
    pub from_cache: bool,
    pub has_pending_writes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One entry of a query snapshot's change list.
///
/// `old_index` is `None` for added documents and `new_index` is `None` for removed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub kind: ChangeKind,
    pub document: RawDocument,
    pub old_index: Option<usize>,
    pub new_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawDocumentSnapshot {
    pub document: RawDocument,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawQuerySnapshot {
    pub docs: Vec<RawDocument>,
    pub changes: Vec<RawChange>,
    pub metadata: SnapshotMetadata,
}

impl RawQuerySnapshot {
    /// A snapshot in which every document is reported as newly added.
    pub fn added(docs: Vec<RawDocument>) -> Self {
        let changes = docs
            .iter()
            .enumerate()
            .map(|(index, document)| RawChange {
                kind: ChangeKind::Added,
                document: document.clone(),
                old_index: None,
                new_index: Some(index),
            })
            .collect();

        Self { docs, changes, metadata: SnapshotMetadata::default() }
    }
}

pub type DocumentListener = Box<dyn FnMut(RawDocumentSnapshot) + Send>;
pub type QueryListener = Box<dyn FnMut(RawQuerySnapshot) + Send>;
pub type ErrorListener = Box<dyn FnMut(DocMapError) + Send>;

/// Handle returned when a listener is attached. Delivery stops once it is unsubscribed.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Abstract interface for hierarchical document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Listener callbacks may be invoked from whichever task performed the write.
///
/// # Error Handling
///
/// Store failures are returned unchanged as [`DocMapError::Backend`] (or
/// [`DocMapError::DocumentNotFound`] for updates of missing documents); the mapping layer
/// does not retry them.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Reads one document. A missing document is returned with `data: None`.
    async fn get_document(&self, path: &DocumentPath) -> DocMapResult<RawDocument>;

    /// Writes a document, replacing any existing body.
    async fn set_document(&self, path: &DocumentPath, data: ValueMap) -> DocMapResult<()>;

    /// Merges top-level fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::DocumentNotFound`] when the document does not exist.
    async fn update_document(&self, path: &DocumentPath, data: ValueMap) -> DocMapResult<()>;

    /// Deletes a document. Deleting a missing document is not an error.
    async fn delete_document(&self, path: &DocumentPath) -> DocMapResult<()>;

    /// Writes a new document under a backend-generated id and returns its path.
    async fn add_document(
        &self,
        collection: &CollectionPath,
        data: ValueMap,
    ) -> DocMapResult<DocumentPath>;

    async fn run_query(&self, query: &NativeQuery) -> DocMapResult<RawQuerySnapshot>;

    /// Attaches a listener to one document. The current state is delivered first.
    async fn listen_document(
        &self,
        path: &DocumentPath,
        on_next: DocumentListener,
        on_error: Option<ErrorListener>,
    ) -> DocMapResult<Subscription>;

    /// Attaches a listener to a query. The current result is delivered first, then every
    /// change to it along with the per-document change list.
    async fn listen_query(
        &self,
        query: &NativeQuery,
        on_next: QueryListener,
        on_error: Option<ErrorListener>,
    ) -> DocMapResult<Subscription>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocMapResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// A builder trait for constructing store backends asynchronously.
///
/// This trait allows backends to perform async initialization (e.g., establishing
/// connections) before being ready for use.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocMapResult<Self::Backend>;
}
