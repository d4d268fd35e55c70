//! Document references.
//!
//! A reference addresses one document and remembers the value it fetched, so that repeated
//! reads and [`Entity::to_data`] can use it without going back to the store. The cache is
//! shared between clones of the same reference and is last-writer-wins: two concurrent first
//! fetches both reach the store.
//!
//! # Example
//!
//! ```ignore
//! let post = posts.get("hello-world").await?.unwrap();
//! let author = post.author.as_ref().unwrap();
//!
//! assert!(!author.is_fetched());
//! let fetched = author.get().await?;
//! assert_eq!(author.cached()?.name, fetched.name);
//! ```

use futures::future::try_join_all;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::{
    fmt::{self, Debug},
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    backend::{DocumentListener, RawDocumentSnapshot, Subscription},
    collection::{Collection, CollectionHandle},
    entity::{AnyEntity, Entity},
    error::{DocMapError, DocMapResult},
    field::{FieldValue, FromFieldValue},
    path::DocumentPath,
    registry::Repository,
    serializer::EntitySerializer,
    snapshot::{DocumentSnapshot, SnapshotSink},
    store::Connection,
};

struct DocumentInner {
    path: DocumentPath,
    parent: CollectionHandle,
    cache: RwLock<Option<Arc<dyn AnyEntity>>>,
}

/// An untyped reference to one document, bound to the repository of its entity.
#[derive(Clone)]
pub struct DocumentHandle {
    inner: Arc<DocumentInner>,
}

impl DocumentHandle {
    pub(crate) fn new(parent: CollectionHandle, id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                path: parent.path().doc(id),
                parent,
                cache: RwLock::new(None),
            }),
        }
    }

    /// Rebuilds a reference to a stored document of model `model`, including the chain of
    /// parent documents and collections above it.
    pub(crate) fn from_path(connection: &Connection, model: &str, path: &DocumentPath) -> DocMapResult<Self> {
        let repository = connection.registry().get(model)?;
        let parent = CollectionHandle::resolve(connection, repository, &path.parent())?;
        Ok(Self::new(parent, path.id()))
    }

    pub fn id(&self) -> &str {
        self.inner.path.id()
    }

    pub fn path(&self) -> &DocumentPath {
        &self.inner.path
    }

    pub fn model_name(&self) -> &'static str {
        self.inner.parent.model_name()
    }

    pub fn repository(&self) -> &Arc<Repository> {
        self.inner.parent.repository()
    }

    /// The collection holding the document.
    pub fn parent(&self) -> &CollectionHandle {
        &self.inner.parent
    }

    pub fn connection(&self) -> &Connection {
        self.inner.parent.connection()
    }

    pub fn is_fetched(&self) -> bool {
        self.inner.cache.read().is_some()
    }

    /// Rendering of the fetched entity, `None` when nothing was fetched yet.
    pub fn cached_data(&self) -> DocMapResult<Option<JsonValue>> {
        let cached = self.inner.cache.read().clone();
        cached
            .map(|entity| entity.entity_data(self.connection().registry()))
            .transpose()
    }

    /// Typed view of this reference. `None` when it does not point at a `T`.
    pub fn typed<T: Entity>(&self) -> Option<DocumentRef<T>> {
        (self.model_name() == T::model_name()).then(|| DocumentRef::from_handle(self.clone()))
    }

    fn cached<T: Entity>(&self) -> Option<T> {
        let cached = self.inner.cache.read().clone()?;
        cached
            .into_any_arc()
            .downcast::<T>()
            .ok()
            .map(|entity| (*entity).clone())
    }

    fn store<T: Entity>(&self, entity: T) {
        *self.inner.cache.write() = Some(Arc::new(entity));
    }
}

impl Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("model", &self.model_name())
            .field("path", &self.inner.path.to_string())
            .field("fetched", &self.is_fetched())
            .finish()
    }
}

/// A typed reference to one `T` document.
pub struct DocumentRef<T> {
    handle: DocumentHandle,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentRef<T> {
    fn clone(&self) -> Self {
        Self { handle: self.handle.clone(), _entity: PhantomData }
    }
}

impl<T> Debug for DocumentRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DocumentRef").field(&self.handle).finish()
    }
}

impl<T: Entity> DocumentRef<T> {
    pub(crate) fn from_handle(handle: DocumentHandle) -> Self {
        Self { handle, _entity: PhantomData }
    }

    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn path(&self) -> &DocumentPath {
        self.handle.path()
    }

    /// The collection holding the document.
    pub fn parent(&self) -> Collection<T> {
        Collection::from_handle(self.handle.parent().clone())
    }

    /// The store-level address of the document.
    pub fn native(&self) -> &DocumentPath {
        self.handle.path()
    }

    pub fn is_fetched(&self) -> bool {
        self.handle.is_fetched()
    }

    /// The value fetched by an earlier [`DocumentRef::get`].
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::NotFetched`] when nothing was fetched yet.
    pub fn cached(&self) -> DocMapResult<T> {
        self.handle.cached().ok_or(DocMapError::NotFetched)
    }

    /// Fetches the document once and returns the cached value afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::DocumentNotFound`] when the document does not exist.
    pub async fn get(&self) -> DocMapResult<T> {
        if let Some(cached) = self.handle.cached() {
            return Ok(cached);
        }

        let raw = self
            .handle
            .connection()
            .backend()
            .get_document(self.path())
            .await?;
        if !raw.exists() {
            return Err(DocMapError::DocumentNotFound(self.path().to_string()));
        }

        let entity: T = EntitySerializer::deserialize(&raw, self.handle.parent())?;
        self.handle.store(entity.clone());
        Ok(entity)
    }

    /// The subcollection of `C` documents under this document.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::RepositoryNotDefined`] when `C` is unknown and
    /// [`DocMapError::CollectionNotDeclared`] when `T` does not declare it as a subcollection.
    pub fn collection<C: Entity>(&self) -> DocMapResult<Collection<C>> {
        let repository = self.handle.connection().registry().get(C::model_name())?;
        Ok(Collection::from_handle(CollectionHandle::child(&self.handle, repository)?))
    }

    /// Listens to the document. Listener errors are logged.
    pub async fn on_snapshot<F>(&self, on_next: F) -> DocMapResult<Subscription>
    where
        F: FnMut(DocumentSnapshot<T>) + Send + 'static,
    {
        self.listen(on_next, SnapshotSink::new(None)).await
    }

    /// Listens to the document, sending store and deserialization errors to `on_error`.
    pub async fn on_snapshot_with_error<F, E>(&self, on_next: F, on_error: E) -> DocMapResult<Subscription>
    where
        F: FnMut(DocumentSnapshot<T>) + Send + 'static,
        E: FnMut(DocMapError) + Send + 'static,
    {
        self.listen(on_next, SnapshotSink::new(Some(Box::new(on_error))))
            .await
    }

    async fn listen<F>(&self, mut on_next: F, sink: SnapshotSink) -> DocMapResult<Subscription>
    where
        F: FnMut(DocumentSnapshot<T>) + Send + 'static,
    {
        let reference = self.clone();
        let errors = sink.clone();
        let listener: DocumentListener = Box::new(move |raw: RawDocumentSnapshot| {
            match DocumentSnapshot::from_raw(raw, &reference) {
                Ok(snapshot) => on_next(snapshot),
                Err(err) => errors.report(err),
            }
        });

        self.handle
            .connection()
            .backend()
            .listen_document(self.path(), listener, Some(sink.listener()))
            .await
    }
}

/// Fetches several references concurrently, in order.
pub async fn fetch_all<T: Entity>(references: &[DocumentRef<T>]) -> DocMapResult<Vec<T>> {
    try_join_all(references.iter().map(|reference| reference.get())).await
}

impl<T: Entity> FromFieldValue for DocumentRef<T> {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Reference(handle) => handle.typed(),
            _ => None,
        }
    }
}

impl<T: Entity> From<DocumentRef<T>> for FieldValue {
    fn from(reference: DocumentRef<T>) -> Self {
        FieldValue::Reference(reference.handle)
    }
}
