//! Collection handles.
//!
//! A collection is addressed by its path and bound to the repository of the entity stored in
//! it. Root collections come from [`DocMap::collection`](crate::store::DocMap::collection);
//! subcollections come from a parent document, either through
//! [`DocumentRef::collection`](crate::document::DocumentRef::collection) or as the handles
//! written into freshly read entities.
//!
//! # Collection Types
//!
//! - [`CollectionHandle`] - Untyped collection, used inside field values and references
//! - [`Collection`] - Typed collection for entity `T`
//!
//! # Example
//!
//! ```ignore
//! let posts = docmap.collection::<Post>()?;
//! let created = posts
//!     .create(&Post { title: Some("Hello".into()), ..Post::default() })
//!     .await?;
//!
//! let comments = created.reference().unwrap().collection::<Comment>()?;
//! let all = comments.find(None).await?;
//! ```

use std::{
    fmt::{self, Debug},
    marker::PhantomData,
    sync::Arc,
};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    criteria::{Query, QueryCriteria},
    document::{DocumentHandle, DocumentRef},
    entity::Entity,
    error::{DocMapError, DocMapResult},
    field::{FieldValue, FromFieldValue, WriteKind},
    path::CollectionPath,
    query::NativeQuery,
    registry::{Registry, Repository},
    serializer::EntitySerializer,
    store::Connection,
};

struct CollectionInner {
    repository: Arc<Repository>,
    path: CollectionPath,
    parent: Option<DocumentHandle>,
    connection: Connection,
}

/// An untyped collection bound to the repository of the entity it stores.
#[derive(Clone)]
pub struct CollectionHandle {
    inner: Arc<CollectionInner>,
}

impl CollectionHandle {
    fn new(
        repository: Arc<Repository>,
        path: CollectionPath,
        parent: Option<DocumentHandle>,
        connection: Connection,
    ) -> Self {
        Self {
            inner: Arc::new(CollectionInner { repository, path, parent, connection }),
        }
    }

    /// The top-level collection of `repository`'s entity.
    pub(crate) fn root(connection: &Connection, repository: Arc<Repository>) -> DocMapResult<Self> {
        let path = CollectionPath::root(repository.collection_name()?);
        Ok(Self::new(repository, path, None, connection.clone()))
    }

    /// A subcollection under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::CollectionNotDeclared`] when `repository`'s entity is not a
    /// declared subcollection of the parent's entity.
    pub(crate) fn child(parent: &DocumentHandle, repository: Arc<Repository>) -> DocMapResult<Self> {
        if !parent.repository().has_subcollection(repository.name()) {
            return Err(DocMapError::CollectionNotDeclared {
                child: repository.name().to_string(),
                parent: parent.model_name().to_string(),
            });
        }
        let path = parent.path().collection(repository.collection_name()?);
        Ok(Self::new(repository, path, Some(parent.clone()), parent.connection().clone()))
    }

    /// Rebuilds the handle chain leading to a stored collection path.
    ///
    /// Each level above the root is resolved through the parent of the repository below it.
    /// A level whose owner is unknown, because the owning model was never described, stays
    /// at the stored path without a parent document.
    pub(crate) fn resolve(
        connection: &Connection,
        repository: Arc<Repository>,
        path: &CollectionPath,
    ) -> DocMapResult<Self> {
        let limit = connection.registry().len();
        Self::resolve_at(connection, repository, path, limit)
    }

    fn resolve_at(
        connection: &Connection,
        repository: Arc<Repository>,
        path: &CollectionPath,
        remaining: usize,
    ) -> DocMapResult<Self> {
        let Some(document) = path.parent() else {
            return Ok(Self::new(repository, path.clone(), None, connection.clone()));
        };

        let parent_repository = match repository.parent() {
            Some(parent) if remaining > 0 && parent.is_entity() => parent,
            _ => {
                debug!(
                    model = repository.name(),
                    path = %path,
                    "no owning model for stored collection, keeping the stored path"
                );
                return Ok(Self::new(repository, path.clone(), None, connection.clone()));
            }
        };

        let grandparent = Self::resolve_at(connection, parent_repository, &document.parent(), remaining - 1)?;
        let parent = DocumentHandle::new(grandparent, document.id());
        Ok(Self::new(repository, path.clone(), Some(parent), connection.clone()))
    }

    pub fn path(&self) -> &CollectionPath {
        &self.inner.path
    }

    /// The document this collection is nested under, `None` for root collections.
    pub fn parent(&self) -> Option<&DocumentHandle> {
        self.inner.parent.as_ref()
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.inner.repository
    }

    pub fn model_name(&self) -> &'static str {
        self.inner.repository.name()
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Typed view of this collection. `None` when it does not store `T`.
    pub fn typed<T: Entity>(&self) -> Option<Collection<T>> {
        (self.model_name() == T::model_name()).then(|| Collection::from_handle(self.clone()))
    }
}

impl Debug for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("model", &self.model_name())
            .field("path", &self.inner.path.to_string())
            .finish()
    }
}

/// A typed collection of `T` documents.
///
/// # Type Parameters
///
/// * `T` - The entity stored in the collection
pub struct Collection<T> {
    handle: CollectionHandle,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self { handle: self.handle.clone(), _entity: PhantomData }
    }
}

impl<T> Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Collection").field(&self.handle).finish()
    }
}

impl<T: Entity> Collection<T> {
    pub(crate) fn from_handle(handle: CollectionHandle) -> Self {
        Self { handle, _entity: PhantomData }
    }

    pub fn handle(&self) -> &CollectionHandle {
        &self.handle
    }

    pub fn path(&self) -> &CollectionPath {
        self.handle.path()
    }

    /// The untyped document this collection is nested under.
    pub fn parent(&self) -> Option<&DocumentHandle> {
        self.handle.parent()
    }

    /// A reference to the document with the given id. Nothing is fetched.
    pub fn doc(&self, id: impl Into<String>) -> DocumentRef<T> {
        DocumentRef::from_handle(DocumentHandle::new(self.handle.clone(), id))
    }

    /// Reads one document.
    ///
    /// # Returns
    ///
    /// `None` when no document with that id exists.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or a deserialization error if the stored document does
    /// not fit `T`.
    pub async fn get(&self, id: &str) -> DocMapResult<Option<T>> {
        let path = self.path().doc(id);
        let raw = self.backend().get_document(&path).await?;
        if !raw.exists() {
            return Ok(None);
        }
        EntitySerializer::deserialize(&raw, &self.handle).map(Some)
    }

    /// Writes a new document and reads it back.
    ///
    /// Entities with an id are written under that id, replacing any existing document;
    /// otherwise the backend generates one.
    pub async fn create(&self, entity: &T) -> DocMapResult<Option<T>> {
        let serialized = EntitySerializer::serialize(self.registry(), entity, WriteKind::Create)?;
        let id = match serialized.id {
            Some(id) => {
                let path = self.path().doc(&id);
                self.backend().set_document(&path, serialized.data).await?;
                id
            }
            None => {
                let path = self
                    .backend()
                    .add_document(self.path(), serialized.data)
                    .await?;
                path.id().to_string()
            }
        };
        debug!(collection = %self.path(), id = %id, "created document");
        self.get(&id).await
    }

    /// Merges the entity's fields into its existing document and reads it back.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::MissingId`] before touching the store when the entity has no id,
    /// and [`DocMapError::DocumentNotFound`] when the document does not exist.
    pub async fn update(&self, entity: &T) -> DocMapResult<Option<T>> {
        let Some(id) = entity.id() else {
            return Err(DocMapError::MissingId(T::model_name().to_string()));
        };
        let serialized = EntitySerializer::serialize(self.registry(), entity, WriteKind::Update)?;
        let path = self.path().doc(id);
        self.backend().update_document(&path, serialized.data).await?;
        debug!(collection = %self.path(), id = %id, "updated document");
        self.get(id).await
    }

    /// Documents matching `criteria`, or the whole collection when `None`.
    ///
    /// # Errors
    ///
    /// Criteria naming unregistered properties fail before the store is queried.
    pub async fn find(&self, criteria: Option<QueryCriteria>) -> DocMapResult<Vec<T>> {
        let query = match criteria {
            Some(criteria) => self.query().apply(criteria)?.native().clone(),
            None => NativeQuery::new(self.path().clone()),
        };
        let snapshot = self.backend().run_query(&query).await?;
        snapshot
            .docs
            .iter()
            .map(|raw| EntitySerializer::deserialize(raw, &self.handle))
            .collect()
    }

    /// Deletes one document. Removing a missing document succeeds.
    pub async fn remove(&self, id: &str) -> DocMapResult<()> {
        let path = self.path().doc(id);
        self.backend().delete_document(&path).await?;
        debug!(collection = %self.path(), id = %id, "removed document");
        Ok(())
    }

    /// A chainable query over this collection.
    pub fn query(&self) -> Query<T> {
        Query::new(self.clone())
    }

    fn registry(&self) -> &Registry {
        self.handle.connection().registry()
    }

    fn backend(&self) -> &dyn StoreBackend {
        self.handle.connection().backend()
    }
}

impl<T: Entity> FromFieldValue for Collection<T> {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Collection(handle) => handle.typed(),
            _ => None,
        }
    }
}

impl<T: Entity> From<Collection<T>> for FieldValue {
    fn from(collection: Collection<T>) -> Self {
        FieldValue::Collection(collection.handle)
    }
}
