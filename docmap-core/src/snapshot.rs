//! Typed snapshots delivered by reads and realtime listeners.

use parking_lot::Mutex;
use std::{slice, sync::Arc, vec};
use tracing::warn;

use crate::{
    backend::{ChangeKind, ErrorListener, RawDocumentSnapshot, RawQuerySnapshot, SnapshotMetadata},
    collection::CollectionHandle,
    document::DocumentRef,
    entity::Entity,
    error::{DocMapError, DocMapResult},
    serializer::EntitySerializer,
};

/// One document as seen by a listener.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot<T> {
    doc: Option<T>,
    reference: DocumentRef<T>,
    metadata: SnapshotMetadata,
}

impl<T: Entity> DocumentSnapshot<T> {
    pub(crate) fn from_raw(raw: RawDocumentSnapshot, reference: &DocumentRef<T>) -> DocMapResult<Self> {
        let doc = if raw.document.exists() {
            Some(EntitySerializer::deserialize(&raw.document, reference.handle().parent())?)
        } else {
            None
        };
        Ok(Self { doc, reference: reference.clone(), metadata: raw.metadata })
    }

    pub fn exists(&self) -> bool {
        self.doc.is_some()
    }

    /// The entity, `None` when the document does not exist.
    pub fn doc(&self) -> Option<&T> {
        self.doc.as_ref()
    }

    pub fn into_doc(self) -> Option<T> {
        self.doc
    }

    pub fn reference(&self) -> &DocumentRef<T> {
        &self.reference
    }

    pub fn metadata(&self) -> SnapshotMetadata {
        self.metadata
    }
}

/// How one document moved between two query results.
///
/// `old_index` is `None` for added documents, `new_index` is `None` for removed ones.
#[derive(Debug, Clone)]
pub struct DocumentChange<T> {
    pub kind: ChangeKind,
    pub doc: T,
    pub old_index: Option<usize>,
    pub new_index: Option<usize>,
}

/// The result of a query, with the changes since the previous result for listeners.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    docs: Vec<T>,
    changes: Vec<DocumentChange<T>>,
    metadata: SnapshotMetadata,
}

impl<T: Entity> QuerySnapshot<T> {
    pub(crate) fn from_raw(raw: RawQuerySnapshot, collection: &CollectionHandle) -> DocMapResult<Self> {
        let docs = raw
            .docs
            .iter()
            .map(|document| EntitySerializer::deserialize(document, collection))
            .collect::<DocMapResult<Vec<T>>>()?;

        let changes = raw
            .changes
            .iter()
            .map(|change| {
                Ok(DocumentChange {
                    kind: change.kind,
                    doc: EntitySerializer::deserialize(&change.document, collection)?,
                    old_index: change.old_index,
                    new_index: change.new_index,
                })
            })
            .collect::<DocMapResult<Vec<_>>>()?;

        Ok(Self { docs, changes, metadata: raw.metadata })
    }

    pub fn docs(&self) -> &[T] {
        &self.docs
    }

    pub fn into_docs(self) -> Vec<T> {
        self.docs
    }

    pub fn size(&self) -> usize {
        self.docs.len()
    }

    pub fn empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn metadata(&self) -> SnapshotMetadata {
        self.metadata
    }

    /// Changes since the previous snapshot delivered to the same listener. For one-off reads
    /// every document is reported as added.
    pub fn doc_changes(&self) -> &[DocumentChange<T>] {
        &self.changes
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.docs.iter()
    }
}

impl<T> IntoIterator for QuerySnapshot<T> {
    type Item = T;
    type IntoIter = vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a QuerySnapshot<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}

/// Routes listener failures, from the store or from deserialization, to the caller's error
/// callback. Without one they are logged.
#[derive(Clone)]
pub(crate) struct SnapshotSink {
    on_error: Arc<Mutex<Option<ErrorListener>>>,
}

impl SnapshotSink {
    pub(crate) fn new(on_error: Option<ErrorListener>) -> Self {
        Self { on_error: Arc::new(Mutex::new(on_error)) }
    }

    pub(crate) fn report(&self, err: DocMapError) {
        match self.on_error.lock().as_mut() {
            Some(on_error) => on_error(err),
            None => warn!(error = %err, "snapshot listener failed without an error callback"),
        }
    }

    /// An error callback for the backend that reports into this sink.
    pub(crate) fn listener(&self) -> ErrorListener {
        let sink = self.clone();
        Box::new(move |err: DocMapError| sink.report(err))
    }
}
