//! In-memory storage implementation for hierarchical document stores.
//!
//! Documents live in per-collection maps keyed by collection path, so subcollections are just
//! further entries (`posts/hello-world/comments`). Writes notify the realtime listeners of
//! the written document and of every query over its collection.

use async_trait::async_trait;
use mea::{mutex::Mutex as AsyncMutex, rwlock::RwLock};
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Debug},
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

use docmap_core::{
    backend::{
        ChangeKind, DocumentListener, ErrorListener, QueryListener, RawChange, RawDocument,
        RawDocumentSnapshot, RawQuerySnapshot, SnapshotMetadata, StoreBackend, StoreBackendBuilder,
        Subscription,
    },
    error::{DocMapError, DocMapResult},
    path::{CollectionPath, DocumentPath},
    query::NativeQuery,
    value::{Timestamp, Value, ValueMap},
};

use crate::evaluator::{DocumentEvaluator, after_start, before_end, compare_order, order_values};

type CollectionMap = BTreeMap<String, ValueMap>;
type StoreMap = HashMap<CollectionPath, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait on top of async-aware read-write locks.
/// Documents of a collection are kept sorted by id, which is also the tie-break order of
/// query results.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses `Arc`-wrapped internal state, allowing it to be
/// safely shared across async tasks. Multiple clones of the same instance share the same
/// underlying data and listeners.
///
/// # Performance
///
/// Queries scan every document of the addressed collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use docmap::backend::StoreBackend;
/// use docmap::memory::InMemoryStore;
/// use docmap::path::CollectionPath;
///
/// let store = InMemoryStore::new();
/// let mut data = ValueMap::new();
/// data.insert("name".into(), "Alice".into());
///
/// let path = store.add_document(&CollectionPath::root("users"), data).await?;
/// assert!(store.get_document(&path).await?.exists());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection path -> (document id -> document)
    store: Arc<RwLock<StoreMap>>,
    watchers: Arc<Mutex<Watchers>>,
    /// Held while listeners are attached or notified, so deliveries happen one at a time
    /// and each reads the store after every earlier one.
    delivery: Arc<AsyncMutex<()>>,
}

struct DocumentWatch {
    path: DocumentPath,
    on_next: Mutex<DocumentListener>,
}

struct QueryWatch {
    query: NativeQuery,
    state: Mutex<QueryState>,
}

struct QueryState {
    last: Vec<RawDocument>,
    on_next: QueryListener,
    on_error: Option<ErrorListener>,
}

#[derive(Default)]
struct Watchers {
    next_id: u64,
    documents: HashMap<u64, Arc<DocumentWatch>>,
    queries: HashMap<u64, Arc<QueryWatch>>,
}

impl Watchers {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Debug for Watchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchers")
            .field("documents", &self.documents.len())
            .field("queries", &self.queries.len())
            .finish()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docmap::memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Paths of every collection holding at least one document.
    pub async fn collection_paths(&self) -> Vec<CollectionPath> {
        let store = self.store.read().await;
        let mut paths = store
            .iter()
            .filter(|(_, documents)| !documents.is_empty())
            .map(|(path, _)| path.clone())
            .collect::<Vec<_>>();
        paths.sort();
        paths
    }

    /// Number of active realtime listeners.
    pub fn listener_count(&self) -> usize {
        let watchers = self.watchers.lock();
        watchers.documents.len() + watchers.queries.len()
    }

    /// Delivers the state after a write of `path` to the listeners that can observe it.
    async fn notify(&self, path: &DocumentPath) {
        let _delivery = self.delivery.lock().await;
        let collection = path.parent();
        let (documents, queries) = {
            let watchers = self.watchers.lock();
            let documents = watchers
                .documents
                .values()
                .filter(|watch| watch.path == *path)
                .cloned()
                .collect::<Vec<_>>();
            let queries = watchers
                .queries
                .values()
                .filter(|watch| watch.query.collection == collection)
                .cloned()
                .collect::<Vec<_>>();
            (documents, queries)
        };

        if documents.is_empty() && queries.is_empty() {
            return;
        }

        let store = self.store.read().await;
        let data = lookup(&store, path).cloned();
        let results = queries
            .into_iter()
            .map(|watch| {
                let result = execute(&store, &watch.query);
                (watch, result)
            })
            .collect::<Vec<_>>();
        drop(store);

        for watch in documents {
            let mut on_next = watch.on_next.lock();
            (*on_next)(RawDocumentSnapshot {
                document: RawDocument::new(path.clone(), data.clone()),
                metadata: SnapshotMetadata::default(),
            });
        }

        for (watch, result) in results {
            let mut state = watch.state.lock();
            match result {
                Ok(docs) => {
                    let changes = diff(&state.last, &docs);
                    if changes.is_empty() {
                        continue;
                    }
                    state.last = docs.clone();
                    (state.on_next)(RawQuerySnapshot {
                        docs,
                        changes,
                        metadata: SnapshotMetadata::default(),
                    });
                }
                Err(err) => {
                    if let Some(on_error) = state.on_error.as_mut() {
                        on_error(err);
                    }
                }
            }
        }
    }
}

fn lookup<'a>(store: &'a StoreMap, path: &DocumentPath) -> Option<&'a ValueMap> {
    store.get(&path.parent())?.get(path.id())
}

/// Replaces every server-time sentinel, including nested ones, with `now`.
fn resolve_server_timestamps(data: ValueMap, now: Timestamp) -> ValueMap {
    data.into_iter()
        .map(|(key, value)| (key, resolve_value(value, now)))
        .collect()
}

fn resolve_value(value: Value, now: Timestamp) -> Value {
    match value {
        Value::ServerTimestamp => Value::Timestamp(now),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| resolve_value(item, now))
                .collect(),
        ),
        Value::Map(map) => Value::Map(resolve_server_timestamps(map, now)),
        other => other,
    }
}

/// Runs a query against the current contents of the store.
fn execute(store: &StoreMap, query: &NativeQuery) -> DocMapResult<Vec<RawDocument>> {
    let Some(collection) = store.get(&query.collection) else {
        return Ok(Vec::new());
    };

    let candidates = match &query.filter {
        Some(filter) => DocumentEvaluator::filter_documents(collection.iter(), filter)?,
        None => collection.iter().collect(),
    };

    // Documents lacking an ordering field are not part of an ordered result.
    let mut ordered = candidates
        .into_iter()
        .filter_map(|(id, data)| order_values(data, &query.order_by).map(|values| (id, data, values)))
        .collect::<Vec<_>>();
    ordered.sort_by(|a, b| compare_order(&a.2, &b.2, &query.order_by));

    if !query.order_by.is_empty() {
        if let Some(start) = &query.start {
            ordered.retain(|(_, _, values)| after_start(values, start, &query.order_by));
        }
        if let Some(end) = &query.end {
            ordered.retain(|(_, _, values)| before_end(values, end, &query.order_by));
        }
    }

    if let Some(limit) = query.limit {
        ordered.truncate(limit);
    }

    Ok(ordered
        .into_iter()
        .map(|(id, data, _)| RawDocument::new(query.collection.doc(id.clone()), Some(data.clone())))
        .collect())
}

/// Changes turning `old` into `new`: removals first, then additions and modifications in
/// result order. Moved documents count as modified.
fn diff(old: &[RawDocument], new: &[RawDocument]) -> Vec<RawChange> {
    let mut changes = old
        .iter()
        .enumerate()
        .filter(|(_, document)| !new.iter().any(|other| other.path == document.path))
        .map(|(index, document)| RawChange {
            kind: ChangeKind::Removed,
            document: document.clone(),
            old_index: Some(index),
            new_index: None,
        })
        .collect::<Vec<_>>();

    for (index, document) in new.iter().enumerate() {
        match old.iter().position(|other| other.path == document.path) {
            None => changes.push(RawChange {
                kind: ChangeKind::Added,
                document: document.clone(),
                old_index: None,
                new_index: Some(index),
            }),
            Some(old_index) if old_index != index || old[old_index].data != document.data => {
                changes.push(RawChange {
                    kind: ChangeKind::Modified,
                    document: document.clone(),
                    old_index: Some(old_index),
                    new_index: Some(index),
                })
            }
            Some(_) => {}
        }
    }

    changes
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn get_document(&self, path: &DocumentPath) -> DocMapResult<RawDocument> {
        let store = self.store.read().await;
        Ok(RawDocument::new(path.clone(), lookup(&store, path).cloned()))
    }

    async fn set_document(&self, path: &DocumentPath, data: ValueMap) -> DocMapResult<()> {
        {
            let mut store = self.store.write().await;
            store
                .entry(path.parent())
                .or_default()
                .insert(path.id().to_string(), resolve_server_timestamps(data, Timestamp::now()));
        }

        self.notify(path).await;
        Ok(())
    }

    async fn update_document(&self, path: &DocumentPath, data: ValueMap) -> DocMapResult<()> {
        {
            let mut store = self.store.write().await;
            let existing = store
                .get_mut(&path.parent())
                .and_then(|collection| collection.get_mut(path.id()))
                .ok_or_else(|| DocMapError::DocumentNotFound(path.to_string()))?;

            existing.extend(resolve_server_timestamps(data, Timestamp::now()));
        }

        self.notify(path).await;
        Ok(())
    }

    async fn delete_document(&self, path: &DocumentPath) -> DocMapResult<()> {
        let removed = {
            let mut store = self.store.write().await;
            store
                .get_mut(&path.parent())
                .and_then(|collection| collection.remove(path.id()))
                .is_some()
        };

        if removed {
            self.notify(path).await;
        }
        Ok(())
    }

    async fn add_document(&self, collection: &CollectionPath, data: ValueMap) -> DocMapResult<DocumentPath> {
        let path = collection.doc(Uuid::new_v4().simple().to_string());
        debug!(path = %path, "adding document under generated id");

        self.set_document(&path, data).await?;
        Ok(path)
    }

    async fn run_query(&self, query: &NativeQuery) -> DocMapResult<RawQuerySnapshot> {
        let store = self.store.read().await;
        Ok(RawQuerySnapshot::added(execute(&store, query)?))
    }

    async fn listen_document(
        &self,
        path: &DocumentPath,
        on_next: DocumentListener,
        _on_error: Option<ErrorListener>,
    ) -> DocMapResult<Subscription> {
        let _delivery = self.delivery.lock().await;
        let store = self.store.read().await;
        let data = lookup(&store, path).cloned();

        let watch = Arc::new(DocumentWatch { path: path.clone(), on_next: Mutex::new(on_next) });
        let mut delivering = watch.on_next.lock();
        let id = {
            let mut watchers = self.watchers.lock();
            let id = watchers.next_id();
            watchers.documents.insert(id, watch.clone());
            id
        };
        drop(store);

        debug!(path = %path, listener = id, "document listener attached");
        (*delivering)(RawDocumentSnapshot {
            document: RawDocument::new(path.clone(), data),
            metadata: SnapshotMetadata::default(),
        });
        drop(delivering);

        let watchers = Arc::downgrade(&self.watchers);
        Ok(Subscription::new(move || {
            if let Some(watchers) = watchers.upgrade() {
                watchers.lock().documents.remove(&id);
            }
        }))
    }

    async fn listen_query(
        &self,
        query: &NativeQuery,
        on_next: QueryListener,
        on_error: Option<ErrorListener>,
    ) -> DocMapResult<Subscription> {
        let _delivery = self.delivery.lock().await;
        let store = self.store.read().await;
        let docs = execute(&store, query)?;

        let watch = Arc::new(QueryWatch {
            query: query.clone(),
            state: Mutex::new(QueryState { last: docs.clone(), on_next, on_error }),
        });
        let mut delivering = watch.state.lock();
        let id = {
            let mut watchers = self.watchers.lock();
            let id = watchers.next_id();
            watchers.queries.insert(id, watch.clone());
            id
        };
        drop(store);

        debug!(collection = %query.collection, listener = id, "query listener attached");
        (delivering.on_next)(RawQuerySnapshot::added(docs));
        drop(delivering);

        let watchers = Arc::downgrade(&self.watchers);
        Ok(Subscription::new(move || {
            if let Some(watchers) = watchers.upgrade() {
                watchers.lock().queries.remove(&id);
            }
        }))
    }

    /// Detaches every listener.
    async fn shutdown(self) -> DocMapResult<()> {
        let mut watchers = self.watchers.lock();
        watchers.documents.clear();
        watchers.queries.clear();
        Ok(())
    }
}

/// Builder for [`InMemoryStore`]. The store takes no options.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocMapResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
