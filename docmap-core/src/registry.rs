//! Per-model metadata: collections, fields and subcollections.
//!
//! The [`Registry`] holds one [`Repository`] per model name. Repositories are created lazily,
//! either when a model is registered or the first time another model refers to it, and filled
//! in by running the model's [`Model::describe`](crate::entity::Model::describe) against a
//! [`Schema`]. A model is described at most once per registry, so self-referencing or
//! mutually-referencing models terminate.
//!
//! Repositories form a tree: map fields and subcollections set the parent pointer of the
//! repository they point at, which is how references to nested documents are resolved back
//! into collection chains.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::{
    fmt::{self, Debug},
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::debug;

use crate::{
    config::FieldConversion,
    entity::{AnyModel, Entity, ModelBinding},
    error::{DocMapError, DocMapResult},
    field::{
        FieldConfig, FieldKind, FieldMeta, MapConfig, TimestampConfig, geo_point, map, reference,
        standard, timestamp,
    },
};

/// Collection options for root collections and subcollections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Store-facing collection name. Derived from the conversion policy when unset.
    pub name: Option<String>,
}

impl CollectionConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }
}

/// Metadata accumulated for one model.
pub struct Repository {
    name: &'static str,
    collection: RwLock<Option<String>>,
    parent: RwLock<Weak<Repository>>,
    fields: RwLock<IndexMap<String, Arc<FieldMeta>>>,
    subcollections: RwLock<IndexMap<String, Arc<Repository>>>,
    described: AtomicBool,
}

impl Repository {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            collection: RwLock::new(None),
            parent: RwLock::new(Weak::new()),
            fields: RwLock::new(IndexMap::new()),
            subcollections: RwLock::new(IndexMap::new()),
            described: AtomicBool::new(false),
        }
    }

    /// The model name this repository was created for.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The store-facing collection name.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::Configuration`] for models that never declared a collection,
    /// such as nested map types.
    pub fn collection_name(&self) -> DocMapResult<String> {
        self.collection.read().clone().ok_or_else(|| {
            DocMapError::Configuration(format!("{} has no collection declared", self.name))
        })
    }

    /// Whether the model is stored in a collection of its own.
    pub fn is_entity(&self) -> bool {
        self.collection.read().is_some()
    }

    /// The repository that declared this one as a map field or subcollection.
    pub fn parent(&self) -> Option<Arc<Repository>> {
        self.parent.read().upgrade()
    }

    /// Snapshot of the registered fields, keyed by property name in declaration order.
    pub fn fields(&self) -> IndexMap<String, Arc<FieldMeta>> {
        self.fields.read().clone()
    }

    pub fn field(&self, property: &str) -> Option<Arc<FieldMeta>> {
        self.fields.read().get(property).cloned()
    }

    /// Snapshot of the declared subcollections, keyed by property name.
    pub fn subcollections(&self) -> IndexMap<String, Arc<Repository>> {
        self.subcollections.read().clone()
    }

    /// Whether `model` is declared as a subcollection of this repository.
    pub fn has_subcollection(&self, model: &str) -> bool {
        self.subcollections.read().values().any(|child| child.name == model)
    }

    pub fn is_described(&self) -> bool {
        self.described.load(Ordering::Acquire)
    }

    pub(crate) fn set_collection(&self, name: String) {
        *self.collection.write() = Some(name);
    }

    pub(crate) fn set_parent(&self, parent: &Arc<Repository>) {
        *self.parent.write() = Arc::downgrade(parent);
    }

    fn insert_field(&self, property: &str, meta: FieldMeta) {
        self.fields.write().insert(property.to_string(), Arc::new(meta));
    }

    fn insert_subcollection(&self, property: &str, child: Arc<Repository>) {
        self.subcollections.write().insert(property.to_string(), child);
    }
}

impl Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("collection", &*self.collection.read())
            .field("parent", &self.parent().map(|parent| parent.name))
            .field("fields", &self.fields.read().keys().collect::<Vec<_>>())
            .field(
                "subcollections",
                &self.subcollections.read().keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// All repositories known to one [`DocMap`](crate::store::DocMap).
#[derive(Debug, Default)]
pub struct Registry {
    repositories: RwLock<IndexMap<&'static str, Arc<Repository>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`DocMapError::RepositoryNotDefined`] when nothing created the repository yet.
    pub fn get(&self, name: &str) -> DocMapResult<Arc<Repository>> {
        self.repositories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DocMapError::RepositoryNotDefined(name.to_string()))
    }

    pub fn get_or_create(&self, name: &'static str) -> Arc<Repository> {
        if let Some(repository) = self.repositories.read().get(name) {
            return repository.clone();
        }
        self.repositories
            .write()
            .entry(name)
            .or_insert_with(|| Arc::new(Repository::new(name)))
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.repositories.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.repositories.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.repositories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.read().is_empty()
    }

    /// Runs the model's `describe` against its repository unless that already happened.
    ///
    /// A failed description leaves the repository undescribed so that it can be retried.
    pub fn describe(&self, binding: ModelBinding, conversion: FieldConversion) -> DocMapResult<()> {
        let repository = self.get_or_create(binding.name());
        if repository.described.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut schema = Schema {
            registry: self,
            repository: repository.clone(),
            conversion,
            sample: binding.create(),
        };

        if let Err(err) = binding.describe(&mut schema) {
            repository.described.store(false, Ordering::Release);
            return Err(err);
        }

        debug!(
            model = binding.name(),
            collection = ?repository.collection.read().as_deref(),
            fields = repository.fields.read().len(),
            "described model"
        );
        Ok(())
    }
}

/// Builder passed to [`Model::describe`](crate::entity::Model::describe).
///
/// Every declaration is recorded on the model's repository immediately. Declarations that
/// point at other models describe those models as well.
pub struct Schema<'a> {
    registry: &'a Registry,
    repository: Arc<Repository>,
    conversion: FieldConversion,
    sample: Box<dyn AnyModel>,
}

impl<'a> Schema<'a> {
    pub fn model_name(&self) -> &'static str {
        self.repository.name
    }

    /// Stores the model in a top-level collection, named after the model when unnamed.
    pub fn root_collection(&mut self, config: CollectionConfig) -> &mut Self {
        let name = config
            .name
            .unwrap_or_else(|| self.conversion.apply(self.repository.name));
        self.repository.set_collection(name);
        self
    }

    /// A plain field, stored as-is.
    pub fn field(&mut self, property: &str, config: FieldConfig) -> DocMapResult<&mut Self> {
        standard::register(self, property, config)?;
        Ok(self)
    }

    /// A nested model embedded as an object, or an array of them.
    pub fn map(&mut self, property: &str, config: MapConfig) -> DocMapResult<&mut Self> {
        map::register(self, property, config)?;
        Ok(self)
    }

    /// A reference to a document of entity `E`, or an array of them.
    pub fn document_ref<E: Entity>(&mut self, property: &str, config: FieldConfig) -> DocMapResult<&mut Self> {
        reference::register::<E>(self, property, config)?;
        Ok(self)
    }

    pub fn timestamp(&mut self, property: &str, config: TimestampConfig) -> DocMapResult<&mut Self> {
        timestamp::register(self, property, config)?;
        Ok(self)
    }

    pub fn geo_point(&mut self, property: &str, config: FieldConfig) -> DocMapResult<&mut Self> {
        geo_point::register(self, property, config)?;
        Ok(self)
    }

    /// Declares a collection of `E` documents under each document of this model.
    ///
    /// The collection is named after the property when unnamed. Deserialized entities get a
    /// collection handle written to `property`.
    pub fn sub_collection<E: Entity>(&mut self, property: &str, config: CollectionConfig) -> DocMapResult<&mut Self> {
        let binding = ModelBinding::of::<E>();
        let child = self.registry.get_or_create(binding.name());
        let name = config
            .name
            .unwrap_or_else(|| self.conversion.apply(property));

        child.set_collection(name);
        child.set_parent(&self.repository);
        self.repository.insert_subcollection(property, child);
        self.registry.describe(binding, self.conversion)?;
        Ok(self)
    }

    pub(crate) fn configure(&self, config: &FieldConfig, property: &str, kind: FieldKind) -> FieldMeta {
        let sample = self.sample.read_field(property);
        FieldMeta::configure(config, property, &sample, kind, self.conversion)
    }

    pub(crate) fn insert(&mut self, property: &str, meta: FieldMeta) {
        debug!(
            model = self.repository.name,
            property,
            name = %meta.name,
            kind = ?meta.kind,
            "registered field"
        );
        self.repository.insert_field(property, meta);
    }

    pub(crate) fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub(crate) fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    pub(crate) fn conversion(&self) -> FieldConversion {
        self.conversion
    }
}

impl Debug for Schema<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("model", &self.repository.name)
            .field("conversion", &self.conversion)
            .finish()
    }
}
