//! The process-level entry point: registry, backend connection and configuration.
//!
//! A [`DocMap`] starts out disconnected. Models can be registered at any time; operations that
//! reach the store need [`DocMap::initialize`] to have been called first. [`DocMap::destroy`]
//! drops the connection and resets the configuration but keeps every registered model, so the
//! same process can reconnect without describing its models again.
//!
//! # Example
//!
//! ```ignore
//! use docmap::prelude::*;
//!
//! let docmap = DocMap::new();
//! docmap.initialize(InMemoryStore::builder().build().await?, None);
//!
//! let posts = docmap.collection::<Post>()?;
//! let post = posts.get("hello-world").await?;
//! ```

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::{
    backend::StoreBackend,
    collection::{Collection, CollectionHandle},
    config::DocMapConfig,
    entity::{Entity, Model, ModelBinding},
    error::{DocMapError, DocMapResult},
    registry::{Registry, Repository},
};

#[derive(Debug, Default)]
struct DocMapInner {
    registry: Registry,
    backend: RwLock<Option<Arc<dyn StoreBackend>>>,
    config: RwLock<DocMapConfig>,
}

/// Registry, connection and configuration shared by every handle built from it.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone, Default)]
pub struct DocMap {
    inner: Arc<DocMapInner>,
}

impl DocMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A disconnected instance with the given configuration.
    pub fn with_config(config: DocMapConfig) -> Self {
        let docmap = Self::new();
        *docmap.inner.config.write() = config;
        docmap
    }

    /// Connects to a backend, replacing any previous connection.
    ///
    /// When `config` is given it replaces the current configuration. Models described
    /// afterwards pick up its field conversion.
    pub fn initialize<B>(&self, backend: B, config: Option<DocMapConfig>)
    where
        B: StoreBackend + 'static,
    {
        if let Some(config) = config {
            *self.inner.config.write() = config;
        }
        *self.inner.backend.write() = Some(Arc::new(backend));
        info!(
            field_conversion = ?self.inner.config.read().field_conversion,
            "document store initialized"
        );
    }

    /// Drops the connection and resets the configuration. Registered models are kept.
    pub fn destroy(&self) {
        self.inner.backend.write().take();
        *self.inner.config.write() = DocMapConfig::default();
        info!("document store destroyed");
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.backend.read().is_some()
    }

    pub fn config(&self) -> DocMapConfig {
        self.inner.config.read().clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Describes `M` and every model it refers to. Registering twice is a no-op.
    pub fn register<M: Model>(&self) -> DocMapResult<()> {
        let conversion = self.inner.config.read().field_conversion;
        self.inner
            .registry
            .describe(ModelBinding::of::<M>(), conversion)
    }

    /// # Errors
    ///
    /// Returns [`DocMapError::RepositoryNotDefined`] when no model of that name is known.
    pub fn repository(&self, name: &str) -> DocMapResult<Arc<Repository>> {
        self.inner.registry.get(name)
    }

    /// The current connection.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::NotInitialized`] before [`DocMap::initialize`].
    pub fn connection(&self) -> DocMapResult<Connection> {
        let backend = self
            .inner
            .backend
            .read()
            .clone()
            .ok_or(DocMapError::NotInitialized)?;
        Ok(Connection { docmap: self.clone(), backend })
    }

    /// The top-level collection of `E`, registering `E` on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DocMapError::NotInitialized`] when disconnected and
    /// [`DocMapError::Configuration`] when `E` declares no collection.
    pub fn collection<E: Entity>(&self) -> DocMapResult<Collection<E>> {
        let connection = self.connection()?;
        self.register::<E>()?;
        let repository = self.repository(E::model_name())?;
        Ok(Collection::from_handle(CollectionHandle::root(&connection, repository)?))
    }
}

/// A [`DocMap`] paired with the backend that was connected when a handle was built.
///
/// Handles keep working against that backend even if the [`DocMap`] is later destroyed or
/// re-initialized.
#[derive(Debug, Clone)]
pub struct Connection {
    docmap: DocMap,
    backend: Arc<dyn StoreBackend>,
}

impl Connection {
    pub fn docmap(&self) -> &DocMap {
        &self.docmap
    }

    pub fn backend(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        self.docmap.registry()
    }
}
