//! Object-document mapping for hierarchical document stores.
//!
//! This crate is the primary entry point of the docmap project. It re-exports the core types
//! from `docmap-core` and the bundled backends, so applications depend on one crate.
//!
//! # Features
//!
//! - **Typed repositories** - One [`Collection`](collection::Collection) per entity type, with
//!   get, create, update, find and remove
//! - **Field mapping** - Name conversion, nested map objects, document references, timestamps
//!   and geopoints
//! - **Subcollections** - Entities nested under documents, reachable from each loaded entity
//! - **Queries and listeners** - Chainable queries over entity properties and realtime snapshots
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Clone, Default)]
//! pub struct Post {
//!     base: EntityBase,
//!     pub title: Option<String>,
//!     pub posted: Option<Timestamp>,
//! }
//!
//! impl Model for Post {
//!     fn model_name() -> &'static str {
//!         "Post"
//!     }
//!
//!     fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
//!         schema.root_collection(CollectionConfig::named("posts"));
//!         schema.field("title", FieldConfig::default())?;
//!         schema.timestamp("posted", TimestampConfig::default().update_on_create(true))?;
//!         Ok(())
//!     }
//!
//!     fn read(&self, property: &str) -> FieldValue {
//!         match property {
//!             "title" => self.title.clone().into(),
//!             "posted" => self.posted.into(),
//!             _ => FieldValue::Null,
//!         }
//!     }
//!
//!     fn write(&mut self, property: &str, value: FieldValue) {
//!         match property {
//!             "title" => self.title = value.cast(),
//!             "posted" => self.posted = value.cast(),
//!             _ => {}
//!         }
//!     }
//! }
//!
//! impl Entity for Post {
//!     fn base(&self) -> &EntityBase { &self.base }
//!     fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocMapResult<()> {
//!     let docmap = DocMap::new();
//!     docmap.initialize(InMemoryStore::builder().build().await?, None);
//!
//!     let posts = docmap.collection::<Post>()?;
//!     let created = posts
//!         .create(&Post { title: Some("Hello World!".into()), ..Default::default() })
//!         .await?
//!         .unwrap();
//!
//!     let found = posts
//!         .query()
//!         .where_("title", FieldOp::Eq, "Hello World!")?
//!         .get()
//!         .await?;
//!     assert_eq!(found.docs()[0].id(), created.id());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Registration
//!
//! A model is described the first time a collection of it is requested, or explicitly with
//! [`DocMap::register`](store::DocMap::register). Describing a model also describes every
//! model it maps, references or nests. A subcollection only learns its owner when the
//! owning model is described. References read before that keep their stored path, but
//! their collection has no parent document to walk up to.
//!
//! ```ignore
//! docmap.register::<Post>()?;
//! docmap.register::<Author>()?;
//! ```
//!
//! # Realtime
//!
//! Queries and document references accept listeners. Every listener receives the current
//! state first and then each change until its [`Subscription`](backend::Subscription) is
//! unsubscribed.
//!
//! ```ignore
//! let subscription = posts
//!     .query()
//!     .order_by("title", None)?
//!     .on_snapshot(|snapshot| {
//!         for change in snapshot.doc_changes() {
//!             println!("{:?} {:?}", change.kind, change.doc.title);
//!         }
//!     })
//!     .await?;
//!
//! subscription.unsubscribe();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing

pub mod prelude;

pub use docmap_core::{
    backend, case, collection, config, criteria, document, entity, error, field, path, query,
    registry, serializer, snapshot, store, value,
};

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmap_memory::{InMemoryStore, InMemoryStoreBuilder};
}
