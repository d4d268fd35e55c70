//! An object-document mapping layer for hierarchical document stores.
//!
//! This crate is the core of the docmap project and provides:
//!
//! - **Entity traits** ([`entity`]) - Models, entities and their type-erased forms
//! - **Registration** ([`registry`], [`field`]) - Per-model field metadata built from a schema
//! - **Serialization** ([`serializer`]) - Entity to document conversion and back
//! - **Handles** ([`collection`], [`document`], [`criteria`], [`snapshot`]) - Typed collections,
//!   document references, queries and snapshots
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Native values** ([`value`], [`path`], [`query`]) - The store-side data model
//! - **Process store** ([`store`]) - Registry, connection and configuration
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmap::prelude::*;
//!
//! #[derive(Debug, Clone, Default)]
//! pub struct Post {
//!     base: EntityBase,
//!     pub title: Option<String>,
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
//!         Ok(())
//!     }
//!
//!     fn read(&self, property: &str) -> FieldValue {
//!         match property {
//!             "title" => self.title.clone().into(),
//!             _ => FieldValue::Null,
//!         }
//!     }
//!
//!     fn write(&mut self, property: &str, value: FieldValue) {
//!         if property == "title" {
//!             self.title = value.cast();
//!         }
//!     }
//! }
//!
//! impl Entity for Post {
//!     fn base(&self) -> &EntityBase { &self.base }
//!     fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_core;

pub mod backend;
pub mod case;
pub mod collection;
pub mod config;
pub mod criteria;
pub mod document;
pub mod entity;
pub mod error;
pub mod field;
pub mod path;
pub mod query;
pub mod registry;
pub mod serializer;
pub mod snapshot;
pub mod store;
pub mod value;

