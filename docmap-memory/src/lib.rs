//! In-memory document storage backend for docmap.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Hierarchical paths** - Root collections and subcollections at any depth
//! - **Full query support** - Filters, ordering, cursors and limits
//! - **Realtime listeners** - Document and query listeners with per-document change lists
//! - **Server timestamps** - Sentinels are replaced with the store clock on write
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::prelude::*;
//! use docmap::memory::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> DocMapResult<()> {
//!     let docmap = DocMap::new();
//!     docmap.initialize(InMemoryStore::builder().build().await?, None)?;
//!
//!     let posts = docmap.collection::<Post>()?;
//!     let created = posts.create(&Post::titled("Hello")).await?;
//!     assert!(created.is_some());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
