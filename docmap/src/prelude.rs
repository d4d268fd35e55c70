//! Convenient re-exports of commonly used types from docmap.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmap::prelude::*;
//! ```
//!
//! This provides access to:
//! - Model and entity traits and the schema used to describe them
//! - Collections, document references, queries and snapshots
//! - Store-native values and the backend traits
//! - Configuration and error types

pub use docmap_core::{
    backend::{ChangeKind, SnapshotMetadata, StoreBackend, StoreBackendBuilder, Subscription},
    collection::Collection,
    config::{DocMapConfig, FieldConversion},
    criteria::{PropertyPath, Query, QueryCriteria},
    document::{DocumentRef, fetch_all},
    entity::{Entity, EntityBase, Model},
    error::{DocMapError, DocMapResult},
    field::{FieldConfig, FieldValue, MapConfig, TimestampConfig},
    path::{CollectionPath, DocumentPath},
    query::{Direction, FieldOp},
    registry::{CollectionConfig, Schema},
    snapshot::{DocumentChange, DocumentSnapshot, QuerySnapshot},
    store::DocMap,
    value::{GeoPoint, Timestamp, Value},
};
