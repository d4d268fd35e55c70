//! Error types and result types for mapping and store operations.
//!
//! Every fallible operation in the workspace returns [`DocMapResult<T>`]. Configuration
//! and state errors (unregistered types, undeclared collections, unknown query properties,
//! unfetched references, missing ids) are produced before any backend future is awaited.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised while mapping entities to and from a document store.
#[derive(Error, Debug)]
pub enum DocMapError {
    /// An operation needed a store connection before `initialize` was called.
    #[error("Undefined store connection, call initialize() first")]
    NotInitialized,
    /// The entity type was never registered.
    #[error("Repository {0} is not defined")]
    RepositoryNotDefined(String),
    /// A collection was requested under a parent that never declared it.
    #[error("Could not find collection {child} in parent {parent}")]
    CollectionNotDeclared {
        /// Model name of the requested collection.
        child: String,
        /// Model name of the claimed parent document.
        parent: String,
    },
    /// A query referenced a property with no registered field.
    #[error("Could not find property {property} in {collection}")]
    UnknownProperty {
        /// The property path as written by the caller.
        property: String,
        /// The collection path the query targets.
        collection: String,
    },
    /// A map field holding an array was declared without its nested model.
    #[error("Map arrays must be provided with an entity ({model}.{property})")]
    MapArrayWithoutEntity {
        /// The declaring model.
        model: String,
        /// The declaring property.
        property: String,
    },
    /// The cached value of a document reference was read before a fetch.
    #[error("Can not fetch cached document reference, call get() first.")]
    NotFetched,
    /// An update was attempted on an entity without an id.
    #[error("An ID must be provided when updating {0}")]
    MissingId(String),
    /// The document does not exist in the store.
    #[error("Document not found {0}")]
    DocumentNotFound(String),
    /// The query could not be built or executed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Stored data did not have the shape a field expected.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Serialization/deserialization error when converting between value formats.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Any other misuse of the registration or handle API.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocMapError {
    /// Returns `true` for errors caused by misconfiguration or misuse rather than the store.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DocMapError::NotInitialized
                | DocMapError::RepositoryNotDefined(_)
                | DocMapError::CollectionNotDeclared { .. }
                | DocMapError::UnknownProperty { .. }
                | DocMapError::MapArrayWithoutEntity { .. }
                | DocMapError::Configuration(_)
        )
    }
}

/// A specialized `Result` type for mapping operations.
pub type DocMapResult<T> = Result<T, DocMapError>;

impl From<SerdeJsonError> for DocMapError {
    fn from(err: SerdeJsonError) -> Self {
        DocMapError::Serialization(err.to_string())
    }
}
