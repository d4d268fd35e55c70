//! Core traits for mapped types.
//!
//! A [`Model`] is any type with registered fields: stored documents as well as the nested
//! objects embedded in them through map fields. An [`Entity`] is a model that lives in a
//! collection and therefore carries an id and a reference to its own document.
//!
//! Fields are accessed by property name through [`Model::read`] and [`Model::write`], so the
//! serializer can drive any model from its registered field metadata.
//!
//! # Example
//!
//! ```ignore
//! use docmap::prelude::*;
//!
//! #[derive(Debug, Clone, Default)]
//! pub struct Author {
//!     base: EntityBase,
//!     pub name: Option<String>,
//! }
//!
//! impl Model for Author {
//!     fn model_name() -> &'static str {
//!         "Author"
//!     }
//!
//!     fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
//!         schema.root_collection(CollectionConfig::named("authors"));
//!         schema.field("name", FieldConfig::default())?;
//!         Ok(())
//!     }
//!
//!     fn read(&self, property: &str) -> FieldValue {
//!         match property {
//!             "name" => self.name.clone().into(),
//!             _ => FieldValue::Null,
//!         }
//!     }
//!
//!     fn write(&mut self, property: &str, value: FieldValue) {
//!         if property == "name" {
//!             self.name = value.cast();
//!         }
//!     }
//! }
//!
//! impl Entity for Author {
//!     fn base(&self) -> &EntityBase { &self.base }
//!     fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }
//! }
//! ```

use serde_json::Value as JsonValue;
use std::{
    any::Any,
    fmt::{self, Debug},
    sync::Arc,
};

use crate::{
    document::{DocumentHandle, DocumentRef},
    error::DocMapResult,
    field::FieldValue,
    registry::{Registry, Schema},
    serializer::EntitySerializer,
};

/// A type whose fields are described to the registry.
pub trait Model: Default + Clone + Debug + Send + Sync + 'static {
    /// Registry key of this type. Must be unique across the process.
    fn model_name() -> &'static str;

    /// Declares the type's fields and collections. Runs once per registry.
    fn describe(schema: &mut Schema<'_>) -> DocMapResult<()>;

    /// Returns the current value of a property, [`FieldValue::Null`] when unset.
    fn read(&self, property: &str) -> FieldValue;

    /// Assigns a deserialized value to a property.
    fn write(&mut self, property: &str, value: FieldValue);
}

/// Id and self-reference shared by every entity.
#[derive(Clone, Default)]
pub struct EntityBase {
    pub id: Option<String>,
    pub(crate) reference: Option<DocumentHandle>,
}

impl EntityBase {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), reference: None }
    }

    /// The untyped reference to this entity's document, set when it was read from a store.
    pub fn reference(&self) -> Option<&DocumentHandle> {
        self.reference.as_ref()
    }
}

impl Debug for EntityBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBase")
            .field("id", &self.id)
            .field("path", &self.reference.as_ref().map(|r| r.path().to_string()))
            .finish()
    }
}

/// A model stored as one document in a collection.
pub trait Entity: Model {
    fn base(&self) -> &EntityBase;

    fn base_mut(&mut self) -> &mut EntityBase;

    /// The document id. Empty ids count as absent.
    fn id(&self) -> Option<&str> {
        self.base().id.as_deref().filter(|id| !id.is_empty())
    }

    fn set_id(&mut self, id: impl Into<String>) {
        self.base_mut().id = Some(id.into());
    }

    /// Typed reference to this entity's own document, available once it was read from a store.
    fn reference(&self) -> Option<DocumentRef<Self>> {
        self.base().reference.clone().map(DocumentRef::from_handle)
    }

    /// Human-readable rendering keyed by property name, with the id under `"id"`.
    fn to_data(&self, registry: &Registry) -> DocMapResult<JsonValue> {
        EntitySerializer::to_data(registry, self)
    }
}

/// Type-erased [`Model`], used for nested map values.
pub trait AnyModel: Any + Send + Sync + Debug {
    fn model_type(&self) -> &'static str;

    fn read_field(&self, property: &str) -> FieldValue;

    fn write_field(&mut self, property: &str, value: FieldValue);

    fn clone_box(&self) -> Box<dyn AnyModel>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn AnyModel {
    pub fn downcast_ref<M: Model>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }
}

impl<M: Model> AnyModel for M {
    fn model_type(&self) -> &'static str {
        <M as Model>::model_name()
    }

    fn read_field(&self, property: &str) -> FieldValue {
        self.read(property)
    }

    fn write_field(&mut self, property: &str, value: FieldValue) {
        self.write(property, value)
    }

    fn clone_box(&self) -> Box<dyn AnyModel> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Clone for Box<dyn AnyModel> {
    fn clone(&self) -> Box<dyn AnyModel> {
        self.clone_box()
    }
}

/// Type-erased [`Entity`], used for the fetched value cached by a document reference.
pub trait AnyEntity: AnyModel {
    fn entity_data(&self, registry: &Registry) -> DocMapResult<JsonValue>;

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: Entity> AnyEntity for E {
    fn entity_data(&self, registry: &Registry) -> DocMapResult<JsonValue> {
        self.to_data(registry)
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Everything the registry needs to know about a model type without naming it.
#[derive(Clone, Copy)]
pub struct ModelBinding {
    name: &'static str,
    describe: fn(&mut Schema<'_>) -> DocMapResult<()>,
    create: fn() -> Box<dyn AnyModel>,
}

fn create_model<M: Model>() -> Box<dyn AnyModel> {
    Box::new(M::default())
}

impl ModelBinding {
    pub fn of<M: Model>() -> Self {
        Self {
            name: M::model_name(),
            describe: M::describe,
            create: create_model::<M>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// A fresh default instance of the bound type.
    pub fn create(&self) -> Box<dyn AnyModel> {
        (self.create)()
    }

    pub(crate) fn describe(&self, schema: &mut Schema<'_>) -> DocMapResult<()> {
        (self.describe)(schema)
    }
}

impl Debug for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelBinding").field(&self.name).finish()
    }
}
