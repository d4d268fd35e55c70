//! Field metadata and the typed field handlers.
//!
//! Every declared property becomes one [`FieldMeta`]: its store-facing name, its kind,
//! whether it holds an array, and the three conversions installed by the kind's handler:
//!
//! - `serialize`: entity value to store value, aware of the [`WriteKind`]
//! - `deserialize`: store value to entity value
//! - `to_data`: entity value to a plain JSON rendering
//!
//! [`FieldMeta::configure`] builds the record with placeholder conversions; the handler
//! modules replace them and register the result on the owning repository.

pub mod geo_point;
pub mod map;
pub mod reference;
pub mod standard;
pub mod timestamp;
mod value;

use serde_json::Value as JsonValue;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

use crate::{
    config::FieldConversion,
    error::DocMapResult,
    registry::Repository,
    store::Connection,
    value::Value,
};

pub use map::MapConfig;
pub use timestamp::{Formatter, TimestampConfig};
pub use value::{FieldValue, FromFieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Standard,
    Map,
    DocumentReference,
    Timestamp,
    GeoPoint,
}

/// The write being serialized for. Timestamp fields use it to decide on auto-updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

/// Options shared by every field declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldConfig {
    /// Store-facing name. Overrides the conversion policy when set.
    pub name: Option<String>,
    /// Overrides the array-ness detected from the model's default value.
    pub array: Option<bool>,
}

impl FieldConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), array: None }
    }

    pub fn array(mut self, array: bool) -> Self {
        self.array = Some(array);
        self
    }
}

pub type SerializeFn = Arc<dyn Fn(&FieldValue, WriteKind) -> DocMapResult<Option<Value>> + Send + Sync>;
pub type DeserializeFn = Arc<dyn Fn(&Value, &Connection) -> DocMapResult<FieldValue> + Send + Sync>;
pub type ToDataFn = Arc<dyn Fn(&FieldValue) -> DocMapResult<Option<JsonValue>> + Send + Sync>;

pub struct FieldMeta {
    pub name: String,
    pub kind: FieldKind,
    pub is_array: bool,
    pub(crate) nested: Option<Arc<Repository>>,
    pub(crate) target: Option<&'static str>,
    pub(crate) serialize: SerializeFn,
    pub(crate) deserialize: DeserializeFn,
    pub(crate) to_data: ToDataFn,
}

impl FieldMeta {
    /// Builds the metadata for one property.
    ///
    /// An explicit `config.name` always wins, otherwise `conversion` is applied to the
    /// property. `sample` is the property's value on a default instance and only decides
    /// whether the field is an array. The conversions are placeholders that produce nothing.
    pub fn configure(
        config: &FieldConfig,
        property: &str,
        sample: &FieldValue,
        kind: FieldKind,
        conversion: FieldConversion,
    ) -> Self {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| conversion.apply(property));

        Self {
            name,
            kind,
            is_array: config.array.unwrap_or_else(|| sample.is_array()),
            nested: None,
            target: None,
            serialize: Arc::new(|_, _| Ok(None)),
            deserialize: Arc::new(|_, _| Ok(FieldValue::Null)),
            to_data: Arc::new(|_| Ok(None)),
        }
    }

    /// Repository of the nested model, for map fields.
    pub fn nested(&self) -> Option<&Arc<Repository>> {
        self.nested.as_ref()
    }

    /// Model name of the referenced entity, for document reference fields.
    pub fn target(&self) -> Option<&'static str> {
        self.target
    }

    /// `None` means the field is left out of the payload.
    pub fn serialize(&self, value: &FieldValue, write: WriteKind) -> DocMapResult<Option<Value>> {
        (self.serialize)(value, write)
    }

    pub fn deserialize(&self, value: &Value, connection: &Connection) -> DocMapResult<FieldValue> {
        (self.deserialize)(value, connection)
    }

    /// `None` means the field is left out of the rendering.
    pub fn to_data(&self, value: &FieldValue) -> DocMapResult<Option<JsonValue>> {
        (self.to_data)(value)
    }
}

impl Debug for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMeta")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("is_array", &self.is_array)
            .field("nested", &self.nested.as_ref().map(|repo| repo.name()))
            .field("target", &self.target)
            .finish()
    }
}

/// Values that may hold an ordered sequence of themselves.
pub trait Sequence: Sized {
    fn items(&self) -> Option<&[Self]>;
}

impl Sequence for FieldValue {
    fn items(&self) -> Option<&[Self]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl Sequence for Value {
    fn items(&self) -> Option<&[Self]> {
        self.as_array()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Processed<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Processed<T> {
    /// Folds a sequence result back into a single value.
    pub fn collect(self, wrap: impl FnOnce(Vec<T>) -> T) -> T {
        match self {
            Processed::One(value) => value,
            Processed::Many(items) => wrap(items),
        }
    }
}

impl<T> Processed<Option<T>> {
    /// Like [`Processed::collect`], dropping absent items from sequences.
    pub fn collect_present(self, wrap: impl FnOnce(Vec<T>) -> T) -> Option<T> {
        match self {
            Processed::One(value) => value,
            Processed::Many(items) => Some(wrap(items.into_iter().flatten().collect())),
        }
    }
}

/// Applies `f` to each item when the field is an array holding a sequence, or once otherwise.
pub fn process<V, T>(
    is_array: bool,
    value: &V,
    mut f: impl FnMut(&V) -> DocMapResult<T>,
) -> DocMapResult<Processed<T>>
where
    V: Sequence,
{
    match value.items() {
        Some(items) if is_array => Ok(Processed::Many(
            items.iter().map(&mut f).collect::<DocMapResult<Vec<_>>>()?,
        )),
        _ => Ok(Processed::One(f(value)?)),
    }
}
