use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::{
    collection::CollectionHandle,
    document::DocumentHandle,
    entity::{AnyModel, Model},
    error::{DocMapError, DocMapResult},
    value::{GeoPoint, Timestamp, Value, geo_point_json},
};

/// The value of one entity property, as exchanged between a model and its field handlers.
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// Unset.
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(Timestamp),
    GeoPoint(GeoPoint),
    Array(Vec<FieldValue>),
    /// A plain embedded object without a registered model.
    Map(IndexMap<String, FieldValue>),
    /// A nested model held by a map field.
    Model(Box<dyn AnyModel>),
    Reference(DocumentHandle),
    Collection(CollectionHandle),
    /// A store value with no entity-side counterpart, passed through untouched.
    Native(Value),
}

impl FieldValue {
    pub fn model<M: Model>(model: M) -> Self {
        FieldValue::Model(Box::new(model))
    }

    pub fn models<M: Model>(models: Vec<M>) -> Self {
        FieldValue::Array(models.into_iter().map(FieldValue::model).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldValue::Array(_))
    }

    /// Null, `false`, zero, NaN and the empty string are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Boolean(value) => *value,
            FieldValue::Integer(value) => *value != 0,
            FieldValue::Double(value) => *value != 0.0 && !value.is_nan(),
            FieldValue::String(value) => !value.is_empty(),
            FieldValue::Native(value) => value.is_truthy(),
            _ => true,
        }
    }

    /// Extracts a typed value, `None` when unset or of another shape.
    pub fn cast<T: FromFieldValue>(self) -> Option<T> {
        T::from_field_value(self)
    }

    pub fn into_model<M: Model>(self) -> Option<M> {
        match self {
            FieldValue::Model(model) => model.into_any().downcast::<M>().ok().map(|model| *model),
            _ => None,
        }
    }

    /// Nested models of an array map field. Items of another type are skipped.
    pub fn into_models<M: Model>(self) -> Vec<M> {
        match self {
            FieldValue::Array(items) => items.into_iter().filter_map(FieldValue::into_model).collect(),
            _ => Vec::new(),
        }
    }

    /// Store representation of a plain value.
    pub fn to_native(&self) -> DocMapResult<Value> {
        Ok(match self {
            FieldValue::Null => Value::Null,
            FieldValue::Boolean(value) => Value::Boolean(*value),
            FieldValue::Integer(value) => Value::Integer(*value),
            FieldValue::Double(value) => Value::Double(*value),
            FieldValue::String(value) => Value::String(value.clone()),
            FieldValue::Timestamp(value) => Value::Timestamp(*value),
            FieldValue::GeoPoint(value) => Value::GeoPoint(*value),
            FieldValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(FieldValue::to_native)
                    .collect::<DocMapResult<Vec<_>>>()?,
            ),
            FieldValue::Map(map) => Value::Map(
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), value.to_native()?)))
                    .collect::<DocMapResult<_>>()?,
            ),
            FieldValue::Reference(handle) => Value::Reference(handle.path().clone()),
            FieldValue::Native(value) => value.clone(),
            FieldValue::Model(model) => {
                return Err(DocMapError::Serialization(format!(
                    "{} values must be declared as map fields",
                    model.model_type()
                )));
            }
            FieldValue::Collection(handle) => {
                return Err(DocMapError::Serialization(format!(
                    "collection {} can not be stored as a value",
                    handle.path()
                )));
            }
        })
    }

    pub fn from_native(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Boolean(value) => FieldValue::Boolean(*value),
            Value::Integer(value) => FieldValue::Integer(*value),
            Value::Double(value) => FieldValue::Double(*value),
            Value::String(value) => FieldValue::String(value.clone()),
            Value::Timestamp(value) => FieldValue::Timestamp(*value),
            Value::GeoPoint(value) => FieldValue::GeoPoint(*value),
            Value::Array(items) => FieldValue::Array(items.iter().map(FieldValue::from_native).collect()),
            Value::Map(map) => FieldValue::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), FieldValue::from_native(value)))
                    .collect(),
            ),
            Value::Reference(_) | Value::ServerTimestamp => FieldValue::Native(value.clone()),
        }
    }

    /// Plain JSON rendering of a passthrough value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null | FieldValue::Model(_) => JsonValue::Null,
            FieldValue::Boolean(value) => JsonValue::Bool(*value),
            FieldValue::Integer(value) => JsonValue::from(*value),
            FieldValue::Double(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::String(value) => JsonValue::String(value.clone()),
            FieldValue::Timestamp(value) => JsonValue::String(value.to_date().to_rfc3339()),
            FieldValue::GeoPoint(point) => geo_point_json(point),
            FieldValue::Array(items) => JsonValue::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<JsonMap<_, _>>(),
            ),
            FieldValue::Reference(handle) => JsonValue::String(handle.path().to_string()),
            FieldValue::Collection(handle) => JsonValue::String(handle.path().to_string()),
            FieldValue::Native(value) => value.to_json(),
        }
    }
}

/// Conversion out of a [`FieldValue`], used by [`FieldValue::cast`].
pub trait FromFieldValue: Sized {
    fn from_field_value(value: FieldValue) -> Option<Self>;
}

impl FromFieldValue for FieldValue {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        Some(value)
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Boolean(value) => Some(value),
            _ => None,
        }
    }
}

impl FromFieldValue for i64 {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(value) => Some(value),
            _ => None,
        }
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Double(value) => Some(value),
            FieldValue::Integer(value) => Some(value as f64),
            _ => None,
        }
    }
}

impl FromFieldValue for Timestamp {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Timestamp(value) => Some(value),
            _ => None,
        }
    }
}

impl FromFieldValue for GeoPoint {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::GeoPoint(value) => Some(value),
            _ => None,
        }
    }
}

impl FromFieldValue for Value {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => None,
            other => other.to_native().ok(),
        }
    }
}

impl FromFieldValue for IndexMap<String, FieldValue> {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl<T: FromFieldValue> FromFieldValue for Vec<T> {
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Array(items) => items.into_iter().map(T::from_field_value).collect(),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<GeoPoint> for FieldValue {
    fn from(value: GeoPoint) -> Self {
        FieldValue::GeoPoint(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::from_native(&value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::Array(values.into_iter().map(Into::into).collect())
    }
}
