//! Document reference fields.
//!
//! A reference is stored as the native reference type of the store. Reading one back
//! rebuilds a [`DocumentHandle`] bound to the target entity's repository; the document
//! itself is only fetched when the caller asks for it.

use std::sync::Arc;

use crate::{
    document::DocumentHandle,
    entity::{Entity, ModelBinding},
    error::{DocMapError, DocMapResult},
    field::{FieldConfig, FieldKind, FieldValue, WriteKind, process},
    registry::Schema,
    store::Connection,
    value::Value,
};

pub(crate) fn register<E: Entity>(
    schema: &mut Schema<'_>,
    property: &str,
    config: FieldConfig,
) -> DocMapResult<()> {
    let mut meta = schema.configure(&config, property, FieldKind::DocumentReference);
    meta.target = Some(E::model_name());
    let is_array = meta.is_array;

    meta.serialize = Arc::new(move |value: &FieldValue, _: WriteKind| {
        Ok(process(is_array, value, |item| match item {
            FieldValue::Reference(handle) => Ok(Some(Value::Reference(handle.path().clone()))),
            FieldValue::Native(native @ Value::Reference(_)) => Ok(Some(native.clone())),
            FieldValue::Null => Ok(None),
            other => Err(DocMapError::Serialization(format!(
                "expected a reference to {}, got {other:?}",
                E::model_name()
            ))),
        })?
        .collect_present(Value::Array))
    });

    meta.deserialize = Arc::new(move |value: &Value, connection: &Connection| {
        Ok(process(is_array, value, |item| match item {
            Value::Reference(path) => Ok(FieldValue::Reference(DocumentHandle::from_path(
                connection,
                E::model_name(),
                path,
            )?)),
            other => Err(DocMapError::InvalidDocument(format!(
                "expected a reference to {}, got {other:?}",
                E::model_name()
            ))),
        })?
        .collect(FieldValue::Array))
    });

    // Only fetched references have something to render.
    meta.to_data = Arc::new(move |value: &FieldValue| {
        if value.is_null() {
            return Ok(None);
        }
        Ok(process(is_array, value, |item| match item {
            FieldValue::Reference(handle) => handle.cached_data(),
            _ => Ok(None),
        })?
        .collect_present(serde_json::Value::Array))
    });

    schema.insert(property, meta);
    schema
        .registry()
        .describe(ModelBinding::of::<E>(), schema.conversion())
}
