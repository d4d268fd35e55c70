//! Geographic point fields.

use std::sync::Arc;

use crate::{
    error::{DocMapError, DocMapResult},
    field::{FieldConfig, FieldKind, FieldValue, WriteKind, process},
    registry::Schema,
    store::Connection,
    value::{Value, geo_point_json},
};

pub(crate) fn register(schema: &mut Schema<'_>, property: &str, config: FieldConfig) -> DocMapResult<()> {
    let mut meta = schema.configure(&config, property, FieldKind::GeoPoint);
    let is_array = meta.is_array;
    let name = meta.name.clone();

    meta.serialize = Arc::new(move |value: &FieldValue, _: WriteKind| {
        Ok(process(is_array, value, |item| match item {
            FieldValue::GeoPoint(point) => Ok(Some(Value::GeoPoint(*point))),
            FieldValue::Native(native @ Value::GeoPoint(_)) => Ok(Some(native.clone())),
            FieldValue::Null => Ok(None),
            other => Err(DocMapError::Serialization(format!("expected a geopoint, got {other:?}"))),
        })?
        .collect_present(Value::Array))
    });

    meta.deserialize = Arc::new(move |value: &Value, _: &Connection| {
        Ok(process(is_array, value, |item| match item {
            Value::GeoPoint(point) => Ok(FieldValue::GeoPoint(*point)),
            other => Err(DocMapError::InvalidDocument(format!(
                "expected a geopoint in {name}, got {other:?}"
            ))),
        })?
        .collect(FieldValue::Array))
    });

    meta.to_data = Arc::new(move |value: &FieldValue| {
        if value.is_null() {
            return Ok(None);
        }
        Ok(process(is_array, value, |item| match item {
            FieldValue::GeoPoint(point) => Ok(Some(geo_point_json(point))),
            _ => Ok(None),
        })?
        .collect_present(serde_json::Value::Array))
    });

    schema.insert(property, meta);
    Ok(())
}
