//! Plain fields: values pass through to the store unchanged.

use std::sync::Arc;

use crate::{
    error::DocMapResult,
    field::{FieldConfig, FieldKind, FieldValue, WriteKind},
    registry::Schema,
    store::Connection,
    value::Value,
};

pub(crate) fn register(schema: &mut Schema<'_>, property: &str, config: FieldConfig) -> DocMapResult<()> {
    let mut meta = schema.configure(&config, property, FieldKind::Standard);

    meta.serialize = Arc::new(|value: &FieldValue, _: WriteKind| Ok(Some(value.to_native()?)));
    meta.deserialize = Arc::new(|value: &Value, _: &Connection| Ok(FieldValue::from_native(value)));
    meta.to_data = Arc::new(|value: &FieldValue| Ok((!value.is_null()).then(|| value.to_json())));

    schema.insert(property, meta);
    Ok(())
}
