//! Map fields: nested models embedded as objects in the parent document.
//!
//! The nested model gets its own repository, linked to the declaring one as its parent,
//! and its fields are serialized with the same truthiness rules as a top-level entity.

use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::{
    entity::{Model, ModelBinding},
    error::{DocMapError, DocMapResult},
    field::{FieldConfig, FieldKind, FieldValue, WriteKind, process},
    registry::Schema,
    serializer,
    store::Connection,
    value::Value,
};

/// Declaration options for a map field.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    pub field: FieldConfig,
    pub entity: Option<ModelBinding>,
}

impl MapConfig {
    /// A map field holding `M` values.
    pub fn of<M: Model>() -> Self {
        Self {
            field: FieldConfig::default(),
            entity: Some(ModelBinding::of::<M>()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.field.name = Some(name.into());
        self
    }

    pub fn array(mut self, array: bool) -> Self {
        self.field.array = Some(array);
        self
    }
}

pub(crate) fn register(schema: &mut Schema<'_>, property: &str, config: MapConfig) -> DocMapResult<()> {
    let mut meta = schema.configure(&config.field, property, FieldKind::Map);

    let Some(binding) = config.entity else {
        return Err(if meta.is_array {
            DocMapError::MapArrayWithoutEntity {
                model: schema.model_name().to_string(),
                property: property.to_string(),
            }
        } else {
            DocMapError::Configuration(format!(
                "map field {}.{property} must name its nested model",
                schema.model_name()
            ))
        });
    };

    let child = schema.registry().get_or_create(binding.name());
    child.set_parent(schema.repository());
    meta.nested = Some(child.clone());

    let is_array = meta.is_array;

    let repository = child.clone();
    meta.serialize = Arc::new(move |value: &FieldValue, write: WriteKind| {
        let fields = repository.fields();
        Ok(process(is_array, value, |item| match item {
            FieldValue::Model(model) => Ok(Some(Value::Map(serializer::serialize_fields(
                &fields,
                model.as_ref(),
                write,
            )?))),
            FieldValue::Null => Ok(None),
            other => Err(DocMapError::Serialization(format!(
                "expected a {} value, got {other:?}",
                binding.name()
            ))),
        })?
        .collect_present(Value::Array))
    });

    let repository = child.clone();
    meta.deserialize = Arc::new(move |value: &Value, connection: &Connection| {
        let fields = repository.fields();
        Ok(process(is_array, value, |item| match item {
            Value::Map(data) => {
                let mut model = binding.create();
                serializer::populate_fields(&fields, data, model.as_mut(), connection)?;
                Ok(FieldValue::Model(model))
            }
            other => Err(DocMapError::InvalidDocument(format!(
                "expected an embedded {} object, got {other:?}",
                binding.name()
            ))),
        })?
        .collect(FieldValue::Array))
    });

    let repository = child;
    meta.to_data = Arc::new(move |value: &FieldValue| {
        if value.is_null() {
            return Ok(None);
        }
        let fields = repository.fields();
        Ok(process(is_array, value, |item| match item {
            FieldValue::Model(model) => Ok(Some(JsonValue::Object(serializer::fields_data(
                &fields,
                model.as_ref(),
            )?))),
            _ => Ok(None),
        })?
        .collect_present(JsonValue::Array))
    });

    schema.insert(property, meta);
    schema.registry().describe(binding, schema.conversion())
}
