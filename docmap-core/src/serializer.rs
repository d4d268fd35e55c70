//! Conversion between entities and stored documents.
//!
//! The rules, applied the same way to entities and to nested map models:
//!
//! - **Writing**: a field is serialized only when its value is truthy, except timestamp fields
//!   which always run so that auto-update policies can emit the server time sentinel. A falsy
//!   or absent serialized value leaves the key out. `0`, `false` and `""` are therefore never
//!   written for non-timestamp fields.
//! - **Reading**: only truthy stored values are deserialized and assigned; everything else
//!   keeps the model's default. Entities additionally get their id, a reference to their own
//!   document and a collection handle for every declared subcollection.
//! - **Rendering** ([`Entity::to_data`]): every field renders through its handler and keys
//!   without a rendering are dropped.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

use crate::{
    backend::RawDocument,
    collection::CollectionHandle,
    document::DocumentHandle,
    entity::{AnyModel, Entity},
    error::DocMapResult,
    field::{FieldKind, FieldMeta, FieldValue, WriteKind},
    registry::Registry,
    store::Connection,
    value::ValueMap,
};

/// Serializes the registered fields of `model`, keyed by store name.
pub(crate) fn serialize_fields(
    fields: &IndexMap<String, Arc<FieldMeta>>,
    model: &dyn AnyModel,
    write: WriteKind,
) -> DocMapResult<ValueMap> {
    let mut data = ValueMap::new();
    for (property, meta) in fields {
        let value = model.read_field(property);
        if !value.is_truthy() && meta.kind != FieldKind::Timestamp {
            continue;
        }
        if let Some(serialized) = meta.serialize(&value, write)?
            && serialized.is_truthy()
        {
            data.insert(meta.name.clone(), serialized);
        }
    }
    Ok(data)
}

/// Assigns every registered field whose stored value is truthy.
pub(crate) fn populate_fields(
    fields: &IndexMap<String, Arc<FieldMeta>>,
    data: &ValueMap,
    model: &mut dyn AnyModel,
    connection: &Connection,
) -> DocMapResult<()> {
    for (property, meta) in fields {
        if let Some(stored) = data.get(&meta.name)
            && stored.is_truthy()
        {
            model.write_field(property, meta.deserialize(stored, connection)?);
        }
    }
    Ok(())
}

/// Renders the registered fields of `model`, keyed by property name.
pub(crate) fn fields_data(
    fields: &IndexMap<String, Arc<FieldMeta>>,
    model: &dyn AnyModel,
) -> DocMapResult<JsonMap<String, JsonValue>> {
    let mut data = JsonMap::new();
    for (property, meta) in fields {
        if let Some(rendered) = meta.to_data(&model.read_field(property))? {
            data.insert(property.clone(), rendered);
        }
    }
    Ok(data)
}

/// An entity ready to be written: its id, kept apart from the document body.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedEntity {
    pub id: Option<String>,
    pub data: ValueMap,
}

pub struct EntitySerializer;

impl EntitySerializer {
    /// # Errors
    ///
    /// Returns [`DocMapError::RepositoryNotDefined`](crate::error::DocMapError) when `T` was
    /// never registered, or the first error raised by a field handler.
    pub fn serialize<T: Entity>(registry: &Registry, entity: &T, write: WriteKind) -> DocMapResult<SerializedEntity> {
        let repository = registry.get(T::model_name())?;
        Ok(SerializedEntity {
            id: entity.id().map(str::to_string),
            data: serialize_fields(&repository.fields(), entity, write)?,
        })
    }

    /// Builds an entity from a document read out of `parent`.
    pub fn deserialize<T: Entity>(raw: &RawDocument, parent: &CollectionHandle) -> DocMapResult<T> {
        let connection = parent.connection();
        let repository = connection.registry().get(T::model_name())?;
        let reference = DocumentHandle::new(parent.clone(), raw.id());

        let mut entity = T::default();
        entity.base_mut().id = Some(raw.id().to_string());
        entity.base_mut().reference = Some(reference.clone());

        if let Some(data) = &raw.data {
            populate_fields(&repository.fields(), data, &mut entity, connection)?;
        }

        for (property, child) in repository.subcollections() {
            if child.is_entity() {
                let collection = CollectionHandle::child(&reference, child)?;
                entity.write(&property, FieldValue::Collection(collection));
            }
        }

        Ok(entity)
    }

    pub fn to_data<T: Entity>(registry: &Registry, entity: &T) -> DocMapResult<JsonValue> {
        let repository = registry.get(T::model_name())?;
        let mut data = JsonMap::new();
        if let Some(id) = entity.id() {
            data.insert("id".to_string(), JsonValue::String(id.to_string()));
        }
        data.extend(fields_data(&repository.fields(), entity)?);
        Ok(JsonValue::Object(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::FieldConversion,
        entity::{EntityBase, Model, ModelBinding},
        field::{FieldConfig, MapConfig, TimestampConfig},
        registry::{CollectionConfig, Schema},
        value::{GeoPoint, Timestamp, Value},
    };
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Address {
        city: Option<String>,
        zip: Option<i64>,
    }

    impl Model for Address {
        fn model_name() -> &'static str {
            "Address"
        }

        fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
            schema
                .field("city", FieldConfig::default())?
                .field("zip", FieldConfig::named("postal_code"))?;
            Ok(())
        }

        fn read(&self, property: &str) -> FieldValue {
            match property {
                "city" => self.city.clone().into(),
                "zip" => self.zip.into(),
                _ => FieldValue::Null,
            }
        }

        fn write(&mut self, property: &str, value: FieldValue) {
            match property {
                "city" => self.city = value.cast(),
                "zip" => self.zip = value.cast(),
                _ => {}
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Shop {
        base: EntityBase,
        name: Option<String>,
        rating: i64,
        open: bool,
        address: Option<Address>,
        branches: Vec<Address>,
        location: Option<GeoPoint>,
        opened: Option<Timestamp>,
        touched: Option<Timestamp>,
    }

    impl Model for Shop {
        fn model_name() -> &'static str {
            "Shop"
        }

        fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
            schema.root_collection(CollectionConfig::named("shops"));
            schema
                .field("name", FieldConfig::default())?
                .field("rating", FieldConfig::default())?
                .field("open", FieldConfig::default())?
                .map("address", MapConfig::of::<Address>())?
                .map("branches", MapConfig::of::<Address>())?
                .geo_point("location", FieldConfig::default())?
                .timestamp("opened", TimestampConfig::default().update_on_create(true))?
                .timestamp(
                    "touched",
                    TimestampConfig::default()
                        .update_on_update(true)
                        .format(|date| date.format("%Y-%m-%d").to_string()),
                )?;
            Ok(())
        }

        fn read(&self, property: &str) -> FieldValue {
            match property {
                "name" => self.name.clone().into(),
                "rating" => self.rating.into(),
                "open" => self.open.into(),
                "address" => self.address.clone().map(FieldValue::model).unwrap_or_default(),
                "branches" => FieldValue::models(self.branches.clone()),
                "location" => self.location.into(),
                "opened" => self.opened.into(),
                "touched" => self.touched.into(),
                _ => FieldValue::Null,
            }
        }

        fn write(&mut self, property: &str, value: FieldValue) {
            match property {
                "name" => self.name = value.cast(),
                "rating" => self.rating = value.cast().unwrap_or_default(),
                "open" => self.open = value.cast().unwrap_or_default(),
                "address" => self.address = value.into_model(),
                "branches" => self.branches = value.into_models(),
                "location" => self.location = value.cast(),
                "opened" => self.opened = value.cast(),
                "touched" => self.touched = value.cast(),
                _ => {}
            }
        }
    }

    impl Entity for Shop {
        fn base(&self) -> &EntityBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut EntityBase {
            &mut self.base
        }
    }

    fn registry() -> Registry {
        let registry = Registry::new();
        registry
            .describe(ModelBinding::of::<Shop>(), FieldConversion::None)
            .unwrap();
        registry
    }

    fn shop() -> Shop {
        Shop {
            base: EntityBase::with_id("corner"),
            name: Some("Corner Shop".into()),
            address: Some(Address { city: Some("Lisbon".into()), zip: Some(1100) }),
            branches: vec![
                Address { city: Some("Porto".into()), zip: None },
                Address { city: None, zip: Some(0) },
            ],
            location: Some(GeoPoint::new(38.7, -9.1)),
            ..Shop::default()
        }
    }

    #[test]
    fn create_payload_skips_falsy_fields_and_stamps_timestamps() {
        let serialized = EntitySerializer::serialize(&registry(), &shop(), WriteKind::Create).unwrap();
        assert_eq!(serialized.id.as_deref(), Some("corner"));

        let data = serialized.data;
        assert_eq!(
            data.keys().collect::<Vec<_>>(),
            vec!["name", "address", "branches", "location", "opened"]
        );
        assert_eq!(data["opened"], Value::ServerTimestamp);
        assert!(!data.contains_key("rating"));
        assert!(!data.contains_key("open"));

        let address = data["address"].as_map().unwrap();
        assert_eq!(address["city"], Value::from("Lisbon"));
        assert_eq!(address["postal_code"], Value::from(1100));

        let branches = data["branches"].as_array().unwrap();
        assert_eq!(branches.len(), 2);
        assert!(branches[1].as_map().unwrap().is_empty());
    }

    #[test]
    fn update_payload_passes_timestamps_through() {
        let mut entity = shop();
        entity.opened = Some(Timestamp::new(10, 0));
        let data = EntitySerializer::serialize(&registry(), &entity, WriteKind::Update)
            .unwrap()
            .data;
        assert_eq!(data["opened"], Value::Timestamp(Timestamp::new(10, 0)));
        assert_eq!(data["touched"], Value::ServerTimestamp);
    }

    #[test]
    fn unset_timestamps_without_policy_are_omitted() {
        let data = EntitySerializer::serialize(&registry(), &shop(), WriteKind::Create)
            .unwrap()
            .data;
        assert!(!data.contains_key("touched"));
    }

    #[test]
    fn to_data_renders_by_property_and_drops_unset_fields() {
        let mut entity = shop();
        entity.touched = Some(Timestamp::new(86_400, 0));
        let data = EntitySerializer::to_data(&registry(), &entity).unwrap();

        assert_eq!(data["id"], json!("corner"));
        assert_eq!(data["name"], json!("Corner Shop"));
        assert_eq!(data["rating"], json!(0));
        assert_eq!(data["address"], json!({ "city": "Lisbon", "zip": 1100 }));
        assert_eq!(data["branches"], json!([{ "city": "Porto" }, { "zip": 0 }]));
        assert_eq!(data["location"], json!({ "latitude": 38.7, "longitude": -9.1 }));
        assert_eq!(data["touched"], json!("1970-01-02"));
        assert!(data.get("opened").is_none());
    }

    #[test]
    fn to_data_omits_missing_id() {
        let mut entity = shop();
        entity.base = EntityBase::default();
        let data = EntitySerializer::to_data(&registry(), &entity).unwrap();
        assert!(data.get("id").is_none());
    }

    #[test]
    fn unregistered_entities_fail() {
        let err = EntitySerializer::serialize(&Registry::new(), &shop(), WriteKind::Create).unwrap_err();
        assert_eq!(err.to_string(), "Repository Shop is not defined");
    }
}
