//! Timestamp fields with optional server-assigned auto-updates.
//!
//! A timestamp field can ask the store to stamp it with the server's current time when the
//! entity is created, updated, or both. While such a policy applies to the write being
//! serialized the caller's value is ignored and [`Value::ServerTimestamp`] is sent instead.
//!
//! ```ignore
//! schema.timestamp(
//!     "posted",
//!     TimestampConfig::default().update_on_create(true),
//! )?;
//! ```

use chrono::{DateTime, Local, Utc};
use serde_json::Value as JsonValue;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

use crate::{
    error::{DocMapError, DocMapResult},
    field::{FieldConfig, FieldKind, FieldValue, WriteKind, process},
    registry::Schema,
    store::Connection,
    value::Value,
};

/// Renders a date for [`Entity::to_data`](crate::entity::Entity::to_data).
pub type Formatter = Arc<dyn Fn(DateTime<Utc>) -> String + Send + Sync>;

#[derive(Clone, Default)]
pub struct TimestampConfig {
    pub field: FieldConfig,
    /// Stamp on both creates and updates.
    pub update_on_write: bool,
    pub update_on_create: bool,
    pub update_on_update: bool,
    /// Defaults to the local date and time in the locale's preferred representation.
    pub format: Option<Formatter>,
}

impl TimestampConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self { field: FieldConfig::named(name), ..Self::default() }
    }

    pub fn array(mut self, array: bool) -> Self {
        self.field.array = Some(array);
        self
    }

    pub fn update_on_write(mut self, enabled: bool) -> Self {
        self.update_on_write = enabled;
        self
    }

    pub fn update_on_create(mut self, enabled: bool) -> Self {
        self.update_on_create = enabled;
        self
    }

    pub fn update_on_update(mut self, enabled: bool) -> Self {
        self.update_on_update = enabled;
        self
    }

    pub fn format(mut self, format: impl Fn(DateTime<Utc>) -> String + Send + Sync + 'static) -> Self {
        self.format = Some(Arc::new(format));
        self
    }

    fn stamps(&self, write: WriteKind) -> bool {
        match write {
            WriteKind::Create => self.update_on_write || self.update_on_create,
            WriteKind::Update => self.update_on_write || self.update_on_update,
        }
    }
}

impl Debug for TimestampConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampConfig")
            .field("field", &self.field)
            .field("update_on_write", &self.update_on_write)
            .field("update_on_create", &self.update_on_create)
            .field("update_on_update", &self.update_on_update)
            .field("format", &self.format.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

fn local_format(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%c").to_string()
}

pub(crate) fn register(schema: &mut Schema<'_>, property: &str, config: TimestampConfig) -> DocMapResult<()> {
    let mut meta = schema.configure(&config.field, property, FieldKind::Timestamp);
    let is_array = meta.is_array;
    let name = meta.name.clone();
    let format = config.format.clone().unwrap_or_else(|| Arc::new(local_format));

    meta.serialize = Arc::new(move |value: &FieldValue, write: WriteKind| {
        let stamp = config.stamps(write);
        Ok(process(is_array, value, |item| {
            if stamp {
                return Ok(Some(Value::ServerTimestamp));
            }
            match item {
                FieldValue::Timestamp(timestamp) => Ok(Some(Value::Timestamp(*timestamp))),
                FieldValue::Native(native @ (Value::Timestamp(_) | Value::ServerTimestamp)) => {
                    Ok(Some(native.clone()))
                }
                FieldValue::Null => Ok(None),
                other => Err(DocMapError::Serialization(format!(
                    "expected a timestamp, got {other:?}"
                ))),
            }
        })?
        .collect_present(Value::Array))
    });

    // A pending server timestamp has no value yet.
    meta.deserialize = Arc::new(move |value: &Value, _: &Connection| {
        Ok(process(is_array, value, |item| match item {
            Value::Timestamp(timestamp) => Ok(FieldValue::Timestamp(*timestamp)),
            Value::ServerTimestamp | Value::Null => Ok(FieldValue::Null),
            other => Err(DocMapError::InvalidDocument(format!(
                "expected a timestamp in {name}, got {other:?}"
            ))),
        })?
        .collect(FieldValue::Array))
    });

    meta.to_data = Arc::new(move |value: &FieldValue| {
        if value.is_null() {
            return Ok(None);
        }
        Ok(process(is_array, value, |item| match item {
            FieldValue::Timestamp(timestamp) => Ok(Some(JsonValue::String(format(timestamp.to_date())))),
            _ => Ok(None),
        })?
        .collect_present(JsonValue::Array))
    });

    schema.insert(property, meta);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_flags_select_write_kinds() {
        let create = TimestampConfig::default().update_on_create(true);
        assert!(create.stamps(WriteKind::Create));
        assert!(!create.stamps(WriteKind::Update));

        let update = TimestampConfig::default().update_on_update(true);
        assert!(!update.stamps(WriteKind::Create));
        assert!(update.stamps(WriteKind::Update));

        let write = TimestampConfig::default().update_on_write(true);
        assert!(write.stamps(WriteKind::Create));
        assert!(write.stamps(WriteKind::Update));

        assert!(!TimestampConfig::default().stamps(WriteKind::Create));
    }

    #[test]
    fn default_format_is_not_empty() {
        let date = DateTime::from_timestamp(1_600_000_000, 0).unwrap_or_default();
        assert!(!local_format(date).is_empty());
    }
}
