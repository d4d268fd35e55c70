//! Process-wide mapping configuration.
//!
//! # Example
//!
//! ```ignore
//! use docmap::config::{DocMapConfig, FieldConversion};
//!
//! let config = DocMapConfig::from_json(r#"{ "fieldConversion": "toSnakeCase" }"#)?;
//! assert_eq!(config.field_conversion, FieldConversion::ToSnakeCase);
//! ```

use serde::{Deserialize, Serialize};

use crate::{case, error::DocMapResult};

/// How property names are turned into store field names when no explicit name is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldConversion {
    /// Use the property name unchanged.
    #[default]
    #[serde(rename = "none", alias = "noConversion")]
    None,
    #[serde(rename = "toCamelCase")]
    ToCamelCase,
    #[serde(rename = "toSnakeCase")]
    ToSnakeCase,
    #[serde(rename = "toKebabCase")]
    ToKebabCase,
}

impl FieldConversion {
    /// Applies this conversion to a property name.
    pub fn apply(&self, property: &str) -> String {
        match self {
            FieldConversion::None => property.to_string(),
            FieldConversion::ToCamelCase => case::to_camel(property),
            FieldConversion::ToSnakeCase => case::camel_to_snake(property),
            FieldConversion::ToKebabCase => case::camel_to_kebab(property),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocMapConfig {
    pub field_conversion: FieldConversion,
}

impl DocMapConfig {
    /// Parses a configuration from a JSON object. Missing keys take their defaults.
    pub fn from_json(json: &str) -> DocMapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_field_conversion(mut self, conversion: FieldConversion) -> Self {
        self.field_conversion = conversion;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_conversion_names() {
        let config = DocMapConfig::from_json(r#"{ "fieldConversion": "toKebabCase" }"#).unwrap();
        assert_eq!(config.field_conversion, FieldConversion::ToKebabCase);

        let config = DocMapConfig::from_json("{}").unwrap();
        assert_eq!(config.field_conversion, FieldConversion::None);
    }

    #[test]
    fn rejects_unknown_conversion() {
        assert!(DocMapConfig::from_json(r#"{ "fieldConversion": "shout" }"#).is_err());
    }

    #[test]
    fn applies_each_conversion() {
        let property = "test-field-name";
        assert_eq!(FieldConversion::None.apply(property), "test-field-name");
        assert_eq!(FieldConversion::ToCamelCase.apply(property), "testFieldName");
        assert_eq!(FieldConversion::ToKebabCase.apply(property), "test-field-name");
        assert_eq!(FieldConversion::ToSnakeCase.apply(property), "test_field_name");
    }
}
