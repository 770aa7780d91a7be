//! Declared record schemas.
//!
//! A [`Schema`] is an ordered list of [`Property`] declarations. Every
//! property is implicitly nullable, matching how the upstream API leaves
//! optional fields out or sends `null`.

use crate::error::{ProtocolError, ProtocolResult};
use serde_json::{json, Map, Value};
use std::fmt;

/// A JSON value type a field may be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` / `false`.
    Boolean,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
}

impl FieldType {
    /// Returns the JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    /// Parses a JSON Schema type name.
    pub fn parse(name: &str) -> ProtocolResult<Self> {
        match name {
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "integer" => Ok(FieldType::Integer),
            "boolean" => Ok(FieldType::Boolean),
            "object" => Ok(FieldType::Object),
            "array" => Ok(FieldType::Array),
            other => Err(ProtocolError::UnknownFieldType(other.to_string())),
        }
    }

    /// Returns true if `value` already conforms to this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Number, Value::Number(_)) => true,
            (FieldType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Object, Value::Object(_)) => true,
            (FieldType::Array, Value::Array(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Field name.
    pub name: &'static str,
    /// Accepted types, in preference order. `null` is always accepted.
    pub types: Vec<FieldType>,
    /// Human-readable description.
    pub description: &'static str,
    /// Nested properties for object fields.
    pub properties: Vec<Property>,
    /// Item type for array fields.
    pub items: Option<FieldType>,
}

impl Property {
    /// Declares a field with a single type.
    pub fn new(name: &'static str, field_type: FieldType, description: &'static str) -> Self {
        Self::any_of(name, &[field_type], description)
    }

    /// Declares a field accepting any of `types`.
    pub fn any_of(name: &'static str, types: &[FieldType], description: &'static str) -> Self {
        Self {
            name,
            types: types.to_vec(),
            description,
            properties: Vec::new(),
            items: None,
        }
    }

    /// Declares an object field with nested properties.
    pub fn object(name: &'static str, properties: Vec<Property>, description: &'static str) -> Self {
        Self {
            properties,
            ..Self::new(name, FieldType::Object, description)
        }
    }

    /// Declares an array field whose items have `item_type`.
    pub fn array_of(name: &'static str, item_type: FieldType, description: &'static str) -> Self {
        Self {
            items: Some(item_type),
            ..Self::new(name, FieldType::Array, description)
        }
    }

    /// Renders this property as a JSON Schema fragment.
    pub fn to_json_schema(&self) -> Value {
        let mut types: Vec<Value> = self.types.iter().map(|t| json!(t.as_str())).collect();
        types.push(json!("null"));

        let mut fragment = Map::new();
        fragment.insert("type".into(), Value::Array(types));
        if !self.description.is_empty() {
            fragment.insert("description".into(), json!(self.description));
        }
        if !self.properties.is_empty() {
            let nested: Map<String, Value> = self
                .properties
                .iter()
                .map(|p| (p.name.to_string(), p.to_json_schema()))
                .collect();
            fragment.insert("properties".into(), Value::Object(nested));
        }
        if let Some(item) = self.items {
            fragment.insert("items".into(), json!({ "type": [item.as_str(), "null"] }));
        }
        Value::Object(fragment)
    }
}

/// The ordered field declarations of one endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    properties: Vec<Property>,
}

impl Schema {
    /// Creates a schema from property declarations.
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    /// Returns the declared properties in order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Looks up a property by name.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns true if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Renders the schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|p| (p.name.to_string(), p.to_json_schema()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_names_roundtrip() {
        for t in [
            FieldType::String,
            FieldType::Number,
            FieldType::Integer,
            FieldType::Boolean,
            FieldType::Object,
            FieldType::Array,
        ] {
            assert_eq!(FieldType::parse(t.as_str()).unwrap(), t);
        }
        assert!(matches!(
            FieldType::parse("date"),
            Err(ProtocolError::UnknownFieldType(_))
        ));
    }

    #[test]
    fn integer_rejects_fractions() {
        assert!(FieldType::Integer.matches(&json!(42)));
        assert!(!FieldType::Integer.matches(&json!(4.5)));
        assert!(FieldType::Number.matches(&json!(42)));
        assert!(FieldType::Number.matches(&json!(4.5)));
        assert!(!FieldType::String.matches(&json!(false)));
    }

    #[test]
    fn json_schema_marks_fields_nullable() {
        let schema = Schema::new(vec![
            Property::new("slug", FieldType::String, "Plugin slug"),
            Property::any_of(
                "tags",
                &[FieldType::Object, FieldType::Array],
                "Plugin tags",
            ),
        ]);

        let rendered = schema.to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["slug"]["type"], json!(["string", "null"]));
        assert_eq!(
            rendered["properties"]["tags"]["type"],
            json!(["object", "array", "null"])
        );
    }

    #[test]
    fn nested_properties_render() {
        let location = Property::object(
            "location",
            vec![Property::new("country", FieldType::String, "")],
            "Event location",
        );
        let rendered = location.to_json_schema();
        assert_eq!(
            rendered["properties"]["country"]["type"],
            json!(["string", "null"])
        );
        assert!(rendered["properties"]["country"].get("description").is_none());

        let categories = Property::array_of("categories", FieldType::Integer, "Category IDs");
        assert_eq!(
            categories.to_json_schema()["items"]["type"],
            json!(["integer", "null"])
        );
    }

    #[test]
    fn lookup_by_name() {
        let schema = Schema::new(vec![Property::new("id", FieldType::Integer, "")]);
        assert!(schema.contains("id"));
        assert!(!schema.contains("slug"));
        assert_eq!(schema.get("id").unwrap().types, vec![FieldType::Integer]);
    }
}
