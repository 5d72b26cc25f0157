//! Schema tree types
//!
//! A [`SchemaNode`] is deserialized straight from a `serde_json::Value`.
//! Keywords this engine does not understand (`$schema`, `title`,
//! `description`, ...) are ignored, the same way a draft-04 validator treats
//! annotations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{Result, SchemaError};

// =============================================================================
// JSON Kinds
// =============================================================================

/// Runtime kind of a JSON value, as named by the `type` keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// Draft-03 wildcard
    Any,
}

impl JsonKind {
    /// The most specific kind of `value` (integral numbers report `Integer`)
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => JsonKind::Object,
            Value::Array(_) => JsonKind::Array,
            Value::String(_) => JsonKind::String,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Null => JsonKind::Null,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false) {
                    JsonKind::Integer
                } else {
                    JsonKind::Number
                }
            }
        }
    }

    /// Does a value of this runtime shape satisfy the kind?
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            JsonKind::Any => true,
            JsonKind::Number => value.is_number(),
            kind => *kind == JsonKind::of(value),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::Object => "object",
            JsonKind::Array => "array",
            JsonKind::String => "string",
            JsonKind::Number => "number",
            JsonKind::Integer => "integer",
            JsonKind::Boolean => "boolean",
            JsonKind::Null => "null",
            JsonKind::Any => "any",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Keyword Shapes
// =============================================================================

/// Value of the `type` keyword.
///
/// Besides plain kind names this accepts the draft-03 form where an
/// alternative is itself a schema, e.g. `"type": {"enum": ["nike"]}` or
/// `"type": {"$ref": "#/definitions/retailer"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    // Tried first: a derived struct would otherwise accept a sequence positionally
    Union(Vec<TypeAlternative>),
    One(TypeAlternative),
}

impl TypeSpec {
    pub fn alternatives(&self) -> &[TypeAlternative] {
        match self {
            TypeSpec::Union(alts) => alts,
            TypeSpec::One(alt) => std::slice::from_ref(alt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeAlternative {
    Kind(JsonKind),
    Schema(Box<SchemaNode>),
}

impl fmt::Display for TypeAlternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAlternative::Kind(kind) => write!(f, "{}", kind),
            TypeAlternative::Schema(node) => match &node.reference {
                Some(reference) => write!(f, "schema {}", reference),
                None => f.write_str("inline schema"),
            },
        }
    }
}

/// Value of `additionalProperties`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

// =============================================================================
// Schema Node
// =============================================================================

/// One node of a schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// Symbolic reference into the definitions table
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Only read on the document root
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, SchemaNode>,

    #[serde(rename = "$defs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defs: BTreeMap<String, SchemaNode>,
}

impl SchemaNode {
    /// Parse a schema tree from a JSON value
    pub fn from_value(value: &Value) -> Result<Self> {
        check_shape(value, "#")?;
        serde_json::from_value(value.clone()).map_err(|e| SchemaError::InvalidFormat(e.to_string()))
    }

    /// Parse a schema tree from JSON text
    pub fn from_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(&value)
    }

    /// Read and parse a schema document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Visit this node and every nested sub-schema, depth first.
    ///
    /// `location` is a JSON pointer into the schema document; the callback
    /// receives the pointer of each node it is handed.
    pub fn walk<F>(&self, location: &str, f: &mut F) -> Result<()>
    where
        F: FnMut(&SchemaNode, &str) -> Result<()>,
    {
        f(self, location)?;

        if let Some(type_spec) = &self.type_spec {
            for (i, alt) in type_spec.alternatives().iter().enumerate() {
                if let TypeAlternative::Schema(node) = alt {
                    let loc = match type_spec {
                        TypeSpec::One(_) => format!("{}/type", location),
                        TypeSpec::Union(_) => format!("{}/type/{}", location, i),
                    };
                    node.walk(&loc, f)?;
                }
            }
        }
        for (name, prop) in &self.properties {
            prop.walk(&format!("{}/properties/{}", location, escape_pointer(name)), f)?;
        }
        if let Some(AdditionalProperties::Schema(node)) = &self.additional_properties {
            node.walk(&format!("{}/additionalProperties", location), f)?;
        }
        if let Some(items) = &self.items {
            items.walk(&format!("{}/items", location), f)?;
        }
        for (keyword, group) in self.compositions() {
            for (i, alt) in group.iter().enumerate() {
                alt.walk(&format!("{}/{}/{}", location, keyword, i), f)?;
            }
        }
        for (name, def) in &self.definitions {
            def.walk(&format!("{}/definitions/{}", location, escape_pointer(name)), f)?;
        }
        for (name, def) in &self.defs {
            def.walk(&format!("{}/$defs/{}", location, escape_pointer(name)), f)?;
        }
        Ok(())
    }

    /// `allOf`, `oneOf` and `anyOf` groups present on this node, with their keyword
    pub fn compositions(&self) -> impl Iterator<Item = (&'static str, &Vec<SchemaNode>)> {
        [
            ("allOf", self.all_of.as_ref()),
            ("oneOf", self.one_of.as_ref()),
            ("anyOf", self.any_of.as_ref()),
        ]
        .into_iter()
        .filter_map(|(keyword, group)| group.map(|g| (keyword, g)))
    }

    /// References evaluated against the *same* data value as this node.
    ///
    /// Anything under `properties` or `items` moves down the data tree and is
    /// excluded. A cycle made only of these edges can never terminate.
    pub fn same_position_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(reference) = &self.reference {
            out.push(reference);
        }
        if let Some(type_spec) = &self.type_spec {
            for alt in type_spec.alternatives() {
                if let TypeAlternative::Schema(node) = alt {
                    node.same_position_refs(out);
                }
            }
        }
        for (_, group) in self.compositions() {
            for alt in group {
                alt.same_position_refs(out);
            }
        }
    }
}

/// Escape a key for use inside a JSON pointer (`~` → `~0`, `/` → `~1`)
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reject sub-schema positions holding anything but a schema object.
///
/// The derived deserializer reads a JSON array into a struct field by field,
/// so `"items": []` would otherwise come out as the empty schema.
fn check_shape(value: &Value, location: &str) -> Result<()> {
    let Value::Object(map) = value else {
        return Err(SchemaError::InvalidFormat(format!(
            "schema at {} must be an object, found {}",
            location,
            JsonKind::of(value)
        )));
    };

    for (keyword, member) in map {
        let here = format!("{}/{}", location, escape_pointer(keyword));
        match keyword.as_str() {
            "properties" | "definitions" | "$defs" => {
                let Value::Object(entries) = member else {
                    return Err(SchemaError::InvalidFormat(format!(
                        "{} must map names to schemas, found {}",
                        here,
                        JsonKind::of(member)
                    )));
                };
                for (name, sub) in entries {
                    check_shape(sub, &format!("{}/{}", here, escape_pointer(name)))?;
                }
            }
            "items" if member.is_array() => {
                return Err(SchemaError::InvalidKeyword {
                    keyword: "items",
                    location: location.to_string(),
                    reason: "tuple form (an array of schemas) is not supported; give a single schema".to_string(),
                });
            }
            "items" => check_shape(member, &here)?,
            "additionalProperties" if !member.is_boolean() => check_shape(member, &here)?,
            "allOf" | "oneOf" | "anyOf" => {
                let Value::Array(alternatives) = member else {
                    return Err(SchemaError::InvalidFormat(format!(
                        "{} must be an array of schemas, found {}",
                        here,
                        JsonKind::of(member)
                    )));
                };
                for (i, alt) in alternatives.iter().enumerate() {
                    check_shape(alt, &format!("{}/{}", here, i))?;
                }
            }
            "type" => match member {
                Value::Object(_) => check_shape(member, &here)?,
                Value::Array(alternatives) => {
                    for (i, alt) in alternatives.iter().enumerate().filter(|(_, alt)| alt.is_object()) {
                        check_shape(alt, &format!("{}/{}", here, i))?;
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{ "type": "string", "minLength": 1 }"#).unwrap();
        assert_eq!(SchemaNode::from_file(&path).unwrap().min_length, Some(1));

        let missing = dir.path().join("absent.json");
        assert!(matches!(SchemaNode::from_file(&missing), Err(SchemaError::Io(_))));
    }

    #[test]
    fn test_parse_basic_keywords() {
        let node = SchemaNode::from_value(&json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "tags": { "type": "array", "minItems": 1, "items": { "type": "string" } }
            },
            "required": ["name"],
            "additionalProperties": false
        }))
        .unwrap();

        assert_eq!(node.type_spec, Some(TypeSpec::One(TypeAlternative::Kind(JsonKind::Object))));
        assert_eq!(node.properties.len(), 2);
        assert_eq!(node.required, vec!["name"]);
        assert_eq!(node.additional_properties, Some(AdditionalProperties::Allowed(false)));
        assert_eq!(node.properties["tags"].min_items, Some(1));
    }

    #[test]
    fn test_type_as_schema() {
        let node = SchemaNode::from_value(&json!({
            "type": { "enum": ["nike"] }
        }))
        .unwrap();

        match node.type_spec {
            Some(TypeSpec::One(TypeAlternative::Schema(inner))) => {
                assert_eq!(inner.enum_values, Some(vec![json!("nike")]));
            }
            other => panic!("Expected schema-valued type, got {:?}", other),
        }
    }

    #[test]
    fn test_type_union() {
        let node = SchemaNode::from_value(&json!({ "type": ["string", "null"] })).unwrap();
        let alts = node.type_spec.as_ref().unwrap().alternatives();
        assert_eq!(alts.len(), 2);
        assert_eq!(alts[1], TypeAlternative::Kind(JsonKind::Null));
    }

    #[test]
    fn test_unknown_type_name_rejected() {
        let err = SchemaNode::from_value(&json!({ "type": "strnig" })).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFormat(_)));
    }

    #[test]
    fn test_non_object_document_rejected() {
        assert!(SchemaNode::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_array_shaped_subschemas_rejected() {
        match SchemaNode::from_value(&json!({ "properties": { "a": [{ "type": "string" }] } })) {
            Err(SchemaError::InvalidFormat(message)) => {
                assert_eq!(message, "schema at #/properties/a must be an object, found array")
            }
            other => panic!("Expected InvalidFormat, got {:?}", other),
        }

        for items in [json!([]), json!([{ "type": "string" }])] {
            match SchemaNode::from_value(&json!({ "properties": { "tags": { "items": items } } })) {
                Err(SchemaError::InvalidKeyword { keyword, location, .. }) => {
                    assert_eq!(keyword, "items");
                    assert_eq!(location, "#/properties/tags");
                }
                other => panic!("Expected InvalidKeyword, got {:?}", other),
            }
        }

        assert!(matches!(
            SchemaNode::from_value(&json!({ "definitions": { "a": { "oneOf": [[]] } } })),
            Err(SchemaError::InvalidFormat(_))
        ));
        assert!(matches!(
            SchemaNode::from_value(&json!({ "additionalProperties": [] })),
            Err(SchemaError::InvalidFormat(_))
        ));
        assert!(matches!(
            SchemaNode::from_value(&json!({ "type": { "items": [] } })),
            Err(SchemaError::InvalidKeyword { keyword: "items", .. })
        ));
    }

    #[test]
    fn test_object_shaped_subschemas_accepted() {
        let node = SchemaNode::from_value(&json!({
            "type": ["object", { "enum": ["x"] }],
            "additionalProperties": false,
            "items": { "type": "string" },
            "allOf": [{ "required": ["a"] }]
        }))
        .unwrap();
        assert_eq!(node.additional_properties, Some(AdditionalProperties::Allowed(false)));
        assert!(node.items.is_some());
    }

    #[test]
    fn test_kind_of_numbers() {
        assert_eq!(JsonKind::of(&json!(3)), JsonKind::Integer);
        assert_eq!(JsonKind::of(&json!(3.0)), JsonKind::Integer);
        assert_eq!(JsonKind::of(&json!(3.5)), JsonKind::Number);
        assert!(JsonKind::Number.accepts(&json!(3)));
        assert!(!JsonKind::Integer.accepts(&json!(3.5)));
    }

    #[test]
    fn test_walk_visits_nested_locations() {
        let node = SchemaNode::from_value(&json!({
            "definitions": {
                "a/b": { "oneOf": [{ "type": "string" }] }
            },
            "properties": { "x": { "items": { "type": "null" } } }
        }))
        .unwrap();

        let mut seen = Vec::new();
        node.walk("#", &mut |_, loc| {
            seen.push(loc.to_string());
            Ok(())
        })
        .unwrap();

        assert!(seen.contains(&"#/definitions/a~1b/oneOf/0".to_string()));
        assert!(seen.contains(&"#/properties/x/items".to_string()));
    }

    #[test]
    fn test_same_position_refs_skip_properties() {
        let node = SchemaNode::from_value(&json!({
            "allOf": [{ "$ref": "#/definitions/base" }],
            "type": { "$ref": "#/definitions/typed" },
            "properties": { "child": { "$ref": "#/definitions/child" } }
        }))
        .unwrap();

        let mut refs = Vec::new();
        node.same_position_refs(&mut refs);
        assert_eq!(refs, vec!["#/definitions/typed", "#/definitions/base"]);
    }
}
