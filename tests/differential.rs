//! Differential Tests
//!
//! Cross-checks the valid/invalid verdict against the `jsonschema` crate on
//! schemas whose meaning is the same under both. Keyword interplay that is
//! resolved differently on purpose (`allOf` members closing over sibling
//! properties, schema-valued `type`) is left out.

use jsonschema::JSONSchema;
use serde_json::{json, Value};

use schema_conform::Validator;

fn assert_same_verdicts(schema: Value, instances: &[Value]) {
    let ours = Validator::new(&schema).unwrap();
    let reference = JSONSchema::compile(&schema).expect("reference compiles");

    for instance in instances {
        let expected = reference.is_valid(instance);
        let actual = ours.is_valid(instance);
        assert_eq!(
            actual,
            expected,
            "verdicts differ for {} against {}\nviolations: {:#?}",
            instance,
            schema,
            ours.validate(instance)
        );
    }
}

#[test]
fn test_types_and_required() {
    assert_same_verdicts(
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "count": { "type": "integer" },
                "ratio": { "type": "number" },
                "active": { "type": "boolean" },
                "note": { "type": ["string", "null"] }
            },
            "required": ["name", "count"]
        }),
        &[
            json!({ "name": "rei", "count": 3 }),
            json!({ "name": "rei", "count": 3, "ratio": 0.5, "active": true, "note": null }),
            json!({ "name": "rei" }),
            json!({ "name": 1, "count": 3 }),
            json!({ "name": "rei", "count": 2.5 }),
            json!({ "name": "rei", "count": 3, "note": 7 }),
            json!({ "name": "rei", "count": 3, "active": "yes" }),
            json!([]),
            json!(null),
        ],
    );
}

#[test]
fn test_additional_properties() {
    assert_same_verdicts(
        json!({
            "properties": { "id": { "type": "string" } },
            "additionalProperties": false
        }),
        &[json!({}), json!({ "id": "1" }), json!({ "id": "1", "extra": 0 }), json!("scalar")],
    );
    assert_same_verdicts(
        json!({
            "properties": { "id": { "type": "string" } },
            "additionalProperties": { "type": "integer" }
        }),
        &[json!({ "id": "1", "n": 2 }), json!({ "id": "1", "n": "2" })],
    );
}

#[test]
fn test_enum_and_arrays() {
    assert_same_verdicts(
        json!({
            "type": "array",
            "minItems": 1,
            "maxItems": 3,
            "items": { "enum": ["USA", "England", "Brazil", 1, null] }
        }),
        &[
            json!(["USA"]),
            json!(["USA", "Brazil", null]),
            json!([]),
            json!(["USA", "USA", "USA", "USA"]),
            json!(["Mars"]),
            json!({ "0": "USA" }),
        ],
    );
}

#[test]
fn test_string_and_number_bounds() {
    assert_same_verdicts(
        json!({
            "properties": {
                "code": { "type": "string", "minLength": 2, "maxLength": 4, "pattern": "^[A-Z]+$" },
                "qty": { "minimum": 0, "maximum": 10 }
            }
        }),
        &[
            json!({ "code": "AB", "qty": 0 }),
            json!({ "code": "A" }),
            json!({ "code": "ABCDE" }),
            json!({ "code": "ab" }),
            json!({ "qty": -0.5 }),
            json!({ "qty": 10 }),
            json!({ "qty": 10.01 }),
            json!({ "qty": "many" }),
        ],
    );
}

#[test]
fn test_one_of_and_any_of() {
    let alternatives = json!([
        { "type": "string" },
        { "type": "string", "minLength": 3 },
        { "type": "integer" }
    ]);
    let instances = [json!("ab"), json!("abcd"), json!(4), json!(true), json!(null)];

    assert_same_verdicts(json!({ "oneOf": alternatives.clone() }), &instances);
    assert_same_verdicts(json!({ "anyOf": alternatives }), &instances);
}

#[test]
fn test_references_and_all_of() {
    assert_same_verdicts(
        json!({
            "definitions": {
                "base": {
                    "type": "object",
                    "properties": { "id": { "type": "string" } },
                    "required": ["id"]
                },
                "sized": {
                    "allOf": [
                        { "$ref": "#/definitions/base" },
                        { "properties": { "size": { "type": "integer" } }, "required": ["size"] }
                    ]
                }
            },
            "type": "array",
            "items": { "$ref": "#/definitions/sized" }
        }),
        &[
            json!([]),
            json!([{ "id": "1", "size": 2 }]),
            json!([{ "id": "1" }]),
            json!([{ "size": 2 }]),
            json!([{ "id": 1, "size": 2 }]),
            json!([{ "id": "1", "size": 2 }, "nope"]),
        ],
    );
}

#[test]
fn test_recursive_reference() {
    assert_same_verdicts(
        json!({
            "definitions": {
                "tree": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "children": { "type": "array", "items": { "$ref": "#/definitions/tree" } }
                    },
                    "required": ["label"]
                }
            },
            "$ref": "#/definitions/tree"
        }),
        &[
            json!({ "label": "a" }),
            json!({ "label": "a", "children": [{ "label": "b", "children": [] }] }),
            json!({ "label": "a", "children": [{ "children": [] }] }),
            json!({ "label": "a", "children": [{ "label": "b", "children": [{ "label": 3 }] }] }),
        ],
    );
}

#[test]
fn test_discriminated_variants() {
    // The retailer pattern with every variant closed on its own
    assert_same_verdicts(
        json!({
            "definitions": {
                "outdoor-research": {
                    "type": "object",
                    "properties": {
                        "name": { "enum": ["outdoor research"] },
                        "id": { "type": "string" },
                        "channel": { "enum": ["residential", "business"] }
                    },
                    "required": ["name", "id", "channel"],
                    "additionalProperties": false
                },
                "nike": {
                    "type": "object",
                    "properties": {
                        "name": { "enum": ["nike"] },
                        "id": { "type": "string" },
                        "locations": { "type": "array", "minItems": 1, "items": { "enum": ["USA", "England", "Brazil"] } }
                    },
                    "required": ["name", "id", "locations"],
                    "additionalProperties": false
                }
            },
            "type": "array",
            "items": { "oneOf": [{ "$ref": "#/definitions/outdoor-research" }, { "$ref": "#/definitions/nike" }] }
        }),
        &[
            json!([{ "name": "outdoor research", "id": "1", "channel": "business" }]),
            json!([{ "name": "nike", "id": "2", "locations": ["Brazil"] }]),
            json!([{ "name": "outdoor research", "id": "1" }]),
            json!([{ "name": "nike", "id": "2", "locations": [] }]),
            json!([{ "name": "nike", "id": "2", "locations": ["USA"], "stores": ["Portland"] }]),
            json!([{ "name": "adidas", "id": "3" }]),
        ],
    );
}
