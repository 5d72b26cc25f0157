//! Schema Conform
//!
//! A small JSON Schema validation engine, plus the retailer/manufacturer
//! demonstration it was built around.
//!
//! ## Features
//!
//! - **Compiled Schemas**: every schema defect (dangling `$ref`, empty
//!   `oneOf`, reference cycles with no base case) is rejected up front
//! - **Accumulated Violations**: bad data never aborts validation; each
//!   failure is reported with its path, keyword and message
//! - **Composition**: `allOf` flattens into one effective schema, `oneOf`
//!   reports both "no alternative matched" and "ambiguous match"
//! - **Symbolic `$ref`**: definitions are looked up by name, so mutually
//!   referential schemas need no pointer graph
//!
//! ## Usage
//!
//! ```
//! use schema_conform::{Constraint, Validator};
//! use serde_json::json;
//!
//! let validator = Validator::new(&json!({
//!     "type": "object",
//!     "properties": { "name": { "type": "string" } },
//!     "required": ["name"],
//!     "additionalProperties": false
//! })).unwrap();
//!
//! let violations = validator.validate(&json!({ "extra": true }));
//! assert_eq!(violations.len(), 2);
//! assert_eq!(violations[0].constraint, Constraint::Required);
//! ```
//!
//! ## Layout
//!
//! ```text
//! schema       SchemaNode tree (serde)
//! definitions  DefinitionsTable, $ref parsing, cycle analysis
//! validator    Validator, validate(), allOf/oneOf evaluation
//! violation    Violation, InstancePath, Constraint
//! config       ValidatorConfig (files + SCHEMA_CONFORM__* env)
//! report       text / JSON rendering of outcomes
//! demo         embedded retailer schema revisions and sample data
//! retail       typed retailer/manufacturer model
//! ```

pub mod config;
pub mod definitions;
pub mod demo;
pub mod error;
pub mod report;
pub mod retail;
pub mod schema;
pub mod validator;
pub mod violation;

pub use config::{OutputFormat, ValidatorConfig};
pub use definitions::{DefinitionsTable, RefTarget};
pub use error::{Result, SchemaError};
pub use report::Outcome;
pub use schema::{JsonKind, SchemaNode};
pub use validator::{is_valid, validate, ValidationOptions, Validator};
pub use violation::{Constraint, InstancePath, PathSegment, Violation};
