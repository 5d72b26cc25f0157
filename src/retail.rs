//! Typed retailer model
//!
//! The schema encodes "abstract base + subclasses" with `allOf`/`oneOf`.
//! In Rust that is a closed enum selected by the `name` discriminant. A
//! document is validated against the schema first, then decoded into these
//! types, so the enum only ever sees data the schema already accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::validator::Validator;
use crate::violation::Violation;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("document does not conform to the schema ({} violation(s))", .0.len())]
    Invalid(Vec<Violation>),

    #[error("document conforms but cannot be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Residential,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "USA")]
    Usa,
    England,
    Brazil,
}

/// A manufacturer variant, selected by `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Manufacturer {
    #[serde(rename = "outdoor research")]
    OutdoorResearch {
        id: String,
        description: String,
        channel: Channel,
    },
    /// Covers both `nike` and `nike-extended`; the latter carries `stores`
    #[serde(rename = "nike")]
    Nike {
        id: String,
        description: String,
        locations: Vec<Location>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        stores: Vec<String>,
    },
    #[serde(rename = "the north face")]
    TheNorthFace { id: String, description: String },
}

impl Manufacturer {
    /// The discriminant value
    pub fn name(&self) -> &'static str {
        match self {
            Manufacturer::OutdoorResearch { .. } => "outdoor research",
            Manufacturer::Nike { .. } => "nike",
            Manufacturer::TheNorthFace { .. } => "the north face",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Manufacturer::OutdoorResearch { id, .. }
            | Manufacturer::Nike { id, .. }
            | Manufacturer::TheNorthFace { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retailer {
    pub name: String,
    pub id: String,
    /// `manufacturer-bases` in the first schema revision
    #[serde(alias = "manufacturer-bases")]
    pub manufacturers: Vec<Manufacturer>,
}

impl Retailer {
    pub fn manufacturers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Manufacturer> + 'a {
        self.manufacturers.iter().filter(move |m| m.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub retailers: Vec<Retailer>,
}

impl Catalog {
    /// Validate `value` with `validator`, then decode it
    pub fn from_value(validator: &Validator, value: Value) -> Result<Self, CatalogError> {
        let violations = validator.validate(&value);
        if !violations.is_empty() {
            return Err(CatalogError::Invalid(violations));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn retailer(&self, id: &str) -> Option<&Retailer> {
        self.retailers.iter().find(|r| r.id == id)
    }
}
