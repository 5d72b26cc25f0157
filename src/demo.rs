//! Retailer/manufacturer demonstration
//!
//! Two revisions of the same schema ship embedded in the binary, each with a
//! sample data document that conforms to it:
//!
//! ```text
//! demo/
//! ├── retailers-v1.schema.json   draft-03 style "type": {"$ref": ...}
//! ├── retailers-v1.data.json     manufacturer-bases, the north face
//! ├── retailers-v2.schema.json   plain $ref items, closed nike variant
//! └── retailers-v2.data.json     manufacturers, nike-extended with stores
//! ```

use include_dir::{include_dir, Dir};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchemaError};
use crate::validator::{ValidationOptions, Validator};
use crate::violation::Violation;

static DEMO_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/demo");

/// Which schema revision to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Revision {
    /// `manufacturer-bases`, variants outdoor research / nike / the north face
    V1,
    /// `manufacturers`, variants outdoor research / nike / nike-extended
    #[default]
    V2,
}

impl Revision {
    pub const ALL: [Revision; 2] = [Revision::V1, Revision::V2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Revision::V1 => "v1",
            Revision::V2 => "v2",
        }
    }

    fn schema_file(&self) -> String {
        format!("retailers-{}.schema.json", self.as_str())
    }

    fn data_file(&self) -> String {
        format!("retailers-{}.data.json", self.as_str())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Revision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Revision::V1),
            "v2" | "2" => Ok(Revision::V2),
            other => Err(format!("unknown revision {:?} (expected v1 or v2)", other)),
        }
    }
}

/// Schema and sample data of one revision
#[derive(Debug, Clone)]
pub struct DemoDocument {
    pub revision: Revision,
    pub schema: Value,
    pub data: Value,
}

impl DemoDocument {
    pub fn load(revision: Revision) -> Result<Self> {
        Ok(Self {
            revision,
            schema: embedded_json(&revision.schema_file())?,
            data: embedded_json(&revision.data_file())?,
        })
    }

    pub fn validator(&self, options: ValidationOptions) -> Result<Validator> {
        Validator::with_options(&self.schema, options)
    }

    /// Validate the bundled sample data against the bundled schema
    pub fn run(&self, options: ValidationOptions) -> Result<Vec<Violation>> {
        Ok(self.validator(options)?.validate(&self.data))
    }
}

fn embedded_json(name: &str) -> Result<Value> {
    let content = DEMO_DIR
        .get_file(name)
        .and_then(|f| f.contents_utf8())
        .ok_or_else(|| SchemaError::InvalidFormat(format!("embedded demo file {} is missing", name)))?;
    Ok(serde_json::from_str(content)?)
}
