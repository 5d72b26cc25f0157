//! Violation records
//!
//! A [`Violation`] is a single failure of the data to satisfy one schema
//! constraint. Violations are plain values accumulated in traversal order;
//! they never travel through `Result::Err`.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One step into a data document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Property(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Property(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

/// Location of a value inside the data document.
///
/// Displays as a JSON pointer (`/retailers/0/manufacturers/1/channel`);
/// the document root displays as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InstancePath(Vec<PathSegment>);

impl InstancePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The trailing property name, if the path ends in one
    pub fn last_property(&self) -> Option<&str> {
        match self.0.last() {
            Some(PathSegment::Property(name)) => Some(name),
            _ => None,
        }
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// This path extended by one segment
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut path = self.clone();
        path.push(segment.into());
        path
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for InstancePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            match segment {
                PathSegment::Property(name) => {
                    write!(f, "/{}", name.replace('~', "~0").replace('/', "~1"))?
                }
                PathSegment::Index(i) => write!(f, "/{}", i)?,
            }
        }
        Ok(())
    }
}

/// The schema keyword a violation was raised by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    Type,
    Enum,
    Required,
    AdditionalProperties,
    MinItems,
    MaxItems,
    MinLength,
    MaxLength,
    Pattern,
    Minimum,
    Maximum,
    OneOf,
    AnyOf,
    /// Data nested deeper than the configured limit
    Depth,
}

impl Constraint {
    pub fn keyword(&self) -> &'static str {
        match self {
            Constraint::Type => "type",
            Constraint::Enum => "enum",
            Constraint::Required => "required",
            Constraint::AdditionalProperties => "additionalProperties",
            Constraint::MinItems => "minItems",
            Constraint::MaxItems => "maxItems",
            Constraint::MinLength => "minLength",
            Constraint::MaxLength => "maxLength",
            Constraint::Pattern => "pattern",
            Constraint::Minimum => "minimum",
            Constraint::Maximum => "maximum",
            Constraint::OneOf => "oneOf",
            Constraint::AnyOf => "anyOf",
            Constraint::Depth => "depth",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single reported failure of the data against one constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Where in the data the failure is
    pub path: InstancePath,
    /// Which keyword failed
    pub constraint: Constraint,
    /// Human readable description
    pub message: String,
    /// For a `oneOf`/`anyOf` with no match: the violations of the closest alternative
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Violation>,
    /// The offending value (for `required`, the object missing the property)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<Value>,
}

impl Violation {
    pub fn new(path: InstancePath, constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            path,
            constraint,
            message: message.into(),
            context: Vec::new(),
            instance: None,
        }
    }

    pub fn with_context(mut self, context: Vec<Violation>) -> Self {
        self.context = context;
        self
    }

    pub fn with_instance(mut self, instance: &Value) -> Self {
        self.instance = Some(instance.clone());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.constraint, self.message)
    }
}
