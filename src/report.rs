//! Rendering of validation outcomes

use serde::Serialize;
use std::fmt::Write as _;

use crate::config::OutputFormat;
use crate::violation::Violation;

/// Result of validating one data document
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Where the data came from (file path, demo revision, ...)
    pub source: String,
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl Outcome {
    pub fn new(source: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            source: source.into(),
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn render(&self, format: OutputFormat, valid_message: &str) -> serde_json::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.render_text(valid_message)),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    /// Plain text: the valid message, or one line per violation with its
    /// closest-alternative causes indented underneath
    pub fn render_text(&self, valid_message: &str) -> String {
        if self.valid {
            return format!("{}: {}", self.source, valid_message);
        }

        let mut out = format!("{}: {} violation(s)", self.source, self.violations.len());
        for violation in &self.violations {
            let _ = write!(out, "\n  ❌ {}", violation);
            for cause in &violation.context {
                let _ = write!(out, "\n     └─ {}", cause);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::{Constraint, InstancePath};

    #[test]
    fn test_valid_text() {
        let outcome = Outcome::new("demo v2", Vec::new());
        assert_eq!(outcome.render_text("VALID SCHEMA!"), "demo v2: VALID SCHEMA!");
    }

    #[test]
    fn test_invalid_text_lists_context() {
        let cause = Violation::new(
            InstancePath::root().join("channel"),
            Constraint::Required,
            "missing required property \"channel\"",
        );
        let outer = Violation::new(InstancePath::root(), Constraint::OneOf, "no alternative matched (0 of 3)")
            .with_context(vec![cause]);
        let text = Outcome::new("data.json", vec![outer]).render_text("VALID SCHEMA!");

        assert!(text.starts_with("data.json: 1 violation(s)"));
        assert!(text.contains("/ [oneOf]: no alternative matched"));
        assert!(text.contains("└─ /channel [required]"));
    }

    #[test]
    fn test_json_render() {
        let outcome = Outcome::new(
            "x.json",
            vec![Violation::new(InstancePath::root(), Constraint::Type, "expected object, found null")
                .with_instance(&serde_json::Value::Null)],
        );
        let json: serde_json::Value =
            serde_json::from_str(&outcome.render(OutputFormat::Json, "").unwrap()).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["violations"][0]["constraint"], "type");
        let violation = json["violations"][0].as_object().unwrap();
        assert!(violation.contains_key("instance"));
        assert!(!violation.contains_key("context"));
    }
}
