//! Schema Validator
//!
//! Recursive descent over the data tree, guided by the schema tree.
//!
//! ## Evaluation order (per data value)
//!
//! 1. `$ref` chains are resolved through the [`DefinitionsTable`]
//! 2. `allOf` members are flattened into one effective scope: properties
//!    merged (later wins), `required` unioned, `type`/`enum` intersected,
//!    bounds tightened, `additionalProperties: false` sticky
//! 3. `type`: a mismatch stops all deeper checks on this value
//! 4. `oneOf` (exactly one alternative) and `anyOf` (at least one)
//! 5. object keywords, array keywords, string and number bounds
//! 6. `enum`
//!
//! Every defect of the schema itself is caught when the [`Validator`] is
//! built. After that, validation cannot fail: it only accumulates
//! [`Violation`]s.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

use crate::definitions::{DefinitionsTable, RefTarget};
use crate::error::{Result, SchemaError};
use crate::schema::{AdditionalProperties, JsonKind, SchemaNode, TypeAlternative, TypeSpec};
use crate::violation::{Constraint, InstancePath, PathSegment, Violation};

/// Validate `data` against a schema document in one call.
///
/// Compiles the schema first, so a malformed schema surfaces as `Err` before
/// any data is looked at.
pub fn validate(schema: &Value, data: &Value) -> Result<Vec<Violation>> {
    Ok(Validator::new(schema)?.validate(data))
}

/// `true` when `data` conforms to `schema`
pub fn is_valid(schema: &Value, data: &Value) -> Result<bool> {
    Ok(Validator::new(schema)?.is_valid(data))
}

// =============================================================================
// Options
// =============================================================================

/// Tunables for a [`Validator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Attach the closest alternative's violations to failed `oneOf`/`anyOf`
    /// and schema-valued `type` records
    pub closest_match_context: bool,
    /// Deepest data nesting that is still descended into
    pub max_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            closest_match_context: true,
            max_depth: 256,
        }
    }
}

// =============================================================================
// Validator
// =============================================================================

/// A compiled schema document.
///
/// Read-only after construction; share it freely between threads.
#[derive(Debug, Clone)]
pub struct Validator {
    root: SchemaNode,
    definitions: DefinitionsTable,
    patterns: HashMap<String, Regex>,
    options: ValidationOptions,
}

impl Validator {
    /// Compile a schema document with default options
    pub fn new(schema: &Value) -> Result<Self> {
        Self::with_options(schema, ValidationOptions::default())
    }

    pub fn with_options(schema: &Value, options: ValidationOptions) -> Result<Self> {
        Self::from_node(SchemaNode::from_value(schema)?, options)
    }

    /// Compile an already parsed schema tree.
    ///
    /// Fails on dangling or unsupported `$ref`s, empty `allOf`/`oneOf`/`anyOf`,
    /// empty or non-scalar `enum`, invalid `pattern`, and reference cycles
    /// that never descend into the data.
    pub fn from_node(mut root: SchemaNode, options: ValidationOptions) -> Result<Self> {
        let definitions = DefinitionsTable::extract(&mut root)?;

        let mut patterns = HashMap::new();
        let mut check = |node: &SchemaNode, location: &str| check_keywords(node, location, &mut patterns);
        root.walk("#", &mut check)?;
        for (name, node) in definitions.iter() {
            node.walk(&format!("#/definitions/{}", crate::schema::escape_pointer(name)), &mut check)?;
        }

        definitions.check_references(&root)?;
        definitions.check_cycles(&root)?;

        debug!(
            definitions = definitions.len(),
            patterns = patterns.len(),
            "compiled schema"
        );

        Ok(Self {
            root,
            definitions,
            patterns,
            options,
        })
    }

    pub fn definitions(&self) -> &DefinitionsTable {
        &self.definitions
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validate `data` against the document root.
    ///
    /// Returns violations in traversal order; empty means the data conforms.
    pub fn validate(&self, data: &Value) -> Vec<Violation> {
        let violations = self.run(&self.root, data);
        debug!(violations = violations.len(), "validated document");
        violations
    }

    pub fn is_valid(&self, data: &Value) -> bool {
        self.validate(data).is_empty()
    }

    /// Validate `data` against one named definition instead of the root
    pub fn validate_definition(&self, name: &str, data: &Value) -> Result<Vec<Violation>> {
        let node = self
            .definitions
            .get(name)
            .ok_or_else(|| SchemaError::UnknownDefinition { name: name.to_string() })?;
        Ok(self.run(node, data))
    }

    fn run(&self, node: &SchemaNode, data: &Value) -> Vec<Violation> {
        let mut out = Vec::new();
        let mut path = InstancePath::root();
        self.eval(node, data, &mut path, 0, &mut Vec::new(), &mut out);
        out
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// Follow a `$ref` chain, recording each definition entered in `visiting`.
    ///
    /// `visiting` holds the references expanded at the current data value; a
    /// repeat means a cycle that never consumes data. Construction already
    /// rejects those, so a hit here is logged and the branch skipped.
    fn resolve<'s>(&'s self, node: &'s SchemaNode, visiting: &mut Vec<RefTarget>) -> Option<&'s SchemaNode> {
        let mut node = node;
        while let Some(reference) = &node.reference {
            let target = RefTarget::parse(reference)?;
            if visiting.contains(&target) {
                warn!(reference = %reference, "reference cycle reached during validation; skipping");
                return None;
            }
            let next = match &target {
                RefTarget::Root => Some(&self.root),
                RefTarget::Definition(name) => self.definitions.get(name),
            };
            let Some(next) = next else {
                warn!(reference = %reference, "unresolved reference reached during validation; skipping");
                return None;
            };
            trace!(reference = %reference, "resolved reference");
            visiting.push(target);
            node = next;
        }
        Some(node)
    }

    /// Flatten `node` (already resolved) and its `allOf` members into `scope`
    fn gather<'s>(&'s self, node: &'s SchemaNode, visiting: &mut Vec<RefTarget>, scope: &mut Scope<'s>) -> bool {
        if let Some(parts) = &node.all_of {
            for part in parts {
                let mark = visiting.len();
                let ok = match self.resolve(part, visiting) {
                    Some(resolved) => self.gather(resolved, visiting, scope),
                    None => false,
                };
                visiting.truncate(mark);
                if !ok {
                    return false;
                }
            }
        }
        scope.absorb(node);
        true
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    fn eval<'s>(
        &'s self,
        node: &'s SchemaNode,
        data: &Value,
        path: &mut InstancePath,
        depth: usize,
        visiting: &mut Vec<RefTarget>,
        out: &mut Vec<Violation>,
    ) {
        if depth > self.options.max_depth {
            out.push(
                Violation::new(
                    path.clone(),
                    Constraint::Depth,
                    format!("data nested deeper than {} levels", self.options.max_depth),
                )
                .with_instance(data),
            );
            return;
        }

        let mark = visiting.len();
        let mut scope = Scope::default();
        let gathered = match self.resolve(node, visiting) {
            Some(resolved) => self.gather(resolved, visiting, &mut scope),
            None => false,
        };
        if gathered {
            self.check(&scope, data, path, depth, visiting, out);
        }
        visiting.truncate(mark);
    }

    fn check<'s>(
        &'s self,
        scope: &Scope<'s>,
        data: &Value,
        path: &mut InstancePath,
        depth: usize,
        visiting: &mut Vec<RefTarget>,
        out: &mut Vec<Violation>,
    ) {
        for &spec in &scope.types {
            if let Some(violation) = self.check_type(spec, data, path, depth, visiting) {
                out.push(violation);
                return;
            }
        }

        for &group in &scope.one_ofs {
            self.check_one_of(group, data, path, depth, visiting, out);
        }
        for &group in &scope.any_ofs {
            self.check_any_of(group, data, path, depth, visiting, out);
        }

        match data {
            Value::Object(map) => self.check_object(scope, data, map, path, depth, out),
            Value::Array(items) => self.check_array(scope, data, items, path, depth, out),
            Value::String(s) => self.check_string(scope, data, s, path, out),
            Value::Number(_) => self.check_number(scope, data, path, out),
            _ => {}
        }

        for allowed in &scope.enums {
            if !allowed.iter().any(|candidate| scalar_eq(candidate, data)) {
                out.push(
                    Violation::new(
                        path.clone(),
                        Constraint::Enum,
                        format!("value {} is not one of {}", data, Value::Array(allowed.to_vec())),
                    )
                    .with_instance(data),
                );
            }
        }
    }

    fn check_type<'s>(
        &'s self,
        spec: &'s TypeSpec,
        data: &Value,
        path: &mut InstancePath,
        depth: usize,
        visiting: &mut Vec<RefTarget>,
    ) -> Option<Violation> {
        let mut closest: Option<Vec<Violation>> = None;
        for alt in spec.alternatives() {
            match alt {
                TypeAlternative::Kind(kind) => {
                    if kind.accepts(data) {
                        return None;
                    }
                }
                TypeAlternative::Schema(node) => {
                    let mut scratch = Vec::new();
                    self.eval(node, data, path, depth, visiting, &mut scratch);
                    if scratch.is_empty() {
                        return None;
                    }
                    if closest.as_ref().map_or(true, |c| scratch.len() < c.len()) {
                        closest = Some(scratch);
                    }
                }
            }
        }

        let expected: Vec<String> = spec.alternatives().iter().map(ToString::to_string).collect();
        let message = format!("expected {}, found {}", expected.join(" or "), JsonKind::of(data));
        let violation = Violation::new(path.clone(), Constraint::Type, message).with_instance(data);
        Some(self.with_closest(violation, closest))
    }

    fn check_one_of<'s>(
        &'s self,
        group: &'s [SchemaNode],
        data: &Value,
        path: &mut InstancePath,
        depth: usize,
        visiting: &mut Vec<RefTarget>,
        out: &mut Vec<Violation>,
    ) {
        let (matched, closest) = self.try_alternatives(group, data, path, depth, visiting, false);
        trace!(path = %path, matched = ?matched, alternatives = group.len(), "oneOf");

        match matched.len() {
            1 => {}
            0 => out.push(self.no_match(Constraint::OneOf, group, data, path, closest)),
            n => {
                let labels: Vec<String> = matched.iter().map(|&i| alternative_label(&group[i], i)).collect();
                out.push(
                    Violation::new(
                        path.clone(),
                        Constraint::OneOf,
                        format!(
                            "ambiguous match: {} of {} alternatives matched ({})",
                            n,
                            group.len(),
                            labels.join(", ")
                        ),
                    )
                    .with_instance(data),
                );
            }
        }
    }

    fn check_any_of<'s>(
        &'s self,
        group: &'s [SchemaNode],
        data: &Value,
        path: &mut InstancePath,
        depth: usize,
        visiting: &mut Vec<RefTarget>,
        out: &mut Vec<Violation>,
    ) {
        let (matched, closest) = self.try_alternatives(group, data, path, depth, visiting, true);
        if matched.is_empty() {
            out.push(self.no_match(Constraint::AnyOf, group, data, path, closest));
        }
    }

    /// Evaluate each alternative with its violations suppressed.
    ///
    /// Returns the indices that matched and the closest failing alternative
    /// (fewest violations, earliest on ties). With `stop_at_first` the scan
    /// ends at the first match.
    fn try_alternatives<'s>(
        &'s self,
        group: &'s [SchemaNode],
        data: &Value,
        path: &mut InstancePath,
        depth: usize,
        visiting: &mut Vec<RefTarget>,
        stop_at_first: bool,
    ) -> (Vec<usize>, Option<(usize, Vec<Violation>)>) {
        let mut matched = Vec::new();
        let mut closest: Option<(usize, Vec<Violation>)> = None;

        for (i, alt) in group.iter().enumerate() {
            let mut scratch = Vec::new();
            self.eval(alt, data, path, depth, visiting, &mut scratch);
            if scratch.is_empty() {
                matched.push(i);
                if stop_at_first {
                    break;
                }
            } else if closest.as_ref().map_or(true, |(_, c)| scratch.len() < c.len()) {
                closest = Some((i, scratch));
            }
        }
        (matched, closest)
    }

    fn no_match(
        &self,
        constraint: Constraint,
        group: &[SchemaNode],
        data: &Value,
        path: &InstancePath,
        closest: Option<(usize, Vec<Violation>)>,
    ) -> Violation {
        let base = format!("no alternative matched (0 of {})", group.len());
        let violation = match closest {
            Some((i, causes)) if self.options.closest_match_context => {
                let message = format!(
                    "{}; closest {} failed: {}",
                    base,
                    alternative_label(&group[i], i),
                    summarize(&causes)
                );
                Violation::new(path.clone(), constraint, message).with_context(causes)
            }
            _ => Violation::new(path.clone(), constraint, base),
        };
        violation.with_instance(data)
    }

    fn with_closest(&self, violation: Violation, closest: Option<Vec<Violation>>) -> Violation {
        match closest {
            Some(causes) if self.options.closest_match_context => {
                let message = format!("{}: {}", violation.message, summarize(&causes));
                Violation { message, ..violation }.with_context(causes)
            }
            _ => violation,
        }
    }

    fn check_object<'s>(
        &'s self,
        scope: &Scope<'s>,
        data: &Value,
        map: &Map<String, Value>,
        path: &mut InstancePath,
        depth: usize,
        out: &mut Vec<Violation>,
    ) {
        for (&name, &prop) in &scope.properties {
            if let Some(child) = map.get(name) {
                path.push(PathSegment::Property(name.to_string()));
                self.eval(prop, child, path, depth + 1, &mut Vec::new(), out);
                path.pop();
            }
        }

        for &name in &scope.required {
            if !map.contains_key(name) {
                out.push(
                    Violation::new(
                        path.join(name),
                        Constraint::Required,
                        format!("missing required property {:?}", name),
                    )
                    .with_instance(data),
                );
            }
        }

        match scope.additional {
            Some(AdditionalProperties::Allowed(false)) => {
                for (key, value) in map.iter().filter(|(k, _)| !scope.properties.contains_key(k.as_str())) {
                    out.push(
                        Violation::new(
                            path.join(key.as_str()),
                            Constraint::AdditionalProperties,
                            format!("property {:?} is not allowed", key),
                        )
                        .with_instance(value),
                    );
                }
            }
            Some(AdditionalProperties::Schema(extra)) => {
                for (key, child) in map.iter().filter(|(k, _)| !scope.properties.contains_key(k.as_str())) {
                    path.push(PathSegment::Property(key.clone()));
                    self.eval(extra, child, path, depth + 1, &mut Vec::new(), out);
                    path.pop();
                }
            }
            _ => {}
        }
    }

    fn check_array<'s>(
        &'s self,
        scope: &Scope<'s>,
        data: &Value,
        items: &[Value],
        path: &mut InstancePath,
        depth: usize,
        out: &mut Vec<Violation>,
    ) {
        if let Some(item_schema) = scope.items {
            for (i, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                self.eval(item_schema, item, path, depth + 1, &mut Vec::new(), out);
                path.pop();
            }
        }

        let len = items.len() as u64;
        if let Some(min) = scope.min_items.filter(|&min| len < min) {
            out.push(
                Violation::new(
                    path.clone(),
                    Constraint::MinItems,
                    format!("expected at least {} items, found {}", min, len),
                )
                .with_instance(data),
            );
        }
        if let Some(max) = scope.max_items.filter(|&max| len > max) {
            out.push(
                Violation::new(
                    path.clone(),
                    Constraint::MaxItems,
                    format!("expected at most {} items, found {}", max, len),
                )
                .with_instance(data),
            );
        }
    }

    fn check_string(&self, scope: &Scope<'_>, data: &Value, s: &str, path: &InstancePath, out: &mut Vec<Violation>) {
        let len = s.chars().count() as u64;
        if let Some(min) = scope.min_length.filter(|&min| len < min) {
            out.push(
                Violation::new(
                    path.clone(),
                    Constraint::MinLength,
                    format!("expected at least {} characters, found {}", min, len),
                )
                .with_instance(data),
            );
        }
        if let Some(max) = scope.max_length.filter(|&max| len > max) {
            out.push(
                Violation::new(
                    path.clone(),
                    Constraint::MaxLength,
                    format!("expected at most {} characters, found {}", max, len),
                )
                .with_instance(data),
            );
        }
        for pattern in &scope.patterns {
            // Every pattern was compiled in from_node
            let Some(regex) = self.patterns.get(*pattern) else { continue };
            if !regex.is_match(s) {
                out.push(
                    Violation::new(
                        path.clone(),
                        Constraint::Pattern,
                        format!("{:?} does not match pattern {:?}", s, pattern),
                    )
                    .with_instance(data),
                );
            }
        }
    }

    fn check_number(&self, scope: &Scope<'_>, data: &Value, path: &InstancePath, out: &mut Vec<Violation>) {
        let Some(n) = data.as_f64() else { return };
        if let Some(min) = scope.minimum.filter(|&min| n < min) {
            out.push(
                Violation::new(
                    path.clone(),
                    Constraint::Minimum,
                    format!("{} is less than the minimum of {}", data, min),
                )
                .with_instance(data),
            );
        }
        if let Some(max) = scope.maximum.filter(|&max| n > max) {
            out.push(
                Violation::new(
                    path.clone(),
                    Constraint::Maximum,
                    format!("{} is greater than the maximum of {}", data, max),
                )
                .with_instance(data),
            );
        }
    }
}

// =============================================================================
// Effective Scope
// =============================================================================

/// Constraints in force for one data value after `allOf` flattening.
///
/// Borrows everything from the compiled schema; nothing is cloned.
#[derive(Default)]
struct Scope<'s> {
    /// Every entry must be satisfied (intersection)
    types: Vec<&'s TypeSpec>,
    properties: BTreeMap<&'s str, &'s SchemaNode>,
    required: Vec<&'s str>,
    additional: Option<&'s AdditionalProperties>,
    items: Option<&'s SchemaNode>,
    min_items: Option<u64>,
    max_items: Option<u64>,
    min_length: Option<u64>,
    max_length: Option<u64>,
    patterns: Vec<&'s str>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    /// Every entry must be satisfied (intersection)
    enums: Vec<&'s [Value]>,
    one_ofs: Vec<&'s [SchemaNode]>,
    any_ofs: Vec<&'s [SchemaNode]>,
}

impl<'s> Scope<'s> {
    fn absorb(&mut self, node: &'s SchemaNode) {
        if let Some(spec) = &node.type_spec {
            self.types.push(spec);
        }
        for (name, prop) in &node.properties {
            self.properties.insert(name.as_str(), prop);
        }
        for name in &node.required {
            if !self.required.contains(&name.as_str()) {
                self.required.push(name);
            }
        }
        self.additional = match (self.additional, node.additional_properties.as_ref()) {
            (Some(AdditionalProperties::Allowed(false)), _) => self.additional,
            (current, None) => current,
            (Some(current), Some(AdditionalProperties::Allowed(true))) => Some(current),
            (_, next) => next,
        };
        if let Some(items) = &node.items {
            self.items = Some(items.as_ref());
        }

        self.min_items = tightest(self.min_items, node.min_items, |a, b| a.max(b));
        self.max_items = tightest(self.max_items, node.max_items, |a, b| a.min(b));
        self.min_length = tightest(self.min_length, node.min_length, |a, b| a.max(b));
        self.max_length = tightest(self.max_length, node.max_length, |a, b| a.min(b));
        self.minimum = tightest(self.minimum, node.minimum, f64::max);
        self.maximum = tightest(self.maximum, node.maximum, f64::min);

        if let Some(pattern) = &node.pattern {
            self.patterns.push(pattern);
        }
        if let Some(values) = &node.enum_values {
            self.enums.push(values);
        }
        if let Some(group) = &node.one_of {
            self.one_ofs.push(group);
        }
        if let Some(group) = &node.any_of {
            self.any_ofs.push(group);
        }
    }
}

fn tightest<T: Copy>(current: Option<T>, next: Option<T>, pick: impl Fn(T, T) -> T) -> Option<T> {
    match (current, next) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Construction-time keyword checks for a single node
fn check_keywords(node: &SchemaNode, location: &str, patterns: &mut HashMap<String, Regex>) -> Result<()> {
    for (keyword, group) in node.compositions() {
        if group.is_empty() {
            return Err(SchemaError::EmptyComposition {
                keyword,
                location: location.to_string(),
            });
        }
    }

    if let Some(TypeSpec::Union(alternatives)) = &node.type_spec {
        if alternatives.is_empty() {
            return Err(SchemaError::InvalidKeyword {
                keyword: "type",
                location: location.to_string(),
                reason: "must name at least one type".to_string(),
            });
        }
    }

    if let Some(values) = &node.enum_values {
        if values.is_empty() {
            return Err(SchemaError::InvalidKeyword {
                keyword: "enum",
                location: location.to_string(),
                reason: "must list at least one value".to_string(),
            });
        }
        if let Some(bad) = values.iter().find(|v| v.is_object() || v.is_array()) {
            return Err(SchemaError::InvalidKeyword {
                keyword: "enum",
                location: location.to_string(),
                reason: format!("only scalar members are supported, found {}", bad),
            });
        }
    }

    if let Some(pattern) = &node.pattern {
        if !patterns.contains_key(pattern) {
            let regex = Regex::new(pattern).map_err(|e| SchemaError::InvalidKeyword {
                keyword: "pattern",
                location: location.to_string(),
                reason: e.to_string(),
            })?;
            patterns.insert(pattern.clone(), regex);
        }
    }
    Ok(())
}

/// Value identity for scalars; numbers compare numerically (`1 == 1.0`)
fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Object(_), _) | (Value::Array(_), _) => false,
        _ => a == b,
    }
}

/// `"nike"` for a `$ref` alternative, `#2` otherwise
fn alternative_label(alt: &SchemaNode, index: usize) -> String {
    match alt.reference.as_deref().and_then(RefTarget::parse) {
        Some(RefTarget::Definition(name)) => format!("{:?}", name),
        Some(RefTarget::Root) => "root".to_string(),
        None => format!("#{}", index),
    }
}

fn summarize(causes: &[Violation]) -> String {
    const SHOWN: usize = 3;
    let mut parts: Vec<String> = causes.iter().take(SHOWN).map(|v| v.message.clone()).collect();
    if causes.len() > SHOWN {
        parts.push(format!("and {} more", causes.len() - SHOWN));
    }
    parts.join("; ")
}
