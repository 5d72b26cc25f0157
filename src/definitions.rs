//! Definitions table and `$ref` handling
//!
//! References are symbolic: a `$ref` holds a string key that is looked up in
//! the [`DefinitionsTable`] at validation time, never a pointer into the
//! tree. That keeps ownership a plain tree while still allowing definitions
//! to refer to each other (and to themselves).
//!
//! Reference forms understood:
//!
//! ```text
//! #                       the document root
//! #/definitions/<name>    a draft-04 definition
//! #/$defs/<name>          a 2019-09+ definition
//! ```
//!
//! `<name>` is matched exactly after JSON-pointer unescaping (`~1` → `/`,
//! `~0` → `~`), so `#/definitions/outdoor research` works as written.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SchemaError};
use crate::schema::{escape_pointer, SchemaNode};

/// Label of the document root in reference cycles
pub const ROOT_KEY: &str = "#";

/// Parsed form of a `$ref` string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    Root,
    Definition(String),
}

impl RefTarget {
    /// Parse a `$ref` string; `None` when the form is not supported
    pub fn parse(reference: &str) -> Option<Self> {
        if reference == "#" || reference == "#/" {
            return Some(RefTarget::Root);
        }
        let name = reference
            .strip_prefix("#/definitions/")
            .or_else(|| reference.strip_prefix("#/$defs/"))?;
        // Nested pointers (#/definitions/a/properties/b) are not supported
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(RefTarget::Definition(unescape_pointer(name)))
    }
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

// =============================================================================
// Definitions Table
// =============================================================================

/// Named sub-schemas of one schema document.
///
/// Built once when a [`crate::Validator`] is constructed and read-only from
/// then on.
#[derive(Debug, Clone, Default)]
pub struct DefinitionsTable {
    entries: BTreeMap<String, SchemaNode>,
}

impl DefinitionsTable {
    /// Move `definitions` and `$defs` out of the document root into a table
    pub fn extract(root: &mut SchemaNode) -> Result<Self> {
        let mut entries = std::mem::take(&mut root.definitions);
        for (name, node) in std::mem::take(&mut root.defs) {
            if entries.contains_key(&name) {
                return Err(SchemaError::InvalidKeyword {
                    keyword: "$defs",
                    location: format!("#/$defs/{}", escape_pointer(&name)),
                    reason: format!("{:?} is also declared under definitions", name),
                });
            }
            entries.insert(name, node);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Definition names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check that every `$ref` in the document has a supported form and
    /// names an existing definition.
    pub fn check_references(&self, root: &SchemaNode) -> Result<()> {
        let mut check = |node: &SchemaNode, location: &str| -> Result<()> {
            let Some(reference) = &node.reference else {
                return Ok(());
            };
            match RefTarget::parse(reference) {
                None => Err(SchemaError::UnsupportedRef {
                    reference: reference.clone(),
                    location: location.to_string(),
                }),
                Some(RefTarget::Definition(name)) if !self.contains(&name) => {
                    Err(SchemaError::UnresolvedRef {
                        reference: reference.clone(),
                        location: location.to_string(),
                    })
                }
                Some(_) => Ok(()),
            }
        };

        root.walk("#", &mut check)?;
        for (name, node) in self.iter() {
            node.walk(&format!("#/definitions/{}", escape_pointer(name)), &mut check)?;
        }
        Ok(())
    }

    /// Reject reference cycles that never descend into the data.
    ///
    /// Builds a graph whose nodes are the root plus every definition, with an
    /// edge for each reference evaluated against the same data value
    /// (`$ref`, `allOf`/`oneOf`/`anyOf` members, schema-valued `type`).
    /// Any strongly connected component with more than one member, or a
    /// self-loop, would recurse forever. Recursion through `properties` or
    /// `items` is fine: it is bounded by the data.
    ///
    /// Call after [`Self::check_references`]; unparseable references are skipped.
    pub fn check_cycles(&self, root: &SchemaNode) -> Result<()> {
        let mut graph: DiGraph<String, ()> = DiGraph::with_capacity(self.len() + 1, self.len() * 2);

        // The root gets its own node so a definition named "#" cannot alias it
        let root_index = graph.add_node(ROOT_KEY.to_string());
        let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.len());
        let mut sources = vec![(root_index, root)];
        for (name, node) in self.iter() {
            let index = graph.add_node(name.to_string());
            indices.insert(name, index);
            sources.push((index, node));
        }

        for (from, node) in sources {
            let mut refs = Vec::new();
            node.same_position_refs(&mut refs);
            for reference in refs {
                let to = match RefTarget::parse(reference) {
                    Some(RefTarget::Root) => Some(root_index),
                    Some(RefTarget::Definition(name)) => indices.get(name.as_str()).copied(),
                    None => None,
                };
                if let Some(to) = to {
                    graph.update_edge(from, to, ());
                }
            }
        }

        for scc in kosaraju_scc(&graph) {
            let is_cycle = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if is_cycle {
                let mut cycle: Vec<String> = scc
                    .iter()
                    .filter_map(|idx| graph.node_weight(*idx).cloned())
                    .collect();
                cycle.sort();
                return Err(SchemaError::CyclicRef { cycle });
            }
        }
        Ok(())
    }
}
