//! Schema dependency ordering.
//!
//! Edges come from `{"$co": "<name>"}` references in shapes. Cycles are
//! tolerated: a schema already on the DFS stack counts as resolved, so every
//! member of a cycle is still emitted exactly once. References are rewritten
//! to IDs only after every schema in the bundle exists, which is what makes
//! cyclic graphs seedable at all.

use std::collections::{BTreeMap, BTreeSet};

use cairn_schema::SchemaDefinition;
use cairn_types::SchemaName;

/// Dependency graph over the schemas of one bundle.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    /// Bundle order, for deterministic output.
    order: Vec<SchemaName>,
    edges: BTreeMap<SchemaName, BTreeSet<SchemaName>>,
}

impl DependencyGraph {
    pub fn build(definitions: &[SchemaDefinition]) -> Self {
        let mut graph = Self::default();
        for definition in definitions {
            graph.order.push(definition.name.clone());
            graph
                .edges
                .insert(definition.name.clone(), definition.references());
        }
        graph
    }

    /// Dependencies of `name` that are defined in this graph.
    pub fn dependencies(&self, name: &SchemaName) -> impl Iterator<Item = &SchemaName> {
        self.edges
            .get(name)
            .into_iter()
            .flatten()
            .filter(|dep| self.edges.contains_key(*dep))
    }

    /// Names referenced but not defined in this graph.
    pub fn external_references(&self) -> BTreeSet<SchemaName> {
        self.edges
            .values()
            .flatten()
            .filter(|dep| !self.edges.contains_key(*dep))
            .cloned()
            .collect()
    }

    /// Dependencies before dependents. Within that constraint, bundle order.
    pub fn topological_order(&self) -> Vec<SchemaName> {
        let mut visited: BTreeSet<&SchemaName> = BTreeSet::new();
        let mut out = Vec::with_capacity(self.order.len());
        // Explicit DFS stack; reference chains can be arbitrarily long.
        let mut stack: Vec<(&SchemaName, std::vec::IntoIter<&SchemaName>)> = Vec::new();
        for root in &self.order {
            if !visited.insert(root) {
                continue;
            }
            stack.push((root, self.pending(root)));
            while let Some((name, deps)) = stack.last_mut() {
                match deps.next() {
                    // Marked on entry, so a back edge into the current path stops here.
                    Some(dep) => {
                        if visited.insert(dep) {
                            stack.push((dep, self.pending(dep)));
                        }
                    }
                    None => {
                        out.push((*name).clone());
                        stack.pop();
                    }
                }
            }
        }
        out
    }

    fn pending(&self, name: &SchemaName) -> std::vec::IntoIter<&SchemaName> {
        self.dependencies(name).collect::<Vec<_>>().into_iter()
    }
}
