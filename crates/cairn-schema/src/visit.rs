//! Typed traversal over the [`Shape`] AST.
//!
//! Schema dependencies are discovered by walking shapes, never by probing
//! arbitrary JSON. Shapes are trees, so traversal needs no cycle guard;
//! cycles between *schemas* are handled by the seeding graph.

use std::collections::{BTreeMap, BTreeSet};

use cairn_types::{ObjectId, SchemaName};

use crate::shape::{SchemaRef, Shape};

/// Read-only shape visitor. Default methods do nothing.
pub trait ShapeVisitor {
    /// Called for every node before its children.
    fn visit_shape(&mut self, _shape: &Shape, _path: &str) {}

    /// Called for every `$co` reference.
    fn visit_ref(&mut self, _reference: &SchemaRef, _path: &str) {}
}

/// Mutating shape visitor, used to rewrite references in place.
pub trait ShapeVisitorMut {
    fn visit_ref_mut(&mut self, reference: &mut SchemaRef, path: &str);
}

/// Walk `shape` depth-first, calling `visitor` on every node.
pub fn walk<V: ShapeVisitor + ?Sized>(shape: &Shape, visitor: &mut V) {
    walk_at(shape, "", visitor);
}

fn walk_at<V: ShapeVisitor + ?Sized>(shape: &Shape, path: &str, visitor: &mut V) {
    visitor.visit_shape(shape, path);
    match shape {
        Shape::Object { properties, .. } => {
            for (key, child) in properties {
                walk_at(child, &format!("{path}/{key}"), visitor);
            }
        }
        Shape::Array { items } => walk_at(items, &format!("{path}/items"), visitor),
        Shape::AnyOf(options) => {
            for (i, child) in options.iter().enumerate() {
                walk_at(child, &format!("{path}/anyOf/{i}"), visitor);
            }
        }
        Shape::Ref(reference) => visitor.visit_ref(reference, path),
        _ => {}
    }
}

/// Walk `shape` depth-first, letting `visitor` rewrite references.
pub fn walk_mut<V: ShapeVisitorMut + ?Sized>(shape: &mut Shape, visitor: &mut V) {
    walk_mut_at(shape, "", visitor);
}

fn walk_mut_at<V: ShapeVisitorMut + ?Sized>(shape: &mut Shape, path: &str, visitor: &mut V) {
    match shape {
        Shape::Object { properties, .. } => {
            for (key, child) in properties.iter_mut() {
                walk_mut_at(child, &format!("{path}/{key}"), visitor);
            }
        }
        Shape::Array { items } => walk_mut_at(items, &format!("{path}/items"), visitor),
        Shape::AnyOf(options) => {
            for (i, child) in options.iter_mut().enumerate() {
                walk_mut_at(child, &format!("{path}/anyOf/{i}"), visitor);
            }
        }
        Shape::Ref(reference) => visitor.visit_ref_mut(reference, path),
        _ => {}
    }
}

struct RefCollector(BTreeSet<SchemaName>);

impl ShapeVisitor for RefCollector {
    fn visit_ref(&mut self, reference: &SchemaRef, _path: &str) {
        if let SchemaRef::Name(name) = reference {
            self.0.insert(name.clone());
        }
    }
}

/// Every symbolic schema name referenced from `shape`.
pub fn collect_refs(shape: &Shape) -> BTreeSet<SchemaName> {
    let mut collector = RefCollector(BTreeSet::new());
    walk(shape, &mut collector);
    collector.0
}

struct RefResolver<'a> {
    ids: &'a BTreeMap<SchemaName, ObjectId>,
    unresolved: Vec<SchemaName>,
}

impl ShapeVisitorMut for RefResolver<'_> {
    fn visit_ref_mut(&mut self, reference: &mut SchemaRef, _path: &str) {
        let SchemaRef::Name(name) = reference else {
            return;
        };
        match self.ids.get(name) {
            Some(id) => *reference = SchemaRef::Id(*id),
            None => {
                if !self.unresolved.contains(name) {
                    self.unresolved.push(name.clone());
                }
            }
        }
    }
}

/// Rewrite symbolic references in `shape` to object IDs.
///
/// Returns the names that had no entry in `ids`; those references are left
/// symbolic.
pub fn resolve_refs(shape: &mut Shape, ids: &BTreeMap<SchemaName, ObjectId>) -> Vec<SchemaName> {
    let mut resolver = RefResolver {
        ids,
        unresolved: Vec::new(),
    };
    walk_mut(shape, &mut resolver);
    resolver.unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name(s: &str) -> SchemaName {
        SchemaName::parse(s).unwrap()
    }

    fn sample() -> Shape {
        Shape::from_json(&json!({
            "type": "object",
            "properties": {
                "owner": {"$co": "app/schema/person"},
                "tags": {"type": "array", "items": {"$co": "app/schema/tag"}},
                "either": {"anyOf": [{"$co": "app/schema/person"}, {"type": "null"}]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn collects_unique_names() {
        let refs = collect_refs(&sample());
        assert_eq!(
            refs.into_iter().collect::<Vec<_>>(),
            vec![name("app/schema/person"), name("app/schema/tag")]
        );
    }

    #[test]
    fn resolves_known_and_reports_missing() {
        let mut shape = sample();
        let person = ObjectId::from_bytes(b"person");
        let ids = BTreeMap::from([(name("app/schema/person"), person)]);

        let missing = resolve_refs(&mut shape, &ids);
        assert_eq!(missing, vec![name("app/schema/tag")]);
        assert_eq!(
            shape.property("owner"),
            Some(&Shape::Ref(SchemaRef::Id(person)))
        );
        assert_eq!(collect_refs(&shape), BTreeSet::from([name("app/schema/tag")]));
    }

    #[test]
    fn visitor_sees_paths() {
        struct Paths(Vec<String>);
        impl ShapeVisitor for Paths {
            fn visit_ref(&mut self, _reference: &SchemaRef, path: &str) {
                self.0.push(path.to_string());
            }
        }
        let mut paths = Paths(Vec::new());
        walk(&sample(), &mut paths);
        assert_eq!(paths.0, vec!["/either/anyOf/0", "/owner", "/tags/items"]);
    }
}
