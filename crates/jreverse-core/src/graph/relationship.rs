//! The JPA entity-relationship graph.
//!
//! Nodes are `@Entity` classes; edges are association fields with their
//! cardinality, fetch strategy, cascade set and ownership facts.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use jreverse_classfile::descriptor;

use crate::cancel::CancelToken;
use crate::model::{AnnotationValue, ClassModel, ClassPool, FieldModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    fn from_annotation(simple: &str) -> Option<Self> {
        match simple {
            "OneToOne" => Some(Cardinality::OneToOne),
            "OneToMany" => Some(Cardinality::OneToMany),
            "ManyToOne" => Some(Cardinality::ManyToOne),
            "ManyToMany" => Some(Cardinality::ManyToMany),
            _ => None,
        }
    }

    /// JPA default fetch strategy when the annotation has no `fetch` member.
    pub fn default_fetch(self) -> Fetch {
        match self {
            Cardinality::OneToOne | Cardinality::ManyToOne => Fetch::Eager,
            Cardinality::OneToMany | Cardinality::ManyToMany => Fetch::Lazy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fetch {
    Eager,
    Lazy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    pub class: String,
    pub external: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationEdge {
    pub field: String,
    pub cardinality: Cardinality,
    pub fetch: Fetch,
    pub cascades: Vec<String>,
    /// `mappedBy` member; present on the inverse (non-owning) side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
    pub bidirectional: bool,
}

impl AssociationEdge {
    pub fn owning(&self) -> bool {
        self.mapped_by.is_none()
    }
}

#[derive(Debug, Default)]
pub struct RelationshipGraph {
    pub graph: DiGraph<EntityNode, AssociationEdge>,
    indices: HashMap<String, NodeIndex>,
}

impl RelationshipGraph {
    pub fn build(pool: &ClassPool, cancel: &CancelToken) -> Self {
        let mut g = Self::default();
        for entity in pool.application_classes().filter(|c| c.has_annotation("Entity")) {
            if cancel.is_cancelled() {
                break;
            }
            g.add_entity(entity, pool);
        }
        g.mark_bidirectional();
        g
    }

    fn add_entity(&mut self, entity: &ClassModel, pool: &ClassPool) {
        let source = self.ensure_node(&entity.name, pool);
        for field in &entity.fields {
            let Some((cardinality, ann)) = association_of(field) else {
                continue;
            };
            let Some(target) = association_target(field, ann.member("targetEntity")) else {
                continue;
            };

            let fetch = ann
                .member("fetch")
                .and_then(AnnotationValue::as_enum_value)
                .map(|v| if v == "EAGER" { Fetch::Eager } else { Fetch::Lazy })
                .unwrap_or_else(|| cardinality.default_fetch());

            let cascades = ann
                .member("cascade")
                .map(|v| {
                    v.iter_flat()
                        .filter_map(|c| c.as_enum_value())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            let edge = AssociationEdge {
                field: field.name.clone(),
                cardinality,
                fetch,
                cascades,
                mapped_by: ann.string_member("mappedBy").map(String::from),
                bidirectional: false,
            };
            let target = self.ensure_node(&target, pool);
            self.graph.add_edge(source, target, edge);
        }
    }

    /// An edge is bidirectional when an inverse edge's `mappedBy` names
    /// the owning field (or the owning edge observes such an inverse).
    fn mark_bidirectional(&mut self) {
        let mut paired: Vec<petgraph::graph::EdgeIndex> = Vec::new();
        for edge in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            let field = self.graph[edge].field.clone();
            let mapped_by = self.graph[edge].mapped_by.clone();
            let has_inverse = self
                .graph
                .edges_connecting(b, a)
                .any(|inv| match (&mapped_by, &inv.weight().mapped_by) {
                    // this side inverse, other side owning
                    (Some(m), None) => *m == inv.weight().field,
                    // this side owning, other side inverse
                    (None, Some(m)) => *m == field,
                    _ => false,
                });
            if has_inverse {
                paired.push(edge);
            }
        }
        for edge in paired {
            self.graph[edge].bidirectional = true;
        }
    }

    fn ensure_node(&mut self, class: &str, pool: &ClassPool) -> NodeIndex {
        if let Some(&idx) = self.indices.get(class) {
            return idx;
        }
        let idx = self.graph.add_node(EntityNode {
            class: class.to_string(),
            external: pool.get(class).is_none(),
        });
        self.indices.insert(class.to_string(), idx);
        idx
    }

    pub fn node(&self, class: &str) -> Option<NodeIndex> {
        self.indices.get(class).copied()
    }

    pub fn sorted_classes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.indices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn association_of(field: &FieldModel) -> Option<(Cardinality, &crate::model::AnnotationModel)> {
    field.annotations.iter().find_map(|ann| {
        let simple = ann.type_name.rsplit('.').next()?;
        Cardinality::from_annotation(simple).map(|c| (c, ann))
    })
}

/// Association target: explicit `targetEntity`, else the collection's
/// generic element type, else the field type itself.
fn association_target(field: &FieldModel, target_entity: Option<&AnnotationValue>) -> Option<String> {
    if let Some(AnnotationValue::ClassRef(name)) = target_entity {
        return Some(name.clone());
    }
    if let Some(sig) = &field.signature {
        if let Some(element) = descriptor::generic_element_type(sig) {
            return Some(element);
        }
    }
    if field.type_name.starts_with("java.util.") {
        // raw collection with no signature, target unknown
        return None;
    }
    Some(field.type_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::*;

    fn entity(name: &str) -> crate::model::ClassModel {
        class(name, vec![annotation("jakarta.persistence.Entity")])
    }

    fn pool_of(classes: Vec<crate::model::ClassModel>) -> ClassPool {
        let mut pool = ClassPool::new(jreverse_classfile::ArchiveLayout::PlainJar);
        for c in classes {
            pool.insert(c);
        }
        pool
    }

    fn assoc_field(
        name: &str,
        type_name: &str,
        ann: crate::model::AnnotationModel,
        signature: Option<&str>,
    ) -> FieldModel {
        let mut f = field(name, type_name, vec![ann]);
        f.signature = signature.map(String::from);
        f
    }

    #[test]
    fn test_many_to_one_defaults_eager() {
        let mut order = entity("com.acme.Order");
        order.fields.push(assoc_field(
            "customer",
            "com.acme.Customer",
            annotation("jakarta.persistence.ManyToOne"),
            None,
        ));
        let g = RelationshipGraph::build(
            &pool_of(vec![order, entity("com.acme.Customer")]),
            &CancelToken::new(),
        );
        let edge = g.graph.edge_weights().next().unwrap();
        assert_eq!(edge.cardinality, Cardinality::ManyToOne);
        assert_eq!(edge.fetch, Fetch::Eager);
        assert!(edge.owning());
    }

    #[test]
    fn test_one_to_many_target_from_generic_signature() {
        let mut customer = entity("com.acme.Customer");
        customer.fields.push(assoc_field(
            "orders",
            "java.util.List",
            annotation_with(
                "jakarta.persistence.OneToMany",
                vec![("mappedBy", AnnotationValue::Str("customer".into()))],
            ),
            Some("Ljava/util/List<Lcom/acme/Order;>;"),
        ));
        let g = RelationshipGraph::build(
            &pool_of(vec![customer, entity("com.acme.Order")]),
            &CancelToken::new(),
        );
        let edge = g.graph.edge_weights().next().unwrap();
        assert_eq!(edge.fetch, Fetch::Lazy);
        assert_eq!(edge.mapped_by.as_deref(), Some("customer"));
        assert!(g.node("com.acme.Order").is_some());
    }

    #[test]
    fn test_explicit_fetch_overrides_default() {
        let mut customer = entity("com.acme.Customer");
        customer.fields.push(assoc_field(
            "orders",
            "java.util.Set",
            annotation_with(
                "jakarta.persistence.OneToMany",
                vec![(
                    "fetch",
                    AnnotationValue::EnumRef {
                        type_name: "jakarta.persistence.FetchType".into(),
                        value: "EAGER".into(),
                    },
                )],
            ),
            Some("Ljava/util/Set<Lcom/acme/Order;>;"),
        ));
        let g = RelationshipGraph::build(&pool_of(vec![customer]), &CancelToken::new());
        assert_eq!(g.graph.edge_weights().next().unwrap().fetch, Fetch::Eager);
    }

    #[test]
    fn test_bidirectional_pairing() {
        let mut order = entity("com.acme.Order");
        order.fields.push(assoc_field(
            "customer",
            "com.acme.Customer",
            annotation("jakarta.persistence.ManyToOne"),
            None,
        ));
        let mut customer = entity("com.acme.Customer");
        customer.fields.push(assoc_field(
            "orders",
            "java.util.List",
            annotation_with(
                "jakarta.persistence.OneToMany",
                vec![("mappedBy", AnnotationValue::Str("customer".into()))],
            ),
            Some("Ljava/util/List<Lcom/acme/Order;>;"),
        ));
        let g = RelationshipGraph::build(&pool_of(vec![order, customer]), &CancelToken::new());
        assert_eq!(g.graph.edge_count(), 2);
        assert!(g.graph.edge_weights().all(|e| e.bidirectional));
    }

    #[test]
    fn test_mapped_by_mismatch_not_bidirectional() {
        let mut order = entity("com.acme.Order");
        order.fields.push(assoc_field(
            "customer",
            "com.acme.Customer",
            annotation("jakarta.persistence.ManyToOne"),
            None,
        ));
        let mut customer = entity("com.acme.Customer");
        customer.fields.push(assoc_field(
            "orders",
            "java.util.List",
            annotation_with(
                "jakarta.persistence.OneToMany",
                vec![("mappedBy", AnnotationValue::Str("buyer".into()))],
            ),
            Some("Ljava/util/List<Lcom/acme/Order;>;"),
        ));
        let g = RelationshipGraph::build(&pool_of(vec![order, customer]), &CancelToken::new());
        assert!(g.graph.edge_weights().all(|e| !e.bidirectional));
    }

    #[test]
    fn test_cascade_set_collected() {
        let mut order = entity("com.acme.Order");
        order.fields.push(assoc_field(
            "tags",
            "java.util.Set",
            annotation_with(
                "jakarta.persistence.ManyToMany",
                vec![(
                    "cascade",
                    AnnotationValue::Array(vec![
                        AnnotationValue::EnumRef {
                            type_name: "jakarta.persistence.CascadeType".into(),
                            value: "PERSIST".into(),
                        },
                        AnnotationValue::EnumRef {
                            type_name: "jakarta.persistence.CascadeType".into(),
                            value: "REMOVE".into(),
                        },
                    ]),
                )],
            ),
            Some("Ljava/util/Set<Lcom/acme/Tag;>;"),
        ));
        let g = RelationshipGraph::build(&pool_of(vec![order]), &CancelToken::new());
        let edge = g.graph.edge_weights().next().unwrap();
        assert_eq!(edge.cascades, vec!["PERSIST", "REMOVE"]);
    }

    #[test]
    fn test_raw_collection_without_signature_skipped() {
        let mut customer = entity("com.acme.Customer");
        customer.fields.push(assoc_field(
            "orders",
            "java.util.List",
            annotation("jakarta.persistence.OneToMany"),
            None,
        ));
        let g = RelationshipGraph::build(&pool_of(vec![customer]), &CancelToken::new());
        assert_eq!(g.graph.edge_count(), 0);
    }
}
