//! The dependency-injection graph.
//!
//! One node per bean class (plus external targets), one edge per
//! injection point. Edges are deliberately not deduplicated: two fields
//! injecting the same bean are two findings, not one.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::model::{AnnotationModel, ClassModel, ClassPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionKind {
    Constructor,
    Field,
    Method,
    Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeanNode {
    pub class: String,
    /// True when the target class is not in the pool.
    pub external: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stereotype: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub kind: InjectionKind,
    /// `@Qualifier` bean name, or the SpEL expression for `@Value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    pub lazy: bool,
    /// Injection point: field or parameter name where known, else the
    /// constructor/setter name.
    pub site: String,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    pub graph: DiGraph<BeanNode, DependencyEdge>,
    indices: HashMap<String, NodeIndex>,
}

const INJECT_ANNOTATIONS: &[&str] = &["Autowired", "Inject", "Resource"];

impl DependencyGraph {
    pub fn build(pool: &ClassPool, cancel: &CancelToken) -> Self {
        let mut g = Self::default();
        for class in pool.application_classes() {
            if cancel.is_cancelled() {
                break;
            }
            if class.stereotype().is_none() {
                continue;
            }
            g.add_bean(class, pool);
        }
        g
    }

    fn add_bean(&mut self, class: &ClassModel, pool: &ClassPool) {
        let source = self.ensure_node(&class.name, pool);
        let class_lazy = class.has_annotation("Lazy");

        // Constructor parameters. Multi-constructor beans contribute edges
        // from every constructor; Spring picks one at runtime but all are
        // declared dependencies.
        for ctor in class.methods.iter().filter(|m| m.is_constructor()) {
            for (i, param) in ctor.parameter_types.iter().enumerate() {
                if !injectable_type(param) {
                    continue;
                }
                let anns = ctor.parameter_annotations(i);
                self.add_edge(
                    source,
                    param,
                    pool,
                    DependencyEdge {
                        kind: InjectionKind::Constructor,
                        qualifier: qualifier_of(anns),
                        lazy: class_lazy || has(anns, "Lazy"),
                        site: format!("<init>#{}", i),
                    },
                );
            }
        }

        for field in &class.fields {
            if let Some(value) = field.annotation("Value") {
                self.add_edge(
                    source,
                    &field.type_name,
                    pool,
                    DependencyEdge {
                        kind: InjectionKind::Value,
                        qualifier: value.string_member("value").map(String::from),
                        lazy: false,
                        site: field.name.clone(),
                    },
                );
                continue;
            }
            if INJECT_ANNOTATIONS.iter().any(|a| field.has_annotation(a)) {
                self.add_edge(
                    source,
                    &field.type_name,
                    pool,
                    DependencyEdge {
                        kind: InjectionKind::Field,
                        qualifier: qualifier_of(&field.annotations),
                        lazy: class_lazy || field.has_annotation("Lazy"),
                        site: field.name.clone(),
                    },
                );
            }
        }

        // Annotated setters.
        for method in class.methods.iter().filter(|m| m.is_setter()) {
            if !INJECT_ANNOTATIONS.iter().any(|a| method.has_annotation(a)) {
                continue;
            }
            let param = &method.parameter_types[0];
            if !injectable_type(param) {
                continue;
            }
            let param_anns = method.parameter_annotations(0);
            self.add_edge(
                source,
                param,
                pool,
                DependencyEdge {
                    kind: InjectionKind::Method,
                    qualifier: qualifier_of(&method.annotations)
                        .or_else(|| qualifier_of(param_anns)),
                    lazy: class_lazy
                        || method.has_annotation("Lazy")
                        || has(param_anns, "Lazy"),
                    site: method.name.clone(),
                },
            );
        }
    }

    fn add_edge(&mut self, source: NodeIndex, target: &str, pool: &ClassPool, edge: DependencyEdge) {
        let mut edge = edge;
        // @Lazy on the target bean class makes every edge into it lazy.
        if let Some(target_class) = pool.get(target) {
            edge.lazy = edge.lazy || target_class.has_annotation("Lazy");
        }
        let target = self.ensure_node(target, pool);
        self.graph.add_edge(source, target, edge);
    }

    fn ensure_node(&mut self, class: &str, pool: &ClassPool) -> NodeIndex {
        if let Some(&idx) = self.indices.get(class) {
            return idx;
        }
        let node = match pool.get(class) {
            Some(model) => BeanNode {
                class: class.to_string(),
                external: false,
                stereotype: model.stereotype().map(String::from),
            },
            None => BeanNode {
                class: class.to_string(),
                external: true,
                stereotype: None,
            },
        };
        let idx = self.graph.add_node(node);
        self.indices.insert(class.to_string(), idx);
        idx
    }

    pub fn node(&self, class: &str) -> Option<NodeIndex> {
        self.indices.get(class).copied()
    }

    pub fn fan_out(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    pub fn fan_in(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Class names in sorted order, for deterministic analyzer iteration.
    pub fn sorted_classes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.indices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// JDK types and primitives are configuration plumbing, not beans.
fn injectable_type(type_name: &str) -> bool {
    const PRIMITIVES: &[&str] = &[
        "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
    ];
    !type_name.starts_with("java.")
        && !type_name.starts_with("javax.")
        && !type_name.ends_with("[]")
        && !PRIMITIVES.contains(&type_name)
}

fn has(annotations: &[AnnotationModel], query: &str) -> bool {
    annotations
        .iter()
        .any(|a| crate::model::annotation_matches(&a.type_name, query))
}

fn qualifier_of(annotations: &[AnnotationModel]) -> Option<String> {
    annotations
        .iter()
        .find(|a| crate::model::annotation_matches(&a.type_name, "Qualifier"))
        .and_then(|a| a.string_member("value"))
        .map(String::from)
}
