//! The method-level call graph.
//!
//! One node per method, keyed `Class#name(descriptor)`. One edge per call
//! site, so a method calling the same target three times has three edges.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::model::ClassPool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodNode {
    pub class: String,
    pub method: String,
    pub descriptor: String,
    pub external: bool,
}

impl MethodNode {
    pub fn key(class: &str, method: &str, descriptor: &str) -> String {
        format!("{}#{}({})", class, method, descriptor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdge {
    pub offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub inside_loop: bool,
}

#[derive(Debug, Default)]
pub struct CallGraph {
    pub graph: DiGraph<MethodNode, CallEdge>,
    indices: HashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn build(pool: &ClassPool, cancel: &CancelToken) -> Self {
        let mut g = Self::default();
        for class in pool.application_classes() {
            if cancel.is_cancelled() {
                break;
            }
            for method in &class.methods {
                let source = g.ensure_node(&class.name, &method.name, &method.descriptor, false);
                for call in &method.call_sites {
                    // invokedynamic sites have no static owner
                    if call.target_class.is_empty() {
                        continue;
                    }
                    let external = !pool.contains(&call.target_class);
                    let target = g.ensure_node(
                        &call.target_class,
                        &call.target_method,
                        &call.target_descriptor,
                        external,
                    );
                    g.graph.add_edge(
                        source,
                        target,
                        CallEdge {
                            offset: call.offset,
                            line: call.line,
                            inside_loop: call.inside_loop,
                        },
                    );
                }
            }
        }
        g
    }

    fn ensure_node(
        &mut self,
        class: &str,
        method: &str,
        descriptor: &str,
        external: bool,
    ) -> NodeIndex {
        let key = MethodNode::key(class, method, descriptor);
        if let Some(&idx) = self.indices.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(MethodNode {
            class: class.to_string(),
            method: method.to_string(),
            descriptor: descriptor.to_string(),
            external,
        });
        self.indices.insert(key, idx);
        idx
    }

    pub fn node(&self, class: &str, method: &str, descriptor: &str) -> Option<NodeIndex> {
        self.indices
            .get(&MethodNode::key(class, method, descriptor))
            .copied()
    }
}
