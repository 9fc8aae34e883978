//! Graph construction over the class pool.
//!
//! Three independent graphs, each built only when some registered
//! analyzer declares a need for it.

pub mod call;
pub mod cycles;
pub mod dependency;
pub mod relationship;

pub use call::{CallEdge, CallGraph, MethodNode};
pub use cycles::{find_cycles, Cycle};
pub use dependency::{BeanNode, DependencyEdge, DependencyGraph, InjectionKind};
pub use relationship::{
    AssociationEdge, Cardinality, EntityNode, Fetch, RelationshipGraph,
};

use crate::cancel::CancelToken;
use crate::model::ClassPool;

/// Which graphs an analyzer needs. The union over the registry decides
/// what gets built; the rest stay empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub dependency: bool,
    pub relationship: bool,
    pub call: bool,
}

impl Capabilities {
    pub fn union(self, other: Capabilities) -> Capabilities {
        Capabilities {
            dependency: self.dependency || other.dependency,
            relationship: self.relationship || other.relationship,
            call: self.call || other.call,
        }
    }
}

#[derive(Debug, Default)]
pub struct Graphs {
    pub dependency: DependencyGraph,
    pub relationship: RelationshipGraph,
    pub call: CallGraph,
}

impl Graphs {
    pub fn build(pool: &ClassPool, cancel: &CancelToken) -> Self {
        Self::build_with(
            pool,
            Capabilities {
                dependency: true,
                relationship: true,
                call: true,
            },
            cancel,
        )
    }

    pub fn build_with(pool: &ClassPool, wanted: Capabilities, cancel: &CancelToken) -> Self {
        Graphs {
            dependency: if wanted.dependency {
                DependencyGraph::build(pool, cancel)
            } else {
                DependencyGraph::default()
            },
            relationship: if wanted.relationship {
                RelationshipGraph::build(pool, cancel)
            } else {
                RelationshipGraph::default()
            },
            call: if wanted.call {
                CallGraph::build(pool, cancel)
            } else {
                CallGraph::default()
            },
        }
    }
}
