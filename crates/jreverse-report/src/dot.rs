use std::collections::BTreeMap;

use jreverse_core::graph::{find_cycles, DependencyGraph};

/// Generate a GraphViz DOT diagram of the DI graph, one cluster per
/// package, with cycle edges highlighted.
pub fn generate_di_diagram(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph beans {\n");
    out.push_str("  rankdir=LR;\n");
    out.push_str("  node [shape=box, style=filled, fillcolor=white];\n\n");

    // adjacent pairs of every cycle, for edge highlighting
    let mut cycle_pairs: Vec<(String, String)> = Vec::new();
    for cycle in find_cycles(graph) {
        for (i, from) in cycle.nodes.iter().enumerate() {
            let to = &cycle.nodes[(i + 1) % cycle.nodes.len()];
            cycle_pairs.push((from.clone(), to.clone()));
        }
    }

    let mut packages: BTreeMap<String, Vec<(String, String, bool)>> = BTreeMap::new();
    for idx in graph.graph.node_indices() {
        let node = &graph.graph[idx];
        let (package, simple) = match node.class.rsplit_once('.') {
            Some((p, s)) => (p.to_string(), s.to_string()),
            None => (String::new(), node.class.clone()),
        };
        packages.entry(package).or_default().push((
            sanitize_dot_id(&node.class),
            simple,
            node.external,
        ));
    }

    for (i, (package, nodes)) in packages.iter().enumerate() {
        if package.is_empty() {
            for (id, label, external) in nodes {
                out.push_str(&format!("  {id} [label=\"{label}\"{}];\n", external_attr(*external)));
            }
            continue;
        }
        out.push_str(&format!("  subgraph cluster_{i} {{\n"));
        out.push_str(&format!("    label=\"{package}\";\n"));
        out.push_str("    style=rounded;\n");
        for (id, label, external) in nodes {
            out.push_str(&format!(
                "    {id} [label=\"{label}\"{}];\n",
                external_attr(*external)
            ));
        }
        out.push_str("  }\n\n");
    }

    for edge in graph.graph.edge_indices() {
        let Some((from, to)) = graph.graph.edge_endpoints(edge) else {
            continue;
        };
        let from_class = &graph.graph[from].class;
        let to_class = &graph.graph[to].class;
        let in_cycle = cycle_pairs
            .iter()
            .any(|(a, b)| a == from_class && b == to_class);
        let weight = &graph.graph[edge];
        let mut attrs = vec![format!("label=\"{:?}\"", weight.kind)];
        if weight.lazy {
            attrs.push("style=dashed".to_string());
        }
        if in_cycle {
            attrs.push("color=red".to_string());
            attrs.push("penwidth=2".to_string());
        }
        out.push_str(&format!(
            "  {} -> {} [{}];\n",
            sanitize_dot_id(from_class),
            sanitize_dot_id(to_class),
            attrs.join(", ")
        ));
    }

    out.push_str("}\n");
    out
}

fn external_attr(external: bool) -> &'static str {
    if external {
        ", fillcolor=\"#eeeeee\", style=\"filled,dashed\""
    } else {
        ""
    }
}

fn sanitize_dot_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
