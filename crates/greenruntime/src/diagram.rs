//! Static topology export for documentation. The engine never reads these.

use crate::compiler::CompiledGraph;
use greencore::EdgeSpec;
use petgraph::dot::{Config, Dot};
use std::fmt::Write;

/// Mermaid flowchart of the compiled graph, including the suspension exit
/// at the interrupt node.
pub fn to_mermaid(graph: &CompiledGraph) -> String {
    let mut out = String::from("flowchart TD\n");
    let _ = writeln!(out, "  START([START]) --> {}", graph.start());

    for edge in &graph.definition().edges {
        let from = edge.from_node();
        match edge {
            EdgeSpec::Static { to, .. } => {
                let _ = writeln!(out, "  {from} --> {to}");
            }
            EdgeSpec::Conditional { branches, .. } => {
                for branch in branches {
                    let _ = writeln!(out, "  {from} -->|{}| {}", branch.display_label(), branch.to);
                }
            }
        }
    }

    let _ = writeln!(out, "  {} -.->|no decision| SUSPENDED([SUSPENDED])", graph.interrupt());
    let _ = writeln!(out, "  {} --> END([END])", graph.terminal());
    let _ = writeln!(out, "  classDef gate stroke-dasharray: 5 5");
    let _ = writeln!(out, "  class {} gate", graph.interrupt());
    out
}

/// Graphviz DOT rendering with branch labels on the edges
pub fn to_dot(graph: &CompiledGraph) -> String {
    let topology = graph.topology();
    format!(
        "{}",
        Dot::with_attr_getters(
            topology,
            &[Config::EdgeNoLabel],
            &|_, edge| {
                let label = edge.weight();
                if label.is_empty() {
                    String::new()
                } else {
                    format!("label = \"{}\"", label.replace('"', "\\\""))
                }
            },
            &|_, (_, name)| {
                if name == graph.interrupt() {
                    "shape = diamond".to_string()
                } else if name == graph.terminal() {
                    "shape = doublecircle".to_string()
                } else {
                    String::new()
                }
            },
        )
    )
}
