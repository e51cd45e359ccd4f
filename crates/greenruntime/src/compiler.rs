use crate::registry::NodeRegistry;
use crate::router::Router;
use greencore::{GraphDefinition, GraphError, Node, RunState};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;
use std::sync::Arc;

/// Executable graph: node instances bound by name plus the routing table.
///
/// Immutable after compilation and shared read-only between runs.
pub struct CompiledGraph {
    definition: GraphDefinition,
    nodes: HashMap<String, Arc<dyn Node>>,
    router: Router,
    topology: DiGraph<String, String>,
    start: String,
    terminal: String,
    interrupt: String,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("name", &self.definition.name)
            .field("start", &self.start)
            .field("terminal", &self.terminal)
            .field("interrupt", &self.interrupt)
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

impl CompiledGraph {
    pub fn definition(&self) -> &GraphDefinition {
        &self.definition
    }

    pub fn node(&self, name: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.get(name)
    }

    /// Node names in definition order
    pub fn node_names(&self) -> Vec<&str> {
        self.definition.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn next(&self, from: &str, state: &RunState) -> Option<&str> {
        self.router.next(from, state)
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    pub fn interrupt(&self) -> &str {
        &self.interrupt
    }

    pub(crate) fn topology(&self) -> &DiGraph<String, String> {
        &self.topology
    }
}

/// Bind a definition's node names to instances from the registry and wire
/// its edges.
///
/// Rejects unknown nodes or types, duplicate names, nodes with more than one
/// outgoing edge spec, non-terminal dead ends, edges out of the terminal
/// node and nodes unreachable from the start.
pub fn compile(definition: &GraphDefinition, registry: &NodeRegistry) -> Result<CompiledGraph, GraphError> {
    let start = definition.start.clone().ok_or(GraphError::MissingDesignation("start"))?;
    let terminal = definition.terminal.clone().ok_or(GraphError::MissingDesignation("terminal"))?;
    let interrupt = definition.interrupt.clone().ok_or(GraphError::MissingDesignation("interrupt"))?;

    let mut nodes: HashMap<String, Arc<dyn Node>> = HashMap::new();
    let mut topology = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();

    for spec in &definition.nodes {
        if nodes.contains_key(&spec.name) {
            return Err(GraphError::DuplicateNode(spec.name.clone()));
        }
        let node = registry
            .create_node(&spec.node_type, &spec.config)
            .map_err(|e| match e {
                GraphError::NodeCreation { source, .. } => GraphError::NodeCreation {
                    node: spec.name.clone(),
                    source,
                },
                other => other,
            })?;
        nodes.insert(spec.name.clone(), Arc::from(node));
        index.insert(spec.name.clone(), topology.add_node(spec.name.clone()));
    }

    for (designation, name) in [("start", &start), ("terminal", &terminal), ("interrupt", &interrupt)] {
        if !nodes.contains_key(name) {
            return Err(GraphError::NodeNotFound(format!("{designation} node '{name}'")));
        }
    }

    for edge in &definition.edges {
        let from = edge.from_node();
        let from_idx = *index
            .get(from)
            .ok_or_else(|| GraphError::NodeNotFound(from.to_string()))?;
        if from == terminal {
            return Err(GraphError::InvalidEdge(format!(
                "terminal node '{terminal}' cannot have outgoing edges"
            )));
        }
        let labels: Vec<String> = match edge {
            greencore::EdgeSpec::Static { .. } => vec![String::new()],
            greencore::EdgeSpec::Conditional { branches, .. } => {
                branches.iter().map(|b| b.display_label()).collect()
            }
        };
        for (to, label) in edge.targets().into_iter().zip(labels) {
            let to_idx = *index
                .get(to)
                .ok_or_else(|| GraphError::NodeNotFound(to.to_string()))?;
            topology.add_edge(from_idx, to_idx, label);
        }
    }

    let router = Router::from_edges(&definition.edges)?;

    for name in nodes.keys() {
        if name != &terminal && router.route(name).is_none() {
            return Err(GraphError::InvalidEdge(format!(
                "node '{name}' has no outgoing edge and is not the terminal node"
            )));
        }
    }

    let mut reachable = vec![false; topology.node_count()];
    let mut dfs = Dfs::new(&topology, index[&start]);
    while let Some(idx) = dfs.next(&topology) {
        reachable[idx.index()] = true;
    }
    for spec in &definition.nodes {
        if !reachable[index[&spec.name].index()] {
            return Err(GraphError::Unreachable(spec.name.clone()));
        }
    }

    tracing::debug!(
        graph = %definition.name,
        nodes = nodes.len(),
        edges = topology.edge_count(),
        "compiled graph"
    );

    Ok(CompiledGraph {
        definition: definition.clone(),
        nodes,
        router,
        topology,
        start,
        terminal,
        interrupt,
    })
}
