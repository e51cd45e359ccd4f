use greencore::{Branch, Condition, EdgeSpec, GraphError, RunState};
use std::collections::HashMap;

/// How the engine leaves a node
#[derive(Debug, Clone)]
pub enum Route {
    Static(String),
    Conditional(Vec<Branch>),
}

impl Route {
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            Route::Static(to) => vec![to.as_str()],
            Route::Conditional(branches) => branches.iter().map(|b| b.to.as_str()).collect(),
        }
    }
}

/// Edge table consulted after every node.
///
/// Selection is a pure function of the state: the first declared branch
/// whose condition holds wins, so identical states always route the same way.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: HashMap<String, Route>,
}

impl Router {
    pub fn from_edges(edges: &[EdgeSpec]) -> Result<Self, GraphError> {
        let mut routes = HashMap::new();
        for edge in edges {
            let route = match edge {
                EdgeSpec::Static { to, .. } => Route::Static(to.clone()),
                EdgeSpec::Conditional { from, branches } => {
                    if branches.is_empty() {
                        return Err(GraphError::InvalidEdge(format!(
                            "conditional edge from '{from}' has no branches"
                        )));
                    }
                    Route::Conditional(branches.clone())
                }
            };
            let from = edge.from_node().to_string();
            if routes.insert(from.clone(), route).is_some() {
                return Err(GraphError::InvalidEdge(format!(
                    "node '{from}' declares more than one outgoing edge"
                )));
            }
        }
        Ok(Self { routes })
    }

    pub fn route(&self, from: &str) -> Option<&Route> {
        self.routes.get(from)
    }

    /// Candidate targets of `from`, in declaration order
    pub fn candidates(&self, from: &str) -> Vec<&str> {
        self.routes.get(from).map(Route::candidates).unwrap_or_default()
    }

    /// Pick the next node, or `None` when no edge applies
    pub fn next(&self, from: &str, state: &RunState) -> Option<&str> {
        match self.routes.get(from)? {
            Route::Static(to) => Some(to.as_str()),
            Route::Conditional(branches) => branches
                .iter()
                .find(|branch| holds(&branch.when, state))
                .map(|branch| branch.to.as_str()),
        }
    }
}

/// Evaluate a routing condition against the state
pub fn holds(condition: &Condition, state: &RunState) -> bool {
    match condition {
        Condition::Always => true,
        Condition::NeedsContains { need } => state.has_need(*need),
        Condition::HitlRequired => state.hitl_required,
        Condition::DecisionPresent => state.decision.is_some(),
        Condition::Decided { decision } => state.last_decision == Some(*decision),
        Condition::Not { condition } => !holds(condition, state),
    }
}
