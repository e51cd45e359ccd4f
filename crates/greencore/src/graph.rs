use crate::{ConfigMap, Decision, Need, Value};
use serde::{Deserialize, Serialize};

/// Declarative description of a graph, before node types are bound.
///
/// Routing lives in `edges` as data: adding a route means adding an edge
/// entry, never touching the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
    pub start: Option<String>,
    pub terminal: Option<String>,
    pub interrupt: Option<String>,
}

impl GraphDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            start: None,
            terminal: None,
            interrupt: None,
        }
    }

    pub fn add_node(&mut self, node: NodeSpec) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push(EdgeSpec::Static {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Branches are tried in the order given; the first whose condition
    /// holds wins.
    pub fn add_conditional_edges(&mut self, from: impl Into<String>, branches: Vec<Branch>) -> &mut Self {
        self.edges.push(EdgeSpec::Conditional {
            from: from.into(),
            branches,
        });
        self
    }

    pub fn set_start(&mut self, node: impl Into<String>) -> &mut Self {
        self.start = Some(node.into());
        self
    }

    pub fn set_terminal(&mut self, node: impl Into<String>) -> &mut Self {
        self.terminal = Some(node.into());
        self
    }

    pub fn set_interrupt(&mut self, node: impl Into<String>) -> &mut Self {
        self.interrupt = Some(node.into());
        self
    }

    pub fn find_node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// A node in a graph definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub node_type: String,
    pub description: Option<String>,
    #[serde(default)]
    pub config: ConfigMap,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            description: None,
            config: ConfigMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Outgoing edges of one node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeSpec {
    Static { from: String, to: String },
    Conditional { from: String, branches: Vec<Branch> },
}

impl EdgeSpec {
    pub fn from_node(&self) -> &str {
        match self {
            EdgeSpec::Static { from, .. } | EdgeSpec::Conditional { from, .. } => from,
        }
    }

    /// Every node this edge can lead to, in declaration order
    pub fn targets(&self) -> Vec<&str> {
        match self {
            EdgeSpec::Static { to, .. } => vec![to.as_str()],
            EdgeSpec::Conditional { branches, .. } => branches.iter().map(|b| b.to.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub when: Condition,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Branch {
    pub fn new(when: Condition, to: impl Into<String>) -> Self {
        Self {
            when,
            to: to.into(),
            label: None,
        }
    }

    /// Fallback branch; place it last
    pub fn otherwise(to: impl Into<String>) -> Self {
        Self::new(Condition::Always, to)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.when.describe())
    }
}

/// Predicate over the run state, evaluated by the router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "if", rename_all = "snake_case")]
pub enum Condition {
    Always,
    NeedsContains { need: Need },
    HitlRequired,
    DecisionPresent,
    /// The decision most recently consumed by a decision node
    Decided { decision: Decision },
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn negate(self) -> Self {
        Condition::Not {
            condition: Box::new(self),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Condition::Always => "else".to_string(),
            Condition::NeedsContains { need } => format!("needs {need}"),
            Condition::HitlRequired => "HITL = yes".to_string(),
            Condition::DecisionPresent => "decision present".to_string(),
            Condition::Decided { decision } => decision.to_string(),
            Condition::Not { condition } => format!("not {}", condition.describe()),
        }
    }
}
