use crate::approval::{DECIDE_TYPE, HITL_TYPE};
use crate::climate::CLIMATE_TYPE;
use crate::commit::COMMIT_TYPE;
use crate::irrigation::IRRIGATION_TYPE;
use crate::planner::PLANNER_TYPE;
use crate::revise::REVISE_TYPE;
use crate::settings::GreenhouseSettings;
use crate::tools::Toolbox;
use crate::verifier::VERIFIER_TYPE;
use greencore::{Branch, Condition, Decision, GraphDefinition, GraphError, Need, NodeSpec, Policies, Telemetry};
use greenruntime::{CompiledGraph, NodeRegistry};

pub const PLANNER: &str = "Planner";
pub const CLIMATE: &str = "Climate";
pub const IRRIGATION: &str = "Irrigation";
pub const VERIFIER: &str = "Verifier";
pub const HITL: &str = "HITL";
pub const DECIDE: &str = "Decide";
pub const REVISE: &str = "Revise";
pub const COMMIT: &str = "Commit";

/// The greenhouse planning graph:
///
/// ```text
/// Planner -> Climate? -> Irrigation -> Verifier -> (HITL -> Decide)? -> Commit
///                                         ^                 |
///                                         +---- Revise <----+ rejected
/// ```
pub fn greenhouse_graph(settings: &GreenhouseSettings) -> GraphDefinition {
    let mut graph = GraphDefinition::new("greenhouse");
    graph.description = Some("Climate/irrigation planning with a human approval gate".to_string());

    graph
        .add_node(
            NodeSpec::new(PLANNER, PLANNER_TYPE)
                .with_config("soil_theta_min", settings.soil_theta_min)
                .with_config("vpd_low", settings.vpd_low)
                .with_config("vpd_high", settings.vpd_high),
        )
        .add_node(NodeSpec::new(CLIMATE, CLIMATE_TYPE))
        .add_node(
            NodeSpec::new(IRRIGATION, IRRIGATION_TYPE)
                .with_config("fertigation_lockout_min", settings.fertigation_lockout_min),
        )
        .add_node(NodeSpec::new(VERIFIER, VERIFIER_TYPE).with_config("risk_threshold", settings.risk_threshold))
        .add_node(NodeSpec::new(HITL, HITL_TYPE).with_description("approval gate"))
        .add_node(NodeSpec::new(DECIDE, DECIDE_TYPE))
        .add_node(
            NodeSpec::new(REVISE, REVISE_TYPE)
                .with_config("max_revisions", settings.max_revisions)
                .with_config("shrink_factor", settings.shrink_factor)
                .with_config("min_pulse_volume_l", settings.min_pulse_volume_l)
                .with_config("co2_floor_ppm", settings.co2_floor_ppm),
        )
        .add_node(NodeSpec::new(COMMIT, COMMIT_TYPE));

    graph
        .add_conditional_edges(
            PLANNER,
            vec![
                Branch::new(Condition::NeedsContains { need: Need::Climate }, CLIMATE),
                Branch::otherwise(IRRIGATION),
            ],
        )
        .add_conditional_edges(
            CLIMATE,
            vec![
                Branch::new(Condition::NeedsContains { need: Need::Irrigation }, IRRIGATION),
                Branch::otherwise(VERIFIER),
            ],
        )
        .add_edge(IRRIGATION, VERIFIER)
        .add_conditional_edges(
            VERIFIER,
            vec![
                Branch::new(Condition::HitlRequired, HITL),
                Branch::otherwise(COMMIT).with_label("HITL = no"),
            ],
        )
        .add_conditional_edges(HITL, vec![Branch::new(Condition::DecisionPresent, DECIDE)])
        .add_conditional_edges(
            DECIDE,
            vec![
                Branch::new(Condition::Decided { decision: Decision::Approved }, COMMIT),
                Branch::new(Condition::Decided { decision: Decision::Rejected }, REVISE),
            ],
        )
        .add_edge(REVISE, VERIFIER);

    graph.set_start(PLANNER).set_terminal(COMMIT).set_interrupt(HITL);
    graph
}

/// Register the greenhouse nodes and compile the graph in one go
pub fn compile_greenhouse(settings: &GreenhouseSettings, tools: &Toolbox) -> Result<CompiledGraph, GraphError> {
    let mut registry = NodeRegistry::new();
    crate::register_all(&mut registry, tools);
    greenruntime::compile(&greenhouse_graph(settings), &registry)
}

/// Canned inputs for the two demo scenarios
pub mod scenarios {
    use super::*;

    /// Dry substrate, high VPD, short light day: both subsystems need work
    /// and risk_index is 20.
    pub fn needs_approval() -> Telemetry {
        Telemetry::from([
            ("vpd_now".to_string(), 1.35),
            ("soil_theta".to_string(), 0.28),
            ("dli_today".to_string(), 12.7),
        ])
    }

    /// Everything in band: needs=[none], risk_index is 0
    pub fn easy_conditions() -> Telemetry {
        Telemetry::from([
            ("vpd_now".to_string(), 0.95),
            ("soil_theta".to_string(), 0.31),
            ("dli_today".to_string(), 19.5),
        ])
    }

    pub fn default_policies() -> Policies {
        Policies {
            fertigation_lockout_min: Some(20),
            protected_limits: vec!["heater_max".to_string()],
        }
    }
}
