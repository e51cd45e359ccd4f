// crates/greennodes/tests/nodes_test.rs

use greencore::{
    ClimatePlan, ConfigMap, Decision, EventBus, ExecutionEvent, GraphError, IrrigationPlan, Need, Node, NodeContext,
    NodeError, NodeEvent, Plan, Pulse, RunId, RunState, Setpoint, Telemetry, Value,
};
use greennodes::greenhouse::{CLIMATE, COMMIT, DECIDE, HITL, IRRIGATION, PLANNER, REVISE, VERIFIER};
use greennodes::{
    compile_greenhouse, greenhouse_graph, register_all, scenarios, GreenhouseSettings, RecordingActuator, Toolbox,
};
use greenruntime::NodeRegistry;
use std::collections::HashMap;
use std::sync::Arc;

// Helper function to create a test context
fn create_test_context(bus: &EventBus, node: &str) -> NodeContext {
    let run_id = RunId::parse("node-test").unwrap();
    NodeContext::new(run_id.clone(), node, bus.create_emitter(run_id, node))
}

fn create_node(node_type: &str, config: ConfigMap) -> Box<dyn Node> {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry, &Toolbox::default());
    registry.create_node(node_type, &config).expect("node should build")
}

fn rejected_state(plan: Plan) -> RunState {
    let mut state = RunState::new(scenarios::needs_approval());
    state.needs = vec![Need::Irrigation, Need::Climate];
    state.plan = plan;
    state.last_decision = Some(Decision::Rejected);
    state
}

fn pulse(volume_l: f64) -> Pulse {
    Pulse {
        time: "08:15".to_string(),
        volume_l,
        ec: 2.2,
    }
}

#[test]
fn test_registry_knows_every_greenhouse_type() {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry, &Toolbox::default());

    let types = registry.list_node_types();
    assert_eq!(types.len(), 8);
    for node_type in [
        "greenhouse.planner",
        "greenhouse.climate",
        "greenhouse.irrigation",
        "greenhouse.verifier",
        "greenhouse.hitl",
        "greenhouse.decide",
        "greenhouse.revise",
        "greenhouse.commit",
    ] {
        assert!(registry.contains(node_type), "missing {node_type}");
        assert!(!registry.get_metadata(node_type).unwrap().description.is_empty());
    }
}

#[test]
fn test_bad_node_config_fails_compilation() {
    let mut definition = greenhouse_graph(&GreenhouseSettings::default());
    for spec in definition.nodes.iter_mut().filter(|n| n.name == VERIFIER) {
        spec.config.insert("risk_threshold".to_string(), Value::from("high"));
    }

    let mut registry = NodeRegistry::new();
    register_all(&mut registry, &Toolbox::default());
    match greenruntime::compile(&definition, &registry) {
        Err(GraphError::NodeCreation { node, source }) => {
            assert_eq!(node, VERIFIER);
            assert!(matches!(source, NodeError::Configuration(_)));
        }
        other => panic!("expected a node creation error, got {other:?}"),
    }
}

#[test]
fn test_settings_validation() {
    assert!(GreenhouseSettings::default().validate().is_ok());

    let settings = GreenhouseSettings::from_json(r#"{"risk_threshold": 25.0, "max_revisions": 1}"#).unwrap();
    assert_eq!(settings.risk_threshold, 25.0);
    assert_eq!(settings.max_revisions, 1);
    assert_eq!(settings.shrink_factor, 0.8);

    let bad = GreenhouseSettings {
        shrink_factor: 1.5,
        ..GreenhouseSettings::default()
    };
    assert!(bad.validate().is_err());
}

#[tokio::test]
async fn test_planner_never_leaves_needs_empty() {
    let bus = EventBus::new(64);
    let planner = create_node("greenhouse.planner", HashMap::new());

    for soil in [0.10, 0.29, 0.30, 0.45] {
        for vpd in [0.3, 0.8, 1.0, 1.2, 1.9] {
            let telemetry = Telemetry::from([("soil_theta".to_string(), soil), ("vpd_now".to_string(), vpd)]);
            let state = planner
                .execute(RunState::new(telemetry), &create_test_context(&bus, PLANNER))
                .await
                .unwrap();

            assert!(!state.needs.is_empty());
            assert_eq!(state.has_need(Need::Irrigation), soil < 0.30, "soil={soil}");
            assert_eq!(state.has_need(Need::Climate), !(0.8..=1.2).contains(&vpd), "vpd={vpd}");
            assert_eq!(state.has_need(Need::None), state.needs.len() == 1 && state.needs[0] == Need::None);
        }
    }
}

#[tokio::test]
async fn test_planner_warns_about_missing_sensors() {
    let bus = EventBus::new(64);
    let mut events = bus.subscribe();
    let planner = create_node("greenhouse.planner", HashMap::new());
    let telemetry = Telemetry::from([("dli_today".to_string(), 14.0)]);

    let state = planner
        .execute(RunState::new(telemetry), &create_test_context(&bus, PLANNER))
        .await
        .unwrap();
    assert_eq!(state.needs, vec![Need::None]);

    let mut warnings = 0;
    while let Ok(event) = events.try_recv() {
        if let ExecutionEvent::NodeEvent {
            event: NodeEvent::Warning { .. },
            ..
        } = event
        {
            warnings += 1;
        }
    }
    assert_eq!(warnings, 2);
}

#[tokio::test]
async fn test_irrigation_prefers_policy_lockout() {
    let bus = EventBus::new(8);
    let mut config = HashMap::new();
    config.insert("fertigation_lockout_min".to_string(), Value::from(45u32));
    let irrigation = create_node("greenhouse.irrigation", config);

    let mut state = RunState::new(scenarios::needs_approval());
    state.needs = vec![Need::Irrigation];
    let planned = irrigation
        .execute(state.clone(), &create_test_context(&bus, IRRIGATION))
        .await
        .unwrap();
    assert_eq!(planned.plan.irrigation.as_ref().unwrap().lockout_min, 45);
    assert_eq!(planned.plan.irrigation.as_ref().unwrap().total_volume_l(), 50.0);

    let state = state.with_policies(scenarios::default_policies());
    let planned = irrigation
        .execute(state, &create_test_context(&bus, IRRIGATION))
        .await
        .unwrap();
    assert_eq!(planned.plan.irrigation.as_ref().unwrap().lockout_min, 20);
}

#[tokio::test]
async fn test_climate_skips_when_not_needed() {
    let bus = EventBus::new(8);
    let climate = create_node("greenhouse.climate", HashMap::new());
    let mut state = RunState::new(scenarios::easy_conditions());
    state.needs = vec![Need::None];

    let state = climate.execute(state, &create_test_context(&bus, CLIMATE)).await.unwrap();
    assert!(state.plan.climate.is_none());
    assert_eq!(state.log.len(), 1);
}

#[tokio::test]
async fn test_verifier_requires_a_plan() {
    let bus = EventBus::new(8);
    let verifier = create_node("greenhouse.verifier", HashMap::new());
    let mut state = RunState::new(scenarios::needs_approval());
    state.needs = vec![Need::Irrigation];

    let err = verifier
        .execute(state, &create_test_context(&bus, VERIFIER))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Precondition(_)));
}

#[tokio::test]
async fn test_revise_shrinks_and_respects_the_floor() {
    let bus = EventBus::new(8);
    let revise = create_node("greenhouse.revise", HashMap::new());
    let plan = Plan {
        climate: Some(ClimatePlan {
            setpoints: vec![Setpoint {
                hour: 9,
                temp_c: 23.0,
                rh_pct: 60.0,
                co2_ppm: 380.0,
            }],
            notes: String::new(),
        }),
        irrigation: Some(IrrigationPlan {
            pulses: vec![pulse(6.0), pulse(25.0)],
            lockout_min: 20,
        }),
    };

    let state = revise
        .execute(rejected_state(plan.clone()), &create_test_context(&bus, REVISE))
        .await
        .unwrap();

    let pulses = &state.plan.irrigation.as_ref().unwrap().pulses;
    assert_eq!(pulses.len(), 1);
    // 6.0 * 0.8 = 4.8, held at the 5 L floor
    assert_eq!(pulses[0].volume_l, 5.0);

    let setpoint = &state.plan.climate.as_ref().unwrap().setpoints[0];
    assert_eq!(setpoint.rh_pct, 70.0);
    // Already below the CO2 floor: untouched
    assert_eq!(setpoint.co2_ppm, 380.0);

    assert_eq!(state.revision_count, 1);
    assert_eq!(state.last_decision, None);
}

#[tokio::test]
async fn test_revise_never_raises_small_pulses() {
    let bus = EventBus::new(8);
    let revise = create_node("greenhouse.revise", HashMap::new());
    let plan = Plan {
        climate: None,
        irrigation: Some(IrrigationPlan {
            pulses: vec![pulse(3.0)],
            lockout_min: 20,
        }),
    };

    let state = revise
        .execute(rejected_state(plan), &create_test_context(&bus, REVISE))
        .await
        .unwrap();
    assert_eq!(state.plan.irrigation.unwrap().pulses[0].volume_l, 3.0);
}

#[tokio::test]
async fn test_revise_requires_a_rejection() {
    let bus = EventBus::new(8);
    let revise = create_node("greenhouse.revise", HashMap::new());
    let mut state = rejected_state(Plan::default());
    state.last_decision = Some(Decision::Approved);

    let err = revise.execute(state, &create_test_context(&bus, REVISE)).await.unwrap_err();
    assert!(matches!(err, NodeError::Precondition(_)));
}

#[test]
fn test_revise_rejects_bad_shrink_factor() {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry, &Toolbox::default());
    let mut config = HashMap::new();
    config.insert("shrink_factor".to_string(), Value::from(0.0));

    assert!(matches!(
        registry.create_node("greenhouse.revise", &config),
        Err(GraphError::NodeCreation {
            source: NodeError::Configuration(_),
            ..
        })
    ));
}

#[tokio::test]
async fn test_hitl_and_decide() {
    let bus = EventBus::new(8);
    let hitl = create_node("greenhouse.hitl", HashMap::new());
    let decide = create_node("greenhouse.decide", HashMap::new());
    let mut state = RunState::new(scenarios::needs_approval());
    state.needs = vec![Need::Irrigation];

    // No decision: the gate is a no-op
    let untouched = hitl.execute(state.clone(), &create_test_context(&bus, HITL)).await.unwrap();
    assert_eq!(untouched, state);

    let err = decide
        .execute(state.clone(), &create_test_context(&bus, DECIDE))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Precondition(_)));

    let state = state.with_decision(Decision::Rejected);
    let state = hitl.execute(state, &create_test_context(&bus, HITL)).await.unwrap();
    assert_eq!(state.log.last().unwrap().message, "reviewer decision=rejected");
    let state = decide.execute(state, &create_test_context(&bus, DECIDE)).await.unwrap();
    assert_eq!(state.decision, None);
    assert_eq!(state.last_decision, Some(Decision::Rejected));
}

#[tokio::test]
async fn test_commit_is_idempotent() {
    let bus = EventBus::new(8);
    let actuator = RecordingActuator::new();
    let tools = Toolbox::default().with_actuator(Arc::new(actuator.clone()));
    let graph = compile_greenhouse(&GreenhouseSettings::default(), &tools).unwrap();
    let commit = graph.node(COMMIT).unwrap();

    let mut state = RunState::new(scenarios::easy_conditions());
    state.needs = vec![Need::None];
    state.plan.irrigation = Some(IrrigationPlan {
        pulses: vec![pulse(10.0)],
        lockout_min: 20,
    });

    let first = commit.execute(state.clone(), &create_test_context(&bus, COMMIT)).await.unwrap();
    let second = commit.execute(state, &create_test_context(&bus, COMMIT)).await.unwrap();

    assert_eq!(actuator.apply_count().await, 1);
    assert_eq!(first.log.last().unwrap().message, "applying plan to SCADA proxy");
    assert_eq!(second.log.last().unwrap().message, "plan already applied, nothing sent");
}

#[tokio::test]
async fn test_commit_refuses_unapproved_risky_plan() {
    let bus = EventBus::new(8);
    let actuator = RecordingActuator::new();
    let tools = Toolbox::default().with_actuator(Arc::new(actuator.clone()));
    let graph = compile_greenhouse(&GreenhouseSettings::default(), &tools).unwrap();

    let mut state = RunState::new(scenarios::needs_approval());
    state.needs = vec![Need::Irrigation];
    state.hitl_required = true;
    state.last_decision = Some(Decision::Rejected);

    let err = graph
        .node(COMMIT)
        .unwrap()
        .execute(state, &create_test_context(&bus, COMMIT))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Precondition(_)));
    assert_eq!(actuator.apply_count().await, 0);
}

#[test]
fn test_routing_is_deterministic() {
    let graph = compile_greenhouse(&GreenhouseSettings::default(), &Toolbox::default()).unwrap();

    let mut state = RunState::new(scenarios::needs_approval());
    state.needs = vec![Need::Irrigation, Need::Climate];
    for _ in 0..3 {
        assert_eq!(graph.next(PLANNER, &state), Some(CLIMATE));
        assert_eq!(graph.next(CLIMATE, &state), Some(IRRIGATION));
    }

    state.needs = vec![Need::Climate];
    assert_eq!(graph.next(CLIMATE, &state), Some(VERIFIER));

    state.needs = vec![Need::None];
    assert_eq!(graph.next(PLANNER, &state), Some(IRRIGATION));
    assert_eq!(graph.next(IRRIGATION, &state), Some(VERIFIER));

    state.hitl_required = true;
    assert_eq!(graph.next(VERIFIER, &state), Some(HITL));
    assert_eq!(graph.next(HITL, &state), None);
    state.hitl_required = false;
    assert_eq!(graph.next(VERIFIER, &state), Some(COMMIT));

    state.decision = Some(Decision::Approved);
    assert_eq!(graph.next(HITL, &state), Some(DECIDE));

    state.last_decision = Some(Decision::Approved);
    assert_eq!(graph.next(DECIDE, &state), Some(COMMIT));
    state.last_decision = Some(Decision::Rejected);
    assert_eq!(graph.next(DECIDE, &state), Some(REVISE));
    assert_eq!(graph.next(REVISE, &state), Some(VERIFIER));
}
