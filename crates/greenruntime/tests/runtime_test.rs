// crates/greenruntime/tests/runtime_test.rs

use async_trait::async_trait;
use greencore::{
    Branch, Checkpoint, CheckpointStatus, ConfigMap, Condition, Decision, EngineError, ExecutionEvent, GraphDefinition,
    GraphError, IrrigationPlan, Need, Node, NodeContext, NodeError, NodeSpec, Pulse, RunFailure, RunId, RunState, StoreError,
    Telemetry,
};
use greenruntime::{
    compile, diagram, CheckpointStore, CompiledGraph, FileCheckpointStore, InMemoryCheckpointStore, NodeFactory,
    NodeRegistry, RunResult, RuntimeConfig, WorkflowRuntime,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("greenruntime=debug")
        .with_test_writer()
        .try_init();
}

type Step = fn(RunState) -> Result<RunState, NodeError>;

/// Test node driven by a plain function; every execution leaves a log entry
struct FnNode {
    node_type: &'static str,
    step: Step,
}

#[async_trait]
impl Node for FnNode {
    fn node_type(&self) -> &str {
        self.node_type
    }

    async fn execute(&self, state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        let mut state = (self.step)(state)?;
        state.record(&ctx.node_name, self.node_type);
        Ok(state)
    }
}

struct FnFactory(&'static str, Step);

impl NodeFactory for FnFactory {
    fn create(&self, _config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(FnNode {
            node_type: self.0,
            step: self.1,
        }))
    }

    fn node_type(&self) -> &str {
        self.0
    }
}

fn draft(mut state: RunState) -> Result<RunState, NodeError> {
    state.needs = vec![Need::Irrigation];
    state.plan.irrigation = Some(IrrigationPlan {
        pulses: vec![Pulse {
            time: "08:00".to_string(),
            volume_l: 12.0,
            ec: 2.0,
        }],
        lockout_min: 20,
    });
    state.hitl_required = true;
    Ok(state)
}

fn pass(state: RunState) -> Result<RunState, NodeError> {
    Ok(state)
}

fn decide(mut state: RunState) -> Result<RunState, NodeError> {
    let decision = state
        .take_decision()
        .ok_or_else(|| NodeError::Precondition("no decision".to_string()))?;
    state.last_decision = Some(decision);
    Ok(state)
}

fn boom(_state: RunState) -> Result<RunState, NodeError> {
    Err(NodeError::Tool("forecast service offline".to_string()))
}

fn touch_telemetry(mut state: RunState) -> Result<RunState, NodeError> {
    state.telemetry.insert("vpd_now".to_string(), 9.9);
    Ok(state)
}

/// In-memory store whose `fail_on`-th write (1-based) errors out
struct FailingStore {
    inner: InMemoryCheckpointStore,
    writes: AtomicUsize,
    fail_on: usize,
}

impl FailingStore {
    fn new(inner: InMemoryCheckpointStore, fail_on: usize) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
            fail_on,
        }
    }
}

#[async_trait]
impl CheckpointStore for FailingStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        self.inner.put(checkpoint).await
    }

    async fn get(&self, run_id: &RunId) -> Result<Option<Checkpoint>, StoreError> {
        self.inner.get(run_id).await
    }

    async fn list(&self) -> Result<Vec<RunId>, StoreError> {
        self.inner.list().await
    }
}

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(FnFactory("test.draft", draft)));
    registry.register(Arc::new(FnFactory("test.pass", pass)));
    registry.register(Arc::new(FnFactory("test.decide", decide)));
    registry.register(Arc::new(FnFactory("test.boom", boom)));
    registry.register(Arc::new(FnFactory("test.touch", touch_telemetry)));
    registry
}

/// Draft -> Gate -> Decide -> (approved) Done | (rejected) Draft
fn review_graph() -> GraphDefinition {
    let mut graph = GraphDefinition::new("review");
    graph
        .add_node(NodeSpec::new("Draft", "test.draft"))
        .add_node(NodeSpec::new("Gate", "test.pass"))
        .add_node(NodeSpec::new("Decide", "test.decide"))
        .add_node(NodeSpec::new("Done", "test.pass"));
    graph
        .add_edge("Draft", "Gate")
        .add_conditional_edges("Gate", vec![Branch::new(Condition::DecisionPresent, "Decide")])
        .add_conditional_edges(
            "Decide",
            vec![
                Branch::new(Condition::Decided { decision: Decision::Approved }, "Done"),
                Branch::new(Condition::Decided { decision: Decision::Rejected }, "Draft"),
            ],
        );
    graph.set_start("Draft").set_terminal("Done").set_interrupt("Gate");
    graph
}

/// Draft -> `middle` -> Done, with the gate only reachable when a decision
/// is already present
fn linear_graph(middle_type: &str) -> GraphDefinition {
    let mut graph = GraphDefinition::new("linear");
    graph
        .add_node(NodeSpec::new("Draft", "test.draft"))
        .add_node(NodeSpec::new("Middle", middle_type))
        .add_node(NodeSpec::new("Gate", "test.pass"))
        .add_node(NodeSpec::new("Done", "test.pass"));
    graph
        .add_conditional_edges(
            "Draft",
            vec![
                Branch::new(Condition::DecisionPresent, "Gate"),
                Branch::otherwise("Middle"),
            ],
        )
        .add_edge("Middle", "Done")
        .add_edge("Gate", "Done");
    graph.set_start("Draft").set_terminal("Done").set_interrupt("Gate");
    graph
}

fn compiled(definition: &GraphDefinition) -> CompiledGraph {
    compile(definition, &registry()).expect("graph should compile")
}

fn runtime_for(definition: &GraphDefinition) -> WorkflowRuntime {
    WorkflowRuntime::new(compiled(definition), Arc::new(InMemoryCheckpointStore::new()))
}

fn telemetry() -> Telemetry {
    Telemetry::from([("soil_theta".to_string(), 0.27), ("vpd_now".to_string(), 1.3)])
}

fn expect_failed(result: RunResult) -> RunFailure {
    match result {
        RunResult::Failed(failure) => failure,
        other => panic!("expected failure, got {other:?}"),
    }
}

fn run_id(raw: &str) -> RunId {
    RunId::parse(raw).unwrap()
}

#[tokio::test]
async fn test_suspend_then_approve_completes() {
    init_tracing();
    let runtime = runtime_for(&review_graph());
    let id = run_id("approve-1");

    let result = runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();
    assert_eq!(result, RunResult::Suspended(id.clone()));

    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Interrupted);
    assert!(checkpoint.is_interrupted());
    assert_eq!(checkpoint.pending_node.as_deref(), Some("Gate"));
    assert_eq!(checkpoint.step, 1);
    assert_eq!(checkpoint.state.needs, vec![Need::Irrigation]);

    let result = runtime.resume(&id, Decision::Approved).await.unwrap();
    let state = result.completed_state().expect("run should complete");
    assert_eq!(state.last_decision, Some(Decision::Approved));
    assert_eq!(state.decision, None);

    let nodes: Vec<_> = state.log.iter().map(|e| e.node.as_str()).collect();
    assert_eq!(nodes, vec!["Draft", "Gate", "Decide", "Done"]);

    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Completed);
    assert_eq!(checkpoint.pending_node, None);
    assert_eq!(checkpoint.step, 4);
}

#[tokio::test]
async fn test_rejection_loops_back_to_the_gate() {
    let runtime = runtime_for(&review_graph());
    let id = run_id("reject-1");

    runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();
    let result = runtime.resume(&id, Decision::Rejected).await.unwrap();
    assert!(result.is_suspended());

    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.pending_node.as_deref(), Some("Gate"));
    assert_eq!(checkpoint.state.last_decision, Some(Decision::Rejected));
    assert_eq!(checkpoint.state.decision, None);

    let result = runtime.resume(&id, Decision::Approved).await.unwrap();
    assert!(result.is_completed());
}

#[tokio::test]
async fn test_decision_supplied_at_start_skips_suspension() {
    let runtime = runtime_for(&review_graph());
    let state = RunState::new(telemetry()).with_decision(Decision::Approved);

    let result = runtime.start(run_id("presupplied"), state).await.unwrap();
    assert!(result.is_completed());
}

#[tokio::test]
async fn test_unused_decision_is_cleared_on_completion() {
    init_tracing();
    // Draft always drafts with HITL required, so the gate is skipped
    let mut graph = GraphDefinition::new("skip-gate");
    graph
        .add_node(NodeSpec::new("Draft", "test.draft"))
        .add_node(NodeSpec::new("Middle", "test.pass"))
        .add_node(NodeSpec::new("Gate", "test.pass"))
        .add_node(NodeSpec::new("Done", "test.pass"));
    graph
        .add_conditional_edges(
            "Draft",
            vec![
                Branch::new(Condition::HitlRequired.negate(), "Gate"),
                Branch::otherwise("Middle"),
            ],
        )
        .add_edge("Middle", "Done")
        .add_edge("Gate", "Done");
    graph.set_start("Draft").set_terminal("Done").set_interrupt("Gate");

    let runtime = runtime_for(&graph);
    let id = run_id("unused-decision");

    let state = RunState::new(telemetry()).with_decision(Decision::Rejected);
    let result = runtime.start(id.clone(), state).await.unwrap();

    let state = result.completed_state().expect("run should complete");
    let nodes: Vec<_> = state.log.iter().map(|e| e.node.as_str()).collect();
    assert_eq!(nodes, vec!["Draft", "Middle", "Done"]);
    assert_eq!(state.decision, None);

    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Completed);
    assert_eq!(checkpoint.state.decision, None);
}

#[tokio::test]
async fn test_failed_checkpoint_write_does_not_strand_run() {
    init_tracing();
    let inner = InMemoryCheckpointStore::new();
    // Writes: start, after Draft, after Gate, after Decide (fails)
    let store = FailingStore::new(inner.clone(), 4);
    let runtime = WorkflowRuntime::new(compiled(&review_graph()), Arc::new(store));
    let id = run_id("disk-full");

    runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();

    let err = runtime.resume(&id, Decision::Approved).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Io(_))));

    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Failed);
    assert_eq!(checkpoint.pending_node.as_deref(), Some("Decide"));
    let failure = checkpoint.failure.as_ref().expect("failure should be recorded");
    assert_eq!(failure.node, "Decide");
    assert!(matches!(failure.error, NodeError::ExecutionFailed(ref msg) if msg.contains("disk full")));
    // The snapshot stays at the last successful write
    assert_eq!(checkpoint.step, 2);

    let err = runtime.resume(&id, Decision::Approved).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::NotSuspended {
            status: CheckpointStatus::Failed,
            ..
        }
    ));
}

#[tokio::test]
async fn test_suspended_run_emits_events_in_order() {
    let runtime = runtime_for(&review_graph());
    let mut events = runtime.subscribe_events();

    runtime.start(run_id("events-1"), RunState::new(telemetry())).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            ExecutionEvent::RunStarted { .. } => kinds.push("run_started"),
            ExecutionEvent::NodeStarted { .. } => kinds.push("node_started"),
            ExecutionEvent::NodeCompleted { next, .. } => {
                assert_eq!(next.as_deref(), Some("Gate"));
                kinds.push("node_completed");
            }
            ExecutionEvent::RunSuspended { node, .. } => {
                assert_eq!(node, "Gate");
                kinds.push("run_suspended");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(kinds, vec!["run_started", "node_started", "node_completed", "run_suspended"]);
}

#[tokio::test]
async fn test_resume_unknown_run_is_not_found() {
    let runtime = runtime_for(&review_graph());
    let err = runtime.resume(&run_id("ghost"), Decision::Approved).await.unwrap_err();
    assert!(matches!(err, EngineError::CheckpointNotFound(id) if id.as_str() == "ghost"));
}

#[tokio::test]
async fn test_resume_completed_run_is_rejected() {
    let runtime = runtime_for(&review_graph());
    let id = run_id("done-1");
    let state = RunState::new(telemetry()).with_decision(Decision::Approved);
    runtime.start(id.clone(), state).await.unwrap();

    let err = runtime.resume(&id, Decision::Approved).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::NotSuspended {
            status: CheckpointStatus::Completed,
            ..
        }
    ));
}

#[tokio::test]
async fn test_start_refuses_existing_run_id() {
    let runtime = runtime_for(&review_graph());
    let id = run_id("dup-1");
    runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();

    let err = runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap_err();
    assert!(matches!(err, EngineError::RunExists(_)));

    // The suspended run is untouched
    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Interrupted);
}

#[tokio::test]
async fn test_start_validates_initial_state() {
    let runtime = runtime_for(&review_graph());

    let err = runtime
        .start(run_id("empty"), RunState::new(Telemetry::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let nan = Telemetry::from([("vpd_now".to_string(), f64::NAN)]);
    let err = runtime.start(run_id("nan"), RunState::new(nan)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(runtime.list_runs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_run_cannot_resume() {
    let runtime = runtime_for(&review_graph());
    let id = run_id("cancel-1");
    runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();

    let checkpoint = runtime.cancel(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Cancelled);
    assert_eq!(checkpoint.pending_node.as_deref(), Some("Gate"));

    // Cancelling again is a no-op
    runtime.cancel(&id).await.unwrap();

    let err = runtime.resume(&id, Decision::Approved).await.unwrap_err();
    assert!(matches!(err, EngineError::RunCancelled(_)));
}

#[tokio::test]
async fn test_cancel_finished_run_is_rejected() {
    let runtime = runtime_for(&review_graph());
    let id = run_id("cancel-done");
    let state = RunState::new(telemetry()).with_decision(Decision::Approved);
    runtime.start(id.clone(), state).await.unwrap();

    let err = runtime.cancel(&id).await.unwrap_err();
    assert!(matches!(err, EngineError::RunFinished { .. }));
}

#[tokio::test]
async fn test_node_failure_keeps_last_snapshot() {
    init_tracing();
    let runtime = runtime_for(&linear_graph("test.boom"));
    let id = run_id("boom-1");

    let result = runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();
    let failure = expect_failed(result);
    assert_eq!(failure.node, "Middle");
    assert_eq!(failure.revision_count, 0);
    assert!(matches!(failure.error, NodeError::Tool(_)));

    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Failed);
    assert_eq!(checkpoint.pending_node.as_deref(), Some("Middle"));
    assert_eq!(checkpoint.step, 1);
    assert_eq!(checkpoint.failure.as_ref(), Some(&failure));
    // State as Draft left it
    assert_eq!(checkpoint.state.log.len(), 1);
    assert_eq!(checkpoint.state.needs, vec![Need::Irrigation]);

    let err = runtime.resume(&id, Decision::Approved).await.unwrap_err();
    assert!(matches!(err, EngineError::NotSuspended { .. }));
}

#[tokio::test]
async fn test_telemetry_is_read_only() {
    let runtime = runtime_for(&linear_graph("test.touch"));

    let result = runtime.start(run_id("touch-1"), RunState::new(telemetry())).await.unwrap();
    let failure = expect_failed(result);
    assert_eq!(failure.node, "Middle");
    assert!(matches!(failure.error, NodeError::ExecutionFailed(ref msg) if msg.contains("telemetry")));
}

#[tokio::test]
async fn test_step_limit_stops_cycles() {
    init_tracing();
    let mut graph = GraphDefinition::new("spin");
    graph
        .add_node(NodeSpec::new("Draft", "test.draft"))
        .add_node(NodeSpec::new("Spin", "test.pass"))
        .add_node(NodeSpec::new("Gate", "test.pass"))
        .add_node(NodeSpec::new("Done", "test.pass"));
    graph
        .add_edge("Draft", "Spin")
        .add_conditional_edges(
            "Spin",
            vec![
                Branch::new(Condition::HitlRequired, "Spin"),
                Branch::new(Condition::DecisionPresent, "Gate"),
                Branch::otherwise("Done"),
            ],
        )
        .add_edge("Gate", "Done");
    graph.set_start("Draft").set_terminal("Done").set_interrupt("Gate");

    let config = RuntimeConfig {
        max_steps: 5,
        ..RuntimeConfig::default()
    };
    let runtime = WorkflowRuntime::with_config(compiled(&graph), Arc::new(InMemoryCheckpointStore::new()), config);
    let id = run_id("spin-1");

    let result = runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();
    let failure = expect_failed(result);
    assert_eq!(failure.node, "Spin");
    assert!(matches!(failure.error, NodeError::ExecutionFailed(ref msg) if msg.contains("step limit")));
    assert_eq!(runtime.checkpoint(&id).await.unwrap().step, 5);
}

#[tokio::test]
async fn test_compile_rejects_bad_graphs() {
    let registry = registry();

    let mut unknown = review_graph();
    unknown.add_node(NodeSpec::new("Extra", "test.nope"));
    assert!(matches!(compile(&unknown, &registry), Err(GraphError::UnknownNodeType(t)) if t == "test.nope"));

    let mut duplicate = review_graph();
    duplicate.add_node(NodeSpec::new("Gate", "test.pass"));
    assert!(matches!(compile(&duplicate, &registry), Err(GraphError::DuplicateNode(_))));

    let mut no_start = review_graph();
    no_start.start = None;
    assert!(matches!(
        compile(&no_start, &registry),
        Err(GraphError::MissingDesignation("start"))
    ));

    let mut orphan = review_graph();
    orphan.add_node(NodeSpec::new("Orphan", "test.pass"));
    orphan.add_edge("Orphan", "Done");
    assert!(matches!(compile(&orphan, &registry), Err(GraphError::Unreachable(n)) if n == "Orphan"));

    let mut dead_end = review_graph();
    dead_end.add_node(NodeSpec::new("DeadEnd", "test.pass"));
    dead_end.edges.retain(|e| e.from_node() != "Draft");
    dead_end.add_conditional_edges(
        "Draft",
        vec![Branch::new(Condition::HitlRequired, "Gate"), Branch::otherwise("DeadEnd")],
    );
    assert!(matches!(compile(&dead_end, &registry), Err(GraphError::InvalidEdge(_))));

    let mut from_terminal = review_graph();
    from_terminal.add_edge("Done", "Draft");
    assert!(matches!(compile(&from_terminal, &registry), Err(GraphError::InvalidEdge(_))));

    let mut bad_target = review_graph();
    bad_target.add_edge("Nowhere", "Done");
    assert!(matches!(compile(&bad_target, &registry), Err(GraphError::NodeNotFound(_))));
}

#[tokio::test]
async fn test_resume_after_reopening_file_store() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let id = run_id("durable-1");

    {
        let store = FileCheckpointStore::open(dir.path()).await.unwrap();
        let runtime = WorkflowRuntime::new(compiled(&review_graph()), Arc::new(store));
        let result = runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();
        assert!(result.is_suspended());
    }

    assert!(dir.path().join("durable-1.json").exists());

    let store = FileCheckpointStore::open(dir.path()).await.unwrap();
    assert_eq!(store.list().await.unwrap(), vec![id.clone()]);

    let runtime = WorkflowRuntime::new(compiled(&review_graph()), Arc::new(store));
    let result = runtime.resume(&id, Decision::Approved).await.unwrap();
    assert!(result.is_completed());

    let checkpoint = runtime.checkpoint(&id).await.unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::Completed);
}

#[tokio::test]
async fn test_file_store_missing_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCheckpointStore::open(dir.path().join("nested")).await.unwrap();
    assert!(store.get(&run_id("absent")).await.unwrap().is_none());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let store = InMemoryCheckpointStore::new();
    let runtime = Arc::new(WorkflowRuntime::new(compiled(&review_graph()), Arc::new(store.clone())));

    let starts = (0..8).map(|i| {
        let runtime = runtime.clone();
        async move {
            let id = run_id(&format!("run-{i}"));
            runtime.start(id, RunState::new(telemetry())).await
        }
    });
    let results = futures::future::join_all(starts).await;
    assert!(results.into_iter().all(|r| r.unwrap().is_suspended()));
    assert_eq!(store.len().await, 8);

    let resumes = (0..8).map(|i| {
        let runtime = runtime.clone();
        let decision = if i % 2 == 0 { Decision::Approved } else { Decision::Rejected };
        async move { runtime.resume(&run_id(&format!("run-{i}")), decision).await }
    });
    let results = futures::future::join_all(resumes).await;
    for (i, result) in results.into_iter().enumerate() {
        let result = result.unwrap();
        if i % 2 == 0 {
            assert!(result.is_completed());
        } else {
            assert!(result.is_suspended());
        }
    }
}

#[tokio::test]
async fn test_racing_resumes_on_one_run() {
    let runtime = Arc::new(runtime_for(&review_graph()));
    let id = run_id("race-1");
    runtime.start(id.clone(), RunState::new(telemetry())).await.unwrap();

    let a = runtime.resume(&id, Decision::Approved);
    let b = runtime.resume(&id, Decision::Approved);
    let (a, b) = tokio::join!(a, b);

    // Exactly one caller gets to drive the run
    let completed = [&a, &b].iter().filter(|r| matches!(r, Ok(r) if r.is_completed())).count();
    let refused = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(EngineError::NotSuspended { .. })))
        .count();
    assert_eq!((completed, refused), (1, 1));
}

#[test]
fn test_diagram_exports() {
    let graph = compiled(&review_graph());

    let mermaid = diagram::to_mermaid(&graph);
    assert!(mermaid.starts_with("flowchart TD\n"));
    assert!(mermaid.contains("START([START]) --> Draft"));
    assert!(mermaid.contains("Draft --> Gate"));
    assert!(mermaid.contains("Decide -->|approved| Done"));
    assert!(mermaid.contains("Decide -->|rejected| Draft"));
    assert!(mermaid.contains("Gate -.->|no decision| SUSPENDED([SUSPENDED])"));
    assert!(mermaid.contains("Done --> END([END])"));

    let dot = diagram::to_dot(&graph);
    assert!(dot.contains("digraph"));
    assert!(dot.contains("shape = diamond"));
    assert!(dot.contains("label = \"approved\""));
}
