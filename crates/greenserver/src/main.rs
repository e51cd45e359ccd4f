use actix_cors::Cors;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult};
use actix_ws::Message;
use greencore::{Decision, EngineError, Policies, RunId, RunState, Telemetry};
use greennodes::{GreenhouseSettings, Toolbox};
use greenruntime::{
    diagram, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, NodeRegistry, RunResult,
    RuntimeConfig, WorkflowRuntime,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
struct AppState {
    runtime: Arc<WorkflowRuntime>,
    registry: Arc<NodeRegistry>,
}

/// Request body for starting a run
#[derive(Debug, Deserialize)]
struct StartRequest {
    run_id: Option<String>,
    telemetry: Telemetry,
    #[serde(default)]
    policies: Policies,
    decision: Option<Decision>,
}

/// Request body for resuming a suspended run
#[derive(Debug, Deserialize)]
struct ResumeRequest {
    decision: Decision,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    run_id: RunId,
    result: RunResult,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: &EngineError) -> HttpResponse {
    let body = ErrorResponse { error: e.to_string() };
    match e {
        EngineError::CheckpointNotFound(_) => HttpResponse::NotFound().json(body),
        EngineError::RunCancelled(_)
        | EngineError::NotSuspended { .. }
        | EngineError::RunExists(_)
        | EngineError::RunFinished { .. } => HttpResponse::Conflict().json(body),
        EngineError::Validation(_) => HttpResponse::BadRequest().json(body),
        EngineError::Graph(_) | EngineError::Store(_) => {
            error!("Request failed: {}", e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

fn parse_run_id(raw: String) -> Result<RunId, HttpResponse> {
    RunId::parse(raw).map_err(|e| error_response(&EngineError::from(e)))
}

fn run_response(run_id: RunId, result: RunResult) -> HttpResponse {
    if let RunResult::Failed(failure) = &result {
        warn!("{}", failure);
    }
    HttpResponse::Ok().json(RunResponse { run_id, result })
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "greenflow"
    }))
}

/// Mermaid rendering of the compiled graph
#[get("/api/graph")]
async fn get_graph(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(diagram::to_mermaid(data.runtime.graph()))
}

/// Start a run
#[post("/api/runs")]
async fn start_run(data: web::Data<AppState>, req: web::Json<StartRequest>) -> ActixResult<impl Responder> {
    let req = req.into_inner();
    let run_id = match req.run_id {
        Some(raw) => match parse_run_id(raw) {
            Ok(id) => id,
            Err(response) => return Ok(response),
        },
        None => RunId::generate(),
    };

    let mut state = RunState::new(req.telemetry).with_policies(req.policies);
    state.decision = req.decision;

    info!("Starting run {}", run_id);
    match data.runtime.start(run_id.clone(), state).await {
        Ok(result) => Ok(run_response(run_id, result)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// List runs with their latest status
#[get("/api/runs")]
async fn list_runs(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let run_ids = match data.runtime.list_runs().await {
        Ok(ids) => ids,
        Err(e) => return Ok(error_response(&e)),
    };

    let mut runs = Vec::with_capacity(run_ids.len());
    for run_id in run_ids {
        match data.runtime.checkpoint(&run_id).await {
            Ok(checkpoint) => runs.push(serde_json::json!({
                "run_id": checkpoint.run_id,
                "status": checkpoint.status,
                "pending_node": checkpoint.pending_node,
                "step": checkpoint.step,
                "updated_at": checkpoint.updated_at,
            })),
            Err(e) => return Ok(error_response(&e)),
        }
    }

    Ok(HttpResponse::Ok().json(runs))
}

/// Latest checkpoint of a run
#[get("/api/runs/{id}")]
async fn get_run(data: web::Data<AppState>, path: web::Path<String>) -> ActixResult<impl Responder> {
    let run_id = match parse_run_id(path.into_inner()) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match data.runtime.checkpoint(&run_id).await {
        Ok(checkpoint) => Ok(HttpResponse::Ok().json(checkpoint)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Resume a suspended run with a reviewer decision
#[post("/api/runs/{id}/resume")]
async fn resume_run(
    data: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<ResumeRequest>,
) -> ActixResult<impl Responder> {
    let run_id = match parse_run_id(path.into_inner()) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let decision = req.into_inner().decision;

    info!("Resuming run {} with decision {}", run_id, decision);
    match data.runtime.resume(&run_id, decision).await {
        Ok(result) => Ok(run_response(run_id, result)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Cancel a run
#[post("/api/runs/{id}/cancel")]
async fn cancel_run(data: web::Data<AppState>, path: web::Path<String>) -> ActixResult<impl Responder> {
    let run_id = match parse_run_id(path.into_inner()) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match data.runtime.cancel(&run_id).await {
        Ok(checkpoint) => {
            info!("Cancelled run {}", run_id);
            Ok(HttpResponse::Ok().json(checkpoint))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// WebSocket endpoint for real-time events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("WebSocket client lagging, {} events skipped", skipped);
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List available node types
#[get("/api/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = &data.registry;

    let nodes: Vec<_> = registry
        .list_node_types()
        .iter()
        .map(|node_type| {
            let metadata = registry.get_metadata(node_type);
            serde_json::json!({
                "type": node_type,
                "description": metadata.as_ref().map(|m| m.description.clone()).unwrap_or_default(),
                "category": metadata.as_ref().map(|m| m.category.clone()).unwrap_or_default(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(nodes))
}

fn load_settings() -> anyhow::Result<GreenhouseSettings> {
    let settings = match std::env::var("GREENFLOW_CONFIG") {
        Ok(path) => GreenhouseSettings::from_json(&std::fs::read_to_string(path)?)?,
        Err(_) => GreenhouseSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting greenhouse workflow server");

    let settings = load_settings()?;
    let tools = Toolbox::default();

    let mut registry = NodeRegistry::new();
    greennodes::register_all(&mut registry, &tools);
    let graph = greenruntime::compile(&greennodes::greenhouse_graph(&settings), &registry)?;

    let store: Arc<dyn CheckpointStore> = match std::env::var("CHECKPOINT_DIR") {
        Ok(dir) => {
            info!("💾 Checkpoints stored under {}", dir);
            Arc::new(FileCheckpointStore::open(dir).await?)
        }
        Err(_) => {
            warn!("CHECKPOINT_DIR not set, checkpoints are kept in memory");
            Arc::new(InMemoryCheckpointStore::new())
        }
    };

    let runtime = WorkflowRuntime::with_config(graph, store, RuntimeConfig::default());

    info!("✅ Runtime initialized with greenhouse graph");

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
        registry: Arc::new(registry),
    });

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(get_graph)
            .service(start_run)
            .service(list_runs)
            .service(get_run)
            .service(resume_run)
            .service(cancel_run)
            .service(websocket_events)
            .service(list_node_types)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
