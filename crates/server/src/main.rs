//! Conclave Server
//!
//! Thin HTTP front end over the core: read-only views of the mesh registry
//! and the collaboration dispatcher, plus a CLI entry that drives one full
//! delivery pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use clap::{Parser, Subcommand};
use conclave_core::collab::{CollabDispatcher, InProcessProvider};
use conclave_core::lifecycle::PipelineRunner;
use conclave_core::mesh::{Agent, AgentCapability, MeshRegistry, MessageRouter};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

/// Application state shared across handlers
struct AppState {
    registry: Arc<MeshRegistry>,
    dispatcher: Arc<CollabDispatcher>,
}

type SharedState = Arc<AppState>;

#[derive(Parser)]
#[command(name = "conclave", about = "Agent coordination server")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the HTTP server
    Serve {
        #[arg(long, default_value_t = 5000)]
        port: u16,
    },
    /// Run the delivery pipeline once and print the stage history
    Run {
        /// Raw task text fed to requirement extraction
        task: String,
        /// Participating agent ids (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "analyst,builder,reviewer")]
        agents: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    match args.command {
        Some(CliCommand::Run { task, agents }) => run_pipeline_once(&task, agents).await,
        Some(CliCommand::Serve { port }) => serve(port).await,
        None => serve(5000).await,
    }
}

async fn serve(port: u16) -> Result<()> {
    let registry = Arc::new(MeshRegistry::new());
    let router = MessageRouter::new(Arc::clone(&registry));
    seed_agents(&router);

    let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(InProcessProvider::default())));
    let state: SharedState = Arc::new(AppState {
        registry,
        dispatcher,
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/agents", get(list_agents))
        .route("/api/sessions", get(list_sessions))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Conclave running at http://{addr}");
    tracing::info!(%addr, "server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Default deployment agents exposed by the listing endpoint
fn seed_agents(router: &MessageRouter) {
    router.register(
        Agent::new("analyst", "Analyst").with_capability(AgentCapability::new(
            "requirement_analysis",
            "Extract stories and criteria from raw task text",
            vec!["raw_input".to_string()],
            vec!["backlog".to_string()],
            0.9,
        )),
    );
    router.register(
        Agent::new("builder", "Builder").with_capability(
            AgentCapability::new(
                "code_generation",
                "Generate code from a design",
                vec!["design".to_string()],
                vec!["code".to_string()],
                0.85,
            )
            .with_tools(vec!["rustc".to_string()]),
        ),
    );
    router.register(
        Agent::new("reviewer", "Reviewer").with_capability(AgentCapability::new(
            "code_review",
            "Review generated code for issues",
            vec!["code".to_string()],
            vec!["issues".to_string()],
            0.8,
        )),
    );
}

async fn run_pipeline_once(task: &str, agents: Vec<String>) -> Result<()> {
    let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(InProcessProvider::default())));
    let mut runner = PipelineRunner::new(Arc::clone(&dispatcher), agents);

    println!("🚀 Running pipeline for: {task}");
    match runner.run_pipeline(task).await {
        Ok(history) => {
            println!("✅ Pipeline completed: {} stages", history.len());
            for record in &history {
                println!("   {} → {}", record.stage, record.output);
            }
        }
        Err(e) => {
            eprintln!("❌ Pipeline failed: {e}");
            for record in runner.history() {
                println!("   {} → {}", record.stage, record.output);
            }
        }
    }
    Ok(())
}

// === API Types ===

#[derive(Serialize)]
struct AgentView {
    id: String,
    name: String,
    capabilities: Vec<String>,
    peers: usize,
}

// === Handlers ===

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "conclave" }))
}

async fn list_agents(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let mut agents = state.registry.agents();
    agents.sort_by(|a, b| a.id().cmp(b.id()));

    let views: Vec<AgentView> = agents
        .iter()
        .map(|agent| AgentView {
            id: agent.id().to_owned(),
            name: agent.name().to_owned(),
            capabilities: agent
                .capabilities()
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            peers: agent.peers().len(),
        })
        .collect();

    Json(json!({ "agents": views }))
}

async fn list_sessions(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({
        "count": state.dispatcher.session_count(),
        "sessions": state.dispatcher.sessions(),
    }))
}
