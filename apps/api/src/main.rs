mod config;
mod errors;
mod llm_client;
mod rag;
mod routes;
mod screening;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::{GenerationOptions, LlmClient};
use crate::rag::embedder::OllamaEmbedder;
use crate::rag::generator::OllamaGenerator;
use crate::rag::session::SessionStore;
use crate::rag::RagPipeline;
use crate::routes::build_router;
use crate::screening::JobCatalog;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting docchat v{}", env!("CARGO_PKG_VERSION"));

    // Validate retrieval parameters before anything talks to the model server
    let chunker = config.chunker()?;
    let settings = config.retrieval_settings()?;
    info!(
        "Chunking {} chars with {} overlap, top_k={}, distance={}",
        chunker.chunk_size(),
        chunker.overlap(),
        settings.top_k,
        config.distance_metric
    );

    // Initialize model-server client and collaborators
    let llm = LlmClient::new(&config.ollama_url)?;
    let embedder = Arc::new(OllamaEmbedder::new(llm.clone(), &config.embedding_model));
    let generator = Arc::new(OllamaGenerator::new(
        llm.clone(),
        &config.generation_model,
        GenerationOptions {
            temperature: config.generation_temperature,
            num_predict: config.generation_max_tokens,
        },
    ));
    info!(
        "Model server {} (embedding: {}, generation: {})",
        llm.base_url(),
        config.embedding_model,
        config.generation_model
    );

    // Sessions live in memory for the lifetime of the process
    let sessions = SessionStore::new(config.distance_metric);
    let rag = Arc::new(RagPipeline::new(
        sessions, chunker, embedder, generator, settings,
    ));

    let jobs = Arc::new(JobCatalog::load(&config.jobs_path)?);

    // Build app state
    let state = AppState {
        rag,
        jobs,
        llm,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
