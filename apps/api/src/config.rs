use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::rag::chunker::Chunker;
use crate::rag::vector_index::DistanceMetric;
use crate::rag::RetrievalSettings;

/// Application configuration loaded from environment variables.
/// Every setting has a default; malformed values fail start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ollama_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub generation_temperature: f32,
    pub generation_max_tokens: u32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub distance_metric: DistanceMetric,
    pub embed_timeout: Duration,
    pub generation_timeout: Duration,
    pub jobs_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3".to_string(),
            generation_temperature: 0.8,
            generation_max_tokens: 1000,
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            distance_metric: DistanceMetric::Euclidean,
            embed_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(120),
            jobs_path: "data/available_jobs.json".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let d = Config::default();
        Ok(Config {
            port: parse_env("PORT", d.port)?,
            rust_log: env_or("RUST_LOG", &d.rust_log),
            ollama_url: env_or("OLLAMA_URL", &d.ollama_url),
            embedding_model: env_or("EMBEDDING_MODEL", &d.embedding_model),
            generation_model: env_or("GENERATION_MODEL", &d.generation_model),
            generation_temperature: parse_env("GENERATION_TEMPERATURE", d.generation_temperature)?,
            generation_max_tokens: parse_env("GENERATION_MAX_TOKENS", d.generation_max_tokens)?,
            chunk_size: parse_env("CHUNK_SIZE", d.chunk_size)?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", d.chunk_overlap)?,
            top_k: parse_env("TOP_K", d.top_k)?,
            distance_metric: parse_env("DISTANCE_METRIC", d.distance_metric)?,
            embed_timeout: Duration::from_secs(parse_env(
                "EMBED_TIMEOUT_SECS",
                d.embed_timeout.as_secs(),
            )?),
            generation_timeout: Duration::from_secs(parse_env(
                "GENERATION_TIMEOUT_SECS",
                d.generation_timeout.as_secs(),
            )?),
            jobs_path: env_or("JOBS_PATH", &d.jobs_path),
        })
    }

    /// Chunking parameters checked up front so a bad `.env` fails at start-up.
    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunk_size, self.chunk_overlap)
            .context("Invalid CHUNK_SIZE / CHUNK_OVERLAP combination")
    }

    pub fn retrieval_settings(&self) -> Result<RetrievalSettings> {
        if self.top_k == 0 {
            anyhow::bail!("TOP_K must be at least 1");
        }
        Ok(RetrievalSettings {
            top_k: self.top_k,
            embed_timeout: self.embed_timeout,
            generation_timeout: self.generation_timeout,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
