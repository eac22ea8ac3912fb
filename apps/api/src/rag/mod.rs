// Document chat: retrieval-augmented answering over per-session document indexes.
// All model calls go through llm_client via the Embedder / Generator traits.

pub mod chunker;
pub mod embedder;
pub mod errors;
pub mod generator;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod vector_index;

#[cfg(test)]
pub mod testing;

pub use errors::RagError;
pub use pipeline::{RagPipeline, RetrievalSettings};
