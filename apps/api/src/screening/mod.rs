// CV screening: gap score against a job description and best match from the job catalog.
// Embeddings come from the same pipeline the document chat uses.

pub mod gap_analysis;
pub mod handlers;

pub use gap_analysis::JobCatalog;
