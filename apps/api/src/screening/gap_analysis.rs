//! CV screening — similarity between a CV, a job description and a job catalog.
//!
//! Gap score = cosine similarity of the CV and JD embeddings.
//! Best match = catalog job whose description embedding is most similar to the CV.
//! The CV is embedded once per request and reused for every comparison. Catalog
//! descriptions are embedded on first use and cached for the life of the process.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::rag::errors::RagError;
use crate::rag::pipeline::RagPipeline;
use crate::rag::vector_index::{cosine_similarity, Vector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobMatch {
    pub title: String,
    pub description: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningReport {
    pub gap_score: f32,
    pub best_match: Option<JobMatch>,
    pub jobs_compared: usize,
}

/// Job postings read once at start-up, plus their description embeddings.
#[derive(Debug, Default)]
pub struct JobCatalog {
    jobs: Vec<JobPosting>,
    vectors: OnceCell<Vec<Vector>>,
}

impl JobCatalog {
    pub fn new(jobs: Vec<JobPosting>) -> Self {
        Self {
            jobs,
            vectors: OnceCell::new(),
        }
    }

    /// Reads a JSON array of `{title, description}`. A missing file gives an empty catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Job catalog {} not found; best-match screening is disabled",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job catalog {}", path.display()))?;
        let jobs: Vec<JobPosting> = serde_json::from_str(&raw)
            .with_context(|| format!("Job catalog {} is not a valid job list", path.display()))?;

        info!("Loaded {} jobs from {}", jobs.len(), path.display());
        Ok(Self::new(jobs))
    }

    pub fn jobs(&self) -> &[JobPosting] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Description embeddings in catalog order. The first successful call embeds every
    /// job; a failed attempt caches nothing and the next request tries again.
    pub async fn vectors(&self, rag: &RagPipeline) -> Result<&[Vector], RagError> {
        let vectors = self
            .vectors
            .get_or_try_init(|| async {
                let mut vectors = Vec::with_capacity(self.jobs.len());
                for job in &self.jobs {
                    vectors.push(rag.embed(&job.description).await?);
                }
                debug!(jobs = vectors.len(), "job catalog embedded");
                Ok::<_, RagError>(vectors)
            })
            .await?;
        Ok(vectors.as_slice())
    }
}

pub fn gap_score(cv_vector: &[f32], jd_vector: &[f32]) -> f32 {
    cosine_similarity(cv_vector, jd_vector)
}

/// Picks the catalog job most similar to an already-embedded CV.
/// Only strictly positive similarities qualify; the first job wins a tie.
pub async fn best_match(
    rag: &RagPipeline,
    cv_vector: &[f32],
    catalog: &JobCatalog,
) -> Result<Option<JobMatch>, RagError> {
    let job_vectors = catalog.vectors(rag).await?;
    let mut best: Option<JobMatch> = None;

    for (job, job_vector) in catalog.jobs().iter().zip(job_vectors) {
        let score = cosine_similarity(cv_vector, job_vector);
        let current_best = best.as_ref().map(|m| m.score).unwrap_or(0.0);
        if score > current_best {
            best = Some(JobMatch {
                title: job.title.clone(),
                description: job.description.clone(),
                score,
            });
        }
    }

    Ok(best)
}

/// Scores a CV against a job description and the job catalog.
pub async fn screen(
    rag: &RagPipeline,
    catalog: &JobCatalog,
    cv_text: &str,
    jd_text: &str,
) -> Result<ScreeningReport, RagError> {
    if cv_text.trim().is_empty() {
        return Err(RagError::Validation("cv_text cannot be empty".to_string()));
    }
    if jd_text.trim().is_empty() {
        return Err(RagError::Validation("jd_text cannot be empty".to_string()));
    }

    let cv_vector = rag.embed(cv_text).await?;
    let jd_vector = rag.embed(jd_text).await?;

    let gap_score = gap_score(&cv_vector, &jd_vector);
    let best_match = best_match(rag, &cv_vector, catalog).await?;

    info!(
        gap_score,
        best_match = best_match.as_ref().map(|m| m.title.as_str()).unwrap_or("none"),
        "screening complete"
    );

    Ok(ScreeningReport {
        gap_score,
        best_match,
        jobs_compared: catalog.len(),
    })
}
