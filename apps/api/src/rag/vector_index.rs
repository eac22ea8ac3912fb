//! Session-scoped vector storage.
//!
//! `VectorIndex` is the seam between the pipeline and the nearest-neighbour structure.
//! `FlatIndex` is the default backend: a brute-force scan, fine for the chunk counts of a
//! single document. A tree or graph index can be dropped in behind the same trait.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rag::chunker::Chunk;
use crate::rag::errors::RagError;

pub type Vector = Vec<f32>;

/// Distance used to rank stored vectors against a query. Smaller is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// L2 distance
    #[default]
    Euclidean,
    /// 1 - cosine similarity
    Cosine,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(format!(
                "unknown distance metric '{other}' (expected 'euclidean' or 'cosine')"
            )),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Euclidean => f.write_str("euclidean"),
            DistanceMetric::Cosine => f.write_str("cosine"),
        }
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Cosine similarity in [-1, 1]. Zero-magnitude inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Append-only nearest-neighbour index for one session.
pub trait VectorIndex: Send + Sync {
    /// Established dimensionality, `None` until the first successful `add`.
    fn dimension(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends all entries or none of them.
    fn add(&mut self, entries: Vec<(Vector, Chunk)>) -> Result<(), RagError>;

    /// Up to `k` entries ordered by non-decreasing distance; ties keep insertion order.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError>;
}

/// Brute-force index: every query scans every stored vector.
#[derive(Debug, Default)]
pub struct FlatIndex {
    metric: DistanceMetric,
    dimension: Option<usize>,
    vectors: Vec<Vector>,
    chunks: Vec<Chunk>,
}

impl FlatIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn add(&mut self, entries: Vec<(Vector, Chunk)>) -> Result<(), RagError> {
        let Some((first, _)) = entries.first() else {
            return Ok(());
        };
        let expected = self.dimension.unwrap_or(first.len());

        // Validate the whole batch before mutating anything
        for (position, (vector, _)) in entries.iter().enumerate() {
            if vector.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(RagError::NonFiniteVector { position });
            }
        }

        self.dimension = Some(expected);
        self.vectors.reserve(entries.len());
        self.chunks.reserve(entries.len());
        for (vector, chunk) in entries {
            self.vectors.push(vector);
            self.chunks.push(chunk);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(RagError::NonFiniteVector { position: 0 });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, self.metric.distance(query, v)))
            .collect();

        // sort_by is stable, so equal distances stay in insertion order
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                chunk: self.chunks[i].clone(),
                distance,
            })
            .collect())
    }
}
