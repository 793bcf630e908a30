use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A search result: the chunk position and its squared L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub distance: f32,
}

/// Brute-force index over fixed-dimension vectors, searched by squared Euclidean distance.
///
/// Vectors are addressed by insertion position, which is how chunks are identified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Appends vectors; the batch is rejected as a whole if any vector has the wrong dimension.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), AppError> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::VectorIndex(format!(
                "vector dimension {} does not match index dimension {}",
                bad.len(),
                self.dimension
            )));
        }
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Returns up to `k` nearest vectors, closest first. Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, AppError> {
        if query.len() != self.dimension {
            return Err(AppError::VectorIndex(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatL2Index {
        let mut index = FlatL2Index::new(2);
        index
            .add(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0]])
            .expect("add vectors");
        index
    }

    #[test]
    fn returns_nearest_first() {
        let hits = sample_index().search(&[0.9, 0.1], 2).expect("search");
        let positions: Vec<usize> = hits.iter().map(|hit| hit.position).collect();
        assert_eq!(positions, vec![1, 0]);
        assert!((hits[0].distance - 0.02).abs() < 1e-6);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let hits = sample_index().search(&[0.0, 0.0], 10).expect("search");
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut index = FlatL2Index::new(1);
        index
            .add(vec![vec![1.0], vec![-1.0], vec![1.0]])
            .expect("add vectors");
        let hits = index.search(&[0.0], 3).expect("search");
        let positions: Vec<usize> = hits.iter().map(|hit| hit.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn empty_index_yields_no_hits() {
        let index = FlatL2Index::new(4);
        assert!(index.is_empty());
        assert!(index.search(&[0.0; 4], 3).expect("search").is_empty());
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut index = sample_index();
        assert!(matches!(
            index.search(&[1.0, 2.0, 3.0], 1),
            Err(AppError::VectorIndex(_))
        ));
        assert!(index.add(vec![vec![1.0, 1.0], vec![1.0]]).is_err());
        assert_eq!(index.len(), 3);
    }
}
