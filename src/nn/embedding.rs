//! Lookup table mapping series identities to dense vectors.

use ndarray::{Array2, ArrayView1};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::error::{ForecastError, Result};

/// Embedding table `[num_embeddings, embedding_dim]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    table: Array2<f64>,
}

impl Embedding {
    /// Create a table with entries drawn from `N(0, 1)`.
    pub fn new<R: Rng + ?Sized>(num_embeddings: usize, embedding_dim: usize, rng: &mut R) -> Self {
        Self {
            table: Array2::random_using((num_embeddings, embedding_dim), StandardNormal, rng),
        }
    }

    pub fn from_table(table: Array2<f64>) -> Self {
        Self { table }
    }

    pub fn num_embeddings(&self) -> usize {
        self.table.nrows()
    }

    pub fn embedding_dim(&self) -> usize {
        self.table.ncols()
    }

    pub fn table(&self) -> &Array2<f64> {
        &self.table
    }

    /// Gather one row per id, producing `[ids.len(), embedding_dim]`.
    ///
    /// Fails with [`ForecastError::IndexOutOfBounds`] on the first id outside the table.
    pub fn lookup(&self, ids: ArrayView1<usize>) -> Result<Array2<f64>> {
        let size = self.num_embeddings();
        if let Some(&index) = ids.iter().find(|&&id| id >= size) {
            return Err(ForecastError::IndexOutOfBounds { index, size });
        }
        let mut out = Array2::zeros((ids.len(), self.embedding_dim()));
        for (mut row, &id) in out.rows_mut().into_iter().zip(ids.iter()) {
            row.assign(&self.table.row(id));
        }
        Ok(out)
    }
}
