//! Sparse linear system solver with cached symbolic factorization.

use faer::prelude::*;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::DVector;

use crate::error::{Error, Result};

/// Sparse LU solver bound to one sparsity pattern.
///
/// Construction computes the symbolic factorization from the triplet
/// pattern; every [`solve`](CachedSparseLu::solve) then performs only the
/// numeric factorization and triangular solves. Callers must keep the
/// `(row, col)` positions of the triplets fixed and rebuild this object when
/// the pattern changes.
pub struct CachedSparseLu {
    size: usize,
    symbolic: SymbolicLu<usize>,
}

impl CachedSparseLu {
    /// Build the symbolic factorization for an `size` x `size` system with
    /// the sparsity pattern of `triplets`. Duplicate positions are summed.
    pub fn new(size: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        let mat = assemble(size, triplets)?;
        let symbolic = SymbolicLu::try_new(mat.symbolic())
            .map_err(|e| Error::Factorization(format!("symbolic analysis: {e:?}")))?;
        Ok(CachedSparseLu { size, symbolic })
    }

    /// System size this solver was analyzed for.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Numerically factorize the matrix given by `triplets` and solve
    /// against `rhs`.
    pub fn solve(&self, triplets: &[(usize, usize, f64)], rhs: &DVector<f64>) -> Result<DVector<f64>> {
        if rhs.len() != self.size {
            return Err(Error::DimensionMismatch {
                expected: self.size,
                actual: rhs.len(),
            });
        }

        let mat = assemble(self.size, triplets)?;
        let lu = Lu::try_new_with_symbolic(self.symbolic.clone(), mat.as_ref())
            .map_err(|e| Error::Factorization(format!("numeric factorization: {e:?}")))?;

        let b = Col::<f64>::from_fn(self.size, |i| rhs[i]);
        let x = lu.solve(&b);

        for i in 0..self.size {
            if !x[i].is_finite() {
                return Err(Error::Solve(format!("non-finite solution component at row {i}")));
            }
        }

        Ok(DVector::from_fn(self.size, |i, _| x[i]))
    }
}

/// Convert triplets to a faer column-compressed matrix.
fn assemble(size: usize, triplets: &[(usize, usize, f64)]) -> Result<SparseColMat<usize, f64>> {
    let faer_triplets: Vec<_> = triplets
        .iter()
        .map(|&(r, c, v)| Triplet::new(r, c, v))
        .collect();

    SparseColMat::<usize, f64>::try_new_from_triplets(size, size, &faer_triplets)
        .map_err(|e| Error::Factorization(format!("matrix assembly: {e:?}")))
}
