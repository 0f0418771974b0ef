use num::Float;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::sort::radix_sort_u32_soa;

/// SparseVec
/// Sparse vector over a fixed dimension with zero as the implicit element.
///
/// Indices are kept strictly ascending and every stored value is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVec<N = f32>
where
    N: Float,
{
    inds: Vec<u32>,
    vals: Vec<N>,
    len: u32,
}

impl<N> SparseVec<N>
where
    N: Float,
{
    /// All-zero vector of dimension `len`.
    pub fn zeros(len: u32) -> Self {
        Self { inds: Vec::new(), vals: Vec::new(), len }
    }

    /// Build from unordered `(index, value)` pairs.
    /// Duplicate indices are summed and zeros dropped.
    /// Fails if an index falls outside `[0, len)`.
    pub fn from_pairs(len: u32, pairs: Vec<(u32, N)>) -> Result<Self> {
        let (mut inds, mut vals): (Vec<u32>, Vec<N>) = pairs.into_iter().unzip();
        if let Some(&bad) = inds.iter().find(|&&i| i >= len) {
            return Err(Error::DimensionMismatch { expected: len as usize, found: bad as usize + 1 });
        }
        radix_sort_u32_soa(&mut inds, &mut vals);

        let mut out = Self { inds: Vec::with_capacity(inds.len()), vals: Vec::with_capacity(vals.len()), len };
        for (i, v) in inds.into_iter().zip(vals) {
            if out.inds.last().copied() == Some(i) {
                if let Some(acc) = out.vals.last_mut() {
                    *acc = *acc + v;
                }
            } else {
                out.inds.push(i);
                out.vals.push(v);
            }
        }
        out.drop_zeros();
        Ok(out)
    }

    fn drop_zeros(&mut self) {
        if self.vals.iter().all(|v| !v.is_zero()) {
            return;
        }
        let (inds, vals) = self
            .inds
            .iter()
            .zip(&self.vals)
            .filter(|(_, v)| !v.is_zero())
            .map(|(i, v)| (*i, *v))
            .unzip();
        self.inds = inds;
        self.vals = vals;
    }

    /// Dimension of the vector.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.inds
    }

    #[inline]
    pub fn values(&self) -> &[N] {
        &self.vals
    }

    /// Iterate `(index, value)` over non-zero entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, N)> + '_ {
        self.inds.iter().copied().zip(self.vals.iter().copied())
    }

    /// Value at `index`; zero when absent or out of range.
    pub fn get(&self, index: u32) -> N {
        match self.inds.binary_search(&index) {
            Ok(pos) => self.vals[pos],
            Err(_) => N::zero(),
        }
    }

    /// Dot product with a dense row of the same dimension.
    #[inline]
    pub fn dot_dense(&self, dense: &[N]) -> N {
        self.iter()
            .fold(N::zero(), |acc, (i, v)| acc + v * dense[i as usize])
    }

    pub fn norm_l2(&self) -> N {
        self.vals.iter().fold(N::zero(), |acc, &v| acc + v * v).sqrt()
    }

    /// Scale to unit L2 norm; the zero vector is left unchanged.
    pub fn normalize_l2(&mut self) {
        let norm = self.norm_l2();
        if norm > N::zero() {
            for v in self.vals.iter_mut() {
                *v = *v / norm;
            }
        }
    }
}

/// Row-major matrix of sparse rows sharing one column dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix<N = f32>
where
    N: Float,
{
    rows: Vec<SparseVec<N>>,
    n_features: usize,
}

impl<N> FeatureMatrix<N>
where
    N: Float,
{
    /// Fails with [`Error::DimensionMismatch`] if any row width differs from `n_features`.
    pub fn new(rows: Vec<SparseVec<N>>, n_features: usize) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.len() != n_features) {
            return Err(Error::DimensionMismatch { expected: n_features, found: row.len() });
        }
        Ok(Self { rows, n_features })
    }

    /// (n_samples, n_features)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.n_features)
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn rows(&self) -> &[SparseVec<N>] {
        &self.rows
    }
}
