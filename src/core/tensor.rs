// src/core/tensor.rs
//! Dense, rank-tagged tensors of symbolic expressions over a fixed
//! coordinate basis.
//!
//! Tensors are plain owned values. Stages receive `&Tensor` and build fresh
//! outputs; nothing hands out interior mutability, so one stage can never
//! scribble over another stage's storage.

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::simplify::Simplifier;

/// Ordered coordinate labels; fixes dimension and index ordering for every
/// derived tensor. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateBasis {
    names: Vec<String>,
}

/// Default basis when a request does not name its coordinates.
pub const DEFAULT_COORDS: [&str; 4] = ["t", "r", "theta", "phi"];

impl CoordinateBasis {
    pub fn new(names: Vec<String>) -> Result<Self, CoreError> {
        if names.is_empty() {
            return Err(CoreError::dimension_mismatch("coordinate basis must not be empty"));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(CoreError::dimension_mismatch(format!(
                    "duplicate coordinate name '{}'",
                    name
                )));
            }
        }
        Ok(CoordinateBasis { names })
    }

    pub fn default_four() -> Self {
        CoordinateBasis { names: DEFAULT_COORDS.iter().map(|s| s.to_string()).collect() }
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    rank: usize,
    dim: usize,
    data: Vec<Expr>,
}

impl Tensor {
    /// Dense zero tensor; symbolic zeros are stored, not elided.
    pub fn zeros(rank: usize, dim: usize) -> Self {
        let len = dim.pow(rank as u32);
        Tensor { rank, dim, data: vec![Expr::zero(); len] }
    }

    pub fn scalar(value: Expr) -> Self {
        Tensor { rank: 0, dim: 1, data: vec![value] }
    }

    pub fn from_rank2(rows: Vec<Vec<Expr>>) -> Result<Self, CoreError> {
        let dim = rows.len();
        for row in &rows {
            if row.len() != dim {
                return Err(CoreError::dimension_mismatch(format!(
                    "expected a {0}x{0} grid, found a row of length {1}",
                    dim,
                    row.len()
                )));
            }
        }
        Ok(Tensor { rank: 2, dim, data: rows.into_iter().flatten().collect() })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn offset(&self, idx: &[usize]) -> usize {
        debug_assert_eq!(idx.len(), self.rank);
        let mut offset = 0;
        for &i in idx {
            debug_assert!(i < self.dim);
            offset = offset * self.dim + i;
        }
        offset
    }

    pub fn get(&self, idx: &[usize]) -> &Expr {
        &self.data[self.offset(idx)]
    }

    pub fn set(&mut self, idx: &[usize], value: Expr) {
        let offset = self.offset(idx);
        self.data[offset] = value;
    }

    /// All index tuples in row-major order.
    pub fn indices(&self) -> IndexIter {
        IndexIter { rank: self.rank, dim: self.dim, next: Some(vec![0; self.rank]) }
    }

    /// External interfaces expose only the nonzero components.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Vec<usize>, &Expr)> {
        self.indices().filter_map(move |idx| {
            let expr = self.get(&idx);
            if expr.is_zero() {
                None
            } else {
                Some((idx, expr))
            }
        })
    }

    pub fn nonzero_count(&self) -> usize {
        self.data.iter().filter(|e| !e.is_zero()).count()
    }

    /// Serialization key: "ab" for rank 2, "a_bc" for rank 3, "a_bcd" for
    /// rank 4 (first index is the contravariant slot).
    pub fn index_key(&self, idx: &[usize]) -> String {
        match idx.len() {
            0 => String::new(),
            1 | 2 => idx.iter().map(|i| i.to_string()).collect(),
            _ => {
                let tail: String = idx[1..].iter().map(|i| i.to_string()).collect();
                format!("{}_{}", idx[0], tail)
            }
        }
    }

    /// Applies the simplifier to every component, producing a new tensor.
    pub fn simplified(&self, simplifier: &mut Simplifier) -> Result<Tensor, CoreError> {
        let mut data = Vec::with_capacity(self.data.len());
        for expr in &self.data {
            data.push(simplifier.simplify(expr)?);
        }
        Ok(Tensor { rank: self.rank, dim: self.dim, data })
    }

    /// True when every component is the literal zero expression.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|e| e.is_zero())
    }
}

pub struct IndexIter {
    rank: usize,
    dim: usize,
    next: Option<Vec<usize>>,
}

impl Iterator for IndexIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        if self.rank > 0 {
            let mut following = current.clone();
            for slot in (0..self.rank).rev() {
                following[slot] += 1;
                if following[slot] < self.dim {
                    self.next = Some(following);
                    break;
                }
                following[slot] = 0;
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simplify::SimplifyOptions;

    #[test]
    fn basis_rejects_duplicates() {
        let err = CoordinateBasis::new(vec!["t".into(), "r".into(), "t".into()]).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch(_)));
    }

    #[test]
    fn dense_storage_round_trips() {
        let mut tensor = Tensor::zeros(3, 4);
        tensor.set(&[1, 2, 3], Expr::sym("x"));
        assert_eq!(tensor.get(&[1, 2, 3]), &Expr::sym("x"));
        assert!(tensor.get(&[3, 2, 1]).is_zero());
        assert_eq!(tensor.nonzero_count(), 1);
    }

    #[test]
    fn index_iteration_covers_all_components() {
        let tensor = Tensor::zeros(2, 3);
        assert_eq!(tensor.indices().count(), 9);
        let tensor = Tensor::zeros(4, 2);
        assert_eq!(tensor.indices().count(), 16);
    }

    #[test]
    fn index_keys_by_rank() {
        let t2 = Tensor::zeros(2, 4);
        assert_eq!(t2.index_key(&[0, 3]), "03");
        let t3 = Tensor::zeros(3, 4);
        assert_eq!(t3.index_key(&[1, 0, 2]), "1_02");
        let t4 = Tensor::zeros(4, 4);
        assert_eq!(t4.index_key(&[0, 1, 2, 3]), "0_123");
    }

    #[test]
    fn clone_is_a_deep_value_copy() {
        // stage-boundary aliasing guard: mutating the original must never
        // show through a copy that crossed a boundary
        let mut original = Tensor::zeros(2, 2);
        original.set(&[0, 0], Expr::sym("a"));
        let passed_on = original.clone();
        original.set(&[0, 0], Expr::sym("clobbered"));
        assert_eq!(passed_on.get(&[0, 0]), &Expr::sym("a"));
    }

    #[test]
    fn simplified_applies_per_component() {
        let mut tensor = Tensor::zeros(2, 2);
        tensor.set(&[0, 1], crate::core::parser::parse_expression("r - r").unwrap());
        let mut simplifier = Simplifier::new(SimplifyOptions::enabled());
        let out = tensor.simplified(&mut simplifier).unwrap();
        assert!(out.is_zero());
    }
}
