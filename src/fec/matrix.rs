// SPDX-License-Identifier: MPL-2.0

//! Dense matrices over GF(2^8)

use crate::errors::FecError;
use reed_solomon_erasure::galois_8;

/// Multiplicative inverse of a nonzero element
fn inv(a: u8) -> u8 {
    galois_8::div(1, a)
}

/// Row-major matrix of field elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1);
        }
        m
    }

    /// Systematic Cauchy generator of `total` rows by `k` columns
    ///
    /// The top `k` rows are the identity. Row `i >= k` holds
    /// `1 / (i ^ j)` in column `j`, so any `k` rows form an invertible matrix.
    /// Callers guarantee `k <= total <= 256`.
    pub fn cauchy(total: usize, k: usize) -> Self {
        let mut m = Self::zeros(total, k);
        for i in 0..k {
            m.set(i, i, 1);
        }
        for i in k..total {
            for j in 0..k {
                m.set(i, j, inv((i ^ j) as u8));
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Matrix built from the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for &r in rows {
            data.extend_from_slice(self.row(r));
        }
        Self {
            rows: rows.len(),
            cols: self.cols,
            data,
        }
    }

    /// Gauss-Jordan inversion of a square matrix
    pub fn invert(&self) -> Result<Self, FecError> {
        if self.rows != self.cols {
            return Err(FecError::SingularMatrix);
        }
        let n = self.rows;
        let mut work = self.clone();
        let mut out = Self::identity(n);

        for col in 0..n {
            let pivot = (col..n)
                .find(|&r| work.get(r, col) != 0)
                .ok_or(FecError::SingularMatrix)?;
            if pivot != col {
                work.swap_rows(pivot, col);
                out.swap_rows(pivot, col);
            }

            let scale = inv(work.get(col, col));
            for c in 0..n {
                work.set(col, c, galois_8::mul(work.get(col, c), scale));
                out.set(col, c, galois_8::mul(out.get(col, c), scale));
            }

            for r in 0..n {
                let factor = work.get(r, col);
                if r == col || factor == 0 {
                    continue;
                }
                for c in 0..n {
                    let w = work.get(r, c) ^ galois_8::mul(factor, work.get(col, c));
                    work.set(r, c, w);
                    let o = out.get(r, c) ^ galois_8::mul(factor, out.get(col, c));
                    out.set(r, c, o);
                }
            }
        }

        Ok(out)
    }

    #[cfg(test)]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = Self::zeros(self.rows, other.cols);
        for r in 0..self.rows {
            for c in 0..other.cols {
                let mut acc = 0u8;
                for i in 0..self.cols {
                    acc ^= galois_8::mul(self.get(r, i), other.get(i, c));
                }
                out.set(r, c, acc);
            }
        }
        out
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }
}
