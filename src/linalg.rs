//! Row-major matrix container and the plaintext integer algebra the plant
//! runs on.

use std::ops::Index;

use crate::error::{ControlError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Matrix<T> {
    /// Build from row vectors. Ragged input is rejected.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for row in rows {
            if row.len() != cols {
                return Err(ControlError::DimensionMismatch { expected: cols, got: row.len() });
            }
            data.extend(row);
        }
        Ok(Self { rows: n_rows, cols, data })
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ControlError::DimensionMismatch { expected: rows * cols, got: data.len() });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        if i < self.rows && j < self.cols {
            self.data.get(i * self.cols + j)
        } else {
            None
        }
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Exactly `rows` slices, empty ones for an r×0 matrix.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Matrix<U> {
        Matrix { rows: self.rows, cols: self.cols, data: self.data.iter().map(f).collect() }
    }

    pub fn try_map<U, F: FnMut(&T) -> Result<U>>(&self, f: F) -> Result<Matrix<U>> {
        let data = self.data.iter().map(f).collect::<Result<Vec<_>>>()?;
        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.rows && j < self.cols, "index ({i}, {j}) out of bounds for {}x{}", self.rows, self.cols);
        &self.data[i * self.cols + j]
    }
}

impl Matrix<i64> {
    pub fn identity(n: usize) -> Self {
        let mut data = vec![0; n * n];
        for i in 0..n {
            data[i * n + i] = 1;
        }
        Self { rows: n, cols: n, data }
    }

    /// `M·v`.
    pub fn mul_vec(&self, v: &[i64]) -> Result<Vec<i64>> {
        if v.len() != self.cols {
            return Err(ControlError::DimensionMismatch { expected: self.cols, got: v.len() });
        }
        self.iter_rows().map(|row| dot(row, v)).collect()
    }

    /// `M·N`.
    pub fn mul_mat(&self, other: &Matrix<i64>) -> Result<Matrix<i64>> {
        if other.rows != self.cols {
            return Err(ControlError::DimensionMismatch { expected: self.cols, got: other.rows });
        }
        let mut data = vec![0i64; self.rows * other.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0 {
                    continue;
                }
                for j in 0..other.cols {
                    let idx = i * other.cols + j;
                    let acc = data[idx];
                    data[idx] = a
                        .checked_mul(other.data[k * other.cols + j])
                        .and_then(|p| acc.checked_add(p))
                        .ok_or(ControlError::Overflow("matrix product"))?;
                }
            }
        }
        Ok(Matrix { rows: self.rows, cols: other.cols, data })
    }

    /// `M + N`.
    pub fn add(&self, other: &Matrix<i64>) -> Result<Matrix<i64>> {
        if (self.rows, self.cols) != (other.rows, other.cols) {
            return Err(ControlError::DimensionMismatch {
                expected: self.rows * self.cols,
                got: other.rows * other.cols,
            });
        }
        let data = self.data.iter()
            .zip(&other.data)
            .map(|(a, b)| a.checked_add(*b).ok_or(ControlError::Overflow("matrix sum")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }
}

pub fn vec_add(a: &[i64], b: &[i64]) -> Result<Vec<i64>> {
    if a.len() != b.len() {
        return Err(ControlError::DimensionMismatch { expected: a.len(), got: b.len() });
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| x.checked_add(*y).ok_or(ControlError::Overflow("vector sum")))
        .collect()
}

fn dot(row: &[i64], v: &[i64]) -> Result<i64> {
    row.iter().zip(v).try_fold(0i64, |acc, (a, b)| {
        a.checked_mul(*b)
            .and_then(|p| acc.checked_add(p))
            .ok_or(ControlError::Overflow("matrix-vector product"))
    })
}
