//! Matrix containers carried by simulation configurations.
//!
//! Both layouts are column-major, matching the way numerical solvers index
//! voxel-major state: column `j` of `u0` is the species vector of cell `j`.

use serde::{Deserialize, Serialize};

/// Dense column-major matrix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenseMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Column-major entries, `rows * cols` long.
    pub data: Vec<f64>,
}

/// Shared empty matrix used when an optional input is absent.
pub static EMPTY_DENSE: DenseMatrix = DenseMatrix {
    rows: 0,
    cols: 0,
    data: Vec::new(),
};

impl DenseMatrix {
    /// Creates a matrix from column-major data.
    ///
    /// Returns `None` when `data.len() != rows * cols`.
    #[must_use]
    pub fn from_column_major(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (rows.checked_mul(cols)? == data.len()).then_some(Self { rows, cols, data })
    }

    /// Creates a zero-filled matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Returns true if the matrix has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the declared shape matches the stored entry count.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.rows.checked_mul(self.cols) == Some(self.data.len())
    }

    /// Returns the entry at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(col.checked_mul(self.rows)?.checked_add(row)?).copied()
    }

    /// Returns column `col` as a slice.
    #[must_use]
    pub fn column(&self, col: usize) -> Option<&[f64]> {
        if col >= self.cols {
            return None;
        }
        let start = col.checked_mul(self.rows)?;
        self.data.get(start..start.checked_add(self.rows)?)
    }

    /// Shape as `"RxC"`, used in diagnostics.
    #[must_use]
    pub fn shape(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }
}

/// Sparse matrix in compressed-sparse-column form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SparseMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Column start offsets into `row_idx`/`values`, `cols + 1` long.
    pub col_ptr: Vec<usize>,
    /// Row index of each stored entry.
    pub row_idx: Vec<usize>,
    /// Stored entries.
    pub values: Vec<f64>,
}

impl Default for SparseMatrix {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            col_ptr: vec![0],
            row_idx: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl SparseMatrix {
    /// Creates an all-zero sparse matrix of the given shape.
    ///
    /// Returns `None` if `cols + 1` overflows.
    #[must_use]
    pub fn empty(rows: usize, cols: usize) -> Option<Self> {
        Some(Self {
            rows,
            cols,
            col_ptr: vec![0; cols.checked_add(1)?],
            row_idx: Vec::new(),
            values: Vec::new(),
        })
    }

    /// Builds a matrix from `(row, col, value)` triplets.
    ///
    /// Entries are sorted by column then row; duplicates are summed.
    /// Returns `None` if any index is out of bounds or `cols + 1` overflows.
    #[must_use]
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Option<Self> {
        let ptr_len = cols.checked_add(1)?;
        let mut sorted = triplets.to_vec();
        if sorted.iter().any(|&(r, c, _)| r >= rows || c >= cols) {
            return None;
        }
        sorted.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));

        let mut col_ptr = vec![0; ptr_len];
        let mut row_idx: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;

        for (r, c, v) in sorted {
            if last == Some((r, c)) {
                if let Some(slot) = values.last_mut() {
                    *slot += v;
                }
                continue;
            }
            row_idx.push(r);
            values.push(v);
            col_ptr[c + 1] += 1;
            last = Some((r, c));
        }
        for c in 0..cols {
            col_ptr[c + 1] += col_ptr[c];
        }

        Some(Self {
            rows,
            cols,
            col_ptr,
            row_idx,
            values,
        })
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the matrix has zero rows or columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Checks the CSC structure: pointer length, monotonic offsets, and
    /// in-bounds row indices.
    pub fn check_structure(&self) -> Result<(), String> {
        let Some(ptr_len) = self.cols.checked_add(1) else {
            return Err(format!("{} columns cannot be indexed", self.cols));
        };
        if self.col_ptr.len() != ptr_len {
            return Err(format!(
                "col_ptr has {} entries, expected {ptr_len}",
                self.col_ptr.len()
            ));
        }
        if self.row_idx.len() != self.values.len() {
            return Err("row_idx and values differ in length".to_string());
        }
        if self.col_ptr.first() != Some(&0) || self.col_ptr.last() != Some(&self.values.len()) {
            return Err("col_ptr must start at 0 and end at nnz".to_string());
        }
        if self.col_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err("col_ptr must be non-decreasing".to_string());
        }
        if let Some(r) = self.row_idx.iter().find(|&&r| r >= self.rows) {
            return Err(format!("row index {r} out of bounds for {} rows", self.rows));
        }
        Ok(())
    }

    /// Entry at `(row, col)`, zero when not stored.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if col >= self.cols {
            return 0.0;
        }
        let (Some(&start), Some(&end)) = (self.col_ptr.get(col), self.col_ptr.get(col + 1)) else {
            return 0.0;
        };
        self.row_idx
            .get(start..end)
            .and_then(|rows| rows.iter().position(|&r| r == row))
            .and_then(|i| self.values.get(start + i).copied())
            .unwrap_or(0.0)
    }

    /// Shape as `"RxC"`, used in diagnostics.
    #[must_use]
    pub fn shape(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }
}
