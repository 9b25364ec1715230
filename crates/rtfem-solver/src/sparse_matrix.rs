use std::collections::HashMap;

use nalgebra::DMatrix;

use rtfem_core::{Element, Mesh, INACTIVE};

use crate::backend::SparseTripletsF64;

/// The assembled sparsity pattern plus nonzero values, held in a
/// backend-neutral coordinate form. Built once per mesh; values are zeroed
/// and re-scattered every tangent assembly.
pub struct SparseMatrix {
    pub nrows: usize,
    pub ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
    index: HashMap<(usize, usize), usize>,
}

impl SparseMatrix {
    /// Builds the pattern as the union, over every element, of the full
    /// rectangular block `{row_i} x {col_j}` implied by that element's DOF
    /// map. `-1` sentinels never contribute a pattern entry.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let n = mesh.num_dofs();
        let mut index: HashMap<(usize, usize), usize> = HashMap::new();
        let mut rows = Vec::new();
        let mut cols = Vec::new();

        for element in mesh.elements() {
            active_row_col_pairs(element, |row, col| {
                index.entry((row, col)).or_insert_with(|| {
                    rows.push(row);
                    cols.push(col);
                    rows.len() - 1
                });
            });
        }

        let values = vec![0.0; rows.len()];
        Self { nrows: n, ncols: n, rows, cols, values, index }
    }

    pub fn zero_values(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Adds a dense `(nn*neq) x (nn*neq)` element block into the global
    /// matrix using the element's local-to-global row/column map. Entries
    /// touching an inactive (`-1`) slot are silently skipped.
    pub fn scatter_add(&mut self, element: &Element, block: &DMatrix<f64>) {
        let n = element.local_dof_count();
        for i in 0..n {
            let (row, _) = element.dof_map.get(i);
            if row == INACTIVE {
                continue;
            }
            for j in 0..n {
                let (_, col) = element.dof_map.get(j);
                if col == INACTIVE {
                    continue;
                }
                if let Some(&idx) = self.index.get(&(row as usize, col as usize)) {
                    self.values[idx] += block[(i, j)];
                }
            }
        }
    }

    /// Turns `row` into an identity row (1.0 on the diagonal, 0.0 elsewhere)
    /// so that solving with a zeroed RHS entry leaves that unknown unchanged.
    /// Used to enforce Dirichlet conditions without eliminating DOFs from
    /// the system.
    pub fn clamp_row(&mut self, row: usize) {
        for (i, &r) in self.rows.iter().enumerate() {
            if r == row {
                self.values[i] = if self.cols[i] == row { 1.0 } else { 0.0 };
            }
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn to_triplets(&self) -> SparseTripletsF64 {
        SparseTripletsF64 {
            nrows: self.nrows,
            ncols: self.ncols,
            row_indices: self.rows.clone(),
            col_indices: self.cols.clone(),
            values: self.values.clone(),
        }
    }

    #[cfg(test)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.index.get(&(row, col)).map(|&idx| self.values[idx]).unwrap_or(0.0)
    }
}

fn active_row_col_pairs(element: &Element, mut visit: impl FnMut(usize, usize)) {
    let n = element.local_dof_count();
    for i in 0..n {
        let (row, _) = element.dof_map.get(i);
        if row == INACTIVE {
            continue;
        }
        for j in 0..n {
            let (_, col) = element.dof_map.get(j);
            if col == INACTIVE {
                continue;
            }
            visit(row as usize, col as usize);
        }
    }
}
