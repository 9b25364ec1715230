use nalgebra::DVector;

/// A fixed-length array of per-element scalars (implicit terms, explicit
/// terms, or constant terms). Physically just contiguous doubles; the
/// wrapper exists so callers index with bounds checking instead of raw
/// pointer-into-buffer offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermBuffer {
    values: Vec<f64>,
}

impl TermBuffer {
    pub fn zeros(len: usize) -> Self {
        Self { values: vec![0.0; len] }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One complete snapshot of the system state: per-element term buffers and
/// the global nodal-unknown vector, indexed by global column.
#[derive(Debug, Clone)]
pub struct Solution {
    pub t: f64,
    pub unknowns: DVector<f64>,
    pub implicit: Vec<TermBuffer>,
    pub explicit: Vec<TermBuffer>,
    pub constant: Vec<TermBuffer>,
}

impl Solution {
    pub fn zeros(num_dofs: usize, element_term_sizes: &[(usize, usize, usize)]) -> Self {
        Self {
            t: 0.0,
            unknowns: DVector::zeros(num_dofs),
            implicit: element_term_sizes.iter().map(|&(n, _, _)| TermBuffer::zeros(n)).collect(),
            explicit: element_term_sizes.iter().map(|&(_, n, _)| TermBuffer::zeros(n)).collect(),
            constant: element_term_sizes.iter().map(|&(_, _, n)| TermBuffer::zeros(n)).collect(),
        }
    }
}
