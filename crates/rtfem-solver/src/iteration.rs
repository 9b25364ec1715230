use nalgebra::DVector;

/// Tracks Newton-loop convergence: `err = max_i |du_i| / obj_i`, where `du_i`
/// is the increment the linear solve just produced for DOF `i`.
#[derive(Debug, Clone)]
pub struct IterationController {
    pub tolerance: f64,
    pub divergence_cap: f64,
    pub max_iterations: u32,
    pub max_repetitions: u32,
}

impl Default for IterationController {
    fn default() -> Self {
        Self { tolerance: 1e-6, divergence_cap: 1e8, max_iterations: 20, max_repetitions: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationOutcome {
    Converged,
    Continue,
    Diverged,
}

impl IterationController {
    pub fn error_metric(&self, increment: &DVector<f64>, objectives: &[f64]) -> f64 {
        increment
            .iter()
            .enumerate()
            .map(|(i, &du)| {
                let obj = objectives.get(i).copied().unwrap_or(1.0);
                (du / obj).abs()
            })
            .fold(0.0, f64::max)
    }

    pub fn classify(&self, err: f64, iteration: u32) -> IterationOutcome {
        if err <= self.tolerance {
            IterationOutcome::Converged
        } else if err > self.divergence_cap || iteration >= self.max_iterations {
            IterationOutcome::Diverged
        } else {
            IterationOutcome::Continue
        }
    }
}
