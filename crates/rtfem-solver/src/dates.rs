/// The monotone sequence of times the Driver must land on exactly, in order.
#[derive(Debug, Clone)]
pub struct Dates {
    values: Vec<f64>,
}

impl Dates {
    pub fn new(values: Vec<f64>) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]), "dates must be strictly increasing");
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    /// Largest index `k` with `date[k] <= t`, used to resume after a restart.
    pub fn index_at_or_before(&self, t: f64) -> usize {
        match self.values.binary_search_by(|probe| probe.partial_cmp(&t).unwrap()) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }
}

/// Per-equation target change over one accepted step, used by
/// [`TimeStepController`] and [`crate::iteration::IterationController`].
#[derive(Debug, Clone)]
pub struct Objectives {
    pub values: Vec<f64>,
}

/// Adapts `dt` from the ratio of the last step's actual change to the
/// user-declared objective change, clamped to `[dt_min, dt_max]` and to the
/// remaining time in the current date interval.
#[derive(Debug, Clone)]
pub struct TimeStepController {
    pub dt_min: f64,
    pub dt_max: f64,
    pub dt_ini: f64,
    pub reduction_factor: f64,
    pub raise_cap: f64,
    pub target_ratio: f64,
}

impl Default for TimeStepController {
    fn default() -> Self {
        Self {
            dt_min: 1e-12,
            dt_max: f64::INFINITY,
            dt_ini: 1.0,
            reduction_factor: 0.5,
            raise_cap: 2.0,
            target_ratio: 1.0,
        }
    }
}

impl TimeStepController {
    /// `ratio = max_i |du_i| / obj_i` over the last accepted step.
    pub fn next_dt(&self, previous_dt: f64, ratio: f64, t: f64, next_date: f64) -> f64 {
        let scale = if ratio <= 0.0 {
            self.raise_cap
        } else {
            (self.target_ratio / ratio).clamp(self.reduction_factor, self.raise_cap)
        };
        let mut dt = (previous_dt * scale).clamp(self.dt_min, self.dt_max);
        if t + dt > next_date {
            dt = next_date - t;
        }
        dt
    }

    /// Called after a failed/repeated step: halves (by `reduction_factor`),
    /// floored at `dt_min`.
    pub fn reduce(&self, dt: f64) -> f64 {
        (dt * self.reduction_factor).max(self.dt_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_dt_exactly_to_the_next_date() {
        let ctrl = TimeStepController { dt_min: 0.0, dt_max: 10.0, ..Default::default() };
        let dt = ctrl.next_dt(0.9, 1.0, 0.5, 1.0);
        assert_eq!(dt, 0.5);
    }

    #[test]
    fn reduce_is_floored_at_dt_min() {
        let ctrl = TimeStepController { dt_min: 0.1, reduction_factor: 0.5, ..Default::default() };
        assert_eq!(ctrl.reduce(0.15), 0.1);
    }
}
