use crate::solution::{Solution, TermBuffer};

/// A ring of Solution snapshots with a moving cursor. `current` is the slot
/// the cursor points at; `previous` is the slot one step behind it.
/// `step_forward`/`step_backward` move the cursor; they never allocate.
pub struct SolutionRing {
    slots: Vec<Solution>,
    cursor: usize,
    /// When set, every slot's explicit-term buffers are this single shared
    /// array instead of per-slot copies (models that treat explicit terms as
    /// constants-after-init gain nothing from copying them every step).
    shared_explicit: Option<Vec<TermBuffer>>,
}

impl SolutionRing {
    /// `size` must be at least 2 so `current` and `previous` are always
    /// distinct slots.
    pub fn new(size: usize, num_dofs: usize, element_term_sizes: &[(usize, usize, usize)], merge_explicit_terms: bool) -> Self {
        assert!(size >= 2, "ring must hold at least current and previous");
        let slots = (0..size).map(|_| Solution::zeros(num_dofs, element_term_sizes)).collect();
        let shared_explicit = merge_explicit_terms
            .then(|| element_term_sizes.iter().map(|&(_, n, _)| TermBuffer::zeros(n)).collect());
        Self { slots, cursor: 0, shared_explicit }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    fn previous_index(&self) -> usize {
        (self.cursor + self.slots.len() - 1) % self.slots.len()
    }

    pub fn current(&self) -> &Solution {
        &self.slots[self.cursor]
    }

    pub fn current_mut(&mut self) -> &mut Solution {
        &mut self.slots[self.cursor]
    }

    pub fn previous(&self) -> &Solution {
        &self.slots[self.previous_index()]
    }

    /// Advances the cursor, copying `previous`'s contents into the new
    /// `current` slot as the Newton loop's starting point.
    pub fn step_forward(&mut self) {
        let prev_idx = self.cursor;
        self.cursor = (self.cursor + 1) % self.slots.len();
        let (prev, cur) = if prev_idx < self.cursor {
            let (a, b) = self.slots.split_at_mut(self.cursor);
            (&a[prev_idx], &mut b[0])
        } else {
            let (a, b) = self.slots.split_at_mut(prev_idx);
            (&b[0], &mut a[self.cursor])
        };
        cur.t = prev.t;
        cur.unknowns.copy_from(&prev.unknowns);
        cur.implicit.clone_from(&prev.implicit);
        cur.constant.clone_from(&prev.constant);
        if self.shared_explicit.is_none() {
            cur.explicit.clone_from(&prev.explicit);
        }
    }

    /// Reverses the last `step_forward`, restoring the cursor. Valid only
    /// immediately after a `step_forward` with no further stepping; callers
    /// that write `current` before calling this get the state as it was
    /// left (the Driver always rolls back before reusing the slot).
    pub fn step_backward(&mut self) {
        self.cursor = self.previous_index();
    }

    pub fn merges_explicit_terms(&self) -> bool {
        self.shared_explicit.is_some()
    }

    pub fn explicit_terms(&self) -> &[TermBuffer] {
        self.shared_explicit.as_deref().unwrap_or(&self.slots[self.cursor].explicit)
    }

    pub fn explicit_terms_mut(&mut self) -> &mut [TermBuffer] {
        if let Some(shared) = &mut self.shared_explicit {
            shared
        } else {
            &mut self.slots[self.cursor].explicit
        }
    }

    /// Serializes `current` as raw little-endian bytes: `t`, then unknowns,
    /// then each element's implicit/explicit/constant arrays in order.
    pub fn store_current(&self) -> Vec<u8> {
        let cur = self.current();
        let mut out = Vec::new();
        out.extend_from_slice(&cur.t.to_le_bytes());
        for &v in cur.unknowns.iter() {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for buf in [&cur.implicit, self_explicit(self), &cur.constant] {
            for term in buf {
                for &v in term.as_slice() {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        out
    }

    /// Restores `current` from bytes produced by [`Self::store_current`].
    /// Strict: every array length must match exactly what this ring was
    /// built for.
    pub fn load_current(&mut self, bytes: &[u8]) -> Result<(), String> {
        let mut offset = 0usize;
        let mut read_f64 = |bytes: &[u8], offset: &mut usize| -> Result<f64, String> {
            let end = *offset + 8;
            let chunk = bytes.get(*offset..end).ok_or_else(|| "truncated restart payload".to_string())?;
            *offset = end;
            Ok(f64::from_le_bytes(chunk.try_into().unwrap()))
        };

        let t = read_f64(bytes, &mut offset)?;
        let num_dofs = self.slots[self.cursor].unknowns.len();
        let mut unknowns = vec![0.0f64; num_dofs];
        for slot in unknowns.iter_mut() {
            *slot = read_f64(bytes, &mut offset)?;
        }

        let element_count = self.slots[self.cursor].implicit.len();
        let mut implicit = Vec::with_capacity(element_count);
        for i in 0..element_count {
            let n = self.slots[self.cursor].implicit[i].len();
            let mut v = vec![0.0; n];
            for slot in v.iter_mut() {
                *slot = read_f64(bytes, &mut offset)?;
            }
            implicit.push(TermBuffer::from(v));
        }
        let mut explicit = Vec::with_capacity(element_count);
        for i in 0..element_count {
            let n = self.explicit_terms()[i].len();
            let mut v = vec![0.0; n];
            for slot in v.iter_mut() {
                *slot = read_f64(bytes, &mut offset)?;
            }
            explicit.push(TermBuffer::from(v));
        }
        let mut constant = Vec::with_capacity(element_count);
        for i in 0..element_count {
            let n = self.slots[self.cursor].constant[i].len();
            let mut v = vec![0.0; n];
            for slot in v.iter_mut() {
                *slot = read_f64(bytes, &mut offset)?;
            }
            constant.push(TermBuffer::from(v));
        }

        let cursor = self.cursor;
        self.slots[cursor].t = t;
        self.slots[cursor].unknowns = nalgebra::DVector::from_vec(unknowns);
        self.slots[cursor].implicit = implicit;
        self.slots[cursor].constant = constant;
        if let Some(shared) = &mut self.shared_explicit {
            *shared = explicit;
        } else {
            self.slots[cursor].explicit = explicit;
        }
        Ok(())
    }
}

fn self_explicit(ring: &SolutionRing) -> &Vec<TermBuffer> {
    match &ring.shared_explicit {
        Some(shared) => shared,
        None => &ring.slots[ring.cursor].explicit,
    }
}

impl From<Vec<f64>> for TermBuffer {
    fn from(values: Vec<f64>) -> Self {
        TermBuffer::from_vec(values)
    }
}
