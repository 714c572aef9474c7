//! Round-robin rotation over a candidate pool.
//!
//! Used by bulk deactivation to spread many replacements evenly. Candidates
//! are never consumed: the cursor just keeps cycling.

pub struct RoundRobin<'a, T> {
    pool: &'a [T],
    cursor: usize,
}

impl<'a, T> RoundRobin<'a, T> {
    pub fn new(pool: &'a [T]) -> Self {
        Self { pool, cursor: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Next candidate, in rotation order, that satisfies `accept`.
    ///
    /// Scans at most one full cycle. The cursor moves past the returned
    /// candidate; rejected candidates keep their turn for later calls.
    pub fn next_matching<F>(&mut self, mut accept: F) -> Option<&'a T>
    where
        F: FnMut(&T) -> bool,
    {
        let len = self.pool.len();
        for offset in 0..len {
            let idx = (self.cursor + offset) % len;
            let candidate = &self.pool[idx];
            if accept(candidate) {
                self.cursor = (idx + 1) % len;
                return Some(candidate);
            }
        }
        None
    }
}
