//! Transform stack with lazy composition caching
//!
//! Canvas `save`/`restore` nesting is modeled as a stack of `Mat3` levels.
//! The GPU shader receives every level and folds them itself, but the CPU
//! side still needs the composed product (hit testing, tests, uniform
//! sanity). Recomputing the full product on every `translate` would cost
//! O(depth) per call; instead a parallel cache of prefix products is kept
//! valid up to a cursor, and only the invalidated suffix is recomputed.
//!
//! Invariant: `valid <= len()` at all times. A mutation at level `i`
//! demotes the cursor to `min(valid, i)`.

use smallvec::{smallvec, SmallVec};

use crate::matrix::Mat3;

/// Inline capacity for the common case; deeper nesting spills to the heap.
type Levels = SmallVec<[Mat3; 8]>;

/// An ordered stack of 2D transforms with cached prefix products.
///
/// Level 0 is the base and is never popped; `depth()` is the index of the
/// top level. Each mutator composes a local transform onto the top level
/// only, so the common draw pattern (push, translate, scale, draw, pop)
/// leaves the cached products of the lower levels untouched.
#[derive(Clone, Debug)]
pub struct TransformStack {
    entries: Levels,
    /// `cache[i]` = product of `entries[0..=i]`, valid for `i < valid`.
    cache: Levels,
    valid: usize,
}

impl TransformStack {
    /// New stack with an identity base level.
    pub fn new() -> Self {
        Self::with_base(Mat3::IDENTITY)
    }

    /// New stack with an explicit base transform at level 0.
    pub fn with_base(base: Mat3) -> Self {
        Self {
            entries: smallvec![base],
            cache: smallvec![base],
            valid: 0,
        }
    }

    /// Number of levels, always >= 1.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the top level (0 = base only).
    pub fn depth(&self) -> usize {
        self.entries.len() - 1
    }

    /// All levels, bottom to top. This is the exact order the draw
    /// pipeline uploads to the per-level shader uniform array.
    pub fn levels(&self) -> &[Mat3] {
        &self.entries
    }

    /// Number of cached prefix products currently valid (diagnostics).
    pub fn valid_levels(&self) -> usize {
        self.valid
    }

    /// Grow the stack by one level, seeded with `m` or identity.
    ///
    /// The cache below the new level stays valid.
    pub fn push(&mut self, m: Option<Mat3>) {
        self.entries.push(m.unwrap_or(Mat3::IDENTITY));
    }

    /// Shrink the stack by one level.
    ///
    /// Popping the base is a silent no-op: a `restore()` without a
    /// matching `save()` is ignored, not an error.
    pub fn pop(&mut self) {
        if self.entries.len() == 1 {
            tracing::trace!("transform stack pop at base level ignored");
            return;
        }
        self.entries.pop();
        self.valid = self.valid.min(self.entries.len());
    }

    /// Compose a translation onto the top level.
    pub fn translate(&mut self, x: f32, y: f32) {
        self.apply(Mat3::translation(x, y));
    }

    /// Compose a scale onto the top level.
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.apply(Mat3::scaling(sx, sy));
    }

    /// Compose a rotation onto the top level, `angle` in radians.
    pub fn rotate(&mut self, angle: f32) {
        self.apply(Mat3::rotation(angle));
    }

    /// Compose an arbitrary local transform onto the top level. The local
    /// transform applies to geometry first: `top = top * local`.
    pub fn apply(&mut self, local: Mat3) {
        let top = self.entries.len() - 1;
        self.entries[top] = self.entries[top].multiply(&local);
        self.valid = self.valid.min(top);
    }

    /// Replace the top level outright.
    pub fn set_matrix(&mut self, m: Mat3) {
        let top = self.entries.len() - 1;
        self.entries[top] = m;
        self.valid = self.valid.min(top);
    }

    /// Reset the top level to identity.
    pub fn set_identity(&mut self) {
        self.set_matrix(Mat3::IDENTITY);
    }

    /// Bottom-to-top product of all levels.
    ///
    /// Only the suffix above the validity cursor is recomputed; the result
    /// and every intermediate product are cached for the next call.
    pub fn composed(&mut self) -> Mat3 {
        let len = self.entries.len();
        self.cache.resize(len, Mat3::IDENTITY);
        let mut start = self.valid;
        if start == 0 {
            self.cache[0] = self.entries[0];
            start = 1;
        }
        for i in start..len {
            self.cache[i] = self.cache[i - 1].multiply(&self.entries[i]);
        }
        self.valid = len;
        self.cache[len - 1]
    }
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat_eq(a: &Mat3, b: &Mat3) {
        for (x, y) in a.0.iter().zip(b.0.iter()) {
            assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_starts_at_base_depth() {
        let mut stack = TransformStack::new();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.composed(), Mat3::IDENTITY);
    }

    #[test]
    fn test_pop_underflow_is_ignored() {
        let mut stack = TransformStack::new();
        stack.pop();
        stack.pop();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.composed(), Mat3::IDENTITY);
    }

    #[test]
    fn test_push_pop_symmetry() {
        let mut stack = TransformStack::new();
        stack.translate(5.0, 5.0);
        let before = stack.composed();

        for _ in 0..4 {
            stack.push(None);
            stack.rotate(0.25);
            stack.scale(2.0, 3.0);
        }
        for _ in 0..4 {
            stack.pop();
        }

        assert_mat_eq(&stack.composed(), &before);
    }

    #[test]
    fn test_composition_order_pins_numbers() {
        // translate(10, 0) then scale(2, 2): the composed transform maps
        // (0,0) -> (10,0) and (1,1) -> (12,2).
        let mut stack = TransformStack::new();
        stack.translate(10.0, 0.0);
        stack.scale(2.0, 2.0);
        let m = stack.composed();
        assert_eq!(m.transform_point(0.0, 0.0), (10.0, 0.0));
        assert_eq!(m.transform_point(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn test_composed_spans_levels() {
        let mut stack = TransformStack::new();
        stack.translate(10.0, 0.0);
        stack.push(None);
        stack.scale(2.0, 2.0);
        let m = stack.composed();
        assert_eq!(m.transform_point(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn test_top_mutation_only_invalidates_top() {
        let mut stack = TransformStack::new();
        stack.translate(1.0, 0.0);
        stack.push(None);
        stack.push(None);
        stack.composed();
        assert_eq!(stack.valid_levels(), 3);

        // Mutating the top demotes the cursor to the top level only.
        stack.translate(0.0, 1.0);
        assert_eq!(stack.valid_levels(), 2);
        stack.composed();
        assert_eq!(stack.valid_levels(), 3);
    }

    #[test]
    fn test_base_mutation_invalidates_everything() {
        let mut stack = TransformStack::new();
        stack.push(None);
        stack.pop();
        stack.composed();
        // Back at the base; mutating it demotes the cursor to zero.
        stack.scale(2.0, 2.0);
        assert_eq!(stack.valid_levels(), 0);
        assert_eq!(stack.composed().transform_point(1.0, 1.0), (2.0, 2.0));
    }

    #[test]
    fn test_set_identity_resets_top_only() {
        let mut stack = TransformStack::new();
        stack.translate(3.0, 3.0);
        stack.push(None);
        stack.scale(5.0, 5.0);
        stack.set_identity();
        let m = stack.composed();
        assert_eq!(m.transform_point(0.0, 0.0), (3.0, 3.0));
        assert_eq!(m.transform_point(1.0, 0.0), (4.0, 3.0));
    }

    #[test]
    fn test_history_independence() {
        // Same per-level contents reached through different sequences
        // compose to the same product.
        let mut a = TransformStack::new();
        a.translate(2.0, 0.0);
        a.push(Some(Mat3::scaling(3.0, 3.0)));

        let mut b = TransformStack::new();
        b.translate(2.0, 0.0);
        b.push(None);
        b.composed();
        b.pop();
        b.push(None);
        b.scale(3.0, 3.0);

        assert_mat_eq(&a.composed(), &b.composed());
    }

    #[test]
    fn test_cursor_never_exceeds_len() {
        let mut stack = TransformStack::new();
        for _ in 0..5 {
            stack.push(None);
            stack.translate(1.0, 1.0);
        }
        stack.composed();
        for _ in 0..5 {
            stack.pop();
            assert!(stack.valid_levels() <= stack.len());
        }
    }
}
