//! Alignment arithmetic shared by the allocators

/// Rounds `value` up to the next multiple of `multiple_of`.
///
/// Works for any positive `multiple_of`, not just powers of two. For every
/// positive `multiple_of`, `next_multiple(m, v) >= v` and
/// `next_multiple(m, v) % m == 0`.
///
/// # Panics
///
/// Debug builds assert that `multiple_of` is non-zero.
#[inline]
#[must_use]
pub fn next_multiple(multiple_of: usize, value: usize) -> usize {
    debug_assert!(multiple_of > 0, "multiple_of must be positive");
    let up = value + multiple_of - 1;
    up - up % multiple_of
}
