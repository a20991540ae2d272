//! Lower-bound binary search over index positions.

/// Returns the smallest index `i` in `[0, n]` for which `pred(i)` is true.
///
/// `pred` must be monotonic over `0..n`: false for every index below some
/// threshold and true for every index at or above it. Positions outside the
/// range are treated as `pred(-1) == false` and `pred(n) == true`, so `n` is
/// returned when no index satisfies the predicate.
///
/// A non-monotonic predicate does not panic; the returned position is simply
/// unspecified.
///
/// ```
/// use ti_core::lower_bound;
///
/// let values = [1, 3, 3, 7, 9];
/// assert_eq!(lower_bound(values.len(), |i| values[i] >= 3), 1);
/// assert_eq!(lower_bound(values.len(), |i| values[i] >= 10), 5);
/// ```
pub fn lower_bound<F>(n: usize, mut pred: F) -> usize
where
    F: FnMut(usize) -> bool,
{
    // Invariant: pred(lo - 1) == false, pred(hi) == true.
    let (mut lo, mut hi) = (0, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}
