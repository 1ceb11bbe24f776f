//! The run-length scan shared by style encoding, entity scanning, and the
//! block tree cache.

/// Walks `items` once and reports every maximal run of adjacent-equal
/// elements that passes `filter`.
///
/// Two neighbors belong to the same run when `same` returns true for them;
/// `filter` is evaluated on the run's first element, and `callback` receives
/// the half-open range `(start, end)` of every run that passes. The scan is
/// a single forward pass with no backtracking.
pub fn find_ranges<T, S, F, C>(items: &[T], mut same: S, mut filter: F, mut callback: C)
where
    S: FnMut(&T, &T) -> bool,
    F: FnMut(&T) -> bool,
    C: FnMut(usize, usize),
{
    if items.is_empty() {
        return;
    }
    let mut run_start = 0;
    for idx in 1..items.len() {
        if !same(&items[idx - 1], &items[idx]) {
            if filter(&items[run_start]) {
                callback(run_start, idx);
            }
            run_start = idx;
        }
    }
    if filter(&items[run_start]) {
        callback(run_start, items.len());
    }
}

/// [`find_ranges`] collected into a vector, for callers that want the list.
pub fn collect_ranges<T, S, F>(items: &[T], same: S, filter: F) -> Vec<(usize, usize)>
where
    S: FnMut(&T, &T) -> bool,
    F: FnMut(&T) -> bool,
{
    let mut ranges = Vec::new();
    find_ranges(items, same, filter, |start, end| ranges.push((start, end)));
    ranges
}
