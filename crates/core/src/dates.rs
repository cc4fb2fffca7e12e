//! Nearest-date matching between earnings and expiration calendars.

/// Returns the earliest candidate on or after `target`.
///
/// Input order does not matter. Returns `None` when every candidate is
/// before `target` or the slice is empty.
pub fn closest_on_or_after<T: Ord + Copy>(target: T, candidates: &[T]) -> Option<T> {
    candidates.iter().copied().filter(|c| *c >= target).min()
}
