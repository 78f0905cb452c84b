use num_traits::{Float, FromPrimitive};

/// Returns `n` evenly spaced values from `start` to `end`, inclusive.
///
/// The last value is exactly `end`.
pub fn linspace<T>(start: T, end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + FromPrimitive,
{
    let steps = T::from_usize(n.saturating_sub(1).max(1)).unwrap_or_else(T::one);
    let delta = (end - start) / steps;
    (0..n).map(move |i| {
        if i + 1 == n && n > 1 {
            end
        } else {
            T::from_usize(i).map_or(end, |i| start + i * delta)
        }
    })
}
