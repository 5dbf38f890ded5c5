//! Uniform random permutation (Fisher–Yates).

use rand::Rng;

/// Return a shuffled copy of `items`; the input is left untouched.
///
/// Walks from the last index down to 1, swapping each slot with a uniformly
/// chosen index in `0..=i`.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.gen_range(0..=i);
        out.swap(i, j);
    }
    out
}
