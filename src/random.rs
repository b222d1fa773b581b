use rand::Rng;

/// Source of uniform indices for shuffling and sampling. Any `rand` RNG
/// qualifies; tests substitute a fixed sequence.
pub trait RandomSource: Send {
    /// Uniform index in `0..upper`. Callers never pass zero.
    fn index(&mut self, upper: usize) -> usize;
}

impl<R: rand::RngCore + Send> RandomSource for R {
    fn index(&mut self, upper: usize) -> usize {
        self.gen_range(0..upper)
    }
}

/// Per-request generator. `ThreadRng` is not `Send`, so handlers use this instead.
pub fn request_rng() -> rand::rngs::StdRng {
    rand::SeedableRng::from_entropy()
}

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.index(i + 1);
        items.swap(i, j);
    }
}

/// Up to `count` distinct elements in random order.
pub fn sample<T: Clone>(items: &[T], count: usize, rng: &mut dyn RandomSource) -> Vec<T> {
    let mut pool = items.to_vec();
    shuffle(&mut pool, rng);
    pool.truncate(count);
    pool
}

pub fn pick<'a, T>(items: &'a [T], rng: &mut dyn RandomSource) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.index(items.len()))
}
