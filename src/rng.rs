use std::collections::VecDeque;

/// Source of uniform draws for spawn policies and spawn trials.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f32;
        (min + (self.next_f32() * span).floor() as i32).min(max)
    }

    fn bool(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    fn duration_ms(&mut self, min_ms: u64, spread_ms: u64) -> u64 {
        let offset = (self.next_f32() as f64 * spread_ms as f64).floor() as u64;
        min_ms + offset.min(spread_ms.saturating_sub(1))
    }
}

#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u32>())
    }
}

impl RandomSource for Rng {
    fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        // f32 rounding can land on 1.0 for the largest outputs
        ((out as f64 / 4_294_967_296.0) as f32).min(0.999_999_94)
    }
}

/// Replays a fixed list of draws, then repeats the fallback value.
#[derive(Clone, Debug)]
pub struct SequenceRandom {
    values: VecDeque<f32>,
    fallback: f32,
}

impl SequenceRandom {
    pub fn new(values: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            values: values.into_iter().collect(),
            fallback,
        }
    }

    /// Every draw returns `value`.
    pub fn constant(value: f32) -> Self {
        Self::new([], value)
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for SequenceRandom {
    fn next_f32(&mut self) -> f32 {
        self.values.pop_front().unwrap_or(self.fallback)
    }
}
