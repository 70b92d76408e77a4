//! Random sources for sensor drift.
//!
//! The store never touches process-global randomness. It owns a
//! [`DriftSource`] handed in at construction, so a seeded generator gives
//! reproducible runs and a fixed source gives exact test expectations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Yields draws from the closed interval [-1, 1].
pub trait DriftSource {
    /// Next draw.
    fn draw(&mut self) -> f64;
}

impl<D: DriftSource + ?Sized> DriftSource for Box<D> {
    fn draw(&mut self) -> f64 {
        (**self).draw()
    }
}

/// Uniform draws from any [`Rng`].
#[derive(Debug, Clone)]
pub struct RandomDrift<R = StdRng> {
    rng: R,
}

impl<R: Rng> RandomDrift<R> {
    /// Wrap an existing generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomDrift<StdRng> {
    /// Deterministic generator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from the OS.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> DriftSource for RandomDrift<R> {
    fn draw(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }
}

/// Always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedDrift(pub f64);

impl DriftSource for FixedDrift {
    fn draw(&mut self) -> f64 {
        self.0
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct SequenceDrift {
    draws: Vec<f64>,
    pos: usize,
}

impl SequenceDrift {
    /// An empty sequence draws 0.0 forever.
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, pos: 0 }
    }
}

impl DriftSource for SequenceDrift {
    fn draw(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.pos];
        self.pos = (self.pos + 1) % self.draws.len();
        value
    }
}
