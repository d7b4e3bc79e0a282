// src/simulation.rs
// Bounded random walk producing simulated CO2 readings

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Inclusive range the simulated reading is kept inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: i64,
    pub upper: i64,
}

impl Bounds {
    pub const fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }

    /// Distance between the two extremes.
    pub fn width(&self) -> i64 {
        self.upper.saturating_sub(self.lower)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(0, 10_000)
    }
}

/// Position of the walk between two ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationState {
    pub current: i64,
    pub step: i64,
    pub bounds: Bounds,
}

impl SimulationState {
    pub fn new(current: i64, step: i64, bounds: Bounds) -> Self {
        Self { current, step, bounds }
    }
}

/// Outcome of the random draw taken when the walk is away from both extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draw {
    Up,
    Hold,
}

impl Draw {
    /// Three equally likely outcomes, two of which move up.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3u8) {
            0 | 2 => Draw::Up,
            _ => Draw::Hold,
        }
    }
}

/// Deterministic transition for a given draw.
///
/// The walk turns down as soon as a step up would overshoot `upper`, and
/// turns up once it sits on or below `lower`. Results never leave the bounds
/// as long as `step` fits inside them.
pub fn advance(state: &SimulationState, draw: Draw) -> i64 {
    let SimulationState { current, step, bounds } = *state;

    if current.saturating_add(step) > bounds.upper {
        current.saturating_sub(step).max(bounds.lower)
    } else if current <= bounds.lower {
        current.saturating_add(step).min(bounds.upper)
    } else {
        match draw {
            Draw::Up => current + step,
            Draw::Hold => current,
        }
    }
}

/// Next reading for `state`, drawing from `rng` when needed.
pub fn next_value<R: Rng + ?Sized>(state: &SimulationState, rng: &mut R) -> i64 {
    advance(state, Draw::sample(rng))
}

/// Owns the walk state and its random source.
#[derive(Debug)]
pub struct ValueGenerator<R = StdRng> {
    state: SimulationState,
    rng: R,
}

impl ValueGenerator<StdRng> {
    /// Generator seeded from the OS, or from `seed` for a reproducible walk.
    pub fn with_seed(state: SimulationState, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(state, rng)
    }
}

impl<R: Rng> ValueGenerator<R> {
    pub fn new(state: SimulationState, rng: R) -> Self {
        Self { state, rng }
    }

    /// Advance one tick and return the new reading.
    pub fn next(&mut self) -> i64 {
        let value = next_value(&self.state, &mut self.rng);
        self.state.current = value;
        value
    }

    pub fn current(&self) -> i64 {
        self.state.current
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }
}
