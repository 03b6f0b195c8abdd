//! Probability sources for receiver routing.
//!
//! The default [`SimRng`] uses the SplitMix64 algorithm: fast, 8 bytes of
//! state, and trivially serializable. Tests inject fixed sequences through
//! [`SequenceGenerator`] or arbitrary closures through [`FnGenerator`].

use std::collections::VecDeque;

/// Seed used by [`crate::factory::Factory::new`].
pub const DEFAULT_SEED: u64 = 0x0005_EED0_FAC7;

/// A source of uniformly distributed values in `[0, 1)`.
pub trait ProbabilityGenerator {
    fn next_probability(&mut self) -> f64;
}

/// SplitMix64 pseudo-random number generator.
///
/// Deterministic across platforms, so a seeded run always routes packages
/// the same way.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform `f64` in `[0, 1)` built from the top 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Current internal state. `SimRng::new(rng.state())` continues the
    /// same sequence.
    pub fn state(&self) -> u64 {
        self.state
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl ProbabilityGenerator for SimRng {
    fn next_probability(&mut self) -> f64 {
        self.next_f64()
    }
}

/// Adapts any `FnMut() -> f64` into a generator.
pub struct FnGenerator<F>(pub F);

impl<F: FnMut() -> f64> ProbabilityGenerator for FnGenerator<F> {
    fn next_probability(&mut self) -> f64 {
        (self.0)()
    }
}

/// Replays a fixed list of values, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    values: VecDeque<f64>,
}

impl SequenceGenerator {
    /// An empty list behaves like a constant `0.0`.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl ProbabilityGenerator for SequenceGenerator {
    fn next_probability(&mut self) -> f64 {
        match self.values.pop_front() {
            Some(v) => {
                self.values.push_back(v);
                v
            }
            None => 0.0,
        }
    }
}
