// Fast random number generator based on OpenMC's PCG-LCG implementation.
//
// A bare u64 of state keeps the per-event generators cheap to construct:
// every event of a run owns its own stream, derived from the master seed,
// so results are reproducible regardless of execution order.

use rand::{RngCore, SeedableRng};

/// LCG multiplier (same as OpenMC)
const PRN_MULT: u64 = 6364136223846793005;
/// LCG additive constant (same as OpenMC)
const PRN_ADD: u64 = 1442695040888963407;

/// PCG (Permuted Congruential Generator) with an LCG base and RXS-M-XS
/// output permutation.
///
/// Reference: Melissa E. O'Neill, "PCG: A Family of Simple Fast
/// Space-Efficient Statistically Good Algorithms for Random Number
/// Generation"
#[derive(Clone, Copy, Debug)]
pub struct FastRng {
    state: u64,
}

impl FastRng {
    /// Create a new FastRng with the given seed
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Derive the independent stream for one event of a run.
    ///
    /// The master seed and the event index are mixed through the
    /// splitmix64 finalizer, so consecutive event indices land on
    /// uncorrelated points of the state space.
    #[inline]
    pub fn for_event(master_seed: u64, event_index: u64) -> Self {
        let mut z = master_seed ^ event_index.wrapping_mul(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        Self::new(z ^ (z >> 31))
    }

    /// Generate a random f64 in [0, 1)
    #[inline(always)]
    pub fn random(&mut self) -> f64 {
        // Equivalent to ldexp(next_u64, -64)
        (self.next_u64() as f64) * 5.421010862427522e-20
    }
}

impl SeedableRng for FastRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            state: u64::from_le_bytes(seed),
        }
    }
}

impl RngCore for FastRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        // Advance the LCG
        self.state = PRN_MULT.wrapping_mul(self.state).wrapping_add(PRN_ADD);

        // PCG output permutation (RXS-M-XS variant)
        let word = ((self.state >> ((self.state >> 59) + 5)) ^ self.state)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            left.copy_from_slice(&bytes[..left.len()]);
        }
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
