//! Deterministic random stream for scripts.
//!
//! Reproducible rendering tests compare images byte for byte against fixtures
//! keyed to specific seeds, so the selection law below is part of the contract:
//!
//! - `seed(n)` reinitialises a PCG-64 stream with `Pcg64::seed_from_u64(n)`.
//! - Every draw consumes exactly one `u64` from the stream.
//! - `choose` maps a draw `r` onto `[0, len)` with the widening multiply
//!   `(r * len) >> 64`. There is no rejection step, so the stream always
//!   advances by one draw; the residual bias is at most `len / 2^64`.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64;

/// Seed every fresh script run starts with.
pub const DEFAULT_SEED: u64 = 0;

#[derive(Debug, Clone)]
pub struct Rng {
    draws: u64,
    stream: Pcg64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            draws: 0,
            stream: Pcg64::seed_from_u64(seed),
        }
    }

    /// Reinitialise the stream. Resets the cursor.
    pub fn seed(&mut self, seed: u64) {
        *self = Self::new(seed);
    }

    /// Number of draws taken since the last reseed.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn next_raw(&mut self) -> u64 {
        self.draws += 1;
        self.stream.next_u64()
    }

    /// Pick an index in `[0, len)`. Returns `None` for an empty range without
    /// consuming a draw.
    pub fn choose_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let raw = self.next_raw();
        Some(((raw as u128 * len as u128) >> 64) as usize)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        self.choose_index(items.len()).map(|i| &items[i])
    }

    /// Uniform float in `[0, 1)` from the top 24 bits of one draw.
    pub fn random(&mut self) -> f32 {
        (self.next_raw() >> 40) as f32 / (1u64 << 24) as f32
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
