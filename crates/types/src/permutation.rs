//! Deterministic seeded permutations.
//!
//! Used to derive the per-round peer ordering from a block hash. The seeding
//! procedure is part of the wire protocol: every peer must derive the same
//! permutation from the same hash, so both the seeder and the shuffle are
//! fixed here and must not change.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Mixes seed material into a single engine seed, CBC-style: each 8-byte
/// little-endian word is XORed into the running seed and the engine is run
/// once to diffuse it. Trailing bytes are packed into one word with a byte
/// shift after each input byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct Seeder {
    current_seed: u64,
}

impl Seeder {
    pub fn new() -> Self {
        Seeder::default()
    }

    /// Feed raw seed material.
    pub fn feed(mut self, data: &[u8]) -> Self {
        let mut chunks = data.chunks_exact(8);
        for chunk in &mut chunks {
            let word = u64::from_le_bytes(chunk.try_into().expect("exact 8-byte chunk"));
            self = self.feed_value(word);
        }
        let tail = chunks.remainder();
        if !tail.is_empty() {
            let mut packed = 0u64;
            for &b in tail {
                packed |= u64::from(b);
                packed <<= 8;
            }
            self = self.feed_value(packed);
        }
        self
    }

    fn feed_value(mut self, value: u64) -> Self {
        self.current_seed = ChaCha8Rng::seed_from_u64(self.current_seed ^ value).next_u64();
        self
    }

    /// The engine seeded with everything fed so far.
    pub fn make_prng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.current_seed)
    }
}

/// Fill `permutation` with a shuffle of `0..size` drawn from `prng`.
///
/// The shuffle walks every position once and swaps it with `prng() % size`;
/// all peers run the identical procedure.
pub fn generate_permutation(permutation: &mut Vec<usize>, mut prng: ChaCha8Rng, size: usize) {
    permutation.clear();
    permutation.extend(0..size);
    if size == 0 {
        return;
    }
    for i in 0..size {
        let j = (prng.next_u64() % size as u64) as usize;
        permutation.swap(i, j);
    }
}
