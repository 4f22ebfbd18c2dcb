//! The Curl sponge, scalar form.
//!
//! Curl keeps a 729-trit state — three hash lengths — and mixes it with a
//! simple two-input ternary S-box applied 729 times per round, walking the
//! state with a +364/−365 index rotation. Absorption writes each input
//! block over the first 243 trits and permutes; squeezing reads the first
//! 243 trits and permutes.
//!
//! The proof-of-work engine implements this exact permutation bit-sliced
//! ([`crate::pow::BitState`]); the S-box table below and the boolean
//! formulas there encode the same function. `pow` has cross-check tests
//! that fail if they ever drift apart.

use crate::config::{CURL_ROUNDS_P27, CURL_ROUNDS_P81, HASH_LENGTH, STATE_LENGTH};
use crate::crypto::sponge::{Sponge, SpongeMode};
use crate::ternary::Trit;

/// Curl's two-trit S-box, indexed by `a + 4b + 5` for inputs in {-1, 0, 1}.
/// Slots 3 and 7 are unreachable and padded with zero.
const TRUTH_TABLE: [Trit; 11] = [1, 0, -1, 0, 1, -1, 0, 0, -1, 1, 0];

/// Scalar Curl sponge. See the module docs; construct via [`SpongeMode`].
#[derive(Clone)]
pub struct Curl {
    state: [Trit; STATE_LENGTH],
    rounds: usize,
}

impl Curl {
    /// Fresh, zeroed sponge running the given variant's round count.
    pub fn new(mode: SpongeMode) -> Self {
        let rounds = match mode {
            SpongeMode::CurlP81 => CURL_ROUNDS_P81,
            SpongeMode::CurlP27 => CURL_ROUNDS_P27,
        };
        Self {
            state: [0; STATE_LENGTH],
            rounds,
        }
    }

    /// Run the permutation over the full state.
    fn transform(&mut self) {
        let mut scratchpad = [0 as Trit; STATE_LENGTH];
        let mut index = 0usize;
        for _ in 0..self.rounds {
            scratchpad.copy_from_slice(&self.state);
            for trit in self.state.iter_mut() {
                let previous = index;
                index = if index < 365 { index + 364 } else { index - 365 };
                let lookup = scratchpad[previous] + 4 * scratchpad[index] + 5;
                *trit = TRUTH_TABLE[lookup as usize];
            }
        }
    }
}

impl Sponge for Curl {
    fn reset(&mut self) {
        self.state = [0; STATE_LENGTH];
    }

    fn absorb(&mut self, trits: &[Trit]) {
        assert!(
            trits.len() % HASH_LENGTH == 0 && !trits.is_empty(),
            "absorb length {} is not a positive multiple of {HASH_LENGTH}",
            trits.len()
        );
        for block in trits.chunks(HASH_LENGTH) {
            self.state[..HASH_LENGTH].copy_from_slice(block);
            self.transform();
        }
    }

    fn squeeze(&mut self, out: &mut [Trit]) {
        assert!(
            out.len() % HASH_LENGTH == 0 && !out.is_empty(),
            "squeeze length {} is not a positive multiple of {HASH_LENGTH}",
            out.len()
        );
        for block in out.chunks_mut(HASH_LENGTH) {
            block.copy_from_slice(&self.state[..HASH_LENGTH]);
            self.transform();
        }
    }
}
