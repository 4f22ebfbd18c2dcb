//! The sponge contract consumed by the signing engine, the bundle
//! finalizer, and the address pipeline.
//!
//! A sponge is a stateful hash engine: absorb input trits in hash-length
//! blocks, squeeze output trits in hash-length blocks, reset to start over.
//! Cloning yields an independent copy with identical internal state — the
//! parallel digest path relies on that to fan out without sharing mutable
//! state.
//!
//! Buffers are exact-length by contract: absorb and squeeze take slices
//! whose length is a multiple of [`HASH_LENGTH`](crate::config::HASH_LENGTH)
//! and never widen or truncate on the caller's behalf.

use crate::crypto::curl::Curl;
use crate::ternary::Trit;

/// Stateful ternary hash engine.
///
/// Implementors must be deterministic: the same absorb/squeeze sequence from
/// a reset state always produces the same output. `Clone` must produce an
/// independent engine that continues from the same internal state.
pub trait Sponge: Clone + Send {
    /// Clear the internal state back to all-zero trits.
    fn reset(&mut self);

    /// Absorb `trits` into the state, one hash-length block at a time.
    ///
    /// Panics if the slice length is not a multiple of the hash length —
    /// malformed lengths are programmer error, not runtime input.
    fn absorb(&mut self, trits: &[Trit]);

    /// Squeeze hash output into `out`, one hash-length block at a time.
    ///
    /// Output is consumed continuously: squeezing 27 blocks in one call is
    /// identical to 27 single-block calls. Panics on non-block-multiple
    /// lengths.
    fn squeeze(&mut self, out: &mut [Trit]);
}

/// Which concrete sponge variant to instantiate.
///
/// Two interchangeable variants exist; callers pick one at construction and
/// stay agnostic afterwards. `CurlP81` is the full-strength permutation used
/// for everything consensus-critical. `CurlP27` runs the same construction
/// at a third of the rounds and exists for latency-sensitive, non-consensus
/// hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpongeMode {
    /// Curl with 81 permutation rounds. The default.
    #[default]
    CurlP81,
    /// Curl with 27 permutation rounds.
    CurlP27,
}

impl SpongeMode {
    /// Construct a fresh, reset sponge of this variant.
    pub fn create(self) -> Curl {
        Curl::new(self)
    }
}
