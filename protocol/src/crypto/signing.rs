//! # One-Time Signing Engine
//!
//! Winternitz-style hash-chain signatures over balanced ternary. The whole
//! scheme rests on one arithmetic identity: for every message digit
//! `v ∈ [-13, 13]`, the signer applies `13 - v` chain rounds to a key
//! sub-block and the verifier applies `v + 13` more, so the two always meet
//! at exactly [`CHAIN_ROUNDS`](crate::config::CHAIN_ROUNDS) rounds — the
//! digest — without the key ever leaving the signer's machine.
//!
//! ## Derivation pipeline
//!
//! ```text
//! seed ──(index ripple-increments)──▶ subseed
//! subseed ──(absorb/squeeze/re-absorb diffusion)──▶ key (security × 6561 trits)
//! key ──(27 sub-chains × 26 rounds per fragment)──▶ digests (security × 243)
//! digests ──(absorb all, squeeze once)──▶ address (243 trits)
//! ```
//!
//! ## Keys are strictly one-time
//!
//! Signing two different bundle hashes with the same key leaks enough chain
//! interiors to forge. Nothing in this module can detect reuse — that
//! discipline belongs to the wallet layer. Don't make it care.

use thiserror::Error;
use tracing::debug;

use crate::config::{
    ADDRESS_LENGTH, CHAIN_ROUNDS, HASH_LENGTH, KEY_FRAGMENT_LENGTH, MAX_TRYTE_VALUE,
    NORMALIZED_FRAGMENT_LENGTH, SEED_LENGTH,
};
use crate::crypto::sponge::{Sponge, SpongeMode};
use crate::crypto::Curl;
use crate::ternary::{self, Trit};
use crate::transaction::bundle::{normalized_bundle, Bundle};

/// Errors from the signing engine.
///
/// All of these are precondition violations — programmer errors caught
/// before any sponge work begins, never mid-derivation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    /// Security level below 1. The key length formula `security × 6561`
    /// degenerates and no signature could span zero transactions.
    #[error("invalid security level {0}: must be at least 1")]
    InvalidSecurityLevel(usize),

    /// Seed is not exactly one hash length of trits.
    #[error("invalid seed length {0}: expected {SEED_LENGTH} trits")]
    InvalidSeedLength(usize),

    /// Key length is not a positive multiple of the fragment length, so it
    /// cannot have come out of [`Signing::key`].
    #[error("invalid key length {0}: expected a positive multiple of {KEY_FRAGMENT_LENGTH}")]
    InvalidKeyLength(usize),
}

/// The signing engine. Owns its sponge; one engine per operation chain.
///
/// Generic over the sponge so the whole scheme can be exercised against
/// either Curl variant; production signing uses the full-round default.
pub struct Signing<S: Sponge = Curl> {
    sponge: S,
}

impl Default for Signing<Curl> {
    fn default() -> Self {
        Self::new(SpongeMode::CurlP81.create())
    }
}

impl<S: Sponge> Signing<S> {
    /// Build an engine around the given sponge instance.
    pub fn new(sponge: S) -> Self {
        Self { sponge }
    }

    /// Derive the subseed for `index`: the seed treated as a
    /// balanced-ternary number, incremented `index` times with carry.
    fn subseed(seed: &[Trit], index: usize) -> Vec<Trit> {
        let mut subseed = seed.to_vec();
        for _ in 0..index {
            ternary::increment(&mut subseed);
        }
        subseed
    }

    /// Derive the private key for `(seed, index, security)`.
    ///
    /// The subseed is absorbed, squeezed back out, and re-absorbed after a
    /// reset — a diffusion step that decouples key material from the raw
    /// subseed — then `security × 27` hash-length blocks are squeezed
    /// continuously to form the key. Deterministic.
    pub fn key(
        &mut self,
        seed: &[Trit],
        index: usize,
        security: usize,
    ) -> Result<Vec<Trit>, SigningError> {
        if security < 1 {
            return Err(SigningError::InvalidSecurityLevel(security));
        }
        if seed.len() != SEED_LENGTH {
            return Err(SigningError::InvalidSeedLength(seed.len()));
        }

        let mut subseed = Self::subseed(seed, index);
        self.sponge.reset();
        self.sponge.absorb(&subseed);
        self.sponge.squeeze(&mut subseed);
        self.sponge.reset();
        self.sponge.absorb(&subseed);

        let mut key = vec![0 as Trit; security * KEY_FRAGMENT_LENGTH];
        self.sponge.squeeze(&mut key);
        Ok(key)
    }

    /// Chain-hash one 6561-trit key fragment down to its 243-trit digest.
    ///
    /// Each of the 27 sub-blocks is run through the full 26-round one-way
    /// chain in place, then the finalized fragment is absorbed whole and
    /// the digest squeezed out. Shared by the sequential and parallel paths
    /// so they cannot disagree.
    fn fragment_digest(sponge: &mut S, fragment: &mut [Trit], digest: &mut [Trit]) {
        for sub_block in fragment.chunks_mut(HASH_LENGTH) {
            for _ in 0..CHAIN_ROUNDS {
                sponge.absorb(sub_block);
                sponge.squeeze(sub_block);
                sponge.reset();
            }
        }
        sponge.absorb(fragment);
        sponge.squeeze(digest);
        sponge.reset();
    }

    /// Compute the public digests for a key: one 243-trit digest per
    /// 6561-trit fragment.
    pub fn digests(&mut self, key: &[Trit]) -> Result<Vec<Trit>, SigningError> {
        if key.is_empty() || key.len() % KEY_FRAGMENT_LENGTH != 0 {
            return Err(SigningError::InvalidKeyLength(key.len()));
        }
        let security = key.len() / KEY_FRAGMENT_LENGTH;
        self.sponge.reset();

        let mut digests = vec![0 as Trit; security * HASH_LENGTH];
        for (fragment, digest) in key
            .chunks(KEY_FRAGMENT_LENGTH)
            .zip(digests.chunks_mut(HASH_LENGTH))
        {
            let mut fragment = fragment.to_vec();
            Self::fragment_digest(&mut self.sponge, &mut fragment, digest);
        }
        Ok(digests)
    }

    /// Compute the same digests as [`digests`](Self::digests), fanning the
    /// security fragments out across threads.
    ///
    /// Each fragment runs on an independently cloned sponge and writes a
    /// disjoint region of the output; completion is the thread join. Falls
    /// back to the sequential path when there's one fragment or too little
    /// hardware parallelism to matter. Output is bit-identical either way —
    /// this is purely a throughput optimization.
    pub fn digests_parallel(&mut self, key: &[Trit]) -> Result<Vec<Trit>, SigningError> {
        if key.is_empty() || key.len() % KEY_FRAGMENT_LENGTH != 0 {
            return Err(SigningError::InvalidKeyLength(key.len()));
        }
        let security = key.len() / KEY_FRAGMENT_LENGTH;
        let hardware = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        if security == 1 || hardware < security {
            return self.digests(key);
        }

        debug!(security, hardware, "computing key digests in parallel");
        let mut digests = vec![0 as Trit; security * HASH_LENGTH];
        std::thread::scope(|scope| {
            for (fragment, digest) in key
                .chunks(KEY_FRAGMENT_LENGTH)
                .zip(digests.chunks_mut(HASH_LENGTH))
            {
                let mut sponge = self.sponge.clone();
                scope.spawn(move || {
                    sponge.reset();
                    let mut fragment = fragment.to_vec();
                    Self::fragment_digest(&mut sponge, &mut fragment, digest);
                });
            }
        });
        Ok(digests)
    }

    /// Absorb digests in order and squeeze the 243-trit address.
    ///
    /// Pure and order-sensitive: multisig relies on digest order to bind an
    /// address to participant ordering.
    pub fn address(&mut self, digests: &[Trit]) -> Vec<Trit> {
        self.sponge.reset();
        let mut address = vec![0 as Trit; HASH_LENGTH];
        self.sponge.absorb(digests);
        self.sponge.squeeze(&mut address);
        address
    }

    /// Sign one key fragment against one normalized bundle fragment.
    ///
    /// Sub-block `i` receives `13 - v_i` rounds of (reset → absorb →
    /// squeeze). The verifier's `v_i + 13` rounds complete the chain.
    pub fn signature_fragment(
        &mut self,
        normalized_fragment: &[i8],
        key_fragment: &[Trit],
    ) -> Vec<Trit> {
        assert_eq!(key_fragment.len(), KEY_FRAGMENT_LENGTH);
        assert_eq!(normalized_fragment.len(), NORMALIZED_FRAGMENT_LENGTH);

        let mut signature = key_fragment.to_vec();
        for (value, sub_block) in normalized_fragment
            .iter()
            .zip(signature.chunks_mut(HASH_LENGTH))
        {
            for _ in 0..(MAX_TRYTE_VALUE - value) {
                self.sponge.reset();
                self.sponge.absorb(sub_block);
                self.sponge.squeeze(sub_block);
            }
        }
        signature
    }

    /// Run a signature fragment forward through the remaining chain rounds
    /// and recover the digest it commits to.
    ///
    /// For an authentic signature this equals the corresponding output of
    /// [`digests`](Self::digests) for the original key.
    pub fn digest_from_signature(
        &mut self,
        normalized_fragment: &[i8],
        signature_fragment: &[Trit],
    ) -> Vec<Trit> {
        assert_eq!(signature_fragment.len(), KEY_FRAGMENT_LENGTH);
        assert_eq!(normalized_fragment.len(), NORMALIZED_FRAGMENT_LENGTH);

        self.sponge.reset();
        let mut chain = self.sponge.clone();
        let mut buffer = vec![0 as Trit; HASH_LENGTH];
        for (value, sub_block) in normalized_fragment
            .iter()
            .zip(signature_fragment.chunks(HASH_LENGTH))
        {
            buffer.copy_from_slice(sub_block);
            for _ in 0..(value + MAX_TRYTE_VALUE) {
                chain.reset();
                chain.absorb(&buffer);
                chain.squeeze(&mut buffer);
            }
            self.sponge.absorb(&buffer);
        }

        let mut digest = vec![0 as Trit; HASH_LENGTH];
        self.sponge.squeeze(&mut digest);
        digest
    }

    /// Verify a set of signature fragments against an address and bundle
    /// hash. Boolean outcome by design — an invalid signature is an answer,
    /// not an error.
    pub fn validate_signature(
        &mut self,
        expected_address: &str,
        signature_fragments: &[String],
        bundle_hash: &str,
    ) -> bool {
        let normalized = normalized_bundle(bundle_hash);

        let mut digests = vec![0 as Trit; signature_fragments.len() * HASH_LENGTH];
        for (i, fragment) in signature_fragments.iter().enumerate() {
            let fragment_index = i % 3;
            let normalized_fragment = &normalized[fragment_index * NORMALIZED_FRAGMENT_LENGTH
                ..(fragment_index + 1) * NORMALIZED_FRAGMENT_LENGTH];
            let digest = self.digest_from_signature(
                normalized_fragment,
                &ternary::trits_from_trytes(fragment),
            );
            digests[i * HASH_LENGTH..(i + 1) * HASH_LENGTH].copy_from_slice(&digest);
        }

        let candidate = ternary::trytes_from_trits(&self.address(&digests));
        candidate == expected_address
    }

    /// Verify the signature carried by a finalized bundle for one input
    /// address: collect that address's non-sentinel fragments in slot order
    /// and validate them against the shared bundle hash.
    pub fn validate_bundle_signature(&mut self, bundle: &Bundle, input_address: &str) -> bool {
        let mut bundle_hash = String::new();
        let mut fragments: Vec<String> = Vec::new();

        for transaction in bundle.transactions() {
            if transaction.address != input_address {
                continue;
            }
            bundle_hash = transaction.bundle.clone();
            if ternary::is_all_nines(&transaction.signature_message) {
                break;
            }
            fragments.push(transaction.signature_message.clone());
        }

        // Address absent from the bundle, or carrying no signature at all.
        if fragments.is_empty() || bundle_hash.len() != ADDRESS_LENGTH {
            return false;
        }
        self.validate_signature(input_address, &fragments, &bundle_hash)
    }
}

/// Derive the address for `(seed, index, security)` in one shot:
/// key → digests → address, returned as 81 trytes.
///
/// Checksumming is a wallet concern and deliberately absent here.
pub fn new_address(
    seed: &str,
    index: usize,
    security: usize,
) -> Result<String, SigningError> {
    let mut signing = Signing::default();
    let seed_trits = ternary::trits_padded(seed, SEED_LENGTH);
    let key = signing.key(&seed_trits, index, security)?;
    let digests = signing.digests(&key)?;
    Ok(ternary::trytes_from_trits(&signing.address(&digests)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MIN_TRYTE_VALUE, SIGNATURE_MESSAGE_LENGTH};

    const TEST_SEED: &str =
        "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    fn light_signing() -> Signing {
        // The light Curl variant keeps chain-heavy tests fast; every
        // property here is round-count agnostic.
        Signing::new(SpongeMode::CurlP27.create())
    }

    #[test]
    fn security_zero_is_rejected_up_front() {
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = Signing::default();
        assert_eq!(
            signing.key(&seed, 0, 0),
            Err(SigningError::InvalidSecurityLevel(0))
        );
    }

    #[test]
    fn malformed_seed_is_rejected_up_front() {
        let mut signing = Signing::default();
        assert_eq!(
            signing.key(&[0; 100], 0, 1),
            Err(SigningError::InvalidSeedLength(100))
        );
    }

    #[test]
    fn malformed_key_is_rejected() {
        let mut signing = Signing::default();
        assert_eq!(
            signing.digests(&[0; 6560]),
            Err(SigningError::InvalidKeyLength(6560))
        );
        assert_eq!(signing.digests(&[]), Err(SigningError::InvalidKeyLength(0)));
    }

    #[test]
    fn key_digest_address_lengths_at_security_two() {
        // The concrete scenario every client implementation must agree on:
        // 81×'A' seed, security 2, index 0.
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = light_signing();

        let key = signing.key(&seed, 0, 2).unwrap();
        assert_eq!(key.len(), 13_122);

        let digests = signing.digests(&key).unwrap();
        assert_eq!(digests.len(), 486);

        let address = signing.address(&digests);
        assert_eq!(address.len(), 243);
    }

    #[test]
    fn derivation_is_deterministic_and_index_sensitive() {
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = light_signing();

        let first = signing.key(&seed, 3, 1).unwrap();
        let second = signing.key(&seed, 3, 1).unwrap();
        assert_eq!(first, second);

        let other_index = signing.key(&seed, 4, 1).unwrap();
        assert_ne!(first, other_index);
    }

    #[test]
    fn subseed_increment_wraps_past_one() {
        let mut seed = vec![1 as Trit; SEED_LENGTH];
        seed[0] = 1;
        let subseed = Signing::<Curl>::subseed(&seed, 1);
        // Every digit was 1, so the +1 carries all the way through.
        assert!(subseed.iter().all(|&t| t == -1));
    }

    #[test]
    fn parallel_digests_match_sequential() {
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = light_signing();
        let key = signing.key(&seed, 0, 2).unwrap();

        let sequential = signing.digests(&key).unwrap();
        let parallel = signing.digests_parallel(&key).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn address_is_order_sensitive() {
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = light_signing();
        let key = signing.key(&seed, 0, 2).unwrap();
        let digests = signing.digests(&key).unwrap();

        let mut swapped = digests[HASH_LENGTH..].to_vec();
        swapped.extend_from_slice(&digests[..HASH_LENGTH]);

        assert_ne!(signing.address(&digests), signing.address(&swapped));
    }

    #[test]
    fn complementary_chains_meet_at_the_digest() {
        // The core identity: chain-by-(13−v) then chain-by-(v+13) equals
        // the full 26-round chain, for every sub-block position at once.
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = light_signing();
        let key = signing.key(&seed, 0, 1).unwrap();
        let expected_digest = signing.digests(&key).unwrap();

        for value in [MIN_TRYTE_VALUE, -1, 0, 1, MAX_TRYTE_VALUE] {
            let normalized = [value; NORMALIZED_FRAGMENT_LENGTH];
            let signature = signing.signature_fragment(&normalized, &key);
            let recovered = signing.digest_from_signature(&normalized, &signature);
            assert_eq!(recovered, expected_digest, "digit value {value}");
        }
    }

    #[test]
    fn tampered_signature_recovers_a_different_digest() {
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = light_signing();
        let key = signing.key(&seed, 0, 1).unwrap();
        let expected_digest = signing.digests(&key).unwrap();

        let normalized = [0i8; NORMALIZED_FRAGMENT_LENGTH];
        let mut signature = signing.signature_fragment(&normalized, &key);
        signature[500] = -signature[500] + ((signature[500] == 0) as i8);
        let recovered = signing.digest_from_signature(&normalized, &signature);
        assert_ne!(recovered, expected_digest);
    }

    #[test]
    fn new_address_is_stable() {
        let first = new_address(TEST_SEED, 0, 1).unwrap();
        let second = new_address(TEST_SEED, 0, 1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 81);
        assert!(ternary::is_trytes(&first));
    }

    #[test]
    fn signature_fragment_width_matches_the_wire_field() {
        let seed = ternary::trits_padded(TEST_SEED, SEED_LENGTH);
        let mut signing = light_signing();
        let key = signing.key(&seed, 0, 1).unwrap();
        let normalized = [5i8; NORMALIZED_FRAGMENT_LENGTH];
        let signature = signing.signature_fragment(&normalized, &key);
        assert_eq!(signature.len(), KEY_FRAGMENT_LENGTH);
        assert_eq!(
            ternary::trytes_from_trits(&signature).len(),
            SIGNATURE_MESSAGE_LENGTH
        );
    }
}
