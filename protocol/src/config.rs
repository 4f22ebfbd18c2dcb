//! # Protocol Configuration & Constants
//!
//! Every magic number in TRION lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are load-bearing in the worst way: the signing
//! scheme, the bundle hash, and the proof-of-work all assume the exact same
//! digit widths. Change one and every signature on the network stops
//! verifying. Choose wisely during devnet.

// ---------------------------------------------------------------------------
// Ternary Geometry
// ---------------------------------------------------------------------------

/// Trits per tryte. Balanced ternary groups digits in threes, giving the
/// 27-symbol tryte alphabet.
pub const TRITS_PER_TRYTE: usize = 3;

/// The tryte alphabet. `9` encodes zero; `A`..`M` encode 1..13 and `N`..`Z`
/// encode -13..-1. The placement of `9` at index zero is what makes the
/// all-nines string the natural "empty" sentinel for unfilled fields.
pub const TRYTE_ALPHABET: &str = "9ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Largest value a single tryte can carry.
pub const MAX_TRYTE_VALUE: i8 = 13;

/// Smallest value a single tryte can carry.
pub const MIN_TRYTE_VALUE: i8 = -13;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Output length of the sponge in trits. Addresses, digests, bundle hashes,
/// and nonces are all exactly one hash length.
pub const HASH_LENGTH: usize = 243;

/// Internal sponge state length in trits: three hash lengths.
pub const STATE_LENGTH: usize = HASH_LENGTH * 3;

/// Rounds of the full-strength Curl permutation.
pub const CURL_ROUNDS_P81: usize = 81;

/// Rounds of the light Curl variant. Same construction, fewer rounds —
/// interchangeable behind the [`crate::crypto::Sponge`] trait.
pub const CURL_ROUNDS_P27: usize = 27;

// ---------------------------------------------------------------------------
// Signing Scheme
// ---------------------------------------------------------------------------

/// Seed length in trits. The root secret is always one hash length.
pub const SEED_LENGTH: usize = HASH_LENGTH;

/// Sub-blocks per key fragment. Each sub-block anchors one hash chain.
pub const KEY_SUB_BLOCKS: usize = 27;

/// Key fragment length in trits: 27 hash-length sub-blocks. One fragment
/// per security level.
pub const KEY_FRAGMENT_LENGTH: usize = HASH_LENGTH * KEY_SUB_BLOCKS;

/// Total hash-chain length. Signer and verifier split these rounds between
/// them: `13 - v` at signing time, `v + 13` at verification, summing to 26
/// for every message digit `v`.
pub const CHAIN_ROUNDS: usize = 26;

/// Length of a normalized bundle hash in digits.
pub const NORMALIZED_LENGTH: usize = 81;

/// Digits per normalized bundle fragment; three fragments cover the hash.
pub const NORMALIZED_FRAGMENT_LENGTH: usize = 27;

// ---------------------------------------------------------------------------
// Transaction Wire Frame
// ---------------------------------------------------------------------------
//
// Tryte offsets of every field in the canonical 2673-tryte transaction
// encoding. The bundle finalizer, the signing engine, and the proof-of-work
// search all address this frame directly, so the offsets are consensus
// rules, not serialization trivia.

/// Full transaction length in trytes.
pub const TRANSACTION_TRYTE_LENGTH: usize = 2673;

/// Full transaction length in trits.
pub const TRANSACTION_TRIT_LENGTH: usize = TRANSACTION_TRYTE_LENGTH * TRITS_PER_TRYTE;

/// Signature/message field width in trytes (6561 trits — one key fragment).
pub const SIGNATURE_MESSAGE_LENGTH: usize = 2187;

/// Address field width in trytes (243 trits).
pub const ADDRESS_LENGTH: usize = 81;

/// Value field width in trytes (81 trits of balanced ternary).
pub const VALUE_LENGTH: usize = 27;

/// Value field width in trits.
pub const VALUE_TRIT_LENGTH: usize = VALUE_LENGTH * TRITS_PER_TRYTE;

/// Obsolete-tag field width in trytes. Doubles as the anti-collision
/// counter during bundle finalization.
pub const TAG_LENGTH: usize = 27;

/// Timestamp / current-index / last-index field width in trytes (27 trits).
pub const INDEX_LENGTH: usize = 9;

/// Timestamp / index field width in trits.
pub const INDEX_TRIT_LENGTH: usize = INDEX_LENGTH * TRITS_PER_TRYTE;

/// Nonce field width in trytes (243 trits). The final hash-length block of
/// the frame, solved by the proof-of-work search.
pub const NONCE_LENGTH: usize = 81;

pub const SIGNATURE_MESSAGE_OFFSET: usize = 0;
pub const ADDRESS_OFFSET: usize = SIGNATURE_MESSAGE_OFFSET + SIGNATURE_MESSAGE_LENGTH;
pub const VALUE_OFFSET: usize = ADDRESS_OFFSET + ADDRESS_LENGTH;
pub const TAG_OFFSET: usize = VALUE_OFFSET + VALUE_LENGTH;
pub const TIMESTAMP_OFFSET: usize = TAG_OFFSET + TAG_LENGTH;
pub const CURRENT_INDEX_OFFSET: usize = TIMESTAMP_OFFSET + INDEX_LENGTH;
pub const LAST_INDEX_OFFSET: usize = CURRENT_INDEX_OFFSET + INDEX_LENGTH;
pub const BUNDLE_OFFSET: usize = LAST_INDEX_OFFSET + INDEX_LENGTH;
pub const TRUNK_OFFSET: usize = BUNDLE_OFFSET + ADDRESS_LENGTH;
pub const BRANCH_OFFSET: usize = TRUNK_OFFSET + ADDRESS_LENGTH;
pub const NONCE_OFFSET: usize = BRANCH_OFFSET + ADDRESS_LENGTH;

/// Trit offset where the nonce block begins. Everything before this is the
/// fixed prefix absorbed by the proof-of-work search.
pub const NONCE_TRIT_OFFSET: usize = NONCE_OFFSET * TRITS_PER_TRYTE;

// ---------------------------------------------------------------------------
// Bundle Lifecycle
// ---------------------------------------------------------------------------

/// Trits absorbed per transaction while computing the bundle hash:
/// address ∥ value ∥ obsolete-tag ∥ timestamp ∥ current-index ∥ last-index.
pub const BUNDLE_ESSENCE_TRIT_LENGTH: usize =
    HASH_LENGTH + VALUE_TRIT_LENGTH + TAG_LENGTH * TRITS_PER_TRYTE + INDEX_TRIT_LENGTH * 3;

/// Placeholder epoch written into attachment timestamps before a
/// transaction has actually been attached. Recognizably bogus on purpose.
pub const PLACEHOLDER_TIMESTAMP: u64 = 999_999_999;

// ---------------------------------------------------------------------------
// Proof of Work
// ---------------------------------------------------------------------------

/// Default minimum weight magnitude: required trailing zero trits in the
/// transaction hash. Mainnet value; devnets typically run much lower.
pub const MIN_WEIGHT_MAGNITUDE: usize = 14;

/// Trit offset, within the nonce block, of the four lane-separation slots.
/// The bit-sliced search overwrites these with fixed per-lane patterns so
/// all 64 lanes explore distinct nonces.
pub const NONCE_LANE_OFFSET: usize = 162;

/// Trit offset, within the nonce block, of the per-worker odometer region.
/// Each worker thread ripple-increments this region once per thread index,
/// carving the nonce space into disjoint subranges.
pub const NONCE_WORKER_OFFSET: usize = NONCE_LANE_OFFSET + HASH_LENGTH / 9;

/// Trit offset, within the nonce block, of the inner search counter that
/// each worker increments before every permutation.
pub const NONCE_COUNTER_OFFSET: usize = NONCE_LANE_OFFSET + (HASH_LENGTH / 9) * 2;
