//! Bundle assembly and finalization.
//!
//! A bundle is the atomic unit of transfer: a sequence of transactions
//! bound together by a shared hash computed over each transaction's essence
//! (address, value, obsolete tag, timestamp, indices). Finalization also
//! enforces the anti-collision rule for the signing scheme: a normalized
//! bundle hash containing the digit 13 would leave one hash chain
//! completely unwound, so the finalizer bumps the first transaction's
//! obsolete tag and rehashes until no fragment digit equals 13.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{
    ADDRESS_LENGTH, BUNDLE_ESSENCE_TRIT_LENGTH, HASH_LENGTH, INDEX_TRIT_LENGTH, MAX_TRYTE_VALUE,
    MIN_TRYTE_VALUE, NONCE_LENGTH, NORMALIZED_FRAGMENT_LENGTH, NORMALIZED_LENGTH,
    PLACEHOLDER_TIMESTAMP, SIGNATURE_MESSAGE_LENGTH, TAG_LENGTH, VALUE_TRIT_LENGTH,
};
use crate::crypto::Sponge;
use crate::ternary::{self, Trit};
use crate::transaction::types::Transaction;

/// Errors raised while assembling a bundle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    /// Finalize called on a bundle with no entries.
    #[error("cannot finalize an empty bundle")]
    Empty,

    /// Finalize called twice, or a mutation attempted after finalize.
    #[error("bundle is already finalized")]
    AlreadyFinalized,
}

/// An ordered collection of transactions forming one atomic operation.
///
/// Entries accumulate via [`add_entry`](Self::add_entry); calling
/// [`finalize`](Self::finalize) computes the bundle hash and freezes the
/// essence fields. Signatures and placeholders are layered on afterwards
/// with [`add_trytes`](Self::add_trytes) and
/// [`set_signature_message`](Self::set_signature_message).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bundle {
    transactions: Vec<Transaction>,
    finalized: bool,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transactions in bundle order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Sum of all transaction values. Zero for a well-formed value
    /// transfer: inputs and outputs must cancel.
    pub fn value_sum(&self) -> i64 {
        self.transactions.iter().map(|tx| tx.value).sum()
    }

    /// Append `count` transactions for one entry. The entry's value rides
    /// on the first transaction; the rest carry zero and exist to hold
    /// additional signature fragments or message chunks.
    pub fn add_entry(
        &mut self,
        count: usize,
        address: &str,
        value: i64,
        tag: &str,
        timestamp: u64,
    ) -> Result<(), BundleError> {
        if self.finalized {
            return Err(BundleError::AlreadyFinalized);
        }
        assert!(count > 0, "entry must span at least one transaction");
        for i in 0..count {
            let slot_value = if i == 0 { value } else { 0 };
            self.transactions
                .push(Transaction::new(address, slot_value, tag, timestamp));
        }
        Ok(())
    }

    /// Compute the bundle hash, stamp it and the indices into every
    /// transaction, and freeze the essence fields.
    ///
    /// The hash absorbs each transaction's 486-trit essence in order. If
    /// any digit of the normalized hash equals 13, the first transaction's
    /// obsolete tag is ripple-incremented and the whole essence is rehashed
    /// from scratch; the loop terminates because each retry picks a fresh
    /// point in the hash space.
    pub fn finalize<S: Sponge>(&mut self, sponge: &mut S) -> Result<(), BundleError> {
        if self.finalized {
            return Err(BundleError::AlreadyFinalized);
        }
        if self.transactions.is_empty() {
            return Err(BundleError::Empty);
        }

        let last_index = self.transactions.len() - 1;
        for (index, tx) in self.transactions.iter_mut().enumerate() {
            tx.current_index = index;
            tx.last_index = last_index;
        }

        let mut attempts = 0u32;
        let hash = loop {
            sponge.reset();
            for tx in &self.transactions {
                sponge.absorb(&essence_trits(tx));
            }
            let mut hash = vec![0 as Trit; HASH_LENGTH];
            sponge.squeeze(&mut hash);
            let trytes = ternary::trytes_from_trits(&hash);

            let normalized = normalized_bundle(&trytes);
            if normalized.iter().all(|&digit| digit != MAX_TRYTE_VALUE) {
                if attempts > 0 {
                    debug!(attempts, "bundle hash normalized cleanly after retries");
                }
                break trytes;
            }

            // A digit of 13 would leave one chain fully unwound. Bump the
            // anti-collision counter and rehash.
            let mut tag_trits =
                ternary::trits_padded(&self.transactions[0].obsolete_tag, TAG_LENGTH * 3);
            ternary::increment(&mut tag_trits);
            self.transactions[0].obsolete_tag = ternary::trytes_from_trits(&tag_trits);
            attempts += 1;
        };

        for tx in &mut self.transactions {
            tx.bundle = hash.clone();
        }
        self.finalized = true;
        Ok(())
    }

    /// Fill signature/message fields and placeholder attachment fields.
    ///
    /// `fragments[i]` lands in transaction `i`; missing or empty entries
    /// get the all-nines sentinel. Trunk, branch, and nonce become
    /// sentinels too, and attachment timestamps get the placeholder epoch —
    /// the proof-of-work and tip-selection stages overwrite them.
    pub fn add_trytes(&mut self, fragments: &[String]) {
        let empty_hash = "9".repeat(ADDRESS_LENGTH);
        for (index, tx) in self.transactions.iter_mut().enumerate() {
            tx.signature_message = match fragments.get(index) {
                Some(fragment) if !fragment.is_empty() => {
                    ternary::pad_trytes(fragment, SIGNATURE_MESSAGE_LENGTH)
                }
                _ => "9".repeat(SIGNATURE_MESSAGE_LENGTH),
            };
            tx.trunk = empty_hash.clone();
            tx.branch = empty_hash.clone();
            tx.nonce = "9".repeat(NONCE_LENGTH);
            tx.attachment_timestamp = PLACEHOLDER_TIMESTAMP;
            tx.attachment_timestamp_lower = PLACEHOLDER_TIMESTAMP;
            tx.attachment_timestamp_upper = PLACEHOLDER_TIMESTAMP;
        }
    }

    /// Overwrite one transaction's signature/message field. Used when
    /// signatures are produced out of band (multi-party signing).
    pub fn set_signature_message(&mut self, index: usize, fragment: String) {
        self.transactions[index].signature_message =
            ternary::pad_trytes(&fragment, SIGNATURE_MESSAGE_LENGTH);
    }
}

/// A transaction's bundle essence: the trits the bundle hash absorbs.
fn essence_trits(tx: &Transaction) -> Vec<Trit> {
    let mut essence = Vec::with_capacity(BUNDLE_ESSENCE_TRIT_LENGTH);
    essence.extend(ternary::trits_padded(&tx.address, HASH_LENGTH));
    essence.extend(ternary::trits_from_value(tx.value, VALUE_TRIT_LENGTH));
    essence.extend(ternary::trits_padded(&tx.obsolete_tag, TAG_LENGTH * 3));
    essence.extend(ternary::trits_from_value(
        tx.timestamp as i64,
        INDEX_TRIT_LENGTH,
    ));
    essence.extend(ternary::trits_from_value(
        tx.current_index as i64,
        INDEX_TRIT_LENGTH,
    ));
    essence.extend(ternary::trits_from_value(
        tx.last_index as i64,
        INDEX_TRIT_LENGTH,
    ));
    debug_assert_eq!(essence.len(), BUNDLE_ESSENCE_TRIT_LENGTH);
    essence
}

/// Normalize a bundle hash into 81 signable digits in [-13, 13].
///
/// Each tryte maps to its balanced value; each 27-digit fragment is then
/// sum-adjusted to zero by walking digits from the front, so the three
/// fragments carry equal aggregate weight regardless of the raw hash. This
/// is what makes forging one chain direction as hard as the other.
pub fn normalized_bundle(bundle_hash: &str) -> [i8; NORMALIZED_LENGTH] {
    assert_eq!(
        bundle_hash.len(),
        NORMALIZED_LENGTH,
        "bundle hash must be {NORMALIZED_LENGTH} trytes"
    );

    let mut normalized = [0i8; NORMALIZED_LENGTH];
    for (digit, c) in normalized.iter_mut().zip(bundle_hash.chars()) {
        *digit = ternary::tryte_value(c);
    }

    for fragment in normalized.chunks_mut(NORMALIZED_FRAGMENT_LENGTH) {
        let mut sum: i64 = fragment.iter().map(|&d| d as i64).sum();
        while sum > 0 {
            for digit in fragment.iter_mut() {
                if *digit > MIN_TRYTE_VALUE {
                    *digit -= 1;
                    break;
                }
            }
            sum -= 1;
        }
        while sum < 0 {
            for digit in fragment.iter_mut() {
                if *digit < MAX_TRYTE_VALUE {
                    *digit += 1;
                    break;
                }
            }
            sum += 1;
        }
    }
    normalized
}
