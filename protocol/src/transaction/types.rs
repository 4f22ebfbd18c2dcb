//! The transaction record and its canonical wire frame.
//!
//! A transaction is 2673 trytes (8019 trits) on the wire. The frame is not
//! negotiable: the bundle hash absorbs fields at these exact offsets, the
//! signing engine signs over them, and the proof-of-work search treats
//! everything before the final 243-trit nonce block as its fixed prefix.
//! `to_trytes` and `from_trytes` below are therefore consensus code wearing
//! a serialization costume.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    ADDRESS_LENGTH, BRANCH_OFFSET, BUNDLE_OFFSET, CURRENT_INDEX_OFFSET, INDEX_LENGTH,
    INDEX_TRIT_LENGTH, LAST_INDEX_OFFSET, NONCE_LENGTH, NONCE_OFFSET, SIGNATURE_MESSAGE_LENGTH,
    TAG_LENGTH, TAG_OFFSET, TIMESTAMP_OFFSET, TRANSACTION_TRYTE_LENGTH, TRUNK_OFFSET,
    VALUE_LENGTH, VALUE_OFFSET, VALUE_TRIT_LENGTH,
};
use crate::ternary::{self, Trit};

/// Errors decoding a transaction from its wire encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// Wrong overall length — the frame is exactly 2673 trytes.
    #[error("invalid transaction length {0}: expected {TRANSACTION_TRYTE_LENGTH} trytes")]
    InvalidLength(usize),

    /// A character outside the tryte alphabet.
    #[error("transaction contains non-tryte characters")]
    InvalidTrytes,

    /// A numeric frame field decoding to a value outside its domain.
    #[error("transaction {0} field encodes a negative value")]
    NegativeField(&'static str),
}

/// One transaction in a bundle.
///
/// Mutable while the bundle is being assembled; once
/// [`finalize`](crate::transaction::Bundle::finalize) has run, everything
/// except the signature field (filled next) and the nonce (set by proof of
/// work) is fixed. The attachment timestamps are node-layer metadata: they
/// ride along for submission but sit outside the hashed frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Signature, or message fragment for zero-value transactions.
    /// 2187 trytes once populated; all-nines marks an unsigned slot.
    pub signature_message: String,
    /// Target address, 81 trytes, no checksum.
    pub address: String,
    /// Transferred value; negative on input (spending) transactions.
    pub value: i64,
    /// User tag, 27 trytes. Also the balanced-ternary counter the bundle
    /// finalizer bumps to dodge normalized-hash collisions — hence
    /// "obsolete": its user-visible content doesn't survive finalization
    /// of colliding bundles.
    pub obsolete_tag: String,
    /// Creation time, seconds since the epoch.
    pub timestamp: u64,
    /// Position of this transaction within its bundle.
    pub current_index: usize,
    /// Index of the bundle's final transaction.
    pub last_index: usize,
    /// Bundle hash shared by every transaction in the bundle, 81 trytes.
    pub bundle: String,
    /// Trunk reference, 81 trytes.
    pub trunk: String,
    /// Branch reference, 81 trytes.
    pub branch: String,
    /// Proof-of-work nonce, 81 trytes (the frame's final 243 trits).
    pub nonce: String,
    /// When the transaction was attached (node metadata, unhashed).
    pub attachment_timestamp: u64,
    /// Lower bound of the attachment window (node metadata, unhashed).
    pub attachment_timestamp_lower: u64,
    /// Upper bound of the attachment window (node metadata, unhashed).
    pub attachment_timestamp_upper: u64,
}

impl Transaction {
    /// A fresh entry transaction. Link, signature, and nonce fields start
    /// empty and are populated over the bundle lifecycle.
    pub fn new(address: &str, value: i64, tag: &str, timestamp: u64) -> Self {
        assert!(
            ternary::is_trytes(address) && address.len() == ADDRESS_LENGTH,
            "address must be {ADDRESS_LENGTH} trytes"
        );
        assert!(
            ternary::is_trytes(tag) && tag.len() <= TAG_LENGTH,
            "tag must be at most {TAG_LENGTH} trytes"
        );
        Self {
            signature_message: String::new(),
            address: address.to_string(),
            value,
            obsolete_tag: ternary::pad_trytes(tag, TAG_LENGTH),
            timestamp,
            current_index: 0,
            last_index: 0,
            bundle: String::new(),
            trunk: String::new(),
            branch: String::new(),
            nonce: String::new(),
            attachment_timestamp: 0,
            attachment_timestamp_lower: 0,
            attachment_timestamp_upper: 0,
        }
    }

    /// Encode the canonical 2673-tryte wire frame.
    ///
    /// Unpopulated string fields are padded with `9`s to their exact frame
    /// width, so a half-built transaction still encodes to a well-formed
    /// frame (with sentinel fields).
    pub fn to_trytes(&self) -> String {
        let mut frame = String::with_capacity(TRANSACTION_TRYTE_LENGTH);
        frame.push_str(&ternary::pad_trytes(
            &self.signature_message,
            SIGNATURE_MESSAGE_LENGTH,
        ));
        frame.push_str(&ternary::pad_trytes(&self.address, ADDRESS_LENGTH));
        frame.push_str(&ternary::trytes_from_trits(&ternary::trits_from_value(
            self.value,
            VALUE_TRIT_LENGTH,
        )));
        frame.push_str(&ternary::pad_trytes(&self.obsolete_tag, TAG_LENGTH));
        frame.push_str(&encode_index(self.timestamp as i64));
        frame.push_str(&encode_index(self.current_index as i64));
        frame.push_str(&encode_index(self.last_index as i64));
        frame.push_str(&ternary::pad_trytes(&self.bundle, ADDRESS_LENGTH));
        frame.push_str(&ternary::pad_trytes(&self.trunk, ADDRESS_LENGTH));
        frame.push_str(&ternary::pad_trytes(&self.branch, ADDRESS_LENGTH));
        frame.push_str(&ternary::pad_trytes(&self.nonce, NONCE_LENGTH));
        debug_assert_eq!(frame.len(), TRANSACTION_TRYTE_LENGTH);
        frame
    }

    /// Encode the frame as trits, the form the proof-of-work search
    /// consumes.
    pub fn to_trits(&self) -> Vec<Trit> {
        ternary::trits_from_trytes(&self.to_trytes())
    }

    /// Decode a transaction from its wire frame.
    ///
    /// Attachment metadata is not part of the frame and comes back zeroed.
    pub fn from_trytes(trytes: &str) -> Result<Self, TransactionError> {
        if trytes.len() != TRANSACTION_TRYTE_LENGTH {
            return Err(TransactionError::InvalidLength(trytes.len()));
        }
        if !ternary::is_trytes(trytes) {
            return Err(TransactionError::InvalidTrytes);
        }

        let field = |offset: usize, length: usize| trytes[offset..offset + length].to_string();
        let numeric = |offset: usize, length: usize| {
            ternary::value_from_trits(&ternary::trits_from_trytes(
                &trytes[offset..offset + length],
            ))
        };

        let timestamp = numeric(TIMESTAMP_OFFSET, INDEX_LENGTH);
        let current_index = numeric(CURRENT_INDEX_OFFSET, INDEX_LENGTH);
        let last_index = numeric(LAST_INDEX_OFFSET, INDEX_LENGTH);
        for (name, value) in [
            ("timestamp", timestamp),
            ("current_index", current_index),
            ("last_index", last_index),
        ] {
            if value < 0 {
                return Err(TransactionError::NegativeField(name));
            }
        }

        Ok(Self {
            signature_message: field(0, SIGNATURE_MESSAGE_LENGTH),
            address: field(SIGNATURE_MESSAGE_LENGTH, ADDRESS_LENGTH),
            value: numeric(VALUE_OFFSET, VALUE_LENGTH),
            obsolete_tag: field(TAG_OFFSET, TAG_LENGTH),
            timestamp: timestamp as u64,
            current_index: current_index as usize,
            last_index: last_index as usize,
            bundle: field(BUNDLE_OFFSET, ADDRESS_LENGTH),
            trunk: field(TRUNK_OFFSET, ADDRESS_LENGTH),
            branch: field(BRANCH_OFFSET, ADDRESS_LENGTH),
            nonce: field(NONCE_OFFSET, NONCE_LENGTH),
            attachment_timestamp: 0,
            attachment_timestamp_lower: 0,
            attachment_timestamp_upper: 0,
        })
    }
}

/// Encode a numeric frame field as 9 trytes (27 trits).
fn encode_index(value: i64) -> String {
    ternary::trytes_from_trits(&ternary::trits_from_value(value, INDEX_TRIT_LENGTH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TRANSACTION_TRIT_LENGTH;

    fn sample() -> Transaction {
        let address = ternary::pad_trytes("RIDDLE", ADDRESS_LENGTH);
        let mut tx = Transaction::new(&address, -1_000, "TAG", 1_700_000_000);
        tx.current_index = 1;
        tx.last_index = 3;
        tx.bundle = ternary::pad_trytes("BUNDLEHASH", ADDRESS_LENGTH);
        tx
    }

    #[test]
    fn frame_has_exact_widths() {
        let tx = sample();
        let trytes = tx.to_trytes();
        assert_eq!(trytes.len(), TRANSACTION_TRYTE_LENGTH);
        assert_eq!(tx.to_trits().len(), TRANSACTION_TRIT_LENGTH);
    }

    #[test]
    fn wire_roundtrip_preserves_frame_fields() {
        let tx = sample();
        let decoded = Transaction::from_trytes(&tx.to_trytes()).unwrap();
        assert_eq!(decoded.address, tx.address);
        assert_eq!(decoded.value, -1_000);
        assert_eq!(decoded.obsolete_tag, ternary::pad_trytes("TAG", TAG_LENGTH));
        assert_eq!(decoded.timestamp, 1_700_000_000);
        assert_eq!(decoded.current_index, 1);
        assert_eq!(decoded.last_index, 3);
        assert_eq!(decoded.bundle, tx.bundle);
        // Re-encoding the decoded record must be byte-identical.
        assert_eq!(decoded.to_trytes(), tx.to_trytes());
    }

    #[test]
    fn unfilled_fields_encode_as_nines() {
        let tx = sample();
        let trytes = tx.to_trytes();
        assert!(ternary::is_all_nines(&trytes[..SIGNATURE_MESSAGE_LENGTH]));
        assert!(ternary::is_all_nines(&trytes[NONCE_OFFSET..]));
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert_eq!(
            Transaction::from_trytes("ABC"),
            Err(TransactionError::InvalidLength(3))
        );
        let lowercase = "a".repeat(TRANSACTION_TRYTE_LENGTH);
        assert_eq!(
            Transaction::from_trytes(&lowercase),
            Err(TransactionError::InvalidTrytes)
        );
    }

    #[test]
    fn serde_roundtrip() {
        let tx = sample();
        let json = serde_json::to_string(&tx).unwrap();
        let recovered: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, recovered);
    }

    #[test]
    #[should_panic(expected = "address must be")]
    fn short_address_is_rejected() {
        Transaction::new("SHORT", 0, "TAG", 0);
    }

    #[test]
    #[should_panic(expected = "tag must be at most")]
    fn oversized_tag_is_rejected() {
        let address = ternary::pad_trytes("RIDDLE", ADDRESS_LENGTH);
        Transaction::new(&address, 0, &"T".repeat(TAG_LENGTH + 3), 0);
    }

    #[test]
    fn max_width_tag_keeps_the_frame_exact() {
        let address = ternary::pad_trytes("RIDDLE", ADDRESS_LENGTH);
        let tx = Transaction::new(&address, 0, &"T".repeat(TAG_LENGTH), 0);
        let trytes = tx.to_trytes();
        assert_eq!(trytes.len(), TRANSACTION_TRYTE_LENGTH);
        assert_eq!(&trytes[TAG_OFFSET..TAG_OFFSET + TAG_LENGTH], tx.obsolete_tag);
    }

    #[test]
    fn negative_index_frames_are_rejected() {
        let mut trytes = sample().to_trytes();
        trytes.replace_range(
            CURRENT_INDEX_OFFSET..CURRENT_INDEX_OFFSET + INDEX_LENGTH,
            &encode_index(-1),
        );
        assert_eq!(
            Transaction::from_trytes(&trytes),
            Err(TransactionError::NegativeField("current_index"))
        );
    }
}
