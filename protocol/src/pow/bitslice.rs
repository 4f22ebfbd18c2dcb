//! Bit-sliced Curl state: 64 search lanes per machine word.
//!
//! Each trit position holds two 64-bit planes, so one state evaluates 64
//! candidate nonces at once. Bit `k` of the (low, high) pair encodes lane
//! `k`'s trit:
//!
//! ```text
//! low = 0            →  +1
//! low = 1, high = 0  →  -1
//! low = 1, high = 1  →   0
//! ```
//!
//! The transform below is the same permutation as the scalar sponge in
//! [`crate::crypto::curl`], expressed as boolean algebra over the planes.
//! The two are cross-checked by tests; neither may change alone.

use crate::config::{CURL_ROUNDS_P81, STATE_LENGTH};
use crate::ternary::Trit;

/// All lanes zero.
pub(crate) const LOW_BITS: u64 = 0;
/// All lanes one.
pub(crate) const HIGH_BITS: u64 = u64::MAX;

/// Fixed (low, high) plane patterns for the four lane-separation slots of
/// the nonce block. Together they give all 64 lanes pairwise-distinct trit
/// prefixes, so no two lanes ever test the same nonce.
pub(crate) const LANE_PATTERNS: [(u64, u64); 4] = [
    (0xDB6D_B6DB_6DB6_DB6D, 0xB6DB_6DB6_DB6D_B6DB),
    (0xF1F8_FC7E_3F1F_8FC7, 0x7E3F_1F8F_C7E3_F1F8),
    (0x7FFF_E00F_FFFC_01FF, 0xFFC0_1FFF_F803_FFFF),
    (0xFFC0_0000_07FF_FFFF, 0x003F_FFFF_FFFF_FFFF),
];

/// A 729-trit Curl state, 64 lanes wide.
#[derive(Clone)]
pub struct BitState {
    pub(crate) low: Box<[u64; STATE_LENGTH]>,
    pub(crate) high: Box<[u64; STATE_LENGTH]>,
}

impl BitState {
    /// A state with every lane's trit encoded as zero.
    pub(crate) fn new() -> Self {
        Self {
            low: Box::new([HIGH_BITS; STATE_LENGTH]),
            high: Box::new([HIGH_BITS; STATE_LENGTH]),
        }
    }

    pub(crate) fn copy_from(&mut self, other: &BitState) {
        self.low.copy_from_slice(&other.low[..]);
        self.high.copy_from_slice(&other.high[..]);
    }

    /// Broadcast one trit to all 64 lanes at `index`.
    pub(crate) fn set_trit(&mut self, index: usize, trit: Trit) {
        let (low, high) = match trit {
            1 => (LOW_BITS, HIGH_BITS),
            -1 => (HIGH_BITS, LOW_BITS),
            _ => (HIGH_BITS, HIGH_BITS),
        };
        self.low[index] = low;
        self.high[index] = high;
    }

    /// Read lane `lane_mask`'s trit at `index`. The mask must have exactly
    /// one bit set.
    pub(crate) fn get_trit(&self, index: usize, lane_mask: u64) -> Trit {
        if self.low[index] & lane_mask == 0 {
            1
        } else if self.high[index] & lane_mask == 0 {
            -1
        } else {
            0
        }
    }

    /// Run the full 81-round permutation across all lanes. `scratch` is
    /// caller-provided so the hot search loop allocates nothing.
    pub(crate) fn transform(&mut self, scratch: &mut BitState) {
        let mut index = 0usize;
        for _ in 0..CURL_ROUNDS_P81 {
            scratch.copy_from(self);
            for slot in 0..STATE_LENGTH {
                let alpha = scratch.low[index];
                let beta = scratch.high[index];
                index = if index < 365 { index + 364 } else { index - 365 };
                let gamma = scratch.high[index];
                let delta = (alpha | !gamma) & (scratch.low[index] ^ beta);
                self.low[slot] = !delta;
                self.high[slot] = (alpha ^ gamma) | delta;
            }
        }
    }

    /// Ripple-increment the balanced-ternary odometer in `[from, to)`.
    ///
    /// Whole-word comparisons are sound here because the odometer regions
    /// are always lane-uniform: only the four lane-separation slots differ
    /// across lanes, and they sit outside every incremented range.
    pub(crate) fn increment(&mut self, from: usize, to: usize) {
        for index in from..to {
            if self.low[index] == LOW_BITS {
                // +1 rolls over to -1 and the carry continues.
                self.low[index] = HIGH_BITS;
                self.high[index] = LOW_BITS;
            } else if self.high[index] == LOW_BITS {
                // -1 steps to 0.
                self.high[index] = HIGH_BITS;
                break;
            } else {
                // 0 steps to +1.
                self.low[index] = LOW_BITS;
                break;
            }
        }
    }
}
