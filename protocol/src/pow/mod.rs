//! # Proof-of-Work Module
//!
//! The nonce search that attaches a transaction to the ledger. A
//! transaction hash must end in `min_weight_magnitude` zero trits; the
//! search finds a 243-trit nonce that makes it so.
//!
//! The engine is a bit-sliced Curl evaluator ([`BitState`]): 64 candidate
//! nonces per state, one worker thread per subrange of the nonce space.
//! The fixed 7776-trit prefix of the transaction is absorbed once, the
//! shared mid-state is cloned per worker, and each worker ripple-increments
//! its own counter region until some lane's hash clears the weight check or
//! the search is canceled.
//!
//! A search runs at most once per [`PearlDiver`]. The terminal state is
//! reported explicitly: [`PowOutcome::Completed`] carries the transaction
//! with the winning nonce spliced in, [`PowOutcome::Canceled`] returns the
//! input untouched. Callers never have to guess from buffer contents.

mod bitslice;

pub use bitslice::BitState;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{
    HASH_LENGTH, NONCE_COUNTER_OFFSET, NONCE_LANE_OFFSET, NONCE_TRIT_OFFSET, NONCE_WORKER_OFFSET,
    TRANSACTION_TRIT_LENGTH,
};
use crate::ternary::Trit;

use bitslice::{HIGH_BITS, LANE_PATTERNS};

/// Errors rejecting a search before any worker starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PowError {
    /// The input is not a full transaction frame.
    #[error("invalid transaction length {0}: expected {TRANSACTION_TRIT_LENGTH} trits")]
    InvalidTransactionLength(usize),

    /// The weight magnitude must be in `1..=243`.
    #[error("invalid minimum weight magnitude {0}")]
    InvalidWeightMagnitude(usize),

    /// The engine is single-use; this one has already run or is running.
    #[error("search cannot start from state {0:?}")]
    InvalidState(PowState),
}

/// Lifecycle of a [`PearlDiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowState {
    /// Constructed, search not yet started.
    Idle = 0,
    /// Workers are running.
    Running = 1,
    /// A worker found a qualifying nonce.
    Completed = 2,
    /// [`PearlDiver::cancel`] won the race.
    Canceled = 3,
}

impl PowState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PowState::Idle,
            1 => PowState::Running,
            2 => PowState::Completed,
            _ => PowState::Canceled,
        }
    }
}

/// How a search ended. Both variants carry the full transaction trits:
/// completed searches have the winning nonce spliced into the final
/// 243-trit block, canceled searches return the input unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowOutcome {
    Completed(Vec<Trit>),
    Canceled(Vec<Trit>),
}

impl PowOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PowOutcome::Completed(_))
    }

    pub fn trits(&self) -> &[Trit] {
        match self {
            PowOutcome::Completed(trits) | PowOutcome::Canceled(trits) => trits,
        }
    }

    pub fn into_trits(self) -> Vec<Trit> {
        match self {
            PowOutcome::Completed(trits) | PowOutcome::Canceled(trits) => trits,
        }
    }
}

struct SearchShared {
    state: AtomicU8,
    /// Winning nonce, written exactly once under the lock.
    nonce: Mutex<Option<Vec<Trit>>>,
    finished: Condvar,
}

impl SearchShared {
    fn state(&self) -> PowState {
        PowState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PowState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Single-use, cancelable nonce search.
///
/// Clone the handle to cancel from another thread; all clones share the
/// same search.
#[derive(Clone)]
pub struct PearlDiver {
    shared: Arc<SearchShared>,
}

impl Default for PearlDiver {
    fn default() -> Self {
        Self::new()
    }
}

impl PearlDiver {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SearchShared {
                state: AtomicU8::new(PowState::Idle as u8),
                nonce: Mutex::new(None),
                finished: Condvar::new(),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PowState {
        self.shared.state()
    }

    /// Abort a running search. Workers observe the state change on their
    /// next iteration; a worker that has already entered the completion
    /// critical section wins the race and the search still completes.
    pub fn cancel(&self) {
        let _guard = self.shared.nonce.lock();
        if self.shared.state() == PowState::Running {
            self.shared.set_state(PowState::Canceled);
            self.shared.finished.notify_all();
            info!("proof of work search canceled");
        }
    }

    /// Search for a nonce giving `min_weight_magnitude` trailing zero trits.
    ///
    /// Blocks until a worker finds a qualifying nonce or [`cancel`] is
    /// called. `workers = 0` means one worker per available CPU.
    ///
    /// [`cancel`]: Self::cancel
    pub fn search(
        &self,
        transaction_trits: &[Trit],
        min_weight_magnitude: usize,
        workers: usize,
    ) -> Result<PowOutcome, PowError> {
        if transaction_trits.len() != TRANSACTION_TRIT_LENGTH {
            return Err(PowError::InvalidTransactionLength(transaction_trits.len()));
        }
        if min_weight_magnitude == 0 || min_weight_magnitude > HASH_LENGTH {
            return Err(PowError::InvalidWeightMagnitude(min_weight_magnitude));
        }
        self.shared
            .state
            .compare_exchange(
                PowState::Idle as u8,
                PowState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|current| PowError::InvalidState(PowState::from_u8(current)))?;

        let workers = if workers == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            workers
        };
        debug!(
            workers,
            min_weight_magnitude, "starting proof of work search"
        );

        let mid = prepare_mid_state(transaction_trits);
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let shared = Arc::clone(&self.shared);
                let mid = mid.clone();
                thread::spawn(move || run_worker(&shared, mid, worker, min_weight_magnitude))
            })
            .collect();

        let nonce = {
            let mut guard = self.shared.nonce.lock();
            while self.shared.state() == PowState::Running {
                self.shared.finished.wait(&mut guard);
            }
            guard.take()
        };
        for handle in handles {
            let _ = handle.join();
        }

        let mut trits = transaction_trits.to_vec();
        match nonce {
            Some(nonce) if self.shared.state() == PowState::Completed => {
                trits[NONCE_TRIT_OFFSET..].copy_from_slice(&nonce);
                Ok(PowOutcome::Completed(trits))
            }
            _ => Ok(PowOutcome::Canceled(trits)),
        }
    }
}

/// Absorb the transaction's fixed prefix and load the nonce block scaffold:
/// the first 162 nonce trits from the input, then the four lane-separation
/// patterns. The remainder of the block keeps the post-permutation values,
/// which the worker and counter odometers then count through.
fn prepare_mid_state(transaction_trits: &[Trit]) -> BitState {
    let mut mid = BitState::new();
    let mut scratch = BitState::new();
    let mut offset = 0;

    for _ in 0..NONCE_TRIT_OFFSET / HASH_LENGTH {
        for slot in 0..HASH_LENGTH {
            mid.set_trit(slot, transaction_trits[offset]);
            offset += 1;
        }
        mid.transform(&mut scratch);
    }
    for slot in 0..NONCE_LANE_OFFSET {
        mid.set_trit(slot, transaction_trits[offset]);
        offset += 1;
    }
    for (slot, &(low, high)) in LANE_PATTERNS.iter().enumerate() {
        mid.low[NONCE_LANE_OFFSET + slot] = low;
        mid.high[NONCE_LANE_OFFSET + slot] = high;
    }
    mid
}

fn run_worker(shared: &SearchShared, mut mid: BitState, worker: usize, min_weight: usize) {
    // Carve out this worker's subrange of the nonce space.
    for _ in 0..worker {
        mid.increment(NONCE_WORKER_OFFSET, NONCE_COUNTER_OFFSET);
    }

    let mut state = BitState::new();
    let mut scratch = BitState::new();
    while shared.state() == PowState::Running {
        mid.increment(NONCE_COUNTER_OFFSET, HASH_LENGTH);

        state.copy_from(&mid);
        state.transform(&mut scratch);

        // A lane qualifies when its final `min_weight` trits are all zero,
        // i.e. low and high planes agree at each of those positions.
        let mut mask = HIGH_BITS;
        for position in HASH_LENGTH - min_weight..HASH_LENGTH {
            mask &= !(state.low[position] ^ state.high[position]);
            if mask == 0 {
                break;
            }
        }
        if mask == 0 {
            continue;
        }

        let mut guard = shared.nonce.lock();
        if shared.state() == PowState::Running {
            // Lowest qualifying lane wins; ties are deterministic.
            let lane_mask = 1u64 << mask.trailing_zeros();
            let nonce: Vec<Trit> = (0..HASH_LENGTH)
                .map(|slot| mid.get_trit(slot, lane_mask))
                .collect();
            *guard = Some(nonce);
            shared.set_state(PowState::Completed);
            shared.finished.notify_all();
            debug!(worker, lane = mask.trailing_zeros(), "nonce found");
        }
        return;
    }
}
