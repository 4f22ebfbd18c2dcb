//! # Transaction Module
//!
//! The transaction record, its canonical tryte wire frame, and the bundle
//! that groups transactions into one atomic operation.
//!
//! ```text
//! types.rs  — Transaction record + 2673-tryte wire frame encode/decode
//! bundle.rs — Bundle lifecycle: entries → finalize (hash + anti-collision
//!             retry) → placeholder fields → signatures → proof of work
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Append** — [`Bundle::add_entry`] pushes entries; value rides on the
//!    first transaction of each entry.
//! 2. **Finalize** — [`Bundle::finalize`] computes the collision-checked
//!    bundle hash and freezes address/value/tag/timestamp/indices.
//! 3. **Pad** — [`Bundle::add_trytes`] fills signatures (or sentinels) and
//!    placeholder link/nonce fields.
//! 4. **Attach** — the proof-of-work search fills each nonce; everything
//!    else is immutable by then.

pub mod bundle;
pub mod types;

pub use bundle::{normalized_bundle, Bundle, BundleError};
pub use types::{Transaction, TransactionError};
