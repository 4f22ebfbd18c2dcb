// Copyright (c) 2026 Trion Labs. MIT License.
// See LICENSE for details.

//! # TRION Protocol — Ternary Cryptographic Core
//!
//! The cryptographic engine of the TRION ledger client: everything between
//! a seed and a proof-of-work-attached bundle, computed in balanced
//! ternary.
//!
//! Yes, ternary. The ledger's entire cryptographic surface — addresses,
//! signatures, hashes, nonces — is defined over trits, and faking it on
//! top of binary types is exactly how subtle incompatibilities are born.
//! So this crate owns the trit arithmetic outright and only touches binary
//! where it pays: the proof-of-work search packs 64 candidate nonces into
//! pairs of `u64` planes and hashes them all at once.
//!
//! ## Architecture
//!
//! The modules mirror the lifecycle of a transfer:
//!
//! - **ternary** — Trit/tryte conversions. The arithmetic everything rides on.
//! - **crypto** — The Curl sponge and the one-time hash-chain signing engine.
//! - **transaction** — The wire frame and the bundle hash finalizer.
//! - **multisig** — M-party addresses, incremental signing, transfer building.
//! - **pow** — The bit-sliced PearlDiver nonce search.
//! - **config** — Every constant the above must agree on.
//!
//! ## Design Philosophy
//!
//! 1. Keys are one-time. The engine won't stop you from reusing one; the
//!    wallet layer must.
//! 2. Digit widths are consensus. All of them live in `config`, nowhere else.
//! 3. Scalar and bit-sliced Curl are the same permutation, proven by tests,
//!    not by prose.
//! 4. If it touches money, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod multisig;
pub mod pow;
pub mod ternary;
pub mod transaction;
