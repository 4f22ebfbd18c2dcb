//! # Cryptographic Core
//!
//! The ternary primitives everything else is built on:
//!
//! - **sponge** — the reset/absorb/squeeze/clone contract all hashing goes
//!   through. Callers never care which concrete permutation sits behind it.
//! - **curl** — the Curl sponge in its scalar, trit-at-a-time form. The
//!   proof-of-work engine re-expresses the same permutation bit-sliced; the
//!   two must stay lane-for-lane equivalent or attached transactions stop
//!   validating.
//! - **signing** — the Winternitz-style one-time signature engine: subseed,
//!   key, digest, address derivation, and the complementary hash chains for
//!   signing and verification.
//!
//! ## A note on "rolling your own crypto"
//!
//! This module *is* the protocol's cryptography, so there is no audited
//! upstream crate to lean on — balanced-ternary sponges are not exactly
//! crates.io material. The compensating controls are exhaustive
//! complementary-chain tests and the scalar/bit-sliced cross-checks in the
//! pow module. If you touch the permutation, run both.

pub mod curl;
pub mod signing;
pub mod sponge;

pub use curl::Curl;
pub use signing::{new_address, Signing, SigningError};
pub use sponge::{Sponge, SpongeMode};
