//! Run Pedersen distributed key generation and resharing over prime-order groups.
//!
//! The crate is layered bottom-up:
//!
//! - [primitives]: the [primitives::group::Group] abstraction (with Edwards25519 and P-256
//!   backends), polynomial secret sharing with Lagrange recovery, and ECIES.
//! - [sign]: the signature schemes that authenticate DKG messages (Schnorr over any group and
//!   RFC 8032 Ed25519).
//! - [dkg]: the per-node DKG/resharing state machine and an async driver over a broadcast board.
//!
//! # Status
//!
//! `tessera-cryptography` is **ALPHA** software and is not yet recommended for production use.
//! Developers should expect breaking changes and occasional instability.

pub mod dkg;
pub mod primitives;
pub mod sign;
