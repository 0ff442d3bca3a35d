//! Prime-order group arithmetic, Shamir sharing, and hybrid encryption.
//!
//! Everything above this module (signatures, DKG) is generic over [group::Group], so a protocol
//! written once runs unchanged over [group::Ed25519] or [group::P256].
//!
//! # Example
//!
//! ```rust
//! use tessera_cryptography::primitives::{
//!     group::{Ed25519, Group, Point, Scalar},
//!     poly::{recover_commit, recover_secret, PriPoly},
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//!
//! // Share a secret among 5 participants, any 3 of which can recover it
//! let poly = PriPoly::<Ed25519>::new(3, None, &mut rng).unwrap();
//! let shares = poly.shares(5);
//! let public = poly.commit(None);
//!
//! // Every share lies on the public polynomial
//! assert!(shares.iter().all(|share| public.check(share)));
//!
//! // Any 3 shares recover the secret (and its commitment)
//! let secret = recover_secret::<Ed25519>(&shares[2..], 3).unwrap();
//! assert_eq!(&secret, poly.secret());
//! let commits = public.shares(5);
//! let commit = recover_commit::<Ed25519>(&commits[..3], 3).unwrap();
//! assert_eq!(&commit, public.commit());
//! ```

pub mod ecies;
pub mod group;
pub mod poly;

use thiserror::Error;

/// Errors that can occur when working with group elements, polynomials, and encryption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid point")]
    InvalidPoint,
    #[error("invalid scalar")]
    InvalidScalar,
    #[error("non-canonical encoding")]
    NonCanonical,
    #[error("small order point")]
    SmallOrder,
    #[error("group mismatch")]
    GroupMismatch,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("hkdf expansion failed")]
    HkdfExpansion,
    #[error("not enough shares: {got}/{need}")]
    NotEnoughShares { got: usize, need: usize },
    #[error("threshold too small: {0}")]
    ThresholdTooSmall(u32),
    #[error("duplicate share index: {0}")]
    DuplicateIndex(u32),
    #[error("polynomial degree mismatch: {0} != {1}")]
    DegreeMismatch(usize, usize),
    #[error("embedded data too long: {len}/{max}")]
    EmbedTooLong { len: usize, max: usize },
    #[error("point does not carry embedded data")]
    InvalidEmbedding,
}
