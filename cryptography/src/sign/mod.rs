//! Signature schemes used to authenticate DKG bundles.
//!
//! The DKG only ever calls [Scheme::sign] (over a bundle hash) and leaves [Scheme::verify] to
//! whatever transports the bundles. Any scheme generic over a [Group] will do; [Schnorr] is
//! provided for every supported group and, over [crate::primitives::group::Ed25519], verifies
//! standard Ed25519 signatures (see [eddsa]).

pub mod eddsa;
pub mod schnorr;

pub use schnorr::Schnorr;

use crate::primitives::{self, group::Group};
use std::fmt::Debug;
use thiserror::Error;

/// Errors that can occur when signing or verifying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid signature length: {0}")]
    InvalidLength(usize),
    #[error("primitive error: {0}")]
    Primitive(#[from] primitives::Error),
}

/// A signature scheme keyed by a [Group]'s scalars and points.
pub trait Scheme<G: Group>: Clone + Debug + Send + Sync + 'static {
    /// Signs `msg` with `private`.
    fn sign(&self, private: &G::Scalar, msg: &[u8]) -> Result<Vec<u8>, Error>;

    /// Verifies that `sig` is a signature over `msg` by the holder of `public`.
    fn verify(&self, public: &G::Point, msg: &[u8], sig: &[u8]) -> Result<(), Error>;
}
