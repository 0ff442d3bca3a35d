//! Schnorr signatures over any [Group].
//!
//! A signature is `R ‖ s` where `R = k·B`, `c = H(R ‖ A ‖ m)` and `s = k + c·x` for the private
//! scalar `x` and public point `A = x·B`. `H` is the group's [Group::hash_to_scalar]. The nonce
//! `k = H(x ‖ m)` is derived deterministically, so signing needs no randomness.
//!
//! Over [crate::primitives::group::Ed25519] (with no namespace) the challenge is exactly the one
//! defined by RFC 8032, so this scheme verifies standard Ed25519 signatures.

use super::{Error, Scheme};
use crate::primitives::group::{Element, Group, Point, Scalar};
use commonware_utils::union_unique;
use std::{borrow::Cow, marker::PhantomData};
use zeroize::Zeroize;

/// Schnorr signatures over `G`, optionally bound to a namespace.
#[derive(Clone, Debug)]
pub struct Schnorr<G: Group> {
    namespace: Option<Vec<u8>>,
    _group: PhantomData<G>,
}

impl<G: Group> Default for Schnorr<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Group> Schnorr<G> {
    /// Returns a scheme that signs messages as-is.
    pub fn new() -> Self {
        Self {
            namespace: None,
            _group: PhantomData,
        }
    }

    /// Returns a scheme that prefixes every message with `namespace` (length-delimited), so
    /// signatures from one application cannot be replayed in another.
    pub fn with_namespace(namespace: &[u8]) -> Self {
        Self {
            namespace: Some(namespace.to_vec()),
            _group: PhantomData,
        }
    }

    /// Returns the length of a signature.
    pub fn signature_len() -> usize {
        G::point_len() + G::scalar_len()
    }

    fn payload<'a>(&self, msg: &'a [u8]) -> Cow<'a, [u8]> {
        match &self.namespace {
            Some(namespace) => Cow::Owned(union_unique(namespace, msg)),
            None => Cow::Borrowed(msg),
        }
    }

    fn challenge(r: &[u8], public: &[u8], payload: &[u8]) -> G::Scalar {
        let mut buf = Vec::with_capacity(r.len() + public.len() + payload.len());
        buf.extend_from_slice(r);
        buf.extend_from_slice(public);
        buf.extend_from_slice(payload);
        G::hash_to_scalar(&buf)
    }
}

impl<G: Group> Scheme<G> for Schnorr<G> {
    fn sign(&self, private: &G::Scalar, msg: &[u8]) -> Result<Vec<u8>, Error> {
        let payload = self.payload(msg);
        let public = G::Point::mul_base(private).to_bytes();

        // Derive the nonce from the key and message
        let mut seed = private.to_bytes();
        seed.extend_from_slice(&payload);
        let mut k = G::hash_to_scalar(&seed);
        seed.zeroize();
        let r = G::Point::mul_base(&k).to_bytes();

        // s = k + c·x
        let mut s = Self::challenge(&r, &public, &payload);
        s.mul(private);
        s.add(&k);
        k.zeroize();

        let mut sig = r;
        sig.extend_from_slice(&s.to_bytes());
        Ok(sig)
    }

    fn verify(&self, public: &G::Point, msg: &[u8], sig: &[u8]) -> Result<(), Error> {
        if sig.len() != Self::signature_len() {
            return Err(Error::InvalidLength(sig.len()));
        }
        let (r_bytes, s_bytes) = sig.split_at(G::point_len());
        let r = G::decode_point_strict(r_bytes)?;
        let s = G::Scalar::from_bytes(s_bytes)?;
        let public_bytes = public.to_bytes();
        G::decode_point_strict(&public_bytes)?;

        // s·B == R + c·A
        let payload = self.payload(msg);
        let c = Self::challenge(r_bytes, &public_bytes, &payload);
        let mut expected = public.clone();
        expected.mul(&c);
        expected.add(&r);
        if G::Point::mul_base(&s) != expected {
            return Err(Error::InvalidSignature);
        }
        Ok(())
    }
}
