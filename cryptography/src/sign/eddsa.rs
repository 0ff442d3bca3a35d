//! Ed25519 signatures as specified by RFC 8032.
//!
//! Keys are expanded from a 32-byte seed. Verification is cofactorless and strict: `s` must be
//! canonical and neither `R` nor `A` may have small order.

use super::{Error, Schnorr, Scheme};
use crate::primitives::group::{
    ed25519::{Point, Scalar},
    Ed25519, Element, Group, Point as _, Scalar as _,
};
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha512};
use std::fmt::{Debug, Formatter};
use zeroize::Zeroize;

/// Length of a seed.
pub const SEED_LENGTH: usize = 32;

/// Length of an encoded public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of a signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// An expanded Ed25519 secret key.
pub struct SecretKey {
    seed: [u8; SEED_LENGTH],
    scalar: Scalar,
    prefix: [u8; 32],
    public: Point,
}

impl SecretKey {
    /// Expands a seed into a secret key.
    pub fn from_seed(seed: [u8; SEED_LENGTH]) -> Self {
        let mut h = [0u8; 64];
        h.copy_from_slice(&Sha512::digest(seed));

        // Clamp the lower half into the secret scalar
        let mut a = [0u8; 32];
        a.copy_from_slice(&h[..32]);
        a[0] &= 248;
        a[31] &= 127;
        a[31] |= 64;
        let scalar = Scalar::from_bytes_mod_order(a);
        let public = Point::mul_base(&scalar);

        let mut prefix = [0u8; 32];
        prefix.copy_from_slice(&h[32..]);
        a.zeroize();
        h.zeroize();
        Self {
            seed,
            scalar,
            prefix,
            public,
        }
    }

    /// Generates a secret key from a random seed.
    pub fn random<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; SEED_LENGTH];
        rng.fill_bytes(&mut seed);
        let key = Self::from_seed(seed);
        seed.zeroize();
        key
    }

    /// Returns the seed the key was expanded from.
    pub fn seed(&self) -> &[u8; SEED_LENGTH] {
        &self.seed
    }

    /// Returns the secret scalar `a`.
    ///
    /// Signing with [Schnorr] over [Ed25519] and this scalar yields signatures that [verify]
    /// accepts (with a different, but equally deterministic, nonce).
    pub fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    /// Returns the public point `A = a·B`.
    pub fn public(&self) -> &Point {
        &self.public
    }

    /// Signs `msg`.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        let public = self.public.to_bytes();

        // r = H(prefix ‖ m)
        let mut buf = Vec::with_capacity(32 + msg.len());
        buf.extend_from_slice(&self.prefix);
        buf.extend_from_slice(msg);
        let mut r = Ed25519::hash_to_scalar(&buf);
        buf.zeroize();
        let big_r = Point::mul_base(&r).to_bytes();

        // k = H(R ‖ A ‖ m)
        let mut buf = Vec::with_capacity(64 + msg.len());
        buf.extend_from_slice(&big_r);
        buf.extend_from_slice(&public);
        buf.extend_from_slice(msg);
        let mut s = Ed25519::hash_to_scalar(&buf);

        // s = r + k·a
        s.mul(&self.scalar);
        s.add(&r);
        r.zeroize();

        let mut sig = big_r;
        sig.extend_from_slice(&s.to_bytes());
        sig
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.seed.zeroize();
        self.scalar.zeroize();
        self.prefix.zeroize();
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Verifies an Ed25519 signature over `msg` by the encoded public key `public`.
pub fn verify(public: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), Error> {
    if public.len() != PUBLIC_KEY_LENGTH {
        return Err(Error::InvalidLength(public.len()));
    }
    let public = Ed25519::decode_point_strict(public)?;
    Schnorr::<Ed25519>::new().verify(&public, msg, sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_utils::from_hex_formatted;

    struct Vector {
        seed: &'static str,
        public: &'static str,
        msg: &'static str,
        sig: &'static str,
    }

    // RFC 8032, Section 7.1
    const VECTORS: [Vector; 3] = [
        Vector {
            seed: "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
            public: "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
            msg: "",
            sig: "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b",
        },
        Vector {
            seed: "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb",
            public: "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c",
            msg: "72",
            sig: "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00",
        },
        Vector {
            seed: "c5aa8df43f9f837bedb7442f31dcb7b166d38535076f094b85ce3a2e0b4458f7",
            public: "fc51cd8e6218a1a38da47ed00230f0580816ed13ba3303ac5deb911548908025",
            msg: "af82",
            sig: "6291d657deec24024827e69c3abe01a30ce548a284743a445e3680d7db5ac3ac18ff9b538d16f290ae67f760984dc6594a7c15e9716ed28dc027beceea1ec40a",
        },
    ];

    fn parse(vector: &Vector) -> ([u8; 32], Vec<u8>, Vec<u8>, Vec<u8>) {
        let seed: [u8; 32] = from_hex_formatted(vector.seed)
            .unwrap()
            .try_into()
            .unwrap();
        let public = from_hex_formatted(vector.public).unwrap();
        let msg = if vector.msg.is_empty() {
            Vec::new()
        } else {
            from_hex_formatted(vector.msg).unwrap()
        };
        let sig = from_hex_formatted(vector.sig).unwrap();
        (seed, public, msg, sig)
    }

    #[test]
    fn test_rfc8032_vectors() {
        for vector in VECTORS.iter() {
            let (seed, public, msg, sig) = parse(vector);
            let key = SecretKey::from_seed(seed);
            assert_eq!(key.public().to_bytes(), public);
            assert_eq!(key.sign(&msg), sig);
            verify(&public, &msg, &sig).unwrap();
        }
    }

    #[test]
    fn test_rfc8032_tampered() {
        for vector in VECTORS.iter() {
            let (_, public, msg, sig) = parse(vector);

            // Any flipped signature byte is rejected
            for i in 0..sig.len() {
                let mut tampered = sig.clone();
                tampered[i] ^= 0x01;
                assert!(verify(&public, &msg, &tampered).is_err());
            }

            // Any flipped message byte is rejected
            for i in 0..msg.len() {
                let mut tampered = msg.clone();
                tampered[i] ^= 0x01;
                assert_eq!(
                    verify(&public, &tampered, &sig),
                    Err(Error::InvalidSignature)
                );
            }

            // An extra message byte is rejected
            let mut extended = msg.clone();
            extended.push(0);
            assert_eq!(
                verify(&public, &extended, &sig),
                Err(Error::InvalidSignature)
            );
        }
    }

    #[test]
    fn test_schnorr_interop() {
        let key = SecretKey::from_seed([7u8; 32]);
        let sig = Schnorr::<Ed25519>::new()
            .sign(key.scalar(), b"bundle")
            .unwrap();
        assert_eq!(sig.len(), SIGNATURE_LENGTH);
        verify(&key.public().to_bytes(), b"bundle", &sig).unwrap();
    }

    #[test]
    fn test_small_order_public_key() {
        let key = SecretKey::from_seed([7u8; 32]);
        let sig = key.sign(b"hello");

        // The identity
        let mut identity = [0u8; 32];
        identity[0] = 1;
        assert!(verify(&identity, b"hello", &sig).is_err());

        // Wrong length
        assert_eq!(
            verify(&[0u8; 31], b"hello", &sig),
            Err(Error::InvalidLength(31))
        );
    }
}
