//! The NIST P-256 (secp256r1) group.
//!
//! Points use the uncompressed SEC1 encoding (`0x04 ‖ X ‖ Y`), with the identity encoded as
//! `0x04` followed by zeros so every encoding has the same length. Scalars are 32 big-endian bytes.

use super::{Element, Group};
use crate::primitives::Error;
use bytes::{Buf, BufMut};
use commonware_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};
use commonware_utils::hex;
use p256::{
    elliptic_curve::{
        bigint::U256,
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field, PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar as P256Scalar,
};
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Formatter};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

const SCALAR_LENGTH: usize = 32;
const COORDINATE_LENGTH: usize = 32;
const POINT_LENGTH: usize = 1 + 2 * COORDINATE_LENGTH;
const UNCOMPRESSED_TAG: u8 = 0x04;
const COMPRESSED_EVEN_TAG: u8 = 0x02;

/// Bytes of `x` available for embedding (one random byte and one length byte are reserved).
const EMBED_LENGTH: usize = (256 - 8 - 8) / 8;

/// The field prime `p = 2^256 - 2^224 + 2^192 + 2^96 - 1`, big-endian.
const FIELD_PRIME: [u8; COORDINATE_LENGTH] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

fn is_canonical_coordinate(coordinate: &[u8]) -> bool {
    coordinate < &FIELD_PRIME[..]
}

/// The P-256 group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct P256;

impl Group for P256 {
    const NAME: &'static str = "P256";
    type Scalar = Scalar;
    type Point = Point;

    fn hash_to_scalar(msg: &[u8]) -> Scalar {
        let digest = FieldBytes::clone_from_slice(&Sha256::digest(msg));
        Scalar(<P256Scalar as Reduce<U256>>::reduce_bytes(&digest))
    }
}

/// An element of the P-256 scalar field.
#[derive(Clone, Copy)]
pub struct Scalar(P256Scalar);

impl Element for Scalar {
    fn zero() -> Self {
        Self(P256Scalar::ZERO)
    }

    fn add(&mut self, rhs: &Self) {
        self.0 += rhs.0;
    }

    fn sub(&mut self, rhs: &Self) {
        self.0 -= rhs.0;
    }

    fn neg(&mut self) {
        self.0 = -self.0;
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_repr().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SCALAR_LENGTH {
            return Err(Error::InvalidScalar);
        }
        let repr = FieldBytes::clone_from_slice(bytes);
        Option::<P256Scalar>::from(P256Scalar::from_repr(repr))
            .map(Self)
            .ok_or(Error::NonCanonical)
    }
}

impl Write for Scalar {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.to_bytes());
    }
}

impl Read for Scalar {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let raw = <[u8; SCALAR_LENGTH]>::read(buf)?;
        Self::from_bytes(&raw).map_err(|err| CodecError::Wrapped(P256::NAME, err.into()))
    }
}

impl FixedSize for Scalar {
    const SIZE: usize = SCALAR_LENGTH;
}

impl super::Scalar for Scalar {
    fn one() -> Self {
        Self(P256Scalar::ONE)
    }

    fn from_u32(i: u32) -> Self {
        Self(P256Scalar::from(i as u64))
    }

    fn random<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        Self(<P256Scalar as Field>::random(rng))
    }

    fn mul(&mut self, rhs: &Self) {
        self.0 *= rhs.0;
    }

    fn inverse(&self) -> Result<Self, Error> {
        Option::<P256Scalar>::from(self.0.invert())
            .map(Self)
            .ok_or(Error::InvalidScalar)
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Scalar {}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Debug for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Scalar(..)")
    }
}

/// A point on P-256.
#[derive(Clone, Copy)]
pub struct Point(ProjectivePoint);

impl Point {
    fn x_coordinate(&self) -> Option<Vec<u8>> {
        let encoded = self.0.to_affine().to_encoded_point(false);
        encoded.x().map(|x| x.to_vec())
    }
}

impl Element for Point {
    fn zero() -> Self {
        Self(ProjectivePoint::IDENTITY)
    }

    fn add(&mut self, rhs: &Self) {
        self.0 += rhs.0;
    }

    fn sub(&mut self, rhs: &Self) {
        self.0 -= rhs.0;
    }

    fn neg(&mut self) {
        self.0 = -self.0;
    }

    fn to_bytes(&self) -> Vec<u8> {
        let encoded = self.0.to_affine().to_encoded_point(false);
        if encoded.is_identity() {
            let mut raw = vec![0u8; POINT_LENGTH];
            raw[0] = UNCOMPRESSED_TAG;
            return raw;
        }
        encoded.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != POINT_LENGTH || bytes[0] != UNCOMPRESSED_TAG {
            return Err(Error::InvalidPoint);
        }
        let (x, y) = bytes[1..].split_at(COORDINATE_LENGTH);
        if x.iter().chain(y.iter()).all(|b| *b == 0) {
            return Ok(Self::zero());
        }
        if !is_canonical_coordinate(x) || !is_canonical_coordinate(y) {
            return Err(Error::NonCanonical);
        }
        let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| Error::InvalidPoint)?;
        Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .map(|affine| Self(ProjectivePoint::from(affine)))
            .ok_or(Error::InvalidPoint)
    }
}

impl Write for Point {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.to_bytes());
    }
}

impl Read for Point {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let raw = <[u8; POINT_LENGTH]>::read(buf)?;
        Self::from_bytes(&raw).map_err(|err| CodecError::Wrapped(P256::NAME, err.into()))
    }
}

impl FixedSize for Point {
    const SIZE: usize = POINT_LENGTH;
}

impl super::Point for Point {
    type Scalar = Scalar;

    fn generator() -> Self {
        Self(ProjectivePoint::GENERATOR)
    }

    fn mul(&mut self, rhs: &Scalar) {
        self.0 *= rhs.0;
    }

    fn embed_len() -> usize {
        EMBED_LENGTH
    }

    fn embed<R: CryptoRngCore + ?Sized>(data: &[u8], rng: &mut R) -> Result<Self, Error> {
        if data.len() > EMBED_LENGTH {
            return Err(Error::EmbedTooLong {
                len: data.len(),
                max: EMBED_LENGTH,
            });
        }
        loop {
            // Fill x with randomness, then overwrite the length and payload
            let mut raw = [0u8; 1 + COORDINATE_LENGTH];
            rng.fill_bytes(&mut raw[1..]);
            raw[0] = COMPRESSED_EVEN_TAG;
            raw[2] = data.len() as u8;
            raw[3..3 + data.len()].copy_from_slice(data);

            // Retry until x is the abscissa of a curve point
            let Ok(encoded) = EncodedPoint::from_bytes(raw) else {
                continue;
            };
            let Some(affine) = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            else {
                continue;
            };
            return Ok(Self(ProjectivePoint::from(affine)));
        }
    }

    fn data(&self) -> Result<Vec<u8>, Error> {
        let x = self.x_coordinate().ok_or(Error::InvalidEmbedding)?;
        let len = x[1] as usize;
        if len > EMBED_LENGTH {
            return Err(Error::InvalidEmbedding);
        }
        Ok(x[2..2 + len].to_vec())
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Point {}

impl Debug for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.to_bytes()))
    }
}
