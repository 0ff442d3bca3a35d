//! The prime-order subgroup of the Edwards25519 curve.
//!
//! Points are encoded as 32 little-endian bytes of `y` with the sign of `x` packed into the most
//! significant bit (RFC 8032). Scalars are 32 little-endian bytes reduced modulo
//! `ℓ = 2^252 + 27742317777372353535851937790883648493`.

use super::{Element, Group};
use crate::primitives::Error;
use bytes::{Buf, BufMut};
use commonware_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};
use commonware_utils::hex;
use curve25519_dalek::{
    constants::ED25519_BASEPOINT_POINT,
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar as DalekScalar,
    traits::Identity,
};
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha512};
use std::fmt::{Debug, Formatter};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

const SCALAR_LENGTH: usize = 32;
const POINT_LENGTH: usize = 32;

/// Bytes available for embedding: one byte of length and one byte of randomness are reserved
/// out of the 255-bit `y` coordinate.
const EMBED_LENGTH: usize = (255 - 8 - 8) / 8;

/// Encodings of the points of order 1, 2, 4, and 8 (ignoring the sign bit), including the
/// non-canonical encodings of `y = p` and `y = p + 1`.
const SMALL_ORDER_ENCODINGS: [[u8; POINT_LENGTH]; 7] = [
    // 0 (order 4)
    [
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ],
    // 1 (order 1)
    [
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ],
    // order 8
    [
        0x26, 0xe8, 0x95, 0x8f, 0xc2, 0xb2, 0x27, 0xb0, 0x45, 0xc3, 0xf4, 0x89, 0xf2, 0xef, 0x98,
        0xf0, 0xd5, 0xdf, 0xac, 0x05, 0xd3, 0xc6, 0x33, 0x39, 0xb1, 0x38, 0x02, 0x88, 0x6d, 0x53,
        0xfc, 0x05,
    ],
    // order 8
    [
        0xc7, 0x17, 0x6a, 0x70, 0x3d, 0x4d, 0xd8, 0x4f, 0xba, 0x3c, 0x0b, 0x76, 0x0d, 0x10, 0x67,
        0x0f, 0x2a, 0x20, 0x53, 0xfa, 0x2c, 0x39, 0xcc, 0xc6, 0x4e, 0xc7, 0xfd, 0x77, 0x92, 0xac,
        0x03, 0x7a,
    ],
    // p - 1 (order 2)
    [
        0xec, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p (order 4)
    [
        0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p + 1 (order 1)
    [
        0xee, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
];

/// The field prime `p = 2^255 - 19`, little-endian.
const FIELD_PRIME: [u8; POINT_LENGTH] = SMALL_ORDER_ENCODINGS[5];

/// Returns whether `bytes` matches a known small-order encoding (regardless of the sign bit).
pub fn has_small_order(bytes: &[u8; POINT_LENGTH]) -> bool {
    let mut masked = *bytes;
    masked[POINT_LENGTH - 1] &= 0x7f;
    SMALL_ORDER_ENCODINGS
        .iter()
        .fold(0u8, |found, candidate| {
            found | candidate[..].ct_eq(&masked[..]).unwrap_u8()
        })
        == 1
}

/// Returns whether the `y` coordinate of `bytes` is strictly less than the field prime.
fn is_canonical_y(bytes: &[u8; POINT_LENGTH]) -> bool {
    let mut y = *bytes;
    y[POINT_LENGTH - 1] &= 0x7f;
    for i in (0..POINT_LENGTH).rev() {
        if y[i] != FIELD_PRIME[i] {
            return y[i] < FIELD_PRIME[i];
        }
    }
    false
}

/// The Edwards25519 group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Ed25519;

impl Group for Ed25519 {
    const NAME: &'static str = "Ed25519";
    type Scalar = Scalar;
    type Point = Point;

    fn hash_to_scalar(msg: &[u8]) -> Scalar {
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&Sha512::digest(msg));
        Scalar(DalekScalar::from_bytes_mod_order_wide(&wide))
    }

    fn decode_point_strict(bytes: &[u8]) -> Result<Point, Error> {
        let raw: [u8; POINT_LENGTH] = bytes.try_into().map_err(|_| Error::InvalidPoint)?;
        if has_small_order(&raw) {
            return Err(Error::SmallOrder);
        }
        Point::from_bytes(bytes)
    }
}

/// An element of `Z_ℓ`.
#[derive(Clone, Copy)]
pub struct Scalar(DalekScalar);

impl Scalar {
    /// Interprets 32 little-endian bytes as an integer and reduces it modulo `ℓ`.
    pub fn from_bytes_mod_order(bytes: [u8; SCALAR_LENGTH]) -> Self {
        Self(DalekScalar::from_bytes_mod_order(bytes))
    }
}

impl Element for Scalar {
    fn zero() -> Self {
        Self(DalekScalar::ZERO)
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
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let raw: [u8; SCALAR_LENGTH] = bytes.try_into().map_err(|_| Error::InvalidScalar)?;
        Option::<DalekScalar>::from(DalekScalar::from_canonical_bytes(raw))
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
        Self::from_bytes(&raw).map_err(|err| CodecError::Wrapped(Ed25519::NAME, err.into()))
    }
}

impl FixedSize for Scalar {
    const SIZE: usize = SCALAR_LENGTH;
}

impl super::Scalar for Scalar {
    fn one() -> Self {
        Self(DalekScalar::ONE)
    }

    fn from_u32(i: u32) -> Self {
        Self(DalekScalar::from(i))
    }

    fn random<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        Self(DalekScalar::random(rng))
    }

    fn mul(&mut self, rhs: &Self) {
        self.0 *= rhs.0;
    }

    fn inverse(&self) -> Result<Self, Error> {
        if bool::from(self.0.ct_eq(&DalekScalar::ZERO)) {
            return Err(Error::InvalidScalar);
        }
        Ok(Self(self.0.invert()))
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

/// An element of the prime-order subgroup of Edwards25519.
#[derive(Clone, Copy)]
pub struct Point(EdwardsPoint);

impl Element for Point {
    fn zero() -> Self {
        Self(EdwardsPoint::identity())
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
        self.0.compress().to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let raw: [u8; POINT_LENGTH] = bytes.try_into().map_err(|_| Error::InvalidPoint)?;
        if !is_canonical_y(&raw) {
            return Err(Error::NonCanonical);
        }
        let point = CompressedEdwardsY(raw)
            .decompress()
            .ok_or(Error::InvalidPoint)?;

        // Rejects x = 0 with the sign bit set
        if point.compress().to_bytes() != raw {
            return Err(Error::NonCanonical);
        }
        if !point.is_torsion_free() {
            return Err(Error::InvalidPoint);
        }
        Ok(Self(point))
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
        Self::from_bytes(&raw).map_err(|err| CodecError::Wrapped(Ed25519::NAME, err.into()))
    }
}

impl FixedSize for Point {
    const SIZE: usize = POINT_LENGTH;
}

impl super::Point for Point {
    type Scalar = Scalar;

    fn generator() -> Self {
        Self(ED25519_BASEPOINT_POINT)
    }

    fn mul(&mut self, rhs: &Scalar) {
        self.0 *= rhs.0;
    }

    fn mul_base(s: &Scalar) -> Self {
        Self(EdwardsPoint::mul_base(&s.0))
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
            // Fill with randomness, then overwrite the length and payload
            let mut raw = [0u8; POINT_LENGTH];
            rng.fill_bytes(&mut raw);
            raw[0] = data.len() as u8;
            raw[1..1 + data.len()].copy_from_slice(data);

            // Retry until the bytes are the canonical encoding of a subgroup element
            let Some(point) = CompressedEdwardsY(raw).decompress() else {
                continue;
            };
            if point.compress().to_bytes() != raw || !point.is_torsion_free() {
                continue;
            }
            return Ok(Self(point));
        }
    }

    fn data(&self) -> Result<Vec<u8>, Error> {
        let raw = self.0.compress().to_bytes();
        let len = raw[0] as usize;
        if len > EMBED_LENGTH {
            return Err(Error::InvalidEmbedding);
        }
        Ok(raw[1..1 + len].to_vec())
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
        write!(f, "{}", hex(self.0.compress().as_bytes()))
    }
}
