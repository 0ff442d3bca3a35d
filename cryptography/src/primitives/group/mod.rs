//! Prime-order groups and their scalar fields.
//!
//! A [Group] bundles a [Scalar] field `Z_q` with a [Point] group `G` of the same prime order `q`.
//! Protocols are written once against [Group] and instantiated with a concrete curve
//! ([Ed25519] or [P256]).
//!
//! Every element has a fixed-length canonical encoding. Decoding rejects anything that is not the
//! canonical encoding of a member of the prime-order subgroup, so higher-level protocols never need
//! to re-check inputs they parsed.

pub mod ed25519;
pub mod p256;

pub use self::{ed25519::Ed25519, p256::P256};
use super::Error;
use commonware_codec::{FixedSize, Read, Write};
use rand_core::CryptoRngCore;
use std::fmt::Debug;
use zeroize::Zeroize;

/// An element of a group with a canonical, fixed-length encoding.
///
/// Equality is constant-time for every implementation. The codec impls read and write the same
/// bytes as [Element::to_bytes] and [Element::from_bytes].
pub trait Element:
    Write + Read<Cfg = ()> + FixedSize + Clone + Debug + Eq + Send + Sync + 'static
{
    /// Returns the additive identity.
    fn zero() -> Self;

    /// Adds to self in-place.
    fn add(&mut self, rhs: &Self);

    /// Subtracts from self in-place.
    fn sub(&mut self, rhs: &Self);

    /// Negates self in-place.
    fn neg(&mut self);

    /// Encodes the element into [FixedSize::SIZE] bytes.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decodes an element from exactly [FixedSize::SIZE] bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>;
}

/// An element of the scalar field `Z_q`.
pub trait Scalar: Element + Zeroize {
    /// Returns the multiplicative identity.
    fn one() -> Self;

    /// Returns the scalar representing the integer `i`.
    fn from_u32(i: u32) -> Self;

    /// Samples a uniformly random scalar.
    fn random<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self;

    /// Multiplies self in-place.
    fn mul(&mut self, rhs: &Self);

    /// Returns the multiplicative inverse, failing on zero.
    fn inverse(&self) -> Result<Self, Error>;

    /// Divides self in-place by `rhs`, failing if `rhs` is zero.
    fn div(&mut self, rhs: &Self) -> Result<(), Error> {
        let inv = rhs.inverse()?;
        self.mul(&inv);
        Ok(())
    }
}

/// An element of the prime-order group `G`.
pub trait Point: Element {
    /// The scalar field of the group.
    type Scalar: Scalar;

    /// Returns the standard generator `B`.
    fn generator() -> Self;

    /// Multiplies self in-place by a scalar.
    ///
    /// This is constant-time in the scalar.
    fn mul(&mut self, rhs: &Self::Scalar);

    /// Returns `s·B`.
    fn mul_base(s: &Self::Scalar) -> Self {
        let mut p = Self::generator();
        p.mul(s);
        p
    }

    /// Maximum number of bytes that can be embedded in a point.
    fn embed_len() -> usize;

    /// Returns a pseudo-random point carrying `data`.
    fn embed<R: CryptoRngCore + ?Sized>(data: &[u8], rng: &mut R) -> Result<Self, Error>;

    /// Returns the data embedded with [Point::embed].
    fn data(&self) -> Result<Vec<u8>, Error>;
}

/// A prime-order group together with its scalar field and hash.
pub trait Group: Clone + Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Human-readable name of the group.
    const NAME: &'static str;

    /// Scalar field.
    type Scalar: Scalar;

    /// Group elements.
    type Point: Point<Scalar = Self::Scalar>;

    /// Returns a new (zero) scalar.
    fn scalar() -> Self::Scalar {
        Self::Scalar::zero()
    }

    /// Returns a new (identity) point.
    fn point() -> Self::Point {
        Self::Point::zero()
    }

    /// Length of an encoded scalar.
    fn scalar_len() -> usize {
        <Self::Scalar as FixedSize>::SIZE
    }

    /// Length of an encoded point.
    fn point_len() -> usize {
        <Self::Point as FixedSize>::SIZE
    }

    /// Hashes `msg` onto the scalar field with the group's configured hash.
    fn hash_to_scalar(msg: &[u8]) -> Self::Scalar;

    /// Decodes a point from an untrusted source, additionally rejecting points of small order
    /// (including the identity) with [Error::SmallOrder].
    fn decode_point_strict(bytes: &[u8]) -> Result<Self::Point, Error> {
        let point = Self::Point::from_bytes(bytes)?;
        if point == Self::Point::zero() {
            return Err(Error::SmallOrder);
        }
        Ok(point)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode, Error as CodecError};
    use commonware_utils::hex;
    use rand::{rngs::StdRng, SeedableRng};

    /// Checks the algebraic laws every group must satisfy.
    pub fn check_laws<G: Group>() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..16 {
            let s = G::Scalar::random(&mut rng);
            let t = G::Scalar::random(&mut rng);

            // s·B round-trips through its encoding
            let sb = G::Point::mul_base(&s);
            let encoded = sb.to_bytes();
            assert_eq!(encoded.len(), G::point_len());
            assert_eq!(G::Point::from_bytes(&encoded).unwrap(), sb);
            let encoded = s.to_bytes();
            assert_eq!(encoded.len(), G::scalar_len());
            assert_eq!(G::Scalar::from_bytes(&encoded).unwrap(), s);

            // s·(t·B) == (s·t)·B == t·(s·B)
            let mut stb = G::Point::mul_base(&t);
            stb.mul(&s);
            let mut st = s.clone();
            st.mul(&t);
            assert_eq!(stb, G::Point::mul_base(&st));
            let mut tsb = sb.clone();
            tsb.mul(&t);
            assert_eq!(stb, tsb);

            // (s+t)·B == s·B + t·B
            let mut sum = s.clone();
            sum.add(&t);
            let mut expected = sb.clone();
            expected.add(&G::Point::mul_base(&t));
            assert_eq!(G::Point::mul_base(&sum), expected);

            // s·Null == Null
            let mut null = G::point();
            null.mul(&s);
            assert_eq!(null, G::point());

            // 1·P == P and 0·P == Null
            let mut p = sb.clone();
            p.mul(&G::Scalar::one());
            assert_eq!(p, sb);
            p.mul(&G::scalar());
            assert_eq!(p, G::point());

            // (-s)·P + s·P == Null
            let mut neg = s.clone();
            neg.neg();
            let mut left = G::Point::mul_base(&t);
            left.mul(&neg);
            let mut right = G::Point::mul_base(&t);
            right.mul(&s);
            left.add(&right);
            assert_eq!(left, G::point());

            // P - P == Null
            let mut diff = sb.clone();
            diff.sub(&sb);
            assert_eq!(diff, G::point());

            // s / t · t == s
            let mut quotient = s.clone();
            quotient.div(&t).unwrap();
            quotient.mul(&t);
            assert_eq!(quotient, s);
        }

        // Identity encoding round-trips
        let null = G::point();
        assert_eq!(G::Point::from_bytes(&null.to_bytes()).unwrap(), null);

        // Dividing by zero fails
        let mut s = G::Scalar::one();
        assert_eq!(s.div(&G::scalar()), Err(Error::InvalidScalar));
        assert_eq!(G::scalar().inverse(), Err(Error::InvalidScalar));

        // Wrong lengths fail
        assert!(G::Scalar::from_bytes(&[0u8; 3]).is_err());
        assert!(G::Point::from_bytes(&[0u8; 3]).is_err());

        // Strict decoding rejects the identity
        assert_eq!(
            G::decode_point_strict(&null.to_bytes()),
            Err(Error::SmallOrder)
        );
    }

    /// Checks that data survives embedding.
    pub fn check_embed<G: Group>() {
        let mut rng = StdRng::seed_from_u64(1);
        for len in [0, 1, 7, G::Point::embed_len()] {
            let data = (0..len as u8).collect::<Vec<_>>();
            let point = G::Point::embed(&data, &mut rng).unwrap();
            assert_eq!(point.data().unwrap(), data);

            // Embedded points are valid group elements
            let decoded = G::Point::from_bytes(&point.to_bytes()).unwrap();
            assert_eq!(decoded.data().unwrap(), data);
        }

        // Too much data is rejected
        let data = vec![0u8; G::Point::embed_len() + 1];
        assert_eq!(
            G::Point::embed(&data, &mut rng),
            Err(Error::EmbedTooLong {
                len: G::Point::embed_len() + 1,
                max: G::Point::embed_len()
            })
        );
    }

    /// Checks that hashing onto the scalar field is deterministic.
    pub fn check_hash_to_scalar<G: Group>() {
        let a = G::hash_to_scalar(b"hello");
        let b = G::hash_to_scalar(b"hello");
        let c = G::hash_to_scalar(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    /// Checks the codec impls against the raw encoding.
    pub fn check_codec<G: Group>() {
        let mut rng = StdRng::seed_from_u64(2);
        let s = G::Scalar::random(&mut rng);
        let p = G::Point::mul_base(&s);

        let encoded = s.encode();
        assert_eq!(&encoded[..], &s.to_bytes()[..]);
        assert_eq!(G::Scalar::decode(encoded).unwrap(), s);
        let encoded = p.encode();
        assert_eq!(&encoded[..], &p.to_bytes()[..]);
        assert_eq!(G::Point::decode(encoded).unwrap(), p);

        // Truncated and trailing input
        let encoded = p.encode();
        assert!(matches!(
            G::Point::decode(&encoded[..G::point_len() - 1]),
            Err(CodecError::EndOfBuffer)
        ));
        let mut extended = encoded.to_vec();
        extended.push(0);
        assert!(matches!(
            G::Point::decode(&extended[..]),
            Err(CodecError::ExtraData(1))
        ));

        // Out-of-range scalars are wrapped errors
        let overflow = vec![0xffu8; G::scalar_len()];
        assert!(matches!(
            G::Scalar::decode(&overflow[..]),
            Err(CodecError::Wrapped(name, _)) if name == G::NAME
        ));
    }

    /// Checks that scalars never print their value.
    pub fn check_debug_redacted<G: Group>() {
        let mut rng = StdRng::seed_from_u64(3);
        let s = G::Scalar::random(&mut rng);
        let printed = format!("{s:?}");
        assert!(!printed.contains(&hex(&s.to_bytes())));
        assert_eq!(printed, "Scalar(..)");

        // Points are public
        let p = G::Point::mul_base(&s);
        assert_eq!(format!("{p:?}"), hex(&p.to_bytes()));
    }
}
