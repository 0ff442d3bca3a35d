//! One-shot hybrid encryption of a short payload to a [Group] public key.
//!
//! The sender picks an ephemeral scalar `r`, publishes `R = r·B`, and derives a ChaCha20-Poly1305
//! key and nonce from `S = r·P` with HKDF-SHA256. The ciphertext is `R ‖ AEAD(k, ν, m)`.
//!
//! The nonce is derived rather than random: every encryption uses a fresh `R`, so a `(k, ν)`
//! pair is never reused.

use crate::primitives::{
    group::{Element, Group, Point, Scalar},
    Error,
};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit, KeySizeUser, Nonce};
use hkdf::{hmac::digest::typenum::Unsigned, Hkdf};
use rand_core::CryptoRngCore;
use sha2::Sha256;
use zeroize::Zeroize;

/// The size of the key used by the ChaCha20Poly1305 cipher.
const KEY_SIZE: usize = <ChaCha20Poly1305 as KeySizeUser>::KeySize::USIZE;

/// The size of the nonce used by the ChaCha20Poly1305 cipher.
const NONCE_SIZE: usize = 12;

/// The size of the authentication tag appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// Derives the cipher and nonce from the shared point.
fn derive<G: Group>(shared: &G::Point) -> Result<(ChaCha20Poly1305, [u8; NONCE_SIZE]), Error> {
    let mut ikm = shared.to_bytes();
    let prk = Hkdf::<Sha256>::new(None, &ikm);
    ikm.zeroize();

    // Expand into a key followed by a nonce
    let mut okm = [0u8; KEY_SIZE + NONCE_SIZE];
    prk.expand(&[], &mut okm).map_err(|_| Error::HkdfExpansion)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&okm[..KEY_SIZE]);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&okm[KEY_SIZE..]);
    okm.zeroize();
    let cipher = cipher.map_err(|_| Error::HkdfExpansion)?;
    Ok((cipher, nonce))
}

/// Encrypts `msg` to `public`.
///
/// The output is the encoding of the ephemeral point followed by the AEAD ciphertext (which is
/// [TAG_SIZE] bytes longer than `msg`).
pub fn encrypt<G: Group, R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    public: &G::Point,
    msg: &[u8],
) -> Result<Vec<u8>, Error> {
    // Ephemeral key pair
    let mut r = G::Scalar::random(rng);
    let ephemeral = G::Point::mul_base(&r);

    // Shared point
    let mut shared = public.clone();
    shared.mul(&r);
    r.zeroize();

    // Encrypt with empty associated data
    let (cipher, nonce) = derive::<G>(&shared)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), msg)
        .map_err(|_| Error::EncryptionFailed)?;

    let mut out = ephemeral.to_bytes();
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a ciphertext produced by [encrypt] with the recipient's private scalar.
pub fn decrypt<G: Group>(private: &G::Scalar, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    if ciphertext.len() < G::point_len() {
        return Err(Error::InvalidPoint);
    }
    let (ephemeral, ciphertext) = ciphertext.split_at(G::point_len());
    let mut shared = G::Point::from_bytes(ephemeral).map_err(|_| Error::InvalidPoint)?;
    shared.mul(private);

    let (cipher, nonce) = derive::<G>(&shared)?;
    cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}
