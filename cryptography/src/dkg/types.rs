//! Messages exchanged during a DKG and the output of a successful run.
//!
//! Every bundle has a canonical hash (SHA-256 over its fields, with items sorted by index) that
//! its sender signs. Bundles are encoded with [commonware_codec]: indices are varints, group
//! elements have fixed lengths and lists are length-prefixed. Decoding a bundle takes the maximum
//! committee size, which bounds how many items a peer can make us allocate.

use super::{
    config::{find_index, Config, Node, Nonce},
    status::Status,
    Error,
};
use crate::{
    primitives::{
        group::{Element, Group},
        poly::{PriShare, PubPoly},
        Error as PrimitiveError,
    },
    sign::Scheme,
};
use bytes::{Buf, BufMut};
use commonware_codec::{
    varint::UInt, EncodeSize, Error as CodecError, FixedSize, Read, ReadExt, ReadRangeExt, Write,
};
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Formatter};
use zeroize::Zeroize;

/// Length of a bundle hash.
pub const HASH_LENGTH: usize = 32;

/// Maximum length of an encrypted share accepted from the wire.
pub const MAX_ENCRYPTED_SHARE_LENGTH: usize = 256;

/// Maximum length of a bundle signature accepted from the wire.
pub const MAX_SIGNATURE_LENGTH: usize = 256;

/// A message signed by a dealer or a share holder.
pub trait Packet {
    /// Whether the packet is signed by a dealer (otherwise, by a share holder).
    const FROM_DEALER: bool;

    /// Returns the canonical hash of the packet (excluding its signature).
    fn hash(&self) -> [u8; HASH_LENGTH];

    /// Returns the index of the signer.
    fn index(&self) -> u32;

    /// Returns the signature over [Packet::hash].
    fn signature(&self) -> &[u8];
}

/// Verifies the signature of a packet against the committee that is allowed to send it.
///
/// Deals and justifications must come from a dealer (the old committee, or the new committee in a
/// fresh DKG). Responses must come from a share holder.
pub fn verify_packet_signature<G: Group, A: Scheme<G>, P: Packet>(
    config: &Config<G, A>,
    packet: &P,
) -> Result<(), Error> {
    let signers = if P::FROM_DEALER {
        config.dealers()
    } else {
        &config.new_nodes
    };
    let index = packet.index();
    let node = find_index(signers, index).ok_or(Error::UnknownSigner(index))?;
    config
        .auth
        .verify(&node.public, &packet.hash(), packet.signature())?;
    Ok(())
}

/// An encrypted share for one share holder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deal {
    pub share_index: u32,
    pub encrypted_share: Vec<u8>,
}

impl Write for Deal {
    fn write(&self, buf: &mut impl BufMut) {
        UInt(self.share_index).write(buf);
        self.encrypted_share.write(buf);
    }
}

impl Read for Deal {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let share_index = UInt::read(buf)?.into();
        let encrypted_share = Vec::<u8>::read_range(buf, ..=MAX_ENCRYPTED_SHARE_LENGTH)?;
        Ok(Self {
            share_index,
            encrypted_share,
        })
    }
}

impl EncodeSize for Deal {
    fn encode_size(&self) -> usize {
        UInt(self.share_index).encode_size() + self.encrypted_share.encode_size()
    }
}

/// All deals of a dealer, with the commitment to its polynomial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DealBundle<G: Group> {
    pub dealer_index: u32,
    pub deals: Vec<Deal>,
    pub public: Vec<G::Point>,
    pub session_id: Nonce,
    pub signature: Vec<u8>,
}

impl<G: Group> Packet for DealBundle<G> {
    const FROM_DEALER: bool = true;

    fn hash(&self) -> [u8; HASH_LENGTH] {
        let mut deals: Vec<&Deal> = self.deals.iter().collect();
        deals.sort_by_key(|deal| deal.share_index);

        let mut hasher = Sha256::new();
        hasher.update(self.dealer_index.to_be_bytes());
        for deal in deals {
            hasher.update(deal.share_index.to_be_bytes());
            hasher.update(&deal.encrypted_share);
        }
        for commit in &self.public {
            hasher.update(commit.to_bytes());
        }
        hasher.update(self.session_id);
        hasher.finalize().into()
    }

    fn index(&self) -> u32 {
        self.dealer_index
    }

    fn signature(&self) -> &[u8] {
        &self.signature
    }
}

impl<G: Group> Write for DealBundle<G> {
    fn write(&self, buf: &mut impl BufMut) {
        UInt(self.dealer_index).write(buf);
        self.deals.write(buf);
        self.public.write(buf);
        self.session_id.write(buf);
        self.signature.write(buf);
    }
}

impl<G: Group> Read for DealBundle<G> {
    type Cfg = usize;

    fn read_cfg(buf: &mut impl Buf, max_nodes: &usize) -> Result<Self, CodecError> {
        let dealer_index = UInt::read(buf)?.into();
        let deals = Vec::<Deal>::read_range(buf, ..=*max_nodes)?;
        let public = Vec::<G::Point>::read_range(buf, 1..=*max_nodes)?;
        let session_id = Nonce::read(buf)?;
        let signature = Vec::<u8>::read_range(buf, ..=MAX_SIGNATURE_LENGTH)?;
        Ok(Self {
            dealer_index,
            deals,
            public,
            session_id,
            signature,
        })
    }
}

impl<G: Group> EncodeSize for DealBundle<G> {
    fn encode_size(&self) -> usize {
        UInt(self.dealer_index).encode_size()
            + self.deals.encode_size()
            + self.public.encode_size()
            + self.session_id.encode_size()
            + self.signature.encode_size()
    }
}

/// A share holder's verdict on the deal it got from a dealer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    pub dealer_index: u32,
    pub status: Status,
}

impl Write for Response {
    fn write(&self, buf: &mut impl BufMut) {
        UInt(self.dealer_index).write(buf);
        self.status.write(buf);
    }
}

impl Read for Response {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self {
            dealer_index: UInt::read(buf)?.into(),
            status: Status::read(buf)?,
        })
    }
}

impl EncodeSize for Response {
    fn encode_size(&self) -> usize {
        UInt(self.dealer_index).encode_size() + Status::SIZE
    }
}

/// All responses of a share holder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseBundle {
    pub share_index: u32,
    pub responses: Vec<Response>,
    pub session_id: Nonce,
    pub signature: Vec<u8>,
}

impl Packet for ResponseBundle {
    const FROM_DEALER: bool = false;

    fn hash(&self) -> [u8; HASH_LENGTH] {
        let mut responses = self.responses.clone();
        responses.sort_by_key(|response| response.dealer_index);

        let mut hasher = Sha256::new();
        hasher.update(self.share_index.to_be_bytes());
        for response in responses {
            hasher.update(response.dealer_index.to_be_bytes());
            hasher.update([response.status.to_byte()]);
        }
        hasher.update(self.session_id);
        hasher.finalize().into()
    }

    fn index(&self) -> u32 {
        self.share_index
    }

    fn signature(&self) -> &[u8] {
        &self.signature
    }
}

impl Write for ResponseBundle {
    fn write(&self, buf: &mut impl BufMut) {
        UInt(self.share_index).write(buf);
        self.responses.write(buf);
        self.session_id.write(buf);
        self.signature.write(buf);
    }
}

impl Read for ResponseBundle {
    type Cfg = usize;

    fn read_cfg(buf: &mut impl Buf, max_nodes: &usize) -> Result<Self, CodecError> {
        let share_index = UInt::read(buf)?.into();
        let responses = Vec::<Response>::read_range(buf, ..=*max_nodes)?;
        let session_id = Nonce::read(buf)?;
        let signature = Vec::<u8>::read_range(buf, ..=MAX_SIGNATURE_LENGTH)?;
        Ok(Self {
            share_index,
            responses,
            session_id,
            signature,
        })
    }
}

impl EncodeSize for ResponseBundle {
    fn encode_size(&self) -> usize {
        UInt(self.share_index).encode_size()
            + self.responses.encode_size()
            + self.session_id.encode_size()
            + self.signature.encode_size()
    }
}

/// A share revealed in clear by a dealer to answer a complaint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Justification<G: Group> {
    pub share_index: u32,
    pub share: G::Scalar,
}

impl<G: Group> Write for Justification<G> {
    fn write(&self, buf: &mut impl BufMut) {
        UInt(self.share_index).write(buf);
        self.share.write(buf);
    }
}

impl<G: Group> Read for Justification<G> {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self {
            share_index: UInt::read(buf)?.into(),
            share: G::Scalar::read(buf)?,
        })
    }
}

impl<G: Group> EncodeSize for Justification<G> {
    fn encode_size(&self) -> usize {
        UInt(self.share_index).encode_size() + G::scalar_len()
    }
}

/// All justifications of a dealer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JustificationBundle<G: Group> {
    pub dealer_index: u32,
    pub justifications: Vec<Justification<G>>,
    pub session_id: Nonce,
    pub signature: Vec<u8>,
}

impl<G: Group> Packet for JustificationBundle<G> {
    const FROM_DEALER: bool = true;

    fn hash(&self) -> [u8; HASH_LENGTH] {
        let mut justifications: Vec<&Justification<G>> = self.justifications.iter().collect();
        justifications.sort_by_key(|justification| justification.share_index);

        let mut hasher = Sha256::new();
        hasher.update(self.dealer_index.to_be_bytes());
        for justification in justifications {
            hasher.update(justification.share_index.to_be_bytes());
            hasher.update(justification.share.to_bytes());
        }
        hasher.update(self.session_id);
        hasher.finalize().into()
    }

    fn index(&self) -> u32 {
        self.dealer_index
    }

    fn signature(&self) -> &[u8] {
        &self.signature
    }
}

impl<G: Group> Write for JustificationBundle<G> {
    fn write(&self, buf: &mut impl BufMut) {
        UInt(self.dealer_index).write(buf);
        self.justifications.write(buf);
        self.session_id.write(buf);
        self.signature.write(buf);
    }
}

impl<G: Group> Read for JustificationBundle<G> {
    type Cfg = usize;

    fn read_cfg(buf: &mut impl Buf, max_nodes: &usize) -> Result<Self, CodecError> {
        let dealer_index = UInt::read(buf)?.into();
        let justifications = Vec::<Justification<G>>::read_range(buf, ..=*max_nodes)?;
        let session_id = Nonce::read(buf)?;
        let signature = Vec::<u8>::read_range(buf, ..=MAX_SIGNATURE_LENGTH)?;
        Ok(Self {
            dealer_index,
            justifications,
            session_id,
            signature,
        })
    }
}

impl<G: Group> EncodeSize for JustificationBundle<G> {
    fn encode_size(&self) -> usize {
        UInt(self.dealer_index).encode_size()
            + self.justifications.encode_size()
            + self.session_id.encode_size()
            + self.signature.encode_size()
    }
}

/// A node's share of the distributed key together with the public polynomial.
#[derive(Clone)]
pub struct DistKeyShare<G: Group> {
    poly: PubPoly<G>,
    share: PriShare<G>,
}

impl<G: Group> DistKeyShare<G> {
    /// Creates a share from the commitments to the (group generator based) public polynomial.
    pub fn new(commits: Vec<G::Point>, share: PriShare<G>) -> Result<Self, PrimitiveError> {
        Ok(Self {
            poly: PubPoly::new(None, commits)?,
            share,
        })
    }

    /// Returns the distributed public key.
    pub fn public(&self) -> &G::Point {
        self.poly.commit()
    }

    /// Returns the commitments to the coefficients of the shared polynomial.
    pub fn commits(&self) -> &[G::Point] {
        self.poly.commits()
    }

    /// Returns the public polynomial.
    pub fn poly(&self) -> &PubPoly<G> {
        &self.poly
    }

    /// Returns this node's private share.
    pub fn share(&self) -> &PriShare<G> {
        &self.share
    }
}

impl<G: Group> Debug for DistKeyShare<G> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistKeyShare")
            .field("commits", &self.poly.commits())
            .field("index", &self.share.index)
            .finish_non_exhaustive()
    }
}

impl<G: Group> Drop for DistKeyShare<G> {
    fn drop(&mut self) {
        self.share.value.zeroize();
    }
}

/// Output of a successful DKG or resharing.
#[derive(Clone, Debug)]
pub struct Output<G: Group> {
    /// Nodes whose contribution (or, in a resharing, whose share) was accepted.
    pub qual: Vec<Node<G>>,

    /// This node's share of the distributed key.
    pub key: DistKeyShare<G>,
}

impl<G: Group> Output<G> {
    /// Returns true if both outputs agree on everything public: the qualified set and the public
    /// polynomial.
    pub fn public_equal(&self, other: &Self) -> bool {
        self.qual == other.qual && self.key.commits() == other.key.commits()
    }
}
