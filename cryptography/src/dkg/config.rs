//! Configuration of a DKG or resharing run.

use super::types::DistKeyShare;
use crate::{primitives::group::Group, sign::Scheme};
use rand::rngs::OsRng;
use rand_core::CryptoRngCore;

/// Length of a session nonce.
pub const NONCE_LENGTH: usize = 32;

/// A session nonce.
pub type Nonce = [u8; NONCE_LENGTH];

/// A participant: the index at which its share is evaluated and its long-term public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node<G: Group> {
    pub index: u32,
    pub public: G::Point,
}

impl<G: Group> Node<G> {
    pub fn new(index: u32, public: G::Point) -> Self {
        Self { index, public }
    }
}

/// Configuration of a [super::DistKeyGenerator].
///
/// A fresh DKG only needs `new_nodes` (the dealers are the share holders). A resharing needs
/// `old_nodes`, `old_threshold` and either `share` (for old members) or `public_coeffs` (for new
/// members that did not hold a share).
#[derive(Clone)]
pub struct Config<G: Group, A: Scheme<G>> {
    /// This node's long-term private scalar. Its public point identifies the node in the
    /// committees.
    pub longterm: G::Scalar,

    /// Dealers of a resharing. Empty for a fresh DKG.
    pub old_nodes: Vec<Node<G>>,

    /// Public polynomial of the previous run (resharing only, for nodes without `share`).
    pub public_coeffs: Option<Vec<G::Point>>,

    /// Share holders.
    pub new_nodes: Vec<Node<G>>,

    /// This node's share of the previous run (resharing only).
    pub share: Option<DistKeyShare<G>>,

    /// Threshold of the new committee. Zero selects [minimum_t] of `new_nodes`.
    pub threshold: u32,

    /// Threshold of the previous run (resharing only). It must be given explicitly so a
    /// resharing cannot silently lower it.
    pub old_threshold: u32,

    /// Broadcast success responses so the run can end as soon as every node answered.
    pub fast_sync: bool,

    /// Session identifier, [NONCE_LENGTH] bytes, unique per run (see [get_nonce]).
    pub nonce: Vec<u8>,

    /// Scheme used to sign bundles.
    pub auth: A,

    /// Additional entropy mixed into the secret coefficient of a fresh DKG.
    pub entropy: Option<Vec<u8>>,

    /// Derive the secret coefficient from `entropy` alone (deterministic runs).
    pub entropy_only: bool,
}

impl<G: Group, A: Scheme<G>> Config<G, A> {
    /// Returns a fresh DKG configuration with default options.
    pub fn new(longterm: G::Scalar, new_nodes: Vec<Node<G>>, nonce: Vec<u8>, auth: A) -> Self {
        Self {
            longterm,
            old_nodes: Vec::new(),
            public_coeffs: None,
            new_nodes,
            share: None,
            threshold: 0,
            old_threshold: 0,
            fast_sync: false,
            nonce,
            auth,
            entropy: None,
            entropy_only: false,
        }
    }

    /// Returns true if the configuration describes a resharing.
    pub fn is_resharing(&self) -> bool {
        self.share.is_some() || self.public_coeffs.is_some()
    }

    /// Returns the nodes that sign deals and justifications.
    pub fn dealers(&self) -> &[Node<G>] {
        if self.old_nodes.is_empty() {
            &self.new_nodes
        } else {
            &self.old_nodes
        }
    }
}

/// Returns the smallest threshold that still requires a majority of `n` nodes.
pub fn minimum_t(n: usize) -> u32 {
    ((n + 1) / 2) as u32
}

/// Returns a random session nonce drawn from the operating system.
pub fn get_nonce() -> Vec<u8> {
    get_nonce_from(&mut OsRng)
}

/// Returns a random session nonce drawn from `rng`.
pub fn get_nonce_from<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut nonce = vec![0u8; NONCE_LENGTH];
    rng.fill_bytes(&mut nonce);
    nonce
}

pub(crate) fn find_index<G: Group>(nodes: &[Node<G>], index: u32) -> Option<&Node<G>> {
    nodes.iter().find(|node| node.index == index)
}

pub(crate) fn find_public<G: Group>(nodes: &[Node<G>], public: &G::Point) -> Option<u32> {
    nodes
        .iter()
        .find(|node| &node.public == public)
        .map(|node| node.index)
}

pub(crate) fn contains_index<G: Group>(nodes: &[Node<G>], index: u32) -> bool {
    find_index(nodes, index).is_some()
}
