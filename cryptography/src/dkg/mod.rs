//! Pedersen Distributed Key Generation (DKG) and resharing over any prime-order [Group].
//!
//! A DKG lets a committee of nodes jointly derive a public key whose secret is shared among
//! them (any `t` of `n` shares recover it) without any node ever learning the secret. A
//! resharing hands the shares of an existing key to a new committee (possibly with a different
//! threshold) while keeping the public key unchanged.
//!
//! # Overview
//!
//! Nodes take on two roles: dealers (every node of a fresh DKG, the old committee of a
//! resharing) and share holders (the new committee). A node may be both. Each node is identified
//! by a non-zero index (the point at which its share is evaluated) and a long-term key pair used
//! both to sign bundles and to receive encrypted shares.
//!
//! The run proceeds in phases, each driven by a method of [DistKeyGenerator]:
//!
//! 1. [Phase::Deal]: every dealer samples a polynomial of degree `t - 1` (whose constant term is
//!    random in a DKG or its previous share in a resharing) and broadcasts a [DealBundle]: the
//!    commitments to its coefficients and one ECIES-encrypted share per share holder.
//! 2. [Phase::Response]: every share holder decrypts its shares, checks them against the
//!    commitments (and, in a resharing, that the dealer still shares its previous share) and
//!    broadcasts a [ResponseBundle] complaining about every missing or invalid share. In fast sync
//!    mode, holders also report every valid share so the run can end as soon as all holders
//!    answered.
//! 3. [Phase::Justification]: every dealer that received complaints reveals the disputed shares
//!    in a [JustificationBundle]. A dealer with at least `t` complaints is evicted (enough shares
//!    are public to recover its polynomial).
//! 4. [Phase::Finish]: share holders sum the shares of the dealers whose every share was accepted
//!    (in a resharing, combine them by Lagrange interpolation) into their [DistKeyShare].
//!
//! Bundles must be broadcast to every participant (including their sender) and authenticated
//! with [verify_packet_signature] before being handed to the generator. [protocol::Protocol]
//! does both over a [protocol::Board], advancing phases on a timer or, in fast sync mode, as soon
//! as every expected bundle arrived.
//!
//! # Synchrony
//!
//! Like any Pedersen DKG, this construction assumes a synchronous broadcast channel: a bundle
//! that arrives after its phase ended is ignored, which may exclude an honest dealer. The
//! qualified set returned in [Output::qual] identifies the dealers (or, in a resharing, the
//! share holders) that took part.

use crate::{primitives, sign};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub mod config;
pub use config::{get_nonce, get_nonce_from, minimum_t, Config, Node, Nonce, NONCE_LENGTH};
pub mod generator;
pub use generator::DistKeyGenerator;
pub mod protocol;
pub mod status;
pub use status::{Status, StatusMatrix};
pub mod types;
pub use types::{
    verify_packet_signature, Deal, DealBundle, DistKeyShare, Justification, JustificationBundle,
    Output, Packet, Response, ResponseBundle,
};

/// Phase of a [DistKeyGenerator].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Init,
    Deal,
    Response,
    Justification,
    Finish,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Deal => "deal",
            Phase::Response => "response",
            Phase::Justification => "justification",
            Phase::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during a DKG or resharing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    #[error("wrong phase: {have} (expected {want})")]
    WrongPhase { have: Phase, want: Phase },
    #[error("not in committee")]
    NotInCommittee,
    #[error("insufficient deals: {got} < {need}")]
    InsufficientDeals { got: usize, need: usize },
    #[error("not enough qualified nodes: {got} < {need}")]
    NotEnoughQual { got: usize, need: usize },
    #[error("share does not match the public polynomial")]
    ShareMismatch,
    #[error("unknown signer: {0}")]
    UnknownSigner(u32),
    #[error("board closed")]
    BoardClosed,
    #[error("internal: {0}")]
    Internal(&'static str),
    #[error("primitive: {0}")]
    Primitive(#[from] primitives::Error),
    #[error("sign: {0}")]
    Sign(#[from] sign::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        primitives::{
            group::{Ed25519, Group, Point, Scalar, P256},
            poly::{recover_secret, Eval},
        },
        sign::Schnorr,
    };
    use commonware_macros::test_traced;
    use rand::{rngs::StdRng, SeedableRng};

    type Dkg<G> = DistKeyGenerator<G, Schnorr<G>>;

    fn committee<G: Group>(
        rng: &mut StdRng,
        n: u32,
        offset: u32,
    ) -> (Vec<G::Scalar>, Vec<Node<G>>) {
        let keys: Vec<_> = (0..n).map(|_| G::Scalar::random(rng)).collect();
        let nodes = keys
            .iter()
            .enumerate()
            .map(|(i, key)| Node::new(offset + i as u32 + 1, G::Point::mul_base(key)))
            .collect();
        (keys, nodes)
    }

    fn fresh<G: Group>(
        rng: &mut StdRng,
        keys: &[G::Scalar],
        nodes: &[Node<G>],
        threshold: u32,
        fast_sync: bool,
    ) -> Vec<Dkg<G>> {
        let nonce = get_nonce_from(rng);
        keys.iter()
            .map(|key| {
                let mut config =
                    Config::new(key.clone(), nodes.to_vec(), nonce.clone(), Schnorr::new());
                config.threshold = threshold;
                config.fast_sync = fast_sync;
                DistKeyGenerator::new(config, rng).unwrap()
            })
            .collect()
    }

    fn reshare<G: Group>(
        key: &G::Scalar,
        old_nodes: &[Node<G>],
        new_nodes: &[Node<G>],
        nonce: &[u8],
    ) -> Config<G, Schnorr<G>> {
        let mut config = Config::new(
            key.clone(),
            new_nodes.to_vec(),
            nonce.to_vec(),
            Schnorr::new(),
        );
        config.old_nodes = old_nodes.to_vec();
        config
    }

    fn deals<G: Group>(dkgs: &mut [Dkg<G>], rng: &mut StdRng) -> Vec<DealBundle<G>> {
        dkgs.iter_mut()
            .filter(|dkg| dkg.can_issue())
            .map(|dkg| dkg.deals(rng).unwrap())
            .collect()
    }

    fn responses<G: Group>(dkgs: &mut [Dkg<G>], deals: &[DealBundle<G>]) -> Vec<ResponseBundle> {
        dkgs.iter_mut()
            .filter_map(|dkg| dkg.process_deals(deals).unwrap())
            .collect()
    }

    #[allow(clippy::type_complexity)]
    fn justifications<G: Group>(
        dkgs: &mut [Dkg<G>],
        responses: &[ResponseBundle],
    ) -> (Vec<Option<Output<G>>>, Vec<JustificationBundle<G>>) {
        let mut outputs = Vec::new();
        let mut justifications = Vec::new();
        for dkg in dkgs.iter_mut() {
            let (output, justification) = dkg.process_responses(responses).unwrap();
            outputs.push(output);
            justifications.extend(justification);
        }
        (outputs, justifications)
    }

    fn finish<G: Group>(
        dkgs: &mut [Dkg<G>],
        outputs: Vec<Option<Output<G>>>,
        justifications: &[JustificationBundle<G>],
    ) -> Vec<Output<G>> {
        dkgs.iter_mut()
            .zip(outputs)
            .filter_map(|(dkg, output)| match output {
                Some(output) => Some(output),
                None => dkg.process_justifications(justifications).unwrap(),
            })
            .collect()
    }

    fn run<G: Group>(dkgs: &mut [Dkg<G>], rng: &mut StdRng) -> Vec<Output<G>> {
        let deals = deals(dkgs, rng);
        let responses = responses(dkgs, &deals);
        let (outputs, justifications) = justifications(dkgs, &responses);
        finish(dkgs, outputs, &justifications)
    }

    /// Checks that all outputs agree and that the first `t` shares recover the public key.
    fn check_outputs<G: Group>(outputs: &[Output<G>], t: u32) {
        let first = &outputs[0];
        for output in outputs {
            assert!(output.public_equal(first));
            assert!(output.key.poly().check(output.key.share()));
        }
        let shares: Vec<_> = outputs.iter().map(|o| o.key.share().clone()).collect();
        let secret = recover_secret::<G>(&shares, t).unwrap();
        assert_eq!(&G::Point::mul_base(&secret), first.key.public());
    }

    fn run_fresh<G: Group>(n: u32, fast_sync: bool) {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<G>(&mut rng, n, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, n, fast_sync);

        let deals = deals(&mut dkgs, &mut rng);
        assert_eq!(deals.len(), n as usize);
        for bundle in &deals {
            verify_packet_signature(dkgs[0].config(), bundle).unwrap();
        }
        let responses = responses(&mut dkgs, &deals);
        if fast_sync {
            assert_eq!(responses.len(), n as usize);
            for bundle in &responses {
                verify_packet_signature(dkgs[0].config(), bundle).unwrap();
            }
        } else {
            assert!(responses.is_empty());
        }

        // Nothing to justify
        let (outputs, justifications) = justifications(&mut dkgs, &responses);
        assert!(justifications.is_empty());
        let outputs: Vec<_> = outputs.into_iter().map(Option::unwrap).collect();
        for dkg in &dkgs {
            assert_eq!(dkg.phase(), Phase::Finish);
        }
        assert_eq!(outputs[0].qual, nodes);
        check_outputs(&outputs, n);
    }

    #[test_traced]
    fn test_dkg_full() {
        run_fresh::<Ed25519>(5, false);
    }

    #[test_traced]
    fn test_dkg_full_fast_sync() {
        run_fresh::<Ed25519>(5, true);
    }

    #[test_traced]
    fn test_dkg_full_p256() {
        run_fresh::<P256>(4, false);
        run_fresh::<P256>(4, true);
    }

    #[test_traced]
    fn test_dkg_offline_dealer() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);

        // Node 5 never shows up
        let mut dkgs = fresh(&mut rng, &keys[..4], &nodes, 4, false);
        let deals = deals(&mut dkgs, &mut rng);
        let responses = responses(&mut dkgs, &deals);
        assert_eq!(responses.len(), 4);
        for bundle in &responses {
            assert_eq!(
                bundle.responses,
                vec![Response {
                    dealer_index: 5,
                    status: Status::Complaint
                }]
            );
        }
        let (outputs, justifications) = justifications(&mut dkgs, &responses);
        assert!(outputs.iter().all(Option::is_none));
        assert!(justifications.is_empty());
        for dkg in &dkgs {
            assert_eq!(dkg.phase(), Phase::Justification);
            assert!(dkg.evicted().contains(&5));
        }

        let outputs = finish(&mut dkgs, outputs, &justifications);
        assert_eq!(outputs.len(), 4);
        assert_eq!(outputs[0].qual, nodes[..4].to_vec());
        check_outputs(&outputs, 4);
    }

    #[test_traced]
    fn test_dkg_insufficient_deals() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);

        // Only 3 dealers for a threshold of 4
        let mut dkgs = fresh(&mut rng, &keys[..3], &nodes, 4, false);
        let deals = deals(&mut dkgs, &mut rng);
        let responses = responses(&mut dkgs, &deals);
        let (outputs, _) = justifications(&mut dkgs, &responses);
        assert!(outputs.iter().all(Option::is_none));
        for dkg in dkgs.iter_mut() {
            assert_eq!(
                dkg.process_justifications(&[]).err(),
                Some(Error::InsufficientDeals { got: 3, need: 4 })
            );
            assert_eq!(dkg.phase(), Phase::Finish);
        }
    }

    fn corrupt_deal<G: Group>(deals: &mut [DealBundle<G>], dealer: u32, holder: u32) {
        let deal = deals
            .iter_mut()
            .find(|bundle| bundle.dealer_index == dealer)
            .unwrap()
            .deals
            .iter_mut()
            .find(|deal| deal.share_index == holder)
            .unwrap();
        let last = deal.encrypted_share.len() - 1;
        deal.encrypted_share[last] ^= 1;
    }

    #[test_traced]
    fn test_dkg_fast_sync_justified() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, 5, true);

        // Dealer 1 sends garbage to node 2
        let mut deals = deals(&mut dkgs, &mut rng);
        corrupt_deal(&mut deals, 1, 2);
        let responses = responses(&mut dkgs, &deals);
        assert_eq!(responses.len(), 5);
        let complaint = responses
            .iter()
            .find(|bundle| bundle.share_index == 2)
            .unwrap();
        assert!(complaint.responses.contains(&Response {
            dealer_index: 1,
            status: Status::Complaint
        }));

        // Only dealer 1 justifies, and only node 2's share
        let (outputs, justifications) = justifications(&mut dkgs, &responses);
        assert!(outputs.iter().all(Option::is_none));
        assert_eq!(justifications.len(), 1);
        assert_eq!(justifications[0].dealer_index, 1);
        assert_eq!(justifications[0].justifications.len(), 1);
        assert_eq!(justifications[0].justifications[0].share_index, 2);
        verify_packet_signature(dkgs[2].config(), &justifications[0]).unwrap();
        for dkg in &dkgs {
            assert_eq!(dkg.phase(), Phase::Justification);
            assert!(dkg.evicted().is_empty());
        }

        let outputs = finish(&mut dkgs, outputs, &justifications);
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[0].qual, nodes);
        check_outputs(&outputs, 5);
    }

    #[test_traced]
    fn test_dkg_fast_sync_unjustified() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, 4, true);
        let mut deals = deals(&mut dkgs, &mut rng);
        corrupt_deal(&mut deals, 1, 2);
        let responses = responses(&mut dkgs, &deals);
        let (outputs, justifications) = justifications(&mut dkgs, &responses);
        assert_eq!(justifications.len(), 1);

        // Dealer 1's justification is lost
        let outputs = finish(&mut dkgs[1..], outputs[1..].to_vec(), &[]);
        assert_eq!(outputs.len(), 4);
        assert_eq!(outputs[0].qual, nodes[1..].to_vec());
        check_outputs(&outputs, 4);
    }

    #[test_traced]
    fn test_dkg_invalid_justification() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, 5, true);
        let mut deals = deals(&mut dkgs, &mut rng);
        corrupt_deal(&mut deals, 1, 2);
        let responses = responses(&mut dkgs, &deals);
        let (_, mut justifications) = justifications(&mut dkgs, &responses);

        // A revealed share that does not match the commitments evicts its dealer
        justifications[0].justifications[0]
            .share
            .add(&<Ed25519 as Group>::Scalar::one());
        for dkg in dkgs[1..].iter_mut() {
            assert_eq!(
                dkg.process_justifications(&justifications).err(),
                Some(Error::InsufficientDeals { got: 4, need: 5 })
            );
            assert!(dkg.evicted().contains(&1));
        }
    }

    #[test_traced]
    fn test_dkg_invalid_session_id() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, 3, false);
        let mut deals = deals(&mut dkgs, &mut rng);
        deals[0].session_id[0] ^= 1;

        // Dealer 1 is evicted before anyone complains about it
        let responses = responses(&mut dkgs, &deals);
        assert!(responses.is_empty());
        for dkg in &dkgs[1..] {
            assert!(dkg.evicted().contains(&1));
        }
        let (outputs, justifications) = justifications(&mut dkgs[1..], &responses);
        assert!(outputs.iter().all(Option::is_none));
        let outputs = finish(&mut dkgs[1..], outputs, &justifications);
        assert_eq!(outputs.len(), 4);
        assert_eq!(outputs[0].qual, nodes[1..].to_vec());
        check_outputs(&outputs, 3);
    }

    #[test_traced]
    fn test_dkg_invalid_responses() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 6, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, 3, false);

        // Dealer 1's deals never arrive
        let deals: Vec<_> = deals(&mut dkgs, &mut rng)
            .into_iter()
            .filter(|bundle| bundle.dealer_index != 1)
            .collect();
        let mut responses = responses(&mut dkgs, &deals);
        assert_eq!(responses.len(), 5);

        // Node 3 complains about a dealer that does not exist and node 4 sends a success
        // outside of fast sync
        responses[1].responses[0].dealer_index = 1000;
        responses[2].responses[0].status = Status::Success;

        // Enough complaints remain to evict dealer 1, which still receives a share
        let mut outputs = Vec::new();
        for index in [0, 1, 4, 5] {
            let dkg = &mut dkgs[index];
            let (output, justification) = dkg.process_responses(&responses).unwrap();
            assert!(output.is_none());
            assert!(justification.is_none());
            assert!(dkg.evicted().contains(&1));
            assert!(dkg.evicted_holders().contains(&3));
            assert!(dkg.evicted_holders().contains(&4));
            outputs.push(dkg.process_justifications(&[]).unwrap().unwrap());
        }
        let qual: Vec<_> = outputs[0].qual.iter().map(|node| node.index).collect();
        assert_eq!(qual, vec![2, 5, 6]);
        check_outputs(&outputs, 3);
    }

    #[test_traced]
    fn test_dkg_self_eviction() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, 3, true);

        // Dealer 1 deals but nobody receives its bundle
        let deals: Vec<_> = deals(&mut dkgs, &mut rng)
            .into_iter()
            .filter(|bundle| bundle.dealer_index != 1)
            .collect();
        let responses = responses(&mut dkgs, &deals);

        // Dealer 1 learns it was evicted and has nothing to justify
        let (outputs, justifications) = justifications(&mut dkgs, &responses);
        assert!(outputs.iter().all(Option::is_none));
        assert!(justifications.is_empty());
        for dkg in &dkgs {
            assert_eq!(dkg.phase(), Phase::Justification);
            assert!(dkg.evicted().contains(&1));
        }

        // It still ends up with a share of the key built by the others
        let outputs = finish(&mut dkgs, outputs, &justifications);
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[0].key.share().index, 1);
        assert_eq!(outputs[0].qual, nodes[1..].to_vec());
        check_outputs(&outputs, 3);
    }

    #[test_traced]
    fn test_resharing() {
        let mut rng = StdRng::seed_from_u64(0);
        let (old_keys, old_nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &old_keys, &old_nodes, 4, false);
        let old_outputs = run(&mut dkgs, &mut rng);
        assert_eq!(old_outputs.len(), 5);
        let old_commits = old_outputs[0].key.commits().to_vec();

        // Nodes 1 to 4 stay, node 5 is offline and nodes 6 and 7 join
        let (new_keys, joining) = committee::<Ed25519>(&mut rng, 2, 5);
        let new_nodes: Vec<_> = old_nodes[..4].iter().chain(&joining).cloned().collect();
        let nonce = get_nonce_from(&mut rng);
        let mut reshares = Vec::new();
        for (key, output) in old_keys[..4].iter().zip(&old_outputs) {
            let mut config = reshare(key, &old_nodes, &new_nodes, &nonce);
            config.share = Some(output.key.clone());
            config.threshold = 5;
            config.old_threshold = 4;
            reshares.push(DistKeyGenerator::new(config, &mut rng).unwrap());
        }
        for key in &new_keys {
            let mut config = reshare(key, &old_nodes, &new_nodes, &nonce);
            config.public_coeffs = Some(old_commits.clone());
            config.threshold = 5;
            config.old_threshold = 4;
            let dkg = DistKeyGenerator::new(config, &mut rng).unwrap();
            assert!(!dkg.can_issue());
            reshares.push(dkg);
        }

        let deals = deals(&mut reshares, &mut rng);
        assert_eq!(deals.len(), 4);
        for bundle in &deals {
            assert_eq!(bundle.public.len(), 5);
            verify_packet_signature(reshares[5].config(), bundle).unwrap();
        }

        // Everyone complains about the missing dealer
        let responses = responses(&mut reshares, &deals);
        assert_eq!(responses.len(), 6);
        let (outputs, justifications) = justifications(&mut reshares, &responses);
        assert!(outputs.iter().all(Option::is_none));
        assert!(justifications.is_empty());
        for dkg in &reshares {
            assert!(dkg.evicted().contains(&5));
        }

        let outputs = finish(&mut reshares, outputs, &justifications);
        assert_eq!(outputs.len(), 6);
        assert_eq!(outputs[0].qual, new_nodes);
        assert_eq!(outputs[0].key.public(), old_outputs[0].key.public());
        check_outputs(&outputs, 5);

        // Any 5 new shares recover the old secret
        let shares: Vec<_> = outputs[1..]
            .iter()
            .map(|output| output.key.share().clone())
            .collect();
        let secret = recover_secret::<Ed25519>(&shares, 5).unwrap();
        assert_eq!(
            &<Ed25519 as Group>::Point::mul_base(&secret),
            old_outputs[0].key.public()
        );
    }

    #[test_traced]
    fn test_resharing_leaving_node() {
        let mut rng = StdRng::seed_from_u64(0);
        let (old_keys, old_nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &old_keys, &old_nodes, 3, false);
        let old_outputs = run(&mut dkgs, &mut rng);

        // Node 5 leaves and node 6 joins
        let (new_keys, joining) = committee::<Ed25519>(&mut rng, 1, 5);
        let new_nodes: Vec<_> = old_nodes[..4].iter().chain(&joining).cloned().collect();
        let nonce = get_nonce_from(&mut rng);
        let mut reshares = Vec::new();
        for (key, output) in old_keys.iter().zip(&old_outputs) {
            let mut config = reshare(key, &old_nodes, &new_nodes, &nonce);
            config.share = Some(output.key.clone());
            config.old_threshold = 3;
            reshares.push(DistKeyGenerator::new(config, &mut rng).unwrap());
        }
        let mut config = reshare(&new_keys[0], &old_nodes, &new_nodes, &nonce);
        config.public_coeffs = Some(old_outputs[0].key.commits().to_vec());
        config.old_threshold = 3;
        reshares.push(DistKeyGenerator::new(config, &mut rng).unwrap());

        let leaving = &reshares[4];
        assert!(leaving.can_issue());
        assert!(!leaving.can_receive());
        assert_eq!(leaving.new_index(), None);

        let deals = deals(&mut reshares, &mut rng);
        assert_eq!(deals.len(), 5);
        let responses = responses(&mut reshares, &deals);
        assert!(responses.is_empty());
        assert_eq!(reshares[4].phase(), Phase::Deal);

        // The leaving node stops once nobody complained
        let (outputs, justifications) = justifications(&mut reshares, &responses);
        assert!(justifications.is_empty());
        assert!(outputs[4].is_none());
        assert_eq!(reshares[4].phase(), Phase::Finish);
        assert!(reshares[4].process_justifications(&[]).unwrap().is_none());

        let outputs: Vec<_> = outputs.into_iter().flatten().collect();
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[0].qual, new_nodes);
        assert_eq!(outputs[0].key.public(), old_outputs[0].key.public());
        check_outputs(&outputs, minimum_t(5));
    }

    #[test_traced]
    fn test_resharing_fast_sync_offline_holder() {
        let mut rng = StdRng::seed_from_u64(0);
        let (old_keys, old_nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &old_keys, &old_nodes, 4, true);
        let old_outputs = run(&mut dkgs, &mut rng);
        assert_eq!(old_outputs.len(), 5);

        // Node 5 leaves, nodes 6 and 7 join but node 7 is offline
        let (new_keys, joining) = committee::<Ed25519>(&mut rng, 2, 5);
        let new_nodes: Vec<_> = old_nodes[..4].iter().chain(&joining).cloned().collect();
        let nonce = get_nonce_from(&mut rng);
        let mut reshares = Vec::new();
        for (key, output) in old_keys.iter().zip(&old_outputs) {
            let mut config = reshare(key, &old_nodes, &new_nodes, &nonce);
            config.share = Some(output.key.clone());
            config.threshold = 5;
            config.old_threshold = 4;
            config.fast_sync = true;
            reshares.push(DistKeyGenerator::new(config, &mut rng).unwrap());
        }
        let mut config = reshare(&new_keys[0], &old_nodes, &new_nodes, &nonce);
        config.public_coeffs = Some(old_outputs[0].key.commits().to_vec());
        config.threshold = 5;
        config.old_threshold = 4;
        config.fast_sync = true;
        reshares.push(DistKeyGenerator::new(config, &mut rng).unwrap());

        let deals = deals(&mut reshares, &mut rng);
        assert_eq!(deals.len(), 5);
        let responses = responses(&mut reshares, &deals);
        assert_eq!(responses.len(), 5);

        // The staying dealers reveal the share of the silent node, the leaving one is done
        let (outputs, justifications) = justifications(&mut reshares, &responses);
        assert!(outputs.iter().all(Option::is_none));
        let dealers: Vec<_> = justifications.iter().map(|b| b.dealer_index).collect();
        assert_eq!(dealers, vec![1, 2, 3, 4]);
        for bundle in &justifications {
            assert_eq!(bundle.justifications.len(), 1);
            assert_eq!(bundle.justifications[0].share_index, 7);
        }
        assert_eq!(reshares[4].phase(), Phase::Finish);

        // Dealer 5 never justified its row, the other 4 meet the old threshold
        let outputs = finish(&mut reshares, outputs, &justifications);
        assert_eq!(outputs.len(), 5);
        for dkg in &reshares[..4] {
            assert!(!dkg.statuses().all_true(5));
            assert!(!dkg.evicted().contains(&5));
        }
        assert_eq!(outputs[0].qual, new_nodes);
        assert_eq!(outputs[0].key.public(), old_outputs[0].key.public());
        check_outputs(&outputs, 5);
    }

    #[test_traced]
    fn test_resharing_not_enough_qual() {
        let mut rng = StdRng::seed_from_u64(0);
        let (old_keys, old_nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &old_keys, &old_nodes, 4, false);
        let old_outputs = run(&mut dkgs, &mut rng);

        // Nodes 1 to 4 stay and nodes 6 and 7 join, for a new threshold of 5
        let (new_keys, joining) = committee::<Ed25519>(&mut rng, 2, 5);
        let new_nodes: Vec<_> = old_nodes[..4].iter().chain(&joining).cloned().collect();
        let nonce = get_nonce_from(&mut rng);
        let mut reshares = Vec::new();
        for (key, output) in old_keys.iter().zip(&old_outputs) {
            let mut config = reshare(key, &old_nodes, &new_nodes, &nonce);
            config.share = Some(output.key.clone());
            config.threshold = 5;
            config.old_threshold = 4;
            reshares.push(DistKeyGenerator::new(config, &mut rng).unwrap());
        }
        let deals = deals(&mut reshares, &mut rng);
        let responses = responses(&mut reshares, &deals);
        assert!(responses.is_empty());

        // Both joining nodes answer with successes outside of fast sync and are dropped as
        // holders, leaving only 4 qualified nodes
        let session_id: Nonce = nonce.as_slice().try_into().unwrap();
        let responses: Vec<_> = [6, 7]
            .into_iter()
            .map(|share_index| ResponseBundle {
                share_index,
                responses: vec![Response {
                    dealer_index: 1,
                    status: Status::Success,
                }],
                session_id,
                signature: Vec::new(),
            })
            .collect();
        for dkg in reshares[..4].iter_mut() {
            assert_eq!(
                dkg.process_responses(&responses).err(),
                Some(Error::NotEnoughQual { got: 4, need: 5 })
            );
            assert_eq!(dkg.evicted_holders().len(), 2);
            assert_eq!(dkg.phase(), Phase::Finish);
        }
    }

    #[test_traced]
    fn test_resharing_wrong_secret() {
        let mut rng = StdRng::seed_from_u64(0);
        let (keys, nodes) = committee::<Ed25519>(&mut rng, 5, 0);
        let mut dkgs = fresh(&mut rng, &keys, &nodes, 4, false);
        let old_outputs = run(&mut dkgs, &mut rng);

        // Same committee and thresholds, but node 2 deals a fresh secret instead of its share
        let nonce = get_nonce_from(&mut rng);
        let mut reshares = Vec::new();
        for (key, output) in keys.iter().zip(&old_outputs) {
            let mut config = reshare(key, &nodes, &nodes, &nonce);
            let mut share = output.key.clone();
            if output.key.share().index == 2 {
                let forged = Eval {
                    index: 2,
                    value: <Ed25519 as Group>::Scalar::random(&mut rng),
                };
                share = DistKeyShare::new(output.key.commits().to_vec(), forged).unwrap();
            }
            config.share = Some(share);
            config.threshold = 4;
            config.old_threshold = 4;
            reshares.push(DistKeyGenerator::new(config, &mut rng).unwrap());
        }

        // Every other holder rejects node 2's deal, which is enough to evict it
        let deals = deals(&mut reshares, &mut rng);
        let responses = responses(&mut reshares, &deals);
        assert_eq!(responses.len(), 4);
        for bundle in &responses {
            assert_eq!(
                bundle.responses,
                vec![Response {
                    dealer_index: 2,
                    status: Status::Complaint
                }]
            );
        }
        let (outputs, justifications) = justifications(&mut reshares, &responses);
        assert!(justifications.is_empty());
        for dkg in &reshares {
            assert!(dkg.evicted().contains(&2));
        }

        // The key is reshared from the 4 honest dealers only
        let outputs = finish(&mut reshares, outputs, &justifications);
        assert_eq!(outputs.len(), 5);
        for dkg in &reshares {
            assert!(!dkg.statuses().all_true(2));
        }
        assert_eq!(outputs[0].qual, nodes);
        assert_eq!(outputs[0].key.public(), old_outputs[0].key.public());
        check_outputs(&outputs, 4);
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::Init < Phase::Deal);
        assert!(Phase::Justification < Phase::Finish);
        assert_eq!(Phase::Justification.to_string(), "justification");
        assert_eq!(
            Error::WrongPhase {
                have: Phase::Init,
                want: Phase::Deal
            }
            .to_string(),
            "wrong phase: init (expected deal)"
        );
    }
}
