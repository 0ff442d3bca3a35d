//! The per-node state machine of a DKG or resharing run.

use super::{
    config::{contains_index, find_public, minimum_t, Config, Node, Nonce, NONCE_LENGTH},
    status::{Status, StatusMatrix},
    types::{
        Deal, DealBundle, DistKeyShare, Justification, JustificationBundle, Output, Packet,
        Response, ResponseBundle,
    },
    Error, Phase,
};
use crate::{
    primitives::{
        ecies,
        group::{Element, Group, Point, Scalar},
        poly::{recover_commit, recover_secret, Eval, PriPoly, PubPoly},
    },
    sign::Scheme,
};
use rand::{rngs::StdRng, SeedableRng};
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};
use zeroize::Zeroize;

/// Runs one node's side of a DKG or resharing.
///
/// The four phase methods must be called in order: [DistKeyGenerator::deals] (dealers only),
/// [DistKeyGenerator::process_deals], [DistKeyGenerator::process_responses] and
/// [DistKeyGenerator::process_justifications]. Bundles are expected to have been authenticated
/// with [super::verify_packet_signature] before they are handed over.
///
/// Any error returned by a phase method moves the generator to [Phase::Finish], after which every
/// phase method fails with [Error::WrongPhase].
pub struct DistKeyGenerator<G: Group, A: Scheme<G>> {
    config: Config<G, A>,
    phase: Phase,
    nonce: Nonce,

    can_issue: bool,
    can_receive: bool,
    is_resharing: bool,
    old_index: Option<u32>,
    new_index: Option<u32>,
    threshold: u32,
    old_threshold: u32,

    dpriv: Option<PriPoly<G>>,
    dpub: Option<PubPoly<G>>,
    old_public: Option<PubPoly<G>>,

    statuses: StatusMatrix,
    valid_shares: BTreeMap<u32, G::Scalar>,
    all_publics: BTreeMap<u32, PubPoly<G>>,
    evicted: BTreeSet<u32>,
    evicted_holders: BTreeSet<u32>,
}

impl<G: Group, A: Scheme<G>> DistKeyGenerator<G, A> {
    /// Validates `config` and prepares this node's dealing polynomial (if it deals).
    pub fn new<R: CryptoRngCore + ?Sized>(
        mut config: Config<G, A>,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if config.old_nodes.is_empty() && config.new_nodes.is_empty() {
            return Err(Error::InvalidConfig {
                reason: "empty committees",
            });
        }
        let nonce: Nonce = config
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidConfig {
                reason: "nonce must be 32 bytes",
            })?;
        check_indices(&config.old_nodes)?;
        check_indices(&config.new_nodes)?;

        let is_resharing = config.is_resharing();
        if is_resharing {
            if config.old_nodes.is_empty() {
                return Err(Error::InvalidConfig {
                    reason: "resharing requires old nodes",
                });
            }
            if config.old_threshold == 0 {
                return Err(Error::InvalidConfig {
                    reason: "resharing requires the old threshold",
                });
            }
            if config.old_threshold as usize > config.old_nodes.len() {
                return Err(Error::InvalidConfig {
                    reason: "old threshold exceeds old nodes",
                });
            }
            let old_commits = config
                .public_coeffs
                .as_ref()
                .map(Vec::len)
                .or_else(|| config.share.as_ref().map(|share| share.commits().len()));
            if old_commits != Some(config.old_threshold as usize) {
                return Err(Error::InvalidConfig {
                    reason: "old public polynomial does not match the old threshold",
                });
            }
        }

        // Locate ourselves
        let public = G::Point::mul_base(&config.longterm);
        let mut old_index = find_public(&config.old_nodes, &public);
        let new_index = find_public(&config.new_nodes, &public);
        if old_index.is_none() && new_index.is_none() {
            return Err(Error::NotInCommittee);
        }

        let threshold = match config.threshold {
            0 => minimum_t(config.new_nodes.len()),
            t => t,
        };
        if threshold < 2 || threshold as usize > config.new_nodes.len() {
            return Err(Error::InvalidConfig {
                reason: "threshold must be between 2 and the number of new nodes",
            });
        }

        // Pick the constant term of our dealing polynomial
        let mut can_issue = false;
        let secret = if !is_resharing {
            if new_index.is_none() {
                return Err(Error::NotInCommittee);
            }

            // Every share holder of a fresh DKG also deals
            config.old_nodes = config.new_nodes.clone();
            old_index = new_index;
            can_issue = true;
            Some(pick_secret(&config, rng))
        } else if let Some(share) = &config.share {
            if old_index.is_none() {
                return Err(Error::InvalidConfig {
                    reason: "share given but not an old node",
                });
            }
            can_issue = true;
            Some(share.share().value.clone())
        } else {
            None
        };
        let (dpriv, dpub) = match secret {
            Some(secret) => {
                let dpriv = PriPoly::<G>::new(threshold, Some(secret), rng)?;
                let dpub = dpriv.commit(None);
                (Some(dpriv), Some(dpub))
            }
            None => (None, None),
        };

        // New members of a resharing check deals against the previous polynomial
        let can_receive = new_index.is_some();
        let mut old_public = None;
        let mut old_threshold = 0;
        if is_resharing && can_receive {
            let commits = match (&config.public_coeffs, &config.share) {
                (Some(commits), _) => commits.clone(),
                (None, Some(share)) => share.commits().to_vec(),
                (None, None) => {
                    return Err(Error::InvalidConfig {
                        reason: "resharing requires the old public polynomial",
                    })
                }
            };
            old_threshold = commits.len() as u32;
            old_public = Some(PubPoly::new(None, commits)?);
        }

        // In fast sync every share is bad until proven good; otherwise only ours are
        let dealers = config.old_nodes.iter().map(|node| node.index);
        let holders = config.new_nodes.iter().map(|node| node.index);
        let statuses = match (config.fast_sync, new_index) {
            (true, _) => StatusMatrix::new(dealers, holders, Status::Complaint),
            (false, None) => StatusMatrix::new(dealers, holders, Status::Success),
            (false, Some(me)) => {
                let mut statuses = StatusMatrix::new(dealers, holders, Status::Success);
                for node in &config.old_nodes {
                    statuses.set(node.index, me, Status::Complaint);
                }
                statuses
            }
        };

        debug!(
            group = G::NAME,
            ?old_index,
            ?new_index,
            threshold,
            old_threshold,
            is_resharing,
            fast_sync = config.fast_sync,
            "created dkg"
        );
        Ok(Self {
            config,
            phase: Phase::Init,
            nonce,
            can_issue,
            can_receive,
            is_resharing,
            old_index,
            new_index,
            threshold,
            old_threshold,
            dpriv,
            dpub,
            old_public,
            statuses,
            valid_shares: BTreeMap::new(),
            all_publics: BTreeMap::new(),
            evicted: BTreeSet::new(),
            evicted_holders: BTreeSet::new(),
        })
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the (validated) configuration. In a fresh DKG the old nodes are the new nodes.
    pub fn config(&self) -> &Config<G, A> {
        &self.config
    }

    /// Returns the dealers evicted so far.
    pub fn evicted(&self) -> &BTreeSet<u32> {
        &self.evicted
    }

    /// Returns the share holders evicted so far.
    pub fn evicted_holders(&self) -> &BTreeSet<u32> {
        &self.evicted_holders
    }

    /// Returns true if this node deals.
    pub fn can_issue(&self) -> bool {
        self.can_issue
    }

    /// Returns true if this node receives a share.
    pub fn can_receive(&self) -> bool {
        self.can_receive
    }

    /// Returns this node's index among the dealers.
    pub fn old_index(&self) -> Option<u32> {
        self.old_index
    }

    /// Returns this node's index among the share holders.
    pub fn new_index(&self) -> Option<u32> {
        self.new_index
    }

    /// Returns the threshold of the new committee.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns the number of response bundles to expect in fast sync mode.
    pub fn expected_responses_fast_sync(&self) -> usize {
        self.config.new_nodes.len()
    }

    /// Returns the status matrix.
    pub fn statuses(&self) -> &StatusMatrix {
        &self.statuses
    }

    /// Returns the deals of this node, one encrypted share per share holder.
    pub fn deals<R: CryptoRngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<DealBundle<G>, Error> {
        let result = self.deals_inner(rng);
        self.abort_on_error(result)
    }

    fn deals_inner<R: CryptoRngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<DealBundle<G>, Error> {
        if !self.can_issue {
            return Err(Error::NotInCommittee);
        }
        self.expect_phase(Phase::Init)?;
        let (Some(dpriv), Some(dpub), Some(me)) = (&self.dpriv, &self.dpub, self.old_index) else {
            return Err(Error::Internal("dealer without a dealing polynomial"));
        };

        let mut deals = Vec::with_capacity(self.config.new_nodes.len());
        for node in &self.config.new_nodes {
            let share = dpriv.eval(node.index).value;

            // Keep our own share
            if self.can_receive && Some(node.index) == self.new_index {
                self.valid_shares.insert(me, share);
                self.all_publics.insert(me, dpub.clone());
                self.statuses.set(me, node.index, Status::Success);
                continue;
            }

            let mut plaintext = share.to_bytes();
            let encrypted_share = ecies::encrypt::<G, _>(rng, &node.public, &plaintext);
            plaintext.zeroize();
            deals.push(Deal {
                share_index: node.index,
                encrypted_share: encrypted_share?,
            });
        }

        let mut bundle = DealBundle {
            dealer_index: me,
            deals,
            public: dpub.commits().to_vec(),
            session_id: self.nonce,
            signature: Vec::new(),
        };
        bundle.signature = self.sign(&bundle)?;
        self.phase = Phase::Deal;
        debug!(dealer = me, deals = bundle.deals.len(), "issued deals");
        Ok(bundle)
    }

    /// Processes the deal bundles of every dealer and returns the responses of this node (if it
    /// has any to send).
    ///
    /// Nodes that do not receive a share return `None`.
    pub fn process_deals(
        &mut self,
        bundles: &[DealBundle<G>],
    ) -> Result<Option<ResponseBundle>, Error> {
        let result = self.process_deals_inner(bundles);
        self.abort_on_error(result)
    }

    fn process_deals_inner(
        &mut self,
        bundles: &[DealBundle<G>],
    ) -> Result<Option<ResponseBundle>, Error> {
        if !self.can_receive {
            return Ok(None);
        }
        if self.can_issue {
            self.expect_phase(Phase::Deal)?;
        } else {
            self.expect_phase(Phase::Init)?;
        }
        let me = self.receiver_index()?;

        let mut seen = BTreeSet::new();
        for bundle in bundles {
            let dealer = bundle.dealer_index;
            if self.can_issue && Some(dealer) == self.old_index {
                continue;
            }
            if !contains_index(&self.config.old_nodes, dealer) {
                trace!(dealer, "ignoring deals from unknown dealer");
                continue;
            }
            if bundle.session_id != self.nonce {
                self.evict(dealer, "invalid session id");
                continue;
            }
            if bundle.public.len() != self.threshold as usize {
                self.evict(dealer, "invalid public polynomial");
                continue;
            }
            let Ok(public) = PubPoly::<G>::new(None, bundle.public.clone()) else {
                self.evict(dealer, "invalid public polynomial");
                continue;
            };
            if !seen.insert(dealer) {
                self.evict(dealer, "duplicate deal bundle");
                continue;
            }
            self.all_publics.insert(dealer, public.clone());

            for deal in &bundle.deals {
                if !contains_index(&self.config.new_nodes, deal.share_index) {
                    self.evict(dealer, "deal for unknown share holder");
                    break;
                }
                if deal.share_index != me {
                    continue;
                }

                // Local failures are left for the response phase to complain about
                let decrypted = ecies::decrypt::<G>(&self.config.longterm, &deal.encrypted_share);
                let Ok(mut plaintext) = decrypted else {
                    trace!(dealer, "failed to decrypt deal");
                    continue;
                };
                let share = G::Scalar::from_bytes(&plaintext);
                plaintext.zeroize();
                let Ok(share) = share else {
                    trace!(dealer, "failed to decode deal");
                    continue;
                };
                if G::Point::mul_base(&share) != public.eval(me).value {
                    trace!(dealer, "deal does not match commitment");
                    continue;
                }
                if !self.consistent_with_previous(dealer, &public) {
                    trace!(dealer, "deal does not match previous share");
                    continue;
                }
                self.statuses.set(dealer, me, Status::Success);
                self.valid_shares.insert(dealer, share);
            }
        }

        // Nodes that are both dealer and holder trust their own share
        for dealer in &self.config.old_nodes {
            if let Some(holder) = find_public(&self.config.new_nodes, &dealer.public) {
                self.statuses.set(dealer.index, holder, Status::Success);
            }
        }

        // Complain about every missing or invalid share
        let column = self.statuses.statuses_for_share(me);
        let mut responses = Vec::new();
        for node in &self.config.old_nodes {
            if self.evicted.contains(&node.index) {
                continue;
            }
            match column.get(&node.index) {
                Some(Status::Success) if self.config.fast_sync => responses.push(Response {
                    dealer_index: node.index,
                    status: Status::Success,
                }),
                Some(Status::Complaint) => responses.push(Response {
                    dealer_index: node.index,
                    status: Status::Complaint,
                }),
                _ => {}
            }
        }
        self.phase = Phase::Response;
        debug!(
            holder = me,
            deals = bundles.len(),
            responses = responses.len(),
            evicted = self.evicted.len(),
            "processed deals"
        );
        if responses.is_empty() {
            return Ok(None);
        }

        let mut bundle = ResponseBundle {
            share_index: me,
            responses,
            session_id: self.nonce,
            signature: Vec::new(),
        };
        bundle.signature = self.sign(&bundle)?;
        Ok(Some(bundle))
    }

    /// Processes the response bundles of every share holder.
    ///
    /// Returns the output if the run completed without complaints, and the justifications of this
    /// node if it must answer complaints. If both are `None`, the caller should move on to
    /// [DistKeyGenerator::process_justifications] (or stop, for a node leaving the committee).
    #[allow(clippy::type_complexity)]
    pub fn process_responses(
        &mut self,
        bundles: &[ResponseBundle],
    ) -> Result<(Option<Output<G>>, Option<JustificationBundle<G>>), Error> {
        let result = self.process_responses_inner(bundles);
        self.abort_on_error(result)
    }

    #[allow(clippy::type_complexity)]
    fn process_responses_inner(
        &mut self,
        bundles: &[ResponseBundle],
    ) -> Result<(Option<Output<G>>, Option<JustificationBundle<G>>), Error> {
        // A leaving node may skip processing deals entirely
        if !self.can_receive && self.phase == Phase::Deal {
            self.phase = Phase::Response;
        }
        self.expect_phase(Phase::Response)?;

        let mut found_complaint = false;
        for bundle in bundles {
            let holder = bundle.share_index;
            if Some(holder) == self.new_index {
                continue;
            }
            if !contains_index(&self.config.new_nodes, holder) {
                trace!(holder, "ignoring responses from unknown holder");
                continue;
            }
            if bundle.session_id != self.nonce {
                trace!(holder, "ignoring responses with invalid session id");
                continue;
            }
            for response in &bundle.responses {
                if !contains_index(&self.config.old_nodes, response.dealer_index) {
                    self.evict_holder(holder, "response for unknown dealer");
                    continue;
                }
                if !self.config.fast_sync && response.status == Status::Success {
                    self.evict_holder(holder, "unexpected success response");
                    continue;
                }
                self.statuses
                    .set(response.dealer_index, holder, response.status);
                if response.status == Status::Complaint {
                    found_complaint = true;
                }
            }
        }

        if !found_complaint {
            if !self.can_receive {
                debug!("no complaints, leaving");
                self.phase = Phase::Finish;
                return Ok((None, None));
            }
            if self.statuses.complete_success() {
                return Ok((Some(self.compute_result()?), None));
            }
        }

        // Complaints (or fast sync responses that never came) must be justified. A dealer with a
        // threshold of complaints has revealed its polynomial and only remains a share holder.
        let mut exposed = Vec::new();
        for node in &self.config.old_nodes {
            if self.statuses.length_complaints(node.index) >= self.threshold as usize {
                exposed.push(node.index);
            }
        }
        for dealer in exposed {
            self.evict(dealer, "too many complaints");
        }
        self.phase = Phase::Justification;
        if !self.can_issue {
            return Ok((None, None));
        }

        let (Some(dpriv), Some(me)) = (&self.dpriv, self.old_index) else {
            return Err(Error::Internal("dealer without a dealing polynomial"));
        };
        if self.evicted.contains(&me) {
            warn!(dealer = me, "evicted, not justifying");
            return Ok((None, None));
        }
        let mut justifications = Vec::new();
        for (holder, status) in self.statuses.statuses_of_dealer(me) {
            if status != Status::Complaint {
                continue;
            }
            justifications.push(Justification {
                share_index: holder,
                share: dpriv.eval(holder).value,
            });
            self.statuses.set(me, holder, Status::Success);
        }
        debug!(
            dealer = me,
            justifications = justifications.len(),
            "processed responses"
        );
        if justifications.is_empty() {
            return Ok((None, None));
        }

        let mut bundle = JustificationBundle {
            dealer_index: me,
            justifications,
            session_id: self.nonce,
            signature: Vec::new(),
        };
        bundle.signature = self.sign(&bundle)?;
        Ok((None, Some(bundle)))
    }

    /// Processes the justification bundles of every dealer and returns the output of the run.
    ///
    /// Nodes that do not receive a share return `None`.
    pub fn process_justifications(
        &mut self,
        bundles: &[JustificationBundle<G>],
    ) -> Result<Option<Output<G>>, Error> {
        let result = self.process_justifications_inner(bundles);
        self.abort_on_error(result)
    }

    fn process_justifications_inner(
        &mut self,
        bundles: &[JustificationBundle<G>],
    ) -> Result<Option<Output<G>>, Error> {
        if !self.can_receive {
            return Ok(None);
        }
        self.expect_phase(Phase::Justification)?;
        let me = self.receiver_index()?;

        let mut seen = BTreeSet::new();
        for bundle in bundles {
            let dealer = bundle.dealer_index;
            if seen.contains(&dealer) {
                self.evict(dealer, "duplicate justification bundle");
                continue;
            }
            if self.can_issue && Some(dealer) == self.old_index {
                continue;
            }
            if !contains_index(&self.config.old_nodes, dealer) {
                trace!(dealer, "ignoring justifications from unknown dealer");
                continue;
            }
            if self.evicted.contains(&dealer) {
                continue;
            }
            if bundle.session_id != self.nonce {
                self.evict(dealer, "invalid session id");
                continue;
            }
            seen.insert(dealer);

            for justification in &bundle.justifications {
                let holder = justification.share_index;
                if !contains_index(&self.config.new_nodes, holder) {
                    self.evict(dealer, "justification for unknown share holder");
                    continue;
                }
                let Some(public) = self.all_publics.get(&dealer).cloned() else {
                    self.evict(dealer, "justification without public polynomial");
                    break;
                };
                if G::Point::mul_base(&justification.share) != public.eval(holder).value {
                    self.evict(dealer, "invalid justification");
                    continue;
                }
                if !self.consistent_with_previous(dealer, &public) {
                    self.evict(dealer, "justification does not match previous share");
                    continue;
                }
                self.statuses.set(dealer, holder, Status::Success);
                if holder == me {
                    self.valid_shares
                        .insert(dealer, justification.share.clone());
                }
            }
        }

        // Enough dealers must have been fully justified
        let good = self
            .config
            .old_nodes
            .iter()
            .filter(|node| !self.evicted.contains(&node.index))
            .filter(|node| self.statuses.all_true(node.index))
            .count();
        let need = match self.is_resharing {
            true => self.old_threshold as usize,
            false => self.threshold as usize,
        };
        if good < need {
            return Err(Error::InsufficientDeals { got: good, need });
        }
        Ok(Some(self.compute_result()?))
    }

    fn compute_result(&mut self) -> Result<Output<G>, Error> {
        self.phase = Phase::Finish;
        for dealer in &self.evicted {
            if contains_index(&self.config.old_nodes, *dealer) {
                self.statuses.set_all(*dealer, Status::Complaint);
            }
        }
        let output = if self.is_resharing {
            self.compute_resharing_result()?
        } else {
            self.compute_dkg_result()?
        };
        debug!(
            index = output.key.share().index,
            qual = output.qual.len(),
            evicted = self.evicted.len(),
            "computed result"
        );
        Ok(output)
    }

    fn compute_dkg_result(&self) -> Result<Output<G>, Error> {
        let me = self.receiver_index()?;
        let mut share = G::scalar();
        let mut public: Option<PubPoly<G>> = None;
        let mut qual = Vec::new();
        for node in &self.config.old_nodes {
            if !self.statuses.all_true(node.index) {
                continue;
            }

            // Dealers are also holders, so a misbehaving holder is dropped as a dealer
            if self.evicted_holders.contains(&node.index) {
                continue;
            }
            let dealt = self
                .valid_shares
                .get(&node.index)
                .ok_or(Error::Internal("missing share of a qualified dealer"))?;
            let poly = self
                .all_publics
                .get(&node.index)
                .ok_or(Error::Internal("missing polynomial of a qualified dealer"))?;
            share.add(dealt);
            public = Some(match public {
                None => poly.clone(),
                Some(sum) => sum.add(poly)?,
            });
            qual.push(node.clone());
        }
        let public = public.ok_or(Error::Internal("no qualified dealer"))?;
        let key = DistKeyShare::new(
            public.commits().to_vec(),
            Eval {
                index: me,
                value: share,
            },
        )?;
        Ok(Output { qual, key })
    }

    fn compute_resharing_result(&self) -> Result<Output<G>, Error> {
        let me = self.receiver_index()?;

        // Only dealers with a fully justified row contribute
        let mut shares = Vec::new();
        let mut polys = Vec::new();
        for node in &self.config.old_nodes {
            if !self.statuses.all_true(node.index) {
                continue;
            }
            let dealt = self
                .valid_shares
                .get(&node.index)
                .ok_or(Error::Internal("missing share of a qualified dealer"))?;
            let poly = self
                .all_publics
                .get(&node.index)
                .ok_or(Error::Internal("missing polynomial of a qualified dealer"))?;
            shares.push(Eval {
                index: node.index,
                value: dealt.clone(),
            });
            polys.push((node.index, poly));
        }

        // The new polynomial is the Lagrange combination of the dealers' polynomials (whose
        // constant terms are the old shares)
        let secret = recover_secret::<G>(&shares, self.old_threshold);
        shares.iter_mut().for_each(|share| share.value.zeroize());
        let share = Eval {
            index: me,
            value: secret?,
        };
        let mut commits = Vec::with_capacity(self.threshold as usize);
        for position in 0..self.threshold as usize {
            let mut evals = Vec::with_capacity(polys.len());
            for (dealer, poly) in &polys {
                let commit = poly
                    .commits()
                    .get(position)
                    .ok_or(Error::Internal("public polynomial too short"))?;
                evals.push(Eval {
                    index: *dealer,
                    value: commit.clone(),
                });
            }
            commits.push(recover_commit::<G>(&evals, self.old_threshold)?);
        }
        let key = DistKeyShare::new(commits, share)?;
        if !key.poly().check(key.share()) {
            return Err(Error::ShareMismatch);
        }

        // Holders that got a valid share from every contributing dealer
        let qual: Vec<_> = self
            .config
            .new_nodes
            .iter()
            .filter(|node| !self.evicted_holders.contains(&node.index))
            .filter(|node| {
                polys.iter().all(|(dealer, _)| {
                    self.statuses.get(*dealer, node.index) == Some(Status::Success)
                })
            })
            .cloned()
            .collect();
        if qual.len() < self.threshold as usize {
            return Err(Error::NotEnoughQual {
                got: qual.len(),
                need: self.threshold as usize,
            });
        }
        Ok(Output { qual, key })
    }

    /// In a resharing, checks that a dealer's new polynomial shares its old share.
    fn consistent_with_previous(&self, dealer: u32, public: &PubPoly<G>) -> bool {
        if !self.is_resharing {
            return true;
        }
        match &self.old_public {
            Some(old_public) => &old_public.eval(dealer).value == public.commit(),
            None => false,
        }
    }

    fn expect_phase(&self, want: Phase) -> Result<(), Error> {
        if self.phase != want {
            return Err(Error::WrongPhase {
                have: self.phase,
                want,
            });
        }
        Ok(())
    }

    fn receiver_index(&self) -> Result<u32, Error> {
        self.new_index
            .ok_or(Error::Internal("receiving node without a share index"))
    }

    fn evict(&mut self, dealer: u32, reason: &'static str) {
        if self.evicted.insert(dealer) {
            warn!(dealer, reason, "evicted dealer");
        }
    }

    fn evict_holder(&mut self, holder: u32, reason: &'static str) {
        if self.evicted_holders.insert(holder) {
            warn!(holder, reason, "evicted share holder");
        }
    }

    fn sign<P: Packet>(&self, packet: &P) -> Result<Vec<u8>, Error> {
        Ok(self.config.auth.sign(&self.config.longterm, &packet.hash())?)
    }

    fn abort_on_error<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(err) = &result {
            debug_assert!(!matches!(err, Error::Internal(_)), "{err}");
            warn!(?err, phase = %self.phase, "dkg aborted");
            self.phase = Phase::Finish;
        }
        result
    }
}

impl<G: Group, A: Scheme<G>> Drop for DistKeyGenerator<G, A> {
    fn drop(&mut self) {
        self.valid_shares
            .values_mut()
            .for_each(|share| share.zeroize());
        self.config.longterm.zeroize();
    }
}

/// Node indices must be unique and non-zero (share `0` is the secret).
fn check_indices<G: Group>(nodes: &[Node<G>]) -> Result<(), Error> {
    let mut seen = BTreeSet::new();
    for node in nodes {
        if node.index == 0 {
            return Err(Error::InvalidConfig {
                reason: "node index 0 is reserved",
            });
        }
        if !seen.insert(node.index) {
            return Err(Error::InvalidConfig {
                reason: "duplicate node index",
            });
        }
    }
    Ok(())
}

/// Picks the secret coefficient of a fresh DKG, mixing in user entropy if configured.
fn pick_secret<G: Group, A: Scheme<G>, R: CryptoRngCore + ?Sized>(
    config: &Config<G, A>,
    rng: &mut R,
) -> G::Scalar {
    let Some(entropy) = &config.entropy else {
        return G::Scalar::random(rng);
    };
    let mut hasher = Sha256::new();
    hasher.update(entropy);
    if !config.entropy_only {
        let mut extra = [0u8; NONCE_LENGTH];
        rng.fill_bytes(&mut extra);
        hasher.update(extra);
        extra.zeroize();
    }
    let mut seeded = StdRng::from_seed(hasher.finalize().into());
    G::Scalar::random(&mut seeded)
}
