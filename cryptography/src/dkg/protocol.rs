//! Drive a [DistKeyGenerator] over a broadcast board.
//!
//! The [Protocol] pushes this node's bundles to a [Board], authenticates incoming bundles from an
//! [Inbox] and advances phases when its phaser (any [Stream] of [Phase]) ticks. In fast sync
//! mode, it also advances as soon as every expected bundle of the current phase has arrived.

use super::{
    generator::DistKeyGenerator,
    types::{
        verify_packet_signature, DealBundle, JustificationBundle, Output, Packet, ResponseBundle,
    },
    Config, Error, Phase,
};
use crate::{primitives::group::Group, sign::Scheme};
use commonware_macros::select;
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    stream, Stream, StreamExt,
};
use rand_core::CryptoRngCore;
use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
};
use tracing::{debug, trace, warn};

/// Outbound side of a broadcast channel shared by all participants.
///
/// Bundles pushed to the board must reach every participant, including the sender.
pub trait Board<G: Group> {
    fn push_deals(&mut self, bundle: DealBundle<G>);
    fn push_responses(&mut self, bundle: ResponseBundle);
    fn push_justifications(&mut self, bundle: JustificationBundle<G>);
}

/// Inbound bundles of a participant.
pub struct Inbox<G: Group> {
    pub deals: UnboundedReceiver<DealBundle<G>>,
    pub responses: UnboundedReceiver<ResponseBundle>,
    pub justifications: UnboundedReceiver<JustificationBundle<G>>,
}

/// Delivers bundles to an [Inbox].
#[derive(Clone)]
pub struct Mailbox<G: Group> {
    deals: UnboundedSender<DealBundle<G>>,
    responses: UnboundedSender<ResponseBundle>,
    justifications: UnboundedSender<JustificationBundle<G>>,
}

impl<G: Group> Mailbox<G> {
    pub fn deliver_deals(&self, bundle: DealBundle<G>) {
        if self.deals.unbounded_send(bundle).is_err() {
            trace!("inbox dropped");
        }
    }

    pub fn deliver_responses(&self, bundle: ResponseBundle) {
        if self.responses.unbounded_send(bundle).is_err() {
            trace!("inbox dropped");
        }
    }

    pub fn deliver_justifications(&self, bundle: JustificationBundle<G>) {
        if self.justifications.unbounded_send(bundle).is_err() {
            trace!("inbox dropped");
        }
    }
}

/// Creates a connected [Mailbox] and [Inbox].
pub fn inbox<G: Group>() -> (Mailbox<G>, Inbox<G>) {
    let (deals_sender, deals) = mpsc::unbounded();
    let (responses_sender, responses) = mpsc::unbounded();
    let (justifications_sender, justifications) = mpsc::unbounded();
    (
        Mailbox {
            deals: deals_sender,
            responses: responses_sender,
            justifications: justifications_sender,
        },
        Inbox {
            deals,
            responses,
            justifications,
        },
    )
}

/// Returns a phaser that yields [Phase::Deal] immediately and every later phase (up to
/// [Phase::Finish]) once `sleep` for the previous phase resolves.
pub fn time_phaser<F, Fut>(sleep: F) -> impl Stream<Item = Phase> + Unpin
where
    F: FnMut(Phase) -> Fut,
    Fut: Future<Output = ()>,
{
    Box::pin(stream::unfold(
        (Some(Phase::Deal), None, sleep),
        |(next, previous, mut sleep)| async move {
            let phase = next?;
            if let Some(previous) = previous {
                sleep(previous).await;
            }
            let following = match phase {
                Phase::Init => Some(Phase::Deal),
                Phase::Deal => Some(Phase::Response),
                Phase::Response => Some(Phase::Justification),
                Phase::Justification => Some(Phase::Finish),
                Phase::Finish => None,
            };
            Some((phase, (following, Some(phase), sleep)))
        },
    ))
}

/// The generator, the board and the randomness of a participant.
struct Participant<G: Group, A: Scheme<G>, B: Board<G>, R: CryptoRngCore> {
    dkg: DistKeyGenerator<G, A>,
    board: B,
    rng: R,
}

impl<G: Group, A: Scheme<G>, B: Board<G>, R: CryptoRngCore> Participant<G, A, B, R> {
    fn deal(&mut self) -> Result<(), Error> {
        if !self.dkg.can_issue() {
            return Ok(());
        }
        let bundle = self.dkg.deals(&mut self.rng)?;
        self.board.push_deals(bundle);
        Ok(())
    }

    fn respond(&mut self, deals: &[DealBundle<G>]) -> Result<(), Error> {
        if let Some(bundle) = self.dkg.process_deals(deals)? {
            self.board.push_responses(bundle);
        }
        Ok(())
    }

    fn justify(&mut self, responses: &[ResponseBundle]) -> Result<Option<Output<G>>, Error> {
        let (output, justifications) = self.dkg.process_responses(responses)?;
        if let Some(bundle) = justifications {
            self.board.push_justifications(bundle);
        }
        Ok(output)
    }

    fn finish(
        &mut self,
        justifications: &[JustificationBundle<G>],
    ) -> Result<Option<Output<G>>, Error> {
        self.dkg.process_justifications(justifications)
    }

    /// Returns true when the generator has nothing left to do.
    fn done(&self) -> bool {
        self.dkg.phase() == Phase::Finish
    }

    fn authentic<P: Packet>(&self, packet: &P) -> bool {
        match verify_packet_signature(self.dkg.config(), packet) {
            Ok(()) => true,
            Err(err) => {
                warn!(index = packet.index(), ?err, "dropping unauthenticated bundle");
                false
            }
        }
    }
}

/// Runs one participant of a DKG or resharing to completion.
pub struct Protocol<G, A, B, P, R>
where
    G: Group,
    A: Scheme<G>,
    B: Board<G>,
    P: Stream<Item = Phase> + Unpin,
    R: CryptoRngCore,
{
    participant: Participant<G, A, B, R>,
    inbox: Inbox<G>,
    phaser: P,
}

impl<G, A, B, P, R> Protocol<G, A, B, P, R>
where
    G: Group,
    A: Scheme<G>,
    B: Board<G>,
    P: Stream<Item = Phase> + Unpin,
    R: CryptoRngCore,
{
    /// Validates `config` and prepares the run.
    pub fn new(
        config: Config<G, A>,
        board: B,
        inbox: Inbox<G>,
        phaser: P,
        mut rng: R,
    ) -> Result<Self, Error> {
        let dkg = DistKeyGenerator::new(config, &mut rng)?;
        Ok(Self {
            participant: Participant { dkg, board, rng },
            inbox,
            phaser,
        })
    }

    /// Returns the underlying generator.
    pub fn generator(&self) -> &DistKeyGenerator<G, A> {
        &self.participant.dkg
    }

    /// Runs the protocol.
    ///
    /// Returns `None` for a node that does not receive a share (a leaving member of a resharing).
    pub async fn run(self) -> Result<Option<Output<G>>, Error> {
        let fast_sync = self.participant.dkg.config().fast_sync;
        let Self {
            participant,
            inbox,
            phaser,
        } = self;
        if fast_sync {
            run_fast(participant, inbox, phaser).await
        } else {
            run_timed(participant, inbox, phaser).await
        }
    }
}

async fn run_timed<G, A, B, P, R>(
    mut participant: Participant<G, A, B, R>,
    mut inbox: Inbox<G>,
    mut phaser: P,
) -> Result<Option<Output<G>>, Error>
where
    G: Group,
    A: Scheme<G>,
    B: Board<G>,
    P: Stream<Item = Phase> + Unpin,
    R: CryptoRngCore,
{
    let mut deals = Vec::new();
    let mut responses = Vec::new();
    let mut justifications = Vec::new();
    loop {
        select! {
            phase = phaser.next() => {
                let Some(phase) = phase else {
                    return Err(Error::BoardClosed);
                };
                debug!(%phase, deals = deals.len(), responses = responses.len(), "phase tick");
                match phase {
                    Phase::Init => {}
                    Phase::Deal => participant.deal()?,
                    Phase::Response => participant.respond(&deals)?,
                    Phase::Justification => {
                        let output = participant.justify(&responses)?;
                        if output.is_some() || participant.done() {
                            return Ok(output);
                        }
                    }
                    Phase::Finish => return participant.finish(&justifications),
                }
            },
            bundle = inbox.deals.next() => {
                let bundle = bundle.ok_or(Error::BoardClosed)?;
                if participant.authentic(&bundle) {
                    deals.push(bundle);
                }
            },
            bundle = inbox.responses.next() => {
                let bundle = bundle.ok_or(Error::BoardClosed)?;
                if participant.authentic(&bundle) {
                    responses.push(bundle);
                }
            },
            bundle = inbox.justifications.next() => {
                let bundle = bundle.ok_or(Error::BoardClosed)?;
                if participant.authentic(&bundle) {
                    justifications.push(bundle);
                }
            },
        }
    }
}

async fn run_fast<G, A, B, P, R>(
    mut participant: Participant<G, A, B, R>,
    mut inbox: Inbox<G>,
    mut phaser: P,
) -> Result<Option<Output<G>>, Error>
where
    G: Group,
    A: Scheme<G>,
    B: Board<G>,
    P: Stream<Item = Phase> + Unpin,
    R: CryptoRngCore,
{
    let dealers = participant.dkg.config().dealers().len();
    let holders = participant.dkg.expected_responses_fast_sync();

    // Bundles are kept per sender so rebroadcasts are not counted twice
    let mut deals: BTreeMap<u32, DealBundle<G>> = BTreeMap::new();
    let mut conflicting = BTreeSet::new();
    let mut responses: BTreeMap<u32, ResponseBundle> = BTreeMap::new();
    let mut justifications: BTreeMap<u32, JustificationBundle<G>> = BTreeMap::new();
    let mut phase = Phase::Init;
    let mut ticked = Phase::Init;
    loop {
        select! {
            tick = phaser.next() => {
                let Some(tick) = tick else {
                    return Err(Error::BoardClosed);
                };
                debug!(phase = %tick, "phase tick");
                ticked = ticked.max(tick);
            },
            bundle = inbox.deals.next() => {
                let bundle = bundle.ok_or(Error::BoardClosed)?;
                let dealer = bundle.dealer_index;
                if conflicting.contains(&dealer) || !participant.authentic(&bundle) {
                    continue;
                }
                match deals.get(&dealer) {
                    Some(previous) if previous.hash() != bundle.hash() => {
                        warn!(dealer, "dropping inconsistent deals");
                        deals.remove(&dealer);
                        conflicting.insert(dealer);
                    }
                    _ => {
                        deals.insert(dealer, bundle);
                    }
                }
            },
            bundle = inbox.responses.next() => {
                let bundle = bundle.ok_or(Error::BoardClosed)?;
                if participant.authentic(&bundle) {
                    responses.insert(bundle.share_index, bundle);
                }
            },
            bundle = inbox.justifications.next() => {
                let bundle = bundle.ok_or(Error::BoardClosed)?;
                if participant.authentic(&bundle) {
                    justifications.insert(bundle.dealer_index, bundle);
                }
            },
        }

        // Catch up with the phaser, and skip ahead once every expected bundle is there
        loop {
            let next = match phase {
                Phase::Init if ticked >= Phase::Deal => Phase::Deal,
                Phase::Deal if ticked >= Phase::Response || deals.len() == dealers => {
                    Phase::Response
                }
                Phase::Response
                    if ticked >= Phase::Justification || responses.len() == holders =>
                {
                    Phase::Justification
                }
                Phase::Justification
                    if ticked >= Phase::Finish || justifications.len() == dealers =>
                {
                    Phase::Finish
                }
                _ => break,
            };
            debug!(from = %phase, to = %next, "advancing");
            phase = next;
            match next {
                Phase::Init => {}
                Phase::Deal => participant.deal()?,
                Phase::Response => {
                    let deals: Vec<_> = deals.values().cloned().collect();
                    participant.respond(&deals)?;
                }
                Phase::Justification => {
                    let responses: Vec<_> = responses.values().cloned().collect();
                    let output = participant.justify(&responses)?;
                    if output.is_some() || participant.done() {
                        return Ok(output);
                    }
                }
                Phase::Finish => {
                    let justifications: Vec<_> = justifications.values().cloned().collect();
                    return participant.finish(&justifications);
                }
            }
        }
    }
}
