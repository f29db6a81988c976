use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::{
    mpsc::{Receiver, Sender},
    oneshot,
};
use tracing::{debug, error, info, warn};

use super::{
    ballot::Ballot,
    block::{mine, Block, Transaction, MAX_BLOCK_TRANSACTIONS},
    message::{Accept, Accept2, Ack, ChainSync, Decision, Envelope, Message, Prepare},
    peers::{NodeId, Peers},
    store::Ledger,
};

/*
    The processor is the only owner of a node's consensus state. The transport
    and the client menu both talk to it through one channel, so every handler
    runs to completion before the next event is read and no locking is needed.

    There are no timeouts: a round that loses messages stalls until a higher
    ballot, a SYNC, or a RestartRound command moves the node along.
*/

#[derive(Debug)]
pub enum Event {
    Message(Envelope),
    Command(Command),
}

#[derive(Debug)]
pub enum Command {
    Submit(Transaction),
    RestartRound,
    Snapshot(oneshot::Sender<NodeView>),
}

/// Read-only copy of a node's state for the client menu.
#[derive(Clone, Debug)]
pub struct NodeView {
    pub chain: Vec<Block>,
    pub wallets: BTreeMap<String, i64>,
    pub pending: Vec<Transaction>,
    pub max_ballot: Ballot,
}

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("outbox closed while sending {0}")]
    OutboxClosed(&'static str),
    #[error("mining task failed: {0}")]
    Mining(#[from] tokio::task::JoinError),
}

pub struct ConsensusState {
    pub max_ballot: Ballot,
    pub accept_ballot: Option<Ballot>,
    pub accept_value: Option<Block>,
    pub acks_received: usize,
    pub accept2_received: usize,
    pub pending: Vec<Transaction>,
}

impl ConsensusState {
    pub fn new() -> Self {
        ConsensusState {
            max_ballot: Ballot::initial(),
            accept_ballot: None,
            accept_value: None,
            acks_received: 0,
            accept2_received: 0,
            pending: Vec::new(),
        }
    }

    fn reset_counts(&mut self) {
        self.acks_received = 0;
        self.accept2_received = 0;
    }

    fn clear_accepted(&mut self) {
        self.accept_ballot = None;
        self.accept_value = None;
    }
}

impl Default for ConsensusState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ConsensusProcessor {
    pub id: NodeId,
    pub peers: Peers,
    pub state: ConsensusState,
    pub ledger: Ledger,
    pub event_rx: Receiver<Event>,
    pub msg_tx: Sender<Envelope>,
}

impl ConsensusProcessor {
    pub fn new(
        id: NodeId,
        peers: Peers,
        ledger: Ledger,
        event_rx: Receiver<Event>,
        msg_tx: Sender<Envelope>,
    ) -> Self {
        ConsensusProcessor {
            id,
            peers,
            state: ConsensusState::new(),
            ledger,
            event_rx,
            msg_tx,
        }
    }

    pub async fn run(&mut self) {
        info!(node = %self.id, "Running consensus processor");
        while let Some(event) = self.event_rx.recv().await {
            if let Err(err) = self.handle_event(event).await {
                error!(node = %self.id, %err, "Event handling failed");
                if matches!(err, ConsensusError::OutboxClosed(_)) {
                    break;
                }
            }
        }
        info!(node = %self.id, "Consensus processor stopped");
    }

    pub async fn handle_event(&mut self, event: Event) -> Result<(), ConsensusError> {
        match event {
            Event::Message(envelope) => self.handle_message(envelope).await,
            Event::Command(command) => self.handle_command(command).await,
        }
    }

    async fn handle_message(&mut self, envelope: Envelope) -> Result<(), ConsensusError> {
        if envelope.recipient != self.id {
            warn!(node = %self.id, recipient = %envelope.recipient, "Dropping misaddressed message");
            return Ok(());
        }
        debug!(
            node = %self.id,
            peer = %envelope.sender,
            kind = envelope.message.kind(),
            ballot = %envelope.message.ballot(),
            "Received"
        );

        match envelope.message {
            Message::Prepare(prepare) => self.handle_prepare(prepare).await,
            Message::Ack(ack) => self.handle_ack(ack).await,
            Message::Accept(accept) => self.handle_accept(accept).await,
            Message::Accept2(accept2) => self.handle_accept2(accept2).await,
            Message::Decision(decision) => self.handle_decision(decision).await,
            Message::Sync(sync) => {
                self.handle_sync(sync);
                Ok(())
            }
        }
    }

    async fn handle_command(&mut self, command: Command) -> Result<(), ConsensusError> {
        match command {
            Command::Submit(tx) => {
                info!(node = %self.id, %tx, "Transaction queued");
                self.state.pending.push(tx);
                if self.state.pending.len() >= MAX_BLOCK_TRANSACTIONS
                    && self.state.accept_ballot.is_none()
                {
                    self.initiate_paxos().await?;
                }
            }
            Command::RestartRound => {
                if self.state.pending.len() >= MAX_BLOCK_TRANSACTIONS {
                    self.initiate_paxos().await?;
                } else {
                    info!(
                        node = %self.id,
                        pending = self.state.pending.len(),
                        "Not enough pending transactions to start a round"
                    );
                }
            }
            Command::Snapshot(reply) => {
                // The menu may have gone away; nothing to do then.
                let _ = reply.send(self.view());
            }
        }
        Ok(())
    }

    pub fn view(&self) -> NodeView {
        NodeView {
            chain: self.ledger.chain.clone(),
            wallets: self.ledger.wallets.clone(),
            pending: self.state.pending.clone(),
            max_ballot: self.state.max_ballot.clone(),
        }
    }

    /// Mines a candidate for the next depth and asks every peer to promise a fresh ballot.
    pub async fn initiate_paxos(&mut self) -> Result<(), ConsensusError> {
        self.state.reset_counts();

        let chain = self.ledger.chain.clone();
        let pending = self.state.pending.clone();
        let miner = self.id.clone();
        let block = tokio::task::spawn_blocking(move || mine(&chain, &pending, &miner)).await?;

        let ballot = Ballot::new(
            self.state.max_ballot.n + 1,
            self.id.clone(),
            block.depth as i64,
        );
        info!(node = %self.id, %ballot, depth = block.depth, "Starting round");

        self.state.accept_ballot = Some(ballot.clone());
        self.state.accept_value = Some(block);
        self.state.max_ballot = ballot.clone();

        self.broadcast(Message::Prepare(Prepare { ballot })).await
    }

    async fn handle_prepare(&mut self, prepare: Prepare) -> Result<(), ConsensusError> {
        let ballot = prepare.ballot;

        // Proposer is working on a depth we already decided.
        if ballot.depth < self.ledger.len() as i64 {
            let sync = ChainSync {
                ballot: self.state.max_ballot.clone(),
                chain: self.ledger.chain.clone(),
            };
            return self.send(ballot.proposer_id, Message::Sync(sync)).await;
        }
        if ballot.is_lower_than(&self.state.max_ballot) {
            return Ok(());
        }

        self.state.max_ballot = ballot.clone();
        self.state.reset_counts();

        let ack = Ack {
            ballot: ballot.clone(),
            accept_ballot: self.state.accept_ballot.clone(),
            accept_value: self.state.accept_value.clone(),
        };
        self.send(ballot.proposer_id, Message::Ack(ack)).await
    }

    async fn handle_ack(&mut self, ack: Ack) -> Result<(), ConsensusError> {
        if ack.ballot.is_lower_than(&self.state.max_ballot)
            || self.state.acks_received >= self.peers.majority()
        {
            return Ok(());
        }

        // Must carry forward the highest-ballot value any acceptor already accepted.
        if let (Some(reported), Some(value)) = (ack.accept_ballot, ack.accept_value) {
            let adopt = match &self.state.accept_ballot {
                None => true,
                Some(current) => reported.is_higher_than(current),
            };
            if adopt {
                debug!(node = %self.id, %reported, "Adopting previously accepted value");
                self.state.accept_ballot = Some(reported);
                self.state.accept_value = Some(value);
            }
        }

        self.state.acks_received += 1;
        if self.state.acks_received < self.peers.majority() {
            return Ok(());
        }

        let Some(block) = self.state.accept_value.clone() else {
            warn!(node = %self.id, ballot = %ack.ballot, "Quorum of acks without a value to propose");
            return Ok(());
        };
        info!(node = %self.id, ballot = %ack.ballot, "Promise quorum reached");
        self.broadcast(Message::Accept(Accept {
            ballot: ack.ballot,
            block,
        }))
        .await
    }

    async fn handle_accept(&mut self, accept: Accept) -> Result<(), ConsensusError> {
        // TODO: re-send ACCEPT2 when the same ballot is accepted again instead of staying silent.
        if accept.ballot.is_lower_than(&self.state.max_ballot) || self.state.accept_ballot.is_some() {
            return Ok(());
        }

        self.state.max_ballot = accept.ballot.clone();
        self.state.accept_ballot = Some(accept.ballot.clone());
        self.state.accept_value = Some(accept.block.clone());

        let proposer = accept.ballot.proposer_id.clone();
        self.send(
            proposer,
            Message::Accept2(Accept2 {
                ballot: accept.ballot,
                block: accept.block,
            }),
        )
        .await
    }

    async fn handle_accept2(&mut self, accept2: Accept2) -> Result<(), ConsensusError> {
        if accept2.ballot.is_lower_than(&self.state.max_ballot) || self.state.accept_ballot.is_none() {
            return Ok(());
        }

        self.state.accept2_received += 1;
        if self.state.accept2_received < self.peers.majority() {
            return Ok(());
        }
        self.state.accept2_received = 0;

        let mut chain = self.ledger.chain.clone();
        chain.push(accept2.block);
        let decision = Decision {
            ballot: accept2.ballot,
            chain,
        };
        self.broadcast(Message::Decision(decision.clone())).await?;
        self.handle_decision(decision).await
    }

    async fn handle_decision(&mut self, decision: Decision) -> Result<(), ConsensusError> {
        let Some(tip) = decision.chain.last() else {
            warn!(node = %self.id, "Ignoring decision with an empty chain");
            return Ok(());
        };
        let mined_here = tip.is_mined_by(&self.id);

        // No depth check: a late DECISION still replaces the chain, even with a
        // shorter one, and a self-mined tip still drains the pending head again.
        self.ledger.replace_chain(decision.chain);
        if mined_here {
            let committed = self.state.pending.len().min(MAX_BLOCK_TRANSACTIONS);
            self.state.pending.drain(..committed);
        }
        self.state.clear_accepted();
        info!(
            node = %self.id,
            ballot = %decision.ballot,
            depth = self.ledger.len() - 1,
            "Decided"
        );

        if self.state.pending.len() >= MAX_BLOCK_TRANSACTIONS {
            self.initiate_paxos().await?;
        }
        Ok(())
    }

    fn handle_sync(&mut self, sync: ChainSync) {
        if self.state.max_ballot.is_lower_than(&sync.ballot) {
            info!(node = %self.id, ballot = %sync.ballot, length = sync.chain.len(), "Synced chain");
            self.state.max_ballot = sync.ballot;
            self.ledger.replace_chain(sync.chain);
        }
    }

    async fn broadcast(&self, message: Message) -> Result<(), ConsensusError> {
        for peer in self.peers.others(&self.id) {
            self.send(peer.clone(), message.clone()).await?;
        }
        Ok(())
    }

    async fn send(&self, recipient: NodeId, message: Message) -> Result<(), ConsensusError> {
        let kind = message.kind();
        debug!(node = %self.id, peer = %recipient, kind, ballot = %message.ballot(), "Sending");
        self.msg_tx
            .send(Envelope::new(self.id.clone(), recipient, message))
            .await
            .map_err(|_| ConsensusError::OutboxClosed(kind))
    }
}
