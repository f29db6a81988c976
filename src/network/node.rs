use tokio::{net::TcpListener, sync::mpsc::{self, Sender}, task::JoinHandle};
use tracing::info;

use super::{codec, transport, TransportError};
use crate::{
    config::Config,
    consensus::{
        peers::NodeId,
        processor::{ConsensusProcessor, Event},
        store::Ledger,
    },
};

const CHANNEL_CAPACITY: usize = 100;

/// One replica: listener, consensus processor and outbox wired together.
pub struct Node {
    pub id: NodeId,
    pub config: Config,
}

/// Handle kept by the front end once the node is running.
pub struct NodeHandle {
    pub event_tx: Sender<Event>,
    pub processor: JoinHandle<()>,
}

impl Node {
    pub fn new(id: NodeId, config: Config) -> Result<Self, TransportError> {
        // Unknown ids fail here, before any consensus state exists.
        config.node_addr(&id)?;
        Ok(Node { id, config })
    }

    pub async fn start(self) -> Result<NodeHandle, TransportError> {
        let listen_addr = self.config.node_addr(&self.id)?;
        let relay_addr = self.config.relay_addr()?;
        let listener = TcpListener::bind(listen_addr).await?;
        info!(node = %self.id, %listen_addr, %relay_addr, "Node listening");

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let peers = self.config.peers();
        let ledger = Ledger::new(&peers.members, self.config.initial_balance);
        let mut processor = ConsensusProcessor::new(self.id, peers, ledger, event_rx, msg_tx);

        tokio::spawn(transport::run_listener(listener, event_tx.clone(), codec::READ_TIMEOUT));
        tokio::spawn(transport::run_outbox(relay_addr, msg_rx));
        let processor = tokio::spawn(async move { processor.run().await });

        Ok(NodeHandle { event_tx, processor })
    }
}
