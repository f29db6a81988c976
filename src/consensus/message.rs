use serde::{Deserialize, Serialize};

use super::{ballot::Ballot, block::Block, peers::NodeId};

/*
    A proposer drives one depth of the chain through two phases:

        PREPARE(b)       -> every other node
        ACK(b, ab?, av?) <- acceptors promising b, reporting what they accepted
        ACCEPT(b, v)     -> every other node, once a majority acked
        ACCEPT2(b, v)    <- acceptors that accepted v
        DECISION(b, c)   -> every other node, once a majority accepted

    A node asked to prepare a depth it already decided answers with SYNC,
    carrying its chain so the stale proposer can catch up.
*/

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Message {
    Prepare(Prepare),
    Ack(Ack),
    Accept(Accept),
    Accept2(Accept2),
    Decision(Decision),
    Sync(ChainSync),
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Prepare {
    pub ballot: Ballot,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Ack {
    pub ballot: Ballot,
    pub accept_ballot: Option<Ballot>,
    pub accept_value: Option<Block>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Accept {
    pub ballot: Ballot,
    pub block: Block,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Accept2 {
    pub ballot: Ballot,
    pub block: Block,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub ballot: Ballot,
    pub chain: Vec<Block>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ChainSync {
    pub ballot: Ballot,
    pub chain: Vec<Block>,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Prepare(_) => "PREPARE",
            Message::Ack(_) => "ACK",
            Message::Accept(_) => "ACCEPT",
            Message::Accept2(_) => "ACCEPT2",
            Message::Decision(_) => "DECISION",
            Message::Sync(_) => "SYNC",
        }
    }

    pub fn ballot(&self) -> &Ballot {
        match self {
            Message::Prepare(m) => &m.ballot,
            Message::Ack(m) => &m.ballot,
            Message::Accept(m) => &m.ballot,
            Message::Accept2(m) => &m.ballot,
            Message::Decision(m) => &m.ballot,
            Message::Sync(m) => &m.ballot,
        }
    }
}

/// A message addressed from one node to another, as carried by the relay.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: NodeId,
    pub recipient: NodeId,
    pub message: Message,
}

impl Envelope {
    pub fn new(sender: impl Into<NodeId>, recipient: impl Into<NodeId>, message: Message) -> Self {
        Envelope {
            sender: sender.into(),
            recipient: recipient.into(),
            message,
        }
    }
}
