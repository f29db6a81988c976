/*
    A replicated ledger kept by a fixed set of nodes. Clients queue transfers at
    any node; once two are pending the node mines a block and runs a two-phase,
    ballot-ordered agreement (PREPARE/ACK, ACCEPT/ACCEPT2) so that every node
    appends the same block at each depth. A node that proposes for a depth the
    others already decided is brought up to date with SYNC.
*/

pub mod client;
pub mod common;
pub mod config;
pub mod consensus;
pub mod network;
