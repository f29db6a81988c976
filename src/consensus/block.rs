use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::crypto::{sha256_hex, Digest, Hashable};

/// Leading hex characters a block hash needs before the block may be proposed.
pub const WORK_PREFIX: &str = "000";

/// Transactions taken from the pending set per block.
pub const MAX_BLOCK_TRANSACTIONS: usize = 2;

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: i64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: i64) -> Self {
        Transaction {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.from, self.to, self.amount)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Block {
    pub depth: u64,
    pub prev_hash: Digest,
    pub nonce: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Canonical text of the transaction list, e.g. `[(1, 2, 5), (2, 3, 1)]`.
    pub fn transactions_string(&self) -> String {
        let items: Vec<String> = self.transactions.iter().map(|tx| tx.to_string()).collect();
        format!("[{}]", items.join(", "))
    }

    pub fn has_valid_work(&self) -> bool {
        self.hash().starts_with(WORK_PREFIX)
    }

    /// True when the nonce is `<miner><digits>`.
    pub fn is_mined_by(&self, miner: &str) -> bool {
        match self.nonce.strip_prefix(miner) {
            Some(suffix) => !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }
}

impl Hashable for Block {
    fn hash(&self) -> Digest {
        let concatenation = format!(
            "{}{}{}{}",
            self.depth,
            self.prev_hash,
            self.nonce,
            self.transactions_string()
        );
        sha256_hex(concatenation)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block(depth={}, prev_hash={}, nonce={}, tx={})",
            self.depth,
            self.prev_hash,
            self.nonce,
            self.transactions_string()
        )
    }
}

/// Builds the next block on top of `chain` from the first pending transactions
/// and searches nonces `<miner>0`, `<miner>1`, ... until the proof of work holds.
///
/// The search has no bound; callers must not assume it returns quickly.
pub fn mine(chain: &[Block], pending: &[Transaction], miner: &str) -> Block {
    let prev_hash = chain.last().map(|tip| tip.hash()).unwrap_or_default();
    let take = pending.len().min(MAX_BLOCK_TRANSACTIONS);

    let mut block = Block {
        depth: chain.len() as u64,
        prev_hash,
        nonce: String::new(),
        transactions: pending[..take].to_vec(),
    };

    let mut suffix: u64 = 0;
    loop {
        block.nonce = format!("{}{}", miner, suffix);
        if block.has_valid_work() {
            return block;
        }
        suffix += 1;
    }
}
