use std::collections::BTreeMap;

use crate::common::crypto::Hashable;
use super::block::Block;

/// Decided blocks of one node (index = depth) and the wallet balances they imply.
#[derive(Clone, Debug)]
pub struct Ledger {
    pub chain: Vec<Block>,
    pub wallets: BTreeMap<String, i64>,
    genesis_wallets: BTreeMap<String, i64>,
}

impl Ledger {
    pub fn new<'a>(accounts: impl IntoIterator<Item = &'a String>, initial_balance: i64) -> Self {
        let wallets: BTreeMap<String, i64> = accounts
            .into_iter()
            .map(|account| (account.clone(), initial_balance))
            .collect();
        Ledger {
            chain: Vec::new(),
            genesis_wallets: wallets.clone(),
            wallets,
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn balance(&self, account: &str) -> i64 {
        self.wallets.get(account).copied().unwrap_or_default()
    }

    pub fn total_balance(&self) -> i64 {
        self.wallets.values().sum()
    }

    /// Appends `block` and moves each transfer's amount from `from` to `to`.
    /// Balances may go negative; nothing is validated here.
    pub fn apply(&mut self, block: Block) {
        Self::fold(&mut self.wallets, &block);
        self.chain.push(block);
    }

    /// Installs a chain received from a peer.
    ///
    /// The common case extends the local chain by one block and is applied
    /// incrementally; anything else rebuilds the balances from genesis.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        if self.extends_by_one(&chain) {
            if let Some(block) = chain.last() {
                self.apply(block.clone());
            }
            return;
        }

        let mut wallets = self.genesis_wallets.clone();
        for block in &chain {
            Self::fold(&mut wallets, block);
        }
        self.wallets = wallets;
        self.chain = chain;
    }

    fn extends_by_one(&self, chain: &[Block]) -> bool {
        chain.len() == self.chain.len() + 1
            && self
                .chain
                .iter()
                .zip(chain.iter())
                .all(|(ours, theirs)| ours.hash() == theirs.hash())
    }

    fn fold(wallets: &mut BTreeMap<String, i64>, block: &Block) {
        for tx in &block.transactions {
            *wallets.entry(tx.from.clone()).or_default() -= tx.amount;
            *wallets.entry(tx.to.clone()).or_default() += tx.amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::block::{mine, Transaction};

    fn accounts() -> Vec<String> {
        vec!["1".to_string(), "2".to_string(), "3".to_string()]
    }

    #[test]
    fn test_apply_moves_funds_and_conserves_total() {
        let mut ledger = Ledger::new(&accounts(), 100);
        let block = mine(
            &[],
            &[Transaction::new("1", "2", 30), Transaction::new("2", "3", 50)],
            "1",
        );

        ledger.apply(block);

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.balance("1"), 70);
        assert_eq!(ledger.balance("2"), 80);
        assert_eq!(ledger.balance("3"), 150);
        assert_eq!(ledger.total_balance(), 300);
    }

    #[test]
    fn test_apply_does_not_check_funds() {
        let mut ledger = Ledger::new(&accounts(), 100);
        let block = mine(&[], &[Transaction::new("1", "2", 250)], "1");

        ledger.apply(block);

        assert_eq!(ledger.balance("1"), -150);
        assert_eq!(ledger.total_balance(), 300);
    }

    #[test]
    fn test_replace_chain_extending_by_one_applies_tip() {
        let mut ledger = Ledger::new(&accounts(), 100);
        let first = mine(&[], &[Transaction::new("1", "2", 5)], "1");
        ledger.apply(first.clone());
        let second = mine(&[first.clone()], &[Transaction::new("3", "1", 9)], "2");

        ledger.replace_chain(vec![first, second]);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.balance("1"), 104);
        assert_eq!(ledger.balance("2"), 105);
        assert_eq!(ledger.balance("3"), 91);
    }

    #[test]
    fn test_replace_chain_catches_up_several_blocks() {
        let mut ledger = Ledger::new(&accounts(), 100);
        let first = mine(&[], &[Transaction::new("1", "2", 5)], "1");
        let second = mine(&[first.clone()], &[Transaction::new("2", "3", 8)], "2");

        ledger.replace_chain(vec![first, second]);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.balance("1"), 95);
        assert_eq!(ledger.balance("2"), 97);
        assert_eq!(ledger.balance("3"), 108);
        assert_eq!(ledger.total_balance(), 300);
    }
}
