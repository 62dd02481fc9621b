use crate::core::{Blockchain, TXOutput, Transaction};
use crate::error::Result;
use std::collections::{HashMap, HashSet};

/// A transaction with at least one output still spendable by the queried address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentTransaction {
    transaction: Transaction,
    outputs: Vec<usize>,
}

impl UnspentTransaction {
    pub fn get_transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Indices of the qualifying outputs, ascending.
    pub fn get_output_indices(&self) -> &[usize] {
        self.outputs.as_slice()
    }

    pub fn unspent_outputs(&self) -> impl Iterator<Item = (usize, &TXOutput)> {
        self.outputs
            .iter()
            .map(move |&idx| (idx, &self.transaction.get_vout()[idx]))
    }
}

/// Unspent-output view over a ledger.
///
/// Nothing is indexed or cached: every query walks the chain from tip to genesis, so answers
/// always reflect the latest persisted block.
pub struct UTXOSet<'a> {
    blockchain: &'a Blockchain,
}

impl<'a> UTXOSet<'a> {
    pub fn new(blockchain: &'a Blockchain) -> UTXOSet<'a> {
        UTXOSet { blockchain }
    }

    /// Transactions holding outputs locked to `address` that no later input from `address`
    /// has consumed, newest first.
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<UnspentTransaction>> {
        let mut unspent = vec![];
        // ( K -> txid, V -> output indices already consumed by a more recent input )
        let mut spent_txos: HashMap<Vec<u8>, HashSet<usize>> = HashMap::new();

        for block in self.blockchain.iterator() {
            let block = block?;
            for tx in block.get_transactions() {
                let spent = spent_txos.get(tx.get_id());
                let outputs: Vec<usize> = tx
                    .get_vout()
                    .iter()
                    .enumerate()
                    .filter(|(idx, out)| {
                        !spent.is_some_and(|s| s.contains(idx)) && out.can_be_unlocked_with(address)
                    })
                    .map(|(idx, _)| idx)
                    .collect();

                if !outputs.is_empty() {
                    unspent.push(UnspentTransaction {
                        transaction: tx.clone(),
                        outputs,
                    });
                }

                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    if txin.can_unlock_output_with(address) {
                        spent_txos
                            .entry(txin.get_txid().to_vec())
                            .or_default()
                            .insert(txin.get_vout());
                    }
                }
            }
        }
        Ok(unspent)
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TXOutput>> {
        Ok(self
            .find_unspent_transactions(address)?
            .iter()
            .flat_map(|utx| utx.unspent_outputs().map(|(_, out)| out.clone()))
            .collect())
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        Ok(self
            .find_utxo(address)?
            .iter()
            .map(TXOutput::get_value)
            .sum())
    }

    /// Collect outputs of `address` in scan order until their value reaches `amount`.
    ///
    /// Returns the accumulated value and the `(txid, index)` pairs chosen. When the whole
    /// balance is short of `amount` every unspent output is returned.
    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, Vec<(Vec<u8>, usize)>)> {
        let mut accumulated = 0u64;
        let mut chosen = vec![];

        'scan: for utx in self.find_unspent_transactions(address)? {
            for (idx, out) in utx.unspent_outputs() {
                if accumulated >= amount {
                    break 'scan;
                }
                accumulated += out.get_value();
                chosen.push((utx.transaction.get_id().to_vec(), idx));
            }
        }
        Ok((accumulated, chosen))
    }
}
