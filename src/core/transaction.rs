// Value moves through unspent outputs: a transaction consumes earlier outputs through its inputs
// and creates new outputs locked to an address. Addresses are opaque strings here; an input
// unlocks an output when its credential equals the output's locking address, and the installed
// CredentialVerifier decides whether that credential may be used at all.

use crate::core::{Blockchain, CredentialVerifier, UTXOSet};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Value minted by the coinbase transaction of the genesis block
pub const SUBSIDY: u64 = 10;

#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct TXInput {
    txid: Vec<u8>,      // transaction holding the output being spent, empty for coinbase
    vout: usize,        // index of that output
    script_sig: String, // unlocking credential
}

impl TXInput {
    pub fn new(txid: &[u8], vout: usize, script_sig: &str) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            script_sig: script_sig.to_string(),
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> usize {
        self.vout
    }

    pub fn get_script_sig(&self) -> &str {
        self.script_sig.as_str()
    }

    pub fn can_unlock_output_with(&self, address: &str) -> bool {
        self.script_sig == address
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXOutput {
    value: u64,
    script_pub_key: String, // locking address
}

impl TXOutput {
    pub fn new(value: u64, address: &str) -> TXOutput {
        TXOutput {
            value,
            script_pub_key: address.to_string(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_script_pub_key(&self) -> &str {
        self.script_pub_key.as_str()
    }

    pub fn can_be_unlocked_with(&self, address: &str) -> bool {
        self.script_pub_key == address
    }
}

#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    /// Block reward: one input referencing nothing, one output of [`SUBSIDY`] to `to`.
    pub fn new_coinbase_tx(to: &str) -> Result<Transaction> {
        let tx_input = TXInput {
            script_sig: format!("Reward to '{to}'"),
            ..Default::default()
        };

        let mut tx = Transaction {
            id: vec![],
            vin: vec![tx_input],
            vout: vec![TXOutput::new(SUBSIDY, to)],
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Build a transfer of `amount` from `from` to `to`, spending `from`'s unspent outputs in
    /// scan order until the amount is covered. Any surplus goes back to `from` as change.
    pub fn new_utxo_transaction(
        from: &str,
        to: &str,
        amount: u64,
        utxo_set: &UTXOSet,
    ) -> Result<Transaction> {
        let (accumulated, valid_outputs) = utxo_set.find_spendable_outputs(from, amount)?;

        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let inputs = valid_outputs
            .iter()
            .map(|(txid, vout)| TXInput::new(txid, *vout, from))
            .collect();

        let mut outputs = vec![TXOutput::new(amount, to)];
        let change = accumulated - amount;
        if change > 0 {
            outputs.push(TXOutput::new(change, from));
        }

        let mut tx = Transaction {
            id: vec![],
            vin: inputs,
            vout: outputs,
        };
        tx.id = tx.hash()?;

        info!(
            "Built transaction {} sending {amount} from {from} to {to} ({} inputs, change {change})",
            HEXLOWER.encode(&tx.id),
            tx.vin.len()
        );
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty()
    }

    /// Content hash of the input/output set, ignoring whatever ID is currently stored.
    pub fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            ..self.clone()
        };
        Ok(sha256_digest(tx_copy.serialize()?.as_slice()))
    }

    /// Integrity check run before a transaction is admitted into a block.
    ///
    /// The ID is recomputed rather than trusted. For a regular transaction every input must point
    /// at an existing, still unspent output locked to the input's credential, the verifier must
    /// accept that credential, and the inputs must sum to exactly the outputs.
    pub fn verify(&self, blockchain: &Blockchain, verifier: &dyn CredentialVerifier) -> Result<()> {
        let txid_hex = HEXLOWER.encode(&self.id);
        if self.hash()? != self.id {
            return Err(BlockchainError::Transaction(format!(
                "Transaction {txid_hex} does not match its content hash"
            )));
        }

        if self.is_coinbase() {
            if self.vout.len() != 1 || self.vout[0].get_value() != SUBSIDY {
                return Err(BlockchainError::Transaction(format!(
                    "Coinbase transaction {txid_hex} must pay exactly {SUBSIDY} in one output"
                )));
            }
            return Ok(());
        }

        let mut seen = HashSet::new();
        let mut input_value = 0u64;
        for vin in &self.vin {
            let outpoint = format!("{}:{}", HEXLOWER.encode(vin.get_txid()), vin.get_vout());
            if !seen.insert((vin.get_txid(), vin.get_vout())) {
                return Err(BlockchainError::Transaction(format!(
                    "Output {outpoint} spent twice by transaction {txid_hex}"
                )));
            }

            let prev_tx = blockchain.find_transaction(vin.get_txid())?.ok_or_else(|| {
                BlockchainError::Transaction(format!("Referenced output {outpoint} not found"))
            })?;
            let prev_output = prev_tx.vout.get(vin.get_vout()).ok_or_else(|| {
                BlockchainError::Transaction(format!("Referenced output {outpoint} not found"))
            })?;

            if !prev_output.can_be_unlocked_with(vin.get_script_sig()) {
                return Err(BlockchainError::Transaction(format!(
                    "Input for {outpoint} does not carry the output's credential"
                )));
            }
            if !verifier.verify(vin.get_script_sig(), &self.id) {
                return Err(BlockchainError::Transaction(format!(
                    "Credential for {outpoint} rejected by verifier"
                )));
            }
            if blockchain.is_output_spent(vin.get_txid(), vin.get_vout())? {
                return Err(BlockchainError::Transaction(format!(
                    "Output {outpoint} already spent"
                )));
            }

            input_value = input_value
                .checked_add(prev_output.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Input value overflow".to_string()))?;
        }

        let output_value = self.get_output_value()?;
        if input_value != output_value {
            return Err(BlockchainError::Transaction(format!(
                "Transaction {txid_hex} is unbalanced: inputs={input_value}, outputs={output_value}"
            )));
        }

        Ok(())
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for vout in &self.vout {
            total = total
                .checked_add(vout.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::new_coinbase_tx("Alice").unwrap();

        assert!(tx.is_coinbase());
        assert_eq!(tx.get_vin()[0].get_script_sig(), "Reward to 'Alice'");
        assert_eq!(tx.get_vout(), &[TXOutput::new(SUBSIDY, "Alice")]);
        assert_eq!(tx.get_id(), tx.hash().unwrap().as_slice());
    }

    #[test]
    fn test_id_covers_outputs() {
        let alice = Transaction::new_coinbase_tx("Alice").unwrap();
        let bob = Transaction::new_coinbase_tx("Bob").unwrap();
        assert_ne!(alice.get_id(), bob.get_id());
    }

    #[test]
    fn test_hash_ignores_stored_id() {
        let mut tx = Transaction::new_coinbase_tx("Alice").unwrap();
        let expected = tx.hash().unwrap();
        tx.id = vec![0u8; 32];
        assert_eq!(tx.hash().unwrap(), expected);
    }

    #[test]
    fn test_regular_transaction_is_not_coinbase() {
        let tx = Transaction {
            id: vec![],
            vin: vec![TXInput::new(&[1u8; 32], 0, "Alice")],
            vout: vec![TXOutput::new(4, "Bob")],
        };
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn test_unlock_predicates() {
        let input = TXInput::new(&[1u8; 32], 0, "Alice");
        assert!(input.can_unlock_output_with("Alice"));
        assert!(!input.can_unlock_output_with("Bob"));

        let output = TXOutput::new(3, "Bob");
        assert!(output.can_be_unlocked_with("Bob"));
        assert!(!output.can_be_unlocked_with("Alice"));
    }

    #[test]
    fn test_output_value_overflow() {
        let tx = Transaction {
            id: vec![],
            vin: vec![],
            vout: vec![TXOutput::new(u64::MAX, "Bob"), TXOutput::new(1, "Bob")],
        };
        assert!(matches!(
            tx.get_output_value(),
            Err(BlockchainError::Transaction(_))
        ));
    }

    #[test]
    fn test_transaction_decode_preserves_order() {
        let tx = Transaction {
            id: vec![9; 32],
            vin: vec![
                TXInput::new(&[2u8; 32], 1, "Alice"),
                TXInput::new(&[1u8; 32], 0, "Alice"),
            ],
            vout: vec![TXOutput::new(4, "Bob"), TXOutput::new(6, "Alice")],
        };
        let decoded = Transaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }
}
