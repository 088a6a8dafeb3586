//! BIP143 signature hash for version 0 witness programs
//!
//! Only `SIGHASH_ALL` semantics are implemented: every input and every output
//! is committed to, the sighash type value is carried through verbatim.

use log::trace;

use bitcoin::hashes::{sha256d, Hash};

use crate::encode::*;
use crate::transaction::{Transaction, TxInput};
use crate::Error;

pub const SIGHASH_ALL: u32 = 0x01;

/// The parts of the preimage shared by every input of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SighashComponents {
    tx_version: u32,
    tx_locktime: u32,
    pub hash_prevouts: [u8; 32],
    pub hash_sequence: [u8; 32],
    pub hash_outputs: [u8; 32],
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

impl SighashComponents {
    pub fn new(tx: &Transaction) -> Self {
        let mut prevouts = Vec::with_capacity(tx.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
        for input in &tx.inputs {
            input.previous_output.encode(&mut prevouts);
            write_u32_le(&mut sequences, input.sequence);
        }

        let mut outputs = Vec::new();
        for output in &tx.outputs {
            output.encode(&mut outputs);
        }

        SighashComponents {
            tx_version: tx.version,
            tx_locktime: tx.lock_time,
            hash_prevouts: double_sha256(&prevouts),
            hash_sequence: double_sha256(&sequences),
            hash_outputs: double_sha256(&outputs),
        }
    }

    /// Bytes hashed to produce the digest. `script_code` is the bare witness
    /// script, its length prefix is added here.
    pub fn preimage(
        &self,
        input: &TxInput,
        script_code: &[u8],
        value: u64,
        sighash_type: u32,
    ) -> Vec<u8> {
        let mut preimage = Vec::with_capacity(156 + script_code.len());

        write_u32_le(&mut preimage, self.tx_version);
        preimage.extend_from_slice(&self.hash_prevouts);
        preimage.extend_from_slice(&self.hash_sequence);
        input.previous_output.encode(&mut preimage);
        write_var_bytes(&mut preimage, script_code);
        write_u64_le(&mut preimage, value);
        write_u32_le(&mut preimage, input.sequence);
        preimage.extend_from_slice(&self.hash_outputs);
        write_u32_le(&mut preimage, self.tx_locktime);
        write_u32_le(&mut preimage, sighash_type);

        preimage
    }

    pub fn sighash(
        &self,
        input: &TxInput,
        script_code: &[u8],
        value: u64,
        sighash_type: u32,
    ) -> [u8; 32] {
        double_sha256(&self.preimage(input, script_code, value, sighash_type))
    }

    pub fn sighash_all(&self, input: &TxInput, script_code: &[u8], value: u64) -> [u8; 32] {
        self.sighash(input, script_code, value, SIGHASH_ALL)
    }
}

pub fn compute_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    input_amount: u64,
    sighash_type: u32,
) -> Result<[u8; 32], Error> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(Error::InputIndexOutOfRange {
            index: input_index,
            inputs: tx.inputs.len(),
        })?;

    let digest = SighashComponents::new(tx).sighash(input, script_code, input_amount, sighash_type);
    trace!("sighash for input {}: {}", input_index, hex::encode(digest));

    Ok(digest)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::*;
    use crate::transaction::*;

    fn unsigned() -> Transaction {
        Transaction::from_hex(UNSIGNED_TX).unwrap()
    }

    fn redeem_script() -> Vec<u8> {
        hex::decode(REDEEM_SCRIPT).unwrap()
    }

    fn sighash_of(tx: &Transaction, script_code: &[u8], amount: u64) -> [u8; 32] {
        compute_sighash(tx, 0, script_code, amount, SIGHASH_ALL).unwrap()
    }

    #[test]
    fn test_components() {
        let comp = SighashComponents::new(&unsigned());
        assert_eq!(hex::encode(comp.hash_prevouts), HASH_PREVOUTS);
        assert_eq!(hex::encode(comp.hash_sequence), HASH_SEQUENCE);
        assert_eq!(hex::encode(comp.hash_outputs), HASH_OUTPUTS);
    }

    #[test]
    fn test_sighash() {
        let digest = sighash_of(&unsigned(), &redeem_script(), AMOUNT);
        assert_eq!(hex::encode(digest), SIGHASH);

        // witness data is not committed to
        let signed = Transaction::from_hex(SIGNED_TX).unwrap();
        assert_eq!(sighash_of(&signed, &redeem_script(), AMOUNT), digest);
    }

    #[test]
    fn test_every_field_is_committed() {
        let tx = unsigned();
        let script = redeem_script();
        let base = sighash_of(&tx, &script, AMOUNT);

        let mut changed = tx.clone();
        changed.version ^= 1;
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        let mut changed = tx.clone();
        changed.inputs[0].previous_output.txid[31] = 0x01;
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        let mut changed = tx.clone();
        changed.inputs[0].previous_output.vout = 1;
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        let mut changed = tx.clone();
        changed.inputs[0].sequence = 0xffff_fffe;
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        let mut changed = tx.clone();
        changed.outputs[0].value += 1;
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        let mut changed = tx.clone();
        changed.outputs[0].script_pubkey[2] ^= 0xff;
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        let mut changed = tx.clone();
        changed.outputs.push(TxOutput {
            value: 0,
            script_pubkey: vec![],
        });
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        let mut changed = tx.clone();
        changed.lock_time = 1;
        assert_ne!(sighash_of(&changed, &script, AMOUNT), base);

        assert_ne!(sighash_of(&tx, &script, AMOUNT + 1), base);
        assert_ne!(sighash_of(&tx, &script[1..], AMOUNT), base);
        assert_ne!(
            compute_sighash(&tx, 0, &script, AMOUNT, 0x81).unwrap(),
            base
        );
    }

    #[test]
    fn test_scriptsig_not_committed() {
        let tx = unsigned();
        let mut changed = tx.clone();
        changed.inputs[0].script_sig.clear();

        assert_eq!(
            sighash_of(&changed, &redeem_script(), AMOUNT),
            sighash_of(&tx, &redeem_script(), AMOUNT)
        );
    }

    #[test]
    fn test_input_out_of_range() {
        assert!(matches!(
            compute_sighash(&unsigned(), 1, &redeem_script(), AMOUNT, SIGHASH_ALL),
            Err(Error::InputIndexOutOfRange {
                index: 1,
                inputs: 1
            })
        ));
    }

    // Native P2WPKH example of BIP143, second input
    #[test]
    fn test_bip143_two_inputs() {
        let tx = Transaction::from_hex("0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000").unwrap();
        let script_code = hex::decode("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac").unwrap();

        let comp = SighashComponents::new(&tx);
        assert_eq!(
            hex::encode(comp.preimage(&tx.inputs[1], &script_code, 600_000_000, SIGHASH_ALL)),
            "0100000096b827c8483d4e9b96712b6713a7b68d6e8003a781feba36c31143470b4efd3752b0a642eea2fb7ae638c36f6252b6750293dbe574a806984b8e4d8548339a3bef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a010000001976a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac0046c32300000000ffffffff863ef3e1a92afbfdb97f31ad0fc7683ee943e9abcf2501590ff8f6551f47e5e51100000001000000"
        );
        assert_eq!(
            hex::encode(comp.sighash_all(&tx.inputs[1], &script_code, 600_000_000)),
            "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
        );
    }
}
