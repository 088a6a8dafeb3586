//! Transaction model and its two wire serializations

use std::fmt;

use bitcoin::hashes::{sha256d, Hash};

use crate::encode::*;
use crate::Error;

pub const SEGWIT_MARKER: u8 = 0x00;
pub const SEGWIT_FLAG: u8 = 0x01;

/// Reference to a previous output. The txid is kept in internal byte order,
/// the reverse of how block explorers display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    /// All-zero hash, index 0
    pub fn null() -> Self {
        OutPoint {
            txid: [0; 32],
            vout: 0,
        }
    }

    /// Parses a txid in display (reversed) hex
    pub fn from_display_hex(txid: &str, vout: u32) -> Result<Self, Error> {
        let mut bytes = hex::decode(txid)?;
        if bytes.len() != 32 {
            return Err(Error::Config(format!(
                "txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        bytes.reverse();

        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes);
        Ok(OutPoint { txid, vout })
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.txid);
        write_u32_le(out, self.vout);
    }

    fn decode(decoder: &mut Decoder) -> Result<Self, SerializationError> {
        Ok(OutPoint {
            txid: decoder.read_array()?,
            vout: decoder.read_u32_le()?,
        })
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut txid = self.txid;
        txid.reverse();
        write!(f, "{}:{}", hex::encode(txid), self.vout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

impl TxInput {
    pub fn new(previous_output: OutPoint, script_sig: Vec<u8>, sequence: u32) -> Self {
        TxInput {
            previous_output,
            script_sig,
            sequence,
            witness: Vec::new(),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        self.previous_output.encode(out);
        write_var_bytes(out, &self.script_sig);
        write_u32_le(out, self.sequence);
    }

    fn decode(decoder: &mut Decoder) -> Result<Self, SerializationError> {
        Ok(TxInput {
            previous_output: OutPoint::decode(decoder)?,
            script_sig: decoder.read_var_bytes()?,
            sequence: decoder.read_u32_le()?,
            witness: Vec::new(),
        })
    }

    fn encode_witness(&self, out: &mut Vec<u8>) {
        write_compact_size(out, self.witness.len() as u64);
        for item in &self.witness {
            write_var_bytes(out, item);
        }
    }

    fn decode_witness(&mut self, decoder: &mut Decoder) -> Result<(), SerializationError> {
        let count = decoder.read_count(1)?;
        self.witness = (0..count)
            .map(|_| decoder.read_var_bytes())
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn encode(&self, out: &mut Vec<u8>) {
        write_u64_le(out, self.value);
        write_var_bytes(out, &self.script_pubkey);
    }

    fn decode(decoder: &mut Decoder) -> Result<Self, SerializationError> {
        Ok(TxOutput {
            value: decoder.read_u64_le()?,
            script_pubkey: decoder.read_var_bytes()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Whether the extended (marker, flag, witness) form is needed
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Serializes the transaction. With `include_witness` the extended format is
    /// produced, unless no input carries witness data: that form is not
    /// decodable, so the legacy bytes are returned instead.
    pub fn serialize(&self, include_witness: bool) -> Vec<u8> {
        let extended = include_witness && self.has_witness();
        let mut out = Vec::new();

        write_u32_le(&mut out, self.version);
        if extended {
            out.push(SEGWIT_MARKER);
            out.push(SEGWIT_FLAG);
        }

        write_compact_size(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            input.encode(&mut out);
        }

        write_compact_size(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.encode(&mut out);
        }

        if extended {
            for input in &self.inputs {
                input.encode_witness(&mut out);
            }
        }

        write_u32_le(&mut out, self.lock_time);
        out
    }

    /// Bytes as broadcast: witness form when there is witness data
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize(true)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, SerializationError> {
        let mut decoder = Decoder::new(bytes);
        let version = decoder.read_u32_le()?;

        // A legacy transaction never has zero inputs, so a zero where the input
        // count should be is the segwit marker
        let extended = decoder.peek_u8()? == SEGWIT_MARKER;
        if extended {
            decoder.read_u8()?;
            let flag = decoder.read_u8()?;
            if flag != SEGWIT_FLAG {
                return Err(SerializationError::InvalidWitnessFlag(flag));
            }
        }

        // outpoint + empty script + sequence
        let input_count = decoder.read_count(41)?;
        let mut inputs = (0..input_count)
            .map(|_| TxInput::decode(&mut decoder))
            .collect::<Result<Vec<_>, _>>()?;

        // value + empty script
        let output_count = decoder.read_count(9)?;
        let outputs = (0..output_count)
            .map(|_| TxOutput::decode(&mut decoder))
            .collect::<Result<Vec<_>, _>>()?;

        if extended {
            for input in &mut inputs {
                input.decode_witness(&mut decoder)?;
            }
            if inputs.iter().all(|input| input.witness.is_empty()) {
                return Err(SerializationError::SuperfluousWitness);
            }
        }

        let lock_time = decoder.read_u32_le()?;
        decoder.finish()?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub fn from_hex(data: &str) -> Result<Self, Error> {
        let bytes = hex::decode(data.trim())?;
        Ok(Transaction::deserialize(&bytes)?)
    }

    /// Double-SHA256 of the legacy serialization
    pub fn txid(&self) -> sha256d::Hash {
        sha256d::Hash::hash(&self.serialize(false))
    }

    /// Double-SHA256 of the witness serialization
    pub fn wtxid(&self) -> sha256d::Hash {
        sha256d::Hash::hash(&self.serialize(true))
    }
}
