use std::fmt;

use log::trace;

use bitcoin::hashes::{hash160, sha256, Hash};
use bitcoin::secp256k1::PublicKey;

use crate::verify::ScriptError;
use crate::Error;

/// Opcodes used by the builder and the interpreter
pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHBYTES_75: u8 = 0x4b;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1NEGATE: u8 = 0x4f;
    pub const OP_1: u8 = 0x51;
    pub const OP_16: u8 = 0x60;
    pub const OP_NOP: u8 = 0x61;
    pub const OP_VERIFY: u8 = 0x69;
    pub const OP_DROP: u8 = 0x75;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_SHA256: u8 = 0xa8;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_HASH256: u8 = 0xaa;
    pub const OP_CODESEPARATOR: u8 = 0xab;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_CHECKSIGVERIFY: u8 = 0xad;
    pub const OP_CHECKMULTISIG: u8 = 0xae;
    pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
}

use opcodes::*;

pub const MAX_MULTISIG_KEYS: usize = 16;

/// Appends the shortest push of `data`
pub fn push_data(out: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len <= OP_PUSHBYTES_75 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
}

/// `OP_1` .. `OP_16`
pub fn small_int_opcode(value: usize) -> Option<u8> {
    match value {
        1..=16 => Some(OP_1 + value as u8 - 1),
        _ => None,
    }
}

pub fn decode_small_int(opcode: u8) -> Option<usize> {
    match opcode {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some((opcode - OP_1) as usize + 1),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    Push(&'a [u8]),
    Op(u8),
}

/// Iterator over the instructions of a raw script
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    script: &'a [u8],
    position: usize,
}

pub fn instructions(script: &[u8]) -> Instructions<'_> {
    Instructions {
        script,
        position: 0,
    }
}

impl<'a> Instructions<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ScriptError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.script.len())
            .ok_or(ScriptError::BadPush)?;
        let slice = &self.script[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn next_instruction(&mut self) -> Result<Instruction<'a>, ScriptError> {
        let opcode = self.take(1)?[0];
        let len = match opcode {
            0x01..=OP_PUSHBYTES_75 => opcode as usize,
            OP_PUSHDATA1 => self.take(1)?[0] as usize,
            OP_PUSHDATA2 => {
                let raw = self.take(2)?;
                u16::from_le_bytes([raw[0], raw[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let raw = self.take(4)?;
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
            }
            _ => return Ok(Instruction::Op(opcode)),
        };

        Ok(Instruction::Push(self.take(len)?))
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.script.len() {
            return None;
        }

        let result = self.next_instruction();
        if result.is_err() {
            // stop after the first malformed push
            self.position = self.script.len();
        }
        Some(result)
    }
}

pub fn is_push_only(script: &[u8]) -> bool {
    instructions(script).all(|ins| match ins {
        Ok(Instruction::Push(_)) => true,
        Ok(Instruction::Op(op)) => op <= OP_16,
        Err(_) => false,
    })
}

/// `OP_m <pubkey_1> ... <pubkey_n> OP_n OP_CHECKMULTISIG`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemScript {
    bytes: Vec<u8>,
    threshold: usize,
    public_keys: Vec<PublicKey>,
}

pub fn build_multisig_redeem_script(
    m: usize,
    n: usize,
    public_keys: &[PublicKey],
) -> Result<RedeemScript, Error> {
    if m == 0 || n == 0 || m > n || n > MAX_MULTISIG_KEYS {
        return Err(Error::InvalidThreshold {
            required: m,
            total: n,
        });
    }
    if public_keys.len() != n {
        return Err(Error::KeyCountMismatch {
            expected: n,
            found: public_keys.len(),
        });
    }
    // each key may appear once
    if let Some(key) = public_keys
        .iter()
        .enumerate()
        .find(|(i, key)| public_keys[..*i].contains(*key))
        .map(|(_, key)| key)
    {
        return Err(Error::DuplicateKey(*key));
    }

    let mut bytes = Vec::with_capacity(3 + n * 34);
    bytes.extend(small_int_opcode(m));
    for key in public_keys {
        push_data(&mut bytes, &key.serialize());
    }
    bytes.extend(small_int_opcode(n));
    bytes.push(OP_CHECKMULTISIG);

    trace!("built {}-of-{} redeem script {}", m, n, hex::encode(&bytes));

    Ok(RedeemScript {
        bytes,
        threshold: m,
        public_keys: public_keys.to_vec(),
    })
}

impl RedeemScript {
    /// Parses raw bytes, accepting only the bare multisig template with
    /// compressed keys
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let parsed = instructions(&bytes).collect::<Result<Vec<_>, _>>();
        let instructions = match parsed {
            Ok(instructions) if instructions.len() >= 4 => instructions,
            _ => return Err(Error::NotMultisig),
        };

        let count = instructions.len();
        let (threshold, total) = match (
            instructions[0],
            instructions[count - 2],
            instructions[count - 1],
        ) {
            (Instruction::Op(m), Instruction::Op(n), Instruction::Op(OP_CHECKMULTISIG)) => {
                match (decode_small_int(m), decode_small_int(n)) {
                    (Some(m), Some(n)) => (m, n),
                    _ => return Err(Error::NotMultisig),
                }
            }
            _ => return Err(Error::NotMultisig),
        };

        let public_keys = instructions[1..count - 2]
            .iter()
            .map(|ins| match ins {
                Instruction::Push(data) if data.len() == 33 => {
                    PublicKey::from_slice(data).map_err(Error::from)
                }
                _ => Err(Error::NotMultisig),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if public_keys.len() != total {
            return Err(Error::KeyCountMismatch {
                expected: total,
                found: public_keys.len(),
            });
        }

        // rebuilding also rejects non-minimal pushes and bad thresholds
        let rebuilt = build_multisig_redeem_script(threshold, total, &public_keys)?;
        if rebuilt.bytes != bytes {
            return Err(Error::NotMultisig);
        }
        Ok(rebuilt)
    }

    pub fn from_hex(data: &str) -> Result<Self, Error> {
        RedeemScript::from_bytes(hex::decode(data)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// `m`
    pub fn required_signatures(&self) -> usize {
        self.threshold
    }

    pub fn public_keys(&self) -> &[PublicKey] {
        &self.public_keys
    }

    pub fn key_position(&self, key: &PublicKey) -> Option<usize> {
        self.public_keys.iter().position(|k| k == key)
    }
}

impl AsRef<[u8]> for RedeemScript {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for RedeemScript {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Version 0 witness program committing to a witness script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WitnessProgram {
    program: [u8; 32],
}

pub fn derive_witness_program(redeem_script: &RedeemScript) -> WitnessProgram {
    WitnessProgram::from_script(redeem_script.as_bytes())
}

impl WitnessProgram {
    pub fn from_script(script: &[u8]) -> Self {
        WitnessProgram {
            program: sha256::Hash::hash(script).to_byte_array(),
        }
    }

    pub fn version(&self) -> u8 {
        0
    }

    pub fn program(&self) -> &[u8; 32] {
        &self.program
    }

    /// `0x00 0x20 <sha256>`
    pub fn script_pubkey(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(34);
        script.push(OP_0);
        push_data(&mut script, &self.program);
        script
    }

    pub fn script_hash(&self) -> ScriptHash {
        ScriptHash::of(&self.script_pubkey())
    }

    /// scriptSig of a P2SH-P2WSH spend: a single push of the program
    pub fn p2sh_script_sig(&self) -> Vec<u8> {
        let mut script_sig = Vec::with_capacity(35);
        push_data(&mut script_sig, &self.script_pubkey());
        script_sig
    }
}

/// Splits a scriptPubKey into witness version and program, if it is one
pub fn parse_witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }

    let version = match script[0] {
        OP_0 => 0,
        op @ OP_1..=OP_16 => op - OP_1 + 1,
        _ => return None,
    };
    if script[1] as usize + 2 != script.len() {
        return None;
    }

    Some((version, &script[2..]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHash(pub [u8; 20]);

impl ScriptHash {
    pub fn of(script: &[u8]) -> Self {
        ScriptHash(hash160::Hash::hash(script).to_byte_array())
    }

    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    pub fn script_pubkey(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(23);
        script.push(OP_HASH160);
        push_data(&mut script, &self.0);
        script.push(OP_EQUAL);
        script
    }

    pub fn from_script_pubkey(script: &[u8]) -> Option<Self> {
        match script {
            [OP_HASH160, 0x14, hash @ .., OP_EQUAL] if hash.len() == 20 => {
                let mut bytes = [0u8; 20];
                bytes.copy_from_slice(hash);
                Some(ScriptHash(bytes))
            }
            _ => None,
        }
    }
}

/// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script_pubkey(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

pub fn parse_public_key(data: &str) -> Result<PublicKey, Error> {
    let bytes = hex::decode(data.trim())?;
    if bytes.len() != 33 {
        return Err(bitcoin::secp256k1::Error::InvalidPublicKey.into());
    }
    Ok(PublicKey::from_slice(&bytes)?)
}
