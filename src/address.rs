use std::fmt;

use serde::{Deserialize, Serialize};

use bitcoin::base58;

use crate::script::{p2pkh_script_pubkey, ScriptHash, WitnessProgram};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Bitcoin,
    Testnet,
    Regtest,
}

impl Network {
    pub fn params(self) -> NetworkParams {
        match self {
            Network::Bitcoin => NetworkParams {
                p2pkh_prefix: 0x00,
                p2sh_prefix: 0x05,
            },
            Network::Testnet | Network::Regtest => NetworkParams {
                p2pkh_prefix: 0x6f,
                p2sh_prefix: 0xc4,
            },
        }
    }
}

/// Base58 version bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub p2pkh_prefix: u8,
    pub p2sh_prefix: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    Base58(String),
    InvalidLength(usize),
    UnknownPrefix(u8),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressError::Base58(e) => write!(f, "base58 decoding failed: {}", e),
            AddressError::InvalidLength(len) => {
                write!(f, "address payload is {} bytes, expected 21", len)
            }
            AddressError::UnknownPrefix(prefix) => {
                write!(f, "version byte 0x{:02x} not valid for this network", prefix)
            }
        }
    }
}

impl std::error::Error for AddressError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    ScriptHash(ScriptHash),
    PubkeyHash([u8; 20]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub payload: Payload,
    pub params: NetworkParams,
}

pub fn derive_p2sh_address(program: &WitnessProgram, params: &NetworkParams) -> Address {
    Address {
        payload: Payload::ScriptHash(program.script_hash()),
        params: *params,
    }
}

impl Address {
    pub fn from_base58(address: &str, params: &NetworkParams) -> Result<Address, AddressError> {
        let data = base58::decode_check(address).map_err(|e| AddressError::Base58(e.to_string()))?;
        if data.len() != 21 {
            return Err(AddressError::InvalidLength(data.len()));
        }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data[1..]);

        let payload = match data[0] {
            prefix if prefix == params.p2sh_prefix => Payload::ScriptHash(ScriptHash(hash)),
            prefix if prefix == params.p2pkh_prefix => Payload::PubkeyHash(hash),
            prefix => return Err(AddressError::UnknownPrefix(prefix)),
        };

        Ok(Address {
            payload,
            params: *params,
        })
    }

    pub fn script_pubkey(&self) -> Vec<u8> {
        match &self.payload {
            Payload::ScriptHash(hash) => hash.script_pubkey(),
            Payload::PubkeyHash(hash) => p2pkh_script_pubkey(hash),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut data = Vec::with_capacity(21);
        match &self.payload {
            Payload::ScriptHash(hash) => {
                data.push(self.params.p2sh_prefix);
                data.extend_from_slice(&hash.0);
            }
            Payload::PubkeyHash(hash) => {
                data.push(self.params.p2pkh_prefix);
                data.extend_from_slice(hash);
            }
        }

        f.write_str(&base58::encode_check(&data))
    }
}
