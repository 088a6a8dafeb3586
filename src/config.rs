use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use serde::{Deserialize, Serialize};

use bitcoin::secp256k1::PublicKey;

use crate::address::{Address, Network};
use crate::script::{build_multisig_redeem_script, parse_public_key, RedeemScript};
use crate::sighash::SIGHASH_ALL;
use crate::signer::{NonceMode, SoftwareSigner};
use crate::transaction::OutPoint;
use crate::Error;

fn default_network() -> Network {
    Network::Bitcoin
}

fn default_version() -> u32 {
    2
}

fn default_sequence() -> u32 {
    0xFFFF_FFFF
}

fn default_sighash_type() -> u32 {
    SIGHASH_ALL
}

fn default_output() -> PathBuf {
    PathBuf::from("out.txt")
}

/// Output being spent, txid in display hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevoutConfig {
    pub txid: String,
    pub vout: u32,
}

impl Default for PrevoutConfig {
    fn default() -> Self {
        PrevoutConfig {
            txid: "00".repeat(32),
            vout: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Base58 address of the configured network
    Address(String),
    /// Raw scriptPubKey in hex
    Script(String),
}

/// Everything needed to build and sign the spend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendConfig {
    #[serde(default = "default_network")]
    pub network: Network,

    /// `m` of the m-of-n pair
    pub threshold: usize,
    /// `n`, must equal the number of public keys
    pub total: usize,
    /// In redeem script order
    pub public_keys: Vec<String>,
    pub private_keys: Vec<String>,
    /// When set, must match the script built from `threshold`, `total` and
    /// `public_keys`
    #[serde(default)]
    pub redeem_script: Option<String>,

    #[serde(default)]
    pub prevout: PrevoutConfig,
    pub input_amount: u64,
    pub amount: u64,
    pub destination: Destination,

    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub lock_time: u32,
    #[serde(default = "default_sequence")]
    pub sequence: u32,
    #[serde(default = "default_sighash_type")]
    pub sighash_type: u32,
    #[serde(default)]
    pub nonce: NonceMode,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl SpendConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!("loading spend config from {}", path.display());

        let data = fs::read_to_string(path)?;
        SpendConfig::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, Error> {
        let config: SpendConfig = serde_json::from_str(data)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.amount > self.input_amount {
            return Err(Error::Config(format!(
                "amount {} exceeds the input amount {}",
                self.amount, self.input_amount
            )));
        }
        if self.sighash_type != SIGHASH_ALL {
            return Err(Error::Config(format!(
                "sighash type {:#x} is not supported, only SIGHASH_ALL",
                self.sighash_type
            )));
        }
        if self.private_keys.is_empty() {
            return Err(Error::Config("no private keys".into()));
        }

        Ok(())
    }

    pub fn public_keys(&self) -> Result<Vec<PublicKey>, Error> {
        self.public_keys
            .iter()
            .map(|key| parse_public_key(key))
            .collect()
    }

    pub fn redeem_script(&self) -> Result<RedeemScript, Error> {
        let keys = self.public_keys()?;
        let script = build_multisig_redeem_script(self.threshold, self.total, &keys)?;

        if let Some(expected) = &self.redeem_script {
            if RedeemScript::from_hex(expected)? != script {
                return Err(Error::Config(format!(
                    "redeem script {} does not match the configured keys",
                    expected
                )));
            }
        }

        Ok(script)
    }

    pub fn outpoint(&self) -> Result<OutPoint, Error> {
        OutPoint::from_display_hex(&self.prevout.txid, self.prevout.vout)
    }

    pub fn destination_script(&self) -> Result<Vec<u8>, Error> {
        match &self.destination {
            Destination::Address(address) => {
                Ok(Address::from_base58(address, &self.network.params())?.script_pubkey())
            }
            Destination::Script(script) => Ok(hex::decode(script)?),
        }
    }

    pub fn signers(&self) -> Result<Vec<SoftwareSigner>, Error> {
        self.private_keys
            .iter()
            .map(|key| SoftwareSigner::from_secret_hex(key, self.nonce))
            .collect()
    }
}
