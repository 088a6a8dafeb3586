//! Spending a P2SH-wrapped P2WSH m-of-n multisig output
//!
//!   keys ──> redeem script ──> witness program ──> P2SH address
//!
//!   unsigned tx ──> BIP143 sighash ──> signatures ──> witness ──> signed tx
//!                                                                   │
//!                                                     verification ─┘

use std::fmt;

pub use bitcoin;
use bitcoin::secp256k1::{self, PublicKey};

pub mod address;
pub mod coins;
pub mod config;
pub mod encode;
pub mod script;
pub mod sighash;
pub mod signer;
pub mod spend;
pub mod transaction;
pub mod verify;
pub mod witness;

#[cfg(test)]
mod fixtures;

pub use address::{derive_p2sh_address, Address, Network};
pub use coins::{Coin, CoinView, MemoryCoinView};
pub use config::SpendConfig;
pub use script::{build_multisig_redeem_script, derive_witness_program, RedeemScript};
pub use sighash::compute_sighash;
pub use signer::{Signer, SoftwareSigner};
pub use spend::{sign_input, MultisigSpend};
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};
pub use verify::{verify, verify_transaction, VerifiedTransaction};
pub use witness::assemble_witness;

use address::AddressError;
use encode::SerializationError;
use signer::SignatureEncodingError;
use verify::VerificationFailure;

#[derive(Debug)]
pub enum Error {
    InvalidThreshold { required: usize, total: usize },
    KeyCountMismatch { expected: usize, found: usize },
    UnknownKey(PublicKey),
    DuplicateKey(PublicKey),
    NotMultisig,
    InputIndexOutOfRange { index: usize, inputs: usize },
    AlreadySigned(usize),

    Serialization(SerializationError),
    SignatureEncoding(SignatureEncodingError),
    Verification(VerificationFailure),
    Address(AddressError),
    Config(String),

    Secp256k1(secp256k1::Error),
    Hex(hex::FromHexError),
    Serde(serde_json::Error),
    IO(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidThreshold { required, total } => {
                write!(f, "invalid threshold {}-of-{}", required, total)
            }
            Error::KeyCountMismatch { expected, found } => {
                write!(f, "expected {} keys or signatures, found {}", expected, found)
            }
            Error::UnknownKey(key) => write!(f, "key {} is not part of the redeem script", key),
            Error::DuplicateKey(key) => {
                write!(f, "key {} appears more than once in the redeem script", key)
            }
            Error::NotMultisig => write!(f, "script is not a bare multisig script"),
            Error::InputIndexOutOfRange { index, inputs } => write!(
                f,
                "input index {} out of range, transaction has {} inputs",
                index, inputs
            ),
            Error::AlreadySigned(index) => write!(f, "input {} already carries a witness", index),
            Error::Serialization(e) => write!(f, "serialization error: {}", e),
            Error::SignatureEncoding(e) => write!(f, "signature encoding error: {}", e),
            Error::Verification(e) => write!(f, "verification failed at {}", e),
            Error::Address(e) => write!(f, "address error: {}", e),
            Error::Config(e) => write!(f, "configuration error: {}", e),
            Error::Secp256k1(e) => write!(f, "secp256k1 error: {}", e),
            Error::Hex(e) => write!(f, "hex error: {}", e),
            Error::Serde(e) => write!(f, "json error: {}", e),
            Error::IO(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<SerializationError> for Error {
    fn from(other: SerializationError) -> Self {
        Error::Serialization(other)
    }
}

impl From<SignatureEncodingError> for Error {
    fn from(other: SignatureEncodingError) -> Self {
        Error::SignatureEncoding(other)
    }
}

impl From<VerificationFailure> for Error {
    fn from(other: VerificationFailure) -> Self {
        Error::Verification(other)
    }
}

impl From<AddressError> for Error {
    fn from(other: AddressError) -> Self {
        Error::Address(other)
    }
}

impl From<secp256k1::Error> for Error {
    fn from(other: secp256k1::Error) -> Self {
        Error::Secp256k1(other)
    }
}

impl From<hex::FromHexError> for Error {
    fn from(other: hex::FromHexError) -> Self {
        Error::Hex(other)
    }
}

impl From<serde_json::Error> for Error {
    fn from(other: serde_json::Error) -> Self {
        Error::Serde(other)
    }
}

impl From<std::io::Error> for Error {
    fn from(other: std::io::Error) -> Self {
        Error::IO(other)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(other: std::convert::Infallible) -> Self {
        match other {}
    }
}
