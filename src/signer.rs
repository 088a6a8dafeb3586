use std::fmt;

use log::debug;

use rand::Rng;
use serde::{Deserialize, Serialize};

use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use crate::Error;

/// Smallest and largest strict-DER ECDSA signatures, without the sighash byte
pub const MIN_DER_LEN: usize = 8;
pub const MAX_DER_LEN: usize = 72;

/// Signing capability for one key
pub trait Signer {
    type Error: Into<Error> + std::fmt::Debug;

    fn public_key(&self) -> PublicKey;

    /// Returns the DER encoding of an ECDSA signature over `digest`
    fn sign(&self, digest: &[u8; 32]) -> Result<Vec<u8>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureEncodingError {
    InvalidLength(usize),
    NotStrictDer,
    SighashTypeOutOfRange(u32),
}

impl fmt::Display for SignatureEncodingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignatureEncodingError::InvalidLength(len) => write!(
                f,
                "DER signature is {} bytes, expected {} to {}",
                len, MIN_DER_LEN, MAX_DER_LEN
            ),
            SignatureEncodingError::NotStrictDer => write!(f, "signature is not strict DER"),
            SignatureEncodingError::SighashTypeOutOfRange(ty) => {
                write!(f, "sighash type {:#x} does not fit in one byte", ty)
            }
        }
    }
}

impl std::error::Error for SignatureEncodingError {}

/// BIP66 strict DER check of a signature without its sighash byte
pub fn is_strict_der(sig: &[u8]) -> bool {
    let len = sig.len();
    if len < MIN_DER_LEN || len > MAX_DER_LEN {
        return false;
    }
    if sig[0] != 0x30 || sig[1] as usize != len - 2 {
        return false;
    }

    let len_r = sig[3] as usize;
    if 5 + len_r >= len {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 6 != len {
        return false;
    }

    // R
    if sig[2] != 0x02 || len_r == 0 || sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return false;
    }

    // S
    if sig[len_r + 4] != 0x02 || len_s == 0 || sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    }

    true
}

/// DER signature followed by the sighash type byte, as it appears on the stack
pub fn encode_signature_with_sighash_type(
    der: &[u8],
    sighash_type: u32,
) -> Result<Vec<u8>, SignatureEncodingError> {
    if der.len() < MIN_DER_LEN || der.len() > MAX_DER_LEN {
        return Err(SignatureEncodingError::InvalidLength(der.len()));
    }
    if !is_strict_der(der) {
        return Err(SignatureEncodingError::NotStrictDer);
    }
    if sighash_type > 0xff {
        return Err(SignatureEncodingError::SighashTypeOutOfRange(sighash_type));
    }

    let mut encoded = Vec::with_capacity(der.len() + 1);
    encoded.extend_from_slice(der);
    encoded.push(sighash_type as u8);
    Ok(encoded)
}

/// secp256k1 secret key with its compressed public key
#[derive(Debug, Clone, Copy)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn from_secret_key<C: bitcoin::secp256k1::Signing>(
        secp: &Secp256k1<C>,
        secret: SecretKey,
    ) -> Self {
        KeyPair {
            secret,
            public: PublicKey::from_secret_key(secp, &secret),
        }
    }

    pub fn from_secret_hex<C: bitcoin::secp256k1::Signing>(
        secp: &Secp256k1<C>,
        data: &str,
    ) -> Result<Self, Error> {
        let bytes = hex::decode(data.trim())?;
        let secret = SecretKey::from_slice(&bytes)?;
        Ok(KeyPair::from_secret_key(secp, secret))
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}

/// How the ECDSA nonce is picked
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceMode {
    /// RFC6979
    #[default]
    Deterministic,
    /// RFC6979 mixed with 32 random bytes
    Randomized,
}

#[derive(Debug, Clone)]
pub struct SoftwareSigner {
    keypair: KeyPair,
    nonce_mode: NonceMode,
    secp: Secp256k1<All>,
}

impl SoftwareSigner {
    pub fn new(keypair: KeyPair, nonce_mode: NonceMode) -> Self {
        SoftwareSigner {
            keypair,
            nonce_mode,
            secp: Secp256k1::new(),
        }
    }

    pub fn from_secret_hex(data: &str, nonce_mode: NonceMode) -> Result<Self, Error> {
        let secp = Secp256k1::new();
        let keypair = KeyPair::from_secret_hex(&secp, data)?;

        Ok(SoftwareSigner {
            keypair,
            nonce_mode,
            secp,
        })
    }
}

impl Signer for SoftwareSigner {
    type Error = Error;

    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    fn sign(&self, digest: &[u8; 32]) -> Result<Vec<u8>, Self::Error> {
        let message = Message::from_digest(*digest);
        let signature = match self.nonce_mode {
            NonceMode::Deterministic => self.secp.sign_ecdsa(&message, self.keypair.secret_key()),
            NonceMode::Randomized => {
                let extra_entropy: [u8; 32] = rand::thread_rng().gen();
                self.secp
                    .sign_ecdsa_with_noncedata(&message, self.keypair.secret_key(), &extra_entropy)
            }
        };

        debug!("signature by {}: {}", self.keypair.public_key(), signature);

        Ok(signature.serialize_der().to_vec())
    }
}
