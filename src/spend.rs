use std::convert::TryFrom;

use log::{debug, info};

use crate::address::{derive_p2sh_address, Address, NetworkParams};
use crate::coins::{Coin, MemoryCoinView};
use crate::config::SpendConfig;
use crate::script::{derive_witness_program, RedeemScript, WitnessProgram};
use crate::sighash::compute_sighash;
use crate::signer::{encode_signature_with_sighash_type, Signer};
use crate::transaction::{OutPoint, Transaction, TxInput, TxOutput};
use crate::verify::VerifiedTransaction;
use crate::witness::{assemble_witness, order_by_key_position};
use crate::Error;

/// Single-input, single-output spend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendRequest {
    pub previous_output: OutPoint,
    pub destination: Vec<u8>,
    pub amount: u64,
    pub version: u32,
    pub lock_time: u32,
    pub sequence: u32,
}

/// An m-of-n multisig wrapped as P2SH-P2WSH
#[derive(Debug, Clone)]
pub struct MultisigSpend {
    redeem_script: RedeemScript,
    program: WitnessProgram,
    params: NetworkParams,
}

impl MultisigSpend {
    pub fn new(redeem_script: RedeemScript, params: NetworkParams) -> Self {
        let program = derive_witness_program(&redeem_script);
        debug!("redeem script: {}", redeem_script);
        debug!("witness program: {}", hex::encode(program.script_pubkey()));

        MultisigSpend {
            redeem_script,
            program,
            params,
        }
    }

    pub fn redeem_script(&self) -> &RedeemScript {
        &self.redeem_script
    }

    pub fn witness_program(&self) -> &WitnessProgram {
        &self.program
    }

    pub fn address(&self) -> Address {
        derive_p2sh_address(&self.program, &self.params)
    }

    pub fn script_pubkey(&self) -> Vec<u8> {
        self.program.script_hash().script_pubkey()
    }

    /// Output locked to this multisig
    pub fn coin(&self, value: u64) -> Coin {
        Coin {
            value,
            script_pubkey: self.script_pubkey(),
        }
    }

    /// The scriptSig is already final, only the witness is missing
    pub fn unsigned_transaction(&self, request: &SpendRequest) -> Transaction {
        Transaction {
            version: request.version,
            inputs: vec![TxInput::new(
                request.previous_output,
                self.program.p2sh_script_sig(),
                request.sequence,
            )],
            outputs: vec![TxOutput {
                value: request.amount,
                script_pubkey: request.destination.clone(),
            }],
            lock_time: request.lock_time,
        }
    }

    pub fn sign<S: Signer>(
        &self,
        tx: &mut Transaction,
        input_index: usize,
        amount: u64,
        sighash_type: u32,
        signers: &[S],
    ) -> Result<(), Error> {
        sign_input(
            tx,
            input_index,
            &self.redeem_script,
            amount,
            sighash_type,
            signers,
        )
    }
}

/// Signs one input with the first `m` signers in redeem script key order and
/// attaches the witness. Signers may be passed in any order.
pub fn sign_input<S: Signer>(
    tx: &mut Transaction,
    input_index: usize,
    redeem_script: &RedeemScript,
    amount: u64,
    sighash_type: u32,
    signers: &[S],
) -> Result<(), Error> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(Error::InputIndexOutOfRange {
            index: input_index,
            inputs: tx.inputs.len(),
        })?;
    if !input.witness.is_empty() {
        return Err(Error::AlreadySigned(input_index));
    }

    let required = redeem_script.required_signatures();
    let ordered = order_by_key_position(
        signers.iter().map(|s| (s.public_key(), s)).collect(),
        redeem_script,
    )?;
    if ordered.len() < required {
        return Err(Error::KeyCountMismatch {
            expected: required,
            found: ordered.len(),
        });
    }

    let digest = compute_sighash(tx, input_index, redeem_script.as_bytes(), amount, sighash_type)?;
    debug!("sighash for input {}: {}", input_index, hex::encode(digest));

    let signatures = ordered
        .into_iter()
        .take(required)
        .map(|(position, signer)| {
            let der = signer.sign(&digest).map_err(Into::<Error>::into)?;
            debug!("signature for key {}: {}", position, hex::encode(&der));

            Ok(encode_signature_with_sighash_type(&der, sighash_type)?)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    tx.inputs[input_index].witness = assemble_witness(&signatures, redeem_script)?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct SpendOutcome {
    pub address: Address,
    pub redeem_script: RedeemScript,
    pub transaction: VerifiedTransaction,
}

/// Builds, signs and checks the spend described by `config`
pub fn run(config: &SpendConfig) -> Result<SpendOutcome, Error> {
    let spend = MultisigSpend::new(config.redeem_script()?, config.network.params());
    info!("address: {}", spend.address());

    let request = SpendRequest {
        previous_output: config.outpoint()?,
        destination: config.destination_script()?,
        amount: config.amount,
        version: config.version,
        lock_time: config.lock_time,
        sequence: config.sequence,
    };
    let mut tx = spend.unsigned_transaction(&request);
    debug!("unsigned transaction: {}", tx.to_hex());

    let signers = config.signers()?;
    spend.sign(&mut tx, 0, config.input_amount, config.sighash_type, &signers)?;
    debug!("signed transaction: {}", tx.to_hex());

    let mut view = MemoryCoinView::new();
    view.add_coin(request.previous_output, spend.coin(config.input_amount));
    let transaction = VerifiedTransaction::try_from((tx, &view))?;

    info!("verified transaction {}", transaction.txid());

    Ok(SpendOutcome {
        address: spend.address(),
        redeem_script: spend.redeem_script,
        transaction,
    })
}
