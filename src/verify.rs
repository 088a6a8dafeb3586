//! Script verification of finished transactions
//!
//! A small interpreter covering what standard P2SH, P2WSH and P2WPKH spends
//! need, with the policy flags Bitcoin Core enforces on relay: strict DER,
//! defined sighash types, compressed keys in witness scripts, NULLDUMMY,
//! NULLFAIL, clean stack and no witness on non-witness inputs.

use std::convert::TryFrom;
use std::fmt;
use std::ops::Deref;

use log::{debug, trace, warn};

use bitcoin::hashes::{hash160, sha256, sha256d, Hash};
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};

use crate::coins::{Coin, CoinView};
use crate::script::opcodes::*;
use crate::script::{
    instructions, is_push_only, p2pkh_script_pubkey, parse_witness_program, push_data, Instruction,
    ScriptHash,
};
use crate::sighash::{SighashComponents, SIGHASH_ALL};
use crate::signer::is_strict_der;
use crate::transaction::Transaction;
use crate::Error;

pub const MAX_SCRIPT_SIZE: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_STACK_SIZE: usize = 1_000;
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    MissingCoin,
    BadPush,
    BadOpcode(u8),
    ScriptSize,
    PushSize,
    StackSize,
    InvalidStackOperation,
    MinimalData,
    NumberOverflow,
    Verify,
    EqualVerify,
    CheckSigVerify,
    CheckMultisigVerify,
    EvalFalse,
    ScriptSigNotPushOnly,
    PubkeyCount,
    SigCount,
    SigDer,
    SigHashType(u8),
    PubkeyType,
    SigNullDummy,
    NullFail,
    CleanStack,
    LegacySignature,
    WitnessProgramWrongLength,
    WitnessProgramWitnessEmpty,
    WitnessProgramMismatch,
    WitnessMalleated,
    WitnessMalleatedP2sh,
    WitnessUnexpected,
    UnsupportedWitnessVersion(u8),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScriptError::MissingCoin => write!(f, "spent output is unknown"),
            ScriptError::BadPush => write!(f, "push runs past the end of the script"),
            ScriptError::BadOpcode(op) => write!(f, "opcode 0x{:02x} is not supported", op),
            ScriptError::ScriptSize => write!(f, "script exceeds {} bytes", MAX_SCRIPT_SIZE),
            ScriptError::PushSize => {
                write!(f, "stack element exceeds {} bytes", MAX_SCRIPT_ELEMENT_SIZE)
            }
            ScriptError::StackSize => write!(f, "stack exceeds {} elements", MAX_STACK_SIZE),
            ScriptError::InvalidStackOperation => write!(f, "operation on too small a stack"),
            ScriptError::MinimalData => write!(f, "number is not minimally encoded"),
            ScriptError::NumberOverflow => write!(f, "number exceeds 4 bytes"),
            ScriptError::Verify => write!(f, "OP_VERIFY failed"),
            ScriptError::EqualVerify => write!(f, "OP_EQUALVERIFY failed"),
            ScriptError::CheckSigVerify => write!(f, "OP_CHECKSIGVERIFY failed"),
            ScriptError::CheckMultisigVerify => write!(f, "OP_CHECKMULTISIGVERIFY failed"),
            ScriptError::EvalFalse => write!(f, "script evaluated to false"),
            ScriptError::ScriptSigNotPushOnly => write!(f, "scriptSig is not push-only"),
            ScriptError::PubkeyCount => write!(f, "public key count out of range"),
            ScriptError::SigCount => write!(f, "signature count out of range"),
            ScriptError::SigDer => write!(f, "signature is not strict DER"),
            ScriptError::SigHashType(ty) => write!(f, "unsupported sighash type 0x{:02x}", ty),
            ScriptError::PubkeyType => write!(f, "public key is not compressed"),
            ScriptError::SigNullDummy => write!(f, "multisig dummy element is not empty"),
            ScriptError::NullFail => write!(
                f,
                "a non-empty signature failed to verify (wrong key, order or message)"
            ),
            ScriptError::CleanStack => write!(f, "stack not clean after execution"),
            ScriptError::LegacySignature => {
                write!(f, "signature checks outside witness scripts are not supported")
            }
            ScriptError::WitnessProgramWrongLength => write!(f, "witness program has wrong length"),
            ScriptError::WitnessProgramWitnessEmpty => write!(f, "witness is empty"),
            ScriptError::WitnessProgramMismatch => {
                write!(f, "witness script does not match the program")
            }
            ScriptError::WitnessMalleated => write!(f, "native witness spend has a scriptSig"),
            ScriptError::WitnessMalleatedP2sh => {
                write!(f, "scriptSig is not a single push of the witness program")
            }
            ScriptError::WitnessUnexpected => write!(f, "witness on a non-witness input"),
            ScriptError::UnsupportedWitnessVersion(v) => {
                write!(f, "witness version {} is not supported", v)
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// Why a transaction was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationFailure {
    pub input: usize,
    pub reason: ScriptError,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "input {}: {}", self.input, self.reason)
    }
}

impl std::error::Error for VerificationFailure {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SigVersion {
    Base,
    WitnessV0,
}

type Stack = Vec<Vec<u8>>;

fn pop(stack: &mut Stack) -> Result<Vec<u8>, ScriptError> {
    stack.pop().ok_or(ScriptError::InvalidStackOperation)
}

fn cast_to_bool(data: &[u8]) -> bool {
    match data.split_last() {
        None => false,
        // negative zero is false too
        Some((last, rest)) => rest.iter().any(|b| *b != 0) || (*last & 0x7f) != 0,
    }
}

fn encode_bool(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        vec![]
    }
}

fn decode_num(data: &[u8]) -> Result<i64, ScriptError> {
    if data.len() > 4 {
        return Err(ScriptError::NumberOverflow);
    }
    let (last, rest) = match data.split_last() {
        None => return Ok(0),
        Some(split) => split,
    };
    if *last & 0x7f == 0 && rest.last().map_or(true, |b| *b & 0x80 == 0) {
        return Err(ScriptError::MinimalData);
    }

    let mut value: i64 = 0;
    for (i, byte) in data.iter().enumerate() {
        value |= (*byte as i64) << (8 * i);
    }
    if *last & 0x80 != 0 {
        let sign_bit = 0x80i64 << (8 * (data.len() - 1));
        Ok(-(value & !sign_bit))
    } else {
        Ok(value)
    }
}

fn is_compressed_key(pubkey: &[u8]) -> bool {
    pubkey.len() == 33 && (pubkey[0] == 0x02 || pubkey[0] == 0x03)
}

/// Signature checks for one input
struct Checker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    amount: u64,
    comp: &'a SighashComponents,
    secp: &'a Secp256k1<VerifyOnly>,
}

impl<'a> Checker<'a> {
    fn check_sig(
        &self,
        sig: &[u8],
        pubkey: &[u8],
        script_code: &[u8],
        sigversion: SigVersion,
    ) -> Result<bool, ScriptError> {
        let (hash_type, der) = match sig.split_last() {
            None => return Ok(false),
            Some(split) => split,
        };

        if !is_strict_der(der) {
            return Err(ScriptError::SigDer);
        }
        if *hash_type as u32 != SIGHASH_ALL {
            return Err(ScriptError::SigHashType(*hash_type));
        }
        if sigversion == SigVersion::Base {
            return Err(ScriptError::LegacySignature);
        }
        if !is_compressed_key(pubkey) {
            return Err(ScriptError::PubkeyType);
        }

        let (pubkey, signature) = match (PublicKey::from_slice(pubkey), Signature::from_der(der)) {
            (Ok(pubkey), Ok(signature)) => (pubkey, signature),
            _ => return Ok(false),
        };

        let hash = self.comp.sighash(
            &self.tx.inputs[self.input_index],
            script_code,
            self.amount,
            *hash_type as u32,
        );
        let valid = self
            .secp
            .verify_ecdsa(&Message::from_digest(hash), &signature, &pubkey)
            .is_ok();
        trace!(
            "input {}: signature {} against {}: {}",
            self.input_index,
            hex::encode(sig),
            pubkey,
            valid
        );

        Ok(valid)
    }

    fn check_multisig(
        &self,
        stack: &mut Stack,
        script_code: &[u8],
        sigversion: SigVersion,
    ) -> Result<bool, ScriptError> {
        let key_count = decode_num(&pop(stack)?)?;
        if key_count < 0 || key_count > MAX_PUBKEYS_PER_MULTISIG {
            return Err(ScriptError::PubkeyCount);
        }
        let key_count = key_count as usize;
        if stack.len() < key_count {
            return Err(ScriptError::InvalidStackOperation);
        }
        // last key of the script first
        let keys = (0..key_count)
            .map(|_| pop(stack))
            .collect::<Result<Vec<_>, _>>()?;

        let sig_count = decode_num(&pop(stack)?)?;
        if sig_count < 0 || sig_count as usize > key_count {
            return Err(ScriptError::SigCount);
        }
        let sig_count = sig_count as usize;
        if stack.len() < sig_count + 1 {
            return Err(ScriptError::InvalidStackOperation);
        }
        // topmost signature first
        let sigs = (0..sig_count)
            .map(|_| pop(stack))
            .collect::<Result<Vec<_>, _>>()?;

        if !pop(stack)?.is_empty() {
            return Err(ScriptError::SigNullDummy);
        }

        let mut key_index = 0;
        let mut sig_index = 0;
        while sig_index < sigs.len() {
            if sigs.len() - sig_index > keys.len() - key_index {
                break;
            }
            if self.check_sig(&sigs[sig_index], &keys[key_index], script_code, sigversion)? {
                sig_index += 1;
            }
            key_index += 1;
        }
        let success = sig_index == sigs.len();

        if !success && sigs.iter().any(|sig| !sig.is_empty()) {
            return Err(ScriptError::NullFail);
        }
        Ok(success)
    }
}

fn eval(
    script: &[u8],
    stack: &mut Stack,
    sigversion: SigVersion,
    checker: &Checker,
) -> Result<(), ScriptError> {
    if script.len() > MAX_SCRIPT_SIZE {
        return Err(ScriptError::ScriptSize);
    }

    for ins in instructions(script) {
        match ins? {
            Instruction::Push(data) => {
                if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(ScriptError::PushSize);
                }
                stack.push(data.to_vec());
            }
            Instruction::Op(OP_0) => stack.push(vec![]),
            Instruction::Op(OP_1NEGATE) => stack.push(vec![0x81]),
            Instruction::Op(op @ OP_1..=OP_16) => stack.push(vec![op - OP_1 + 1]),
            Instruction::Op(OP_NOP) => {}
            Instruction::Op(OP_VERIFY) => {
                if !cast_to_bool(&pop(stack)?) {
                    return Err(ScriptError::Verify);
                }
            }
            Instruction::Op(OP_DROP) => {
                pop(stack)?;
            }
            Instruction::Op(OP_DUP) => {
                let top = stack.last().ok_or(ScriptError::InvalidStackOperation)?.clone();
                stack.push(top);
            }
            Instruction::Op(op @ OP_EQUAL) | Instruction::Op(op @ OP_EQUALVERIFY) => {
                let a = pop(stack)?;
                let b = pop(stack)?;
                if op == OP_EQUALVERIFY {
                    if a != b {
                        return Err(ScriptError::EqualVerify);
                    }
                } else {
                    stack.push(encode_bool(a == b));
                }
            }
            Instruction::Op(OP_SHA256) => {
                let data = pop(stack)?;
                stack.push(sha256::Hash::hash(&data).to_byte_array().to_vec());
            }
            Instruction::Op(OP_HASH160) => {
                let data = pop(stack)?;
                stack.push(hash160::Hash::hash(&data).to_byte_array().to_vec());
            }
            Instruction::Op(OP_HASH256) => {
                let data = pop(stack)?;
                stack.push(sha256d::Hash::hash(&data).to_byte_array().to_vec());
            }
            Instruction::Op(op @ OP_CHECKSIG) | Instruction::Op(op @ OP_CHECKSIGVERIFY) => {
                let pubkey = pop(stack)?;
                let sig = pop(stack)?;
                let success = checker.check_sig(&sig, &pubkey, script, sigversion)?;
                if !success && !sig.is_empty() {
                    return Err(ScriptError::NullFail);
                }

                if op == OP_CHECKSIGVERIFY {
                    if !success {
                        return Err(ScriptError::CheckSigVerify);
                    }
                } else {
                    stack.push(encode_bool(success));
                }
            }
            Instruction::Op(op @ OP_CHECKMULTISIG) | Instruction::Op(op @ OP_CHECKMULTISIGVERIFY) => {
                let success = checker.check_multisig(stack, script, sigversion)?;

                if op == OP_CHECKMULTISIGVERIFY {
                    if !success {
                        return Err(ScriptError::CheckMultisigVerify);
                    }
                } else {
                    stack.push(encode_bool(success));
                }
            }
            Instruction::Op(op) => return Err(ScriptError::BadOpcode(op)),
        }

        if stack.len() > MAX_STACK_SIZE {
            return Err(ScriptError::StackSize);
        }
    }

    Ok(())
}

fn verify_witness_program(
    version: u8,
    program: &[u8],
    witness: &[Vec<u8>],
    checker: &Checker,
) -> Result<(), ScriptError> {
    if version != 0 {
        return Err(ScriptError::UnsupportedWitnessVersion(version));
    }

    let (script, mut stack) = match program.len() {
        32 => {
            let (script, items) = witness
                .split_last()
                .ok_or(ScriptError::WitnessProgramWitnessEmpty)?;
            if sha256::Hash::hash(script).to_byte_array()[..] != program[..] {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            (script.clone(), items.to_vec())
        }
        20 => {
            if witness.len() != 2 {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            let mut hash = [0u8; 20];
            hash.copy_from_slice(program);
            (p2pkh_script_pubkey(&hash), witness.to_vec())
        }
        _ => return Err(ScriptError::WitnessProgramWrongLength),
    };

    if stack.iter().any(|item| item.len() > MAX_SCRIPT_ELEMENT_SIZE) {
        return Err(ScriptError::PushSize);
    }

    eval(&script, &mut stack, SigVersion::WitnessV0, checker)?;

    if stack.len() != 1 {
        return Err(ScriptError::CleanStack);
    }
    if !cast_to_bool(&stack[0]) {
        return Err(ScriptError::EvalFalse);
    }
    Ok(())
}

fn verify_input(checker: &Checker, coin: &Coin) -> Result<(), ScriptError> {
    let input = &checker.tx.inputs[checker.input_index];

    if !is_push_only(&input.script_sig) {
        return Err(ScriptError::ScriptSigNotPushOnly);
    }

    let mut stack = Stack::new();
    eval(&input.script_sig, &mut stack, SigVersion::Base, checker)?;
    let script_sig_stack = stack.clone();

    eval(&coin.script_pubkey, &mut stack, SigVersion::Base, checker)?;
    if !stack.last().map_or(false, |top| cast_to_bool(top)) {
        return Err(ScriptError::EvalFalse);
    }

    let mut witness_checked = false;

    if let Some((version, program)) = parse_witness_program(&coin.script_pubkey) {
        if !input.script_sig.is_empty() {
            return Err(ScriptError::WitnessMalleated);
        }
        verify_witness_program(version, program, &input.witness, checker)?;
        witness_checked = true;
        stack = vec![encode_bool(true)];
    } else if ScriptHash::from_script_pubkey(&coin.script_pubkey).is_some() {
        stack = script_sig_stack;
        let redeem_script = pop(&mut stack)?;

        eval(&redeem_script, &mut stack, SigVersion::Base, checker)?;
        if !stack.last().map_or(false, |top| cast_to_bool(top)) {
            return Err(ScriptError::EvalFalse);
        }

        if let Some((version, program)) = parse_witness_program(&redeem_script) {
            let mut expected = Vec::with_capacity(redeem_script.len() + 1);
            push_data(&mut expected, &redeem_script);
            if input.script_sig != expected {
                return Err(ScriptError::WitnessMalleatedP2sh);
            }

            verify_witness_program(version, program, &input.witness, checker)?;
            witness_checked = true;
            stack = vec![encode_bool(true)];
        }
    }

    if stack.len() != 1 {
        return Err(ScriptError::CleanStack);
    }
    if !witness_checked && !input.witness.is_empty() {
        return Err(ScriptError::WitnessUnexpected);
    }

    Ok(())
}

/// Checks every input of `tx` against the coins it spends
pub fn verify_transaction<V>(tx: &Transaction, view: &V) -> Result<(), Error>
where
    V: CoinView,
{
    let secp = Secp256k1::verification_only();
    let comp = SighashComponents::new(tx);

    for (index, input) in tx.inputs.iter().enumerate() {
        let failure = |reason: ScriptError| VerificationFailure {
            input: index,
            reason,
        };

        let coin = view
            .get_coin(&input.previous_output)
            .map_err(Into::<Error>::into)?
            .ok_or_else(|| failure(ScriptError::MissingCoin))?;

        let checker = Checker {
            tx,
            input_index: index,
            amount: coin.value,
            comp: &comp,
            secp: &secp,
        };
        verify_input(&checker, &coin).map_err(failure)?;

        debug!("input {} spending {} is valid", index, input.previous_output);
    }

    Ok(())
}

pub fn verify<V: CoinView>(tx: &Transaction, view: &V) -> bool {
    match verify_transaction(tx, view) {
        Ok(()) => true,
        Err(e) => {
            warn!("transaction {} rejected: {}", tx.txid(), e);
            false
        }
    }
}

/// Transaction whose every input passed [`verify_transaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransaction(Transaction);

impl VerifiedTransaction {
    pub fn into_inner(self) -> Transaction {
        self.0
    }
}

impl<V> TryFrom<(Transaction, &V)> for VerifiedTransaction
where
    V: CoinView,
{
    type Error = Error;

    fn try_from(data: (Transaction, &V)) -> Result<Self, Self::Error> {
        let (tx, view) = data;
        verify_transaction(&tx, view)?;

        Ok(VerifiedTransaction(tx))
    }
}

impl Deref for VerifiedTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Transaction {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coins::MemoryCoinView;
    use crate::fixtures::*;
    use crate::script::{parse_public_key, WitnessProgram};
    use crate::sighash::compute_sighash;
    use crate::signer::{encode_signature_with_sighash_type, NonceMode, Signer, SoftwareSigner};
    use crate::transaction::{OutPoint, TxInput, TxOutput};

    fn coin_view(value: u64) -> MemoryCoinView {
        let program = hex::decode(WITNESS_PROGRAM).unwrap();
        let mut view = MemoryCoinView::new();
        view.add_coin(
            OutPoint::null(),
            Coin {
                value,
                script_pubkey: ScriptHash::of(&program).script_pubkey(),
            },
        );
        view
    }

    fn signed() -> Transaction {
        Transaction::from_hex(SIGNED_TX).unwrap()
    }

    fn reason(tx: &Transaction, view: &MemoryCoinView) -> ScriptError {
        match verify_transaction(tx, view) {
            Err(Error::Verification(VerificationFailure { input: 0, reason })) => reason,
            other => panic!("unexpected result {:?}", other),
        }
    }

    fn template() -> Transaction {
        Transaction {
            version: 2,
            inputs: vec![TxInput::new(OutPoint::null(), vec![], 0xFFFF_FFFF)],
            outputs: vec![TxOutput {
                value: AMOUNT,
                script_pubkey: vec![OP_1],
            }],
            lock_time: 0,
        }
    }

    fn sign_with(key: &str, script_code: &[u8]) -> Vec<u8> {
        let digest = compute_sighash(&template(), 0, script_code, AMOUNT, SIGHASH_ALL).unwrap();
        let signer = SoftwareSigner::from_secret_hex(key, NonceMode::Deterministic).unwrap();
        encode_signature_with_sighash_type(&signer.sign(&digest).unwrap(), SIGHASH_ALL).unwrap()
    }

    fn run_spend(script_pubkey: Vec<u8>, witness: Vec<Vec<u8>>) -> Result<(), ScriptError> {
        let mut view = MemoryCoinView::new();
        view.add_coin(
            OutPoint::null(),
            Coin {
                value: AMOUNT,
                script_pubkey,
            },
        );

        let mut tx = template();
        tx.inputs[0].witness = witness;
        match verify_transaction(&tx, &view) {
            Ok(()) => Ok(()),
            Err(Error::Verification(failure)) => Err(failure.reason),
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }

    /// Spends a native P2WSH output locked to `script`
    fn run_witness_script(script: &[u8], mut items: Vec<Vec<u8>>) -> Result<(), ScriptError> {
        items.push(script.to_vec());
        run_spend(WitnessProgram::from_script(script).script_pubkey(), items)
    }

    fn with_push(mut script: Vec<u8>, data: &[u8], tail: &[u8]) -> Vec<u8> {
        push_data(&mut script, data);
        script.extend_from_slice(tail);
        script
    }

    fn key_b() -> Vec<u8> {
        parse_public_key(PUBLIC_KEY_B).unwrap().serialize().to_vec()
    }

    #[test]
    fn test_valid_spend() {
        assert!(verify(&signed(), &coin_view(AMOUNT)));

        let verified = VerifiedTransaction::try_from((signed(), &coin_view(AMOUNT))).unwrap();
        assert_eq!(verified.txid(), signed().txid());
    }

    #[test]
    fn test_swapped_signatures() {
        let mut tx = signed();
        tx.inputs[0].witness.swap(1, 2);

        assert!(!verify(&tx, &coin_view(AMOUNT)));
        assert_eq!(reason(&tx, &coin_view(AMOUNT)), ScriptError::NullFail);
        assert!(VerifiedTransaction::try_from((tx, &coin_view(AMOUNT))).is_err());
    }

    #[test]
    fn test_wrong_amount() {
        assert_eq!(reason(&signed(), &coin_view(AMOUNT - 1)), ScriptError::NullFail);
    }

    #[test]
    fn test_missing_coin() {
        assert_eq!(
            reason(&signed(), &MemoryCoinView::new()),
            ScriptError::MissingCoin
        );
    }

    #[test]
    fn test_sighash_type_byte() {
        let mut tx = signed();
        *tx.inputs[0].witness[1].last_mut().unwrap() = 0x03;
        assert_eq!(
            reason(&tx, &coin_view(AMOUNT)),
            ScriptError::SigHashType(0x03)
        );
    }

    #[test]
    fn test_non_empty_dummy() {
        let mut tx = signed();
        tx.inputs[0].witness[0] = vec![0x01];
        assert_eq!(reason(&tx, &coin_view(AMOUNT)), ScriptError::SigNullDummy);
    }

    #[test]
    fn test_missing_signature() {
        let mut tx = signed();
        tx.inputs[0].witness.remove(1);
        assert_eq!(
            reason(&tx, &coin_view(AMOUNT)),
            ScriptError::InvalidStackOperation
        );

        // one bad signature taints the other
        let mut tx = signed();
        tx.inputs[0].witness[1] = vec![];
        assert_eq!(reason(&tx, &coin_view(AMOUNT)), ScriptError::NullFail);

        // only empty signatures fail without tripping NULLFAIL
        tx.inputs[0].witness[2] = vec![];
        assert_eq!(reason(&tx, &coin_view(AMOUNT)), ScriptError::EvalFalse);
    }

    #[test]
    fn test_witness_script_mismatch() {
        let mut tx = signed();
        let last = tx.inputs[0].witness.len() - 1;
        tx.inputs[0].witness[last][0] = OP_1;
        assert_eq!(
            reason(&tx, &coin_view(AMOUNT)),
            ScriptError::WitnessProgramMismatch
        );

        let mut tx = signed();
        tx.inputs[0].witness.clear();
        assert_eq!(
            reason(&tx, &coin_view(AMOUNT)),
            ScriptError::WitnessProgramWitnessEmpty
        );
    }

    #[test]
    fn test_malleated_script_sig() {
        let mut tx = signed();
        tx.inputs[0].script_sig.insert(0, OP_0);
        assert_eq!(
            reason(&tx, &coin_view(AMOUNT)),
            ScriptError::WitnessMalleatedP2sh
        );

        let mut tx = signed();
        tx.inputs[0].script_sig.push(OP_DUP);
        assert_eq!(
            reason(&tx, &coin_view(AMOUNT)),
            ScriptError::ScriptSigNotPushOnly
        );
    }

    #[test]
    fn test_native_p2wsh() {
        let mut tx = signed();
        tx.inputs[0].script_sig.clear();

        // the sighash does not commit to the scriptSig, signatures stay valid
        let mut view = MemoryCoinView::new();
        view.add_coin(
            OutPoint::null(),
            Coin {
                value: AMOUNT,
                script_pubkey: hex::decode(WITNESS_PROGRAM).unwrap(),
            },
        );
        assert!(verify_transaction(&tx, &view).is_ok());

        tx.inputs[0].script_sig = vec![OP_0];
        assert_eq!(reason(&tx, &view), ScriptError::WitnessMalleated);
    }

    #[test]
    fn test_unexpected_witness() {
        let mut view = MemoryCoinView::new();
        view.add_coin(
            OutPoint::null(),
            Coin {
                value: AMOUNT,
                script_pubkey: vec![OP_1],
            },
        );

        let mut tx = signed();
        tx.inputs[0].script_sig.clear();
        assert_eq!(reason(&tx, &view), ScriptError::WitnessUnexpected);

        tx.inputs[0].witness.clear();
        assert!(verify(&tx, &view));
    }

    #[test]
    fn test_script_numbers() {
        assert_eq!(decode_num(&[]), Ok(0));
        assert_eq!(decode_num(&[0x02]), Ok(2));
        assert_eq!(decode_num(&[0x81]), Ok(-1));
        assert_eq!(decode_num(&[0xff, 0x00]), Ok(255));
        assert_eq!(decode_num(&[0x02, 0x00]), Err(ScriptError::MinimalData));
        assert_eq!(decode_num(&[0; 5]), Err(ScriptError::NumberOverflow));

        assert!(!cast_to_bool(&[0x00, 0x80]));
        assert!(cast_to_bool(&[0x00, 0x01]));
    }

    #[test]
    fn test_stack_opcodes() {
        let script = with_push(vec![OP_1NEGATE], &[0x81], &[OP_EQUAL]);
        assert_eq!(run_witness_script(&script, vec![]), Ok(()));
        let script = with_push(vec![OP_1NEGATE], &[0x01], &[OP_EQUAL]);
        assert_eq!(
            run_witness_script(&script, vec![]),
            Err(ScriptError::EvalFalse)
        );

        let script = [OP_VERIFY, OP_1];
        assert_eq!(run_witness_script(&script, vec![vec![1]]), Ok(()));
        assert_eq!(
            run_witness_script(&script, vec![vec![]]),
            Err(ScriptError::Verify)
        );

        let script = [OP_DROP];
        assert_eq!(run_witness_script(&script, vec![vec![1], vec![5]]), Ok(()));
        assert_eq!(
            run_witness_script(&script, vec![]),
            Err(ScriptError::InvalidStackOperation)
        );

        let script = [OP_DUP, OP_EQUAL];
        assert_eq!(run_witness_script(&script, vec![vec![7]]), Ok(()));
        assert_eq!(
            run_witness_script(&script, vec![]),
            Err(ScriptError::InvalidStackOperation)
        );

        let script = with_push(vec![], &[7], &[OP_EQUALVERIFY, OP_1]);
        assert_eq!(run_witness_script(&script, vec![vec![7]]), Ok(()));
        assert_eq!(
            run_witness_script(&script, vec![vec![8]]),
            Err(ScriptError::EqualVerify)
        );
    }

    #[test]
    fn test_hash_opcodes() {
        let digest = sha256::Hash::hash(b"abc").to_byte_array();
        let script = with_push(vec![OP_SHA256], &digest, &[OP_EQUAL]);
        assert_eq!(run_witness_script(&script, vec![b"abc".to_vec()]), Ok(()));
        assert_eq!(
            run_witness_script(&script, vec![b"abd".to_vec()]),
            Err(ScriptError::EvalFalse)
        );

        let digest = sha256d::Hash::hash(b"abc").to_byte_array();
        let script = with_push(vec![OP_HASH256], &digest, &[OP_EQUAL]);
        assert_eq!(run_witness_script(&script, vec![b"abc".to_vec()]), Ok(()));
        assert_eq!(
            run_witness_script(&script, vec![b"abd".to_vec()]),
            Err(ScriptError::EvalFalse)
        );
    }

    #[test]
    fn test_checksig() {
        // PRIVATE_KEY_1 controls PUBLIC_KEY_B
        let script = with_push(vec![], &key_b(), &[OP_CHECKSIG]);
        assert_eq!(
            run_witness_script(&script, vec![sign_with(PRIVATE_KEY_1, &script)]),
            Ok(())
        );
        assert_eq!(
            run_witness_script(&script, vec![sign_with(PRIVATE_KEY_2, &script)]),
            Err(ScriptError::NullFail)
        );

        let script = with_push(vec![], &key_b(), &[OP_CHECKSIGVERIFY, OP_1]);
        assert_eq!(
            run_witness_script(&script, vec![sign_with(PRIVATE_KEY_1, &script)]),
            Ok(())
        );
        assert_eq!(
            run_witness_script(&script, vec![vec![]]),
            Err(ScriptError::CheckSigVerify)
        );
    }

    #[test]
    fn test_checkmultisigverify() {
        let key_a = parse_public_key(PUBLIC_KEY_A).unwrap().serialize();
        let mut script = with_push(vec![OP_1], &key_a, &[]);
        script = with_push(script, &key_b(), &[OP_1 + 1, OP_CHECKMULTISIGVERIFY, OP_1]);

        let sig = sign_with(PRIVATE_KEY_1, &script);
        assert_eq!(run_witness_script(&script, vec![vec![], sig]), Ok(()));
        assert_eq!(
            run_witness_script(&script, vec![vec![], vec![]]),
            Err(ScriptError::CheckMultisigVerify)
        );
    }

    #[test]
    fn test_witness_element_size() {
        let script = [OP_DROP, OP_1];
        assert_eq!(
            run_witness_script(&script, vec![vec![0xab; MAX_SCRIPT_ELEMENT_SIZE]]),
            Ok(())
        );
        assert_eq!(
            run_witness_script(&script, vec![vec![0xab; MAX_SCRIPT_ELEMENT_SIZE + 1]]),
            Err(ScriptError::PushSize)
        );
    }

    #[test]
    fn test_stack_size() {
        let mut script = vec![OP_1; MAX_STACK_SIZE];
        script.extend(vec![OP_DROP; MAX_STACK_SIZE - 1]);
        assert_eq!(run_witness_script(&script, vec![]), Ok(()));

        let mut script = vec![OP_1; MAX_STACK_SIZE + 1];
        script.extend(vec![OP_DROP; MAX_STACK_SIZE]);
        assert_eq!(
            run_witness_script(&script, vec![]),
            Err(ScriptError::StackSize)
        );
    }

    #[test]
    fn test_p2wpkh() {
        let hash = hash160::Hash::hash(&key_b()).to_byte_array();
        let mut script_pubkey = vec![OP_0];
        push_data(&mut script_pubkey, &hash);
        let script_code = p2pkh_script_pubkey(&hash);

        let sig = sign_with(PRIVATE_KEY_1, &script_code);
        assert_eq!(run_spend(script_pubkey.clone(), vec![sig, key_b()]), Ok(()));

        let sig = sign_with(PRIVATE_KEY_2, &script_code);
        assert_eq!(
            run_spend(script_pubkey.clone(), vec![sig.clone(), key_b()]),
            Err(ScriptError::NullFail)
        );

        let key_a = parse_public_key(PUBLIC_KEY_A).unwrap().serialize().to_vec();
        assert_eq!(
            run_spend(script_pubkey, vec![sig, key_a]),
            Err(ScriptError::EqualVerify)
        );
    }
}
