//! Witness stack for a P2WSH `OP_CHECKMULTISIG` spend
//!
//! `OP_CHECKMULTISIG` pairs the topmost signature with the last key of the
//! script and walks down from there, so signatures sit on the stack in the
//! same order as their keys appear in the script, the last key's signature on
//! top. It also pops one element more than it uses: the stack starts with an
//! empty dummy, which must be empty (BIP147).

use log::debug;

use bitcoin::secp256k1::PublicKey;

use crate::script::RedeemScript;
use crate::Error;

pub type WitnessStack = Vec<Vec<u8>>;

/// `[<empty>, sig_1, ..., sig_m, <redeem script>]`
///
/// `signatures` must already be arranged in the order of their public keys in
/// `redeem_script`, see [`order_by_key_position`].
pub fn assemble_witness(
    signatures: &[Vec<u8>],
    redeem_script: &RedeemScript,
) -> Result<WitnessStack, Error> {
    let required = redeem_script.required_signatures();
    if signatures.len() != required {
        return Err(Error::KeyCountMismatch {
            expected: required,
            found: signatures.len(),
        });
    }

    let mut stack = Vec::with_capacity(required + 2);
    stack.push(Vec::new());
    stack.extend(signatures.iter().cloned());
    stack.push(redeem_script.as_bytes().to_vec());

    debug!(
        "assembled witness: [{}]",
        stack.iter().map(hex::encode).collect::<Vec<_>>().join(", ")
    );

    Ok(stack)
}

/// Sorts `(key, item)` pairs by the position of the key in the redeem script
/// and drops duplicate keys. Fails on keys the script does not contain.
pub fn order_by_key_position<T>(
    items: Vec<(PublicKey, T)>,
    redeem_script: &RedeemScript,
) -> Result<Vec<(usize, T)>, Error> {
    let mut positioned = items
        .into_iter()
        .map(|(key, item)| {
            redeem_script
                .key_position(&key)
                .map(|position| (position, item))
                .ok_or(Error::UnknownKey(key))
        })
        .collect::<Result<Vec<_>, _>>()?;

    positioned.sort_by_key(|(position, _)| *position);
    positioned.dedup_by_key(|(position, _)| *position);

    Ok(positioned)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::*;
    use crate::script::parse_public_key;

    fn redeem_script() -> RedeemScript {
        RedeemScript::from_hex(REDEEM_SCRIPT).unwrap()
    }

    #[test]
    fn test_assemble_witness() {
        let sig_a = hex::decode(SIGNATURE_2).unwrap();
        let sig_b = hex::decode(SIGNATURE_1).unwrap();

        let witness = assemble_witness(&[sig_a.clone(), sig_b.clone()], &redeem_script()).unwrap();
        assert_eq!(witness.len(), 4);
        assert!(witness[0].is_empty());
        assert_eq!(witness[1], sig_a);
        assert_eq!(witness[2], sig_b);
        assert_eq!(witness[3], redeem_script().as_bytes());
    }

    #[test]
    fn test_wrong_signature_count() {
        let sig = hex::decode(SIGNATURE_1).unwrap();
        assert!(matches!(
            assemble_witness(&[sig.clone()], &redeem_script()),
            Err(Error::KeyCountMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            assemble_witness(&[sig.clone(), sig.clone(), sig], &redeem_script()),
            Err(Error::KeyCountMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_order_by_key_position() {
        let key_a = parse_public_key(PUBLIC_KEY_A).unwrap();
        let key_b = parse_public_key(PUBLIC_KEY_B).unwrap();

        // supplied in private key order: key 1 controls B, key 2 controls A
        let ordered = order_by_key_position(
            vec![(key_b, "sig 1"), (key_a, "sig 2"), (key_b, "sig 1 again")],
            &redeem_script(),
        )
        .unwrap();
        assert_eq!(ordered, vec![(0, "sig 2"), (1, "sig 1")]);

        let stranger = parse_public_key(
            "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9",
        )
        .unwrap();
        assert!(matches!(
            order_by_key_position(vec![(stranger, ())], &redeem_script()),
            Err(Error::UnknownKey(_))
        ));
    }
}
