//! Signed transactions.

use crate::crypto::{Address, Digest};
use crate::encoding::msgpack::CanonicalMap;
use super::{LogicSig, Transaction};

/// How a signed transaction is authorized.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Authorization {
    /// Ed25519 signature over the prefixed transaction encoding.
    Signature([u8; 64]),
    LogicSig(LogicSig),
}

/// A transaction paired with exactly one authorization.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SignedTransaction {
    transaction: Transaction,
    authorization: Authorization,
    /// Set when the authorizer is not the sender (the sender was rekeyed).
    auth_address: Option<Address>,
    id: Digest,
}

impl SignedTransaction {
    pub(crate) fn new(transaction: Transaction, authorization: Authorization, authorizer: Address) -> Self {
        let auth_address = if authorizer == *transaction.sender() {
            None
        } else {
            Some(authorizer)
        };
        let id = transaction.id();
        SignedTransaction {
            transaction,
            authorization,
            auth_address,
            id,
        }
    }

    /// Pairs the transaction with a logic signature without checking anything.
    ///
    /// This is the degraded path used when the checked signing fails for a contract account
    /// signing its own transaction. The ledger still evaluates the program, but nothing here
    /// guarantees it will accept the transaction.
    pub fn with_unverified_logic_sig(transaction: Transaction, logic_sig: LogicSig) -> Self {
        let id = transaction.id();
        SignedTransaction {
            transaction,
            authorization: Authorization::LogicSig(logic_sig),
            auth_address: None,
            id,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    pub fn auth_address(&self) -> Option<Address> {
        self.auth_address
    }

    /// ID of the signed transaction.
    pub fn id(&self) -> Digest {
        self.id
    }

    /// Writes the canonical encoding.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        let mut map = CanonicalMap::new();
        match &self.authorization {
            Authorization::Signature(signature) => {
                map.bin("sig", signature);
            },
            Authorization::LogicSig(logic_sig) => {
                map.map("lsig", logic_sig.to_canonical_map());
            },
        }
        if let Some(auth_address) = &self.auth_address {
            map.fixed("sgnr", auth_address.as_bytes());
        }
        map.map("txn", self.transaction.to_canonical_map());
        map.serialize(out);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::msgpack;
    use crate::transaction::tests::{account, params};

    fn keys(signed: &SignedTransaction) -> Vec<String> {
        let bytes = signed.to_bytes();
        let mut cursor = &*bytes;
        let len = msgpack::read_map_len(&mut cursor).unwrap();
        (0..len).map(|_| {
            let key = msgpack::read_str(&mut cursor).unwrap().to_owned();
            msgpack::skip_value(&mut cursor).unwrap();
            key
        }).collect()
    }

    #[test]
    fn key_signature_layout() {
        let signer = account(1);
        let tx = Transaction::payment(signer.address(), account(2).address(), 1, &params());
        assert_eq!(keys(&tx.sign(&signer)), ["sig", "txn"]);
        assert_eq!(keys(&tx.sign(&account(3))), ["sgnr", "sig", "txn"]);
    }

    #[test]
    fn logic_sig_layout() {
        let lsig = LogicSig::new(vec![0x01, 0x20, 0x01, 0x01, 0x22], Vec::new());
        let tx = Transaction::payment(lsig.address(), account(2).address(), 1, &params());
        assert_eq!(keys(&tx.sign_with_logic_sig(&lsig).unwrap()), ["lsig", "txn"]);
        let unverified = SignedTransaction::with_unverified_logic_sig(tx.clone(), lsig);
        assert_eq!(keys(&unverified), ["lsig", "txn"]);
        assert_eq!(unverified.id(), tx.id());
    }

    #[test]
    fn embedded_transaction_is_canonical_encoding() {
        let signer = account(1);
        let tx = Transaction::payment(signer.address(), account(2).address(), 1, &params());
        let bytes = tx.sign(&signer).to_bytes();
        let mut cursor = &*bytes;
        msgpack::read_map_len(&mut cursor).unwrap();
        msgpack::read_str(&mut cursor).unwrap();
        msgpack::skip_value(&mut cursor).unwrap();
        assert_eq!(msgpack::read_str(&mut cursor), Ok("txn"));
        assert_eq!(cursor, &tx.to_bytes()[..]);
    }
}
