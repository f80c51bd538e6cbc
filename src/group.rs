//! Atomic transaction groups.
//!
//! The ledger either confirms all transactions of a group or none of them. Membership is bound by
//! the group ID: a hash over the IDs of the members (without the group field) in order, which is
//! written into every member before signing. Changing the membership therefore invalidates all
//! signatures.

use core::fmt;
use slog::Logger;
use crate::crypto::{self, Account, Address, Digest, PrivateKeyError};
use crate::encoding::msgpack::{self, CanonicalMap, ReadError};
use crate::error::ErrorKind;
use crate::transaction::{LogicSig, LogicSigError, SignedTransaction, Transaction};

/// Computes the group ID of `transactions` in the given order.
///
/// The existing group field of the transactions is ignored.
pub fn compute_group_id(transactions: &[Transaction]) -> Digest {
    let ids = transactions
        .iter()
        .map(|transaction| transaction.without_group().id())
        .collect::<Vec<_>>();
    let mut map = CanonicalMap::new();
    map.bin_array("txlist", ids.iter().map(|id| &id.as_bytes()[..]));
    crypto::hash_with_prefix(crypto::prefix::TX_GROUP, &map.into_bytes())
}

/// Splits an encoded group into the encodings of the individual signed transactions.
pub fn split_wire(bytes: &[u8]) -> Result<Vec<&[u8]>, ReadError> {
    msgpack::split_stream(bytes)
}

/// A group of transactions being assembled and signed.
///
/// The group owns its transactions. Every member carries the group ID computed from the current
/// membership. Signatures are collected slot by slot, possibly by multiple parties, each signing
/// the transactions it is responsible for.
pub struct TransactionGroup {
    transactions: Vec<Transaction>,
    // same length as `transactions`
    signed: Vec<Option<SignedTransaction>>,
    group_id: Option<Digest>,
    logger: Logger,
}

impl TransactionGroup {
    pub fn new<I: IntoIterator<Item = Transaction>>(transactions: I) -> Self {
        Self::with_logger(transactions, Logger::root(slog::Discard, o!()))
    }

    pub fn with_logger<I: IntoIterator<Item = Transaction>>(transactions: I, logger: Logger) -> Self {
        let mut group = TransactionGroup {
            transactions: transactions.into_iter().collect(),
            signed: Vec::new(),
            group_id: None,
            logger,
        };
        group.assign_group_id();
        group
    }

    /// Appends a transaction.
    ///
    /// The group ID changes so all signatures collected so far are discarded.
    pub fn add(&mut self, transaction: Transaction) {
        let discarded = self.signed.iter().filter(|slot| slot.is_some()).count();
        if discarded > 0 {
            debug!(self.logger, "discarding signatures of the previous group"; "count" => discarded);
        }
        self.transactions.push(transaction);
        self.assign_group_id();
    }

    fn assign_group_id(&mut self) {
        self.signed = vec![None; self.transactions.len()];
        if self.transactions.is_empty() {
            self.group_id = None;
            return;
        }
        let group_id = compute_group_id(&self.transactions);
        self.transactions = self.transactions.iter().map(|transaction| transaction.with_group(group_id)).collect();
        self.group_id = Some(group_id);
        debug!(self.logger, "assigned group id"; "group_id" => %group_id, "size" => self.transactions.len());
    }

    /// Signs all transactions sent by `sender` (the account's address if `None`) with the key of
    /// `account`.
    ///
    /// Returns the number of signed transactions.
    pub fn sign(&mut self, account: &Account, sender: Option<&Address>) -> usize {
        let sender = sender.copied().unwrap_or_else(|| account.address());
        let signed = self.sender_slots(&sender)
            .map(|index| (index, self.transactions[index].sign(account)))
            .collect::<Vec<_>>();
        self.fill(signed)
    }

    /// Derives the key pair from raw private key bytes and signs like [`Self::sign`].
    pub fn sign_with_private_key(&mut self, private_key: &[u8], sender: Option<&Address>) -> Result<usize, SignError> {
        let account = Account::from_private_key(private_key)?;
        Ok(self.sign(&account, sender))
    }

    /// Signs all transactions sent by `sender` (the program address if `None`) with a logic
    /// signature.
    ///
    /// # Unverified fallback
    ///
    /// If the logic signature fails verification for a transaction but the program address is
    /// the sender of that transaction, the transaction is paired with the logic signature anyway
    /// (see [`SignedTransaction::with_unverified_logic_sig`]). This keeps compatibility with
    /// callers relying on it but it means an invalid program or delegation is only detected
    /// by the ledger.
    ///
    /// No slot is modified if signing any transaction fails.
    pub fn sign_with_logic_sig(&mut self, logic_sig: &LogicSig, sender: Option<&Address>) -> Result<usize, SignError> {
        let sender = sender.copied().unwrap_or_else(|| logic_sig.address());
        let mut signed = Vec::new();
        for index in self.sender_slots(&sender) {
            let transaction = &self.transactions[index];
            match transaction.sign_with_logic_sig(logic_sig) {
                Ok(signed_transaction) => signed.push((index, signed_transaction)),
                Err(error) if logic_sig.address() == *transaction.sender() => {
                    warn!(self.logger, "logic signature verification failed, using unverified fallback"; "index" => index, "error" => %error);
                    signed.push((index, SignedTransaction::with_unverified_logic_sig(transaction.clone(), logic_sig.clone())));
                },
                Err(error) => return Err(SignError::LogicSig { index, error }),
            }
        }
        Ok(self.fill(signed))
    }

    fn sender_slots<'a>(&'a self, sender: &'a Address) -> impl Iterator<Item = usize> + 'a {
        self.transactions
            .iter()
            .enumerate()
            .filter(move |(_, transaction)| transaction.sender() == sender)
            .map(|(index, _)| index)
    }

    fn fill(&mut self, signed: Vec<(usize, SignedTransaction)>) -> usize {
        let count = signed.len();
        for (index, signed_transaction) in signed {
            trace!(self.logger, "signed transaction"; "index" => index, "txid" => %signed_transaction.id());
            self.signed[index] = Some(signed_transaction);
        }
        count
    }

    /// Returns `true` if every transaction is signed.
    pub fn is_signed(&self) -> bool {
        self.signed.iter().all(Option::is_some)
    }

    /// Encodes the signed transactions back to back in group order.
    ///
    /// The result has no delimiters or length prefixes, records are separated by decoding them
    /// (see [`split_wire`]).
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        let mut unsigned = Vec::new();
        for (index, slot) in self.signed.iter().enumerate() {
            match slot {
                Some(signed_transaction) => signed_transaction.serialize(&mut out),
                None => unsigned.push(index),
            }
        }
        if unsigned.is_empty() {
            Ok(out)
        } else {
            debug!(self.logger, "refusing to encode partially signed group"; "unsigned" => ?unsigned);
            Err(EncodeError::NotSigned { unsigned })
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Signature slots in group order, `None` for transactions not signed yet.
    pub fn signed_transactions(&self) -> &[Option<SignedTransaction>] {
        &self.signed
    }

    /// `None` for an empty group.
    pub fn group_id(&self) -> Option<Digest> {
        self.group_id
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl fmt::Debug for TransactionGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TransactionGroup")
            .field("group_id", &self.group_id)
            .field("transactions", &self.transactions)
            .field("signed", &self.signed)
            .finish()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SignError {
    InvalidPrivateKey(PrivateKeyError),
    LogicSig { index: usize, error: LogicSigError },
}

impl SignError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

impl From<PrivateKeyError> for SignError {
    fn from(error: PrivateKeyError) -> Self {
        SignError::InvalidPrivateKey(error)
    }
}

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignError::InvalidPrivateKey(error) => write!(f, "invalid private key: {}", error),
            SignError::LogicSig { index, error } => write!(f, "failed to sign transaction {} with logic signature: {}", index, error),
        }
    }
}

impl std::error::Error for SignError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SignError::InvalidPrivateKey(error) => Some(error),
            SignError::LogicSig { error, .. } => Some(error),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EncodeError {
    /// Indices of the transactions missing a signature.
    NotSigned { unsigned: Vec<usize> },
}

impl EncodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidState
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeError::NotSigned { unsigned } => write!(f, "transaction group has not been signed, missing signatures: {:?}", unsigned),
        }
    }
}

impl std::error::Error for EncodeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::tests::{account, params};
    use crate::transaction::{Authorization, TransactionParams};

    fn pay(from: &Account, amount: u64) -> Transaction {
        Transaction::payment(from.address(), account(200).address(), amount, &params())
    }

    // Payment pair with ledger-produced encodings from the reference SDK test suite.
    const LEDGER_ADDRESS: &str = "UPYAFLHSIPMJOHVXU2MPLQ46GXJKSDCEMZ6RLCQ7GWB5PRDKJUWKKXECXI";
    const LEDGER_GENESIS_HASH: &str = "sC3P7e2SdbqKJK0tbiCdK9tdSpbe6XeCGKdoNzmlj0E=";
    const LEDGER_TX1: &str = "gaN0eG6Ko2FtdM0H0KNmZWXNA+iiZnbOAArW/6NnZW6rZGV2bmV0LXYxLjCiZ2jEILAtz+3tknW6iiStLW4gnSvbXUqW3ul3ghinaDc5pY9Bomx2zgAK2uekbm90ZcQIwRKw5cJ0CMqjcmN2xCCj8AKs8kPYlx63ppj1w5410qkMRGZ9FYofNYPXxGpNLKNzbmTEIKPwAqzyQ9iXHremmPXDnjXSqQxEZn0Vih81g9fEak0spHR5cGWjcGF5";
    const LEDGER_GROUP_ID: &str = "LiQ9OBup9H/bZLSfQUH2S6iHUM6FQ3PLuv9FNKyt09Q=";
    const LEDGER_TXG: &str = "gaN0eG6Lo2FtdM0H0KNmZWXNA+iiZnbOAArW/6NnZW6rZGV2bmV0LXYxLjCiZ2jEILAtz+3tknW6iiStLW4gnSvbXUqW3ul3ghinaDc5pY9Bo2dycMQgLiQ9OBup9H/bZLSfQUH2S6iHUM6FQ3PLuv9FNKyt09SibHbOAAra56Rub3RlxAjBErDlwnQIyqNyY3bEIKPwAqzyQ9iXHremmPXDnjXSqQxEZn0Vih81g9fEak0so3NuZMQgo/ACrPJD2Jcet6aY9cOeNdKpDERmfRWKHzWD18RqTSykdHlwZaNwYXmBo3R4boujYW10zQfQo2ZlZc0D6KJmds4ACtdzo2dlbqtkZXZuZXQtdjEuMKJnaMQgsC3P7e2SdbqKJK0tbiCdK9tdSpbe6XeCGKdoNzmlj0GjZ3JwxCAuJD04G6n0f9tktJ9BQfZLqIdQzoVDc8u6/0U0rK3T1KJsds4ACttbpG5vdGXECHQZRyOgXayIo3JjdsQgo/ACrPJD2Jcet6aY9cOeNdKpDERmfRWKHzWD18RqTSyjc25kxCCj8AKs8kPYlx63ppj1w5410qkMRGZ9FYofNYPXxGpNLKR0eXBlo3BheQ==";

    fn ledger_payment(first_round: u64, note: &str) -> Transaction {
        use base64::Engine;
        use core::convert::TryInto;

        let engine = base64::engine::general_purpose::STANDARD;
        let address = LEDGER_ADDRESS.parse::<Address>().unwrap();
        let genesis_hash = engine.decode(LEDGER_GENESIS_HASH).unwrap();
        let params = TransactionParams {
            fee: 1000,
            min_fee: 1000,
            last_round: first_round,
            genesis_id: "devnet-v1.0".to_owned(),
            genesis_hash: Digest(genesis_hash[..].try_into().unwrap()),
        };
        Transaction::payment(address, address, 2000, &params).with_note(engine.decode(note).unwrap())
    }

    fn write_unsigned(transaction: &Transaction, out: &mut Vec<u8>) {
        let mut map = CanonicalMap::new();
        map.map("txn", transaction.to_canonical_map());
        map.serialize(out);
    }

    #[test]
    fn matches_ledger_group_encoding() {
        use base64::Engine;
        let engine = base64::engine::general_purpose::STANDARD;

        let first = ledger_payment(710399, "wRKw5cJ0CMo=");
        let second = ledger_payment(710515, "dBlHI6BdrIg=");
        assert_eq!(first.header.last_valid, 711399);

        let mut single = Vec::new();
        write_unsigned(&first, &mut single);
        assert_eq!(single, engine.decode(LEDGER_TX1).unwrap());

        let group = TransactionGroup::new(vec![first, second]);
        let group_id = group.group_id().unwrap();
        assert_eq!(&group_id.as_bytes()[..], &engine.decode(LEDGER_GROUP_ID).unwrap()[..]);

        let mut wire = Vec::new();
        for transaction in group.transactions() {
            write_unsigned(transaction, &mut wire);
        }
        assert_eq!(wire, engine.decode(LEDGER_TXG).unwrap());
        assert_eq!(split_wire(&wire).unwrap().len(), 2);
    }

    #[test]
    fn empty_group_has_no_id() {
        let group = TransactionGroup::new(Vec::new());
        assert!(group.is_empty());
        assert_eq!(group.group_id(), None);
        assert!(group.is_signed());
        assert_eq!(group.encode(), Ok(Vec::new()));
    }

    #[test]
    fn members_share_group_id() {
        let group = TransactionGroup::new(vec![pay(&account(1), 1), pay(&account(2), 2), pay(&account(1), 3)]);
        let group_id = group.group_id().unwrap();
        assert!(group.transactions().iter().all(|tx| tx.group() == Some(group_id)));
        assert_eq!(compute_group_id(group.transactions()), group_id);
    }

    #[test]
    fn group_id_depends_on_order() {
        let a = pay(&account(1), 1);
        let b = pay(&account(2), 2);
        assert_ne!(compute_group_id(&[a.clone(), b.clone()]), compute_group_id(&[b, a]));
    }

    #[test]
    fn add_rebinds_all_members() {
        let mut group = TransactionGroup::new(vec![pay(&account(1), 5_000_000)]);
        let before = group.group_id().unwrap();
        group.add(pay(&account(1), 6_000_000));
        let after = group.group_id().unwrap();
        assert_ne!(before, after);
        assert!(group.transactions().iter().all(|tx| tx.group() == Some(after)));

        assert_eq!(group.sign(&account(1), None), 2);
        assert_eq!(group.transactions().len(), 2);
        assert_eq!(group.signed_transactions().len(), 2);
        assert!(group.is_signed());
    }

    #[test]
    fn add_discards_signatures() {
        let mut group = TransactionGroup::new(vec![pay(&account(1), 1), pay(&account(2), 2)]);
        group.sign(&account(1), None);
        group.sign(&account(2), None);
        assert!(group.is_signed());

        group.add(pay(&account(3), 3));
        assert!(!group.is_signed());
        assert_eq!(group.signed_transactions().len(), 3);
        assert!(group.signed_transactions().iter().all(Option::is_none));
    }

    #[test]
    fn partial_signing() {
        let a = account(1);
        let b = account(2);
        let mut group = TransactionGroup::new(vec![pay(&a, 1)]);
        group.add(pay(&a, 2));
        group.add(pay(&b, 3));

        assert_eq!(group.sign(&a, None), 2);
        assert!(group.signed_transactions()[0].is_some());
        assert!(group.signed_transactions()[1].is_some());
        assert!(group.signed_transactions()[2].is_none());
        assert!(!group.is_signed());
        assert_eq!(group.encode(), Err(EncodeError::NotSigned { unsigned: vec![2] }));

        assert_eq!(group.sign(&b, None), 1);
        assert!(group.is_signed());
    }

    #[test]
    fn sign_for_rekeyed_sender() {
        let a = account(1);
        let b = account(2);
        let mut group = TransactionGroup::new(vec![pay(&a, 1), pay(&a, 2), pay(&b, 3)]);
        group.sign(&a, None);
        // `a` signs for `b` as if `b` was rekeyed to `a`
        assert_eq!(group.sign(&a, Some(&b.address())), 1);
        assert!(group.is_signed());
        let rekeyed = group.signed_transactions()[2].as_ref().unwrap();
        assert_eq!(rekeyed.auth_address(), Some(a.address()));
    }

    #[test]
    fn sign_with_unrelated_key_changes_nothing() {
        let mut group = TransactionGroup::new(vec![pay(&account(1), 1)]);
        assert_eq!(group.sign(&account(9), None), 0);
        assert!(!group.is_signed());
    }

    #[test]
    fn sign_with_private_key() {
        let a = account(1);
        let mut group = TransactionGroup::new(vec![pay(&a, 1)]);
        assert_eq!(group.sign_with_private_key(&[0; 16], None), Err(SignError::InvalidPrivateKey(PrivateKeyError::InvalidLength(16))));
        assert_eq!(group.sign_with_private_key(&a.seed(), None), Ok(1));
        assert!(group.is_signed());
    }

    #[test]
    fn logic_sig_completes_group() {
        let lsig = LogicSig::new(hex_lit::hex!("0120010122").to_vec(), Vec::new());
        let a = account(1);
        let mut group = TransactionGroup::new(vec![pay(&a, 1)]);
        group.add(Transaction::payment(lsig.address(), a.address(), 2, &params()));
        group.sign(&a, None);
        assert_eq!(group.sign_with_logic_sig(&lsig, None), Ok(1));
        assert!(group.is_signed());
        assert!(matches!(group.signed_transactions()[1].as_ref().unwrap().authorization(), Authorization::LogicSig(_)));
    }

    #[test]
    fn logic_sig_fallback_for_own_address() {
        // version zero fails verification but the program address is the sender
        let lsig = LogicSig::new(vec![0x00, 0x01], Vec::new());
        let mut group = TransactionGroup::new(vec![Transaction::payment(lsig.address(), account(1).address(), 1, &params())]);
        assert_eq!(group.sign_with_logic_sig(&lsig, None), Ok(1));
        let signed = group.signed_transactions()[0].as_ref().unwrap();
        assert_eq!(signed.auth_address(), None);
        assert_eq!(signed.id(), group.transactions()[0].id());
    }

    #[test]
    fn logic_sig_failure_is_atomic() {
        let delegator = account(1);
        let lsig = LogicSig::new(hex_lit::hex!("0120010122").to_vec(), Vec::new()).delegate(&account(2));
        let mut group = TransactionGroup::new(vec![pay(&delegator, 1), pay(&delegator, 2)]);
        let error = group.sign_with_logic_sig(&lsig, Some(&delegator.address())).unwrap_err();
        assert_eq!(error, SignError::LogicSig { index: 0, error: LogicSigError::InvalidSignature });
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert!(group.signed_transactions().iter().all(Option::is_none));
    }

    #[test]
    fn encode_concatenates_in_order() {
        let a = account(1);
        let b = account(2);
        let mut group = TransactionGroup::new(vec![pay(&a, 1), pay(&b, 2), pay(&a, 3)]);
        group.sign(&a, None);
        group.sign(&b, None);
        let wire = group.encode().unwrap();
        let records = split_wire(&wire).unwrap();
        assert_eq!(records.len(), 3);
        for (record, slot) in records.iter().zip(group.signed_transactions()) {
            assert_eq!(*record, &slot.as_ref().unwrap().to_bytes()[..]);
        }
    }

    #[test]
    fn unsigned_error_kind() {
        let group = TransactionGroup::new(vec![pay(&account(1), 1)]);
        let error = group.encode().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn deterministic_encoding() {
        let build = || {
            let mut group = TransactionGroup::new(vec![pay(&account(1), 1), pay(&account(2), 2)]);
            group.sign(&account(1), None);
            group.sign(&account(2), None);
            group.encode().unwrap()
        };
        assert_eq!(build(), build());
    }

    quickcheck::quickcheck! {
        fn unsigned_groups_never_encode(senders: Vec<u8>, signer: u8) -> bool {
            if senders.is_empty() {
                return true;
            }
            let mut group = TransactionGroup::new(senders.iter().map(|seed| pay(&account(*seed), 1)));
            group.sign(&account(signer), None);
            let all_signed = senders.iter().all(|seed| *seed == signer);
            group.is_signed() == all_signed && group.encode().is_ok() == all_signed
        }

        fn add_changes_every_member(amounts: Vec<u64>, extra: u64) -> bool {
            if amounts.is_empty() {
                return true;
            }
            let mut group = TransactionGroup::new(amounts.iter().map(|amount| pay(&account(1), *amount)));
            let before = group.group_id();
            group.add(pay(&account(2), extra));
            let after = group.group_id();
            before != after && group.transactions().iter().all(|tx| tx.group() == after)
        }
    }
}
