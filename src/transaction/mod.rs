//! Ledger transactions and their canonical encoding.
//!
//! A [`Transaction`] is a plain value. Setting the group ID produces a new value
//! ([`Transaction::with_group`]) instead of mutating a shared one, so nothing holding a copy of a
//! transaction can observe it changing.

pub mod app_call;
pub mod logic_sig;
pub mod signed;

use crate::crypto::{self, Account, Address, Digest};
use crate::encoding::msgpack::CanonicalMap;

pub use app_call::{AppCallOptionalFields, AppCreate, ApplicationCall, OnCompletion, StateSchema};
pub use logic_sig::{LogicSig, LogicSigError};
pub use signed::{Authorization, SignedTransaction};

/// Number of rounds a transaction built by the constructors stays valid.
pub const DEFAULT_VALIDITY_WINDOW: u64 = 1000;

/// Network parameters required to construct a transaction.
///
/// These are normally obtained from the ledger's suggested parameters.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransactionParams {
    pub fee: u64,
    pub min_fee: u64,
    /// The latest round seen by the node, used as the first valid round.
    pub last_round: u64,
    pub genesis_id: String,
    pub genesis_hash: Digest,
}

/// Fields common to all transaction types.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Header {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub note: Vec<u8>,
    pub genesis_id: String,
    pub genesis_hash: Digest,
    pub lease: [u8; 32],
    pub rekey_to: Address,
    /// Zero when the transaction is not part of a group.
    group: Digest,
}

impl Header {
    /// Creates a header valid for [`DEFAULT_VALIDITY_WINDOW`] rounds starting at the last round.
    ///
    /// The fee is the suggested fee but never less than the minimum fee.
    pub fn new(sender: Address, params: &TransactionParams) -> Self {
        Header {
            sender,
            fee: core::cmp::max(params.fee, params.min_fee),
            first_valid: params.last_round,
            last_valid: params.last_round.saturating_add(DEFAULT_VALIDITY_WINDOW),
            note: Vec::new(),
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash,
            lease: [0; 32],
            rekey_to: Address::ZERO,
            group: Digest::ZERO,
        }
    }

    fn encode_into(&self, map: &mut CanonicalMap) {
        map.uint("fee", self.fee)
            .uint("fv", self.first_valid)
            .str("gen", &self.genesis_id)
            .fixed("gh", self.genesis_hash.as_bytes())
            .fixed("grp", self.group.as_bytes())
            .uint("lv", self.last_valid)
            .fixed("lx", &self.lease)
            .bin("note", &self.note)
            .fixed("rekey", self.rekey_to.as_bytes())
            .fixed("snd", self.sender.as_bytes());
    }
}

crate::test_macros::impl_arbitrary!(Header, sender, fee, first_valid, last_valid, note, genesis_id, genesis_hash, lease, rekey_to, group);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Payment {
    pub receiver: Address,
    pub amount: u64,
    pub close_remainder_to: Address,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AssetTransfer {
    pub asset_id: u64,
    pub amount: u64,
    pub receiver: Address,
    pub close_to: Address,
    /// Set only for clawback transfers.
    pub asset_sender: Address,
}

crate::test_macros::impl_arbitrary!(Payment, receiver, amount, close_remainder_to);
crate::test_macros::impl_arbitrary!(AssetTransfer, asset_id, amount, receiver, close_to, asset_sender);

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TransactionKind {
    Payment(Payment),
    AssetTransfer(AssetTransfer),
    ApplicationCall(ApplicationCall),
}

impl TransactionKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            TransactionKind::Payment(_) => "pay",
            TransactionKind::AssetTransfer(_) => "axfer",
            TransactionKind::ApplicationCall(_) => "appl",
        }
    }

    fn encode_into(&self, map: &mut CanonicalMap) {
        map.str("type", self.type_tag());
        match self {
            TransactionKind::Payment(payment) => {
                map.uint("amt", payment.amount)
                    .fixed("close", payment.close_remainder_to.as_bytes())
                    .fixed("rcv", payment.receiver.as_bytes());
            },
            TransactionKind::AssetTransfer(transfer) => {
                map.uint("aamt", transfer.amount)
                    .fixed("aclose", transfer.close_to.as_bytes())
                    .fixed("arcv", transfer.receiver.as_bytes())
                    .fixed("asnd", transfer.asset_sender.as_bytes())
                    .uint("xaid", transfer.asset_id);
            },
            TransactionKind::ApplicationCall(call) => call.encode_into(map),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transaction {
    pub header: Header,
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn new(header: Header, kind: TransactionKind) -> Self {
        Transaction { header, kind }
    }

    /// Creates an Algo payment.
    pub fn payment(from: Address, to: Address, amount: u64, params: &TransactionParams) -> Self {
        let payment = Payment {
            receiver: to,
            amount,
            close_remainder_to: Address::ZERO,
        };
        Transaction::new(Header::new(from, params), TransactionKind::Payment(payment))
    }

    /// Creates a payment or an asset transfer.
    ///
    /// `asset` being `None` or `Some(0)` means Algos, anything else is an asset ID.
    pub fn transfer(from: Address, to: Address, amount: u64, asset: Option<u64>, params: &TransactionParams) -> Self {
        match asset {
            None | Some(0) => Transaction::payment(from, to, amount, params),
            Some(asset_id) => {
                let transfer = AssetTransfer {
                    asset_id,
                    amount,
                    receiver: to,
                    close_to: Address::ZERO,
                    asset_sender: Address::ZERO,
                };
                Transaction::new(Header::new(from, params), TransactionKind::AssetTransfer(transfer))
            },
        }
    }

    /// Creates an application call.
    ///
    /// `application` is ignored when creating an application since the ID is assigned by the
    /// ledger.
    pub fn app_call(from: Address, application: u64, params: &TransactionParams, on_completion: OnCompletion) -> Self {
        Transaction::app_call_with_optional(from, application, params, on_completion, Default::default())
    }

    pub fn app_call_with_optional(from: Address, application: u64, params: &TransactionParams, on_completion: OnCompletion, optional: AppCallOptionalFields) -> Self {
        let call = ApplicationCall::new(application, on_completion, optional);
        Transaction::new(Header::new(from, params), TransactionKind::ApplicationCall(call))
    }

    pub fn app_opt_in(from: Address, application: u64, params: &TransactionParams) -> Self {
        Transaction::app_call(from, application, params, OnCompletion::OptIn)
    }

    /// Overrides the fee.
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.header.fee = fee;
        self
    }

    pub fn with_note(mut self, note: Vec<u8>) -> Self {
        self.header.note = note;
        self
    }

    /// Returns a copy of the transaction belonging to the group `group`.
    pub fn with_group(&self, group: Digest) -> Self {
        let mut transaction = self.clone();
        transaction.header.group = group;
        transaction
    }

    /// Returns a copy of the transaction with no group.
    pub fn without_group(&self) -> Self {
        self.with_group(Digest::ZERO)
    }

    pub fn sender(&self) -> &Address {
        &self.header.sender
    }

    pub fn group(&self) -> Option<Digest> {
        if self.header.group.is_zero() {
            None
        } else {
            Some(self.header.group)
        }
    }

    pub(crate) fn to_canonical_map(&self) -> CanonicalMap {
        let mut map = CanonicalMap::new();
        self.header.encode_into(&mut map);
        self.kind.encode_into(&mut map);
        map
    }

    /// Writes the canonical encoding of the transaction.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.to_canonical_map().serialize(out);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_canonical_map().into_bytes()
    }

    /// The bytes covered by the signature: the encoding with the domain prefix.
    pub fn bytes_to_sign(&self) -> Vec<u8> {
        let mut out = crypto::prefix::TRANSACTION.to_vec();
        self.serialize(&mut out);
        out
    }

    /// The transaction ID, a hash of the prefixed encoding.
    pub fn id(&self) -> Digest {
        crypto::hash_with_prefix(crypto::prefix::TRANSACTION, &self.to_bytes())
    }

    /// Signs the transaction with a key pair.
    ///
    /// If the account is not the sender the sender must have been rekeyed to it, the signed
    /// transaction then names the account as the authorizer.
    pub fn sign(&self, account: &Account) -> SignedTransaction {
        let signature = account.sign_with_prefix(crypto::prefix::TRANSACTION, &self.to_bytes());
        SignedTransaction::new(self.clone(), Authorization::Signature(signature), account.address())
    }

    /// Signs the transaction with a logic signature after checking the logic signature can
    /// authorize it.
    pub fn sign_with_logic_sig(&self, logic_sig: &LogicSig) -> Result<SignedTransaction, LogicSigError> {
        let authorizer = logic_sig.authorizer(self.sender());
        logic_sig.verify(&authorizer)?;
        Ok(SignedTransaction::new(self.clone(), Authorization::LogicSig(logic_sig.clone()), authorizer))
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for TransactionKind {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        if <bool as quickcheck::Arbitrary>::arbitrary(gen) {
            TransactionKind::Payment(quickcheck::Arbitrary::arbitrary(gen))
        } else {
            TransactionKind::AssetTransfer(quickcheck::Arbitrary::arbitrary(gen))
        }
    }
}

crate::test_macros::impl_arbitrary!(Transaction, header, kind);
