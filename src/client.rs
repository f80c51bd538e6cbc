//! Submission of transaction groups through a ledger node.
//!
//! The transport is not part of this crate. Callers implement [`LedgerClient`] over whatever node
//! API they use and the functions here drive it.

use core::fmt;
use slog::Logger;
use crate::error::ErrorKind;
use crate::group::{EncodeError, TransactionGroup};

/// Number of rounds [`wait_for_confirmation`] is normally given.
pub const DEFAULT_CONFIRMATION_ROUNDS: u64 = 3;

/// Operations of a ledger node needed to submit transactions.
pub trait LedgerClient {
    type Error: fmt::Debug + fmt::Display;

    /// Submits encoded signed transactions, returning the ID of the first one.
    fn send_raw(&mut self, transactions: &[u8]) -> Result<String, Self::Error>;

    /// Returns the last round the node knows about.
    fn last_round(&mut self) -> Result<u64, Self::Error>;

    fn pending_transaction(&mut self, txid: &str) -> Result<PendingInfo, Self::Error>;

    /// Blocks until the node reaches `round`.
    fn wait_for_block(&mut self, round: u64) -> Result<(), Self::Error>;
}

/// Information about a submitted transaction.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PendingInfo {
    pub confirmed_round: Option<u64>,
    /// Non-empty if the node rejected the transaction.
    pub pool_error: String,
}

impl PendingInfo {
    pub fn status(&self) -> PendingStatus {
        match self.confirmed_round {
            Some(round) if round > 0 => PendingStatus::Confirmed(round),
            _ if !self.pool_error.is_empty() => PendingStatus::Rejected(self.pool_error.clone()),
            _ => PendingStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PendingStatus {
    Pending,
    Confirmed(u64),
    Rejected(String),
}

/// Polls the node until the transaction is confirmed, rejected or `timeout_rounds` rounds pass.
///
/// Returns the confirmation round. Calling it again for the same transaction is harmless.
pub fn wait_for_confirmation<C: LedgerClient>(client: &mut C, txid: &str, timeout_rounds: u64, logger: &Logger) -> Result<u64, ConfirmationError<C::Error>> {
    if txid.trim().is_empty() {
        return Err(ConfirmationError::EmptyTransactionId);
    }
    let start = client.last_round().map_err(ConfirmationError::Client)? + 1;
    let end = start.saturating_add(timeout_rounds);
    let mut current = start;
    while current < end {
        let info = client.pending_transaction(txid).map_err(ConfirmationError::Client)?;
        match info.status() {
            PendingStatus::Confirmed(round) => {
                info!(logger, "transaction confirmed"; "txid" => txid, "round" => round);
                return Ok(round);
            },
            PendingStatus::Rejected(pool_error) => {
                warn!(logger, "transaction rejected"; "txid" => txid, "pool_error" => &pool_error);
                return Err(ConfirmationError::Rejected { pool_error });
            },
            PendingStatus::Pending => debug!(logger, "transaction pending"; "txid" => txid, "round" => current),
        }
        client.wait_for_block(current).map_err(ConfirmationError::Client)?;
        current += 1;
    }
    warn!(logger, "transaction not confirmed"; "txid" => txid, "rounds" => timeout_rounds);
    Err(ConfirmationError::NotConfirmed { rounds: timeout_rounds })
}

/// Sends a fully signed group and optionally waits for its confirmation.
///
/// Returns the ID of the first transaction of the group.
pub fn submit_group<C: LedgerClient>(client: &mut C, group: &TransactionGroup, wait: bool, logger: &Logger) -> Result<String, SubmitError<C::Error>> {
    let encoded = group.encode()?;
    let txid = client.send_raw(&encoded).map_err(SubmitError::Client)?;
    debug!(logger, "submitted transaction group"; "txid" => &txid, "size" => group.len());
    if wait {
        wait_for_confirmation(client, &txid, DEFAULT_CONFIRMATION_ROUNDS, logger).map_err(SubmitError::Confirmation)?;
    }
    Ok(txid)
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConfirmationError<E> {
    EmptyTransactionId,
    Rejected { pool_error: String },
    NotConfirmed { rounds: u64 },
    Client(E),
}

impl<E> ConfirmationError<E> {
    /// `None` for errors of the client.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ConfirmationError::EmptyTransactionId => Some(ErrorKind::InvalidArgument),
            ConfirmationError::Rejected { .. } => Some(ErrorKind::RejectedByNetwork),
            ConfirmationError::NotConfirmed { .. } => Some(ErrorKind::InvalidState),
            ConfirmationError::Client(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ConfirmationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfirmationError::EmptyTransactionId => f.write_str("transaction ID is empty"),
            ConfirmationError::Rejected { pool_error } => write!(f, "the transaction has been rejected with a pool error: {}", pool_error),
            ConfirmationError::NotConfirmed { rounds } => write!(f, "transaction not confirmed after {} rounds", rounds),
            ConfirmationError::Client(error) => write!(f, "ledger client failed: {}", error),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ConfirmationError<E> {}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitError<E> {
    Encode(EncodeError),
    Client(E),
    Confirmation(ConfirmationError<E>),
}

impl<E> SubmitError<E> {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SubmitError::Encode(error) => Some(error.kind()),
            SubmitError::Client(_) => None,
            SubmitError::Confirmation(error) => error.kind(),
        }
    }
}

impl<E> From<EncodeError> for SubmitError<E> {
    fn from(error: EncodeError) -> Self {
        SubmitError::Encode(error)
    }
}

impl<E: fmt::Display> fmt::Display for SubmitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubmitError::Encode(error) => write!(f, "failed to encode transaction group: {}", error),
            SubmitError::Client(error) => write!(f, "ledger client failed: {}", error),
            SubmitError::Confirmation(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for SubmitError<E> {}
