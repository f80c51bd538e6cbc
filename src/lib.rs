//! Building blocks for Algorand applications.
//!
//! This crate assembles atomic transaction groups and instantiates compiled program templates. It
//! doesn't talk to the network itself, [`client::LedgerClient`] is implemented by the caller over
//! their node API.
//!
//! [`group::TransactionGroup`] is the entry point for submitting multiple transactions that must
//! be confirmed together: it binds them with a group ID, collects signatures from the parties
//! involved and produces the encoding accepted by the node. [`program::instantiate`] fills the
//! variables of a program template, usually obtained from [`program::contract`] metadata.

#[macro_use]
extern crate slog;

mod test_macros;
pub mod encoding;
pub mod crypto;
pub mod transaction;
pub mod group;
pub mod program;
pub mod args;
pub mod state;
pub mod client;
pub mod error;

pub use crypto::{Account, Address, Digest};
pub use error::ErrorKind;
pub use group::TransactionGroup;
pub use transaction::{Transaction, TransactionParams};
