//! Classification of failures.
//!
//! Each operation family has its own error type with the details relevant to it. All of them map
//! to one of the kinds below via their `kind` method so callers can handle failures uniformly.

use core::fmt;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A required input is missing or malformed.
    InvalidArgument,
    /// The object is not in a state allowing the operation.
    InvalidState,
    /// A template variable requests an encoding that isn't implemented.
    UnsupportedType,
    /// A template variable has no value.
    KeyNotFound,
    /// The network refused a submitted transaction.
    RejectedByNetwork,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::UnsupportedType => "unsupported type",
            ErrorKind::KeyNotFound => "key not found",
            ErrorKind::RejectedByNetwork => "rejected by network",
        };
        f.write_str(name)
    }
}
