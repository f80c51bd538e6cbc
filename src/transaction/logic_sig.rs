//! Delegated-logic signatures.
//!
//! A logic signature authorizes a transaction by a program instead of a key. Without a signature
//! it authorizes transactions of the contract account whose address is the hash of the program.
//! Signed by an account it is a delegation: the program may then authorize transactions of that
//! account.

use core::fmt;
use crate::crypto::{self, Account, Address};
use crate::encoding::msgpack::CanonicalMap;
use crate::encoding::varint;

#[derive(Clone, Eq, PartialEq)]
pub struct LogicSig {
    program: Vec<u8>,
    args: Vec<Vec<u8>>,
    signature: Option<[u8; 64]>,
}

impl LogicSig {
    pub fn new(program: Vec<u8>, args: Vec<Vec<u8>>) -> Self {
        LogicSig {
            program,
            args,
            signature: None,
        }
    }

    pub fn program(&self) -> &[u8] {
        &self.program
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    pub fn signature(&self) -> Option<&[u8; 64]> {
        self.signature.as_ref()
    }

    pub fn is_delegated(&self) -> bool {
        self.signature.is_some()
    }

    /// The address of the contract account controlled by the program.
    pub fn address(&self) -> Address {
        crypto::hash_with_prefix(crypto::prefix::PROGRAM, &self.program).into()
    }

    /// Delegates authority of `account` to the program.
    pub fn delegate(mut self, account: &Account) -> Self {
        self.signature = Some(account.sign_with_prefix(crypto::prefix::PROGRAM, &self.program));
        self
    }

    /// The address whose authority this logic signature exercises when signing for `sender`.
    ///
    /// For a delegation it is the sender itself, otherwise the contract account.
    pub fn authorizer(&self, sender: &Address) -> Address {
        if self.is_delegated() {
            *sender
        } else {
            self.address()
        }
    }

    /// Checks that the logic signature can exercise the authority of `authorizer`.
    ///
    /// The program itself is not interpreted beyond its version prefix.
    pub fn verify(&self, authorizer: &Address) -> Result<(), LogicSigError> {
        if self.program.is_empty() {
            return Err(LogicSigError::EmptyProgram);
        }
        match varint::decode(&mut &*self.program) {
            Ok(0) => return Err(LogicSigError::InvalidVersion),
            Ok(_) => (),
            Err(_) => return Err(LogicSigError::InvalidVersion),
        }
        match &self.signature {
            Some(signature) => {
                if crypto::verify_with_prefix(authorizer, crypto::prefix::PROGRAM, &self.program, signature) {
                    Ok(())
                } else {
                    Err(LogicSigError::InvalidSignature)
                }
            },
            None => {
                if self.address() == *authorizer {
                    Ok(())
                } else {
                    Err(LogicSigError::AddressMismatch { program: self.address(), authorizer: *authorizer })
                }
            },
        }
    }

    pub(crate) fn to_canonical_map(&self) -> CanonicalMap {
        let mut map = CanonicalMap::new();
        map.bin_array("arg", self.args.iter().map(Vec::as_slice))
            .bin("l", &self.program);
        if let Some(signature) = &self.signature {
            map.bin("sig", signature);
        }
        map
    }
}

impl fmt::Debug for LogicSig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LogicSig")
            .field("address", &self.address())
            .field("program_len", &self.program.len())
            .field("args", &self.args.len())
            .field("delegated", &self.is_delegated())
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogicSigError {
    EmptyProgram,
    /// The program doesn't start with a non-zero version number.
    InvalidVersion,
    /// The delegation signature doesn't verify against the authorizing account.
    InvalidSignature,
    AddressMismatch { program: Address, authorizer: Address },
}

impl fmt::Display for LogicSigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogicSigError::EmptyProgram => f.write_str("logic signature program is empty"),
            LogicSigError::InvalidVersion => f.write_str("logic signature program has no valid version"),
            LogicSigError::InvalidSignature => f.write_str("logic signature delegation signature is invalid"),
            LogicSigError::AddressMismatch { program, authorizer } => write!(f, "program address {} doesn't match {}", program, authorizer),
        }
    }
}

impl std::error::Error for LogicSigError {}
