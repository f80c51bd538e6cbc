//! Hashing, addresses and Ed25519 accounts.
//!
//! The ledger hashes everything with SHA-512/256 and separates domains by prefixing the hashed
//! bytes with a short ASCII tag.

use core::convert::TryInto;
use core::fmt;
use core::str::FromStr;
use bitcoin_hashes::{sha512_256, Hash, HashEngine};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use data_encoding::BASE32_NOPAD;

/// Domain separation tags.
pub mod prefix {
    /// Transaction, hashed to get the transaction ID and signed.
    pub const TRANSACTION: &[u8] = b"TX";
    /// List of transaction IDs, hashed to get the group ID.
    pub const TX_GROUP: &[u8] = b"TG";
    /// Logic program, hashed to get its address and signed when delegating.
    pub const PROGRAM: &[u8] = b"Program";
}

/// Hashes `data` prefixed with a domain tag.
pub fn hash_with_prefix(prefix: &[u8], data: &[u8]) -> Digest {
    let mut engine = sha512_256::Hash::engine();
    engine.input(prefix);
    engine.input(data);
    Digest(sha512_256::Hash::from_engine(engine).to_byte_array())
}

/// A 32-byte SHA-512/256 digest.
///
/// Formatted as unpadded base32 which is how transaction IDs are presented by the ledger.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub const ZERO: Digest = Digest([0; 32]);

    pub fn hash(data: &[u8]) -> Self {
        Digest(sha512_256::Hash::hash(data).to_byte_array())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Digest::ZERO
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

const CHECKSUM_LEN: usize = 4;

/// An account address: the 32-byte Ed25519 public key of the account, or the hash of a logic
/// program for contract accounts.
///
/// The text form is the unpadded base32 encoding of the key followed by the last four bytes of
/// its SHA-512/256 hash.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Address::ZERO
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let hash = Digest::hash(&self.0);
        hash.0[(32 - CHECKSUM_LEN)..].try_into().expect("statically correct length")
    }
}

impl From<Digest> for Address {
    fn from(digest: Digest) -> Self {
        Address(digest.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut bytes = [0u8; 32 + CHECKSUM_LEN];
        bytes[..32].copy_from_slice(&self.0);
        bytes[32..].copy_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE32_NOPAD.decode(s.as_bytes()).map_err(|_| AddressParseError::InvalidBase32)?;
        if bytes.len() != 32 + CHECKSUM_LEN {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        let address = Address(bytes[..32].try_into().expect("checked above"));
        if address.checksum()[..] != bytes[32..] {
            return Err(AddressParseError::InvalidChecksum);
        }
        Ok(address)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AddressParseError {
    InvalidBase32,
    InvalidLength(usize),
    InvalidChecksum,
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressParseError::InvalidBase32 => f.write_str("address is not valid base32"),
            AddressParseError::InvalidLength(len) => write!(f, "address decodes to {} bytes, expected {}", len, 32 + CHECKSUM_LEN),
            AddressParseError::InvalidChecksum => f.write_str("address checksum mismatch"),
        }
    }
}

impl std::error::Error for AddressParseError {}

/// An Ed25519 key pair controlling an account.
#[derive(Clone)]
pub struct Account {
    key: SigningKey,
}

impl Account {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Account { key: SigningKey::from_bytes(&seed) }
    }

    /// Creates the account from raw private key bytes.
    ///
    /// Accepts either the 32-byte seed or the 64-byte form used by the ledger tooling: the seed
    /// followed by the public key. In the latter case the public key has to match the seed.
    pub fn from_private_key(bytes: &[u8]) -> Result<Self, PrivateKeyError> {
        match bytes.len() {
            32 => Ok(Account::from_seed(bytes.try_into().expect("checked length"))),
            64 => {
                let account = Account::from_seed(bytes[..32].try_into().expect("checked length"));
                if account.address().0[..] != bytes[32..] {
                    return Err(PrivateKeyError::PublicKeyMismatch);
                }
                Ok(account)
            },
            len => Err(PrivateKeyError::InvalidLength(len)),
        }
    }

    pub fn generate() -> Self {
        Account { key: SigningKey::generate(&mut rand::rngs::OsRng) }
    }

    pub fn address(&self) -> Address {
        Address(self.key.verifying_key().to_bytes())
    }

    pub fn seed(&self) -> [u8; 32] {
        self.key.to_bytes()
    }

    /// Signs `data` prefixed with the domain tag.
    pub fn sign_with_prefix(&self, prefix: &[u8], data: &[u8]) -> [u8; 64] {
        let mut message = Vec::with_capacity(prefix.len() + data.len());
        message.extend_from_slice(prefix);
        message.extend_from_slice(data);
        self.key.sign(&message).to_bytes()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Account({})", self.address())
    }
}

/// Verifies a signature over `data` prefixed with the domain tag.
///
/// Returns `false` if `signer` is not a valid Ed25519 point.
pub fn verify_with_prefix(signer: &Address, prefix: &[u8], data: &[u8], signature: &[u8; 64]) -> bool {
    let key = match VerifyingKey::from_bytes(&signer.0) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let mut message = Vec::with_capacity(prefix.len() + data.len());
    message.extend_from_slice(prefix);
    message.extend_from_slice(data);
    key.verify_strict(&message, &ed25519_dalek::Signature::from_bytes(signature)).is_ok()
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrivateKeyError {
    InvalidLength(usize),
    PublicKeyMismatch,
}

impl fmt::Display for PrivateKeyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrivateKeyError::InvalidLength(len) => write!(f, "private key has {} bytes, expected 32 or 64", len),
            PrivateKeyError::PublicKeyMismatch => f.write_str("public key part of the private key doesn't match the seed"),
        }
    }
}

impl std::error::Error for PrivateKeyError {}

#[cfg(test)]
impl quickcheck::Arbitrary for Address {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        Address(crate::test_macros::arbitrary_bytes(gen))
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for Digest {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        Digest(crate::test_macros::arbitrary_bytes(gen))
    }
}
