//! Lookups in application state as reported by the node.
//!
//! Nodes report state keys base64-encoded. The lookup functions accept either the encoded key or
//! the plain string, trying the key as given first.

use std::collections::HashMap;
use base64::Engine;
use serde::{Deserialize, Serialize};

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Type tag of a [`TealValue`] holding bytes.
pub const TYPE_BYTES: u64 = 1;
/// Type tag of a [`TealValue`] holding an integer.
pub const TYPE_UINT: u64 = 2;

/// Encodes a numeric state key.
///
/// The key is the byte `o` followed by the big-endian number, base64-encoded.
pub fn encode_number_key(value: u64) -> String {
    let mut key = Vec::with_capacity(9);
    key.push(b'o');
    key.extend_from_slice(&value.to_be_bytes());
    BASE64.encode(key)
}

/// Encodes a string state key.
pub fn encode_key(key: &str) -> String {
    BASE64.encode(key.as_bytes())
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TealValue {
    #[serde(rename = "type")]
    pub value_type: u64,
    /// Base64-encoded.
    #[serde(default)]
    pub bytes: String,
    #[serde(default)]
    pub uint: u64,
}

impl TealValue {
    fn as_uint(&self) -> Option<u64> {
        if self.value_type == TYPE_UINT {
            Some(self.uint)
        } else {
            None
        }
    }

    fn as_bytes(&self) -> Option<&str> {
        if self.value_type == TYPE_BYTES {
            Some(&self.bytes)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TealKeyValue {
    pub key: String,
    pub value: TealValue,
}

/// Local state of an account in one application.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ApplicationLocalState {
    pub id: u64,
    #[serde(rename = "key-value", default)]
    pub key_value: Vec<TealKeyValue>,
}

fn find<'a>(state: &'a [TealKeyValue], key: &str) -> Option<&'a TealValue> {
    let lookup = |key: &str| state.iter().find(|entry| entry.key == key).map(|entry| &entry.value);
    lookup(key).or_else(|| lookup(&encode_key(key)))
}

fn find_in_map<'a>(state: &'a HashMap<String, TealValue>, key: &str) -> Option<&'a TealValue> {
    state.get(key).or_else(|| state.get(&encode_key(key)))
}

fn application<'a>(state: &'a [ApplicationLocalState], application_id: u64) -> Option<&'a [TealKeyValue]> {
    state.iter().find(|app| app.id == application_id).map(|app| &*app.key_value)
}

/// Returns the integer stored under `key`.
///
/// `None` if the key is missing or holds bytes.
pub fn get_number(state: &[TealKeyValue], key: &str) -> Option<u64> {
    find(state, key)?.as_uint()
}

/// Returns the base64-encoded bytes stored under `key`.
pub fn get_bytes<'a>(state: &'a [TealKeyValue], key: &str) -> Option<&'a str> {
    find(state, key)?.as_bytes()
}

pub fn get_number_in_map(state: &HashMap<String, TealValue>, key: &str) -> Option<u64> {
    find_in_map(state, key)?.as_uint()
}

pub fn get_bytes_in_map<'a>(state: &'a HashMap<String, TealValue>, key: &str) -> Option<&'a str> {
    find_in_map(state, key)?.as_bytes()
}

/// Looks up an integer in the local state of the application `application_id`.
pub fn get_local_number(state: &[ApplicationLocalState], application_id: u64, key: &str) -> Option<u64> {
    get_number(application(state, application_id)?, key)
}

pub fn get_local_bytes<'a>(state: &'a [ApplicationLocalState], application_id: u64, key: &str) -> Option<&'a str> {
    get_bytes(application(state, application_id)?, key)
}
