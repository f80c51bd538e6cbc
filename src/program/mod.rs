//! Instantiation of compiled program templates.
//!
//! A template is compiled bytecode with placeholder integers at known offsets. Each placeholder is
//! described by a [`Variable`]. Values are encoded as base-128 varints, the same encoding the
//! bytecode uses for integer constants. Since the encoding of a value may be shorter or longer
//! than the placeholder, every splice shifts the bytes after it and the offsets of later
//! variables, which refer to the original template, have to be corrected.

pub mod contract;

use core::convert::TryFrom;
use core::fmt;
use std::collections::HashMap;
use crate::encoding::varint;
use crate::error::ErrorKind;

pub use contract::{Variable, ProgramLogic};

/// Length of the prefix (`TMPL_`) preceding variable names in the compiled metadata.
pub const VARIABLE_PREFIX_LEN: usize = 5;

/// Returns the name under which the value of the variable is looked up.
///
/// The compiler emits names like `TMPL_OWNER` while values are keyed by `owner`.
pub fn variable_key(name: &str) -> Result<String, InstantiateError> {
    name.get(VARIABLE_PREFIX_LEN..)
        .map(str::to_lowercase)
        .ok_or_else(|| InstantiateError::InvalidName(name.to_owned()))
}

/// Encodes an integer the way the bytecode stores integer constants.
pub fn encode_integer(value: u64) -> Vec<u8> {
    varint::encode(value)
}

/// Encodes `value` according to the declared type of a variable.
///
/// Only `int` (compared case-insensitively) is supported.
pub fn encode_value(value: u64, value_type: &str) -> Result<Vec<u8>, InstantiateError> {
    if value_type.eq_ignore_ascii_case("int") {
        Ok(encode_integer(value))
    } else {
        Err(InstantiateError::UnsupportedType(value_type.to_owned()))
    }
}

/// Replaces the variables in `template` with their values.
///
/// Variables are processed in the order of their offsets regardless of the order in which they
/// are given. If `values` is empty the template is returned unchanged. On error nothing is
/// returned so no partially instantiated program can escape.
pub fn instantiate(template: &[u8], variables: &[Variable], values: &HashMap<String, u64>) -> Result<Vec<u8>, InstantiateError> {
    if values.is_empty() {
        return Ok(template.to_vec());
    }

    let mut sorted = variables.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|variable| variable.index);

    let mut program = template.to_vec();
    // how many bytes the program shrank so far, negative if it grew
    let mut offset: i64 = 0;
    for variable in sorted {
        let key = variable_key(&variable.name)?;
        let value = *values.get(&key).ok_or_else(|| InstantiateError::KeyNotFound(key.clone()))?;
        let encoded = encode_value(value, &variable.value_type)?;

        let range = i64::try_from(variable.index)
            .ok()
            .and_then(|index| index.checked_sub(offset))
            .and_then(|start| Some((start, start.checked_add(i64::try_from(variable.length).ok()?)?)))
            .filter(|(start, end)| *start >= 0 && *end <= program.len() as i64);
        let (start, end) = match range {
            Some((start, end)) => (start as usize, end as usize),
            None => return Err(InstantiateError::OutOfRange { name: variable.name.clone(), index: variable.index, length: variable.length, len: program.len() }),
        };
        offset += variable.length as i64 - encoded.len() as i64;
        program.splice(start..end, encoded);
    }
    Ok(program)
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InstantiateError {
    /// The variable has a type that can't be encoded.
    UnsupportedType(String),
    /// No value was supplied for the variable.
    KeyNotFound(String),
    /// The variable name is too short to contain the prefix.
    InvalidName(String),
    /// The corrected position of the variable is outside of the program.
    OutOfRange { name: String, index: usize, length: usize, len: usize },
}

impl InstantiateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstantiateError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            InstantiateError::KeyNotFound(_) => ErrorKind::KeyNotFound,
            InstantiateError::InvalidName(_) => ErrorKind::InvalidArgument,
            InstantiateError::OutOfRange { .. } => ErrorKind::InvalidArgument,
        }
    }
}

impl fmt::Display for InstantiateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InstantiateError::UnsupportedType(value_type) => write!(f, "unsupported value type {}, only int is supported", value_type),
            InstantiateError::KeyNotFound(key) => write!(f, "missing value for template variable {}", key),
            InstantiateError::InvalidName(name) => write!(f, "template variable name {} is too short", name),
            InstantiateError::OutOfRange { name, index, length, len } => write!(f, "template variable {} at {} with length {} doesn't fit the program of {} bytes", name, index, length, len),
        }
    }
}

impl std::error::Error for InstantiateError {}
