//! Metadata of compiled contracts.
//!
//! The compiler produces a JSON document describing a collection of contracts, each with the
//! bytecode templates of its programs and the variables to fill in.

use core::fmt;
use std::collections::{BTreeMap, HashMap};
use base64::Engine;
use serde::{Deserialize, Serialize};
use crate::error::ErrorKind;
use crate::transaction::{AppCreate, LogicSig, StateSchema};
use super::InstantiateError;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContractCollection {
    pub repo: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub contracts: BTreeMap<String, Contract>,
}

impl ContractCollection {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, name: &str) -> Option<&Contract> {
        self.contracts.get(name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Contract {
    #[serde(rename = "app")]
    App(AppContract),
    #[serde(rename = "logicsig")]
    LogicSig(LogicSigContract),
}

impl Contract {
    pub fn name(&self) -> &str {
        match self {
            Contract::App(contract) => &contract.name,
            Contract::LogicSig(contract) => &contract.name,
        }
    }
}

/// An application: approval and clear programs and storage limits.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AppContract {
    pub name: String,
    pub approval_program: ProgramLogic,
    pub clear_program: ProgramLogic,
    pub global_state_schema: Schema,
    pub local_state_schema: Schema,
}

impl AppContract {
    /// Instantiates both programs and returns what's needed to create the application.
    pub fn create(&self, values: &HashMap<String, u64>) -> Result<AppCreate, ProgramError> {
        Ok(AppCreate {
            approval_program: self.approval_program.instantiate(values)?,
            clear_program: self.clear_program.instantiate(values)?,
            global_schema: self.global_state_schema.into(),
            local_schema: self.local_state_schema.into(),
            extra_pages: 0,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogicSigContract {
    pub name: String,
    pub logic: ProgramLogic,
}

impl LogicSigContract {
    /// Instantiates the program as an escrow logic signature.
    pub fn logic_sig(&self, values: &HashMap<String, u64>, args: Vec<Vec<u8>>) -> Result<LogicSig, ProgramError> {
        Ok(LogicSig::new(self.logic.instantiate(values)?, args))
    }
}

/// A compiled program template.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProgramLogic {
    /// Base64-encoded template.
    pub bytecode: String,
    /// Address of the program compiled with the placeholder values.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub source: String,
}

impl ProgramLogic {
    /// Decodes the template bytecode.
    pub fn template(&self) -> Result<Vec<u8>, ProgramError> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.bytecode)
            .map_err(ProgramError::InvalidBytecode)
    }

    /// Decodes the template and fills in the variables.
    pub fn instantiate(&self, values: &HashMap<String, u64>) -> Result<Vec<u8>, ProgramError> {
        let template = self.template()?;
        Ok(super::instantiate(&template, &self.variables, values)?)
    }
}

/// A placeholder in a program template.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Name including the `TMPL_` prefix.
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    /// Offset in the original template.
    pub index: usize,
    /// Length of the placeholder in the original template.
    pub length: usize,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

impl From<Schema> for StateSchema {
    fn from(schema: Schema) -> Self {
        StateSchema {
            num_uints: schema.num_uints,
            num_byte_slices: schema.num_byte_slices,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ProgramError {
    InvalidBytecode(base64::DecodeError),
    Instantiate(InstantiateError),
}

impl ProgramError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgramError::InvalidBytecode(_) => ErrorKind::InvalidArgument,
            ProgramError::Instantiate(error) => error.kind(),
        }
    }
}

impl From<InstantiateError> for ProgramError {
    fn from(error: InstantiateError) -> Self {
        ProgramError::Instantiate(error)
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProgramError::InvalidBytecode(_) => f.write_str("program bytecode is not valid base64"),
            ProgramError::Instantiate(_) => f.write_str("failed to instantiate program template"),
        }
    }
}

impl std::error::Error for ProgramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProgramError::InvalidBytecode(error) => Some(error),
            ProgramError::Instantiate(error) => Some(error),
        }
    }
}
