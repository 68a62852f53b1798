//! The unit type

use crate::contract::Contract;
use crate::error::{ContractError, Result};
use crate::types::TypeDef;

pub(crate) fn can_provide(ty: &TypeDef) -> bool {
    matches!(ty, TypeDef::Unit)
}

/// Contract of a type carrying no data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmptyContract;

impl EmptyContract {
    pub fn from_type(ty: &TypeDef) -> Result<Self> {
        match ty {
            TypeDef::Unit => Ok(EmptyContract),
            other => Err(ContractError::InvalidType(format!("{} must be the unit type", other))),
        }
    }

    /// An empty reader ignores whatever a lenient record writer sends
    pub fn can_read_from(&self, write: &Contract, strict: bool) -> bool {
        match write {
            Contract::Empty(_) => true,
            Contract::ComplexWrite(_) => !strict,
            _ => false,
        }
    }

    pub(crate) fn markup_value(&self) -> String {
        "{empty}".to_string()
    }
}
