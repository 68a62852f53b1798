//! Sequences and dictionaries

use crate::collection::ContractCollection;
use crate::compatibility::Traversal;
use crate::contract::{Contract, ContractId, ContractRefs};
use crate::error::{ContractError, Result};
use crate::types::TypeDef;

pub(crate) fn can_provide_list(ty: &TypeDef) -> bool {
    matches!(ty, TypeDef::List { .. })
}

pub(crate) fn can_provide_dictionary(ty: &TypeDef) -> bool {
    matches!(ty, TypeDef::Dictionary { .. })
}

fn item_type(ty: &TypeDef) -> Result<&TypeDef> {
    match ty {
        TypeDef::List { item } => Ok(item.as_ref()),
        other => Err(ContractError::InvalidType(format!("{} must be a list", other))),
    }
}

fn entry_types(ty: &TypeDef) -> Result<(&TypeDef, &TypeDef)> {
    match ty {
        TypeDef::Dictionary { key, value } => Ok((key.as_ref(), value.as_ref())),
        other => Err(ContractError::InvalidType(format!("{} must be a dictionary", other))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListWriteContract {
    pub(crate) item: ContractId,
}

impl ListWriteContract {
    pub fn new(item: ContractId) -> Self {
        Self { item }
    }

    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let item = collection.get_or_add_write_contract(item_type(ty)?)?;
        Ok(Self::new(item.id()))
    }

    pub fn item(&self) -> ContractId {
        self.item
    }

    pub(crate) fn markup_value(&self, refs: &dyn ContractRefs) -> Result<String> {
        Ok(format!("{{list {}}}", refs.reference(self.item)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListReadContract {
    pub(crate) item: ContractId,
}

impl ListReadContract {
    pub fn new(item: ContractId) -> Self {
        Self { item }
    }

    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let item = collection.get_or_add_read_contract(item_type(ty)?)?;
        Ok(Self::new(item.id()))
    }

    pub fn item(&self) -> ContractId {
        self.item
    }

    pub(crate) fn can_read_from(&self, write: &Contract, cx: &mut Traversal<'_>) -> bool {
        match write {
            Contract::ListWrite(ws) => cx.scoped("[]", |cx| cx.check(self.item, ws.item)),
            _ => false,
        }
    }

    pub(crate) fn markup_value(&self, refs: &dyn ContractRefs) -> Result<String> {
        Ok(format!("{{list {}}}", refs.reference(self.item)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DictionaryWriteContract {
    pub(crate) key: ContractId,
    pub(crate) value: ContractId,
}

impl DictionaryWriteContract {
    pub fn new(key: ContractId, value: ContractId) -> Self {
        Self { key, value }
    }

    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let (key, value) = entry_types(ty)?;
        let key = collection.get_or_add_write_contract(key)?;
        let value = collection.get_or_add_write_contract(value)?;
        Ok(Self::new(key.id(), value.id()))
    }

    pub fn key(&self) -> ContractId {
        self.key
    }

    pub fn value(&self) -> ContractId {
        self.value
    }

    pub(crate) fn markup_value(&self, refs: &dyn ContractRefs) -> Result<String> {
        Ok(format!(
            "{{dictionary {} {}}}",
            refs.reference(self.key)?,
            refs.reference(self.value)?
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DictionaryReadContract {
    pub(crate) key: ContractId,
    pub(crate) value: ContractId,
}

impl DictionaryReadContract {
    pub fn new(key: ContractId, value: ContractId) -> Self {
        Self { key, value }
    }

    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let (key, value) = entry_types(ty)?;
        let key = collection.get_or_add_read_contract(key)?;
        let value = collection.get_or_add_read_contract(value)?;
        Ok(Self::new(key.id(), value.id()))
    }

    pub fn key(&self) -> ContractId {
        self.key
    }

    pub fn value(&self) -> ContractId {
        self.value
    }

    pub(crate) fn can_read_from(&self, write: &Contract, cx: &mut Traversal<'_>) -> bool {
        match write {
            Contract::DictionaryWrite(ws) => {
                cx.scoped("<key>", |cx| cx.check(self.key, ws.key))
                    && cx.scoped("<value>", |cx| cx.check(self.value, ws.value))
            }
            _ => false,
        }
    }

    pub(crate) fn markup_value(&self, refs: &dyn ContractRefs) -> Result<String> {
        Ok(format!(
            "{{dictionary {} {}}}",
            refs.reference(self.key)?,
            refs.reference(self.value)?
        ))
    }
}
