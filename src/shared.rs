//! Thread-safe collection handle
//!
//! Every check-then-insert sequence runs under the write lock so two threads
//! never intern the same node twice. Queries over already-built graphs take
//! the read lock.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::collection::ContractCollection;
use crate::contract::{ReadContractId, WriteContractId};
use crate::descriptor::Element;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::types::{Describe, TypeDef};

/// A [`ContractCollection`] shared between threads
#[derive(Debug, Clone, Default)]
pub struct SharedContractCollection {
    inner: Arc<RwLock<ContractCollection>>,
}

impl SharedContractCollection {
    pub fn new(collection: ContractCollection) -> Self {
        Self {
            inner: Arc::new(RwLock::new(collection)),
        }
    }

    pub fn get_or_add_write_contract(&self, ty: &TypeDef) -> Result<WriteContractId> {
        self.inner.write().get_or_add_write_contract(ty)
    }

    pub fn get_or_add_read_contract(&self, ty: &TypeDef) -> Result<ReadContractId> {
        self.inner.write().get_or_add_read_contract(ty)
    }

    pub fn write_contract_of<T: Describe>(&self) -> Result<WriteContractId> {
        self.inner.write().write_contract_of::<T>()
    }

    pub fn read_contract_of<T: Describe>(&self) -> Result<ReadContractId> {
        self.inner.write().read_contract_of::<T>()
    }

    pub fn register(&self, def: TypeDef) -> Result<()> {
        self.inner.write().register(def)
    }

    pub fn can_read_from(&self, read: ReadContractId, write: WriteContractId, strict: bool) -> bool {
        self.inner.read().can_read_from(read, write, strict)
    }

    /// Export assigns ids on first use, so it needs the write lock
    pub fn export_write(&self, root: WriteContractId) -> Result<Element> {
        self.inner.write().export_write(root)
    }

    pub fn export_read(&self, root: ReadContractId) -> Result<Element> {
        self.inner.write().export_read(root)
    }

    pub fn import_write(&self, document: &Element) -> Result<WriteContractId> {
        self.inner.write().import_write(document)
    }

    pub fn import_read(&self, document: &Element) -> Result<ReadContractId> {
        self.inner.write().import_read(document)
    }

    pub fn fingerprint(&self, root: WriteContractId) -> Result<Fingerprint> {
        Fingerprint::of(&self.inner.read(), root.id())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Lock for a batch of queries
    pub fn read(&self) -> RwLockReadGuard<'_, ContractCollection> {
        self.inner.read()
    }

    /// Lock for a batch of changes
    pub fn write(&self) -> RwLockWriteGuard<'_, ContractCollection> {
        self.inner.write()
    }
}

impl From<ContractCollection> for SharedContractCollection {
    fn from(collection: ContractCollection) -> Self {
        Self::new(collection)
    }
}
