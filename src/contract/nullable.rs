//! Nullable wrappers
//!
//! Nullability is a modifier rather than a named type, so both wrappers are
//! by-value: they are re-derived at each use site and rendered inline as
//! `{nullable <inner>}`.

use std::hash::{Hash, Hasher};

use crate::collection::ContractCollection;
use crate::compatibility::Traversal;
use crate::contract::{Contract, ContractId, ContractRefs};
use crate::error::{ContractError, Result};
use crate::types::TypeDef;

const NULLABLE_WRITE_TAG: u32 = 0x3731_AFBB;
const NULLABLE_READ_TAG: u32 = 0x563D_4345;

pub(crate) fn can_provide(ty: &TypeDef) -> bool {
    matches!(ty, TypeDef::Nullable { .. })
}

fn underlying_type(ty: &TypeDef) -> Result<&TypeDef> {
    match ty {
        TypeDef::Nullable { inner } => match inner.as_ref() {
            TypeDef::Nullable { .. } => Err(ContractError::InvalidType(format!("{} nests nullables", ty))),
            inner => Ok(inner),
        },
        other => Err(ContractError::InvalidType(format!("{} must be nullable", other))),
    }
}

/// Write side of an optional value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullableWriteContract {
    pub(crate) inner: ContractId,
}

impl NullableWriteContract {
    pub fn new(inner: ContractId) -> Self {
        Self { inner }
    }

    /// Wrap the collection's write contract for the underlying type
    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let inner = collection.get_or_add_write_contract(underlying_type(ty)?)?;
        Ok(Self::new(inner.id()))
    }

    pub fn inner(&self) -> ContractId {
        self.inner
    }

    pub(crate) fn markup_value(&self, refs: &dyn ContractRefs) -> Result<String> {
        Ok(format!("{{nullable {}}}", refs.reference(self.inner)?))
    }
}

impl Hash for NullableWriteContract {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(NULLABLE_WRITE_TAG);
        self.inner.hash(state);
    }
}

/// Read side of an optional value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullableReadContract {
    pub(crate) inner: ContractId,
}

impl NullableReadContract {
    pub fn new(inner: ContractId) -> Self {
        Self { inner }
    }

    /// Wrap the collection's read contract for the underlying type
    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let inner = collection.get_or_add_read_contract(underlying_type(ty)?)?;
        Ok(Self::new(inner.id()))
    }

    pub fn inner(&self) -> ContractId {
        self.inner
    }

    /// A nullable writer reduces to the inner contracts. A mandatory writer is
    /// only readable in lenient mode, where gaining optionality is free.
    pub(crate) fn can_read_from(&self, write: &Contract, cx: &mut Traversal<'_>) -> bool {
        if let Contract::NullableWrite(ws) = write {
            return cx.check(self.inner, ws.inner);
        }

        if cx.strict() {
            cx.mismatch("strict mode requires the writer to be nullable too");
            return false;
        }

        cx.check_same_writer(self.inner)
    }

    pub(crate) fn markup_value(&self, refs: &dyn ContractRefs) -> Result<String> {
        Ok(format!("{{nullable {}}}", refs.reference(self.inner)?))
    }
}

impl Hash for NullableReadContract {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(NULLABLE_READ_TAG);
        self.inner.hash(state);
    }
}
