//! Contract providers
//!
//! The collection tries its providers in order and uses the first whose
//! predicate accepts the type. The default order is fixed and documented;
//! collections may be configured with another order or a subset.

use serde::{Deserialize, Serialize};

use crate::collection::ContractCollection;
use crate::contract::{
    complex, empty, list, nullable, primitive, union, ComplexReadContract, ComplexWriteContract, Contract,
    ContractId, DictionaryReadContract, DictionaryWriteContract, Direction, EmptyContract, EnumContract,
    ListReadContract, ListWriteContract, NullableReadContract, NullableWriteContract, PrimitiveContract,
    UnionReadContract, UnionWriteContract,
};
use crate::error::Result;
use crate::types::TypeDef;

/// A kind of contract node together with the types it applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Nullable,
    Enum,
    Primitive,
    Empty,
    List,
    Dictionary,
    Union,
    Complex,
}

/// Default priority order
pub const DEFAULT_PROVIDERS: [Provider; 8] = [
    Provider::Nullable,
    Provider::Enum,
    Provider::Primitive,
    Provider::Empty,
    Provider::List,
    Provider::Dictionary,
    Provider::Union,
    Provider::Complex,
];

impl Provider {
    pub fn can_provide(&self, ty: &TypeDef) -> bool {
        match self {
            Provider::Nullable => nullable::can_provide(ty),
            Provider::Enum => EnumContract::can_provide(ty),
            Provider::Primitive => primitive::can_provide(ty),
            Provider::Empty => empty::can_provide(ty),
            Provider::List => list::can_provide_list(ty),
            Provider::Dictionary => list::can_provide_dictionary(ty),
            Provider::Union => union::can_provide(ty),
            Provider::Complex => complex::can_provide(ty),
        }
    }

    /// Build and intern the node for `ty`, resolving nested types through
    /// `collection`
    pub(crate) fn build(&self, collection: &mut ContractCollection, direction: Direction, ty: &TypeDef) -> Result<ContractId> {
        let contract = match (self, direction) {
            (Provider::Nullable, Direction::Write) => {
                Contract::NullableWrite(NullableWriteContract::from_type(ty, collection)?)
            }
            (Provider::Nullable, Direction::Read) => {
                Contract::NullableRead(NullableReadContract::from_type(ty, collection)?)
            }
            (Provider::Enum, _) => Contract::Enum(EnumContract::from_type(ty)?),
            (Provider::Primitive, _) => Contract::Primitive(PrimitiveContract::from_type(ty)?),
            (Provider::Empty, _) => Contract::Empty(EmptyContract::from_type(ty)?),
            (Provider::List, Direction::Write) => Contract::ListWrite(ListWriteContract::from_type(ty, collection)?),
            (Provider::List, Direction::Read) => Contract::ListRead(ListReadContract::from_type(ty, collection)?),
            (Provider::Dictionary, Direction::Write) => {
                Contract::DictionaryWrite(DictionaryWriteContract::from_type(ty, collection)?)
            }
            (Provider::Dictionary, Direction::Read) => {
                Contract::DictionaryRead(DictionaryReadContract::from_type(ty, collection)?)
            }
            (Provider::Union, Direction::Write) => {
                return collection.build_by_ref(direction, ty, |collection| {
                    Ok(Contract::UnionWrite(UnionWriteContract::from_type(ty, collection)?))
                })
            }
            (Provider::Union, Direction::Read) => {
                return collection.build_by_ref(direction, ty, |collection| {
                    Ok(Contract::UnionRead(UnionReadContract::from_type(ty, collection)?))
                })
            }
            (Provider::Complex, Direction::Write) => {
                return collection.build_by_ref(direction, ty, |collection| {
                    Ok(Contract::ComplexWrite(ComplexWriteContract::from_type(ty, collection)?))
                })
            }
            (Provider::Complex, Direction::Read) => {
                return collection.build_by_ref(direction, ty, |collection| {
                    Ok(Contract::ComplexRead(ComplexReadContract::from_type(ty, collection)?))
                })
            }
        };
        Ok(collection.intern_node(contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::types::PrimitiveType;

    #[test]
    fn test_every_type_has_one_default_provider() {
        let types = [
            TypeDef::primitive(PrimitiveType::I32),
            TypeDef::Unit,
            TypeDef::enumeration("E", ["A"]),
            TypeDef::nullable(TypeDef::Unit),
            TypeDef::list(TypeDef::Unit),
            TypeDef::dictionary(TypeDef::Unit, TypeDef::Unit),
            TypeDef::record("R", vec![]),
            TypeDef::union("U", [("a", TypeDef::Unit)]),
        ];
        for ty in &types {
            let matching = DEFAULT_PROVIDERS.iter().filter(|p| p.can_provide(ty)).count();
            assert_eq!(matching, 1, "{}", ty);
        }
        assert!(!DEFAULT_PROVIDERS.iter().any(|p| p.can_provide(&TypeDef::opaque("X"))));
    }

    #[test]
    fn test_restricted_chain() {
        let mut collection = ContractCollection::with_providers(vec![Provider::Enum]);
        assert!(collection
            .get_or_add_write_contract(&TypeDef::enumeration("E", ["A"]))
            .is_ok());
        let result = collection.get_or_add_write_contract(&TypeDef::primitive(PrimitiveType::I32));
        assert!(matches!(result, Err(ContractError::UnsupportedType(_))));
    }
}
