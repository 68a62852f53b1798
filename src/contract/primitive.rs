//! Scalar contracts

use crate::contract::Contract;
use crate::error::{ContractError, Result};
use crate::types::{PrimitiveType, TypeDef};

pub(crate) fn can_provide(ty: &TypeDef) -> bool {
    matches!(ty, TypeDef::Primitive { .. })
}

/// Contract of a scalar type, usable for both writing and reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveContract {
    primitive: PrimitiveType,
}

impl PrimitiveContract {
    pub fn new(primitive: PrimitiveType) -> Self {
        Self { primitive }
    }

    pub fn from_type(ty: &TypeDef) -> Result<Self> {
        match ty {
            TypeDef::Primitive { primitive } => Ok(Self::new(*primitive)),
            other => Err(ContractError::InvalidType(format!("{} must be a primitive", other))),
        }
    }

    pub fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    /// Strict mode requires the same scalar; lenient mode also accepts
    /// writers whose values convert, see [`widens_to`].
    pub fn can_read_from(&self, write: &Contract, strict: bool) -> bool {
        match write {
            Contract::Primitive(that) if that.primitive == self.primitive => true,
            Contract::Primitive(that) => !strict && widens_to(that.primitive, self.primitive),
            _ => false,
        }
    }

    pub(crate) fn markup_value(&self) -> String {
        self.primitive.name().to_string()
    }
}

/// Lenient conversion from `from` to `to`.
///
/// Numeric widenings are lossless. Versions are written in their string
/// form, so strings and versions read each other; a version reader parses
/// the string.
pub fn widens_to(from: PrimitiveType, to: PrimitiveType) -> bool {
    use PrimitiveType::*;

    match (from, to) {
        (I8, I16 | I32 | I64 | F32 | F64) => true,
        (I16, I32 | I64 | F32 | F64) => true,
        (I32, I64 | F64) => true,
        (U8, U16 | U32 | U64 | I16 | I32 | I64 | F32 | F64) => true,
        (U16, U32 | U64 | I32 | I64 | F32 | F64) => true,
        (U32, U64 | I64 | F64) => true,
        (F32, F64) => true,
        (Char, String) => true,
        (Version, String) | (String, Version) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PrimitiveType::*;

    fn reads(reader: PrimitiveType, writer: PrimitiveType, strict: bool) -> bool {
        PrimitiveContract::new(reader).can_read_from(&Contract::Primitive(PrimitiveContract::new(writer)), strict)
    }

    #[test]
    fn test_identical_primitives() {
        for primitive in PrimitiveType::ALL {
            assert!(reads(primitive, primitive, true));
            assert!(reads(primitive, primitive, false));
        }
    }

    #[test]
    fn test_widening_is_lenient_only() {
        assert!(reads(I64, I32, false));
        assert!(!reads(I64, I32, true));
        assert!(reads(F64, F32, false));
        assert!(reads(String, Char, false));
        assert!(reads(I32, U16, false));
    }

    #[test]
    fn test_narrowing_rejected() {
        assert!(!reads(I32, I64, false));
        assert!(!reads(U32, I32, false));
        assert!(!reads(I32, U32, false));
        assert!(!reads(F32, F64, false));
        assert!(!reads(Bytes, String, false));
        assert!(!reads(Bool, U8, false));
    }

    #[test]
    fn test_version_travels_as_string() {
        assert!(reads(Version, String, false));
        assert!(reads(String, Version, false));
        assert!(!reads(Version, String, true));
        assert!(!reads(String, Version, true));
        assert!(!reads(Version, Char, false));
        assert_eq!(PrimitiveType::from_name("version"), Some(Version));
    }
}
