//! Type definitions that contracts are built from
//!
//! Rust has no runtime reflection, so a type enters the collection as a
//! [`TypeDef`]: a structural description of what the type looks like on the
//! wire. Rust types can describe themselves through [`Describe`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Scalar types with a fixed wire representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Bytes,
    /// Dotted version number such as `1.2.3`, carried as its string form
    Version,
}

impl PrimitiveType {
    /// All primitive types, in declaration order
    pub const ALL: [PrimitiveType; 15] = [
        PrimitiveType::Bool,
        PrimitiveType::I8,
        PrimitiveType::I16,
        PrimitiveType::I32,
        PrimitiveType::I64,
        PrimitiveType::U8,
        PrimitiveType::U16,
        PrimitiveType::U32,
        PrimitiveType::U64,
        PrimitiveType::F32,
        PrimitiveType::F64,
        PrimitiveType::Char,
        PrimitiveType::String,
        PrimitiveType::Bytes,
        PrimitiveType::Version,
    ];

    /// Name used in contract markup
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::I8 => "i8",
            PrimitiveType::I16 => "i16",
            PrimitiveType::I32 => "i32",
            PrimitiveType::I64 => "i64",
            PrimitiveType::U8 => "u8",
            PrimitiveType::U16 => "u16",
            PrimitiveType::U32 => "u32",
            PrimitiveType::U64 => "u64",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
            PrimitiveType::Char => "char",
            PrimitiveType::String => "string",
            PrimitiveType::Bytes => "bytes",
            PrimitiveType::Version => "version",
        }
    }

    /// Parse a markup name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An enumerated type: a name plus its symbolic members
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<String>,
}

/// A single field of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDef,
    /// Fields with a default may be absent from the data being read
    #[serde(default)]
    pub has_default: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            has_default: false,
        }
    }

    /// Mark the field as having a default value
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

/// A record type with named fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// One alternative of a union
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnionMember {
    pub name: String,
    pub ty: TypeDef,
}

/// A tagged union whose members are identified by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnionDef {
    pub name: String,
    pub members: Vec<UnionMember>,
}

/// Structural description of a type as it participates in serialization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDef {
    Primitive { primitive: PrimitiveType },
    Unit,
    Enum(EnumDef),
    Nullable { inner: Box<TypeDef> },
    List { item: Box<TypeDef> },
    Dictionary { key: Box<TypeDef>, value: Box<TypeDef> },
    Record(RecordDef),
    Union(UnionDef),
    /// Reference to a definition registered with the collection by name
    Named { name: String },
    /// A type known only by name; no provider handles it
    Opaque { name: String },
}

impl TypeDef {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        TypeDef::Primitive { primitive }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeDef::Enum(EnumDef {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        })
    }

    pub fn nullable(inner: TypeDef) -> Self {
        TypeDef::Nullable {
            inner: Box::new(inner),
        }
    }

    pub fn list(item: TypeDef) -> Self {
        TypeDef::List {
            item: Box::new(item),
        }
    }

    pub fn dictionary(key: TypeDef, value: TypeDef) -> Self {
        TypeDef::Dictionary {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn record(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        TypeDef::Record(RecordDef {
            name: name.into(),
            fields,
        })
    }

    pub fn union<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = (S, TypeDef)>,
        S: Into<String>,
    {
        TypeDef::Union(UnionDef {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(name, ty)| UnionMember {
                    name: name.into(),
                    ty,
                })
                .collect(),
        })
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeDef::Named { name: name.into() }
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        TypeDef::Opaque { name: name.into() }
    }

    /// Name under which a definition can be registered, if it has one
    pub fn definition_name(&self) -> Option<&str> {
        match self {
            TypeDef::Enum(def) => Some(&def.name),
            TypeDef::Record(def) => Some(&def.name),
            TypeDef::Union(def) => Some(&def.name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDef::Primitive { primitive } => write!(f, "{}", primitive),
            TypeDef::Unit => f.write_str("()"),
            TypeDef::Enum(def) => write!(f, "enum {}", def.name),
            TypeDef::Nullable { inner } => write!(f, "nullable<{}>", inner),
            TypeDef::List { item } => write!(f, "list<{}>", item),
            TypeDef::Dictionary { key, value } => write!(f, "dictionary<{}, {}>", key, value),
            TypeDef::Record(def) => write!(f, "record {}", def.name),
            TypeDef::Union(def) => write!(f, "union {}", def.name),
            TypeDef::Named { name } => f.write_str(name),
            TypeDef::Opaque { name } => write!(f, "opaque {}", name),
        }
    }
}

/// Rust types that can describe their own serialized shape
pub trait Describe {
    fn describe() -> TypeDef;
}

macro_rules! describe_primitive {
    ($($ty:ty => $primitive:ident),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDef {
                    TypeDef::primitive(PrimitiveType::$primitive)
                }
            }
        )*
    };
}

describe_primitive! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
}

impl Describe for () {
    fn describe() -> TypeDef {
        TypeDef::Unit
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDef {
        TypeDef::nullable(T::describe())
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDef {
        TypeDef::list(T::describe())
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> TypeDef {
        TypeDef::dictionary(K::describe(), V::describe())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDef {
        TypeDef::dictionary(K::describe(), V::describe())
    }
}
