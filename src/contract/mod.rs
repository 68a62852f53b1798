//! Contract nodes
//!
//! A contract describes the shape of one type as it is written or read. Nodes
//! live in a [`ContractCollection`](crate::ContractCollection) arena and refer
//! to nested contracts by [`ContractId`] handle, so equality and hashing of a
//! node cover its own fields plus the identities of its (interned) children.
//!
//! Every node kind is either *by-reference* (rendered once in a descriptor and
//! referred to as `#Id`) or *by-value* (always inlined at its point of use).

pub mod complex;
pub mod empty;
pub mod enumeration;
pub mod list;
pub mod nullable;
pub mod primitive;
pub mod union;

pub use complex::{ComplexReadContract, ComplexReadField, ComplexWriteContract, ComplexWriteField};
pub use empty::EmptyContract;
pub use enumeration::EnumContract;
pub use list::{DictionaryReadContract, DictionaryWriteContract, ListReadContract, ListWriteContract};
pub use nullable::{NullableReadContract, NullableWriteContract};
pub use primitive::PrimitiveContract;
pub use union::{UnionReadContract, UnionWriteContract};

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::compatibility::Traversal;
use crate::descriptor::Element;
use crate::error::Result;

/// Handle of a contract node inside one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId(pub(crate) usize);

impl ContractId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Handle of a node usable on the write side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteContractId(pub(crate) ContractId);

/// Handle of a node usable on the read side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadContractId(pub(crate) ContractId);

impl WriteContractId {
    pub fn id(&self) -> ContractId {
        self.0
    }
}

impl ReadContractId {
    pub fn id(&self) -> ContractId {
        self.0
    }
}

/// Which side of a schema exchange a node describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Write,
    Read,
}

/// How a node participates in interning and descriptor emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Always inlined, never receives an id
    ByValue,
    /// Addressed by an assigned id wherever it recurs
    ByRef,
}

/// Case-insensitive name of an enum member, record field or union member.
///
/// The original spelling is kept for descriptor output.
#[derive(Debug, Clone)]
pub struct MemberName {
    name: String,
    folded: String,
}

impl MemberName {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let folded = name.to_lowercase();
        Self { name, folded }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub(crate) fn folded(&self) -> &str {
        &self.folded
    }
}

impl PartialEq for MemberName {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for MemberName {}

impl Hash for MemberName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for MemberName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MemberName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Display for MemberName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Renders the reference string of a child node
pub trait ContractRefs {
    fn reference(&self, id: ContractId) -> Result<String>;
}

/// A schema node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Contract {
    Primitive(PrimitiveContract),
    Empty(EmptyContract),
    Enum(EnumContract),
    NullableWrite(NullableWriteContract),
    NullableRead(NullableReadContract),
    ListWrite(ListWriteContract),
    ListRead(ListReadContract),
    DictionaryWrite(DictionaryWriteContract),
    DictionaryRead(DictionaryReadContract),
    ComplexWrite(ComplexWriteContract),
    ComplexRead(ComplexReadContract),
    UnionWrite(UnionWriteContract),
    UnionRead(UnionReadContract),
}

impl Contract {
    /// Kind name, also the descriptor element name of by-reference nodes
    pub fn kind(&self) -> &'static str {
        match self {
            Contract::Primitive(_) => "Primitive",
            Contract::Empty(_) => "Empty",
            Contract::Enum(_) => "Enum",
            Contract::NullableWrite(_) => "NullableWrite",
            Contract::NullableRead(_) => "NullableRead",
            Contract::ListWrite(_) => "ListWrite",
            Contract::ListRead(_) => "ListRead",
            Contract::DictionaryWrite(_) => "DictionaryWrite",
            Contract::DictionaryRead(_) => "DictionaryRead",
            Contract::ComplexWrite(_) => "ComplexWrite",
            Contract::ComplexRead(_) => "ComplexRead",
            Contract::UnionWrite(_) => "UnionWrite",
            Contract::UnionRead(_) => "UnionRead",
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Contract::Enum(_)
            | Contract::ComplexWrite(_)
            | Contract::ComplexRead(_)
            | Contract::UnionWrite(_)
            | Contract::UnionRead(_) => Strategy::ByRef,
            _ => Strategy::ByValue,
        }
    }

    pub fn is_by_ref(&self) -> bool {
        self.strategy() == Strategy::ByRef
    }

    /// Whether the node can describe data produced by a writer
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            Contract::Primitive(_)
                | Contract::Empty(_)
                | Contract::Enum(_)
                | Contract::NullableWrite(_)
                | Contract::ListWrite(_)
                | Contract::DictionaryWrite(_)
                | Contract::ComplexWrite(_)
                | Contract::UnionWrite(_)
        )
    }

    /// Whether the node can describe data expected by a reader
    pub fn is_readable(&self) -> bool {
        matches!(
            self,
            Contract::Primitive(_)
                | Contract::Empty(_)
                | Contract::Enum(_)
                | Contract::NullableRead(_)
                | Contract::ListRead(_)
                | Contract::DictionaryRead(_)
                | Contract::ComplexRead(_)
                | Contract::UnionRead(_)
        )
    }

    /// Directly nested contracts, in declaration order
    pub fn children(&self) -> Vec<ContractId> {
        match self {
            Contract::Primitive(_) | Contract::Empty(_) | Contract::Enum(_) => Vec::new(),
            Contract::NullableWrite(c) => vec![c.inner],
            Contract::NullableRead(c) => vec![c.inner],
            Contract::ListWrite(c) => vec![c.item],
            Contract::ListRead(c) => vec![c.item],
            Contract::DictionaryWrite(c) => vec![c.key, c.value],
            Contract::DictionaryRead(c) => vec![c.key, c.value],
            Contract::ComplexWrite(c) => c.fields.iter().map(|f| f.contract).collect(),
            Contract::ComplexRead(c) => c.fields.iter().map(|f| f.contract).collect(),
            Contract::UnionWrite(c) => c.members.values().copied().collect(),
            Contract::UnionRead(c) => c.members.values().copied().collect(),
        }
    }

    /// Rebuild the node with every child handle translated by `f`
    pub(crate) fn map_children<F>(&self, mut f: F) -> Result<Contract>
    where
        F: FnMut(ContractId) -> Result<ContractId>,
    {
        Ok(match self {
            Contract::Primitive(_) | Contract::Empty(_) | Contract::Enum(_) => self.clone(),
            Contract::NullableWrite(c) => Contract::NullableWrite(NullableWriteContract::new(f(c.inner)?)),
            Contract::NullableRead(c) => Contract::NullableRead(NullableReadContract::new(f(c.inner)?)),
            Contract::ListWrite(c) => Contract::ListWrite(ListWriteContract::new(f(c.item)?)),
            Contract::ListRead(c) => Contract::ListRead(ListReadContract::new(f(c.item)?)),
            Contract::DictionaryWrite(c) => {
                Contract::DictionaryWrite(DictionaryWriteContract::new(f(c.key)?, f(c.value)?))
            }
            Contract::DictionaryRead(c) => {
                Contract::DictionaryRead(DictionaryReadContract::new(f(c.key)?, f(c.value)?))
            }
            Contract::ComplexWrite(c) => Contract::ComplexWrite(c.map_children(f)?),
            Contract::ComplexRead(c) => Contract::ComplexRead(c.map_children(f)?),
            Contract::UnionWrite(c) => Contract::UnionWrite(c.map_children(f)?),
            Contract::UnionRead(c) => Contract::UnionRead(c.map_children(f)?),
        })
    }

    /// The node with every child handle erased
    pub(crate) fn shape(&self) -> Option<Contract> {
        self.map_children(|_| Ok(ContractId(0))).ok()
    }

    /// Deterministic hash over the node's semantic content
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Inline markup of a by-value node; `None` for by-reference nodes
    pub fn markup_value(&self, refs: &dyn ContractRefs) -> Result<Option<String>> {
        Ok(Some(match self {
            Contract::Primitive(c) => c.markup_value(),
            Contract::Empty(c) => c.markup_value(),
            Contract::NullableWrite(c) => c.markup_value(refs)?,
            Contract::NullableRead(c) => c.markup_value(refs)?,
            Contract::ListWrite(c) => c.markup_value(refs)?,
            Contract::ListRead(c) => c.markup_value(refs)?,
            Contract::DictionaryWrite(c) => c.markup_value(refs)?,
            Contract::DictionaryRead(c) => c.markup_value(refs)?,
            Contract::Enum(_)
            | Contract::ComplexWrite(_)
            | Contract::ComplexRead(_)
            | Contract::UnionWrite(_)
            | Contract::UnionRead(_) => return Ok(None),
        }))
    }

    /// Descriptor element of a by-reference node; `None` for by-value nodes
    pub fn to_element(&self, id: Option<&str>, refs: &dyn ContractRefs) -> Result<Option<Element>> {
        Ok(Some(match self {
            Contract::Enum(c) => c.to_element(id)?,
            Contract::ComplexWrite(c) => c.to_element(id, refs)?,
            Contract::ComplexRead(c) => c.to_element(id, refs)?,
            Contract::UnionWrite(c) => c.to_element(id, refs)?,
            Contract::UnionRead(c) => c.to_element(id, refs)?,
            _ => return Ok(None),
        }))
    }

    /// Whether this node, as a reader, accepts data described by `write`.
    ///
    /// Write-only nodes never read anything.
    pub(crate) fn can_read_from(&self, write: &Contract, cx: &mut Traversal<'_>) -> bool {
        match self {
            Contract::Primitive(c) => c.can_read_from(write, cx.strict()),
            Contract::Enum(c) => c.can_read_from(write, cx.strict()),
            Contract::Empty(c) => c.can_read_from(write, cx.strict()),
            Contract::NullableRead(c) => c.can_read_from(write, cx),
            Contract::ListRead(c) => c.can_read_from(write, cx),
            Contract::DictionaryRead(c) => c.can_read_from(write, cx),
            Contract::ComplexRead(c) => c.can_read_from(write, cx),
            Contract::UnionRead(c) => c.can_read_from(write, cx),
            Contract::NullableWrite(_)
            | Contract::ListWrite(_)
            | Contract::DictionaryWrite(_)
            | Contract::ComplexWrite(_)
            | Contract::UnionWrite(_) => false,
        }
    }
}
