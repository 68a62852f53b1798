//! Tagged unions with named members

use std::collections::BTreeMap;

use crate::collection::ContractCollection;
use crate::compatibility::Traversal;
use crate::contract::{Contract, ContractId, ContractRefs, Direction, MemberName};
use crate::descriptor::Element;
use crate::error::{ContractError, Result};
use crate::types::{TypeDef, UnionDef};

pub(crate) fn can_provide(ty: &TypeDef) -> bool {
    matches!(ty, TypeDef::Union(_))
}

fn union_def(ty: &TypeDef) -> Result<&UnionDef> {
    match ty {
        TypeDef::Union(def) if def.members.is_empty() => {
            Err(ContractError::InvalidType(format!("union {} has no members", def.name)))
        }
        TypeDef::Union(def) => Ok(def),
        other => Err(ContractError::InvalidType(format!("{} must be a union", other))),
    }
}

fn members_from_type(
    ty: &TypeDef,
    direction: Direction,
    collection: &mut ContractCollection,
) -> Result<BTreeMap<MemberName, ContractId>> {
    let def = union_def(ty)?;
    let mut members = Vec::with_capacity(def.members.len());
    for member in &def.members {
        let contract = match direction {
            Direction::Write => collection.get_or_add_write_contract(&member.ty)?.id(),
            Direction::Read => collection.get_or_add_read_contract(&member.ty)?.id(),
        };
        members.push((MemberName::new(member.name.as_str()), contract));
    }
    collect_members(members).map_err(|e| match e {
        ContractError::InvalidType(reason) => ContractError::InvalidType(format!("union {}: {}", def.name, reason)),
        other => other,
    })
}

fn collect_members<I>(members: I) -> Result<BTreeMap<MemberName, ContractId>>
where
    I: IntoIterator<Item = (MemberName, ContractId)>,
{
    let mut map = BTreeMap::new();
    for (name, contract) in members {
        if map.contains_key(&name) {
            return Err(ContractError::InvalidType(format!("duplicate union member '{}'", name)));
        }
        map.insert(name, contract);
    }
    Ok(map)
}

fn members_from_element<F>(element: &Element, mut resolve: F) -> Result<BTreeMap<MemberName, ContractId>>
where
    F: FnMut(&str) -> Result<ContractId>,
{
    let members = element
        .elements("Member")
        .map(|member| {
            Ok((
                MemberName::new(member.required_attribute("Name")?),
                resolve(member.required_attribute("Contract")?)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    collect_members(members).map_err(|e| ContractError::malformed(e.to_string()))
}

fn members_to_element(
    kind: &'static str,
    id: Option<&str>,
    members: &BTreeMap<MemberName, ContractId>,
    refs: &dyn ContractRefs,
) -> Result<Element> {
    let id = id.ok_or(ContractError::MissingId { kind })?;
    let mut element = Element::new(kind).with_attribute("Id", id);
    for (name, contract) in members {
        element = element.with_child(
            Element::new("Member")
                .with_attribute("Name", name.as_str())
                .with_attribute("Contract", refs.reference(*contract)?),
        );
    }
    Ok(element)
}

fn map_members<F>(members: &BTreeMap<MemberName, ContractId>, mut f: F) -> Result<BTreeMap<MemberName, ContractId>>
where
    F: FnMut(ContractId) -> Result<ContractId>,
{
    members
        .iter()
        .map(|(name, contract)| Ok((name.clone(), f(*contract)?)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionWriteContract {
    pub(crate) members: BTreeMap<MemberName, ContractId>,
}

impl UnionWriteContract {
    pub fn new<I>(members: I) -> Result<Self>
    where
        I: IntoIterator<Item = (MemberName, ContractId)>,
    {
        Ok(Self {
            members: collect_members(members)?,
        })
    }

    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        Ok(Self {
            members: members_from_type(ty, Direction::Write, collection)?,
        })
    }

    pub fn members(&self) -> &BTreeMap<MemberName, ContractId> {
        &self.members
    }

    pub(crate) fn from_element<F>(element: &Element, resolve: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<ContractId>,
    {
        Ok(Self {
            members: members_from_element(element, resolve)?,
        })
    }

    pub(crate) fn map_children<F>(&self, f: F) -> Result<Self>
    where
        F: FnMut(ContractId) -> Result<ContractId>,
    {
        Ok(Self {
            members: map_members(&self.members, f)?,
        })
    }

    pub(crate) fn to_element(&self, id: Option<&str>, refs: &dyn ContractRefs) -> Result<Element> {
        members_to_element("UnionWrite", id, &self.members, refs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionReadContract {
    pub(crate) members: BTreeMap<MemberName, ContractId>,
}

impl UnionReadContract {
    pub fn new<I>(members: I) -> Result<Self>
    where
        I: IntoIterator<Item = (MemberName, ContractId)>,
    {
        Ok(Self {
            members: collect_members(members)?,
        })
    }

    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        Ok(Self {
            members: members_from_type(ty, Direction::Read, collection)?,
        })
    }

    pub fn members(&self) -> &BTreeMap<MemberName, ContractId> {
        &self.members
    }

    pub(crate) fn from_element<F>(element: &Element, resolve: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<ContractId>,
    {
        Ok(Self {
            members: members_from_element(element, resolve)?,
        })
    }

    pub(crate) fn map_children<F>(&self, f: F) -> Result<Self>
    where
        F: FnMut(ContractId) -> Result<ContractId>,
    {
        Ok(Self {
            members: map_members(&self.members, f)?,
        })
    }

    /// Every member the writer may send must be known to the reader; strict
    /// mode also forbids reader-only members.
    pub(crate) fn can_read_from(&self, write: &Contract, cx: &mut Traversal<'_>) -> bool {
        let ws = match write {
            Contract::UnionWrite(ws) => ws,
            _ => return false,
        };

        if cx.strict() {
            if let Some(extra) = self.members.keys().find(|name| !ws.members.contains_key(*name)) {
                cx.mismatch(format!("reader member '{}' is not written", extra));
                return false;
            }
        }

        for (name, write_member) in &ws.members {
            let read_member = match self.members.get(name) {
                Some(read_member) => *read_member,
                None => {
                    cx.mismatch(format!("writer member '{}' is unknown to the reader", name));
                    return false;
                }
            };
            let segment = format!("<{}>", name);
            if !cx.scoped(segment, |cx| cx.check(read_member, *write_member)) {
                return false;
            }
        }

        true
    }

    pub(crate) fn to_element(&self, id: Option<&str>, refs: &dyn ContractRefs) -> Result<Element> {
        members_to_element("UnionRead", id, &self.members, refs)
    }
}
