//! Enumerated types

use std::collections::BTreeSet;

use crate::contract::{Contract, MemberName};
use crate::descriptor::Element;
use crate::error::{ContractError, Result};
use crate::types::{EnumDef, TypeDef};

/// Contract of an enumerated type, usable for both writing and reading.
///
/// Member names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumContract {
    members: BTreeSet<MemberName>,
}

impl EnumContract {
    pub fn can_provide(ty: &TypeDef) -> bool {
        matches!(ty, TypeDef::Enum(_))
    }

    /// Build from a live enum definition
    pub fn from_type(ty: &TypeDef) -> Result<Self> {
        match ty {
            TypeDef::Enum(def) => Self::from_def(def),
            other => Err(ContractError::InvalidType(format!("{} must be an enum", other))),
        }
    }

    pub fn from_def(def: &EnumDef) -> Result<Self> {
        if def.members.is_empty() {
            return Err(ContractError::InvalidType(format!("enum {} has no members", def.name)));
        }
        Self::from_names(def.members.iter().map(String::as_str)).map_err(|e| match e {
            ContractError::InvalidType(reason) => {
                ContractError::InvalidType(format!("enum {}: {}", def.name, reason))
            }
            other => other,
        })
    }

    /// Build from member names; names equal ignoring case are rejected
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members = BTreeSet::new();
        for name in names {
            let name = MemberName::new(name);
            if !members.insert(name.clone()) {
                return Err(ContractError::InvalidType(format!(
                    "duplicate enum member '{}'",
                    name
                )));
            }
        }
        Ok(Self { members })
    }

    /// Build from a descriptor `Enum` element
    pub fn from_element(element: &Element) -> Result<Self> {
        if element.name != "Enum" {
            return Err(ContractError::malformed(format!(
                "expected Enum element, found {}",
                element.name
            )));
        }
        let members = element
            .elements("Member")
            .map(|member| member.required_attribute("Name").map(MemberName::new))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self { members })
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberName> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn can_read_from(&self, write: &Contract, strict: bool) -> bool {
        let that = match write {
            Contract::Enum(that) => that,
            _ => return false,
        };
        if strict {
            self.members == that.members
        } else {
            self.members.is_superset(&that.members)
        }
    }

    /// Writer members this reader does not know
    pub fn missing_members<'a>(&'a self, writer: &'a EnumContract) -> Vec<&'a MemberName> {
        writer.members.difference(&self.members).collect()
    }

    pub fn to_element(&self, id: Option<&str>) -> Result<Element> {
        let id = id.ok_or(ContractError::MissingId { kind: "Enum" })?;
        Ok(self.members.iter().fold(
            Element::new("Enum").with_attribute("Id", id),
            |element, member| {
                element.with_child(Element::new("Member").with_attribute("Name", member.as_str()))
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn enum_of(names: &[&str]) -> Contract {
        Contract::Enum(EnumContract::from_names(names.iter().copied()).unwrap())
    }

    fn can_read(reader: &[&str], writer: &[&str], strict: bool) -> bool {
        let reader = EnumContract::from_names(reader.iter().copied()).unwrap();
        reader.can_read_from(&enum_of(writer), strict)
    }

    #[test]
    fn test_same_members() {
        assert!(can_read(&["A", "B"], &["A", "B"], true));
        assert!(can_read(&["A", "B"], &["A", "B"], false));
    }

    #[test]
    fn test_reader_has_extra_member() {
        assert!(!can_read(&["A", "B", "C"], &["A", "B"], true));
        assert!(can_read(&["A", "B", "C"], &["A", "B"], false));
    }

    #[test]
    fn test_writer_has_extra_member() {
        assert!(!can_read(&["A", "B"], &["A", "B", "C"], true));
        assert!(!can_read(&["A", "B"], &["A", "B", "C"], false));
    }

    #[test]
    fn test_case_insensitive() {
        let a = EnumContract::from_names(["Red", "Blue"]).unwrap();
        let b = EnumContract::from_names(["red", "blue"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            Contract::Enum(a.clone()).structural_hash(),
            Contract::Enum(b.clone()).structural_hash()
        );
        assert!(a.can_read_from(&Contract::Enum(b.clone()), true));
        assert!(b.can_read_from(&Contract::Enum(a), true));
    }

    #[test]
    fn test_non_enum_writer() {
        let reader = EnumContract::from_names(["A"]).unwrap();
        let writer = Contract::Empty(crate::contract::EmptyContract);
        assert!(!reader.can_read_from(&writer, false));
    }

    #[test]
    fn test_from_type_rejects_non_enum() {
        let result = EnumContract::from_type(&TypeDef::Unit);
        assert!(matches!(result, Err(ContractError::InvalidType(_))));
    }

    #[test]
    fn test_duplicate_members_rejected() {
        let def = EnumDef {
            name: "Color".to_string(),
            members: vec!["Red".to_string(), "RED".to_string()],
        };
        assert!(EnumContract::from_def(&def).is_err());
    }

    #[test]
    fn test_empty_definition_rejected() {
        let result = EnumContract::from_type(&TypeDef::enumeration("Nothing", Vec::<String>::new()));
        assert!(matches!(result, Err(ContractError::InvalidType(reason)) if reason.contains("Nothing")));
    }

    #[test]
    fn test_missing_members() {
        let reader = EnumContract::from_names(["A"]).unwrap();
        let writer = EnumContract::from_names(["A", "B", "C"]).unwrap();
        let missing: Vec<_> = reader.missing_members(&writer).iter().map(|m| m.as_str()).collect();
        assert_eq!(missing, vec!["B", "C"]);
    }

    #[test]
    fn test_element_requires_id() {
        let contract = EnumContract::from_names(["A"]).unwrap();
        assert!(matches!(
            contract.to_element(None),
            Err(ContractError::MissingId { kind: "Enum" })
        ));
    }

    #[test]
    fn test_element_round_trip() {
        let contract = EnumContract::from_names(["Small", "Medium", "Large"]).unwrap();
        let element = contract.to_element(Some("Size")).unwrap();
        assert_eq!(element.attribute("Id"), Some("Size"));
        assert_eq!(element.elements("Member").count(), 3);
        assert_eq!(EnumContract::from_element(&element).unwrap(), contract);
    }

    #[test]
    fn test_element_member_without_name() {
        let element = Element::new("Enum")
            .with_attribute("Id", "E")
            .with_child(Element::new("Member"));
        assert!(matches!(
            EnumContract::from_element(&element),
            Err(ContractError::MalformedDescriptor(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_case_folding_preserves_identity(names in prop::collection::btree_set("[a-z]{1,8}", 0..6)) {
            let lower = EnumContract::from_names(names.iter().cloned()).unwrap();
            let upper = EnumContract::from_names(names.iter().map(|n| n.to_uppercase())).unwrap();
            prop_assert_eq!(&lower, &upper);
            prop_assert_eq!(
                Contract::Enum(lower.clone()).structural_hash(),
                Contract::Enum(upper.clone()).structural_hash()
            );
            prop_assert!(lower.can_read_from(&Contract::Enum(upper), true));
        }

        #[test]
        fn prop_lenient_accepts_subsets(names in prop::collection::btree_set("[a-z]{1,8}", 1..6), keep in 0usize..6) {
            let reader = EnumContract::from_names(names.iter().cloned()).unwrap();
            let writer = EnumContract::from_names(names.iter().take(keep).cloned()).unwrap();
            prop_assert!(reader.can_read_from(&Contract::Enum(writer.clone()), false));
            prop_assert_eq!(reader.can_read_from(&Contract::Enum(writer.clone()), true), writer.len() == reader.len());
        }
    }
}
