//! Record contracts
//!
//! Fields are kept sorted by case-insensitive name so that reader and writer
//! field lists can be compared in a single merge pass.

use crate::collection::ContractCollection;
use crate::compatibility::Traversal;
use crate::contract::{Contract, ContractId, ContractRefs, MemberName};
use crate::descriptor::Element;
use crate::error::{ContractError, Result};
use crate::types::{RecordDef, TypeDef};

pub(crate) fn can_provide(ty: &TypeDef) -> bool {
    matches!(ty, TypeDef::Record(_))
}

fn record_def(ty: &TypeDef) -> Result<&RecordDef> {
    match ty {
        TypeDef::Record(def) => Ok(def),
        other => Err(ContractError::InvalidType(format!("{} must be a record", other))),
    }
}

fn in_record(def: &RecordDef, e: ContractError) -> ContractError {
    match e {
        ContractError::InvalidType(reason) => {
            ContractError::InvalidType(format!("record {}: {}", def.name, reason))
        }
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComplexWriteField {
    pub name: MemberName,
    pub contract: ContractId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComplexReadField {
    pub name: MemberName,
    pub contract: ContractId,
    /// Required fields have no default and must be present in the data
    pub required: bool,
}

fn sorted_unique<T, F>(mut fields: Vec<T>, name: F) -> Result<Vec<T>>
where
    F: Fn(&T) -> &MemberName,
{
    fields.sort_by(|a, b| name(a).cmp(name(b)));
    if let Some(pair) = fields.windows(2).find(|pair| name(&pair[0]) == name(&pair[1])) {
        return Err(ContractError::InvalidType(format!(
            "duplicate field '{}'",
            name(&pair[1])
        )));
    }
    Ok(fields)
}

fn parse_required(value: Option<&str>) -> Result<bool> {
    match value {
        None | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ContractError::malformed(format!(
            "Required must be true or false, found '{}'",
            other
        ))),
    }
}

/// Write side of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComplexWriteContract {
    pub(crate) fields: Vec<ComplexWriteField>,
}

impl ComplexWriteContract {
    pub fn new(fields: Vec<ComplexWriteField>) -> Result<Self> {
        Ok(Self {
            fields: sorted_unique(fields, |f| &f.name)?,
        })
    }

    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let def = record_def(ty)?;
        let fields = def
            .fields
            .iter()
            .map(|field| {
                Ok(ComplexWriteField {
                    name: MemberName::new(field.name.as_str()),
                    contract: collection.get_or_add_write_contract(&field.ty)?.id(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields).map_err(|e| in_record(def, e))
    }

    pub fn fields(&self) -> &[ComplexWriteField] {
        &self.fields
    }

    pub(crate) fn from_element<F>(element: &Element, mut resolve: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<ContractId>,
    {
        let fields = element
            .elements("Field")
            .map(|field| {
                Ok(ComplexWriteField {
                    name: MemberName::new(field.required_attribute("Name")?),
                    contract: resolve(field.required_attribute("Contract")?)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields).map_err(|e| ContractError::malformed(e.to_string()))
    }

    pub(crate) fn map_children<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(ContractId) -> Result<ContractId>,
    {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                Ok(ComplexWriteField {
                    name: field.name.clone(),
                    contract: f(field.contract)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub(crate) fn to_element(&self, id: Option<&str>, refs: &dyn ContractRefs) -> Result<Element> {
        let id = id.ok_or(ContractError::MissingId { kind: "ComplexWrite" })?;
        let mut element = Element::new("ComplexWrite").with_attribute("Id", id);
        for field in &self.fields {
            element = element.with_child(
                Element::new("Field")
                    .with_attribute("Name", field.name.as_str())
                    .with_attribute("Contract", refs.reference(field.contract)?),
            );
        }
        Ok(element)
    }
}

/// Read side of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComplexReadContract {
    pub(crate) fields: Vec<ComplexReadField>,
}

impl ComplexReadContract {
    pub fn new(fields: Vec<ComplexReadField>) -> Result<Self> {
        Ok(Self {
            fields: sorted_unique(fields, |f| &f.name)?,
        })
    }

    /// Fields without a default are required
    pub fn from_type(ty: &TypeDef, collection: &mut ContractCollection) -> Result<Self> {
        let def = record_def(ty)?;
        let fields = def
            .fields
            .iter()
            .map(|field| {
                Ok(ComplexReadField {
                    name: MemberName::new(field.name.as_str()),
                    contract: collection.get_or_add_read_contract(&field.ty)?.id(),
                    required: !field.has_default,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields).map_err(|e| in_record(def, e))
    }

    pub fn fields(&self) -> &[ComplexReadField] {
        &self.fields
    }

    pub(crate) fn from_element<F>(element: &Element, mut resolve: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<ContractId>,
    {
        let fields = element
            .elements("Field")
            .map(|field| {
                Ok(ComplexReadField {
                    name: MemberName::new(field.required_attribute("Name")?),
                    contract: resolve(field.required_attribute("Contract")?)?,
                    required: parse_required(field.attribute("Required"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields).map_err(|e| ContractError::malformed(e.to_string()))
    }

    pub(crate) fn map_children<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(ContractId) -> Result<ContractId>,
    {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                Ok(ComplexReadField {
                    name: field.name.clone(),
                    contract: f(field.contract)?,
                    required: field.required,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub(crate) fn can_read_from(&self, write: &Contract, cx: &mut Traversal<'_>) -> bool {
        let ws = match write {
            Contract::ComplexWrite(ws) => ws,
            Contract::Empty(_) => return self.can_read_from_empty(cx),
            _ => return false,
        };

        let mut iw = 0;
        for rf in &self.fields {
            // writer-only fields sort before this reader field
            while iw < ws.fields.len() && ws.fields[iw].name < rf.name {
                if cx.strict() {
                    cx.mismatch(format!("writer field '{}' is unknown to the reader", ws.fields[iw].name));
                    return false;
                }
                iw += 1;
            }

            match ws.fields.get(iw) {
                Some(wf) if wf.name == rf.name => {
                    let segment = format!(".{}", rf.name);
                    if !cx.scoped(segment, |cx| cx.check(rf.contract, wf.contract)) {
                        return false;
                    }
                    iw += 1;
                }
                _ => {
                    if cx.strict() || rf.required {
                        cx.mismatch(format!("reader field '{}' is missing from the writer", rf.name));
                        return false;
                    }
                }
            }
        }

        if cx.strict() && iw < ws.fields.len() {
            cx.mismatch(format!("writer field '{}' is unknown to the reader", ws.fields[iw].name));
            return false;
        }

        true
    }

    fn can_read_from_empty(&self, cx: &mut Traversal<'_>) -> bool {
        if cx.strict() {
            cx.mismatch("strict mode cannot read a record from an empty writer");
            return false;
        }
        match self.fields.iter().find(|f| f.required) {
            Some(field) => {
                cx.mismatch(format!("reader field '{}' is missing from the writer", field.name));
                false
            }
            None => true,
        }
    }

    pub(crate) fn to_element(&self, id: Option<&str>, refs: &dyn ContractRefs) -> Result<Element> {
        let id = id.ok_or(ContractError::MissingId { kind: "ComplexRead" })?;
        let mut element = Element::new("ComplexRead").with_attribute("Id", id);
        for field in &self.fields {
            element = element.with_child(
                Element::new("Field")
                    .with_attribute("Name", field.name.as_str())
                    .with_attribute("Contract", refs.reference(field.contract)?)
                    .with_attribute("Required", if field.required { "true" } else { "false" }),
            );
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_sorted_case_insensitively() {
        let contract = ComplexWriteContract::new(vec![
            ComplexWriteField { name: MemberName::new("zeta"), contract: ContractId(0) },
            ComplexWriteField { name: MemberName::new("Alpha"), contract: ContractId(1) },
            ComplexWriteField { name: MemberName::new("beta"), contract: ContractId(2) },
        ])
        .unwrap();
        let names: Vec<_> = contract.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let result = ComplexReadContract::new(vec![
            ComplexReadField { name: MemberName::new("id"), contract: ContractId(0), required: true },
            ComplexReadField { name: MemberName::new("ID"), contract: ContractId(0), required: false },
        ]);
        assert!(matches!(result, Err(ContractError::InvalidType(_))));
    }

    #[test]
    fn test_required_attribute_parsing() {
        assert!(parse_required(None).unwrap());
        assert!(!parse_required(Some("false")).unwrap());
        assert!(parse_required(Some("maybe")).is_err());
    }
}
