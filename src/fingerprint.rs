//! Structural fingerprints of contract graphs
//!
//! A fingerprint is the SHA256 of a canonical rendering of the graph under a
//! root. Assigned descriptor ids, arena handles and member spelling do not
//! take part, so structurally equal graphs held by different collections
//! share a fingerprint.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::collection::ContractCollection;
use crate::config::OutputFormat;
use crate::contract::{ContractId, ContractRefs};
use crate::descriptor::Element;
use crate::error::{ContractError, Result};

/// SHA256 fingerprint of a contract graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the graph under `root`
    pub fn of(collection: &ContractCollection, root: ContractId) -> Result<Self> {
        Ok(Self::from_str(&canonical_rendering(collection, root)?))
    }

    /// Compute a fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute a fingerprint from a string
    pub fn from_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the graph under `root` still has this fingerprint
    pub fn verify(&self, collection: &ContractCollection, root: ContractId) -> Result<bool> {
        Ok(*self == Self::of(collection, root)?)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// By-reference nodes are numbered in depth-first order of first visit
struct CanonicalRefs<'a> {
    collection: &'a ContractCollection,
    numbers: HashMap<ContractId, usize>,
}

impl ContractRefs for CanonicalRefs<'_> {
    fn reference(&self, id: ContractId) -> Result<String> {
        let contract = self.collection.contract(id)?;
        if contract.is_by_ref() {
            return match self.numbers.get(&id) {
                Some(n) => Ok(format!("#{}", n)),
                None => Err(ContractError::MissingId { kind: contract.kind() }),
            };
        }
        contract
            .markup_value(self)?
            .ok_or(ContractError::MissingId { kind: contract.kind() })
    }
}

fn number(collection: &ContractCollection, id: ContractId, order: &mut Vec<ContractId>, numbers: &mut HashMap<ContractId, usize>) -> Result<()> {
    let contract = collection.contract(id)?;
    if contract.is_by_ref() {
        if numbers.contains_key(&id) {
            return Ok(());
        }
        numbers.insert(id, order.len());
        order.push(id);
    }
    for child in contract.children() {
        number(collection, child, order, numbers)?;
    }
    Ok(())
}

/// Member, field and union names compare case-insensitively
fn fold_names(element: &mut Element) {
    if let Some(name) = element.attributes.get_mut("Name") {
        *name = name.to_lowercase();
    }
    for child in &mut element.children {
        fold_names(child);
    }
}

fn canonical_rendering(collection: &ContractCollection, root: ContractId) -> Result<String> {
    let mut order = Vec::new();
    let mut numbers = HashMap::new();
    number(collection, root, &mut order, &mut numbers)?;

    let refs = CanonicalRefs { collection, numbers };
    let mut rendering = refs.reference(root)?;
    for (n, id) in order.iter().enumerate() {
        let local = n.to_string();
        if let Some(mut element) = collection.contract(*id)?.to_element(Some(local.as_str()), &refs)? {
            fold_names(&mut element);
            rendering.push('\n');
            rendering.push_str(&element.to_json_string(OutputFormat::Compact)?);
        }
    }
    Ok(rendering)
}
