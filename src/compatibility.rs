//! Schema compatibility checking
//!
//! Decides whether data written under one contract graph can be read under
//! another. Each read node kind supplies its own `can_read_from`; the
//! [`Traversal`] drives recursion between them, remembers results and treats
//! pairs already under evaluation as compatible so recursive schemas
//! terminate.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::ContractCollection;
use crate::config::ContractsConfig;
use crate::contract::{Contract, ContractId, ReadContractId, WriteContractId};
use crate::error::{ContractError, Result};

/// Where and why a reader rejected a writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Path from the root to the rejecting node (e.g. ".items[].color")
    pub path: String,
    /// Human-readable description
    pub reason: String,
}

/// State of one compatibility query
pub(crate) struct Traversal<'a> {
    collection: &'a ContractCollection,
    strict: bool,
    /// Pairs currently being evaluated
    active: HashSet<(ContractId, ContractId)>,
    results: HashMap<(ContractId, ContractId), bool>,
    current_write: Option<ContractId>,
    path: Vec<String>,
    mismatch: Option<Mismatch>,
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(collection: &'a ContractCollection, strict: bool) -> Self {
        Self {
            collection,
            strict,
            active: HashSet::new(),
            results: HashMap::new(),
            current_write: None,
            path: Vec::new(),
            mismatch: None,
        }
    }

    pub(crate) fn strict(&self) -> bool {
        self.strict
    }

    /// Whether `read` accepts data described by `write`
    pub(crate) fn check(&mut self, read: ContractId, write: ContractId) -> bool {
        let key = (read, write);
        if let Some(result) = self.results.get(&key) {
            return *result;
        }
        if self.active.contains(&key) {
            return true;
        }

        let collection = self.collection;
        let (reader, writer) = match (collection.get(read), collection.get(write)) {
            (Some(reader), Some(writer)) => (reader, writer),
            _ => {
                self.mismatch(format!("unknown contract {} or {}", read, write));
                return false;
            }
        };

        self.active.insert(key);
        let previous = self.current_write.replace(write);
        let result = reader.can_read_from(writer, self);
        self.current_write = previous;
        self.active.remove(&key);

        if !result {
            let reason = self.leaf_reason(read, reader, write, writer);
            self.mismatch(reason);
        }
        self.results.insert(key, result);
        result
    }

    /// Check another reader against the writer currently being examined
    pub(crate) fn check_same_writer(&mut self, read: ContractId) -> bool {
        match self.current_write {
            Some(write) => self.check(read, write),
            None => false,
        }
    }

    /// Run `f` with `segment` appended to the mismatch path
    pub(crate) fn scoped<F>(&mut self, segment: impl Into<String>, f: F) -> bool
    where
        F: FnOnce(&mut Self) -> bool,
    {
        self.path.push(segment.into());
        let result = f(self);
        self.path.pop();
        result
    }

    /// Record the reason of a rejection; the deepest one wins
    pub(crate) fn mismatch(&mut self, reason: impl Into<String>) {
        if self.mismatch.is_none() {
            let path = if self.path.is_empty() {
                String::from("<root>")
            } else {
                self.path.concat()
            };
            self.mismatch = Some(Mismatch {
                path,
                reason: reason.into(),
            });
        }
    }

    pub(crate) fn into_mismatch(self) -> Option<Mismatch> {
        self.mismatch
    }

    fn leaf_reason(&self, read: ContractId, reader: &Contract, write: ContractId, writer: &Contract) -> String {
        if let (Contract::Enum(r), Contract::Enum(w)) = (reader, writer) {
            let missing: Vec<_> = r.missing_members(w).iter().map(|m| m.as_str()).collect();
            if !missing.is_empty() {
                return format!("writer enum members [{}] are unknown to the reader", missing.join(", "));
            }
            return "strict mode requires identical enum members".to_string();
        }
        format!(
            "{} cannot read {}",
            self.collection.describe(read),
            self.collection.describe(write)
        )
    }
}

/// Result of a compatibility check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// Whether the reader can consume the writer's data
    pub is_compatible: bool,
    /// Mode the check ran in
    pub strict: bool,
    /// Markup of the read contract
    pub read: String,
    /// Markup of the write contract
    pub write: String,
    /// First rejection found, if any
    pub mismatch: Option<Mismatch>,
    /// Summary of the compatibility check
    pub summary: String,
}

impl CompatibilityResult {
    fn compatible(strict: bool, read: String, write: String) -> Self {
        Self {
            is_compatible: true,
            strict,
            summary: format!("{} can read {}", read, write),
            read,
            write,
            mismatch: None,
        }
    }

    fn incompatible(strict: bool, read: String, write: String, mismatch: Mismatch) -> Self {
        Self {
            is_compatible: false,
            strict,
            summary: format!("at {}: {}", mismatch.path, mismatch.reason),
            read,
            write,
            mismatch: Some(mismatch),
        }
    }
}

/// Compatibility checker for contract graphs
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityChecker {
    /// Strict mode - reader and writer must describe the same shape
    strict_mode: bool,
}

impl CompatibilityChecker {
    /// Create a new lenient compatibility checker
    pub fn new() -> Self {
        Self { strict_mode: false }
    }

    /// Enable strict mode
    pub fn strict(mut self) -> Self {
        self.strict_mode = true;
        self
    }

    pub fn from_config(config: &ContractsConfig) -> Self {
        Self {
            strict_mode: config.compatibility.strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict_mode
    }

    pub fn can_read_from(&self, collection: &ContractCollection, read: ReadContractId, write: WriteContractId) -> bool {
        collection.can_read_from(read, write, self.strict_mode)
    }

    /// Check compatibility and explain the first rejection
    pub fn check(&self, collection: &ContractCollection, read: ReadContractId, write: WriteContractId) -> CompatibilityResult {
        let mut traversal = Traversal::new(collection, self.strict_mode);
        let compatible = traversal.check(read.id(), write.id());
        let read_markup = collection.describe(read.id());
        let write_markup = collection.describe(write.id());

        if compatible {
            return CompatibilityResult::compatible(self.strict_mode, read_markup, write_markup);
        }

        let mismatch = traversal.into_mismatch().unwrap_or_else(|| Mismatch {
            path: String::from("<root>"),
            reason: format!("{} cannot read {}", read_markup, write_markup),
        });
        debug!(
            read = %read_markup,
            write = %write_markup,
            path = %mismatch.path,
            reason = %mismatch.reason,
            strict = self.strict_mode,
            "incompatible contracts"
        );
        CompatibilityResult::incompatible(self.strict_mode, read_markup, write_markup, mismatch)
    }

    /// Fail with [`ContractError::Incompatible`] unless the reader can read the writer
    pub fn ensure_compatible(&self, collection: &ContractCollection, read: ReadContractId, write: WriteContractId) -> Result<()> {
        let result = self.check(collection, read, write);
        if result.is_compatible {
            return Ok(());
        }
        Err(ContractError::Incompatible {
            read: result.read,
            write: result.write,
            reason: result.summary,
        })
    }
}

impl Default for CompatibilityChecker {
    fn default() -> Self {
        Self::new()
    }
}
