//! Contract Collection
//!
//! Builds, interns and caches contract graphs. Nodes live in an append-only
//! arena and refer to each other by [`ContractId`]; structurally equal nodes
//! collapse to one handle, so handle equality is structural equality.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::compatibility::Traversal;
use crate::config::ContractsConfig;
use crate::contract::{Contract, ContractId, ContractRefs, Direction, ReadContractId, WriteContractId};
use crate::error::{ContractError, Result};
use crate::provider::{Provider, DEFAULT_PROVIDERS};
use crate::types::{Describe, TypeDef};

/// A slot of the arena
#[derive(Debug, Clone)]
struct Entry {
    /// `None` while a recursive by-reference node is still being built
    contract: Option<Contract>,
    /// Descriptor id, by-reference nodes only
    id: Option<String>,
}

/// Registry of canonical contracts for type definitions
#[derive(Debug, Clone)]
pub struct ContractCollection {
    entries: Vec<Entry>,
    /// Structural index used for interning
    index: HashMap<Contract, ContractId>,
    write_cache: HashMap<TypeDef, ContractId>,
    read_cache: HashMap<TypeDef, ContractId>,
    /// Named definitions, the targets of `TypeDef::Named`
    definitions: HashMap<String, TypeDef>,
    /// Assigned descriptor ids
    ids: HashMap<String, ContractId>,
    next_id: usize,
    providers: Vec<Provider>,
    /// By-reference types under construction, with the slot reserved for
    /// them once something refers back
    in_progress: HashMap<(Direction, TypeDef), Option<ContractId>>,
}

impl Default for ContractCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractCollection {
    /// Create a collection with the default provider chain
    pub fn new() -> Self {
        Self::with_providers(DEFAULT_PROVIDERS.to_vec())
    }

    /// Create a collection that tries `providers` in the given order
    pub fn with_providers(providers: Vec<Provider>) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            write_cache: HashMap::new(),
            read_cache: HashMap::new(),
            definitions: HashMap::new(),
            ids: HashMap::new(),
            next_id: 0,
            providers,
            in_progress: HashMap::new(),
        }
    }

    pub fn from_config(config: &ContractsConfig) -> Self {
        Self::with_providers(config.providers.order.clone())
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // --- definitions ---

    /// Register a named enum, record or union so `TypeDef::Named` can refer to it
    pub fn register(&mut self, def: TypeDef) -> Result<()> {
        let name = def
            .definition_name()
            .ok_or_else(|| ContractError::InvalidType(format!("{} cannot be registered by name", def)))?
            .to_string();
        match self.definitions.get(&name) {
            Some(existing) if *existing != def => Err(ContractError::InvalidType(format!(
                "a different definition named '{}' is already registered",
                name
            ))),
            Some(_) => Ok(()),
            None => {
                debug!(name = %name, "registered type definition");
                self.definitions.insert(name, def);
                Ok(())
            }
        }
    }

    pub fn definition(&self, name: &str) -> Option<&TypeDef> {
        self.definitions.get(name)
    }

    // --- building ---

    pub fn get_or_add_write_contract(&mut self, ty: &TypeDef) -> Result<WriteContractId> {
        self.get_or_add(Direction::Write, ty).map(WriteContractId)
    }

    pub fn get_or_add_read_contract(&mut self, ty: &TypeDef) -> Result<ReadContractId> {
        self.get_or_add(Direction::Read, ty).map(ReadContractId)
    }

    pub fn write_contract_of<T: Describe>(&mut self) -> Result<WriteContractId> {
        self.get_or_add_write_contract(&T::describe())
    }

    pub fn read_contract_of<T: Describe>(&mut self) -> Result<ReadContractId> {
        self.get_or_add_read_contract(&T::describe())
    }

    /// Build or fetch a contract; a failed build leaves the collection as it was
    pub(crate) fn get_or_add(&mut self, direction: Direction, ty: &TypeDef) -> Result<ContractId> {
        let mark = self.entries.len();
        self.resolve_type(direction, ty).map_err(|e| {
            self.rollback(mark);
            e
        })
    }

    fn resolve_type(&mut self, direction: Direction, ty: &TypeDef) -> Result<ContractId> {
        if let TypeDef::Named { name } = ty {
            let def = self
                .definitions
                .get(name)
                .cloned()
                .ok_or_else(|| ContractError::UnknownType(name.clone()))?;
            return self.resolve_type(direction, &def);
        }

        if let Some(id) = self.cache(direction).get(ty) {
            return Ok(*id);
        }

        let key = (direction, ty.clone());
        if let Some(reserved) = self.in_progress.get(&key).copied() {
            // recursive reference to a type still being built
            let id = match reserved {
                Some(id) => id,
                None => {
                    let id = self.reserve();
                    self.in_progress.insert(key, Some(id));
                    id
                }
            };
            return Ok(id);
        }

        let provider = self
            .providers
            .iter()
            .copied()
            .find(|provider| provider.can_provide(ty))
            .ok_or_else(|| ContractError::UnsupportedType(ty.to_string()))?;

        let id = provider.build(self, direction, ty)?;
        trace!(ty = %ty, ?direction, ?provider, contract = %id, "built contract");
        self.cache_mut(direction).insert(ty.clone(), id);
        Ok(id)
    }

    /// Build a by-reference node whose children may refer back to it
    pub(crate) fn build_by_ref<F>(&mut self, direction: Direction, ty: &TypeDef, build: F) -> Result<ContractId>
    where
        F: FnOnce(&mut Self) -> Result<Contract>,
    {
        let mark = self.entries.len();
        let key = (direction, ty.clone());
        self.in_progress.insert(key.clone(), None);
        let built = build(self);
        let reserved = self.in_progress.remove(&key).flatten();
        let contract = built?;
        match reserved {
            Some(id) => {
                self.fill(id, contract);
                // slots of enclosing builds reserved after `mark` must survive
                let enclosing = self.in_progress.values().flatten().any(|slot| slot.0 >= mark);
                if !enclosing {
                    if let Some(existing) = self.equivalent_before(id, mark) {
                        trace!(ty = %ty, contract = %existing, "recursive intern hit");
                        self.rollback(mark);
                        return Ok(existing);
                    }
                }
                debug!(ty = %ty, contract = %id, "built recursive contract");
                Ok(id)
            }
            None => Ok(self.intern_node(contract)),
        }
    }

    /// A node older than `mark` describing the same graph as `id`
    fn equivalent_before(&self, id: ContractId, mark: usize) -> Option<ContractId> {
        let kind = self.get(id)?.kind();
        self.iter()
            .filter(|(candidate, contract)| candidate.0 < mark && contract.kind() == kind)
            .map(|(candidate, _)| candidate)
            .find(|candidate| equivalent(self, id, self, *candidate, &mut HashSet::new()))
    }

    fn cache(&self, direction: Direction) -> &HashMap<TypeDef, ContractId> {
        match direction {
            Direction::Write => &self.write_cache,
            Direction::Read => &self.read_cache,
        }
    }

    fn cache_mut(&mut self, direction: Direction) -> &mut HashMap<TypeDef, ContractId> {
        match direction {
            Direction::Write => &mut self.write_cache,
            Direction::Read => &mut self.read_cache,
        }
    }

    // --- interning ---

    /// Return the handle of a structurally equal node, registering `contract`
    /// if there is none
    pub fn intern(&mut self, contract: Contract) -> Result<ContractId> {
        if let Some(child) = contract.children().into_iter().find(|c| c.0 >= self.entries.len()) {
            return Err(ContractError::UnknownContract(child.0));
        }
        Ok(self.intern_node(contract))
    }

    pub(crate) fn intern_node(&mut self, contract: Contract) -> ContractId {
        if let Some(id) = self.index.get(&contract) {
            trace!(kind = contract.kind(), contract = %id, "intern hit");
            return *id;
        }
        let id = ContractId(self.entries.len());
        self.entries.push(Entry {
            contract: Some(contract.clone()),
            id: None,
        });
        self.index.insert(contract, id);
        id
    }

    pub(crate) fn reserve(&mut self) -> ContractId {
        let id = ContractId(self.entries.len());
        self.entries.push(Entry { contract: None, id: None });
        id
    }

    pub(crate) fn fill(&mut self, id: ContractId, contract: Contract) {
        self.index.entry(contract.clone()).or_insert(id);
        if let Some(entry) = self.entries.get_mut(id.0) {
            entry.contract = Some(contract);
        }
    }

    /// Drop every node created at or after `mark`
    pub(crate) fn rollback(&mut self, mark: usize) {
        if self.entries.len() <= mark {
            return;
        }
        debug!(discarded = self.entries.len() - mark, "rolling back contract construction");
        self.entries.truncate(mark);
        self.index.retain(|_, id| id.0 < mark);
        self.write_cache.retain(|_, id| id.0 < mark);
        self.read_cache.retain(|_, id| id.0 < mark);
        self.ids.retain(|_, id| id.0 < mark);
    }

    // --- lookup ---

    /// The node behind a handle; `None` for unknown or unfinished slots
    pub fn get(&self, id: ContractId) -> Option<&Contract> {
        self.entries.get(id.0).and_then(|entry| entry.contract.as_ref())
    }

    pub fn contract(&self, id: ContractId) -> Result<&Contract> {
        self.get(id).ok_or(ContractError::UnknownContract(id.0))
    }

    pub fn write_contract(&self, id: WriteContractId) -> Result<&Contract> {
        self.contract(id.0)
    }

    pub fn read_contract(&self, id: ReadContractId) -> Result<&Contract> {
        self.contract(id.0)
    }

    /// Wrap a handle as a write contract, checking the node kind
    pub fn as_write(&self, id: ContractId) -> Result<WriteContractId> {
        let contract = self.contract(id)?;
        if contract.is_writable() {
            Ok(WriteContractId(id))
        } else {
            Err(ContractError::InvalidType(format!("{} is not a write contract", contract.kind())))
        }
    }

    /// Wrap a handle as a read contract, checking the node kind
    pub fn as_read(&self, id: ContractId) -> Result<ReadContractId> {
        let contract = self.contract(id)?;
        if contract.is_readable() {
            Ok(ReadContractId(id))
        } else {
            Err(ContractError::InvalidType(format!("{} is not a read contract", contract.kind())))
        }
    }

    /// Iterate over every finished node
    pub fn iter(&self) -> impl Iterator<Item = (ContractId, &Contract)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.contract.as_ref().map(|c| (ContractId(i), c)))
    }

    // --- ids ---

    /// Descriptor id of a node, if one has been assigned
    pub fn id_of(&self, id: ContractId) -> Option<&str> {
        self.entries.get(id.0).and_then(|entry| entry.id.as_deref())
    }

    /// Handle of the node carrying descriptor id `name`
    pub fn lookup_id(&self, name: &str) -> Option<ContractId> {
        self.ids.get(name).copied()
    }

    /// Assign a descriptor id to a by-reference node, if it has none yet.
    ///
    /// By-value nodes never receive an id and yield `None`.
    pub fn assign_id(&mut self, id: ContractId) -> Result<Option<&str>> {
        let kind = match self.contract(id)? {
            contract if contract.is_by_ref() => contract.kind(),
            _ => return Ok(None),
        };
        if self.entries[id.0].id.is_none() {
            let name = loop {
                let candidate = format!("{}{}", kind, self.next_id);
                self.next_id += 1;
                if !self.ids.contains_key(&candidate) {
                    break candidate;
                }
            };
            self.set_id(id, name)?;
        }
        Ok(self.id_of(id))
    }

    /// Assign a specific descriptor id, e.g. one read from a descriptor
    pub(crate) fn set_id(&mut self, id: ContractId, name: String) -> Result<()> {
        match self.ids.get(&name) {
            Some(existing) if *existing != id => {
                return Err(ContractError::malformed(format!("id '{}' is already in use", name)))
            }
            _ => {}
        }
        let entry = self
            .entries
            .get_mut(id.0)
            .ok_or(ContractError::UnknownContract(id.0))?;
        if let Some(previous) = entry.id.replace(name.clone()) {
            self.ids.remove(&previous);
        }
        self.ids.insert(name, id);
        Ok(())
    }

    /// Reference string of a node: `#Id` for by-reference nodes, inline
    /// markup otherwise
    pub fn reference_string(&self, id: ContractId) -> Result<String> {
        self.reference(id)
    }

    /// Human-readable markup for diagnostics; never fails on missing ids
    pub fn describe(&self, id: ContractId) -> String {
        DiagnosticRefs(self)
            .reference(id)
            .unwrap_or_else(|_| format!("<unknown {}>", id))
    }

    // --- compatibility ---

    /// Whether data written under `write` can be read under `read`.
    ///
    /// This is the single compatibility decision point. It is not symmetric.
    pub fn can_read_from(&self, read: ReadContractId, write: WriteContractId, strict: bool) -> bool {
        Traversal::new(self, strict).check(read.0, write.0)
    }

    // --- copying ---

    /// Rebuild the graph under `write` inside `target`
    pub fn copy_write_to(&self, write: WriteContractId, target: &mut ContractCollection) -> Result<WriteContractId> {
        self.copy_to(write.0, target).map(WriteContractId)
    }

    /// Rebuild the graph under `read` inside `target`
    pub fn copy_read_to(&self, read: ReadContractId, target: &mut ContractCollection) -> Result<ReadContractId> {
        self.copy_to(read.0, target).map(ReadContractId)
    }

    fn copy_to(&self, id: ContractId, target: &mut ContractCollection) -> Result<ContractId> {
        let mark = target.entries.len();
        let mut session = CopySession::default();
        match self.copy_node(id, target, &mut session) {
            Ok(copied) => {
                debug!(source = %id, target = %copied, "copied contract graph");
                Ok(copied)
            }
            Err(e) => {
                target.rollback(mark);
                Err(e)
            }
        }
    }

    pub(crate) fn copy_node(
        &self,
        id: ContractId,
        target: &mut ContractCollection,
        session: &mut CopySession,
    ) -> Result<ContractId> {
        if let Some(copied) = session.copied.get(&id) {
            return Ok(*copied);
        }

        if let Some(reserved) = session.in_progress.get(&id).copied() {
            // back edge of a recursive graph
            let slot = match reserved {
                Some(slot) => slot,
                None => {
                    let slot = target.reserve();
                    session.in_progress.insert(id, Some(slot));
                    slot
                }
            };
            return Ok(slot);
        }

        let contract = self.contract(id)?;
        if contract.is_by_ref() {
            if let Some(existing) = self.find_equivalent(id, target) {
                trace!(source = %id, target = %existing, "copy hit");
                session.copied.insert(id, existing);
                return Ok(existing);
            }
        }

        session.in_progress.insert(id, None);
        let mapped = contract.map_children(|child| self.copy_node(child, target, session));
        let reserved = session.in_progress.remove(&id).flatten();
        let mapped = mapped?;

        let copied = match reserved {
            Some(slot) => {
                target.fill(slot, mapped);
                slot
            }
            None => target.intern_node(mapped),
        };
        session.copied.insert(id, copied);
        Ok(copied)
    }

    /// A node of `target` describing the same graph as `id`.
    ///
    /// Interning cannot see through cycles, since a recursive node refers to
    /// its own fresh handle, so by-reference nodes are matched by walking both
    /// graphs in step.
    fn find_equivalent(&self, id: ContractId, target: &ContractCollection) -> Option<ContractId> {
        let kind = self.get(id)?.kind();
        target
            .iter()
            .filter(|(_, candidate)| candidate.kind() == kind)
            .map(|(candidate, _)| candidate)
            .find(|candidate| equivalent(self, id, target, *candidate, &mut HashSet::new()))
    }
}

/// Whether two nodes, possibly in different collections, describe the same
/// graph. Pairs already on the path are assumed equal.
fn equivalent(
    source: &ContractCollection,
    a: ContractId,
    target: &ContractCollection,
    b: ContractId,
    assumed: &mut HashSet<(ContractId, ContractId)>,
) -> bool {
    if !assumed.insert((a, b)) {
        return true;
    }
    let (ca, cb) = match (source.get(a), target.get(b)) {
        (Some(ca), Some(cb)) => (ca, cb),
        _ => return false,
    };
    if ca.kind() != cb.kind() || ca.shape() != cb.shape() {
        return false;
    }
    ca.children()
        .into_iter()
        .zip(cb.children())
        .all(|(x, y)| equivalent(source, x, target, y, assumed))
}

impl ContractRefs for ContractCollection {
    fn reference(&self, id: ContractId) -> Result<String> {
        let contract = self.contract(id)?;
        if contract.is_by_ref() {
            let name = self.id_of(id).ok_or(ContractError::MissingId { kind: contract.kind() })?;
            return Ok(format!("#{}", name));
        }
        contract
            .markup_value(self)?
            .ok_or(ContractError::MissingId { kind: contract.kind() })
    }
}

/// Renders by-reference nodes without an id by kind and handle
struct DiagnosticRefs<'a>(&'a ContractCollection);

impl ContractRefs for DiagnosticRefs<'_> {
    fn reference(&self, id: ContractId) -> Result<String> {
        let contract = self.0.contract(id)?;
        if contract.is_by_ref() {
            return Ok(match self.0.id_of(id) {
                Some(name) => format!("#{}", name),
                None => format!("#{}{}", contract.kind(), id),
            });
        }
        contract
            .markup_value(self)?
            .ok_or(ContractError::MissingId { kind: contract.kind() })
    }
}

/// Per-copy translation of source handles to target handles
#[derive(Default)]
pub(crate) struct CopySession {
    copied: HashMap<ContractId, ContractId>,
    in_progress: HashMap<ContractId, Option<ContractId>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDef, PrimitiveType};

    fn color() -> TypeDef {
        TypeDef::enumeration("Color", ["Red", "Green", "Blue"])
    }

    #[test]
    fn test_get_or_add_is_idempotent() {
        let mut collection = ContractCollection::new();
        let a = collection.get_or_add_write_contract(&color()).unwrap();
        let b = collection.get_or_add_write_contract(&color()).unwrap();
        assert_eq!(a, b);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_equal_nodes_are_interned() {
        let mut collection = ContractCollection::new();
        let a = collection.get_or_add_write_contract(&color()).unwrap();
        let renamed = TypeDef::enumeration("Colour", ["red", "green", "blue"]);
        let b = collection.get_or_add_write_contract(&renamed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_enum_shared_between_directions() {
        let mut collection = ContractCollection::new();
        let write = collection.get_or_add_write_contract(&color()).unwrap();
        let read = collection.get_or_add_read_contract(&color()).unwrap();
        assert_eq!(write.id(), read.id());
    }

    #[test]
    fn test_unsupported_type() {
        let mut collection = ContractCollection::new();
        let result = collection.get_or_add_write_contract(&TypeDef::opaque("Socket"));
        assert!(matches!(result, Err(ContractError::UnsupportedType(_))));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_failed_build_rolls_back() {
        let mut collection = ContractCollection::new();
        let record = TypeDef::record(
            "Broken",
            vec![
                FieldDef::new("a", TypeDef::primitive(PrimitiveType::I32)),
                FieldDef::new("b", TypeDef::opaque("Socket")),
            ],
        );
        assert!(collection.get_or_add_read_contract(&record).is_err());
        assert!(collection.is_empty());
        assert!(collection.index.is_empty());
    }

    #[test]
    fn test_intern_rejects_unknown_children() {
        let mut collection = ContractCollection::new();
        let node = Contract::ListWrite(crate::contract::ListWriteContract::new(ContractId(7)));
        assert!(matches!(collection.intern(node), Err(ContractError::UnknownContract(7))));
    }

    #[test]
    fn test_assign_id_only_for_by_ref() {
        let mut collection = ContractCollection::new();
        let int = collection.write_contract_of::<i32>().unwrap();
        let color = collection.get_or_add_write_contract(&color()).unwrap();
        assert_eq!(collection.assign_id(int.id()).unwrap(), None);
        let name = collection.assign_id(color.id()).unwrap().map(String::from);
        assert_eq!(name.as_deref(), Some("Enum0"));
        // stable once assigned
        assert_eq!(collection.assign_id(color.id()).unwrap(), Some("Enum0"));
        assert_eq!(collection.lookup_id("Enum0"), Some(color.id()));
    }

    #[test]
    fn test_reference_requires_id() {
        let mut collection = ContractCollection::new();
        let nullable = collection
            .get_or_add_write_contract(&TypeDef::nullable(TypeDef::list(color())))
            .unwrap();
        assert!(matches!(
            collection.reference_string(nullable.id()),
            Err(ContractError::MissingId { kind: "Enum" })
        ));
        assert_eq!(collection.describe(nullable.id()), "{nullable {list #Enum@0}}");
    }

    #[test]
    fn test_register_conflicting_definition() {
        let mut collection = ContractCollection::new();
        collection.register(color()).unwrap();
        collection.register(color()).unwrap();
        let other = TypeDef::enumeration("Color", ["Cyan"]);
        assert!(collection.register(other).is_err());
        assert!(collection.register(TypeDef::Unit).is_err());
    }
}
