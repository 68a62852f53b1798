//! Descriptor documents
//!
//! A descriptor is a portable description of one contract graph, used to
//! store a schema or hand it to another process. It is a tree of named
//! [`Element`]s serialized as JSON:
//!
//! ```json
//! {
//!   "name": "Contracts",
//!   "attributes": { "Root": "{list #ComplexWrite1}" },
//!   "children": [
//!     { "name": "Enum", "attributes": { "Id": "Enum0" }, "children": [ ... ] },
//!     { "name": "ComplexWrite", "attributes": { "Id": "ComplexWrite1" }, "children": [ ... ] }
//!   ]
//! }
//! ```
//!
//! Only by-reference nodes get an element of their own, dependencies first.
//! By-value nodes appear inline as markup (see [`crate::markup`]).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::{ContractCollection, CopySession};
use crate::config::{DescriptorConfig, OutputFormat};
use crate::contract::{
    ComplexReadContract, ComplexWriteContract, Contract, ContractId, ContractRefs, DictionaryReadContract,
    DictionaryWriteContract, Direction, EmptyContract, EnumContract, ListReadContract, ListWriteContract,
    NullableReadContract, NullableWriteContract, PrimitiveContract, ReadContractId, UnionReadContract,
    UnionWriteContract, WriteContractId,
};
use crate::error::{ContractError, Result};
use crate::graph::ContractGraph;
use crate::markup::Markup;

/// Name of the document root element
pub const DOCUMENT_ELEMENT: &str = "Contracts";

/// A named element with string attributes and child elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute value, or [`ContractError::MalformedDescriptor`] if absent
    pub fn required_attribute(&self, key: &str) -> Result<&str> {
        self.attribute(key).ok_or_else(|| {
            ContractError::malformed(format!("{} element is missing the {} attribute", self.name, key))
        })
    }

    /// Child elements named `name`
    pub fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn to_json_string(&self, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Pretty => serde_json::to_string_pretty(self)?,
            OutputFormat::Compact => serde_json::to_string(self)?,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ContractCollection {
    /// Descriptor element of a single by-reference node.
    ///
    /// Fails with [`ContractError::MissingId`] until an id has been assigned;
    /// by-value nodes have no element and yield `None`.
    pub fn element_of(&self, id: ContractId) -> Result<Option<Element>> {
        self.contract(id)?.to_element(self.id_of(id), self)
    }

    /// Describe the graph under a write contract, assigning ids as needed
    pub fn export_write(&mut self, root: WriteContractId) -> Result<Element> {
        self.export(root.id(), true)
    }

    /// Describe the graph under a read contract, assigning ids as needed
    pub fn export_read(&mut self, root: ReadContractId) -> Result<Element> {
        self.export(root.id(), true)
    }

    /// Export and serialize a graph as configured.
    ///
    /// Without the `Root` attribute an import takes the last element as the
    /// root, which loses a by-value root such as `{list #ComplexRead0}`.
    pub fn render_descriptor(&mut self, root: ContractId, config: &DescriptorConfig) -> Result<String> {
        self.export(root, config.include_root)?
            .to_json_string(config.output_format)
    }

    fn export(&mut self, root: ContractId, include_root: bool) -> Result<Element> {
        let graph = ContractGraph::from_root(self, root)?;
        let order = graph.emission_order();
        for id in &order {
            self.assign_id(*id)?;
        }

        let mut document = Element::new(DOCUMENT_ELEMENT);
        if include_root {
            document = document.with_attribute("Root", self.reference(root)?);
        }
        for id in order {
            if let Some(element) = self.element_of(id)? {
                document = document.with_child(element);
            }
        }

        debug!(root = %root, elements = document.children.len(), "exported descriptor");
        Ok(document)
    }

    /// Rebuild a write graph from a descriptor document.
    ///
    /// Nodes are interned, so importing a graph the collection already holds
    /// returns the existing handles. On failure nothing is added.
    pub fn import_write(&mut self, document: &Element) -> Result<WriteContractId> {
        let id = self.import(document, Direction::Write)?;
        self.as_write(id)
    }

    /// Rebuild a read graph from a descriptor document
    pub fn import_read(&mut self, document: &Element) -> Result<ReadContractId> {
        let id = self.import(document, Direction::Read)?;
        self.as_read(id)
    }

    fn import(&mut self, document: &Element, direction: Direction) -> Result<ContractId> {
        // resolve in a scratch collection, then copy so recursive nodes the
        // collection already holds are reused
        let mut scratch = ContractCollection::with_providers(Vec::new());
        let mut session = ImportSession::new(document, direction)?;
        let root = session.run(&mut scratch)?;

        let mark = self.len();
        match self.adopt(&scratch, &session, root) {
            Ok(root) => {
                debug!(root = %root, ?direction, elements = session.order.len(), "imported descriptor");
                Ok(root)
            }
            Err(e) => {
                self.rollback(mark);
                Err(e)
            }
        }
    }

    /// Copy an imported graph in, keeping the descriptor's ids where they do
    /// not clash with existing ones
    fn adopt(&mut self, scratch: &ContractCollection, session: &ImportSession<'_>, root: ContractId) -> Result<ContractId> {
        let mut copy = CopySession::default();
        let mut named = Vec::with_capacity(session.order.len());
        for name in &session.order {
            if let Some(id) = session.resolved.get(name) {
                named.push((*name, scratch.copy_node(*id, self, &mut copy)?));
            }
        }
        let root = scratch.copy_node(root, self, &mut copy)?;

        for (name, id) in named {
            if self.id_of(id).is_none() && self.lookup_id(name).is_none() {
                self.set_id(id, name.to_string())?;
            }
        }
        Ok(root)
    }
}

/// Resolution state of one descriptor import
struct ImportSession<'d> {
    direction: Direction,
    /// Root markup; the last element when the document names none
    root: String,
    elements: HashMap<&'d str, &'d Element>,
    /// Element ids in document order
    order: Vec<&'d str>,
    resolved: HashMap<&'d str, ContractId>,
    /// Elements being built, with the slot reserved once something refers back
    in_progress: HashMap<&'d str, Option<ContractId>>,
}

impl<'d> ImportSession<'d> {
    fn new(document: &'d Element, direction: Direction) -> Result<Self> {
        if document.name != DOCUMENT_ELEMENT {
            return Err(ContractError::malformed(format!(
                "expected {} document, found {}",
                DOCUMENT_ELEMENT, document.name
            )));
        }

        let mut elements = HashMap::new();
        let mut order = Vec::new();
        for element in &document.children {
            let id = element.required_attribute("Id")?;
            if elements.insert(id, element).is_some() {
                return Err(ContractError::malformed(format!("duplicate id '{}'", id)));
            }
            order.push(id);
        }

        // dependencies are emitted first, so the last element is the root
        let root = match (document.attribute("Root"), order.last()) {
            (Some(root), _) => root.to_string(),
            (None, Some(last)) => format!("#{}", last),
            (None, None) => return Err(ContractError::malformed("document has no Root and no elements")),
        };

        Ok(Self {
            direction,
            root,
            elements,
            order,
            resolved: HashMap::new(),
            in_progress: HashMap::new(),
        })
    }

    fn run(&mut self, collection: &mut ContractCollection) -> Result<ContractId> {
        for name in self.order.clone() {
            self.resolve_ref(collection, name)?;
        }
        let root = Markup::parse(&self.root)?;
        self.resolve_markup(collection, &root)
    }

    fn resolve_ref(&mut self, collection: &mut ContractCollection, name: &str) -> Result<ContractId> {
        let (key, element) = match self.elements.get_key_value(name) {
            Some((key, element)) => (*key, *element),
            None => return Err(ContractError::malformed(format!("unknown reference '#{}'", name))),
        };

        if let Some(id) = self.resolved.get(key) {
            return Ok(*id);
        }

        if let Some(reserved) = self.in_progress.get(key).copied() {
            let id = match reserved {
                Some(id) => id,
                None => {
                    let id = collection.reserve();
                    self.in_progress.insert(key, Some(id));
                    id
                }
            };
            return Ok(id);
        }

        self.in_progress.insert(key, None);
        let built = self.build_element(collection, element);
        let reserved = self.in_progress.remove(key).flatten();
        let contract = built?;

        let id = match reserved {
            Some(slot) => {
                collection.fill(slot, contract);
                slot
            }
            None => collection.intern_node(contract),
        };
        self.resolved.insert(key, id);
        Ok(id)
    }

    fn build_element(&mut self, collection: &mut ContractCollection, element: &Element) -> Result<Contract> {
        let direction = self.direction;
        let kind = element.name.as_str();
        if kind == "Enum" {
            return Ok(Contract::Enum(EnumContract::from_element(element)?));
        }

        let resolve = |markup: &str| -> Result<ContractId> {
            let parsed = Markup::parse(markup)?;
            self.resolve_markup(collection, &parsed)
        };

        match (kind, direction) {
            ("ComplexWrite", Direction::Write) => Ok(Contract::ComplexWrite(ComplexWriteContract::from_element(
                element, resolve,
            )?)),
            ("ComplexRead", Direction::Read) => Ok(Contract::ComplexRead(ComplexReadContract::from_element(
                element, resolve,
            )?)),
            ("UnionWrite", Direction::Write) => Ok(Contract::UnionWrite(UnionWriteContract::from_element(
                element, resolve,
            )?)),
            ("UnionRead", Direction::Read) => Ok(Contract::UnionRead(UnionReadContract::from_element(
                element, resolve,
            )?)),
            ("ComplexWrite" | "ComplexRead" | "UnionWrite" | "UnionRead", _) => Err(ContractError::malformed(
                format!("{} element in a {:?} descriptor", kind, direction),
            )),
            _ => Err(ContractError::malformed(format!("unknown element {}", kind))),
        }
    }

    fn resolve_markup(&mut self, collection: &mut ContractCollection, markup: &Markup) -> Result<ContractId> {
        let contract = match markup {
            Markup::Ref(name) => return self.resolve_ref(collection, name),
            Markup::Primitive(primitive) => Contract::Primitive(PrimitiveContract::new(*primitive)),
            Markup::Empty => Contract::Empty(EmptyContract),
            Markup::Nullable(inner) => {
                let inner_id = self.resolve_markup(collection, inner)?;
                if matches!(
                    collection.get(inner_id),
                    Some(Contract::NullableWrite(_)) | Some(Contract::NullableRead(_))
                ) {
                    return Err(ContractError::malformed(format!("nested nullable {}", markup)));
                }
                match self.direction {
                    Direction::Write => Contract::NullableWrite(NullableWriteContract::new(inner_id)),
                    Direction::Read => Contract::NullableRead(NullableReadContract::new(inner_id)),
                }
            }
            Markup::List(item) => {
                let item = self.resolve_markup(collection, item)?;
                match self.direction {
                    Direction::Write => Contract::ListWrite(ListWriteContract::new(item)),
                    Direction::Read => Contract::ListRead(ListReadContract::new(item)),
                }
            }
            Markup::Dictionary(key, value) => {
                let key = self.resolve_markup(collection, key)?;
                let value = self.resolve_markup(collection, value)?;
                match self.direction {
                    Direction::Write => Contract::DictionaryWrite(DictionaryWriteContract::new(key, value)),
                    Direction::Read => Contract::DictionaryRead(DictionaryReadContract::new(key, value)),
                }
            }
        };
        Ok(collection.intern_node(contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDef, PrimitiveType, TypeDef};

    fn color() -> TypeDef {
        TypeDef::enumeration("Color", ["Red", "Green", "Blue"])
    }

    fn pixel() -> TypeDef {
        TypeDef::record(
            "Pixel",
            vec![
                FieldDef::new("x", TypeDef::primitive(PrimitiveType::U32)),
                FieldDef::new("y", TypeDef::primitive(PrimitiveType::U32)),
                FieldDef::new("color", TypeDef::nullable(color())).with_default(),
                FieldDef::new("tags", TypeDef::dictionary(TypeDef::primitive(PrimitiveType::String), TypeDef::Unit)),
            ],
        )
    }

    #[test]
    fn test_enum_round_trip() {
        let mut source = ContractCollection::new();
        let original = source.get_or_add_write_contract(&color()).unwrap();
        let document = source.export_write(original).unwrap();
        let json = document.to_json_string(OutputFormat::Compact).unwrap();

        let mut target = ContractCollection::new();
        let imported = target.import_write(&Element::from_json_str(&json).unwrap()).unwrap();
        assert_eq!(
            source.write_contract(original).unwrap(),
            target.write_contract(imported).unwrap()
        );
    }

    #[test]
    fn test_missing_id_fails_fast() {
        let mut collection = ContractCollection::new();
        let color = collection.get_or_add_write_contract(&color()).unwrap();
        assert!(matches!(
            collection.element_of(color.id()),
            Err(ContractError::MissingId { kind: "Enum" })
        ));
        collection.assign_id(color.id()).unwrap();
        assert!(collection.element_of(color.id()).unwrap().is_some());
    }

    #[test]
    fn test_by_value_nodes_have_no_element() {
        let mut collection = ContractCollection::new();
        let list = collection.write_contract_of::<Vec<u8>>().unwrap();
        assert!(collection.element_of(list.id()).unwrap().is_none());
    }

    #[test]
    fn test_export_layout() {
        let mut collection = ContractCollection::new();
        let root = collection.get_or_add_read_contract(&TypeDef::list(pixel())).unwrap();
        let document = collection.export_read(root).unwrap();

        assert_eq!(document.name, "Contracts");
        assert_eq!(document.attribute("Root"), Some("{list #ComplexRead1}"));
        let names: Vec<_> = document.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Enum", "ComplexRead"]);

        let record = &document.children[1];
        let color = record.elements("Field").find(|f| f.attribute("Name") == Some("color")).unwrap();
        assert_eq!(color.attribute("Contract"), Some("{nullable #Enum0}"));
        assert_eq!(color.attribute("Required"), Some("false"));
        let tags = record.elements("Field").find(|f| f.attribute("Name") == Some("tags")).unwrap();
        assert_eq!(tags.attribute("Contract"), Some("{dictionary string {empty}}"));
    }

    #[test]
    fn test_record_round_trip_keeps_ids() {
        let mut source = ContractCollection::new();
        let root = source.get_or_add_read_contract(&pixel()).unwrap();
        let document = source.export_read(root).unwrap();

        let mut target = ContractCollection::new();
        let imported = target.import_read(&document).unwrap();
        assert_eq!(target.export_read(imported).unwrap(), document);
        assert_eq!(target.describe(imported.id()), source.describe(root.id()));
    }

    #[test]
    fn test_import_into_same_collection_is_interned() {
        let mut collection = ContractCollection::new();
        let root = collection.get_or_add_write_contract(&pixel()).unwrap();
        let document = collection.export_write(root).unwrap();
        let before = collection.len();

        let imported = collection.import_write(&document).unwrap();
        assert_eq!(imported, root);
        assert_eq!(collection.len(), before);
    }

    #[test]
    fn test_import_wrong_direction() {
        let mut source = ContractCollection::new();
        let root = source.get_or_add_write_contract(&pixel()).unwrap();
        let document = source.export_write(root).unwrap();

        let mut target = ContractCollection::new();
        let result = target.import_read(&document);
        assert!(matches!(result, Err(ContractError::MalformedDescriptor(_))));
        assert!(target.is_empty());
    }

    #[test]
    fn test_import_unknown_reference_rolls_back() {
        let document = Element::new("Contracts")
            .with_attribute("Root", "{list #ComplexWrite7}")
            .with_child(
                Element::new("ComplexWrite")
                    .with_attribute("Id", "ComplexWrite7")
                    .with_child(
                        Element::new("Field")
                            .with_attribute("Name", "a")
                            .with_attribute("Contract", "i32"),
                    )
                    .with_child(
                        Element::new("Field")
                            .with_attribute("Name", "b")
                            .with_attribute("Contract", "#Missing"),
                    ),
            );

        let mut collection = ContractCollection::new();
        assert!(matches!(
            collection.import_write(&document),
            Err(ContractError::MalformedDescriptor(_))
        ));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_import_rejects_nested_nullable() {
        let document = Element::new("Contracts").with_attribute("Root", "{nullable {nullable i32}}");
        let mut collection = ContractCollection::new();
        assert!(collection.import_read(&document).is_err());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_render_descriptor_without_root() {
        let mut collection = ContractCollection::new();
        let root = collection.get_or_add_write_contract(&color()).unwrap();
        let config = DescriptorConfig {
            output_format: OutputFormat::Compact,
            include_root: false,
        };
        let json = collection.render_descriptor(root.id(), &config).unwrap();
        assert!(!json.contains("Root"));
        assert!(!json.contains('\n'));
        assert!(json.contains("\"Id\":\"Enum0\""));

        let document = Element::from_json_str(&json).unwrap();
        let mut target = ContractCollection::new();
        let imported = target.import_write(&document).unwrap();
        assert!(matches!(target.write_contract(imported).unwrap(), Contract::Enum(_)));
        assert_eq!(target.id_of(imported.id()), Some("Enum0"));
    }

    #[test]
    fn test_import_requires_root_or_elements() {
        let mut collection = ContractCollection::new();
        assert!(matches!(
            collection.import_read(&Element::new("Contracts")),
            Err(ContractError::MalformedDescriptor(_))
        ));
    }
}
