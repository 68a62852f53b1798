//! Collection Tests
//!
//! Interning, cross-collection copies, descriptor round trips and
//! fingerprints, including recursive graphs.

use schema_contracts::{
    Contract, ContractCollection, ContractError, ContractGraph, Element, FieldDef, Fingerprint, OutputFormat,
    PrimitiveType, TypeDef,
};

fn shape() -> TypeDef {
    TypeDef::union(
        "Shape",
        [
            ("Circle", TypeDef::primitive(PrimitiveType::F64)),
            ("Polygon", TypeDef::list(TypeDef::named("Point"))),
        ],
    )
}

fn point() -> TypeDef {
    TypeDef::record(
        "Point",
        vec![
            FieldDef::new("x", TypeDef::primitive(PrimitiveType::F64)),
            FieldDef::new("y", TypeDef::primitive(PrimitiveType::F64)),
        ],
    )
}

fn tree() -> TypeDef {
    TypeDef::record(
        "Tree",
        vec![
            FieldDef::new("label", TypeDef::enumeration("Kind", ["Leaf", "Branch"])),
            FieldDef::new("children", TypeDef::list(TypeDef::named("Tree"))),
            FieldDef::new("parent", TypeDef::nullable(TypeDef::named("Tree"))).with_default(),
        ],
    )
}

fn linked(name: &str) -> TypeDef {
    TypeDef::record(
        name,
        vec![
            FieldDef::new("value", TypeDef::primitive(PrimitiveType::I32)),
            FieldDef::new("next", TypeDef::nullable(TypeDef::named(name))),
        ],
    )
}

fn collection_with(defs: Vec<TypeDef>) -> ContractCollection {
    let mut collection = ContractCollection::new();
    for def in defs {
        collection.register(def).unwrap();
    }
    collection
}

// =============================================================================
// Interning
// =============================================================================

#[test]
fn test_interning_within_collection() {
    let mut collection = collection_with(vec![point()]);
    let a = collection.get_or_add_write_contract(&shape()).unwrap();
    let size = collection.len();
    let b = collection.get_or_add_write_contract(&shape()).unwrap();
    assert_eq!(a, b);
    assert_eq!(collection.len(), size);

    // building the same node by hand yields the existing handle
    let node = collection.write_contract(a).unwrap().clone();
    assert_eq!(collection.intern(node).unwrap(), a.id());
    assert_eq!(collection.len(), size);
}

#[test]
fn test_equal_recursive_types_share_a_node() {
    let mut collection = collection_with(vec![linked("First"), linked("Second")]);
    let first = collection.get_or_add_write_contract(&TypeDef::named("First")).unwrap();
    let size = collection.len();
    let second = collection.get_or_add_write_contract(&TypeDef::named("Second")).unwrap();
    assert_eq!(first, second);
    assert_eq!(collection.len(), size);

    // cached after the first lookup
    assert_eq!(collection.get_or_add_write_contract(&TypeDef::named("Second")).unwrap(), first);
    assert_eq!(collection.len(), size);
}

#[test]
fn test_build_after_copy_reuses_copied_graph() {
    let mut source = collection_with(vec![linked("Chain")]);
    let write = source.get_or_add_write_contract(&TypeDef::named("Chain")).unwrap();

    let mut target = collection_with(vec![linked("Chain")]);
    let copied = source.copy_write_to(write, &mut target).unwrap();
    let size = target.len();

    let built = target.get_or_add_write_contract(&TypeDef::named("Chain")).unwrap();
    assert_eq!(built, copied);
    assert_eq!(target.len(), size);
}

#[test]
fn test_empty_enum_definition_rejected() {
    let mut collection = ContractCollection::new();
    let result = collection.get_or_add_write_contract(&TypeDef::enumeration("Nothing", Vec::<String>::new()));
    assert!(matches!(result, Err(ContractError::InvalidType(_))));
    assert!(collection.is_empty());
}

#[test]
fn test_every_node_is_unique() {
    let mut collection = collection_with(vec![point(), tree()]);
    collection.get_or_add_write_contract(&shape()).unwrap();
    collection.get_or_add_read_contract(&shape()).unwrap();
    collection.get_or_add_read_contract(&TypeDef::named("Tree")).unwrap();

    let nodes: Vec<&Contract> = collection.iter().map(|(_, c)| c).collect();
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

// =============================================================================
// Copying
// =============================================================================

#[test]
fn test_copy_across_collections() {
    let mut source = collection_with(vec![point()]);
    let write = source.get_or_add_write_contract(&shape()).unwrap();

    let mut target = ContractCollection::new();
    let copied = source.copy_write_to(write, &mut target).unwrap();
    assert_eq!(target.len(), source.len());

    // copying again adds nothing
    let again = source.copy_write_to(write, &mut target).unwrap();
    assert_eq!(copied, again);
    assert_eq!(target.len(), source.len());

    // the target builds the same handle from the type itself
    target.register(point()).unwrap();
    assert_eq!(target.get_or_add_write_contract(&shape()).unwrap(), copied);
}

#[test]
fn test_copy_recursive_graph() {
    let mut source = collection_with(vec![tree()]);
    let read = source.get_or_add_read_contract(&TypeDef::named("Tree")).unwrap();

    let mut target = ContractCollection::new();
    let first = source.copy_read_to(read, &mut target).unwrap();
    let size = target.len();
    let second = source.copy_read_to(read, &mut target).unwrap();
    assert_eq!(first, second);
    assert_eq!(target.len(), size);

    assert_eq!(
        Fingerprint::of(&source, read.id()).unwrap(),
        Fingerprint::of(&target, first.id()).unwrap()
    );
}

// =============================================================================
// Descriptors
// =============================================================================

#[test]
fn test_descriptor_round_trip_through_json() {
    let mut source = collection_with(vec![point()]);
    let read = source.get_or_add_read_contract(&shape()).unwrap();
    let json = source
        .export_read(read)
        .unwrap()
        .to_json_string(OutputFormat::Pretty)
        .unwrap();

    let mut target = ContractCollection::new();
    let imported = target.import_read(&Element::from_json_str(&json).unwrap()).unwrap();

    assert_eq!(
        Fingerprint::of(&source, read.id()).unwrap(),
        Fingerprint::of(&target, imported.id()).unwrap()
    );
    assert_eq!(target.describe(imported.id()), source.describe(read.id()));
}

#[test]
fn test_descriptor_dependencies_first() {
    let mut collection = collection_with(vec![point()]);
    let write = collection.get_or_add_write_contract(&shape()).unwrap();
    let document = collection.export_write(write).unwrap();

    let names: Vec<_> = document.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ComplexWrite", "UnionWrite"]);
    assert_eq!(document.attribute("Root"), Some("#UnionWrite1"));

    let polygon = document.children[1]
        .elements("Member")
        .find(|m| m.attribute("Name") == Some("Polygon"))
        .unwrap();
    assert_eq!(polygon.attribute("Contract"), Some("{list #ComplexWrite0}"));
}

#[test]
fn test_recursive_descriptor_round_trip() {
    let mut source = collection_with(vec![tree()]);
    let write = source.get_or_add_write_contract(&TypeDef::named("Tree")).unwrap();
    let document = source.export_write(write).unwrap();

    let tree_element = document.children.iter().find(|c| c.name == "ComplexWrite").unwrap();
    let tree_id = tree_element.attribute("Id").unwrap();
    let children = tree_element
        .elements("Field")
        .find(|f| f.attribute("Name") == Some("children"))
        .unwrap();
    assert_eq!(children.attribute("Contract"), Some(format!("{{list #{}}}", tree_id).as_str()));

    let mut target = ContractCollection::new();
    let imported = target.import_write(&document).unwrap();
    assert_eq!(
        Fingerprint::of(&source, write.id()).unwrap(),
        Fingerprint::of(&target, imported.id()).unwrap()
    );

    // importing into the source finds the existing graph
    let size = source.len();
    assert_eq!(source.import_write(&document).unwrap(), write);
    assert_eq!(source.len(), size);
}

#[test]
fn test_missing_id_fails_fast() {
    let mut collection = collection_with(vec![point()]);
    let write = collection.get_or_add_write_contract(&shape()).unwrap();
    assert!(matches!(
        collection.element_of(write.id()),
        Err(ContractError::MissingId { kind: "UnionWrite" })
    ));
    assert!(collection.reference_string(write.id()).is_err());
}

#[test]
fn test_malformed_descriptors() {
    let mut collection = ContractCollection::new();

    let not_a_document = Element::new("Enum").with_attribute("Id", "Enum0");
    assert!(collection.import_write(&not_a_document).is_err());

    let member_without_name = Element::new("Contracts")
        .with_attribute("Root", "#Enum0")
        .with_child(Element::new("Enum").with_attribute("Id", "Enum0").with_child(Element::new("Member")));
    assert!(matches!(
        collection.import_write(&member_without_name),
        Err(ContractError::MalformedDescriptor(_))
    ));

    let bad_markup = Element::new("Contracts").with_attribute("Root", "{list int}");
    assert!(matches!(
        collection.import_write(&bad_markup),
        Err(ContractError::InvalidMarkup { .. })
    ));

    let duplicate_ids = Element::new("Contracts")
        .with_attribute("Root", "#E")
        .with_child(Element::new("Enum").with_attribute("Id", "E"))
        .with_child(Element::new("Enum").with_attribute("Id", "E"));
    assert!(collection.import_read(&duplicate_ids).is_err());

    assert!(collection.is_empty());
}

// =============================================================================
// Graph analysis
// =============================================================================

#[test]
fn test_recursion_groups() {
    let mut collection = collection_with(vec![tree(), point()]);
    let root = collection.get_or_add_write_contract(&TypeDef::named("Tree")).unwrap();
    let graph = ContractGraph::from_root(&collection, root.id()).unwrap();
    assert_eq!(graph.recursion_groups(), vec![vec![root.id()]]);

    let union = collection.get_or_add_write_contract(&shape()).unwrap();
    let graph = ContractGraph::from_root(&collection, union.id()).unwrap();
    assert!(graph.recursion_groups().is_empty());
    assert_eq!(graph.len(), 2);
}

#[test]
fn test_fingerprint_changes_with_schema() {
    let mut collection = collection_with(vec![point()]);
    let before = collection.get_or_add_write_contract(&shape()).unwrap();

    let mut extended = ContractCollection::new();
    extended
        .register(TypeDef::record(
            "Point",
            vec![
                FieldDef::new("x", TypeDef::primitive(PrimitiveType::F64)),
                FieldDef::new("y", TypeDef::primitive(PrimitiveType::F64)),
                FieldDef::new("z", TypeDef::primitive(PrimitiveType::F64)),
            ],
        ))
        .unwrap();
    let after = extended.get_or_add_write_contract(&shape()).unwrap();

    assert_ne!(
        Fingerprint::of(&collection, before.id()).unwrap(),
        Fingerprint::of(&extended, after.id()).unwrap()
    );
}
