//! Schema Contracts
//!
//! The schema-compatibility core of a binary serialization library. Given the
//! type used to *write* data and the type used to *read* it back, possibly in
//! another build or process, it decides before any bytes are exchanged
//! whether the reader can consume what the writer produces.
//!
//! ## Features
//!
//! - **Contracts**: write and read schema graphs built from [`TypeDef`]s
//! - **Interning**: structurally equal nodes share one handle
//! - **Compatibility**: strict and lenient `can_read_from` over recursive graphs
//! - **Descriptors**: portable JSON documents that round-trip a graph
//! - **Fingerprints**: SHA256 over a canonical rendering of a graph
//!
//! ## Example
//!
//! ```
//! use schema_contracts::{ContractCollection, FieldDef, PrimitiveType, TypeDef};
//!
//! let v1 = TypeDef::record("User", vec![
//!     FieldDef::new("id", TypeDef::primitive(PrimitiveType::I32)),
//! ]);
//! let v2 = TypeDef::record("User", vec![
//!     FieldDef::new("id", TypeDef::primitive(PrimitiveType::I64)),
//!     FieldDef::new("email", TypeDef::nullable(TypeDef::primitive(PrimitiveType::String))).with_default(),
//! ]);
//!
//! let mut contracts = ContractCollection::new();
//! let write = contracts.get_or_add_write_contract(&v1).unwrap();
//! let read = contracts.get_or_add_read_contract(&v2).unwrap();
//!
//! assert!(contracts.can_read_from(read, write, false));
//! assert!(!contracts.can_read_from(read, write, true));
//! ```

pub mod collection;
pub mod compatibility;
pub mod config;
pub mod contract;
pub mod descriptor;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod markup;
pub mod provider;
pub mod shared;
pub mod types;

pub use collection::ContractCollection;
pub use compatibility::{CompatibilityChecker, CompatibilityResult, Mismatch};
pub use config::{ContractsConfig, OutputFormat};
pub use contract::{Contract, ContractId, Direction, MemberName, ReadContractId, Strategy, WriteContractId};
pub use descriptor::Element;
pub use error::{ContractError, Result};
pub use fingerprint::Fingerprint;
pub use graph::ContractGraph;
pub use markup::Markup;
pub use provider::{Provider, DEFAULT_PROVIDERS};
pub use shared::SharedContractCollection;
pub use types::{Describe, EnumDef, FieldDef, PrimitiveType, RecordDef, TypeDef, UnionDef, UnionMember};
