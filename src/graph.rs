//! Contract Graph Analysis
//!
//! The by-reference dependency graph reachable from one root. By-value nodes
//! are folded into the edges of the by-reference node that uses them, so the
//! graph has exactly the nodes that appear as descriptor elements. Strongly
//! connected components give the emission order (dependencies first) and the
//! groups of mutually recursive contracts.

use std::collections::HashMap;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::collection::ContractCollection;
use crate::contract::ContractId;
use crate::error::Result;

/// Dependency graph of by-reference contracts
#[derive(Debug, Clone)]
pub struct ContractGraph {
    graph: DiGraph<ContractId, ()>,
    nodes: HashMap<ContractId, NodeIndex>,
    /// By-reference nodes the root itself refers to (the root, if it is one)
    entry_points: Vec<ContractId>,
}

impl ContractGraph {
    /// Collect every by-reference node reachable from `root`
    pub fn from_root(collection: &ContractCollection, root: ContractId) -> Result<Self> {
        let mut graph = Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            entry_points: Vec::new(),
        };

        let mut entry_points = Vec::new();
        by_ref_targets(collection, root, &mut entry_points)?;

        let mut pending = Vec::new();
        for id in &entry_points {
            graph.add_node(*id, &mut pending);
        }
        graph.entry_points = entry_points;

        while let Some(id) = pending.pop() {
            let from = graph.add_node(id, &mut pending);
            let mut targets = Vec::new();
            for child in collection.contract(id)?.children() {
                by_ref_targets(collection, child, &mut targets)?;
            }
            for target in targets {
                let to = graph.add_node(target, &mut pending);
                graph.graph.update_edge(from, to, ());
            }
        }

        Ok(graph)
    }

    fn add_node(&mut self, id: ContractId, pending: &mut Vec<ContractId>) -> NodeIndex {
        if let Some(index) = self.nodes.get(&id) {
            return *index;
        }
        let index = self.graph.add_node(id);
        self.nodes.insert(id, index);
        pending.push(id);
        index
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: ContractId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn entry_points(&self) -> &[ContractId] {
        &self.entry_points
    }

    /// By-reference nodes `id` refers to directly or through by-value nodes
    pub fn dependencies(&self, id: ContractId) -> Vec<ContractId> {
        let mut deps: Vec<_> = match self.nodes.get(&id) {
            Some(index) => self
                .graph
                .neighbors_directed(*index, Direction::Outgoing)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        };
        deps.sort();
        deps
    }

    /// Every node, dependencies before dependents. Members of a recursive
    /// group are ordered by handle.
    pub fn emission_order(&self) -> Vec<ContractId> {
        // kosaraju_scc yields components in postorder
        kosaraju_scc(&self.graph)
            .into_iter()
            .flat_map(|scc| {
                let mut ids: Vec<_> = scc.into_iter().map(|n| self.graph[n]).collect();
                ids.sort();
                ids
            })
            .collect()
    }

    /// Groups of contracts that refer back to themselves
    pub fn recursion_groups(&self) -> Vec<Vec<ContractId>> {
        let mut groups: Vec<Vec<ContractId>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<_> = scc.into_iter().map(|n| self.graph[n]).collect();
                ids.sort();
                ids
            })
            .collect();
        groups.sort();
        groups
    }

    pub fn is_recursive(&self, id: ContractId) -> bool {
        self.recursion_groups().iter().any(|group| group.contains(&id))
    }
}

/// The nearest by-reference nodes at or below `id`
fn by_ref_targets(collection: &ContractCollection, id: ContractId, out: &mut Vec<ContractId>) -> Result<()> {
    let contract = collection.contract(id)?;
    if contract.is_by_ref() {
        if !out.contains(&id) {
            out.push(id);
        }
        return Ok(());
    }
    // by-value nodes never close a cycle on their own
    for child in contract.children() {
        by_ref_targets(collection, child, out)?;
    }
    Ok(())
}
