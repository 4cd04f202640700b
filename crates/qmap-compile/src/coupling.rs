//! Hardware coupling graph.
//!
//! The coupling graph defines which ordered pairs of physical qubits support
//! a native two-qubit gate: an edge `a -> b` means `a` may control and `b`
//! may be targeted. Distances are measured on the undirected projection,
//! since a SWAP works in either direction.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use qmap_ir::{LabeledGraph, VertexKey, Wire};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CouplingError, CouplingResult};

/// Register holding the physical qubits of a device.
pub const PHYSICAL_REGISTER: &str = "q";

/// Directed coupling graph over physical qubits.
///
/// Serializes as an adjacency map `{source: [targets]}` over qubits of the
/// `q` register.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<u32, Vec<u32>>",
    into = "BTreeMap<u32, Vec<u32>>"
)]
pub struct CouplingGraph {
    graph: LabeledGraph<Wire, ()>,
    keys: FxHashMap<Wire, VertexKey>,
    /// Qubits in insertion order.
    qubits: Vec<Wire>,
    distances: Option<BTreeMap<VertexKey, BTreeMap<VertexKey, usize>>>,
}

impl CouplingGraph {
    /// Create an empty coupling graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an adjacency map over `q[i]` and compute distances.
    pub fn from_adjacency(adjacency: &BTreeMap<u32, Vec<u32>>) -> CouplingResult<Self> {
        let mut coupling = Self::new();
        for (&source, targets) in adjacency {
            let source = Wire::new(PHYSICAL_REGISTER, source);
            if !coupling.contains(&source) {
                coupling.add_qubit(source.clone())?;
            }
            for &target in targets {
                coupling.add_edge(source.clone(), Wire::new(PHYSICAL_REGISTER, target));
            }
        }
        coupling.compute_distance()?;
        Ok(coupling)
    }

    /// Adjacency map of the `q` register qubits.
    pub fn to_adjacency(&self) -> BTreeMap<u32, Vec<u32>> {
        let mut adjacency: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (source, target) in self.edges() {
            if source.register == PHYSICAL_REGISTER && target.register == PHYSICAL_REGISTER {
                adjacency.entry(source.index).or_default().push(target.index);
            }
        }
        adjacency
    }

    /// Add a qubit.
    pub fn add_qubit(&mut self, qubit: Wire) -> CouplingResult<()> {
        if self.contains(&qubit) {
            return Err(CouplingError::DuplicateQubit(qubit));
        }
        let key = self.graph.add_node(qubit.clone());
        self.keys.insert(qubit.clone(), key);
        self.qubits.push(qubit);
        self.distances = None;
        Ok(())
    }

    fn key_or_insert(&mut self, qubit: Wire) -> VertexKey {
        if let Some(&key) = self.keys.get(&qubit) {
            return key;
        }
        let key = self.graph.add_node(qubit.clone());
        self.keys.insert(qubit.clone(), key);
        self.qubits.push(qubit);
        key
    }

    /// Add a directed edge, adding missing endpoints.
    pub fn add_edge(&mut self, source: Wire, target: Wire) {
        let source = self.key_or_insert(source);
        let target = self.key_or_insert(target);
        self.graph.add_edge(source, target, None, 1);
        self.distances = None;
    }

    /// Check if the graph is weakly connected. An empty graph is not.
    pub fn connected(&self) -> bool {
        self.graph.vertex_count() > 0 && self.graph.number_weakly_connected_components() == 1
    }

    /// Compute all-pairs distances over the undirected projection.
    pub fn compute_distance(&mut self) -> CouplingResult<()> {
        if !self.connected() {
            return Err(CouplingError::NotConnected);
        }
        self.distances = Some(self.graph.undirected_distances());
        Ok(())
    }

    /// Shortest-path distance between two qubits.
    pub fn distance(&self, a: &Wire, b: &Wire) -> CouplingResult<usize> {
        let distances = self
            .distances
            .as_ref()
            .ok_or(CouplingError::DistanceNotComputed)?;
        let key = |w: &Wire| {
            self.keys
                .get(w)
                .copied()
                .ok_or_else(|| CouplingError::NotInGraph(w.clone()))
        };
        let (ka, kb) = (key(a)?, key(b)?);
        distances
            .get(&ka)
            .and_then(|row| row.get(&kb))
            .copied()
            .ok_or(CouplingError::NotConnected)
    }

    /// Check if distances are available.
    pub fn has_distances(&self) -> bool {
        self.distances.is_some()
    }

    /// Check if `source -> target` is an edge.
    pub fn has_edge(&self, source: &Wire, target: &Wire) -> bool {
        match (self.keys.get(source), self.keys.get(target)) {
            (Some(&s), Some(&t)) => self.graph.successors(s).contains(&t),
            _ => false,
        }
    }

    /// The directed edge set.
    pub fn get_edges(&self) -> BTreeSet<(Wire, Wire)> {
        self.edges().into_iter().collect()
    }

    /// Directed edges in insertion order.
    pub fn edges(&self) -> Vec<(Wire, Wire)> {
        self.graph
            .edges()
            .filter_map(|(s, t, _)| Some((self.graph.data(s)?.clone(), self.graph.data(t)?.clone())))
            .collect()
    }

    /// Number of qubits.
    pub fn size(&self) -> usize {
        self.qubits.len()
    }

    /// Qubits in insertion order.
    pub fn qubits(&self) -> &[Wire] {
        &self.qubits
    }

    /// Check if a qubit is in the graph.
    pub fn contains(&self, qubit: &Wire) -> bool {
        self.keys.contains_key(qubit)
    }

    /// Linear chain `q[0] -> q[1] -> ... -> q[n-1]`.
    pub fn linear(n: u32) -> Self {
        Self::build(n, (1..n).map(|i| (i - 1, i)))
    }

    /// Star with `q[0]` controlling every other qubit.
    pub fn star(n: u32) -> Self {
        Self::build(n, (1..n).map(|i| (0, i)))
    }

    /// Every qubit coupled to every other in both directions.
    pub fn full(n: u32) -> Self {
        Self::build(
            n,
            (0..n).flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j))),
        )
    }

    fn build(n: u32, edges: impl Iterator<Item = (u32, u32)>) -> Self {
        let mut coupling = Self::new();
        for i in 0..n {
            coupling.key_or_insert(Wire::new(PHYSICAL_REGISTER, i));
        }
        for (a, b) in edges {
            coupling.add_edge(
                Wire::new(PHYSICAL_REGISTER, a),
                Wire::new(PHYSICAL_REGISTER, b),
            );
        }
        if coupling.connected() {
            coupling.distances = Some(coupling.graph.undirected_distances());
        }
        coupling
    }
}

impl TryFrom<BTreeMap<u32, Vec<u32>>> for CouplingGraph {
    type Error = CouplingError;

    fn try_from(adjacency: BTreeMap<u32, Vec<u32>>) -> CouplingResult<Self> {
        Self::from_adjacency(&adjacency)
    }
}

impl From<CouplingGraph> for BTreeMap<u32, Vec<u32>> {
    fn from(coupling: CouplingGraph) -> Self {
        coupling.to_adjacency()
    }
}

impl fmt::Display for CouplingGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qubits: Vec<String> = self
            .qubits
            .iter()
            .filter_map(|q| Some(format!("{q} @ {}", self.keys.get(q)? + 1)))
            .collect();
        let edges: Vec<String> = self
            .edges()
            .iter()
            .map(|(s, t)| format!("{s}-{t}"))
            .collect();
        write!(f, "{}; {}", qubits.join(", "), edges.join(", "))
    }
}
