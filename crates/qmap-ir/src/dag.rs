//! DAG-based circuit representation.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::graph::{LabeledGraph, VertexKey};
use crate::operation::{GateDefinition, Operation, Signature};
use crate::wire::{Register, Wire, WireKind};

/// Key of a node in the circuit DAG.
pub type NodeKey = VertexKey;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(Wire),
    /// Output node for a wire.
    Out(Wire),
    /// Operation node.
    Op(Operation),
}

impl DagNode {
    /// Check if this is an input node.
    #[inline]
    pub fn is_input(&self) -> bool {
        matches!(self, DagNode::In(_))
    }

    /// Check if this is an output node.
    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self, DagNode::Out(_))
    }

    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the operation if this is an operation node.
    #[inline]
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            DagNode::Op(op) => Some(op),
            _ => None,
        }
    }
}

/// DAG-based circuit representation.
///
/// The circuit is represented as a directed acyclic graph where:
/// - Nodes are either input nodes, output nodes, or operation nodes
/// - Edges are labeled with the wire they carry
/// - Each wire has exactly one input and one output node
/// - An operation node has one incoming and one outgoing edge per wire it
///   touches, including the bits of its condition register
///
/// Every mutating method validates its arguments before touching the graph,
/// so a failed call leaves the circuit unchanged.
#[derive(Debug, Clone, Default)]
pub struct CircuitDag {
    pub(crate) graph: LabeledGraph<DagNode, Wire>,
    pub(crate) qregs: Vec<Register>,
    pub(crate) cregs: Vec<Register>,
    /// Wires in declaration order.
    pub(crate) wires: Vec<Wire>,
    pub(crate) wire_kinds: FxHashMap<Wire, WireKind>,
    pub(crate) input_map: FxHashMap<Wire, NodeKey>,
    pub(crate) output_map: FxHashMap<Wire, NodeKey>,
    pub(crate) basis: BTreeMap<String, Signature>,
    /// Definitions of custom basis gates, in registration order.
    pub(crate) gates: Vec<GateDefinition>,
}

impl CircuitDag {
    /// Create a new empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a quantum register.
    pub fn add_qreg(&mut self, name: &str, size: u32) -> IrResult<()> {
        self.add_register(Register::quantum(name, size))
    }

    /// Declare a classical register.
    pub fn add_creg(&mut self, name: &str, size: u32) -> IrResult<()> {
        self.add_register(Register::classical(name, size))
    }

    fn add_register(&mut self, register: Register) -> IrResult<()> {
        if self.has_register(&register.name) {
            return Err(IrError::DuplicateRegister(register.name));
        }
        if let Some(wire) = register.wires().find(|w| self.wire_kinds.contains_key(w)) {
            return Err(IrError::DuplicateWire(wire));
        }
        for wire in register.wires() {
            self.add_wire(wire, register.kind);
        }
        match register.kind {
            WireKind::Quantum => self.qregs.push(register),
            WireKind::Classical => self.cregs.push(register),
        }
        Ok(())
    }

    fn add_wire(&mut self, wire: Wire, kind: WireKind) {
        let input = self.graph.add_node(DagNode::In(wire.clone()));
        let output = self.graph.add_node(DagNode::Out(wire.clone()));
        self.graph.add_edge(input, output, Some(wire.clone()), 0);
        self.input_map.insert(wire.clone(), input);
        self.output_map.insert(wire.clone(), output);
        self.wire_kinds.insert(wire.clone(), kind);
        self.wires.push(wire);
    }

    /// Check if a quantum or classical register has this name.
    pub fn has_register(&self, name: &str) -> bool {
        self.qregs.iter().chain(&self.cregs).any(|r| r.name == name)
    }

    /// Quantum registers in declaration order.
    pub fn qregs(&self) -> &[Register] {
        &self.qregs
    }

    /// Classical registers in declaration order.
    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    /// Get a classical register by name.
    pub fn creg(&self, name: &str) -> Option<&Register> {
        self.cregs.iter().find(|r| r.name == name)
    }

    /// Qubits in declaration order.
    pub fn qubits(&self) -> Vec<Wire> {
        self.wires_of_kind(WireKind::Quantum)
    }

    /// Classical bits in declaration order.
    pub fn clbits(&self) -> Vec<Wire> {
        self.wires_of_kind(WireKind::Classical)
    }

    fn wires_of_kind(&self, kind: WireKind) -> Vec<Wire> {
        self.wires
            .iter()
            .filter(|w| self.wire_kinds.get(*w) == Some(&kind))
            .cloned()
            .collect()
    }

    /// Kind of a declared wire.
    pub fn wire_kind(&self, wire: &Wire) -> Option<WireKind> {
        self.wire_kinds.get(wire).copied()
    }

    /// Input node of a wire.
    pub fn input_node(&self, wire: &Wire) -> Option<NodeKey> {
        self.input_map.get(wire).copied()
    }

    /// Output node of a wire.
    pub fn output_node(&self, wire: &Wire) -> Option<NodeKey> {
        self.output_map.get(wire).copied()
    }

    /// Register a basis element.
    ///
    /// `barrier` is always registered as variadic. Registering the same
    /// signature twice is allowed; a different signature is an error.
    pub fn add_basis_element(
        &mut self,
        name: &str,
        num_qubits: usize,
        num_clbits: usize,
        num_params: usize,
    ) -> IrResult<()> {
        let signature = if name == "barrier" {
            Signature::variadic()
        } else {
            Signature::new(num_qubits, num_clbits, num_params)
        };
        self.add_basis_signature(name, signature)
    }

    /// Register a basis element with an explicit signature.
    pub fn add_basis_signature(&mut self, name: &str, signature: Signature) -> IrResult<()> {
        self.check_basis_compatible(name, signature)?;
        self.basis.insert(name.to_string(), signature);
        Ok(())
    }

    fn check_basis_compatible(&self, name: &str, signature: Signature) -> IrResult<()> {
        match self.basis.get(name) {
            Some(existing) if *existing != signature => Err(IrError::IncompatibleBasis {
                name: name.to_string(),
                existing: *existing,
                requested: signature,
            }),
            _ => Ok(()),
        }
    }

    /// Registered basis elements.
    pub fn basis(&self) -> &BTreeMap<String, Signature> {
        &self.basis
    }

    /// Signature of a basis element.
    pub fn signature(&self, name: &str) -> Option<Signature> {
        self.basis.get(name).copied()
    }

    /// Drop a basis element and its gate definition.
    ///
    /// Fails if any operation node still uses the name.
    pub fn remove_basis_element(&mut self, name: &str) -> IrResult<()> {
        if !self.get_named_nodes(name)?.is_empty() {
            return Err(IrError::BasisElementInUse(name.to_string()));
        }
        self.basis.remove(name);
        self.gates.retain(|g| g.name != name);
        Ok(())
    }

    /// Record the definition of a custom gate. The first definition of a name wins.
    pub fn add_gate_definition(&mut self, definition: GateDefinition) {
        if self.gate_definition(&definition.name).is_none() {
            self.gates.push(definition);
        }
    }

    /// Recorded gate definitions in registration order.
    pub fn gate_definitions(&self) -> &[GateDefinition] {
        &self.gates
    }

    /// Get a gate definition by name.
    pub fn gate_definition(&self, name: &str) -> Option<&GateDefinition> {
        self.gates.iter().find(|g| g.name == name)
    }

    /// Validate an operation against the basis and the declared wires.
    pub fn check_operation(&self, op: &Operation) -> IrResult<()> {
        let signature = self
            .basis
            .get(&op.name)
            .ok_or_else(|| IrError::UnknownBasisElement(op.name.clone()))?;

        let arity = |what, expected, got| IrError::ArityMismatch {
            name: op.name.clone(),
            what,
            expected,
            got,
        };
        if signature.variadic {
            if op.qubits.is_empty() {
                return Err(arity("qubits", 1, 0));
            }
        } else if op.qubits.len() != signature.num_qubits {
            return Err(arity("qubits", signature.num_qubits, op.qubits.len()));
        }
        if op.clbits.len() != signature.num_clbits {
            return Err(arity("clbits", signature.num_clbits, op.clbits.len()));
        }
        if op.params.len() != signature.num_params {
            return Err(arity("params", signature.num_params, op.params.len()));
        }
        if let Some(&value) = op.params.iter().find(|p| !p.is_finite()) {
            return Err(IrError::NonFiniteParameter {
                name: op.name.clone(),
                value,
            });
        }

        for qubit in &op.qubits {
            self.check_wire(qubit, WireKind::Quantum)?;
        }
        for clbit in &op.clbits {
            self.check_wire(clbit, WireKind::Classical)?;
        }

        let mut seen = FxHashSet::default();
        for wire in op.wires() {
            if !seen.insert(wire) {
                return Err(IrError::DuplicateWire(wire.clone()));
            }
        }

        if let Some(condition) = &op.condition {
            if self.creg(&condition.register).is_none() {
                return Err(IrError::InvalidCondition(format!(
                    "classical register '{}' not found",
                    condition.register
                )));
            }
        }
        Ok(())
    }

    fn check_wire(&self, wire: &Wire, kind: WireKind) -> IrResult<()> {
        match self.wire_kinds.get(wire) {
            None => Err(IrError::WireNotFound(wire.clone())),
            Some(found) if *found != kind => Err(IrError::WireTypeMismatch {
                wire: wire.clone(),
                expected: kind,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Every wire an operation node is attached to: its qubits, its
    /// classical bits, then the remaining bits of its condition register.
    pub(crate) fn node_wires(&self, op: &Operation) -> Vec<Wire> {
        let mut wires: Vec<Wire> = op.wires().cloned().collect();
        if let Some(register) = op.condition.as_ref().and_then(|c| self.creg(&c.register)) {
            for wire in register.wires() {
                if !wires.contains(&wire) {
                    wires.push(wire);
                }
            }
        }
        wires
    }

    /// Append an operation at the end of the circuit.
    pub fn apply_operation_back(&mut self, op: Operation) -> IrResult<NodeKey> {
        self.check_operation(&op)?;
        let anchors = self.anchors(&op, &self.output_map)?;
        let node = self.graph.add_node(DagNode::Op(op));
        for (wire, anchor) in anchors {
            self.link_before(node, &wire, anchor);
        }
        Ok(node)
    }

    /// Prepend an operation at the start of the circuit.
    pub fn apply_operation_front(&mut self, op: Operation) -> IrResult<NodeKey> {
        self.check_operation(&op)?;
        let anchors = self.anchors(&op, &self.input_map)?;
        let node = self.graph.add_node(DagNode::Op(op));
        for (wire, anchor) in anchors {
            self.link_after(node, &wire, anchor);
        }
        Ok(node)
    }

    fn anchors(
        &self,
        op: &Operation,
        map: &FxHashMap<Wire, NodeKey>,
    ) -> IrResult<Vec<(Wire, NodeKey)>> {
        self.node_wires(op)
            .into_iter()
            .map(|wire| match map.get(&wire) {
                Some(&key) => Ok((wire, key)),
                None => Err(IrError::WireNotFound(wire)),
            })
            .collect()
    }

    /// Insert `node` on `wire` immediately before `anchor`.
    fn link_before(&mut self, node: NodeKey, wire: &Wire, anchor: NodeKey) {
        if let Some(pred) = self.wire_predecessor(anchor, wire) {
            self.graph.remove_labeled_edge(pred, anchor, wire);
            self.graph.add_edge(pred, node, Some(wire.clone()), 0);
        }
        self.graph.add_edge(node, anchor, Some(wire.clone()), 0);
    }

    /// Insert `node` on `wire` immediately after `anchor`.
    fn link_after(&mut self, node: NodeKey, wire: &Wire, anchor: NodeKey) {
        if let Some(succ) = self.wire_successor(anchor, wire) {
            self.graph.remove_labeled_edge(anchor, succ, wire);
            self.graph.add_edge(node, succ, Some(wire.clone()), 0);
        }
        self.graph.add_edge(anchor, node, Some(wire.clone()), 0);
    }

    /// The node feeding `node` on `wire`.
    pub fn wire_predecessor(&self, node: NodeKey, wire: &Wire) -> Option<NodeKey> {
        self.graph
            .in_edges(node)
            .into_iter()
            .find(|(_, e)| e.data.as_ref() == Some(wire))
            .map(|(k, _)| k)
    }

    /// The node fed by `node` on `wire`.
    pub fn wire_successor(&self, node: NodeKey, wire: &Wire) -> Option<NodeKey> {
        self.graph
            .out_edges(node)
            .into_iter()
            .find(|(_, e)| e.data.as_ref() == Some(wire))
            .map(|(k, _)| k)
    }

    /// Predecessor and successor of an operation node on each of its wires.
    fn neighbours_on_wires(
        &self,
        node: NodeKey,
        wires: &[Wire],
    ) -> IrResult<Vec<(Wire, NodeKey, NodeKey)>> {
        wires
            .iter()
            .map(|wire| {
                let pred = self.wire_predecessor(node, wire);
                let succ = self.wire_successor(node, wire);
                match (pred, succ) {
                    (Some(p), Some(s)) => Ok((wire.clone(), p, s)),
                    _ => Err(IrError::InvalidDag(format!(
                        "node {node} is not attached to wire {wire}"
                    ))),
                }
            })
            .collect()
    }

    /// Get a node.
    pub fn node(&self, key: NodeKey) -> Option<&DagNode> {
        self.graph.data(key)
    }

    /// Get the operation of an operation node.
    pub fn operation(&self, key: NodeKey) -> Option<&Operation> {
        self.node(key)?.operation()
    }

    /// Operation nodes in insertion order.
    pub fn op_nodes(&self) -> Vec<NodeKey> {
        self.graph
            .vertices()
            .filter(|v| v.data().is_some_and(DagNode::is_op))
            .map(|v| v.key())
            .collect()
    }

    /// Operation nodes in topological order.
    pub fn topological_op_nodes(&self) -> IrResult<Vec<NodeKey>> {
        Ok(self
            .graph
            .topological_sort(false)?
            .into_iter()
            .filter(|&k| self.operation(k).is_some())
            .collect())
    }

    /// Operations in topological order.
    pub fn topological_ops(&self) -> IrResult<Vec<&Operation>> {
        Ok(self
            .graph
            .topological_sort(false)?
            .into_iter()
            .filter_map(|k| self.operation(k))
            .collect())
    }

    /// The underlying graph.
    pub fn graph(&self) -> &LabeledGraph<DagNode, Wire> {
        &self.graph
    }

    /// Operation nodes named `name`, in insertion order.
    pub fn get_named_nodes(&self, name: &str) -> IrResult<Vec<NodeKey>> {
        if !self.basis.contains_key(name) {
            return Err(IrError::UnknownBasisElement(name.to_string()));
        }
        Ok(self
            .op_nodes()
            .into_iter()
            .filter(|&k| self.operation(k).is_some_and(|op| op.name == name))
            .collect())
    }

    /// Replace one operation node by the operations of `replacement`.
    ///
    /// `wires` lists wires of `replacement`, matched in order to the node's
    /// qubits followed by its classical bits. The inserted operations
    /// inherit the node's condition. Returns the inserted node keys in
    /// topological order.
    pub fn substitute_circuit_one(
        &mut self,
        node: NodeKey,
        replacement: &CircuitDag,
        wires: &[Wire],
    ) -> IrResult<Vec<NodeKey>> {
        let op = self
            .operation(node)
            .ok_or(IrError::NotAnOperation(node))?
            .clone();

        let targets: Vec<Wire> = op.wires().cloned().collect();
        let mut seen = FxHashSet::default();
        for wire in wires {
            if !seen.insert(wire) {
                return Err(IrError::DuplicateWire(wire.clone()));
            }
        }
        if wires.len() != targets.len() {
            return Err(IrError::WireCountMismatch {
                expected: targets.len(),
                got: wires.len(),
            });
        }
        let mut wire_map: FxHashMap<&Wire, &Wire> = FxHashMap::default();
        for (from, to) in wires.iter().zip(&targets) {
            let kind = replacement
                .wire_kind(from)
                .ok_or_else(|| IrError::WireNotFound(from.clone()))?;
            if self.wire_kind(to) != Some(kind) {
                return Err(IrError::WireTypeMismatch {
                    wire: from.clone(),
                    expected: self.wire_kind(to).unwrap_or(kind),
                });
            }
            wire_map.insert(from, to);
        }

        let inserted = replacement.topological_ops()?;
        for rop in &inserted {
            if rop.condition.is_some() {
                return Err(IrError::InvalidCondition(format!(
                    "replacement operation '{}' must not be conditioned",
                    rop.name
                )));
            }
            if let Some(unmapped) = rop.wires().find(|w| !wire_map.contains_key(w)) {
                return Err(IrError::WireMappingIncomplete(unmapped.clone()));
            }
        }
        for (name, signature) in &replacement.basis {
            self.check_basis_compatible(name, *signature)?;
        }
        let node_wires = self.node_wires(&op);
        let neighbours = self.neighbours_on_wires(node, &node_wires)?;

        // Validation done; mutate from here on.
        for (name, signature) in &replacement.basis {
            self.basis.insert(name.clone(), *signature);
        }
        for definition in &replacement.gates {
            self.add_gate_definition(definition.clone());
        }

        self.graph.remove_vertex(node);
        let mut successor: FxHashMap<Wire, NodeKey> = FxHashMap::default();
        for (wire, pred, succ) in neighbours {
            self.graph.add_edge(pred, succ, Some(wire.clone()), 0);
            successor.insert(wire, succ);
        }

        let mut created = Vec::with_capacity(inserted.len());
        for rop in inserted {
            let mapped = Operation {
                name: rop.name.clone(),
                params: rop.params.clone(),
                qubits: rop.qubits.iter().map(|w| wire_map[w].clone()).collect(),
                clbits: rop.clbits.iter().map(|w| wire_map[w].clone()).collect(),
                condition: op.condition.clone(),
            };
            let mapped_wires = self.node_wires(&mapped);
            let key = self.graph.add_node(DagNode::Op(mapped));
            for wire in mapped_wires {
                if let Some(&anchor) = successor.get(&wire) {
                    self.link_before(key, &wire, anchor);
                }
            }
            created.push(key);
        }
        Ok(created)
    }

    /// Replace every node named `name` by `replacement`.
    ///
    /// The replacement's qubits then classical bits, in declaration order,
    /// are matched to each node's wires.
    pub fn substitute_circuit_all(&mut self, name: &str, replacement: &CircuitDag) -> IrResult<()> {
        let wires: Vec<Wire> = replacement
            .qubits()
            .into_iter()
            .chain(replacement.clbits())
            .collect();
        for node in self.get_named_nodes(name)? {
            self.substitute_circuit_one(node, replacement, &wires)?;
        }
        Ok(())
    }

    /// Remove an operation node, reconnecting its wires.
    pub fn remove_op_node(&mut self, node: NodeKey) -> IrResult<Operation> {
        let op = self
            .operation(node)
            .ok_or(IrError::NotAnOperation(node))?
            .clone();
        let wires = self.node_wires(&op);
        let neighbours = self.neighbours_on_wires(node, &wires)?;
        self.graph.remove_vertex(node);
        for (wire, pred, succ) in neighbours {
            self.graph.add_edge(pred, succ, Some(wire), 0);
        }
        Ok(op)
    }

    fn remove_op_nodes(&mut self, nodes: Vec<NodeKey>) -> IrResult<()> {
        for node in nodes {
            if self.operation(node).is_some() {
                self.remove_op_node(node)?;
            }
        }
        Ok(())
    }

    /// Remove every operation that is an ancestor of `node`.
    pub fn remove_ancestors_of(&mut self, node: NodeKey) -> IrResult<()> {
        self.remove_op_nodes(self.graph.ancestors(node))
    }

    /// Remove every operation that is a descendant of `node`.
    pub fn remove_descendants_of(&mut self, node: NodeKey) -> IrResult<()> {
        self.remove_op_nodes(self.graph.descendants(node))
    }

    /// Remove every operation other than `node` that is not an ancestor of it.
    pub fn remove_nonancestors_of(&mut self, node: NodeKey) -> IrResult<()> {
        self.remove_op_nodes(self.graph.non_ancestors(node))
    }

    /// Remove every operation other than `node` that is not a descendant of it.
    pub fn remove_nondescendants_of(&mut self, node: NodeKey) -> IrResult<()> {
        self.remove_op_nodes(self.graph.non_descendants(node))
    }

    /// Remove every operation named `name`.
    pub fn remove_all_ops_named(&mut self, name: &str) -> IrResult<()> {
        let nodes = self.get_named_nodes(name)?;
        self.remove_op_nodes(nodes)
    }

    /// Append all operations of `other` to this circuit.
    ///
    /// `wire_map` maps wires of `other` to wires of `self`; unmapped wires
    /// must exist in `self` under the same name. Conditions are moved to the
    /// register that bit 0 of their register maps to. Either every
    /// operation is appended or the circuit is left unchanged.
    pub fn compose_back(
        &mut self,
        other: &CircuitDag,
        wire_map: &FxHashMap<Wire, Wire>,
    ) -> IrResult<()> {
        let map = |w: &Wire| wire_map.get(w).cloned().unwrap_or_else(|| w.clone());

        for wire in &other.wires {
            if let Some(&kind) = other.wire_kinds.get(wire) {
                self.check_wire(&map(wire), kind)?;
            }
        }

        let mut staged = self.clone();
        for (name, signature) in &other.basis {
            staged.add_basis_signature(name, *signature)?;
        }
        for definition in &other.gates {
            staged.add_gate_definition(definition.clone());
        }
        for op in other.topological_ops()? {
            let mut mapped = op.clone();
            mapped.qubits = op.qubits.iter().map(map).collect();
            mapped.clbits = op.clbits.iter().map(map).collect();
            if let Some(condition) = &mut mapped.condition {
                let first = Wire::new(condition.register.clone(), 0);
                condition.register = map(&first).register;
            }
            staged.apply_operation_back(mapped)?;
        }
        *self = staged;
        Ok(())
    }

    /// Rename a quantum or classical register everywhere it appears.
    pub fn rename_register(&mut self, old: &str, new: &str) -> IrResult<()> {
        if !self.has_register(old) {
            return Err(IrError::RegisterNotFound(old.to_string()));
        }
        if self.has_register(new) {
            return Err(IrError::DuplicateRegister(new.to_string()));
        }

        let rename = |wire: &mut Wire| {
            if wire.register == old {
                wire.register = new.to_string();
            }
        };

        for register in self.qregs.iter_mut().chain(self.cregs.iter_mut()) {
            if register.name == old {
                register.name = new.to_string();
            }
        }
        self.wires.iter_mut().for_each(rename);
        let rekey = |map: &mut FxHashMap<Wire, NodeKey>| {
            *map = map
                .drain()
                .map(|(mut w, k)| {
                    rename(&mut w);
                    (w, k)
                })
                .collect();
        };
        rekey(&mut self.input_map);
        rekey(&mut self.output_map);
        self.wire_kinds = self
            .wire_kinds
            .drain()
            .map(|(mut w, k)| {
                rename(&mut w);
                (w, k)
            })
            .collect();

        self.graph.for_each_data_mut(|node| match node {
            DagNode::In(wire) | DagNode::Out(wire) => rename(wire),
            DagNode::Op(op) => {
                op.qubits.iter_mut().for_each(rename);
                op.clbits.iter_mut().for_each(rename);
                if let Some(condition) = &mut op.condition {
                    if condition.register == old {
                        condition.register = new.to_string();
                    }
                }
            }
        });
        self.graph.for_each_edge_data_mut(rename);
        Ok(())
    }

    /// Number of operation nodes.
    pub fn size(&self) -> usize {
        self.op_nodes().len()
    }

    /// Number of qubits.
    pub fn width(&self) -> usize {
        self.qubits().len()
    }

    /// Number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.clbits().len()
    }

    /// Circuit depth: operations on the longest path.
    pub fn depth(&self) -> IrResult<usize> {
        Ok(self.graph.dag_longest_path_length()?.saturating_sub(1))
    }

    /// Number of independent pieces the circuit splits into.
    pub fn num_tensor_factors(&self) -> usize {
        self.graph.number_weakly_connected_components()
    }

    /// Count operations by name.
    pub fn count_ops(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for key in self.op_nodes() {
            if let Some(op) = self.operation(key) {
                *counts.entry(op.name.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Collect summary metrics.
    pub fn property_summary(&self) -> IrResult<PropertySummary> {
        Ok(PropertySummary {
            size: self.size(),
            depth: self.depth()?,
            width: self.width(),
            bits: self.num_clbits(),
            factors: self.num_tensor_factors(),
            operations: self.count_ops(),
        })
    }

    /// Check structural invariants.
    ///
    /// Verifies that the graph is acyclic, that every wire runs from its
    /// input node to its output node, and that every operation node has
    /// exactly one incoming and one outgoing edge per attached wire.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if !self.graph.is_directed_acyclic_graph() {
            return Err(IrError::InvalidDag("graph contains a cycle".into()));
        }

        let max_steps = self.graph.vertex_count();
        for wire in &self.wires {
            let (Some(&input), Some(&output)) = (self.input_map.get(wire), self.output_map.get(wire))
            else {
                return Err(IrError::InvalidDag(format!(
                    "wire {wire} is missing its input or output node"
                )));
            };
            if self.graph.in_degree(input) != 0 || self.graph.out_degree(output) != 0 {
                return Err(IrError::InvalidDag(format!(
                    "wire {wire} has edges entering its input or leaving its output"
                )));
            }

            let mut current = input;
            let mut steps = 0;
            while current != output {
                current = self.wire_successor(current, wire).ok_or_else(|| {
                    IrError::InvalidDag(format!("wire {wire} is broken after node {current}"))
                })?;
                steps += 1;
                if steps > max_steps {
                    return Err(IrError::InvalidDag(format!("wire {wire} does not terminate")));
                }
            }
        }

        for key in self.op_nodes() {
            let Some(op) = self.operation(key) else {
                continue;
            };
            let wires = self.node_wires(op);
            let incoming = self.graph.in_edges(key);
            let outgoing = self.graph.out_edges(key);
            if incoming.len() != wires.len() || outgoing.len() != wires.len() {
                return Err(IrError::InvalidDag(format!(
                    "node {key} ({}) has unbalanced degree",
                    op.name
                )));
            }
            for wire in &wires {
                let ins = incoming.iter().filter(|(_, e)| e.data.as_ref() == Some(wire));
                let outs = outgoing.iter().filter(|(_, e)| e.data.as_ref() == Some(wire));
                if ins.count() != 1 || outs.count() != 1 {
                    return Err(IrError::InvalidDag(format!(
                        "node {key} ({}) is not attached once to wire {wire}",
                        op.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Summary metrics of a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySummary {
    /// Number of operations.
    pub size: usize,
    /// Circuit depth.
    pub depth: usize,
    /// Number of qubits.
    pub width: usize,
    /// Number of classical bits.
    pub bits: usize,
    /// Number of tensor factors.
    pub factors: usize,
    /// Operation counts by name.
    pub operations: BTreeMap<String, usize>,
}
