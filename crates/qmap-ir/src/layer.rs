//! Layer decomposition and run collection.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::dag::{CircuitDag, DagNode, NodeKey};
use crate::error::{IrError, IrResult};
use crate::operation::Operation;
use crate::wire::Wire;

/// A set of operations that act on disjoint wires and can run in parallel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Node keys of the operations, in the order they were found.
    pub nodes: Vec<NodeKey>,
    /// The operations themselves.
    pub operations: Vec<Operation>,
    /// Qubit groups touched by the non-barrier operations.
    pub partition: Vec<Vec<Wire>>,
}

impl Layer {
    fn push(&mut self, key: NodeKey, op: &Operation) {
        if !op.is_barrier() {
            self.partition.push(op.qubits.clone());
        }
        self.nodes.push(key);
        self.operations.push(op.clone());
    }

    /// Check if the layer has no operations.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl CircuitDag {
    /// Greedy decomposition into layers of wire-disjoint operations.
    ///
    /// Every operation is placed in the earliest layer after all the
    /// operations it depends on.
    pub fn layers(&self) -> IrResult<Vec<Layer>> {
        let mut frontier: FxHashMap<Wire, NodeKey> = self.input_map.clone();
        let mut remaining: BTreeSet<Wire> = self.wires.iter().cloned().collect();
        let mut layers = Vec::new();

        while !remaining.is_empty() {
            let mut layer = Layer::default();
            let mut pending: FxHashMap<NodeKey, FxHashSet<Wire>> = FxHashMap::default();
            let mut finished = Vec::new();

            for wire in &remaining {
                let current = frontier.get(wire).copied().ok_or_else(|| {
                    IrError::InvalidDag(format!("wire {wire} has no input node"))
                })?;
                let next = self.wire_successor(current, wire).ok_or_else(|| {
                    IrError::InvalidDag(format!("wire {wire} is broken after node {current}"))
                })?;
                match self.node(next) {
                    Some(DagNode::Out(_)) => finished.push(wire.clone()),
                    Some(DagNode::Op(op)) => {
                        let waiting = pending
                            .entry(next)
                            .or_insert_with(|| self.node_wires(op).into_iter().collect());
                        waiting.remove(wire);
                        if waiting.is_empty() {
                            for touched in self.node_wires(op) {
                                frontier.insert(touched, next);
                            }
                            layer.push(next, op);
                        }
                    }
                    _ => {
                        return Err(IrError::InvalidDag(format!(
                            "wire {wire} leads to an input node"
                        )));
                    }
                }
            }

            if layer.is_empty() && finished.is_empty() {
                return Err(IrError::InvalidDag("layering made no progress".into()));
            }
            for wire in finished {
                remaining.remove(&wire);
            }
            if !layer.is_empty() {
                layers.push(layer);
            }
        }
        Ok(layers)
    }

    /// One layer per operation, in topological order.
    pub fn serial_layers(&self) -> IrResult<Vec<Layer>> {
        let mut layers = Vec::new();
        for key in self.topological_op_nodes()? {
            if let Some(op) = self.operation(key) {
                let mut layer = Layer::default();
                layer.push(key, op);
                layers.push(layer);
            }
        }
        Ok(layers)
    }

    /// Maximal chains of unconditioned operations named in `names`, where
    /// each link is the only successor of the previous one.
    ///
    /// Only chains of two or more operations are returned.
    pub fn collect_runs(&self, names: &[&str]) -> IrResult<Vec<Vec<NodeKey>>> {
        let in_run = |key: NodeKey| {
            self.operation(key)
                .is_some_and(|op| names.contains(&op.name.as_str()) && op.condition.is_none())
        };

        let mut seen: FxHashSet<NodeKey> = FxHashSet::default();
        let mut runs = Vec::new();
        for key in self.topological_op_nodes()? {
            if seen.contains(&key) || !in_run(key) {
                continue;
            }
            let mut group = vec![key];
            seen.insert(key);
            let mut successors = self.graph.successors(key);
            while let [next] = successors[..] {
                if seen.contains(&next) || !in_run(next) {
                    break;
                }
                group.push(next);
                seen.insert(next);
                successors = self.graph.successors(next);
            }
            if group.len() > 1 {
                runs.push(group);
            }
        }
        Ok(runs)
    }
}
