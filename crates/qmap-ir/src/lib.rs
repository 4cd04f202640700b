//! Circuit Intermediate Representation for qubit mapping
//!
//! This crate provides the data structures the mapping stack is built on:
//! a general wire-labeled multigraph and the circuit DAG layered on top of it.
//!
//! # Overview
//!
//! A circuit is a DAG whose edges are labeled with the wire they carry.
//! Every declared wire owns an input node and an output node; operations sit
//! on the wires in between. Operations must be registered as basis elements
//! with a fixed signature before they can be applied.
//!
//! # Core Components
//!
//! - **Graph**: [`LabeledGraph`] with stable integer keys, payload-labeled
//!   edges and deterministic traversal order
//! - **Wires**: [`Wire`] and [`Register`] addressing `name[index]` slots
//! - **Operations**: [`Operation`], [`Condition`] and basis [`Signature`]s
//! - **DAG**: [`CircuitDag`] with substitution, layering and QASM output
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qmap_ir::{CircuitDag, Operation, Wire};
//!
//! let mut dag = CircuitDag::new();
//! dag.add_qreg("q", 2).unwrap();
//! dag.add_creg("c", 2).unwrap();
//! dag.add_basis_element("h", 1, 0, 0).unwrap();
//! dag.add_basis_element("cx", 2, 0, 0).unwrap();
//!
//! dag.apply_operation_back(Operation::new("h", [Wire::new("q", 0)])).unwrap();
//! dag.apply_operation_back(Operation::new("cx", [Wire::new("q", 0), Wire::new("q", 1)]))
//!     .unwrap();
//!
//! assert_eq!(dag.size(), 2);
//! assert_eq!(dag.depth().unwrap(), 2);
//! assert!(dag.qasm().unwrap().contains("cx q[0],q[1];"));
//! ```

pub mod dag;
pub mod error;
pub mod graph;
pub mod layer;
pub mod operation;
pub mod qasm;
pub mod wire;

pub use dag::{CircuitDag, DagNode, NodeKey, PropertySummary};
pub use error::{IrError, IrResult};
pub use graph::{Edge, LabeledGraph, Vertex, VertexKey};
pub use layer::Layer;
pub use operation::{
    BUILTIN_OPS, Condition, GateDefinition, Operation, QELIB1_GATES, Signature, StandardGate,
    standard_gate,
};
pub use qasm::QasmOptions;
pub use wire::{Register, Wire, WireKind};
