//! Qubit mapping for OpenQASM 2.0 circuits
//!
//! This crate maps circuits onto hardware with restricted connectivity. A
//! [`CouplingGraph`] describes which physical qubit pairs support a native
//! `cx`, and in which direction. Mapping then happens in three steps:
//!
//! 1. **Swap mapping**: place circuit qubits on physical qubits and insert
//!    SWAPs so that every two-qubit gate acts on coupled qubits
//! 2. **Swap expansion**: rewrite each SWAP as three `cx` gates
//! 3. **Direction mapping**: rewrite `cx` gates that run against a one-way
//!    coupling edge with Hadamard conjugation
//!
//! # Architecture
//!
//! ```text
//! Unrolled circuit (U, CX)
//!       |
//!       v
//! +-------------+
//! | PassManager | <-- PropertySet (coupling graph, layout, trials, seed)
//! +-------------+
//!       |
//!       |-- SwapMapping       (layer_permutation per layer)
//!       |-- SwapExpansion     (cx; cx; cx)
//!       |-- DirectionMapping  (h; h; cx; h; h)
//!       `-- CxCancellation
//!       |
//!       v
//! Circuit over physical qubits
//! ```
//!
//! # Example: Mapping onto a Line
//!
//! ```rust
//! use qmap_compile::{CouplingGraph, PassManagerBuilder};
//! use qmap_ir::{CircuitDag, Operation, Wire};
//!
//! let mut dag = CircuitDag::new();
//! dag.add_qreg("v", 3).unwrap();
//! dag.add_basis_element("cx", 2, 0, 0).unwrap();
//! dag.apply_operation_back(Operation::new("cx", [Wire::new("v", 0), Wire::new("v", 2)]))
//!     .unwrap();
//!
//! let (pm, mut props) = PassManagerBuilder::new()
//!     .with_coupling(CouplingGraph::linear(3))
//!     .with_seed(1)
//!     .build();
//! pm.run(&mut dag, &mut props).unwrap();
//!
//! let qasm = dag.qasm().unwrap();
//! assert!(qasm.contains("qreg q[3];"));
//! assert!(!qasm.contains("swap"));
//! ```
//!
//! # Randomness
//!
//! [`layer_permutation`] takes any [`rand::Rng`]. The passes draw a
//! `rand_pcg::Pcg64Mcg`, seeded from [`MappingOptions::seed`] when set.

pub mod coupling;
pub mod direction;
pub mod error;
pub mod manager;
pub mod mapping;
pub mod pass;
pub mod property;

// Built-in passes
pub mod passes;

pub use coupling::{CouplingGraph, PHYSICAL_REGISTER};
pub use direction::{direction_mapper, expand_swaps};
pub use error::{CompileError, CompileResult, CouplingError, CouplingResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use mapping::{LayerPermutation, MappedCircuit, layer_permutation, swap_mapper};
pub use pass::{Pass, PassKind};
pub use property::{FinalLayout, Layout, MappingOptions, PropertySet, SwapCount};
