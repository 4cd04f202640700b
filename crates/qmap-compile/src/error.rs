//! Error types for the compilation crate.

use qmap_ir::{Signature, Wire};
use thiserror::Error;

/// Errors raised by coupling graph queries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CouplingError {
    /// Qubit was added twice.
    #[error("Qubit {0} is already in the coupling graph")]
    DuplicateQubit(Wire),

    /// Distances requested on a graph that is not weakly connected.
    #[error("Coupling graph is not connected")]
    NotConnected,

    /// Distance queried before `compute_distance`.
    #[error("Distance has not been computed")]
    DistanceNotComputed,

    /// Qubit is not part of the coupling graph.
    #[error("Qubit {0} is not in the coupling graph")]
    NotInGraph(Wire),
}

/// Result type for coupling graph operations.
pub type CouplingResult<T> = Result<T, CouplingError>;

/// Errors that can occur during mapping and compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qmap_ir::IrError),

    /// Error from the coupling graph.
    #[error("Coupling error: {0}")]
    Coupling(#[from] CouplingError),

    /// Layer partition is malformed.
    #[error("Layout error: {0}")]
    LayoutError(String),

    /// A gate qubit has no physical position in the layout.
    #[error("Qubit {0} is not mapped by the layout")]
    UnmappedQubit(Wire),

    /// Circuit needs more qubits than the coupling graph has.
    #[error("Circuit requires {required} qubits but the coupling graph only has {available}")]
    CircuitTooLarge {
        /// Qubits in the circuit.
        required: usize,
        /// Qubits in the coupling graph.
        available: usize,
    },

    /// A supplied initial layout does not fit the circuit or the device.
    #[error("Invalid initial layout: {0}")]
    InvalidLayout(String),

    /// No trial found a permutation, even one gate at a time.
    #[error("Swap mapper failed: layer {layer}, sublayer {position}")]
    SwapMapperFailed {
        /// Index of the circuit layer.
        layer: usize,
        /// Index of the serial sublayer within it.
        position: usize,
    },

    /// A `cx` acts on qubits joined by no coupling edge in either direction.
    #[error("cx {control},{target} is not in the coupling graph")]
    EdgeNotInCouplingGraph {
        /// Control qubit.
        control: Wire,
        /// Target qubit.
        target: Wire,
    },

    /// A basis element has a signature the pass cannot handle.
    #[error("Unexpected signature {found} for '{name}'")]
    UnexpectedGateSignature {
        /// Basis element name.
        name: String,
        /// Registered signature.
        found: Signature,
    },

    /// Missing coupling graph for mapping.
    #[error("Missing coupling graph for mapping")]
    MissingCouplingMap,
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
