//! Error types for the IR crate.

use thiserror::Error;

use crate::graph::VertexKey;
use crate::operation::Signature;
use crate::wire::{Wire, WireKind};

/// Errors that can occur in graph and circuit DAG operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A register name is already used by a quantum or classical register.
    #[error("Register '{0}' is already declared")]
    DuplicateRegister(String),

    /// A wire was declared twice, or referenced twice by one operation.
    #[error("Duplicate wire {0}")]
    DuplicateWire(Wire),

    /// Operation name has not been registered as a basis element.
    #[error("'{0}' is not a basis element of this circuit")]
    UnknownBasisElement(String),

    /// A basis element was re-registered with a different signature.
    #[error("Basis element '{name}' already registered as {existing}, cannot register as {requested}")]
    IncompatibleBasis {
        /// Name of the basis element.
        name: String,
        /// Signature already registered.
        existing: Signature,
        /// Signature that was requested.
        requested: Signature,
    },

    /// Operation arguments do not match the registered signature.
    #[error("'{name}' expects {expected} {what}, got {got}")]
    ArityMismatch {
        /// Name of the operation.
        name: String,
        /// Which argument list is wrong ("qubits", "clbits" or "params").
        what: &'static str,
        /// Expected count.
        expected: usize,
        /// Actual count.
        got: usize,
    },

    /// A parameter is NaN or infinite and has no QASM form.
    #[error("'{name}' has non-finite parameter {value}")]
    NonFiniteParameter {
        /// Name of the operation.
        name: String,
        /// The offending value.
        value: f64,
    },

    /// A basis element cannot be removed while operations still use it.
    #[error("Basis element '{0}' is still used by operations")]
    BasisElementInUse(String),

    /// Wire is not declared in the circuit.
    #[error("Wire {0} not found in circuit")]
    WireNotFound(Wire),

    /// Wire is declared with the other kind.
    #[error("Wire {wire} is not a {expected} wire")]
    WireTypeMismatch {
        /// The offending wire.
        wire: Wire,
        /// The kind that was required.
        expected: WireKind,
    },

    /// Wrong number of wires supplied for a substitution.
    #[error("Expected {expected} wires, got {got}")]
    WireCountMismatch {
        /// Wires required by the substituted node.
        expected: usize,
        /// Wires supplied.
        got: usize,
    },

    /// A replacement circuit uses a wire that the wire map does not cover.
    #[error("Wire {0} of the replacement circuit is not mapped")]
    WireMappingIncomplete(Wire),

    /// Condition refers to an undeclared classical register, or is not allowed here.
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Node key does not refer to an operation node.
    #[error("Node {0} is not an operation node")]
    NotAnOperation(VertexKey),

    /// Register does not exist.
    #[error("Register '{0}' not found")]
    RegisterNotFound(String),

    /// Graph contains a cycle.
    #[error("Graph contains a cycle")]
    Cyclic,

    /// Operation requires a directed graph.
    #[error("Operation requires a directed graph")]
    UndirectedGraph,

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
