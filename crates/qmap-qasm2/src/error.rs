//! Error types for parsing and unrolling.

use qmap_ir::IrError;
use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("Lexer error at line {line}: {message}")]
    LexerError { line: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// Invalid version.
    #[error("Invalid OPENQASM version: {0}")]
    InvalidVersion(String),

    /// Include file could not be resolved.
    #[error("Include file not found: {0}")]
    IncludeNotFound(String),

    /// Include file includes itself, directly or transitively.
    #[error("Recursive include of {0}")]
    RecursiveInclude(String),

    /// Statement not allowed inside a gate body.
    #[error("Invalid statement in body of gate '{gate}' at line {line}: {reason}")]
    InvalidGateBody {
        gate: String,
        line: usize,
        reason: String,
    },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while unrolling a program.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UnrollError {
    /// An opaque gate was used but is not in the target basis.
    #[error("Opaque gate '{0}' is not in the basis and cannot be unrolled")]
    OpaqueNotSupported(String),

    /// Gate called before being defined.
    #[error("Undefined gate: {0}")]
    UndefinedGate(String),

    /// Register used before being declared, or of the wrong kind.
    #[error("Undefined {kind} register: {name}")]
    UndefinedRegister { name: String, kind: &'static str },

    /// Name inside a gate body that is not a formal argument.
    #[error("Undefined local name '{name}' in gate '{gate}'")]
    UndefinedLocal { name: String, gate: String },

    /// Register arguments of one call have different sizes.
    #[error("Register size mismatch in '{operation}': {sizes:?}")]
    RegisterSizeMismatch {
        operation: String,
        sizes: Vec<usize>,
    },

    /// Wrong number of parameters.
    #[error("Gate '{gate}' expects {expected} parameters, got {got}")]
    ParameterCountMismatch {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Wrong number of qubit arguments.
    #[error("Gate '{gate}' expects {expected} qubits, got {got}")]
    QubitCountMismatch {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Index out of bounds.
    #[error("Index {index} out of bounds for register '{register}' of size {size}")]
    IndexOutOfRange {
        register: String,
        index: u32,
        size: u32,
    },

    /// IR error during circuit construction.
    #[error("Circuit error: {0}")]
    Ir(#[from] IrError),

    /// Parse error from the front end.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result type for unrolling operations.
pub type UnrollResult<T> = Result<T, UnrollError>;
