//! `OpenQASM` 2.0 Front End for qmap
//!
//! This crate parses `OpenQASM` 2.0 source and unrolls it into a fixed gate
//! basis. The result is either a [`qmap_ir::CircuitDag`] ready for mapping or
//! a flat JSON instruction list.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version header | `OPENQASM 2.0;` |
//! | Includes | `include "qelib1.inc";` |
//! | Registers | `qreg q[5];`, `creg c[5];` |
//! | Built-in gates | `U(pi/2,0,pi) q[0];`, `CX q[0],q[1];` |
//! | Gate definitions | `gate bell a,b { h a; cx a,b; }` |
//! | Opaque gates | `opaque magic(t) a;` |
//! | Broadcasting | `h q;`, `cx q, r;` |
//! | Conditions | `if(c==1) x q[0];` |
//! | Measure, reset, barrier | `measure q -> c;` |
//!
//! # Example: Unrolling to a DAG
//!
//! ```rust
//! use qmap_qasm2::unroll;
//!
//! let source = r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[2];
//!     creg c[2];
//!     h q[0];
//!     cx q[0],q[1];
//!     measure q -> c;
//! "#;
//!
//! let dag = unroll(source, &["cx"]).unwrap();
//! let counts = dag.count_ops();
//! assert_eq!(counts["U"], 1);
//! assert_eq!(counts["cx"], 1);
//! assert_eq!(counts["measure"], 2);
//! ```
//!
//! # Example: JSON Output
//!
//! ```rust
//! use qmap_qasm2::unroll_to_json;
//!
//! let circuit = unroll_to_json("OPENQASM 2.0;\nqreg q[1];\nU(0,0,0) q[0];", &[]).unwrap();
//! assert_eq!(circuit.header.number_of_qubits, 1);
//! assert_eq!(circuit.operations[0].name, "U");
//! ```
//!
//! Gates named in the basis are kept whole, everything else is expanded
//! down to `U` and `CX`. The backends share this behavior through
//! [`backend::GateFilter`].

pub mod ast;
pub mod backend;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod qelib1;
pub mod unroller;

use qmap_ir::CircuitDag;

pub use backend::{DagBackend, JsonBackend, JsonCircuit};
pub use error::{ParseError, ParseResult, UnrollError, UnrollResult};
pub use parser::{parse, parse_with_includes};
pub use unroller::{Unroller, UnrollerBackend};

/// Parse `source` and unroll it into a DAG over `basis` plus `U` and `CX`.
pub fn unroll(source: &str, basis: &[&str]) -> UnrollResult<CircuitDag> {
    let program = parse(source)?;
    Unroller::new(DagBackend::new(basis.iter().copied())).execute(&program)
}

/// Parse `source` and unroll it into the JSON instruction list.
pub fn unroll_to_json(source: &str, basis: &[&str]) -> UnrollResult<JsonCircuit> {
    let program = parse(source)?;
    Unroller::new(JsonBackend::new(basis.iter().copied())).execute(&program)
}
