//! OpenQASM 2.0 output for circuit DAGs.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::dag::CircuitDag;
use crate::error::IrResult;
use crate::operation::{format_call, GateDefinition, BUILTIN_OPS, QELIB1_GATES};
use crate::wire::Wire;

/// Options controlling QASM output.
#[derive(Debug, Clone, Default)]
pub struct QasmOptions {
    /// Emit only the header, registers and gate definitions.
    pub decls_only: bool,
    /// Emit only the operations.
    pub no_decls: bool,
    /// Emit a definition of `swap` in terms of `cx`.
    pub add_swap: bool,
    /// Rename qubits on output. Quantum registers are then declared from
    /// the alias targets instead of the circuit's own registers.
    pub aliases: Option<BTreeMap<Wire, Wire>>,
}

impl QasmOptions {
    /// Options that emit through a qubit renaming.
    pub fn with_aliases(aliases: BTreeMap<Wire, Wire>) -> Self {
        Self {
            aliases: Some(aliases),
            ..Self::default()
        }
    }
}

impl CircuitDag {
    /// Emit the circuit as OpenQASM 2.0.
    pub fn qasm(&self) -> IrResult<String> {
        self.qasm_with(&QasmOptions::default())
    }

    /// Emit the circuit as OpenQASM 2.0 with options.
    pub fn qasm_with(&self, options: &QasmOptions) -> IrResult<String> {
        let mut out = String::new();
        if !options.no_decls {
            self.write_declarations(&mut out, options);
        }
        if !options.decls_only {
            let alias = |wire: &Wire| {
                options
                    .aliases
                    .as_ref()
                    .and_then(|a| a.get(wire))
                    .unwrap_or(wire)
                    .to_string()
            };
            for op in self.topological_ops()? {
                if let Some(condition) = &op.condition {
                    let _ = write!(out, "{condition} ");
                }
                out.push_str(&format_call(op, op.qubits.iter().map(alias)));
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn write_declarations(&self, out: &mut String, options: &QasmOptions) {
        out.push_str("OPENQASM 2.0;\ninclude \"qelib1.inc\";\n");

        let qregs: BTreeMap<&str, u32> = match &options.aliases {
            Some(aliases) => {
                let mut sizes = BTreeMap::new();
                for target in aliases.values() {
                    let size = sizes.entry(target.register.as_str()).or_insert(0);
                    *size = (*size).max(target.index + 1);
                }
                sizes
            }
            None => self
                .qregs
                .iter()
                .map(|r| (r.name.as_str(), r.size))
                .collect(),
        };
        for (name, size) in qregs {
            let _ = writeln!(out, "qreg {name}[{size}];");
        }
        let cregs: BTreeMap<&str, u32> = self
            .cregs
            .iter()
            .map(|r| (r.name.as_str(), r.size))
            .collect();
        for (name, size) in cregs {
            let _ = writeln!(out, "creg {name}[{size}];");
        }

        for definition in &self.gates {
            let name = definition.name.as_str();
            if QELIB1_GATES.contains(&name) || BUILTIN_OPS.contains(&name) {
                continue;
            }
            out.push_str(&definition.qasm());
            out.push('\n');
        }
        if options.add_swap && self.gate_definition("swap").is_none() {
            out.push_str(&GateDefinition::swap().qasm());
            out.push('\n');
        }
    }
}
