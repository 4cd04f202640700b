//! Interpreter that expands gate calls into a fixed basis.
//!
//! The [`Unroller`] walks a [`Program`] once. Calls of user-defined gates
//! are expanded recursively, binding formal parameters and qubits to the
//! actual values. Whether a call is emitted whole or expanded is up to the
//! [`UnrollerBackend`], which sees every level through
//! [`start_gate`](UnrollerBackend::start_gate) and
//! [`end_gate`](UnrollerBackend::end_gate).

use std::rc::Rc;

use qmap_ir::Wire;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::ast::{Argument, Expression, GateDecl, Program, QuantumOp, Statement};
use crate::error::{UnrollError, UnrollResult};

/// Receiver of the operations produced by the [`Unroller`].
///
/// `u`, `cx`, `measure`, `reset` and `barrier` are the built-in operations.
/// Every gate call is bracketed by `start_gate`/`end_gate`, with the
/// expansion of its body in between. A backend that emits a call as a
/// single basis operation ignores the nested operations until the matching
/// `end_gate`.
pub trait UnrollerBackend {
    /// Result produced once the whole program has been processed.
    type Output;

    /// Declare a quantum register.
    fn new_qreg(&mut self, name: &str, size: u32) -> UnrollResult<()>;

    /// Declare a classical register.
    fn new_creg(&mut self, name: &str, size: u32) -> UnrollResult<()>;

    /// Record a gate definition or opaque declaration.
    fn define_gate(&mut self, gate: &GateDecl) -> UnrollResult<()>;

    /// Built-in single-qubit gate `U(theta,phi,lambda)`.
    fn u(&mut self, params: [f64; 3], qubit: &Wire) -> UnrollResult<()>;

    /// Built-in CNOT.
    fn cx(&mut self, control: &Wire, target: &Wire) -> UnrollResult<()>;

    /// Measurement of `qubit` into `clbit`.
    fn measure(&mut self, qubit: &Wire, clbit: &Wire) -> UnrollResult<()>;

    /// Reset of `qubit`.
    fn reset(&mut self, qubit: &Wire) -> UnrollResult<()>;

    /// Barrier across `qubits`.
    fn barrier(&mut self, qubits: &[Wire]) -> UnrollResult<()>;

    /// Attach `if(register==value)` to the following operations.
    fn set_condition(&mut self, register: &str, value: u64);

    /// Drop the current condition.
    fn drop_condition(&mut self);

    /// Enter a call of gate `name`.
    fn start_gate(&mut self, name: &str, params: &[f64], qubits: &[Wire]) -> UnrollResult<()>;

    /// Leave a call of gate `name`.
    fn end_gate(&mut self, name: &str) -> UnrollResult<()>;

    /// Produce the output.
    fn finish(self) -> UnrollResult<Self::Output>;
}

/// Bindings inside a gate body.
#[derive(Default)]
struct Scope {
    gate: Option<String>,
    params: FxHashMap<String, f64>,
    qubits: FxHashMap<String, Wire>,
}

impl Scope {
    fn gate_name(&self) -> String {
        self.gate.clone().unwrap_or_else(|| "<main>".into())
    }

    fn eval(&self, expr: &Expression) -> UnrollResult<f64> {
        expr.eval(&|name| self.params.get(name).copied())
            .map_err(|name| UnrollError::UndefinedLocal {
                name: name.to_string(),
                gate: self.gate_name(),
            })
    }
}

/// OpenQASM 2.0 interpreter that unrolls gate calls.
pub struct Unroller<B> {
    backend: B,
    qregs: FxHashMap<String, u32>,
    cregs: FxHashMap<String, u32>,
    gates: FxHashMap<String, Rc<GateDecl>>,
}

impl<B: UnrollerBackend> Unroller<B> {
    /// Create an unroller feeding `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            qregs: FxHashMap::default(),
            cregs: FxHashMap::default(),
            gates: FxHashMap::default(),
        }
    }

    /// Interpret `program` and return the backend's output.
    pub fn execute(mut self, program: &Program) -> UnrollResult<B::Output> {
        debug!("Unrolling program with {} statements", program.statements.len());
        let global = Scope::default();
        for statement in &program.statements {
            self.process_statement(statement, &global)?;
        }
        self.backend.finish()
    }

    fn process_statement(&mut self, statement: &Statement, scope: &Scope) -> UnrollResult<()> {
        match statement {
            Statement::QregDecl { name, size } => {
                self.qregs.insert(name.clone(), *size);
                self.backend.new_qreg(name, *size)
            }
            Statement::CregDecl { name, size } => {
                self.cregs.insert(name.clone(), *size);
                self.backend.new_creg(name, *size)
            }
            Statement::GateDecl(decl) => {
                self.gates.insert(decl.name.clone(), Rc::new(decl.clone()));
                self.backend.define_gate(decl)
            }
            Statement::Op(op) => self.process_op(op, scope),
            Statement::If {
                register,
                value,
                op,
            } => {
                if !self.cregs.contains_key(register) {
                    return Err(UnrollError::UndefinedRegister {
                        name: register.clone(),
                        kind: "classical",
                    });
                }
                self.backend.set_condition(register, *value);
                let result = self.process_op(op, scope);
                self.backend.drop_condition();
                result
            }
            Statement::Barrier(args) => {
                let mut qubits = Vec::new();
                for arg in args {
                    qubits.extend(self.resolve_qubits(arg, scope)?);
                }
                self.backend.barrier(&qubits)
            }
        }
    }

    fn process_op(&mut self, op: &QuantumOp, scope: &Scope) -> UnrollResult<()> {
        match op {
            QuantumOp::U { params, target } => {
                let [theta, phi, lambda] = params.as_slice() else {
                    return Err(UnrollError::ParameterCountMismatch {
                        gate: "U".into(),
                        expected: 3,
                        got: params.len(),
                    });
                };
                let params = [scope.eval(theta)?, scope.eval(phi)?, scope.eval(lambda)?];
                for qubit in self.resolve_qubits(target, scope)? {
                    self.backend.u(params, &qubit)?;
                }
                Ok(())
            }
            QuantumOp::CX { control, target } => {
                let controls = self.resolve_qubits(control, scope)?;
                let targets = self.resolve_qubits(target, scope)?;
                let lists = [controls, targets];
                for idx in 0..broadcast_len("CX", &lists)? {
                    self.backend
                        .cx(element(&lists[0], idx), element(&lists[1], idx))?;
                }
                Ok(())
            }
            QuantumOp::Measure { qubit, clbit } => {
                let qubits = self.resolve_qubits(qubit, scope)?;
                let clbits = self.resolve_clbits(clbit)?;
                if qubits.len() != clbits.len() {
                    return Err(UnrollError::RegisterSizeMismatch {
                        operation: "measure".into(),
                        sizes: vec![qubits.len(), clbits.len()],
                    });
                }
                for (q, c) in qubits.iter().zip(&clbits) {
                    self.backend.measure(q, c)?;
                }
                Ok(())
            }
            QuantumOp::Reset(target) => {
                for qubit in self.resolve_qubits(target, scope)? {
                    self.backend.reset(&qubit)?;
                }
                Ok(())
            }
            QuantumOp::Call { name, params, args } => self.process_call(name, params, args, scope),
        }
    }

    fn process_call(
        &mut self,
        name: &str,
        params: &[Expression],
        args: &[Argument],
        scope: &Scope,
    ) -> UnrollResult<()> {
        let gate = self
            .gates
            .get(name)
            .cloned()
            .ok_or_else(|| UnrollError::UndefinedGate(name.to_string()))?;
        if params.len() != gate.params.len() {
            return Err(UnrollError::ParameterCountMismatch {
                gate: name.to_string(),
                expected: gate.params.len(),
                got: params.len(),
            });
        }
        if args.len() != gate.qubits.len() {
            return Err(UnrollError::QubitCountMismatch {
                gate: name.to_string(),
                expected: gate.qubits.len(),
                got: args.len(),
            });
        }

        let values = params
            .iter()
            .map(|p| scope.eval(p))
            .collect::<UnrollResult<Vec<f64>>>()?;
        let lists = args
            .iter()
            .map(|a| self.resolve_qubits(a, scope))
            .collect::<UnrollResult<Vec<_>>>()?;

        for idx in 0..broadcast_len(name, &lists)? {
            let qubits: Vec<Wire> = lists.iter().map(|l| element(l, idx).clone()).collect();
            trace!("Expanding {name} on {qubits:?}");
            let inner = Scope {
                gate: Some(name.to_string()),
                params: gate.params.iter().cloned().zip(values.iter().copied()).collect(),
                qubits: gate.qubits.iter().cloned().zip(qubits.iter().cloned()).collect(),
            };

            self.backend.start_gate(name, &values, &qubits)?;
            if let Some(body) = &gate.body {
                for statement in body {
                    self.process_statement(statement, &inner)?;
                }
            }
            self.backend.end_gate(name)?;
        }
        Ok(())
    }

    /// Resolve a qubit argument: a gate-local name inside a body, else a
    /// register or register element.
    fn resolve_qubits(&self, arg: &Argument, scope: &Scope) -> UnrollResult<Vec<Wire>> {
        if scope.gate.is_some() {
            return scope
                .qubits
                .get(&arg.name)
                .map(|w| vec![w.clone()])
                .ok_or_else(|| UnrollError::UndefinedLocal {
                    name: arg.name.clone(),
                    gate: scope.gate_name(),
                });
        }
        resolve_register(&self.qregs, arg, "quantum")
    }

    fn resolve_clbits(&self, arg: &Argument) -> UnrollResult<Vec<Wire>> {
        resolve_register(&self.cregs, arg, "classical")
    }
}

fn resolve_register(
    registers: &FxHashMap<String, u32>,
    arg: &Argument,
    kind: &'static str,
) -> UnrollResult<Vec<Wire>> {
    let size = *registers
        .get(&arg.name)
        .ok_or_else(|| UnrollError::UndefinedRegister {
            name: arg.name.clone(),
            kind,
        })?;
    match arg.index {
        Some(index) if index >= size => Err(UnrollError::IndexOutOfRange {
            register: arg.name.clone(),
            index,
            size,
        }),
        Some(index) => Ok(vec![Wire::new(arg.name.clone(), index)]),
        None => Ok((0..size).map(|i| Wire::new(arg.name.clone(), i)).collect()),
    }
}

/// Number of repetitions of a broadcast call.
///
/// Every argument list longer than one must have the same length.
fn broadcast_len(operation: &str, lists: &[Vec<Wire>]) -> UnrollResult<usize> {
    let len = lists.iter().map(Vec::len).max().unwrap_or(0);
    if lists.iter().any(|l| l.len() != len && l.len() != 1) {
        return Err(UnrollError::RegisterSizeMismatch {
            operation: operation.to_string(),
            sizes: lists.iter().map(Vec::len).collect(),
        });
    }
    Ok(len)
}

/// Element `idx` of a broadcast argument; single wires repeat.
fn element(list: &[Wire], idx: usize) -> &Wire {
    if list.len() > 1 { &list[idx] } else { &list[0] }
}
