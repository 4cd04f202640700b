//! Backend that builds a circuit DAG.

use qmap_ir::{CircuitDag, Condition, GateDefinition, Operation, Wire};
use rustc_hash::FxHashMap;

use super::GateFilter;
use crate::ast::GateDecl;
use crate::error::UnrollResult;
use crate::unroller::UnrollerBackend;

/// Unroller backend producing a [`CircuitDag`].
///
/// `U`, `CX`, `measure`, `reset` and `barrier` are registered as basis
/// elements on first use. Calls of basis gates are registered with the
/// signature of their first call, and their definitions are recorded so
/// the circuit can be emitted as QASM again.
pub struct DagBackend {
    dag: CircuitDag,
    filter: GateFilter,
    condition: Option<Condition>,
    definitions: FxHashMap<String, GateDefinition>,
}

impl DagBackend {
    /// Create a backend that keeps calls of `basis` gates whole.
    pub fn new<S: Into<String>>(basis: impl IntoIterator<Item = S>) -> Self {
        Self {
            dag: CircuitDag::new(),
            filter: GateFilter::new(basis),
            condition: None,
            definitions: FxHashMap::default(),
        }
    }

    fn apply(&mut self, mut op: Operation) -> UnrollResult<()> {
        op.condition.clone_from(&self.condition);
        self.dag.apply_operation_back(op)?;
        Ok(())
    }
}

impl UnrollerBackend for DagBackend {
    type Output = CircuitDag;

    fn new_qreg(&mut self, name: &str, size: u32) -> UnrollResult<()> {
        self.dag.add_qreg(name, size)?;
        Ok(())
    }

    fn new_creg(&mut self, name: &str, size: u32) -> UnrollResult<()> {
        self.dag.add_creg(name, size)?;
        Ok(())
    }

    fn define_gate(&mut self, gate: &GateDecl) -> UnrollResult<()> {
        self.filter.define(gate);
        self.definitions
            .insert(gate.name.clone(), gate.to_definition());
        Ok(())
    }

    fn u(&mut self, params: [f64; 3], qubit: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.dag.add_basis_element("U", 1, 0, 3)?;
        self.apply(Operation::new("U", [qubit.clone()]).with_params(params))
    }

    fn cx(&mut self, control: &Wire, target: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.dag.add_basis_element("CX", 2, 0, 0)?;
        self.apply(Operation::new("CX", [control.clone(), target.clone()]))
    }

    fn measure(&mut self, qubit: &Wire, clbit: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.dag.add_basis_element("measure", 1, 1, 0)?;
        self.apply(Operation::measure(qubit.clone(), clbit.clone()))
    }

    fn reset(&mut self, qubit: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.dag.add_basis_element("reset", 1, 0, 0)?;
        self.apply(Operation::new("reset", [qubit.clone()]))
    }

    fn barrier(&mut self, qubits: &[Wire]) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.dag.add_basis_element("barrier", 0, 0, 0)?;
        self.dag
            .apply_operation_back(Operation::barrier(qubits.iter().cloned()))?;
        Ok(())
    }

    fn set_condition(&mut self, register: &str, value: u64) {
        self.condition = Some(Condition::new(register, value));
    }

    fn drop_condition(&mut self) {
        self.condition = None;
    }

    fn start_gate(&mut self, name: &str, params: &[f64], qubits: &[Wire]) -> UnrollResult<()> {
        if !self.filter.start(name)? {
            return Ok(());
        }
        self.dag
            .add_basis_element(name, qubits.len(), 0, params.len())?;
        if let Some(definition) = self.definitions.get(name) {
            self.dag.add_gate_definition(definition.clone());
        }
        self.apply(Operation::new(name, qubits.iter().cloned()).with_params(params.iter().copied()))
    }

    fn end_gate(&mut self, name: &str) -> UnrollResult<()> {
        self.filter.end(name);
        Ok(())
    }

    fn finish(self) -> UnrollResult<CircuitDag> {
        Ok(self.dag)
    }
}
