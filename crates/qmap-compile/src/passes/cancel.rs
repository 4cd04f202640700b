//! Cancellation of adjacent `cx` pairs.

use qmap_ir::CircuitDag;
use tracing::debug;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// CX cancellation pass.
///
/// Within each run of back-to-back `cx` gates, consecutive gates on the
/// same control and target cancel in pairs: an even stretch vanishes, an
/// odd one keeps its first gate.
pub struct CxCancellation;

impl Pass for CxCancellation {
    fn name(&self) -> &str {
        "CxCancellation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut removed = 0;
        for run in dag.collect_runs(&["cx"])? {
            let mut stretches: Vec<Vec<_>> = Vec::new();
            for node in run {
                let qubits = dag.operation(node).map(|op| op.qubits.clone());
                match stretches.last_mut() {
                    Some(stretch)
                        if dag.operation(stretch[0]).map(|op| op.qubits.clone()) == qubits =>
                    {
                        stretch.push(node);
                    }
                    _ => stretches.push(vec![node]),
                }
            }

            for stretch in stretches {
                let skip = stretch.len() % 2;
                for &node in &stretch[skip..] {
                    dag.remove_op_node(node)?;
                    removed += 1;
                }
            }
        }
        debug!("Cancelled {removed} cx gates");
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.signature("cx").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmap_ir::{Operation, Wire};

    fn q(i: u32) -> Wire {
        Wire::new("q", i)
    }

    fn circuit(ops: &[(u32, u32)]) -> CircuitDag {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 3).unwrap();
        dag.add_basis_element("cx", 2, 0, 0).unwrap();
        dag.add_basis_element("h", 1, 0, 0).unwrap();
        for &(c, t) in ops {
            dag.apply_operation_back(Operation::new("cx", [q(c), q(t)]))
                .unwrap();
        }
        dag
    }

    fn run(dag: &mut CircuitDag) {
        CxCancellation.run(dag, &mut PropertySet::new()).unwrap();
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_even_pair_cancels() {
        let mut dag = circuit(&[(0, 1), (0, 1)]);
        run(&mut dag);
        assert_eq!(dag.size(), 0);
    }

    #[test]
    fn test_odd_stretch_keeps_one() {
        let mut dag = circuit(&[(0, 1), (0, 1), (0, 1)]);
        run(&mut dag);
        assert_eq!(dag.size(), 1);
    }

    #[test]
    fn test_reversed_pair_is_kept() {
        let mut dag = circuit(&[(0, 1), (1, 0)]);
        run(&mut dag);
        assert_eq!(dag.size(), 2);
    }

    #[test]
    fn test_intervening_gate_blocks_cancellation() {
        let mut dag = circuit(&[(0, 1)]);
        dag.apply_operation_back(Operation::new("h", [q(1)])).unwrap();
        dag.apply_operation_back(Operation::new("cx", [q(0), q(1)]))
            .unwrap();
        run(&mut dag);
        assert_eq!(dag.size(), 3);
    }
}
