//! SWAP expansion and CNOT direction fixing.

use qmap_ir::{CircuitDag, GateDefinition, Operation, Signature, Wire};
use tracing::debug;

use crate::coupling::CouplingGraph;
use crate::error::{CompileError, CompileResult};

/// Reverse every `cx` whose direction is not native to `coupling`.
///
/// A `cx a,b` where only `b -> a` is a coupling edge is replaced by
/// `h a; h b; cx b,a; h a; h b;`. All nodes are checked before any is
/// rewritten. Returns the number of reversed gates.
pub fn direction_mapper(dag: &mut CircuitDag, coupling: &CouplingGraph) -> CompileResult<usize> {
    let Some(signature) = dag.signature("cx") else {
        return Ok(0);
    };
    if signature != Signature::new(2, 0, 0) {
        return Err(CompileError::UnexpectedGateSignature {
            name: "cx".into(),
            found: signature,
        });
    }

    let mut flips = Vec::new();
    for node in dag.get_named_nodes("cx")? {
        let Some(op) = dag.operation(node) else {
            continue;
        };
        let (control, target) = (&op.qubits[0], &op.qubits[1]);
        if coupling.has_edge(control, target) {
            continue;
        }
        if !coupling.has_edge(target, control) {
            return Err(CompileError::EdgeNotInCouplingGraph {
                control: control.clone(),
                target: target.clone(),
            });
        }
        flips.push(node);
    }

    if flips.is_empty() {
        return Ok(0);
    }
    let template = reversed_cx()?;
    let wires = [Wire::new("q", 0), Wire::new("q", 1)];
    for &node in &flips {
        dag.substitute_circuit_one(node, &template, &wires)?;
    }
    debug!("Reversed {} cx gates", flips.len());
    Ok(flips.len())
}

/// Replace every `swap a,b` by `cx a,b; cx b,a; cx a,b;`.
///
/// The `swap` basis element and its definition are dropped afterwards, so
/// the emitted QASM only names `cx`. Returns the number of expanded gates.
pub fn expand_swaps(dag: &mut CircuitDag) -> CompileResult<usize> {
    let swaps = dag.get_named_nodes("swap")?.len();
    if swaps > 0 {
        dag.substitute_circuit_all("swap", &swap_as_cx()?)?;
        debug!("Expanded {swaps} swap gates");
    }
    dag.remove_basis_element("swap")?;
    Ok(swaps)
}

fn swap_as_cx() -> CompileResult<CircuitDag> {
    let (a, b) = (Wire::new("q", 0), Wire::new("q", 1));
    let mut template = CircuitDag::new();
    template.add_qreg("q", 2)?;
    template.add_basis_element("cx", 2, 0, 0)?;
    for op in [
        Operation::new("cx", [a.clone(), b.clone()]),
        Operation::new("cx", [b.clone(), a.clone()]),
        Operation::new("cx", [a, b]),
    ] {
        template.apply_operation_back(op)?;
    }
    Ok(template)
}

/// `cx q[0],q[1]` expressed with the native `cx q[1],q[0]`.
fn reversed_cx() -> CompileResult<CircuitDag> {
    let (a, b) = (Wire::new("q", 0), Wire::new("q", 1));
    let mut template = CircuitDag::new();
    template.add_qreg("q", 2)?;
    template.add_basis_element("cx", 2, 0, 0)?;
    template.add_basis_element("h", 1, 0, 0)?;
    template.add_gate_definition(GateDefinition::new(
        "h",
        [],
        ["a".to_string()],
        ["u2(0,pi) a;".to_string()],
    ));
    for op in [
        Operation::new("h", [a.clone()]),
        Operation::new("h", [b.clone()]),
        Operation::new("cx", [b.clone(), a.clone()]),
        Operation::new("h", [a.clone()]),
        Operation::new("h", [b]),
    ] {
        template.apply_operation_back(op)?;
    }
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn q(i: u32) -> Wire {
        Wire::new("q", i)
    }

    fn one_edge() -> CouplingGraph {
        CouplingGraph::from_adjacency(&BTreeMap::from([(0, vec![1])])).unwrap()
    }

    fn circuit(ops: &[Operation]) -> CircuitDag {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 3).unwrap();
        dag.add_basis_element("cx", 2, 0, 0).unwrap();
        for op in ops {
            dag.apply_operation_back(op.clone()).unwrap();
        }
        dag
    }

    #[test]
    fn test_reversed_cx_is_flipped() {
        let mut dag = circuit(&[Operation::new("cx", [q(1), q(0)])]);
        assert_eq!(direction_mapper(&mut dag, &one_edge()).unwrap(), 1);
        dag.verify_integrity().unwrap();

        let ops: Vec<String> = dag
            .topological_ops()
            .unwrap()
            .iter()
            .map(|op| op.to_string())
            .collect();
        assert_eq!(
            ops,
            vec![
                "h q[1];",
                "h q[0];",
                "cx q[0],q[1];",
                "h q[1];",
                "h q[0];"
            ]
        );
        assert!(dag.gate_definition("h").is_some());
    }

    #[test]
    fn test_expanded_swap_is_native() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 2).unwrap();
        dag.add_basis_signature("swap", Signature::new(2, 0, 0))
            .unwrap();
        dag.add_gate_definition(GateDefinition::swap());
        dag.apply_operation_back(Operation::new("swap", [q(0), q(1)]))
            .unwrap();

        assert_eq!(expand_swaps(&mut dag).unwrap(), 1);
        assert_eq!(dag.count_ops()["cx"], 3);
        assert!(dag.signature("swap").is_none());
        assert!(dag.gate_definition("swap").is_none());

        // the middle cx runs q[1] -> q[0] against the only edge
        assert_eq!(direction_mapper(&mut dag, &one_edge()).unwrap(), 1);
        dag.verify_integrity().unwrap();
        for op in dag.topological_ops().unwrap() {
            if op.name == "cx" {
                assert_eq!(op.qubits, vec![q(0), q(1)]);
            }
        }
        let counts = dag.count_ops();
        assert_eq!(counts["cx"], 3);
        assert_eq!(counts["h"], 4);
        assert!(!dag.qasm().unwrap().contains("swap"));
    }

    #[test]
    fn test_expand_swaps_without_swaps() {
        let mut dag = circuit(&[Operation::new("cx", [q(0), q(1)])]);
        assert_eq!(expand_swaps(&mut dag).unwrap(), 0);
        assert_eq!(dag.size(), 1);
    }

    #[test]
    fn test_native_cx_is_kept() {
        let mut dag = circuit(&[Operation::new("cx", [q(0), q(1)])]);
        assert_eq!(direction_mapper(&mut dag, &one_edge()).unwrap(), 0);
        assert_eq!(dag.size(), 1);
    }

    #[test]
    fn test_missing_edge_fails_without_changes() {
        let mut dag = circuit(&[
            Operation::new("cx", [q(1), q(0)]),
            Operation::new("cx", [q(0), q(2)]),
        ]);
        let err = direction_mapper(&mut dag, &one_edge()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::EdgeNotInCouplingGraph { control, target }
                if control == q(0) && target == q(2)
        ));
        assert_eq!(dag.size(), 2);
    }

    #[test]
    fn test_no_cx_basis_is_unchanged() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 1).unwrap();
        assert_eq!(direction_mapper(&mut dag, &one_edge()).unwrap(), 0);
    }

    #[test]
    fn test_unexpected_cx_signature() {
        let mut dag = CircuitDag::new();
        dag.add_basis_element("cx", 2, 0, 1).unwrap();
        assert!(matches!(
            direction_mapper(&mut dag, &one_edge()),
            Err(CompileError::UnexpectedGateSignature { .. })
        ));
    }
}
