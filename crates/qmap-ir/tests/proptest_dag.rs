//! Property-based tests for the labeled graph and the circuit DAG.

use proptest::prelude::*;
use qmap_ir::{CircuitDag, LabeledGraph, Operation, Wire};

/// Gate operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    X(u32),
    CX(u32, u32),
    Measure(u32),
    Conditioned(u32, u64),
}

impl GateOp {
    fn into_operation(self) -> Operation {
        let q = |i| Wire::new("q", i);
        match self {
            GateOp::H(i) => Operation::new("h", [q(i)]),
            GateOp::X(i) => Operation::new("x", [q(i)]),
            GateOp::CX(c, t) => Operation::new("cx", [q(c), q(t)]),
            GateOp::Measure(i) => Operation::measure(q(i), Wire::new("c", i)),
            GateOp::Conditioned(i, value) => Operation::new("x", [q(i)]).with_condition("c", value),
        }
    }
}

fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    prop_oneof![
        (0..num_qubits).prop_map(GateOp::H),
        (0..num_qubits).prop_map(GateOp::X),
        (0..num_qubits, 0..num_qubits)
            .prop_filter("Control and target must differ", |(c, t)| c != t)
            .prop_map(|(c, t)| GateOp::CX(c, t)),
        (0..num_qubits).prop_map(GateOp::Measure),
        (0..num_qubits, 0_u64..4).prop_map(|(i, v)| GateOp::Conditioned(i, v)),
    ]
}

/// Random circuits on 2-5 qubits with up to 20 operations.
fn arb_circuit() -> impl Strategy<Value = CircuitDag> {
    (2_u32..=5).prop_flat_map(|num_qubits| {
        prop::collection::vec(arb_gate_op(num_qubits), 0..=20).prop_map(move |ops| {
            let mut dag = CircuitDag::new();
            dag.add_qreg("q", num_qubits).unwrap();
            dag.add_creg("c", num_qubits).unwrap();
            dag.add_basis_element("h", 1, 0, 0).unwrap();
            dag.add_basis_element("x", 1, 0, 0).unwrap();
            dag.add_basis_element("cx", 2, 0, 0).unwrap();
            dag.add_basis_element("measure", 1, 1, 0).unwrap();
            for op in ops {
                dag.apply_operation_back(op.into_operation()).unwrap();
            }
            dag
        })
    })
}

/// Random DAGs: edges only go from lower to higher keys.
fn arb_dag() -> impl Strategy<Value = LabeledGraph<(), u32>> {
    (1_usize..12).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..30).prop_map(move |pairs| {
            let mut graph = LabeledGraph::directed();
            for key in 0..n {
                graph.add_vertex(key);
            }
            for (a, b) in pairs {
                if a < b {
                    graph.add_edge(a, b, Some(0), 1);
                }
            }
            graph
        })
    })
}

proptest! {
    /// Every edge goes forward in the topological order.
    #[test]
    fn test_topological_sort_respects_edges(graph in arb_dag()) {
        let order = graph.topological_sort(false).unwrap();
        prop_assert_eq!(order.len(), graph.vertex_count());
        let position = |k| order.iter().position(|&x| x == k).unwrap();
        for (src, dst, _) in graph.edges() {
            prop_assert!(position(src) < position(dst));
        }

        let reversed = graph.topological_sort(true).unwrap();
        let mut expected = order.clone();
        expected.reverse();
        prop_assert_eq!(reversed, expected);
    }

    /// Ancestors, descendants and their complements partition the other vertices.
    #[test]
    fn test_reachability_partitions(graph in arb_dag()) {
        for key in graph.vertex_keys().collect::<Vec<_>>() {
            let ancestors = graph.ancestors(key);
            let non_ancestors = graph.non_ancestors(key);
            prop_assert!(!ancestors.contains(&key));
            prop_assert!(!non_ancestors.contains(&key));
            prop_assert_eq!(ancestors.len() + non_ancestors.len() + 1, graph.vertex_count());

            let descendants = graph.descendants(key);
            let non_descendants = graph.non_descendants(key);
            prop_assert_eq!(descendants.len() + non_descendants.len() + 1, graph.vertex_count());
        }
    }

    /// Random circuits stay structurally sound.
    #[test]
    fn test_random_circuits_keep_integrity(dag in arb_circuit()) {
        prop_assert!(dag.graph().is_directed_acyclic_graph());
        prop_assert!(dag.verify_integrity().is_ok());
        let ops: usize = dag.count_ops().values().sum();
        prop_assert_eq!(ops, dag.size());
    }

    /// Layers hold every operation exactly once and never share a wire.
    #[test]
    fn test_layers_partition_operations(dag in arb_circuit()) {
        let layers = dag.layers().unwrap();
        let total: usize = layers.iter().map(|l| l.operations.len()).sum();
        prop_assert_eq!(total, dag.size());
        for layer in &layers {
            let mut seen = std::collections::BTreeSet::new();
            for group in &layer.partition {
                for wire in group {
                    prop_assert!(seen.insert(wire.clone()));
                }
            }
        }
        prop_assert!(layers.len() <= dag.size());
        prop_assert_eq!(dag.serial_layers().unwrap().len(), dag.size());
    }

    /// Removing every operation restores the bare wires.
    #[test]
    fn test_remove_all_ops(mut dag in arb_circuit()) {
        for key in dag.op_nodes() {
            dag.remove_op_node(key).unwrap();
        }
        prop_assert_eq!(dag.size(), 0);
        prop_assert_eq!(dag.graph().edge_count(), dag.width() + dag.num_clbits());
        prop_assert!(dag.verify_integrity().is_ok());
    }

    /// Unconnected qubit chains each form their own factor.
    #[test]
    fn test_tensor_factors_of_disjoint_chains(k in 1_u32..6, len in 0_usize..4) {
        let mut dag = CircuitDag::new();
        dag.add_basis_element("h", 1, 0, 0).unwrap();
        for i in 0..k {
            dag.add_qreg(&format!("r{i}"), 1).unwrap();
            for _ in 0..len {
                dag.apply_operation_back(Operation::new("h", [Wire::new(format!("r{i}"), 0)]))
                    .unwrap();
            }
        }
        prop_assert_eq!(dag.num_tensor_factors(), k as usize);
        prop_assert_eq!(dag.depth().unwrap(), len);
    }
}
