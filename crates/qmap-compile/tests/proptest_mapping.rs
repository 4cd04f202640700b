//! Property-based tests for coupling distances and SWAP mapping.

use std::collections::BTreeMap;

use proptest::prelude::*;
use qmap_compile::{CouplingGraph, Layout, direction_mapper, expand_swaps, swap_mapper};
use qmap_ir::{CircuitDag, Operation, Wire};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// Connected adjacency maps: a random spanning tree plus extra edges.
fn arb_coupling() -> impl Strategy<Value = BTreeMap<u32, Vec<u32>>> {
    (2_u32..=6).prop_flat_map(|n| {
        let parents: Vec<_> = (1..n).map(|i| (0..i, any::<bool>())).collect();
        let extra = prop::collection::vec((0..n, 0..n), 0..4);
        (parents, extra).prop_map(move |(parents, extra)| {
            let mut adjacency: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
            for (i, (parent, forward)) in (1..n).zip(parents) {
                let (a, b) = if forward { (parent, i) } else { (i, parent) };
                adjacency.entry(a).or_default().push(b);
            }
            for (a, b) in extra {
                if a != b {
                    adjacency.entry(a).or_default().push(b);
                }
            }
            adjacency
        })
    })
}

#[derive(Debug, Clone)]
enum GateOp {
    U(u32),
    CX(u32, u32),
    Measure(u32),
}

fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    prop_oneof![
        1 => (0..num_qubits).prop_map(GateOp::U),
        3 => (0..num_qubits, 0..num_qubits)
            .prop_filter("Control and target must differ", |(c, t)| c != t)
            .prop_map(|(c, t)| GateOp::CX(c, t)),
        1 => (0..num_qubits).prop_map(GateOp::Measure),
    ]
}

/// Random circuits over `v` on 2-5 qubits, mapped onto a line of 5.
fn arb_circuit() -> impl Strategy<Value = (CircuitDag, u64)> {
    (2_u32..=5).prop_flat_map(|num_qubits| {
        (
            prop::collection::vec(arb_gate_op(num_qubits), 0..=12),
            any::<u64>(),
        )
            .prop_map(move |(ops, seed)| {
                let v = |i| Wire::new("v", i);
                let mut dag = CircuitDag::new();
                dag.add_qreg("v", num_qubits).unwrap();
                dag.add_creg("c", num_qubits).unwrap();
                dag.add_basis_element("U", 1, 0, 3).unwrap();
                dag.add_basis_element("cx", 2, 0, 0).unwrap();
                dag.add_basis_element("measure", 1, 1, 0).unwrap();
                for op in ops {
                    let op = match op {
                        GateOp::U(i) => Operation::new("U", [v(i)]).with_params([0.1, 0.2, 0.3]),
                        GateOp::CX(c, t) => Operation::new("cx", [v(c), v(t)]),
                        GateOp::Measure(i) => Operation::measure(v(i), Wire::new("c", i)),
                    };
                    dag.apply_operation_back(op).unwrap();
                }
                (dag, seed)
            })
    })
}

/// Replay the SWAPs from `initial`, returning the sorted logical `cx`
/// pairs and the layout reached at the end.
fn logical_cx(dag: &CircuitDag, initial: &Layout) -> (Vec<(Wire, Wire)>, Layout) {
    let mut layout = initial.clone();
    let mut pairs = Vec::new();
    for op in dag.topological_ops().unwrap() {
        match op.name.as_str() {
            "swap" => layout.swap(&op.qubits[0], &op.qubits[1]),
            "cx" => pairs.push((
                layout.get_logical(&op.qubits[0]).unwrap().clone(),
                layout.get_logical(&op.qubits[1]).unwrap().clone(),
            )),
            _ => {}
        }
    }
    pairs.sort();
    (pairs, layout)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn distance_is_symmetric(adjacency in arb_coupling()) {
        let coupling = CouplingGraph::from_adjacency(&adjacency).unwrap();
        let qubits = coupling.qubits().to_vec();
        for a in &qubits {
            prop_assert_eq!(coupling.distance(a, a).unwrap(), 0);
            for b in &qubits {
                let d = coupling.distance(a, b).unwrap();
                prop_assert_eq!(d, coupling.distance(b, a).unwrap());
                if coupling.has_edge(a, b) {
                    prop_assert_eq!(d, 1);
                }
            }
        }
    }

    #[test]
    fn mapped_gates_are_native((dag, seed) in arb_circuit()) {
        let coupling = CouplingGraph::linear(5);
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut mapped = swap_mapper(&dag, &coupling, None, 20, &mut rng).unwrap();
        mapped.dag.verify_integrity().unwrap();

        for op in mapped.dag.topological_ops().unwrap() {
            if op.qubits.len() == 2 {
                let (a, b) = (&op.qubits[0], &op.qubits[1]);
                prop_assert!(coupling.has_edge(a, b) || coupling.has_edge(b, a), "{}", op);
            }
        }

        let counts = dag.count_ops();
        let mapped_counts = mapped.dag.count_ops();
        for name in ["U", "cx", "measure"] {
            prop_assert_eq!(counts.get(name), mapped_counts.get(name));
        }

        let swaps = mapped_counts.get("swap").copied().unwrap_or(0);
        prop_assert_eq!(expand_swaps(&mut mapped.dag).unwrap(), swaps);
        direction_mapper(&mut mapped.dag, &coupling).unwrap();
        mapped.dag.verify_integrity().unwrap();
        for op in mapped.dag.topological_ops().unwrap() {
            prop_assert_ne!(op.name.as_str(), "swap");
            if op.qubits.len() == 2 {
                prop_assert_eq!(op.name.as_str(), "cx");
                prop_assert!(coupling.has_edge(&op.qubits[0], &op.qubits[1]), "{}", op);
            }
        }
        let cx = counts.get("cx").copied().unwrap_or(0);
        prop_assert_eq!(mapped.dag.count_ops().get("cx").copied().unwrap_or(0), cx + 3 * swaps);
    }

    #[test]
    fn swaps_preserve_logical_gates((dag, seed) in arb_circuit()) {
        let coupling = CouplingGraph::linear(5);
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mapped = swap_mapper(&dag, &coupling, None, 20, &mut rng).unwrap();

        let mut expected: Vec<(Wire, Wire)> = dag
            .topological_ops()
            .unwrap()
            .into_iter()
            .filter(|op| op.name == "cx")
            .map(|op| (op.qubits[0].clone(), op.qubits[1].clone()))
            .collect();
        expected.sort();

        let (pairs, final_layout) = logical_cx(&mapped.dag, &mapped.initial_layout);
        prop_assert_eq!(pairs, expected);
        prop_assert_eq!(final_layout, mapped.final_layout);
    }
}
