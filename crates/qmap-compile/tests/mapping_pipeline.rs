//! End-to-end tests: QASM source through unrolling, mapping, swap expansion
//! and direction fixing.

use std::collections::BTreeMap;

use qmap_compile::{
    CouplingGraph, FinalLayout, PassManagerBuilder, PropertySet, direction_mapper, expand_swaps,
    swap_mapper,
};
use qmap_ir::{CircuitDag, Wire};
use qmap_qasm2::unroll;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const BASIS: [&str; 4] = ["u1", "u2", "u3", "cx"];

const GHZ5: &str = r#"
OPENQASM 2.0;
include "qelib1.inc";
qreg v[5];
creg c[5];
h v[0];
cx v[0],v[4];
cx v[4],v[2];
cx v[2],v[1];
cx v[1],v[3];
barrier v;
measure v -> c;
"#;

/// A five-qubit device with one-way couplings.
fn device() -> CouplingGraph {
    CouplingGraph::from_adjacency(&BTreeMap::from([
        (0, vec![1, 2]),
        (1, vec![2]),
        (3, vec![2, 4]),
        (4, vec![2]),
    ]))
    .unwrap()
}

/// Every two-qubit gate is a `cx` along a directed coupling edge.
fn assert_native(dag: &CircuitDag, coupling: &CouplingGraph) {
    for op in dag.topological_ops().unwrap() {
        assert_ne!(op.name, "swap", "{op} was not expanded");
        if op.qubits.len() == 2 {
            assert_eq!(op.name, "cx", "{op} is not a native gate");
            assert!(
                coupling.has_edge(&op.qubits[0], &op.qubits[1]),
                "{op} runs against the coupling direction"
            );
        }
    }
}

/// Three qubits interacting pairwise cannot all sit next to each other on
/// a line, so mapping onto `linear(3)` needs a SWAP.
const TRIANGLE: &str = r#"
OPENQASM 2.0;
include "qelib1.inc";
qreg v[3];
creg c[3];
cx v[0],v[1];
cx v[1],v[2];
cx v[0],v[2];
cx v[0],v[1];
measure v -> c;
"#;

#[test]
fn test_ghz_on_device() {
    let coupling = device();
    let dag = unroll(GHZ5, &BASIS).unwrap();
    assert_eq!(dag.count_ops()["cx"], 4);

    let mut rng = Pcg64Mcg::seed_from_u64(42);
    let mut mapped = swap_mapper(&dag, &coupling, None, 20, &mut rng).unwrap();
    let swaps = expand_swaps(&mut mapped.dag).unwrap();
    let reversed = direction_mapper(&mut mapped.dag, &coupling).unwrap();

    mapped.dag.verify_integrity().unwrap();
    assert_native(&mapped.dag, &coupling);

    let counts = mapped.dag.count_ops();
    assert_eq!(counts["cx"], 4 + 3 * swaps);
    assert_eq!(counts["measure"], 5);
    assert_eq!(counts["barrier"], 1);
    assert_eq!(counts.get("h").copied().unwrap_or(0), 4 * reversed);
    assert_eq!(mapped.initial_layout.len(), 5);
    assert_eq!(mapped.final_layout.len(), 5);
}

#[test]
fn test_pass_manager_pipeline() {
    let coupling = device();
    let mut dag = unroll(GHZ5, &BASIS).unwrap();

    let (pm, mut props) = PassManagerBuilder::new()
        .with_coupling(coupling.clone())
        .with_trials(10)
        .with_seed(7)
        .build();
    pm.run(&mut dag, &mut props).unwrap();

    assert_native(&dag, &coupling);
    assert!(dag.qregs().iter().all(|r| r.name == "q"));
    assert!(props.layout.is_some());
    assert!(props.get::<FinalLayout>().is_some());

    let qasm = dag.qasm().unwrap();
    assert!(qasm.starts_with("OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[5];\ncreg c[5];\n"));
    assert!(!qasm.contains("swap"));
}

#[test]
fn test_forced_swap_becomes_native_cx() {
    let coupling = CouplingGraph::linear(3);
    let source = unroll(TRIANGLE, &BASIS).unwrap();

    let mut rng = Pcg64Mcg::seed_from_u64(1);
    let routed = swap_mapper(&source, &coupling, None, 20, &mut rng).unwrap();
    assert!(routed.dag.count_ops().get("swap").copied().unwrap_or(0) >= 1);

    let mut dag = source.clone();
    let (pm, mut props) = PassManagerBuilder::new()
        .with_coupling(coupling.clone())
        .with_seed(1)
        .build();
    pm.run(&mut dag, &mut props).unwrap();

    dag.verify_integrity().unwrap();
    assert_native(&dag, &coupling);
    assert_eq!(dag.count_ops()["measure"], 3);
    assert!(dag.signature("swap").is_none());

    let qasm = dag.qasm().unwrap();
    assert!(!qasm.contains("swap"));
    let reparsed = unroll(&qasm, &["cx", "h", "u1", "u2", "u3"]).unwrap();
    assert_native(&reparsed, &coupling);
}

#[test]
fn test_seed_makes_mapping_reproducible() {
    let coupling = device();
    let run = |seed| {
        let mut dag = unroll(GHZ5, &BASIS).unwrap();
        let (pm, mut props) = PassManagerBuilder::new()
            .with_properties(PropertySet::new().with_coupling(coupling.clone()))
            .with_seed(seed)
            .build();
        pm.run(&mut dag, &mut props).unwrap();
        dag.qasm().unwrap()
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn test_initial_layout_is_respected() {
    let coupling = CouplingGraph::linear(3);
    let source = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg v[2];\ncx v[0],v[1];";
    let dag = unroll(source, &BASIS).unwrap();

    let layout = [
        (Wire::new("v", 0), Wire::new("q", 2)),
        (Wire::new("v", 1), Wire::new("q", 1)),
    ]
    .into_iter()
    .collect();
    let mut rng = Pcg64Mcg::seed_from_u64(0);
    let mut mapped = swap_mapper(&dag, &coupling, Some(layout), 5, &mut rng).unwrap();
    assert_eq!(mapped.dag.count_ops().get("swap"), None);

    // cx q[2],q[1] only exists as q[1] -> q[2] on the line
    assert_eq!(direction_mapper(&mut mapped.dag, &coupling).unwrap(), 1);
    assert_native(&mapped.dag, &coupling);
    assert_eq!(mapped.dag.count_ops()["h"], 4);
}

#[test]
fn test_circuit_too_large_for_device() {
    let dag = unroll(GHZ5, &BASIS).unwrap();
    let mut rng = Pcg64Mcg::seed_from_u64(0);
    assert!(swap_mapper(&dag, &CouplingGraph::linear(3), None, 5, &mut rng).is_err());
}
