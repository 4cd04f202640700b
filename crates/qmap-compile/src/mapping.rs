//! Randomized SWAP mapping.
//!
//! [`layer_permutation`] searches for a sequence of SWAPs that makes every
//! two-qubit gate of one layer act on coupled physical qubits.
//! [`swap_mapper`] drives it over a whole circuit.
//!
//! Each trial jitters the squared distance between every pair of physical
//! qubits with a Gaussian factor, then descends greedily: within a depth
//! slice it keeps applying the coupling edge whose SWAP lowers the jittered
//! cost the most, using each qubit at most once per slice. The shallowest
//! successful trial wins.

use std::collections::BTreeMap;

use qmap_ir::{CircuitDag, GateDefinition, Operation, Signature, Wire, WireKind};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, trace};

use crate::coupling::CouplingGraph;
use crate::error::{CompileError, CompileResult};
use crate::property::Layout;

/// Outcome of [`layer_permutation`].
#[derive(Debug, Clone, PartialEq)]
pub enum LayerPermutation {
    /// Every gate of the layer can be made adjacent.
    Found {
        /// SWAPs on physical qubits, in application order.
        swaps: Vec<(Wire, Wire)>,
        /// Number of depth slices used.
        depth: usize,
        /// Layout after the SWAPs.
        layout: Layout,
        /// The layer had no two-qubit gates.
        trivial: bool,
    },
    /// No trial reached adjacency.
    Exhausted,
}

impl LayerPermutation {
    /// Check if a permutation was found.
    pub fn is_found(&self) -> bool {
        matches!(self, LayerPermutation::Found { .. })
    }

    /// The SWAPs as QASM text, e.g. `swap q[0],q[1]; `.
    pub fn swap_qasm(&self) -> String {
        match self {
            LayerPermutation::Found { swaps, .. } => swaps
                .iter()
                .map(|(a, b)| format!("swap {a},{b}; "))
                .collect(),
            LayerPermutation::Exhausted => String::new(),
        }
    }
}

/// Find SWAPs that make every two-qubit group of `partition` adjacent.
///
/// `qubit_subset` lists the physical qubits SWAPs may use. `trials` bounds
/// the random restarts; a layer that is already adjacent succeeds without
/// any trial.
pub fn layer_permutation<R: Rng + ?Sized>(
    partition: &[Vec<Wire>],
    layout: &Layout,
    qubit_subset: &[Wire],
    coupling: &CouplingGraph,
    trials: usize,
    rng: &mut R,
) -> CompileResult<LayerPermutation> {
    let mut gates = Vec::new();
    for group in partition {
        match group.as_slice() {
            [a, b] => gates.push((a.clone(), b.clone())),
            [_] | [] => {}
            _ => {
                return Err(CompileError::LayoutError(format!(
                    "layer contains a {}-qubit group",
                    group.len()
                )));
            }
        }
    }

    let positions = |layout: &Layout| -> CompileResult<Vec<(Wire, Wire)>> {
        gates
            .iter()
            .map(|(a, b)| {
                let pa = layout
                    .get_physical(a)
                    .ok_or_else(|| CompileError::UnmappedQubit(a.clone()))?;
                let pb = layout
                    .get_physical(b)
                    .ok_or_else(|| CompileError::UnmappedQubit(b.clone()))?;
                Ok((pa.clone(), pb.clone()))
            })
            .collect()
    };
    let total_distance = |layout: &Layout| -> CompileResult<usize> {
        let mut total = 0;
        for (pa, pb) in positions(layout)? {
            total += coupling.distance(&pa, &pb)?;
        }
        Ok(total)
    };

    if total_distance(layout)? == gates.len() {
        return Ok(LayerPermutation::Found {
            swaps: vec![],
            depth: 0,
            layout: layout.clone(),
            trivial: gates.is_empty(),
        });
    }

    let qubits = coupling.qubits();
    let n = qubits.len();
    let index: FxHashMap<&Wire, usize> = qubits.iter().enumerate().map(|(i, q)| (q, i)).collect();
    let edges = coupling.edges();
    let jitter = Normal::new(1.0, 1.0 / n as f64)
        .map_err(|e| CompileError::LayoutError(e.to_string()))?;

    let mut best: Option<(usize, Vec<(Wire, Wire)>, Layout)> = None;
    for trial in 0..trials {
        let mut xi = vec![vec![0.0_f64; n]; n];
        for i in 0..n {
            for j in i..n {
                let d = coupling.distance(&qubits[i], &qubits[j])? as f64;
                let weight = jitter.sample(rng) * d * d;
                xi[i][j] = weight;
                xi[j][i] = weight;
            }
        }
        let cost = |layout: &Layout| -> CompileResult<f64> {
            let mut total = 0.0;
            for (pa, pb) in positions(layout)? {
                total += match (index.get(&pa), index.get(&pb)) {
                    (Some(&i), Some(&j)) => xi[i][j],
                    _ => f64::INFINITY,
                };
            }
            Ok(total)
        };

        let mut trial_layout = layout.clone();
        let mut swaps = Vec::new();
        let mut depth = 1;
        let mut adjacent = false;
        while depth < 2 * n + 1 {
            let mut available: FxHashSet<&Wire> = qubit_subset.iter().collect();
            while !available.is_empty() {
                let mut min_cost = cost(&trial_layout)?;
                let mut choice = None;
                for (a, b) in &edges {
                    if !available.contains(a) || !available.contains(b) {
                        continue;
                    }
                    let mut candidate = trial_layout.clone();
                    candidate.swap(a, b);
                    let candidate_cost = cost(&candidate)?;
                    if candidate_cost < min_cost {
                        min_cost = candidate_cost;
                        choice = Some((a, b, candidate));
                    }
                }
                let Some((a, b, candidate)) = choice else {
                    break;
                };
                trace!("trial {trial}: swap {a},{b} at depth {depth}, cost {min_cost}");
                trial_layout = candidate;
                available.remove(a);
                available.remove(b);
                swaps.push((a.clone(), b.clone()));
            }
            if total_distance(&trial_layout)? == gates.len() {
                adjacent = true;
                break;
            }
            depth += 1;
        }

        if adjacent && best.as_ref().is_none_or(|(best_depth, ..)| depth < *best_depth) {
            debug!("trial {trial} reached adjacency at depth {depth}");
            best = Some((depth, swaps, trial_layout));
        }
    }

    Ok(match best {
        Some((depth, swaps, layout)) => LayerPermutation::Found {
            swaps,
            depth,
            layout,
            trivial: false,
        },
        None => LayerPermutation::Exhausted,
    })
}

/// A circuit mapped onto a coupling graph.
#[derive(Debug, Clone)]
pub struct MappedCircuit {
    /// The circuit over physical qubits.
    pub dag: CircuitDag,
    /// Layout the mapped circuit starts from.
    pub initial_layout: Layout,
    /// Layout after the last layer.
    pub final_layout: Layout,
}

/// Map a circuit onto `coupling`, inserting SWAPs layer by layer.
///
/// Without `initial_layout`, circuit qubits in declaration order go to the
/// coupling qubits in insertion order.
pub fn swap_mapper<R: Rng + ?Sized>(
    dag: &CircuitDag,
    coupling: &CouplingGraph,
    initial_layout: Option<Layout>,
    trials: usize,
    rng: &mut R,
) -> CompileResult<MappedCircuit> {
    let qubits = dag.qubits();
    if qubits.len() > coupling.size() {
        return Err(CompileError::CircuitTooLarge {
            required: qubits.len(),
            available: coupling.size(),
        });
    }

    let layout = match initial_layout {
        Some(layout) => {
            check_layout(dag, coupling, &layout)?;
            layout
        }
        None => Layout::trivial(&qubits, coupling.qubits()),
    };
    let qubit_subset: Vec<Wire> = qubits
        .iter()
        .filter_map(|q| layout.get_physical(q).cloned())
        .collect();

    info!(
        "Mapping circuit with {} qubits onto {} physical qubits",
        qubits.len(),
        coupling.size()
    );

    let mut writer = MappedWriter::new(dag, coupling, layout)?;
    for (i, layer) in dag.layers()?.iter().enumerate() {
        let result = layer_permutation(
            &layer.partition,
            &writer.layout,
            &qubit_subset,
            coupling,
            trials,
            rng,
        )?;
        if result.is_found() {
            debug!("layer {i}: {}", result.swap_qasm().trim_end());
            writer.emit(result, &layer.operations)?;
            continue;
        }

        debug!("layer {i}: no permutation found, mapping gates one at a time");
        for (j, op) in layer.operations.iter().enumerate() {
            let partition = if op.is_barrier() {
                vec![]
            } else {
                vec![op.qubits.clone()]
            };
            let result = layer_permutation(
                &partition,
                &writer.layout,
                &qubit_subset,
                coupling,
                trials,
                rng,
            )?;
            if !result.is_found() {
                return Err(CompileError::SwapMapperFailed {
                    layer: i,
                    position: j,
                });
            }
            writer.emit(result, std::slice::from_ref(op))?;
        }
    }
    writer.finish()
}

fn check_layout(dag: &CircuitDag, coupling: &CouplingGraph, layout: &Layout) -> CompileResult<()> {
    for (logical, physical) in layout.to_map() {
        if dag.wire_kind(&logical) != Some(WireKind::Quantum) {
            return Err(CompileError::InvalidLayout(format!(
                "{logical} is not a qubit of the circuit"
            )));
        }
        if !coupling.contains(&physical) {
            return Err(CompileError::InvalidLayout(format!(
                "{physical} is not in the coupling graph"
            )));
        }
    }
    if let Some(missing) = dag.qubits().iter().find(|q| layout.get_physical(q).is_none()) {
        return Err(CompileError::InvalidLayout(format!("{missing} is not mapped")));
    }
    Ok(())
}

/// Builds the mapped circuit as layers are resolved.
struct MappedWriter {
    dag: CircuitDag,
    layout: Layout,
    initial_layout: Layout,
    /// Operations of leading layers without two-qubit gates, held back until
    /// the initial layout is settled.
    pending: Vec<Operation>,
    started: bool,
}

impl MappedWriter {
    fn new(source: &CircuitDag, coupling: &CouplingGraph, layout: Layout) -> CompileResult<Self> {
        let mut dag = CircuitDag::new();

        let mut sizes: BTreeMap<&str, u32> = BTreeMap::new();
        for qubit in coupling.qubits() {
            let size = sizes.entry(qubit.register.as_str()).or_insert(0);
            *size = (*size).max(qubit.index + 1);
        }
        for (name, size) in sizes {
            dag.add_qreg(name, size)?;
        }
        for creg in source.cregs() {
            dag.add_creg(&creg.name, creg.size)?;
        }

        for (name, signature) in source.basis() {
            dag.add_basis_signature(name, *signature)?;
        }
        for definition in source.gate_definitions() {
            dag.add_gate_definition(definition.clone());
        }
        dag.add_basis_signature("swap", Signature::new(2, 0, 0))?;
        dag.add_gate_definition(GateDefinition::swap());

        Ok(Self {
            dag,
            initial_layout: layout.clone(),
            layout,
            pending: vec![],
            started: false,
        })
    }

    fn emit(&mut self, result: LayerPermutation, ops: &[Operation]) -> CompileResult<()> {
        let LayerPermutation::Found {
            swaps,
            layout,
            trivial,
            ..
        } = result
        else {
            return Ok(());
        };

        if !self.started {
            if trivial {
                self.pending.extend_from_slice(ops);
                return Ok(());
            }
            // SWAPs ahead of the first emitted gate move the initial layout instead.
            self.started = true;
            self.initial_layout = layout.clone();
            self.layout = layout;
            for op in std::mem::take(&mut self.pending) {
                self.apply(&op)?;
            }
        } else {
            for (a, b) in swaps {
                self.dag
                    .apply_operation_back(Operation::new("swap", [a, b]))?;
            }
            self.layout = layout;
        }
        for op in ops {
            self.apply(op)?;
        }
        Ok(())
    }

    fn apply(&mut self, op: &Operation) -> CompileResult<()> {
        let mut mapped = op.clone();
        mapped.qubits = op
            .qubits
            .iter()
            .map(|q| {
                self.layout
                    .get_physical(q)
                    .cloned()
                    .ok_or_else(|| CompileError::UnmappedQubit(q.clone()))
            })
            .collect::<CompileResult<_>>()?;
        self.dag.apply_operation_back(mapped)?;
        Ok(())
    }

    fn finish(mut self) -> CompileResult<MappedCircuit> {
        for op in std::mem::take(&mut self.pending) {
            self.apply(&op)?;
        }
        info!(
            "Mapped circuit: {} operations, {} swaps",
            self.dag.size(),
            self.dag.count_ops().get("swap").copied().unwrap_or(0)
        );
        Ok(MappedCircuit {
            dag: self.dag,
            initial_layout: self.initial_layout,
            final_layout: self.layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn q(i: u32) -> Wire {
        Wire::new("q", i)
    }

    fn v(i: u32) -> Wire {
        Wire::new("v", i)
    }

    fn line3() -> CouplingGraph {
        CouplingGraph::from_adjacency(&BTreeMap::from([(0, vec![1]), (1, vec![2])])).unwrap()
    }

    fn identity(n: u32) -> Layout {
        (0..n).map(|i| (v(i), q(i))).collect()
    }

    #[test]
    fn test_distant_gate_needs_swaps() {
        let coupling = line3();
        let layout = identity(3);
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let result = layer_permutation(
            &[vec![v(0), v(2)]],
            &layout,
            coupling.qubits(),
            &coupling,
            20,
            &mut rng,
        )
        .unwrap();

        let LayerPermutation::Found {
            swaps,
            depth,
            layout: after,
            trivial,
        } = &result
        else {
            panic!("expected a permutation");
        };
        assert!(!swaps.is_empty());
        assert!(*depth >= 1);
        assert!(!trivial);
        let (a, b) = (after.get_physical(&v(0)).unwrap(), after.get_physical(&v(2)).unwrap());
        assert_eq!(coupling.distance(a, b).unwrap(), 1);
        assert!(result.swap_qasm().starts_with("swap q["));
    }

    #[test]
    fn test_adjacent_layer_needs_no_trials() {
        let coupling = line3();
        let layout = identity(3);
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        for trials in [0, 1, 20] {
            let result = layer_permutation(
                &[vec![v(0), v(1)]],
                &layout,
                coupling.qubits(),
                &coupling,
                trials,
                &mut rng,
            )
            .unwrap();
            assert_eq!(
                result,
                LayerPermutation::Found {
                    swaps: vec![],
                    depth: 0,
                    layout: layout.clone(),
                    trivial: false,
                }
            );
            assert_eq!(result.swap_qasm(), "");
        }
    }

    #[test]
    fn test_layer_without_gates_is_trivial() {
        let coupling = line3();
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let result = layer_permutation(
            &[vec![v(0)], vec![]],
            &identity(3),
            coupling.qubits(),
            &coupling,
            0,
            &mut rng,
        )
        .unwrap();
        assert!(matches!(result, LayerPermutation::Found { trivial: true, .. }));
    }

    #[test]
    fn test_zero_trials_exhausts() {
        let coupling = line3();
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let result = layer_permutation(
            &[vec![v(0), v(2)]],
            &identity(3),
            coupling.qubits(),
            &coupling,
            0,
            &mut rng,
        )
        .unwrap();
        assert_eq!(result, LayerPermutation::Exhausted);
        assert_eq!(result.swap_qasm(), "");
    }

    #[test]
    fn test_oversized_group_is_rejected() {
        let coupling = line3();
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let err = layer_permutation(
            &[vec![v(0), v(1), v(2)]],
            &identity(3),
            coupling.qubits(),
            &coupling,
            5,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::LayoutError(_)));
    }

    #[test]
    fn test_unmapped_qubit() {
        let coupling = line3();
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let err = layer_permutation(
            &[vec![v(0), v(7)]],
            &identity(3),
            coupling.qubits(),
            &coupling,
            5,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnmappedQubit(w) if w == v(7)));
    }

    #[test]
    fn test_restricted_subset_cannot_swap() {
        let coupling = line3();
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let result = layer_permutation(
            &[vec![v(0), v(2)]],
            &identity(3),
            &[q(0)],
            &coupling,
            3,
            &mut rng,
        )
        .unwrap();
        assert_eq!(result, LayerPermutation::Exhausted);
    }

    fn circuit(n: u32) -> CircuitDag {
        let mut dag = CircuitDag::new();
        dag.add_qreg("v", n).unwrap();
        dag.add_creg("c", n).unwrap();
        dag.add_basis_element("U", 1, 0, 3).unwrap();
        dag.add_basis_element("CX", 2, 0, 0).unwrap();
        dag.add_basis_element("measure", 1, 1, 0).unwrap();
        dag
    }

    fn assert_coupled(mapped: &CircuitDag, coupling: &CouplingGraph) {
        for op in mapped.topological_ops().unwrap() {
            if op.qubits.len() == 2 {
                let (a, b) = (&op.qubits[0], &op.qubits[1]);
                assert!(
                    coupling.has_edge(a, b) || coupling.has_edge(b, a),
                    "{op} is not on a coupling edge"
                );
            }
        }
    }

    #[test]
    fn test_swap_mapper_line() {
        let coupling = line3();
        let mut dag = circuit(3);
        dag.apply_operation_back(Operation::new("U", [v(1)]).with_params([0.1, 0.2, 0.3]))
            .unwrap();
        dag.apply_operation_back(Operation::new("CX", [v(0), v(1)]))
            .unwrap();
        dag.apply_operation_back(Operation::new("CX", [v(0), v(2)]))
            .unwrap();
        dag.apply_operation_back(Operation::new("CX", [v(1), v(2)]))
            .unwrap();
        dag.apply_operation_back(Operation::measure(v(2), Wire::new("c", 2)))
            .unwrap();

        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let mapped = swap_mapper(&dag, &coupling, None, 20, &mut rng).unwrap();
        assert_coupled(&mapped.dag, &coupling);
        mapped.dag.verify_integrity().unwrap();

        let counts = mapped.dag.count_ops();
        assert_eq!(counts["CX"], 3);
        assert_eq!(counts["U"], 1);
        assert_eq!(counts["measure"], 1);
        assert!(mapped.dag.qregs().iter().any(|r| r.name == "q" && r.size == 3));
        assert_eq!(mapped.initial_layout.len(), 3);
        assert_eq!(mapped.final_layout.len(), 3);
    }

    #[test]
    fn test_leading_swaps_move_initial_layout() {
        let coupling = line3();
        let mut dag = circuit(3);
        dag.apply_operation_back(Operation::new("CX", [v(0), v(2)]))
            .unwrap();

        let mut rng = Pcg64Mcg::seed_from_u64(9);
        let mapped = swap_mapper(&dag, &coupling, None, 20, &mut rng).unwrap();
        assert_eq!(mapped.dag.count_ops().get("swap"), None);
        assert_eq!(mapped.initial_layout, mapped.final_layout);
        assert_coupled(&mapped.dag, &coupling);
    }

    #[test]
    fn test_swap_mapper_rejects_large_circuit() {
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let err = swap_mapper(&circuit(4), &line3(), None, 5, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            CompileError::CircuitTooLarge {
                required: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn test_swap_mapper_validates_layout() {
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let partial: Layout = [(v(0), q(0))].into_iter().collect();
        assert!(matches!(
            swap_mapper(&circuit(2), &line3(), Some(partial), 5, &mut rng),
            Err(CompileError::InvalidLayout(_))
        ));

        let off_device: Layout = [(v(0), q(0)), (v(1), q(9))].into_iter().collect();
        assert!(matches!(
            swap_mapper(&circuit(2), &line3(), Some(off_device), 5, &mut rng),
            Err(CompileError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_single_qubit_circuit_keeps_layout() {
        let coupling = line3();
        let mut dag = circuit(2);
        dag.apply_operation_back(Operation::new("U", [v(1)]).with_params([0.0, 0.0, 0.5]))
            .unwrap();
        let layout: Layout = [(v(0), q(2)), (v(1), q(1))].into_iter().collect();
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let mapped = swap_mapper(&dag, &coupling, Some(layout.clone()), 5, &mut rng).unwrap();
        assert_eq!(mapped.initial_layout, layout);
        let ops = mapped.dag.topological_ops().unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].qubits, vec![q(1)]);
    }
}
