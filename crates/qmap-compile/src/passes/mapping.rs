//! Passes wrapping the SWAP mapper, SWAP expansion and the direction mapper.

use qmap_ir::CircuitDag;
use tracing::info;

use crate::direction::{direction_mapper, expand_swaps};
use crate::error::{CompileError, CompileResult};
use crate::mapping::swap_mapper;
use crate::pass::{Pass, PassKind};
use crate::property::{FinalLayout, PropertySet, SwapCount};

/// Route the circuit onto the coupling graph.
///
/// Reads `properties.layout` as the initial layout when present and
/// replaces it with the layout the mapped circuit starts from. The layout
/// after the last layer is stored as [`FinalLayout`].
pub struct SwapMapping;

impl Pass for SwapMapping {
    fn name(&self) -> &str {
        "SwapMapping"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling = properties
            .coupling
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let mut rng = properties.options.rng();

        let mapped = swap_mapper(
            dag,
            coupling,
            properties.layout.clone(),
            properties.options.trials,
            &mut rng,
        )?;
        info!(
            "Swap mapping done, depth {} on {} qubits",
            mapped.dag.depth()?,
            mapped.dag.width()
        );

        *dag = mapped.dag;
        properties.layout = Some(mapped.initial_layout);
        properties.insert(FinalLayout(mapped.final_layout));
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling.is_some()
    }
}

/// Rewrite the SWAPs inserted by [`SwapMapping`] as `cx` gates.
///
/// The number of expanded SWAPs is stored as [`SwapCount`].
pub struct SwapExpansion;

impl Pass for SwapExpansion {
    fn name(&self) -> &str {
        "SwapExpansion"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let expanded = expand_swaps(dag)?;
        info!("Expanded {expanded} swaps into cx gates");
        properties.insert(SwapCount(expanded));
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.signature("swap").is_some()
    }
}

/// Reverse `cx` gates that run against the coupling direction.
pub struct DirectionMapping;

impl Pass for DirectionMapping {
    fn name(&self) -> &str {
        "DirectionMapping"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling = properties
            .coupling
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        direction_mapper(dag, coupling)?;
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling.is_some()
    }
}
