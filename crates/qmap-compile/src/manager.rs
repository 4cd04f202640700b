//! Pass manager for orchestrating compilation.

use tracing::{debug, info, instrument};

use qmap_ir::CircuitDag;

use crate::coupling::CouplingGraph;
use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{CxCancellation, DirectionMapping, SwapExpansion, SwapMapping};
use crate::property::{Layout, PropertySet};

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given DAG.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            dag.width()
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(dag, properties)?;
                debug!("Pass {} completed, ops: {}", pass.name(), dag.size());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, final depth: {}, ops: {}",
            dag.depth()?,
            dag.size()
        );

        Ok(())
    }

    /// Names of the passes, in order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the standard mapping pipeline.
///
/// With a coupling graph the pipeline is swap mapping, swap expansion,
/// direction mapping, then `cx` cancellation. Without one only the
/// cancellation runs.
pub struct PassManagerBuilder {
    properties: PropertySet,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            properties: PropertySet::new(),
        }
    }

    /// Set the target properties.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    /// Set the target coupling graph.
    #[must_use]
    pub fn with_coupling(mut self, coupling: CouplingGraph) -> Self {
        self.properties.coupling = Some(coupling);
        self
    }

    /// Set the initial layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.properties.layout = Some(layout);
        self
    }

    /// Set the number of randomized trials per layer.
    #[must_use]
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.properties.options.trials = trials;
        self
    }

    /// Set the seed for reproducible mapping.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.properties.options.seed = Some(seed);
        self
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();

        if self.properties.coupling.is_some() {
            pm.add_pass(SwapMapping);
            pm.add_pass(SwapExpansion);
            pm.add_pass(DirectionMapping);
        }
        pm.add_pass(CxCancellation);

        (pm, self.properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
