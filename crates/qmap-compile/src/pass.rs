//! Pass trait and types for compilation passes.

use qmap_ir::CircuitDag;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Analysis pass that reads but does not modify the DAG.
    Analysis,
    /// Transformation pass that modifies the DAG.
    Transformation,
}

/// A compilation pass that operates on a circuit DAG.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given DAG.
    ///
    /// Analysis passes leave the DAG alone and may write to the
    /// `PropertySet`. Transformation passes rewrite the DAG.
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()>;

    /// Check if this pass should run based on current state.
    fn should_run(&self, _dag: &CircuitDag, _properties: &PropertySet) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountOps;

    impl Pass for CountOps {
        fn name(&self) -> &'static str {
            "count_ops"
        }

        fn kind(&self) -> PassKind {
            PassKind::Analysis
        }

        fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
            properties.insert(dag.count_ops());
            Ok(())
        }
    }

    #[test]
    fn test_pass_kind() {
        let pass = CountOps;
        assert_eq!(pass.kind(), PassKind::Analysis);
        assert_eq!(pass.name(), "count_ops");
        assert!(pass.should_run(&CircuitDag::new(), &PropertySet::new()));
    }
}
