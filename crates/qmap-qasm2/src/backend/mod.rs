//! Unroller backends.
//!
//! - [`DagBackend`] builds a [`qmap_ir::CircuitDag`]
//! - [`JsonBackend`] builds the flat JSON instruction list

mod dag;
mod json;

pub use dag::DagBackend;
pub use json::{JsonBackend, JsonCircuit, JsonConditional, JsonHeader, JsonOperation};

use rustc_hash::FxHashSet;

use crate::ast::GateDecl;
use crate::error::{UnrollError, UnrollResult};

/// Tracks which gate calls a backend emits.
///
/// While listening, a call of a basis gate is emitted whole and everything
/// nested in it is ignored until the matching end. Calls of other gates are
/// expanded, which fails for opaque gates.
#[derive(Debug, Clone)]
pub struct GateFilter {
    basis: Vec<String>,
    opaque: FxHashSet<String>,
    listening: bool,
    in_gate: Option<String>,
}

impl GateFilter {
    /// Create a filter for the given basis gate names.
    pub fn new<S: Into<String>>(basis: impl IntoIterator<Item = S>) -> Self {
        Self {
            basis: basis.into_iter().map(Into::into).collect(),
            opaque: FxHashSet::default(),
            listening: true,
            in_gate: None,
        }
    }

    /// Record a gate declaration.
    pub fn define(&mut self, gate: &GateDecl) {
        if gate.is_opaque() {
            self.opaque.insert(gate.name.clone());
        } else {
            self.opaque.remove(&gate.name);
        }
    }

    /// Check if `name` is a basis gate.
    pub fn in_basis(&self, name: &str) -> bool {
        self.basis.iter().any(|b| b == name)
    }

    /// Check if operations are currently emitted.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Enter a gate call. Returns `true` if the call is emitted whole.
    pub fn start(&mut self, name: &str) -> UnrollResult<bool> {
        if !self.listening {
            return Ok(false);
        }
        if self.in_basis(name) {
            self.listening = false;
            self.in_gate = Some(name.to_string());
            return Ok(true);
        }
        if self.opaque.contains(name) {
            return Err(UnrollError::OpaqueNotSupported(name.to_string()));
        }
        Ok(false)
    }

    /// Leave a gate call.
    pub fn end(&mut self, name: &str) {
        if self.in_gate.as_deref() == Some(name) {
            self.in_gate = None;
            self.listening = true;
        }
    }
}
