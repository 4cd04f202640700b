//! `PropertySet` and related types for pass communication.
//!
//! During mapping, passes share information through the [`PropertySet`]:
//! - **Swap mapping** reads the coupling graph and options, and writes the
//!   layout it settled on
//! - **Direction mapping** reads the coupling graph
//!
//! # Examples
//!
//! ```
//! use qmap_compile::{CouplingGraph, PropertySet};
//!
//! let props = PropertySet::new()
//!     .with_coupling(CouplingGraph::linear(5))
//!     .with_trials(40)
//!     .with_seed(7);
//!
//! assert!(props.coupling.is_some());
//! assert_eq!(props.options.trials, 40);
//! assert_eq!(props.options.seed, Some(7));
//! ```

use std::any::{Any, TypeId};
use std::collections::BTreeMap;

use qmap_ir::Wire;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::coupling::CouplingGraph;

/// A bijection from logical (circuit) qubits to physical (device) qubits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    logical_to_physical: FxHashMap<Wire, Wire>,
    physical_to_logical: FxHashMap<Wire, Wire>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `logical[i]` to `physical[i]` pairwise.
    pub fn trivial<'a>(
        logical: impl IntoIterator<Item = &'a Wire>,
        physical: impl IntoIterator<Item = &'a Wire>,
    ) -> Self {
        let mut layout = Self::new();
        for (l, p) in logical.into_iter().zip(physical) {
            layout.add(l.clone(), p.clone());
        }
        layout
    }

    /// Add a mapping from logical to physical qubit.
    ///
    /// Conflicting entries in either direction are removed first so both
    /// maps stay consistent.
    pub fn add(&mut self, logical: Wire, physical: Wire) {
        if let Some(old_logical) = self.physical_to_logical.remove(&physical) {
            self.logical_to_physical.remove(&old_logical);
        }
        if let Some(old_physical) = self.logical_to_physical.remove(&logical) {
            self.physical_to_logical.remove(&old_physical);
        }
        self.logical_to_physical.insert(logical.clone(), physical.clone());
        self.physical_to_logical.insert(physical, logical);
    }

    /// Get the physical qubit for a logical qubit.
    pub fn get_physical(&self, logical: &Wire) -> Option<&Wire> {
        self.logical_to_physical.get(logical)
    }

    /// Get the logical qubit for a physical qubit.
    pub fn get_logical(&self, physical: &Wire) -> Option<&Wire> {
        self.physical_to_logical.get(physical)
    }

    /// Swap the contents of two physical qubits.
    pub fn swap(&mut self, p1: &Wire, p2: &Wire) {
        let l1 = self.physical_to_logical.remove(p1);
        let l2 = self.physical_to_logical.remove(p2);

        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1.clone(), p2.clone());
            self.physical_to_logical.insert(p2.clone(), l1);
        }
        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2.clone(), p1.clone());
            self.physical_to_logical.insert(p1.clone(), l2);
        }
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Physical qubits in use.
    pub fn physical_qubits(&self) -> impl Iterator<Item = &Wire> + '_ {
        self.physical_to_logical.keys()
    }

    /// (logical, physical) pairs ordered by logical qubit.
    pub fn to_map(&self) -> BTreeMap<Wire, Wire> {
        self.logical_to_physical
            .iter()
            .map(|(l, p)| (l.clone(), p.clone()))
            .collect()
    }
}

impl FromIterator<(Wire, Wire)> for Layout {
    fn from_iter<I: IntoIterator<Item = (Wire, Wire)>>(iter: I) -> Self {
        let mut layout = Self::new();
        for (l, p) in iter {
            layout.add(l, p);
        }
        layout
    }
}

/// Layout after the last layer of a mapped circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalLayout(pub Layout);

/// Number of SWAPs expanded into `cx` gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapCount(pub usize);

/// Options for the randomized SWAP search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    /// Randomized trials per layer.
    pub trials: usize,
    /// Seed for reproducible runs. Drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            trials: 20,
            seed: None,
        }
    }
}

impl MappingOptions {
    /// Generator for the trial jitter.
    pub fn rng(&self) -> Pcg64Mcg {
        match self.seed {
            Some(seed) => Pcg64Mcg::seed_from_u64(seed),
            None => Pcg64Mcg::from_entropy(),
        }
    }
}

/// Properties shared between compilation passes.
///
/// Standard properties have dedicated public fields. Passes can store other
/// data with the type-keyed [`insert`](Self::insert) and [`get`](Self::get);
/// each type holds at most one value.
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Target coupling graph.
    ///
    /// Should be set before running mapping passes.
    pub coupling: Option<CouplingGraph>,

    /// Logical-to-physical layout.
    ///
    /// Read as the initial layout by swap mapping, which replaces it with
    /// the layout the mapped circuit starts from.
    pub layout: Option<Layout>,

    /// Options for the randomized search.
    pub options: MappingOptions,

    /// Custom properties storage (type-erased).
    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coupling graph.
    #[must_use]
    pub fn with_coupling(mut self, coupling: CouplingGraph) -> Self {
        self.coupling = Some(coupling);
        self
    }

    /// Set the initial layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set the number of trials per layer.
    #[must_use]
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.options.trials = trials;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Insert a custom property.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable custom property.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove a custom property.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn q(i: u32) -> Wire {
        Wire::new("q", i)
    }

    fn v(i: u32) -> Wire {
        Wire::new("v", i)
    }

    #[test]
    fn test_layout_trivial() {
        let layout = Layout::trivial(&[v(0), v(1)], &[q(3), q(4), q(5)]);
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.get_physical(&v(1)), Some(&q(4)));
        assert_eq!(layout.get_logical(&q(3)), Some(&v(0)));
        assert_eq!(layout.get_logical(&q(5)), None);
    }

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(&[v(0), v(1), v(2)], &[q(0), q(1), q(2)]);
        layout.swap(&q(0), &q(2));
        assert_eq!(layout.get_physical(&v(0)), Some(&q(2)));
        assert_eq!(layout.get_physical(&v(2)), Some(&q(0)));
        assert_eq!(layout.get_logical(&q(0)), Some(&v(2)));
    }

    #[test]
    fn test_layout_swap_with_free_qubit() {
        let mut layout = Layout::trivial(&[v(0)], &[q(0)]);
        layout.swap(&q(0), &q(1));
        assert_eq!(layout.get_physical(&v(0)), Some(&q(1)));
        assert_eq!(layout.get_logical(&q(0)), None);
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn test_layout_add_keeps_bijection() {
        let mut layout = Layout::trivial(&[v(0), v(1)], &[q(0), q(1)]);
        layout.add(v(0), q(1));
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get_logical(&q(1)), Some(&v(0)));
        assert_eq!(layout.get_physical(&v(1)), None);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let options = MappingOptions {
            trials: 1,
            seed: Some(11),
        };
        let a: u64 = options.rng().r#gen();
        let b: u64 = options.rng().r#gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: MappingOptions = serde_json::from_str(r#"{"seed": 3}"#).unwrap();
        assert_eq!(options.trials, 20);
        assert_eq!(options.seed, Some(3));
    }

    #[test]
    #[allow(clippy::items_after_statements)]
    fn test_property_set_custom() {
        let mut props = PropertySet::new();

        #[derive(Debug, PartialEq)]
        struct CustomData(i32);

        props.insert(CustomData(42));
        assert_eq!(props.get::<CustomData>(), Some(&CustomData(42)));

        let removed = props.remove::<CustomData>();
        assert_eq!(removed, Some(CustomData(42)));
        assert_eq!(props.get::<CustomData>(), None);
    }
}
