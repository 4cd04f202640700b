//! Wires and registers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A quantum or classical bit slot, addressed as `register[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Wire {
    /// Name of the register this wire belongs to.
    pub register: String,
    /// Index within the register.
    pub index: u32,
}

impl Wire {
    /// Create a new wire.
    pub fn new(register: impl Into<String>, index: u32) -> Self {
        Self {
            register: register.into(),
            index,
        }
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}

impl From<(&str, u32)> for Wire {
    fn from((register, index): (&str, u32)) -> Self {
        Self::new(register, index)
    }
}

/// Kind of a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireKind {
    /// A qubit.
    Quantum,
    /// A classical bit.
    Classical,
}

impl fmt::Display for WireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireKind::Quantum => write!(f, "quantum"),
            WireKind::Classical => write!(f, "classical"),
        }
    }
}

/// A named register of wires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    /// Register name.
    pub name: String,
    /// Number of wires.
    pub size: u32,
    /// Kind of every wire in the register.
    pub kind: WireKind,
}

impl Register {
    /// Create a quantum register.
    pub fn quantum(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            kind: WireKind::Quantum,
        }
    }

    /// Create a classical register.
    pub fn classical(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            kind: WireKind::Classical,
        }
    }

    /// Iterate over the wires of the register.
    pub fn wires(&self) -> impl Iterator<Item = Wire> + '_ {
        (0..self.size).map(|i| Wire::new(self.name.clone(), i))
    }
}
