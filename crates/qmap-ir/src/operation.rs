//! Operations, signatures and gate definitions.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire::Wire;

/// Gates defined by `qelib1.inc`.
///
/// These are never re-declared when a circuit is emitted with the
/// standard include.
pub const QELIB1_GATES: &[&str] = &[
    "u3", "u2", "u1", "cx", "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "rx", "ry", "rz",
    "cz", "cy", "ch", "ccx", "crz", "cu1", "cu3",
];

/// Built-in operations of OpenQASM 2.0.
pub const BUILTIN_OPS: &[&str] = &["U", "CX", "measure", "reset", "barrier"];

/// Classical condition attached to an operation: `if(register==value)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// Classical register compared against `value`.
    pub register: String,
    /// Integer value the register must equal.
    pub value: u64,
}

impl Condition {
    /// Create a new condition.
    pub fn new(register: impl Into<String>, value: u64) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if({}=={})", self.register, self.value)
    }
}

/// Signature of a basis element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Number of qubits. Ignored for variadic elements.
    pub num_qubits: usize,
    /// Number of classical bits.
    pub num_clbits: usize,
    /// Number of real parameters.
    pub num_params: usize,
    /// Accepts any non-zero number of qubits (`barrier`).
    pub variadic: bool,
}

impl Signature {
    /// Create a fixed-arity signature.
    pub const fn new(num_qubits: usize, num_clbits: usize, num_params: usize) -> Self {
        Self {
            num_qubits,
            num_clbits,
            num_params,
            variadic: false,
        }
    }

    /// Signature of `barrier`: one or more qubits, nothing else.
    pub const fn variadic() -> Self {
        Self {
            num_qubits: 0,
            num_clbits: 0,
            num_params: 0,
            variadic: true,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "(*, {}, {})", self.num_clbits, self.num_params)
        } else {
            write!(
                f,
                "({}, {}, {})",
                self.num_qubits, self.num_clbits, self.num_params
            )
        }
    }
}

/// A circuit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Basis element name.
    pub name: String,
    /// Real parameters.
    pub params: Vec<f64>,
    /// Qubit arguments.
    pub qubits: Vec<Wire>,
    /// Classical bit arguments.
    pub clbits: Vec<Wire>,
    /// Optional classical condition.
    pub condition: Option<Condition>,
}

impl Operation {
    /// Create an unparameterized operation on the given qubits.
    pub fn new(name: impl Into<String>, qubits: impl IntoIterator<Item = Wire>) -> Self {
        Self {
            name: name.into(),
            params: vec![],
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
            condition: None,
        }
    }

    /// Measurement of `qubit` into `clbit`.
    pub fn measure(qubit: Wire, clbit: Wire) -> Self {
        Self::new("measure", [qubit]).with_clbits([clbit])
    }

    /// Barrier across `qubits`.
    pub fn barrier(qubits: impl IntoIterator<Item = Wire>) -> Self {
        Self::new("barrier", qubits)
    }

    /// Set the parameters.
    #[must_use]
    pub fn with_params(mut self, params: impl IntoIterator<Item = f64>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    /// Set the classical bit arguments.
    #[must_use]
    pub fn with_clbits(mut self, clbits: impl IntoIterator<Item = Wire>) -> Self {
        self.clbits = clbits.into_iter().collect();
        self
    }

    /// Attach a condition.
    #[must_use]
    pub fn with_condition(mut self, register: impl Into<String>, value: u64) -> Self {
        self.condition = Some(Condition::new(register, value));
        self
    }

    /// Check if this is a barrier.
    #[inline]
    pub fn is_barrier(&self) -> bool {
        self.name == "barrier"
    }

    /// Qubits followed by classical bits.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.qubits.iter().chain(self.clbits.iter())
    }

    /// Compute the inverse for standard unitary gates.
    ///
    /// Returns `None` for non-unitary or unknown operations.
    pub fn inverse(&self) -> Option<Operation> {
        let gate = standard_gate(&self.name)?;
        if self.params.len() != gate.num_params {
            return None;
        }
        let (name, params) = match gate.inverse {
            InverseRule::SelfInverse => (self.name.clone(), self.params.clone()),
            InverseRule::Partner(other) => (other.to_string(), self.params.clone()),
            InverseRule::NegateParams => {
                (self.name.clone(), self.params.iter().map(|p| -p).collect())
            }
            InverseRule::EulerAngles => {
                let (theta, phi, lambda) = (self.params[0], self.params[1], self.params[2]);
                (self.name.clone(), vec![-theta, -lambda, -phi])
            }
            InverseRule::HalfTurn => {
                let (phi, lambda) = (self.params[0], self.params[1]);
                ("u3".to_string(), vec![-FRAC_PI_2, -lambda, -phi])
            }
        };
        Some(Operation {
            name,
            params,
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
            condition: self.condition.clone(),
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(condition) = &self.condition {
            write!(f, "{condition} ")?;
        }
        write!(f, "{}", format_call(self, self.qubits.iter().map(ToString::to_string)))
    }
}

/// Format an operation as a QASM statement without its condition.
///
/// `qubits` are the rendered qubit arguments; classical bits are printed as-is.
pub(crate) fn format_call(op: &Operation, qubits: impl Iterator<Item = String>) -> String {
    let qubits = qubits.collect::<Vec<_>>().join(",");
    if op.name == "measure" && !op.clbits.is_empty() {
        let clbits = op
            .clbits
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        return format!("measure {qubits}->{clbits};");
    }
    if op.params.is_empty() {
        format!("{} {qubits};", op.name)
    } else {
        let params = op
            .params
            .iter()
            .map(|p| format!("{p}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({params}) {qubits};", op.name)
    }
}

/// How a standard gate is inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InverseRule {
    /// The gate is its own inverse.
    SelfInverse,
    /// Inverse is another named gate with the same parameters.
    Partner(&'static str),
    /// Negate every parameter.
    NegateParams,
    /// `(θ, φ, λ) -> (-θ, -λ, -φ)`.
    EulerAngles,
    /// `u2(φ, λ) -> u3(-π/2, -λ, -φ)`.
    HalfTurn,
}

/// Arity and inversion data for a standard gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardGate {
    /// Gate name.
    pub name: &'static str,
    /// Number of qubits.
    pub num_qubits: usize,
    /// Number of parameters.
    pub num_params: usize,
    inverse: InverseRule,
}

const fn std_gate(
    name: &'static str,
    num_qubits: usize,
    num_params: usize,
    inverse: InverseRule,
) -> StandardGate {
    StandardGate {
        name,
        num_qubits,
        num_params,
        inverse,
    }
}

static STANDARD_GATES: &[StandardGate] = &[
    std_gate("U", 1, 3, InverseRule::EulerAngles),
    std_gate("CX", 2, 0, InverseRule::SelfInverse),
    std_gate("u3", 1, 3, InverseRule::EulerAngles),
    std_gate("u2", 1, 2, InverseRule::HalfTurn),
    std_gate("u1", 1, 1, InverseRule::NegateParams),
    std_gate("cx", 2, 0, InverseRule::SelfInverse),
    std_gate("id", 1, 0, InverseRule::SelfInverse),
    std_gate("x", 1, 0, InverseRule::SelfInverse),
    std_gate("y", 1, 0, InverseRule::SelfInverse),
    std_gate("z", 1, 0, InverseRule::SelfInverse),
    std_gate("h", 1, 0, InverseRule::SelfInverse),
    std_gate("s", 1, 0, InverseRule::Partner("sdg")),
    std_gate("sdg", 1, 0, InverseRule::Partner("s")),
    std_gate("t", 1, 0, InverseRule::Partner("tdg")),
    std_gate("tdg", 1, 0, InverseRule::Partner("t")),
    std_gate("rx", 1, 1, InverseRule::NegateParams),
    std_gate("ry", 1, 1, InverseRule::NegateParams),
    std_gate("rz", 1, 1, InverseRule::NegateParams),
    std_gate("cz", 2, 0, InverseRule::SelfInverse),
    std_gate("cy", 2, 0, InverseRule::SelfInverse),
    std_gate("ch", 2, 0, InverseRule::SelfInverse),
    std_gate("swap", 2, 0, InverseRule::SelfInverse),
    std_gate("ccx", 3, 0, InverseRule::SelfInverse),
    std_gate("crz", 2, 1, InverseRule::NegateParams),
    std_gate("cu1", 2, 1, InverseRule::NegateParams),
    std_gate("cu3", 2, 3, InverseRule::EulerAngles),
];

/// Look up a standard gate by name.
pub fn standard_gate(name: &str) -> Option<&'static StandardGate> {
    STANDARD_GATES.iter().find(|g| g.name == name)
}

/// QASM definition of a gate used as a basis element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDefinition {
    /// Gate name.
    pub name: String,
    /// Formal parameter names.
    pub params: Vec<String>,
    /// Formal qubit names.
    pub qubits: Vec<String>,
    /// Body statements, `None` for opaque gates.
    pub body: Option<Vec<String>>,
}

impl GateDefinition {
    /// Create a gate definition with a body.
    pub fn new(
        name: impl Into<String>,
        params: impl IntoIterator<Item = String>,
        qubits: impl IntoIterator<Item = String>,
        body: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().collect(),
            qubits: qubits.into_iter().collect(),
            body: Some(body.into_iter().collect()),
        }
    }

    /// Check if the gate is opaque.
    pub fn is_opaque(&self) -> bool {
        self.body.is_none()
    }

    /// Definition of `swap` in terms of `cx`.
    pub fn swap() -> Self {
        Self::new(
            "swap",
            [],
            ["a".to_string(), "b".to_string()],
            [
                "cx a,b;".to_string(),
                "cx b,a;".to_string(),
                "cx a,b;".to_string(),
            ],
        )
    }

    /// Render the definition as QASM.
    pub fn qasm(&self) -> String {
        let mut out = if self.is_opaque() {
            format!("opaque {}", self.name)
        } else {
            format!("gate {}", self.name)
        };
        if !self.params.is_empty() {
            out.push_str(&format!("({})", self.params.join(",")));
        }
        out.push(' ');
        out.push_str(&self.qubits.join(","));
        match &self.body {
            None => out.push(';'),
            Some(body) => {
                out.push_str("\n{\n");
                for statement in body {
                    out.push_str("  ");
                    out.push_str(statement);
                    out.push('\n');
                }
                out.push('}');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(i: u32) -> Wire {
        Wire::new("q", i)
    }

    #[test]
    fn test_operation_display() {
        let op = Operation::new("u3", [q(0)]).with_params([0.5, 0.0, 1.5]);
        assert_eq!(op.to_string(), "u3(0.5,0,1.5) q[0];");

        let cx = Operation::new("cx", [q(0), q(1)]).with_condition("c", 3);
        assert_eq!(cx.to_string(), "if(c==3) cx q[0],q[1];");

        let m = Operation::measure(q(1), Wire::new("c", 0));
        assert_eq!(m.to_string(), "measure q[1]->c[0];");
    }

    #[test]
    fn test_inverse_rules() {
        let s = Operation::new("s", [q(0)]);
        assert_eq!(s.inverse().unwrap().name, "sdg");

        let rz = Operation::new("rz", [q(0)]).with_params([0.25]);
        assert_eq!(rz.inverse().unwrap().params, vec![-0.25]);

        let u3 = Operation::new("u3", [q(0)]).with_params([0.1, 0.2, 0.3]);
        assert_eq!(u3.inverse().unwrap().params, vec![-0.1, -0.3, -0.2]);

        let u2 = Operation::new("u2", [q(0)]).with_params([0.2, 0.3]);
        let inv = u2.inverse().unwrap();
        assert_eq!(inv.name, "u3");
        assert_eq!(inv.params, vec![-FRAC_PI_2, -0.3, -0.2]);

        assert!(Operation::measure(q(0), Wire::new("c", 0)).inverse().is_none());
    }

    #[test]
    fn test_inverse_rejects_wrong_param_count() {
        let rz = Operation::new("rz", [q(0)]);
        assert!(rz.inverse().is_none());
    }

    #[test]
    fn test_gate_definition_qasm() {
        assert_eq!(
            GateDefinition::swap().qasm(),
            "gate swap a,b\n{\n  cx a,b;\n  cx b,a;\n  cx a,b;\n}"
        );
        let opaque = GateDefinition {
            name: "magic".into(),
            params: vec!["theta".into()],
            qubits: vec!["a".into()],
            body: None,
        };
        assert_eq!(opaque.qasm(), "opaque magic(theta) a;");
    }

    #[test]
    fn test_standard_gate_lookup() {
        let ccx = standard_gate("ccx").unwrap();
        assert_eq!(ccx.num_qubits, 3);
        assert!(standard_gate("nope").is_none());
    }
}
