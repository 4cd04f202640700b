//! Abstract Syntax Tree for `OpenQASM` 2.0.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A complete QASM2 program with includes expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// QASM version (always "2.0").
    pub version: String,
    /// Statements in the program.
    pub statements: Vec<Statement>,
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Quantum register declaration: `qreg q[n];`
    QregDecl { name: String, size: u32 },

    /// Classical register declaration: `creg c[n];`
    CregDecl { name: String, size: u32 },

    /// Gate definition, or opaque declaration when `body` is `None`.
    GateDecl(GateDecl),

    /// A quantum operation.
    Op(QuantumOp),

    /// Conditioned operation: `if(c==n) op;`
    If {
        register: String,
        value: u64,
        op: QuantumOp,
    },

    /// Barrier: `barrier q, r[0];`
    Barrier(Vec<Argument>),
}

/// A gate definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecl {
    pub name: String,
    /// Formal parameter names.
    pub params: Vec<String>,
    /// Formal qubit names.
    pub qubits: Vec<String>,
    /// Body statements, `None` for opaque gates.
    ///
    /// Only [`Statement::Op`] with unitary operations and
    /// [`Statement::Barrier`] over formal qubits appear here.
    pub body: Option<Vec<Statement>>,
}

impl GateDecl {
    /// Check if the gate is opaque.
    pub fn is_opaque(&self) -> bool {
        self.body.is_none()
    }

    /// Convert to the definition recorded in a circuit.
    pub fn to_definition(&self) -> qmap_ir::GateDefinition {
        qmap_ir::GateDefinition {
            name: self.name.clone(),
            params: self.params.clone(),
            qubits: self.qubits.clone(),
            body: self
                .body
                .as_ref()
                .map(|body| body.iter().map(ToString::to_string).collect()),
        }
    }
}

/// A quantum operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantumOp {
    /// Built-in single-qubit gate: `U(theta,phi,lambda) q;`
    U {
        params: Vec<Expression>,
        target: Argument,
    },

    /// Built-in CNOT: `CX c,t;`
    CX { control: Argument, target: Argument },

    /// Call of a defined gate.
    Call {
        name: String,
        params: Vec<Expression>,
        args: Vec<Argument>,
    },

    /// Measurement: `measure q -> c;`
    Measure { qubit: Argument, clbit: Argument },

    /// Reset: `reset q;`
    Reset(Argument),
}

/// A register, register element, or gate-local qubit name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub index: Option<u32>,
}

impl Argument {
    /// Reference to a single register element.
    pub fn indexed(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }

    /// Reference to a whole register, or a gate-local name.
    pub fn id(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }
}

/// A real-valued parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Integer literal.
    Int(u64),
    /// Real literal.
    Real(f64),
    /// Pi constant.
    Pi,
    /// Formal parameter of the enclosing gate.
    Identifier(String),
    /// Negation.
    Neg(Box<Expression>),
    /// Binary operation.
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    /// Unary function call: `sin(x)`.
    FnCall {
        func: Function,
        arg: Box<Expression>,
    },
    /// Parenthesized expression.
    Paren(Box<Expression>),
}

impl Expression {
    /// Evaluate the expression, resolving identifiers with `lookup`.
    ///
    /// Returns the first identifier `lookup` cannot resolve as the error.
    #[allow(clippy::cast_precision_loss)]
    pub fn eval<'a>(&'a self, lookup: &impl Fn(&str) -> Option<f64>) -> Result<f64, &'a str> {
        Ok(match self {
            Expression::Int(v) => *v as f64,
            Expression::Real(v) => *v,
            Expression::Pi => std::f64::consts::PI,
            Expression::Identifier(name) => lookup(name).ok_or(name.as_str())?,
            Expression::Neg(e) => -e.eval(lookup)?,
            Expression::BinOp { left, op, right } => {
                let l = left.eval(lookup)?;
                let r = right.eval(lookup)?;
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => l.powf(r),
                }
            }
            Expression::FnCall { func, arg } => func.apply(arg.eval(lookup)?),
            Expression::Paren(e) => e.eval(lookup)?,
        })
    }

    /// Evaluate an expression without free identifiers.
    pub fn as_f64(&self) -> Option<f64> {
        self.eval(&|_| None).ok()
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        }
    }
}

/// Built-in unary functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
}

impl Function {
    /// Look up a function by its QASM name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "exp" => Function::Exp,
            "ln" => Function::Ln,
            "sqrt" => Function::Sqrt,
            _ => return None,
        })
    }

    /// QASM name of the function.
    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Exp => "exp",
            Function::Ln => "ln",
            Function::Sqrt => "sqrt",
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Exp => x.exp(),
            Function::Ln => x.ln(),
            Function::Sqrt => x.sqrt(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Int(v) => write!(f, "{v}"),
            Expression::Real(v) => write!(f, "{v}"),
            Expression::Pi => write!(f, "pi"),
            Expression::Identifier(name) => write!(f, "{name}"),
            Expression::Neg(e) => write!(f, "-{e}"),
            Expression::BinOp { left, op, right } => write!(f, "{left}{}{right}", op.symbol()),
            Expression::FnCall { func, arg } => write!(f, "{}({arg})", func.name()),
            Expression::Paren(e) => write!(f, "({e})"),
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for QuantumOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantumOp::U { params, target } => write!(f, "U({}) {target};", join(params)),
            QuantumOp::CX { control, target } => write!(f, "CX {control},{target};"),
            QuantumOp::Call { name, params, args } if params.is_empty() => {
                write!(f, "{name} {};", join(args))
            }
            QuantumOp::Call { name, params, args } => {
                write!(f, "{name}({}) {};", join(params), join(args))
            }
            QuantumOp::Measure { qubit, clbit } => write!(f, "measure {qubit} -> {clbit};"),
            QuantumOp::Reset(target) => write!(f, "reset {target};"),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::QregDecl { name, size } => write!(f, "qreg {name}[{size}];"),
            Statement::CregDecl { name, size } => write!(f, "creg {name}[{size}];"),
            Statement::GateDecl(decl) => write!(f, "{}", decl.to_definition().qasm()),
            Statement::Op(op) => write!(f, "{op}"),
            Statement::If {
                register,
                value,
                op,
            } => write!(f, "if({register}=={value}) {op}"),
            Statement::Barrier(args) => write!(f, "barrier {};", join(args)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_expression_eval() {
        let expr = Expression::BinOp {
            left: Box::new(Expression::Pi),
            op: BinOp::Div,
            right: Box::new(Expression::Int(2)),
        };

        let result = expr.as_f64().unwrap();
        assert!((result - PI / 2.0).abs() < 1e-10);
        assert_eq!(expr.to_string(), "pi/2");
    }

    #[test]
    fn test_expression_with_locals() {
        let expr = Expression::FnCall {
            func: Function::Cos,
            arg: Box::new(Expression::Neg(Box::new(Expression::Identifier(
                "theta".into(),
            )))),
        };
        let value = expr
            .eval(&|name| (name == "theta").then_some(PI))
            .unwrap();
        assert!((value + 1.0).abs() < 1e-12);
        assert_eq!(expr.as_f64(), None);
        assert_eq!(expr.eval(&|_| None), Err("theta"));
    }

    #[test]
    fn test_op_display() {
        let op = QuantumOp::Call {
            name: "u2".into(),
            params: vec![Expression::Int(0), Expression::Pi],
            args: vec![Argument::id("a")],
        };
        assert_eq!(op.to_string(), "u2(0,pi) a;");

        let measure = QuantumOp::Measure {
            qubit: Argument::indexed("q", 0),
            clbit: Argument::indexed("c", 0),
        };
        assert_eq!(measure.to_string(), "measure q[0] -> c[0];");
    }

    #[test]
    fn test_gate_decl_to_definition() {
        let decl = GateDecl {
            name: "bell".into(),
            params: vec![],
            qubits: vec!["a".into(), "b".into()],
            body: Some(vec![
                Statement::Op(QuantumOp::Call {
                    name: "h".into(),
                    params: vec![],
                    args: vec![Argument::id("a")],
                }),
                Statement::Op(QuantumOp::CX {
                    control: Argument::id("a"),
                    target: Argument::id("b"),
                }),
            ]),
        };
        let definition = decl.to_definition();
        assert_eq!(definition.body.unwrap(), vec!["h a;", "CX a,b;"]);
        assert!(!decl.is_opaque());
    }
}
