//! Parser for `OpenQASM` 2.0.

use tracing::debug;

use crate::ast::{
    Argument, BinOp, Expression, Function, GateDecl, Program, QuantumOp, Statement,
};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};
use crate::qelib1::QELIB1_INC;

/// Parse a QASM2 source string into a [`Program`].
///
/// Only `include "qelib1.inc";` can be resolved; any other include fails
/// with [`ParseError::IncludeNotFound`].
pub fn parse(source: &str) -> ParseResult<Program> {
    parse_with_includes(source, |_| None)
}

/// Parse a QASM2 source string, resolving includes with `resolver`.
///
/// `qelib1.inc` always resolves to the embedded copy. Included files are
/// spliced in place of the `include` statement and carry no header.
pub fn parse_with_includes(
    source: &str,
    resolver: impl Fn(&str) -> Option<String>,
) -> ParseResult<Program> {
    let mut includes = Includes {
        resolver: &resolver,
        stack: vec![],
    };
    let mut parser = Parser::new(source)?;
    parser.parse_program(&mut includes)
}

/// Include resolution state.
struct Includes<'a> {
    resolver: &'a dyn Fn(&str) -> Option<String>,
    /// Files currently being expanded.
    stack: Vec<String>,
}

impl Includes<'_> {
    fn expand(&mut self, path: &str) -> ParseResult<Vec<Statement>> {
        if self.stack.iter().any(|p| p == path) {
            return Err(ParseError::RecursiveInclude(path.to_string()));
        }
        let source = if path == "qelib1.inc" {
            QELIB1_INC.to_string()
        } else {
            (self.resolver)(path).ok_or_else(|| ParseError::IncludeNotFound(path.to_string()))?
        };
        debug!("Expanding include {path}");

        self.stack.push(path.to_string());
        let mut parser = Parser::new(&source)?;
        let statements = parser.parse_statements(self);
        self.stack.pop();
        statements
    }
}

/// Parser state.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

#[allow(clippy::cast_possible_truncation)]
impl Parser {
    /// Create a new parser from source.
    fn new(source: &str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((line, message)) => return Err(ParseError::LexerError { line, message }),
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    /// Check if we've reached the end.
    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Line of the current token, or of the last one at end of input.
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(1, |t| t.line)
    }

    /// Peek at the current token.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    fn unexpected(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let line = self.line();
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(ParseError::UnexpectedToken {
                line,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Check if current token matches.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse the header and all statements.
    fn parse_program(&mut self, includes: &mut Includes<'_>) -> ParseResult<Program> {
        self.expect(Token::OpenQasm)?;
        let version = self.parse_version()?;
        self.expect(Token::Semicolon)?;

        let statements = self.parse_statements(includes)?;
        Ok(Program {
            version,
            statements,
        })
    }

    /// Parse version number. Only 2.0 is accepted.
    fn parse_version(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::RealLiteral(v)) if v == 2.0 => Ok("2.0".into()),
            Some(Token::IntLiteral(2)) => Ok("2.0".into()),
            Some(other) => Err(ParseError::InvalidVersion(other.to_string())),
            None => Err(ParseError::UnexpectedEof("version number".into())),
        }
    }

    /// Parse statements until end of input, expanding includes.
    fn parse_statements(&mut self, includes: &mut Includes<'_>) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            if self.consume(&Token::Include) {
                let path = self.parse_string()?;
                self.expect(Token::Semicolon)?;
                statements.extend(includes.expand(&path)?);
            } else {
                statements.push(self.parse_statement()?);
            }
        }
        Ok(statements)
    }

    /// Parse a statement.
    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Qreg | Token::Creg => self.parse_register_decl(),
            Token::Gate | Token::Opaque => self.parse_gate_decl(),
            Token::If => self.parse_if(),
            Token::Barrier => self.parse_barrier(),
            Token::GateU
            | Token::GateCX
            | Token::Measure
            | Token::Reset
            | Token::Identifier(_) => Ok(Statement::Op(self.parse_quantum_op()?)),
            _ => Err(self.unexpected("statement", &token)),
        }
    }

    /// Parse `qreg name[n];` or `creg name[n];`.
    fn parse_register_decl(&mut self) -> ParseResult<Statement> {
        let quantum = self.check(&Token::Qreg);
        self.advance();
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.parse_int_literal()? as u32;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        Ok(if quantum {
            Statement::QregDecl { name, size }
        } else {
            Statement::CregDecl { name, size }
        })
    }

    /// Parse a gate definition or opaque declaration.
    fn parse_gate_decl(&mut self) -> ParseResult<Statement> {
        let opaque = self.check(&Token::Opaque);
        self.advance();
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let params = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(Token::RParen)?;
            params
        } else {
            vec![]
        };
        let qubits = self.parse_identifier_list()?;

        let body = if opaque {
            self.expect(Token::Semicolon)?;
            None
        } else {
            Some(self.parse_gate_body(&name)?)
        };

        Ok(Statement::GateDecl(GateDecl {
            name,
            params,
            qubits,
            body,
        }))
    }

    /// Parse `{ ... }` of a gate definition.
    fn parse_gate_body(&mut self, gate: &str) -> ParseResult<Vec<Statement>> {
        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.consume(&Token::RBrace) {
            let line = self.line();
            let invalid = |reason: &str| ParseError::InvalidGateBody {
                gate: gate.to_string(),
                line,
                reason: reason.to_string(),
            };

            let statement = match self.peek().cloned() {
                None => return Err(ParseError::UnexpectedEof(format!("end of gate {gate}"))),
                Some(Token::Barrier) => self.parse_barrier()?,
                Some(Token::GateU | Token::GateCX | Token::Identifier(_)) => {
                    Statement::Op(self.parse_quantum_op()?)
                }
                Some(other) => return Err(invalid(&format!("unexpected '{other}'"))),
            };
            let args: Vec<&Argument> = match &statement {
                Statement::Op(QuantumOp::U { target, .. }) => vec![target],
                Statement::Op(QuantumOp::CX { control, target }) => vec![control, target],
                Statement::Op(QuantumOp::Call { args, .. }) | Statement::Barrier(args) => {
                    args.iter().collect()
                }
                _ => vec![],
            };
            if let Some(arg) = args.iter().find(|a| a.index.is_some()) {
                return Err(invalid(&format!("indexed argument {arg}")));
            }
            body.push(statement);
        }
        Ok(body)
    }

    /// Parse `if(creg==value) op`.
    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let register = self.parse_identifier()?;
        self.expect(Token::EqEq)?;
        let value = self.parse_int_literal()?;
        self.expect(Token::RParen)?;
        let op = self.parse_quantum_op()?;
        Ok(Statement::If {
            register,
            value,
            op,
        })
    }

    /// Parse `barrier a, b[0];`.
    fn parse_barrier(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Barrier)?;
        let args = self.parse_argument_list()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Barrier(args))
    }

    /// Parse a quantum operation, including its terminating `;`.
    fn parse_quantum_op(&mut self) -> ParseResult<QuantumOp> {
        let token = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("quantum operation".into()))?;

        let op = match token {
            Token::GateU => {
                self.expect(Token::LParen)?;
                let params = self.parse_expression_list()?;
                self.expect(Token::RParen)?;
                let target = self.parse_argument()?;
                QuantumOp::U { params, target }
            }
            Token::GateCX => {
                let control = self.parse_argument()?;
                self.expect(Token::Comma)?;
                let target = self.parse_argument()?;
                QuantumOp::CX { control, target }
            }
            Token::Measure => {
                let qubit = self.parse_argument()?;
                self.expect(Token::Arrow)?;
                let clbit = self.parse_argument()?;
                QuantumOp::Measure { qubit, clbit }
            }
            Token::Reset => QuantumOp::Reset(self.parse_argument()?),
            Token::Identifier(name) => {
                let params = if self.consume(&Token::LParen) {
                    let params = self.parse_expression_list()?;
                    self.expect(Token::RParen)?;
                    params
                } else {
                    vec![]
                };
                let args = self.parse_argument_list()?;
                QuantumOp::Call { name, params, args }
            }
            other => return Err(self.unexpected("quantum operation", &other)),
        };
        self.expect(Token::Semicolon)?;
        Ok(op)
    }

    /// Parse `name` or `name[index]`.
    fn parse_argument(&mut self) -> ParseResult<Argument> {
        let name = self.parse_identifier()?;
        if self.consume(&Token::LBracket) {
            let index = self.parse_int_literal()? as u32;
            self.expect(Token::RBracket)?;
            Ok(Argument::indexed(name, index))
        } else {
            Ok(Argument::id(name))
        }
    }

    /// Parse a comma-separated argument list.
    fn parse_argument_list(&mut self) -> ParseResult<Vec<Argument>> {
        let mut args = vec![self.parse_argument()?];
        while self.consume(&Token::Comma) {
            args.push(self.parse_argument()?);
        }
        Ok(args)
    }

    /// Parse an expression.
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_expr(0)
    }

    /// Parse binary expression with precedence climbing.
    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op_precedence(op);
            if prec < min_prec {
                break;
            }
            self.advance(); // consume operator

            // `^` is right-associative
            let next = if op == BinOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next)?;
            left = Expression::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse unary expression.
    fn parse_unary_expr(&mut self) -> ParseResult<Expression> {
        if self.consume(&Token::Minus) {
            let expr = self.parse_unary_expr()?;
            return Ok(Expression::Neg(Box::new(expr)));
        }
        self.parse_primary_expr()
    }

    /// Parse primary expression.
    fn parse_primary_expr(&mut self) -> ParseResult<Expression> {
        let token = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("expression".into()))?;

        match token {
            Token::IntLiteral(v) => Ok(Expression::Int(v)),
            Token::RealLiteral(v) => Ok(Expression::Real(v)),
            Token::Pi => Ok(Expression::Pi),
            Token::Identifier(name) => {
                if !self.consume(&Token::LParen) {
                    return Ok(Expression::Identifier(name));
                }
                let func = Function::from_name(&name).ok_or_else(|| ParseError::UnexpectedToken {
                    line: self.line(),
                    expected: "one of sin, cos, tan, exp, ln, sqrt".into(),
                    found: name.clone(),
                })?;
                let arg = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(Expression::FnCall {
                    func,
                    arg: Box::new(arg),
                })
            }
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(Expression::Paren(Box::new(expr)))
            }
            other => Err(self.unexpected("expression", &other)),
        }
    }

    /// Peek at binary operator.
    fn peek_binary_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Caret => Some(BinOp::Pow),
            _ => None,
        }
    }

    /// Parse expression list.
    fn parse_expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        if self.check(&Token::RParen) {
            return Ok(vec![]);
        }
        let mut exprs = vec![self.parse_expression()?];
        while self.consume(&Token::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    /// Parse identifier list.
    fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }

    /// Parse an identifier.
    fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(self.unexpected("identifier", &other)),
            None => Err(ParseError::UnexpectedEof("identifier".into())),
        }
    }

    /// Parse a string literal.
    fn parse_string(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::StringLiteral(s)) => Ok(s),
            Some(other) => Err(self.unexpected("string literal", &other)),
            None => Err(ParseError::UnexpectedEof("string literal".into())),
        }
    }

    /// Parse an integer literal.
    fn parse_int_literal(&mut self) -> ParseResult<u64> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(other) => Err(self.unexpected("integer", &other)),
            None => Err(ParseError::UnexpectedEof("integer".into())),
        }
    }
}

/// Get operator precedence.
fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => 1,
        BinOp::Mul | BinOp::Div => 2,
        BinOp::Pow => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_parse_bell_state() {
        let source = r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[2];
            creg c[2];
            h q[0];
            cx q[0],q[1];
            measure q -> c;
        "#;

        let program = parse(source).unwrap();
        assert_eq!(program.version, "2.0");
        let user: Vec<_> = program
            .statements
            .iter()
            .filter(|s| !matches!(s, Statement::GateDecl(_)))
            .collect();
        assert_eq!(user.len(), 5);
        assert_eq!(
            *user[0],
            Statement::QregDecl {
                name: "q".into(),
                size: 2
            }
        );
        assert_eq!(user[4].to_string(), "measure q -> c;");
    }

    #[test]
    fn test_qelib1_is_expanded() {
        let program = parse("OPENQASM 2.0;\ninclude \"qelib1.inc\";").unwrap();
        let names: Vec<&str> = program
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::GateDecl(decl) => Some(decl.name.as_str()),
                _ => None,
            })
            .collect();
        for gate in ["u3", "u2", "u1", "cx", "id", "h", "ccx", "cu3"] {
            assert!(names.contains(&gate), "missing {gate}");
        }
    }

    #[test]
    fn test_parse_parameters() {
        let source = "OPENQASM 2.0;\nqreg q[1];\nU(pi/2, -pi^2/4, sqrt(2)*0.5) q[0];";
        let program = parse(source).unwrap();
        let Statement::Op(QuantumOp::U { params, .. }) = &program.statements[1] else {
            panic!("expected U");
        };
        let values: Vec<f64> = params.iter().map(|p| p.as_f64().unwrap()).collect();
        assert!((values[0] - PI / 2.0).abs() < 1e-12);
        assert!((values[1] - PI * PI / 4.0).abs() < 1e-12);
        assert!((values[2] - 2f64.sqrt() / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_power_is_right_associative() {
        let program = parse("OPENQASM 2.0;\nqreg q[1];\nU(2^3^2,0,0) q[0];").unwrap();
        let Statement::Op(QuantumOp::U { params, .. }) = &program.statements[1] else {
            panic!("expected U");
        };
        assert_eq!(params[0].as_f64(), Some(512.0));
    }

    #[test]
    fn test_parse_gate_definition() {
        let source = r"
            OPENQASM 2.0;
            gate rot(theta, phi) a, b { U(theta, phi, 0) a; CX a, b; barrier a, b; }
            opaque magic(x) a;
            gate post q { }
        ";
        let program = parse(source).unwrap();
        let Statement::GateDecl(rot) = &program.statements[0] else {
            panic!("expected gate");
        };
        assert_eq!(rot.params, vec!["theta", "phi"]);
        assert_eq!(rot.qubits, vec!["a", "b"]);
        assert_eq!(rot.body.as_ref().unwrap().len(), 3);

        let Statement::GateDecl(magic) = &program.statements[1] else {
            panic!("expected opaque");
        };
        assert!(magic.is_opaque());

        let Statement::GateDecl(post) = &program.statements[2] else {
            panic!("expected gate");
        };
        assert_eq!(post.body, Some(vec![]));
    }

    #[test]
    fn test_indexed_argument_in_body_is_rejected() {
        let source = "OPENQASM 2.0;\ngate g a { CX a[0], a; }";
        assert!(matches!(
            parse(source),
            Err(ParseError::InvalidGateBody { ref gate, line: 2, .. }) if gate == "g"
        ));
    }

    #[test]
    fn test_measure_in_body_is_rejected() {
        let source = "OPENQASM 2.0;\ngate g a { measure a -> a; }";
        assert!(matches!(
            parse(source),
            Err(ParseError::InvalidGateBody { .. })
        ));
    }

    #[test]
    fn test_parse_if() {
        let source = "OPENQASM 2.0;\nqreg q[1];\ncreg c[1];\nif(c==1) U(0,0,pi) q[0];";
        let program = parse(source).unwrap();
        assert_eq!(
            program.statements[2].to_string(),
            "if(c==1) U(0,0,pi) q[0];"
        );
    }

    #[test]
    fn test_invalid_version() {
        assert!(matches!(
            parse("OPENQASM 3.0;"),
            Err(ParseError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("OPENQASM 2.0;\nqreg q[1]\nqreg r[1];").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { line: 3, .. }));
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(
            parse("OPENQASM 2.0;\nqreg q["),
            Err(ParseError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_custom_include() {
        let source = "OPENQASM 2.0;\ninclude \"mine.inc\";\nqreg q[1];";
        let program = parse_with_includes(source, |path| {
            (path == "mine.inc").then(|| "gate nop a { }".to_string())
        })
        .unwrap();
        assert!(matches!(&program.statements[0], Statement::GateDecl(d) if d.name == "nop"));

        assert!(matches!(
            parse(source),
            Err(ParseError::IncludeNotFound(ref p)) if p == "mine.inc"
        ));
    }

    #[test]
    fn test_recursive_include() {
        let source = "OPENQASM 2.0;\ninclude \"loop.inc\";";
        let result = parse_with_includes(source, |_| Some("include \"loop.inc\";".to_string()));
        assert!(matches!(result, Err(ParseError::RecursiveInclude(_))));
    }
}
