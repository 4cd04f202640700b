//! Backend that builds the flat JSON instruction list.

use qmap_ir::Wire;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::GateFilter;
use crate::ast::GateDecl;
use crate::error::{UnrollError, UnrollResult};
use crate::unroller::UnrollerBackend;

/// Circuit as a flat list of instructions over global bit indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonCircuit {
    pub header: JsonHeader,
    pub operations: Vec<JsonOperation>,
}

/// Register layout of a [`JsonCircuit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonHeader {
    pub number_of_qubits: usize,
    pub number_of_clbits: usize,
    /// `[register, index]` for every qubit, in global index order.
    pub qubit_labels: Vec<(String, u32)>,
    /// `[register, size]` for every classical register.
    pub clbit_labels: Vec<(String, u32)>,
}

/// One instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonOperation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<f64>,
    pub qubits: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<JsonConditional>,
}

/// Classical condition over global bit indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonConditional {
    /// Always `"equals"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Hex mask selecting the bits of the condition register.
    pub mask: String,
    /// Hex value the register must equal.
    pub val: String,
}

/// Unroller backend producing a [`JsonCircuit`].
pub struct JsonBackend {
    circuit: JsonCircuit,
    filter: GateFilter,
    qubit_index: FxHashMap<Wire, usize>,
    clbit_index: FxHashMap<Wire, usize>,
    /// Global clbit indices of each classical register.
    creg_bits: FxHashMap<String, Vec<usize>>,
    condition: Option<JsonConditional>,
}

impl JsonBackend {
    /// Create a backend that keeps calls of `basis` gates whole.
    pub fn new<S: Into<String>>(basis: impl IntoIterator<Item = S>) -> Self {
        Self {
            circuit: JsonCircuit::default(),
            filter: GateFilter::new(basis),
            qubit_index: FxHashMap::default(),
            clbit_index: FxHashMap::default(),
            creg_bits: FxHashMap::default(),
            condition: None,
        }
    }

    fn qubit(&self, wire: &Wire) -> UnrollResult<usize> {
        self.qubit_index
            .get(wire)
            .copied()
            .ok_or_else(|| UnrollError::UndefinedRegister {
                name: wire.register.clone(),
                kind: "quantum",
            })
    }

    fn clbit(&self, wire: &Wire) -> UnrollResult<usize> {
        self.clbit_index
            .get(wire)
            .copied()
            .ok_or_else(|| UnrollError::UndefinedRegister {
                name: wire.register.clone(),
                kind: "classical",
            })
    }

    fn push(
        &mut self,
        name: &str,
        params: Vec<f64>,
        qubits: &[Wire],
        clbits: &[Wire],
    ) -> UnrollResult<()> {
        let qubits = qubits
            .iter()
            .map(|q| self.qubit(q))
            .collect::<UnrollResult<_>>()?;
        let clbits = clbits
            .iter()
            .map(|c| self.clbit(c))
            .collect::<UnrollResult<_>>()?;
        self.circuit.operations.push(JsonOperation {
            name: name.to_string(),
            params,
            qubits,
            clbits,
            conditional: self.condition.clone(),
        });
        Ok(())
    }
}

/// Hex string with bit `i` set for every `i` in `bits`, e.g. `0x6`.
fn hex_mask(bits: &[usize]) -> String {
    let Some(&top) = bits.iter().max() else {
        return "0x0".into();
    };
    let mut nibbles = vec![0u32; top / 4 + 1];
    for &bit in bits {
        nibbles[bit / 4] |= 1 << (bit % 4);
    }
    let digits: String = nibbles
        .iter()
        .rev()
        .filter_map(|&n| char::from_digit(n, 16))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    format!("0x{digits}")
}

impl UnrollerBackend for JsonBackend {
    type Output = JsonCircuit;

    fn new_qreg(&mut self, name: &str, size: u32) -> UnrollResult<()> {
        let header = &mut self.circuit.header;
        for i in 0..size {
            self.qubit_index
                .insert(Wire::new(name, i), header.number_of_qubits);
            header.number_of_qubits += 1;
            header.qubit_labels.push((name.to_string(), i));
        }
        Ok(())
    }

    fn new_creg(&mut self, name: &str, size: u32) -> UnrollResult<()> {
        let header = &mut self.circuit.header;
        let mut bits = Vec::with_capacity(size as usize);
        for i in 0..size {
            self.clbit_index
                .insert(Wire::new(name, i), header.number_of_clbits);
            bits.push(header.number_of_clbits);
            header.number_of_clbits += 1;
        }
        header.clbit_labels.push((name.to_string(), size));
        self.creg_bits.insert(name.to_string(), bits);
        Ok(())
    }

    fn define_gate(&mut self, gate: &GateDecl) -> UnrollResult<()> {
        self.filter.define(gate);
        Ok(())
    }

    fn u(&mut self, params: [f64; 3], qubit: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.push("U", params.to_vec(), std::slice::from_ref(qubit), &[])
    }

    fn cx(&mut self, control: &Wire, target: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.push("CX", vec![], &[control.clone(), target.clone()], &[])
    }

    fn measure(&mut self, qubit: &Wire, clbit: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.push(
            "measure",
            vec![],
            std::slice::from_ref(qubit),
            std::slice::from_ref(clbit),
        )
    }

    fn reset(&mut self, qubit: &Wire) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        self.push("reset", vec![], std::slice::from_ref(qubit), &[])
    }

    fn barrier(&mut self, qubits: &[Wire]) -> UnrollResult<()> {
        if !self.filter.is_listening() {
            return Ok(());
        }
        // Barriers never carry a condition.
        let condition = self.condition.take();
        let result = self.push("barrier", vec![], qubits, &[]);
        self.condition = condition;
        result
    }

    fn set_condition(&mut self, register: &str, value: u64) {
        let bits = self.creg_bits.get(register).map_or(&[][..], Vec::as_slice);
        self.condition = Some(JsonConditional {
            kind: "equals".into(),
            mask: hex_mask(bits),
            val: format!("0x{value:X}"),
        });
    }

    fn drop_condition(&mut self) {
        self.condition = None;
    }

    fn start_gate(&mut self, name: &str, params: &[f64], qubits: &[Wire]) -> UnrollResult<()> {
        if !self.filter.start(name)? {
            return Ok(());
        }
        self.push(name, params.to_vec(), qubits, &[])
    }

    fn end_gate(&mut self, name: &str) -> UnrollResult<()> {
        self.filter.end(name);
        Ok(())
    }

    fn finish(self) -> UnrollResult<JsonCircuit> {
        Ok(self.circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::unroller::Unroller;
    use serde_json::json;

    fn unroll(source: &str, basis: &[&str]) -> JsonCircuit {
        let program = parse(source).unwrap();
        Unroller::new(JsonBackend::new(basis.iter().copied()))
            .execute(&program)
            .unwrap()
    }

    #[test]
    fn test_hex_mask() {
        assert_eq!(hex_mask(&[]), "0x0");
        assert_eq!(hex_mask(&[0]), "0x1");
        assert_eq!(hex_mask(&[1, 2]), "0x6");
        assert_eq!(hex_mask(&[4, 5, 6, 7]), "0xF0");
        assert_eq!(hex_mask(&[64]), "0x10000000000000000");
    }

    #[test]
    fn test_header_and_operations() {
        let circuit = unroll(
            r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[1];
            qreg v[2];
            creg c[2];
            creg d[1];
            cx q[0], v[1];
            measure v[1] -> d[0];
            "#,
            &["cx"],
        );
        let value = serde_json::to_value(&circuit).unwrap();
        assert_eq!(
            value,
            json!({
                "header": {
                    "number_of_qubits": 3,
                    "number_of_clbits": 3,
                    "qubit_labels": [["q", 0], ["v", 0], ["v", 1]],
                    "clbit_labels": [["c", 2], ["d", 1]]
                },
                "operations": [
                    {"name": "cx", "qubits": [0, 2]},
                    {"name": "measure", "qubits": [2], "clbits": [2]}
                ]
            })
        );
    }

    #[test]
    fn test_conditional_mask() {
        let circuit = unroll(
            r"
            OPENQASM 2.0;
            qreg q[1];
            creg a[1];
            creg b[2];
            if(b==3) U(0,0,1) q[0];
            ",
            &[],
        );
        let op = &circuit.operations[0];
        assert_eq!(op.params, vec![0.0, 0.0, 1.0]);
        assert_eq!(
            op.conditional,
            Some(JsonConditional {
                kind: "equals".into(),
                mask: "0x6".into(),
                val: "0x3".into(),
            })
        );
        let value = serde_json::to_value(op).unwrap();
        assert_eq!(value["conditional"]["type"], "equals");
    }

    #[test]
    fn test_barrier_is_unconditioned() {
        let circuit = unroll(
            "OPENQASM 2.0;\nqreg q[2];\ncreg c[1];\ngate g a { barrier a; }\nif(c==1) g q[0];",
            &[],
        );
        assert_eq!(circuit.operations.len(), 1);
        assert_eq!(circuit.operations[0].name, "barrier");
        assert_eq!(circuit.operations[0].conditional, None);
    }

    #[test]
    fn test_deserialize_round_trip_fields() {
        let text = r#"{"header": {"number_of_qubits": 1, "number_of_clbits": 0,
            "qubit_labels": [["q", 0]], "clbit_labels": []},
            "operations": [{"name": "reset", "qubits": [0]}]}"#;
        let circuit: JsonCircuit = serde_json::from_str(text).unwrap();
        assert_eq!(circuit.operations[0].name, "reset");
        assert!(circuit.operations[0].params.is_empty());
    }
}
