//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use qmap_compile::CouplingGraph;
use qmap_ir::CircuitDag;
use qmap_qasm2::ast::Program;
use qmap_qasm2::{DagBackend, JsonBackend, JsonCircuit, Unroller, parse_with_includes};

/// Basis used when none is given.
pub const DEFAULT_BASIS: &str = "u1,u2,u3,cx,id";

/// Output format of the unrolled circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// OpenQASM 2.0 text
    Qasm,
    /// Flat JSON instruction list
    Json,
}

/// A target device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    /// Directed couplings `{source: [targets]}` over `q[i]`.
    pub coupling_map: CouplingGraph,
    #[serde(default = "default_basis")]
    pub basis: Vec<String>,
}

fn default_basis() -> Vec<String> {
    DEFAULT_BASIS.split(',').map(String::from).collect()
}

/// Load a device from a YAML or JSON file, or build `linear:N`, `star:N`
/// or `full:N`.
pub fn load_device(device: &str) -> Result<Device> {
    if let Some((kind, size)) = device.split_once(':') {
        if !Path::new(device).exists() {
            let n: u32 = size
                .parse()
                .with_context(|| format!("Invalid device size: '{size}'"))?;
            let coupling_map = match kind {
                "linear" => CouplingGraph::linear(n),
                "star" => CouplingGraph::star(n),
                "full" => CouplingGraph::full(n),
                other => anyhow::bail!(
                    "Unknown device kind: '{other}'. Available: linear, star, full"
                ),
            };
            if !coupling_map.has_distances() {
                anyhow::bail!("Device '{device}' is not connected");
            }
            return Ok(Device {
                name: device.to_string(),
                coupling_map,
                basis: default_basis(),
            });
        }
    }

    debug!("Loading device file {device}");
    let source = read_file(device)?;
    let ext = Path::new(device)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&source)
            .with_context(|| format!("Failed to parse device file: {device}")),
        _ => serde_yaml_ng::from_str(&source)
            .with_context(|| format!("Failed to parse device file: {device}")),
    }
}

/// Read a file, failing with the path in the message.
pub fn read_file(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

/// Parse an OpenQASM 2.0 file. Includes resolve next to the file.
pub fn load_program(path: &str) -> Result<Program> {
    let source = read_file(path)?;
    let dir = Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let program =
        parse_with_includes(&source, |include| fs::read_to_string(dir.join(include)).ok())
            .with_context(|| format!("Failed to parse {path}"))?;
    debug!("Parsed {path}: {} statements", program.statements.len());
    Ok(program)
}

/// Unroll a file into a DAG over `basis`.
pub fn unroll_dag(path: &str, basis: &[String]) -> Result<CircuitDag> {
    let program = load_program(path)?;
    Unroller::new(DagBackend::new(basis.iter().cloned()))
        .execute(&program)
        .with_context(|| format!("Failed to unroll {path}"))
}

/// Unroll a file into the JSON instruction list over `basis`.
pub fn unroll_json(path: &str, basis: &[String]) -> Result<JsonCircuit> {
    let program = load_program(path)?;
    Unroller::new(JsonBackend::new(basis.iter().cloned()))
        .execute(&program)
        .with_context(|| format!("Failed to unroll {path}"))
}

/// Write to `output`, or stdout when absent.
pub fn write_output(content: &str, output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write file: {path}"))
        }
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
