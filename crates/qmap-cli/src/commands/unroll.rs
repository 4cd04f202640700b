//! Unroll command implementation.

use anyhow::{Context, Result};
use console::style;

use super::common::{OutputFormat, unroll_dag, unroll_json, write_output};

/// Execute the unroll command.
pub fn execute(
    input: &str,
    basis: &[String],
    format: OutputFormat,
    output: Option<&str>,
) -> Result<()> {
    eprintln!(
        "{} Unrolling {} into [{}]",
        style("→").cyan().bold(),
        style(input).green(),
        style(basis.join(",")).yellow()
    );

    let content = match format {
        OutputFormat::Qasm => {
            let dag = unroll_dag(input, basis)?;
            eprintln!(
                "  Result: {} qubits, depth {}, {} ops",
                dag.qubits().len(),
                dag.depth()?,
                dag.size()
            );
            dag.qasm()?
        }
        OutputFormat::Json => {
            let circuit = unroll_json(input, basis)?;
            eprintln!(
                "  Result: {} qubits, {} clbits, {} ops",
                circuit.header.number_of_qubits,
                circuit.header.number_of_clbits,
                circuit.operations.len()
            );
            let mut json = serde_json::to_string_pretty(&circuit)
                .context("Failed to serialize circuit")?;
            json.push('\n');
            json
        }
    };

    write_output(&content, output)?;
    if let Some(path) = output {
        eprintln!("  Output: {}", style(path).green());
    }
    Ok(())
}
