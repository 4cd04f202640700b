//! Coupling command implementation.

use anyhow::Result;
use console::style;

use super::common::load_device;

/// Execute the coupling command.
pub fn execute(device: &str) -> Result<()> {
    let device = load_device(device)?;
    let coupling = &device.coupling_map;

    println!(
        "{} {} ({} qubits)",
        style("Device").cyan().bold(),
        style(&device.name).bold(),
        coupling.size()
    );
    println!("  Basis: {}", device.basis.join(", "));
    println!("  Edges:");
    for (source, target) in coupling.edges() {
        println!("    {} -> {}", style(source).green(), style(target).green());
    }

    let qubits = coupling.qubits();
    println!("\n  Distances:");
    let header: String = qubits.iter().map(|q| format!("{:>6}", q.to_string())).collect();
    println!("  {:>6}{header}", "");
    for a in qubits {
        let mut row = format!("  {:>6}", a.to_string());
        for b in qubits {
            row.push_str(&format!("{:>6}", coupling.distance(a, b)?));
        }
        println!("{row}");
    }
    Ok(())
}
