//! Map command implementation.

use anyhow::Result;
use console::style;

use qmap_compile::{FinalLayout, Layout, PassManagerBuilder, SwapCount};

use super::common::{load_device, unroll_dag, write_output};

/// Execute the map command.
pub fn execute(
    input: &str,
    device: &str,
    trials: usize,
    seed: Option<u64>,
    output: Option<&str>,
) -> Result<()> {
    let device = load_device(device)?;
    if !device.basis.iter().any(|g| g == "cx") {
        anyhow::bail!("Device '{}' has no cx in its basis", device.name);
    }
    eprintln!(
        "{} Mapping {} onto {} ({} qubits)",
        style("→").cyan().bold(),
        style(input).green(),
        style(&device.name).yellow(),
        device.coupling_map.size()
    );

    let mut dag = unroll_dag(input, &device.basis)?;
    eprintln!(
        "  Loaded: {} qubits, depth {}, {} ops",
        dag.qubits().len(),
        dag.depth()?,
        dag.size()
    );

    let mut builder = PassManagerBuilder::new()
        .with_coupling(device.coupling_map.clone())
        .with_trials(trials);
    if let Some(seed) = seed {
        builder = builder.with_seed(seed);
    }
    let (pm, mut props) = builder.build();
    eprintln!("  Running {} passes ({trials} trials per layer)", pm.len());
    pm.run(&mut dag, &mut props)?;

    let swaps = props.get::<SwapCount>().map_or(0, |SwapCount(n)| *n);
    eprintln!("{} Mapping complete", style("✓").green().bold());
    eprintln!(
        "  Result: depth {}, {} ops, {} swaps",
        dag.depth()?,
        dag.size(),
        swaps
    );
    if let Some(layout) = &props.layout {
        eprintln!("  Initial layout: {}", format_layout(layout));
    }
    if let Some(FinalLayout(layout)) = props.get::<FinalLayout>() {
        eprintln!("  Final layout:   {}", format_layout(layout));
    }

    write_output(&dag.qasm()?, output)?;
    if let Some(path) = output {
        eprintln!("  Output: {}", style(path).green());
    }
    Ok(())
}

fn format_layout(layout: &Layout) -> String {
    layout
        .to_map()
        .iter()
        .map(|(logical, physical)| format!("{logical}->{physical}"))
        .collect::<Vec<_>>()
        .join(" ")
}
