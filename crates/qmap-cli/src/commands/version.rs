//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - OpenQASM 2.0 unrolling and qubit mapping",
        style("qmap").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qmap-ir       Wire-labeled graph and circuit DAG");
    println!("  qmap-qasm2    OpenQASM 2.0 parser and unroller");
    println!("  qmap-compile  Coupling graphs, SWAP and direction mapping");
    println!("  qmap-cli      Command-line interface");
    println!();
    println!("License: {}", style("Apache-2.0").dim());
}
