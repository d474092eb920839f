use crate::error::Result;
use slabscope::workflows::registry;
use std::fmt::Write;

/// Formats the registered analyses as an aligned two-column table.
fn render() -> String {
    let entries = registry::entries();
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    let mut out = String::from("Available analyses:\n");
    for entry in entries {
        let _ = writeln!(out, "  {:<width$}  {}", entry.name, entry.description());
    }
    out
}

pub fn run() -> Result<()> {
    print!("{}", render());
    Ok(())
}
