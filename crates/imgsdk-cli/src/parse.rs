//! Parse command: validate a spec and print the canonical form.

use anyhow::Context;

/// Parse a command spec and print it as canonical JSON.
pub fn execute(spec: &str) -> anyhow::Result<()> {
    let command = imgsdk_core::command::parse(spec).context("command spec rejected")?;
    let canonical =
        serde_json::to_string_pretty(&command).context("failed to serialize command")?;
    println!("{canonical}");
    Ok(())
}
