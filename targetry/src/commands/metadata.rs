// targetry/src/commands/metadata.rs
//
// USE CASE: Show the template-safe projection of a profile target.

use crate::cli::TargetArgs;

pub fn execute(args: TargetArgs) -> anyhow::Result<()> {
    let resolved = super::resolve(&args)?;
    println!("{}", serde_json::to_string_pretty(&resolved.metadata())?);
    Ok(())
}
