// targetry/src/commands/strategy.rs
//
// USE CASE: Default incremental strategy of a profile target.

use targetry_core::domain::IncrementalKind;

use crate::cli::TargetArgs;

pub fn execute(args: TargetArgs, kind: IncrementalKind) -> anyhow::Result<()> {
    let resolved = super::resolve(&args)?;
    println!("{}", resolved.config.default_incremental_strategy(kind));
    Ok(())
}
