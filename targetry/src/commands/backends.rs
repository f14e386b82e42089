// targetry/src/commands/backends.rs
//
// USE CASE: List every accepted `type` with the backend it selects.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use semver::Version;

use targetry_core::domain::registry::{backend_for, supported_types};

pub fn execute(dbt_version: Version) -> anyhow::Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["type", "backend", "dialect", "relation", "column", "quoting"]);

    for tag in supported_types() {
        let Some(backend) = backend_for(tag) else {
            continue;
        };
        let capabilities = backend.capabilities(&dbt_version);
        let quoting = if backend.quote_policy().identifier {
            "quoted"
        } else {
            "unquoted"
        };
        table.add_row(vec![
            tag.to_string(),
            backend.to_string(),
            backend.dialect().to_string(),
            capabilities.relation.to_string(),
            capabilities.column.to_string(),
            quoting.to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}
