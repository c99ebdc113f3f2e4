//! Schema command - print the JSON schema used for structured extraction.

use clap::Args;

use invex_core::schema::{to_json_schema, INVOICE_SCHEMA};

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    /// Print on a single line
    #[arg(long)]
    compact: bool,
}

pub fn run(args: SchemaArgs) -> anyhow::Result<()> {
    let schema = to_json_schema(&INVOICE_SCHEMA);
    let output = if args.compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };
    println!("{}", output);
    Ok(())
}
