//! Print manifest entries

use std::path::PathBuf;

use clap::Args;
use cmdpal_core::model::Ownership;
use cmdpal_store::ManifestFile;

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value = "package.json")]
    pub manifest: PathBuf,

    /// Print entries as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_, entries) = ManifestFile::new(&args.manifest).read_entries()?;

    if args.json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "command": entry.id(),
                    "title": entry.command.title,
                    "when": entry.visibility.when,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }
    for entry in &entries {
        let owner = match entry.ownership() {
            Ownership::Global => "global".to_string(),
            Ownership::Workspace(id) => format!("workspace {}", id),
        };
        println!("{}\t{}\t[{}]", entry.id(), entry.command.title, owner);
    }
    Ok(())
}
