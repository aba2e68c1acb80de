//! One reconciliation pass

use std::sync::Arc;

use clap::Args;
use cmdpal_engine::engine::RESTART_ACTION;

use super::PaletteArgs;
use crate::host::ConsoleHost;

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub palette: PaletteArgs,

    /// Accept the restart prompt when the manifest changes
    #[arg(long)]
    pub restart: bool,
}

pub async fn execute(args: ReconcileArgs) -> Result<(), Box<dyn std::error::Error>> {
    let answer = args.restart.then(|| RESTART_ACTION.to_string());
    let host = Arc::new(ConsoleHost::new(answer));
    let engine = args.palette.build(host)?;

    let report = engine.run_pass(false).await?;

    println!("Workspace: {}", report.scope_id);
    println!("Entries: {}", report.entries);
    if report.foreign_preserved > 0 {
        println!("Preserved from other workspaces: {}", report.foreign_preserved);
    }
    if report.retained > 0 {
        println!("Retained after load failures: {}", report.retained);
    }
    if report.written {
        println!("Manifest updated: {}", engine.options().manifest_path.display());
    } else {
        println!("Manifest up to date");
    }
    Ok(())
}
