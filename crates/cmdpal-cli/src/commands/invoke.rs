//! Run a namespaced command the way the palette would

use std::sync::Arc;

use clap::Args;
use cmdpal_core::naming::{namespaced_id, NAMESPACE};

use super::PaletteArgs;
use crate::host::ConsoleHost;

#[derive(Debug, Args)]
pub struct InvokeArgs {
    #[command(flatten)]
    pub palette: PaletteArgs,

    /// Command id, with or without the `command-palette.` prefix
    pub command: String,
}

pub async fn execute(args: InvokeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let host = Arc::new(ConsoleHost::new(None));
    let engine = args.palette.build(host.clone())?;
    engine.activate().await?;

    let id = if args.command.starts_with(&format!("{}.", NAMESPACE)) {
        args.command
    } else {
        namespaced_id(&args.command)
    };
    let result = host.invoke(&id).await;
    engine.deactivate();
    result?;
    Ok(())
}
