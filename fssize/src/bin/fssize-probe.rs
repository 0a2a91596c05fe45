//! fssize-probe — run the `vfs.fs.size.master` item outside the host

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use fssize::config::{self, ModuleConfig};
use fssize::{logging, ITEM_KEY};

#[derive(Parser, Debug)]
#[command(name = "fssize-probe", version, about = "Print the filesystem size report for a path")]
struct Args {
    /// Mount path to report on
    #[arg(default_value = "/")]
    path: PathBuf,

    /// Decimals for FS_PFREE / FS_PUSED (overrides the config file)
    #[arg(long)]
    precision: Option<usize>,

    /// Module config file to read instead of the default lookup
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<ModuleConfig> {
    match &args.config {
        Some(path) => Ok(config::load_from(path)?
            .with_context(|| format!("config file {} does not exist", path.display()))?),
        None => Ok(config::load()?.0),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    logging::init(&config.log).context("Failed to initialise logging")?;

    let precision = args
        .precision
        .unwrap_or_else(|| config.report.effective_precision());
    debug!("{ITEM_KEY}[{}] precision={precision}", args.path.display());

    let json = fssize::collect(&[Some(args.path.as_os_str())], precision)
        .with_context(|| format!("{ITEM_KEY}[{}] failed", args.path.display()))?;
    println!("{json}");
    Ok(())
}
