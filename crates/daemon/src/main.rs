use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fuser::MountOption;
use tokio::runtime::Runtime;
use tracing_subscriber::{fmt, EnvFilter};

use common::Mount;
use gateway::S3Gateway;
use silo_daemon::cli::Cli;
use silo_daemon::fuse::SiloFs;

fn init_tracing(debug: bool) {
    // -d raises everything to debug; otherwise RUST_LOG decides.
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let runtime = Runtime::new().context("failed to start async runtime")?;
    let gateway = runtime.block_on(S3Gateway::from_env(cli.bucket.clone()));
    let mount = Mount::new(Arc::new(gateway));
    let fs = SiloFs::new(runtime, mount);

    tracing::info!(bucket = %cli.bucket, mountpoint = %cli.mountpoint.display(), "mounting");
    let options = [MountOption::FSName("silo".to_owned()), MountOption::AutoUnmount];
    fuser::mount2(fs, &cli.mountpoint, &options)
        .with_context(|| format!("failed to mount {}", cli.mountpoint.display()))?;
    Ok(())
}
