//! fst-rateupgd - FST Rate Upgrade Manager Daemon
//!
//! Entry point for the rate upgrade daemon.

use anyhow::Context;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fst_mgr_common::ShellDriver;
use fst_rateupgd::{EventDispatcher, FstConfig, GroupEvent, RateUpgradeMgr, DEFAULT_CONFIG_PATH};

/// Depth of the inbound event queue
const EVENT_QUEUE_DEPTH: usize = 256;

/// FST rate upgrade manager
#[derive(Parser, Debug)]
#[command(name = "fst-rateupgd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Increase debugging verbosity (-dd for more)
    #[arg(short = 'd', long, action = ArgAction::Count)]
    debug: u8,
}

/// Initializes tracing; RUST_LOG overrides the -d level
fn init_logging(debug: u8) {
    let level = match debug {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("termination signal arrived");
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = FstConfig::load(&args.config)?;
    config.validate().context("FST configuration error")?;

    let driver = ShellDriver::new(config.driver.clone());
    let group_ids = config.group_ids();
    let mgr = RateUpgradeMgr::new(config, driver);

    // Keep the sender alive for the lifetime of the dispatcher; the
    // control channel feeds peer events through clones of it.
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH.max(group_ids.len()));
    for group in group_ids {
        events_tx
            .send(GroupEvent::GroupAdded { group })
            .await
            .context("event queue closed during startup")?;
    }

    let (mut mgr, stats) = EventDispatcher::new(mgr, events_rx)
        .run(shutdown_signal())
        .await;
    drop(events_tx);

    for group in mgr.group_names() {
        if let Err(e) = mgr.del_group(&group).await {
            warn!("Teardown of group {} incomplete: {}", group, e);
        }
    }
    mgr.shutdown();

    info!(
        processed = stats.processed,
        failed = stats.failed,
        "fst-rateupgd stopped"
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    info!("--- Starting fst-rateupgd ---");
    info!("Configuration: {}", args.config.display());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
