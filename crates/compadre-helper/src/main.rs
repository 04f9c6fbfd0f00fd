//! COMPADRE helper - relatedness socket server for the pedigree pipeline.
//!
//! Loads the segment file once, prints a ready banner on stdout, then answers
//! one request per connection until a `close` request or a termination
//! signal arrives.

mod console;

use anyhow::Result;
use clap::Parser;
use compadre_core::{load_segment_file, BridgeSettings, CompadreServer, ErsaBridge, ServerSettings};
use console::{Printed, SafeStdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "compadre-helper")]
#[command(about = "Serve ERSA relatedness estimates over a local socket")]
struct Args {
    /// Segment match file (annotated 7-column or germline 6-column)
    match_file: PathBuf,

    /// Port to listen on
    port: u16,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    // Logs go to stderr; stdout is read by the calling pipeline.
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

async fn run(args: Args) -> Result<()> {
    let settings = ServerSettings::from_env(&args.match_file, args.port);
    let mut stdout = SafeStdout::stdout();

    info!("Loading segments from {}", settings.match_file.display());
    let index = match load_segment_file(&settings.match_file) {
        Ok(index) => index,
        Err(e) if e.is_fatal() => {
            stdout.println(&e.to_string())?;
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    let ibd2_count = index.ibd2_count();

    let estimator = Arc::new(ErsaBridge::deploy(BridgeSettings::from_env())?);
    let listener = CompadreServer::<ErsaBridge>::bind(&settings).await?;
    let server = CompadreServer::new(Arc::new(index), estimator, &settings.match_file);

    // The pipeline waits for this exact line before sending requests.
    let banner = format!("COMPADRE helper socket is ready. Total IBD2 pairs: {ibd2_count}");
    if stdout.println(&banner)? == Printed::PipeClosed {
        info!("Stdout reader closed, exiting");
        return Ok(());
    }

    tokio::select! {
        served = server.serve(listener) => {
            served?;
            info!("Server closed");
        }
        signal = shutdown_signal() => {
            info!("{} received, exiting", signal?);
        }
    }

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "Ctrl-C")
}
