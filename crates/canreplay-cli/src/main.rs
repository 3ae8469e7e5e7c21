//! canreplay: replays a captured CAN log over an SLCAN serial adapter.
//!
//! Feeds the frames from a vendor CSV capture onto a physical bus with
//! the original inter-frame spacing, so downstream listeners see
//! traffic indistinguishable from a live vehicle.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use canreplay_core::replay::{CancelToken, ReplayDriver, ReplayOutcome, ReplaySummary};
use canreplay_core::transport::{
    list_ports, SlcanTransport, TransportConfig, DEFAULT_BAUD_RATE, DEFAULT_BITRATE,
};

/// Exit status for an operator interrupt (128 + SIGINT).
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "canreplay",
    version,
    about = "Replays a captured CAN log over an SLCAN serial adapter"
)]
struct Args {
    /// Path to the capture CSV log
    #[arg(required_unless_present = "list_ports")]
    logfile: Option<PathBuf>,

    /// Serial port the SLCAN adapter registers as (e.g. /dev/ttyACM0)
    #[arg(required_unless_present = "list_ports")]
    port: Option<String>,

    /// CAN bus bitrate
    #[arg(long, default_value_t = DEFAULT_BITRATE)]
    bitrate: u32,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Print the end-of-run summary as JSON
    #[arg(long)]
    json: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list_ports {
        for port in list_ports() {
            match (port.vid, port.pid) {
                (Some(vid), Some(pid)) => println!(
                    "{}  [{:04x}:{:04x}] {}",
                    port.name,
                    vid,
                    pid,
                    port.product.as_deref().unwrap_or("")
                ),
                _ => println!("{}", port.name),
            }
        }
        return ExitCode::SUCCESS;
    }

    // clap guarantees both are present when --list-ports is absent
    let (Some(logfile), Some(port)) = (args.logfile.clone(), args.port.clone()) else {
        return ExitCode::FAILURE;
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    match replay(logfile, port, &args, cancel).await {
        Ok(summary) => {
            report(&summary, args.json);
            match summary.outcome {
                ReplayOutcome::Completed => ExitCode::SUCCESS,
                ReplayOutcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
                ReplayOutcome::TransportFailed => ExitCode::FAILURE,
            }
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn replay(
    logfile: PathBuf,
    port: String,
    args: &Args,
    cancel: CancelToken,
) -> anyhow::Result<ReplaySummary> {
    let file = File::open(&logfile)
        .with_context(|| format!("cannot open log file {}", logfile.display()))?;

    let config = TransportConfig {
        port_name: port,
        baud_rate: args.baud,
        bitrate: args.bitrate,
        ..Default::default()
    };

    // The replay loop is a single sequential blocking thread; only the
    // interrupt listener runs alongside it.
    let summary = tokio::task::spawn_blocking(move || {
        let mut driver = ReplayDriver::new(SlcanTransport::new(config), cancel);
        driver.run(BufReader::new(file))
    })
    .await
    .context("replay thread panicked")??;

    Ok(summary)
}

fn report(summary: &ReplaySummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(out) => println!("{out}"),
            Err(e) => error!(%e, "failed to serialize summary"),
        }
    } else {
        println!(
            "{}: {} frames sent, {} rejected",
            summary.outcome, summary.frames_sent, summary.frames_rejected
        );
    }
}
