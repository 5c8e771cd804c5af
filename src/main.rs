#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
mod executor;
mod structures;

use std::{process::ExitCode, time::Duration};

use argh::FromArgs;
use tokio::select;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::executor::Options;

#[macro_use]
extern crate tracing;

/// Ping Minecraft Java Edition servers and report their status.
///
/// Every server is pinged concurrently. The exit status is non-zero if any
/// server could not be reached.
#[derive(FromArgs)]
struct Args {
    /// seconds to wait for each server before giving up
    #[argh(option, default = "5")]
    timeout: u64,
    /// print one JSON object per server
    #[argh(switch)]
    json: bool,
    /// skip SRV lookups for addresses given without a port
    #[argh(switch)]
    no_srv: bool,
    /// server addresses, as `host` or `host:port`
    #[argh(positional)]
    servers: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    start_tracing();
    let args: Args = argh::from_env();
    if args.servers.is_empty() {
        eprintln!("`mcstatus` requires at least one server address.");
        return ExitCode::FAILURE;
    }

    let options = Options {
        timeout: Duration::from_secs(args.timeout),
        srv: !args.no_srv,
    };
    info!(servers = args.servers.len(), ?options, "pinging servers");

    #[allow(clippy::redundant_pub_crate)]
    let reports = select! {
        reports = executor::poll_all(args.servers, options) => reports,
        _ = vss::shutdown_signal() => {
            warn!("interrupted, abandoning outstanding pings");
            return ExitCode::FAILURE;
        }
    };

    for report in &reports {
        if args.json {
            match serde_json::to_string(report) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(error = %e, address = %report.address, "could not serialize report"),
            }
        } else {
            println!("{report}");
        }
    }

    let offline = reports.iter().filter(|report| !report.online).count();
    info!(online = reports.len() - offline, offline, "done");
    if offline == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Log directives used when `LOG` is unset or unparseable.
const DEFAULT_LOG: &str = concat!(env!("CARGO_PKG_NAME"), "=info,slping=info");

fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG))
}

fn start_tracing() {
    let env_filter = log_filter(std::env::var("LOG").ok().as_deref());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(env_filter)
        .init();
}
