//! kforward CLI
//!
//! Opens one port forward per `-f` argument, prints the assigned local
//! ports and keeps the forwards running until Ctrl+C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kf_core::ForwardRequest;
use kf_orchestrator::with_forwarders;
use kforward::forward_spec::parse_forward_spec;
use kforward::output::{
    format_forwards, format_forwards_json, forward_entries, print_error, print_info,
    print_success, print_warning,
};

#[derive(Parser)]
#[command(name = "kforward")]
#[command(author, version, about = "Forward local ports to pods and services")]
struct Cli {
    /// Path to the cluster configuration file
    #[arg(short, long, env = "KFORWARD_CLUSTER")]
    cluster: Option<PathBuf>,

    /// Port forward to open; may be repeated
    #[arg(
        short = 'f',
        long = "forward",
        value_name = "LOCATOR[=[LOCAL:]REMOTE]",
        required = true,
        value_parser = parse_forward_spec
    )]
    forwards: Vec<ForwardRequest>,

    /// Print the forwarded ports as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log level when not verbose (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => cli.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    tracing::info!("Opening {} port forward(s)", cli.forwards.len());
    let cancel = CancellationToken::new();
    let session = with_forwarders(cancel, cli.forwards, cli.cluster.as_deref())
        .await
        .context("Failed to open port forwards")?;

    let ports = match session.ready().await {
        Ok(ports) => ports,
        Err(e) => {
            session.close();
            print_error(&format!("Port forward did not become ready: {}", e));
            return Err(e).context("Port forward did not become ready");
        }
    };

    tracing::debug!("All {} tunnel(s) ready", ports.len());
    let entries = forward_entries(&session.targets(), &ports);
    if cli.json {
        println!("{}", format_forwards_json(&entries)?);
    } else {
        println!("{}", format_forwards(&entries));
        print_success(&format!(
            "Forwarding {} port(s); press Ctrl+C to stop",
            entries.len()
        ));
    }

    match session.wait().await {
        Ok(()) => {
            if !cli.json {
                print_info("Port forwards closed");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Port forward failed: {}", e);
            print_warning("Closing remaining port forwards");
            print_error(&format!("Port forward failed: {}", e));
            Err(e).context("Port forward failed")
        }
    }
}
