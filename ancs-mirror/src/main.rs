//! ANCS mirror
//!
//! Connects to a bonded iPhone, subscribes to its notification streams and
//! prints a summary (app, title, message) of every new notification.

mod config;
mod render;

use std::sync::Arc;
use std::time::Duration;

use ancs_client::{ble, AncsConnection, DispatcherConfig, Engine};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ancs-mirror")]
#[command(about = "Mirror iPhone notifications over ANCS")]
struct Cli {
    /// Bluetooth address of the phone (scans for ANCS when omitted)
    #[arg(short, long)]
    address: Option<String>,
    /// Save the connected device address for future runs
    #[arg(long)]
    remember_address: bool,
    /// Clear any saved address before connecting
    #[arg(long)]
    forget_address: bool,
    /// Scan duration in seconds
    #[arg(long, default_value = "5")]
    scan_secs: u64,
    /// Max title length requested from the phone
    #[arg(long, default_value = "64")]
    max_title_len: u16,
    /// Max message length requested from the phone
    #[arg(long, default_value = "256")]
    max_message_len: u16,
    /// Fetch attributes again when a notification is modified
    #[arg(long)]
    refetch_on_modified: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    if !cfg!(target_os = "linux") {
        warn!("intended for Linux/BlueZ; other platforms may not act as an ANCS central to an iPhone");
    }

    let address_file = config::address_file();
    if cli.forget_address {
        match config::clear_saved_address(&address_file) {
            Ok(true) => info!(path = %address_file.display(), "cleared saved address"),
            Ok(false) => {}
            Err(e) => warn!("failed to clear saved address: {e}"),
        }
    }

    let saved = config::load_saved_address(&address_file).unwrap_or_else(|e| {
        warn!("ignoring saved address: {e}");
        None
    });
    if cli.address.is_none() {
        if let Some(saved) = &saved {
            info!(address = %saved, "using saved address");
        }
    }
    let address = cli.address.clone().or(saved);

    let adapter = ble::get_adapter().await?;
    let phone = ble::find_device(&adapter, address.as_deref(), Duration::from_secs(cli.scan_secs)).await?;

    let (event_tx, event_rx) = mpsc::channel(64);
    let (output_tx, mut output_rx) = mpsc::channel(64);

    let connection = AncsConnection::connect(phone, event_tx.clone()).await?;

    if cli.remember_address {
        let address = connection.address();
        match config::save_address(&address_file, &address) {
            Ok(()) => info!(path = %address_file.display(), "saved address"),
            Err(e) => warn!("failed to save address: {e}"),
        }
    }

    let mut watcher = connection.watch_disconnect(&adapter, event_tx).await?;

    let dispatcher_config = DispatcherConfig {
        max_title_len: cli.max_title_len,
        max_message_len: cli.max_message_len,
        refetch_on_modified: cli.refetch_on_modified,
    };
    let engine = Engine::new(dispatcher_config, Arc::new(connection.control_point()), output_tx);
    let engine_task = tokio::spawn(engine.run(event_rx));

    let printer = tokio::spawn(async move {
        while let Some(output) = output_rx.recv().await {
            println!("{}", render::format_output(&output));
        }
    });

    println!("Waiting for notifications. Press Ctrl+C to exit.");
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("exiting on user request");
        }
        _ = &mut watcher => {
            warn!("phone disconnected");
        }
    }

    watcher.abort();
    if let Err(e) = connection.disconnect().await {
        warn!("disconnect failed: {e}");
    }

    let dispatcher = engine_task.await?;
    if !dispatcher.pending().is_empty() {
        info!(pending = dispatcher.pending().len(), "abandoned pending requests");
    }
    printer.await?;

    Ok(())
}
