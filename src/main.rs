//! # WirelessPrint CLI
//!
//! Command-line interface for sending g-code to WirelessPrint printers.
//!
//! ## Usage
//!
//! ```bash
//! # Upload a job
//! wireless-print send --address 192.0.2.5 benchy.gcode
//!
//! # Upload under a different name
//! wireless-print send --address 192.0.2.5 --name calibration.3mf cube.gcode
//!
//! # Run a fake printer that stores uploads
//! wireless-print receive --listen 0.0.0.0:8080 --storage ./received
//!
//! # Show how a printer would be registered
//! wireless-print info --address 192.0.2.5 --property name=Prusa
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use wireless_print::{
    WirelessPrintError,
    config::{DEFAULT_UPLOAD_CHUNK_SIZE, SessionConfig},
    device::{DEFAULT_PORT, DeviceProperties, PrinterDevice},
    job::FileJob,
    logging,
    receiver::{self, ReceiverConfig},
    transfer::{TransferEvent, TransferSession},
};

/// WirelessPrint - send g-code to network printers
#[derive(Parser, Debug)]
#[command(name = "wireless-print")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a g-code file to a printer
    Send {
        /// G-code file to upload
        file: PathBuf,

        /// Printer address (host, optionally with :port)
        #[arg(long)]
        address: String,

        /// Printer key shown in messages
        #[arg(long, default_value = "wirelessprint")]
        key: String,

        /// Suggested file name (extension is replaced with .gcode)
        #[arg(long)]
        name: Option<String>,

        /// Upload chunk size in bytes
        #[arg(long, default_value_t = DEFAULT_UPLOAD_CHUNK_SIZE)]
        chunk_size: usize,

        /// Whole-request timeout in seconds (0 disables)
        #[arg(long, default_value = "0")]
        timeout: u64,
    },

    /// Run a printer-side receiver that stores uploaded jobs
    Receive {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Directory to store jobs in
        #[arg(long, default_value = "received")]
        storage: PathBuf,
    },

    /// Print a device description as JSON
    Info {
        /// Printer address
        #[arg(long)]
        address: String,

        /// Printer key
        #[arg(long, default_value = "wirelessprint")]
        key: String,

        /// Printer port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Announced property as KEY=VALUE (repeatable)
        #[arg(long = "property", value_name = "KEY=VALUE")]
        properties: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("Error: {}", e);
    }

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), WirelessPrintError> {
    match command {
        Commands::Send {
            file,
            address,
            key,
            name,
            chunk_size,
            timeout,
        } => {
            let config = SessionConfig {
                upload_chunk_size: chunk_size,
                request_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
                ..Default::default()
            };
            let device = PrinterDevice::new(key, address, DEFAULT_PORT, DeviceProperties::default());
            send_file(device, config, file, name).await
        }
        Commands::Receive { listen, storage } => {
            receiver::serve(ReceiverConfig {
                listen_addr: listen,
                storage_dir: storage,
                ..Default::default()
            })
            .await
        }
        Commands::Info {
            address,
            key,
            port,
            properties,
        } => {
            let record = properties
                .iter()
                .map(|p| parse_property(p))
                .collect::<Result<Vec<_>, _>>()?;
            let device = PrinterDevice::new(
                key,
                address,
                port,
                DeviceProperties::from_txt_record(record),
            );
            let json = serde_json::json!({
                "description": device.description(),
                "name": device.name(),
                "print_url": device.print_url(),
                "device": device,
            });
            let text = serde_json::to_string_pretty(&json)
                .map_err(|e| WirelessPrintError::Config(format!("JSON error: {}", e)))?;
            println!("{}", text);
            Ok(())
        }
    }
}

/// Upload one file, printing progress to the terminal.
async fn send_file(
    device: PrinterDevice,
    config: SessionConfig,
    file: PathBuf,
    name: Option<String>,
) -> Result<(), WirelessPrintError> {
    let base_url = device.base_url();
    let (events, mut rx) = mpsc::unbounded_channel();
    let session = Arc::new(TransferSession::new(device, config, events)?);
    session.connect();

    let printer = tokio::spawn(async move {
        let mut last_percent = None;
        while let Some(event) = rx.recv().await {
            match event {
                TransferEvent::WriteProgress(p) => {
                    let percent = (p * 100.0).floor() as u32;
                    if last_percent != Some(percent) {
                        eprint!("\rProgress: {:>3}%", percent);
                        last_percent = Some(percent);
                    }
                }
                TransferEvent::WriteFinished => {
                    eprintln!();
                    break;
                }
                other => debug!(?other, "transfer event"),
            }
        }
    });

    let job = FileJob::new(&file);
    let result = session.request_write(&job, name.as_deref()).await;
    session.close();
    // Last sender goes with the session, which ends the progress task.
    drop(session);
    let _ = printer.await;

    let report = result?;
    println!(
        "Sent {} ({} bytes). Open {} to monitor the print.",
        report.file_name, report.bytes, base_url
    );
    Ok(())
}

/// Parse a `KEY=VALUE` property argument.
fn parse_property(arg: &str) -> Result<(String, String), WirelessPrintError> {
    arg.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| {
            WirelessPrintError::Config(format!("Invalid property '{}', expected KEY=VALUE", arg))
        })
}
