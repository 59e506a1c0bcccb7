//! file - push local files to a file-relay server
//!
//! Usage:
//!   file push ./id_rsa.crt prod:certs/web.crt
//!   file cat prod:certs/web.crt

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use file_relay::{logging, TransferClient};

#[derive(Parser, Debug)]
#[command(name = "file")]
#[command(about = "Manage files on a file-relay server")]
#[command(version)]
struct Cli {
    /// gRPC address of the file-relay API
    #[arg(long, env = "FILE_RELAY_API_ADDRESS", default_value = "127.0.0.1:8081")]
    api_address: String,

    /// CA certificate to trust; enables TLS towards the API
    #[arg(long, env = "FILE_RELAY_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FILE_RELAY_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push a local file to destination
    Push {
        /// Source location
        src: PathBuf,
        /// Destination location, as namespace:path.(crt|key|yml|json)
        path: String,
    },
    /// Display file from remote location
    Cat {
        /// Remote file path
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Command::Push { src, path } => {
            let client = TransferClient::connect_lazy(&cli.api_address, cli.ca_cert.as_deref())?;
            let receipt = client.push(&src, &path).await?;
            println!("{}", receipt);
        }
        Command::Cat { path } => {
            info!(path = %path, "cat requested");
            println!("file cat is not implemented yet");
        }
    }

    Ok(())
}
