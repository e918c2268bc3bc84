//! storeq-chat - Talk to storeqd from a terminal
//!
//! Each input line is delivered as one chat message. Keyboards are shown
//! as bracketed rows; report attachments are written to disk.

mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use storeq_ipc::IpcClient;
use storeq_util::{default_socket_path, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// storeq-chat - Terminal chat for storeqd
#[derive(Parser, Debug)]
#[command(name = "storeq-chat")]
#[command(about = "Terminal chat transport for storeqd", long_about = None)]
struct Args {
    /// Socket path for storeqd connection (or set STOREQ_SOCKET env var)
    #[arg(short, long, env = "STOREQ_SOCKET")]
    socket: Option<PathBuf>,

    /// Chat user id (default: the current Unix uid)
    #[arg(short, long)]
    user: Option<String>,

    /// Directory for report attachments
    #[arg(long, default_value = ".")]
    save_dir: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let socket_path = args.socket.unwrap_or_else(default_socket_path);
    let user_id = UserId::new(
        args.user
            .unwrap_or_else(|| nix::unistd::getuid().as_raw().to_string()),
    );

    debug!(path = %socket_path.display(), user_id = %user_id, "Connecting to daemon");

    let mut client = IpcClient::connect(&socket_path)
        .await
        .with_context(|| format!("Failed to connect to storeqd at {:?}", socket_path))?;

    let commands = client.list_commands().await?;
    println!("{}\n", render::format_menu(&commands));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let replies = match client.message(&user_id, text).await {
            Ok(replies) => replies,
            Err(e) => {
                // The message may or may not have been handled; don't resend it
                warn!(error = %e, "Message failed, reconnecting");
                eprintln!("Error de conexión: {}. Intenta de nuevo.", e);
                client = IpcClient::connect(&socket_path)
                    .await
                    .context("Failed to reconnect to storeqd")?;
                continue;
            }
        };

        for reply in &replies {
            println!("{}\n", render::format_reply(reply));
            if let Some(attachment) = &reply.attachment {
                match render::save_attachment(&args.save_dir, attachment) {
                    Ok(path) => println!("📎 {}\n", path.display()),
                    Err(e) => eprintln!("No se pudo guardar {}: {:#}", attachment.filename, e),
                }
            }
        }
    }

    Ok(())
}
