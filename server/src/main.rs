use clap::Parser;
use log::info;
use server::{Server, ServerConfig};
use shared::{DEFAULT_HOST, DEFAULT_PORT};
use std::net::IpAddr;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: IpAddr,

    /// Port to listen on
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    port: u16,

    /// Milliseconds between two exported lines
    #[arg(long, default_value = "100")]
    period_ms: u64,
}

/// Parses arguments, runs the server until SIGINT, SIGTERM or SIGQUIT,
/// then stops it.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        export_period: Duration::from_millis(args.period_ms.max(1)),
        ..ServerConfig::default()
    };

    let mut server = Server::with_config(config);
    server.start().await?;

    info!("server starts (port: {})", server.port());

    wait_for_shutdown_signal().await?;

    info!("Received shutdown signal, stopping server...");
    server.stop().await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }

    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
