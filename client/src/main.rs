use clap::Parser;
use client::SequenceClient;
use log::{info, warn};
use std::net::SocketAddr;

/// One `--seq` argument, `<slot>:<start>:<step>`
#[derive(Debug, Clone, Copy)]
struct SeqArg {
    slot: u8,
    start: u32,
    step: u32,
}

fn parse_seq_arg(value: &str) -> Result<SeqArg, String> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("expected <slot>:<start>:<step>, got {:?}", value));
    }

    let number = |s: &str| s.parse::<u32>().map_err(|e| format!("{:?}: {}", s, e));

    Ok(SeqArg {
        slot: parts[0].parse::<u8>().map_err(|e| format!("{:?}: {}", parts[0], e))?,
        start: number(parts[1])?,
        step: number(parts[2])?,
    })
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,

    /// Subsequence to configure as <slot>:<start>:<step>, may be repeated
    #[arg(long = "seq", value_parser = parse_seq_arg)]
    seqs: Vec<SeqArg>,

    /// Number of exported lines to print before disconnecting, 0 for no limit
    #[arg(short = 'n', long, default_value = "10")]
    count: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    if args.seqs.is_empty() {
        warn!("No --seq given, the server will not export anything");
    }

    let mut client = SequenceClient::connect(args.server).await?;

    for seq in &args.seqs {
        info!("Configuring seq{} {} {}", seq.slot, seq.start, seq.step);
        client.configure(seq.slot, seq.start, seq.step).await?;
    }

    client.export().await?;

    let mut printed = 0;
    while args.count == 0 || printed < args.count {
        match client.next_line().await? {
            Some(line) => println!("{}", line),
            None => {
                info!("Server closed the connection");
                break;
            }
        }
        printed += 1;
    }

    client.shutdown().await?;
    Ok(())
}
