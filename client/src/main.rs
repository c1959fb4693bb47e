use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use clap::{Parser, Subcommand};
use client::api::{ApiClient, ApiError};
use client::engine::SyncEngine;
use client::state::Identity;
use client::surface::TraceSurface;
use protocol::Point;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("api request failed: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON line: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("send queue stalled; gateway unreachable")]
    Offline,
}

#[derive(Parser, Debug)]
#[command(name = "edgeboard", about = "Edgeboard sync client CLI")]
struct Cli {
    #[arg(long, env = "EDGEBOARD_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the gateway and print `ok`.
    Ping,
    /// Run the sync loops and log every applied action.
    Watch {
        /// Stop after this many seconds instead of running forever.
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Read strokes as JSONL point arrays (from a file or `-` for stdin)
    /// and upload them.
    Send {
        #[arg(default_value = "-")]
        input: String,

        #[arg(long, default_value = "#000000")]
        color: String,

        #[arg(long, default_value_t = 3.0)]
        line_width: f64,
    },
    /// Broadcast a global canvas clear.
    Clear,
    /// Reset the broadcast ledger on the gateway.
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.base_url);

    match cli.command {
        Command::Ping => run_ping(&api).await,
        Command::Watch { duration } => run_watch(api, duration).await,
        Command::Send { input, color, line_width } => {
            run_send(api, &input, &color, line_width).await
        }
        Command::Clear => run_clear(api).await,
        Command::Reset => run_reset(&api).await,
    }
}

async fn run_ping(api: &ApiClient) -> Result<(), CliError> {
    api.help().await?;
    println!("ok");
    Ok(())
}

async fn run_watch(api: ApiClient, duration: Option<u64>) -> Result<(), CliError> {
    let identity = Identity::random();
    eprintln!("watching as {} ({})", identity.user_name, identity.user_id);

    let engine = SyncEngine::new(api, identity, Box::new(TraceSurface));
    let handles = engine.spawn_loops();

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    ticker.tick().await;
    let stop = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop);

    loop {
        tokio::select! {
            () = &mut stop => break,
            _ = ticker.tick() => {
                let st = engine.state().lock().await;
                eprintln!(
                    "status: {} | sent={} received={} failed={}",
                    if st.online { "online" } else { "offline" },
                    st.stats.sent,
                    st.stats.received,
                    st.stats.failed,
                );
            }
        }
    }

    for handle in handles {
        handle.abort();
    }
    Ok(())
}

async fn run_send(
    api: ApiClient,
    input: &str,
    color: &str,
    line_width: f64,
) -> Result<(), CliError> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };

    let engine = SyncEngine::new(api, Identity::random(), Box::new(TraceSurface));

    let mut committed = 0usize;
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let points: Vec<Point> = serde_json::from_str(&line)?;
        if engine.commit_stroke(points, color, line_width).await.is_some() {
            committed += 1;
        } else {
            skipped += 1;
        }
    }

    // Drain the queue in protocol-sized batches.
    loop {
        let pending = engine.state().lock().await.send_queue.len();
        if pending == 0 {
            break;
        }
        engine.send_once().await;
        if !engine.state().lock().await.online {
            return Err(CliError::Offline);
        }
    }

    eprintln!("send complete: committed={committed} skipped={skipped}");
    Ok(())
}

async fn run_clear(api: ApiClient) -> Result<(), CliError> {
    let mut state = client::state::SyncState::new(Identity::random());
    let action = state.begin_clear(protocol::now_ms());
    api.post_action(&action).await?;
    eprintln!("cleared: {}", action.stroke_id());
    Ok(())
}

async fn run_reset(api: &ApiClient) -> Result<(), CliError> {
    api.reset_broadcast().await?;
    eprintln!("broadcast ledger reset");
    Ok(())
}
