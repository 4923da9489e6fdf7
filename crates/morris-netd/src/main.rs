use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use morris_netd::net::tcp::run_with_listener;
use morris_netd::run_server;

/// Tic-tac-toe match server.
#[derive(Parser, Debug)]
#[command(name = "morris-netd")]
#[command(about = "Tic-tac-toe match and rating server", long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Network layer -> upper layer events.
    let (tx, rx) = mpsc::channel(1024);

    // Bind before spawning so a bad address fails the process, not a task.
    let bind_addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let listener = TcpListener::bind(bind_addr).await?;

    tokio::spawn(async move {
        let _ = run_with_listener(listener, tx).await;
    });

    // SIGHUP -> graceful shutdown: cancel every connection, wait for the
    // registry to drain, exit zero.
    let shutdown = CancellationToken::new();
    let mut hangup = signal(SignalKind::hangup())?;
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            hangup.recv().await;
            info!("SIGHUP received, shutting down");
            shutdown.cancel();
        });
    }

    info!("match server started on {}", bind_addr);
    info!("log level: {}", args.log_level);

    run_server(rx, shutdown).await
}
