//! ArborKV server entry point.
//!
//! Sets up logging, builds the store, starts the expiration sweeper, and
//! accepts client connections until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use arborkv::commands::{parse_ttl, CommandHandler};
use arborkv::connection::{handle_client, ConnectionStats};
use arborkv::storage::{ExpirationSweeper, StoreConfig, ValueStore};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// TTL applied when a write carries none (None = never expires)
    default_ttl: Option<Duration>,
    /// Sweep interval (zero disables the sweeper)
    sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: arborkv::DEFAULT_HOST.to_string(),
            port: arborkv::DEFAULT_PORT,
            default_ttl: Some(Duration::from_secs(7 * 60)),
            sweep_interval: Duration::from_secs(3 * 60),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    config.host = take_value(&args, i, "--host").to_string();
                    i += 2;
                }
                "--port" | "-p" => {
                    config.port = take_value(&args, i, "--port").parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--default-ttl" => {
                    // Unparsable or non-positive means "never expires",
                    // same as a TTL sent on the wire.
                    config.default_ttl = parse_ttl(take_value(&args, i, "--default-ttl"));
                    i += 2;
                }
                "--sweep-interval" => {
                    config.sweep_interval = parse_ttl(take_value(&args, i, "--sweep-interval"))
                        .unwrap_or(Duration::ZERO);
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("ArborKV version {}", arborkv::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn take_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {flag} requires a value");
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
ArborKV - A Tree-Indexed In-Memory Key-Value Cache

USAGE:
    arborkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>            Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>            Port to listen on (default: 8001)
        --default-ttl <DUR>      TTL for writes that carry none, e.g. 7m
                                 (default: 7m; 0 or unparsable = never)
        --sweep-interval <DUR>   Delay between sweep passes, e.g. 3m
                                 (default: 3m; 0 disables sweeping)
    -v, --version                Print version information
        --help                   Print this help message

EXAMPLES:
    arborkv                               # 127.0.0.1:8001, 7m TTL, 3m sweeps
    arborkv --port 8002 --default-ttl 1h
    arborkv --sweep-interval 0            # lazy expiry only
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
   ArborKV v{} - tree-indexed in-memory key-value cache
   ─────────────────────────────────────────────────────
   Listening on {}
   Use Ctrl+C to shut down gracefully.
"#,
        arborkv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    // One store shared by every connection and the sweeper.
    let store = Arc::new(ValueStore::new(
        StoreConfig::default()
            .with_default_ttl(config.default_ttl)
            .with_sweep_interval(config.sweep_interval),
    ));
    info!("value store initialized");

    let sweeper = ExpirationSweeper::start(Arc::clone(&store));
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("listening on {}", config.bind_address());

    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, store, stats) => {}
        _ = shutdown => {}
    }

    if let Some(sweeper) = sweeper {
        sweeper.stop();
    }
    info!("server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    store: Arc<ValueStore>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let handler = CommandHandler::new(Arc::clone(&store));
                let stats = Arc::clone(&stats);
                tokio::spawn(handle_client(stream, peer, handler, stats));
            }
            Err(e) => {
                error!("failed to accept connection: {e}");
            }
        }
    }
}
