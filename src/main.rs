//! nskv - A Namespaced In-Memory Key-Value Store
//!
//! This is the entry point for the interactive nskv shell. It reads commands
//! from stdin, executes them in one namespace, and prints replies to stdout.

use nskv::commands::CommandHandler;
use nskv::namespace::Namespace;
use nskv::session::{Session, SessionStats};
use nskv::storage::StorageEngine;
use std::io::IsTerminal;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Shell configuration
struct Config {
    /// First prefix segment
    root: String,
    /// Second prefix segment
    domain: String,
    /// Tag attached to namespace log events
    tag: Option<String>,
    /// Log at DEBUG instead of INFO
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: nskv::DEFAULT_ROOT.to_string(),
            domain: nskv::DEFAULT_DOMAIN.to_string(),
            tag: None,
            verbose: false,
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
                "--root" | "-r" => {
                    config.root = required_value(&args, i, "--root");
                    i += 2;
                }
                "--domain" | "-d" => {
                    config.domain = required_value(&args, i, "--domain");
                    i += 2;
                }
                "--tag" | "-t" => {
                    config.tag = Some(required_value(&args, i, "--tag"));
                    i += 2;
                }
                "--verbose" => {
                    config.verbose = true;
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("nskv version {}", nskv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

/// Returns the value following the flag at `i`, or exits.
fn required_value(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
nskv - A Namespaced In-Memory Key-Value Store

USAGE:
    nskv [OPTIONS]

OPTIONS:
    -r, --root <ROOT>        First key prefix segment (default: nskv)
    -d, --domain <DOMAIN>    Second key prefix segment (default: default)
    -t, --tag <TAG>          Tag attached to error logs
        --verbose            Log at debug level
    -v, --version            Print version information
    -h, --help               Print this help message

EXAMPLES:
    nskv                             # Shell in nskv:default
    nskv --root myapp -d users       # Shell in myapp:users

SESSION:
    myapp:users> SET user:1001 Alice 60000
    OK
    myapp:users> TTL user:1001
    (integer) 59998
    myapp:users> KEYS user:*
    1) "user:1001"
    myapp:users> QUIT

    Type HELP for the full command list.
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Logs go to stderr so stdout carries only replies
    FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let storage = Arc::new(StorageEngine::new());

    let mut builder = Namespace::builder(&config.root, &config.domain);
    if let Some(tag) = &config.tag {
        builder = builder.log_tag(tag.clone());
    }
    let handler = CommandHandler::new(Arc::clone(&storage), builder);
    let prefix = handler.namespace().prefix().to_owned();
    info!(namespace = %prefix, "Storage engine initialized");

    let stats = Arc::new(SessionStats::new());
    let mut session = Session::new(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        handler,
        Arc::clone(&stats),
    );
    if std::io::stdin().is_terminal() {
        session = session.with_prompt(format!("{}> ", prefix));
    }

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = session.run() => result?,
        _ = shutdown => {}
    }

    info!(
        commands = stats.commands_processed.load(Ordering::Relaxed),
        errors = stats.command_errors.load(Ordering::Relaxed),
        keys = storage.len(),
        "Shell exited"
    );
    Ok(())
}
