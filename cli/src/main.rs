//! eventscan CLI — inspect scanner defaults and build info.
//!
//! Usage:
//! ```bash
//! eventscan info
//! eventscan version
//! ```

use std::env;
use std::process;

use eventscan_core::config::ScanConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "info" => cmd_info(),
        "version" | "--version" | "-V" => {
            println!("eventscan {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("eventscan {}", env!("CARGO_PKG_VERSION"));
    println!("Resumable, ordered blockchain event ingestion engine\n");
    println!("USAGE:");
    println!("    eventscan <COMMAND>\n");
    println!("COMMANDS:");
    println!("    info     Show scanner defaults");
    println!("    version  Print version");
    println!("    help     Print this help");
}

fn cmd_info() {
    let defaults = ScanConfig::default();
    println!("Eventscan v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default tick interval: {:?}", defaults.tick_interval);
    println!("  Default idle backoff: {:?}", defaults.idle_backoff);
    println!("  Default batch size: {} positions/cycle", defaults.max_batch_size);
    println!("  Default start position: {}", defaults.start_position);
    println!("  Storage backends: memory, SQLite (feature: sqlite)");
    println!("  Sources: ranged block scan, event-batch polling");
}
