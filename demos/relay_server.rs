//! Relay server demo
//!
//! Run with: cargo run --example relay_server [HOST]
//!
//! Examples:
//!   cargo run --example relay_server              # event source on 0.0.0.0:9090, subscribers on 0.0.0.0:9099
//!   cargo run --example relay_server localhost    # same ports on 127.0.0.1
//!
//! ## Try it
//!
//! Subscriber (first line is the ID):
//!   printf '50\r\n' | nc localhost 9099 -q -1
//!
//! Event source:
//!   printf '2|P|60|50\r\n1|B\r\n' | nc localhost 9090
//!
//! The subscriber receives `1|B` then `2|P|60|50`, in sequence order.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_rs::{RelayServer, ServerConfig};

/// Parse the listen host from a command line argument.
///
/// Accepts "localhost" or a literal IP address.
fn parse_host(arg: &str) -> Result<IpAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    normalized.parse::<IpAddr>().map_err(|_| {
        format!(
            "Invalid host: '{}'. Expected an IP address or 'localhost'",
            arg
        )
    })
}

fn print_usage() {
    eprintln!("Usage: relay_server [HOST]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  HOST    Address to listen on (default: 0.0.0.0)");
    eprintln!();
    eprintln!("Ports are fixed: 9090 for the event source, 9099 for subscribers.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(host) => match parse_host(host) {
            Ok(ip) => ServerConfig::with_host(ip),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_rs=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    println!("Event source: {}", config.event_source_addr);
    println!("Subscribers:  {}", config.subscriber_addr);

    let server = Arc::new(RelayServer::new(config));

    // Periodic stats
    let stats_server = Arc::clone(&server);
    let stats_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        loop {
            ticker.tick().await;
            let stats = stats_server.stats().await;
            tracing::info!(
                subscribers = stats.registry.subscriber_count,
                follow_edges = stats.registry.follow_edges,
                next_sequence = stats.sequencer.next_sequence,
                pending = stats.sequencer.pending,
                delivered = stats.sequencer.delivered,
                "Relay stats"
            );
        }
    });

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    stats_handle.abort();
    Ok(())
}
