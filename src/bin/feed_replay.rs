//! Feed Replay CLI
//!
//! Serves a recorded reading file over WebSocket so the monitor can be run without a live
//! plant feed.
//!
//! Usage:
//!   cargo run --bin feed_replay -- --input data/readings.jsonl --rate 2 --loop-file

use clap::Parser;
use zonewatch::stream_bus::{StreamBus, StreamBusConfig};

#[derive(Parser, Debug)]
#[command(name = "feed_replay")]
#[command(about = "Replay recorded zone readings over a WebSocket feed", long_about = None)]
struct Args {
    /// JSON-lines or JSON-array file of readings
    #[arg(short, long)]
    input: String,

    #[arg(short, long, env = "ZONEWATCH_REPLAY_ADDR", default_value = "127.0.0.1:9001")]
    bind: String,

    /// Readings per second for each client (0 = unlimited)
    #[arg(short, long, default_value = "1")]
    rate: u64,

    #[arg(long)]
    loop_file: bool,

    /// Replace recorded timestamps with the send time
    #[arg(long)]
    add_timestamps: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = StreamBusConfig {
        input_file: args.input,
        bind_addr: args.bind,
        rate_of_publishing: args.rate,
        loop_file: args.loop_file,
        add_timestamps: args.add_timestamps,
    };

    let bus = StreamBus::bind(config).await?;
    println!("Replaying on {}", bus.url()?);

    let metrics = bus
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    println!("\nStream Bus Complete!");
    println!("====================");
    println!("Readings loaded:  {}", metrics.events_read);
    println!(
        "Published:        {} ({:.1}%)",
        metrics.events_published,
        metrics.publish_success_rate()
    );
    println!("Publish errors:   {}", metrics.publish_errors);
    println!("Clients served:   {}", metrics.clients_served);
    println!("Elapsed time:     {:.2}s", metrics.elapsed_seconds);
    println!("Throughput:       {:.1} readings/sec", metrics.events_per_second());

    Ok(())
}
