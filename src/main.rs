use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info};

mod host;
mod machine;

use host::comm::{FeedConfig, PacketSink, connect_feed};
use host::logging::{setup_logging_file, setup_logging_stdio};
use machine::io::{HostRng, WallTimer};
use machine::{Controller, ControllerConfig};

/// PS/2 keyboard to SPI bridge
/// Decodes a Scan Code Set 2 byte stream and reports key activity to an SPI
/// peripheral as single-byte packets
#[derive(Parser)]
#[command(name = "ps2-bridge")]
#[command(about = "A PS/2 keyboard to SPI peripheral bridge controller")]
struct Args {
    /// Read raw scan-code bytes from stdin
    #[arg(long)]
    stdin: bool,

    /// Read raw scan-code bytes from a pipe or character device
    #[arg(long, value_name = "PATH")]
    pipe: Option<PathBuf>,

    /// Replay a capture file of raw scan-code bytes
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Mirror transmitted packet bytes to this pipe or file
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Do not send an idle packet when the random field refreshes
    #[arg(long)]
    no_idle_refresh: bool,

    /// Debounce window in milliseconds
    #[arg(long, default_value_t = 100)]
    debounce_ms: u64,

    /// Log to a file in the temp directory instead of stdout
    #[arg(long)]
    log_file: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.verbose {
        Level::TRACE
    } else {
        Level::INFO
    };
    if args.log_file {
        setup_logging_file(level);
    } else {
        setup_logging_stdio(level);
    }

    let Some(feed) = FeedConfig::from_args(args.stdin, args.pipe, args.replay) else {
        return Err("no scan-code source; use --stdin, --pipe or --replay".into());
    };

    let config = ControllerConfig {
        debounce_ms: args.debounce_ms,
        idle_packet_on_refresh: !args.no_idle_refresh,
        ..ControllerConfig::default()
    };

    let sink = PacketSink::open(args.out)?;
    let mut controller = Controller::new(
        sink,
        HostRng::new(),
        WallTimer::new(),
        WallTimer::new(),
        config,
    );

    info!("Bridge controller starting...");
    let feed = connect_feed(feed, controller.irq())?;

    // Tight poll-and-dispatch loop; the feed thread is the interrupt side
    loop {
        controller.poll();
        if feed.is_finished() {
            // Drain whatever the feed published last
            for _ in 0..8 {
                controller.poll();
            }
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }

    info!(
        "Scan-code feed ended, {} packet(s) sent",
        controller.link().words_sent()
    );

    Ok(())
}
