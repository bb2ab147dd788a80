//! Feed recorded script messages through a bridge and print the scripts it
//! would evaluate, one per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use bridge::{Bridge, BridgeConfig};
use clap::Parser;

mod common;

#[derive(Parser)]
#[command(about = "Replay JSON script messages through the call bridge")]
struct Cli {
    /// One JSON message per line. Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Bridge config file. Falls back to the usual lookup when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Web actions to call before replaying, as `namespace:action`.
    #[arg(long = "call", value_name = "NAMESPACE:ACTION")]
    calls: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    common::init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BridgeConfig::load_from(path),
        None => BridgeConfig::load(),
    };

    let (bridge, mut receiver) = Bridge::builder()
        .config(config)
        .actions_set(common::demo_actions()?)?
        .on_reload(|| tracing::info!("Page requested a reload"))
        .build();

    for call in &cli.calls {
        let Some((namespace, action)) = call.split_once(':') else {
            anyhow::bail!("expected NAMESPACE:ACTION, got '{}'", call);
        };
        let label = call.clone();
        let error_label = call.clone();
        bridge.call_web(
            namespace,
            action,
            None,
            move |result| tracing::info!("{} resolved: {:?}", label, result),
            move |err| tracing::warn!("{} failed: {}", error_label, err),
        );
    }

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut out = io::stdout().lock();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            bridge.handle_message(&line);
        }
        receiver.write_ready(&mut out)?;
    }

    tracing::debug!("Input exhausted: {:?}", bridge);
    let expired = bridge.expire_stale();
    if expired > 0 {
        tracing::info!("{} calls expired", expired);
    }

    // Deferred actions may still be running; the channel closes once they
    // and the bridge are gone.
    drop(bridge);
    while let Some(command) = receiver.blocking_recv() {
        writeln!(out, "{}", receiver.render(&command))?;
    }
    out.flush()?;
    Ok(())
}
