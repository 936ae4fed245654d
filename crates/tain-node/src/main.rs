//! Tain demo node.
//!
//! Runs two mirrors over an in-process broker, both bound to the same
//! topic, and shows local mutations on one replica converging onto the
//! other — including the self-echo being rejected as stale.
//!
//! # Usage
//!
//! ```bash
//! tain-node --ticks 5
//! ```

use clap::Parser;
use serde_json::json;
use tain_core::Observable;
use tain_node::{LocalBroker, LocalTransport, MirrorDriver, NodeError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const COUNTER: u64 = 1;
const TOPIC: &str = "demo/counter";

/// Tain state-mirroring demo
#[derive(Parser, Debug)]
#[command(name = "tain-node")]
#[command(about = "Two-replica state mirroring demo")]
#[command(version)]
struct Args {
    /// Number of counter increments to mirror
    #[arg(short, long, default_value = "5")]
    ticks: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn counter_cell() -> tain_core::PropertyCell {
    tain_core::PropertyCell::new([
        ("count".to_string(), json!(0)),
        ("status".to_string(), json!("idle")),
    ])
}

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let broker = LocalBroker::new();
    let mut writer: MirrorDriver<LocalTransport> = MirrorDriver::new(broker.connect());
    let mut reader: MirrorDriver<LocalTransport> = MirrorDriver::new(broker.connect());

    writer.insert_object(COUNTER, counter_cell());
    reader.insert_object(COUNTER, counter_cell());

    writer.register(COUNTER, TOPIC).await?;
    reader.register(COUNTER, TOPIC).await?;

    writer.pump().await?;
    reader.pump().await?;

    tracing::info!(topic = TOPIC, "both replicas registered");

    for tick in 1..=args.ticks {
        writer
            .update(COUNTER, |cell| {
                cell.set("count", json!(tick));
                cell.set("status", json!("counting"));
            })
            .await?;

        reader.pump().await?;
        writer.pump().await?; // swallows the self-echo as stale

        tracing::info!(
            tick,
            writer_revision = writer.mirror().revision(COUNTER),
            reader_count = %reader
                .store()
                .cell(COUNTER)
                .and_then(|cell| cell.value("count"))
                .cloned()
                .unwrap_or(json!(null)),
            "mirrored"
        );
    }

    let reader_cell = reader.store().cell(COUNTER);
    tracing::info!(
        count = %reader_cell.and_then(|c| c.value("count")).cloned().unwrap_or(json!(null)),
        status = %reader_cell.and_then(|c| c.value("status")).cloned().unwrap_or(json!(null)),
        revision = reader.mirror().revision(COUNTER),
        "reader replica final state"
    );

    Ok(())
}
