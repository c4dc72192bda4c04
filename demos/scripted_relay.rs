//! Scripted Relay Example
//!
//! Feeds a short, hand-written transmission sequence through the full relay:
//! intake, decode, dedup, log sink, in-memory SQLite.
//! No radio receiver, broker or HTTP endpoint required.
//!
//! Run with: cargo run -p relay_demos --bin scripted_relay [relay.toml]

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{ReadingKind, RelayBlueprint, SinkConfig, SinkType};
use ingestion::{Deduplicator, IntakeChannel, ScriptedSource, ScriptedStep};
use persistence::SqliteLog;
use pipeline::{Pipeline, RunLimits};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Scripted Relay Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading relay config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_demo_blueprint()
    };

    // ==== Stage 2: Script the transmissions ====
    // Each sensor repeats its code several times per burst.
    let ms = Duration::from_millis;
    let steps = vec![
        ScriptedStep::new(ms(0), 4_026_531_841),
        ScriptedStep::new(ms(20), 4_026_531_841),
        ScriptedStep::new(ms(20), 4_026_531_841),
        ScriptedStep::new(ms(200), 0),
        ScriptedStep::new(ms(200), 0x2000_0001),
        ScriptedStep::new(ms(200), 4_294_961_097),
        ScriptedStep::new(ms(20), 4_294_961_097),
    ];

    let mut intake = IntakeChannel::new(32);
    intake.register_source(Box::new(ScriptedSource::new("demo", steps)));

    // ==== Stage 3: Sinks and store ====
    let dispatcher = dispatcher::create_dispatcher(&blueprint.sinks).await?;
    let store = SqliteLog::open_in_memory()?;
    let pipeline = Pipeline::new(
        Deduplicator::new(&blueprint.dedup),
        dispatcher,
        Box::new(store),
    );

    // ==== Stage 4: Run until the script ends ====
    intake.start_all();
    let rx = intake.take_receiver()?;
    let stats = tokio::time::timeout(
        Duration::from_secs(30),
        pipeline.run(rx, RunLimits::default()),
    )
    .await?;
    intake.stop_all();

    tracing::info!(
        received = stats.received,
        accepted = stats.accepted,
        duplicates = stats.duplicates,
        "Relay demo finished"
    );
    stats.print_summary();

    tracing::info!(
        motion_table = ReadingKind::Motion.table(),
        environment_table = ReadingKind::Environment.table(),
        "Rows were written to the in-memory store"
    );

    Ok(())
}

fn create_demo_blueprint() -> RelayBlueprint {
    RelayBlueprint {
        version: Default::default(),
        receiver: Default::default(),
        dedup: Default::default(),
        sinks: vec![SinkConfig {
            name: "console".to_string(),
            sink_type: SinkType::Log,
            primary: true,
            queue_capacity: 16,
            timeout_ms: 1000,
            params: Default::default(),
        }],
        store: Default::default(),
    }
}
