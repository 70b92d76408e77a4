use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tank_sensor_sim::{
    Config, LoopSettings, MqttPublisher, PublishLoop, RandomDrift, SensorStateStore,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    config: PathBuf,

    /// Seed for the drift generator (overrides `seed` in the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Validate the configuration, print one sample batch and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tank_sensor_sim::init_logging(args.json_logs);

    info!("tank-sensor-sim v{} starting", tank_sensor_sim::VERSION);

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    info!(
        "Loaded {} sensors for ship {} tank {}",
        config.sensors.len(),
        config.ship_id,
        config.tank_id
    );

    let drift = match args.seed.or(config.seed) {
        Some(seed) => {
            info!("Using fixed drift seed {}", seed);
            RandomDrift::seeded(seed)
        }
        None => RandomDrift::from_entropy(),
    };
    let mut store = SensorStateStore::new(config.tank_id, config.sensors.iter().cloned(), drift)?;

    if args.check {
        let sample = store.advance_all().to_json()?;
        println!("{}", sample);
        info!("Configuration OK, would publish to '{}'", config.topic());
        return Ok(());
    }

    let publisher = MqttPublisher::new(&config.mqtt).context("failed to set up MQTT transport")?;
    info!("Publishing to '{}' on {}", config.topic(), publisher.broker());

    let cancel = CancellationToken::new();
    let publish_loop = PublishLoop::new(publisher, store, LoopSettings::from_config(&config))
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                cancel.cancel();
            }
            Err(e) => warn!("Unable to listen for shutdown signal: {}", e),
        }
    });

    publish_loop.run().await.context("publish loop failed")?;
    info!("Simulator stopped normally");
    Ok(())
}
