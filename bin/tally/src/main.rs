//! Serializes batches of metrics into JSON documents or line protocol.

#![deny(warnings)]
#![deny(missing_docs)]

use std::{
    io::{self, Read as _, Write as _},
    path::Path,
};

use anyhow::{Context as _, Result};
use clap::Parser as _;
use tally_config::ConfigurationLoader;
use tally_model::ResourceMetrics;
use tally_serializer::{DeltaCache, MetricSerializer, SerializerConfiguration};
use tracing::{debug, error, info, warn};

mod cli;
use self::cli::Cli;

mod logging;
use self::logging::initialize_logging;

const ENV_PREFIX: &str = "TALLY";
const STDIN_PATH: &str = "-";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = initialize_logging() {
        eprintln!("FATAL: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_configuration(&cli)?;

    let delta_cache = DeltaCache::from_configuration(&config).context("Failed to create delta cache.")?;
    if let Some(driver) = delta_cache.expiration_driver() {
        tokio::spawn(driver);
    }
    let serializer = MetricSerializer::new(&config, delta_cache);

    let (mut records, mut errors, mut suppressed) = (0, 0, 0);
    for input in &cli.inputs {
        let batch = read_batch(input)?;
        let serialized = serializer.serialize_batch(&batch);

        {
            let mut stdout = io::stdout().lock();
            for record in &serialized.records {
                stdout.write_all(record).context("Failed to write record.")?;
                stdout.write_all(b"\n").context("Failed to write record.")?;
            }
            stdout.flush().context("Failed to flush output.")?;
        }

        for record_error in &serialized.errors {
            warn!(
                input = %input.display(),
                index = record_error.index,
                error = %record_error.error,
                "Failed to serialize record."
            );
        }

        debug!(
            input = %input.display(),
            records = serialized.records.len(),
            errors = serialized.errors.len(),
            suppressed = serialized.suppressed,
            tracked_series = serializer.delta_cache().len(),
            "Processed input."
        );

        records += serialized.records.len();
        errors += serialized.errors.len();
        suppressed += serialized.suppressed;

        // Give the expiration driver a chance to run between inputs.
        tokio::task::yield_now().await;
    }

    info!(inputs = cli.inputs.len(), records, errors, suppressed, "Serialization complete.");

    Ok(())
}

fn load_configuration(cli: &Cli) -> Result<SerializerConfiguration> {
    let mut loader = ConfigurationLoader::default();
    if let Some(path) = &cli.config_file {
        loader = loader
            .from_file(path)
            .with_context(|| format!("Failed to load configuration file '{}'.", path.display()))?;
    }

    loader = loader
        .from_environment(ENV_PREFIX)
        .context("Failed to read configuration from environment.")?;
    if let Some(format) = cli.format {
        loader = loader.with_override("format", format.config_value());
    }

    loader.into_typed().context("Failed to parse configuration.")
}

fn read_batch(path: &Path) -> Result<Vec<ResourceMetrics>> {
    let raw = if path == Path::new(STDIN_PATH) {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read batch from standard input.")?;
        raw
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read batch file '{}'.", path.display()))?
    };

    serde_json::from_str(&raw).with_context(|| format!("Failed to parse batch '{}'.", path.display()))
}
