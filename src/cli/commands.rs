//! Command implementations for `fia-estimate`

use crate::cli::args::{Commands, EstimateArgs, OutputFormat};
use crate::config::EstimatorConfig;
use crate::database::FiaDatabase;
use crate::estimation::{self, EstimationOutput};
use anyhow::Context;
use colored::*;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{self, Write};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Run one estimator subcommand end to end
pub fn run(command: Commands) -> anyhow::Result<EstimationOutput> {
    let common = command.common();
    common.validate()?;
    setup_logging(common.get_log_level());

    let config = load_configuration(common)?;
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    let start = Instant::now();
    let database = FiaDatabase::from_directory(&common.data)
        .with_context(|| format!("Failed to load tables from {}", common.data.display()))?;

    let mut output = estimate(&command, &database, &config)?;
    info!(
        "Estimated {} group(s) in {:.2}s",
        output.frame.height(),
        start.elapsed().as_secs_f64()
    );

    write_output(&command, common, &mut output)?;
    Ok(output)
}

/// Initialise the tracing subscriber; `RUST_LOG` wins over verbosity flags
pub fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fia_estimator={}", log_level)));

    // Ignore a second initialisation
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(io::stderr),
        )
        .try_init();
}

/// Base configuration from `--config` (or defaults) with flags applied on top
pub fn load_configuration(args: &EstimateArgs) -> anyhow::Result<EstimatorConfig> {
    let base = match &args.config_file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<EstimatorConfig>(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => EstimatorConfig::default(),
    };
    Ok(args.apply_to(base))
}

fn estimate(
    command: &Commands,
    database: &FiaDatabase,
    config: &EstimatorConfig,
) -> crate::Result<EstimationOutput> {
    match command {
        Commands::Area(_) => estimation::area(database, config),
        Commands::AreaChange(args) => {
            estimation::area_change(database, config, args.change, args.annualize)
        }
        Commands::Volume(args) => estimation::volume(database, config, args.volume_type),
        Commands::Biomass(args) => estimation::biomass(database, config, args.component),
        Commands::Tpa(args) => estimation::tree_count(database, config, args.metric),
        Commands::Mortality(args) => estimation::mortality(
            database,
            config,
            args.tree_class,
            args.attribute,
            !args.periodic,
        ),
        Commands::Removals(args) => estimation::removals(
            database,
            config,
            args.tree_class,
            args.attribute,
            !args.periodic,
        ),
        Commands::Growth(args) => {
            estimation::growth(database, config, args.tree_class, args.attribute)
        }
    }
}

fn write_output(
    command: &Commands,
    args: &EstimateArgs,
    output: &mut EstimationOutput,
) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = match &args.output_file {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    match args.format {
        OutputFormat::Table => {
            if !args.quiet {
                writeln!(
                    writer,
                    "{} {}",
                    "Estimate:".bold().cyan(),
                    command.measure().to_string().bold()
                )?;
                writeln!(
                    writer,
                    "{} {}",
                    "Plots in evaluation:".cyan(),
                    output.n_plots_total
                )?;
                if !output.group_failures.is_empty() {
                    writeln!(
                        writer,
                        "{}",
                        format!(
                            "{} group(s) without an estimate",
                            output.group_failures.len()
                        )
                        .yellow()
                    )?;
                }
            }
            writeln!(writer, "{}", output.frame)?;
        }
        OutputFormat::Csv => {
            CsvWriter::new(&mut writer)
                .include_header(true)
                .finish(&mut output.frame)?;
        }
        OutputFormat::Json => {
            JsonWriter::new(&mut writer)
                .with_json_format(JsonFormat::Json)
                .finish(&mut output.frame)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}
