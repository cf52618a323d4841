use anyhow::{Context, Result};
use clap::Parser;
use electrify::cli::{Cli, OutputFormat};
use electrify::config::PipelineConfig;
use electrify::pipeline;
use tracing_subscriber::EnvFilter;

const BANNER: &str = "======================================================================";

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the config file (or defaults) and layer command-line overrides on top
fn load_config(args: &Cli) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().context("Invalid command-line override")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;
    tracing::debug!(?config, "resolved configuration");

    let text_output = args.format == OutputFormat::Text;
    if text_output {
        println!("{BANNER}");
        println!("RURAL ELECTRIFICATION PREDICTOR - PIPELINE EXECUTION");
        println!("{BANNER}");
    }

    let run = if args.clean_only {
        pipeline::run_cleaning(&config)?
    } else {
        pipeline::run(&config)?
    };

    match args.format {
        OutputFormat::Text => {
            print!("{}", run.report);
            println!();
            println!("{BANNER}");
            println!("PIPELINE EXECUTION COMPLETED SUCCESSFULLY");
            println!("{BANNER}");
        }
        OutputFormat::Json => println!("{}", run.report.to_json()?),
    }

    if let Some(path) = &args.report_json {
        run.report
            .write_json(path)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        if text_output {
            println!("Report written to: {}", path.display());
        }
    }

    Ok(())
}
