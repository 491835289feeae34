use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use survey_pipeline::app::clean_use_case::CleanUseCase;
use survey_pipeline::config::Config;
use survey_pipeline::infra::NdjsonOutputAdapter;
use survey_pipeline::pipeline::ingestion::read_survey_files;
use survey_pipeline::pipeline::report::SurveyReport;
use survey_pipeline::{logging, observability, RuleSet, SurveyCleaner};

#[derive(Parser)]
#[command(name = "survey_pipeline")]
#[command(about = "Clean monthly survey exports into clean and quarantine datasets")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to SURVEY_CONFIG, then config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest, clean and validate survey exports, then write outputs and report
    Clean {
        /// CSV exports to process
        #[arg(long, short, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Output directory (overrides the config file)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Quarantine ratings that are neither numeric nor NS/NC
        #[arg(long)]
        strict_satisfaction: bool,
    },
    /// List the active quality rules in canonical order
    Rules {
        #[arg(long)]
        strict_satisfaction: bool,
    },
}

async fn run_clean(
    mut config: Config,
    input: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    strict_satisfaction: bool,
) -> anyhow::Result<()> {
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    if strict_satisfaction {
        config.cleaning.strict_satisfaction = true;
    }

    if let Err(e) = observability::init() {
        warn!("Metrics disabled: {}", e);
    }

    let raw = read_survey_files(&input)?;

    let clean_output = NdjsonOutputAdapter::new(config.output.clean_path())?;
    let quarantine_output = NdjsonOutputAdapter::new(config.output.quarantine_path())?;
    let use_case = CleanUseCase::with_config(
        &config.cleaning,
        Box::new(clean_output),
        Box::new(quarantine_output),
    );

    let batch = use_case.run(&raw).await?;

    let report = SurveyReport::build(&batch.output.clean, &batch.output.quarantine);
    let report_path = config.output.report_path();
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    info!(path = %report_path.display(), "Wrote report aggregates");

    if let Some(snapshot) = observability::render() {
        std::fs::write(config.output.metrics_path(), snapshot)?;
    }

    let stats = &batch.stats;
    println!("\n📊 Cleaning results:");
    println!("   Raw rows: {}", stats.raw_records);
    println!("   Duplicates removed: {}", stats.duplicates_removed);
    println!("   Clean: {} ({:.1}%)", stats.clean_records, stats.clean_rate());
    println!(
        "   Quarantined: {} ({:.1}%)",
        stats.quarantined_records,
        stats.quarantine_rate()
    );
    for (code, count) in &stats.reason_counts {
        println!("     - {}: {}", code, count);
    }
    println!("   Clean output: {}", config.output.clean_path().display());
    println!("   Quarantine output: {}", config.output.quarantine_path().display());
    println!("   Report: {}", report_path.display());

    Ok(())
}

fn print_rules(config: &Config, strict_satisfaction: bool) {
    let rules = if strict_satisfaction {
        RuleSet::strict()
    } else {
        SurveyCleaner::new(&config.cleaning).rules().clone()
    };
    println!("Active quality rules (canonical order):");
    for rule in rules.rules() {
        println!("   {:<22} {}", rule.code.as_str(), rule.description);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init_logging("logs")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean {
            input,
            output_dir,
            strict_satisfaction,
        } => {
            println!("🧹 Running survey cleaning pipeline...");
            if let Err(e) = run_clean(config, input, output_dir, strict_satisfaction).await {
                error!("Cleaning run failed: {:#}", e);
                println!("❌ Cleaning run failed: {:#}", e);
                return Err(e);
            }
            println!("✅ Cleaning run completed");
        }
        Commands::Rules {
            strict_satisfaction,
        } => print_rules(&config, strict_satisfaction),
    }
    Ok(())
}
