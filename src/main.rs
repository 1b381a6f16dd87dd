use clap::{Parser, Subcommand};
use clothing_service::config::{self, ServiceConfig};
use clothing_service::output;
use clothing_service::rejection::{ErrorBody, Operation};
use clothing_service::service::{AnalysisRecord, ClothingService, processed_output_path};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "clothing-service")]
#[command(about = "Analyze clothing photos and strip their backgrounds")]
#[command(long_about = "\
Analyze clothing photos and strip their backgrounds

Every image passes a validation gate first: it must decode as JPEG, PNG or
WebP, be at least 50x50 pixels and weigh at most 10 MiB.

  analyze             validate → moderate → extract attributes + embedding
  remove-background   validate → make the background transparent → PNG
  moderate            validate → report the moderation verdict only

Rejections are reported with an error code and status:

  invalid_image        400   not an image, corrupt, too small, too large
  content_blocked      451   moderation blocked the image
  *_failed             500   unexpected processing failure

Run 'clothing-service gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults apply when it does not exist)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract attributes and an embedding from one or more photos
    Analyze {
        /// Images to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print JSON records instead of text
        #[arg(long)]
        json: bool,
    },
    /// Make the background of a photo transparent
    RemoveBackground {
        /// Image to process
        input: PathBuf,
        /// Output PNG (default: processed_<name>.png next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print metadata and response headers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report the moderation verdict for a photo without analyzing it
    Moderate {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Report classifier, removal strategy and enabled features
    Health {
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as JSON
    Config,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

/// One entry of `analyze --json` output.
#[derive(Serialize)]
struct AnalyzeEntry {
    file: String,
    status: u16,
    #[serde(flatten)]
    outcome: AnalyzeOutcome,
}

#[derive(Serialize)]
#[serde(untagged)]
enum AnalyzeOutcome {
    Record(AnalysisRecord),
    Rejected(ErrorBody),
}

#[derive(Serialize)]
struct RemovalReport<'a> {
    output: String,
    #[serde(flatten)]
    metadata: &'a clothing_service::removal::RemovalMetadata,
    headers: Vec<(&'static str, String)>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let service_config = config::load_config(Some(&cli.config))?;
    tracing::debug!(path = %cli.config.display(), "configuration loaded");

    match cli.command {
        Command::Analyze { files, json } => {
            init_thread_pool(&service_config);
            let service = ClothingService::from_config(service_config)?;
            let results: Vec<_> = files
                .par_iter()
                .map(|path| service.analyze_path(path))
                .collect();

            let failures = results.iter().filter(|r| r.is_err()).count();
            if json {
                let entries: Vec<AnalyzeEntry> = files
                    .iter()
                    .zip(results)
                    .map(|(path, result)| match result {
                        Ok(record) => AnalyzeEntry {
                            file: path.display().to_string(),
                            status: 200,
                            outcome: AnalyzeOutcome::Record(record),
                        },
                        Err(err) => AnalyzeEntry {
                            file: path.display().to_string(),
                            status: err.status_code(),
                            outcome: AnalyzeOutcome::Rejected(err.body(Operation::Analyze)),
                        },
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (i, (path, result)) in files.iter().zip(&results).enumerate() {
                    match result {
                        Ok(record) => output::print_analysis(i + 1, path, record),
                        Err(err) => output::print_rejection(
                            &output::indexed_header(i + 1, path),
                            err,
                            Operation::Analyze,
                        ),
                    }
                }
            }
            Ok(exit_code(failures == 0))
        }
        Command::RemoveBackground {
            input,
            output: out_path,
            json,
        } => {
            let service = ClothingService::from_config(service_config)?;
            let result = match service.remove_background_path(&input) {
                Ok(result) => result,
                Err(err) => {
                    report_failure(&input, &err, Operation::RemoveBackground, json)?;
                    return Ok(exit_code(false));
                }
            };
            let out_path = out_path.unwrap_or_else(|| processed_output_path(&input));
            std::fs::write(&out_path, &result.png)?;
            if json {
                let report = RemovalReport {
                    output: out_path.display().to_string(),
                    metadata: &result.metadata,
                    headers: result.metadata.headers(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_removal(&input, &out_path, &result.metadata);
            }
            Ok(exit_code(true))
        }
        Command::Moderate { file, json } => {
            let service = ClothingService::from_config(service_config)?;
            match service.moderate_path(&file) {
                Ok(verdict) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&verdict)?);
                    } else {
                        output::print_verdict(&file, &verdict);
                    }
                    Ok(exit_code(true))
                }
                Err(err) => {
                    report_failure(&file, &err, Operation::Analyze, json)?;
                    Ok(exit_code(false))
                }
            }
        }
        Command::Health { json } => {
            let report = ClothingService::from_config(service_config)?.health();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_health(&report);
            }
            Ok(exit_code(true))
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&service_config)?);
            Ok(exit_code(true))
        }
        Command::GenConfig => Ok(exit_code(true)),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(config: &ServiceConfig) {
    let workers = config::effective_workers(&config.processing);
    tracing::debug!(workers, "initializing worker pool");
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .ok();
}

fn report_failure(
    path: &std::path::Path,
    err: &clothing_service::rejection::RejectionError,
    operation: Operation,
    json: bool,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(&err.body(operation))?);
    } else {
        output::print_rejection(&path.display().to_string(), err, operation);
    }
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
