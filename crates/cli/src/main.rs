use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formfill::{ErrorResponse, FillError, FillOptions, FillRequest, FormError, FormFiller};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "formfill")]
#[command(
    about = "Discover, repair and fill PDF form fields",
    version,
    long_about = "Fill AcroForm templates from a JSON mapping of field names to values.\n\
                  Forms with a broken field index are repaired from their page annotations first.\n\
                  \n\
                  Examples:\n\
                  • List fields:  formfill fields form.pdf\n\
                  • Fill:         formfill fill form.pdf --data values.json -o filled.pdf\n\
                  • Request:      formfill run request.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fillable field names of a form
    #[command(visible_alias = "f")]
    Fields {
        template: PathBuf,

        /// Print fields as JSON
        #[arg(long)]
        json: bool,

        /// Rebuild the field index even if it looks healthy
        #[arg(long)]
        force_repair: bool,
    },

    /// Fill a form from a JSON mapping file
    #[command(after_help = "Examples:\n  formfill fill form.pdf --data values.json -o out/filled.pdf")]
    Fill {
        template: PathBuf,

        /// JSON object of field name -> value
        #[arg(short, long, value_name = "MAPPING")]
        data: PathBuf,

        /// Output path (default: filled_<id>.pdf next to the template)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Set NeedAppearances so viewers regenerate field appearances
        #[arg(long)]
        need_appearances: bool,

        #[arg(long)]
        force_repair: bool,
    },

    /// Process a JSON fill request and print a JSON response
    Run { request: PathBuf },

    /// Rebuild the field index of a form from its page annotations
    Repair {
        template: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct FieldEntry<'a> {
    name: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// 2 when the template has no fields, 1 for everything else
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FillError>() {
        Some(FillError::Form(FormError::NoFieldsFound)) => 2,
        _ => 1,
    }
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Fields {
            template,
            json,
            force_repair,
        } => list_fields(&template, json, force_repair),
        Commands::Fill {
            template,
            data,
            output,
            need_appearances,
            force_repair,
        } => {
            let request = FillRequest {
                form_file: template,
                output_file: output,
                mapping_file: Some(data),
                options: FillOptions {
                    need_appearances,
                    force_repair,
                },
                ..Default::default()
            };
            let outcome = FormFiller::new().process(&request)?;
            if outcome.repaired {
                println!("Repaired field index ({} fields)", outcome.fields.len());
            }
            for name in &outcome.unknown {
                println!("  no field named '{}'", name);
            }
            println!(
                "Filled {} widgets -> {}",
                outcome.updated,
                outcome.output_file.display()
            );
            Ok(())
        }
        Commands::Run { request } => run_request(&request),
        Commands::Repair { template, output } => {
            let report = FormFiller::new()
                .repair(&template, &output)
                .with_context(|| format!("Failed to repair {}", template.display()))?;
            println!(
                "Rebuilt field index: {} entries (was {}), {} duplicate and {} skipped annotations",
                report.entries().len(),
                report.previous_len,
                report.scan.duplicates,
                report.scan.skipped
            );
            if report.promoted > 0 {
                println!("Moved {} inline widgets into their own objects", report.promoted);
            }
            println!("Saved: {}", output.display());
            Ok(())
        }
    }
}

fn list_fields(template: &Path, json: bool, force_repair: bool) -> Result<()> {
    let filler = FormFiller::with_options(FillOptions {
        force_repair,
        ..Default::default()
    });
    let resolution = filler.list_fields(template)?;

    if json {
        let entries: Vec<FieldEntry> = resolution
            .fields
            .iter()
            .map(|field| FieldEntry {
                name: &field.name,
                kind: field.kind.as_str(),
                value: field.value.as_deref(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for field in &resolution.fields {
            println!("{}\t{}", field.name, field.kind.as_str());
        }
        if resolution.repair().is_some() {
            eprintln!("(field index was rebuilt from page annotations)");
        }
    }

    if resolution.is_empty() {
        return Err(FillError::from(FormError::NoFieldsFound).into());
    }
    Ok(())
}

/// The JSON response goes to stdout on both success and failure
fn run_request(path: &Path) -> Result<()> {
    let (response, result) = respond(path)?;
    println!("{response}");
    result
}

/// Process a request file into its JSON response and the run's result
fn respond(path: &Path) -> Result<(String, Result<()>)> {
    let outcome = FillRequest::load(path).and_then(|request| FormFiller::new().process(&request));
    match outcome {
        Ok(outcome) => Ok((serde_json::to_string_pretty(&outcome)?, Ok(()))),
        Err(err) => {
            let response = serde_json::to_string_pretty(&ErrorResponse::from(&err))?;
            Ok((response, Err(err.into())))
        }
    }
}
