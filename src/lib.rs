pub mod cli;
pub mod config;
pub mod error;
pub mod io_utils;
pub mod mapper;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod tokenizer;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, InputArgs, OutputFormat},
    config::ImportPolicy,
    pipeline::ParseResult,
};

pub use crate::{
    error::ImportError,
    merge::{ExistingRecord, MergeOutcome},
    pipeline::{parse, parse_with, plan_merge},
    validate::{InvalidRow, ValidRow},
};

static LOGGER: OnceLock<()> = OnceLock::new();

const TEMPLATE: &str = "name,company,email,phone,status,tags\n\
John Doe,Acme Inc,john@example.com,+1 555 0100,lead,vip|newsletter\n";

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("crm_import", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Parse(args) => handle_parse(&args),
        Commands::Plan(args) => handle_plan(&args),
        Commands::Template => {
            print!("{TEMPLATE}");
            Ok(())
        }
    }
}

fn load_policy(args: &InputArgs) -> Result<ImportPolicy> {
    let policy = match &args.config {
        Some(path) => ImportPolicy::load(path)
            .with_context(|| format!("Loading import policy from {path:?}"))?,
        None => ImportPolicy::default(),
    };
    let policy = policy.with_max_file_size(args.max_size);
    debug!("Import policy: {policy:?}");
    Ok(policy)
}

fn read_and_parse(args: &InputArgs, policy: &ImportPolicy) -> Result<ParseResult> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let content = io_utils::read_upload(&args.input, encoding, policy.max_file_size)?;
    let file_name = args.input.display().to_string();
    let result = pipeline::parse_with(&content, &file_name, policy)
        .with_context(|| format!("Parsing {:?}", args.input))?;
    if let Some(delimiter) = result.delimiter {
        info!("Read '{}' using delimiter '{}'", file_name, delimiter);
    }
    Ok(result)
}

fn handle_parse(args: &cli::ParseArgs) -> Result<()> {
    let policy = load_policy(&args.input)?;
    let result = read_and_parse(&args.input, &policy)?;
    match args.input.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Serializing parse result")?
            );
        }
        OutputFormat::Table => {
            print!("{}", report::render_parse_summary(&result));
            if args.show_valid && !result.valid_rows.is_empty() {
                println!();
                print!("{}", report::render_valid_rows(&result.valid_rows));
            }
        }
    }
    if !result.invalid_rows.is_empty() {
        warn!(
            "{} row(s) in {:?} failed validation",
            result.invalid_rows.len(),
            args.input.input
        );
    }
    Ok(())
}

fn handle_plan(args: &cli::PlanArgs) -> Result<()> {
    let policy = load_policy(&args.input)?;
    let result = read_and_parse(&args.input, &policy)?;
    let existing = match &args.existing {
        Some(path) => io_utils::load_existing_records(path)?,
        None => Vec::new(),
    };
    info!("Matching against {} existing client(s)", existing.len());

    let outcome = result
        .plan_merge(&existing, &policy)
        .with_context(|| format!("Planning import of {:?}", args.input.input))?;

    if let Some(path) = &args.output {
        let mut writer = io_utils::open_plan_writer(Some(path.as_path()))?;
        let written = io_utils::write_plan(&mut writer, &outcome)?;
        info!("Wrote {written} planned action(s) to {path:?}");
        if io_utils::is_dash(path) {
            return Ok(());
        }
    }

    match args.input.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Serializing merge outcome")?
            );
        }
        OutputFormat::Table => {
            print!("{}", report::render_outcome(&outcome));
            if !result.invalid_rows.is_empty() {
                println!();
                print!("{}", report::render_invalid_rows(&result.invalid_rows));
            }
        }
    }
    Ok(())
}
