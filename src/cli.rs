use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Validate and plan bulk client imports from CSV files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse and validate an upload, reporting valid and invalid rows
    Parse(ParseArgs),
    /// Plan inserts and updates for an upload against existing clients
    Plan(PlanArgs),
    /// Print a sample upload with every recognized column
    Template,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Upload to read (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML policy file (size limit, default status, email checks)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Maximum upload size in bytes, overriding the policy file
    #[arg(long = "max-size")]
    pub max_size: Option<usize>,
    /// Character encoding of the upload (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Also list the rows that passed validation
    #[arg(long = "show-valid")]
    pub show_valid: bool,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Stored clients to match against (.json array or .csv with id,name,email)
    #[arg(short = 'e', long = "existing")]
    pub existing: Option<PathBuf>,
    /// Write the planned actions as CSV to this path (`-` for stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}
