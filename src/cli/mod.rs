//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, RunCommand, StationsCommand, ValidateCommand};
use std::ffi::OsString;

/// Seven Stations screenplay analysis powered by Gemini
#[derive(Debug, Parser, Clone)]
#[command(name = "stations")]
#[command(version)]
#[command(about = "Seven Stations screenplay analysis powered by Gemini", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to orchestrator configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Analyse a script through the stations
    Run(RunCommand),

    /// List the station catalogue
    Stations(StationsCommand),

    /// Validate an orchestrator configuration
    Validate(ValidateCommand),

    /// Show execution history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
