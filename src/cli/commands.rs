//! CLI command definitions

use crate::core::StrategyKind;
use clap::Args;

/// Analyse a script
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the script file
    #[arg(short, long)]
    pub script: String,

    /// Script identifier (defaults to the file stem)
    #[arg(long)]
    pub script_id: Option<String>,

    /// Stations to skip
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Stations to run first
    #[arg(long, value_delimiter = ',')]
    pub priority: Vec<String>,

    /// Per-attempt timeout for every station, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Scheduling strategy (overrides the config file)
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Don't save execution to history
    #[arg(long)]
    pub no_history: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List stations
#[derive(Debug, Args, Clone)]
pub struct StationsCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to configuration YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show execution history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent executions to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a single execution
    #[arg(long)]
    pub execution_id: Option<String>,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sequential => StrategyKind::Sequential,
            StrategyArg::Parallel => StrategyKind::Parallel,
            StrategyArg::ParallelLimited => StrategyKind::ParallelLimited,
        }
    }
}
