//! `projreg` command-line driver.
//!
//! # Responsibility
//! - Run duplicate checks against a registry database from the shell.
//! - Print outcomes as JSON and map error classes to distinct exit codes.
//!
//! # Invariants
//! - Any check outcome, including a near-duplicate, exits with status 0.
//! - Flags override `PROJREG_*` environment settings.

use clap::{Parser, Subcommand};
use log::error;
use projreg_core::db::open_db;
use projreg_core::{
    init_logging, CheckError, CoreConfig, CycleId, CyclePolicy, DuplicateCheckService,
    SqliteProjectStore, SubmissionCandidate,
};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;
const EXIT_CONFLICT: u8 = 3;
const EXIT_STORE: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "projreg", version, about = "Project registry duplicate checker")]
struct Cli {
    /// SQLite database file (default: $PROJREG_DB or ./projreg.sqlite3)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Comma-separated months attributed to the next cycle, e.g. `10,11,12`
    #[arg(long, global = true)]
    rollover_months: Option<CyclePolicy>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files (stderr when unset)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a submission and record it when novel
    Check {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// List accepted projects of a cycle (default: current cycle)
    Corpus {
        #[arg(long)]
        cycle: Option<CycleId>,
    },
    /// Print the cycle new submissions are attributed to today
    Cycle,
}

impl Cli {
    fn apply_to(&self, config: &mut CoreConfig) {
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(policy) = &self.rollover_months {
            config.cycle_policy = policy.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    cli.apply_to(&mut config);

    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("warning: logging disabled: {err}");
    }

    match run(&cli.command, &config) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error!(
                "event=cli_command module=cli status=error exit_code={}",
                failure.exit_code
            );
            eprintln!("error: {}", failure.message);
            ExitCode::from(failure.exit_code)
        }
    }
}

#[derive(Debug)]
struct CliFailure {
    exit_code: u8,
    message: String,
}

impl CliFailure {
    fn new(exit_code: u8, message: impl ToString) -> Self {
        Self {
            exit_code,
            message: message.to_string(),
        }
    }
}

impl From<CheckError> for CliFailure {
    fn from(err: CheckError) -> Self {
        let exit_code = match &err {
            CheckError::InvalidInput(_) | CheckError::InvalidText(_) => EXIT_INVALID_INPUT,
            CheckError::DuplicateTitle { .. } => EXIT_CONFLICT,
            CheckError::CorpusFetch(_) | CheckError::Persistence(_) => EXIT_STORE,
        };
        Self::new(exit_code, err)
    }
}

fn run(command: &Command, config: &CoreConfig) -> Result<String, CliFailure> {
    let conn = open_db(&config.db_path).map_err(|err| CliFailure::new(EXIT_STORE, err))?;
    let store =
        SqliteProjectStore::try_new(&conn).map_err(|err| CliFailure::new(EXIT_STORE, err))?;
    let service = DuplicateCheckService::new(store, config.cycle_policy.clone());

    let json = match command {
        Command::Check { title, description } => {
            let candidate = SubmissionCandidate::new(title.as_str(), description.as_str());
            let outcome = service.check_similarity(&candidate)?;
            serde_json::to_string_pretty(&outcome)
        }
        Command::Corpus { cycle } => {
            let cycle = cycle.unwrap_or_else(|| service.current_cycle());
            let entries = service.cycle_corpus(cycle)?;
            serde_json::to_string_pretty(&entries)
        }
        Command::Cycle => serde_json::to_string_pretty(&serde_json::json!({
            "cycle": service.current_cycle(),
            "rollover_months": config.cycle_policy.rollover_months().collect::<Vec<_>>(),
        })),
    };

    json.map_err(|err| CliFailure::new(EXIT_FAILURE, err))
}
