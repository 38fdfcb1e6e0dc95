mod cli;
mod commands;
mod config;
mod paths;
mod prompt;
mod runner;
mod ui;
mod units;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::SysunitConfig;
use std::io;
use std::process::ExitCode;
use unitkit::{ENGINE_FAILURE_EXIT_CODE, Registry, report};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub config: SysunitConfig,
}

impl Context {
    /// Build the unit registry from built-ins and the configured search path
    pub fn registry(&self) -> Result<Registry> {
        units::build_registry(&self.config.unit_path())
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are not failures
            let code = if err.use_stderr() {
                ENGINE_FAILURE_EXIT_CODE
            } else {
                0
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            ui::error(&describe(&err));
            ExitCode::from(ENGINE_FAILURE_EXIT_CODE)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let Cli {
        verbose,
        config,
        command,
        ..
    } = cli;

    let context = || -> Result<Context> {
        Ok(Context {
            verbose,
            config: SysunitConfig::load(config.as_deref())?,
        })
    };

    match command {
        Command::Apply(args) => commands::run::run(&context()?, "apply", &args),
        Command::Check(args) => commands::run::run(&context()?, "check", &args),
        Command::Rollback(args) => commands::run::run(&context()?, "rollback", &args),
        Command::Units { json } => commands::units::run(&context()?, json).map(|()| 0),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sysunit", &mut io::stdout());
            Ok(0)
        }
    }
}

/// Bare engine errors get their category; anything else its context chain
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<unitkit::Error>() {
        Some(engine) if err.to_string() == engine.to_string() => report::diagnostic(engine),
        _ => format!("{:#}", err),
    }
}
