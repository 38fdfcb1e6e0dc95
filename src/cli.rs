use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sysunit")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Apply named configuration units locally or over SSH", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a unit's `apply` action
    Apply(ActionArgs),

    /// Run a unit's `check` action
    Check(ActionArgs),

    /// Run a unit's `rollback` action
    Rollback(ActionArgs),

    /// List registered units, their actions and parameters
    Units {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ActionArgs {
    /// Where to run: ssh://user@host[:port], or local (default)
    #[arg(short, long, value_name = "URI")]
    pub target: Option<String>,

    /// Give up after this many seconds (0 disables the limit)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Unit to run
    pub unit: String,

    /// Arguments for the action, as name=value
    #[arg(value_name = "NAME=VALUE")]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "sysunit",
            "apply",
            "-t",
            "ssh://root@box",
            "args",
            "name=bob",
        ])
        .unwrap();

        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.target.as_deref(), Some("ssh://root@box"));
        assert_eq!(args.unit, "args");
        assert_eq!(args.args, vec!["name=bob"]);
    }

    #[test]
    fn test_parse_remote_reinvocation() {
        let cli =
            Cli::try_parse_from(["sysunit", "check", "--timeout", "30", "apk_install", "package_name=curl"])
                .unwrap();

        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.timeout, Some(30));
        assert!(args.target.is_none());
    }

    #[test]
    fn test_missing_unit_is_usage_error() {
        assert!(Cli::try_parse_from(["sysunit", "rollback"]).is_err());
    }
}
