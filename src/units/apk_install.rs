//! `apk_install`: manage an Alpine package
//!
//! - `apply` installs `package_name` unless it is already installed
//! - `check` exits 0 when installed, 1 otherwise
//! - `rollback` removes it

use crate::runner;
use anyhow::{Result, bail};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use unitkit::process::ProcessOutput;
use unitkit::{Action, ActionContext, ExecutionOutcome, Param, Unit};

const PARAMS: &[Param] = &[Param::required("package_name", "Alpine package to manage")];

/// Result of a package manager operation that ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Applied,
    Failed { stderr: String },
}

/// Package manager operations the unit needs
///
/// `Err` means the package manager could not be run at all.
pub trait PackageBackend: Send + Sync + fmt::Debug {
    fn is_installed(&self, package: &str, timeout: Option<Duration>) -> Result<bool>;
    fn install(&self, package: &str, timeout: Option<Duration>) -> Result<Change>;
    fn remove(&self, package: &str, timeout: Option<Duration>) -> Result<Change>;
}

/// The real `apk` binary
#[derive(Debug, Default)]
pub struct ApkBackend;

impl ApkBackend {
    fn apk(&self, args: &[&str], timeout: Option<Duration>) -> Result<ProcessOutput> {
        if !runner::command_exists("apk") {
            bail!("apk not found; apk_install only runs on Alpine Linux");
        }
        runner::run_capture("apk", args, timeout)
    }
}

fn into_change(output: ProcessOutput) -> Change {
    if output.success() {
        Change::Applied
    } else {
        Change::Failed {
            stderr: output.stderr,
        }
    }
}

impl PackageBackend for ApkBackend {
    fn is_installed(&self, package: &str, timeout: Option<Duration>) -> Result<bool> {
        Ok(self.apk(&["info", "-e", package], timeout)?.success())
    }

    fn install(&self, package: &str, timeout: Option<Duration>) -> Result<Change> {
        Ok(into_change(self.apk(&["add", "--no-progress", package], timeout)?))
    }

    fn remove(&self, package: &str, timeout: Option<Duration>) -> Result<Change> {
        Ok(into_change(self.apk(&["del", "--no-progress", package], timeout)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Apply,
    Check,
    Rollback,
}

#[derive(Debug)]
struct ApkAction {
    operation: Operation,
    backend: Arc<dyn PackageBackend>,
}

impl Action for ApkAction {
    fn description(&self) -> String {
        match self.operation {
            Operation::Apply => "Install the package if absent",
            Operation::Check => "Report whether the package is installed",
            Operation::Rollback => "Remove the package",
        }
        .to_string()
    }

    fn params(&self) -> &[Param] {
        PARAMS
    }

    fn run(&self, ctx: &ActionContext) -> Result<ExecutionOutcome> {
        let package = ctx.args.require("package_name")?;
        let installed = self.backend.is_installed(package, ctx.timeout)?;

        match self.operation {
            Operation::Check if installed => {
                Ok(ExecutionOutcome::success(format!("{} is installed", package)))
            }
            Operation::Check => Ok(ExecutionOutcome::failure(
                1,
                format!("{} is not installed", package),
            )),
            Operation::Apply if installed => {
                log::info!("{} already installed", package);
                Ok(ExecutionOutcome::success(format!("installed {}", package)))
            }
            Operation::Apply => {
                let change = self.backend.install(package, ctx.timeout)?;
                Ok(outcome(change, format!("installed {}", package), || {
                    format!("failed to install {}", package)
                }))
            }
            Operation::Rollback if !installed => Ok(ExecutionOutcome::success(format!(
                "{} is not installed",
                package
            ))),
            Operation::Rollback => {
                let change = self.backend.remove(package, ctx.timeout)?;
                Ok(outcome(change, format!("removed {}", package), || {
                    format!("failed to remove {}", package)
                }))
            }
        }
    }
}

fn outcome(change: Change, done: String, failed: impl FnOnce() -> String) -> ExecutionOutcome {
    match change {
        Change::Applied => ExecutionOutcome::success(done),
        Change::Failed { stderr } => ExecutionOutcome::failure(1, failed()).with_stderr(stderr),
    }
}

/// Build the unit against a package backend
pub fn unit_with(backend: Arc<dyn PackageBackend>) -> unitkit::Result<Unit> {
    let action = |operation| ApkAction {
        operation,
        backend: Arc::clone(&backend),
    };

    Unit::builder("apk_install")
        .description("Install an Alpine package with apk")
        .action("apply", action(Operation::Apply))
        .action("check", action(Operation::Check))
        .action("rollback", action(Operation::Rollback))
        .build()
}

pub fn unit() -> unitkit::Result<Unit> {
    unit_with(Arc::new(ApkBackend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use unitkit::ArgumentContext;

    /// In-memory package database
    #[derive(Debug, Default)]
    struct MockBackend {
        installed: Mutex<BTreeSet<String>>,
        installs: Mutex<Vec<String>>,
        available: BTreeSet<String>,
    }

    impl MockBackend {
        fn with_available(packages: &[&str]) -> Self {
            Self {
                available: packages.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl PackageBackend for MockBackend {
        fn is_installed(&self, package: &str, _timeout: Option<Duration>) -> Result<bool> {
            Ok(self.installed.lock().unwrap().contains(package))
        }

        fn install(&self, package: &str, _timeout: Option<Duration>) -> Result<Change> {
            if !self.available.contains(package) {
                return Ok(Change::Failed {
                    stderr: format!("ERROR: unable to select packages: {}", package),
                });
            }
            self.installs.lock().unwrap().push(package.to_string());
            self.installed.lock().unwrap().insert(package.to_string());
            Ok(Change::Applied)
        }

        fn remove(&self, package: &str, _timeout: Option<Duration>) -> Result<Change> {
            self.installed.lock().unwrap().remove(package);
            Ok(Change::Applied)
        }
    }

    /// A host without apk
    #[derive(Debug)]
    struct NoApk;

    impl PackageBackend for NoApk {
        fn is_installed(&self, _package: &str, _timeout: Option<Duration>) -> Result<bool> {
            bail!("apk not found")
        }

        fn install(&self, _package: &str, _timeout: Option<Duration>) -> Result<Change> {
            bail!("apk not found")
        }

        fn remove(&self, _package: &str, _timeout: Option<Duration>) -> Result<Change> {
            bail!("apk not found")
        }
    }

    fn run(unit: &Unit, action: &str, tokens: &[&str]) -> Result<ExecutionOutcome> {
        let args = ArgumentContext::from_tokens(tokens).unwrap();
        unit.resolve_action(action)
            .unwrap()
            .run(&ActionContext::new(&args))
    }

    #[test]
    fn test_apply_is_idempotent() {
        let backend = Arc::new(MockBackend::with_available(&["python3"]));
        let unit = unit_with(backend.clone()).unwrap();

        let first = run(&unit, "apply", &["package_name=python3"]).unwrap();
        assert_eq!(first.exit_code, 0);
        assert_eq!(first.message(), "installed python3");

        let second = run(&unit, "apply", &["package_name=python3"]).unwrap();
        assert_eq!(second.exit_code, 0);
        assert_eq!(second.message(), "installed python3");

        assert_eq!(*backend.installs.lock().unwrap(), vec!["python3".to_string()]);
    }

    #[test]
    fn test_apply_unknown_package_is_action_failure() {
        let unit = unit_with(Arc::new(MockBackend::default())).unwrap();

        let outcome = run(&unit, "apply", &["package_name=nope"]).unwrap();
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.message(), "failed to install nope");
        assert!(outcome.stderr.contains("unable to select packages"));
    }

    #[test]
    fn test_check_and_rollback() {
        let unit = unit_with(Arc::new(MockBackend::with_available(&["curl"]))).unwrap();

        let check = run(&unit, "check", &["package_name=curl"]).unwrap();
        assert_eq!(check.exit_code, 1);
        assert_eq!(check.message(), "curl is not installed");

        run(&unit, "apply", &["package_name=curl"]).unwrap();
        let check = run(&unit, "check", &["package_name=curl"]).unwrap();
        assert_eq!(check.exit_code, 0);
        assert_eq!(check.message(), "curl is installed");

        let rollback = run(&unit, "rollback", &["package_name=curl"]).unwrap();
        assert_eq!(rollback.message(), "removed curl");

        let check = run(&unit, "check", &["package_name=curl"]).unwrap();
        assert_eq!(check.exit_code, 1);
    }

    #[test]
    fn test_missing_package_manager_is_error() {
        let unit = unit_with(Arc::new(NoApk)).unwrap();
        let err = run(&unit, "apply", &["package_name=python3"]).unwrap_err();
        assert!(err.to_string().contains("apk not found"));
    }

    #[test]
    fn test_every_action_requires_package_name() {
        let unit = unit().unwrap();
        for (name, action) in unit.actions() {
            let params = action.params();
            assert_eq!(params[0].name, "package_name", "{}", name);
            assert!(params[0].required);
        }
    }
}
