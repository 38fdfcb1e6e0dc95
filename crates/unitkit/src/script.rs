//! Units backed by executables found on a search path
//!
//! An executable file `<dir>/<name>` becomes unit `<name>`. A directory
//! `<dir>/<name>/` holding an executable `unit` file becomes unit `<name>`
//! and runs with that directory as its working directory. The script is
//! invoked as `<exe> <action>` with the arguments exported as environment
//! variables.

use crate::error::{Error, Result};
use crate::outcome::ExecutionOutcome;
use crate::process;
use crate::unit::{Action, ActionContext, Unit};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Actions every script unit answers to
pub const SCRIPT_ACTIONS: &[&str] = &["check", "apply", "rollback"];

/// How a script unit is laid out on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Executable,
    Directory,
}

/// A unit found on the search path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptUnit {
    pub name: String,
    pub path: PathBuf,
    pub kind: ScriptKind,
}

impl ScriptUnit {
    /// The file to execute
    pub fn executable(&self) -> PathBuf {
        match self.kind {
            ScriptKind::Executable => self.path.clone(),
            ScriptKind::Directory => self.path.join("unit"),
        }
    }

    /// Turn into a registrable unit exposing [`SCRIPT_ACTIONS`]
    pub fn into_unit(self) -> Result<Unit> {
        let mut builder = Unit::builder(&self.name)
            .description(format!("Script unit at {}", self.path.display()));

        for action in SCRIPT_ACTIONS {
            builder = builder.action(
                *action,
                ScriptAction {
                    script: self.clone(),
                    action: (*action).to_string(),
                },
            );
        }

        builder.build()
    }
}

/// One action of a script unit
#[derive(Debug)]
struct ScriptAction {
    script: ScriptUnit,
    action: String,
}

impl Action for ScriptAction {
    fn description(&self) -> String {
        format!("Run `{} {}`", self.script.executable().display(), self.action)
    }

    fn run(&self, ctx: &ActionContext) -> anyhow::Result<ExecutionOutcome> {
        let mut cmd = Command::new(self.script.executable());
        cmd.arg(&self.action).envs(ctx.args.iter());

        if self.script.kind == ScriptKind::Directory {
            cmd.current_dir(&self.script.path);
        }

        let outcome = process::run(cmd, ctx.timeout)?.into_outcome()?;
        Ok(outcome)
    }
}

/// Scan the search path once. Earlier directories shadow later ones;
/// missing directories are skipped.
pub fn discover<P: AsRef<Path>>(search_path: &[P]) -> Result<Vec<ScriptUnit>> {
    let mut found: Vec<ScriptUnit> = Vec::new();

    for dir in search_path {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            log::debug!("Skipping missing unit directory {}", dir.display());
            continue;
        }

        let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(fs::DirEntry::file_name);

        for entry in entries {
            let path = entry.path();
            let Some(unit) = inspect(&path)? else {
                continue;
            };

            if let Some(existing) = found.iter().find(|u| u.name == unit.name) {
                log::debug!(
                    "Unit {} at {} is shadowed by {}",
                    unit.name,
                    unit.path.display(),
                    existing.path.display()
                );
                continue;
            }

            log::debug!("Discovered unit {} at {}", unit.name, unit.path.display());
            found.push(unit);
        }
    }

    Ok(found)
}

fn inspect(path: &Path) -> Result<Option<ScriptUnit>> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };
    if name.starts_with('.') {
        return Ok(None);
    }

    let metadata = fs::metadata(path)?;

    if metadata.is_dir() {
        let executable = path.join("unit");
        let is_unit = fs::metadata(&executable)
            .map(|m| is_executable_file(&m))
            .unwrap_or(false);

        if !is_unit {
            return Err(Error::InvalidUnit {
                path: path.to_path_buf(),
                reason: "directory does not contain an executable `unit` file".to_string(),
            });
        }

        return Ok(Some(ScriptUnit {
            name: name.to_string(),
            path: path.to_path_buf(),
            kind: ScriptKind::Directory,
        }));
    }

    if is_executable_file(&metadata) {
        return Ok(Some(ScriptUnit {
            name: name.to_string(),
            path: path.to_path_buf(),
            kind: ScriptKind::Executable,
        }));
    }

    Ok(None)
}

#[cfg(unix)]
fn is_executable_file(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable_file(metadata: &fs::Metadata) -> bool {
    metadata.is_file()
}
