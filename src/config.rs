use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use unitkit::{SshOptions, TransportOptions};

// ============================================================================
// Config Schema
// ============================================================================

/// The sysunit configuration, read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysunitConfig {
    /// Where script units are discovered
    #[serde(default)]
    pub units: UnitsConfig,

    /// Execution limits
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Remote execution over SSH
    #[serde(default)]
    pub ssh: SshConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitsConfig {
    /// Directories scanned for script units, earliest wins
    #[serde(default = "default_unit_path")]
    pub path: Vec<String>,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            path: default_unit_path(),
        }
    }
}

fn default_unit_path() -> Vec<String> {
    vec!["./units".to_string(), "/etc/units".to_string()]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Upper bound on one action, in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// How sysunit is invoked on the remote host
    #[serde(default = "default_remote_command")]
    pub remote_command: String,

    /// Private key tried after the SSH agent
    #[serde(default)]
    pub identity_file: Option<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            remote_command: default_remote_command(),
            identity_file: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_remote_command() -> String {
    "sysunit".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

/// Keys tried when no identity file is configured
const DEFAULT_IDENTITY_FILES: &[&str] = &["~/.ssh/id_ed25519", "~/.ssh/id_rsa"];

impl SysunitConfig {
    /// Load from an explicit file, or from the config directory.
    /// A missing default file yields the default config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = paths::config_file()?;
                if !path.exists() {
                    log::debug!("No config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Unit search path; `SYSUNIT_PATH` wins over the config file
    pub fn unit_path(&self) -> Vec<PathBuf> {
        paths::unit_path_from_env()
            .unwrap_or_else(|| self.units.path.iter().map(|p| paths::expand(p)).collect())
    }

    /// Transport options, with an optional timeout override in seconds
    pub fn transport_options(&self, timeout_override: Option<u64>) -> TransportOptions {
        let timeout = timeout_override
            .or(self.execution.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let identity_files = match &self.ssh.identity_file {
            Some(file) => vec![paths::expand(file)],
            None => DEFAULT_IDENTITY_FILES
                .iter()
                .map(|f| paths::expand(f))
                .collect(),
        };

        TransportOptions {
            timeout,
            ssh: SshOptions {
                port: self.ssh.port,
                remote_command: self.ssh.remote_command.clone(),
                identity_files,
                connect_timeout: Duration::from_secs(self.ssh.connect_timeout_secs),
            },
            prompt: None,
        }
    }
}
