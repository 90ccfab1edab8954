//! Dependency installation step
//!
//! Runs the entry's resolved install command inside its directory once the
//! user agrees. Failures are reported to the caller, which only warns.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::config::Entry;
use crate::error::DependencyInstallError;

pub trait DependencyInstaller: Sync {
    /// Returns `Ok(false)` when the install was declined.
    fn install(&self, entry: &Entry, dir: &Path, command: &str) -> Result<bool, DependencyInstallError>;
}

/// Never installs anything.
pub struct SkipInstall;

impl DependencyInstaller for SkipInstall {
    fn install(&self, entry: &Entry, _dir: &Path, _command: &str) -> Result<bool, DependencyInstallError> {
        debug!(entry = %entry.name, "dependency install disabled");
        Ok(false)
    }
}

/// Asks on the terminal, then runs the command through `sh -c`.
pub struct ShellInstaller {
    assume_yes: bool,
    prompt: Mutex<()>,
}

impl ShellInstaller {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            prompt: Mutex::new(()),
        }
    }

    fn confirm(&self, message: &str) -> Result<bool, DependencyInstallError> {
        if self.assume_yes {
            return Ok(true);
        }
        if !io::stdin().is_terminal() {
            debug!("stdin is not a terminal, declining install");
            return Ok(false);
        }

        // One prompt at a time when entries run concurrently.
        let _guard = self.prompt.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stderr = io::stderr();
        write!(stderr, "{message} [y/N] ").map_err(DependencyInstallError::Prompt)?;
        stderr.flush().map_err(DependencyInstallError::Prompt)?;

        let mut input = String::new();
        io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(DependencyInstallError::Prompt)?;
        Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl DependencyInstaller for ShellInstaller {
    fn install(&self, entry: &Entry, dir: &Path, command: &str) -> Result<bool, DependencyInstallError> {
        if !self.confirm(&format!("Install dependencies for {} with `{command}`?", entry.name))? {
            return Ok(false);
        }

        info!(entry = %entry.name, command, "installing dependencies");
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .status()
            .map_err(|source| DependencyInstallError::Spawn {
                entry: entry.name.clone(),
                command: command.to_string(),
                source,
            })?;

        if status.success() {
            Ok(true)
        } else {
            Err(DependencyInstallError::Failed {
                entry: entry.name.clone(),
                command: command.to_string(),
                status: status.to_string(),
            })
        }
    }
}
