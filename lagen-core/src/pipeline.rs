//! Entry Orchestrator
//!
//! Every entry moves through `Pending → Validated → Built → Written →
//! DependenciesInstalled → Done`, or stops in `Failed`. Artifacts are fully
//! rendered in memory before the first write, so a rejected entry leaves no
//! files behind.
//!
//! An unknown kind aborts the run. Any other failure only fails its own entry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::thread;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::commands::resolve_install;
use crate::config::{Entry, GlobalConfig};
use crate::error::GenerateError;
use crate::graph::build_graph;
use crate::hashing::file_matches;
use crate::install::DependencyInstaller;
use crate::kinds::LambdaKind;
use crate::makefile::render;
use crate::manifest::{build_manifest, render_manifest, MANIFEST_FILE};
use crate::validation::Validator;
use crate::GENERATOR_VERSION;

pub const MAKEFILE: &str = "Makefile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Validated,
    Built,
    Written,
    DependenciesInstalled,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntryState {
    Reached { stage: Stage },
    Failed { after: Stage, reason: String },
}

/// Everything one entry produces, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub makefile: String,
    pub manifest: Option<String>,
    pub install_command: String,
}

impl LambdaKind {
    pub fn generate(self, entry: &Entry, config: &GlobalConfig) -> Result<Artifacts, GenerateError> {
        let model = build_graph(entry, self, &config.environment)?;
        let install_command = resolve_install(entry, self)?;

        let manifest = match self {
            LambdaKind::Node => Some(render_manifest(&build_manifest(entry, config))?),
            LambdaKind::Go => None,
        };

        Ok(Artifacts {
            makefile: render(&model),
            manifest,
            install_command,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    pub name: String,
    pub kind: LambdaKind,
    pub state: EntryState,
    pub warnings: Vec<String>,
    pub files: Vec<WrittenFile>,
}

impl EntryOutcome {
    fn new(entry: &Entry, kind: LambdaKind) -> Self {
        Self {
            name: entry.name.clone(),
            kind,
            state: EntryState::Reached { stage: Stage::Pending },
            warnings: vec![],
            files: vec![],
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == EntryState::Reached { stage: Stage::Done }
    }

    pub fn stage(&self) -> Stage {
        match &self.state {
            EntryState::Reached { stage } => *stage,
            EntryState::Failed { after, .. } => *after,
        }
    }

    fn advance(&mut self, stage: Stage) {
        self.state = EntryState::Reached { stage };
    }

    fn fail(mut self, err: GenerateError) -> Self {
        error!(entry = %self.name, error = %err, "entry failed");
        self.state = EntryState::Failed {
            after: self.stage(),
            reason: err.to_string(),
        };
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generator_version: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<EntryOutcome>,
    /// Set when the run stopped before every entry was processed.
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.aborted.is_none() && self.outcomes.iter().all(EntryOutcome::is_success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn exit_code(&self) -> u8 {
        if self.success() { 0 } else { 1 }
    }
}

/// Hooks for a live progress trail. Calls may arrive from worker threads.
pub trait Progress: Sync {
    fn entry_started(&self, _entry: &Entry) {}
    fn entry_finished(&self, _outcome: &EntryOutcome) {}
}

/// Reports nothing.
pub struct Quiet;

impl Progress for Quiet {}

pub struct Orchestrator<'a> {
    config: &'a GlobalConfig,
    installer: &'a dyn DependencyInstaller,
    progress: &'a dyn Progress,
    validator: Validator,
    jobs: usize,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a GlobalConfig, installer: &'a dyn DependencyInstaller) -> Self {
        Self {
            config,
            installer,
            progress: &Quiet,
            validator: Validator::new(),
            jobs: 1,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Worker threads to use; `1` processes entries in order on the caller's thread.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn run(&self) -> RunReport {
        let started_at = Utc::now();
        info!(entries = self.config.entries.len(), jobs = self.jobs, "generating entries");

        let (outcomes, aborted) = if self.jobs > 1 {
            self.run_concurrent()
        } else {
            self.run_sequential()
        };

        RunReport {
            generator_version: GENERATOR_VERSION,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            aborted,
        }
    }

    fn run_sequential(&self) -> (Vec<EntryOutcome>, Option<String>) {
        let mut outcomes = vec![];
        for entry in &self.config.entries {
            let kind = match entry.kind.parse::<LambdaKind>() {
                Ok(kind) => kind,
                Err(err) => {
                    error!(entry = %entry.name, error = %err, "aborting run");
                    return (outcomes, Some(err.to_string()));
                }
            };
            outcomes.push(self.process(entry, kind));
        }
        (outcomes, None)
    }

    /// Kinds are all resolved up front, so an unknown kind aborts before any
    /// task starts.
    fn run_concurrent(&self) -> (Vec<EntryOutcome>, Option<String>) {
        let entries = &self.config.entries;
        let kinds = match entries
            .iter()
            .map(|e| e.kind.parse::<LambdaKind>())
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(kinds) => kinds,
            Err(err) => {
                error!(error = %err, "aborting run");
                return (vec![], Some(err.to_string()));
            }
        };

        let (job_tx, job_rx) = mpsc::channel::<usize>();
        for index in 0..entries.len() {
            if job_tx.send(index).is_err() {
                break;
            }
        }
        drop(job_tx);
        let job_rx = Mutex::new(job_rx);
        let (result_tx, result_rx) = mpsc::channel::<(usize, EntryOutcome)>();

        let workers = self.jobs.min(entries.len()).max(1);
        debug!(workers, "starting worker pool");

        thread::scope(|s| {
            for _ in 0..workers {
                let tx = result_tx.clone();
                let job_rx = &job_rx;
                let kinds = &kinds;
                s.spawn(move || loop {
                    let next = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok(index) = next else { break };
                    let outcome = self.process(&entries[index], kinds[index]);
                    if tx.send((index, outcome)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<(usize, EntryOutcome)> = result_rx.into_iter().collect();
        results.sort_by_key(|(index, _)| *index);
        (results.into_iter().map(|(_, outcome)| outcome).collect(), None)
    }

    fn process(&self, entry: &Entry, kind: LambdaKind) -> EntryOutcome {
        self.progress.entry_started(entry);
        let outcome = self.generate_entry(entry, kind);
        self.progress.entry_finished(&outcome);
        outcome
    }

    /// Run one entry of a known kind through its whole lifecycle.
    pub fn generate_entry(&self, entry: &Entry, kind: LambdaKind) -> EntryOutcome {
        let mut outcome = EntryOutcome::new(entry, kind);

        match self.validator.validate(entry, kind) {
            Ok(warnings) => {
                for warning in warnings {
                    warn!(entry = %entry.name, rule = warning.rule, "{}", warning.message);
                    outcome.warnings.push(warning.message);
                }
            }
            Err(err) => return outcome.fail(err.into()),
        }
        outcome.advance(Stage::Validated);

        let artifacts = match kind.generate(entry, self.config) {
            Ok(artifacts) => artifacts,
            Err(err) => return outcome.fail(err),
        };
        outcome.advance(Stage::Built);

        let dir = self.config.entry_dir(entry);
        match self.write_artifacts(entry, &dir, &artifacts) {
            Ok(files) => outcome.files = files,
            Err(err) => return outcome.fail(err),
        }
        outcome.advance(Stage::Written);

        if kind.spec().has_manifest && entry.has_dependencies() {
            match self.installer.install(entry, &dir, &artifacts.install_command) {
                Ok(true) => outcome.advance(Stage::DependenciesInstalled),
                Ok(false) => debug!(entry = %entry.name, "dependencies not installed"),
                Err(err) => {
                    warn!(entry = %entry.name, error = %err, "dependency install failed");
                    outcome.warnings.push(err.to_string());
                }
            }
        }

        outcome.advance(Stage::Done);
        info!(entry = %entry.name, %kind, "entry generated");
        outcome
    }

    fn write_artifacts(
        &self,
        entry: &Entry,
        dir: &Path,
        artifacts: &Artifacts,
    ) -> Result<Vec<WrittenFile>, GenerateError> {
        fs::create_dir_all(dir).map_err(|e| GenerateError::io(&entry.name, dir, e))?;

        let mut files = vec![write_if_changed(entry, &dir.join(MAKEFILE), &artifacts.makefile)?];
        if let Some(manifest) = &artifacts.manifest {
            files.push(write_if_changed(entry, &dir.join(MANIFEST_FILE), manifest)?);
        }
        Ok(files)
    }
}

/// Replace `path` atomically with `content`, unless it already matches.
fn write_if_changed(entry: &Entry, path: &Path, content: &str) -> Result<WrittenFile, GenerateError> {
    let io_err = |e: std::io::Error| GenerateError::io(&entry.name, path, e);

    if file_matches(path, content).map_err(io_err)? {
        debug!(path = %path.display(), "unchanged");
        return Ok(WrittenFile {
            path: path.to_path_buf(),
            changed: false,
        });
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), bytes = content.len(), "written");
    Ok(WrittenFile {
        path: path.to_path_buf(),
        changed: true,
    })
}
