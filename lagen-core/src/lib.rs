//! lagen - Makefile and manifest scaffolding for serverless entries
//!
//! Each configured entry gets a generated `Makefile` built from a rule graph
//! (defaults, explicit rules, derived script rules) and, for node entries, a
//! `package.json`. Generation is deterministic: the same configuration always
//! renders the same bytes.

pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod install;
pub mod kinds;
pub mod makefile;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod validation;

pub use commands::{resolve_build, resolve_install, resolve_script};
pub use config::{Entry, GlobalConfig, InstallMode, RuleSpec, ScriptSpec, CONFIG_PATH};
pub use error::{ConfigError, DependencyInstallError, GenerateError, ValidationError};
pub use graph::{build_graph, MakefileModel};
pub use install::{DependencyInstaller, ShellInstaller, SkipInstall};
pub use kinds::LambdaKind;
pub use makefile::render;
pub use manifest::{build_manifest, render_manifest, ManifestModel};
pub use pipeline::{EntryOutcome, EntryState, Orchestrator, Progress, RunReport, Stage};

/// Recorded in every run report.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
