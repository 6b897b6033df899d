//! Bridge to the C++ front-end that produces fact dumps.
//!
//! Facts for an input file come from one of, in order:
//!
//! 1. An external front-end command, run as
//!    `<program> [args] <file> -- <flags>` with the dump on stdout
//! 2. A dump found in a `--facts-dir` whose main file is the input
//! 3. A sidecar dump `<file>.facts.json` next to the input
//!
//! # Example
//!
//! ```no_run
//! use cxx_refactor::frontend::Frontend;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), cxx_refactor::frontend::FrontendError> {
//! let frontend = Frontend::sidecar();
//! let unit = frontend.facts_for(Path::new("src/shape.cpp"), &[])?;
//! println!("main file: {}", unit.main_path().display());
//! # Ok(())
//! # }
//! ```

use crate::facts::{self, FactsError, TranslationUnit};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const SIDECAR_SUFFIX: &str = ".facts.json";

#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("failed to spawn front-end '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("front-end failed on {} ({status}): {stderr}", file.display())]
    Failed {
        file: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("no fact dump found for {}", file.display())]
    NoFacts { file: PathBuf },

    #[error("failed to scan facts directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Facts(#[from] FactsError),
}

/// An external program that prints a fact dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Only the fields needed to index a dump by its main file.
#[derive(Deserialize)]
struct DumpHeader {
    files: Vec<PathBuf>,
    #[serde(default)]
    main_file: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Frontend {
    command: Option<FrontendCommand>,
    dumps: HashMap<PathBuf, PathBuf>,
}

impl Frontend {
    /// Read sidecar dumps only.
    pub fn sidecar() -> Self {
        Self::default()
    }

    pub fn with_command(command: FrontendCommand) -> Self {
        Self {
            command: Some(command),
            dumps: HashMap::new(),
        }
    }

    /// Index every `*.facts.json` under `dir` by the main file it describes.
    ///
    /// Relative main-file paths are resolved against `dir`. Dumps that fail
    /// to parse are skipped here and never matched.
    pub fn index_dir(mut self, dir: &Path) -> Result<Self, FrontendError> {
        for entry in WalkDir::new(dir) {
            let entry = entry?;
            let path = entry.path();
            let is_dump = entry.file_type().is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(SIDECAR_SUFFIX));
            if !is_dump {
                continue;
            }

            let Some(main) = read_main_file(path) else {
                debug!(dump = %path.display(), "skipping unreadable fact dump");
                continue;
            };
            let key = canonical(&dir.join(main));
            debug!(dump = %path.display(), main = %key.display(), "indexed fact dump");
            self.dumps.insert(key, path.to_path_buf());
        }

        info!(count = self.dumps.len(), dir = %dir.display(), "indexed fact dumps");
        Ok(self)
    }

    /// Produce the facts for `file`, forwarding `flags` to a front-end
    /// command when one is configured.
    pub fn facts_for(
        &self,
        file: &Path,
        flags: &[String],
    ) -> Result<TranslationUnit, FrontendError> {
        if let Some(command) = &self.command {
            return run_command(command, file, flags);
        }

        if let Some(dump) = self.dumps.get(&canonical(file)) {
            debug!(file = %file.display(), dump = %dump.display(), "using indexed fact dump");
            return Ok(facts::load_from_path(dump)?);
        }

        let sidecar = sidecar_path(file);
        if sidecar.is_file() {
            debug!(file = %file.display(), dump = %sidecar.display(), "using sidecar fact dump");
            return Ok(facts::load_from_path(&sidecar)?);
        }

        Err(FrontendError::NoFacts {
            file: file.to_path_buf(),
        })
    }
}

/// `<file>.facts.json`, next to the input.
pub fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn read_main_file(dump: &Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(dump).ok()?;
    let header: DumpHeader = serde_json::from_str(&contents).ok()?;
    header.files.into_iter().nth(header.main_file)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn run_command(
    command: &FrontendCommand,
    file: &Path,
    flags: &[String],
) -> Result<TranslationUnit, FrontendError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .arg(file)
        .arg("--")
        .args(flags)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(program = %command.program, file = %file.display(), "running front-end");
    let output = cmd.output().map_err(|source| FrontendError::Spawn {
        program: command.program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(FrontendError::Failed {
            file: file.to_path_buf(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(facts::load_from_str(&stdout)?)
}
