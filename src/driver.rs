//! Per-file pipeline: traverse, evaluate, plan, record, report, flush.

use crate::compdb::CompilationDatabase;
use crate::diagnostic::{DiagnosticRecord, Reporter};
use crate::edit::{EditError, FileBuffer, FlushResult};
use crate::facts::{FactProvider, TranslationUnit};
use crate::frontend::{Frontend, FrontendError};
use crate::planner::{EditPlanner, Plan};
use crate::rules::{self, RuleSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Frontend(#[from] FrontendError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub rules: RuleSet,
    /// Render edits but never write them back.
    pub dry_run: bool,
}

/// Tally of one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub accepted: usize,
    pub duplicates: usize,
    pub already_present: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Written,
    Unchanged,
    /// Edits were planned but `dry_run` kept the file untouched.
    DryRun,
    /// The dump does not describe the current file contents.
    Stale,
    /// Edits were planned but writing the file failed.
    WriteFailed(String),
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub buffer: FileBuffer,
    pub stats: RewriteStats,
    pub status: FileStatus,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
    /// Files that produced no facts or could not be read.
    pub failures: Vec<(PathBuf, DriverError)>,
}

impl RunSummary {
    pub fn edits(&self) -> usize {
        self.files.iter().map(|f| f.stats.accepted).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every enabled rule over `facts`, recording accepted edits into
/// `buffer` and reporting one diagnostic per edit.
///
/// Candidates are planned against the unedited text, so traversal order
/// never affects where an edit lands.
pub fn rewrite<P, R>(
    buffer: &mut FileBuffer,
    facts: &P,
    rules: &RuleSet,
    reporter: &mut R,
) -> RewriteStats
where
    P: FactProvider + ?Sized,
    R: Reporter + ?Sized,
{
    let mut planner = EditPlanner::new();
    let mut stats = RewriteStats::default();
    let mut accepted = Vec::new();

    facts.for_each_declaration(&mut |decl| {
        let Some(candidate) = rules::evaluate(decl, facts, rules) else {
            return;
        };

        match planner.plan(&candidate, buffer.original()) {
            Ok(Plan::Accepted(edit)) => accepted.push((candidate, edit)),
            Ok(Plan::Duplicate) => stats.duplicates += 1,
            Ok(Plan::AlreadyPresent) => stats.already_present += 1,
            Err(e) => {
                warn!(file = %buffer.path().display(), "skipping candidate: {e}");
                stats.rejected += 1;
            }
        }
    });

    for (candidate, edit) in accepted {
        let kind = edit.kind;
        if let Err(e) = buffer.insert(edit) {
            warn!("skipping edit: {e}");
            stats.rejected += 1;
            continue;
        }
        stats.accepted += 1;

        let record = DiagnosticRecord::for_rule(
            buffer.path(),
            buffer.original(),
            candidate.report_at.offset(),
            kind,
        );
        reporter.report(&record);
    }

    debug!(
        file = %buffer.path().display(),
        accepted = stats.accepted,
        duplicates = stats.duplicates,
        already_present = stats.already_present,
        rejected = stats.rejected,
        "traversal finished"
    );
    stats
}

/// Process one file whose facts are already at hand.
pub fn process_unit<R: Reporter + ?Sized>(
    file: &Path,
    unit: &TranslationUnit,
    options: &RunOptions,
    reporter: &mut R,
) -> Result<FileReport, DriverError> {
    let mut buffer = FileBuffer::load(file)?;

    if !unit.matches_content(buffer.original()) {
        reporter.warn(&format!(
            "{}: facts are stale (file changed since the dump was taken); skipped",
            file.display()
        ));
        return Ok(FileReport {
            buffer,
            stats: RewriteStats::default(),
            status: FileStatus::Stale,
        });
    }

    let stats = rewrite(&mut buffer, unit, &options.rules, reporter);

    let status = if !buffer.is_modified() {
        FileStatus::Unchanged
    } else if options.dry_run {
        FileStatus::DryRun
    } else {
        match buffer.flush() {
            Ok(FlushResult::Written { edits, .. }) => {
                info!(file = %file.display(), edits, "file rewritten");
                FileStatus::Written
            }
            Ok(FlushResult::Unchanged { .. }) => FileStatus::Unchanged,
            Err(e) => {
                reporter.warn(&e.to_string());
                FileStatus::WriteFailed(e.to_string())
            }
        }
    };

    Ok(FileReport {
        buffer,
        stats,
        status,
    })
}

/// Runs the pipeline over a list of input files, one at a time.
#[derive(Debug, Clone)]
pub struct Driver {
    frontend: Frontend,
    compdb: Option<CompilationDatabase>,
    forwarded: Vec<String>,
    cwd: PathBuf,
    options: RunOptions,
}

impl Driver {
    pub fn new(frontend: Frontend, options: RunOptions) -> Self {
        Self {
            frontend,
            compdb: None,
            forwarded: Vec::new(),
            cwd: PathBuf::from("."),
            options,
        }
    }

    pub fn with_compdb(mut self, compdb: CompilationDatabase) -> Self {
        self.compdb = Some(compdb);
        self
    }

    /// Arguments given after `--`, appended to every file's flags.
    pub fn with_forwarded_args(mut self, args: Vec<String>) -> Self {
        self.forwarded = args;
        self
    }

    /// Directory relative input paths are resolved against for database
    /// lookups.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Front-end flags for `file`: database entry first, then forwarded args.
    pub fn flags_for(&self, file: &Path) -> Vec<String> {
        let mut flags = match &self.compdb {
            Some(db) => match db.lookup(file, &self.cwd) {
                Some(entry) => entry.flags(),
                None => {
                    warn!(
                        file = %file.display(),
                        "no compile command found; using forwarded flags only"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        flags.extend(self.forwarded.iter().cloned());
        flags
    }

    pub fn process_file<R: Reporter + ?Sized>(
        &self,
        file: &Path,
        reporter: &mut R,
    ) -> Result<FileReport, DriverError> {
        let flags = self.flags_for(file);
        let unit = self.frontend.facts_for(file, &flags)?;
        debug!(file = %file.display(), main = %unit.main_path().display(), "facts loaded");
        process_unit(file, &unit, &self.options, reporter)
    }

    /// Process every file; a failure on one file never stops the others.
    pub fn run<R: Reporter + ?Sized>(&self, files: &[PathBuf], reporter: &mut R) -> RunSummary {
        let mut summary = RunSummary::default();

        for file in files {
            info!(file = %file.display(), "processing");
            match self.process_file(file, reporter) {
                Ok(report) => summary.files.push(report),
                Err(e) => {
                    reporter.warn(&format!("{}: {e}", file.display()));
                    summary.failures.push((file.clone(), e));
                }
            }
        }

        summary
    }
}
