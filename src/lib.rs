//! cxx-refactor: automated source-to-source fixes for C++
//!
//! Rewrites three code-quality defects in place, one diagnostic per rewrite:
//!
//! - non-virtual destructor in a class with subclasses: insert `virtual `
//! - overriding method without a marker: insert ` override`
//! - `const T x` range-for variable of non-fundamental type: insert `&`
//!
//! # Architecture
//!
//! Parsing and semantic resolution belong to a C++ front-end. The crate
//! only sees its answers through the [`FactProvider`] trait; the shipped
//! provider is a JSON fact dump ([`TranslationUnit`]).
//!
//! Rules are pure predicates that yield a [`rules::Candidate`]. The
//! [`EditPlanner`] checks the anchor text and deduplicates per file, and
//! every accepted insertion lands in a [`FileBuffer`], which applies all
//! edits in one pass and writes atomically.
//!
//! # Safety
//!
//! - Only the main file of a translation unit is ever edited
//! - Anchor text is verified before an edit is accepted
//! - Atomic file writes (tempfile + fsync + rename)
//! - Stale fact dumps are detected by content hash
//! - Idempotent: a second run finds nothing to do
//!
//! # Example
//!
//! ```no_run
//! use cxx_refactor::{CollectingReporter, RunOptions};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let unit = cxx_refactor::facts::load_from_path("shape.cpp.facts.json")?;
//! let mut reporter = CollectingReporter::default();
//! let report = cxx_refactor::driver::process_unit(
//!     Path::new("shape.cpp"),
//!     &unit,
//!     &RunOptions::default(),
//!     &mut reporter,
//! )?;
//! println!("{} edits", report.stats.accepted);
//! # Ok(())
//! # }
//! ```

pub mod compdb;
pub mod config;
pub mod diagnostic;
pub mod driver;
pub mod edit;
pub mod facts;
pub mod frontend;
pub mod planner;
pub mod rules;
pub mod text;
pub mod validation;

pub use diagnostic::{CollectingReporter, DiagnosticRecord, MessageFormat, Reporter, StreamReporter};
pub use driver::{Driver, DriverError, FileReport, FileStatus, RunOptions, RunSummary};
pub use edit::{Edit, EditError, FileBuffer, FlushResult};
pub use facts::{Declaration, FactProvider, SourcePosition, TranslationUnit};
pub use planner::{EditPlanner, Plan, PlanError};
pub use rules::{RuleKind, RuleSet};
