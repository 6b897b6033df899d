//! Validation that collects every issue before failing.

use std::fmt;
use thiserror::Error;

/// All issues found in one input, one per line when displayed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_lines(.issues))]
pub struct ValidationError<I: fmt::Debug + fmt::Display> {
    pub issues: Vec<I>,
}

impl<I: fmt::Debug + fmt::Display> ValidationError<I> {
    /// `Ok` when nothing was found.
    pub fn check(issues: Vec<I>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self { issues })
        }
    }
}

fn join_lines<I: fmt::Display>(issues: &[I]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
