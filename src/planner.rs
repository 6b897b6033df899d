//! Edit planning: turn a rule [`Candidate`] into a concrete [`Edit`].
//!
//! The planner owns the dedup state for one file. Create a fresh planner per
//! file; state never leaks between translation units.

use crate::edit::Edit;
use crate::facts::SourcePosition;
use crate::rules::{Candidate, RuleKind};
use crate::text;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Outcome of planning one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a planned Edit must be recorded in the buffer"]
pub enum Plan {
    /// New edit to apply and report
    Accepted(Edit),
    /// An edit with the same key and rule was already planned for this file
    Duplicate,
    /// The literal text is already in the source at the insertion point
    AlreadyPresent,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("{kind}: anchor offset {offset} is outside the file")]
    AnchorOutOfRange { kind: RuleKind, offset: usize },

    #[error("{kind}: expected {expected} at offset {offset}, found {found:?}")]
    AnchorMismatch {
        kind: RuleKind,
        offset: usize,
        expected: &'static str,
        found: String,
    },
}

#[derive(Debug, Default)]
pub struct EditPlanner {
    planned: HashMap<RuleKind, HashSet<SourcePosition>>,
}

impl EditPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct edits and already-present fixes seen so far.
    pub fn len(&self) -> usize {
        self.planned.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute the insertion for `candidate` against the unedited `source`.
    pub fn plan(&mut self, candidate: &Candidate, source: &[u8]) -> Result<Plan, PlanError> {
        let kind = candidate.kind;
        if self
            .planned
            .get(&kind)
            .is_some_and(|keys| keys.contains(&candidate.key))
        {
            debug!(rule = %kind, key = %candidate.key, "duplicate candidate dropped");
            return Ok(Plan::Duplicate);
        }

        let anchor = candidate.anchor.offset();
        if anchor >= source.len() {
            return Err(PlanError::AnchorOutOfRange {
                kind,
                offset: anchor,
            });
        }

        let (insert_at, present) = match kind {
            RuleKind::NonVirtualDtor => {
                expect_token(kind, source, anchor, "~", "'~'")?;
                (anchor, source[..anchor].ends_with(kind.insertion().as_bytes()))
            }
            RuleKind::MissingOverride => {
                expect_token(kind, source, anchor, ")", "')'")?;
                let after = anchor + 1;
                (after, starts_with_word(&source[after..], kind.insertion()))
            }
            RuleKind::CopyingRangeLoop => {
                let after = text::end_of_token(source, anchor).ok_or_else(|| {
                    PlanError::AnchorMismatch {
                        kind,
                        offset: anchor,
                        expected: "a type token",
                        found: snippet(source, anchor),
                    }
                })?;
                let next = source[after..].iter().find(|b| !b.is_ascii_whitespace());
                (after, next == Some(&b'&'))
            }
        };

        self.planned.entry(kind).or_default().insert(candidate.key);

        if present {
            debug!(rule = %kind, offset = insert_at, "fix already present in source");
            return Ok(Plan::AlreadyPresent);
        }

        let offset = u32::try_from(insert_at).map_err(|_| PlanError::AnchorOutOfRange {
            kind,
            offset: insert_at,
        })?;
        let position = SourcePosition::new(candidate.anchor.file, offset);
        Ok(Plan::Accepted(Edit::new(position, kind.insertion(), kind)))
    }
}

fn expect_token(
    kind: RuleKind,
    source: &[u8],
    offset: usize,
    token: &str,
    expected: &'static str,
) -> Result<(), PlanError> {
    if source
        .get(offset..)
        .is_some_and(|rest| rest.starts_with(token.as_bytes()))
    {
        Ok(())
    } else {
        Err(PlanError::AnchorMismatch {
            kind,
            offset,
            expected,
            found: snippet(source, offset),
        })
    }
}

/// `text` starts with the (space-prefixed) keyword `word` as a whole token.
fn starts_with_word(text: &[u8], word: &str) -> bool {
    let Some(rest) = text.strip_prefix(word.as_bytes()) else {
        return false;
    };
    !rest
        .first()
        .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

fn snippet(source: &[u8], offset: usize) -> String {
    let rest = source.get(offset..).unwrap_or_default();
    String::from_utf8_lossy(&rest[..rest.len().min(12)]).into_owned()
}
