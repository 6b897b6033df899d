//! Rule predicates.
//!
//! Each rule is a pure function from a declaration plus [`FactProvider`]
//! queries to an optional [`Candidate`]. Only declarations located in the
//! main file are eligible; anything reached through an include is ignored.

use crate::facts::{
    Declaration, DestructorDecl, FactProvider, LoopVariableDecl, MethodDecl, SourcePosition,
    TypeClass,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    NonVirtualDtor,
    MissingOverride,
    CopyingRangeLoop,
}

impl RuleKind {
    pub const ALL: [RuleKind; 3] = [
        RuleKind::NonVirtualDtor,
        RuleKind::MissingOverride,
        RuleKind::CopyingRangeLoop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleKind::NonVirtualDtor => "non-virtual-dtor",
            RuleKind::MissingOverride => "missing-override",
            RuleKind::CopyingRangeLoop => "copying-range-loop",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            RuleKind::NonVirtualDtor => "CXR001",
            RuleKind::MissingOverride => "CXR002",
            RuleKind::CopyingRangeLoop => "CXR003",
        }
    }

    /// Diagnostic text reported for every accepted edit.
    pub fn message(self) -> &'static str {
        match self {
            RuleKind::NonVirtualDtor => "non-virtual destructor in a base class; added 'virtual'",
            RuleKind::MissingOverride => {
                "overriding method missing explicit marker; added 'override'"
            }
            RuleKind::CopyingRangeLoop => "range loop copies a non-trivial element; added '&'",
        }
    }

    /// Literal text inserted by the fix.
    pub fn insertion(self) -> &'static str {
        match self {
            RuleKind::NonVirtualDtor => "virtual ",
            RuleKind::MissingOverride => " override",
            RuleKind::CopyingRangeLoop => "&",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown rule '{0}' (known: {known})", known = known_rules())]
pub struct UnknownRule(pub String);

fn known_rules() -> String {
    let known: Vec<&str> = RuleKind::ALL.iter().map(|r| r.name()).collect();
    known.join(", ")
}

impl FromStr for RuleKind {
    type Err = UnknownRule;

    /// Accepts the kebab-case name, the snake_case config key or the code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        RuleKind::ALL
            .into_iter()
            .find(|rule| rule.name() == wanted || rule.code().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| UnknownRule(s.to_string()))
    }
}

/// The set of rules enabled for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    enabled: BTreeSet<RuleKind>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::all()
    }
}

impl RuleSet {
    pub fn all() -> Self {
        Self {
            enabled: RuleKind::ALL.into_iter().collect(),
        }
    }

    pub fn disable(&mut self, rule: RuleKind) {
        self.enabled.remove(&rule);
    }

    pub fn is_enabled(&self, rule: RuleKind) -> bool {
        self.enabled.contains(&rule)
    }
}

/// A rule match awaiting planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub kind: RuleKind,
    /// Dedup key: at most one edit per `(key, kind)`.
    pub key: SourcePosition,
    /// Token the insertion is computed from.
    pub anchor: SourcePosition,
    /// Where the diagnostic is reported.
    pub report_at: SourcePosition,
}

/// Dispatch a declaration to the rule for its kind.
pub fn evaluate<P: FactProvider + ?Sized>(
    decl: &Declaration,
    facts: &P,
    rules: &RuleSet,
) -> Option<Candidate> {
    match decl {
        Declaration::Destructor(d) if rules.is_enabled(RuleKind::NonVirtualDtor) => {
            non_virtual_dtor(d, facts)
        }
        Declaration::Method(m) if rules.is_enabled(RuleKind::MissingOverride) => {
            missing_override(m, facts)
        }
        Declaration::LoopVariable(v) if rules.is_enabled(RuleKind::CopyingRangeLoop) => {
            copying_range_loop(v, facts)
        }
        _ => None,
    }
}

fn in_main_file<P: FactProvider + ?Sized>(facts: &P, position: Option<SourcePosition>) -> bool {
    position.is_some_and(|p| facts.is_in_main_file(p))
}

/// Non-virtual, user-declared destructor of a class with at least one
/// subclass in this translation unit.
pub fn non_virtual_dtor<P: FactProvider + ?Sized>(
    dtor: &DestructorDecl,
    facts: &P,
) -> Option<Candidate> {
    let location = dtor.location?;
    if !facts.is_in_main_file(location) {
        return None;
    }
    if dtor.is_virtual || dtor.is_implicit || dtor.out_of_line {
        return None;
    }

    let Some(definition) = facts.definition_of(dtor.class) else {
        debug!(class = dtor.class.0, "destructor of incomplete class skipped");
        return None;
    };
    if !facts.has_subclass(definition) {
        return None;
    }

    let begin = dtor.begin.unwrap_or(location);
    Some(Candidate {
        kind: RuleKind::NonVirtualDtor,
        key: begin,
        anchor: location,
        report_at: location,
    })
}

/// Method overriding a base virtual without an explicit `override`.
/// Destructors never reach this predicate; they are a separate kind.
pub fn missing_override<P: FactProvider + ?Sized>(
    method: &MethodDecl,
    facts: &P,
) -> Option<Candidate> {
    let location = method.location?;
    if !facts.is_in_main_file(location) {
        return None;
    }
    if method.has_override_attr || method.out_of_line {
        return None;
    }
    if facts.overridden_by(method).is_empty() {
        return None;
    }

    if !in_main_file(facts, method.rparen) {
        debug!(method = %method.name, "override candidate without usable parameter list end");
        return None;
    }
    let rparen = method.rparen?;

    Some(Candidate {
        kind: RuleKind::MissingOverride,
        key: location,
        anchor: rparen,
        report_at: location,
    })
}

/// `const T x` range-for variable where `T` is neither a reference nor a
/// fundamental type.
pub fn copying_range_loop<P: FactProvider + ?Sized>(
    var: &LoopVariableDecl,
    facts: &P,
) -> Option<Candidate> {
    let location = var.location?;
    if !facts.is_in_main_file(location) {
        return None;
    }

    let ty = var.ty.as_ref()?;
    if !ty.is_const {
        return None;
    }
    match facts.classify(ty) {
        TypeClass::Reference | TypeClass::Fundamental => return None,
        TypeClass::Other => {}
    }

    if !in_main_file(facts, var.type_end) {
        debug!(variable = %var.name, ty = %ty.spelling, "loop variable type has no usable end");
        return None;
    }
    let type_end = var.type_end?;

    Some(Candidate {
        kind: RuleKind::CopyingRangeLoop,
        key: location,
        anchor: type_end,
        report_at: location,
    })
}
