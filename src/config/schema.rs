use crate::diagnostic::MessageFormat;
use crate::rules::{RuleKind, RuleSet};
use serde::Deserialize;
use std::fmt;
use std::io::IsTerminal;

fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl ToolConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Some(command) = &self.frontend.command {
            if command.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "frontend.command",
                });
            }
        }

        for (idx, arg) in self.frontend.args.iter().enumerate() {
            if arg.is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    field: "frontend.args",
                    message: format!("argument {idx} is empty"),
                });
            }
        }

        ValidationError::check(issues)
    }

    /// Rules enabled by the `[rules]` table.
    pub fn rule_set(&self) -> RuleSet {
        let mut rules = RuleSet::all();
        for (rule, on) in [
            (RuleKind::NonVirtualDtor, self.rules.non_virtual_dtor),
            (RuleKind::MissingOverride, self.rules.missing_override),
            (RuleKind::CopyingRangeLoop, self.rules.copying_range_loop),
        ] {
            if !on {
                rules.disable(rule);
            }
        }
        rules
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RulesConfig {
    #[serde(default = "enabled")]
    pub non_virtual_dtor: bool,
    #[serde(default = "enabled")]
    pub missing_override: bool,
    #[serde(default = "enabled")]
    pub copying_range_loop: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            non_virtual_dtor: true,
            missing_override: true,
            copying_range_loop: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct FrontendConfig {
    /// Program that prints a fact dump for `<file> -- <flags>` on stdout.
    #[serde(default)]
    pub command: Option<String>,
    /// Extra arguments placed before the file path.
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default)]
    pub message_format: MessageFormat,
    #[serde(default)]
    pub color: ColorChoice,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Whether diagnostics on stderr should be coloured.
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
            }
        }
    }
}

pub type ValidationError = crate::validation::ValidationError<ValidationIssue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "config field '{field}' must not be empty")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "config field '{field}' is invalid: {message}")
            }
        }
    }
}
