use crate::config::schema::{ToolConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = ".cxx-refactor.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML{}: {source}", in_file(.path))]
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },

    #[error("invalid config{}: {source}", in_file(.path))]
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

fn in_file(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" ({})", path.display()))
        .unwrap_or_default()
}

pub fn load_from_str(input: &str) -> Result<ToolConfig, ConfigError> {
    let config: ToolConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ToolConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load `explicit` if given, else `<dir>/.cxx-refactor.toml` if it exists,
/// else the defaults.
pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<ToolConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }
    let candidate = dir.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        return load_from_path(candidate);
    }
    Ok(ToolConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ColorChoice;
    use crate::diagnostic::MessageFormat;
    use crate::rules::RuleKind;

    #[test]
    fn test_empty_config_is_default() {
        let config = load_from_str("").unwrap();
        assert_eq!(config, ToolConfig::default());
        assert!(RuleKind::ALL
            .iter()
            .all(|rule| config.rule_set().is_enabled(*rule)));
    }

    #[test]
    fn test_full_config() {
        let config = load_from_str(
            r#"
[rules]
copying_range_loop = false

[frontend]
command = "cxx-facts"
args = ["--std=c++17"]

[output]
message_format = "json"
color = "never"
"#,
        )
        .unwrap();

        let rules = config.rule_set();
        assert!(rules.is_enabled(RuleKind::NonVirtualDtor));
        assert!(!rules.is_enabled(RuleKind::CopyingRangeLoop));
        assert_eq!(config.frontend.command.as_deref(), Some("cxx-facts"));
        assert_eq!(config.frontend.args, vec!["--std=c++17"]);
        assert_eq!(config.output.message_format, MessageFormat::Json);
        assert_eq!(config.output.color, ColorChoice::Never);
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = load_from_str("[frontend]\ncommand = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("frontend.command"));
    }

    #[test]
    fn test_bad_toml_rejected() {
        let err = load_from_str("[rules\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn test_resolve_discovers_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[rules]\nmissing_override = false\n",
        )
        .unwrap();

        let config = resolve(None, dir.path()).unwrap();
        assert!(!config.rule_set().is_enabled(RuleKind::MissingOverride));
    }

    #[test]
    fn test_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[frontend]\ncommand = \"\"\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "invalid config ({}): config field 'frontend.command' must not be empty",
                path.display()
            )
        );
    }

    #[test]
    fn test_resolve_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(None, dir.path()).unwrap(), ToolConfig::default());
    }

    #[test]
    fn test_resolve_explicit_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = resolve(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
