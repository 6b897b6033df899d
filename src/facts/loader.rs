use crate::facts::schema::{TranslationUnitFacts, ValidationError};
use crate::facts::unit::TranslationUnit;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactsError {
    #[error("failed to read fact dump from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse fact dump{}: {source}", display_path(path))]
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },

    #[error("invalid fact dump{}: {source}", display_path(path))]
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

impl FactsError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            FactsError::Json { path: None, source } => FactsError::Json {
                path: Some(path),
                source,
            },
            FactsError::Validation { path: None, source } => FactsError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<TranslationUnit, FactsError> {
    let facts: TranslationUnitFacts =
        serde_json::from_str(input).map_err(|source| FactsError::Json { path: None, source })?;
    facts
        .validate()
        .map_err(|source| FactsError::Validation { path: None, source })?;
    Ok(TranslationUnit::new(facts))
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<TranslationUnit, FactsError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| FactsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}
