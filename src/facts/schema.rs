use crate::facts::{ClassId, Declaration, FileId, SourcePosition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Highest fact dump schema version this crate understands.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema() -> u32 {
    SCHEMA_VERSION
}

/// On-disk fact dump for one translation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUnitFacts {
    #[serde(default = "default_schema")]
    pub schema: u32,
    /// File table; a [`FileId`] indexes into it.
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub main_file: FileId,
    /// xxh3-64 of the main file contents at dump time, lowercase hex.
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassFact>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFact {
    pub id: ClassId,
    #[serde(default)]
    pub name: String,
    /// A completed definition exists somewhere in the unit.
    #[serde(default)]
    pub has_definition: bool,
    /// Direct bases.
    #[serde(default)]
    pub bases: Vec<ClassId>,
}

impl TranslationUnitFacts {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.schema > SCHEMA_VERSION {
            issues.push(ValidationIssue::UnsupportedSchema(self.schema));
        }

        if self.files.is_empty() {
            issues.push(ValidationIssue::EmptyFileTable);
        } else if self.main_file.0 as usize >= self.files.len() {
            issues.push(ValidationIssue::UnknownFile {
                context: "main_file".to_string(),
                file: self.main_file,
            });
        }

        let mut ids = HashSet::new();
        for class in &self.classes {
            if !ids.insert(class.id) {
                issues.push(ValidationIssue::DuplicateClass(class.id));
            }
        }

        for class in &self.classes {
            for base in &class.bases {
                if *base == class.id {
                    issues.push(ValidationIssue::SelfDerived(class.id));
                } else if !ids.contains(base) {
                    issues.push(ValidationIssue::UnknownClass {
                        context: format!("bases of class {}", class.id.0),
                        class: *base,
                    });
                }
            }
        }

        for (idx, decl) in self.declarations.iter().enumerate() {
            let context = format!("declarations[{idx}] ({})", decl.kind_name());

            let class = match decl {
                Declaration::Destructor(d) => Some(d.class),
                Declaration::Method(m) => Some(m.class),
                Declaration::LoopVariable(_) => None,
            };
            if let Some(class) = class {
                if !ids.contains(&class) {
                    issues.push(ValidationIssue::UnknownClass {
                        context: context.clone(),
                        class,
                    });
                }
            }

            for position in positions(decl).into_iter().flatten() {
                if position.file.0 as usize >= self.files.len() {
                    issues.push(ValidationIssue::UnknownFile {
                        context: context.clone(),
                        file: position.file,
                    });
                }
            }
        }

        ValidationError::check(issues)
    }
}

fn positions(decl: &Declaration) -> [Option<SourcePosition>; 2] {
    match decl {
        Declaration::Destructor(d) => [d.begin, d.location],
        Declaration::Method(m) => [m.location, m.rparen],
        Declaration::LoopVariable(v) => [v.location, v.type_end],
    }
}

pub type ValidationError = crate::validation::ValidationError<ValidationIssue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    UnsupportedSchema(u32),
    EmptyFileTable,
    UnknownFile { context: String, file: FileId },
    DuplicateClass(ClassId),
    UnknownClass { context: String, class: ClassId },
    SelfDerived(ClassId),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnsupportedSchema(v) => write!(
                f,
                "fact dump schema {v} is newer than supported schema {SCHEMA_VERSION}"
            ),
            ValidationIssue::EmptyFileTable => write!(f, "fact dump has an empty file table"),
            ValidationIssue::UnknownFile { context, file } => {
                write!(f, "{context} refers to unknown file id {}", file.0)
            }
            ValidationIssue::DuplicateClass(id) => write!(f, "class id {} is declared twice", id.0),
            ValidationIssue::UnknownClass { context, class } => {
                write!(f, "{context} refers to unknown class id {}", class.0)
            }
            ValidationIssue::SelfDerived(id) => {
                write!(f, "class id {} lists itself as a base", id.0)
            }
        }
    }
}
