//! Compilation database (`compile_commands.json`) lookup.
//!
//! Per-file compiler flags are forwarded to the front-end. A database that
//! fails to parse is an input error: nothing is processed.

use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const DATABASE_FILE_NAME: &str = "compile_commands.json";

#[derive(Error, Debug)]
pub enum CompDbError {
    #[error("failed to read compilation database {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse compilation database {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("compilation database {}: entry {index} has neither 'arguments' nor 'command'", path.display())]
    MissingCommand { path: PathBuf, index: usize },

    #[error("compilation database {}: entry {index} has an unterminated quote", path.display())]
    UnbalancedQuote { path: PathBuf, index: usize },
}

#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    pub directory: PathBuf,
    /// Absolute, lexically normalized source path.
    pub file: PathBuf,
    /// Full command line, compiler first.
    pub arguments: Vec<String>,
}

impl CompileCommand {
    /// Flags worth forwarding: the command line without the compiler, the
    /// source file itself, `-c` and `-o <output>`.
    pub fn flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        let mut args = self.arguments.iter().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => {}
                "-o" => {
                    args.next();
                }
                _ if arg.starts_with("-o") && arg.len() > 2 => {}
                _ if normalize(&self.directory.join(arg)) == self.file => {}
                _ => flags.push(arg.clone()),
            }
        }

        flags
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilationDatabase {
    entries: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// Load from a build directory or directly from a database file.
    pub fn load(build_path: impl AsRef<Path>) -> Result<Self, CompDbError> {
        let build_path = build_path.as_ref();
        let path = if build_path.is_dir() {
            build_path.join(DATABASE_FILE_NAME)
        } else {
            build_path.to_path_buf()
        };

        let contents = fs::read_to_string(&path).map_err(|source| CompDbError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents, &path)
    }

    pub fn parse(contents: &str, path: &Path) -> Result<Self, CompDbError> {
        let raw: Vec<RawEntry> =
            serde_json::from_str(contents).map_err(|source| CompDbError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut entries = Vec::with_capacity(raw.len());
        for (index, entry) in raw.into_iter().enumerate() {
            let arguments = match (entry.arguments, entry.command) {
                (Some(arguments), _) => arguments,
                (None, Some(command)) => {
                    split_command(&command).ok_or_else(|| CompDbError::UnbalancedQuote {
                        path: path.to_path_buf(),
                        index,
                    })?
                }
                (None, None) => {
                    return Err(CompDbError::MissingCommand {
                        path: path.to_path_buf(),
                        index,
                    })
                }
            };
            entries.push(CompileCommand {
                file: normalize(&entry.directory.join(&entry.file)),
                directory: entry.directory,
                arguments,
            });
        }

        Ok(Self { entries })
    }

    /// The first entry compiling `file` (resolved against `cwd` if relative).
    pub fn lookup(&self, file: &Path, cwd: &Path) -> Option<&CompileCommand> {
        let wanted = normalize(&cwd.join(file));
        self.entries.iter().find(|entry| entry.file == wanted)
    }
}

/// Lexical normalization: drop `.` and resolve `..` without touching the
/// file system, so database paths compare equal to command-line paths.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Split a shell-style command line. Handles single quotes, double quotes
/// and backslash escapes; returns `None` on an unterminated quote.
fn split_command(command: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_arg = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        c => current.push(c),
                    }
                }
            }
            '"' => {
                in_arg = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => current.push(chars.next()?),
                        c => current.push(c),
                    }
                }
            }
            '\\' => {
                in_arg = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                in_arg = true;
                current.push(c);
            }
        }
    }

    if in_arg {
        args.push(current);
    }
    Some(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB: &str = r#"[
        {
            "directory": "/work/build",
            "file": "../src/shape.cpp",
            "arguments": ["clang++", "-std=c++17", "-I../include", "-c", "../src/shape.cpp", "-o", "shape.o"]
        },
        {
            "directory": "/work/build",
            "file": "/work/src/main.cpp",
            "command": "g++ -DNAME=\"two words\" -c /work/src/main.cpp -omain.o"
        }
    ]"#;

    #[test]
    fn test_lookup_relative_entry() {
        let db = CompilationDatabase::parse(DB, Path::new("compile_commands.json")).unwrap();
        assert_eq!(db.entries.len(), 2);

        let entry = db
            .lookup(Path::new("src/shape.cpp"), Path::new("/work"))
            .unwrap();
        assert_eq!(entry.flags(), vec!["-std=c++17", "-I../include"]);
    }

    #[test]
    fn test_lookup_command_string() {
        let db = CompilationDatabase::parse(DB, Path::new("compile_commands.json")).unwrap();
        let entry = db
            .lookup(Path::new("/work/src/main.cpp"), Path::new("/elsewhere"))
            .unwrap();
        assert_eq!(entry.flags(), vec!["-DNAME=two words"]);
    }

    #[test]
    fn test_lookup_missing_file() {
        let db = CompilationDatabase::parse(DB, Path::new("compile_commands.json")).unwrap();
        assert!(db.lookup(Path::new("other.cpp"), Path::new("/work")).is_none());
    }

    #[test]
    fn test_malformed_database() {
        let err = CompilationDatabase::parse("{", Path::new("db.json")).unwrap_err();
        assert!(matches!(err, CompDbError::Json { .. }));

        let err = CompilationDatabase::parse(
            r#"[{"directory": "/", "file": "a.cpp"}]"#,
            Path::new("db.json"),
        )
        .unwrap_err();
        assert!(matches!(err, CompDbError::MissingCommand { index: 0, .. }));
    }

    #[test]
    fn test_load_from_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DATABASE_FILE_NAME), "[]").unwrap();
        let db = CompilationDatabase::load(dir.path()).unwrap();
        assert!(db.entries.is_empty());
    }

    #[test]
    fn test_load_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CompilationDatabase::load(dir.path()),
            Err(CompDbError::Io { .. })
        ));
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command(r#"cc -a 'b c' "d\"e" f\ g"#).unwrap(),
            vec!["cc", "-a", "b c", "d\"e", "f g"]
        );
        assert!(split_command("cc 'open").is_none());
        assert_eq!(split_command("  ").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/work/build/../src/./a.cpp")),
            PathBuf::from("/work/src/a.cpp")
        );
    }
}
