use crate::facts::SourcePosition;
use crate::rules::RuleKind;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The fundamental edit primitive: a literal insertion at a byte offset.
///
/// Edits are created by the planner and consumed once by a [`FileBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until it is recorded in a FileBuffer"]
pub struct Edit {
    /// Insertion point; `position.offset` is a byte offset into the file.
    pub position: SourcePosition,
    /// Text inserted at the offset
    pub text: &'static str,
    /// Rule that produced the edit
    pub kind: RuleKind,
}

impl Edit {
    pub fn new(position: SourcePosition, text: &'static str, kind: RuleKind) -> Self {
        Self {
            position,
            text,
            kind,
        }
    }

    pub fn offset(&self) -> usize {
        self.position.offset()
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Invalid insertion offset {offset} in {} of length {file_len}", file.display())]
    InvalidOffset {
        file: PathBuf,
        offset: usize,
        file_len: usize,
    },

    #[error("File I/O error on {}: {source}", file.display())]
    Io {
        file: PathBuf,
        source: std::io::Error,
    },
}

/// Result of flushing a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "FlushResult should be checked to know whether the file changed"]
pub enum FlushResult {
    /// File was rewritten
    Written { file: PathBuf, edits: usize },
    /// No edits were recorded; the file was left untouched
    Unchanged { file: PathBuf },
}

/// The bytes of one translation unit's main file while it is being rewritten.
///
/// Sources are not required to be UTF-8; every inserted text is ASCII and
/// lands between tokens, so the rest of the file is written back unchanged.
/// Edits accumulate against the original bytes and are applied in a single
/// pass, highest offset first, so no pending offset is ever invalidated.
#[derive(Debug, Clone)]
pub struct FileBuffer {
    path: PathBuf,
    original: Vec<u8>,
    edits: Vec<Edit>,
}

impl FileBuffer {
    pub fn new(path: impl Into<PathBuf>, original: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            original: original.into(),
            edits: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditError> {
        let path = path.as_ref();
        let original = fs::read(path).map_err(|source| EditError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, original))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The unedited bytes; all edit offsets refer to them.
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_modified(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Record an edit after checking its offset against the original text.
    pub fn insert(&mut self, edit: Edit) -> Result<(), EditError> {
        let offset = edit.offset();
        if offset > self.original.len() {
            return Err(EditError::InvalidOffset {
                file: self.path.clone(),
                offset,
                file_len: self.original.len(),
            });
        }
        self.edits.push(edit);
        Ok(())
    }

    /// Apply all recorded edits and return the new contents.
    ///
    /// Edits sharing an offset keep their recording order in the output.
    pub fn render(&self) -> Vec<u8> {
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        // Stable sort, then reversed iteration: for equal offsets the last
        // recorded edit is spliced first, which leaves recording order intact.
        ordered.sort_by_key(|edit| edit.offset());

        let extra: usize = ordered.iter().map(|edit| edit.text.len()).sum();
        let mut content = Vec::with_capacity(self.original.len() + extra);
        content.extend_from_slice(&self.original);

        for edit in ordered.iter().rev() {
            let at = edit.offset();
            content.splice(at..at, edit.text.bytes());
        }

        content
    }

    /// [`FileBuffer::render`] as text, with invalid UTF-8 replaced, for
    /// display.
    pub fn render_lossy(&self) -> String {
        String::from_utf8_lossy(&self.render()).into_owned()
    }

    /// Write the rendered text back to the original path.
    ///
    /// A buffer without edits does not touch the file.
    pub fn flush(&self) -> Result<FlushResult, EditError> {
        if self.edits.is_empty() {
            return Ok(FlushResult::Unchanged {
                file: self.path.clone(),
            });
        }

        let content = self.render();
        atomic_write(&self.path, &content).map_err(|source| EditError::Io {
            file: self.path.clone(),
            source,
        })?;

        // Update mtime so build systems notice the rewrite
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.path, now).map_err(|source| EditError::Io {
            file: self.path.clone(),
            source,
        })?;

        Ok(FlushResult::Written {
            file: self.path.clone(),
            edits: self.edits.len(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left as it was.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;

    temp.write_all(content)?;

    // Flush to disk (fsync)
    temp.as_file().sync_all()?;

    // Keep the original file's permissions
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    // Atomic rename
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
