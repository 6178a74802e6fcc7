//! Whole-file artifact writes.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::TelemetryGenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What a generation run did to the artifact on disk.
pub enum WriteOutcome {
    /// The artifact was created or replaced.
    Written,
    /// The artifact already held the generated text and was left alone.
    Unchanged,
}

/// Replaces `path` with `contents` without ever exposing a partial file.
///
/// The text goes to a temporary sibling first and is renamed over the
/// destination once flushed. On failure the temporary file is removed and
/// the destination keeps its previous contents.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), TelemetryGenError> {
    let write_err = |source| TelemetryGenError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let temp = temp_sibling(path);
    let result = write_and_sync(&temp, contents).and_then(|()| fs::rename(&temp, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&temp);
        return Err(write_err(source));
    }

    log::debug!("wrote {} bytes to '{}'", contents.len(), path.display());
    Ok(())
}

/// Writes `contents` unless the file already holds exactly that text.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<WriteOutcome, TelemetryGenError> {
    if read_existing(path)?.as_deref() == Some(contents) {
        return Ok(WriteOutcome::Unchanged);
    }
    write_atomic(path, contents)?;
    Ok(WriteOutcome::Written)
}

/// Current artifact text, or `None` when no artifact exists yet.
pub fn read_existing(path: &Path) -> Result<Option<String>, TelemetryGenError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TelemetryGenError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_and_sync(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()))
}
