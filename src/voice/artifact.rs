//! Scoped temporary audio files

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use thiserror::Error;

use super::AudioFormat;
use crate::Result;

/// A temporary file could not be removed
///
/// Never fatal; surfaced to the user as a warning.
#[derive(Debug, Error)]
#[error("failed to remove temporary audio file {}: {source}", path.display())]
pub struct CleanupWarning {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl CleanupWarning {
    pub(crate) const fn new(path: PathBuf, source: io::Error) -> Self {
        Self { path, source }
    }
}

/// Temporary file owned by a single call
///
/// Removed by [`ScratchFile::release`], or on drop if never released.
#[derive(Debug)]
pub(crate) struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    /// Write `bytes` to a fresh temporary file with the given extension
    pub(crate) fn write(bytes: &[u8], format: AudioFormat) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("voxchat-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file, reporting instead of failing
    pub(crate) fn release(self) -> Option<CleanupWarning> {
        let path = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => None,
            // Already gone
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                tracing::warn!(path = %path.display(), error = %source, "failed to remove temp audio file");
                Some(CleanupWarning::new(path, source))
            }
        }
    }
}

/// Scratch files in the temp dir currently holding exactly `bytes`
#[cfg(test)]
pub(crate) fn staged_copies(bytes: &[u8]) -> Vec<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("voxchat-"))
        })
        .filter(|path| std::fs::read(path).is_ok_and(|content| content == bytes))
        .collect()
}

/// Result of consuming an [`AudioArtifact`]
#[derive(Debug)]
pub struct Played<T> {
    /// Outcome of reading and handling the audio
    pub outcome: Result<T>,
    /// Set when the backing file could not be deleted
    pub cleanup: Option<CleanupWarning>,
}

/// Handle to synthesized speech stored in a temporary file
///
/// Consuming the handle reads the audio and deletes the file on every exit
/// path, including when the playback step fails.
#[derive(Debug)]
pub struct AudioArtifact {
    file: ScratchFile,
    format: AudioFormat,
}

impl AudioArtifact {
    pub(crate) fn store(bytes: &[u8], format: AudioFormat) -> io::Result<Self> {
        Ok(Self {
            file: ScratchFile::write(bytes, format)?,
            format,
        })
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Read the audio, hand it to `play`, then delete the file
    #[must_use]
    pub fn play_with<T, F>(self, play: F) -> Played<T>
    where
        F: FnOnce(&[u8], AudioFormat) -> Result<T>,
    {
        let format = self.format;
        let outcome = std::fs::read(self.file.path())
            .map_err(Into::into)
            .and_then(|bytes| play(&bytes, format));
        let cleanup = self.file.release();

        Played { outcome, cleanup }
    }

    /// Read the audio bytes and delete the file
    #[must_use]
    pub fn into_bytes(self) -> Played<Vec<u8>> {
        self.play_with(|bytes, _| Ok(bytes.to_vec()))
    }
}
