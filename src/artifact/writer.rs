//! Flat text-file artifact writer.

use crate::models::{PodError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// A named value to persist: one string or an ordered sequence of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactValue<'a> {
    /// Written to `<name>.txt`
    Text(&'a str),
    /// Written to `<name>_0.txt`, `<name>_1.txt`, ...
    Sequence(&'a [String]),
}

impl ArtifactValue<'_> {
    /// Number of files this value produces.
    pub fn file_count(&self) -> usize {
        match self {
            ArtifactValue::Text(_) => 1,
            ArtifactValue::Sequence(items) => items.len(),
        }
    }
}

impl<'a> From<&'a str> for ArtifactValue<'a> {
    fn from(text: &'a str) -> Self {
        ArtifactValue::Text(text)
    }
}

impl<'a> From<&'a String> for ArtifactValue<'a> {
    fn from(text: &'a String) -> Self {
        ArtifactValue::Text(text)
    }
}

impl<'a> From<&'a [String]> for ArtifactValue<'a> {
    fn from(items: &'a [String]) -> Self {
        ArtifactValue::Sequence(items)
    }
}

impl<'a> From<&'a Vec<String>> for ArtifactValue<'a> {
    fn from(items: &'a Vec<String>) -> Self {
        ArtifactValue::Sequence(items)
    }
}

/// Writes named text artifacts into one directory.
///
/// Existing files with the same name are overwritten. Files are written one
/// at a time with no atomicity across a batch.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a scalar artifact is written to.
    pub fn text_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.txt"))
    }

    /// Path element `index` of a sequence artifact is written to.
    pub fn item_path(&self, name: &str, index: usize) -> PathBuf {
        self.dir.join(format!("{name}_{index}.txt"))
    }

    /// Write every artifact, creating the directory if needed.
    ///
    /// Returns written paths in order.
    pub fn write(&self, artifacts: &[(&str, ArtifactValue<'_>)]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PodError::io(format!("creating output directory {}", self.dir.display()), e)
        })?;

        let total = artifacts.iter().map(|(_, v)| v.file_count()).sum();
        let mut written = Vec::with_capacity(total);

        for (name, value) in artifacts {
            match value {
                ArtifactValue::Text(text) => {
                    written.push(self.write_file(name, self.text_path(name), text)?);
                }
                ArtifactValue::Sequence(items) => {
                    for (index, item) in items.iter().enumerate() {
                        let label = format!("{name}_{index}");
                        written.push(self.write_file(&label, self.item_path(name, index), item)?);
                    }
                }
            }
        }

        Ok(written)
    }

    /// Write a single scalar artifact.
    pub fn write_text(&self, name: &str, text: &str) -> Result<PathBuf> {
        let mut paths = self.write(&[(name, ArtifactValue::Text(text))])?;
        paths
            .pop()
            .ok_or_else(|| PodError::Internal(format!("no file written for {name}")))
    }

    fn write_file(&self, label: &str, path: PathBuf, content: &str) -> Result<PathBuf> {
        fs::write(&path, content)
            .map_err(|e| PodError::io(format!("writing {}", path.display()), e))?;
        info!(artifact = label, path = %path.display(), "Saved artifact");
        Ok(path)
    }
}
