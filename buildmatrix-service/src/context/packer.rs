// Context Packer
// Assembles the tar build context: rendered build definition, filtered file
// tree, and included option files

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::context::ignore::{load_patterns, normalize_patterns, IgnoreSet};
use crate::matrix::models::{OptionValue, ResolvedOption};

/// Reserved archive name of the rendered build definition
pub const BUILD_DEFINITION_NAME: &str = "Dockerfile";

/// Name of the ignore file read from the base directory
pub const IGNORE_FILE_NAME: &str = ".dockerignore";

/// Errors while assembling a build context
#[derive(Debug, Error)]
pub enum PackError {
    #[error("base directory not found: {0}")]
    MissingBaseDir(PathBuf),

    #[error("invalid ignore pattern {0}")]
    InvalidPattern(String),

    #[error("failed to walk base directory: {0}")]
    Walk(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Packs build contexts for one base directory.
///
/// Each call produces a fresh in-memory tar archive; nothing persists after
/// the returned buffer is dropped.
pub struct ContextPacker {
    base_dir: PathBuf,
}

impl ContextPacker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Build a context archive.
    ///
    /// The archive contains the rendered build definition under
    /// [`BUILD_DEFINITION_NAME`], every non-excluded file under the base
    /// directory keyed by relative path (sorted, files only — directories are
    /// never entries), and every file-based option under its context name.
    pub fn pack(
        &self,
        build_definition: &str,
        options: &[ResolvedOption],
    ) -> Result<Vec<u8>, PackError> {
        if !self.base_dir.is_dir() {
            return Err(PackError::MissingBaseDir(self.base_dir.clone()));
        }

        let ignore = IgnoreSet::new(normalize_patterns(load_patterns(&self.base_dir)?))?;

        let mut builder = tar::Builder::new(Vec::new());

        let definition = build_definition.as_bytes();
        let mut header = tar::Header::new_gnu();
        header.set_size(definition.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, BUILD_DEFINITION_NAME, definition)?;

        let mut files = Vec::new();
        collect_files(&self.base_dir, &self.base_dir, &mut files)?;
        files.sort();

        for relative in &files {
            // The reserved entry slot belongs to the rendered definition
            if relative.as_os_str() == BUILD_DEFINITION_NAME {
                continue;
            }
            if ignore.is_excluded(relative) {
                continue;
            }
            builder.append_path_with_name(self.base_dir.join(relative), relative)?;
        }

        for option in options {
            if let OptionValue::File {
                local_path,
                context_name,
                ..
            } = &option.value
            {
                builder.append_path_with_name(local_path, context_name)?;
            }
        }

        Ok(builder.into_inner()?)
    }
}

/// Recursively collect relative file paths under `current`
fn collect_files(
    root: &Path,
    current: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<(), PackError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| {
                    PackError::Walk(format!(
                        "cannot relativize {}: {}",
                        path.display(),
                        e
                    ))
                })?
                .to_path_buf();
            files.push(relative);
        }
    }
    Ok(())
}
