//! Single-entry zip deployment packages.
//!
//! A package always holds exactly one file: the source `<base>.<ext>` from the
//! layout's source directory, stored under the layout's fixed entry name so the
//! function's handler reference stays valid across code updates.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::PackageError;

/// Largest zip the function service accepts inline in a create/update request.
pub const DIRECT_UPLOAD_LIMIT_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PackageLayout {
    pub source_dir: PathBuf,
    /// Extension appended to the base name, without the dot. Empty for none.
    pub source_extension: String,
    pub entry_name: String,
    pub output_file: String,
    /// Marks the entry `0o755`, required for a native `bootstrap`.
    pub executable: bool,
}

impl Default for PackageLayout {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("assets"),
            source_extension: "rb".to_string(),
            entry_name: "lambda_function.rb".to_string(),
            output_file: "lambda_function.zip".to_string(),
            executable: false,
        }
    }
}

impl PackageLayout {
    /// Layout for a natively compiled handler deployed on an OS-only runtime.
    pub fn bootstrap(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            source_extension: String::new(),
            entry_name: "bootstrap".to_string(),
            output_file: "bootstrap.zip".to_string(),
            executable: true,
        }
    }

    pub fn source_path(&self, source_base_name: &str) -> PathBuf {
        if self.source_extension.is_empty() {
            self.source_dir.join(source_base_name)
        } else {
            self.source_dir
                .join(format!("{source_base_name}.{}", self.source_extension))
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.source_dir.join(&self.output_file)
    }
}

/// Rebuilds the archive for `source_base_name` from scratch and returns its bytes.
///
/// Any archive left at the output path by an earlier build is removed first.
pub fn build_deployment_package(
    layout: &PackageLayout,
    source_base_name: &str,
) -> Result<Vec<u8>, PackageError> {
    let source_path = layout.source_path(source_base_name);
    if !source_path.is_file() {
        return Err(PackageError::MissingSource { path: source_path });
    }

    let output_path = layout.output_path();
    remove_stale_archive(&output_path)?;

    let source = fs::read(&source_path).map_err(|source| PackageError::Io {
        action: "read",
        path: source_path.clone(),
        source,
    })?;
    let archive = zip_single_entry(&layout.entry_name, &source, layout.executable)?;

    fs::write(&output_path, &archive).map_err(|source| PackageError::Io {
        action: "write",
        path: output_path.clone(),
        source,
    })?;
    Ok(archive)
}

fn remove_stale_archive(path: &Path) -> Result<(), PackageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PackageError::Io {
            action: "remove",
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn zip_single_entry(
    entry_name: &str,
    contents: &[u8],
    executable: bool,
) -> Result<Vec<u8>, PackageError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(if executable { 0o755 } else { 0o644 });
    zip.start_file(entry_name, options)?;
    zip.write_all(contents).map_err(zip::result::ZipError::Io)?;
    Ok(zip.finish()?.into_inner())
}
