// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Debug export of rewritten definitions.
//!
//! Writes `<binary name>.json` (the definition) and `<binary name>.txt` (its
//! disassembly) into the configured directory.

use crate::classfile::{disasm, ClassDef};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize definition: {0}")]
    Json(#[from] serde_json::Error),
}

fn write_file(path: PathBuf, contents: &str) -> Result<PathBuf, ExportError> {
    std::fs::write(&path, contents).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Export `class` into `dir`, creating it if needed. Returns the written paths.
pub fn export_class(dir: &Path, class: &ClassDef) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let stem = class.binary_name();
    let json = serde_json::to_string_pretty(class)?;
    let written = vec![
        write_file(dir.join(format!("{}.json", stem)), &json)?,
        write_file(dir.join(format!("{}.txt", stem)), &disasm::render(class))?,
    ];
    log::debug!("[recoder] exported {} to {}", class.name, dir.display());
    Ok(written)
}
