// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turning command-line paths into source files.

use std::path::{Path, PathBuf};

use lipika_core::error::{LipikaError, Result};
use lipika_core::types::{MediaKind, SourceFile};
use tracing::{debug, warn};

/// Expand `paths` into the files to process.
///
/// Files are taken as given. A directory contributes its direct children
/// with an image or PDF extension, sorted by name; anything else in it is
/// ignored.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_supported(p))
                .collect();
            found.sort();
            debug!(dir = %path.display(), files = found.len(), "Directory expanded");
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaKind::from_extension)
        .is_some()
}

/// Read a file into a source named after its file name.
pub fn load_source(path: &Path) -> Result<SourceFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LipikaError::UnsupportedSource(path.display().to_string()))?
        .to_string();
    let bytes = std::fs::read(path)?;
    SourceFile::from_name(name, bytes)
}

/// Load every path, skipping (with a warning) the ones that cannot be used.
pub fn load_sources(paths: &[PathBuf]) -> Vec<SourceFile> {
    paths
        .iter()
        .filter_map(|path| match load_source(path) {
            Ok(source) => Some(source),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Skipping input");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_expand_to_supported_files_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.pdf", "a.JPG", "notes.txt", "c.png"] {
            std::fs::write(dir.path().join(name), b"x").expect("write");
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).expect("subdir");
        let loose = dir.path().join("notes.txt");

        let files = expand_paths(&[dir.path().to_path_buf(), loose.clone()]).expect("expand");
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.pdf", "c.png", "notes.txt"]);
    }

    #[test]
    fn unsupported_and_missing_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("scan.pdf");
        let bad = dir.path().join("notes.txt");
        std::fs::write(&good, b"%PDF").expect("write");
        std::fs::write(&bad, b"hello").expect("write");

        let sources = load_sources(&[good, bad, dir.path().join("missing.png")]);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "scan.pdf");
        assert_eq!(sources[0].kind, MediaKind::Pdf);
    }
}
