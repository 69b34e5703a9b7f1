use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PipelineError;

/// A scanned page waiting to be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub path: PathBuf,
    pub file_name: String,
    /// File name without its final extension; output files are keyed by it.
    pub stem: String,
}

impl PageImage {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        PageImage {
            path,
            file_name,
            stem,
        }
    }
}

/// List the files directly inside `dir` whose name ends with `suffix`
/// (case-insensitive), sorted by file name.
pub fn list_images(dir: &Path, suffix: &str) -> Result<Vec<PageImage>, PipelineError> {
    let dir_err = |source| PipelineError::InputDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let suffix = suffix.to_lowercase();
    let mut images = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(dir_err)? {
        let entry = entry.map_err(dir_err)?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !name.ends_with(&suffix) {
            continue;
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            debug!("Skipping directory {}", entry.path().display());
            continue;
        }
        images.push(PageImage::new(entry.path()));
    }

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(images)
}
