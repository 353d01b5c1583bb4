//! Atomic JSON persistence for taxonomy documents.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use taxonomy_shared::{Result, TaxonomyDocument, TaxonomyError};

use crate::provenance::Provenance;

/// A file that was written, with its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub size_bytes: usize,
    pub sha256: String,
}

/// Document fields plus an optional `provenance` object beside them.
#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    document: &'a TaxonomyDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    provenance: Option<&'a Provenance>,
}

/// Serialize `doc` to JSON and write it atomically to `path`.
#[instrument(skip_all, fields(path = %path.display(), items = doc.items().len()))]
pub fn write_document(
    path: &Path,
    doc: &TaxonomyDocument,
    provenance: Option<&Provenance>,
    pretty: bool,
) -> Result<WrittenFile> {
    let envelope = Envelope {
        document: doc,
        provenance,
    };
    write_json(path, &envelope, pretty)
}

/// Read a JSON file without assuming its shape.
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| TaxonomyError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        TaxonomyError::Serialization(format!("invalid JSON in {}: {e}", path.display()))
    })
}

/// Serialize any value to JSON (with a trailing newline) and write it atomically.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<WrittenFile> {
    let mut content = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| TaxonomyError::Serialization(e.to_string()))?;
    content.push('\n');

    write_atomic(path, content.as_bytes())
}

/// Write to a temp file in the target directory, then rename over `path`.
///
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<WrittenFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| TaxonomyError::io(&dir, e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TaxonomyError::io(path, std::io::Error::other("path has no file name")))?;
    let temp = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::now_v7()));

    std::fs::write(&temp, content).map_err(|e| TaxonomyError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(TaxonomyError::io(path, e));
    }

    let mut hasher = Sha256::new();
    hasher.update(content);
    let written = WrittenFile {
        path: path.to_path_buf(),
        size_bytes: content.len(),
        sha256: format!("{:x}", hasher.finalize()),
    };

    debug!(path = %written.path.display(), bytes = written.size_bytes, "file written");
    Ok(written)
}
