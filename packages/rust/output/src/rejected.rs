//! JSON-lines log of observations set aside during a run.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::debug;

use taxonomy_shared::{RejectedObservation, Result, TaxonomyError};

/// Append one JSON line per rejected observation to `path`.
///
/// Returns the number of lines written. Nothing is created when `rejected`
/// is empty.
pub fn append_rejected(path: &Path, rejected: &[RejectedObservation]) -> Result<usize> {
    if rejected.is_empty() {
        return Ok(0);
    }

    let mut buf = String::new();
    for item in rejected {
        let line =
            serde_json::to_string(item).map_err(|e| TaxonomyError::Serialization(e.to_string()))?;
        buf.push_str(&line);
        buf.push('\n');
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TaxonomyError::io(parent, e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TaxonomyError::io(path, e))?;
    file.write_all(buf.as_bytes())
        .map_err(|e| TaxonomyError::io(path, e))?;

    debug!(path = %path.display(), count = rejected.len(), "rejected observations logged");
    Ok(rejected.len())
}

/// Read every entry back from a rejected-items log.
pub fn read_rejected(path: &Path) -> Result<Vec<RejectedObservation>> {
    let file = std::fs::File::open(path).map_err(|e| TaxonomyError::io(path, e))?;
    let mut out = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| TaxonomyError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|e| {
            TaxonomyError::Serialization(format!("{}:{}: {e}", path.display(), n + 1))
        })?;
        out.push(entry);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use taxonomy_shared::{EntityKind, RawObservation, RejectReason};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tb-rejected-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn rejected(index: usize, reason: RejectReason) -> RejectedObservation {
        RejectedObservation {
            index,
            observation: RawObservation::new(EntityKind::Subcategory, "Broken", "javascript:void(0)"),
            reason,
            detail: "unsupported scheme 'javascript'".into(),
        }
    }

    #[test]
    fn appends_across_runs() {
        let tmp = temp_dir();
        let path = tmp.join("rejected.jsonl");

        assert_eq!(append_rejected(&path, &[rejected(2, RejectReason::InvalidUrl)]).unwrap(), 1);
        assert_eq!(
            append_rejected(
                &path,
                &[
                    rejected(0, RejectReason::EmptyName),
                    rejected(1, RejectReason::ParentRejected),
                ],
            )
            .unwrap(),
            2
        );

        let entries = read_rejected(&path).unwrap();
        let reasons: Vec<RejectReason> = entries.iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::InvalidUrl,
                RejectReason::EmptyName,
                RejectReason::ParentRejected,
            ]
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 3);
        assert!(raw.lines().next().unwrap().contains(r#""reason":"invalid_url""#));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn empty_batch_creates_nothing() {
        let tmp = temp_dir();
        let path = tmp.join("rejected.jsonl");
        assert_eq!(append_rejected(&path, &[]).unwrap(), 0);
        assert!(!path.exists());

        std::fs::remove_dir_all(&tmp).ok();
    }
}
