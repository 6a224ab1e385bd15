use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::TrackedQuery;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stored data in {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub fn load_queries(path: &Path) -> Result<Vec<TrackedQuery>, StoreError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no tracked queries yet");
        return Ok(Vec::new());
    }

    let payload = fs::read(path).map_err(|source| StoreError::io(path, source))?;
    let queries: Vec<TrackedQuery> =
        serde_json::from_slice(&payload).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %path.display(), count = queries.len(), "loaded tracked queries");
    Ok(queries)
}

pub fn save_queries(path: &Path, queries: &[TrackedQuery]) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(queries).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &payload).map_err(|source| StoreError::io(path, source))?;

    tracing::debug!(path = %path.display(), count = queries.len(), "saved tracked queries");
    Ok(())
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
    fs::write(&tmp_path, bytes)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::model::Product;

    fn fixture_queries() -> Vec<TrackedQuery> {
        let mut bike = TrackedQuery::new(
            "bici",
            "https://www.subito.it/annunci-italia/vendita/usato/?q=bici",
            Some(10),
            Some(100),
        );
        bike.products.push(Product {
            title: "bici da corsa".to_string(),
            location: "Milano".to_string(),
            price: Some(Decimal::from_str("80").expect("decimal")),
            link: "https://www.subito.it/biciclette/bici-1.htm".to_string(),
        });

        vec![
            bike,
            TrackedQuery::new("lampada", "https://www.subito.it/?q=lampada", None, None),
        ]
    }

    #[test]
    fn store_load_queries_returns_empty_for_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("searches.tracked");

        let queries = load_queries(&path).expect("load should succeed");
        assert!(queries.is_empty());
    }

    #[test]
    fn store_save_and_load_roundtrip_preserves_queries() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("searches.tracked");
        let input = fixture_queries();

        save_queries(&path, &input).expect("save should succeed");
        let loaded = load_queries(&path).expect("load should succeed");

        assert_eq!(loaded, input);
    }

    #[test]
    fn store_save_replaces_previous_content() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("searches.tracked");

        save_queries(&path, &fixture_queries()).expect("first save");
        save_queries(&path, &[]).expect("second save");

        assert!(load_queries(&path).expect("load").is_empty());
    }

    #[test]
    fn store_save_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("searches.tracked");

        save_queries(&path, &fixture_queries()).expect("save should succeed");
        assert!(path.exists());
        assert!(
            fs::read_dir(path.parent().expect("parent"))
                .expect("read dir")
                .all(|entry| !entry
                    .expect("entry")
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")),
            "temp file should be renamed away"
        );
    }

    #[test]
    fn store_load_reports_corrupt_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("searches.tracked");
        fs::write(&path, "not-json").expect("fixture write");

        let err = load_queries(&path).expect_err("corrupt file should fail");
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn store_load_accepts_records_without_optional_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("searches.tracked");
        fs::write(&path, r#"[{"name":"foo","url":"http://example"}]"#).expect("fixture write");

        let loaded = load_queries(&path).expect("load should succeed");
        assert_eq!(
            loaded,
            vec![TrackedQuery::new("foo", "http://example", None, None)]
        );
    }
}
