//! Reads configuration documents from disk.
//!
//! The rotation core never sees a loader failure. [`load`] logs whatever went
//! wrong and reports "no configuration", which normalization turns into an
//! empty pool with the default timing.

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Reads and decodes the JSON document at `path`.
pub async fn try_load(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&text).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`try_load`], but failures are logged and collapse to `None`.
pub async fn load(path: impl AsRef<Path>) -> Option<Value> {
    let path = path.as_ref();
    match try_load(path).await {
        Ok(value) => {
            debug!(source = %path.display(), "Configuration loaded.");
            Some(value)
        }
        Err(e) => {
            warn!("{e}. Falling back to an empty pool.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_loads_current_shape() {
        let file = file_with(r#"{ "images": ["a.png"], "INTERVAL_MS": 4000 }"#);
        let value = load(file.path()).await.unwrap();
        assert_eq!(value["images"][0], "a.png");
        assert_eq!(value["INTERVAL_MS"], 4000);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(try_load(&path).await, Err(Error::Io { .. })));
        assert!(load(&path).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_parse_error() {
        let file = file_with("{ images: [");
        assert!(matches!(try_load(file.path()).await, Err(Error::Parse { .. })));
        assert!(load(file.path()).await.is_none());
    }
}
