//! Atomic JSON file persistence shared by the link table, the sitemap
//! repository and the state file.

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Read and deserialize a JSON file, returning `None` when it does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)
        .map_err(|e| Error::Storage(format!("Failed to read {}: {e}", path.display())))?;
    let value = serde_json::from_str(&json)
        .map_err(|e| Error::Storage(format!("Failed to parse {}: {e}", path.display())))?;
    Ok(Some(value))
}

/// Serialize a value and replace `path` with it in one rename.
///
/// The data is written to a temporary file in the same directory first, so a
/// crash mid-write never leaves a torn file behind.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("Failed to create {}: {e}", parent.display())))?;

    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Storage(format!("Failed to serialize {}: {e}", path.display())))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| Error::Storage(format!("Failed to create temp file: {e}")))?;
    tmp.write_all(&json)
        .map_err(|e| Error::Storage(format!("Failed to write {}: {e}", path.display())))?;
    tmp.persist(path)
        .map_err(|e| Error::Storage(format!("Failed to commit {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<BTreeMap<String, u32>> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut map = BTreeMap::new();
        map.insert("chunks".to_string(), 3u32);

        write_json_atomic(&path, &map).unwrap();
        let back: BTreeMap<String, u32> = read_json(&path).unwrap().unwrap();
        assert_eq!(back, map);

        // No temp files left behind
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_json::<BTreeMap<String, u32>>(&path).unwrap_err();
        assert_eq!(err.category(), "storage");
    }
}
