use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 原子寫入失敗的階段。 / Stage at which an atomic write failed.
#[derive(Debug)]
pub(crate) enum WriteFailure {
    CreateDir { path: PathBuf, source: io::Error },
    Write { path: PathBuf, source: io::Error },
}

/// 先寫入暫存檔再改名覆蓋。 / Writes `payload` to a sibling `.tmp` file, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, payload: &str) -> Result<(), WriteFailure> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| WriteFailure::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload.as_bytes()).map_err(|source| WriteFailure::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| WriteFailure::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_parents_and_leaves_no_tmp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        write_atomic(&path, "{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn parent_that_is_a_file_reports_create_dir() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let err = write_atomic(&blocker.join("store.json"), "{}").unwrap_err();
        assert!(matches!(err, WriteFailure::CreateDir { .. }), "{err:?}");
    }
}
