use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Directory holding the persisted index artifacts.
///
/// The index and its tag-list sidecar live at fixed, well-known names inside
/// this directory; a rebuild overwrites both unconditionally.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The INKTAG_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/inktag/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("INKTAG_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("inktag")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Binary similarity index over the tag vocabulary.
    pub fn index_file(&self) -> PathBuf {
        self.root.join("tags.index")
    }

    /// Ordered JSON array of tag strings, positionally aligned with the index.
    pub fn tag_list_file(&self) -> PathBuf {
        self.root.join("tags.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();

        assert_eq!(dir.root(), tmp.path());
        assert_eq!(dir.index_file(), tmp.path().join("tags.index"));
        assert_eq!(dir.tag_list_file(), tmp.path().join("tags.json"));
    }

    #[test]
    fn resolve_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let dir = DataDir::resolve(Some(&nested)).unwrap();

        assert!(dir.root().exists());
    }
}
