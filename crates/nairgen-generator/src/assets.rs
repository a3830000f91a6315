//! Static asset copying.
//!
//! The static tree is published byte-for-byte: no fingerprinting, no
//! filtering, dotfiles included.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Asset copy errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Walking the source tree failed.
    #[error("failed to read asset tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Creating a directory or copying a file failed.
    #[error("failed to copy asset {path}: {source}")]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry outside of the source tree.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Files copied by one [`AssetCopier::copy_tree`] call.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    /// Copied files, relative to the source root, `/`-separated, sorted.
    assets: Vec<String>,
}

impl AssetManifest {
    /// Create a new empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a copied file.
    pub fn add(&mut self, relative: impl Into<String>) {
        self.assets.push(relative.into());
    }

    /// Whether `relative` was copied.
    #[must_use]
    pub fn contains(&self, relative: &str) -> bool {
        self.assets.iter().any(|a| a == relative)
    }

    /// All copied files.
    #[must_use]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }
}

/// Recursive, verbatim directory copier.
#[derive(Debug, Default)]
pub struct AssetCopier;

impl AssetCopier {
    /// Create a new copier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Copy everything below `source_dir` into `dest_dir`, creating
    /// `dest_dir` and any intermediate directories.
    pub fn copy_tree(&self, source_dir: &Path, dest_dir: &Path) -> Result<AssetManifest> {
        info!(
            source = %source_dir.display(),
            dest = %dest_dir.display(),
            "copying static assets"
        );

        let mut manifest = AssetManifest::new();
        ensure_dir(dest_dir)?;

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .min_depth(1)
        {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|_| AssetError::InvalidPath(entry.path().to_path_buf()))?;
            let dest_path = dest_dir.join(relative);

            if entry.file_type().is_dir() {
                ensure_dir(&dest_path)?;
            } else {
                fs::copy(entry.path(), &dest_path).map_err(|source| AssetError::CopyFailed {
                    path: entry.path().to_path_buf(),
                    source,
                })?;

                debug!(
                    src = %entry.path().display(),
                    dest = %dest_path.display(),
                    "copied asset"
                );
                manifest.add(
                    relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/"),
                );
            }
        }

        info!(count = manifest.assets.len(), "assets copied");
        Ok(manifest)
    }
}

/// Create a directory (and its parents) if it doesn't exist.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| AssetError::CopyFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_asset_manifest() {
        let mut manifest = AssetManifest::new();
        manifest.add("css/style.css");
        manifest.add("js/map.js");

        assert!(manifest.contains("css/style.css"));
        assert!(manifest.contains("js/map.js"));
        assert!(!manifest.contains("other.txt"));
        assert_eq!(manifest.assets().len(), 2);
    }

    #[test]
    fn test_copy_tree_verbatim() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        fs::create_dir_all(source.path().join("js/vendor")).unwrap();
        fs::write(source.path().join("js/map.js"), "initMap();").unwrap();
        fs::write(source.path().join("js/vendor/leaflet.js"), "L={};").unwrap();
        let png = [0x89_u8, b'P', b'N', b'G', 0x00, 0xff];
        fs::write(source.path().join("logo.png"), png).unwrap();
        fs::write(source.path().join(".htaccess"), "Options -Indexes").unwrap();

        let target = dest.path().join("static");
        let manifest = AssetCopier::new().copy_tree(source.path(), &target).unwrap();

        assert_eq!(
            manifest.assets(),
            [".htaccess", "js/map.js", "js/vendor/leaflet.js", "logo.png"]
        );
        assert_eq!(fs::read(target.join("logo.png")).unwrap(), png);
        assert_eq!(fs::read_to_string(target.join("js/vendor/leaflet.js")).unwrap(), "L={};");
        assert!(target.join(".htaccess").exists());
    }

    #[test]
    fn test_copy_empty_directories() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("img/empty")).unwrap();

        let manifest = AssetCopier::new().copy_tree(source.path(), dest.path()).unwrap();

        assert!(manifest.assets().is_empty());
        assert!(dest.path().join("img/empty").is_dir());
    }

    #[test]
    fn test_copy_missing_source() {
        let dest = TempDir::new().unwrap();
        let result = AssetCopier::new().copy_tree(&dest.path().join("nope"), &dest.path().join("out"));
        assert!(matches!(result, Err(AssetError::Walk(_))));
    }

    #[test]
    fn test_ensure_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");

        assert!(!nested.exists());
        ensure_dir(&nested).unwrap();
        assert!(nested.exists());
    }
}
