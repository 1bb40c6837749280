//! Test asset provisioning from a bundled archive.
//!
//! The bundle directory ships `testassets.zip` next to a marker file named
//! `testassets-<checksum>.crc32`. The marker's file name identifies the bundle
//! version; it is recorded after a successful unpack so later runs can skip
//! the copy while the bundle is unchanged.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, info};

use crate::errors::SetupError;
use crate::hub::LogHub;

pub const ARCHIVE_NAME: &str = "testassets.zip";
pub const MARKER_PREFIX: &str = "testassets-";
pub const MARKER_SUFFIX: &str = ".crc32";

/// What [`AssetSync::sync`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    UpToDate { marker: String },
    Refreshed { marker: String },
}

/// Keeps the unpacked assets directory in step with the bundle.
#[derive(Debug, Clone)]
pub struct AssetSync {
    bundle_dir: PathBuf,
    assets_dir: PathBuf,
    name_file: PathBuf,
}

impl AssetSync {
    /// * `bundle_dir`: holds the archive and its marker
    /// * `assets_dir`: unpack target, also the tests' working directory
    /// * `name_file`: records the marker name of the last unpacked bundle
    pub fn new(
        bundle_dir: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
        name_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            assets_dir: assets_dir.into(),
            name_file: name_file.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Make sure the assets directory holds the current bundle.
    pub fn sync(&self, hub: &LogHub) -> Result<SyncStatus, SetupError> {
        let expected = fs::read_to_string(&self.name_file)
            .ok()
            .map(|name| name.trim().to_string());
        let actual = self.find_marker()?;

        if expected.as_deref() == Some(actual.as_str()) && self.assets_dir.is_dir() {
            debug!(marker = %actual, "assets up to date");
            hub.print("All test assets are UP-TO-DATE");
            return Ok(SyncStatus::UpToDate { marker: actual });
        }

        hub.print("Need exact assets");
        hub.print(format!("expected = {}", expected.as_deref().unwrap_or("none")));
        hub.print(format!("actual = {}", actual));

        self.unpack()?;
        fs::write(&self.name_file, &actual).map_err(|e| {
            SetupError::io(
                format!("Can't record asset marker in {}", self.name_file.display()),
                e,
            )
        })?;

        info!(marker = %actual, dir = %self.assets_dir.display(), "assets refreshed");
        hub.print("All test assets are copied");
        Ok(SyncStatus::Refreshed { marker: actual })
    }

    /// File name of the bundle's marker. With several markers the
    /// lexicographically last one wins.
    pub fn find_marker(&self) -> Result<String, SetupError> {
        let pattern = self
            .bundle_dir
            .join(format!("{}*{}", MARKER_PREFIX, MARKER_SUFFIX))
            .to_string_lossy()
            .to_string();

        let not_found = || SetupError::MarkerNotFound {
            pattern: pattern.clone(),
        };
        let entries = glob(&pattern).map_err(|_| not_found())?;

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .max()
            .ok_or_else(not_found)
    }

    fn unpack(&self) -> Result<(), SetupError> {
        if self.assets_dir.exists() {
            fs::remove_dir_all(&self.assets_dir).map_err(|e| {
                SetupError::io(
                    format!("Can't clear test assets dir {}", self.assets_dir.display()),
                    e,
                )
            })?;
        }
        fs::create_dir_all(&self.assets_dir).map_err(|e| {
            SetupError::io(
                format!("Can't create test assets dir {}", self.assets_dir.display()),
                e,
            )
        })?;

        let archive_path = self.bundle_dir.join(ARCHIVE_NAME);
        let file = File::open(&archive_path).map_err(|e| {
            SetupError::io(
                format!("Can't open asset archive {}", archive_path.display()),
                e,
            )
        })?;
        let to_error = |source| SetupError::Archive {
            path: archive_path.clone(),
            source,
        };
        let mut archive = zip::ZipArchive::new(file).map_err(to_error)?;
        archive.extract(&self.assets_dir).map_err(to_error)?;
        debug!(entries = archive.len(), "asset archive extracted");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn write_bundle(dir: &Path, checksum: &str, files: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        let archive = File::create(dir.join(ARCHIVE_NAME)).unwrap();
        let mut writer = zip::ZipWriter::new(archive);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        fs::write(
            dir.join(format!("{}{}{}", MARKER_PREFIX, checksum, MARKER_SUFFIX)),
            "",
        )
        .unwrap();
    }

    fn sync_for(root: &Path) -> AssetSync {
        AssetSync::new(
            root.join("bundle"),
            root.join("testassets"),
            root.join("testassets.name"),
        )
    }

    #[test]
    fn test_first_sync_unpacks_and_records_marker() {
        let root = tempfile::tempdir().unwrap();
        write_bundle(
            &root.path().join("bundle"),
            "0badf00d",
            &[("tests/test_op.js", "print(1)"), ("repl.js", "")],
        );
        let hub = LogHub::in_memory(64);

        let status = sync_for(root.path()).sync(&hub).unwrap();

        assert_eq!(
            status,
            SyncStatus::Refreshed {
                marker: "testassets-0badf00d.crc32".to_string()
            }
        );
        assert_eq!(
            fs::read_to_string(root.path().join("testassets/tests/test_op.js")).unwrap(),
            "print(1)"
        );
        assert_eq!(
            fs::read_to_string(root.path().join("testassets.name")).unwrap(),
            "testassets-0badf00d.crc32"
        );
        let log = hub.snapshot().to_vec();
        assert_eq!(log[0], "Need exact assets");
        assert_eq!(log[1], "expected = none");
        assert_eq!(log[2], "actual = testassets-0badf00d.crc32");
        assert_eq!(log.last().unwrap(), "All test assets are copied");
    }

    #[test]
    fn test_second_sync_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        write_bundle(&root.path().join("bundle"), "1234", &[("a.js", "a")]);
        let sync = sync_for(root.path());
        sync.sync(&LogHub::in_memory(64)).unwrap();

        // Local edits survive when the bundle has not changed.
        fs::write(root.path().join("testassets/local.txt"), "keep").unwrap();
        let hub = LogHub::in_memory(64);
        let status = sync.sync(&hub).unwrap();

        assert!(matches!(status, SyncStatus::UpToDate { .. }));
        assert!(root.path().join("testassets/local.txt").exists());
        assert_eq!(hub.snapshot().to_vec(), vec!["All test assets are UP-TO-DATE"]);
    }

    #[test]
    fn test_changed_bundle_replaces_assets() {
        let root = tempfile::tempdir().unwrap();
        let bundle = root.path().join("bundle");
        write_bundle(&bundle, "1111", &[("old.js", "old")]);
        let sync = sync_for(root.path());
        sync.sync(&LogHub::in_memory(64)).unwrap();

        fs::remove_file(bundle.join("testassets-1111.crc32")).unwrap();
        write_bundle(&bundle, "2222", &[("new.js", "new")]);
        let hub = LogHub::in_memory(64);
        let status = sync.sync(&hub).unwrap();

        assert!(matches!(status, SyncStatus::Refreshed { .. }));
        assert!(!root.path().join("testassets/old.js").exists());
        assert!(root.path().join("testassets/new.js").exists());
        assert!(
            hub.snapshot()
                .iter()
                .any(|m| m == "expected = testassets-1111.crc32")
        );
    }

    #[test]
    fn test_missing_marker_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("bundle")).unwrap();

        let err = sync_for(root.path())
            .sync(&LogHub::in_memory(64))
            .unwrap_err();
        assert!(matches!(err, SetupError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_missing_archive_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let bundle = root.path().join("bundle");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("testassets-ffff.crc32"), "").unwrap();

        let err = sync_for(root.path())
            .sync(&LogHub::in_memory(64))
            .unwrap_err();
        assert!(matches!(err, SetupError::Io { .. }));
        assert!(!root.path().join("testassets.name").exists());
    }
}
