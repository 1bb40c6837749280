//! Resolution and verification of the native test executables.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::SetupError;

/// Placeholder replaced by the executable identifier in a file-name pattern.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Native executables are shipped as libraries, e.g. `libqjs.so`.
pub const DEFAULT_PATTERN: &str = "lib{name}.so";

/// Maps executable identifiers to files in the native directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeLibraries {
    dir: PathBuf,
    pattern: String,
}

impl NativeLibraries {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pattern: DEFAULT_PATTERN.to_string(),
        }
    }

    /// Use a custom file-name pattern; `{name}` is replaced by the identifier.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Path of the executable called `name`.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.dir.join(self.pattern.replace(NAME_PLACEHOLDER, name))
    }

    /// Check that every named executable is present and runnable.
    pub fn verify<S: AsRef<str>>(&self, names: &[S]) -> Result<(), SetupError> {
        for name in names {
            let name = name.as_ref();
            let path = self.resolve(name);
            let metadata = match std::fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => {
                    return Err(SetupError::MissingExecutable {
                        name: name.to_string(),
                        path,
                    });
                }
            };
            if !is_executable(&metadata) {
                return Err(SetupError::NotExecutable {
                    name: name.to_string(),
                    path,
                });
            }
            debug!(name, path = %path.display(), "native executable found");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}
