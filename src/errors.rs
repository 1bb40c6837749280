//! Typed error hierarchy for the acceptance-test harness.
//!
//! Three enums cover the three failure surfaces:
//! - `SetupError`: asset provisioning and native executable checks, fatal to a run
//! - `ProcessError`: launching or waiting on one test executable
//! - `HarnessError`: everything the caller of a run can see

use std::path::PathBuf;
use thiserror::Error;

/// Errors from run prerequisites. Any of these interrupts the run before the
/// first test executes.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Can't find test assets: no marker matching {pattern}")]
    MarkerNotFound { pattern: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract asset archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Native executable '{name}' not found at {path}")]
    MissingExecutable { name: String, path: PathBuf },

    #[error("Native executable '{name}' at {path} is not executable")]
    NotExecutable { name: String, path: PathBuf },
}

impl SetupError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SetupError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Errors from a single subprocess launch. The runner turns these into a
/// synthetic non-zero exit code; they never abort a run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Child process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors surfaced to whoever drives a run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to create transcript at {path}: {source}")]
    Transcript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run worker ended without reporting an outcome: {0}")]
    WorkerLost(String),

    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_missing_executable_carries_path() {
        let err = SetupError::MissingExecutable {
            name: "qjs".to_string(),
            path: PathBuf::from("/native/libqjs.so"),
        };
        match &err {
            SetupError::MissingExecutable { name, path } => {
                assert_eq!(name, "qjs");
                assert_eq!(path, &PathBuf::from("/native/libqjs.so"));
            }
            _ => panic!("Expected MissingExecutable"),
        }
        assert!(err.to_string().contains("libqjs.so"));
    }

    #[test]
    fn setup_error_io_keeps_context_and_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SetupError::io("Can't create test assets dir", io_err);
        assert!(err.to_string().starts_with("Can't create test assets dir"));
        let source = std::error::Error::source(&err).expect("io source");
        assert!(source.to_string().contains("denied"));
    }

    #[test]
    fn process_error_spawn_is_matchable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ProcessError::Spawn {
            path: PathBuf::from("/missing"),
            source: io_err,
        };
        match &err {
            ProcessError::Spawn { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected Spawn variant"),
        }
    }

    #[test]
    fn harness_error_converts_from_setup_error() {
        let inner = SetupError::MarkerNotFound {
            pattern: "testassets-*.crc32".to_string(),
        };
        let err: HarnessError = inner.into();
        assert!(matches!(
            err,
            HarnessError::Setup(SetupError::MarkerNotFound { .. })
        ));
        assert!(err.to_string().contains("testassets-*.crc32"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&SetupError::MarkerNotFound {
            pattern: "x".into(),
        });
        assert_std_error(&ProcessError::MissingPipe("stdout"));
        assert_std_error(&HarnessError::WorkerLost("x".into()));
    }
}
