//! Run prerequisites: test assets on disk and native executables in place.
//!
//! The orchestrator only sees the [`Prerequisites`] trait. [`BundledPrerequisites`]
//! is the default implementation backed by [`AssetSync`] and [`NativeLibraries`].

pub mod assets;
pub mod native;

pub use assets::{AssetSync, SyncStatus};
pub use native::NativeLibraries;

use crate::errors::SetupError;
use crate::hub::LogHub;

/// Steps that must succeed once before the first test runs.
///
/// Progress may be reported through `hub`. Any error interrupts the run.
pub trait Prerequisites: Send {
    fn ensure_assets_present(&mut self, hub: &LogHub) -> Result<(), SetupError>;

    fn load_native_components(&mut self, hub: &LogHub) -> Result<(), SetupError>;
}

/// Prerequisites that are always satisfied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrerequisites;

impl Prerequisites for NoPrerequisites {
    fn ensure_assets_present(&mut self, _hub: &LogHub) -> Result<(), SetupError> {
        Ok(())
    }

    fn load_native_components(&mut self, _hub: &LogHub) -> Result<(), SetupError> {
        Ok(())
    }
}

/// Unpacks the asset bundle and verifies the plan's executables.
#[derive(Debug, Clone)]
pub struct BundledPrerequisites {
    assets: AssetSync,
    natives: NativeLibraries,
    executables: Vec<String>,
}

impl BundledPrerequisites {
    /// `executables` lists every identifier the plan will launch.
    pub fn new(assets: AssetSync, natives: NativeLibraries, executables: Vec<String>) -> Self {
        Self {
            assets,
            natives,
            executables,
        }
    }
}

impl Prerequisites for BundledPrerequisites {
    fn ensure_assets_present(&mut self, hub: &LogHub) -> Result<(), SetupError> {
        self.assets.sync(hub).map(|_| ())
    }

    fn load_native_components(&mut self, hub: &LogHub) -> Result<(), SetupError> {
        self.natives.verify(&self.executables)?;
        hub.print(format!(
            "Native executables ready ({} in {})",
            self.executables.len(),
            self.natives.dir().display()
        ));
        Ok(())
    }
}
