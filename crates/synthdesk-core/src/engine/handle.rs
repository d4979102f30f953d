//! Engine-facing interfaces
//!
//! The audio engine itself is opaque. These traits describe the surface the
//! session controller drives: construction through a factory, a closed set
//! of lifecycle notifications, compile/start/transport calls and a small
//! filesystem.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::EngineResult;

/// Lifecycle notifications emitted by an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    PerformanceStarted,
    PerformancePaused,
    PerformanceResumed,
    PerformanceEnded,
    RenderStarted,
    RenderEnded,
}

/// Single listener receiving every lifecycle notification of an engine
pub type LifecycleListener = Box<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Construction options for an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Run the engine off the calling thread
    pub use_worker: bool,
    /// Exchange audio through shared-memory buffers
    pub use_sab: bool,
}

impl EngineOptions {
    /// Options for realtime playback
    pub const REALTIME: Self = Self {
        use_worker: false,
        use_sab: true,
    };

    /// Options for offline rendering; no shared-memory buffers
    pub const OFFLINE: Self = Self {
        use_worker: true,
        use_sab: false,
    };
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::REALTIME
    }
}

/// Metadata for a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub is_dir: bool,
}

/// The engine's private filesystem
///
/// Paths are `/`-separated; relative paths are taken from the root.
pub trait EngineFs: Send + Sync {
    /// Names of the entries directly inside `path`
    fn read_dir(&self, path: &str) -> EngineResult<Vec<String>>;

    fn stat(&self, path: &str) -> EngineResult<FileStat>;

    /// Create or overwrite a file; the parent directory must exist
    fn write_file(&self, path: &str, data: &[u8]) -> EngineResult<()>;

    /// Create a single directory; the parent directory must exist
    fn mkdir(&self, path: &str) -> EngineResult<()>;

    fn is_directory(&self, path: &str) -> bool {
        self.stat(path).map(|stat| stat.is_dir).unwrap_or(false)
    }
}

/// A live engine instance
///
/// Compile and start calls return the engine's integer result code, where 0
/// means success. An `Err` means the call itself could not be made.
pub trait Engine: Send + Sync {
    /// Install the lifecycle listener, replacing any previous one
    fn set_listener(&self, listener: LifecycleListener);

    /// Pass a command-line style option (e.g. `-odac`)
    fn set_option(&self, option: &str) -> EngineResult<()>;

    /// Compile a project descriptor file from the engine filesystem
    fn compile_project(&self, path: &str) -> EngineResult<i32>;

    /// Compile a project descriptor given as text
    fn compile_project_text(&self, text: &str) -> EngineResult<i32>;

    /// Compile a raw orchestra fragment
    fn compile_raw(&self, text: &str) -> EngineResult<i32>;

    fn start(&self) -> EngineResult<i32>;

    fn stop(&self) -> EngineResult<()>;

    fn pause(&self) -> EngineResult<()>;

    fn resume(&self) -> EngineResult<()>;

    /// Release performance resources, keeping the instance usable
    fn cleanup(&self) -> EngineResult<()>;

    /// Tear the instance down for good
    fn destroy(&self) -> EngineResult<()>;

    /// Output target the engine will write to, if one is configured
    fn output_name(&self) -> EngineResult<Option<String>>;

    fn fs(&self) -> &dyn EngineFs;
}

/// Builds engine instances
pub trait EngineFactory: Send + Sync {
    /// `Ok(None)` means the factory ran but produced no engine
    fn create(&self, options: &EngineOptions) -> EngineResult<Option<Arc<dyn Engine>>>;
}

/// One-time loader for the engine factory
///
/// Loading is expensive (it may pull in the whole engine runtime); the
/// lifecycle manager calls it at most once per successful load.
pub trait FactoryLoader: Send + Sync {
    fn load(&self) -> EngineResult<Arc<dyn EngineFactory>>;
}
