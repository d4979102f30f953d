//! Audio engine integration
//!
//! The engine is an opaque, heavyweight external runtime. This module defines
//! the surface the session controller drives and owns the single live
//! session.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               LifecycleManager                 │
//! │  - loads the EngineFactory once               │
//! │  - owns the single current EngineSession      │
//! │  - routes LifecycleEvents to PlayState        │
//! └───────────────────────────────────────────────┘
//!          │ create               │ publish
//!          ▼                      ▼
//! ┌─────────────────┐   ┌──────────────────────┐
//! │  dyn Engine     │   │  PlayStatePublisher  │
//! │  └─ dyn EngineFs│   │  (SessionEvent bus)  │
//! └─────────────────┘   └──────────────────────┘
//! ```

mod error;
mod handle;
mod lifecycle;
mod memory_fs;
mod state;

pub use error::{EngineError, EngineResult};
pub use handle::{
    Engine, EngineFactory, EngineFs, EngineOptions, FactoryLoader, FileStat, LifecycleEvent,
    LifecycleListener,
};
pub use lifecycle::{EngineSession, LifecycleManager, Teardown};
pub use memory_fs::MemoryFs;
pub(crate) use memory_fs::normalize;
pub use state::{PlayState, PlayStatePublisher};
