//! Playback and render pipeline
//!
//! [`SessionController`] ties the pieces together:
//!
//! ```text
//! play_project(id)
//!   ├─ acquire factory ─ destroy current ─ freshness check ──┐
//!   │        ▲                                  stale: refresh once
//!   │        └──────────────────────────────────────────────┘
//!   ├─ create + register session, clear console, realtime output
//!   ├─ sync project into engine filesystem
//!   ├─ resolve target → compile (descriptor path | raw text)
//!   └─ start → PlayState::Playing   (any failure: cleanup → PlayState::Error)
//!
//! render_to_disk(id)
//!   ├─ project + target must be cached (else user-visible error)
//!   ├─ detached offline engine, sync, pre-render tree snapshot
//!   ├─ compile, default the output file name
//!   └─ start; RenderEnded hands the engine to the RenderPresenter
//! ```

mod controller;
mod error;
mod render;

pub use controller::SessionController;
pub use error::{PipelineStage, SessionError, SessionResult};
pub use render::{RenderArtifact, RenderReport};

/// Console/log sink attached to the editor
pub trait ConsoleSink: Send + Sync {
    fn clear(&self);
}

/// Receives finished renders for inspection (file listing, download)
pub trait RenderPresenter: Send + Sync {
    fn present(&self, artifact: RenderArtifact);
}

/// How ad-hoc text passed to [`SessionController::play_text`] is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// A complete project descriptor
    Descriptor,
    /// A bare orchestra fragment
    Orchestra,
}
