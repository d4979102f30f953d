//! Message types for service communication
//!
//! Commands are request-reply (oneshot reply channel per command); events are
//! published on the [`EventBus`] for every subscriber.

use crate::engine::PlayState;
use crate::project::ProjectId;
use crate::session::{RenderReport, TextKind};

// ============================================================================
// Session Commands (Request-Reply)
// ============================================================================

/// Commands sent to the EngineService
pub enum SessionCommand {
    /// Play a project's selected (or default) target
    PlayProject {
        project: ProjectId,
        target: Option<String>,
        reply: tokio::sync::oneshot::Sender<Result<(), String>>,
    },

    /// Play ad-hoc text against a project's filesystem
    PlayText {
        project: ProjectId,
        text: String,
        kind: TextKind,
        reply: tokio::sync::oneshot::Sender<Result<(), String>>,
    },

    /// Render a project's selected (or default) target to a file
    RenderToDisk {
        project: ProjectId,
        target: Option<String>,
        reply: tokio::sync::oneshot::Sender<Result<RenderReport, String>>,
    },

    Stop {
        reply: tokio::sync::oneshot::Sender<Result<(), String>>,
    },

    Pause {
        reply: tokio::sync::oneshot::Sender<Result<(), String>>,
    },

    Resume {
        reply: tokio::sync::oneshot::Sender<Result<(), String>>,
    },

    GetPlayState {
        reply: tokio::sync::oneshot::Sender<PlayState>,
    },

    /// Destroy the current session and stop the service
    Shutdown,
}

// ============================================================================
// Events (Broadcast)
// ============================================================================

/// How a notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Events published by the session layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The process-wide play state changed
    PlayStateChanged(PlayState),

    /// User-visible notification
    Notice { message: String, severity: Severity },

    /// The engine factory finished loading
    FactoryLoaded,

    /// Project of the current playback changed (`None` when nothing plays)
    NowPlaying(Option<ProjectId>),

    RenderStarted { target: String },

    RenderEnded { target: String, output_name: String },

    ServiceStarted { service_name: String },

    ServiceStopped { service_name: String },
}

// ============================================================================
// Service Handle
// ============================================================================

/// Handle for communicating with a background service
pub struct ServiceHandle<Cmd> {
    /// Channel for sending commands to the service
    pub command_tx: crossbeam::channel::Sender<Cmd>,
    /// Thread handle for the service
    pub thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl<Cmd> ServiceHandle<Cmd> {
    /// Send a command to the service
    pub fn send(&self, cmd: Cmd) -> Result<(), crossbeam::channel::SendError<Cmd>> {
        self.command_tx.send(cmd)
    }

    /// Check if the service is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

/// Event bus for publishing session events
pub struct EventBus {
    sender: crossbeam::channel::Sender<SessionEvent>,
    receiver: crossbeam::channel::Receiver<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with bounded capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam::channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Get a sender for publishing events
    pub fn sender(&self) -> crossbeam::channel::Sender<SessionEvent> {
        self.sender.clone()
    }

    /// Get a receiver for subscribing to events
    pub fn subscribe(&self) -> crossbeam::channel::Receiver<SessionEvent> {
        self.receiver.clone()
    }

    /// Publish an event; fails instead of waiting when the bus is full
    pub fn publish(
        &self,
        event: SessionEvent,
    ) -> Result<(), crossbeam::channel::TrySendError<SessionEvent>> {
        self.sender.try_send(event)
    }
}

/// Publish `event` without ever blocking the caller
///
/// Engine listeners and the pipeline publish through this. A full bus
/// (nobody draining it) drops the event with a warning.
pub fn emit(events: &crossbeam::channel::Sender<SessionEvent>, event: SessionEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(crossbeam::channel::TrySendError::Full(event)) => {
            log::warn!("[EVENTS] Event bus full, dropping {:?}", event);
        }
        Err(crossbeam::channel::TrySendError::Disconnected(_)) => {}
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
