//! EngineService - runs the session controller on a background thread
//!
//! All play/render requests are executed one after another on the service
//! thread, so the caller never blocks on engine work. Replies carry the
//! error's display text.

use super::messages::{emit, ServiceHandle, SessionCommand, SessionEvent};
use crate::engine::PlayState;
use crate::project::ProjectId;
use crate::session::{RenderReport, SessionController, TextKind};
use crossbeam::channel::{Receiver, Sender};
use std::thread;

/// Owns the controller and serves [`SessionCommand`]s
pub struct EngineService {
    controller: SessionController,
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
}

impl EngineService {
    /// Spawn the service in a background thread
    pub fn spawn(
        controller: SessionController,
        event_tx: Sender<SessionEvent>,
    ) -> Result<ServiceHandle<SessionCommand>, String> {
        let (command_tx, command_rx) = crossbeam::channel::unbounded();

        let service = EngineService {
            controller,
            command_rx,
            event_tx: event_tx.clone(),
        };

        let handle = thread::Builder::new()
            .name("engine-service".into())
            .spawn(move || {
                service.run();
            })
            .map_err(|e| format!("Failed to spawn engine service thread: {}", e))?;

        emit(
            &event_tx,
            SessionEvent::ServiceStarted {
                service_name: "EngineService".to_string(),
            },
        );

        Ok(ServiceHandle {
            command_tx,
            thread_handle: Some(handle),
        })
    }

    /// Main service loop
    fn run(self) {
        log::info!("EngineService started");

        while let Ok(cmd) = self.command_rx.recv() {
            match cmd {
                SessionCommand::Shutdown => {
                    log::info!("EngineService shutting down");
                    break;
                }
                _ => self.handle_command(cmd),
            }
        }

        self.controller.shutdown();
        emit(
            &self.event_tx,
            SessionEvent::ServiceStopped {
                service_name: "EngineService".to_string(),
            },
        );

        log::info!("EngineService stopped");
    }

    fn handle_command(&self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::PlayProject {
                project,
                target,
                reply,
            } => {
                let result = self
                    .controller
                    .play_project(&project, target.as_deref())
                    .map_err(|e| e.to_string());
                let _ = reply.send(result);
            }

            SessionCommand::PlayText {
                project,
                text,
                kind,
                reply,
            } => {
                let result = self
                    .controller
                    .play_text(&project, &text, kind)
                    .map_err(|e| e.to_string());
                let _ = reply.send(result);
            }

            SessionCommand::RenderToDisk {
                project,
                target,
                reply,
            } => {
                let result = self
                    .controller
                    .render_to_disk(&project, target.as_deref())
                    .map_err(|e| e.to_string());
                let _ = reply.send(result);
            }

            SessionCommand::Stop { reply } => {
                let _ = reply.send(self.controller.stop().map_err(|e| e.to_string()));
            }

            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.controller.pause().map_err(|e| e.to_string()));
            }

            SessionCommand::Resume { reply } => {
                let _ = reply.send(self.controller.resume().map_err(|e| e.to_string()));
            }

            SessionCommand::GetPlayState { reply } => {
                let _ = reply.send(self.controller.play_state());
            }

            SessionCommand::Shutdown => {
                // Handled in run() loop
            }
        }
    }
}

/// Client for the EngineService
///
/// The blocking helpers wait for the reply; [`SessionClient::send_play`]
/// returns the reply receiver so UI code can poll it.
#[derive(Clone)]
pub struct SessionClient {
    command_tx: Sender<SessionCommand>,
}

impl SessionClient {
    pub fn new(handle: &ServiceHandle<SessionCommand>) -> Self {
        Self {
            command_tx: handle.command_tx.clone(),
        }
    }

    /// Queue a play request without waiting for it
    pub fn send_play(
        &self,
        project: ProjectId,
        target: Option<String>,
    ) -> Result<tokio::sync::oneshot::Receiver<Result<(), String>>, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SessionCommand::PlayProject {
                project,
                target,
                reply: tx,
            })
            .map_err(|e| e.to_string())?;
        Ok(rx)
    }

    /// Play a project (blocking)
    pub fn play_project(&self, project: &ProjectId, target: Option<&str>) -> Result<(), String> {
        let rx = self.send_play(project.clone(), target.map(str::to_string))?;
        rx.blocking_recv().map_err(|e| e.to_string())?
    }

    /// Play ad-hoc text (blocking)
    pub fn play_text(&self, project: &ProjectId, text: &str, kind: TextKind) -> Result<(), String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SessionCommand::PlayText {
                project: project.clone(),
                text: text.to_string(),
                kind,
                reply: tx,
            })
            .map_err(|e| e.to_string())?;

        rx.blocking_recv().map_err(|e| e.to_string())?
    }

    /// Render to disk (blocking until the render has started)
    pub fn render_to_disk(
        &self,
        project: &ProjectId,
        target: Option<&str>,
    ) -> Result<RenderReport, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SessionCommand::RenderToDisk {
                project: project.clone(),
                target: target.map(str::to_string),
                reply: tx,
            })
            .map_err(|e| e.to_string())?;

        rx.blocking_recv().map_err(|e| e.to_string())?
    }

    pub fn stop(&self) -> Result<(), String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SessionCommand::Stop { reply: tx })
            .map_err(|e| e.to_string())?;
        rx.blocking_recv().map_err(|e| e.to_string())?
    }

    pub fn pause(&self) -> Result<(), String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SessionCommand::Pause { reply: tx })
            .map_err(|e| e.to_string())?;
        rx.blocking_recv().map_err(|e| e.to_string())?
    }

    pub fn resume(&self) -> Result<(), String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SessionCommand::Resume { reply: tx })
            .map_err(|e| e.to_string())?;
        rx.blocking_recv().map_err(|e| e.to_string())?
    }

    /// Current play state (blocking)
    pub fn play_state(&self) -> Result<PlayState, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SessionCommand::GetPlayState { reply: tx })
            .map_err(|e| e.to_string())?;
        rx.blocking_recv().map_err(|e| e.to_string())
    }

    /// Shutdown the service
    pub fn shutdown(&self) -> Result<(), String> {
        self.command_tx
            .send(SessionCommand::Shutdown)
            .map_err(|e| e.to_string())
    }
}
