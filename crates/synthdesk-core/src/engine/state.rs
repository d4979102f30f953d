//! Play state and its publisher
//!
//! Lifecycle notifications map deterministically onto [`PlayState`]
//! transitions in one place, [`PlayState::on_lifecycle`]. The publisher is
//! the only writer of the process-wide play state; it broadcasts a
//! [`SessionEvent::PlayStateChanged`] for every actual change.

use std::fmt;
use std::sync::{Arc, Mutex};

use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};

use super::handle::LifecycleEvent;
use crate::project::ProjectId;
use crate::services::{emit, SessionEvent};

/// Playback state of the current engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    #[default]
    Uninitialized,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl PlayState {
    /// Stopped and error end a session; only a new session leaves them
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    /// Transition caused by a lifecycle notification, if any
    pub fn on_lifecycle(self, event: LifecycleEvent) -> Option<PlayState> {
        if self.is_terminal() {
            return None;
        }
        match event {
            LifecycleEvent::PerformanceStarted => Some(Self::Playing),
            LifecycleEvent::PerformancePaused => Some(Self::Paused),
            LifecycleEvent::PerformanceResumed => Some(Self::Playing),
            LifecycleEvent::PerformanceEnded => Some(Self::Stopped),
            LifecycleEvent::RenderStarted | LifecycleEvent::RenderEnded => None,
        }
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Default)]
struct Published {
    state: PlayState,
    now_playing: Option<ProjectId>,
}

/// Publishes play state (and the currently playing project) to the event bus
#[derive(Clone)]
pub struct PlayStatePublisher {
    inner: Arc<Mutex<Published>>,
    events: Sender<SessionEvent>,
}

impl PlayStatePublisher {
    pub fn new(events: Sender<SessionEvent>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Published::default())),
            events,
        }
    }

    pub fn current(&self) -> PlayState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(PlayState::Error)
    }

    pub fn now_playing(&self) -> Option<ProjectId> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.now_playing.clone())
    }

    /// Publish an explicit pipeline outcome
    ///
    /// Returns whether the state changed. Unchanged states are not
    /// re-broadcast.
    pub fn publish(&self, next: PlayState) -> bool {
        let changed = match self.inner.lock() {
            Ok(mut inner) if inner.state != next => {
                inner.state = next;
                true
            }
            _ => false,
        };

        if changed {
            log::info!("[ENGINE] Play state -> {}", next);
            emit(&self.events, SessionEvent::PlayStateChanged(next));
        }
        changed
    }

    /// Apply a lifecycle notification
    pub fn apply(&self, event: LifecycleEvent) -> Option<PlayState> {
        let next = self.current().on_lifecycle(event)?;
        self.publish(next);
        Some(next)
    }

    /// Mark a fresh session
    pub fn reset(&self) {
        self.publish(PlayState::Uninitialized);
    }

    pub fn set_now_playing(&self, project: Option<ProjectId>) {
        let changed = match self.inner.lock() {
            Ok(mut inner) if inner.now_playing != project => {
                inner.now_playing = project.clone();
                true
            }
            _ => false,
        };

        if changed {
            emit(&self.events, SessionEvent::NowPlaying(project));
        }
    }
}
