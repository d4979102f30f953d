//! Engine lifecycle manager
//!
//! Owns the engine factory (loaded lazily, once) and the single current
//! engine session. This is the only writer of the session slot: everything
//! else re-fetches [`LifecycleManager::current`] instead of holding on to a
//! session across calls, since a concurrent play request may replace it.
//!
//! # Replacement
//!
//! ```text
//! destroy_current()  ── failure logged, never blocks ──┐
//!                                                      ▼
//! create_session(factory, options) ─► replace_session(session)
//!                                        │ installs lifecycle listener
//!                                        └─ resets play state
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::error::{EngineError, EngineResult};
use super::handle::{Engine, EngineFactory, EngineOptions, FactoryLoader, LifecycleEvent};
use super::state::{PlayState, PlayStatePublisher};
use crate::services::{emit, SessionEvent};
use crate::session::{SessionError, SessionResult};

use crossbeam::channel::Sender;

/// Outcome of a best-effort teardown call (destroy, cleanup)
///
/// Teardown failures are values, not pipeline errors: callers log them and
/// carry on.
#[derive(Debug)]
pub enum Teardown {
    /// Nothing to tear down
    Nothing,
    /// Call succeeded
    Clean,
    /// Call failed; the failure was logged and ignored
    Ignored(EngineError),
}

impl Teardown {
    /// Wrap the result of a teardown call, logging a failure
    pub fn from_result(result: EngineResult<()>, call: &str) -> Self {
        match result {
            Ok(()) => Self::Clean,
            Err(e) => {
                log::warn!("[ENGINE] Ignoring failed {}: {}", call, e);
                Self::Ignored(e)
            }
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// The live engine instance plus its session number
#[derive(Clone)]
pub struct EngineSession {
    id: u64,
    engine: Arc<dyn Engine>,
}

impl EngineSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession").field("id", &self.id).finish()
    }
}

/// Creates, replaces and tears down engine sessions
pub struct LifecycleManager {
    loader: Arc<dyn FactoryLoader>,

    /// Loaded factory (lazily initialized, kept for the process lifetime)
    factory: Mutex<Option<Arc<dyn EngineFactory>>>,

    /// The single current session
    current: Mutex<Option<EngineSession>>,

    /// Id of the current session, 0 when there is none. Shared with
    /// listeners so notifications from replaced sessions are dropped.
    current_id: Arc<AtomicU64>,

    next_id: AtomicU64,

    publisher: PlayStatePublisher,

    events: Sender<SessionEvent>,
}

impl LifecycleManager {
    pub fn new(loader: Arc<dyn FactoryLoader>, events: Sender<SessionEvent>) -> Self {
        Self {
            loader,
            factory: Mutex::new(None),
            current: Mutex::new(None),
            current_id: Arc::new(AtomicU64::new(0)),
            next_id: AtomicU64::new(1),
            publisher: PlayStatePublisher::new(events.clone()),
            events,
        }
    }

    pub fn publisher(&self) -> &PlayStatePublisher {
        &self.publisher
    }

    pub fn play_state(&self) -> PlayState {
        self.publisher.current()
    }

    pub fn has_factory(&self) -> bool {
        self.factory.lock().map(|f| f.is_some()).unwrap_or(false)
    }

    /// Return the cached factory, loading it on first use
    ///
    /// The first successful load broadcasts [`SessionEvent::FactoryLoaded`];
    /// later calls are plain lookups.
    pub fn acquire_factory(&self) -> SessionResult<Arc<dyn EngineFactory>> {
        let mut slot = self
            .factory
            .lock()
            .map_err(|_| SessionError::FactoryUnavailable(EngineError::LockPoisoned))?;

        if let Some(factory) = slot.as_ref() {
            return Ok(factory.clone());
        }

        log::info!("[ENGINE] Loading engine factory...");
        let factory = self.loader.load().map_err(|e| {
            log::error!("[ENGINE] Factory load failed: {}", e);
            SessionError::FactoryUnavailable(e)
        })?;

        *slot = Some(factory.clone());
        emit(&self.events, SessionEvent::FactoryLoaded);
        log::info!("[ENGINE] Engine factory ready");

        Ok(factory)
    }

    /// Construct an engine that is not registered as the current session
    ///
    /// Used by offline rendering. Does not touch the play state.
    pub fn create_detached(
        &self,
        factory: &Arc<dyn EngineFactory>,
        options: &EngineOptions,
    ) -> SessionResult<Arc<dyn Engine>> {
        match factory.create(options) {
            Ok(Some(engine)) => Ok(engine),
            Ok(None) => Err(SessionError::EngineCreationFailed(
                "factory returned no engine".to_string(),
            )),
            Err(e) => Err(SessionError::EngineCreationFailed(e.to_string())),
        }
    }

    /// Create a new session
    ///
    /// On failure publishes [`PlayState::Error`] and returns `None`; it never
    /// fails past this point.
    pub fn create_session(
        &self,
        factory: &Arc<dyn EngineFactory>,
        options: &EngineOptions,
    ) -> Option<EngineSession> {
        match self.create_detached(factory, options) {
            Ok(engine) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                log::info!(
                    "[ENGINE] Created session {} (worker={}, sab={})",
                    id,
                    options.use_worker,
                    options.use_sab
                );
                Some(EngineSession { id, engine })
            }
            Err(e) => {
                log::error!("[ENGINE] {}", e);
                self.publisher.publish(PlayState::Error);
                None
            }
        }
    }

    /// Install lifecycle handling on `session` and make it current
    pub fn replace_session(&self, session: EngineSession) {
        let publisher = self.publisher.clone();
        let current_id = self.current_id.clone();
        let engine = Arc::downgrade(&session.engine);
        let id = session.id;

        session.engine.set_listener(Box::new(move |event| {
            if current_id.load(Ordering::SeqCst) != id {
                log::debug!("[ENGINE] Dropping {:?} from replaced session {}", event, id);
                return;
            }

            if event == LifecycleEvent::PerformanceEnded {
                if let Some(engine) = engine.upgrade() {
                    Teardown::from_result(engine.cleanup(), "cleanup");
                }
                publisher.set_now_playing(None);
            }

            publisher.apply(event);
        }));

        match self.current.lock() {
            Ok(mut current) => {
                self.current_id.store(id, Ordering::SeqCst);
                *current = Some(session);
            }
            Err(_) => log::error!("[ENGINE] Session slot poisoned, session {} not stored", id),
        }

        self.publisher.reset();
    }

    /// Current session, if any
    pub fn current(&self) -> Option<EngineSession> {
        self.current.lock().ok().and_then(|current| current.clone())
    }

    /// Destroy the current session, if there is one
    ///
    /// The session is removed from the slot before destruction is requested.
    /// A failing destroy is logged and reported as [`Teardown::Ignored`]; the
    /// caller proceeds as if it succeeded.
    pub fn destroy_current(&self) -> Teardown {
        let session = match self.current.lock() {
            Ok(mut current) => current.take(),
            Err(_) => None,
        };
        self.current_id.store(0, Ordering::SeqCst);

        match session {
            Some(session) => {
                log::info!("[ENGINE] Destroying session {}", session.id);
                Teardown::from_result(session.engine.destroy(), "destroy")
            }
            None => Teardown::Nothing,
        }
    }
}
