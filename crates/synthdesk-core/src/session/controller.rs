//! SessionController - orchestrates realtime playback
//!
//! Every play request replaces the current engine session: the old one is
//! destroyed (failures ignored) before anything else happens. There is no
//! serialization between concurrent requests; whichever finishes its
//! replacement last owns the final session.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use crossbeam::channel::Sender;

use super::error::{PipelineStage, SessionError, SessionResult};
use super::{ConsoleSink, RenderPresenter, TextKind};
use crate::cache::{CacheGate, ProjectCache, RefreshOutcome};
use crate::config::SessionConfig;
use crate::engine::{Engine, EngineResult, FactoryLoader, LifecycleManager, PlayState, Teardown};
use crate::project::{Document, ProjectId, ProjectSnapshot};
use crate::services::{emit, SessionEvent, Severity};
use crate::store::ProjectStore;
use crate::sync::sync_project;

/// Drives the engine session for playback and rendering
pub struct SessionController {
    pub(super) config: SessionConfig,
    pub(super) lifecycle: LifecycleManager,
    pub(super) gate: CacheGate,
    pub(super) events: Sender<SessionEvent>,
    console: Option<Arc<dyn ConsoleSink>>,
    pub(super) presenter: Option<Arc<dyn RenderPresenter>>,

    /// Detached render engines kept alive until they report RenderEnded
    pub(super) renders: Arc<Mutex<HashMap<u64, Arc<dyn Engine>>>>,
    pub(super) next_render: AtomicU64,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        loader: Arc<dyn FactoryLoader>,
        store: Arc<dyn ProjectStore>,
        cache: Arc<ProjectCache>,
        events: Sender<SessionEvent>,
    ) -> Self {
        Self {
            config,
            lifecycle: LifecycleManager::new(loader, events.clone()),
            gate: CacheGate::new(cache, store),
            events,
            console: None,
            presenter: None,
            renders: Arc::new(Mutex::new(HashMap::new())),
            next_render: AtomicU64::new(1),
        }
    }

    /// Attach the editor console, cleared before each playback
    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }

    /// Attach the collaborator that receives finished renders
    pub fn with_presenter(mut self, presenter: Arc<dyn RenderPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn gate(&self) -> &CacheGate {
        &self.gate
    }

    pub fn play_state(&self) -> PlayState {
        self.lifecycle.play_state()
    }

    /// Project whose playback was last started successfully
    pub fn now_playing(&self) -> Option<ProjectId> {
        self.lifecycle.publisher().now_playing()
    }

    /// Send a user-visible notification
    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        emit(
            &self.events,
            SessionEvent::Notice {
                message: message.into(),
                severity,
            },
        );
    }

    /// Play a project's selected (or default) target
    pub fn play_project(&self, id: &ProjectId, target: Option<&str>) -> SessionResult<()> {
        log::info!("[SESSION] Play request for project {}", id);
        let (engine, snapshot) = self.prepare_session(id)?;

        let Some((target, document)) = snapshot.target_document(target) else {
            return Err(self.fail(&engine, SessionError::MissingTarget(id.clone())));
        };

        for option in &target.options {
            if let Err(source) = engine.set_option(option) {
                return Err(self.fail(
                    &engine,
                    SessionError::Engine {
                        stage: PipelineStage::Configure,
                        source,
                    },
                ));
            }
        }

        let compiled = self.compile_document(&engine, &snapshot, document);
        self.start_compiled(&engine, compiled)?;
        self.lifecycle.publisher().set_now_playing(Some(id.clone()));
        Ok(())
    }

    /// Play ad-hoc text against a project's synced filesystem
    pub fn play_text(&self, id: &ProjectId, text: &str, kind: TextKind) -> SessionResult<()> {
        log::info!("[SESSION] Play {:?} text for project {}", kind, id);
        let (engine, _) = self.prepare_session(id)?;

        let compiled = match kind {
            TextKind::Descriptor => engine.compile_project_text(text),
            TextKind::Orchestra => engine.compile_raw(text),
        };
        self.start_compiled(&engine, compiled)?;
        self.lifecycle.publisher().set_now_playing(Some(id.clone()));
        Ok(())
    }

    /// Stop the current session; the resulting state arrives as a
    /// performance-ended notification
    pub fn stop(&self) -> SessionResult<()> {
        let Some(session) = self.lifecycle.current() else {
            return Ok(());
        };
        session.engine().stop().map_err(|source| SessionError::Engine {
            stage: PipelineStage::Transport,
            source,
        })
    }

    /// Pause the current session and publish [`PlayState::Paused`]
    pub fn pause(&self) -> SessionResult<()> {
        let Some(session) = self.lifecycle.current() else {
            return Ok(());
        };
        session.engine().pause().map_err(|source| SessionError::Engine {
            stage: PipelineStage::Transport,
            source,
        })?;
        self.lifecycle.publisher().publish(PlayState::Paused);
        Ok(())
    }

    /// Resume the current session; `playing` arrives as a notification
    pub fn resume(&self) -> SessionResult<()> {
        let Some(session) = self.lifecycle.current() else {
            return Ok(());
        };
        session.engine().resume().map_err(|source| SessionError::Engine {
            stage: PipelineStage::Transport,
            source,
        })
    }

    /// Destroy the current session
    ///
    /// Notifications from the destroyed engine are dropped, so `stopped` is
    /// published here when a session was actually torn down.
    pub fn shutdown(&self) -> Teardown {
        let teardown = self.lifecycle.destroy_current();
        if !matches!(teardown, Teardown::Nothing) {
            let publisher = self.lifecycle.publisher();
            publisher.publish(PlayState::Stopped);
            publisher.set_now_playing(None);
        }
        teardown
    }

    /// Steps shared by every playback entry point: factory, teardown,
    /// freshness, new session, console, realtime output, sync
    fn prepare_session(&self, id: &ProjectId) -> SessionResult<(Arc<dyn Engine>, ProjectSnapshot)> {
        let publisher = self.lifecycle.publisher();
        if publisher.now_playing().as_ref() != Some(id) {
            publisher.set_now_playing(None);
        }

        let factory = self
            .lifecycle
            .acquire_factory()
            .map_err(|e| self.report(e))?;

        self.lifecycle.destroy_current();

        if let RefreshOutcome::Refreshed = self
            .gate
            .proceed_or_refresh_once(id)
            .map_err(|e| self.report(e))?
        {
            log::info!("[SESSION] Project {} refreshed from the store", id);
        }

        let Some(session) = self.lifecycle.create_session(&factory, &self.config.playback) else {
            self.notify("Error: the engine failed to start", Severity::Error);
            return Err(SessionError::EngineCreationFailed(
                "no engine session was created".to_string(),
            ));
        };
        let engine = session.engine().clone();
        self.lifecycle.replace_session(session);

        if self.config.clear_console_on_play {
            if let Some(console) = &self.console {
                console.clear();
            }
        }

        let output = format!("-o{}", self.config.realtime_output);
        if let Err(source) = engine.set_option(&output) {
            return Err(self.fail(
                &engine,
                SessionError::Engine {
                    stage: PipelineStage::Configure,
                    source,
                },
            ));
        }

        let Some(snapshot) = self.gate.cache().snapshot(id) else {
            return Err(self.fail(&engine, SessionError::MissingProject(id.clone())));
        };

        // Sync failures propagate untouched: no cleanup, no state change
        sync_project(engine.fs(), &snapshot)?;

        Ok((engine, snapshot))
    }

    /// Compile a document: descriptor files by path, anything else as raw text
    pub(super) fn compile_document(
        &self,
        engine: &Arc<dyn Engine>,
        snapshot: &ProjectSnapshot,
        document: &Document,
    ) -> EngineResult<i32> {
        if self.config.is_project_file(&document.filename) {
            let path = snapshot.resolve_path(document);
            log::info!("[SESSION] Compiling project descriptor {}", path);
            engine.compile_project(&path)
        } else {
            log::info!("[SESSION] Compiling {} as raw text", document.filename);
            engine.compile_raw(&document.content.as_text())
        }
    }

    fn start_compiled(&self, engine: &Arc<dyn Engine>, compiled: EngineResult<i32>) -> SessionResult<()> {
        match compiled {
            Ok(0) => {}
            Ok(code) => return Err(self.fail(engine, SessionError::CompileFailed(code))),
            Err(source) => {
                return Err(self.fail(
                    engine,
                    SessionError::Engine {
                        stage: PipelineStage::Compile,
                        source,
                    },
                ))
            }
        }

        match engine.start() {
            Ok(0) => {
                self.lifecycle.publisher().publish(PlayState::Playing);
                Ok(())
            }
            Ok(code) => Err(self.fail(engine, SessionError::StartFailed(code))),
            Err(source) => Err(self.fail(
                engine,
                SessionError::Engine {
                    stage: PipelineStage::Start,
                    source,
                },
            )),
        }
    }

    /// Publish the error state and notify; returns the error for `?`/`Err`
    fn report(&self, error: SessionError) -> SessionError {
        log::error!("[SESSION] {}", error);
        self.lifecycle.publisher().publish(PlayState::Error);
        self.notify(format!("Error: {}", error), Severity::Error);
        error
    }

    /// Best-effort cleanup of `engine`, then [`Self::report`]
    fn fail(&self, engine: &Arc<dyn Engine>, error: SessionError) -> SessionError {
        Teardown::from_result(engine.cleanup(), "cleanup");
        self.report(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LifecycleEvent;
    use crate::project::{Document, LastModified};
    use crate::services::EventBus;
    use crate::testing::{controller_with_events, fixture, play_states, Call, EngineScript, Fixture};
    use std::time::Duration;

    #[test]
    fn test_successful_play_publishes_playing_once_without_cleanup() {
        let Fixture {
            controller,
            loader,
            events,
            ..
        } = fixture(EngineScript::default());
        let id = ProjectId::new("p1");

        controller.play_project(&id, None).unwrap();

        let engine = loader.factory().engine(0);
        assert_eq!(engine.cleanup_calls(), 0);
        assert_eq!(
            play_states(&events)
                .iter()
                .filter(|s| **s == PlayState::Playing)
                .count(),
            1
        );
        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(controller.now_playing(), Some(id));
    }

    #[test]
    fn test_compile_failure_cleans_up_once_and_never_starts() {
        let Fixture {
            controller,
            loader,
            events,
            ..
        } = fixture(EngineScript {
            compile_result: 1,
            ..EngineScript::default()
        });

        let err = controller.play_project(&ProjectId::new("p1"), None).unwrap_err();
        assert!(matches!(err, SessionError::CompileFailed(1)));

        let engine = loader.factory().engine(0);
        assert_eq!(engine.cleanup_calls(), 1);
        assert_eq!(engine.count(|c| matches!(c, Call::Start)), 0);
        assert_eq!(
            play_states(&events)
                .iter()
                .filter(|s| **s == PlayState::Error)
                .count(),
            1
        );
        assert_eq!(controller.now_playing(), None);
    }

    #[test]
    fn test_start_failure_cleans_up_and_errors() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript {
            start_result: -1,
            ..EngineScript::default()
        });

        let err = controller.play_project(&ProjectId::new("p1"), None).unwrap_err();
        assert!(matches!(err, SessionError::StartFailed(-1)));
        assert_eq!(loader.factory().engine(0).cleanup_calls(), 1);
        assert_eq!(controller.play_state(), PlayState::Error);
    }

    #[test]
    fn test_descriptor_target_compiles_by_resolved_path() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript::default());

        controller.play_project(&ProjectId::new("p1"), None).unwrap();

        let engine = loader.factory().engine(0);
        assert_eq!(
            engine.count(|c| matches!(c, Call::CompileProject(p) if p == "project.csd")),
            1
        );
        assert_eq!(engine.count(|c| matches!(c, Call::CompileRaw(_))), 0);
    }

    #[test]
    fn test_orchestra_target_compiles_raw_text() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript::default());

        controller
            .play_project(&ProjectId::new("p1"), Some("synth"))
            .unwrap();

        let engine = loader.factory().engine(0);
        assert_eq!(engine.count(|c| matches!(c, Call::CompileRaw(t) if t.contains("instr 1"))), 1);
        assert_eq!(engine.count(|c| matches!(c, Call::CompileProject(_))), 0);
    }

    #[test]
    fn test_realtime_output_set_and_fs_synced_before_compile() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript::default());

        controller.play_project(&ProjectId::new("p1"), None).unwrap();

        let engine = loader.factory().engine(0);
        let calls = engine.calls();
        assert_eq!(calls[0], Call::SetOption("-odac".to_string()));
        assert!(engine.fs.read_file("folder1/folder2/synth.orc").is_ok());
    }

    #[test]
    fn test_replay_survives_failing_destroy() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript {
            destroy_fails: true,
            ..EngineScript::default()
        });
        let id = ProjectId::new("p1");

        controller.play_project(&id, None).unwrap();
        controller.play_project(&id, None).unwrap();

        let factory = loader.factory();
        assert_eq!(factory.created(), 2);
        assert_eq!(factory.engine(0).destroy_calls(), 1);
        assert_eq!(controller.play_state(), PlayState::Playing);
    }

    #[test]
    fn test_stale_cache_refreshes_once_then_plays() {
        let Fixture {
            controller,
            store,
            loader,
            ..
        } = fixture(EngineScript::default());
        let id = ProjectId::new("p1");
        let marker = LastModified::from_millis(99).unwrap();
        store.touch(&id, marker);
        store.put_document(
            &id,
            Document::file("orc", "synth.orc", "instr 9\nendin\n").in_folders(["f1", "f2"]),
        );
        // The local marker moves ahead of the cached project's marker
        controller.gate().cache().store_last_modified(&id, Some(marker));

        assert!(!controller.gate().is_fresh(&id));
        controller.play_project(&id, None).unwrap();

        assert!(controller.gate().is_fresh(&id));
        assert_eq!(controller.gate().cache().cached_marker(&id), Some(marker));
        assert_eq!(loader.factory().created(), 1);
        assert_eq!(loader.load_count(), 1);

        let synced = loader
            .factory()
            .engine(0)
            .fs
            .read_file("folder1/folder2/synth.orc")
            .unwrap();
        assert_eq!(synced, b"instr 9\nendin\n".to_vec());
    }

    #[test]
    fn test_inconsistent_store_stops_after_one_refresh() {
        let Fixture {
            controller,
            store,
            loader,
            ..
        } = fixture(EngineScript::default());
        let id = ProjectId::new("p1");
        store.set_last_modified(&id, LastModified::from_millis(7));
        controller.gate().cache().evict(&id);

        let err = controller.play_project(&id, None).unwrap_err();

        assert!(matches!(err, SessionError::StillStale { .. }));
        assert_eq!(loader.factory().created(), 0);
        assert_eq!(controller.play_state(), PlayState::Error);
    }

    #[test]
    fn test_factory_failure_publishes_error() {
        let Fixture { controller, .. } = fixture(EngineScript {
            factory_load_fails: true,
            ..EngineScript::default()
        });

        let err = controller.play_project(&ProjectId::new("p1"), None).unwrap_err();
        assert!(matches!(err, SessionError::FactoryUnavailable(_)));
        assert_eq!(controller.play_state(), PlayState::Error);
    }

    #[test]
    fn test_engine_creation_failure_aborts() {
        let Fixture { controller, .. } = fixture(EngineScript {
            create_returns_none: true,
            ..EngineScript::default()
        });

        let err = controller.play_project(&ProjectId::new("p1"), None).unwrap_err();
        assert!(matches!(err, SessionError::EngineCreationFailed(_)));
        assert_eq!(controller.play_state(), PlayState::Error);
    }

    #[test]
    fn test_sync_failure_propagates_without_state_change() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript {
            fs_write_fails: true,
            ..EngineScript::default()
        });

        let err = controller.play_project(&ProjectId::new("p1"), None).unwrap_err();

        assert!(err.is_sync_failure());
        let engine = loader.factory().engine(0);
        assert_eq!(engine.count(|c| matches!(c, Call::CompileProject(_))), 0);
        assert_eq!(engine.cleanup_calls(), 0);
        assert_eq!(controller.play_state(), PlayState::Uninitialized);
    }

    #[test]
    fn test_play_text_uses_requested_compiler() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript::default());
        let id = ProjectId::new("p1");

        controller
            .play_text(&id, "<CsoundSynthesizer/>", TextKind::Descriptor)
            .unwrap();
        controller.play_text(&id, "instr 2\nendin", TextKind::Orchestra).unwrap();

        let factory = loader.factory();
        assert_eq!(
            factory
                .engine(0)
                .count(|c| matches!(c, Call::CompileProjectText(_))),
            1
        );
        assert_eq!(factory.engine(1).count(|c| matches!(c, Call::CompileRaw(_))), 1);
    }

    #[test]
    fn test_transport_controls() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript::default());
        let id = ProjectId::new("p1");

        // No session yet: no-ops
        controller.stop().unwrap();
        controller.pause().unwrap();

        controller.play_project(&id, None).unwrap();
        controller.pause().unwrap();
        assert_eq!(controller.play_state(), PlayState::Paused);

        let engine = loader.factory().engine(0);
        controller.resume().unwrap();
        engine.emit(LifecycleEvent::PerformanceResumed);
        assert_eq!(controller.play_state(), PlayState::Playing);

        controller.stop().unwrap();
        engine.emit(LifecycleEvent::PerformanceEnded);
        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert_eq!(controller.now_playing(), None);
        assert_eq!(engine.count(|c| matches!(c, Call::Stop)), 1);
    }

    #[test]
    fn test_missing_target_is_reported() {
        let Fixture { controller, .. } = fixture(EngineScript::default());

        let err = controller
            .play_project(&ProjectId::new("p1"), Some("nope"))
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingTarget(_)));
        assert_eq!(controller.play_state(), PlayState::Error);
    }

    #[test]
    fn test_console_cleared_before_playback() {
        let Fixture {
            controller,
            console,
            ..
        } = fixture(EngineScript::default());

        controller.play_project(&ProjectId::new("p1"), None).unwrap();
        assert_eq!(console.clears(), 1);
    }

    #[test]
    fn test_target_options_applied_before_compile() {
        let Fixture {
            controller, loader, ..
        } = fixture(EngineScript::default());
        let id = ProjectId::new("p1");

        let cache = controller.gate().cache();
        let mut targets = cache.snapshot(&id).unwrap().targets;
        targets.targets.get_mut("project.csd").unwrap().options =
            vec!["-m0".to_string(), "--sample-rate=48000".to_string()];
        cache.store_targets(&id, targets);

        controller.play_project(&id, None).unwrap();

        let calls = loader.factory().engine(0).calls();
        assert_eq!(
            calls[..5].to_vec(),
            vec![
                Call::SetOption("-odac".to_string()),
                Call::SetOption("-m0".to_string()),
                Call::SetOption("--sample-rate=48000".to_string()),
                Call::CompileProject("project.csd".to_string()),
                Call::Start,
            ]
        );
    }

    #[test]
    fn test_undrained_event_bus_does_not_block_playback() {
        let bus = EventBus::new(4);
        let (controller, _loader) = controller_with_events(EngineScript::default(), bus.sender());
        let (done_tx, done_rx) = crossbeam::channel::bounded(1);

        std::thread::spawn(move || {
            let id = ProjectId::new("p1");
            let result = (0..3).try_for_each(|_| controller.play_project(&id, None));
            let _ = done_tx.send((result.is_ok(), controller.play_state()));
        });

        let (ok, state) = done_rx
            .recv_timeout(Duration::from_secs(3))
            .expect("playback blocked on a full event bus");
        assert!(ok);
        assert_eq!(state, PlayState::Playing);
    }

    #[test]
    fn test_shutdown_publishes_stopped() {
        let Fixture {
            controller,
            loader,
            events,
            ..
        } = fixture(EngineScript::default());
        let id = ProjectId::new("p1");

        controller.play_project(&id, None).unwrap();
        play_states(&events);

        assert!(matches!(controller.shutdown(), Teardown::Clean));
        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert_eq!(controller.now_playing(), None);
        assert_eq!(play_states(&events), vec![PlayState::Stopped]);

        // Late notification from the destroyed engine
        loader.factory().engine(0).emit(LifecycleEvent::PerformanceEnded);
        assert_eq!(controller.play_state(), PlayState::Stopped);
    }

    #[test]
    fn test_shutdown_without_session_publishes_nothing() {
        let Fixture {
            controller, events, ..
        } = fixture(EngineScript::default());

        assert!(matches!(controller.shutdown(), Teardown::Nothing));
        assert!(play_states(&events).is_empty());
        assert_eq!(controller.play_state(), PlayState::Uninitialized);
    }
}
