//! Offline rendering to a file in the engine filesystem

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::controller::SessionController;
use super::error::{PipelineStage, SessionError, SessionResult};
use crate::engine::{Engine, LifecycleEvent, Teardown};
use crate::project::ProjectId;
use crate::services::{emit, SessionEvent, Severity};
use crate::sync::{snapshot_tree, sync_project, FsSnapshot, SyncError};

/// A finished render, handed to the [`super::RenderPresenter`]
///
/// The engine is kept alive so the presenter can read the rendered file
/// out of its filesystem.
pub struct RenderArtifact {
    pub engine: Arc<dyn Engine>,
    /// Filename of the compiled target document
    pub target: String,
    /// File the engine renders into
    pub output_name: String,
    /// Engine filesystem before the render started
    pub pre_render: FsSnapshot,
}

impl std::fmt::Debug for RenderArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderArtifact")
            .field("target", &self.target)
            .field("output_name", &self.output_name)
            .field("files_before", &self.pre_render.len())
            .finish()
    }
}

/// A render that has been started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub render_id: u64,
    pub target: String,
    pub output_name: String,
    pub pre_render: FsSnapshot,
}

impl SessionController {
    /// Render a project's selected (or default) target to a file
    ///
    /// Runs on a detached engine: the current playback session and the play
    /// state are left alone. Failures are user-visible notifications.
    pub fn render_to_disk(&self, id: &ProjectId, target: Option<&str>) -> SessionResult<RenderReport> {
        log::info!("[RENDER] Render request for project {}", id);

        let Some(snapshot) = self.gate.cache().snapshot(id) else {
            return Err(self.render_error(
                SessionError::MissingProject(id.clone()),
                "no project is loaded",
            ));
        };
        let Some((_, document)) = snapshot.target_document(target) else {
            return Err(self.render_error(
                SessionError::MissingTarget(id.clone()),
                "no target was found for this project",
            ));
        };
        let target_name = document.filename.clone();

        let engine = self
            .lifecycle
            .acquire_factory()
            .and_then(|factory| self.lifecycle.create_detached(&factory, &self.config.render))
            .map_err(|e| self.render_error(e, "the engine failed to start"))?;

        sync_project(engine.fs(), &snapshot)?;
        let pre_render = snapshot_tree(engine.fs()).map_err(|source| SyncError {
            path: "/".to_string(),
            source,
        })?;

        match self.compile_document(&engine, &snapshot, document) {
            Ok(0) => {}
            Ok(code) => {
                Teardown::from_result(engine.cleanup(), "cleanup");
                return Err(self.render_error(
                    SessionError::CompileFailed(code),
                    "the project failed to compile",
                ));
            }
            Err(source) => {
                Teardown::from_result(engine.cleanup(), "cleanup");
                return Err(self.render_error(
                    SessionError::Engine {
                        stage: PipelineStage::Compile,
                        source,
                    },
                    "the project failed to compile",
                ));
            }
        }

        let output_name = self.render_output(&engine, &target_name)?;

        let render_id = self.next_render.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut renders) = self.renders.lock() {
            renders.insert(render_id, engine.clone());
        }
        self.install_render_listener(render_id, &engine, &target_name, &output_name, &pre_render);

        let started = engine.start();
        if !matches!(started, Ok(0)) {
            self.forget_render(render_id);
            let error = match started {
                Ok(code) => SessionError::StartFailed(code),
                Err(source) => SessionError::Engine {
                    stage: PipelineStage::Start,
                    source,
                },
            };
            return Err(self.render_error(
                error,
                "the project encountered an error while rendering",
            ));
        }

        log::info!("[RENDER] Render {} of {} -> {}", render_id, target_name, output_name);
        Ok(RenderReport {
            render_id,
            target: target_name,
            output_name,
            pre_render,
        })
    }

    /// Number of renders still registered (started, not yet ended or cancelled)
    pub fn active_renders(&self) -> usize {
        self.renders.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Output file for the render, overriding a live device or missing name
    fn render_output(&self, engine: &Arc<dyn Engine>, target_name: &str) -> SessionResult<String> {
        let reported = engine.output_name().unwrap_or_else(|e| {
            log::warn!("[RENDER] Could not read output name: {}", e);
            None
        });

        match reported {
            Some(name) if !self.config.needs_output_file(Some(&name)) => Ok(name),
            _ => {
                let name = self.config.default_output_name(target_name);
                engine.set_option(&format!("-o{}", name)).map_err(|source| {
                    Teardown::from_result(engine.cleanup(), "cleanup");
                    self.render_error(
                        SessionError::Engine {
                            stage: PipelineStage::Configure,
                            source,
                        },
                        "the output file could not be set",
                    )
                })?;
                Ok(name)
            }
        }
    }

    fn install_render_listener(
        &self,
        render_id: u64,
        engine: &Arc<dyn Engine>,
        target: &str,
        output_name: &str,
        pre_render: &FsSnapshot,
    ) {
        let events = self.events.clone();
        let presenter = self.presenter.clone();
        // Weak: the registry owns the engine, the engine owns this listener
        let renders = Arc::downgrade(&self.renders);
        let announced = AtomicBool::new(false);
        let target = target.to_string();
        let output_name = output_name.to_string();
        let pre_render = pre_render.clone();

        engine.set_listener(Box::new(move |event| match event {
            LifecycleEvent::RenderStarted => {
                if announced.swap(true, Ordering::SeqCst) {
                    return;
                }
                emit(
                    &events,
                    SessionEvent::Notice {
                        message: format!("Render of {} started", target),
                        severity: Severity::Info,
                    },
                );
                emit(
                    &events,
                    SessionEvent::RenderStarted {
                        target: target.clone(),
                    },
                );
            }
            LifecycleEvent::RenderEnded => {
                let Some(engine) = renders
                    .upgrade()
                    .and_then(|renders| take_render(&renders, render_id))
                else {
                    return;
                };
                log::info!("[RENDER] Render {} of {} finished", render_id, target);

                emit(
                    &events,
                    SessionEvent::Notice {
                        message: format!("Render of {} finished: {}", target, output_name),
                        severity: Severity::Success,
                    },
                );
                emit(
                    &events,
                    SessionEvent::RenderEnded {
                        target: target.clone(),
                        output_name: output_name.clone(),
                    },
                );
                if let Some(presenter) = &presenter {
                    presenter.present(RenderArtifact {
                        engine,
                        target: target.clone(),
                        output_name: output_name.clone(),
                        pre_render: pre_render.clone(),
                    });
                }
            }
            _ => {}
        }));
    }

    /// Abandon a running render
    ///
    /// A render engine is retained until it reports `RenderEnded`. One that
    /// never does stays registered until it is cancelled here: the engine is
    /// cleaned up and destroyed (best effort) and a later `RenderEnded` is
    /// ignored. Returns whether the render was still registered.
    pub fn cancel_render(&self, render_id: u64) -> bool {
        let Some(engine) = take_render(&self.renders, render_id) else {
            return false;
        };

        log::info!("[RENDER] Cancelling render {}", render_id);
        Teardown::from_result(engine.cleanup(), "cleanup");
        Teardown::from_result(engine.destroy(), "destroy");
        true
    }

    fn forget_render(&self, render_id: u64) {
        take_render(&self.renders, render_id);
    }

    fn render_error(&self, error: SessionError, message: &str) -> SessionError {
        log::error!("[RENDER] {}", error);
        self.notify(format!("Render error: {}", message), Severity::Error);
        error
    }
}

/// Remove a render from the registry, returning its engine if it was there
fn take_render(renders: &Mutex<HashMap<u64, Arc<dyn Engine>>>, render_id: u64) -> Option<Arc<dyn Engine>> {
    renders.lock().ok()?.remove(&render_id)
}
