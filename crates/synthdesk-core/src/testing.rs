//! Shared test fixtures: a sample project and a scriptable fake engine

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::cache::ProjectCache;
use crate::config::SessionConfig;
use crate::engine::{
    Engine, EngineError, EngineFactory, EngineFs, EngineOptions, EngineResult, FactoryLoader,
    FileStat, LifecycleEvent, LifecycleListener, MemoryFs, PlayState,
};
use crate::project::{
    Document, LastModified, Project, ProjectId, ProjectSnapshot, ProjectTargets, Target,
};
use crate::services::{SessionEvent, Severity};
use crate::session::{ConsoleSink, RenderArtifact, RenderPresenter, SessionController};
use crate::store::MemoryStore;

/// Project with two folders, an orchestra file nested in both and a
/// descriptor at the root
///
/// Targets: `project.csd` (default) and `synth` (the orchestra file).
pub(crate) fn sample_snapshot(id: &str) -> ProjectSnapshot {
    let mut targets = ProjectTargets::single(Target::main("project.csd", "main"));
    targets
        .targets
        .insert("synth".to_string(), Target::main("synth", "orc"));

    ProjectSnapshot::new(Project {
        id: ProjectId::new(id),
        name: "Sample".to_string(),
        owner_id: "owner".to_string(),
        public: false,
        cached_last_modified: None,
    })
    .with_document(Document::folder("f1", "folder1"))
    .with_document(Document::folder("f2", "folder2").in_folders(["f1"]))
    .with_document(
        Document::file("orc", "synth.orc", "instr 1\n  out oscili(0.2, 440)\nendin\n")
            .in_folders(["f1", "f2"]),
    )
    .with_document(Document::file(
        "main",
        "project.csd",
        "<CsoundSynthesizer>\n<CsInstruments>\n#include \"folder1/folder2/synth.orc\"\n</CsInstruments>\n</CsoundSynthesizer>\n",
    ))
    .with_targets(targets)
}

/// Scripted behaviour of the fake engine stack
#[derive(Debug, Clone, Default)]
pub(crate) struct EngineScript {
    pub compile_result: i32,
    pub start_result: i32,
    pub destroy_fails: bool,
    pub factory_load_fails: bool,
    pub create_returns_none: bool,
    pub fs_write_fails: bool,
    /// Output name reported before any `-o` option is set
    pub output_name: Option<String>,
}

/// Engine calls recorded by [`FakeEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    SetOption(String),
    CompileProject(String),
    CompileProjectText(String),
    CompileRaw(String),
    Start,
    Stop,
    Pause,
    Resume,
    Cleanup,
    Destroy,
}

/// Memory filesystem that can be told to reject writes
pub(crate) struct ScriptedFs {
    inner: MemoryFs,
    fail_writes: bool,
}

impl ScriptedFs {
    pub fn read_file(&self, path: &str) -> EngineResult<Vec<u8>> {
        self.inner.read_file(path)
    }
}

impl EngineFs for ScriptedFs {
    fn read_dir(&self, path: &str) -> EngineResult<Vec<String>> {
        self.inner.read_dir(path)
    }

    fn stat(&self, path: &str) -> EngineResult<FileStat> {
        self.inner.stat(path)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> EngineResult<()> {
        if self.fail_writes {
            return Err(EngineError::Filesystem {
                path: path.to_string(),
                reason: "read-only".to_string(),
            });
        }
        self.inner.write_file(path, data)
    }

    fn mkdir(&self, path: &str) -> EngineResult<()> {
        self.inner.mkdir(path)
    }
}

pub(crate) struct FakeEngine {
    script: EngineScript,
    options: EngineOptions,
    pub fs: ScriptedFs,
    listener: Mutex<Option<LifecycleListener>>,
    calls: Mutex<Vec<Call>>,
    output: Mutex<Option<String>>,
}

impl FakeEngine {
    fn new(script: EngineScript, options: EngineOptions) -> Self {
        Self {
            fs: ScriptedFs {
                inner: MemoryFs::new(),
                fail_writes: script.fs_write_fails,
            },
            output: Mutex::new(script.output_name.clone()),
            options,
            script,
            listener: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Deliver a lifecycle notification to the installed listener
    pub fn emit(&self, event: LifecycleEvent) {
        let listener = self.listener.lock().unwrap();
        if let Some(listener) = listener.as_ref() {
            listener(event);
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn cleanup_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Cleanup))
    }

    pub fn destroy_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Destroy))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Engine for FakeEngine {
    fn set_listener(&self, listener: LifecycleListener) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn set_option(&self, option: &str) -> EngineResult<()> {
        self.record(Call::SetOption(option.to_string()));
        if let Some(name) = option.strip_prefix("-o") {
            *self.output.lock().unwrap() = Some(name.to_string());
        }
        Ok(())
    }

    fn compile_project(&self, path: &str) -> EngineResult<i32> {
        self.record(Call::CompileProject(path.to_string()));
        Ok(self.script.compile_result)
    }

    fn compile_project_text(&self, text: &str) -> EngineResult<i32> {
        self.record(Call::CompileProjectText(text.to_string()));
        Ok(self.script.compile_result)
    }

    fn compile_raw(&self, text: &str) -> EngineResult<i32> {
        self.record(Call::CompileRaw(text.to_string()));
        Ok(self.script.compile_result)
    }

    fn start(&self) -> EngineResult<i32> {
        self.record(Call::Start);
        Ok(self.script.start_result)
    }

    fn stop(&self) -> EngineResult<()> {
        self.record(Call::Stop);
        Ok(())
    }

    fn pause(&self) -> EngineResult<()> {
        self.record(Call::Pause);
        Ok(())
    }

    fn resume(&self) -> EngineResult<()> {
        self.record(Call::Resume);
        Ok(())
    }

    fn cleanup(&self) -> EngineResult<()> {
        self.record(Call::Cleanup);
        Ok(())
    }

    fn destroy(&self) -> EngineResult<()> {
        self.record(Call::Destroy);
        if self.script.destroy_fails {
            return Err(EngineError::CallFailed {
                call: "destroy",
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn output_name(&self) -> EngineResult<Option<String>> {
        Ok(self.output.lock().unwrap().clone())
    }

    fn fs(&self) -> &dyn EngineFs {
        &self.fs
    }
}

pub(crate) struct FakeFactory {
    script: EngineScript,
    engines: Mutex<Vec<Arc<FakeEngine>>>,
}

impl FakeFactory {
    /// The `index`-th engine this factory created
    pub fn engine(&self, index: usize) -> Arc<FakeEngine> {
        self.engines.lock().unwrap()[index].clone()
    }

    pub fn created(&self) -> usize {
        self.engines.lock().unwrap().len()
    }
}

impl EngineFactory for FakeFactory {
    fn create(&self, options: &EngineOptions) -> EngineResult<Option<Arc<dyn Engine>>> {
        if self.script.create_returns_none {
            return Ok(None);
        }
        let engine = Arc::new(FakeEngine::new(self.script.clone(), *options));
        self.engines.lock().unwrap().push(engine.clone());
        Ok(Some(engine))
    }
}

pub(crate) struct FakeLoader {
    script: EngineScript,
    loads: AtomicUsize,
    factory: Arc<FakeFactory>,
}

impl FakeLoader {
    pub fn new(script: EngineScript) -> Self {
        Self {
            factory: Arc::new(FakeFactory {
                script: script.clone(),
                engines: Mutex::new(Vec::new()),
            }),
            script,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn factory(&self) -> Arc<FakeFactory> {
        self.factory.clone()
    }
}

impl FactoryLoader for FakeLoader {
    fn load(&self) -> EngineResult<Arc<dyn EngineFactory>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.script.factory_load_fails {
            return Err(EngineError::FactoryLoadFailed("scripted failure".to_string()));
        }
        Ok(self.factory.clone())
    }
}

#[derive(Default)]
pub(crate) struct RecordingConsole {
    clears: AtomicUsize,
}

impl RecordingConsole {
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl ConsoleSink for RecordingConsole {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingPresenter {
    presented: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    /// Output names of the renders presented so far
    pub fn presented(&self) -> Vec<String> {
        self.presented.lock().unwrap().clone()
    }
}

impl RenderPresenter for RecordingPresenter {
    fn present(&self, artifact: RenderArtifact) {
        self.presented.lock().unwrap().push(artifact.output_name);
    }
}

pub(crate) struct Fixture {
    pub controller: SessionController,
    pub loader: Arc<FakeLoader>,
    pub store: Arc<MemoryStore>,
    pub events: Receiver<SessionEvent>,
    pub console: Arc<RecordingConsole>,
    pub presenter: Arc<RecordingPresenter>,
}

fn seeded(script: EngineScript, events: Sender<SessionEvent>) -> (SessionController, Arc<FakeLoader>, Arc<MemoryStore>) {
    let marker = LastModified::from_millis(1);
    let store = Arc::new(MemoryStore::new());
    store.insert(sample_snapshot("p1"), marker);

    let mut cached = sample_snapshot("p1");
    cached.project.cached_last_modified = marker;
    let cache = Arc::new(ProjectCache::new());
    cache.insert_snapshot(cached, marker);

    let loader = Arc::new(FakeLoader::new(script));
    let controller = SessionController::new(
        SessionConfig::default(),
        loader.clone(),
        store.clone(),
        cache,
        events,
    );
    (controller, loader, store)
}

/// Controller over a fresh cached copy of [`sample_snapshot`] `p1`
pub(crate) fn fixture(script: EngineScript) -> Fixture {
    let (tx, events) = unbounded();
    let (controller, loader, store) = seeded(script, tx);
    let console = Arc::new(RecordingConsole::default());
    let presenter = Arc::new(RecordingPresenter::default());

    Fixture {
        controller: controller
            .with_console(console.clone())
            .with_presenter(presenter.clone()),
        loader,
        store,
        events,
        console,
        presenter,
    }
}

/// Same as [`fixture`] but publishing to a caller-provided channel
pub(crate) fn controller_with_events(
    script: EngineScript,
    events: Sender<SessionEvent>,
) -> (SessionController, Arc<FakeLoader>) {
    let (controller, loader, _) = seeded(script, events);
    (controller, loader)
}

/// Drain published play states
pub(crate) fn play_states(events: &Receiver<SessionEvent>) -> Vec<PlayState> {
    events
        .try_iter()
        .filter_map(|event| match event {
            SessionEvent::PlayStateChanged(state) => Some(state),
            _ => None,
        })
        .collect()
}

/// Drain published notices
pub(crate) fn notices(events: &Receiver<SessionEvent>) -> Vec<(String, Severity)> {
    events
        .try_iter()
        .filter_map(|event| match event {
            SessionEvent::Notice { message, severity } => Some((message, severity)),
            _ => None,
        })
        .collect()
}
