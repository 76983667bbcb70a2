//! Shared fixtures for run unit tests.

use std::sync::Arc;
use std::time::Duration;

use crate::run::{
    adapters::memory::{
        InMemoryMaterialsLoader, InMemoryReportSink, RecordingCiService,
        ScriptedExecutionBackend, ScriptedPoll,
    },
    domain::{
        BackendEndpoint, CheckRef, CheckSuite, CheckSuiteId, CheckUpdateRequest, Composition,
        CompositionGroup, CreateCheckRequest, LaunchedRun, PlanManifest, Provenance,
        RawRunStatus, RepositoryFullName, RunBatch, RunId, RunRequest, RunSpec, RunTask,
    },
    ports::{
        CiService, CiServiceResult, ExecutionBackend, ExecutionBackendError,
        ExecutionBackendResult, ReportSink,
    },
    services::{BackoffPolicy, StatusWatcher, TaskLauncher, WatchSettings},
};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use mockable::DefaultClock;

pub type TestLauncher = TaskLauncher<
    ScriptedExecutionBackend,
    RecordingCiService,
    InMemoryMaterialsLoader,
    DefaultClock,
>;
pub type TestWatcher = StatusWatcher<ScriptedExecutionBackend, RecordingCiService, DefaultClock>;

pub const SUITE_ID: u64 = 42;
pub const HEAD_SHA: &str = "9fceb02d0ae598e95dc970b74767f19372d61af8";

pub fn suite_id() -> CheckSuiteId {
    CheckSuiteId::new(SUITE_ID).expect("valid suite id")
}

pub fn repository() -> RepositoryFullName {
    RepositoryFullName::new("acme/widgets").expect("valid repository")
}

pub fn suite() -> CheckSuite {
    CheckSuite::new(suite_id(), repository(), "main", HEAD_SHA, "alice").expect("valid suite")
}

pub fn endpoint() -> BackendEndpoint {
    BackendEndpoint::new("https://backend.example.test").expect("valid endpoint")
}

pub fn provenance() -> Provenance {
    Provenance {
        user: "alice".to_owned(),
        repository: repository(),
        branch: "main".to_owned(),
        commit: HEAD_SHA.to_owned(),
    }
}

pub fn plan_location(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("/checkout/plans/{name}"))
}

pub fn composition_location(name: &str) -> Utf8PathBuf {
    plan_location(name).join("composition.toml")
}

pub fn spec(name: &str) -> RunSpec {
    RunSpec::new(
        name,
        plan_location(name),
        composition_location(name),
        provenance(),
    )
    .expect("valid run spec")
}

pub fn composition(groups: &[(&str, Option<&str>)]) -> Composition {
    Composition {
        builder: "docker:go".to_owned(),
        groups: groups
            .iter()
            .map(|(id, artifact)| CompositionGroup {
                id: (*id).to_owned(),
                artifact: artifact.map(str::to_owned),
            })
            .collect(),
        document: serde_json::json!({ "global": { "builder": "docker:go" } }),
    }
}

pub fn fast_settings() -> WatchSettings {
    WatchSettings {
        poll_interval: Duration::from_secs(10),
        backoff: BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(30), 3),
        max_lifetime: None,
    }
}

/// In-memory collaborators shared by launcher and watcher tests.
pub struct Harness {
    pub backend: Arc<ScriptedExecutionBackend>,
    pub ci: Arc<RecordingCiService>,
    pub materials: Arc<InMemoryMaterialsLoader>,
    pub sink: Arc<InMemoryReportSink>,
    pub clock: Arc<DefaultClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(ScriptedExecutionBackend::new()),
            ci: Arc::new(RecordingCiService::new()),
            materials: Arc::new(InMemoryMaterialsLoader::new()),
            sink: Arc::new(InMemoryReportSink::new()),
            clock: Arc::new(DefaultClock),
        }
    }

    pub fn report_sink(&self) -> Arc<dyn ReportSink> {
        Arc::clone(&self.sink) as Arc<dyn ReportSink>
    }

    pub fn launcher(&self) -> TestLauncher {
        TaskLauncher::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.ci),
            Arc::clone(&self.materials),
            Arc::clone(&self.clock),
            self.report_sink(),
        )
    }

    pub fn watcher(&self, settings: WatchSettings) -> TestWatcher {
        StatusWatcher::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.ci),
            Arc::clone(&self.clock),
            self.report_sink(),
            settings,
        )
    }

    /// Registers a buildable plan named `name` with one group.
    pub fn seed_plan(&self, name: &str) {
        self.materials
            .insert_manifest(
                plan_location(name),
                PlanManifest {
                    name: name.to_owned(),
                    extra_sources: std::collections::BTreeMap::new(),
                },
            )
            .expect("manifest registered");
        self.materials
            .insert_composition(composition_location(name), composition(&[("single", None)]))
            .expect("composition registered");
    }

    /// Seeds, scripts, and launches a single run named `name`.
    pub async fn launch(&self, name: &str, polls: Vec<ScriptedPoll>) -> RunTask {
        self.seed_plan(name);
        self.backend
            .script_plan(name, polls)
            .expect("script registered");
        let batch = RunBatch {
            endpoint: endpoint(),
            specs: vec![spec(name)],
        };
        let mut summary = self.launcher().launch(&suite(), &batch).await;
        assert!(summary.failures.is_empty(), "launch failed: {:?}", summary.failures);
        summary.launched.pop().expect("one launched task")
    }
}

/// Builds a scheduled task for `run` without touching any adapter.
pub fn launched_task(run: &str, suite: CheckSuiteId) -> RunTask {
    RunTask::launched(
        LaunchedRun {
            run_id: RunId::new(run).expect("valid run id"),
            name: run.to_owned(),
            endpoint: endpoint(),
            suite_id: suite,
            check_ref: CheckRef::new(format!("check-{run}")).expect("valid check ref"),
        },
        &DefaultClock,
    )
}

/// Backend whose status queries never answer.
pub struct StalledBackend;

#[async_trait]
impl ExecutionBackend for StalledBackend {
    async fn submit(
        &self,
        _endpoint: &BackendEndpoint,
        _request: &RunRequest,
    ) -> ExecutionBackendResult<RunId> {
        Err(ExecutionBackendError::Rejected("submissions closed".to_owned()))
    }

    async fn status(
        &self,
        _endpoint: &BackendEndpoint,
        _run_id: &RunId,
    ) -> ExecutionBackendResult<RawRunStatus> {
        std::future::pending().await
    }
}

/// CI service whose calls never answer.
pub struct StalledCi;

#[async_trait]
impl CiService for StalledCi {
    async fn create_check(&self, _request: &CreateCheckRequest) -> CiServiceResult<CheckRef> {
        std::future::pending().await
    }

    async fn update_check(
        &self,
        _check_ref: &CheckRef,
        _request: &CheckUpdateRequest,
    ) -> CiServiceResult<()> {
        std::future::pending().await
    }
}
