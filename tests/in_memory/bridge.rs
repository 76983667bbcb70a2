//! Shared wiring for in-memory bridge integration tests.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use checkbridge::run::{
    adapters::{
        TracingReportSink,
        memory::{
            InMemoryMaterialsLoader, InMemoryReportSink, RecordingCiService,
            ScriptedExecutionBackend, ScriptedPoll, StaticRevisionResolver,
        },
    },
    domain::{
        BackendEndpoint, CanonicalState, CheckSuite, CheckSuiteAction, CheckSuiteEvent,
        CheckSuiteId, Composition, CompositionGroup, DescriptorEntry, PlanManifest, Provenance,
        RepositoryFullName, RunDescriptor, RunId,
    },
    ports::{ReportSink, TaskReport},
    services::{
        BackoffPolicy, CheckSuiteDispatcher, RunSupervisor, SuiteHealthTracker, StatusWatcher,
        TaskLauncher, WatchSettings,
    },
};
use mockable::DefaultClock;

/// Dispatcher type wired to in-memory adapters.
pub type MemoryDispatcher = CheckSuiteDispatcher<
    StaticRevisionResolver,
    ScriptedExecutionBackend,
    RecordingCiService,
    InMemoryMaterialsLoader,
    DefaultClock,
>;

/// Head revision every test suite points at.
pub const HEAD_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Checkout root the descriptor is resolved against.
pub const CHECKOUT_ROOT: &str = "/var/lib/checkbridge/checkouts/acme-widgets";

/// A run whose watcher stopped on a terminal state.
#[derive(Debug, Clone)]
pub struct FinishedRun {
    pub run_id: RunId,
    pub name: String,
    pub state: CanonicalState,
}

/// Fully wired bridge over in-memory adapters.
pub struct Bridge {
    pub backend: Arc<ScriptedExecutionBackend>,
    pub ci: Arc<RecordingCiService>,
    pub materials: Arc<InMemoryMaterialsLoader>,
    pub resolver: Arc<StaticRevisionResolver>,
    pub reports: Arc<InMemoryReportSink>,
    pub health: Arc<SuiteHealthTracker>,
    pub dispatcher: MemoryDispatcher,
}

/// Watch settings short enough for real-time tests.
#[must_use]
pub fn quick_settings() -> WatchSettings {
    WatchSettings {
        poll_interval: Duration::from_millis(10),
        backoff: BackoffPolicy::new(Duration::from_millis(5), Duration::from_millis(20), 3),
        max_lifetime: Some(Duration::from_secs(30)),
    }
}

impl Bridge {
    /// Wires every adapter and service.
    #[must_use]
    pub fn new(settings: WatchSettings) -> Self {
        let backend = Arc::new(ScriptedExecutionBackend::new());
        let ci = Arc::new(RecordingCiService::new());
        let materials = Arc::new(InMemoryMaterialsLoader::new());
        let resolver = Arc::new(StaticRevisionResolver::new());
        let reports = Arc::new(InMemoryReportSink::new());
        let forward: Arc<dyn ReportSink> = Arc::new(Tee {
            first: Arc::clone(&reports) as Arc<dyn ReportSink>,
            second: Arc::new(TracingReportSink::new()),
        });
        let health = Arc::new(SuiteHealthTracker::new(forward));
        let sink: Arc<dyn ReportSink> = Arc::clone(&health) as Arc<dyn ReportSink>;
        let clock = Arc::new(DefaultClock);

        let watcher = StatusWatcher::new(
            Arc::clone(&backend),
            Arc::clone(&ci),
            Arc::clone(&clock),
            Arc::clone(&sink),
            settings,
        );
        let supervisor = Arc::new(RunSupervisor::new(Arc::new(watcher)));
        let launcher = TaskLauncher::new(
            Arc::clone(&backend),
            Arc::clone(&ci),
            Arc::clone(&materials),
            clock,
            Arc::clone(&sink),
        );
        let dispatcher =
            CheckSuiteDispatcher::new(Arc::clone(&resolver), launcher, supervisor, sink);

        Self {
            backend,
            ci,
            materials,
            resolver,
            reports,
            health,
            dispatcher,
        }
    }

    /// Declares `plans` at the head revision and registers buildable
    /// materials for each.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be resolved or an adapter
    /// rejects the registration.
    pub fn declare(&self, plans: &[&str]) -> Result<(), eyre::Report> {
        let endpoint = BackendEndpoint::new("https://runner.example.test")?;
        let descriptor = RunDescriptor::new().with_backend(
            endpoint,
            plans.iter().map(|name| DescriptorEntry {
                name: (*name).to_owned(),
                plan_location: Utf8PathBuf::from(format!("plans/{name}")),
                composition_location: Utf8PathBuf::from(format!("plans/{name}/composition.toml")),
            }),
        );
        let batches = descriptor.resolve(Utf8Path::new(CHECKOUT_ROOT), &provenance()?)?;
        self.resolver.insert(HEAD_SHA, batches)?;
        Ok(())
    }

    /// Registers buildable materials for `plan`.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter rejects the registration.
    pub fn provide_materials(&self, plan: &str) -> Result<(), eyre::Report> {
        let plan_dir = Utf8Path::new(CHECKOUT_ROOT).join("plans").join(plan);
        self.materials.insert_manifest(
            plan_dir.clone(),
            PlanManifest {
                name: plan.to_owned(),
                extra_sources: std::collections::BTreeMap::new(),
            },
        )?;
        self.materials.insert_composition(
            plan_dir.join("composition.toml"),
            Composition {
                builder: "exec:go".to_owned(),
                groups: vec![CompositionGroup {
                    id: "nodes".to_owned(),
                    artifact: None,
                }],
                document: serde_json::json!({ "global": { "builder": "exec:go" } }),
            },
        )?;
        Ok(())
    }

    /// Registers materials for `plan` and scripts its status answers.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter rejects the registration.
    pub fn script(&self, plan: &str, polls: Vec<ScriptedPoll>) -> Result<(), eyre::Report> {
        self.provide_materials(plan)?;
        self.backend.script_plan(plan, polls)?;
        Ok(())
    }

    /// Waits until `expected` runs have finished and their watchers have
    /// left the supervisor.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchers do not finish within five seconds.
    pub async fn wait_for_finished(&self, expected: usize) -> Result<Vec<FinishedRun>, eyre::Report> {
        let supervisor = self.dispatcher.supervisor();
        let wait = async {
            loop {
                let finished = self
                    .reports
                    .count(|report| matches!(report, TaskReport::Finished { .. }));
                if finished >= expected && supervisor.registered_count()? == 0 {
                    return Ok::<(), eyre::Report>(());
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .map_err(|_| eyre::eyre!("watchers did not finish in time"))??;

        self.reports
            .reports()
            .into_iter()
            .filter_map(|report| match report {
                TaskReport::Finished { run_id, state, .. } => Some((run_id, state)),
                _ => None,
            })
            .map(|(run_id, state)| -> Result<FinishedRun, eyre::Report> {
                let check = self
                    .ci
                    .check_by_external_id(run_id.as_str())?
                    .ok_or_else(|| eyre::eyre!("no check for run {run_id}"))?;
                Ok(FinishedRun {
                    run_id,
                    name: check.request.name,
                    state,
                })
            })
            .collect()
    }
}

/// Forwards reports to two sinks.
struct Tee {
    first: Arc<dyn ReportSink>,
    second: Arc<dyn ReportSink>,
}

impl ReportSink for Tee {
    fn report(&self, report: TaskReport) {
        self.first.report(report.clone());
        self.second.report(report);
    }
}

/// Suite identifier every test suite uses.
///
/// # Errors
///
/// Returns an error if the identifier is rejected.
pub fn suite_id() -> Result<CheckSuiteId, eyre::Report> {
    Ok(CheckSuiteId::new(9001)?)
}

/// Provenance stamped on every run.
///
/// # Errors
///
/// Returns an error if the repository name is rejected.
pub fn provenance() -> Result<Provenance, eyre::Report> {
    Ok(Provenance {
        user: "octocat".to_owned(),
        repository: RepositoryFullName::new("acme/widgets")?,
        branch: "feature/retry".to_owned(),
        commit: HEAD_SHA.to_owned(),
    })
}

/// Builds an event for the shared suite.
///
/// # Errors
///
/// Returns an error if the suite cannot be constructed.
pub fn event(action: CheckSuiteAction) -> Result<CheckSuiteEvent, eyre::Report> {
    let suite = CheckSuite::new(
        suite_id()?,
        RepositoryFullName::new("acme/widgets")?,
        "feature/retry",
        HEAD_SHA,
        "octocat",
    )?;
    Ok(CheckSuiteEvent::new(action, suite))
}
