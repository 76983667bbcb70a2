//! Task launcher: submits run specifications and registers their checks.

use crate::run::{
    domain::{
        BackendEndpoint, CheckSuite, CheckUpdate, CiConclusion, CreateCheckRequest, LaunchedRun,
        RunBatch, RunId, RunRequest, RunSpec, RunTask,
    },
    ports::{
        CiService, CiServiceError, ExecutionBackend, ExecutionBackendError, MaterialsError,
        MaterialsLoader, ReportSink, TaskReport,
    },
};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Errors that stop a single run specification from launching.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The plan or composition could not be loaded.
    #[error(transparent)]
    Materials(#[from] MaterialsError),

    /// The composition declares no instance groups.
    #[error("composition at {0} declares no groups")]
    InvalidComposition(Utf8PathBuf),

    /// The backend refused or could not receive the submission.
    #[error("run submission failed: {0}")]
    Submit(#[source] ExecutionBackendError),

    /// The run was submitted but its check could not be created.
    #[error("check creation failed for run {run_id}: {source}")]
    CreateCheck {
        /// Run the backend accepted.
        run_id: RunId,
        /// CI service failure.
        #[source]
        source: CiServiceError,
    },
}

impl LaunchError {
    /// Returns whether the failure happened before the backend assigned a
    /// run, in which case a failed check is published in its place.
    #[must_use]
    pub const fn needs_failure_check(&self) -> bool {
        !matches!(self, Self::CreateCheck { .. })
    }
}

/// A run specification that did not launch.
#[derive(Debug)]
pub struct LaunchFailure {
    /// Name of the specification.
    pub name: String,
    /// Why it failed.
    pub error: LaunchError,
}

/// Result of launching one batch.
#[derive(Debug, Default)]
pub struct LaunchSummary {
    /// Tasks that were submitted and have a queued check.
    pub launched: Vec<RunTask>,
    /// Specifications that failed, in input order.
    pub failures: Vec<LaunchFailure>,
}

/// Submits run specifications and creates their CI checks.
///
/// Each specification is launched independently; one failure never stops
/// its siblings.
#[derive(Clone)]
pub struct TaskLauncher<B, C, M, K>
where
    B: ExecutionBackend,
    C: CiService,
    M: MaterialsLoader,
    K: Clock + Send + Sync,
{
    backend: Arc<B>,
    ci: Arc<C>,
    materials: Arc<M>,
    clock: Arc<K>,
    sink: Arc<dyn ReportSink>,
}

impl<B, C, M, K> TaskLauncher<B, C, M, K>
where
    B: ExecutionBackend,
    C: CiService,
    M: MaterialsLoader,
    K: Clock + Send + Sync,
{
    /// Creates a launcher.
    #[must_use]
    pub const fn new(
        backend: Arc<B>,
        ci: Arc<C>,
        materials: Arc<M>,
        clock: Arc<K>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            backend,
            ci,
            materials,
            clock,
            sink,
        }
    }

    /// Launches every specification in `batch` for `suite`.
    pub async fn launch(&self, suite: &CheckSuite, batch: &RunBatch) -> LaunchSummary {
        let mut summary = LaunchSummary::default();
        for spec in &batch.specs {
            match self.launch_one(suite, &batch.endpoint, spec).await {
                Ok(task) => {
                    tracing::info!(
                        suite_id = %suite.id(),
                        run_id = %task.run_id(),
                        name = spec.name(),
                        endpoint = %batch.endpoint,
                        "run launched"
                    );
                    self.sink.report(TaskReport::Launched {
                        suite_id: suite.id(),
                        run_id: task.run_id().clone(),
                        name: spec.name().to_owned(),
                    });
                    summary.launched.push(task);
                }
                Err(error) => {
                    self.sink.report(TaskReport::LaunchFailed {
                        suite_id: suite.id(),
                        name: spec.name().to_owned(),
                        reason: error.to_string(),
                    });
                    if error.needs_failure_check() {
                        self.publish_failure(suite, spec).await;
                    }
                    summary.failures.push(LaunchFailure {
                        name: spec.name().to_owned(),
                        error,
                    });
                }
            }
        }
        summary
    }

    /// Builds the backend submission for `spec`.
    ///
    /// Groups without a prebuilt artifact are marked for building. When any
    /// group needs building, the plan directory is shipped along with the
    /// builder's extra sources, relative ones resolved against the plan
    /// directory with symlinks followed.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Materials`] when loading fails or
    /// [`LaunchError::InvalidComposition`] when the composition is empty.
    pub async fn prepare_request(&self, spec: &RunSpec) -> Result<RunRequest, LaunchError> {
        let manifest = self.materials.load_manifest(spec.plan_location()).await?;
        let composition = self
            .materials
            .load_composition(spec.composition_location())
            .await?;
        if composition.groups.is_empty() {
            return Err(LaunchError::InvalidComposition(
                spec.composition_location().to_owned(),
            ));
        }

        let build_groups = composition.build_indices();
        let (plan_dir, extra_sources) = if build_groups.is_empty() {
            (None, Vec::new())
        } else {
            let declared = manifest.extra_sources_for(&composition.builder);
            let resolved = self
                .resolve_extra_sources(spec.plan_location(), declared)
                .await?;
            (Some(spec.plan_location().to_owned()), resolved)
        };

        Ok(RunRequest {
            build_groups,
            composition,
            manifest,
            created_by: spec.provenance().clone(),
            plan_dir,
            extra_sources,
        })
    }

    async fn launch_one(
        &self,
        suite: &CheckSuite,
        endpoint: &BackendEndpoint,
        spec: &RunSpec,
    ) -> Result<RunTask, LaunchError> {
        let request = self.prepare_request(spec).await?;
        let run_id = self
            .backend
            .submit(endpoint, &request)
            .await
            .map_err(LaunchError::Submit)?;

        let check_request = CreateCheckRequest {
            repository: suite.repository().clone(),
            suite_id: suite.id(),
            name: spec.name().to_owned(),
            head_sha: suite.head_sha().to_owned(),
            external_id: run_id.as_str().to_owned(),
            initial: CheckUpdate::queued(),
        };
        let check_ref = self
            .ci
            .create_check(&check_request)
            .await
            .map_err(|source| LaunchError::CreateCheck {
                run_id: run_id.clone(),
                source,
            })?;

        Ok(RunTask::launched(
            LaunchedRun {
                run_id,
                name: spec.name().to_owned(),
                endpoint: endpoint.clone(),
                suite_id: suite.id(),
                check_ref,
            },
            &*self.clock,
        ))
    }

    async fn resolve_extra_sources(
        &self,
        plan_location: &Utf8Path,
        declared: &[String],
    ) -> Result<Vec<Utf8PathBuf>, LaunchError> {
        if declared.iter().all(|source| Utf8Path::new(source).is_absolute()) {
            return Ok(declared.iter().map(Utf8PathBuf::from).collect());
        }
        let plan_dir = self.materials.canonical_plan_dir(plan_location).await?;
        Ok(declared
            .iter()
            .map(|source| {
                let path = Utf8Path::new(source);
                if path.is_absolute() {
                    path.to_owned()
                } else {
                    clean_path(&plan_dir.join(path))
                }
            })
            .collect())
    }

    async fn publish_failure(&self, suite: &CheckSuite, spec: &RunSpec) {
        let request = CreateCheckRequest {
            repository: suite.repository().clone(),
            suite_id: suite.id(),
            name: spec.name().to_owned(),
            head_sha: suite.head_sha().to_owned(),
            external_id: spec.name().to_owned(),
            initial: CheckUpdate::completed(CiConclusion::Failure),
        };
        if let Err(err) = self.ci.create_check(&request).await {
            self.sink.report(TaskReport::FailureCheckRejected {
                suite_id: suite.id(),
                name: spec.name().to_owned(),
                reason: err.to_string(),
            });
        }
    }
}

/// Lexically removes `.` and `..` segments from `path`.
#[must_use]
pub fn clean_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut cleaned = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let last = cleaned.components().next_back();
                let last_is_normal = matches!(last, Some(Utf8Component::Normal(_)));
                let at_root = matches!(
                    last,
                    Some(Utf8Component::RootDir | Utf8Component::Prefix(_))
                );
                if last_is_normal {
                    cleaned.pop();
                } else if !at_root {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_str()),
        }
    }
    if cleaned.as_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
