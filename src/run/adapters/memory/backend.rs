//! Scripted in-memory execution backend.

use crate::run::{
    domain::{BackendEndpoint, RawRunStatus, RunId, RunRequest, RunOutcome},
    ports::{ExecutionBackend, ExecutionBackendError, ExecutionBackendResult},
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One scripted answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedPoll {
    /// Answer with a raw status.
    Status(RawRunStatus),
    /// Fail with a transport error.
    Fail(String),
}

impl ScriptedPoll {
    /// Answer with `state` and no outcome.
    #[must_use]
    pub fn state(state: &str) -> Self {
        Self::Status(RawRunStatus::new(state))
    }

    /// Answer `complete` with `outcome`.
    #[must_use]
    pub fn complete(outcome: RunOutcome) -> Self {
        Self::Status(RawRunStatus::new("complete").with_outcome(outcome.as_str()))
    }

    /// Fail with `message`.
    #[must_use]
    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_owned())
    }
}

/// A submission the backend accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Endpoint the request was sent to.
    pub endpoint: BackendEndpoint,
    /// Identifier assigned to the run.
    pub run_id: RunId,
    /// Submitted request.
    pub request: RunRequest,
}

/// Execution backend that answers status queries from a script.
///
/// Scripts are consumed one answer per poll; the last answer repeats once
/// the script runs out. A submitted run without a script stays scheduled.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutionBackend {
    state: Arc<RwLock<ScriptedBackendState>>,
}

#[derive(Debug, Default)]
struct ScriptedBackendState {
    submissions: Vec<Submission>,
    plan_scripts: HashMap<String, Vec<ScriptedPoll>>,
    rejected_plans: HashMap<String, String>,
    run_scripts: HashMap<RunId, VecDeque<ScriptedPoll>>,
    poll_counts: HashMap<RunId, usize>,
}

impl ScriptedExecutionBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the status answers for the next run submitted for the plan
    /// whose manifest is named `plan_name`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn script_plan(
        &self,
        plan_name: impl Into<String>,
        polls: Vec<ScriptedPoll>,
    ) -> ExecutionBackendResult<()> {
        let mut state = self.write()?;
        state.plan_scripts.insert(plan_name.into(), polls);
        Ok(())
    }

    /// Scripts the status answers for an existing run identifier.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn script_run(&self, run_id: RunId, polls: Vec<ScriptedPoll>) -> ExecutionBackendResult<()> {
        let mut state = self.write()?;
        state.run_scripts.insert(run_id, polls.into());
        Ok(())
    }

    /// Rejects submissions for the plan named `plan_name`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn reject_plan(
        &self,
        plan_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> ExecutionBackendResult<()> {
        let mut state = self.write()?;
        state.rejected_plans.insert(plan_name.into(), reason.into());
        Ok(())
    }

    /// Returns accepted submissions in order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn submissions(&self) -> ExecutionBackendResult<Vec<Submission>> {
        Ok(self.read()?.submissions.clone())
    }

    /// Returns how many status queries `run_id` has received.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn poll_count(&self, run_id: &RunId) -> ExecutionBackendResult<usize> {
        Ok(self.read()?.poll_counts.get(run_id).copied().unwrap_or_default())
    }

    fn read(&self) -> ExecutionBackendResult<std::sync::RwLockReadGuard<'_, ScriptedBackendState>> {
        self.state
            .read()
            .map_err(|err| ExecutionBackendError::transport(std::io::Error::other(err.to_string())))
    }

    fn write(
        &self,
    ) -> ExecutionBackendResult<std::sync::RwLockWriteGuard<'_, ScriptedBackendState>> {
        self.state
            .write()
            .map_err(|err| ExecutionBackendError::transport(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedExecutionBackend {
    async fn submit(
        &self,
        endpoint: &BackendEndpoint,
        request: &RunRequest,
    ) -> ExecutionBackendResult<RunId> {
        let mut state = self.write()?;
        let plan_name = request.manifest.name.as_str();
        if let Some(reason) = state.rejected_plans.get(plan_name) {
            return Err(ExecutionBackendError::Rejected(reason.clone()));
        }

        let run_id = RunId::new(Uuid::new_v4().simple().to_string())
            .map_err(ExecutionBackendError::transport)?;
        let script = state.plan_scripts.remove(plan_name).unwrap_or_default();
        state.run_scripts.insert(run_id.clone(), script.into());
        state.submissions.push(Submission {
            endpoint: endpoint.clone(),
            run_id: run_id.clone(),
            request: request.clone(),
        });
        Ok(run_id)
    }

    async fn status(
        &self,
        _endpoint: &BackendEndpoint,
        run_id: &RunId,
    ) -> ExecutionBackendResult<RawRunStatus> {
        let mut state = self.write()?;
        let count = state.poll_counts.entry(run_id.clone()).or_default();
        *count = count.saturating_add(1);

        let script = state
            .run_scripts
            .get_mut(run_id)
            .ok_or_else(|| ExecutionBackendError::UnknownRun(run_id.clone()))?;
        let answer = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        match answer {
            Some(ScriptedPoll::Status(raw)) => Ok(raw),
            Some(ScriptedPoll::Fail(message)) => Err(ExecutionBackendError::transport(
                std::io::Error::other(message),
            )),
            None => Ok(RawRunStatus::new("scheduled")),
        }
    }
}
