//! Recording in-memory CI service.

use crate::run::{
    domain::{CheckRef, CheckUpdate, CheckUpdateRequest, CreateCheckRequest},
    ports::{CiService, CiServiceError, CiServiceResult},
};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A check as the CI service saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCheck {
    /// Reference handed back on creation.
    pub check_ref: CheckRef,
    /// Creation payload.
    pub request: CreateCheckRequest,
    /// Accepted updates in arrival order.
    pub updates: Vec<CheckUpdateRequest>,
}

impl RecordedCheck {
    /// Returns the status the check currently shows.
    #[must_use]
    pub fn current(&self) -> CheckUpdate {
        self.updates
            .last()
            .map_or(self.request.initial, |request| request.update)
    }
}

/// CI service that records checks and updates in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingCiService {
    state: Arc<RwLock<RecordingCiState>>,
}

#[derive(Debug, Default)]
struct RecordingCiState {
    checks: Vec<RecordedCheck>,
    failing_updates: usize,
    update_attempts: usize,
    rejected_names: Vec<String>,
}

impl RecordingCiService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` update calls fail.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_next_updates(&self, count: usize) -> CiServiceResult<()> {
        self.write()?.failing_updates = count;
        Ok(())
    }

    /// Rejects check creation for checks named `name`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn reject_checks_named(&self, name: impl Into<String>) -> CiServiceResult<()> {
        self.write()?.rejected_names.push(name.into());
        Ok(())
    }

    /// Returns every created check in creation order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn checks(&self) -> CiServiceResult<Vec<RecordedCheck>> {
        Ok(self.read()?.checks.clone())
    }

    /// Returns the check whose external identifier is `external_id`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn check_by_external_id(&self, external_id: &str) -> CiServiceResult<Option<RecordedCheck>> {
        Ok(self
            .read()?
            .checks
            .iter()
            .find(|check| check.request.external_id == external_id)
            .cloned())
    }

    /// Returns the accepted updates for `external_id`, in order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn updates_for(&self, external_id: &str) -> CiServiceResult<Vec<CheckUpdate>> {
        Ok(self
            .check_by_external_id(external_id)?
            .map(|check| check.updates.iter().map(|request| request.update).collect())
            .unwrap_or_default())
    }

    /// Returns how many update calls were made, accepted or not.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn update_attempts(&self) -> CiServiceResult<usize> {
        Ok(self.read()?.update_attempts)
    }

    fn read(&self) -> CiServiceResult<std::sync::RwLockReadGuard<'_, RecordingCiState>> {
        self.state
            .read()
            .map_err(|err| CiServiceError::transport(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> CiServiceResult<std::sync::RwLockWriteGuard<'_, RecordingCiState>> {
        self.state
            .write()
            .map_err(|err| CiServiceError::transport(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl CiService for RecordingCiService {
    async fn create_check(&self, request: &CreateCheckRequest) -> CiServiceResult<CheckRef> {
        let mut state = self.write()?;
        if state.rejected_names.contains(&request.name) {
            return Err(CiServiceError::Rejected(format!(
                "check '{}' rejected",
                request.name
            )));
        }
        let check_ref =
            CheckRef::new(Uuid::new_v4().to_string()).map_err(CiServiceError::transport)?;
        state.checks.push(RecordedCheck {
            check_ref: check_ref.clone(),
            request: request.clone(),
            updates: Vec::new(),
        });
        Ok(check_ref)
    }

    async fn update_check(
        &self,
        check_ref: &CheckRef,
        request: &CheckUpdateRequest,
    ) -> CiServiceResult<()> {
        let mut state = self.write()?;
        state.update_attempts = state.update_attempts.saturating_add(1);
        if state.failing_updates > 0 {
            state.failing_updates = state.failing_updates.saturating_sub(1);
            return Err(CiServiceError::Rejected("service unavailable".to_owned()));
        }
        let check = state
            .checks
            .iter_mut()
            .find(|check| &check.check_ref == check_ref)
            .ok_or_else(|| CiServiceError::UnknownCheck(check_ref.clone()))?;
        check.updates.push(request.clone());
        Ok(())
    }
}
