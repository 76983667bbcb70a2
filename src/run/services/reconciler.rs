//! Check reconciler: decides which CI update a state transition needs.

use crate::run::domain::{CanonicalState, CheckUpdate, CiConclusion, RunOutcome};

/// Maps a canonical state to the CI check status it is published as.
///
/// Returns `None` for [`CanonicalState::Unknown`], which is never published.
#[must_use]
pub const fn check_update_for(state: CanonicalState) -> Option<CheckUpdate> {
    match state {
        CanonicalState::Scheduled => Some(CheckUpdate::queued()),
        CanonicalState::Processing => Some(CheckUpdate::in_progress()),
        CanonicalState::Complete(RunOutcome::Success) => {
            Some(CheckUpdate::completed(CiConclusion::Success))
        }
        CanonicalState::Complete(RunOutcome::Failure) | CanonicalState::Errored => {
            Some(CheckUpdate::completed(CiConclusion::Failure))
        }
        CanonicalState::Canceled => Some(CheckUpdate::completed(CiConclusion::Cancelled)),
        CanonicalState::Unknown => None,
    }
}

/// Returns the CI update due when a task moves from `previous` to `next`.
///
/// Returns `None` when the state did not change, so each distinct state is
/// published at most once.
#[must_use]
pub fn reconcile(previous: CanonicalState, next: CanonicalState) -> Option<CheckUpdate> {
    if previous == next {
        return None;
    }
    check_update_for(next)
}
