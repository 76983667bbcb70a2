//! Domain model for run-state synchronisation.
//!
//! Run specifications, the run task aggregate, the canonical state machine,
//! and the CI check vocabulary. Infrastructure stays outside this boundary.

mod check;
mod error;
mod event;
mod ids;
mod materials;
mod spec;
mod state;
mod task;

pub use check::{CheckUpdate, CheckUpdateRequest, CiConclusion, CiStatus, CreateCheckRequest};
pub use error::{ParseCanonicalStateError, RunDomainError};
pub use event::{CheckSuite, CheckSuiteAction, CheckSuiteEvent};
pub use ids::{BackendEndpoint, CheckRef, CheckSuiteId, RepositoryFullName, RunId};
pub use materials::{Composition, CompositionGroup, PlanManifest, RunRequest};
pub use spec::{DescriptorEntry, Provenance, RunBatch, RunDescriptor, RunSpec};
pub use state::{CanonicalState, RawRunStatus, RunOutcome, StateTransition};
pub use task::{LaunchedRun, RunTask};
