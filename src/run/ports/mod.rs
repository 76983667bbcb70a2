//! Port contracts for run-state synchronisation.
//!
//! Ports define infrastructure-agnostic interfaces used by run services.

pub mod backend;
pub mod ci;
pub mod materials;
pub mod report;
pub mod resolver;

pub use backend::{ExecutionBackend, ExecutionBackendError, ExecutionBackendResult};
pub use ci::{CiService, CiServiceError, CiServiceResult};
pub use materials::{MaterialsError, MaterialsLoader, MaterialsResult};
pub use report::{ReportSink, TaskReport};
pub use resolver::{RevisionResolver, RevisionResolverError, RevisionResolverResult};
