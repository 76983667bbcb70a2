//! Checkbridge: keeps CI checks in step with runs on an execution backend.
//!
//! A check-suite event names a revision; the bridge reads the revision's run
//! descriptor, submits each declared run to its execution backend, creates a
//! CI check per run, and then polls each run until it finishes, pushing every
//! state change to the check exactly once.
//!
//! # Architecture
//!
//! Checkbridge follows hexagonal architecture principles:
//!
//! - **Domain**: Pure state model with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the backend, CI service,
//!   materials, revision resolution, and health reporting
//! - **Adapters**: Concrete implementations of ports
//!
//! # Modules
//!
//! - [`run`]: Launching, watching, and reconciling runs
//! - [`config`]: YAML configuration for watcher timing

pub mod config;
pub mod run;
