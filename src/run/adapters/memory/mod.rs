//! In-memory adapters for deterministic tests and local runs.

mod backend;
mod ci;
mod materials;
mod report;
mod resolver;

pub use backend::{ScriptedExecutionBackend, ScriptedPoll, Submission};
pub use ci::{RecordedCheck, RecordingCiService};
pub use materials::InMemoryMaterialsLoader;
pub use report::InMemoryReportSink;
pub use resolver::StaticRevisionResolver;
