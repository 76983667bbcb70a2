//! Step definitions for run status synchronisation scenarios.

#[path = "../in_memory/bridge.rs"]
pub mod bridge;

mod given;
mod then;
mod when;
pub mod world;
