//! Unit tests for run-state synchronisation.

mod support;
