//! Decoded plan materials and the run request built from them.

use super::Provenance;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One instance group of a composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionGroup {
    /// Group identifier.
    pub id: String,
    /// Prebuilt artifact; `None` means the backend must build the group.
    pub artifact: Option<String>,
}

/// Decoded composition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Builder named in the composition's global section.
    pub builder: String,
    /// Instance groups in declaration order.
    pub groups: Vec<CompositionGroup>,
    /// Full composition document forwarded to the backend untouched.
    pub document: serde_json::Value,
}

impl Composition {
    /// Returns the indices of groups that have no prebuilt artifact.
    #[must_use]
    pub fn build_indices(&self) -> Vec<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, group)| group.artifact.as_deref().is_none_or(str::is_empty))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Decoded test plan manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanManifest {
    /// Plan name.
    pub name: String,
    /// Extra source directories per builder, relative to the plan directory
    /// unless absolute.
    #[serde(default)]
    pub extra_sources: BTreeMap<String, Vec<String>>,
}

impl PlanManifest {
    /// Returns the extra sources declared for `builder`.
    #[must_use]
    pub fn extra_sources_for(&self, builder: &str) -> &[String] {
        self.extra_sources
            .get(builder)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Submission payload for the execution backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Indices of composition groups the backend must build.
    pub build_groups: Vec<usize>,
    /// Composition to run.
    pub composition: Composition,
    /// Plan manifest.
    pub manifest: PlanManifest,
    /// Provenance recorded by the backend.
    pub created_by: Provenance,
    /// Plan directory to upload; `None` when nothing needs building.
    pub plan_dir: Option<Utf8PathBuf>,
    /// Extra build sources, already resolved.
    pub extra_sources: Vec<Utf8PathBuf>,
}
