//! Run specifications and the descriptor they are resolved from.

use super::{BackendEndpoint, RepositoryFullName, RunDomainError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who and what a run was created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    /// Login of the author that triggered the run.
    pub user: String,
    /// Repository the revision was fetched from.
    pub repository: RepositoryFullName,
    /// Branch the revision belongs to.
    pub branch: String,
    /// Commit the run executes against.
    pub commit: String,
}

/// A named composition prepared for submission to the execution backend.
///
/// Locations are already resolved against the fetched revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    name: String,
    plan_location: Utf8PathBuf,
    composition_location: Utf8PathBuf,
    provenance: Provenance,
}

impl RunSpec {
    /// Creates a validated run specification.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::EmptyRunName`] when the name is blank.
    pub fn new(
        name: impl Into<String>,
        plan_location: impl Into<Utf8PathBuf>,
        composition_location: impl Into<Utf8PathBuf>,
        provenance: Provenance,
    ) -> Result<Self, RunDomainError> {
        let raw_name = name.into();
        let trimmed = raw_name.trim();
        if trimmed.is_empty() {
            return Err(RunDomainError::EmptyRunName);
        }
        Ok(Self {
            name: trimmed.to_owned(),
            plan_location: plan_location.into(),
            composition_location: composition_location.into(),
            provenance,
        })
    }

    /// Returns the run name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resolved test plan directory.
    #[must_use]
    pub fn plan_location(&self) -> &Utf8Path {
        &self.plan_location
    }

    /// Returns the resolved composition file.
    #[must_use]
    pub fn composition_location(&self) -> &Utf8Path {
        &self.composition_location
    }

    /// Returns the run provenance.
    #[must_use]
    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }
}

/// One entry of a run descriptor, with locations relative to the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorEntry {
    /// Run name shown on the CI check.
    #[serde(alias = "Name")]
    pub name: String,
    /// Plan directory relative to the checkout root.
    #[serde(alias = "PlanDir")]
    pub plan_location: Utf8PathBuf,
    /// Composition file relative to the checkout root.
    #[serde(alias = "CompFile")]
    pub composition_location: Utf8PathBuf,
}

/// Run specifications that target a single backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunBatch {
    /// Backend the specifications are submitted to.
    pub endpoint: BackendEndpoint,
    /// Specifications to launch.
    pub specs: Vec<RunSpec>,
}

/// Mapping of backend endpoint to the runs declared for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunDescriptor {
    backends: BTreeMap<BackendEndpoint, Vec<DescriptorEntry>>,
}

impl RunDescriptor {
    /// Creates an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds entries for an endpoint, appending to any already declared.
    #[must_use]
    pub fn with_backend(
        mut self,
        endpoint: BackendEndpoint,
        entries: impl IntoIterator<Item = DescriptorEntry>,
    ) -> Self {
        self.backends.entry(endpoint).or_default().extend(entries);
        self
    }

    /// Returns the total number of declared runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.backends.values().map(Vec::len).sum()
    }

    /// Resolves entry locations against `checkout_root` and stamps each
    /// resulting specification with `provenance`.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::EmptyRunName`] when an entry has no name.
    pub fn resolve(
        &self,
        checkout_root: &Utf8Path,
        provenance: &Provenance,
    ) -> Result<Vec<RunBatch>, RunDomainError> {
        self.backends
            .iter()
            .map(|(endpoint, entries)| {
                let specs = entries
                    .iter()
                    .map(|entry| {
                        RunSpec::new(
                            entry.name.clone(),
                            checkout_root.join(&entry.plan_location),
                            checkout_root.join(&entry.composition_location),
                            provenance.clone(),
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RunBatch {
                    endpoint: endpoint.clone(),
                    specs,
                })
            })
            .collect()
    }
}
