//! In-memory materials loader keyed by path.

use crate::run::{
    domain::{Composition, PlanManifest},
    ports::{MaterialsError, MaterialsLoader, MaterialsResult},
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Materials loader serving preloaded manifests and compositions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMaterialsLoader {
    state: Arc<RwLock<InMemoryMaterialsState>>,
}

#[derive(Debug, Default)]
struct InMemoryMaterialsState {
    manifests: HashMap<Utf8PathBuf, PlanManifest>,
    compositions: HashMap<Utf8PathBuf, Composition>,
    canonical_dirs: HashMap<Utf8PathBuf, Utf8PathBuf>,
}

impl InMemoryMaterialsLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the manifest of the plan at `plan_location`.
    ///
    /// # Errors
    ///
    /// Returns I/O errors when lock acquisition fails.
    pub fn insert_manifest(
        &self,
        plan_location: impl Into<Utf8PathBuf>,
        manifest: PlanManifest,
    ) -> MaterialsResult<()> {
        self.write()?.manifests.insert(plan_location.into(), manifest);
        Ok(())
    }

    /// Registers the composition stored at `composition_location`.
    ///
    /// # Errors
    ///
    /// Returns I/O errors when lock acquisition fails.
    pub fn insert_composition(
        &self,
        composition_location: impl Into<Utf8PathBuf>,
        composition: Composition,
    ) -> MaterialsResult<()> {
        self.write()?
            .compositions
            .insert(composition_location.into(), composition);
        Ok(())
    }

    /// Declares that `plan_location` is a symlink to `target`.
    ///
    /// # Errors
    ///
    /// Returns I/O errors when lock acquisition fails.
    pub fn link_plan_dir(
        &self,
        plan_location: impl Into<Utf8PathBuf>,
        target: impl Into<Utf8PathBuf>,
    ) -> MaterialsResult<()> {
        self.write()?
            .canonical_dirs
            .insert(plan_location.into(), target.into());
        Ok(())
    }

    fn read(&self) -> MaterialsResult<std::sync::RwLockReadGuard<'_, InMemoryMaterialsState>> {
        self.state
            .read()
            .map_err(|err| MaterialsError::io(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> MaterialsResult<std::sync::RwLockWriteGuard<'_, InMemoryMaterialsState>> {
        self.state
            .write()
            .map_err(|err| MaterialsError::io(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl MaterialsLoader for InMemoryMaterialsLoader {
    async fn load_manifest(&self, plan_location: &Utf8Path) -> MaterialsResult<PlanManifest> {
        self.read()?
            .manifests
            .get(plan_location)
            .cloned()
            .ok_or_else(|| MaterialsError::MissingManifest(plan_location.join("manifest.toml")))
    }

    async fn load_composition(
        &self,
        composition_location: &Utf8Path,
    ) -> MaterialsResult<Composition> {
        self.read()?
            .compositions
            .get(composition_location)
            .cloned()
            .ok_or_else(|| MaterialsError::MissingComposition(composition_location.to_owned()))
    }

    async fn canonical_plan_dir(&self, plan_location: &Utf8Path) -> MaterialsResult<Utf8PathBuf> {
        let state = self.read()?;
        if let Some(target) = state.canonical_dirs.get(plan_location) {
            return Ok(target.clone());
        }
        if state.manifests.contains_key(plan_location) {
            return Ok(plan_location.to_owned());
        }
        Err(MaterialsError::io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("plan directory {plan_location} does not exist"),
        )))
    }
}
