//! Materials port: decoded plan manifests and compositions.

use crate::run::domain::{Composition, PlanManifest};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Result type for materials loading.
pub type MaterialsResult<T> = Result<T, MaterialsError>;

/// Reads the plan and composition a run specification points at.
#[async_trait]
pub trait MaterialsLoader: Send + Sync {
    /// Loads the manifest stored in the plan directory.
    ///
    /// # Errors
    ///
    /// Returns [`MaterialsError::MissingManifest`] when the plan has no
    /// manifest, or decode and I/O errors.
    async fn load_manifest(&self, plan_location: &Utf8Path) -> MaterialsResult<PlanManifest>;

    /// Loads a composition file.
    ///
    /// # Errors
    ///
    /// Returns [`MaterialsError::MissingComposition`] when the file does not
    /// exist, or decode and I/O errors.
    async fn load_composition(
        &self,
        composition_location: &Utf8Path,
    ) -> MaterialsResult<Composition>;

    /// Returns the plan directory with symlinks followed.
    ///
    /// # Errors
    ///
    /// Returns [`MaterialsError::Io`] when the directory cannot be resolved.
    async fn canonical_plan_dir(&self, plan_location: &Utf8Path) -> MaterialsResult<Utf8PathBuf>;
}

/// Errors returned by materials loaders.
#[derive(Debug, Clone, Error)]
pub enum MaterialsError {
    /// The plan directory has no manifest.
    #[error("no plan manifest at {0}")]
    MissingManifest(Utf8PathBuf),

    /// The composition file does not exist.
    #[error("no composition at {0}")]
    MissingComposition(Utf8PathBuf),

    /// A file exists but could not be decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// File that failed to decode.
        path: Utf8PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// Filesystem failure.
    #[error("materials I/O error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl MaterialsError {
    /// Wraps an I/O error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
