//! Guarantees a usable local copy of a proving artifact.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::core::ProvingArtifact;
use crate::transport::{Transport, TransportError};
use crate::{ProvisionError, ProvisionResult};

use super::locks::ArtifactLocks;

/// Makes sure an artifact is on disk and at least `minimum_valid_size_bytes`
/// long before anything reads it.
///
/// The file is stat-checked on every call; there is no "last verified" cache.
/// An undersized file is deleted and downloaded again in full, never patched.
/// A valid file is left untouched, so calling this before every proof
/// operation is cheap and idempotent.
///
/// Concurrent calls for the same path from different sessions must be
/// serialized. Attach a shared `ArtifactLocks` with [`with_locks`] when
/// sessions share storage.
///
/// [`with_locks`]: ArtifactProvisioner::with_locks
pub struct ArtifactProvisioner {
    transport: Arc<dyn Transport>,
    locks: Option<Arc<ArtifactLocks>>,
}

impl ArtifactProvisioner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        ArtifactProvisioner {
            transport,
            locks: None,
        }
    }

    /// Serialize provisioning per local path through `locks`.
    pub fn with_locks(mut self, locks: Arc<ArtifactLocks>) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Ensure `artifact` is present and passes the size check.
    ///
    /// # Returns
    /// The bare local path (any `file://` prefix removed).
    ///
    /// # Errors
    /// - `TransferFailed` if the download itself fails
    /// - `IntegrityCheckFailed` if the downloaded file is still missing or undersized
    /// - `Storage` if the local file cannot be inspected or removed
    #[tracing::instrument(skip_all, fields(artifact = %artifact.name))]
    pub async fn ensure_present(&self, artifact: &ProvingArtifact) -> ProvisionResult<PathBuf> {
        let path = artifact.resolved_path();
        let minimum = artifact.minimum_valid_size_bytes;

        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(&path).await),
            None => None,
        };

        let stat = self.transport.stat(&path).await.map_err(storage)?;
        if stat.exists && stat.size_bytes >= minimum {
            debug!(path = %path.display(), size = stat.size_bytes, "artifact already present");
            return Ok(path);
        }

        if stat.exists {
            warn!(
                path = %path.display(),
                size = stat.size_bytes,
                minimum,
                "artifact is smaller than expected, deleting and re-downloading"
            );
            self.transport.delete(&path).await.map_err(storage)?;
        } else {
            info!(path = %path.display(), "artifact not found, downloading");
        }

        let outcome = self
            .transport
            .download(&artifact.remote_source, &path)
            .await
            .map_err(|e| {
                error!(url = %artifact.remote_source, error = %e, "artifact download failed");
                ProvisionError::TransferFailed(e.to_string())
            })?;

        let after = self.transport.stat(&path).await.map_err(storage)?;
        if !after.exists || after.size_bytes < minimum {
            error!(
                path = %path.display(),
                size = after.size_bytes,
                minimum,
                "downloaded artifact failed the size check"
            );
            return Err(ProvisionError::IntegrityCheckFailed {
                path,
                size_bytes: after.size_bytes,
                minimum_bytes: minimum,
            });
        }

        info!(
            path = %path.display(),
            size = after.size_bytes,
            status = outcome.status,
            "artifact downloaded"
        );
        Ok(path)
    }
}

fn storage(e: TransportError) -> ProvisionError {
    ProvisionError::Storage(e.to_string())
}
