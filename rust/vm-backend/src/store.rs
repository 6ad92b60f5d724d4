//! JSON file persistence of the VM registry.
//!
//! The file holds the registry keyed by decimal id, in the same shape the
//! HTTP API serves. It is only read at startup; runtime changes are not
//! written back.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::vm::Vms;

/// Errors reading or writing the VM list file.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("error reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error saving {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error JSON-parsing {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("error writing JSON for {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Load the VM list from `path`, first creating it with the seed set when
/// it does not exist.
pub async fn load_vms(path: &Path) -> StoreResult<Vms> {
    tracing::info!(path = %path.display(), "Loading fake cloud state");

    match tokio::fs::metadata(path).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "VM list missing, generating one");
            save_vms(path, &Vms::seed()).await?;
            tracing::info!(
                "Tip: you can tweak {} adding VMs or changing states for next run",
                path.display()
            );
        }
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the VM list to `path`, replacing any previous content.
pub async fn save_vms(path: &Path, vms: &Vms) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(vms).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    tokio::fs::write(path, json)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}
