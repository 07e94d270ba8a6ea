use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo;
use crate::search::QueryParams;

const SESSION_TMP_EXTENSION: &str = "json.tmp";
const SESSION_VERSION: u32 = 1;

/// What survives a restart: the query string of the last view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub query: String,
    pub saved_at: i64,
}

impl SessionSnapshot {
    pub fn params(&self) -> QueryParams {
        QueryParams::parse(&self.query)
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SessionSnapshot>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading session {}", self.path.display()))
            }
        };
        let snapshot: SessionSnapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing session {}", self.path.display()))?;
        if snapshot.version != SESSION_VERSION {
            tracing::warn!(version = snapshot.version, "ignoring session from another version");
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    pub fn save(&self, params: &QueryParams) -> Result<()> {
        let snapshot = SessionSnapshot {
            version: SESSION_VERSION,
            query: params.to_query_string(),
            saved_at: geo::now_millis(),
        };
        let json = serde_json::to_vec_pretty(&snapshot).context("serialising session")?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("ensuring session dir {}", dir.display()))?;
        }
        let tmp_path = self.path.with_extension(SESSION_TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary session {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("persisting session {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("removing session {}", self.path.display()))
            }
        }
    }
}
