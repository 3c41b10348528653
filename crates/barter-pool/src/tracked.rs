use std::path::{Path, PathBuf};

use tracing::warn;

use barter_core::{BarterError, TradeKey};

/// Persisted set of trade keys the operator has been asked to watch.
///
/// A restarted process resumes monitoring keys it has never seen materialize
/// on-chain, so the set survives as a plain JSON array on disk. The file is
/// rewritten whole through a temp-and-rename so readers never observe a torn
/// write; callers serialize writers (the pool client holds this behind a
/// mutex).
#[derive(Debug)]
pub struct TrackedKeys {
    path: PathBuf,
    keys: Vec<TradeKey>,
}

impl TrackedKeys {
    /// Load from `path`. A missing or malformed file starts the set empty;
    /// IO problems are logged and never abort startup.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keys = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<TradeKey>>(&raw) {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "tracked-key file is malformed, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read tracked-key file, starting empty");
                Vec::new()
            }
        };
        Self { path, keys }
    }

    pub fn keys(&self) -> &[TradeKey] {
        &self.keys
    }

    pub fn contains(&self, key: &TradeKey) -> bool {
        self.keys.contains(key)
    }

    /// Add `key` and persist. Idempotent.
    pub fn register(&mut self, key: &TradeKey) -> Result<(), BarterError> {
        if self.contains(key) {
            return Ok(());
        }
        self.keys.push(key.clone());
        self.persist()
    }

    /// Remove `key` and persist. Idempotent.
    pub fn unregister(&mut self, key: &TradeKey) -> Result<(), BarterError> {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        if self.keys.len() == before {
            return Ok(());
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), BarterError> {
        let store = |e: std::io::Error| BarterError::TrackedKeyStore(e.to_string());
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(store)?;
            }
        }
        let tmp = tmp_path(&self.path);
        let json = serde_json::to_string_pretty(&self.keys)
            .map_err(|e| BarterError::TrackedKeyStore(e.to_string()))?;
        std::fs::write(&tmp, json).map_err(store)?;
        std::fs::rename(&tmp, &self.path).map_err(store)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
