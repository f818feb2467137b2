use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::ExtractionConfig;
use crate::traits::ConfigStore;

/// A [`ConfigStore`] over a single JSON file holding an array of configs.
///
/// A missing file is an empty store; it is created on the first insert.
/// Writes are serialized within the process only.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<ExtractionConfig>, AppError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "Failed to read config file {}: {e}",
                    self.path.display()
                )));
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            AppError::ConfigError(format!(
                "Invalid JSON in config file {}: {e}",
                self.path.display()
            ))
        })
    }

    fn write(&self, configs: &[ExtractionConfig]) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(configs)?;
        std::fs::write(&self.path, json).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to write config file {}: {e}",
                self.path.display()
            ))
        })
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, AppError> {
        self.lock
            .lock()
            .map_err(|_| AppError::Generic("Config file lock poisoned".into()))
    }
}

impl ConfigStore for FileConfigStore {
    async fn list_all(&self) -> Result<Vec<ExtractionConfig>, AppError> {
        let mut configs = {
            let _guard = self.guard()?;
            self.read()?
        };
        configs.sort_by(|a, b| {
            b.version
                .cmp(&a.version)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(configs)
    }

    async fn insert(
        &self,
        config: &ExtractionConfig,
    ) -> Result<Option<ExtractionConfig>, AppError> {
        let _guard = self.guard()?;
        let mut configs = self.read()?;

        let exists = configs
            .iter()
            .any(|c| c.match_hash == config.match_hash && c.version == config.version);
        if exists {
            tracing::debug!(
                match_hash = %config.match_hash,
                version = config.version,
                "Config already present in file"
            );
            return Ok(None);
        }

        configs.push(config.clone());
        self.write(&configs)?;
        tracing::info!(
            path = %self.path.display(),
            config_id = %config.id,
            total = configs.len(),
            "Config written"
        );
        Ok(Some(config.clone()))
    }
}
