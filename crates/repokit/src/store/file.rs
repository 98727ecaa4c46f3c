//! Flat-file store: one file per entity set under a root directory

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::formats::FileFormat;
use super::{EntitySet, StoreBackend};
use crate::conventions::EntityMetadata;
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    format: FileFormat,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn json(root: impl Into<PathBuf>) -> Self {
        Self::new(root, FileFormat::Json)
    }

    pub fn xml(root: impl Into<PathBuf>) -> Self {
        Self::new(root, FileFormat::Xml)
    }

    pub fn csv(root: impl Into<PathBuf>) -> Self {
        Self::new(root, FileFormat::Csv)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// `{root}/{table}.{ext}`
    pub fn file_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.{}", table, self.format.extension()))
    }

    async fn ensure_root(&self) -> ModelResult<()> {
        if fs::metadata(&self.root).await.is_err() {
            fs::create_dir_all(&self.root).await.map_err(|e| {
                ModelError::Io(format!(
                    "failed to create directory {}: {}",
                    self.root.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    async fn remove_quietly(paths: &[PathBuf]) {
        for path in paths {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove temporary file"
                ),
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl StoreBackend for FileStore {
    fn describe(&self) -> String {
        format!("{}:{}", self.format, self.root.display())
    }

    async fn load(&self, metadata: &EntityMetadata) -> ModelResult<Vec<Value>> {
        let path = self.file_path(&metadata.table_name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ModelError::Io(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        self.format.decode(metadata, &bytes)
    }

    /// Every set is encoded and written to a temporary file first; files are
    /// renamed into place only once all of them were written.
    async fn persist(&self, sets: Vec<EntitySet>) -> ModelResult<()> {
        self.ensure_root().await?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(sets.len());
        for set in &sets {
            let target = self.file_path(set.table());
            let temp = temp_path(&target);

            let written = match self.format.encode(&set.metadata, &set.rows) {
                Ok(bytes) => fs::write(&temp, bytes).await.map_err(|e| {
                    ModelError::Io(format!("failed to write {}: {}", temp.display(), e))
                }),
                Err(e) => Err(e),
            };

            if let Err(e) = written {
                let mut leftovers: Vec<PathBuf> =
                    staged.into_iter().map(|(temp, _)| temp).collect();
                leftovers.push(temp);
                Self::remove_quietly(&leftovers).await;
                return Err(e);
            }
            staged.push((temp, target));
        }

        for (temp, target) in staged {
            fs::rename(&temp, &target).await.map_err(|e| {
                ModelError::Io(format!("failed to replace {}: {}", target.display(), e))
            })?;
        }

        tracing::debug!(store = %self.describe(), sets = sets.len(), "persisted entity sets");
        Ok(())
    }
}
