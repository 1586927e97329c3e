use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use crate::config::FeatureConfig;
use crate::storage::Storage;

const DOCUMENT_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Serializing / deserializing failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reading features from `{0}` failed: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Creating the temporary file in `{0}` failed: {1}")]
    Create(PathBuf, std::io::Error),

    #[error("Writing features to `{0}` failed: {1}")]
    Write(PathBuf, std::io::Error),

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Document {
    version: u32,
    features: BTreeMap<String, FeatureConfig>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            features: BTreeMap::new(),
        }
    }
}

/// A storage adapter keeping every feature record in a single JSON
/// document on disk. Writes land in a temporary file next to the
/// document and are renamed into place, so readers only ever observe
/// complete documents. A missing file is the empty store.
pub struct JsonFile {
    location: PathBuf,
    directory: PathBuf,
}

impl JsonFile {
    pub fn new(location: PathBuf) -> Option<Self> {
        Some(Self {
            directory: location.parent()?.to_owned(),
            location,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self) -> Result<Document, Error> {
        let contents = match tokio::fs::read(&self.location).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Document::default());
            }
            Err(e) => return Err(Error::Read(self.location.clone(), e)),
        };

        Ok(serde_json::from_slice(&contents)?)
    }

    #[tracing::instrument(skip(self, document))]
    async fn persist(&self, document: Document) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(&document)?;

        let directory = self.directory.clone();
        let location = self.location.clone();

        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let mut tempfile = tempfile::NamedTempFile::new_in(&directory)
                .map_err(|e| Error::Create(directory.clone(), e))?;

            tempfile
                .write_all(json.as_bytes())
                .map_err(|e| Error::Write(tempfile.path().into(), e))?;

            tempfile.persist(&location)?;

            Ok(())
        })
        .await??;

        tracing::trace!(location = ?self.location, "Features persisted");

        Ok(())
    }
}

impl Storage for JsonFile {
    type Error = Error;

    async fn get(&self, name: &str) -> Result<Option<FeatureConfig>, Error> {
        Ok(self.load().await?.features.get(name).cloned())
    }

    async fn put(&mut self, config: FeatureConfig) -> Result<(), Error> {
        let mut document = self.load().await?;
        document.features.insert(config.name.clone(), config);
        self.persist(document).await
    }

    async fn delete(&mut self, name: &str) -> Result<(), Error> {
        let mut document = self.load().await?;
        if document.features.remove(name).is_none() {
            return Ok(());
        }
        self.persist(document).await
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        Ok(self.load().await?.features.into_keys().collect())
    }
}
