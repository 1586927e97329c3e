use std::path::PathBuf;

use crate::features::Features;
use crate::storage::{JsonFile, Memory, Storage};

#[derive(thiserror::Error, Debug)]
pub enum BuilderError {
    #[error("No storage path was configured")]
    NoPath,

    #[error("The storage location has no parent directory")]
    LocationHasNoParent,
}

/// The one explicit initialization point for a [`Features`] client.
///
/// Storage is injected here rather than held in ambient module state,
/// so two clients can point at different stores in the same process.
#[derive(Default)]
pub struct Builder {
    path: Option<PathBuf>,
}

impl Builder {
    pub fn new() -> Self {
        Builder { path: None }
    }

    /// Set the on-disk location used by
    /// [`build_json_file`](Builder::build_json_file).
    pub fn set_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }

    /// Build a client over an in-memory store. Records do not survive
    /// the process; suitable for tests and single-process defaults.
    ///
    /// ```rust
    /// use feature_ramp::Builder;
    ///
    /// # tokio_test::block_on(async {
    /// let mut features = Builder::new().build();
    ///
    /// features.activate("new-checkout").await.unwrap();
    /// assert!(features.is_active("new-checkout").await.unwrap());
    ///
    /// features.set_ramp_percentage("new-checkout", 25).await.unwrap();
    /// let rolled_out = features.is_active_for("new-checkout", "user-42").await.unwrap();
    /// # assert!(!rolled_out);
    /// # })
    /// ```
    pub fn build(self) -> Features<Memory> {
        self.build_with(Memory::default())
    }

    /// Build a client over a JSON file at the configured path.
    pub fn build_json_file(self) -> Result<Features<JsonFile>, BuilderError> {
        let path = self.path.ok_or(BuilderError::NoPath)?;
        let storage = JsonFile::new(path).ok_or(BuilderError::LocationHasNoParent)?;

        Ok(Features::new(storage))
    }

    /// Build a client over any [`Storage`] implementation.
    pub fn build_with<S: Storage>(self, storage: S) -> Features<S> {
        Features::new(storage)
    }
}
