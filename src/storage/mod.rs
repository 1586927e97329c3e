pub mod json_file;
mod memory;

pub use json_file::JsonFile;
pub use memory::Memory;

use crate::config::FeatureConfig;

/// Durable mapping from feature name to its configuration record.
///
/// Implementations must make `get`, `put`, and `delete` atomic for a
/// single key; `put` overwrites the whole record (last writer wins).
/// An absent key is the default "off" state, never an error. Failures
/// from the backing store propagate unchanged so callers can choose
/// their own fail-open or fail-closed policy.
pub trait Storage: Send + Sync + 'static {
    type Error: std::fmt::Debug + std::fmt::Display;

    fn get(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<FeatureConfig>, Self::Error>> + Send;

    fn put(
        &mut self,
        config: FeatureConfig,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    fn delete(
        &mut self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, Self::Error>> + Send;
}
