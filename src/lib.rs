mod builder;
mod config;
mod features;
pub mod ramp;
pub mod storage;

pub use builder::{Builder, BuilderError};
pub use config::{FeatureConfig, ValidationError};
pub use features::{Error, Features};
