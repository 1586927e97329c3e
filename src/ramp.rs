//! The ramp decision engine: a pure, deterministic mapping from a
//! feature's stored configuration and a candidate identifier to an
//! activation decision.
//!
//! The bucketing hash is part of the wire contract. It is SHA-256 over
//! the feature name, a single zero byte, and the identifier, all as
//! UTF-8 bytes; the first eight digest bytes are read as a big-endian
//! u64 and reduced mod 100. Salting by feature name keeps rollout
//! membership uncorrelated across unrelated features. Reimplementations
//! in other languages must reproduce this exactly, or identifiers will
//! flicker in and out of a held-constant ramp.

use sha2::{Digest, Sha256};

use crate::config::FeatureConfig;

/// The deterministic position of `identifier` in `[0, 99]` for the
/// given feature. An identifier is ramped in when its bucket is below
/// the configured percentage, so raising the percentage only ever adds
/// members to the active set.
pub fn bucket(name: &str, identifier: &str) -> u8 {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(identifier.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);

    (u64::from_be_bytes(prefix) % 100) as u8
}

/// Decide whether a feature is active for `identifier`.
///
/// An absent record is inactive, as is any record with `enabled` unset
/// (even for allowlisted identifiers). Without an identifier only the
/// blanket switch is consulted: enabled and ramped to 100. With an
/// identifier, the allowlist wins, then the denylist, then the bucket
/// is compared against the ramp percentage.
pub fn is_active(config: Option<&FeatureConfig>, identifier: Option<&str>) -> bool {
    let Some(config) = config else {
        return false;
    };

    if !config.enabled {
        return false;
    }

    let Some(identifier) = identifier else {
        return config.ramp_percentage >= 100;
    };

    if config.allowlist.iter().any(|id| id == identifier) {
        return true;
    }

    if config.denylist.iter().any(|id| id == identifier) {
        return false;
    }

    bucket(&config.name, identifier) < config.ramp_percentage
}
