#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The feature name must not be empty")]
    EmptyName,

    #[error("The ramp percentage `{0}` is out of range; it must be at most 100")]
    PercentageOutOfRange(u8),
}

/// The stored configuration for a single feature, keyed by `name`.
///
/// A feature with no stored record is inactive. `ramp_percentage`
/// defaults to 100 so that records written by plain on/off callers
/// behave as a hard toggle once `enabled` is set.
#[derive(Debug, PartialEq, Eq, Clone, serde::Serialize, serde::Deserialize)]
pub struct FeatureConfig {
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "full_ramp")]
    pub ramp_percentage: u8,

    /// Identifiers that always see the feature while it is enabled,
    /// regardless of the ramp percentage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowlist: Vec<String>,

    /// Identifiers that never see the feature through the ramp.
    /// An identifier on both lists is treated as allowlisted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denylist: Vec<String>,
}

fn full_ramp() -> u8 {
    100
}

impl FeatureConfig {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        Ok(Self {
            name,
            enabled: false,
            ramp_percentage: full_ramp(),
            allowlist: Vec::new(),
            denylist: Vec::new(),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if self.ramp_percentage > 100 {
            return Err(ValidationError::PercentageOutOfRange(self.ramp_percentage));
        }

        Ok(())
    }
}
