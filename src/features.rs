use crate::config::{FeatureConfig, ValidationError};
use crate::ramp;
use crate::storage::Storage;

#[derive(thiserror::Error, Debug)]
pub enum Error<E> {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("The feature store is unavailable: {0}")]
    Storage(E),
}

/// The feature toggling and ramping client.
///
/// All state lives in the injected [`Storage`] adapter; every check
/// re-reads the stored record, so a configuration write is visible to
/// the next check without any cache invalidation. Batch readers that
/// want to pay for one read across many decisions can call [`get`] once
/// and feed the record to [`ramp::is_active`] themselves.
///
/// [`get`]: Features::get
pub struct Features<S: Storage> {
    storage: S,
}

impl<S: Storage> Features<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn get(&self, name: &str) -> Result<Option<FeatureConfig>, Error<S::Error>> {
        validate_name(name)?;

        self.storage.get(name).await.map_err(Error::Storage)
    }

    /// Whether the feature is active as a blanket switch: enabled and
    /// ramped to 100. Callers with an identifier should use
    /// [`is_active_for`](Features::is_active_for) instead.
    pub async fn is_active(&self, name: &str) -> Result<bool, Error<S::Error>> {
        let config = self.get(name).await?;

        Ok(ramp::is_active(config.as_ref(), None))
    }

    /// Whether the feature is active for the given identifier,
    /// respecting the allowlist, the denylist, and the ramp.
    pub async fn is_active_for(
        &self,
        name: &str,
        identifier: &str,
    ) -> Result<bool, Error<S::Error>> {
        let config = self.get(name).await?;

        Ok(ramp::is_active(config.as_ref(), Some(identifier)))
    }

    /// Turn the feature on, keeping any previously configured ramp
    /// percentage. A feature that was never configured starts at 100.
    #[tracing::instrument(skip(self))]
    pub async fn activate(&mut self, name: &str) -> Result<(), Error<S::Error>> {
        self.update(name, |config| {
            config.enabled = true;
        })
        .await
    }

    /// Turn the feature off for everyone. The ramp percentage and the
    /// lists are kept, so reactivating restores the previous rollout.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&mut self, name: &str) -> Result<(), Error<S::Error>> {
        self.update(name, |config| {
            config.enabled = false;
        })
        .await
    }

    /// Ramp the feature to the given percentage of identifiers. Does
    /// not change `enabled`; a feature configured this way before its
    /// first `activate` stays off.
    #[tracing::instrument(skip(self))]
    pub async fn set_ramp_percentage(
        &mut self,
        name: &str,
        percentage: u8,
    ) -> Result<(), Error<S::Error>> {
        if percentage > 100 {
            return Err(ValidationError::PercentageOutOfRange(percentage).into());
        }

        self.update(name, |config| {
            config.ramp_percentage = percentage;
        })
        .await
    }

    /// Always show the feature to this identifier while it is enabled,
    /// regardless of the ramp. Adding an identifier twice stores it
    /// once.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_allowlist(
        &mut self,
        name: &str,
        identifier: impl Into<String> + std::fmt::Debug,
    ) -> Result<(), Error<S::Error>> {
        let identifier = identifier.into();
        self.update(name, |config| {
            if !config.allowlist.contains(&identifier) {
                config.allowlist.push(identifier);
            }
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_from_allowlist(
        &mut self,
        name: &str,
        identifier: &str,
    ) -> Result<(), Error<S::Error>> {
        self.update(name, |config| {
            config.allowlist.retain(|id| id != identifier);
        })
        .await
    }

    /// Never show the feature to this identifier through the ramp. An
    /// identifier on both lists is treated as allowlisted.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_denylist(
        &mut self,
        name: &str,
        identifier: impl Into<String> + std::fmt::Debug,
    ) -> Result<(), Error<S::Error>> {
        let identifier = identifier.into();
        self.update(name, |config| {
            if !config.denylist.contains(&identifier) {
                config.denylist.push(identifier);
            }
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_from_denylist(
        &mut self,
        name: &str,
        identifier: &str,
    ) -> Result<(), Error<S::Error>> {
        self.update(name, |config| {
            config.denylist.retain(|id| id != identifier);
        })
        .await
    }

    /// Overwrite the feature with a fresh default record: disabled,
    /// ramped to 100, empty lists.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&mut self, name: &str) -> Result<(), Error<S::Error>> {
        let config = FeatureConfig::new(name)?;

        self.storage.put(config).await.map_err(Error::Storage)
    }

    /// Delete the stored record entirely. Deleting an absent feature
    /// succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&mut self, name: &str) -> Result<(), Error<S::Error>> {
        validate_name(name)?;

        self.storage.delete(name).await.map_err(Error::Storage)
    }

    /// The names of every stored feature.
    pub async fn list(&self) -> Result<Vec<String>, Error<S::Error>> {
        self.storage.list().await.map_err(Error::Storage)
    }

    /// Every stored feature record.
    pub async fn all(&self) -> Result<Vec<FeatureConfig>, Error<S::Error>> {
        let mut configs = Vec::new();
        for name in self.list().await? {
            if let Some(config) = self.storage.get(&name).await.map_err(Error::Storage)? {
                configs.push(config);
            }
        }

        Ok(configs)
    }

    async fn update<F>(&mut self, name: &str, apply: F) -> Result<(), Error<S::Error>>
    where
        F: FnOnce(&mut FeatureConfig),
    {
        validate_name(name)?;

        let mut config = match self.storage.get(name).await.map_err(Error::Storage)? {
            Some(config) => config,
            None => FeatureConfig::new(name)?,
        };

        apply(&mut config);
        config.validate()?;

        self.storage.put(config).await.map_err(Error::Storage)
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{Error, Features};
    use crate::config::{FeatureConfig, ValidationError};
    use crate::storage::{Memory, Storage};

    fn features() -> Features<Memory> {
        Features::new(Memory::default())
    }

    /// A store whose backing service is never reachable.
    struct Unreachable;

    #[derive(thiserror::Error, Debug)]
    #[error("connection refused")]
    struct UnreachableError;

    impl Storage for Unreachable {
        type Error = UnreachableError;

        async fn get(&self, _name: &str) -> Result<Option<FeatureConfig>, Self::Error> {
            Err(UnreachableError)
        }

        async fn put(&mut self, _config: FeatureConfig) -> Result<(), Self::Error> {
            Err(UnreachableError)
        }

        async fn delete(&mut self, _name: &str) -> Result<(), Self::Error> {
            Err(UnreachableError)
        }

        async fn list(&self) -> Result<Vec<String>, Self::Error> {
            Err(UnreachableError)
        }
    }

    #[tokio::test]
    async fn storage_failures_pass_through_unchanged() {
        let mut features = Features::new(Unreachable);

        assert!(matches!(
            features.is_active("search").await,
            Err(Error::Storage(UnreachableError))
        ));
        assert!(matches!(
            features.is_active_for("search", "user-1").await,
            Err(Error::Storage(UnreachableError))
        ));
        assert!(matches!(
            features.activate("search").await,
            Err(Error::Storage(UnreachableError))
        ));
        assert!(matches!(
            features.set_ramp_percentage("search", 50).await,
            Err(Error::Storage(UnreachableError))
        ));
        assert!(matches!(
            features.remove("search").await,
            Err(Error::Storage(UnreachableError))
        ));
        assert!(matches!(
            features.list().await,
            Err(Error::Storage(UnreachableError))
        ));
    }

    #[tokio::test]
    async fn unconfigured_feature_is_inactive() {
        let features = features();

        assert!(!features.is_active("search").await.unwrap());
        assert!(!features.is_active_for("search", "user-1").await.unwrap());
    }

    #[tokio::test]
    async fn activate_then_deactivate() {
        let mut features = features();

        features.activate("feature_a").await.unwrap();
        assert!(features.is_active("feature_a").await.unwrap());

        features.deactivate("feature_a").await.unwrap();
        assert!(!features.is_active("feature_a").await.unwrap());
    }

    #[tokio::test]
    async fn set_ramp_percentage_round_trips_and_keeps_enabled() {
        let mut features = features();

        features.activate("search").await.unwrap();
        features.set_ramp_percentage("search", 42).await.unwrap();

        let config = features.get("search").await.unwrap().unwrap();
        assert_eq!(config.ramp_percentage, 42);
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn activate_keeps_a_configured_percentage() {
        let mut features = features();

        features.set_ramp_percentage("search", 25).await.unwrap();
        assert!(!features.is_active("search").await.unwrap());

        features.activate("search").await.unwrap();

        let config = features.get("search").await.unwrap().unwrap();
        assert!(config.enabled);
        assert_eq!(config.ramp_percentage, 25);
    }

    #[tokio::test]
    async fn percentage_boundaries() {
        let mut features = features();

        features.set_ramp_percentage("search", 0).await.unwrap();
        features.set_ramp_percentage("search", 100).await.unwrap();

        assert!(matches!(
            features.set_ramp_percentage("search", 101).await,
            Err(Error::Validation(ValidationError::PercentageOutOfRange(
                101
            )))
        ));
    }

    #[tokio::test]
    async fn empty_names_are_rejected_everywhere() {
        let mut features = features();

        assert!(matches!(
            features.activate("").await,
            Err(Error::Validation(ValidationError::EmptyName))
        ));
        assert!(matches!(
            features.is_active("").await,
            Err(Error::Validation(ValidationError::EmptyName))
        ));
        assert!(matches!(
            features.remove("").await,
            Err(Error::Validation(ValidationError::EmptyName))
        ));
    }

    #[tokio::test]
    async fn half_ramp_activates_about_half_of_identifiers() {
        let mut features = features();

        features.set_ramp_percentage("rollout", 50).await.unwrap();
        features.activate("rollout").await.unwrap();

        let mut active = 0;
        for i in 0..10_000 {
            if features
                .is_active_for("rollout", &format!("user-{i}"))
                .await
                .unwrap()
            {
                active += 1;
            }
        }

        assert!((4_500..=5_500).contains(&active), "active = {active}");
    }

    #[tokio::test]
    async fn allowlist_overrides_a_zero_ramp() {
        let mut features = features();

        features.activate("search").await.unwrap();
        features.set_ramp_percentage("search", 0).await.unwrap();
        features.add_to_allowlist("search", "vip").await.unwrap();

        assert!(features.is_active_for("search", "vip").await.unwrap());
        assert!(!features.is_active_for("search", "other").await.unwrap());

        features
            .remove_from_allowlist("search", "vip")
            .await
            .unwrap();
        assert!(!features.is_active_for("search", "vip").await.unwrap());
    }

    #[tokio::test]
    async fn denylist_overrides_a_full_ramp() {
        let mut features = features();

        features.activate("search").await.unwrap();
        features.add_to_denylist("search", "banned").await.unwrap();

        assert!(!features.is_active_for("search", "banned").await.unwrap());
        assert!(features.is_active_for("search", "other").await.unwrap());

        features
            .remove_from_denylist("search", "banned")
            .await
            .unwrap();
        assert!(features.is_active_for("search", "banned").await.unwrap());
    }

    #[tokio::test]
    async fn list_adds_are_duplicate_free() {
        let mut features = features();

        features.add_to_allowlist("search", "3").await.unwrap();
        features.add_to_allowlist("search", "3").await.unwrap();
        features.add_to_denylist("search", "4").await.unwrap();
        features.add_to_denylist("search", "4").await.unwrap();

        let config = features.get("search").await.unwrap().unwrap();
        assert_eq!(config.allowlist, vec!["3"]);
        assert_eq!(config.denylist, vec!["4"]);
    }

    #[tokio::test]
    async fn reset_restores_the_defaults() {
        let mut features = features();

        features.activate("search").await.unwrap();
        features.set_ramp_percentage("search", 5).await.unwrap();
        features.add_to_allowlist("search", "3").await.unwrap();
        features.add_to_denylist("search", "4").await.unwrap();

        features.reset("search").await.unwrap();

        let config = features.get("search").await.unwrap().unwrap();
        assert!(!config.enabled);
        assert_eq!(config.ramp_percentage, 100);
        assert!(config.allowlist.is_empty());
        assert!(config.denylist.is_empty());
    }

    #[tokio::test]
    async fn remove_forgets_the_feature() {
        let mut features = features();

        features.activate("search").await.unwrap();
        features.remove("search").await.unwrap();
        features.remove("search").await.unwrap();

        assert_eq!(features.get("search").await.unwrap(), None);
        assert!(features.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_returns_every_record() {
        let mut features = features();

        features.activate("one").await.unwrap();
        features.set_ramp_percentage("two", 5).await.unwrap();

        assert_eq!(features.list().await.unwrap(), vec!["one", "two"]);

        let all = features.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|c| c.name == "one" && c.enabled));
        assert!(
            all.iter()
                .any(|c| c.name == "two" && c.ramp_percentage == 5)
        );
    }
}
