use std::collections::HashMap;

use crate::config::FeatureConfig;

#[derive(Default)]
pub struct Memory {
    state: HashMap<String, FeatureConfig>,
}

impl super::Storage for Memory {
    type Error = std::convert::Infallible;

    async fn get(&self, name: &str) -> Result<Option<FeatureConfig>, Self::Error> {
        Ok(self.state.get(name).cloned())
    }

    async fn put(&mut self, config: FeatureConfig) -> Result<(), Self::Error> {
        self.state.insert(config.name.clone(), config);
        Ok(())
    }

    async fn delete(&mut self, name: &str) -> Result<(), Self::Error> {
        self.state.remove(name);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, Self::Error> {
        let mut names: Vec<String> = self.state.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
