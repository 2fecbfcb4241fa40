//! Local-only provider: no remote side, nothing to synchronize.

use super::{FeedbackProvider, ProviderError, ProviderResult};
use crate::config::ProviderConfig;
use crate::models::FeedbackItem;

const NAME: &str = "local";

#[derive(Debug, Default)]
pub struct LocalProvider {
    connected: bool,
}

impl LocalProvider {
    pub const fn new() -> Self {
        Self { connected: false }
    }

    const fn ensure_connected(&self) -> ProviderResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(ProviderError::NotConnected)
        }
    }
}

impl FeedbackProvider for LocalProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn connect(&mut self, _config: &ProviderConfig) -> ProviderResult<()> {
        self.connected = true;
        Ok(())
    }

    async fn list(&self) -> ProviderResult<Vec<FeedbackItem>> {
        self.ensure_connected()?;
        Ok(Vec::new())
    }

    async fn get(&self, id: &str) -> ProviderResult<FeedbackItem> {
        self.ensure_connected()?;
        Err(ProviderError::NotFound(id.to_string()))
    }

    async fn create(&self, _item: &FeedbackItem) -> ProviderResult<FeedbackItem> {
        self.ensure_connected()?;
        Err(ProviderError::not_implemented(NAME, "create"))
    }

    async fn update(&self, _item: &FeedbackItem) -> ProviderResult<()> {
        self.ensure_connected()?;
        Err(ProviderError::not_implemented(NAME, "update"))
    }

    async fn delete(&self, _id: &str) -> ProviderResult<()> {
        self.ensure_connected()?;
        Err(ProviderError::not_implemented(NAME, "delete"))
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn is_remote(&self) -> bool {
        false
    }
}
