//! Provider abstraction over hosted feedback boards.
//!
//! Every remote service is normalized into [`FeedbackItem`]s behind the
//! [`FeedbackProvider`] trait. [`Provider`] is the closed set of built-in
//! variants and [`ProviderRegistry`] maps configuration names to them.

mod clearflask;
mod eververse;
mod fider;
mod http;
mod local;
pub mod status;

use std::collections::BTreeMap;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::models::FeedbackItem;

pub use clearflask::ClearFlaskProvider;
pub use eververse::EververseProvider;
pub use fider::FiderProvider;
pub use local::LocalProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not connected")]
    NotConnected,
    #[error("{operation} is not implemented for the {provider} provider")]
    NotImplemented {
        provider: &'static str,
        operation: &'static str,
    },
    #[error("missing required option: {0}")]
    MissingOption(String),
    #[error("invalid provider configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("API error: {message}")]
    Api { status: u16, message: String },
    #[error("remote item not found: {0}")]
    NotFound(String),
    #[error("invalid response payload: {0}")]
    InvalidPayload(String),
}

impl ProviderError {
    pub(crate) const fn not_implemented(provider: &'static str, operation: &'static str) -> Self {
        Self::NotImplemented {
            provider,
            operation,
        }
    }

    /// Errors that make the whole connection unusable.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::NotConnected
            | Self::MissingOption(_)
            | Self::InvalidConfiguration(_)
            | Self::Url(_) => true,
            Self::Http(error) => error.is_connect() || error.is_timeout(),
            Self::Api { status, .. } => {
                *status == StatusCode::UNAUTHORIZED.as_u16()
                    || *status == StatusCode::FORBIDDEN.as_u16()
            }
            Self::NotImplemented { .. } | Self::NotFound(_) | Self::InvalidPayload(_) => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Capability interface implemented once per remote service.
///
/// `connect` must leave the provider unconnected when it fails. Operations a
/// service does not offer return [`ProviderError::NotImplemented`].
#[allow(async_fn_in_trait)]
pub trait FeedbackProvider {
    /// Configuration name of the provider (`fider`, `clearflask`, ...)
    fn name(&self) -> &'static str;

    /// Validate configuration and verify the endpoint is reachable.
    async fn connect(&mut self, config: &ProviderConfig) -> ProviderResult<()>;

    /// Every item on the remote board.
    async fn list(&self) -> ProviderResult<Vec<FeedbackItem>>;

    /// One item by its remote identifier.
    async fn get(&self, id: &str) -> ProviderResult<FeedbackItem>;

    /// Create an item and return it as stored remotely (with its id).
    async fn create(&self, item: &FeedbackItem) -> ProviderResult<FeedbackItem>;

    /// Overwrite the remote item identified by `item.external_id`.
    async fn update(&self, item: &FeedbackItem) -> ProviderResult<()>;

    async fn delete(&self, id: &str) -> ProviderResult<()>;

    /// Drop connection state.
    fn close(&mut self);

    /// False for providers without a remote side.
    fn is_remote(&self) -> bool {
        true
    }
}

/// Built-in providers.
#[derive(Debug)]
pub enum Provider {
    Fider(FiderProvider),
    ClearFlask(ClearFlaskProvider),
    Eververse(EververseProvider),
    Local(LocalProvider),
}

macro_rules! dispatch {
    ($self:ident, $provider:ident => $call:expr) => {
        match $self {
            Provider::Fider($provider) => $call,
            Provider::ClearFlask($provider) => $call,
            Provider::Eververse($provider) => $call,
            Provider::Local($provider) => $call,
        }
    };
}

impl FeedbackProvider for Provider {
    fn name(&self) -> &'static str {
        dispatch!(self, provider => provider.name())
    }

    async fn connect(&mut self, config: &ProviderConfig) -> ProviderResult<()> {
        dispatch!(self, provider => provider.connect(config).await)
    }

    async fn list(&self) -> ProviderResult<Vec<FeedbackItem>> {
        dispatch!(self, provider => provider.list().await)
    }

    async fn get(&self, id: &str) -> ProviderResult<FeedbackItem> {
        dispatch!(self, provider => provider.get(id).await)
    }

    async fn create(&self, item: &FeedbackItem) -> ProviderResult<FeedbackItem> {
        dispatch!(self, provider => provider.create(item).await)
    }

    async fn update(&self, item: &FeedbackItem) -> ProviderResult<()> {
        dispatch!(self, provider => provider.update(item).await)
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        dispatch!(self, provider => provider.delete(id).await)
    }

    fn close(&mut self) {
        dispatch!(self, provider => provider.close());
    }

    fn is_remote(&self) -> bool {
        dispatch!(self, provider => provider.is_remote())
    }
}

type Constructor = fn() -> Provider;

/// Mapping from configuration name to provider constructor.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    constructors: BTreeMap<&'static str, Constructor>,
}

impl ProviderRegistry {
    /// Registry with no providers.
    pub const fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry with every built-in provider.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("fider", || Provider::Fider(FiderProvider::new()));
        registry.register("clearflask", || {
            Provider::ClearFlask(ClearFlaskProvider::new())
        });
        registry.register("eververse", || Provider::Eververse(EververseProvider::new()));
        registry.register("local", || Provider::Local(LocalProvider::new()));
        registry
    }

    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        self.constructors.insert(name, constructor);
    }

    /// Fresh, unconnected provider for a configuration name.
    pub fn create(&self, name: &str) -> Option<Provider> {
        let name = name.trim().to_lowercase();
        self.constructors.get(name.as_str()).map(|constructor| constructor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name.trim().to_lowercase().as_str())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
