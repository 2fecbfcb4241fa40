//! Project and provider configuration.
//!
//! A project is described by `.pft-config.json`, found by walking up from the
//! working directory. Each feedback area (`voc`, `vos`, `vob`, `voe`) may name
//! its own provider; the resulting [`ProviderConfig`] is what providers
//! consume on `connect`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ConflictPolicy;
use crate::provider::{ProviderError, ProviderRegistry};
use crate::util::{is_http_url, normalize_text_option};

pub const CONFIG_FILE_NAME: &str = ".pft-config.json";
pub const CACHE_FILE_NAME: &str = ".pft-cache.json";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const TIMEOUT_OPTION: &str = "timeout_secs";

/// Connection settings handed to a provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: String,
    /// Provider-specific settings such as `project_id`
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_token", &"[REDACTED]")
            .field("options", &self.options)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(endpoint: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_token: api_token.into(),
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Trimmed, non-empty option value.
    pub fn option(&self, key: &str) -> Option<String> {
        normalize_text_option(self.options.get(key).cloned())
    }

    /// Option that must be present for the provider to connect.
    pub fn require_option(&self, key: &str) -> std::result::Result<String, ProviderError> {
        self.option(key)
            .ok_or_else(|| ProviderError::MissingOption(key.to_string()))
    }

    /// Endpoint without trailing slashes, validated as an HTTP(S) URL.
    pub fn base_url(&self) -> std::result::Result<String, ProviderError> {
        let endpoint = normalize_text_option(Some(self.endpoint.clone())).ok_or_else(|| {
            ProviderError::InvalidConfiguration("endpoint must not be empty".to_string())
        })?;
        if !is_http_url(&endpoint) {
            return Err(ProviderError::InvalidConfiguration(format!(
                "endpoint must include http:// or https://: {endpoint}"
            )));
        }
        Ok(endpoint.trim_end_matches('/').to_string())
    }

    /// Request timeout, overridable with the `timeout_secs` option.
    pub fn timeout(&self) -> Duration {
        let secs = self
            .option(TIMEOUT_OPTION)
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }
}

/// Feedback area; each has its own directory and id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    /// Voice of Customer
    Voc,
    /// Voice of Stakeholder
    Vos,
    /// Voice of Business
    Vob,
    /// Voice of Engineer
    Voe,
}

impl Area {
    pub const ALL: [Self; 4] = [Self::Voc, Self::Vos, Self::Vob, Self::Voe];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Voc => "voc",
            Self::Vos => "vos",
            Self::Vob => "vob",
            Self::Voe => "voe",
        }
    }

    /// Prefix used for local ids and file names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Voc => "UC",
            Self::Vos => "REQ",
            Self::Vob | Self::Voe => "FB",
        }
    }

    /// Directory names, newest layout first.
    #[must_use]
    pub const fn dir_names(self) -> [&'static str; 2] {
        match self {
            Self::Voc => ["VoC", "voc"],
            Self::Vos => ["VoS", "vos"],
            Self::Vob => ["VoB", "vob"],
            Self::Voe => ["VoE", "voe"],
        }
    }

    /// Upper-case name used for environment variables.
    fn env_name(self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|area| area.as_str() == normalized)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "unknown area `{s}` (expected voc, vos, vob or voe)"
                ))
            })
    }
}

/// Resolve the directory of an area inside the project.
///
/// The first existing layout wins; new directories use the newest layout.
pub fn resolve_area_dir(project_dir: &Path, area: Area) -> PathBuf {
    let names = area.dir_names();
    names
        .iter()
        .map(|name| project_dir.join(name))
        .find(|path| path.is_dir())
        .unwrap_or_else(|| project_dir.join(names[0]))
}

/// Provider settings for one area.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product_id: String,
}

impl fmt::Debug for AreaConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AreaConfig")
            .field("provider", &self.provider)
            .field("url", &self.url)
            .field("api_token", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("product_id", &self.product_id)
            .finish()
    }
}

impl AreaConfig {
    /// Provider name, `local` when unset.
    pub fn provider_name(&self) -> &str {
        let provider = self.provider.trim();
        if provider.is_empty() {
            "local"
        } else {
            provider
        }
    }
}

/// `sync` block of the project config. Other keys are ignored on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub conflict_resolution: ConflictPolicy,
}

/// Contents of `.pft-config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
    /// Documentation root, relative to the config file when not absolute
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voc: Option<AreaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vos: Option<AreaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vob: Option<AreaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voe: Option<AreaConfig>,
    #[serde(default)]
    pub sync: SyncSettings,
}

impl ProjectConfig {
    /// Walk from `start` towards the filesystem root looking for the config file.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)
            .map_err(|error| Error::Config(format!("{}: {error}", path.display())))?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    pub fn area(&self, area: Area) -> Option<&AreaConfig> {
        match area {
            Area::Voc => self.voc.as_ref(),
            Area::Vos => self.vos.as_ref(),
            Area::Vob => self.vob.as_ref(),
            Area::Voe => self.voe.as_ref(),
        }
    }

    pub fn set_area(&mut self, area: Area, config: Option<AreaConfig>) {
        match area {
            Area::Voc => self.voc = config,
            Area::Vos => self.vos = config,
            Area::Vob => self.vob = config,
            Area::Voe => self.voe = config,
        }
    }

    /// Areas with an explicit entry in the config file.
    pub fn configured_areas(&self) -> Vec<Area> {
        Area::ALL
            .into_iter()
            .filter(|area| self.area(*area).is_some())
            .collect()
    }

    /// Provider name for an area, `local` when unconfigured.
    pub fn area_provider(&self, area: Area) -> &str {
        self.area(area).map_or("local", AreaConfig::provider_name)
    }

    /// Documentation root resolved against the config file's directory.
    pub fn project_dir(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let path = self.path.trim();
        if path.is_empty() {
            return base.to_path_buf();
        }
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }

    /// Build the provider configuration for an area.
    ///
    /// When the file carries no token, `PFT_<AREA>_TOKEN` and then
    /// `PFT_API_TOKEN` are consulted through `lookup_env`.
    pub fn area_provider_config(
        &self,
        area: Area,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> ProviderConfig {
        let Some(area_config) = self.area(area) else {
            return ProviderConfig::default();
        };

        let mut options = BTreeMap::new();
        if let Some(project_id) = normalize_text_option(Some(area_config.project_id.clone())) {
            options.insert("project_id".to_string(), project_id);
        }
        if let Some(product_id) = normalize_text_option(Some(area_config.product_id.clone())) {
            options.insert("product_id".to_string(), product_id);
        }

        let api_token = normalize_text_option(Some(area_config.api_token.clone()))
            .or_else(|| normalize_text_option(lookup_env(&format!("PFT_{}_TOKEN", area.env_name()))))
            .or_else(|| normalize_text_option(lookup_env("PFT_API_TOKEN")))
            .unwrap_or_default();

        ProviderConfig {
            endpoint: area_config.url.trim().to_string(),
            api_token,
            options,
        }
    }

    /// Validate every configured area against the built-in providers.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(&ProviderRegistry::builtin())
    }

    pub fn validate_with(&self, registry: &ProviderRegistry) -> Result<()> {
        for area in Area::ALL {
            if let Some(area_config) = self.area(area) {
                validate_area_config(area, area_config, registry)?;
            }
        }
        Ok(())
    }
}

fn validate_area_config(
    area: Area,
    config: &AreaConfig,
    registry: &ProviderRegistry,
) -> Result<()> {
    let provider = config.provider_name().to_lowercase();
    if !registry.contains(&provider) {
        return Err(Error::Config(format!(
            "invalid provider '{provider}' for area {area}"
        )));
    }
    if provider == "clearflask" && config.project_id.trim().is_empty() {
        return Err(Error::Config(format!(
            "project_id is required for ClearFlask provider in area {area}"
        )));
    }
    if provider != "local" && config.url.trim().is_empty() {
        return Err(Error::Config(format!(
            "url is required for provider {provider} in area {area}"
        )));
    }
    if provider != "local" && !is_http_url(config.url.trim()) {
        return Err(Error::Config(format!(
            "url for area {area} must include http:// or https://"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn area_prefixes_and_dir_names() {
        assert_eq!(Area::Voc.prefix(), "UC");
        assert_eq!(Area::Vos.prefix(), "REQ");
        assert_eq!(Area::Vob.prefix(), "FB");
        assert_eq!(Area::Voe.dir_names(), ["VoE", "voe"]);
        assert_eq!("VOS".parse::<Area>().unwrap(), Area::Vos);
        assert!("vox".parse::<Area>().is_err());
    }

    #[test]
    fn resolve_area_dir_prefers_existing_layout() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(resolve_area_dir(temp.path(), Area::Voc), temp.path().join("VoC"));

        std::fs::create_dir(temp.path().join("voc")).unwrap();
        assert_eq!(resolve_area_dir(temp.path(), Area::Voc), temp.path().join("voc"));

        std::fs::create_dir(temp.path().join("VoC")).unwrap();
        assert_eq!(resolve_area_dir(temp.path(), Area::Voc), temp.path().join("VoC"));
    }

    #[test]
    fn provider_config_options_and_timeout() {
        let config = ProviderConfig::new("https://feedback.example.com/", "token")
            .with_option("project_id", " demo ")
            .with_option("timeout_secs", "5");
        assert_eq!(config.option("project_id").as_deref(), Some("demo"));
        assert!(matches!(
            config.require_option("product_id"),
            Err(ProviderError::MissingOption(name)) if name == "product_id"
        ));
        assert_eq!(config.base_url().unwrap(), "https://feedback.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(
            ProviderConfig::default().timeout(),
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
        );
    }

    #[test]
    fn provider_config_debug_redacts_token() {
        let config = ProviderConfig::new("https://feedback.example.com", "secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn base_url_rejects_missing_scheme() {
        assert!(ProviderConfig::new("feedback.example.com", "t").base_url().is_err());
        assert!(ProviderConfig::default().base_url().is_err());
    }

    #[test]
    fn project_config_parses_and_builds_provider_config() {
        let raw = r#"{
            "name": "Demo",
            "path": "docs",
            "voc": {"provider": "clearflask", "url": "https://cf.example.com", "api_token": "abc", "project_id": "p1"},
            "vos": {"provider": "fider", "url": "https://fider.example.com"},
            "sync": {"conflict_resolution": "remote"}
        }"#;
        let config: ProjectConfig = serde_json::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.sync.conflict_resolution, ConflictPolicy::RemoteWins);
        assert_eq!(config.configured_areas(), vec![Area::Voc, Area::Vos]);
        assert_eq!(config.area_provider(Area::Vob), "local");

        let voc = config.area_provider_config(Area::Voc, no_env);
        assert_eq!(voc.endpoint, "https://cf.example.com");
        assert_eq!(voc.api_token, "abc");
        assert_eq!(voc.option("project_id").as_deref(), Some("p1"));

        let vos = config.area_provider_config(Area::Vos, |name| match name {
            "PFT_VOS_TOKEN" => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(vos.api_token, "from-env");

        let vos = config.area_provider_config(Area::Vos, |name| {
            (name == "PFT_API_TOKEN").then(|| "shared".to_string())
        });
        assert_eq!(vos.api_token, "shared");
    }

    #[test]
    fn validate_rejects_incomplete_areas() {
        let mut config = ProjectConfig::default();
        config.set_area(
            Area::Voc,
            Some(AreaConfig {
                provider: "clearflask".to_string(),
                url: "https://cf.example.com".to_string(),
                ..AreaConfig::default()
            }),
        );
        assert!(config.validate().is_err());

        config.set_area(
            Area::Voc,
            Some(AreaConfig {
                provider: "fider".to_string(),
                ..AreaConfig::default()
            }),
        );
        assert!(config.validate().is_err());

        config.set_area(
            Area::Voc,
            Some(AreaConfig {
                provider: "canny".to_string(),
                url: "https://canny.example.com".to_string(),
                ..AreaConfig::default()
            }),
        );
        assert!(config.validate().is_err());

        config.set_area(Area::Voc, Some(AreaConfig::default()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_accepts_registry_names_in_any_case() {
        let mut config = ProjectConfig::default();
        config.set_area(
            Area::Voc,
            Some(AreaConfig {
                provider: "Fider".to_string(),
                url: "https://fider.example.com".to_string(),
                ..AreaConfig::default()
            }),
        );
        assert!(config.validate().is_ok());
        assert!(config.validate_with(&ProviderRegistry::empty()).is_err());

        config.set_area(
            Area::Voc,
            Some(AreaConfig {
                provider: "ClearFlask".to_string(),
                url: "https://cf.example.com".to_string(),
                ..AreaConfig::default()
            }),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn discover_walks_up_and_resolves_project_dir() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        let config = ProjectConfig {
            name: "Demo".to_string(),
            path: "docs".to_string(),
            ..ProjectConfig::default()
        };
        config.save_to_path(&config_path).unwrap();

        let nested = temp.path().join("docs").join("VoC");
        std::fs::create_dir_all(&nested).unwrap();
        let found = ProjectConfig::discover(&nested).unwrap();
        assert_eq!(found, config_path);

        let loaded = ProjectConfig::load_from_path(&found).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.project_dir(&found), temp.path().join("docs"));
    }
}
