//! Eververse provider (Supabase REST).
//!
//! The endpoint is the Supabase URL and the API token is the anon key; both
//! may also be given as the `supabase_url` / `supabase_anon_key` options.
//! Writes use `supabase_service_key` when configured.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::http::{self, Auth, JsonClient};
use super::{status, FeedbackProvider, ProviderError, ProviderResult};
use crate::config::ProviderConfig;
use crate::models::FeedbackItem;
use crate::util::{is_http_url, normalize_text_option};

const NAME: &str = "eververse";
const FEATURES: &str = "features";
const FEEDBACK: &str = "feedback";

#[derive(Debug, Default)]
pub struct EververseProvider {
    connection: Option<Connection>,
}

#[derive(Debug)]
struct Connection {
    client: JsonClient,
    product_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum RowId {
    Text(String),
    Number(i64),
}

impl RowId {
    fn into_string(self) -> String {
        match self {
            Self::Text(id) => id,
            Self::Number(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Feature {
    id: RowId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    priority: Option<i64>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    roadmap_id: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Feedback {
    id: RowId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    feature_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeatureWrite<'a> {
    title: &'a str,
    description: &'a str,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<&'a str>,
}

fn priority_label(priority: Option<i64>) -> &'static str {
    match priority {
        Some(1) => "critical",
        Some(2) => "high",
        Some(4) => "low",
        _ => "medium",
    }
}

impl From<Feature> for FeedbackItem {
    fn from(feature: Feature) -> Self {
        let mut item = Self::remote(feature.id.into_string(), feature.title);
        item.description = feature
            .description
            .filter(|description| !description.is_empty())
            .or(feature.content)
            .unwrap_or_default();
        item.status = status::from_eververse(feature.status.as_deref().unwrap_or_default());
        item.priority = priority_label(feature.priority).to_string();
        item.created_at = feature.created_at.unwrap_or_default();
        item.updated_at = feature.updated_at.unwrap_or_default();

        item.metadata.insert("type".to_string(), "feature".to_string());
        for (key, value) in [("product_id", &feature.product_id), ("roadmap_id", &feature.roadmap_id)] {
            if let Some(value) = value.as_ref().filter(|value| !value.is_empty()) {
                item.metadata.insert(key.to_string(), value.clone());
            }
        }

        for (key, value) in feature.metadata.unwrap_or_default() {
            match value {
                Value::String(text) => {
                    if key == "category" || key == "categories" {
                        item.categories.push(text.clone());
                    }
                    item.metadata.insert(key, text);
                }
                Value::Array(values) if key == "categories" => {
                    item.categories
                        .extend(values.into_iter().filter_map(|value| match value {
                            Value::String(text) => Some(text),
                            _ => None,
                        }));
                }
                _ => {}
            }
        }
        if item.categories.is_empty() {
            if let Some(product_id) = feature.product_id.filter(|id| !id.is_empty()) {
                item.categories.push(product_id);
            }
        }
        item
    }
}

impl From<Feedback> for FeedbackItem {
    fn from(feedback: Feedback) -> Self {
        let mut item = Self::remote(feedback.id.into_string(), feedback.title);
        item.description = feedback.content.unwrap_or_default();
        item.status = status::from_eververse(feedback.status.as_deref().unwrap_or_default());
        item.created_at = feedback.created_at.unwrap_or_default();
        item.updated_at = feedback.updated_at.unwrap_or_default();
        item.metadata.insert("type".to_string(), "feedback".to_string());
        for (key, value) in [("feature_id", feedback.feature_id), ("user_id", feedback.user_id)] {
            if let Some(value) = value.filter(|value| !value.is_empty()) {
                item.metadata.insert(key.to_string(), value);
            }
        }
        item
    }
}

impl EververseProvider {
    pub const fn new() -> Self {
        Self { connection: None }
    }

    fn connection(&self) -> ProviderResult<&Connection> {
        self.connection.as_ref().ok_or(ProviderError::NotConnected)
    }
}

impl Connection {
    async fn select<T: DeserializeOwned>(&self, table: &str, filter: &str) -> ProviderResult<Vec<T>> {
        let path = format!("/rest/v1/{table}?{filter}");
        http::send_json(self.client.request(Method::GET, &path)?).await
    }

    fn write_body<'a>(&'a self, item: &'a FeedbackItem, title: &'a str, description: &'a str) -> FeatureWrite<'a> {
        FeatureWrite {
            title,
            description,
            status: status::to_eververse(&item.status),
            product_id: item
                .metadata_value("product_id")
                .or(self.product_id.as_deref()),
        }
    }
}

fn eq_filter(id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(id.trim().as_bytes()).collect();
    format!("id=eq.{encoded}")
}

impl FeedbackProvider for EververseProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn connect(&mut self, config: &ProviderConfig) -> ProviderResult<()> {
        self.connection = None;

        let base_url = normalize_text_option(Some(config.endpoint.clone()))
            .or_else(|| config.option("supabase_url"))
            .ok_or_else(|| ProviderError::MissingOption("supabase_url".to_string()))?;
        if !is_http_url(&base_url) {
            return Err(ProviderError::InvalidConfiguration(format!(
                "Supabase URL must include http:// or https://: {base_url}"
            )));
        }
        let anon_key = normalize_text_option(Some(config.api_token.clone()))
            .or_else(|| config.option("supabase_anon_key"))
            .ok_or_else(|| ProviderError::MissingOption("supabase_anon_key".to_string()))?;
        let bearer = config
            .option("supabase_service_key")
            .unwrap_or_else(|| anon_key.clone());

        let client = JsonClient::new(
            base_url,
            Auth::Supabase {
                api_key: anon_key,
                bearer,
            },
            config,
        )?;
        http::send_expecting(
            client.request(Method::GET, "/rest/v1/")?,
            &[StatusCode::OK, StatusCode::NOT_FOUND],
        )
        .await?;

        tracing::debug!(provider = NAME, "Connected");
        self.connection = Some(Connection {
            client,
            product_id: config.option("product_id"),
        });
        Ok(())
    }

    async fn list(&self) -> ProviderResult<Vec<FeedbackItem>> {
        let connection = self.connection()?;
        match connection.select::<Feature>(FEATURES, "select=*").await {
            Ok(features) => Ok(features.into_iter().map(FeedbackItem::from).collect()),
            Err(features_error) => {
                tracing::debug!(provider = NAME, error = %features_error, "Falling back to feedback table");
                let feedback = connection.select::<Feedback>(FEEDBACK, "select=*").await?;
                Ok(feedback.into_iter().map(FeedbackItem::from).collect())
            }
        }
    }

    async fn get(&self, id: &str) -> ProviderResult<FeedbackItem> {
        let connection = self.connection()?;
        let filter = eq_filter(id);
        if let Ok(features) = connection.select::<Feature>(FEATURES, &filter).await {
            if let Some(feature) = features.into_iter().next() {
                return Ok(feature.into());
            }
        }
        let feedback = connection.select::<Feedback>(FEEDBACK, &filter).await?;
        feedback
            .into_iter()
            .next()
            .map(FeedbackItem::from)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    async fn create(&self, item: &FeedbackItem) -> ProviderResult<FeedbackItem> {
        let connection = self.connection()?;
        let title = item.clean_title();
        let description = item.remote_body();
        let request = connection
            .client
            .request(Method::POST, &format!("/rest/v1/{FEATURES}"))?
            .header("Prefer", "return=representation")
            .json(&connection.write_body(item, &title, &description));
        let created: Vec<Feature> = http::send_json(request).await?;
        created
            .into_iter()
            .next()
            .map(FeedbackItem::from)
            .ok_or_else(|| ProviderError::InvalidPayload("create returned no rows".to_string()))
    }

    async fn update(&self, item: &FeedbackItem) -> ProviderResult<()> {
        let connection = self.connection()?;
        let id = item
            .external_id()
            .ok_or_else(|| ProviderError::NotFound(item.id.clone()))?;
        let title = item.clean_title();
        let description = item.remote_body();
        let request = connection
            .client
            .request(Method::PATCH, &format!("/rest/v1/{FEATURES}?{}", eq_filter(id)))?
            .json(&connection.write_body(item, &title, &description));
        http::send_expecting(request, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        let connection = self.connection()?;
        let request = connection
            .client
            .request(Method::DELETE, &format!("/rest/v1/{FEATURES}?{}", eq_filter(id)))?;
        http::send_expecting(request, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    fn close(&mut self) {
        self.connection = None;
    }
}
